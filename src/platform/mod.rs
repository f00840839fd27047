//! platform
//!
//! The Platform Gateway (component C): the single doorway to the code
//! review platform's REST API.

mod client;
mod error;
mod retry;

pub use client::{NewStatus, PlatformGateway, RestPlatformGateway, StatusEntry, StatusState};
pub use error::PlatformError;
pub use retry::with_retry;
