//! server
//!
//! Ambient hosting shell (component L): axum router exposing the five
//! endpoints of §6. Routing and query-string deserialization are ambient
//! plumbing; every handler hands off immediately to the webhook dispatcher
//! (J) or the comment/render helpers (I, K) and does no policy logic of its
//! own.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html as AxumHtml, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::refname::{self, Pointer, PrCoordinates};
use crate::render::{self, HtmlRenderGateway, EMPTY_DIFF_STUB};
use crate::vcs::{run_blocking, DiffPrefixes, VcsGateway};
use crate::webhook::{parse_event, Dispatcher, WebhookEvent};

pub struct AppState {
    pub dispatcher: Dispatcher,
    pub vcs: Arc<VcsGateway>,
    pub renderer: Box<dyn HtmlRenderGateway>,
    /// VCS host for the SSH remote URLs the route handlers fetch from —
    /// the same value the dispatcher's [`crate::webhook::SshRemoteResolver`]
    /// was built with.
    pub hostname: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/check_rebase", post(check_rebase))
        .route("/rebase_diff", get(rebase_diff))
        .route("/rebase_commit_log_diff", get(rebase_commit_log_diff))
        .route("/rebase_diff_series", get(rebase_diff_series))
        .route("/rebase_commit_log_series", get(rebase_commit_log_series))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn bad_request(message: impl std::fmt::Display) -> Response {
    (StatusCode::BAD_REQUEST, message.to_string()).into_response()
}

fn internal_error(e: impl std::fmt::Display) -> Response {
    tracing::error!(error = %e, "route handler failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
}

/// Parse a `"<pointer>-<n>"` selector, e.g. `head-2`.
fn parse_selector(selector: &str) -> Result<(Pointer, u64), Response> {
    let (pointer_str, n_str) = selector
        .split_once('-')
        .ok_or_else(|| bad_request("malformed rebase selector"))?;
    let pointer: Pointer = pointer_str.parse().map_err(|e| bad_request(e))?;
    let n: u64 = n_str.parse().map_err(|_| bad_request("non-numeric rebase number in selector"))?;
    Ok((pointer, n))
}

/// `branch_name` is the PR family's self-describing path:
/// `<org>/<repo>/PR/<pr_number>/<base_branch>`.
fn parse_family(branch_name: &str) -> Result<PrCoordinates, Response> {
    let mut parts = branch_name.splitn(5, '/');
    match (parts.next(), parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(org), Some(repo), Some("PR"), Some(n), Some(base)) => {
            let pr_number: u64 = n.parse().map_err(|_| bad_request("non-numeric pr_number in branch_name"))?;
            PrCoordinates::new(org, repo, pr_number, base).map_err(bad_request)
        }
        _ => Err(bad_request("malformed branch_name")),
    }
}

async fn check_rebase(State(state): State<Arc<AppState>>, headers: HeaderMap, body: axum::body::Bytes) -> Response {
    let event_header = match headers.get("X-Github-Event").and_then(|v| v.to_str().ok()) {
        Some(h) => h,
        None => return bad_request("missing X-Github-Event header"),
    };

    let event = match parse_event(event_header, &body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, event = event_header, "rejected malformed webhook payload");
            return bad_request(e);
        }
    };

    match event {
        WebhookEvent::PullRequestOpened(payload) => {
            tracing::info!(pr_number = payload.number, "handling pull_request(opened)");
            if let Err(e) = state.dispatcher.handle_pull_request_opened(&payload).await {
                tracing::error!(error = %e, "pull_request(opened) delivery failed");
            }
        }
        WebhookEvent::Push(payload) => {
            tracing::info!(ref_name = %payload.ref_name, "handling push");
            if let Err(e) = state.dispatcher.handle_push(&payload).await {
                tracing::error!(error = %e, "push delivery failed");
            }
        }
        WebhookEvent::Ignored => {
            tracing::debug!(event = event_header, "ignored webhook event");
        }
    }

    StatusCode::OK.into_response()
}

/// Fetch `coords.base_branch` from this family's own remote, leaving it
/// sitting at `FETCH_HEAD` for a subsequent `base..<snapshot>` range.
async fn fetch_base(vcs: &Arc<VcsGateway>, hostname: &str, coords: &PrCoordinates) -> Result<(), Response> {
    let remote = format!("git@{hostname}:{}/{}.git", coords.org, coords.repo);
    let base_branch = coords.base_branch.clone();
    run_blocking(vcs, move |vcs| vcs.fetch(&remote, &base_branch))
        .await
        .map_err(internal_error)
}

#[derive(Debug, Deserialize)]
struct PairwiseDiffQuery {
    branch_name: String,
    rebase_start: String,
    rebase_end: String,
    #[serde(default)]
    side_by_side: Option<String>,
}

async fn rebase_diff(State(state): State<Arc<AppState>>, Query(q): Query<PairwiseDiffQuery>) -> Response {
    let coords = match parse_family(&q.branch_name) {
        Ok(c) => c,
        Err(r) => return r,
    };
    let (start_ptr, start_n) = match parse_selector(&q.rebase_start) {
        Ok(p) => p,
        Err(r) => return r,
    };
    let (end_ptr, end_n) = match parse_selector(&q.rebase_end) {
        Ok(p) => p,
        Err(r) => return r,
    };
    let start_ref = refname::build(&coords, start_ptr, start_n);
    let end_ref = refname::build(&coords, end_ptr, end_n);

    let side_by_side = q.side_by_side.as_deref() == Some("1");

    if side_by_side {
        if let Err(r) = fetch_base(&state.vcs, &state.hostname, &coords).await {
            return r;
        }
        let start_range = format!("FETCH_HEAD..{start_ref}");
        let start_diff = match run_blocking(&state.vcs, move |vcs| vcs.diff(&start_range, &DiffPrefixes::default())).await {
            Ok(t) => t,
            Err(e) => return internal_error(e),
        };
        let end_range = format!("FETCH_HEAD..{end_ref}");
        let end_diff = match run_blocking(&state.vcs, move |vcs| vcs.diff(&end_range, &DiffPrefixes::default())).await {
            Ok(t) => t,
            Err(e) => return internal_error(e),
        };
        let rendered = state.renderer.render_side_by_side(&[start_diff, end_diff]);
        let labels = vec![
            format!("{}..{start_ref}", coords.base_branch),
            format!("{}..{end_ref}", coords.base_branch),
        ];
        let html = render::with_title(&render::with_side_by_side_headers(&rendered, &labels), "Rebase Diff");
        AxumHtml(html).into_response()
    } else {
        let prefixes = DiffPrefixes {
            src_prefix: Some(format!("{start_ref}:")),
            dst_prefix: Some(format!("{end_ref}:")),
        };
        let range = format!("{start_ref}..{end_ref}");
        let diff_text = match run_blocking(&state.vcs, move |vcs| vcs.diff(&range, &prefixes)).await {
            Ok(t) => t,
            Err(e) => return internal_error(e),
        };
        let rendered = render::render_diff_or_stub(state.renderer.as_ref(), &diff_text);
        AxumHtml(render::with_title(&rendered, "Rebase Diff")).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct CommitLogDiffQuery {
    branch_name: String,
    rebase_start: String,
    rebase_end: String,
    #[serde(default)]
    show_diffs: Option<String>,
    #[serde(default)]
    side_by_side: Option<String>,
}

async fn rebase_commit_log_diff(State(state): State<Arc<AppState>>, Query(q): Query<CommitLogDiffQuery>) -> Response {
    let coords = match parse_family(&q.branch_name) {
        Ok(c) => c,
        Err(r) => return r,
    };
    let (start_ptr, start_n) = match parse_selector(&q.rebase_start) {
        Ok(p) => p,
        Err(r) => return r,
    };
    let (end_ptr, end_n) = match parse_selector(&q.rebase_end) {
        Ok(p) => p,
        Err(r) => return r,
    };
    let start_ref = refname::build(&coords, start_ptr, start_n);
    let end_ref = refname::build(&coords, end_ptr, end_n);

    if let Err(r) = fetch_base(&state.vcs, &state.hostname, &coords).await {
        return r;
    }

    let show_diffs = q.show_diffs.as_deref() == Some("1");
    let side_by_side = q.side_by_side.as_deref() == Some("1");

    let start_range = format!("FETCH_HEAD..{start_ref}");
    let start_log = match run_blocking(&state.vcs, move |vcs| vcs.log(&start_range, show_diffs)).await {
        Ok(t) => t,
        Err(e) => return internal_error(e),
    };
    let end_range = format!("FETCH_HEAD..{end_ref}");
    let end_log = match run_blocking(&state.vcs, move |vcs| vcs.log(&end_range, show_diffs)).await {
        Ok(t) => t,
        Err(e) => return internal_error(e),
    };

    if side_by_side {
        let rendered = state.renderer.render_side_by_side(&[start_log, end_log]);
        let labels = vec![
            format!("{}..{start_ref}", coords.base_branch),
            format!("{}..{end_ref}", coords.base_branch),
        ];
        let html = render::with_title(
            &render::with_side_by_side_headers(&rendered, &labels),
            "Commit Log Diff",
        );
        AxumHtml(html).into_response()
    } else {
        let diff_text = render::unified_diff(&start_log, &end_log);
        let rendered = render::render_diff_or_stub(state.renderer.as_ref(), &diff_text);
        AxumHtml(render::with_title(&rendered, "Rebase Commit Log Diff")).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct SeriesQuery {
    branch_name: String,
    rebase_first: String,
    rebase_second: String,
    #[serde(default)]
    rebase_third: Option<String>,
    #[serde(default)]
    rebase_fourth: Option<String>,
    #[serde(default)]
    show_diffs: Option<String>,
}

fn series_selectors(q: &SeriesQuery) -> Vec<&str> {
    let mut out = vec![q.rebase_first.as_str(), q.rebase_second.as_str()];
    if let Some(third) = &q.rebase_third {
        out.push(third.as_str());
    }
    if let Some(fourth) = &q.rebase_fourth {
        out.push(fourth.as_str());
    }
    out
}

async fn rebase_diff_series(State(state): State<Arc<AppState>>, Query(q): Query<SeriesQuery>) -> Response {
    let selectors = series_selectors(&q);
    if selectors.len() < 2 {
        return AxumHtml(format!(
            "<html><title>Series Diff</title><body>{EMPTY_DIFF_STUB}</body></html>"
        ))
        .into_response();
    }
    let coords = match parse_family(&q.branch_name) {
        Ok(c) => c,
        Err(r) => return r,
    };
    if let Err(r) = fetch_base(&state.vcs, &state.hostname, &coords).await {
        return r;
    }

    let mut texts = Vec::with_capacity(selectors.len());
    let mut labels = Vec::with_capacity(selectors.len());
    for selector in &selectors {
        let (pointer, n) = match parse_selector(selector) {
            Ok(p) => p,
            Err(r) => return r,
        };
        let snapshot_ref = refname::build(&coords, pointer, n);
        let range = format!("FETCH_HEAD..{snapshot_ref}");
        let diff_text = match run_blocking(&state.vcs, move |vcs| vcs.diff(&range, &DiffPrefixes::default())).await {
            Ok(t) => t,
            Err(e) => return internal_error(e),
        };
        labels.push(format!("{}..{snapshot_ref}", coords.base_branch));
        texts.push(diff_text);
    }

    let rendered = state.renderer.render_side_by_side(&texts);
    let html = render::with_title(&render::with_side_by_side_headers(&rendered, &labels), "Rebase Series Diff");
    AxumHtml(html).into_response()
}

async fn rebase_commit_log_series(State(state): State<Arc<AppState>>, Query(q): Query<SeriesQuery>) -> Response {
    let selectors = series_selectors(&q);
    if selectors.len() < 2 {
        return AxumHtml(format!(
            "<html><title>Series Commit Log Diff</title><body>{EMPTY_DIFF_STUB}</body></html>"
        ))
        .into_response();
    }
    let coords = match parse_family(&q.branch_name) {
        Ok(c) => c,
        Err(r) => return r,
    };
    if let Err(r) = fetch_base(&state.vcs, &state.hostname, &coords).await {
        return r;
    }

    let show_diffs = q.show_diffs.as_deref() == Some("1");
    let mut texts = Vec::with_capacity(selectors.len());
    let mut labels = Vec::with_capacity(selectors.len());
    for selector in &selectors {
        let (pointer, n) = match parse_selector(selector) {
            Ok(p) => p,
            Err(r) => return r,
        };
        let snapshot_ref = refname::build(&coords, pointer, n);
        let range = format!("FETCH_HEAD..{snapshot_ref}");
        let log_text = match run_blocking(&state.vcs, move |vcs| vcs.log(&range, show_diffs)).await {
            Ok(t) => t,
            Err(e) => return internal_error(e),
        };
        labels.push(format!("{}..{snapshot_ref}", coords.base_branch));
        texts.push(log_text);
    }

    let rendered = state.renderer.render_side_by_side(&texts);
    let html = render::with_title(
        &render::with_side_by_side_headers(&rendered, &labels),
        "Rebase Series Commit Log Diff",
    );
    AxumHtml(html).into_response()
}

