//! comment
//!
//! The Comment Composer (component I): turns a rebase event into the
//! Markdown comment posted back to the PR, with deterministic links into
//! the four diff-view families served by the HTTP server (component L).
//!
//! Grounded on `_generate_github_rebase_comment` in the original
//! implementation for the exact URL shapes and series-window boundaries,
//! rebuilt as pure string-building functions in the style of
//! `ui::stack_comment`.

use crate::refname::{Pointer, PrCoordinates};

fn pointer_term(pointer: Pointer, n: u64) -> String {
    format!("{}-{n}", pointer.as_str())
}

fn pairwise_diff_url(
    url_root: &str,
    branch_name: &str,
    start: (Pointer, u64),
    end: (Pointer, u64),
    side_by_side: bool,
) -> String {
    format!(
        "{url_root}rebase_diff?branch_name={branch_name}&rebase_start={}&rebase_end={}&side_by_side={}",
        pointer_term(start.0, start.1),
        pointer_term(end.0, end.1),
        side_by_side as u8,
    )
}

fn pairwise_commit_log_url(
    url_root: &str,
    branch_name: &str,
    start: (Pointer, u64),
    end: (Pointer, u64),
    side_by_side: bool,
    show_diffs: bool,
) -> String {
    format!(
        "{url_root}rebase_commit_log_diff?branch_name={branch_name}&rebase_start={}&rebase_end={}&side_by_side={}&show_diffs={}",
        pointer_term(start.0, start.1),
        pointer_term(end.0, end.1),
        side_by_side as u8,
        show_diffs as u8,
    )
}

/// Build the `rebase_first=...&rebase_second=...[&rebase_third=...][&rebase_fourth=...]`
/// segment shared by both series URL families.
fn series_query_terms(pointer: Pointer, rebase_numbers: &[u64]) -> String {
    const NAMES: [&str; 4] = ["rebase_first", "rebase_second", "rebase_third", "rebase_fourth"];
    rebase_numbers
        .iter()
        .zip(NAMES.iter())
        .map(|(&n, name)| format!("{name}={}", pointer_term(pointer, n)))
        .collect::<Vec<_>>()
        .join("&")
}

fn series_diff_url(url_root: &str, branch_name: &str, pointer: Pointer, rebase_numbers: &[u64]) -> String {
    format!(
        "{url_root}rebase_diff_series?branch_name={branch_name}&{}",
        series_query_terms(pointer, rebase_numbers)
    )
}

fn series_commit_log_url(
    url_root: &str,
    branch_name: &str,
    pointer: Pointer,
    rebase_numbers: &[u64],
    show_diffs: bool,
) -> String {
    format!(
        "{url_root}rebase_commit_log_series?branch_name={branch_name}&{}&show_diffs={}",
        series_query_terms(pointer, rebase_numbers),
        show_diffs as u8,
    )
}

/// The series window of rebase numbers to compare, per the boundary rule in
/// §4.I: `r+1 == 1` emits no series; `r+1 == 2` emits `{r-1, r, r+1}`;
/// `r+1 >= 3` emits `{r-2, r-1, r, r+1}`.
fn series_window(r: u64) -> Option<Vec<u64>> {
    match r + 1 {
        1 => None,
        2 => Some(vec![r - 1, r, r + 1]),
        _ => Some(vec![r - 2, r - 1, r, r + 1]),
    }
}

/// Compose the Markdown comment for a rebase from `r` to `r+1`.
///
/// `r` is the family's current rebase number *before* the push that
/// triggered this comment (the pre-push value, per the open-question
/// resolution in §REDESIGN FLAGS — the composer must not be passed the
/// post-push current rebase).
pub fn compose(url_root: &str, coords: &PrCoordinates, sender: &str, r: u64) -> String {
    let branch_name = format!(
        "{}/{}/PR/{}/{}",
        coords.org, coords.repo, coords.pr_number, coords.base_branch
    );
    let branch_name = branch_name.as_str();
    let mut out = String::new();

    out.push_str(&format!(
        "Branch rebased {} time(s), most recently by {sender}\n",
        r + 1
    ));

    let base_to_base = pairwise_diff_url(url_root, branch_name, (Pointer::Base, r), (Pointer::Base, r + 1), false);
    let base_to_base_sbs = pairwise_diff_url(url_root, branch_name, (Pointer::Base, r), (Pointer::Base, r + 1), true);
    let head_to_base = pairwise_diff_url(url_root, branch_name, (Pointer::Head, r), (Pointer::Base, r + 1), false);
    let head_to_base_sbs = pairwise_diff_url(url_root, branch_name, (Pointer::Head, r), (Pointer::Base, r + 1), true);

    out.push_str(&format!(
        "* Rebase diff [base to base]({base_to_base}) ([side by side]({base_to_base_sbs})) [head to base]({head_to_base}) ([side by side]({head_to_base_sbs}))\n"
    ));

    let cl_base_to_base = pairwise_commit_log_url(url_root, branch_name, (Pointer::Base, r), (Pointer::Base, r + 1), false, false);
    let cl_base_to_base_diffs = pairwise_commit_log_url(url_root, branch_name, (Pointer::Base, r), (Pointer::Base, r + 1), false, true);
    let cl_base_to_base_sbs = pairwise_commit_log_url(url_root, branch_name, (Pointer::Base, r), (Pointer::Base, r + 1), true, false);
    let cl_base_to_base_sbs_diffs = pairwise_commit_log_url(url_root, branch_name, (Pointer::Base, r), (Pointer::Base, r + 1), true, true);
    let cl_head_to_base = pairwise_commit_log_url(url_root, branch_name, (Pointer::Head, r), (Pointer::Base, r + 1), false, false);
    let cl_head_to_base_diffs = pairwise_commit_log_url(url_root, branch_name, (Pointer::Head, r), (Pointer::Base, r + 1), false, true);
    let cl_head_to_base_sbs = pairwise_commit_log_url(url_root, branch_name, (Pointer::Head, r), (Pointer::Base, r + 1), true, false);
    let cl_head_to_base_sbs_diffs = pairwise_commit_log_url(url_root, branch_name, (Pointer::Head, r), (Pointer::Base, r + 1), true, true);

    out.push_str("* Rebase commit log diff\n");
    out.push_str(&format!(
        "  - [base to base]({cl_base_to_base}) ([with diffs]({cl_base_to_base_diffs})) ([side by side]({cl_base_to_base_sbs})) ([side by side with diffs]({cl_base_to_base_sbs_diffs}))\n"
    ));
    out.push_str(&format!(
        "  - [head to base]({cl_head_to_base}) ([with diffs]({cl_head_to_base_diffs})) ([side by side]({cl_head_to_base_sbs})) ([side by side with diffs]({cl_head_to_base_sbs_diffs}))\n"
    ));

    if let Some(window) = series_window(r) {
        let heads = series_diff_url(url_root, branch_name, Pointer::Head, &window);
        let bases = series_diff_url(url_root, branch_name, Pointer::Base, &window);
        out.push_str(&format!("* Rebase series diff [branch heads]({heads}) [branch bases]({bases})\n"));

        let cl_heads = series_commit_log_url(url_root, branch_name, Pointer::Head, &window, false);
        let cl_heads_diffs = series_commit_log_url(url_root, branch_name, Pointer::Head, &window, true);
        let cl_bases = series_commit_log_url(url_root, branch_name, Pointer::Base, &window, false);
        let cl_bases_diffs = series_commit_log_url(url_root, branch_name, Pointer::Base, &window, true);
        out.push_str(&format!(
            "* Rebase commit log series diff [branch heads]({cl_heads}) ([with diffs]({cl_heads_diffs})) [branch bases]({cl_bases}) ([with diffs]({cl_bases_diffs}))\n"
        ));
    }

    out
}
