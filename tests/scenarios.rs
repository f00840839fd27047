//! End-to-end scenarios from SPEC_FULL.md §8 that exercise the policy
//! checker's exact rule-id output for a known-bad commit (S2). S1, S3, S4
//! and S6 are exercised by the dispatcher's own colocated integration
//! tests (`src/webhook/dispatcher.rs`), which drive real temporary git
//! repositories through the same `Dispatcher` entry points a live webhook
//! delivery would use; this file adds the one scenario precise enough
//! about rule ids that it reads better as a standalone fixture.

use gitbot::commitlog::Commit;
use gitbot::policy;
use gitbot::types::Oid;

/// S2: PR opened with a single commit titled `updated stuff.` — present
/// tense instead of imperative, lower-case, not in the verb list, and
/// ending in punctuation. Expects exactly four title-shaped violations and
/// none from identity or body checks.
#[test]
fn s2_pr_opened_multiple_title_violations() {
    let commit = Commit {
        sha: Oid::new("c".repeat(40)).unwrap(),
        is_merge: false,
        author_display: "Jane Doe".to_string(),
        author_email: "jane@example.com".to_string(),
        committer_display: "Jane Doe".to_string(),
        committer_email: "jane@example.com".to_string(),
        title: "updated stuff.".to_string(),
        separator_line: Some(String::new()),
        body_lines: vec!["Explains the change in reasonable detail.".to_string()],
    };

    let violations = policy::check(&commit, &["example.com".to_string()], false);
    let rule_ids: Vec<&str> = violations.iter().map(|v| v.rule_id).collect();

    assert_eq!(
        rule_ids,
        vec![
            "title-imperative-tense-check",
            "title-capitalization-check",
            "title-verb-check",
            "title-whitespace-punctuation-check",
        ]
    );
}
