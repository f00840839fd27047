//! policy
//!
//! The Policy Checker (component G): a pure function from a commit record
//! (plus a whitespace-check result and a domain allow-list) to an ordered
//! sequence of `(rule_id, message)` violations.
//!
//! Rule order is fixed so published status ordering is deterministic;
//! `rule_id` becomes the status *context* the reconciler posts under, so
//! renaming one here breaks idempotence for already-posted statuses.
//!
//! Grounded on `_validate_email`/`_validate_commit` in the original
//! implementation, reworked as a closed Rust enum rather than loosely-typed
//! `(str, str)` tuples.

use crate::commitlog::Commit;

const TITLE_START_WORDS: &[&str] = &[
    "Add", "Bump", "Change", "Create", "Disable", "Enable", "Fix", "Move", "Refactor", "Remove",
    "Replace", "Revert", "Set", "Update", "Upgrade", "Use",
];

/// One violation found for a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub rule_id: &'static str,
    pub message: String,
}

impl Violation {
    fn new(rule_id: &'static str, message: impl Into<String>) -> Self {
        Self {
            rule_id,
            message: message.into(),
        }
    }
}

/// Check a single identity field (author or committer), appending any
/// violations to `out` in fixed order: root, real-name, valid-domain.
fn check_identity(
    display: &str,
    email: &str,
    field: &'static str,
    root_rule: &'static str,
    real_name_rule: &'static str,
    domain_rule: &'static str,
    allowed_domains: &[String],
    out: &mut Vec<Violation>,
) {
    if display == "root" {
        out.push(Violation::new(root_rule, format!("{field} is root instead of real name")));
    }
    if !display.contains(' ') {
        out.push(Violation::new(
            real_name_rule,
            format!("{field} does not contain first and last name"),
        ));
    }
    let domain = email.rsplit_once('@').map(|(_, d)| d).unwrap_or("");
    if !allowed_domains.iter().any(|d| d == domain) {
        out.push(Violation::new(
            domain_rule,
            format!("{field} email address domain must be in the configured allow-list"),
        ));
    }
}

/// Check `commit` against the closed rule vocabulary of §4.G.
///
/// `has_whitespace_issue` is the result of `VcsGateway::show_check(sha)`,
/// supplied by the caller since the policy checker itself is a pure
/// function with no I/O.
pub fn check(commit: &Commit, allowed_domains: &[String], has_whitespace_issue: bool) -> Vec<Violation> {
    let mut violations = Vec::new();

    check_identity(
        &commit.author_display,
        &commit.author_email,
        "Author",
        "author-root-check",
        "author-real-name-check",
        "author-valid-domain-check",
        allowed_domains,
        &mut violations,
    );
    check_identity(
        &commit.committer_display,
        &commit.committer_email,
        "Committer",
        "committer-root-check",
        "committer-real-name-check",
        "committer-valid-domain-check",
        allowed_domains,
        &mut violations,
    );

    let mut title_words = commit.title.splitn(2, ' ');
    let first_word = title_words.next().unwrap_or("");
    let rest = title_words.next();

    if first_word.ends_with("ed") || first_word.ends_with("ing") || first_word.ends_with('s') {
        violations.push(Violation::new(
            "title-imperative-tense-check",
            "Commit title is not in imperative tense",
        ));
    }
    if !first_word.is_empty() && !first_word.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
        violations.push(Violation::new(
            "title-capitalization-check",
            "Commit title is not capitalized",
        ));
    }
    if !TITLE_START_WORDS.contains(&first_word) {
        violations.push(Violation::new(
            "title-verb-check",
            "Commit title does not begin with a verb",
        ));
    }
    if first_word.starts_with("fixup!") {
        violations.push(Violation::new("title-fixup-check", "Commit title starts with fixup!"));
    }
    if first_word.starts_with("squash!") {
        violations.push(Violation::new("title-squash-check", "Commit title starts with squash!"));
    }
    if let Some(rest) = rest {
        if rest
            .chars()
            .last()
            .is_some_and(|c| c.is_whitespace() || (!c.is_alphanumeric() && c != '_'))
        {
            violations.push(Violation::new(
                "title-whitespace-punctuation-check",
                "Commit title ends in whitespace or punctuation",
            ));
        }
    }
    if commit.title.len() > 50 {
        violations.push(Violation::new(
            "title-length-check",
            "Commit title longer than 50 characters",
        ));
    }

    if commit.separator_line.as_deref().is_some_and(|s| !s.is_empty()) {
        violations.push(Violation::new(
            "message-separator-check",
            "Missing blank line between title and body",
        ));
    }

    if commit.body_lines.is_empty() {
        violations.push(Violation::new("body-check", "Missing commit message body"));
    }
    if commit.body_lines.iter().any(|line| line.len() > 72) {
        violations.push(Violation::new(
            "body-length-check",
            "Commit message body line > 72 characters",
        ));
    }

    if commit.is_merge {
        violations.push(Violation::new("commit-merge-check", "Commit is a merge commit"));
    }

    if has_whitespace_issue {
        violations.push(Violation::new(
            "diff-whitespace-check",
            "Commit diff has whitespace issues",
        ));
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Oid;

    fn base_commit() -> Commit {
        Commit {
            sha: Oid::new("a".repeat(40)).unwrap(),
            is_merge: false,
            author_display: "Jane Doe".to_string(),
            author_email: "jane@example.com".to_string(),
            committer_display: "Jane Doe".to_string(),
            committer_email: "jane@example.com".to_string(),
            title: "Add widget support".to_string(),
            separator_line: None,
            body_lines: vec!["Explains the change in detail.".to_string()],
        }
    }

    fn domains() -> Vec<String> {
        vec!["example.com".to_string()]
    }

    #[test]
    fn clean_commit_has_no_violations() {
        let commit = base_commit();
        assert!(check(&commit, &domains(), false).is_empty());
    }

    #[test]
    fn root_display_name_flagged() {
        let mut commit = base_commit();
        commit.author_display = "root".to_string();
        let v = check(&commit, &domains(), false);
        assert!(v.iter().any(|x| x.rule_id == "author-root-check"));
    }

    #[test]
    fn single_word_display_name_flagged() {
        let mut commit = base_commit();
        commit.committer_display = "jane".to_string();
        let v = check(&commit, &domains(), false);
        assert!(v.iter().any(|x| x.rule_id == "committer-real-name-check"));
    }

    #[test]
    fn domain_not_in_allow_list_flagged() {
        let mut commit = base_commit();
        commit.author_email = "jane@evil.com".to_string();
        let v = check(&commit, &domains(), false);
        assert!(v.iter().any(|x| x.rule_id == "author-valid-domain-check"));
    }

    #[test]
    fn empty_allow_list_fails_closed() {
        let commit = base_commit();
        let v = check(&commit, &[], false);
        assert!(v.iter().any(|x| x.rule_id == "author-valid-domain-check"));
        assert!(v.iter().any(|x| x.rule_id == "committer-valid-domain-check"));
    }

    #[test]
    fn imperative_tense_violation() {
        let mut commit = base_commit();
        commit.title = "Added widget support".to_string();
        let v = check(&commit, &domains(), false);
        assert!(v.iter().any(|x| x.rule_id == "title-imperative-tense-check"));
    }

    #[test]
    fn lowercase_title_flagged() {
        let mut commit = base_commit();
        commit.title = "add widget support".to_string();
        let v = check(&commit, &domains(), false);
        assert!(v.iter().any(|x| x.rule_id == "title-capitalization-check"));
    }

    #[test]
    fn unknown_start_verb_flagged() {
        let mut commit = base_commit();
        commit.title = "Widget support added".to_string();
        let v = check(&commit, &domains(), false);
        assert!(v.iter().any(|x| x.rule_id == "title-verb-check"));
    }

    #[test]
    fn fixup_title_flagged() {
        let mut commit = base_commit();
        commit.title = "fixup! Add widget support".to_string();
        let v = check(&commit, &domains(), false);
        assert!(v.iter().any(|x| x.rule_id == "title-fixup-check"));
    }

    #[test]
    fn squash_title_flagged() {
        let mut commit = base_commit();
        commit.title = "squash! Add widget support".to_string();
        let v = check(&commit, &domains(), false);
        assert!(v.iter().any(|x| x.rule_id == "title-squash-check"));
    }

    #[test]
    fn trailing_punctuation_flagged() {
        let mut commit = base_commit();
        commit.title = "Add widget support.".to_string();
        let v = check(&commit, &domains(), false);
        assert!(v.iter().any(|x| x.rule_id == "title-whitespace-punctuation-check"));
    }

    #[test]
    fn long_title_flagged() {
        let mut commit = base_commit();
        commit.title = "Add ".to_string() + &"x".repeat(60);
        let v = check(&commit, &domains(), false);
        assert!(v.iter().any(|x| x.rule_id == "title-length-check"));
    }

    #[test]
    fn nonblank_separator_flagged() {
        let mut commit = base_commit();
        commit.separator_line = Some("not blank".to_string());
        let v = check(&commit, &domains(), false);
        assert!(v.iter().any(|x| x.rule_id == "message-separator-check"));
    }

    #[test]
    fn missing_body_flagged() {
        let mut commit = base_commit();
        commit.body_lines = Vec::new();
        let v = check(&commit, &domains(), false);
        assert!(v.iter().any(|x| x.rule_id == "body-check"));
    }

    #[test]
    fn long_body_line_flagged_once() {
        let mut commit = base_commit();
        commit.body_lines = vec!["x".repeat(80), "y".repeat(80)];
        let v = check(&commit, &domains(), false);
        assert_eq!(v.iter().filter(|x| x.rule_id == "body-length-check").count(), 1);
    }

    #[test]
    fn merge_commit_flagged() {
        let mut commit = base_commit();
        commit.is_merge = true;
        let v = check(&commit, &domains(), false);
        assert!(v.iter().any(|x| x.rule_id == "commit-merge-check"));
    }

    #[test]
    fn whitespace_issue_flagged() {
        let commit = base_commit();
        let v = check(&commit, &domains(), true);
        assert!(v.iter().any(|x| x.rule_id == "diff-whitespace-check"));
    }

    #[test]
    fn violations_emitted_in_fixed_order() {
        let mut commit = base_commit();
        commit.author_display = "root".to_string();
        commit.is_merge = true;
        let v = check(&commit, &domains(), true);
        let rule_ids: Vec<&str> = v.iter().map(|x| x.rule_id).collect();
        let merge_pos = rule_ids.iter().position(|r| *r == "commit-merge-check").unwrap();
        let whitespace_pos = rule_ids.iter().position(|r| *r == "diff-whitespace-check").unwrap();
        let root_pos = rule_ids.iter().position(|r| *r == "author-root-check").unwrap();
        assert!(root_pos < merge_pos);
        assert!(merge_pos < whitespace_pos);
    }
}
