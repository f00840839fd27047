//! render
//!
//! The HTML Render Gateway (component K): turns precomputed diff text, or a
//! pair of full file texts, into HTML. Replaces the original's external
//! vim/TOhtml subprocess renderer with a pure in-process diffing library —
//! no temp files to manage, no process to spawn or reap.
//!
//! The trait boundary exists so a future implementation backed by an
//! external renderer could be swapped in without touching the dispatcher
//! (component J) or the route handlers.

use imara_diff::{Algorithm, Diff, InternedInput};

pub type Html = String;

/// Fixed stub page for an empty diff. Callers check for this case and
/// return the stub directly without invoking the renderer at all.
pub const EMPTY_DIFF_STUB: &str = "No code changed in rebase";

pub trait HtmlRenderGateway: Send + Sync {
    /// Render already-computed unified diff text (e.g. from
    /// `VcsGateway::diff`) into a colorized HTML page.
    fn render_diff(&self, diff_text: &str) -> Html;

    /// Render `texts` as a side-by-side HTML table, one column per text.
    /// The common two-column case is `[before, after]`; series views pass
    /// up to four columns, one per rebase snapshot.
    fn render_side_by_side(&self, texts: &[String]) -> Html;
}

/// Render `diff_text` via `renderer`, short-circuiting to the empty-diff
/// stub page without invoking the renderer when there's nothing to show.
pub fn render_diff_or_stub(renderer: &dyn HtmlRenderGateway, diff_text: &str) -> Html {
    if diff_text.trim().is_empty() {
        stub_page()
    } else {
        renderer.render_diff(diff_text)
    }
}

fn stub_page() -> Html {
    format!("<html><head><title>{EMPTY_DIFF_STUB}</title></head><body><p>{EMPTY_DIFF_STUB}</p></body></html>")
}

/// Rewrite the rendered page's `<title>` to `title`. Pure post-processing,
/// decoupled from the renderer so the same HTML shape can be relabeled for
/// different call sites (pairwise vs. series views).
pub fn with_title(html: &str, title: &str) -> Html {
    replace_tag_contents(html, "title", &[escape_html(title)])
}

/// Rewrite the leading `<th>` header cells of a side-by-side table, one per
/// label, in order.
pub fn with_side_by_side_headers(html: &str, labels: &[String]) -> Html {
    let escaped: Vec<String> = labels.iter().map(|l| escape_html(l)).collect();
    replace_tag_contents(html, "th", &escaped)
}

/// Replace the inner text of the first `replacements.len()` occurrences of
/// `<tag>...</tag>`, in order. Occurrences beyond `replacements.len()` are
/// left untouched.
fn replace_tag_contents(html: &str, tag: &str, replacements: &[String]) -> Html {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    let mut replacement_idx = 0;

    while let Some(open_pos) = rest.find(&open) {
        let (head, after_open_tag) = rest.split_at(open_pos);
        let after_open = &after_open_tag[open.len()..];
        let Some(close_pos) = after_open.find(&close) else {
            out.push_str(rest);
            rest = "";
            break;
        };
        out.push_str(head);
        out.push_str(&open);
        match replacements.get(replacement_idx) {
            Some(replacement) => out.push_str(replacement),
            None => out.push_str(&after_open[..close_pos]),
        }
        out.push_str(&close);
        rest = &after_open[close_pos + close.len()..];
        replacement_idx += 1;
    }
    out.push_str(rest);
    out
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Produce unified-diff-style text (context lines prefixed with a space,
/// removals with `-`, additions with `+`) between two arbitrary texts —
/// used where the platform has no native diff of its own to offer (e.g.
/// diffing two rendered commit-log texts), mirroring what an external
/// `diff -u` would produce.
pub fn unified_diff(before: &str, after: &str) -> String {
    let before_lines: Vec<&str> = before.lines().collect();
    let after_lines: Vec<&str> = after.lines().collect();
    let input = InternedInput::new(before_lines.iter().copied(), after_lines.iter().copied());
    let diff = Diff::compute(Algorithm::Histogram, &input);

    let mut out = String::new();
    let mut before_cursor = 0u32;
    let mut after_cursor = 0u32;
    for hunk in diff.hunks() {
        for i in before_cursor..hunk.before.start {
            out.push_str(" ");
            out.push_str(before_lines[i as usize]);
            out.push('\n');
        }
        for i in hunk.before.clone() {
            out.push('-');
            out.push_str(before_lines[i as usize]);
            out.push('\n');
        }
        for i in hunk.after.clone() {
            out.push('+');
            out.push_str(after_lines[i as usize]);
            out.push('\n');
        }
        before_cursor = hunk.before.end;
        after_cursor = hunk.after.end;
    }
    for i in before_cursor..before_lines.len() as u32 {
        out.push_str(" ");
        out.push_str(before_lines[i as usize]);
        out.push('\n');
    }
    let _ = after_cursor;
    out
}

fn diff_line_class(line: &str) -> &'static str {
    if line.starts_with("+++") || line.starts_with("---") {
        "diff-file-header"
    } else if line.starts_with('+') {
        "diff-add"
    } else if line.starts_with('-') {
        "diff-remove"
    } else if line.starts_with("@@") {
        "diff-hunk-header"
    } else {
        "diff-context"
    }
}

/// Default renderer: a text-diffing library, no external process, no temp
/// files to manage.
pub struct ImaraDiffRenderer;

impl HtmlRenderGateway for ImaraDiffRenderer {
    fn render_diff(&self, diff_text: &str) -> Html {
        let mut body = String::new();
        for line in diff_text.lines() {
            body.push_str(&format!(
                "<span class=\"{}\">{}</span>\n",
                diff_line_class(line),
                escape_html(line)
            ));
        }
        format!("<html><head><title>Diff</title></head><body><pre>{body}</pre></body></html>")
    }

    fn render_side_by_side(&self, texts: &[String]) -> Html {
        if texts.is_empty() {
            return stub_page();
        }

        let columns: Vec<Vec<&str>> = texts.iter().map(|t| t.lines().collect()).collect();

        // Every other column is diffed against the first (the baseline);
        // a hunk marks both its side of that column and the corresponding
        // span of the baseline.
        let mut changed: Vec<Vec<bool>> = columns.iter().map(|c| vec![false; c.len()]).collect();
        for (col_idx, column) in columns.iter().enumerate().skip(1) {
            let input = InternedInput::new(columns[0].iter().copied(), column.iter().copied());
            let diff = Diff::compute(Algorithm::Histogram, &input);
            for hunk in diff.hunks() {
                for i in hunk.before.start..hunk.before.end {
                    changed[0][i as usize] = true;
                }
                for i in hunk.after.start..hunk.after.end {
                    changed[col_idx][i as usize] = true;
                }
            }
        }

        let max_rows = columns.iter().map(|c| c.len()).max().unwrap_or(0);
        let mut headers = String::new();
        for i in 0..columns.len() {
            headers.push_str(&format!("<th>column {i}</th>"));
        }

        let mut rows = String::new();
        for row_idx in 0..max_rows {
            rows.push_str("<tr>");
            for (col_idx, column) in columns.iter().enumerate() {
                let line = column.get(row_idx).copied().unwrap_or("");
                let class = if changed[col_idx].get(row_idx).copied().unwrap_or(false) {
                    if col_idx == 0 { "diff-remove" } else { "diff-add" }
                } else {
                    "diff-context"
                };
                rows.push_str(&format!("<td class=\"{class}\">{}</td>", escape_html(line)));
            }
            rows.push_str("</tr>\n");
        }

        format!(
            "<html><head><title>Side by side diff</title></head><body><table><thead><tr>{headers}</tr></thead><tbody>{rows}</tbody></table></body></html>"
        )
    }
}
