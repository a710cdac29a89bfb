//! Byte-span edits over the original source text.
//!
//! The parsed tree only tells us where statements are; every rewrite is
//! recorded as an [`Edit`] and applied to the untouched text, so anything the
//! rewriter does not touch (comments, blank lines, formatting) survives as-is.

use std::ops::Range;

use rustpython_parser::text_size::TextRange;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Edit {
    pub span: Range<usize>,
    pub text: String,
}

impl Edit {
    pub fn delete(span: Range<usize>) -> Self {
        Self {
            span,
            text: String::new(),
        }
    }
}

pub(crate) fn offsets(range: TextRange) -> Range<usize> {
    u32::from(range.start()) as usize..u32::from(range.end()) as usize
}

pub(crate) fn line_start(source: &str, offset: usize) -> usize {
    source[..offset].rfind('\n').map_or(0, |i| i + 1)
}

fn is_blank(text: &str) -> bool {
    text.chars().all(|c| c == ' ' || c == '\t')
}

/// Start of the line when only indentation precedes `start`, else `start` itself.
pub(crate) fn leading_edge(source: &str, start: usize) -> usize {
    let line = line_start(source, start);
    if is_blank(&source[line..start]) {
        line
    } else {
        start
    }
}

/// Indentation in front of `start`, empty when something else shares the line.
pub(crate) fn indentation(source: &str, start: usize) -> &str {
    let line = line_start(source, start);
    let prefix = &source[line..start];
    if is_blank(prefix) { prefix } else { "" }
}

/// `end` pushed past the newline when only blanks or a comment follow it.
pub(crate) fn trailing_edge(source: &str, end: usize) -> usize {
    let line_end = source[end..].find('\n').map_or(source.len(), |i| end + i + 1);
    let tail = source[end..line_end].trim();
    if tail.is_empty() || tail.starts_with('#') {
        line_end
    } else {
        end
    }
}

fn skip_blanks(source: &str, from: usize) -> usize {
    let rest = &source[from..];
    from + rest.len() - rest.trim_start_matches([' ', '\t']).len()
}

/// Span deleted when the statement `edge..end` is removed. A `;` separator on
/// the same line goes with it, and the line break stays when another
/// statement precedes it on that line.
pub(crate) fn removal_span(source: &str, edge: usize, end: usize) -> Range<usize> {
    let mut end = end;
    let after = skip_blanks(source, end);
    if source[after..].starts_with(';') {
        let next = skip_blanks(source, after + 1);
        let followed = !matches!(
            source[next..].chars().next(),
            None | Some('\n' | '\r' | '#')
        );
        if followed {
            return skip_blanks(source, edge)..next;
        }
        end = after + 1;
    }
    let before = source[..edge].trim_end_matches([' ', '\t']);
    if before.ends_with(';') {
        return before.len() - 1..end;
    }
    edge..trailing_edge(source, end)
}

/// Offset of the `@` introducing a decorator whose expression starts at `expr_start`.
pub(crate) fn decorator_at(source: &str, expr_start: usize) -> usize {
    let before = source[..expr_start].trim_end_matches([' ', '\t']);
    if before.ends_with('@') {
        before.len() - 1
    } else {
        expr_start
    }
}

/// Applies `edits` to `source[window]`. An edit starting inside the previous
/// one is clipped to where that one ended.
pub(crate) fn apply_edits(source: &str, window: Range<usize>, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|edit| edit.span.start);
    let mut out = String::with_capacity(window.len());
    let mut cursor = window.start;
    for edit in edits {
        debug_assert!(edit.span.end <= window.end);
        let start = edit.span.start.max(cursor);
        out.push_str(&source[cursor..start]);
        out.push_str(&edit.text);
        cursor = edit.span.end.max(start);
    }
    out.push_str(&source[cursor..window.end]);
    out
}

/// Strips `indent` from the front of every line that carries it.
pub(crate) fn dedent(text: &str, indent: &str) -> String {
    if indent.is_empty() {
        return text.to_string();
    }
    text.split_inclusive('\n')
        .map(|line| line.strip_prefix(indent).unwrap_or(line))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_cover_whole_lines() {
        let src = "a = 1\n    import x  # noqa\nb = 2\n";
        let start = src.find("import").unwrap();
        let end = src.find("  # noqa").unwrap();
        assert_eq!(leading_edge(src, start), 6);
        assert_eq!(indentation(src, start), "    ");
        assert_eq!(trailing_edge(src, end), src.find("b = 2").unwrap());
    }

    #[test]
    fn test_edges_respect_shared_lines() {
        let src = "import a; import b\n";
        let second = src.find("import b").unwrap();
        assert_eq!(leading_edge(src, second), second);
        assert_eq!(indentation(src, second), "");
        assert_eq!(trailing_edge(src, 8), 8);
    }

    #[test]
    fn test_removal_takes_following_separator() {
        let src = "import a; import b\nx = 1\n";
        let span = removal_span(src, 0, 8);
        assert_eq!(&src[span], "import a; ");
    }

    #[test]
    fn test_removal_takes_preceding_separator_and_keeps_newline() {
        let src = "x = 1; import a  # note\ndef f(): pass\n";
        let start = src.find("import").unwrap();
        let end = src.find("  # note").unwrap();
        let span = removal_span(src, start, end);
        assert_eq!(&src[span], "; import a");
    }

    #[test]
    fn test_removal_with_trailing_separator_drops_line() {
        let src = "    import a;\nx = 1\n";
        assert_eq!(removal_span(src, 0, 12), 0..14);
    }

    #[test]
    fn test_overlapping_edits_are_clipped() {
        let src = "import a; import b\n";
        let edits = vec![Edit::delete(0..10), Edit::delete(8..18)];
        assert_eq!(apply_edits(src, 0..src.len(), edits), "\n");
    }

    #[test]
    fn test_decorator_at_finds_marker() {
        let src = "class A:\n    @ deco(1)\n    def f(self): ...\n";
        let expr = src.find("deco").unwrap();
        assert_eq!(&src[decorator_at(src, expr)..expr], "@ ");
    }

    #[test]
    fn test_apply_edits_in_window() {
        let src = "0123456789";
        let edits = vec![Edit::delete(5..6), Edit {
            span: 2..3,
            text: "x".to_string(),
        }];
        assert_eq!(apply_edits(src, 1..8, edits), "1x3467");
    }

    #[test]
    fn test_dedent_only_touches_prefixed_lines() {
        let text = "    def f():\n        return 1\n  odd\n";
        assert_eq!(dedent(text, "    "), "def f():\n    return 1\n  odd\n");
    }
}
