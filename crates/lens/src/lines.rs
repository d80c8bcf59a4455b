//! Shared machinery for lenses where every non-blank line is one record.
//!
//! Blank lines are skeleton: they are never part of the tree and are carried
//! over verbatim from the original text on `put`. Lines starting with `#`
//! become `#comment` nodes for every format.

use crate::error::LensError;
use crate::fragment::{Fragment, FragmentSpan};
use crate::lens::Lens;
use std::fmt::Debug;

pub const COMMENT: &str = "#comment";

/// The per-format half of a line-oriented lens.
pub trait LineFormat: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    fn default_includes(&self) -> &'static [&'static str] {
        &[]
    }

    /// Parses one record line, without its newline. `seq` counts the records
    /// seen so far, comments excluded, starting at 1. Spans are relative to
    /// the start of the line.
    fn parse_line(&self, line: &str, seq: usize) -> Result<Fragment, String>;

    /// Renders one record canonically, without a newline.
    fn render(&self, fragment: &Fragment) -> Result<String, LensError>;
}

/// Adapts a [`LineFormat`] into a full [`Lens`].
#[derive(Debug)]
pub struct LineLens<F> {
    format: F,
}

impl<F: LineFormat> LineLens<F> {
    pub fn new(format: F) -> Self {
        Self { format }
    }
}

/// One record of a parsed text, with the raw text needed to reproduce it.
#[derive(Debug)]
struct Record {
    /// Blank lines directly before the record.
    leading: String,
    /// The record's line, without its newline.
    text: String,
    fragment: Fragment,
}

#[derive(Debug)]
struct Layout {
    records: Vec<Record>,
    /// Blank lines after the last record.
    trailer: String,
    final_newline: bool,
}

impl<F: LineFormat> LineLens<F> {
    fn parse(&self, text: &str) -> Result<Layout, LensError> {
        let mut records = Vec::new();
        let mut leading = String::new();
        let mut offset = 0;
        let mut seq = 0;

        for (index, raw) in text.split_inclusive('\n').enumerate() {
            let line = raw.strip_suffix('\n').unwrap_or(raw);
            if line.trim().is_empty() {
                leading.push_str(raw);
                offset += raw.len();
                continue;
            }

            let mut fragment = if is_comment(line) {
                comment_fragment(line)
            } else {
                seq += 1;
                self.format
                    .parse_line(line, seq)
                    .map_err(|message| LensError::Parse {
                        lens: self.format.name().to_string(),
                        line: index + 1,
                        message,
                    })?
            };
            fragment.shift(offset);

            records.push(Record {
                leading: std::mem::take(&mut leading),
                text: line.to_string(),
                fragment,
            });
            offset += raw.len();
        }

        Ok(Layout {
            records,
            trailer: leading,
            final_newline: text.is_empty() || text.ends_with('\n'),
        })
    }

    fn render_record(&self, fragment: &Fragment) -> Result<String, LensError> {
        if fragment.label == COMMENT {
            if !fragment.children.is_empty() {
                return Err(LensError::put(
                    self.format.name(),
                    COMMENT,
                    "comments cannot have children",
                ));
            }
            if fragment.value.as_deref().is_some_and(|v| v.contains('\n')) {
                return Err(LensError::put(
                    self.format.name(),
                    COMMENT,
                    "comments must fit on one line",
                ));
            }
            return Ok(match fragment.value.as_deref() {
                Some(v) if !v.is_empty() => format!("# {}", v),
                _ => "#".to_string(),
            });
        }
        self.format.render(fragment)
    }
}

impl<F: LineFormat> Lens for LineLens<F> {
    fn name(&self) -> &'static str {
        self.format.name()
    }

    fn default_includes(&self) -> &'static [&'static str] {
        self.format.default_includes()
    }

    fn get(&self, text: &str) -> Result<Vec<Fragment>, LensError> {
        let layout = self.parse(text)?;
        log::trace!(
            "{}: parsed {} record(s)",
            self.format.name(),
            layout.records.len()
        );
        Ok(layout.records.into_iter().map(|r| r.fragment).collect())
    }

    fn put(&self, tree: &[Fragment], original: Option<&str>) -> Result<String, LensError> {
        // An original the lens cannot parse contributes no formatting.
        let layout = match original.map(|text| self.parse(text)) {
            Some(Ok(layout)) => layout,
            Some(Err(e)) => {
                log::debug!("{}: ignoring unparsable original: {}", self.format.name(), e);
                Layout {
                    records: Vec::new(),
                    trailer: String::new(),
                    final_newline: true,
                }
            }
            None => Layout {
                records: Vec::new(),
                trailer: String::new(),
                final_newline: true,
            },
        };

        let mut used = vec![false; layout.records.len()];
        let mut out = String::new();
        for fragment in tree {
            let reusable = layout
                .records
                .iter()
                .enumerate()
                .find(|(i, r)| !used[*i] && r.fragment.same_content(fragment))
                .map(|(i, _)| i);
            match reusable {
                Some(i) => {
                    used[i] = true;
                    let record = &layout.records[i];
                    out.push_str(&record.leading);
                    out.push_str(&record.text);
                }
                None => out.push_str(&self.render_record(fragment)?),
            }
            out.push('\n');
        }
        out.push_str(&layout.trailer);

        if !layout.final_newline && layout.trailer.is_empty() && out.ends_with('\n') {
            out.pop();
        }
        Ok(out)
    }
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

fn comment_fragment(line: &str) -> Fragment {
    let hash = line.len() - line.trim_start().len();
    let body = &line[hash + 1..];
    let start = hash + 1 + (body.len() - body.trim_start().len());
    let value = body.trim();
    Fragment::new(COMMENT)
        .with_value(value)
        .with_span(FragmentSpan {
            label: hash..hash + 1,
            value: start..start + value.len(),
            span: 0..line.len(),
        })
}

/// Span helper for formats: the byte range of `part` inside `line`.
pub fn range_of(line: &str, part: &str) -> std::ops::Range<usize> {
    use nom::Offset;
    let start = line.offset(part);
    start..start + part.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Each record is a bare word.
    #[derive(Debug)]
    struct Words;

    impl LineFormat for Words {
        fn name(&self) -> &'static str {
            "Words"
        }

        fn parse_line(&self, line: &str, _seq: usize) -> Result<Fragment, String> {
            let word = line.trim();
            if word.contains(' ') {
                return Err("expected a single word".into());
            }
            Ok(Fragment::new(word).with_span(FragmentSpan {
                label: range_of(line, word),
                value: 0..0,
                span: 0..line.len(),
            }))
        }

        fn render(&self, fragment: &Fragment) -> Result<String, LensError> {
            Ok(fragment.label.clone())
        }
    }

    #[test]
    fn test_round_trip_preserves_layout() {
        let lens = LineLens::new(Words);
        for text in [
            "",
            "\n\n",
            "a\n",
            "a",
            "  a  \n\n# note\n\n\nb\n\n",
            "a\n\nb",
        ] {
            let tree = lens.get(text).unwrap();
            assert_eq!(lens.put(&tree, Some(text)).unwrap(), text, "text: {:?}", text);
        }
    }

    #[test]
    fn test_comments_and_spans() {
        let lens = LineLens::new(Words);
        let tree = lens.get("a\n  #  hello \nb\n").unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree[1].label, COMMENT);
        assert_eq!(tree[1].value.as_deref(), Some("hello"));
        let span = tree[1].span.clone().unwrap();
        assert_eq!(span.span, 2..13);
        assert_eq!(span.value, 7..12);
        assert_eq!(tree[2].span.clone().unwrap().label, 14..15);
    }

    #[test]
    fn test_put_renders_new_and_drops_removed() {
        let lens = LineLens::new(Words);
        let original = "  a\n\nb\n";
        let mut tree = lens.get(original).unwrap();
        tree.remove(1);
        tree.push(Fragment::new("c"));
        tree.push(Fragment::new(COMMENT).with_value("end"));
        assert_eq!(lens.put(&tree, Some(original)).unwrap(), "  a\nc\n# end\n");
    }

    #[test]
    fn test_put_rejects_multiline_comment() {
        let lens = LineLens::new(Words);
        let tree = vec![Fragment::new(COMMENT).with_value("one\ntwo")];
        assert!(matches!(lens.put(&tree, None), Err(LensError::Put { .. })));
    }

    #[test]
    fn test_parse_error_reports_line() {
        let lens = LineLens::new(Words);
        match lens.get("ok\n\ntwo words\n") {
            Err(LensError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
