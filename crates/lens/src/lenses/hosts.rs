//! `/etc/hosts`: one numbered entry per line.
//!
//! ```text
//! 127.0.0.1  localhost localhost.localdomain  # loopback
//! ```
//!
//! becomes a node labeled with the entry's sequence number and children
//! `ipaddr`, `canonical`, zero or more `alias`, and an optional `#comment`.

use crate::error::LensError;
use crate::fragment::{Fragment, FragmentSpan};
use crate::lines::{COMMENT, LineFormat, range_of};
use nom::{
    IResult, Parser,
    bytes::complete::take_till1,
    character::complete::{char, space0, space1},
    combinator::{opt, rest},
    multi::many0,
    sequence::preceded,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct Hosts;

struct Entry<'a> {
    ipaddr: &'a str,
    canonical: &'a str,
    aliases: Vec<&'a str>,
    comment: Option<&'a str>,
}

fn word(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c.is_whitespace() || c == '#').parse(input)
}

fn entry(line: &str) -> IResult<&str, Entry<'_>> {
    let (input, (_, ipaddr, _, canonical, aliases, _, comment)) = (
        space0,
        word,
        space1,
        word,
        many0(preceded(space1, word)),
        space0,
        opt(preceded(char('#'), rest)),
    )
        .parse(line)?;
    Ok((
        input,
        Entry {
            ipaddr,
            canonical,
            aliases,
            comment,
        },
    ))
}

fn leaf(line: &str, label: &str, value: &str) -> Fragment {
    Fragment::new(label).with_value(value).with_span(FragmentSpan {
        label: 0..0,
        value: range_of(line, value),
        span: range_of(line, value),
    })
}

impl LineFormat for Hosts {
    fn name(&self) -> &'static str {
        "Hosts"
    }

    fn default_includes(&self) -> &'static [&'static str] {
        &["/etc/hosts"]
    }

    fn parse_line(&self, line: &str, seq: usize) -> Result<Fragment, String> {
        let (remaining, entry) = entry(line)
            .map_err(|_| format!("expected 'address name [alias...]', found '{}'", line))?;
        if !remaining.trim().is_empty() {
            return Err(format!("unexpected text '{}'", remaining.trim()));
        }

        let mut record = Fragment::new(seq.to_string())
            .with_child(leaf(line, "ipaddr", entry.ipaddr))
            .with_child(leaf(line, "canonical", entry.canonical));
        for alias in entry.aliases {
            record = record.with_child(leaf(line, "alias", alias));
        }
        if let Some(body) = entry.comment {
            let text = body.trim();
            let hash = range_of(line, body).start - 1;
            let value = if text.is_empty() {
                hash + 1..hash + 1
            } else {
                range_of(line, text)
            };
            record = record.with_child(Fragment::new(COMMENT).with_value(text).with_span(
                FragmentSpan {
                    label: hash..hash + 1,
                    value,
                    span: hash..line.len(),
                },
            ));
        }

        Ok(record.with_span(FragmentSpan {
            label: 0..0,
            value: 0..0,
            span: 0..line.len(),
        }))
    }

    fn render(&self, fragment: &Fragment) -> Result<String, LensError> {
        let label = fragment.label.as_str();
        let fail = |message: &str| LensError::put(self.name(), label, message);

        if label.is_empty() || !label.bytes().all(|b| b.is_ascii_digit()) {
            return Err(fail("host entries must be numbered"));
        }

        let mut fields = Vec::new();
        let mut comment = None;
        for (index, child) in fragment.children.iter().enumerate() {
            let value = child.value.as_deref().unwrap_or("");
            let expected = match index {
                0 => child.label == "ipaddr",
                1 => child.label == "canonical",
                _ => comment.is_none() && (child.label == "alias" || child.label == COMMENT),
            };
            if !expected {
                return Err(fail(&format!("unexpected child '{}'", child.label)));
            }
            if !child.children.is_empty() {
                return Err(fail(&format!("'{}' cannot have children", child.label)));
            }
            if child.label == COMMENT {
                if value.contains('\n') {
                    return Err(fail("comments must fit on one line"));
                }
                comment = Some(value);
                continue;
            }
            if value.is_empty() || value.contains(|c: char| c.is_whitespace() || c == '#') {
                return Err(fail(&format!("invalid {} '{}'", child.label, value)));
            }
            fields.push(value);
        }
        if fields.len() < 2 {
            return Err(fail("an entry needs an ipaddr and a canonical name"));
        }

        let mut line = format!("{}\t{}", fields[0], fields[1]);
        for alias in &fields[2..] {
            line.push(' ');
            line.push_str(alias);
        }
        match comment {
            Some(text) if !text.is_empty() => line.push_str(&format!(" # {}", text)),
            Some(_) => line.push_str(" #"),
            None => {}
        }
        Ok(line)
    }
}
