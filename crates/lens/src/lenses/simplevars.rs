//! `key = value` files such as `/etc/sysctl.conf`.

use crate::error::LensError;
use crate::fragment::{Fragment, FragmentSpan};
use crate::lines::{LineFormat, range_of};
use nom::{
    IResult, Parser,
    bytes::complete::take_till1,
    character::complete::{char, space0},
};

#[derive(Debug, Default, Clone, Copy)]
pub struct Simplevars;

fn assignment(line: &str) -> IResult<&str, (&str, &str)> {
    let (value, (_, key, _, _, _)) = (
        space0,
        take_till1(|c: char| c.is_whitespace() || c == '='),
        space0,
        char('='),
        space0,
    )
        .parse(line)?;
    Ok(("", (key, value.trim_end())))
}

impl LineFormat for Simplevars {
    fn name(&self) -> &'static str {
        "Simplevars"
    }

    fn default_includes(&self) -> &'static [&'static str] {
        &["/etc/sysctl.conf"]
    }

    fn parse_line(&self, line: &str, _seq: usize) -> Result<Fragment, String> {
        let (_, (key, value)) =
            assignment(line).map_err(|_| format!("expected 'key = value', found '{}'", line))?;
        Ok(Fragment::new(key).with_value(value).with_span(FragmentSpan {
            label: range_of(line, key),
            value: range_of(line, value),
            span: 0..line.len(),
        }))
    }

    fn render(&self, fragment: &Fragment) -> Result<String, LensError> {
        let key = &fragment.label;
        let invalid_key = key.is_empty()
            || key.starts_with('#')
            || key.contains(|c: char| c.is_whitespace() || c == '=');
        if invalid_key {
            return Err(LensError::put(self.name(), key, "not a valid variable name"));
        }
        if !fragment.children.is_empty() {
            return Err(LensError::put(self.name(), key, "variables cannot have children"));
        }
        if fragment.value.as_deref().is_some_and(|v| v.contains('\n')) {
            return Err(LensError::put(self.name(), key, "values must fit on one line"));
        }
        Ok(match fragment.value.as_deref() {
            Some(v) if !v.is_empty() => format!("{} = {}", key, v),
            _ => format!("{} =", key),
        })
    }
}
