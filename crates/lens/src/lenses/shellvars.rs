//! Shell-style `KEY=value` assignments, as in `/etc/environment`.

use crate::error::LensError;
use crate::fragment::{Fragment, FragmentSpan};
use crate::lines::{LineFormat, range_of};
use nom::{
    IResult, Parser,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, space0},
    combinator::{recognize, rest},
    sequence::pair,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct Shellvars;

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn variable_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(take_while1(is_name_start), take_while(is_name_char))).parse(input)
}

fn assignment(line: &str) -> IResult<&str, (&str, &str)> {
    let (i, (_, key, _, value)) = (space0, variable_name, char('='), rest).parse(line)?;
    Ok((i, (key, value.trim_end())))
}

impl LineFormat for Shellvars {
    fn name(&self) -> &'static str {
        "Shellvars"
    }

    fn default_includes(&self) -> &'static [&'static str] {
        &["/etc/environment", "/etc/default/*"]
    }

    fn parse_line(&self, line: &str, _seq: usize) -> Result<Fragment, String> {
        let (_, (key, value)) =
            assignment(line).map_err(|_| format!("expected 'NAME=value', found '{}'", line))?;
        Ok(Fragment::new(key).with_value(value).with_span(FragmentSpan {
            label: range_of(line, key),
            value: range_of(line, value),
            span: 0..line.len(),
        }))
    }

    fn render(&self, fragment: &Fragment) -> Result<String, LensError> {
        let key = &fragment.label;
        let valid = key.starts_with(is_name_start) && key.chars().all(is_name_char);
        if !valid {
            return Err(LensError::put(self.name(), key, "not a valid shell variable name"));
        }
        if !fragment.children.is_empty() {
            return Err(LensError::put(self.name(), key, "variables cannot have children"));
        }
        let value = fragment.value.as_deref().unwrap_or_default();
        if value.contains('\n') {
            return Err(LensError::put(self.name(), key, "values must fit on one line"));
        }
        Ok(format!("{}={}", key, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens::Lens;
    use crate::lines::LineLens;

    #[test]
    fn test_get_keeps_quotes() {
        let lens = LineLens::new(Shellvars);
        let tree = lens
            .get("PATH=\"/usr/bin:/bin\"\nLANG=C.UTF-8\n")
            .unwrap();
        assert_eq!(tree[0].label, "PATH");
        assert_eq!(tree[0].value.as_deref(), Some("\"/usr/bin:/bin\""));
        assert_eq!(tree[1].value.as_deref(), Some("C.UTF-8"));
    }

    #[test]
    fn test_rejects_spaces_around_equals() {
        let lens = LineLens::new(Shellvars);
        assert!(lens.get("A = b\n").is_err());
        assert!(lens.get("1A=b\n").is_err());
    }

    #[test]
    fn test_put_new_variable() {
        let lens = LineLens::new(Shellvars);
        let original = "A=1\n";
        let mut tree = lens.get(original).unwrap();
        tree.push(Fragment::new("B").with_value("two words"));
        assert_eq!(lens.put(&tree, Some(original)).unwrap(), "A=1\nB=two words\n");
    }

    #[test]
    fn test_put_rejects_multiline_value() {
        let lens = LineLens::new(Shellvars);
        let original = "A=1\n";
        let mut tree = lens.get(original).unwrap();
        tree[0].value = Some("1\nB=2".into());
        assert!(matches!(lens.put(&tree, Some(original)), Err(LensError::Put { .. })));
    }
}
