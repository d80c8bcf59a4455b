//! Files that are plain lists, one entry per line, such as `/etc/shells`.

use crate::error::LensError;
use crate::fragment::{Fragment, FragmentSpan};
use crate::lines::{LineFormat, range_of};

#[derive(Debug, Default, Clone, Copy)]
pub struct Simplelines;

impl LineFormat for Simplelines {
    fn name(&self) -> &'static str {
        "Simplelines"
    }

    fn default_includes(&self) -> &'static [&'static str] {
        &["/etc/shells"]
    }

    fn parse_line(&self, line: &str, seq: usize) -> Result<Fragment, String> {
        let value = line.trim();
        Ok(Fragment::new(seq.to_string())
            .with_value(value)
            .with_span(FragmentSpan {
                label: 0..0,
                value: range_of(line, value),
                span: 0..line.len(),
            }))
    }

    fn render(&self, fragment: &Fragment) -> Result<String, LensError> {
        let fail = |message: &str| LensError::put(self.name(), &fragment.label, message);
        if !fragment.children.is_empty() {
            return Err(fail("entries cannot have children"));
        }
        match fragment.value.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() && !v.starts_with('#') && !v.contains('\n') => {
                Ok(v.to_string())
            }
            _ => Err(fail("entries need a single-line value")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens::Lens;
    use crate::lines::LineLens;

    #[test]
    fn test_get_and_put() {
        let lens = LineLens::new(Simplelines);
        let original = "# valid login shells\n/bin/sh\n  /bin/bash\n";
        let mut tree = lens.get(original).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree[2].label, "2");
        assert_eq!(tree[2].value.as_deref(), Some("/bin/bash"));

        tree.push(Fragment::new("3").with_value("/usr/bin/zsh"));
        assert_eq!(
            lens.put(&tree, Some(original)).unwrap(),
            "# valid login shells\n/bin/sh\n  /bin/bash\n/usr/bin/zsh\n"
        );
    }

    #[test]
    fn test_put_rejects_valueless_entry() {
        let lens = LineLens::new(Simplelines);
        assert!(lens.put(&[Fragment::new("1")], None).is_err());
    }
}
