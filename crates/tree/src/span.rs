use std::ops::Range;

/// Byte-offset provenance of a node in the file it was parsed from.
///
/// All ranges are half-open. An empty `value` range marks a node whose value
/// did not come from the text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Span {
    pub filename: String,
    pub label: Range<usize>,
    pub value: Range<usize>,
    pub span: Range<usize>,
}

impl Span {
    pub fn new(filename: impl Into<String>, span: Range<usize>) -> Self {
        Self {
            filename: filename.into(),
            label: span.start..span.start,
            value: span.start..span.start,
            span,
        }
    }

    pub fn with_label(mut self, label: Range<usize>) -> Self {
        self.label = label;
        self
    }

    pub fn with_value(mut self, value: Range<usize>) -> Self {
        self.value = value;
        self
    }

    /// Moves every range by `offset` bytes, for fragments parsed out of a larger text.
    pub fn shifted(mut self, offset: usize) -> Self {
        let shift = |r: &Range<usize>| (r.start + offset)..(r.end + offset);
        self.label = shift(&self.label);
        self.value = shift(&self.value);
        self.span = shift(&self.span);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_shift() {
        let span = Span::new("/etc/hosts", 10..30)
            .with_label(10..15)
            .with_value(16..29)
            .shifted(5);
        assert_eq!(span.span, 15..35);
        assert_eq!(span.label, 15..20);
        assert_eq!(span.value, 21..34);
        assert_eq!(span.filename, "/etc/hosts");
    }
}
