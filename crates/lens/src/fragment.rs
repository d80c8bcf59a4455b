use std::ops::Range;

/// Byte ranges of a parsed node inside its source text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FragmentSpan {
    pub label: Range<usize>,
    pub value: Range<usize>,
    pub span: Range<usize>,
}

impl FragmentSpan {
    fn shifted(&self, offset: usize) -> Self {
        let shift = |r: &Range<usize>| (r.start + offset)..(r.end + offset);
        Self {
            label: shift(&self.label),
            value: shift(&self.value),
            span: shift(&self.span),
        }
    }
}

/// A detached piece of tree produced by a lens, or handed to one for writing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fragment {
    pub label: String,
    pub value: Option<String>,
    pub children: Vec<Fragment>,
    pub span: Option<FragmentSpan>,
}

impl Fragment {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_child(mut self, child: Fragment) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_span(mut self, span: FragmentSpan) -> Self {
        self.span = Some(span);
        self
    }

    /// First child labeled `label`.
    pub fn child(&self, label: &str) -> Option<&Fragment> {
        self.children.iter().find(|c| c.label == label)
    }

    /// Structural equality that ignores spans.
    pub fn same_content(&self, other: &Fragment) -> bool {
        self.label == other.label
            && self.value == other.value
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.same_content(b))
    }

    /// Moves this fragment's spans, and those of its children, by `offset` bytes.
    pub fn shift(&mut self, offset: usize) {
        if let Some(span) = &self.span {
            self.span = Some(span.shifted(offset));
        }
        for child in &mut self.children {
            child.shift(offset);
        }
    }
}
