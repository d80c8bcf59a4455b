use super::Engine;
use crate::config::Flags;
use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use treelens_tree::Span;

/// Where a node came from: the file and the byte ranges of its label, its
/// value and the whole node. All ranges are half-open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanInfo {
    pub filename: String,
    pub label: Range<usize>,
    pub value: Range<usize>,
    pub span: Range<usize>,
}

impl From<&Span> for SpanInfo {
    fn from(span: &Span) -> Self {
        Self {
            filename: span.filename.clone(),
            label: span.label.clone(),
            value: span.value.clone(),
            span: span.span.clone(),
        }
    }
}

impl Engine {
    /// The source position of the node `path` selects.
    ///
    /// `Ok(None)` means no span is known, either because the handle was
    /// opened without `ENABLE_SPAN` or because the node was not loaded from a
    /// file; [`Engine::error`] then reports `NoSpan`.
    pub fn span(&mut self, path: &str) -> Result<Option<SpanInfo>, EngineError> {
        self.diagnostics.reset();
        let result = self.span_inner(path);
        let result = self.diagnostics.track(result);
        if let Ok(None) = result {
            self.diagnostics.record(&EngineError::NoSpan(path.to_string()));
        }
        result
    }

    fn span_inner(&self, path: &str) -> Result<Option<SpanInfo>, EngineError> {
        if !self.spans_enabled() {
            return Ok(None);
        }
        let node = self.select_one(path)?;
        Ok(self.tree.span(node).map(SpanInfo::from))
    }

    pub(super) fn spans_enabled(&self) -> bool {
        self.config.flags.contains(Flags::ENABLE_SPAN)
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::tests::empty_engine;
    use crate::error::ErrorCode;

    #[test]
    fn test_span_disabled() {
        let mut engine = empty_engine();
        engine.set("/a", Some("1")).unwrap();
        assert_eq!(engine.span("/a").unwrap(), None);
        assert_eq!(engine.error().code, ErrorCode::NoSpan);
    }
}
