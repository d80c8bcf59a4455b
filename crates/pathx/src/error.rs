use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    #[error("Parse error in '{expression}' at offset {position}: {message}")]
    Parse {
        expression: String,
        message: String,
        position: usize,
    },

    #[error("Function '{function}' error: {message}")]
    FunctionError { function: String, message: String },

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Variable '{0}' not found")]
    UnknownVariable(String),

    #[error("Invalid regular expression '{pattern}': {message}")]
    InvalidRegexp { pattern: String, message: String },

    #[error("Cannot create nodes for '{expression}': {message}")]
    NotCreatable { expression: String, message: String },
}

impl PathError {
    pub fn parse(expression: &str, position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            expression: expression.to_string(),
            message: message.into(),
            position,
        }
    }

    pub fn function(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FunctionError {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Short description of the failure, without the expression text.
    pub fn minor(&self) -> String {
        match self {
            PathError::Parse { message, .. } => message.clone(),
            PathError::FunctionError { function, message } => format!("{}: {}", function, message),
            PathError::TypeError(message) => message.clone(),
            PathError::UnknownVariable(name) => format!("undefined variable ${}", name),
            PathError::InvalidRegexp { message, .. } => format!("invalid regexp: {}", message),
            PathError::NotCreatable { message, .. } => message.clone(),
        }
    }

    /// The expression with a `|=|` marker where parsing stopped.
    pub fn details(&self) -> Option<String> {
        match self {
            PathError::Parse {
                expression,
                position,
                ..
            } => {
                let at = clamp_to_char_boundary(expression, *position);
                Some(format!("{}|=|{}", &expression[..at], &expression[at..]))
            }
            _ => None,
        }
    }
}

fn clamp_to_char_boundary(s: &str, mut index: usize) -> usize {
    index = index.min(s.len());
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_details_marks_position() {
        let err = PathError::parse("/a/b[", 4, "unterminated predicate");
        assert_eq!(err.details().as_deref(), Some("/a/b|=|["));
        assert_eq!(err.minor(), "unterminated predicate");
    }

    #[test]
    fn test_details_only_for_parse_errors() {
        let err = PathError::UnknownVariable("x".into());
        assert!(err.details().is_none());
        assert_eq!(err.minor(), "undefined variable $x");
    }
}
