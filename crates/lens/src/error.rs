use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LensError {
    #[error("{lens}: parse error on line {line}: {message}")]
    Parse {
        lens: String,
        line: usize,
        message: String,
    },

    #[error("{lens}: cannot write node '{label}': {message}")]
    Put {
        lens: String,
        label: String,
        message: String,
    },

    #[error("Lens '{0}' does not exist")]
    Unknown(String),
}

impl LensError {
    pub fn put(lens: &str, label: &str, message: impl Into<String>) -> Self {
        LensError::Put {
            lens: lens.to_string(),
            label: label.to_string(),
            message: message.into(),
        }
    }
}
