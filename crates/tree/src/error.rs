use crate::NodeId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Node {0} no longer exists")]
    StaleNode(NodeId),

    #[error("Invalid label '{0}': labels must be non-empty and must not contain '/'")]
    InvalidLabel(String),

    #[error("The root node cannot have siblings")]
    RootSibling,

    #[error("The root node cannot be {0}")]
    RootOperation(&'static str),

    #[error("Cannot move a node into its own subtree")]
    Cycle,
}

/// Checks that `label` can name a node.
pub fn validate_label(label: &str) -> Result<(), TreeError> {
    if label.is_empty() || label.contains('/') {
        return Err(TreeError::InvalidLabel(label.to_string()));
    }
    Ok(())
}
