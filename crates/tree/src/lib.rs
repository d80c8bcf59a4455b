//! The tree store: an arena of labeled nodes with optional values, ordered
//! children, source spans and change tracking.

pub mod error;
pub mod node_ref;
pub mod span;
pub mod tree;

pub use error::{TreeError, validate_label};
pub use node_ref::NodeRef;
pub use span::Span;
pub use tree::{Node, NodeId, Tree};
