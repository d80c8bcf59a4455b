//! Path expressions over labeled configuration trees.
//!
//! The language is a small XPath dialect: location paths made of labels,
//! predicates, variables and a handful of functions. Expressions are parsed
//! once with [`parse_expression`] and evaluated against any tree that
//! implements [`TreeNode`].

pub mod ast;
pub mod axes;
pub mod engine;
pub mod error;
pub mod functions;
pub mod node;
pub mod operators;
pub mod parser;

pub use ast::{Axis, BinaryOperator, Expression, LocationPath, NodeTest, Step};
pub use engine::{EvaluationContext, PathValue, document_order, evaluate};
pub use error::PathError;
pub use functions::{compile_regexp, glob_to_regex};
pub use node::TreeNode;
pub use parser::{escape_label, parse_expression};

// Re-export test utilities for integration testing in downstream crates
pub use node::tests;
