//! File providers for the treelens engine.
//!
//! This crate provides the on-disk implementation of the `FileProvider`
//! trait from treelens-traits.
//!
//! ## Available Providers
//!
//! - [`FilesystemFileProvider`]: Reads and writes files below a root directory
//!
//! ## Re-exports
//!
//! For convenience, we also re-export the in-memory provider from treelens-traits:
//! - [`InMemoryFileProvider`]: Pre-populated in-memory storage

mod filesystem;

pub use filesystem::FilesystemFileProvider;

// Re-export the in-memory provider from treelens-traits for convenience
pub use treelens_traits::InMemoryFileProvider;
