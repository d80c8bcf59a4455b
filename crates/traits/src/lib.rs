pub mod provider;

pub use provider::{FileError, FileProvider, InMemoryFileProvider, normalize_path};
