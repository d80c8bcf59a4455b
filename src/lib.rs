//! A path-addressable configuration tree.
//!
//! Files are parsed into a tree by lenses, queried and edited with path
//! expressions, and written back through the same lenses with their
//! formatting preserved. [`Engine`] is the handle; [`Augeas`] and [`Facade`]
//! adapt it for hosts that expect booleans or status codes.

pub mod binding;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;

pub use binding::{Augeas, BindingError, BindingResult, Facade};
pub use config::{EngineConfig, Flags, SaveMode};
pub use diagnostics::ErrorInfo;
pub use engine::{Engine, SpanInfo};
pub use error::{EngineError, ErrorCode};

pub use treelens_lens::{Fragment, Lens, LensRegistry};
pub use treelens_resource::{FilesystemFileProvider, InMemoryFileProvider};
pub use treelens_traits::FileProvider;
