//! Lenses: bidirectional transformations between configuration text and
//! tree fragments.
//!
//! A lens's `get` turns file text into [`Fragment`]s carrying byte spans;
//! its `put` turns (possibly edited) fragments back into text, keeping the
//! original formatting of everything that did not change.

pub mod error;
pub mod fragment;
pub mod lens;
pub mod lenses;
pub mod lines;
pub mod registry;

pub use error::LensError;
pub use fragment::{Fragment, FragmentSpan};
pub use lens::Lens;
pub use lines::{COMMENT, LineFormat, LineLens};
pub use registry::LensRegistry;
