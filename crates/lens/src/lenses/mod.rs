//! The lenses that ship with the engine.

pub mod hosts;
pub mod shellvars;
pub mod simplelines;
pub mod simplevars;

pub use hosts::Hosts;
pub use shellvars::Shellvars;
pub use simplelines::Simplelines;
pub use simplevars::Simplevars;

use crate::lens::Lens;
use crate::lines::LineLens;
use std::sync::Arc;

/// One instance of every built-in lens.
pub fn builtin() -> Vec<Arc<dyn Lens>> {
    vec![
        Arc::new(LineLens::new(Hosts)),
        Arc::new(LineLens::new(Shellvars)),
        Arc::new(LineLens::new(Simplelines)),
        Arc::new(LineLens::new(Simplevars)),
    ]
}
