use crate::error::LensError;
use crate::fragment::Fragment;
use std::fmt::Debug;

/// A bidirectional transformation between file text and tree fragments.
///
/// For every text `t` the lens accepts, `put(&get(t)?, Some(t))` must
/// reproduce `t` byte for byte.
pub trait Lens: Send + Sync + Debug {
    /// Module name, e.g. `Hosts`. Transforms refer to it as `Hosts.lns`.
    fn name(&self) -> &'static str;

    /// Files the lens is applied to when no transform is configured explicitly.
    fn default_includes(&self) -> &'static [&'static str] {
        &[]
    }

    /// Parses `text` into top-level fragments with spans relative to `text`.
    fn get(&self, text: &str) -> Result<Vec<Fragment>, LensError>;

    /// Renders `tree`, reusing the formatting of `original` where the
    /// content did not change.
    fn put(&self, tree: &[Fragment], original: Option<&str>) -> Result<String, LensError>;
}
