//! Engine configuration: the root directory, the lens load path and the
//! behavior flags, all fixed when a handle is opened.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::path::PathBuf;

/// Environment variable naming the default root directory.
pub const ROOT_ENV: &str = "TREELENS_ROOT";
/// Environment variable holding extra load path entries, separated by `:`.
pub const LENS_LIB_ENV: &str = "TREELENS_LENS_LIB";
/// Load path entry appended unless [`Flags::NO_STDINC`] is set.
pub const STANDARD_LENS_DIR: &str = "/usr/share/treelens/lenses";

/// Behavior flags for [`Engine::open`](crate::Engine::open).
///
/// The bit values are stable and shared with the integer-code binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flags(u32);

impl Flags {
    pub const NONE: Flags = Flags(0);
    /// Keep the original file as `<file>.augsave` when saving.
    pub const SAVE_BACKUP: Flags = Flags(1);
    /// Write changes to `<file>.augnew` instead of the file itself.
    pub const SAVE_NEWFILE: Flags = Flags(2);
    /// Accepted and recorded; lenses are not type checked.
    pub const TYPE_CHECK: Flags = Flags(4);
    /// Do not add the standard lens directory to the load path.
    pub const NO_STDINC: Flags = Flags(8);
    /// Compute what a save would write without writing anything.
    pub const SAVE_NOOP: Flags = Flags(16);
    /// Do not load files at open.
    pub const NO_LOAD: Flags = Flags(32);
    /// Do not set up transforms for the built-in lenses.
    pub const NO_MODL_AUTOLOAD: Flags = Flags(64);
    /// Record spans for every loaded node.
    pub const ENABLE_SPAN: Flags = Flags(128);

    pub const fn from_bits(bits: u32) -> Self {
        Flags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Flags) {
        self.0 |= rhs.0;
    }
}

/// How [`Engine::save`](crate::Engine::save) treats the files it writes.
/// The current mode lives in the tree at `/augeas/save`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveMode {
    #[default]
    Overwrite,
    Backup,
    NewFile,
    Noop,
}

impl SaveMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SaveMode::Overwrite => "overwrite",
            SaveMode::Backup => "backup",
            SaveMode::NewFile => "newfile",
            SaveMode::Noop => "noop",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "overwrite" => Some(SaveMode::Overwrite),
            "backup" => Some(SaveMode::Backup),
            "newfile" => Some(SaveMode::NewFile),
            "noop" => Some(SaveMode::Noop),
            _ => None,
        }
    }

    /// The mode selected by the `SAVE_*` flags. `SAVE_NOOP` wins over
    /// `SAVE_NEWFILE`, which wins over `SAVE_BACKUP`.
    pub fn from_flags(flags: Flags) -> Self {
        if flags.contains(Flags::SAVE_NOOP) {
            SaveMode::Noop
        } else if flags.contains(Flags::SAVE_NEWFILE) {
            SaveMode::NewFile
        } else if flags.contains(Flags::SAVE_BACKUP) {
            SaveMode::Backup
        } else {
            SaveMode::Overwrite
        }
    }
}

impl fmt::Display for SaveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to open an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub root: PathBuf,
    /// Recorded under `/augeas/loadpath`; lens modules are built in.
    pub loadpath: Vec<PathBuf>,
    pub flags: Flags,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
            loadpath: Vec::new(),
            flags: Flags::NONE,
        }
    }
}

impl EngineConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Defaults overridden by `TREELENS_ROOT` and `TREELENS_LENS_LIB`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(root) = std::env::var(ROOT_ENV)
            && !root.is_empty()
        {
            config.root = PathBuf::from(root);
        }
        if let Ok(lib) = std::env::var(LENS_LIB_ENV) {
            config.loadpath = split_loadpath(&lib);
        }
        config
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Appends the entries of a `:`-separated load path.
    pub fn with_loadpath(mut self, loadpath: &str) -> Self {
        self.loadpath.extend(split_loadpath(loadpath));
        self
    }

    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    /// The load path as recorded in the tree: configured entries first, then
    /// the standard directory unless `NO_STDINC` is set.
    pub fn effective_loadpath(&self) -> Vec<PathBuf> {
        let mut paths = self.loadpath.clone();
        if !self.flags.contains(Flags::NO_STDINC) {
            paths.push(PathBuf::from(STANDARD_LENS_DIR));
        }
        paths
    }
}

fn split_loadpath(loadpath: &str) -> Vec<PathBuf> {
    loadpath
        .split(':')
        .filter(|entry| !entry.is_empty())
        .map(PathBuf::from)
        .collect()
}
