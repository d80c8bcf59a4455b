//! Loading files into `/files` and saving them back, driven by the
//! transforms under `/augeas/load`, and the rest of the `/augeas` metadata.

use super::Engine;
use super::text::fragments_below;
use crate::config::{Flags, SaveMode};
use crate::error::EngineError;
use itertools::Itertools;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use treelens_pathx::{compile_regexp, glob_to_regex};
use treelens_tree::{NodeId, Span};

const FILES: &str = "files";
pub(super) const META: &str = "augeas";

/// A file as it was last read from or written to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoadedFile {
    pub(crate) lens: String,
    pub(crate) text: String,
}

/// One entry of `/augeas/load`: a lens and the files it applies to.
#[derive(Debug)]
struct Transform {
    name: String,
    node: NodeId,
    lens: String,
    incl: Vec<String>,
    excl: Vec<String>,
}

fn glob_regex(glob: &str) -> Option<Regex> {
    compile_regexp(&glob_to_regex(glob)).ok()
}

fn has_wildcards(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

impl Transform {
    /// Excludes without a `/` apply to the file name, others to the whole path.
    fn excludes(&self, path: &str) -> bool {
        let name = path.rsplit('/').next().unwrap_or(path);
        self.excl.iter().any(|pattern| {
            let subject = if pattern.contains('/') { path } else { name };
            glob_regex(pattern).is_some_and(|re| re.is_match(subject))
        })
    }

    fn selects(&self, path: &str) -> bool {
        self.incl
            .iter()
            .any(|pattern| glob_regex(pattern).is_some_and(|re| re.is_match(path)))
            && !self.excludes(path)
    }
}

fn file_labels(path: &str) -> Vec<&str> {
    path.split('/').filter(|p| !p.is_empty()).collect()
}

impl Engine {
    /// Builds the `/augeas` subtree for a fresh handle.
    pub(super) fn init_metadata(&mut self) -> Result<(), EngineError> {
        let root = self.config.root.display().to_string();
        let root = format!("{}/", root.trim_end_matches('/'));
        let node = self.ensure_labels(&[META, "root"])?;
        self.tree.set_value(node, Some(root))?;

        let loadpath = self.ensure_labels(&[META, "loadpath"])?;
        for entry in self.config.effective_loadpath() {
            self.tree
                .append_child(loadpath, "path", Some(entry.display().to_string()))?;
        }

        let flags = self.config.flags;
        let node = self.ensure_labels(&[META, "save"])?;
        self.tree
            .set_value(node, Some(SaveMode::from_flags(flags).to_string()))?;
        let node = self.ensure_labels(&[META, "span"])?;
        let span = if flags.contains(Flags::ENABLE_SPAN) { "enable" } else { "disable" };
        self.tree.set_value(node, Some(span.to_string()))?;

        let load = self.ensure_labels(&[META, "load"])?;
        if !flags.contains(Flags::NO_MODL_AUTOLOAD) {
            let autoload: Vec<(&'static str, &'static [&'static str])> = self
                .lenses
                .iter()
                .map(|lens| (lens.name(), lens.default_includes()))
                .filter(|(_, incl)| !incl.is_empty())
                .collect();
            for (name, incl) in autoload {
                let xfm = self.tree.append_child(load, name, None)?;
                self.tree
                    .append_child(xfm, "lens", Some(format!("{}.lns", name)))?;
                for pattern in incl {
                    self.tree.append_child(xfm, "incl", Some(pattern.to_string()))?;
                }
            }
        }

        self.ensure_labels(&[FILES])?;
        let root = self.tree.root();
        self.tree.clear_dirty(root);
        Ok(())
    }

    /// Follows `labels` from the root, creating missing nodes on the way.
    fn ensure_labels(&mut self, labels: &[&str]) -> Result<NodeId, EngineError> {
        let mut current = self.tree.root();
        for label in labels {
            current = match self.tree.child_by_label(current, label, 1) {
                Some(child) => child,
                None => self.tree.append_child(current, label, None)?,
            };
        }
        Ok(current)
    }

    fn transforms(&self) -> Vec<Transform> {
        let Some(load) = self.tree.lookup(&[META, "load"]) else {
            return Vec::new();
        };
        let values = |xfm: NodeId, label: &str| -> Vec<String> {
            self.tree
                .children(xfm)
                .iter()
                .filter(|c| self.tree.label(**c).is_ok_and(|l| l == label))
                .filter_map(|c| self.tree.value(*c).ok().flatten().map(str::to_string))
                .collect()
        };

        let mut transforms = Vec::new();
        for &xfm in self.tree.children(load) {
            let name = self.tree.label(xfm).unwrap_or_default().to_string();
            let Some(lens) = values(xfm, "lens").into_iter().next() else {
                log::warn!("transform '{}' has no lens, skipping", name);
                continue;
            };
            transforms.push(Transform {
                name,
                node: xfm,
                lens,
                incl: values(xfm, "incl"),
                excl: values(xfm, "excl"),
            });
        }
        transforms
    }

    /// Every existing file an include glob selects.
    fn expand_glob(&self, pattern: &str) -> Vec<String> {
        let mut candidates = vec![String::new()];
        for part in file_labels(pattern) {
            let mut next = Vec::new();
            for dir in &candidates {
                if !has_wildcards(part) {
                    next.push(format!("{}/{}", dir, part));
                    continue;
                }
                let Some(re) = glob_regex(part) else { continue };
                let listing = if dir.is_empty() { "/" } else { dir.as_str() };
                let Ok(entries) = self.provider.list_dir(listing) else { continue };
                next.extend(
                    entries
                        .into_iter()
                        .filter(|entry| re.is_match(entry))
                        .map(|entry| format!("{}/{}", dir, entry)),
                );
            }
            candidates = next;
        }
        candidates
            .into_iter()
            .filter(|path| self.provider.exists(path))
            .collect()
    }

    /// Records a per-file failure under `/augeas/files/<path>/error`.
    fn record_file_error(
        &mut self,
        path: &str,
        kind: &str,
        message: &str,
    ) -> Result<(), EngineError> {
        let mut labels = vec![META, FILES];
        labels.extend(file_labels(path));
        let meta = self.ensure_labels(&labels)?;
        while let Some(old) = self.tree.child_by_label(meta, "error", 1) {
            self.tree.remove(old)?;
        }
        let error = self.tree.append_child(meta, "error", Some(kind.to_string()))?;
        self.tree
            .append_child(error, "message", Some(message.to_string()))?;
        Ok(())
    }

    /// Reads every file the transforms select into `/files`, replacing what
    /// was loaded before.
    pub fn load(&mut self) -> Result<(), EngineError> {
        self.diagnostics.reset();
        let result = self.load_inner();
        self.diagnostics.track(result)
    }

    fn load_inner(&mut self) -> Result<(), EngineError> {
        let files = self.ensure_labels(&[FILES])?;
        self.tree.clear_children(files)?;
        let meta_files = self.ensure_labels(&[META, FILES])?;
        self.tree.clear_children(meta_files)?;
        self.files.clear();

        let mut selected: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for xfm in self.transforms() {
            while let Some(old) = self.tree.child_by_label(xfm.node, "error", 1) {
                self.tree.remove(old)?;
            }
            if let Err(e) = self.lenses.get(&xfm.lens) {
                log::warn!("transform '{}': {}", xfm.name, e);
                self.tree
                    .append_child(xfm.node, "error", Some(e.to_string()))?;
                continue;
            }
            let paths: Vec<String> = xfm
                .incl
                .iter()
                .flat_map(|pattern| self.expand_glob(pattern))
                .filter(|path| !xfm.excludes(path))
                .unique()
                .collect();
            for path in paths {
                selected.entry(path).or_default().push(xfm.lens.clone());
            }
        }

        let mut failed = Vec::new();
        for (path, lenses) in selected {
            if let [lens] = lenses.as_slice() {
                if let Err(e) = self.load_file(&path, lens) {
                    log::warn!("failed to load {}: {}", path, e);
                    failed.push(path);
                }
            } else {
                let e = EngineError::MultipleTransforms(path.clone());
                log::warn!("{}", e);
                self.record_file_error(&path, "mxfm_load", &e.to_string())?;
            }
        }

        let root = self.tree.root();
        self.tree.clear_dirty(root);
        log::debug!("loaded {} file(s), {} failed", self.files.len(), failed.len());
        if failed.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Load { files: failed })
        }
    }

    fn load_file(&mut self, path: &str, lens_name: &str) -> Result<(), EngineError> {
        let lens = self.lenses.get(lens_name)?;
        let tree_path = format!("/{}{}", FILES, path);

        let mut meta_labels = vec![META, FILES];
        meta_labels.extend(file_labels(path));
        let meta = self.ensure_labels(&meta_labels)?;
        self.tree.append_child(meta, "path", Some(tree_path))?;
        self.tree
            .append_child(meta, "lens", Some(format!("@{}", lens.name())))?;

        let text = match self.provider.read(path) {
            Ok(text) => text,
            Err(e) => {
                self.record_file_error(path, "read_failed", &e.to_string())?;
                return Err(e.into());
            }
        };
        let fragments = match lens.get(&text) {
            Ok(fragments) => fragments,
            Err(e) => {
                self.record_file_error(path, "parse_failed", &e.to_string())?;
                return Err(e.into());
            }
        };

        let mut labels = vec![FILES];
        labels.extend(file_labels(path));
        let node = self.ensure_labels(&labels)?;
        if let Err(e) = self.graft(node, fragments, Some(path)) {
            self.tree.clear_children(node)?;
            self.record_file_error(path, "parse_failed", &e.to_string())?;
            return Err(e);
        }
        if self.spans_enabled() {
            self.tree
                .set_span(node, Some(Span::new(path, 0..text.len())))?;
        }
        log::debug!("loaded {} with {}", path, lens.name());
        self.files.insert(
            path.to_string(),
            LoadedFile {
                lens: lens.name().to_string(),
                text,
            },
        );
        Ok(())
    }

    /// The mode from `/augeas/save`.
    fn save_mode(&self) -> Result<SaveMode, EngineError> {
        let value = self
            .tree
            .lookup(&[META, "save"])
            .and_then(|node| self.tree.value(node).ok().flatten());
        match value {
            None => Ok(SaveMode::default()),
            Some(v) => SaveMode::parse(v)
                .ok_or_else(|| EngineError::BadArgument(format!("invalid save mode '{}'", v))),
        }
    }

    /// File nodes under `/files` with the lens that writes each of them:
    /// loaded files keep their lens, new files need exactly one transform.
    fn file_nodes(&self, transforms: &[Transform]) -> Vec<(String, NodeId, String)> {
        let Some(files) = self.tree.lookup(&[FILES]) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        let mut stack: Vec<(NodeId, String)> = self
            .tree
            .children(files)
            .iter()
            .rev()
            .map(|c| (*c, format!("/{}", self.tree.label(*c).unwrap_or_default())))
            .collect();

        while let Some((node, path)) = stack.pop() {
            let selecting = transforms.iter().filter(|t| t.selects(&path)).collect_vec();
            let lens = match (self.files.get(&path), selecting.as_slice()) {
                (Some(loaded), _) => Some(loaded.lens.clone()),
                (None, [one]) => Some(one.lens.clone()),
                (None, _) => None,
            };
            if let Some(lens) = lens {
                found.push((path, node, lens));
                continue;
            }
            stack.extend(self.tree.children(node).iter().rev().map(|c| {
                let label = self.tree.label(*c).unwrap_or_default();
                (*c, format!("{}/{}", path, label))
            }));
        }
        found
    }

    /// Writes every changed file back through its lens.
    ///
    /// Files whose nodes were deleted are deleted. The files written, or
    /// that would be under the `noop` mode, are listed under
    /// `/augeas/events/saved`.
    pub fn save(&mut self) -> Result<(), EngineError> {
        self.diagnostics.reset();
        let result = self.save_inner();
        self.diagnostics.track(result)
    }

    fn save_inner(&mut self) -> Result<(), EngineError> {
        let mode = self.save_mode()?;
        let events = self.ensure_labels(&[META, "events"])?;
        self.tree.clear_children(events)?;

        let transforms = self.transforms();
        let file_nodes = self.file_nodes(&transforms);
        let present: HashSet<&str> = file_nodes.iter().map(|(p, _, _)| p.as_str()).collect();
        let deleted: Vec<String> = self
            .files
            .keys()
            .filter(|path| !present.contains(path.as_str()))
            .cloned()
            .collect();

        let mut saved = Vec::new();
        let mut failed = Vec::new();
        for (path, node, lens) in &file_nodes {
            if !self.tree.is_dirty(*node) {
                continue;
            }
            match self.save_file(path, *node, lens, mode) {
                Ok(true) => saved.push(path.clone()),
                Ok(false) => {}
                Err(e) => {
                    log::warn!("failed to save {}: {}", path, e);
                    let kind = if matches!(e, EngineError::Lens(_)) {
                        "put_failed"
                    } else {
                        "write_failed"
                    };
                    self.record_file_error(path, kind, &e.to_string())?;
                    failed.push(path.clone());
                }
            }
        }

        for path in deleted {
            match self.delete_file(&path, mode) {
                Ok(true) => saved.push(path),
                Ok(false) => {}
                Err(e) => {
                    log::warn!("failed to delete {}: {}", path, e);
                    self.record_file_error(&path, "unlink_failed", &e.to_string())?;
                    failed.push(path);
                }
            }
        }

        for path in &saved {
            self.tree
                .append_child(events, "saved", Some(format!("/{}{}", FILES, path)))?;
        }
        log::debug!("save ({}): {} file(s) saved, {} failed", mode, saved.len(), failed.len());

        if !failed.is_empty() {
            return Err(EngineError::Save { files: failed });
        }
        if matches!(mode, SaveMode::Overwrite | SaveMode::Backup) {
            let root = self.tree.root();
            self.tree.clear_dirty(root);
        }
        Ok(())
    }

    /// Writes one file; `false` when the text did not change.
    fn save_file(
        &mut self,
        path: &str,
        node: NodeId,
        lens_name: &str,
        mode: SaveMode,
    ) -> Result<bool, EngineError> {
        let lens = self.lenses.get(lens_name)?;
        let original = self.files.get(path).map(|f| f.text.as_str());
        let text = lens.put(&fragments_below(&self.tree, node), original)?;
        if original == Some(text.as_str()) {
            return Ok(false);
        }

        match mode {
            SaveMode::Overwrite => self.provider.write(path, &text)?,
            SaveMode::Backup => {
                if self.provider.exists(path) {
                    self.provider.rename(path, &format!("{}.augsave", path))?;
                }
                self.provider.write(path, &text)?;
            }
            SaveMode::NewFile => self.provider.write(&format!("{}.augnew", path), &text)?,
            SaveMode::Noop => {}
        }

        if matches!(mode, SaveMode::Overwrite | SaveMode::Backup) {
            self.files.insert(
                path.to_string(),
                LoadedFile {
                    lens: lens.name().to_string(),
                    text,
                },
            );
            self.tree.clear_dirty(node);
        }
        Ok(true)
    }

    /// Removes a loaded file whose tree is gone; `false` when the mode
    /// leaves it alone.
    fn delete_file(&mut self, path: &str, mode: SaveMode) -> Result<bool, EngineError> {
        match mode {
            SaveMode::Overwrite => self.provider.remove(path)?,
            SaveMode::Backup => self.provider.rename(path, &format!("{}.augsave", path))?,
            SaveMode::NewFile => return Ok(false),
            SaveMode::Noop => return Ok(true),
        }
        self.files.remove(path);
        Ok(true)
    }
}
