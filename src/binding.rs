//! Host-facing adapters over [`Engine`].
//!
//! [`Augeas`] reports failure through booleans and `Option`s and leaves the
//! cause in [`Augeas::error`]. [`Facade`] is the same handle with integer
//! status codes for callers that expect them. Both refuse every call after
//! `close`.

use crate::config::{EngineConfig, Flags};
use crate::diagnostics::ErrorInfo;
use crate::engine::{Engine, SpanInfo};
use crate::error::EngineError;
use serde_json::{Map, Value, json};
use thiserror::Error;
use treelens_traits::FileProvider;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindingError {
    #[error("Failed to initialize: {0}")]
    Init(#[source] EngineError),

    #[error("Handle is closed")]
    Closed,

    #[error("Matching path expression '{0}' failed")]
    Match(String),
}

pub type BindingResult<T> = Result<T, BindingError>;

fn succeeded<T>(result: Result<T, EngineError>) -> bool {
    result.is_ok()
}

/// The value a host sees for a span: filename and `[start, end)` pairs,
/// or nothing at all.
fn span_record(span: Option<SpanInfo>) -> Map<String, Value> {
    let Some(span) = span else {
        return Map::new();
    };
    let range = |r: std::ops::Range<usize>| json!([r.start, r.end]);
    let mut record = Map::new();
    record.insert("filename".to_string(), Value::String(span.filename));
    record.insert("label".to_string(), range(span.label));
    record.insert("value".to_string(), range(span.value));
    record.insert("span".to_string(), range(span.span));
    record
}

#[derive(Debug)]
pub struct Augeas {
    engine: Option<Engine>,
}

impl Augeas {
    /// Opens a handle on `root`. A missing `root` or `loadpath` falls back
    /// to the environment.
    pub fn open(root: Option<&str>, loadpath: Option<&str>, flags: Flags) -> BindingResult<Self> {
        let engine = Engine::open(Self::config(root, loadpath, flags)).map_err(BindingError::Init)?;
        Ok(Self::from_engine(engine))
    }

    pub fn open_with_provider(
        root: Option<&str>,
        loadpath: Option<&str>,
        flags: Flags,
        provider: Box<dyn FileProvider>,
    ) -> BindingResult<Self> {
        let engine = Engine::open_with_provider(Self::config(root, loadpath, flags), provider)
            .map_err(BindingError::Init)?;
        Ok(Self::from_engine(engine))
    }

    fn config(root: Option<&str>, loadpath: Option<&str>, flags: Flags) -> EngineConfig {
        let mut config = EngineConfig::from_env().with_flags(flags);
        if let Some(root) = root {
            config = config.with_root(root);
        }
        if let Some(loadpath) = loadpath {
            config = config.with_loadpath(loadpath);
        }
        config
    }

    pub fn from_engine(engine: Engine) -> Self {
        Self {
            engine: Some(engine),
        }
    }

    fn engine(&mut self) -> BindingResult<&mut Engine> {
        self.engine.as_mut().ok_or(BindingError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.engine.is_none()
    }

    /// Releases the engine. Later calls fail with [`BindingError::Closed`].
    pub fn close(&mut self) -> BindingResult<()> {
        self.engine.take().ok_or(BindingError::Closed)?.close();
        Ok(())
    }

    pub fn get(&mut self, path: &str) -> BindingResult<Option<String>> {
        Ok(self.engine()?.get(path).ok().flatten())
    }

    pub fn exists(&mut self, path: &str) -> BindingResult<bool> {
        Ok(self.engine()?.exists(path).unwrap_or(false))
    }

    pub fn set(&mut self, path: &str, value: Option<&str>) -> BindingResult<bool> {
        Ok(succeeded(self.engine()?.set(path, value)))
    }

    pub fn setm(
        &mut self,
        base: &str,
        sub: Option<&str>,
        value: Option<&str>,
    ) -> BindingResult<Option<usize>> {
        Ok(self.engine()?.setm(base, sub, value).ok())
    }

    pub fn insert(&mut self, path: &str, label: &str, before: bool) -> BindingResult<bool> {
        Ok(succeeded(self.engine()?.insert(path, label, before)))
    }

    pub fn mv(&mut self, src: &str, dst: &str) -> BindingResult<bool> {
        Ok(succeeded(self.engine()?.mv(src, dst)))
    }

    pub fn rm(&mut self, path: &str) -> BindingResult<Option<usize>> {
        Ok(self.engine()?.rm(path).ok())
    }

    /// Paths matching `path`. A bad expression is an error here rather than
    /// an empty list.
    pub fn match_paths(&mut self, path: &str) -> BindingResult<Vec<String>> {
        self.engine()?
            .match_paths(path)
            .map_err(|_| BindingError::Match(path.to_string()))
    }

    pub fn save(&mut self) -> BindingResult<bool> {
        Ok(succeeded(self.engine()?.save()))
    }

    pub fn load(&mut self) -> BindingResult<bool> {
        Ok(succeeded(self.engine()?.load()))
    }

    pub fn defvar(&mut self, name: &str, expr: Option<&str>) -> BindingResult<bool> {
        Ok(succeeded(self.engine()?.defvar(name, expr)))
    }

    /// The number of nodes now bound to `name`, `None` on failure.
    pub fn defnode(
        &mut self,
        name: &str,
        expr: &str,
        value: Option<&str>,
    ) -> BindingResult<Option<usize>> {
        Ok(self.engine()?.defnode(name, expr, value).ok().map(|(count, _)| count))
    }

    pub fn label(&mut self, path: &str) -> BindingResult<Option<String>> {
        Ok(self.engine()?.label(path).ok().flatten())
    }

    pub fn rename(&mut self, src: &str, label: &str) -> BindingResult<Option<usize>> {
        Ok(self.engine()?.rename(src, label).ok())
    }

    pub fn text_store(&mut self, lens: &str, node: &str, path: &str) -> BindingResult<bool> {
        Ok(succeeded(self.engine()?.text_store(lens, node, path)))
    }

    pub fn text_retrieve(
        &mut self,
        lens: &str,
        node_in: &str,
        path: &str,
        node_out: &str,
    ) -> BindingResult<bool> {
        Ok(succeeded(self.engine()?.text_retrieve(lens, node_in, path, node_out)))
    }

    /// Where the node came from; an empty record when that is not known.
    pub fn span(&mut self, path: &str) -> BindingResult<Map<String, Value>> {
        Ok(span_record(self.engine()?.span(path).ok().flatten()))
    }

    pub fn error(&mut self) -> BindingResult<ErrorInfo> {
        Ok(self.engine()?.error())
    }
}

/// [`Augeas`] with integer status codes: `0` for success, `-1` for failure.
#[derive(Debug)]
pub struct Facade {
    inner: Augeas,
}

impl Facade {
    pub fn new(inner: Augeas) -> Self {
        Self { inner }
    }

    pub fn augeas(&mut self) -> &mut Augeas {
        &mut self.inner
    }

    fn status<T>(result: Result<T, EngineError>) -> i32 {
        if result.is_ok() { 0 } else { -1 }
    }

    pub fn set(&mut self, path: &str, value: Option<&str>) -> BindingResult<i32> {
        Ok(Self::status(self.inner.engine()?.set(path, value)))
    }

    pub fn save(&mut self) -> BindingResult<i32> {
        Ok(Self::status(self.inner.engine()?.save()))
    }

    /// Paths matching `path`, or `Err(-1)` for a bad expression.
    pub fn match_paths(&mut self, path: &str) -> BindingResult<Result<Vec<String>, i32>> {
        Ok(self.inner.engine()?.match_paths(path).map_err(|_| -1))
    }

    pub fn close(&mut self) -> BindingResult<()> {
        self.inner.close()
    }

    pub fn error(&mut self) -> BindingResult<ErrorInfo> {
        self.inner.error()
    }
}
