//! Resolved templates and the cache that keeps them between loads
//!
//! A [`LoadedTemplates`] is the result of one successful load: where it came
//! from, the raw configuration, and the resolved registry. The
//! [`ResolutionCache`] holds the most recent one and hands out shared
//! read-only handles. It is replaced wholesale, never patched.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::debug;

use crate::template::{
    Defaults, RawConfig, ResolvedTemplate, TemplateRegistry, BUILTIN_TEMPLATE,
    DEFAULT_ASPECT_RATIO,
};

/// Where a set of templates was loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// A templates file and its modification time when it was read
    File { path: PathBuf, modified: SystemTime },
    /// The built-in configuration; no file was usable
    Builtin,
}

impl TemplateSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            TemplateSource::File { path, .. } => Some(path),
            TemplateSource::Builtin => None,
        }
    }

    /// Change token of the source
    pub fn modified(&self) -> Option<SystemTime> {
        match self {
            TemplateSource::File { modified, .. } => Some(*modified),
            TemplateSource::Builtin => None,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, TemplateSource::Builtin)
    }
}

impl fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateSource::File { path, .. } => write!(f, "{}", path.display()),
            TemplateSource::Builtin => write!(f, "built-in defaults"),
        }
    }
}

/// One successfully loaded and resolved templates configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedTemplates {
    source: TemplateSource,
    config: RawConfig,
    registry: TemplateRegistry,
}

impl LoadedTemplates {
    pub fn new(source: TemplateSource, config: RawConfig, registry: TemplateRegistry) -> Self {
        Self {
            source,
            config,
            registry,
        }
    }

    /// Provenance of these templates
    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    /// Path of the file actually used, `None` for the built-in defaults
    pub fn source_path(&self) -> Option<&Path> {
        self.source.path()
    }

    pub fn config(&self) -> &RawConfig {
        &self.config
    }

    pub fn defaults(&self) -> &Defaults {
        &self.config.defaults
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Look up a resolved template by exact name
    pub fn get(&self, name: &str) -> Option<&ResolvedTemplate> {
        self.registry.get(name)
    }

    /// All template names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.registry.names()
    }

    /// The configured default template name, else the built-in one
    pub fn default_template_name(&self) -> &str {
        self.config
            .defaults
            .template
            .as_deref()
            .unwrap_or(BUILTIN_TEMPLATE)
    }

    /// Look up a template, falling back to the default template name
    ///
    /// Tries `requested`, then `defaults.template`, then `lifestyle`.
    pub fn select(&self, requested: Option<&str>) -> Option<&ResolvedTemplate> {
        requested
            .into_iter()
            .chain(self.config.defaults.template.as_deref())
            .chain(Some(BUILTIN_TEMPLATE))
            .find_map(|name| self.get(name))
    }

    /// Aspect ratio for a template: its own, the configured default, or 3:4
    pub fn aspect_ratio_for<'a>(&'a self, template: &'a ResolvedTemplate) -> &'a str {
        template
            .aspect_ratio
            .as_deref()
            .or(self.config.defaults.aspect_ratio.as_deref())
            .unwrap_or(DEFAULT_ASPECT_RATIO)
    }
}

/// Holds the most recently loaded templates for the life of the process
#[derive(Debug, Default)]
pub struct ResolutionCache {
    current: Option<Arc<LoadedTemplates>>,
}

impl ResolutionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Arc<LoadedTemplates>> {
        self.current.as_ref()
    }

    /// The cached templates if they came from exactly `source`
    ///
    /// A file source matches only when both the path and the modification
    /// time are equal.
    pub fn lookup(&self, source: &TemplateSource) -> Option<Arc<LoadedTemplates>> {
        self.current
            .as_ref()
            .filter(|cached| cached.source() == source)
            .cloned()
    }

    /// Replace the cached templates, returning the new shared handle
    pub fn replace(&mut self, loaded: LoadedTemplates) -> Arc<LoadedTemplates> {
        debug!(source = %loaded.source(), templates = loaded.registry().len(), "ResolutionCache::replace");
        let loaded = Arc::new(loaded);
        self.current = Some(Arc::clone(&loaded));
        loaded
    }
}
