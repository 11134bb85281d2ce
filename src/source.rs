//! Templates file discovery and loading
//!
//! Candidate files are tried in priority order:
//! 1. The path in `XHS_TEMPLATES_PATH`, if set and non-blank
//! 2. `xhs-templates.json`, `xhs-vision.templates.json`, `.xhs-templates.json`
//!    in the working directory
//! 3. `templates/xhs-templates.json` in the working directory
//! 4. `templates/xhs-templates.json` under the root directory
//!
//! The first candidate that can be read, parsed, validated and resolved wins.
//! When none does, the built-in configuration is used.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::{LoadedTemplates, ResolutionCache, TemplateSource};
use crate::error::SourceError;
use crate::template::{RawConfig, TemplateRegistry};

/// Environment variable holding an explicit templates file path
pub const TEMPLATES_PATH_ENV: &str = "XHS_TEMPLATES_PATH";

/// Subdirectory holding the bundled templates file
pub const TEMPLATES_DIR: &str = "templates";

/// File name of the bundled templates file
pub const TEMPLATES_FILE: &str = "xhs-templates.json";

/// Accepted file names in the working directory, in lookup order
pub const CONVENTIONAL_FILE_NAMES: [&str; 3] = [
    "xhs-templates.json",
    "xhs-vision.templates.json",
    ".xhs-templates.json",
];

/// Where to look for a templates file
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Root directory whose `templates/` folder is the last resort
    pub root: PathBuf,
    /// Directory searched for conventional file names
    pub working_dir: PathBuf,
    /// Environment variable consulted for an override path
    pub env_var: String,
    /// Conventional file names tried in the working directory
    pub file_names: Vec<String>,
}

impl LoaderConfig {
    /// Create a configuration rooted at `root`, searching the current directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            working_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_var: TEMPLATES_PATH_ENV.to_string(),
            file_names: CONVENTIONAL_FILE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Set the directory searched for conventional file names
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Set the environment variable consulted for an override path
    pub fn with_env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var = name.into();
        self
    }

    /// Set the conventional file names tried in the working directory
    pub fn with_file_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Override path from the environment, relative paths taken from the
    /// working directory
    pub fn override_path(&self) -> Option<PathBuf> {
        let value = env::var(&self.env_var).ok()?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(self.working_dir.join(trimmed))
    }

    /// Candidate files in priority order, without duplicates
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        let ordered = self
            .override_path()
            .into_iter()
            .chain(self.file_names.iter().map(|name| self.working_dir.join(name)))
            .chain(Some(self.working_dir.join(TEMPLATES_DIR).join(TEMPLATES_FILE)))
            .chain(Some(self.root.join(TEMPLATES_DIR).join(TEMPLATES_FILE)));

        for path in ordered {
            if !candidates.contains(&path) {
                candidates.push(path);
            }
        }
        debug!(count = candidates.len(), "LoaderConfig::candidates");
        candidates
    }
}

/// Try each candidate in order and return the first success
///
/// Errors are discarded; `None` means every attempt failed.
pub fn first_success<I, T, E, F>(candidates: I, mut attempt: F) -> Option<T>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Result<T, E>,
{
    candidates.into_iter().find_map(|candidate| attempt(candidate).ok())
}

/// Identity and change token of a templates file
pub fn stat_file(path: &Path) -> Result<TemplateSource, SourceError> {
    let io_err = |source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    };
    let metadata = fs::metadata(path).map_err(io_err)?;
    let modified = metadata.modified().map_err(io_err)?;
    Ok(TemplateSource::File {
        path: path.to_path_buf(),
        modified,
    })
}

/// Read, validate and resolve one templates file, bypassing any cache
pub fn load_file(path: &Path) -> Result<LoadedTemplates, SourceError> {
    let source = stat_file(path)?;
    let config = read_config(path)?;
    resolve_config(path, source, config)
}

/// Read and validate a templates file without resolving it
fn read_config(path: &Path) -> Result<RawConfig, SourceError> {
    debug!(?path, "read_config: called");
    let content = fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    RawConfig::from_json(&content).map_err(|source| SourceError::Invalid {
        path: path.to_path_buf(),
        source,
    })
}

fn resolve_config(path: &Path, origin: TemplateSource, config: RawConfig) -> Result<LoadedTemplates, SourceError> {
    let registry = TemplateRegistry::from_config(&config).map_err(|source| SourceError::Resolution {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(LoadedTemplates::new(origin, config, registry))
}

/// Loads templates from the first usable candidate file
#[derive(Debug, Clone)]
pub struct TemplateLoader {
    config: LoaderConfig,
}

impl TemplateLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load resolved templates, reusing the cached ones when the winning
    /// source is unchanged
    ///
    /// A candidate is read and validated on every call; only resolution is
    /// skipped on a cache hit. Never fails: if no candidate is usable the
    /// built-in configuration is returned. Unlike a fresh fallback on every
    /// call, a repeated fallback returns the cached built-in set.
    pub fn load(&self, cache: &mut ResolutionCache) -> Arc<LoadedTemplates> {
        let candidates = self.config.candidates();
        let found = first_success(candidates, |path| {
            self.load_candidate(&path, cache).inspect_err(|e| {
                if e.is_missing() {
                    debug!(?path, "load: no templates file");
                } else {
                    warn!(path = %path.display(), error = %e, "Ignoring templates file");
                }
            })
        });

        found.unwrap_or_else(|| self.load_builtin(cache))
    }

    fn load_candidate(
        &self,
        path: &Path,
        cache: &mut ResolutionCache,
    ) -> Result<Arc<LoadedTemplates>, SourceError> {
        let source = stat_file(path)?;
        let config = read_config(path)?;
        if let Some(cached) = cache.lookup(&source) {
            debug!(?path, "load_candidate: cache hit");
            return Ok(cached);
        }

        let loaded = resolve_config(path, source, config)?;
        info!(path = %path.display(), templates = loaded.registry().len(), "Loaded templates");
        Ok(cache.replace(loaded))
    }

    fn load_builtin(&self, cache: &mut ResolutionCache) -> Arc<LoadedTemplates> {
        if let Some(cached) = cache.lookup(&TemplateSource::Builtin) {
            debug!("load_builtin: cache hit");
            return cached;
        }

        let config = RawConfig::builtin();
        let registry = TemplateRegistry::from_config(&config).unwrap_or_else(|e| {
            warn!(error = %e, "Built-in templates failed to resolve");
            TemplateRegistry::new()
        });
        info!(root = %self.config.root.display(), "No templates file found, using built-in defaults");
        cache.replace(LoadedTemplates::new(TemplateSource::Builtin, config, registry))
    }
}
