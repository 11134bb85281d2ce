//! XHS Templates - inheritable prompt templates for image generation
//!
//! This library finds a templates file, validates it, flattens every
//! template's `extends` chain and caches the result until the file changes.
//!
//! # Example
//!
//! ```rust
//! use xhs_templates::{get_resolved_template, load_templates, ResolutionCache};
//!
//! let mut cache = ResolutionCache::new();
//! let templates = load_templates(env!("CARGO_MANIFEST_DIR"), &mut cache);
//!
//! // Unknown names fall back to the configured default template
//! let template = templates.select(Some("no-such-template")).expect("default template");
//! println!("{} from {}", template.name, templates.source());
//!
//! assert!(get_resolved_template(&templates, "no-such-template").is_none());
//! ```

pub mod cache;
pub mod error;
pub mod source;
pub mod template;

use std::path::PathBuf;
use std::sync::Arc;

pub use cache::{LoadedTemplates, ResolutionCache, TemplateSource};
pub use error::SourceError;
pub use source::{first_success, load_file, LoaderConfig, TemplateLoader};
pub use template::{
    RawConfig, RawTemplate, ResolvedTemplate, TemplateError, TemplateRegistry, BUILTIN_TEMPLATE,
    DEFAULT_ASPECT_RATIO,
};

/// Load resolved templates for a root directory
///
/// Searches the environment override, the current directory and
/// `<root>/templates/` in that order. Returns the cached templates when the
/// chosen file has not changed since the last call with the same cache, and
/// the built-in defaults when no file is usable.
pub fn load_templates(root: impl Into<PathBuf>, cache: &mut ResolutionCache) -> Arc<LoadedTemplates> {
    TemplateLoader::new(LoaderConfig::new(root)).load(cache)
}

/// Look up a resolved template by name
///
/// Absence is not an error; callers pick their own fallback, e.g. via
/// [`LoadedTemplates::select`].
pub fn get_resolved_template<'a>(templates: &'a LoadedTemplates, name: &str) -> Option<&'a ResolvedTemplate> {
    templates.get(name)
}
