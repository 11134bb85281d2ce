//! Template system for inheritable prompt templates
//!
//! Templates are named fragments of prompt text plus metadata. A template
//! may `extends` another; resolution flattens the chain so every template
//! carries its ancestors' text and metadata.
//!
//! # Example
//!
//! ```text
//! {
//!   "templates": {
//!     "portrait": { "prompt": "Soft studio light.", "aspect_ratio": "3:4" },
//!     "cafe": { "extends": "portrait", "prompt": "Cafe interior, warm light." }
//!   }
//! }
//! ```
//!
//! `cafe` resolves to the prompt `"Soft studio light.\nCafe interior, warm light."`
//! with aspect ratio `3:4`.

mod registry;
mod resolver;

pub use registry::{
    Defaults, RawConfig, RawTemplate, ResolvedTemplate, TemplateError, TemplateRegistry,
    BUILTIN_TEMPLATE, DEFAULT_ASPECT_RATIO,
};
pub use resolver::{resolve_templates, ResolutionContext};
