//! Template registry: the authored shape of a templates file and the
//! flattened templates resolved from it

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the template shipped in the built-in configuration
pub const BUILTIN_TEMPLATE: &str = "lifestyle";

/// Aspect ratio used when neither a template nor the defaults pick one
pub const DEFAULT_ASPECT_RATIO: &str = "3:4";

/// Errors that can occur while resolving template inheritance
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// Template not defined in the templates mapping
    #[error("unknown template: {name}")]
    UnknownTemplate {
        name: String,
        /// Template whose `extends` pointed at the missing name
        referenced_by: Option<String>,
    },

    /// Circular `extends` chain, starting and ending at the repeated name
    #[error("template extends cycle: {}", .chain.join(" -> "))]
    Cycle { chain: Vec<String> },
}

impl TemplateError {
    /// Name the error should be reported against in a source file
    pub fn template_name(&self) -> &str {
        match self {
            TemplateError::UnknownTemplate { name, .. } => name,
            TemplateError::Cycle { chain } => chain.first().map(String::as_str).unwrap_or_default(),
        }
    }
}

/// One template entry as authored in a templates file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTemplate {
    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Parent template to inherit from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative: Option<String>,
    /// e.g. "3:4"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
}

/// Fallback selections for callers that do not name a template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
}

/// A complete templates file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawConfig {
    /// Informational only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(default)]
    pub defaults: Defaults,
    pub templates: BTreeMap<String, RawTemplate>,
}

impl RawConfig {
    /// Parse and validate a templates file from JSON text
    ///
    /// Template entries and `defaults` must only carry recognized fields;
    /// nothing is coerced.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Configuration used when no templates file can be loaded
    pub fn builtin() -> Self {
        let mut templates = BTreeMap::new();
        templates.insert(
            BUILTIN_TEMPLATE.to_string(),
            RawTemplate {
                label: Some("Lifestyle".to_string()),
                prompt: Some(
                    "Vibe: High-end lifestyle, clean, minimal, effortless beauty.".to_string(),
                ),
                ..RawTemplate::default()
            },
        );

        Self {
            version: Some(1),
            defaults: Defaults {
                template: Some(BUILTIN_TEMPLATE.to_string()),
                aspect_ratio: Some(DEFAULT_ASPECT_RATIO.to_string()),
            },
            templates,
        }
    }
}

/// A template with its whole `extends` chain merged in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTemplate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
}

/// Resolved templates by name, one entry per authored template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, ResolvedTemplate>,
}

impl TemplateRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every template of a configuration
    pub fn from_config(config: &RawConfig) -> Result<Self, TemplateError> {
        let templates = super::resolver::resolve_templates(&config.templates)?;
        Ok(Self { templates })
    }

    /// Get a template by name
    pub fn get(&self, name: &str) -> Option<&ResolvedTemplate> {
        self.templates.get(name)
    }

    /// Check if a template exists
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// All template names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedTemplate> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let json = r#"{
            "version": 2,
            "defaults": { "template": "cafe", "aspect_ratio": "1:1" },
            "templates": {
                "base": { "prompt": "Soft light." },
                "cafe": { "label": "Cafe", "extends": "base", "negative": "clutter" }
            }
        }"#;

        let config = RawConfig::from_json(json).expect("Should parse");
        assert_eq!(config.version, Some(2));
        assert_eq!(config.defaults.template.as_deref(), Some("cafe"));
        assert_eq!(config.defaults.aspect_ratio.as_deref(), Some("1:1"));
        assert_eq!(config.templates.len(), 2);
        assert_eq!(config.templates["cafe"].extends.as_deref(), Some("base"));
    }

    #[test]
    fn test_parse_minimal_file() {
        let config = RawConfig::from_json(r#"{ "templates": {} }"#).expect("Should parse");
        assert_eq!(config.version, None);
        assert_eq!(config.defaults, Defaults::default());
        assert!(config.templates.is_empty());
    }

    #[test]
    fn test_missing_templates_rejected() {
        assert!(RawConfig::from_json(r#"{ "version": 1 }"#).is_err());
    }

    #[test]
    fn test_unknown_template_field_rejected() {
        let json = r#"{ "templates": { "a": { "prompt": "x", "seed": 42 } } }"#;
        assert!(RawConfig::from_json(json).is_err());
    }

    #[test]
    fn test_unknown_defaults_field_rejected() {
        let json = r#"{ "defaults": { "style": "x" }, "templates": {} }"#;
        assert!(RawConfig::from_json(json).is_err());
    }

    #[test]
    fn test_wrong_field_type_rejected() {
        let json = r#"{ "templates": { "a": { "aspect_ratio": 0.75 } } }"#;
        assert!(RawConfig::from_json(json).is_err());

        let json = r#"{ "version": "1", "templates": {} }"#;
        assert!(RawConfig::from_json(json).is_err());
    }

    #[test]
    fn test_unknown_top_level_key_ignored() {
        let json = r#"{ "$schema": "./schema.json", "templates": {} }"#;
        assert!(RawConfig::from_json(json).is_ok());
    }

    #[test]
    fn test_builtin_config() {
        let config = RawConfig::builtin();
        assert_eq!(config.defaults.template.as_deref(), Some(BUILTIN_TEMPLATE));
        assert_eq!(config.defaults.aspect_ratio.as_deref(), Some(DEFAULT_ASPECT_RATIO));
        assert_eq!(config.templates.len(), 1);

        let lifestyle = &config.templates[BUILTIN_TEMPLATE];
        assert_eq!(lifestyle.label.as_deref(), Some("Lifestyle"));
        assert!(lifestyle.aspect_ratio.is_none());
        assert!(lifestyle.extends.is_none());
    }

    #[test]
    fn test_registry_lookup() {
        let registry = TemplateRegistry::from_config(&RawConfig::builtin()).expect("Should resolve");
        assert!(registry.contains(BUILTIN_TEMPLATE));
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec![BUILTIN_TEMPLATE]);
        assert!(!registry.is_empty());
        assert!(TemplateRegistry::new().is_empty());
    }

    #[test]
    fn test_error_template_name() {
        let err = TemplateError::Cycle {
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.template_name(), "a");

        let err = TemplateError::UnknownTemplate {
            name: "ghost".into(),
            referenced_by: Some("a".into()),
        };
        assert_eq!(err.template_name(), "ghost");
    }
}
