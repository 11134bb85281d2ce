//! Template resolution - flattens `extends` chains into resolved templates

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, trace};

use super::registry::{RawTemplate, ResolvedTemplate, TemplateError};

/// State for one resolution pass over a templates mapping
#[derive(Debug)]
pub struct ResolutionContext<'a> {
    /// Authored templates; each entry's `extends` is its edge to the parent
    templates: &'a BTreeMap<String, RawTemplate>,
    /// Templates already flattened during this pass
    resolved: BTreeMap<String, ResolvedTemplate>,
    /// Number of merges performed
    merges: usize,
}

impl<'a> ResolutionContext<'a> {
    /// Create a new context over a templates mapping
    pub fn new(templates: &'a BTreeMap<String, RawTemplate>) -> Self {
        Self {
            templates,
            resolved: BTreeMap::new(),
            merges: 0,
        }
    }

    /// Number of templates actually merged so far; memo hits don't count
    pub fn merges(&self) -> usize {
        self.merges
    }

    /// Resolve one template and, first, every ancestor it extends
    pub fn resolve(&mut self, name: &str) -> Result<&ResolvedTemplate, TemplateError> {
        self.ensure_resolved(name)?;
        self.resolved
            .get(name)
            .ok_or_else(|| TemplateError::UnknownTemplate {
                name: name.to_string(),
                referenced_by: None,
            })
    }

    /// Consume the context, returning everything resolved so far
    pub fn into_resolved(self) -> BTreeMap<String, ResolvedTemplate> {
        self.resolved
    }

    fn ensure_resolved(&mut self, name: &str) -> Result<(), TemplateError> {
        let templates = self.templates;

        // Walk parent links up to a resolved ancestor or the top of the chain.
        // `path` is the active chain, child first; `on_path` guards cycles.
        let mut path: Vec<&'a str> = Vec::new();
        let mut on_path: HashSet<&'a str> = HashSet::new();
        let mut current = name;
        let mut referenced_by: Option<&'a str> = None;

        loop {
            if self.resolved.contains_key(current) {
                trace!(name = %current, "ensure_resolved: memo hit");
                break;
            }

            if on_path.contains(current) {
                let start = path.iter().position(|n| *n == current).unwrap_or_default();
                let mut chain: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
                chain.push(current.to_string());
                return Err(TemplateError::Cycle { chain });
            }

            let (key, raw) = templates
                .get_key_value(current)
                .ok_or_else(|| TemplateError::UnknownTemplate {
                    name: current.to_string(),
                    referenced_by: referenced_by.map(str::to_string),
                })?;
            path.push(key.as_str());
            on_path.insert(key.as_str());

            match raw.extends.as_deref() {
                Some(parent) => {
                    referenced_by = Some(key.as_str());
                    current = parent;
                }
                None => break,
            }
        }

        // Deepest ancestor first, so every parent is resolved before its child
        for name in path.into_iter().rev() {
            let Some(raw) = templates.get(name) else {
                continue;
            };
            let base = raw.extends.as_deref().and_then(|parent| self.resolved.get(parent));
            let resolved = merge(name, raw, base);
            self.merges += 1;
            trace!(%name, extends = ?raw.extends, "ensure_resolved: merged");
            self.resolved.insert(name.to_string(), resolved);
        }
        Ok(())
    }
}

/// Resolve every template in a mapping
///
/// The result has exactly one entry per input name. Iteration order does not
/// matter: parents are always resolved before their children and each
/// template is merged once.
pub fn resolve_templates(
    templates: &BTreeMap<String, RawTemplate>,
) -> Result<BTreeMap<String, ResolvedTemplate>, TemplateError> {
    let mut ctx = ResolutionContext::new(templates);
    for name in templates.keys() {
        ctx.resolve(name)?;
    }
    debug!(count = ctx.merges(), "resolve_templates: complete");
    Ok(ctx.into_resolved())
}

/// Merge a template over its resolved parent
///
/// Scalars are last-writer-wins; text fragments are appended after the
/// parent's text.
fn merge(name: &str, own: &RawTemplate, base: Option<&ResolvedTemplate>) -> ResolvedTemplate {
    ResolvedTemplate {
        name: name.to_string(),
        label: own
            .label
            .clone()
            .or_else(|| base.and_then(|b| b.label.clone())),
        prompt: join_text(
            base.and_then(|b| b.prompt.as_deref()),
            own.prompt.as_deref(),
        ),
        negative: join_text(
            base.and_then(|b| b.negative.as_deref()),
            own.negative.as_deref(),
        ),
        aspect_ratio: own
            .aspect_ratio
            .clone()
            .or_else(|| base.and_then(|b| b.aspect_ratio.clone())),
    }
}

fn join_text(inherited: Option<&str>, own: Option<&str>) -> Option<String> {
    let joined = [inherited, own]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
