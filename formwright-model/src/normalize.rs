//! Raw schema → canonical schema.

use crate::error::{NormalizationError, NormalizationResult};
use crate::raw::{RawNode, RawSchema, RawSection};
use crate::rule::Rule;
use crate::schema::{CanonicalSchema, FieldNode, RenderSection};
use formwright_registry::RegistrySnapshot;
use formwright_types::FieldId;
use regex_lite::Regex;
use std::collections::HashMap;
use tracing::debug;

/// Parses a JSON schema and normalizes it.
pub fn normalize_json(
    json: &str,
    registry: &RegistrySnapshot,
) -> NormalizationResult<CanonicalSchema> {
    let raw: RawSchema =
        serde_json::from_str(json).map_err(|e| NormalizationError::Parse(e.to_string()))?;
    normalize(&raw, registry)
}

/// Normalizes a raw schema against a registry snapshot.
///
/// Resolves every node's type exactly once, expands shorthand, fills in
/// handler defaults and flattens sections into a single id → node map plus
/// an ordered render tree. Fails on the first empty id, duplicate id, unknown
/// type, unsupported rule, bad pattern, malformed condition or rejected
/// default; unknown types are never skipped.
pub fn normalize(
    raw: &RawSchema,
    registry: &RegistrySnapshot,
) -> NormalizationResult<CanonicalSchema> {
    let mut normalizer = Normalizer {
        registry,
        schema: CanonicalSchema::default(),
        seen: HashMap::new(),
    };

    if !raw.fields.is_empty() {
        let root = RawSection {
            fields: raw.fields.clone(),
            ..RawSection::default()
        };
        let section = normalizer.section(&root, "")?;
        normalizer.schema.tree.push(section);
    }
    for (i, section) in raw.sections.iter().enumerate() {
        let section = normalizer.section(section, &format!("sections[{i}]."))?;
        normalizer.schema.tree.push(section);
    }

    debug!(fields = normalizer.schema.len(), "Schema normalized");
    Ok(normalizer.schema)
}

struct Normalizer<'a> {
    registry: &'a RegistrySnapshot,
    schema: CanonicalSchema,
    /// id → location of first occurrence
    seen: HashMap<FieldId, String>,
}

impl Normalizer<'_> {
    fn section(&mut self, raw: &RawSection, prefix: &str) -> NormalizationResult<RenderSection> {
        let mut out = RenderSection {
            id: raw.id.clone(),
            title: raw.title.clone(),
            fields: Vec::with_capacity(raw.fields.len()),
            sections: Vec::with_capacity(raw.sections.len()),
        };

        for (i, node) in raw.fields.iter().enumerate() {
            let location = format!("{prefix}fields[{i}]");
            let node = self.node(node, location)?;
            out.fields.push(node.id.clone());
            self.schema.order.push(node.id.clone());
            self.schema.nodes.insert(node.id.clone(), node);
        }
        for (i, nested) in raw.sections.iter().enumerate() {
            let nested = self.section(nested, &format!("{prefix}sections[{i}]."))?;
            out.sections.push(nested);
        }
        Ok(out)
    }

    fn node(&mut self, raw: &RawNode, location: String) -> NormalizationResult<FieldNode> {
        if raw.id.is_blank() {
            return Err(NormalizationError::EmptyId { location });
        }
        if let Some(first) = self.seen.get(&raw.id) {
            return Err(NormalizationError::DuplicateId {
                id: raw.id.clone(),
                first: first.clone(),
                second: location,
            });
        }
        self.seen.insert(raw.id.clone(), location.clone());

        let handler = self
            .registry
            .resolve(&raw.kind)
            .map_err(|_| NormalizationError::UnknownType {
                id: raw.id.clone(),
                kind: raw.kind.clone(),
                location: location.clone(),
            })?;

        let rules = expand_rules(raw)?;
        let default = match &raw.default {
            Some(value) => value.clone(),
            None => handler.default_value(),
        };

        let node = FieldNode {
            id: raw.id.clone(),
            kind: raw.kind.clone(),
            label: raw.label.clone(),
            rules,
            default,
            show_if: raw.show_if.clone(),
            enable_if: raw.enable_if.clone(),
            options: raw.options.clone(),
            component: raw.component.clone(),
            handler,
            location,
        };
        check_node(&node)?;
        Ok(node)
    }
}

/// Expands shorthand rules and the `required: true` flag.
pub(crate) fn expand_rules(raw: &RawNode) -> NormalizationResult<Vec<Rule>> {
    let mut rules = raw
        .rules
        .iter()
        .map(|r| {
            r.expand().map_err(|reason| NormalizationError::InvalidRule {
                id: raw.id.clone(),
                reason,
            })
        })
        .collect::<NormalizationResult<Vec<_>>>()?;

    let starts_required = matches!(rules.first(), Some(Rule::Required { .. }));
    if raw.required && !starts_required {
        rules.insert(0, Rule::required());
    }
    Ok(rules)
}

/// Checks a resolved node against its handler: accepted rule kinds, valid
/// patterns, well-formed conditions and an accepted default.
pub(crate) fn check_node(node: &FieldNode) -> NormalizationResult<()> {
    let handler = node.handler();
    for rule in &node.rules {
        if !handler.accepts_rule(rule.kind()) {
            return Err(NormalizationError::UnsupportedRule {
                id: node.id.clone(),
                kind: node.kind.clone(),
                rule: rule.kind(),
            });
        }
        match rule {
            Rule::Pattern { pattern, .. } => {
                Regex::new(pattern).map_err(|e| NormalizationError::InvalidPattern {
                    id: node.id.clone(),
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
            }
            Rule::RequiredIf { when, .. } => {
                when.check()
                    .map_err(|reason| NormalizationError::InvalidCondition {
                        id: node.id.clone(),
                        reason,
                    })?;
            }
            Rule::Custom { name, .. } if name.trim().is_empty() => {
                return Err(NormalizationError::InvalidRule {
                    id: node.id.clone(),
                    reason: "custom rule has an empty predicate name".into(),
                });
            }
            _ => {}
        }
    }

    for condition in node.show_if.iter().chain(node.enable_if.iter()) {
        condition
            .check()
            .map_err(|reason| NormalizationError::InvalidCondition {
                id: node.id.clone(),
                reason,
            })?;
    }

    if !handler.accepts(&node.default) {
        return Err(NormalizationError::InvalidDefault {
            id: node.id.clone(),
            kind: node.kind.clone(),
        });
    }
    Ok(())
}
