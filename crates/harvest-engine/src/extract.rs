//! Field extraction seam.
//!
//! An `Extractor` turns fetched content into named fields and reports whether the
//! primary identifying field was found. `PatternExtractor` is the configurable
//! regex-based implementation used by the CLI.

use crate::config::{ConfigError, ExtractionConfig};
use harvest_common::Fields;
use regex::Regex;
use std::sync::LazyLock;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub fields: Fields,
    pub primary_present: bool,
}

pub trait Extractor: Send + Sync {
    fn extract(&self, content: &str) -> Extraction;
}

#[derive(Debug)]
struct CompiledRule {
    name: String,
    pattern: Regex,
    digits_only: bool,
}

#[derive(Debug)]
pub struct PatternExtractor {
    rules: Vec<CompiledRule>,
    primary: String,
    sentinel: String,
}

impl PatternExtractor {
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ConfigError> {
        if !config.fields.iter().any(|f| f.name == config.primary_field) {
            return Err(ConfigError::Invalid(format!(
                "primary field '{}' has no extraction rule",
                config.primary_field
            )));
        }

        let rules = config
            .fields
            .iter()
            .map(|rule| {
                let pattern = Regex::new(&rule.pattern).map_err(|e| {
                    ConfigError::Invalid(format!("field '{}': {}", rule.name, e))
                })?;
                Ok(CompiledRule {
                    name: rule.name.clone(),
                    pattern,
                    digits_only: rule.digits_only,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            rules,
            primary: config.primary_field.clone(),
            sentinel: config.not_found.clone(),
        })
    }

    fn capture(rule: &CompiledRule, content: &str) -> Option<String> {
        let caps = rule.pattern.captures(content)?;
        let raw = caps.get(1).or_else(|| caps.get(0))?.as_str();
        let text = clean_text(raw);
        let text = if rule.digits_only {
            text.chars().filter(|c| c.is_ascii_digit()).collect()
        } else {
            text
        };
        (!text.is_empty()).then_some(text)
    }
}

impl Extractor for PatternExtractor {
    fn extract(&self, content: &str) -> Extraction {
        let fields: Fields = self
            .rules
            .iter()
            .map(|rule| (rule.name.clone(), Self::capture(rule, content)))
            .collect();

        let primary_present = matches!(
            fields.get(&self.primary),
            Some(Some(value)) if *value != self.sentinel
        );

        Extraction {
            fields,
            primary_present,
        }
    }
}

/// Strips markup, decodes the handful of entities that show up in titles and
/// prices, and collapses whitespace.
pub fn clean_text(raw: &str) -> String {
    let stripped = TAG.replace_all(raw, " ");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    SPACE.replace_all(decoded.trim(), " ").into_owned()
}
