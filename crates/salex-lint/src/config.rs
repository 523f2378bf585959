use std::path::Path;

use anyhow::{Context, Result};
use salex_markup::Tag;
use salex_types::Namespace;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown markup tag `{0}`")]
    UnknownTag(String),
    #[error("emphasis and homograph tags must differ")]
    SameTags,
    #[error("thread count must be at least 1")]
    NoThreads,
}

/// Knobs for one lint run. Every field has a default, so a config file only
/// needs the keys it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LintConfig {
    /// Workers for index extraction and for the per-entry checks.
    pub threads: usize,
    pub implicit_references: ImplicitReferenceConfig,
    pub check_inflections: bool,
    pub check_markup: bool,
    pub check_parent_verbs: bool,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            threads: salex_index::default_threads(),
            implicit_references: ImplicitReferenceConfig::default(),
            check_inflections: true,
            check_markup: true,
            check_parent_verbs: true,
        }
    }
}

impl LintConfig {
    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parse config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::NoThreads);
        }
        let (emphasis, homograph) = self.implicit_references.tags()?;
        if emphasis == homograph {
            return Err(ConfigError::SameTags);
        }
        Ok(())
    }
}

/// Recognition of references that are only typographic: a headword set in
/// italics, optionally followed by a superscript homograph number.
///
/// This is a heuristic. The thresholds here are tuning, not contract.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImplicitReferenceConfig {
    pub enabled: bool,
    /// Field paths scanned in SAOL sections.
    pub saol_fields: Vec<String>,
    /// Field paths scanned in SO sections.
    pub so_fields: Vec<String>,
    /// Tag marking a referenced phrase.
    pub emphasis_tag: String,
    /// Tag marking the homograph number after the phrase.
    pub homograph_tag: String,
    /// Shorter phrases are never references.
    pub min_phrase_chars: usize,
}

impl Default for ImplicitReferenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            saol_fields: vec!["huvudbetydelser.*.definition".into()],
            so_fields: vec![
                "huvudbetydelser.*.definition".into(),
                "huvudbetydelser.*.definitionstillägg".into(),
                "huvudbetydelser.*.underbetydelser.*.definition".into(),
                "huvudbetydelser.*.underbetydelser.*.definitionstillägg".into(),
            ],
            emphasis_tag: Tag::Italic.name().into(),
            homograph_tag: Tag::Superscript.name().into(),
            min_phrase_chars: 2,
        }
    }
}

impl ImplicitReferenceConfig {
    pub fn fields(&self, namespace: Namespace) -> &[String] {
        match namespace {
            Namespace::Saol => &self.saol_fields,
            Namespace::So => &self.so_fields,
        }
    }

    /// `(emphasis, homograph)` resolved to markup tags.
    pub fn tags(&self) -> Result<(Tag, Tag), ConfigError> {
        let resolve = |name: &str| {
            Tag::from_name(name).ok_or_else(|| ConfigError::UnknownTag(name.to_string()))
        };
        Ok((resolve(&self.emphasis_tag)?, resolve(&self.homograph_tag)?))
    }
}
