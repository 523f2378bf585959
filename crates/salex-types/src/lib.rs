//! Shared types for checking Salex lexicon entries.
//!
//! An [`Entry`] is one lexicon record: a headword plus up to two namespace
//! sections ([`Namespace::Saol`] and [`Namespace::So`]). Section bodies are kept
//! as free-form JSON and addressed through [`FieldPath`]s. Those are small
//! declarative paths with `*` wildcards over repeated sub-records, and they
//! expand into concrete [`Location`]s.
//!
//! [`Identifier`] is the key type shared by the index and the reference
//! checks. [`Warning`] is the single result type every check produces.
//!
//! ```rust
//! use salex_types::{Identifier, Namespace, NumericKind, parse_reference};
//!
//! let (kind, value) = parse_reference("lnr1001", None).unwrap();
//! assert_eq!(kind, NumericKind::Lemma);
//! let id = Identifier::numeric(Namespace::Saol, kind, value);
//! assert_eq!(id.to_string(), "lnr1001");
//! ```

mod path;
pub mod schema;
mod warning;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use path::{FieldPath, Location, Step, string_fields};
pub use warning::{BrokenHint, HomographDefect, HomographSlot, Warning, WarningKind};

/// One of the two interlinked dictionary sections of an entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Saol,
    So,
}

impl Namespace {
    pub const ALL: [Namespace; 2] = [Namespace::Saol, Namespace::So];

    /// JSON key of the section holding this namespace.
    pub fn key(self) -> &'static str {
        match self {
            Namespace::Saol => "saol",
            Namespace::So => "so",
        }
    }

    pub fn other(self) -> Self {
        match self {
            Namespace::Saol => Namespace::So,
            Namespace::So => Namespace::Saol,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Namespace::Saol => "SAOL",
            Namespace::So => "SO",
        })
    }
}

/// Kind of a declared numeric identifier.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericKind {
    Lemma,
    Sense,
    Cycle,
    Idiom,
}

impl NumericKind {
    pub const ALL: [NumericKind; 4] = [
        NumericKind::Lemma,
        NumericKind::Sense,
        NumericKind::Cycle,
        NumericKind::Idiom,
    ];

    /// Alphabetic prefix used when the identifier appears in references.
    pub fn prefix(self) -> &'static str {
        match self {
            NumericKind::Lemma => "lnr",
            NumericKind::Sense => "xnr",
            NumericKind::Cycle => "kcnr",
            NumericKind::Idiom => "inr",
        }
    }

    /// Split `lnr1001` into `(Lemma, "1001")`.
    pub fn split_prefixed(text: &str) -> Option<(NumericKind, &str)> {
        Self::ALL
            .iter()
            .find_map(|kind| text.strip_prefix(kind.prefix()).map(|rest| (*kind, rest)))
    }
}

/// The value half of an [`Identifier`].
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Key {
    Numeric {
        kind: NumericKind,
        value: String,
    },
    Textual {
        headword: String,
        homograph: Option<u32>,
    },
}

/// Key into the identifier index. Several entries may claim the same key.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Identifier {
    pub namespace: Namespace,
    pub key: Key,
}

impl Identifier {
    pub fn numeric(namespace: Namespace, kind: NumericKind, value: impl Into<String>) -> Self {
        Self {
            namespace,
            key: Key::Numeric {
                kind,
                value: value.into(),
            },
        }
    }

    pub fn textual(namespace: Namespace, headword: impl Into<String>, homograph: Option<u32>) -> Self {
        Self {
            namespace,
            key: Key::Textual {
                headword: headword.into(),
                homograph,
            },
        }
    }

    /// `(headword, None)` keys are the ones whose conflicts the homograph check owns.
    pub fn is_unnumbered_textual(&self) -> bool {
        matches!(self.key, Key::Textual { homograph: None, .. })
    }

    pub fn headword(&self) -> Option<&str> {
        match &self.key {
            Key::Textual { headword, .. } => Some(headword),
            Key::Numeric { .. } => None,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Key::Numeric { kind, value } => write!(f, "{}{}", kind.prefix(), value),
            Key::Textual {
                headword,
                homograph: Some(nr),
            } => write!(f, "{nr} {headword}"),
            Key::Textual {
                headword,
                homograph: None,
            } => f.write_str(headword),
        }
    }
}

/// Why a reference string could not be turned into an identifier.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ReferenceSyntaxError {
    #[error("`{0}` has no recognised identifier prefix")]
    UnknownKind(String),
    #[error("`{text}` is a {found:?} identifier where a {expected:?} identifier is required")]
    KindMismatch {
        text: String,
        expected: NumericKind,
        found: NumericKind,
    },
    #[error("`{0}` has no identifier number")]
    Malformed(String),
}

/// Parse a bare identifier string.
///
/// With `fixed` set the field determines the kind, so a bare number is accepted;
/// a prefix, if present, must agree with it.
pub fn parse_reference(
    text: &str,
    fixed: Option<NumericKind>,
) -> Result<(NumericKind, String), ReferenceSyntaxError> {
    let trimmed = text.trim();
    let (kind, number) = match (NumericKind::split_prefixed(trimmed), fixed) {
        (Some((found, _)), Some(expected)) if found != expected => {
            return Err(ReferenceSyntaxError::KindMismatch {
                text: trimmed.to_string(),
                expected,
                found,
            });
        }
        (Some((found, rest)), _) => (found, rest),
        (None, Some(expected)) if trimmed.chars().all(|c| c.is_ascii_digit()) => (expected, trimmed),
        (None, _) => return Err(ReferenceSyntaxError::UnknownKind(trimmed.to_string())),
    };
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ReferenceSyntaxError::Malformed(trimmed.to_string()));
    }
    Ok((kind, number.to_string()))
}

/// Entry type (`ingångstyp`).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum EntryType {
    #[serde(rename = "partikelverb")]
    ParticleVerb,
    #[serde(rename = "reflexivt_verb")]
    ReflexiveVerb,
    #[serde(rename = "variant")]
    Variant,
    #[serde(rename = "se under")]
    SeeUnder,
    #[serde(other)]
    Other,
}

/// A lexicon record as delivered by the lexicon store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    #[serde(rename = "ortografi")]
    pub headword: String,
    #[serde(rename = "ordklass", default, skip_serializing_if = "Option::is_none")]
    pub word_class: Option<String>,
    #[serde(rename = "ingångstyp", default, skip_serializing_if = "Option::is_none")]
    pub entry_type: Option<EntryType>,
    #[serde(
        rename = "böjningsklass",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub inflection_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saol: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub so: Option<Value>,
}

impl Entry {
    /// Section for `namespace`, if the entry participates in it.
    pub fn section(&self, namespace: Namespace) -> Option<SubLemma<'_>> {
        let body = match namespace {
            Namespace::Saol => self.saol.as_ref(),
            Namespace::So => self.so.as_ref(),
        }?;
        Some(SubLemma {
            namespace,
            entry: self,
            body,
        })
    }

    pub fn sections(&self) -> impl Iterator<Item = SubLemma<'_>> {
        Namespace::ALL.into_iter().filter_map(|ns| self.section(ns))
    }

    pub fn is_type(&self, entry_type: EntryType) -> bool {
        self.entry_type.as_ref() == Some(&entry_type)
    }

    /// Particle and reflexive verbs carry a trailing particle that inflection leaves alone.
    pub fn has_particle(&self) -> bool {
        matches!(
            self.entry_type,
            Some(EntryType::ParticleVerb | EntryType::ReflexiveVerb)
        )
    }

    /// Word class used when grouping inflection classes; particle verbs count as verbs.
    pub fn word_class_key(&self) -> &str {
        match self.word_class.as_deref() {
            Some("ptv.") => "verb",
            Some(other) => other,
            None => "",
        }
    }

    /// `"2 katt"`, or the bare headword when the section has no homograph number.
    pub fn display_name(&self, namespace: Namespace) -> String {
        match self.section(namespace).and_then(|s| s.homograph()) {
            Some(nr) => format!("{nr} {}", self.headword),
            None => self.headword.clone(),
        }
    }
}

/// Borrowed view of one namespace section of an [`Entry`].
#[derive(Clone, Copy, Debug)]
pub struct SubLemma<'a> {
    namespace: Namespace,
    entry: &'a Entry,
    body: &'a Value,
}

impl<'a> SubLemma<'a> {
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn entry(&self) -> &'a Entry {
        self.entry
    }

    pub fn body(&self) -> &'a Value {
        self.body
    }

    /// Sections are visible unless they say `visas: false`.
    pub fn is_visible(&self) -> bool {
        Location::root().is_visible(self.body)
    }

    pub fn homograph(&self) -> Option<u32> {
        self.body.get("homografNr").and_then(homograph_number)
    }

    /// Section-level class, falling back to the entry-level one.
    pub fn inflection_class(&self) -> Option<String> {
        self.body
            .get("böjningsklass")
            .and_then(scalar_string)
            .or_else(|| self.entry.inflection_class.clone())
    }

    /// Raw inflection markup (`böjning`).
    pub fn inflection(&self) -> Option<&'a str> {
        self.body.get("böjning").and_then(Value::as_str)
    }

    /// Visible variant spellings declared in this section.
    pub fn variant_forms(&self) -> Vec<&'a str> {
        let mut forms = Vec::new();
        for field in schema::variant_form_fields(self.namespace) {
            for location in FieldPath::parse(field).expand(self.body) {
                if !location.is_visible(self.body) {
                    continue;
                }
                if let Some(form) = location.get(self.body).and_then(Value::as_str)
                    && !forms.contains(&form)
                {
                    forms.push(form);
                }
            }
        }
        forms
    }

    /// Headword followed by the variant forms.
    pub fn forms(&self) -> Vec<&'a str> {
        let mut forms = vec![self.entry.headword.as_str()];
        for form in self.variant_forms() {
            if !forms.contains(&form) {
                forms.push(form);
            }
        }
        forms
    }

    pub fn display_name(&self) -> String {
        self.entry.display_name(self.namespace)
    }
}

/// Snapshot defects that make a whole run meaningless.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("entry #{position} has an empty id")]
    EmptyId { position: usize },
    #[error("entry {entry_id} has no headword")]
    MissingHeadword { entry_id: String },
    #[error("entry id {entry_id} occurs more than once")]
    DuplicateEntryId { entry_id: String },
    #[error("entry {entry_id}: {namespace} section is not an object")]
    SectionNotObject {
        entry_id: String,
        namespace: Namespace,
    },
}

/// Check the structural preconditions of an entry snapshot.
pub fn validate_snapshot(entries: &[Entry]) -> Result<(), SnapshotError> {
    let mut seen = HashSet::with_capacity(entries.len());
    for (position, entry) in entries.iter().enumerate() {
        if entry.id.trim().is_empty() {
            return Err(SnapshotError::EmptyId { position });
        }
        if entry.headword.trim().is_empty() {
            return Err(SnapshotError::MissingHeadword {
                entry_id: entry.id.clone(),
            });
        }
        if !seen.insert(entry.id.as_str()) {
            return Err(SnapshotError::DuplicateEntryId {
                entry_id: entry.id.clone(),
            });
        }
        for section in entry.sections() {
            if !section.body().is_object() {
                return Err(SnapshotError::SectionNotObject {
                    entry_id: entry.id.clone(),
                    namespace: section.namespace(),
                });
            }
        }
    }
    Ok(())
}

/// Homograph numbers arrive both as JSON numbers and as digit strings.
pub fn homograph_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(other) => scalar_string(&other)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("expected a string or a number")),
    }
}
