use std::fmt;

use serde::Serialize;

use crate::{Entry, Identifier, Namespace};

/// What is wrong with the homograph numbering of one headword.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HomographDefect {
    /// Several visible homographs, at least one without a number.
    Missing,
    /// A single visible homograph that carries a number anyway.
    Unnecessary,
    /// Numbers present but not exactly `1..=N`.
    NonSequential,
    /// A SAOL "se under" pointer to an inflected form that has a number.
    SeeUnderNumbered,
}

impl fmt::Display for HomographDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HomographDefect::Missing => "homograph number missing",
            HomographDefect::Unnecessary => "unnecessary homograph number",
            HomographDefect::NonSequential => "non-sequential homograph numbers",
            HomographDefect::SeeUnderNumbered => "'se under' form has a homograph number",
        })
    }
}

/// One member of a homograph group, for diagnostics.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct HomographSlot {
    pub entry_id: String,
    pub homograph: Option<u32>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokenHint {
    /// The headword exists, but only with homograph numbers.
    ProbablyMissingHomographNumber,
}

/// Payload of a [`Warning`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningKind {
    DuplicateIdentifier {
        identifier: String,
        other_entry_id: String,
        other_entry_name: String,
    },
    HomographNumbering {
        headword: String,
        defect: HomographDefect,
        homographs: Vec<HomographSlot>,
    },
    UnknownReferenceKind {
        text: String,
        reason: String,
    },
    BrokenReference {
        reference: String,
        text: String,
        hint: Option<BrokenHint>,
    },
    SuppressedTargetReference {
        reference: String,
        text: String,
        target_name: String,
    },
    UnexpectedTargetWord {
        reference: String,
        text: String,
        word: String,
        expected: String,
    },
    BadReferenceSyntax {
        matched: String,
        text: String,
    },
    MalformedMarkup {
        text: String,
        error: String,
    },
    UnbalancedBrackets {
        text: String,
    },
    InflectionMismatch {
        inflection: String,
        classes: Vec<String>,
        forms: Vec<String>,
    },
    ParentVerbClassMismatch {
        class: Option<String>,
        parent_name: String,
        parent_class: Option<String>,
    },
}

impl WarningKind {
    pub fn name(&self) -> &'static str {
        match self {
            WarningKind::DuplicateIdentifier { .. } => "duplicate_identifier",
            WarningKind::HomographNumbering { .. } => "homograph_numbering",
            WarningKind::UnknownReferenceKind { .. } => "unknown_reference_kind",
            WarningKind::BrokenReference { .. } => "broken_reference",
            WarningKind::SuppressedTargetReference { .. } => "suppressed_target_reference",
            WarningKind::UnexpectedTargetWord { .. } => "unexpected_target_word",
            WarningKind::BadReferenceSyntax { .. } => "bad_reference_syntax",
            WarningKind::MalformedMarkup { .. } => "malformed_markup",
            WarningKind::UnbalancedBrackets { .. } => "unbalanced_brackets",
            WarningKind::InflectionMismatch { .. } => "inflection_mismatch",
            WarningKind::ParentVerbClassMismatch { .. } => "parent_verb_class_mismatch",
        }
    }

    pub fn duplicate(identifier: &Identifier, other: &Entry) -> Self {
        WarningKind::DuplicateIdentifier {
            identifier: identifier.to_string(),
            other_entry_id: other.id.clone(),
            other_entry_name: other.display_name(identifier.namespace),
        }
    }
}

/// A finding about one entry, ready for an external report renderer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Warning {
    pub entry_id: String,
    pub entry_name: String,
    #[serde(skip)]
    pub headword: String,
    #[serde(skip)]
    pub homograph: Option<u32>,
    pub namespace: Namespace,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(flatten)]
    pub kind: WarningKind,
}

impl Warning {
    pub fn new(entry: &Entry, namespace: Namespace, field: Option<String>, kind: WarningKind) -> Self {
        Self {
            entry_id: entry.id.clone(),
            entry_name: entry.display_name(namespace),
            headword: entry.headword.clone(),
            homograph: entry.section(namespace).and_then(|s| s.homograph()),
            namespace,
            field,
            kind,
        }
    }

    /// Report order: headword, homograph number, entry, namespace, field,
    /// then kind. Unnumbered homographs come first.
    pub fn sort_key(&self) -> (&str, Option<u32>, &str, Namespace, &str, &'static str) {
        (
            self.headword.as_str(),
            self.homograph,
            self.entry_id.as_str(),
            self.namespace,
            self.field.as_deref().unwrap_or(""),
            self.kind.name(),
        )
    }
}
