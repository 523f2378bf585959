//! References out of an entry section.
//!
//! Structured references sit in fields that hold nothing but an identifier
//! (see [`schema::reference_fields`]). Embedded references are written into
//! free text as `+word(refid=lnr123)`; the word is the surface form the author
//! expects the target to have.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use salex_types::{
    Entry, FieldPath, Identifier, Location, Namespace, ReferenceSyntaxError, SubLemma,
    parse_reference, schema, string_fields,
};
use serde_json::Value;

static REFID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+([^ +]*)\(refid=([a-zA-Z0-9]*)\)").expect("refid pattern"));
static PLUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\+\w+").expect("plus pattern"));
static BARE_REFID: Lazy<Regex> = Lazy::new(|| Regex::new(r"refid").expect("refid literal"));
static BARE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:x|l|kc)nr[a-zA-Z0-9]+").expect("id pattern"));

/// How a reference was written.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReferenceSource {
    /// Whole-field reference. Parent-verb pointers may target suppressed entries.
    Field { parent_verb: bool },
    /// `+word(refid=...)`; `word` is the form the text expects.
    Embedded { word: String },
    /// A phrase in running text that names a headword.
    Implicit,
}

/// An identifier used somewhere in an entry.
#[derive(Clone, Debug)]
pub struct Reference<'a> {
    pub entry: &'a Entry,
    pub namespace: Namespace,
    pub location: Location,
    pub identifier: Identifier,
    /// Literal source text, for diagnostics.
    pub text: String,
    pub source: ReferenceSource,
    pub visible: bool,
}

impl Reference<'_> {
    pub fn is_parent_verb(&self) -> bool {
        matches!(self.source, ReferenceSource::Field { parent_verb: true })
    }
}

/// A reference whose identifier could not be read.
#[derive(Clone, Debug)]
pub struct UnreadableReference<'a> {
    pub entry: &'a Entry,
    pub namespace: Namespace,
    pub location: Location,
    pub text: String,
    pub error: ReferenceSyntaxError,
    pub visible: bool,
}

pub type Extracted<'a> = Result<Reference<'a>, UnreadableReference<'a>>;

/// References held by the section's structured reference fields.
pub fn structured_references<'a>(section: SubLemma<'a>) -> Vec<Extracted<'a>> {
    let body = section.body();
    let namespace = section.namespace();
    let mut out = Vec::new();
    for field in schema::reference_fields(namespace) {
        for location in FieldPath::parse(field.path).expand(body) {
            let Some(text) = location.get(body).and_then(scalar_text) else {
                continue;
            };
            let visible = location.is_visible(body);
            out.push(match parse_reference(&text, field.kind) {
                Ok((kind, value)) => Ok(Reference {
                    entry: section.entry(),
                    namespace,
                    identifier: Identifier::numeric(namespace, kind, value),
                    location,
                    text,
                    source: ReferenceSource::Field {
                        parent_verb: field.parent_verb,
                    },
                    visible,
                }),
                Err(error) => Err(UnreadableReference {
                    entry: section.entry(),
                    namespace,
                    location,
                    text,
                    error,
                    visible,
                }),
            });
        }
    }
    out
}

/// `+word(refid=...)` references in every text field of the section that may
/// carry them.
pub fn embedded_references<'a>(section: SubLemma<'a>) -> Vec<Extracted<'a>> {
    let namespace = section.namespace();
    let mut out = Vec::new();
    for (location, text) in scannable_fields(section) {
        let visible = location.is_visible(section.body());
        for found in find_embedded(text) {
            let literal = text[found.span.clone()].to_string();
            out.push(match parse_reference(found.target, None) {
                Ok((kind, value)) => Ok(Reference {
                    entry: section.entry(),
                    namespace,
                    location: location.clone(),
                    identifier: Identifier::numeric(namespace, kind, value),
                    text: literal,
                    source: ReferenceSource::Embedded { word: found.word },
                    visible,
                }),
                Err(error) => Err(UnreadableReference {
                    entry: section.entry(),
                    namespace,
                    location: location.clone(),
                    text: literal,
                    error,
                    visible,
                }),
            });
        }
    }
    out
}

/// Both kinds together, structured first.
pub fn references<'a>(section: SubLemma<'a>) -> Vec<Extracted<'a>> {
    let mut out = structured_references(section);
    out.extend(embedded_references(section));
    out
}

/// String fields that are neither identifier fields nor excluded from scanning.
pub fn scannable_fields<'a>(section: SubLemma<'a>) -> Vec<(Location, &'a str)> {
    let namespace = section.namespace();
    string_fields(section.body())
        .into_iter()
        .filter(|(location, _)| {
            !schema::is_identifier_field(namespace, location)
                && !schema::is_listed(schema::no_refid_fields(namespace), location)
        })
        .collect()
}

/// One `+word(refid=target)` occurrence.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Embedded<'t> {
    pub span: Range<usize>,
    /// Surface word with `_` read as a space and parentheses dropped.
    pub word: String,
    pub target: &'t str,
}

/// Every well-formed embedded reference in `text`.
///
/// A match directly followed by another `(refid=` is not a reference.
pub fn find_embedded(text: &str) -> Vec<Embedded<'_>> {
    let mut out = Vec::new();
    let mut at = 0;
    while let Some(caps) = REFID.captures_at(text, at) {
        let Some(whole) = caps.get(0) else { break };
        if text[whole.end()..].starts_with("(refid=") {
            at = whole.start() + 1;
            continue;
        }
        let word = caps
            .get(1)
            .map_or("", |m| m.as_str())
            .replace('_', " ")
            .replace(['(', ')'], "");
        out.push(Embedded {
            span: whole.range(),
            word,
            target: caps.get(2).map_or("", |m| m.as_str()),
        });
        at = whole.end();
    }
    out
}

/// The first fragment of `text` that looks like a reference but is not
/// inside a well-formed one.
///
/// Bare identifier tokens are legitimate in reference fields, so callers pass
/// `check_ids = false` there.
pub fn syntax_problem<'t>(text: &'t str, embedded: &[Embedded<'_>], check_ids: bool) -> Option<&'t str> {
    let covered = |span: &Range<usize>| {
        embedded
            .iter()
            .any(|e| e.span.start <= span.start && e.span.end >= span.end)
    };
    let plus = PLUS.find_iter(text).filter(|m| {
        let word = &m.as_str()[1..];
        !word.starts_with(|c: char| c.is_ascii_digit()) && !word.starts_with("verb")
    });
    let ids = BARE_ID.find_iter(text).filter(move |_| check_ids);
    plus.chain(BARE_REFID.find_iter(text))
        .chain(ids)
        .map(|m| m.range())
        .filter(|span| !covered(span))
        .min_by_key(|span| (span.start, usize::MAX - span.end))
        .map(|span| &text[span])
}

/// Whether a text field at `location` is a reference-holding field, where bare
/// identifiers are expected.
pub fn holds_references(location: &Location) -> bool {
    location.keys().any(|k| k == "hänvisning")
}

pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
