//! Resolving the references of a section against the index.

use std::collections::HashSet;

use salex_index::{Index, Reference, ReferenceSource, refs};
use salex_inflect::Inflector;
use salex_types::{BrokenHint, Namespace, SubLemma, Warning, WarningKind};
use tracing::debug;

/// Inflected forms of every visible headword, per namespace.
///
/// An unnumbered textual reference that does not resolve may still name a
/// form of some headword ("hundar" for "hund"), which is fine.
#[derive(Debug, Default)]
pub struct WordForms {
    forms: HashSet<(Namespace, String)>,
}

impl WordForms {
    pub fn build(index: &Index<'_>, inflector: Inflector<'_>) -> Self {
        let mut forms = HashSet::new();
        for ((namespace, _), members) in index.homograph_groups() {
            for section in members.iter().filter_map(|m| m.entry.section(*namespace)) {
                for form in inflector.forms(section, None) {
                    forms.insert((*namespace, form.form));
                }
            }
        }
        debug!(forms = forms.len(), "inflected forms of visible headwords");
        Self { forms }
    }

    pub fn contains(&self, namespace: Namespace, word: &str) -> bool {
        self.forms.contains(&(namespace, word.to_string()))
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

/// Read-only resolution state shared by the reference checks.
#[derive(Clone, Copy)]
pub struct Resolver<'c, 'a> {
    index: &'c Index<'a>,
    inflector: Inflector<'c>,
    word_forms: &'c WordForms,
}

impl<'c, 'a> Resolver<'c, 'a> {
    pub fn new(index: &'c Index<'a>, inflector: Inflector<'c>, word_forms: &'c WordForms) -> Self {
        Self {
            index,
            inflector,
            word_forms,
        }
    }

    /// What is wrong with `reference`, if anything.
    pub fn resolve(&self, reference: &Reference<'_>) -> Option<WarningKind> {
        let identifier = &reference.identifier;
        let namespace = identifier.namespace;
        let word_form = || {
            identifier.is_unnumbered_textual()
                && identifier
                    .headword()
                    .is_some_and(|hw| self.word_forms.contains(namespace, hw))
        };

        let Some(target) = self.index.get(identifier) else {
            if word_form() {
                return None;
            }
            let hint = identifier
                .headword()
                .filter(|hw| {
                    identifier.is_unnumbered_textual() && self.index.has_headword(namespace, hw)
                })
                .map(|_| BrokenHint::ProbablyMissingHomographNumber);
            return Some(WarningKind::BrokenReference {
                reference: identifier.to_string(),
                text: reference.text.clone(),
                hint,
            });
        };

        if !target.visible {
            if reference.is_parent_verb() || word_form() {
                return None;
            }
            return Some(WarningKind::SuppressedTargetReference {
                reference: identifier.to_string(),
                text: reference.text.clone(),
                target_name: target.entry.display_name(namespace),
            });
        }

        let ReferenceSource::Embedded { word } = &reference.source else {
            return None;
        };
        if word.is_empty() {
            return None;
        }
        let section = target.entry.section(namespace)?;
        if self.agrees(section, word) {
            return None;
        }
        Some(WarningKind::UnexpectedTargetWord {
            reference: identifier.to_string(),
            text: reference.text.clone(),
            word: word.clone(),
            expected: target.entry.headword.clone(),
        })
    }

    /// `word` is the target's headword, a variant form, or an inflected
    /// form of either.
    /// Exact match against the target's spellings and their inflected forms;
    /// case counts.
    fn agrees(&self, target: SubLemma<'_>, word: &str) -> bool {
        let headword = target.entry().headword.as_str();
        target.forms().into_iter().any(|form| {
            form == word || {
                let spelling = (form != headword).then_some(form);
                self.inflector
                    .forms(target, spelling)
                    .any(|f| f.form == word)
            }
        })
    }
}

/// Resolution and syntax findings for one section.
///
/// `extra` holds references found by other means (implicit ones); only
/// visible references are resolved.
pub fn check<'a>(
    section: SubLemma<'a>,
    resolver: Resolver<'_, '_>,
    extra: Vec<Reference<'a>>,
) -> Vec<Warning> {
    let entry = section.entry();
    let namespace = section.namespace();
    let mut out = Vec::new();

    let found = refs::references(section)
        .into_iter()
        .chain(extra.into_iter().map(Ok));
    for extracted in found {
        match extracted {
            Ok(reference) if reference.visible => {
                if let Some(kind) = resolver.resolve(&reference) {
                    out.push(Warning::new(
                        entry,
                        namespace,
                        Some(reference.location.to_string()),
                        kind,
                    ));
                }
            }
            Err(unreadable) if unreadable.visible => {
                out.push(Warning::new(
                    entry,
                    namespace,
                    Some(unreadable.location.to_string()),
                    WarningKind::UnknownReferenceKind {
                        text: unreadable.text,
                        reason: unreadable.error.to_string(),
                    },
                ));
            }
            _ => {}
        }
    }

    for (location, text) in refs::scannable_fields(section) {
        if !location.is_visible(section.body()) {
            continue;
        }
        let embedded = refs::find_embedded(text);
        let check_ids = !refs::holds_references(&location);
        if let Some(matched) = refs::syntax_problem(text, &embedded, check_ids) {
            out.push(Warning::new(
                entry,
                namespace,
                Some(location.to_string()),
                WarningKind::BadReferenceSyntax {
                    matched: matched.to_string(),
                    text: text.to_string(),
                },
            ));
        }
    }
    out
}
