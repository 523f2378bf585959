//! References that are only typographic.
//!
//! Definitions often point at another headword by setting it in italics,
//! followed by a superscript homograph number when the headword has several
//! homographs: `se [i katt][sup 2]`. This is a heuristic and only as good as
//! the editors' consistency; [`ImplicitReferenceConfig`] holds its knobs.

use salex_index::{Index, Reference, ReferenceSource};
use salex_markup::{Markup, Tag};
use salex_types::{FieldPath, Identifier, Namespace, SubLemma};

use crate::config::{ConfigError, ImplicitReferenceConfig};

const TRIM: &[char] = &[',', ';', ':', '.', '(', ')', '"', '!', '?'];

/// An emphasised phrase and the homograph number written after it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Phrase {
    pub text: String,
    pub homograph: Option<u32>,
}

pub struct ImplicitScanner {
    saol_fields: Vec<FieldPath>,
    so_fields: Vec<FieldPath>,
    emphasis: Tag,
    homograph: Tag,
    min_chars: usize,
}

impl ImplicitScanner {
    /// `None` when the scan is switched off.
    pub fn new(config: &ImplicitReferenceConfig) -> Result<Option<Self>, ConfigError> {
        if !config.enabled {
            return Ok(None);
        }
        let (emphasis, homograph) = config.tags()?;
        let parse = |ns: Namespace| -> Vec<FieldPath> {
            config.fields(ns).iter().map(|p| FieldPath::parse(p)).collect()
        };
        Ok(Some(Self {
            saol_fields: parse(Namespace::Saol),
            so_fields: parse(Namespace::So),
            emphasis,
            homograph,
            min_chars: config.min_phrase_chars,
        }))
    }

    fn fields(&self, namespace: Namespace) -> &[FieldPath] {
        match namespace {
            Namespace::Saol => &self.saol_fields,
            Namespace::So => &self.so_fields,
        }
    }

    /// Emphasised phrases in the configured fields that name a headword.
    ///
    /// A phrase without a number must be a headword, visible or archived. A
    /// phrase ending in a hyphen without a number is a word-formation
    /// element. The section's own headword and number are skipped.
    pub fn references<'a>(&self, section: SubLemma<'a>, index: &Index<'_>) -> Vec<Reference<'a>> {
        let namespace = section.namespace();
        let body = section.body();
        let entry = section.entry();
        let mut out = Vec::new();
        for path in self.fields(namespace) {
            for location in path.expand(body) {
                let Some(text) = location.get(body).and_then(|v| v.as_str()) else {
                    continue;
                };
                let Ok(markup) = salex_markup::parse(text) else {
                    continue;
                };
                let visible = location.is_visible(body);
                for phrase in self.phrases(&markup) {
                    if phrase.text.chars().count() < self.min_chars {
                        continue;
                    }
                    if phrase.text == entry.headword && phrase.homograph == section.homograph() {
                        continue;
                    }
                    let identifier = Identifier::textual(namespace, &phrase.text, phrase.homograph);
                    if phrase.homograph.is_none()
                        && (phrase.text.ends_with('-')
                            || !(index.has_headword(namespace, &phrase.text)
                                || !index.claims(&identifier).is_empty()))
                    {
                        continue;
                    }
                    out.push(Reference {
                        entry,
                        namespace,
                        location: location.clone(),
                        text: identifier.to_string(),
                        identifier,
                        source: ReferenceSource::Implicit,
                        visible,
                    });
                }
            }
        }
        out
    }

    /// Runs carrying the emphasis tag, each with the number of an adjacent
    /// homograph-tagged run if there is one.
    pub fn phrases(&self, markup: &Markup) -> Vec<Phrase> {
        let mut out = Vec::new();
        let mut fragments = markup.fragments().peekable();
        while let Some(fragment) = fragments.next() {
            if !fragment.has_tag(self.emphasis) || fragment.has_tag(self.homograph) {
                continue;
            }
            let text = fragment.text.trim().trim_matches(TRIM).trim();
            if text.is_empty() {
                continue;
            }
            let homograph = fragments
                .next_if(|next| next.has_tag(self.homograph))
                .and_then(|next| next.text.trim().parse().ok());
            out.push(Phrase {
                text: text.to_string(),
                homograph,
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> ImplicitScanner {
        ImplicitScanner::new(&ImplicitReferenceConfig::default())
            .unwrap()
            .unwrap()
    }

    fn phrase(text: &str, homograph: Option<u32>) -> Phrase {
        Phrase {
            text: text.into(),
            homograph,
        }
    }

    #[test]
    fn finds_emphasised_phrases_and_numbers() {
        let markup = salex_markup::parse("jfr [i katt][sup 2], [i hund], [i tam-] och [i vild [sup 1]]").unwrap();
        assert_eq!(
            scanner().phrases(&markup),
            vec![
                phrase("katt", Some(2)),
                phrase("hund", None),
                phrase("tam-", None),
                phrase("vild", Some(1)),
            ]
        );
    }

    #[test]
    fn number_must_follow_directly() {
        let markup = salex_markup::parse("[i katt] och [sup 2]").unwrap();
        assert_eq!(scanner().phrases(&markup), vec![phrase("katt", None)]);
    }

    #[test]
    fn disabled_scan_builds_nothing() {
        let config = ImplicitReferenceConfig {
            enabled: false,
            ..ImplicitReferenceConfig::default()
        };
        assert!(ImplicitScanner::new(&config).unwrap().is_none());
    }
}
