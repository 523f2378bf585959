//! Quality checks over a snapshot of Salex entries.
//!
//! [`Linter::run`] validates the snapshot, builds the identifier index, and
//! then checks every entry against it in parallel:
//!
//! * references resolve, point at visible entries and name the word the
//!   target actually has;
//! * text fields hold no half-written references;
//! * markup parses and brackets balance;
//! * declared inflected forms look like forms of the headword;
//! * particle verbs inflect like their parent verb.
//!
//! Findings come back as one sorted list of [`Warning`]s. Only a structurally
//! broken snapshot or config is an error.
//!
//! ```rust
//! use salex_inflect::RuleTable;
//! use salex_lint::{LintConfig, Linter};
//! use salex_types::{Entry, WarningKind};
//!
//! let entries: Vec<Entry> = serde_json::from_str(r#"[
//!     {"id": "a", "ortografi": "katt", "so": {"l_nr": "1001"}},
//!     {"id": "b", "ortografi": "hund", "so": {
//!         "huvudbetydelser": [{"definition": "inte en +hund(refid=lnr1001)"}]
//!     }}
//! ]"#).unwrap();
//! let rules = RuleTable::default();
//! let config = LintConfig::default();
//! let warnings = Linter::new(&rules, &config).run(&entries).unwrap();
//! assert!(matches!(
//!     &warnings[0].kind,
//!     WarningKind::UnexpectedTargetWord { expected, .. } if expected == "katt"
//! ));
//! ```

pub mod config;
pub mod implicit;
pub mod inflection;
pub mod markup;
pub mod references;
pub mod source;

use std::collections::BTreeMap;
use std::panic;
use std::thread;
use std::time::Instant;

use salex_index::Index;
use salex_inflect::{ClassEnrichment, Inflector, RuleTable};
use salex_types::{Entry, SnapshotError, Warning, validate_snapshot};
use thiserror::Error;
use tracing::info;

pub use config::{ConfigError, ImplicitReferenceConfig, LintConfig};
pub use implicit::ImplicitScanner;
pub use references::{Resolver, WordForms};
pub use source::LoadMode;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LintError {
    #[error("invalid snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
}

/// A configured lint run over one rule table.
#[derive(Clone, Copy, Debug)]
pub struct Linter<'c> {
    rules: &'c RuleTable,
    config: &'c LintConfig,
}

impl<'c> Linter<'c> {
    pub fn new(rules: &'c RuleTable, config: &'c LintConfig) -> Self {
        Self { rules, config }
    }

    pub fn run(&self, entries: &[Entry]) -> Result<Vec<Warning>, LintError> {
        self.config.validate()?;
        validate_snapshot(entries)?;
        let start = Instant::now();
        let threads = self.config.threads;

        let index = Index::build_with_threads(entries, threads);
        let enrichment = ClassEnrichment::from_entries(entries);
        let inflector = Inflector::new(self.rules, &enrichment);
        let word_forms = WordForms::build(&index, inflector);
        let implicit = ImplicitScanner::new(&self.config.implicit_references)?;
        info!(
            borrowed_classes = enrichment.len(),
            word_forms = word_forms.len(),
            "resolution state ready"
        );

        let checker = Checker {
            config: self.config,
            index: &index,
            inflector,
            resolver: Resolver::new(&index, inflector, &word_forms),
            implicit: implicit.as_ref(),
        };
        let mut warnings = index.warnings().to_vec();
        warnings.extend(checker.check_all(entries, threads));
        warnings.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let mut tally: BTreeMap<&str, usize> = BTreeMap::new();
        for warning in &warnings {
            *tally.entry(warning.kind.name()).or_default() += 1;
        }
        for (kind, count) in &tally {
            info!(kind, count, "warnings");
        }
        info!(
            entries = entries.len(),
            warnings = warnings.len(),
            "lint finished in {} ms",
            start.elapsed().as_millis()
        );
        Ok(warnings)
    }
}

/// Per-entry checks over read-only shared state.
struct Checker<'c, 'a> {
    config: &'c LintConfig,
    index: &'c Index<'a>,
    inflector: Inflector<'c>,
    resolver: Resolver<'c, 'a>,
    implicit: Option<&'c ImplicitScanner>,
}

impl Checker<'_, '_> {
    fn check_all(&self, entries: &[Entry], threads: usize) -> Vec<Warning> {
        let chunk = entries.len().div_ceil(threads.max(1)).max(1);
        thread::scope(|scope| {
            let handles: Vec<_> = entries
                .chunks(chunk)
                .map(|part| {
                    scope.spawn(move || {
                        part.iter()
                            .flat_map(|entry| self.check_entry(entry))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap_or_else(|p| panic::resume_unwind(p)))
                .collect()
        })
    }

    fn check_entry(&self, entry: &Entry) -> Vec<Warning> {
        let mut out = Vec::new();
        for section in entry.sections() {
            let implicit = match self.implicit {
                Some(scanner) if section.is_visible() => scanner.references(section, self.index),
                _ => Vec::new(),
            };
            out.extend(references::check(section, self.resolver, implicit));
            if !section.is_visible() {
                continue;
            }
            if self.config.check_markup {
                out.extend(markup::check(section));
            }
            if self.config.check_inflections {
                out.extend(inflection::check_forms(section, self.inflector));
            }
        }
        if self.config.check_parent_verbs {
            out.extend(inflection::check_parent_verb(entry, self.index));
        }
        out
    }
}
