//! Identifier index over a snapshot of Salex entries.
//!
//! Every entry *claims* identifiers: numeric ones declared in its identifier
//! fields, and one textual `(headword, homograph number)` key per namespace
//! section. Several entries may claim one key. [`precedence`] orders the
//! claims and the best one wins the key; visible claims beat hidden ones and,
//! in SAOL, a `variant` entry beats the entry whose variant form it spells out.
//!
//! The index is built once and is read-only afterwards:
//!
//! 1. Claims are extracted per entry on worker threads into a shared map.
//! 2. Each key's claims are sorted by [`precedence`]. Since that is a total
//!    order, the result does not depend on the order entries arrived in.
//! 3. Duplicate identifiers and homograph numbering are checked on the
//!    resolved index.
//!
//! ```rust
//! use salex_index::Index;
//! use salex_types::{Entry, Identifier, Namespace};
//!
//! let entries: Vec<Entry> = serde_json::from_str(r#"[
//!     {"id": "a", "ortografi": "katt", "so": {"homografNr": 1}},
//!     {"id": "b", "ortografi": "katt", "so": {"homografNr": 2}},
//!     {"id": "c", "ortografi": "katt", "so": {"homografNr": 2, "visas": false}}
//! ]"#).unwrap();
//! let index = Index::build(&entries);
//! let winner = index.get(&Identifier::textual(Namespace::So, "katt", Some(2))).unwrap();
//! assert_eq!(winner.entry.id, "b");
//! assert!(index.warnings().is_empty());
//! ```

mod extract;
pub mod homographs;
pub mod refs;

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::thread;
use std::time::Instant;

use dashmap::DashMap;
use salex_types::{Entry, Identifier, Key, Namespace, Warning, WarningKind};
use tracing::{debug, info};

pub use homographs::Homograph;
pub use refs::{Extracted, Reference, ReferenceSource, UnreadableReference};

/// One entry's claim on an identifier.
#[derive(Clone, Debug)]
pub struct Claim<'a> {
    pub entry: &'a Entry,
    pub visible: bool,
    /// The claiming entry is of type `variant`.
    pub variant: bool,
    /// Declaring field for numeric identifiers; `None` for textual ones.
    pub field: Option<String>,
}

impl Claim<'_> {
    fn rank(&self, namespace: Namespace) -> (bool, bool) {
        (
            self.visible,
            namespace == Namespace::Saol && self.variant,
        )
    }

    /// Same rank as `other` under [`precedence`], ignoring the tie-break.
    pub fn ties(&self, other: &Claim<'_>, namespace: Namespace) -> bool {
        self.rank(namespace) == other.rank(namespace)
    }
}

/// Total order on claims to one key; `Greater` means `a` should win.
///
/// Visible beats hidden. In SAOL a variant entry beats a non-variant one. The
/// rest is a tie broken by entry id (lower wins) and then declaring field, so
/// the winner depends only on the set of claims.
pub fn precedence(namespace: Namespace, a: &Claim<'_>, b: &Claim<'_>) -> Ordering {
    a.rank(namespace)
        .cmp(&b.rank(namespace))
        .then_with(|| b.entry.id.cmp(&a.entry.id))
        .then_with(|| b.field.cmp(&a.field))
}

/// Worker count used when the caller does not pick one.
pub fn default_threads() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// The resolved identifier index. Borrows the entry snapshot.
#[derive(Debug)]
pub struct Index<'a> {
    entries: &'a [Entry],
    claims: HashMap<Identifier, Vec<Claim<'a>>>,
    headwords: BTreeMap<(Namespace, String), Vec<Homograph<'a>>>,
    warnings: Vec<Warning>,
}

impl<'a> Index<'a> {
    pub fn build(entries: &'a [Entry]) -> Self {
        Self::build_with_threads(entries, default_threads())
    }

    pub fn build_with_threads(entries: &'a [Entry], threads: usize) -> Self {
        let start = Instant::now();
        let pending: DashMap<Identifier, Vec<Claim<'a>>> = DashMap::new();
        let chunk = entries.len().div_ceil(threads.max(1)).max(1);
        thread::scope(|scope| {
            for part in entries.chunks(chunk) {
                let pending = &pending;
                scope.spawn(move || {
                    for entry in part {
                        for (identifier, claim) in extract::entry_claims(entry) {
                            pending.entry(identifier).or_default().push(claim);
                        }
                    }
                });
            }
        });

        let mut claims: HashMap<Identifier, Vec<Claim<'a>>> = pending.into_iter().collect();
        let mut total = 0usize;
        for (identifier, list) in claims.iter_mut() {
            list.sort_by(|a, b| precedence(identifier.namespace, b, a));
            total += list.len();
        }
        info!(
            entries = entries.len(),
            identifiers = claims.len(),
            claims = total,
            "claims extracted in {} ms",
            start.elapsed().as_millis()
        );

        let mut index = Self {
            entries,
            claims,
            headwords: BTreeMap::new(),
            warnings: Vec::new(),
        };
        index.headwords = index.group_headwords();
        index.warnings = index.duplicates();
        let duplicates = index.warnings.len();
        let numbering = homographs::check(&index);
        info!(
            duplicates,
            homograph_groups = index.headwords.len(),
            numbering_errors = numbering.len(),
            "index built in {} ms",
            start.elapsed().as_millis()
        );
        index.warnings.extend(numbering);
        index
    }

    pub fn entries(&self) -> &'a [Entry] {
        self.entries
    }

    /// The winning claim for `identifier`.
    pub fn get(&self, identifier: &Identifier) -> Option<&Claim<'a>> {
        self.claims.get(identifier).and_then(|list| list.first())
    }

    /// All claims for `identifier`, best first.
    pub fn claims(&self, identifier: &Identifier) -> &[Claim<'a>] {
        self.claims.get(identifier).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether some visible section in `namespace` has this headword.
    pub fn has_headword(&self, namespace: Namespace, headword: &str) -> bool {
        self.headwords
            .contains_key(&(namespace, headword.to_string()))
    }

    /// Visible sections with this headword, in no particular order.
    pub fn homographs(&self, namespace: Namespace, headword: &str) -> &[Homograph<'a>] {
        self.headwords
            .get(&(namespace, headword.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn homograph_groups(
        &self,
    ) -> impl Iterator<Item = (&(Namespace, String), &Vec<Homograph<'a>>)> {
        self.headwords.iter()
    }

    /// Duplicate identifier and homograph numbering findings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    fn sorted_keys(&self) -> Vec<&Identifier> {
        let mut keys: Vec<&Identifier> = self.claims.keys().collect();
        keys.sort();
        keys
    }

    /// Visible claims from other entries that tie the winner.
    ///
    /// `(headword, None)` collisions belong to the homograph check.
    fn duplicates(&self) -> Vec<Warning> {
        let mut out = Vec::new();
        for identifier in self.sorted_keys() {
            if identifier.is_unnumbered_textual() {
                continue;
            }
            let Some((winner, rest)) = self.claims[identifier].split_first() else {
                continue;
            };
            if !winner.visible {
                continue;
            }
            for other in rest.iter().take_while(|c| c.ties(winner, identifier.namespace)) {
                if other.entry.id == winner.entry.id {
                    continue;
                }
                debug!(%identifier, winner = %winner.entry.id, other = %other.entry.id, "duplicate identifier");
                out.push(Warning::new(
                    other.entry,
                    identifier.namespace,
                    other.field.clone(),
                    WarningKind::duplicate(identifier, winner.entry),
                ));
            }
        }
        out
    }

    fn group_headwords(&self) -> BTreeMap<(Namespace, String), Vec<Homograph<'a>>> {
        let mut groups: BTreeMap<(Namespace, String), Vec<Homograph<'a>>> = BTreeMap::new();
        for identifier in self.sorted_keys() {
            let Key::Textual { headword, homograph } = &identifier.key else {
                continue;
            };
            for claim in self.claims[identifier].iter().filter(|c| c.visible) {
                groups
                    .entry((identifier.namespace, headword.clone()))
                    .or_default()
                    .push(Homograph {
                        entry: claim.entry,
                        number: *homograph,
                    });
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salex_types::{HomographDefect, NumericKind};
    use serde_json::{Value, json};

    fn fake_entries(values: Vec<Value>) -> Vec<Entry> {
        values
            .into_iter()
            .map(|v| serde_json::from_value(v).expect("entry fixture"))
            .collect()
    }

    fn defects(index: &Index<'_>) -> Vec<HomographDefect> {
        index
            .warnings()
            .iter()
            .filter_map(|w| match &w.kind {
                WarningKind::HomographNumbering { defect, .. } => Some(*defect),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn visible_claim_beats_hidden_one() {
        let entries = fake_entries(vec![
            json!({"id": "a", "ortografi": "katt", "so": {"homografNr": 1}}),
            json!({"id": "b", "ortografi": "katt", "so": {"homografNr": 2}}),
            json!({"id": "c", "ortografi": "katt", "so": {"homografNr": 2, "visas": false}}),
        ]);
        let index = Index::build_with_threads(&entries, 2);
        let key = Identifier::textual(Namespace::So, "katt", Some(2));
        assert_eq!(index.get(&key).unwrap().entry.id, "b");
        assert_eq!(index.claims(&key).len(), 2);
        assert!(index.warnings().is_empty());
        assert_eq!(index.homographs(Namespace::So, "katt").len(), 2);
    }

    #[test]
    fn reports_duplicate_numeric_identifiers() {
        let entries = fake_entries(vec![
            json!({"id": "a", "ortografi": "hund", "so": {"l_nr": "7"}}),
            json!({"id": "b", "ortografi": "katt", "so": {"l_nr": "lnr7"}}),
            json!({"id": "c", "ortografi": "mus", "so": {"l_nr": "7", "visas": false}}),
        ]);
        let index = Index::build_with_threads(&entries, 3);
        let warnings = index.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].entry_id, "b");
        assert_eq!(warnings[0].field.as_deref(), Some("l_nr"));
        assert_eq!(
            warnings[0].kind,
            WarningKind::DuplicateIdentifier {
                identifier: "lnr7".into(),
                other_entry_id: "a".into(),
                other_entry_name: "hund".into(),
            }
        );
    }

    #[test]
    fn saol_variant_entry_wins_its_parents_variant_id() {
        let entries = fake_entries(vec![
            json!({"id": "p", "ortografi": "mjölk", "saol": {
                "id": "1", "variantformer": [{"ortografi": "mjölck", "id": "2"}]
            }}),
            json!({"id": "v", "ortografi": "mjölck", "ingångstyp": "variant", "saol": {"id": "2"}}),
        ]);
        let index = Index::build(&entries);
        let key = Identifier::numeric(Namespace::Saol, NumericKind::Lemma, "2");
        assert_eq!(index.get(&key).unwrap().entry.id, "v");
        assert!(index.warnings().is_empty());
    }

    #[test]
    fn unnumbered_collisions_go_to_the_homograph_check() {
        let entries = fake_entries(vec![
            json!({"id": "a", "ortografi": "katt", "so": {}}),
            json!({"id": "b", "ortografi": "katt", "so": {}}),
        ]);
        let index = Index::build(&entries);
        assert_eq!(defects(&index), vec![HomographDefect::Missing]);
        assert_eq!(index.warnings().len(), 1);
    }

    #[test]
    fn reused_number_is_non_sequential() {
        let entries = fake_entries(vec![
            json!({"id": "a", "ortografi": "katt", "so": {"homografNr": 1}}),
            json!({"id": "b", "ortografi": "katt", "so": {"homografNr": 1}}),
        ]);
        let index = Index::build(&entries);
        assert!(defects(&index).contains(&HomographDefect::NonSequential));
        assert!(
            index
                .warnings()
                .iter()
                .any(|w| matches!(w.kind, WarningKind::DuplicateIdentifier { .. }))
        );
    }

    #[test]
    fn lone_numbered_homograph_is_unnecessary() {
        let entries = fake_entries(vec![
            json!({"id": "a", "ortografi": "katt", "so": {"homografNr": 1}}),
            json!({"id": "b", "ortografi": "katt", "so": {"homografNr": 2, "visas": false}}),
        ]);
        let index = Index::build(&entries);
        assert_eq!(defects(&index), vec![HomographDefect::Unnecessary]);
    }

    #[test]
    fn see_under_inflected_form_is_left_out_of_numbering() {
        let entries = fake_entries(vec![
            json!({"id": "a", "ortografi": "bar", "saol": {"homografNr": 1, "id": "1"}}),
            json!({"id": "b", "ortografi": "bar", "saol": {"homografNr": 2, "id": "2"}}),
            json!({"id": "c", "ortografi": "bar", "ingångstyp": "se under",
                   "saol": {"homografNr": 3, "hänvisning": "+bära(refid=lnr9)"}}),
            json!({"id": "d", "ortografi": "bära", "saol": {"id": "9"}}),
        ]);
        let index = Index::build(&entries);
        assert_eq!(defects(&index), vec![HomographDefect::SeeUnderNumbered]);
    }

    #[test]
    fn see_under_spelling_pointer_is_numbered_normally() {
        let entries = fake_entries(vec![
            json!({"id": "a", "ortografi": "bar", "saol": {"homografNr": 1, "id": "1"}}),
            json!({"id": "c", "ortografi": "bar", "ingångstyp": "se under",
                   "saol": {"homografNr": 2, "hänvisning": "+bar(refid=lnr1)"}}),
        ]);
        let index = Index::build(&entries);
        assert!(defects(&index).is_empty());
    }
}
