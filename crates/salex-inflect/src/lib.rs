//! Inflection rules for Salex headwords.
//!
//! A [`RuleTable`] maps an inflection class (`böjningsklass`) to an ordered
//! list of [`Rule`]s. Each rule is a grammatical tag plus a list of [`EditOp`]s
//! applied left to right to the base word. A rule that assumes something the
//! word does not have (a missing suffix, say) fails with [`NotApplicable`] and
//! is skipped; it never produces a form.
//!
//! [`Inflector`] ties the table to entries. It resolves the set of classes for
//! a section, including classes borrowed from the sibling namespace through
//! [`ClassEnrichment`], and keeps the particle of particle and reflexive verbs
//! out of the rewriting.
//!
//! # Example
//! ```rust
//! use salex_inflect::{ClassEnrichment, Inflector, RuleTable};
//! use salex_types::{Entry, Namespace};
//!
//! # fn main() -> anyhow::Result<()> {
//! let table = RuleTable::from_json(r#"{
//!     "A12": [{"tag": "presens", "ops": [{"strip_suffix": "a"}, {"append": "er"}]}]
//! }"#)?;
//! let entry: Entry = serde_json::from_str(
//!     r#"{"id": "e1", "ortografi": "springa", "ordklass": "verb", "so": {"böjningsklass": "A12"}}"#,
//! )?;
//! let section = entry.section(Namespace::So).expect("so section");
//! let enrichment = ClassEnrichment::default();
//! let inflector = Inflector::new(&table, &enrichment);
//! let forms: Vec<_> = inflector.forms(section, None).collect();
//! assert_eq!(forms[0].form, "springer");
//! assert_eq!(forms[0].tag, "presens");
//! # Ok(()) }
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use salex_types::{Entry, Namespace, SubLemma};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// One string edit.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditOp {
    /// Remove a suffix the word must end with.
    StripSuffix(String),
    /// Remove a prefix the word must start with.
    StripPrefix(String),
    Append(String),
    Prepend(String),
    /// Swap one ending for another; the word must end with `from`.
    ReplaceSuffix { from: String, to: String },
    /// Leave the word alone, but only if it ends with the suffix.
    RequireSuffix(String),
    /// Drop this many trailing characters, keeping at least one.
    DropLast(usize),
    /// Repeat the final character (`glad` → `gladd`).
    DoubleLast,
}

impl EditOp {
    pub fn apply(&self, word: &str) -> Result<String, NotApplicable> {
        let refuse = || NotApplicable {
            op: self.to_string(),
            word: word.to_string(),
        };
        match self {
            EditOp::StripSuffix(suffix) => word
                .strip_suffix(suffix.as_str())
                .map(str::to_string)
                .ok_or_else(refuse),
            EditOp::StripPrefix(prefix) => word
                .strip_prefix(prefix.as_str())
                .map(str::to_string)
                .ok_or_else(refuse),
            EditOp::Append(suffix) => Ok(format!("{word}{suffix}")),
            EditOp::Prepend(prefix) => Ok(format!("{prefix}{word}")),
            EditOp::ReplaceSuffix { from, to } => word
                .strip_suffix(from.as_str())
                .map(|stem| format!("{stem}{to}"))
                .ok_or_else(refuse),
            EditOp::RequireSuffix(suffix) => {
                if word.ends_with(suffix.as_str()) {
                    Ok(word.to_string())
                } else {
                    Err(refuse())
                }
            }
            EditOp::DropLast(n) => {
                let count = word.chars().count();
                if *n >= count {
                    return Err(refuse());
                }
                Ok(word.chars().take(count - n).collect())
            }
            EditOp::DoubleLast => {
                let last = word.chars().next_back().ok_or_else(refuse)?;
                Ok(format!("{word}{last}"))
            }
        }
    }
}

impl fmt::Display for EditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditOp::StripSuffix(s) => write!(f, "strip suffix -{s}"),
            EditOp::StripPrefix(s) => write!(f, "strip prefix {s}-"),
            EditOp::Append(s) => write!(f, "append -{s}"),
            EditOp::Prepend(s) => write!(f, "prepend {s}-"),
            EditOp::ReplaceSuffix { from, to } => write!(f, "replace -{from} with -{to}"),
            EditOp::RequireSuffix(s) => write!(f, "require -{s}"),
            EditOp::DropLast(n) => write!(f, "drop last {n}"),
            EditOp::DoubleLast => f.write_str("double last"),
        }
    }
}

/// A rule that does not fit a word. Expected and recoverable.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("`{op}` does not apply to `{word}`")]
pub struct NotApplicable {
    pub op: String,
    pub word: String,
}

/// One inflected form a class produces, e.g. `presens`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub tag: String,
    pub ops: Vec<EditOp>,
}

impl Rule {
    pub fn apply(&self, word: &str) -> Result<String, NotApplicable> {
        self.ops
            .iter()
            .try_fold(word.to_string(), |current, op| op.apply(&current))
    }
}

/// Inflection class → ordered rules. Loaded once per run.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTable {
    classes: HashMap<String, Vec<Rule>>,
}

impl RuleTable {
    /// Read a rule table from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            std::fs::read(path).with_context(|| format!("read rule table {}", path.display()))?;
        Self::from_slice(&bytes).with_context(|| format!("parse rule table {}", path.display()))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let table: Self = serde_json::from_slice(bytes).context("decode inflection rules")?;
        info!(
            classes = table.classes.len(),
            rules = table.classes.values().map(Vec::len).sum::<usize>(),
            "loaded inflection rules"
        );
        Ok(table)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_slice(text.as_bytes())
    }

    /// Rules for `class`; empty for unknown classes.
    pub fn rules(&self, class: &str) -> &[Rule] {
        self.classes.get(class).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Classes borrowed across namespaces.
///
/// A headword recorded once as a SAOL-only entry and once as an SO-only entry
/// (same word class) gets the classes of both records. Only records with a
/// visible section in exactly one namespace and an inflection class count;
/// the class is the section's own when it declares one.
#[derive(Clone, Debug, Default)]
pub struct ClassEnrichment {
    extra: HashMap<(String, String), BTreeSet<String>>,
}

impl ClassEnrichment {
    pub fn from_entries(entries: &[Entry]) -> Self {
        let mut seen: HashMap<Namespace, HashMap<(String, String), BTreeSet<String>>> =
            HashMap::new();
        for entry in entries {
            for namespace in Namespace::ALL {
                let only_here = entry.section(namespace.other()).is_none();
                if let Some(section) = entry.section(namespace)
                    && section.is_visible()
                    && only_here
                    && let Some(class) = section.inflection_class()
                {
                    seen.entry(namespace)
                        .or_default()
                        .entry((entry.headword.clone(), entry.word_class_key().to_string()))
                        .or_default()
                        .insert(class);
                }
            }
        }

        let saol = seen.remove(&Namespace::Saol).unwrap_or_default();
        let so = seen.remove(&Namespace::So).unwrap_or_default();
        let mut extra = HashMap::new();
        for (key, mut classes) in saol {
            if let Some(other) = so.get(&key) {
                classes.extend(other.iter().cloned());
                extra.insert(key, classes);
            }
        }
        debug!(headwords = extra.len(), "cross-namespace inflection classes");
        Self { extra }
    }

    pub fn classes_for(&self, word: &str, word_class: &str) -> impl Iterator<Item = &str> {
        self.extra
            .get(&(word.to_string(), word_class.to_string()))
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.extra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extra.is_empty()
    }
}

/// A generated form and the tag of the rule that made it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InflectedForm {
    pub tag: String,
    pub form: String,
}

/// Generates inflected forms for entry sections. Cheap to copy, safe to share.
#[derive(Clone, Copy, Debug)]
pub struct Inflector<'r> {
    rules: &'r RuleTable,
    enrichment: &'r ClassEnrichment,
}

impl<'r> Inflector<'r> {
    pub fn new(rules: &'r RuleTable, enrichment: &'r ClassEnrichment) -> Self {
        Self { rules, enrichment }
    }

    pub fn rules(&self) -> &'r RuleTable {
        self.rules
    }

    /// The section's own class (or the entry's, if the section has none)
    /// first, then borrowed ones, without repeats.
    ///
    /// `word` is the spelling being inflected when it differs from the headword
    /// (a variant form); borrowed classes are looked up under both spellings.
    pub fn classes(&self, section: SubLemma<'_>, word: Option<&str>) -> Vec<String> {
        let entry = section.entry();
        let word_class = entry.word_class_key();
        let mut classes: Vec<String> = section.inflection_class().into_iter().collect();
        let borrowed = word
            .into_iter()
            .chain([entry.headword.as_str()])
            .flat_map(|w| self.enrichment.classes_for(w, word_class));
        for class in borrowed {
            if !classes.iter().any(|c| c == class) {
                classes.push(class.to_string());
            }
        }
        classes
    }

    /// Forms for `word` (default: the headword), one per applicable rule, in
    /// rule order. The particle of a particle or reflexive verb is carried
    /// through untouched.
    pub fn forms(
        &self,
        section: SubLemma<'_>,
        word: Option<&str>,
    ) -> impl Iterator<Item = InflectedForm> + use<'r> {
        let rules = self.rules;
        let entry = section.entry();
        let target = word.unwrap_or(&entry.headword);
        let (stem, particle) = if entry.has_particle() {
            split_particle(target)
        } else {
            (target.to_string(), None)
        };
        let plan: Vec<&'r [Rule]> = self
            .classes(section, word)
            .iter()
            .map(|class| rules.rules(class))
            .collect();

        plan.into_iter().flatten().filter_map(move |rule| {
            let form = rule.apply(&stem).ok()?;
            let form = match &particle {
                Some(p) => format!("{form} {p}"),
                None => form,
            };
            Some(InflectedForm {
                tag: rule.tag.clone(),
                form,
            })
        })
    }
}

/// `"springa ut"` → `("springa", Some("ut"))`.
fn split_particle(word: &str) -> (String, Option<String>) {
    let mut parts = word.split_whitespace();
    let head = parts.next().unwrap_or_default().to_string();
    let rest: Vec<&str> = parts.collect();
    if rest.is_empty() {
        (head, None)
    } else {
        (head, Some(rest.join(" ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn fake_entry(value: serde_json::Value) -> Entry {
        serde_json::from_value(value).expect("entry fixture")
    }

    fn so(entry: &Entry) -> SubLemma<'_> {
        entry.section(Namespace::So).expect("so section")
    }

    fn fake_table() -> RuleTable {
        RuleTable::from_json(
            r#"{
                "A12": [
                    {"tag": "presens", "ops": [{"strip_suffix": "a"}, {"append": "er"}]},
                    {"tag": "supinum", "ops": [{"replace_suffix": {"from": "inga", "to": "ungit"}}]}
                ],
                "B1": [
                    {"tag": "pl obest", "ops": [{"append": "er"}]},
                    {"tag": "sg best", "ops": ["double_last", {"append": "en"}]}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn applies_rules_in_order() {
        let table = fake_table();
        let enrichment = ClassEnrichment::default();
        let inflector = Inflector::new(&table, &enrichment);
        let entry = fake_entry(json!({
            "id": "e1", "ortografi": "springa", "ordklass": "verb", "böjningsklass": "A12",
            "so": {}
        }));
        let forms: Vec<_> = inflector.forms(so(&entry), None).collect();
        assert_eq!(
            forms,
            vec![
                InflectedForm {
                    tag: "presens".into(),
                    form: "springer".into()
                },
                InflectedForm {
                    tag: "supinum".into(),
                    form: "sprungit".into()
                },
            ]
        );
    }

    #[test]
    fn inapplicable_rules_are_omitted() {
        let table = fake_table();
        let enrichment = ClassEnrichment::default();
        let inflector = Inflector::new(&table, &enrichment);
        let entry = fake_entry(json!({
            "id": "e1", "ortografi": "gå", "ordklass": "verb", "böjningsklass": "A12",
            "so": {}
        }));
        assert_eq!(inflector.forms(so(&entry), None).count(), 0);

        let rule = &table.rules("A12")[0];
        assert!(rule.apply("gå").is_err());
        assert!(table.rules("unknown").is_empty());
    }

    #[test]
    fn keeps_particle_out_of_rewriting() {
        let table = fake_table();
        let enrichment = ClassEnrichment::default();
        let inflector = Inflector::new(&table, &enrichment);
        let entry = fake_entry(json!({
            "id": "e1",
            "ortografi": "springa ut",
            "ordklass": "ptv.",
            "ingångstyp": "partikelverb",
            "böjningsklass": "A12",
            "so": {}
        }));
        let forms: Vec<String> = inflector.forms(so(&entry), None).map(|f| f.form).collect();
        assert_eq!(forms, vec!["springer ut", "sprungit ut"]);
    }

    #[test]
    fn section_class_overrides_the_entry_class() {
        let table = fake_table();
        let enrichment = ClassEnrichment::default();
        let inflector = Inflector::new(&table, &enrichment);
        let entry = fake_entry(json!({
            "id": "e1", "ortografi": "springa", "ordklass": "verb", "böjningsklass": "B1",
            "saol": {},
            "so": {"böjningsklass": "A12"}
        }));
        assert_eq!(inflector.classes(so(&entry), None), vec!["A12"]);
        let forms: Vec<String> = inflector.forms(so(&entry), None).map(|f| f.form).collect();
        assert_eq!(forms, vec!["springer", "sprungit"]);

        let saol = entry.section(Namespace::Saol).unwrap();
        assert_eq!(inflector.classes(saol, None), vec!["B1"]);

        let bare = fake_entry(json!({
            "id": "e2", "ortografi": "springa", "ordklass": "verb", "so": {"böjningsklass": "A12"}
        }));
        assert_eq!(inflector.forms(so(&bare), None).count(), 2);
    }

    #[test]
    fn borrows_classes_from_the_sibling_namespace() {
        let entries = vec![
            fake_entry(json!({
                "id": "s", "ortografi": "bil", "ordklass": "subst.", "böjningsklass": "B1",
                "saol": {}
            })),
            fake_entry(json!({
                "id": "o", "ortografi": "bil", "ordklass": "subst.", "böjningsklass": "B9",
                "so": {}
            })),
            fake_entry(json!({
                "id": "h", "ortografi": "bil", "ordklass": "subst.", "böjningsklass": "B7",
                "so": {"visas": false}
            })),
        ];
        let enrichment = ClassEnrichment::from_entries(&entries);
        assert_eq!(enrichment.len(), 1);
        assert_eq!(
            enrichment.classes_for("bil", "subst.").collect::<Vec<_>>(),
            vec!["B1", "B9"]
        );

        let table = fake_table();
        let inflector = Inflector::new(&table, &enrichment);
        assert_eq!(inflector.classes(so(&entries[1]), None), vec!["B9", "B1"]);
        let forms: Vec<String> = inflector.forms(so(&entries[1]), None).map(|f| f.form).collect();
        assert_eq!(forms, vec!["biler", "billen"]);
    }

    #[test]
    fn edit_ops_refuse_what_they_cannot_do() {
        assert!(EditOp::DropLast(3).apply("bil").is_err());
        assert_eq!(EditOp::DropLast(1).apply("bil").unwrap(), "bi");
        assert!(EditOp::DoubleLast.apply("").is_err());
        assert_eq!(EditOp::Prepend("o".into()).apply("glad").unwrap(), "oglad");
        assert_eq!(EditOp::StripPrefix("o".into()).apply("oglad").unwrap(), "glad");
        assert!(EditOp::RequireSuffix("a".into()).apply("bil").is_err());
        let err = EditOp::StripSuffix("a".into()).apply("bil").unwrap_err();
        assert_eq!(err.to_string(), "`strip suffix -a` does not apply to `bil`");
    }

    #[test]
    fn loads_rules_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"{"X": [{"tag": "t", "ops": []}]}"#).unwrap();
        let table = RuleTable::load(&path).unwrap();
        assert!(table.contains("X"));
        assert_eq!(table.rules("X")[0].apply("ord").unwrap(), "ord");

        std::fs::write(&path, r#"{"X": [{"tag": "t", "ops": [{"bogus": 1}]}]}"#).unwrap();
        let err = RuleTable::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("parse rule table"));
    }

    fn any_op() -> impl Strategy<Value = EditOp> {
        let affix = "[a-zåäö]{0,3}";
        prop_oneof![
            affix.prop_map(EditOp::StripSuffix),
            affix.prop_map(EditOp::StripPrefix),
            affix.prop_map(EditOp::Append),
            affix.prop_map(EditOp::Prepend),
            (affix, affix).prop_map(|(from, to)| EditOp::ReplaceSuffix { from, to }),
            affix.prop_map(EditOp::RequireSuffix),
            (0usize..5).prop_map(EditOp::DropLast),
            Just(EditOp::DoubleLast),
        ]
    }

    proptest! {
        #[test]
        fn interpreter_never_panics(
            word in "[a-zåäö ]{0,12}",
            ops in prop::collection::vec(any_op(), 0..5),
        ) {
            let rule = Rule { tag: "t".into(), ops };
            if let Ok(form) = rule.apply(&word) {
                // Without stripping ops a non-empty word stays non-empty.
                let shrinks = rule.ops.iter().any(|op| matches!(
                    op,
                    EditOp::StripSuffix(_) | EditOp::StripPrefix(_) | EditOp::ReplaceSuffix { .. }
                ));
                prop_assert!(shrinks || !form.is_empty() || word.is_empty());
            }
        }
    }
}
