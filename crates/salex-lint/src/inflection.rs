//! Declared inflected forms against the headword, and particle verbs against
//! their parent verb.

use std::collections::HashSet;

use salex_index::{Index, Reference, refs};
use salex_inflect::Inflector;
use salex_markup::{Fragment, Tag};
use salex_types::{Entry, Namespace, SubLemma, Warning, WarningKind};
use tracing::debug;

/// Irregular headwords whose forms share little with the base.
const EXCEPTIONS: &[&str] = &[
    "illa", "litet", "jag", "prinsregent", "envar", "halvannan", "skola", "endera", "dålig",
    "kunna", "vilkendera", "petit-chou", "mycken", "inner", "marxism-leninism", "bakända",
    "någondera", "föga", "liten", "mången", "lite", "gärna", "mycket", "god", "ond",
];

/// One vowel of the headword may alternate into one of these in a form.
const VOWEL_CHANGES: &[(char, &[char])] = &[
    ('a', &['ä', 'ö', 'o']),
    ('i', &['a', 'e', 'u', 'å']),
    ('o', &['ö']),
    ('u', &['ö', 'y']),
    ('y', &['ö', 'u']),
    ('å', &['ä', 'ö']),
    ('ä', &['a', 'u', 'å', 'o']),
    ('ö', &['u', 'o']),
];

const SUFFIX_CHANGES: &[(&str, &[&str])] = &[
    ("er", &["rar"]),
    ("veta", &["visste"]),
    ("göra", &["gjorde", "gjort"]),
    ("denna", &["detta", "dessa"]),
    ("denne", &["detta", "dessa"]),
    ("säga", &["sagt"]),
    ("dda", &["tt"]),
    ("liten", &["små"]),
    ("vilken", &["vars"]),
    ("gammal", &["äldre", "äldst"]),
    ("annan", &["andre", "annat", "andra"]),
    ("väl", &["bättre", "bäst"]),
    ("vara", &["är"]),
    ("bringa", &["bragd", "bragte", "bragt"]),
    ("skäla", &["stal", "stulit", "stulen", "stulna", "stulet"]),
];

const PREFIX_CHANGES: &[(&str, &[&str])] = &[("ingen", &["inget", "inga"]), ("den", &["det", "de"])];

/// Spelling alternations applied to both sides before comparing.
const REPLACEMENTS: &[(&str, &str)] = &[
    ("rj", "rd"),
    ("dj", "dd"),
    ("gj", "g"),
    ("gg", "g"),
    ("skj", "sk"),
    ("stj", "sk"),
    ("mm", "m"),
    ("vart", "var"),
    ("mar", "mr"),
];

const SUFFIX_DROPS: &[&str] = &["s"];

/// Tokens of the declared inflection that neither the rules generate nor
/// look like a form of the headword.
pub fn check_forms(section: SubLemma<'_>, inflector: Inflector<'_>) -> Option<Warning> {
    let entry = section.entry();
    let headword = entry.headword.as_str();
    if !section.is_visible() || headword.split_whitespace().count() > 1 || EXCEPTIONS.contains(&headword)
    {
        return None;
    }
    let inflection = section.inflection()?;
    let Ok(markup) = salex_markup::parse(inflection) else {
        // The markup check reports it.
        return None;
    };
    let keep = |fragment: &Fragment<'_>| match section.namespace() {
        Namespace::Saol => fragment.is_untagged(),
        Namespace::So => fragment.tags == [Tag::Italic],
    };
    let declared: Vec<&str> = markup
        .fragments()
        .filter(|f| keep(f))
        .map(|f| f.text)
        .collect();
    let declared = declared.join(" ");

    let mut generated: HashSet<String> = HashSet::new();
    for form in section.forms() {
        let word = (form != headword).then_some(form);
        generated.extend(inflector.forms(section, word).map(|f| f.form.to_lowercase()));
    }

    let base = headword.to_lowercase();
    let forms: Vec<String> = tokens(&declared)
        .into_iter()
        .filter(|token| !generated.contains(token) && suspicious(&base, token))
        .collect();
    if forms.is_empty() {
        return None;
    }
    debug!(entry = %entry.id, ?forms, "suspicious inflected forms");
    Some(Warning::new(
        entry,
        section.namespace(),
        Some("böjning".into()),
        WarningKind::InflectionMismatch {
            inflection: inflection.to_string(),
            classes: inflector.classes(section, None),
            forms,
        },
    ))
}

/// Lowercased words of the declared text. Parentheses are dropped, bracketed
/// asides removed and commas trimmed.
fn tokens(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase().replace(['(', ')'], "");
    let mut without_brackets = String::with_capacity(lowered.len());
    let mut depth = 0usize;
    for c in lowered.chars() {
        match c {
            '[' => {
                depth += 1;
                without_brackets.push(' ');
            }
            ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => without_brackets.push(c),
            _ => {}
        }
    }
    without_brackets
        .split_whitespace()
        .map(|t| t.replace(',', ""))
        .filter(|t| t.starts_with(char::is_alphabetic))
        .collect()
}

/// Whether `form` is unlikely to be an inflection of `word`.
///
/// Both are normalised, then they must share a prefix no more than two
/// characters shorter than the word, allowing one vowel alternation.
pub fn suspicious(word: &str, form: &str) -> bool {
    let original = word;
    let mut word = word.to_string();
    let mut form = form.replace(',', "");
    if !form.starts_with(char::is_alphabetic) {
        return false;
    }
    for (from, to) in REPLACEMENTS {
        word = word.replace(from, to);
        form = form.replace(from, to);
    }
    for suffix in SUFFIX_DROPS {
        if word.ends_with(suffix) && form.ends_with(suffix) {
            word.truncate(word.len() - suffix.len());
            form.truncate(form.len() - suffix.len());
        }
    }
    for (suffix, replacements) in SUFFIX_CHANGES {
        if !(word.ends_with(suffix) || original.ends_with(suffix)) {
            continue;
        }
        for replacement in *replacements {
            if form.ends_with(replacement) && !form.ends_with(suffix) {
                form.truncate(form.len() - replacement.len());
                form.push_str(suffix);
            }
        }
    }
    for (prefix, replacements) in PREFIX_CHANGES {
        if !(word.starts_with(prefix) || original.starts_with(prefix)) {
            continue;
        }
        for replacement in *replacements {
            if form.starts_with(replacement) && !form.starts_with(prefix) {
                form = format!("{prefix}{}", &form[replacement.len()..]);
            }
        }
    }
    let shared = common_prefix(&word, &form);
    shared + 2 < word.chars().count()
}

/// Length in characters of the common prefix, letting one character of
/// `word` alternate into the form.
fn common_prefix(word: &str, form: &str) -> usize {
    let mut word: Vec<char> = word.chars().collect();
    let form: Vec<char> = form.chars().collect();
    let mut changed = false;
    let mut n = 0;
    while n < word.len() && n < form.len() {
        if word[n] != form[n] && !changed {
            let alternates = VOWEL_CHANGES
                .iter()
                .find(|(from, _)| *from == word[n])
                .map_or(&[][..], |(_, to)| *to);
            if alternates.contains(&form[n]) {
                word[n] = form[n];
                changed = true;
            }
        }
        if word[n] != form[n] {
            break;
        }
        n += 1;
    }
    n
}

/// A particle or reflexive verb must inflect like the verb it is built on.
pub fn check_parent_verb(entry: &Entry, index: &Index<'_>) -> Vec<Warning> {
    if !entry.has_particle() {
        return Vec::new();
    }
    let Some(section) = entry.section(Namespace::Saol).filter(SubLemma::is_visible) else {
        return Vec::new();
    };
    let class = section.inflection_class();
    let mut out = Vec::new();
    let parents = refs::structured_references(section)
        .into_iter()
        .filter_map(Result::ok)
        .filter(Reference::is_parent_verb);
    for reference in parents {
        let Some(parent) = index.get(&reference.identifier) else {
            continue;
        };
        let parent_class = parent
            .entry
            .section(Namespace::Saol)
            .map_or_else(|| parent.entry.inflection_class.clone(), |s| s.inflection_class());
        if parent_class == class {
            continue;
        }
        out.push(Warning::new(
            entry,
            Namespace::Saol,
            Some(reference.location.to_string()),
            WarningKind::ParentVerbClassMismatch {
                class: class.clone(),
                parent_name: parent.entry.display_name(Namespace::Saol),
                parent_class,
            },
        ));
    }
    out
}
