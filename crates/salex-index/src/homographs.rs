//! Homograph numbering per headword.

use salex_types::{
    Entry, EntryType, HomographDefect, HomographSlot, Namespace, Warning, WarningKind,
};

use crate::Index;
use crate::refs;

/// One visible section claiming a headword.
#[derive(Clone, Copy, Debug)]
pub struct Homograph<'a> {
    pub entry: &'a Entry,
    pub number: Option<u32>,
}

/// What is wrong with a set of homograph numbers, if anything.
///
/// A lone homograph must be unnumbered. Two or more must all be numbered, and
/// the numbers sorted must be exactly `1..=N`.
pub fn classify(numbers: &[Option<u32>]) -> Option<HomographDefect> {
    if let [Some(_)] = numbers {
        return Some(HomographDefect::Unnecessary);
    }
    if numbers.iter().any(Option::is_none) {
        return (numbers.len() > 1).then_some(HomographDefect::Missing);
    }
    let mut sorted: Vec<u32> = numbers.iter().flatten().copied().collect();
    sorted.sort_unstable();
    let sequential = sorted.iter().zip(1u32..).all(|(n, expected)| *n == expected);
    (!sequential).then_some(HomographDefect::NonSequential)
}

pub(crate) fn check(index: &Index<'_>) -> Vec<Warning> {
    let mut warnings = Vec::new();
    for ((namespace, headword), members) in index.homograph_groups() {
        let mut members = members.to_vec();
        members.sort_by(|a, b| {
            a.number
                .map_or(-1, i64::from)
                .cmp(&b.number.map_or(-1, i64::from))
                .then_with(|| a.entry.id.cmp(&b.entry.id))
        });
        let Some(first) = members.first().map(|m| m.entry) else {
            continue;
        };
        let slots: Vec<HomographSlot> = members
            .iter()
            .map(|m| HomographSlot {
                entry_id: m.entry.id.clone(),
                homograph: m.number,
            })
            .collect();
        let mut report = |defect| {
            warnings.push(Warning::new(
                first,
                *namespace,
                Some("homografNr".to_string()),
                WarningKind::HomographNumbering {
                    headword: headword.clone(),
                    defect,
                    homographs: slots.clone(),
                },
            ));
        };

        if *namespace == Namespace::Saol {
            let (pointers, rest): (Vec<Homograph<'_>>, Vec<Homograph<'_>>) = members
                .iter()
                .partition(|m| is_inflected_form_pointer(index, m.entry, headword));
            if pointers.iter().any(|m| m.number.is_some()) {
                report(HomographDefect::SeeUnderNumbered);
            }
            members = rest;
        }

        let numbers: Vec<Option<u32>> = members.iter().map(|m| m.number).collect();
        if let Some(defect) = classify(&numbers) {
            report(defect);
        }
    }
    warnings
}

/// A SAOL "se under" entry pointing at a word of which its headword is an
/// inflected form, rather than a spelling.
fn is_inflected_form_pointer(index: &Index<'_>, entry: &Entry, headword: &str) -> bool {
    if !entry.is_type(EntryType::SeeUnder) {
        return false;
    }
    let Some(section) = entry.section(Namespace::Saol) else {
        return false;
    };
    let spelled_out = refs::references(section)
        .into_iter()
        .filter_map(Result::ok)
        .filter_map(|r| index.get(&r.identifier))
        .filter_map(|claim| claim.entry.section(Namespace::Saol))
        .any(|target| target.forms().contains(&headword));
    !spelled_out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_numbering() {
        assert_eq!(classify(&[]), None);
        assert_eq!(classify(&[None]), None);
        assert_eq!(classify(&[Some(1)]), Some(HomographDefect::Unnecessary));
        assert_eq!(classify(&[None, Some(1)]), Some(HomographDefect::Missing));
        assert_eq!(classify(&[None, None]), Some(HomographDefect::Missing));
        assert_eq!(classify(&[Some(2), Some(1)]), None);
        assert_eq!(classify(&[Some(1), Some(3)]), Some(HomographDefect::NonSequential));
        assert_eq!(classify(&[Some(1), Some(1)]), Some(HomographDefect::NonSequential));
    }
}
