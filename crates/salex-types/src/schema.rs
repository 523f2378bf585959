//! Which section fields hold identifiers, references and variant forms.

use crate::{Location, Namespace, NumericKind};

/// A field declaring a numeric identifier of one kind.
#[derive(Clone, Copy, Debug)]
pub struct IdField {
    pub path: &'static str,
    pub kind: NumericKind,
}

/// A field whose whole value is a reference to another entry.
#[derive(Clone, Copy, Debug)]
pub struct RefField {
    pub path: &'static str,
    /// `None`: kind is read from the value's prefix.
    pub kind: Option<NumericKind>,
    /// Parent-verb pointers may legitimately target suppressed entries.
    pub parent_verb: bool,
}

const SO_IDS: &[IdField] = &[
    IdField { path: "l_nr", kind: NumericKind::Lemma },
    IdField { path: "varianter.*.l_nr", kind: NumericKind::Lemma },
    IdField { path: "vnomen.*.l_nr", kind: NumericKind::Lemma },
    IdField { path: "förkortningar.*.l_nr", kind: NumericKind::Lemma },
    IdField { path: "huvudbetydelser.*.x_nr", kind: NumericKind::Sense },
    IdField { path: "huvudbetydelser.*.underbetydelser.*.kc_nr", kind: NumericKind::Cycle },
    IdField { path: "huvudbetydelser.*.idiom.*.i_nr", kind: NumericKind::Idiom },
];

const SAOL_IDS: &[IdField] = &[
    IdField { path: "id", kind: NumericKind::Lemma },
    IdField { path: "alt.*.id", kind: NumericKind::Lemma },
    IdField { path: "variantformer.*.id", kind: NumericKind::Lemma },
    IdField { path: "huvudbetydelser.*.id", kind: NumericKind::Sense },
];

const SO_REFS: &[RefField] = &[
    RefField { path: "huvudbetydelser.*.hänvisningar.*.hänvisning", kind: None, parent_verb: false },
    RefField { path: "huvudbetydelser.*.morfex.*.hänvisning", kind: None, parent_verb: false },
    RefField {
        path: "huvudbetydelser.*.underbetydelser.*.hänvisningar.*.hänvisning",
        kind: None,
        parent_verb: false,
    },
    RefField {
        path: "huvudbetydelser.*.underbetydelser.*.morfex.*.hänvisning",
        kind: None,
        parent_verb: false,
    },
    RefField { path: "huvudbetydelser.*.idiom.*.hänvisning", kind: Some(NumericKind::Idiom), parent_verb: false },
    RefField { path: "vnomen.*.hänvisning", kind: None, parent_verb: false },
    RefField { path: "relaterade_verb.*.refid", kind: Some(NumericKind::Lemma), parent_verb: true },
];

const SAOL_REFS: &[RefField] = &[RefField {
    path: "moderverb",
    kind: Some(NumericKind::Lemma),
    parent_verb: true,
}];

pub fn id_fields(namespace: Namespace) -> &'static [IdField] {
    match namespace {
        Namespace::Saol => SAOL_IDS,
        Namespace::So => SO_IDS,
    }
}

pub fn reference_fields(namespace: Namespace) -> &'static [RefField] {
    match namespace {
        Namespace::Saol => SAOL_REFS,
        Namespace::So => SO_REFS,
    }
}

pub fn variant_form_fields(namespace: Namespace) -> &'static [&'static str] {
    match namespace {
        Namespace::Saol => &["variantformer.*.ortografi", "alt.*.ortografi"],
        Namespace::So => &["varianter.*.ortografi"],
    }
}

/// Free-text fields never scanned for `+word(refid=...)` references.
pub fn no_refid_fields(namespace: Namespace) -> &'static [&'static str] {
    match namespace {
        Namespace::Saol => &["uttal.*.filnamnInlästUttal", "ordled"],
        Namespace::So => &["uttal.*.filnamnInlästUttal", "uttal.*.fonetik"],
    }
}

/// Fields holding plain text that is not markup.
pub const PLAIN_TEXT_FIELDS: &[&str] = &["ordbildning"];

/// Whether `location` is an identifier or structured-reference field.
pub fn is_identifier_field(namespace: Namespace, location: &Location) -> bool {
    let name = location.field_name();
    id_fields(namespace)
        .iter()
        .map(|f| f.path)
        .chain(reference_fields(namespace).iter().map(|f| f.path))
        .any(|path| strip_wildcards(path) == name)
}

pub fn is_listed(fields: &[&str], location: &Location) -> bool {
    let name = location.field_name();
    fields.iter().any(|path| strip_wildcards(path) == name)
}

fn strip_wildcards(path: &str) -> String {
    path.split('.')
        .filter(|s| *s != "*" && !s.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldPath;
    use serde_json::json;

    #[test]
    fn recognises_identifier_locations() {
        let body = json!({"huvudbetydelser": [{"x_nr": "1", "definition": "d"}]});
        let x = FieldPath::parse("huvudbetydelser.*.x_nr").expand(&body);
        let d = FieldPath::parse("huvudbetydelser.*.definition").expand(&body);
        assert!(is_identifier_field(Namespace::So, &x[0]));
        assert!(!is_identifier_field(Namespace::So, &d[0]));
        assert!(!is_identifier_field(Namespace::Saol, &x[0]));
    }

    #[test]
    fn lists_match_by_field_name() {
        let body = json!({"uttal": [{"filnamnInlästUttal": "1_1.mp3"}]});
        let loc = FieldPath::parse("uttal.*.filnamnInlästUttal").expand(&body);
        assert!(is_listed(no_refid_fields(Namespace::So), &loc[0]));
    }
}
