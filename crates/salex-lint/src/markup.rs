//! Markup well-formedness and bracket balance of text fields.

use salex_types::{SubLemma, Warning, WarningKind, schema, string_fields};

const PAIRS: [(char, char); 4] = [('[', ']'), ('(', ')'), ('{', '}'), ('"', '"')];

/// Parse every visible text field of the section and check the brackets of
/// its plain text. Plain-text fields are checked as they are.
pub fn check(section: SubLemma<'_>) -> Vec<Warning> {
    let namespace = section.namespace();
    let body = section.body();
    let mut out = Vec::new();
    for (location, text) in string_fields(body) {
        if !location.is_visible(body) || schema::is_identifier_field(namespace, &location) {
            continue;
        }
        let warn = |kind| {
            Warning::new(
                section.entry(),
                namespace,
                Some(location.to_string()),
                kind,
            )
        };
        let plain = if location
            .last_key()
            .is_some_and(|k| schema::PLAIN_TEXT_FIELDS.contains(&k))
        {
            text.to_string()
        } else {
            match salex_markup::strip(text) {
                Ok(plain) => plain,
                Err(err) => {
                    out.push(warn(WarningKind::MalformedMarkup {
                        text: text.to_string(),
                        error: err.to_string(),
                    }));
                    continue;
                }
            }
        };
        if !brackets_ok(&plain) {
            out.push(warn(WarningKind::UnbalancedBrackets {
                text: text.to_string(),
            }));
        }
    }
    out
}

/// Brackets nest properly. `"` both opens and closes.
pub fn brackets_ok(text: &str) -> bool {
    let mut open: Vec<char> = Vec::new();
    for c in text.chars() {
        let opener = PAIRS.iter().find(|(o, _)| *o == c);
        let closer = PAIRS.iter().find(|(_, cl)| *cl == c);
        match (opener, closer) {
            (Some(_), Some(_)) if open.last() == Some(&c) => {
                open.pop();
            }
            (Some((o, _)), _) => open.push(*o),
            (None, Some((o, _))) => {
                if open.last() != Some(o) {
                    return false;
                }
                open.pop();
            }
            (None, None) => {}
        }
    }
    open.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use salex_types::{Entry, Namespace};
    use serde_json::json;

    #[test]
    fn balances_brackets_and_quotes() {
        assert!(brackets_ok("a (b [c] {d}) \"e\""));
        assert!(brackets_ok("\"(x)\""));
        assert!(!brackets_ok("a (b"));
        assert!(!brackets_ok("a) b"));
        assert!(!brackets_ok("(a]"));
        assert!(!brackets_ok("\"a"));
        assert!(!brackets_ok("(\"a)\""));
    }

    #[test]
    fn reports_bad_markup_once_per_field() {
        let entry: Entry = serde_json::from_value(json!({
            "id": "e1",
            "ortografi": "katt",
            "so": {
                "huvudbetydelser": [
                    {"definition": "djur [i (tam]"},
                    {"definition": "[x okänd]"},
                    {"definition": "escaped \\( bracket", "visas": false}
                ],
                "ordbildning": "katt (av lat.",
                "l_nr": "12"
            }
        }))
        .unwrap();
        let warnings = check(entry.section(Namespace::So).unwrap());
        let kinds: Vec<(&str, Option<&str>)> = warnings
            .iter()
            .map(|w| (w.kind.name(), w.field.as_deref()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("unbalanced_brackets", Some("huvudbetydelser[0].definition")),
                ("malformed_markup", Some("huvudbetydelser[1].definition")),
                ("unbalanced_brackets", Some("ordbildning")),
            ]
        );
    }
}
