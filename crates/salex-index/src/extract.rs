use salex_types::{Entry, EntryType, FieldPath, Identifier, parse_reference, schema};
use tracing::debug;

use crate::Claim;
use crate::refs::scalar_text;

/// Every identifier an entry declares, numeric and textual, with its claim.
///
/// Pure in the entry; safe to run on many entries at once.
pub(crate) fn entry_claims(entry: &Entry) -> Vec<(Identifier, Claim<'_>)> {
    let variant = entry.is_type(EntryType::Variant);
    let mut out = Vec::new();
    for section in entry.sections() {
        let namespace = section.namespace();
        let body = section.body();
        for field in schema::id_fields(namespace) {
            for location in FieldPath::parse(field.path).expand(body) {
                let Some(raw) = location.get(body).and_then(scalar_text) else {
                    continue;
                };
                match parse_reference(&raw, Some(field.kind)) {
                    Ok((kind, value)) => out.push((
                        Identifier::numeric(namespace, kind, value),
                        Claim {
                            entry,
                            visible: location.is_visible(body),
                            variant,
                            field: Some(location.to_string()),
                        },
                    )),
                    Err(err) => {
                        debug!(entry = %entry.id, field = %location, "unreadable identifier: {err}")
                    }
                }
            }
        }
        out.push((
            Identifier::textual(namespace, entry.headword.as_str(), section.homograph()),
            Claim {
                entry,
                visible: section.is_visible(),
                variant,
                field: None,
            },
        ));
    }
    out
}
