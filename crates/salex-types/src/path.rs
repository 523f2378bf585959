use std::fmt;

use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
enum Segment {
    Field(String),
    Each,
}

/// Declarative path into a section body, e.g. `huvudbetydelser.*.x_nr`.
///
/// `*` steps into every element of a list. The empty path names the body itself.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn parse(text: &str) -> Self {
        let segments = text
            .split('.')
            .filter(|s| !s.is_empty())
            .map(|s| match s {
                "*" => Segment::Each,
                field => Segment::Field(field.to_string()),
            })
            .collect();
        Self { segments }
    }

    /// Every concrete location in `root` that this path reaches.
    pub fn expand(&self, root: &Value) -> Vec<Location> {
        let mut out = Vec::new();
        expand_into(&self.segments, root, Location::root(), &mut out);
        out
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Field(name) => name.as_str(),
                Segment::Each => "*",
            })
            .collect();
        f.write_str(&parts.join("."))
    }
}

fn expand_into(segments: &[Segment], value: &Value, at: Location, out: &mut Vec<Location>) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(at);
        return;
    };
    match head {
        Segment::Field(name) => {
            if let Some(child) = value.get(name.as_str()) {
                expand_into(rest, child, at.child_key(name), out);
            }
        }
        Segment::Each => {
            if let Value::Array(items) = value {
                for (idx, item) in items.iter().enumerate() {
                    expand_into(rest, item, at.child_index(idx), out);
                }
            }
        }
    }
}

/// One step of a concrete [`Location`].
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
pub enum Step {
    Key(String),
    Index(usize),
}

/// Concrete address of a value inside a section body.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
pub struct Location {
    steps: Vec<Step>,
}

impl Location {
    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn child_key(&self, key: &str) -> Self {
        let mut steps = self.steps.clone();
        steps.push(Step::Key(key.to_string()));
        Self { steps }
    }

    pub fn child_index(&self, idx: usize) -> Self {
        let mut steps = self.steps.clone();
        steps.push(Step::Index(idx));
        Self { steps }
    }

    pub fn get<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        self.steps.iter().try_fold(root, |value, step| match step {
            Step::Key(k) => value.get(k.as_str()),
            Step::Index(i) => value.get(*i),
        })
    }

    pub fn get_mut<'v>(&self, root: &'v mut Value) -> Option<&'v mut Value> {
        self.steps.iter().try_fold(root, |value, step| match step {
            Step::Key(k) => value.get_mut(k.as_str()),
            Step::Index(i) => value.get_mut(*i),
        })
    }

    /// False when any object on the way (the target included) says `visas: false`.
    pub fn is_visible(&self, root: &Value) -> bool {
        let mut value = root;
        if hidden(value) {
            return false;
        }
        for step in &self.steps {
            let next = match step {
                Step::Key(k) => value.get(k.as_str()),
                Step::Index(i) => value.get(*i),
            };
            let Some(next) = next else {
                return false;
            };
            if hidden(next) {
                return false;
            }
            value = next;
        }
        true
    }

    /// Dotted field name without list positions, e.g. `huvudbetydelser.definition`.
    pub fn field_name(&self) -> String {
        self.keys().collect::<Vec<_>>().join(".")
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|s| match s {
            Step::Key(k) => Some(k.as_str()),
            Step::Index(_) => None,
        })
    }

    pub fn last_key(&self) -> Option<&str> {
        self.keys().last()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for step in &self.steps {
            match step {
                Step::Key(k) => {
                    if !first {
                        f.write_str(".")?;
                    }
                    f.write_str(k)?;
                }
                Step::Index(i) => write!(f, "[{i}]")?,
            }
            first = false;
        }
        Ok(())
    }
}

fn hidden(value: &Value) -> bool {
    value.get("visas").and_then(Value::as_bool) == Some(false)
}

/// Every string leaf in `root`, depth first, with its location.
pub fn string_fields(root: &Value) -> Vec<(Location, &str)> {
    let mut out = Vec::new();
    collect_strings(root, Location::root(), &mut out);
    out
}

fn collect_strings<'v>(value: &'v Value, at: Location, out: &mut Vec<(Location, &'v str)>) {
    match value {
        Value::String(s) => out.push((at, s.as_str())),
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                collect_strings(item, at.child_index(idx), out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                collect_strings(item, at.child_key(key), out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body() -> Value {
        json!({
            "l_nr": "100",
            "huvudbetydelser": [
                {"x_nr": "200", "definition": "a"},
                {"x_nr": "201", "visas": false,
                 "underbetydelser": [{"kc_nr": "300"}]},
                {"definition": "b"}
            ]
        })
    }

    #[test]
    fn expands_wildcards_over_lists() {
        let root = body();
        let locs = FieldPath::parse("huvudbetydelser.*.x_nr").expand(&root);
        assert_eq!(locs.len(), 2);
        assert_eq!(locs[1].to_string(), "huvudbetydelser[1].x_nr");
        assert_eq!(locs[1].get(&root), Some(&json!("201")));
        assert_eq!(locs[0].field_name(), "huvudbetydelser.x_nr");

        let nested = FieldPath::parse("huvudbetydelser.*.underbetydelser.*.kc_nr").expand(&root);
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].field_name(), "huvudbetydelser.underbetydelser.kc_nr");
    }

    #[test]
    fn root_path_names_the_body() {
        let root = body();
        let locs = FieldPath::parse("").expand(&root);
        assert_eq!(locs, vec![Location::root()]);
        assert_eq!(locs[0].get(&root), Some(&root));
    }

    #[test]
    fn visibility_follows_enclosing_records() {
        let root = body();
        let locs = FieldPath::parse("huvudbetydelser.*.x_nr").expand(&root);
        assert!(locs[0].is_visible(&root));
        assert!(!locs[1].is_visible(&root));
        let kc = FieldPath::parse("huvudbetydelser.*.underbetydelser.*.kc_nr").expand(&root);
        assert!(!kc[0].is_visible(&root));
        assert!(!Location::root().is_visible(&json!({"visas": false})));
    }

    #[test]
    fn locations_address_values_for_update() {
        let mut root = body();
        let loc = FieldPath::parse("huvudbetydelser.*.definition").expand(&root)[1].clone();
        *loc.get_mut(&mut root).unwrap() = json!("c");
        assert_eq!(root["huvudbetydelser"][2]["definition"], json!("c"));
    }

    #[test]
    fn collects_every_string_leaf() {
        let root = body();
        let strings = string_fields(&root);
        let names: Vec<String> = strings.iter().map(|(l, _)| l.to_string()).collect();
        assert!(names.contains(&"huvudbetydelser[2].definition".to_string()));
        assert!(names.contains(&"l_nr".to_string()));
        assert_eq!(strings.len(), 6);
    }
}
