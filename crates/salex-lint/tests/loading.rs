use std::fs;

use salex_lint::source::{LoadMode, load_entries, load_rules};
use salex_lint::{LintConfig, Linter};

const ENTRIES: &str = r#"{"id": "a", "ortografi": "katt", "böjningsklass": "S1", "so": {"l_nr": "1001"}}
{"id": "b", "ortografi": "hund", "so": {"huvudbetydelser": [{"definition": "+katter(refid=lnr1001) och +hundar(refid=lnr1001)"}]}}
"#;

const RULES: &str = r#"{"S1": [{"tag": "obest pl", "ops": [{"append": "er"}]}]}"#;

#[test]
fn loads_inputs_in_both_modes() {
    let dir = tempfile::tempdir().unwrap();
    let entries_path = dir.path().join("entries.jsonl");
    let rules_path = dir.path().join("rules.json");
    fs::write(&entries_path, ENTRIES).unwrap();
    fs::write(&rules_path, RULES).unwrap();

    for mode in [LoadMode::Mmap, LoadMode::Owned] {
        let entries = load_entries(&entries_path, mode).unwrap();
        let rules = load_rules(&rules_path, mode).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(rules.contains("S1"));

        let config = LintConfig::default();
        let warnings = Linter::new(&rules, &config).run(&entries).unwrap();
        assert_eq!(warnings.len(), 1);
        let value = serde_json::to_value(&warnings[0]).unwrap();
        assert_eq!(value["kind"], "unexpected_target_word");
        assert_eq!(value["word"], "hundar");
        assert_eq!(value["expected"], "katt");
    }
}

#[test]
fn empty_files_load_as_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.jsonl");
    fs::write(&path, "").unwrap();
    assert!(load_entries(&path, LoadMode::Mmap).unwrap().is_empty());
}

#[test]
fn errors_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.jsonl");
    let err = load_entries(&missing, LoadMode::Owned).unwrap_err();
    assert!(format!("{err:#}").contains("missing.jsonl"));

    let bad = dir.path().join("rules.json");
    fs::write(&bad, "[1, 2]").unwrap();
    let err = load_rules(&bad, LoadMode::Mmap).unwrap_err();
    assert!(format!("{err:#}").contains("parse rule table"));
}
