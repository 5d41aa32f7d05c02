//! End-to-end tests of the engine operations against a data directory

use docsync_core::{Engine, EngineConfig, Error, TransformRequest};
use docsync_fs::NormalizedPath;
use docsync_test_utils::{TestDataDir, sample_users, seeded_store};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};

fn engine(dir: &TestDataDir) -> Engine {
    let mut config = EngineConfig::default();
    config.database.url = Some("sqlite::memory:".into());
    Engine::open_with(NormalizedPath::new(dir.root()), config).unwrap()
}

fn request(input: &str, output: &str, operation: &str, parameters: Value) -> TransformRequest {
    TransformRequest {
        input_filename: input.into(),
        output_filename: output.into(),
        operation: operation.into(),
        parameters,
    }
}

fn names(value: &Value) -> Vec<&str> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap())
        .collect()
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_validate_all_reports_each_document() {
    let dir = seeded_store();
    dir.raw("broken.json", "[1,");
    dir.schema("settings", &json!({"type": "object", "required": ["locale"], "properties": {"locale": {"type": "string"}}}));
    let engine = engine(&dir);

    let summary = engine.validate_all().unwrap();

    assert_eq!((summary.total, summary.valid, summary.invalid), (4, 2, 2));
    let settings = summary
        .results
        .iter()
        .find(|r| r.document == "settings.json")
        .unwrap();
    assert_eq!(settings.schema.as_deref(), Some("settings"));
    assert_eq!(settings.violation.as_ref().unwrap().path, "locale");
}

#[test]
fn test_write_validated_rejects_without_touching_store() {
    let dir = seeded_store();
    let engine = engine(&dir);
    let before = dir.read("users.json");

    let err = engine
        .write_validated(
            "users.json",
            &json!([{"id": 1, "name": "Ada", "email": "not-an-address"}]),
        )
        .unwrap_err();

    match &err {
        Error::Validation { document, schema, error } => {
            assert_eq!(document, "users.json");
            assert_eq!(schema, "users");
            assert_eq!(error.path, "0.email");
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(dir.read("users.json"), before);
}

#[test]
fn test_write_validated_accepts_valid_value() {
    let dir = seeded_store();
    let engine = engine(&dir);

    let meta = engine.write_validated("users.json", &sample_users()).unwrap();

    assert_eq!(meta.name, "users.json");
    assert_eq!(engine.read("users.json").unwrap().meta.checksum, meta.checksum);
}

#[test]
fn test_registered_schema_applies_to_next_validation() {
    let dir = seeded_store();
    let engine = engine(&dir);
    assert_eq!(engine.validate_all().unwrap().invalid, 0);

    engine
        .register_schema(
            "orders",
            json!({"type": "object", "required": ["status"], "properties": {"status": {"type": "string"}}}),
        )
        .unwrap();

    assert_eq!(engine.validate_all().unwrap().invalid, 1);
    dir.assert_file_exists("schemas/orders.json");
    assert!(engine.schemas().any(|name| name == "orders"));
}

#[test]
fn test_infer_schema_accepts_its_sample() {
    let dir = seeded_store();
    let engine = engine(&dir);

    let inferred = engine.infer_schema("orders.json", true).unwrap();
    assert_eq!(inferred["required"], json!(["id", "user", "total"]));
    assert_eq!(inferred["properties"]["id"], json!({"type": "integer"}));
    assert_eq!(inferred["properties"]["total"], json!({"type": "number"}));

    engine.register_schema("orders", inferred).unwrap();
    assert_eq!(engine.validate_all().unwrap().invalid, 0);
}

#[test]
fn test_infer_schema_rejects_scalar_document() {
    let dir = TestDataDir::new();
    dir.raw("answer.json", "42");
    let engine = engine(&dir);

    let err = engine.infer_schema("answer.json", false).unwrap_err();
    assert_eq!(err.kind(), "unsupported_shape");
}

// ============================================================================
// Documents
// ============================================================================

#[test]
fn test_write_read_delete_list() {
    let dir = TestDataDir::new();
    let engine = engine(&dir);

    engine.write("b.json", &json!({"k": 1})).unwrap();
    engine.write("a.json", &json!([1, 2])).unwrap();
    assert_eq!(engine.list().unwrap(), vec!["a.json", "b.json"]);

    engine.delete("a.json").unwrap();
    assert_eq!(engine.list().unwrap(), vec!["b.json"]);

    let err = engine.delete("a.json").unwrap_err();
    assert_eq!(err.kind(), "document_not_found");
    let err = engine.read("a.json").unwrap_err();
    assert_eq!(err.kind(), "document_not_found");
}

#[rstest]
#[case("../escape.json")]
#[case("nested/doc.json")]
#[case("notes.txt")]
#[case("")]
fn test_bad_document_names(#[case] name: &str) {
    let dir = TestDataDir::new();
    let engine = engine(&dir);

    let err = engine.write(name, &json!({})).unwrap_err();
    assert_eq!(err.kind(), "invalid_document_name");
}

#[test]
fn test_merge_mixed_shapes() {
    let dir = seeded_store();
    let engine = engine(&dir);

    let report = engine.merge("*s.json", "all.json").unwrap();

    assert_eq!(report.sources, vec!["orders.json", "settings.json", "users.json"]);
    let merged = dir.read("all.json");
    let items = merged.as_array().unwrap();
    assert_eq!(items.len(), 6);
    assert_eq!(items[2], json!({"theme": "dark", "page_size": 20}));
    assert_eq!(items[3]["name"], "Ada");
}

#[test]
fn test_merge_objects_later_wins() {
    let dir = TestDataDir::new();
    dir.doc("conf_a.json", &json!({"x": 1, "y": 1}))
        .doc("conf_b.json", &json!({"y": 2}));
    let engine = engine(&dir);

    engine.merge("conf_?.json", "conf.json").unwrap();

    assert_eq!(dir.read("conf.json"), json!({"x": 1, "y": 2}));
}

#[test]
fn test_merge_without_matches_writes_empty_list() {
    let dir = seeded_store();
    let engine = engine(&dir);

    engine.merge("nothing_*.json", "out.json").unwrap();

    assert_eq!(dir.read("out.json"), json!([]));
}

#[test]
fn test_statistics_and_search() {
    let dir = seeded_store();
    dir.doc("users_archive.json", &json!([]));
    let engine = engine(&dir);

    let stats = engine.statistics().unwrap();
    assert_eq!(stats.total_files, 4);
    assert_eq!(stats.categories.get("users"), Some(&1));
    assert_eq!(stats.categories.get("other"), Some(&3));
    assert_eq!(
        stats.total_size_bytes,
        stats.files.iter().map(|f| f.size_bytes).sum::<u64>()
    );

    let hits = engine.search("GRACE", Some("name")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].file, "users.json");
    assert_eq!(hits[0].data["id"], 2);

    let hits = engine.search("dark", None).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].file, "settings.json");
}

// ============================================================================
// Transforms
// ============================================================================

#[test]
fn test_filter_keeps_exact_matches() {
    let dir = seeded_store();
    let engine = engine(&dir);

    let report = engine
        .transform(&request("users.json", "active.json", "filter", json!({"key": "active", "value": true})))
        .unwrap();

    assert_eq!((report.input_count, report.output_count), (3, 2));
    assert_eq!(names(&dir.read("active.json")), vec!["Ada", "Linus"]);
    assert_eq!(dir.read("users.json"), sample_users());
}

#[test]
fn test_sort_descending_puts_missing_last() {
    let dir = seeded_store();
    let engine = engine(&dir);

    engine
        .transform(&request("users.json", "by_age.json", "sort", json!({"key": "age", "reverse": true})))
        .unwrap();
    assert_eq!(names(&dir.read("by_age.json")), vec!["Grace", "Ada", "Linus"]);

    engine
        .transform(&request("users.json", "by_age.json", "sort", json!({"key": "age", "order": "asc"})))
        .unwrap();
    assert_eq!(names(&dir.read("by_age.json")), vec!["Linus", "Ada", "Grace"]);
}

#[test]
fn test_map_renames_fields() {
    let dir = seeded_store();
    let engine = engine(&dir);

    engine
        .transform(&request(
            "orders.json",
            "renamed.json",
            "map",
            json!({"field_map": {"user": "user_id", "total": "amount"}}),
        ))
        .unwrap();

    let renamed = dir.read("renamed.json");
    assert_eq!(renamed[0], json!({"id": 10, "user_id": 1, "amount": 25.5}));
}

#[rstest]
#[case("explode", json!({}), "unknown_operation")]
#[case("filter", json!({"key": "x"}), "invalid_parameters")]
#[case("sort", json!({"reverse": true}), "invalid_parameters")]
#[case("map", json!({"field_map": []}), "invalid_parameters")]
fn test_transform_errors(#[case] operation: &str, #[case] parameters: Value, #[case] kind: &str) {
    let dir = seeded_store();
    let engine = engine(&dir);

    let err = engine
        .transform(&request("users.json", "out.json", operation, parameters))
        .unwrap_err();

    assert_eq!(err.kind(), kind);
    dir.assert_file_not_exists("out.json");
}

#[test]
fn test_transform_requires_list_source() {
    let dir = seeded_store();
    let engine = engine(&dir);

    let err = engine
        .transform(&request("settings.json", "out.json", "sort", json!({"key": "theme"})))
        .unwrap_err();

    assert_eq!(err.kind(), "unsupported_shape");
}

// ============================================================================
// Backups
// ============================================================================

#[test]
fn test_restore_reproduces_snapshot_exactly() {
    let dir = seeded_store();
    let engine = engine(&dir);
    let original: Vec<(String, Value)> = engine
        .list()
        .unwrap()
        .into_iter()
        .map(|name| {
            let value = dir.read(&name);
            (name, value)
        })
        .collect();

    let manifest = engine.create_backup().unwrap();
    assert_eq!(manifest.version, 1);
    assert_eq!(manifest.documents.len(), 3);

    engine.write("users.json", &json!([])).unwrap();
    engine.delete("orders.json").unwrap();
    engine.write("new.json", &json!({"fresh": true})).unwrap();

    let report = engine.restore(1).unwrap();
    assert_eq!(report.restored.len(), 3);

    let restored: Vec<(String, Value)> = engine
        .list()
        .unwrap()
        .into_iter()
        .map(|name| {
            let value = dir.read(&name);
            (name, value)
        })
        .collect();
    assert_eq!(restored, original);
}

#[test]
fn test_restore_takes_safety_backup() {
    let dir = seeded_store();
    let engine = engine(&dir);
    engine.create_backup().unwrap();
    engine.write("extra.json", &json!([])).unwrap();

    engine.restore(1).unwrap();

    let backups = engine.list_backups().unwrap();
    let versions: Vec<u64> = backups.iter().map(|b| b.version).collect();
    assert_eq!(versions, vec![1, 2]);
    assert!(backups[1].documents.iter().any(|d| d.name == "extra.json"));
}

#[test]
fn test_restore_unknown_version() {
    let dir = seeded_store();
    let engine = engine(&dir);

    let err = engine.restore(42).unwrap_err();

    assert!(matches!(err, Error::BackupNotFound { version: 42 }));
    assert!(engine.list_backups().unwrap().is_empty());
}

#[test]
fn test_versions_are_never_reused() {
    let dir = seeded_store();
    let engine = engine(&dir);
    engine.create_backup().unwrap();
    let second = engine.create_backup().unwrap();

    std::fs::remove_dir_all(dir.root().join(".docsync/backups/v000002")).unwrap();

    assert_eq!(engine.create_backup().unwrap().version, second.version + 1);
}

#[test]
fn test_corrupted_snapshot_leaves_store_untouched() {
    let dir = seeded_store();
    let engine = engine(&dir);
    engine.create_backup().unwrap();
    engine.write("users.json", &json!([])).unwrap();

    dir.raw(".docsync/backups/v000001/orders.json", "[]");
    let err = engine.restore(1).unwrap_err();

    assert_eq!(err.kind(), "backup_corrupted");
    assert_eq!(dir.read("users.json"), json!([]));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_open_reads_data_directory_config() {
    let dir = seeded_store();
    dir.config(
        r#"
        [database]
        url = "sqlite::memory:"
        table = "people"

        [[bindings]]
        pattern = "orders.json"
        schema = "users"
        "#,
    );

    let engine = Engine::open(dir.root()).unwrap();

    assert_eq!(engine.config().database.table, "people");
    let summary = engine.validate_all().unwrap();
    assert_eq!(summary.invalid, 1);

    let report = engine.sync_default().unwrap();
    assert_eq!(report.table, "people");
    assert_eq!(report.failed, 1);
}

#[test]
fn test_config_file_is_not_a_document() {
    let dir = seeded_store();
    dir.raw("docsync.json", r#"{"sync": {"workers": 2}}"#);

    let engine = Engine::open(dir.root()).unwrap();

    assert_eq!(engine.config().sync.workers, 2);
    assert!(!engine.list().unwrap().contains(&"docsync.json".to_string()));
}

#[test]
fn test_invalid_binding_pattern_fails_open() {
    let dir = seeded_store();
    dir.config("[[bindings]]\npattern = \"[unclosed\"\nschema = \"users\"\n");

    assert!(Engine::open(dir.root()).is_err());
}
