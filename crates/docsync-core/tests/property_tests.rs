//! Property tests for the document store and transforms

use docsync_core::{DocumentStore, Operation};
use docsync_fs::{NormalizedPath, compute_value_checksum};
use proptest::prelude::*;
use serde_json::{Map, Value, json};
use tempfile::tempdir;

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-z ]{0,12}".prop_map(Value::String),
    ]
}

fn record() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-e]", leaf(), 0..5)
        .prop_map(|fields| Value::Object(fields.into_iter().collect::<Map<_, _>>()))
}

fn records() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(record(), 0..12)
}

proptest! {
    #[test]
    fn write_then_read_returns_the_value(items in records()) {
        let dir = tempdir().unwrap();
        let store = DocumentStore::new(NormalizedPath::new(dir.path()));
        let value = Value::Array(items);

        let meta = store.write("doc.json", &value).unwrap();
        let doc = store.read("doc.json").unwrap();

        prop_assert_eq!(&doc.value, &value);
        prop_assert_eq!(doc.meta.checksum, meta.checksum);
        prop_assert_eq!(meta.size_bytes, std::fs::metadata(dir.path().join("doc.json")).unwrap().len());
    }

    #[test]
    fn sort_is_a_stable_permutation(items in records(), descending in any::<bool>()) {
        let sorted = Operation::Sort { key: "a".into(), descending }.apply(items.clone());

        prop_assert_eq!(sorted.len(), items.len());
        let mut before: Vec<String> = items.iter().map(compute_value_checksum).collect();
        let mut after: Vec<String> = sorted.iter().map(compute_value_checksum).collect();
        before.sort();
        after.sort();
        prop_assert_eq!(before, after);

        // Sorting twice changes nothing
        let again = Operation::Sort { key: "a".into(), descending }.apply(sorted.clone());
        prop_assert_eq!(again, sorted);
    }

    #[test]
    fn filter_output_is_a_subsequence(items in records(), wanted in leaf()) {
        let kept = Operation::Filter { key: "b".into(), value: wanted.clone() }.apply(items.clone());

        prop_assert!(kept.iter().all(|item| item.get("b") == Some(&wanted)));
        let expected = items.iter().filter(|item| item.get("b") == Some(&wanted)).count();
        prop_assert_eq!(kept.len(), expected);
    }
}
