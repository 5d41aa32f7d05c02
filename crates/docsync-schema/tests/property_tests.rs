use docsync_schema::{Schema, infer_schema, validate};
use proptest::prelude::*;
use serde_json::{Value, json};

fn arb_record() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(Value::from),
        "[a-z@.]{0,10}".prop_map(Value::String),
    ];
    prop::collection::btree_map("[a-e]", leaf, 0..5)
        .prop_map(|m| Value::Object(m.into_iter().collect()))
}

fn contact_schema() -> Schema {
    Schema::from_value(
        "contact",
        json!({
            "type": "object",
            "required": ["a", "b"],
            "properties": {
                "a": {"type": "string", "format": "email"},
                "b": {"type": ["integer", "null"]},
                "c": {"type": "boolean"}
            }
        }),
    )
    .unwrap()
}

proptest! {
    #[test]
    fn validation_is_deterministic(doc in arb_record()) {
        let schema = contact_schema();
        let first = validate(&doc, &schema);
        for _ in 0..3 {
            prop_assert_eq!(&validate(&doc, &schema), &first);
        }
    }

    #[test]
    fn failures_name_a_declared_field(doc in arb_record()) {
        let result = validate(&doc, &contact_schema());
        prop_assert_eq!(result.valid, result.error.is_none());
        if let Some(error) = result.error {
            prop_assert!(["a", "b", "c"].contains(&error.path.as_str()));
        }
    }

    #[test]
    fn inferred_schema_accepts_its_sample(doc in arb_record()) {
        let schema = Schema::from_value("sample", infer_schema(&doc, true)).unwrap();
        prop_assert!(validate(&doc, &schema).valid);
    }
}
