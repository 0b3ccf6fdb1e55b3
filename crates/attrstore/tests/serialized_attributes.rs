use std::sync::Arc;

use attrstore::column::{AttributeSet, ColumnValue, JsonColumn};
use attrstore::error::AttrError;
use attrstore::model::{Model, Record, Schema};
use attrstore::store::{AttributeOptions, Store};
use attrstore::test_utils::{my_model, RecordFixture, MY_MODEL_ATTRIBUTES};
use attrstore::types::BuiltinTypes;
use attrstore::value::AttrValue;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::json;

fn decimal(s: &str) -> AttrValue {
    AttrValue::Decimal(s.parse::<Decimal>().unwrap())
}

fn epoch(secs: i64) -> AttrValue {
    AttrValue::DateTime(Utc.timestamp_opt(secs, 0).unwrap())
}

#[test]
fn loading_and_reloading_a_complex_model() {
    let fixture = RecordFixture::new();
    let mut record = fixture.create_raw(&[
        ("normal_column", json!("yes")),
        ("data", json!({"booly": false, "stringy": "present"})),
    ]);

    assert_eq!(
        record.read_column("normal_column").unwrap(),
        &ColumnValue::Raw(json!("yes"))
    );
    assert_eq!(record.get("booly").unwrap(), AttrValue::Bool(false));
    assert_eq!(record.get("booly_default").unwrap(), AttrValue::Bool(true));
    assert_eq!(record.get("stringy").unwrap(), "present".into());
    assert_eq!(record.get("listy").unwrap(), AttrValue::List(vec![]));

    record.set("booly", "true").unwrap();
    fixture.table.save(&mut record).unwrap();
    fixture.table.reload(&mut record).unwrap();

    assert_eq!(record.get("booly").unwrap(), AttrValue::Bool(true));
    assert_eq!(record.get("booly_default").unwrap(), AttrValue::Bool(true));
    assert_eq!(record.get("stringy").unwrap(), "present".into());
}

#[test]
fn arrays_can_be_created_modified_and_emptied() {
    let fixture = RecordFixture::new();
    let mut record = fixture.create([("listy", vec!["foo", "bar"])]);
    assert_eq!(record.get("listy").unwrap(), AttrValue::from(vec!["foo", "bar"]));

    match record.attributes_mut("data").unwrap().get_mut("listy") {
        Some(AttrValue::List(items)) => items.push("baz".into()),
        other => panic!("expected a list, got {:?}", other),
    }
    assert_eq!(
        record.get("listy").unwrap(),
        AttrValue::from(vec!["foo", "bar", "baz"])
    );
    assert!(record.changed().unwrap());

    fixture.table.save(&mut record).unwrap();
    fixture.table.reload(&mut record).unwrap();
    assert_eq!(
        record.get("listy").unwrap(),
        AttrValue::from(vec!["foo", "bar", "baz"])
    );

    record.set("listy", AttrValue::Null).unwrap();
    fixture.table.save(&mut record).unwrap();
    assert_eq!(record.get("listy").unwrap(), AttrValue::List(vec![]));
}

#[test]
fn casting_to_and_from_the_database_with_timestamp() {
    let fixture = RecordFixture::new();
    let mut record = fixture.create_raw(&[("data", json!({"timestamp": "1970-01-01T00:00:00Z"}))]);
    assert_eq!(record.get("timestamp").unwrap(), epoch(0));

    record.set("timestamp", Utc.timestamp_opt(1, 0).unwrap()).unwrap();
    assert_eq!(record.get("timestamp").unwrap(), epoch(1));

    fixture.table.save(&mut record).unwrap();
    fixture.table.reload(&mut record).unwrap();
    assert_eq!(record.get("timestamp").unwrap(), epoch(1));
    assert_eq!(
        fixture.row(&record)["data"]["timestamp"],
        json!("1970-01-01T00:00:01Z")
    );
}

#[test]
fn casting_to_and_from_the_database_with_decimal() {
    let fixture = RecordFixture::new();
    let mut record = Record::build(&fixture.model, [("decy", decimal("0.42"))]).unwrap();
    assert_eq!(record.get("decy").unwrap(), decimal("0.42"));

    record.set("decy", decimal("9.99")).unwrap();
    assert_eq!(record.get("decy").unwrap(), decimal("9.99"));

    fixture.table.save(&mut record).unwrap();
    fixture.table.reload(&mut record).unwrap();
    assert_eq!(record.get("decy").unwrap(), decimal("9.99"));
    assert_eq!(fixture.row(&record)["data"]["decy"], json!("9.99"));
}

#[test]
fn enums_return_validation_failures_with_unknown_values() {
    let model = my_model();
    let mut record = Record::build(&model, [("enumy", "placed")]).unwrap();
    assert!(record.validate().unwrap());

    record.set("enumy", "unknown").unwrap();
    assert!(!record.validate().unwrap());
    assert!(record
        .errors()
        .full_messages()
        .contains(&"Enumy unknown is not one of (null), placed, confirmed".to_string()));
    assert_eq!(
        record.errors().on("enumy"),
        vec!["unknown is not one of (null), placed, confirmed"]
    );

    record.set("enumy", "confirmed").unwrap();
    assert!(record.validate().unwrap());
    assert!(record.errors().is_empty());
}

#[test]
fn works_with_an_untyped_settings_column() {
    let mut model = Model::new("Local");
    model
        .load_schema(Schema::new().column("settings", JsonColumn::native()))
        .unwrap();
    model
        .serialize_attributes("settings", |s| {
            s.attribute("user_name", "string", AttributeOptions::new())?;
            s.attribute("height", "decimal", AttributeOptions::new())?;
            Ok(())
        })
        .unwrap();
    let model = Arc::new(model);

    let mut record = Record::new(&model).unwrap();
    assert_eq!(record.get("user_name").unwrap(), AttrValue::Null);

    record.set("user_name", "Nick").unwrap();
    record.set("height", decimal("42.690")).unwrap();
    assert_eq!(record.get("user_name").unwrap(), "Nick".into());
    assert_eq!(record.get("height").unwrap(), decimal("42.690"));

    let expected: AttributeSet = vec![
        ("user_name", AttrValue::from("Nick")),
        ("height", decimal("42.690")),
    ]
    .into_iter()
    .collect();
    assert_eq!(record.attribute_set("settings").unwrap(), Some(&expected));
}

#[test]
fn serialized_attributes_on_applies_defaults() {
    let fixture = RecordFixture::new();
    let record = fixture.create_raw(&[
        ("normal_column", json!("yes")),
        ("data", json!({"booly": false, "timestamp": "1970-01-01T00:00:00Z"})),
    ]);

    let expected: Vec<(String, AttrValue)> = vec![
        ("booly".to_string(), AttrValue::Bool(false)),
        ("booly_default".to_string(), AttrValue::Bool(true)),
        ("stringy".to_string(), AttrValue::Null),
        ("timestamp".to_string(), epoch(0)),
        ("listy".to_string(), AttrValue::List(vec![])),
        ("listy_integer".to_string(), AttrValue::List(vec![])),
        ("enumy".to_string(), AttrValue::Null),
        ("decy".to_string(), AttrValue::Null),
    ];
    assert_eq!(record.serialized_attributes_on("data").unwrap(), expected);
}

#[test]
fn serialized_attribute_names() {
    let model = my_model();
    assert_eq!(
        model.attribute_names_on("data", None, None).unwrap(),
        MY_MODEL_ATTRIBUTES.to_vec()
    );
    assert_eq!(
        model.attribute_names_on("data", Some("boolean"), None).unwrap(),
        vec!["booly", "booly_default"]
    );
    assert_eq!(
        model.attribute_names_on("data", Some("string"), None).unwrap(),
        vec!["stringy", "listy"]
    );
}

#[test]
fn deserialize_with_a_non_existing_attribute() {
    let model = my_model();
    let err = model
        .store("data")
        .unwrap()
        .deserialize("chunky_bacon", &json!(0))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "The attribute chunky_bacon is not defined in serialize_attributes on the MyModel model"
    );

    let record = Record::new(&model).unwrap();
    assert!(matches!(
        record.get("chunky_bacon"),
        Err(AttrError::UnknownAttribute { .. })
    ));
}

#[test]
fn predicate_methods() {
    let fixture = RecordFixture::new();
    let record = fixture.create_raw(&[(
        "data",
        json!({"booly": false, "timestamp": null, "listy": [], "stringy": "  "}),
    )]);

    assert!(!record.predicate("booly").unwrap());
    assert!(!record.predicate("timestamp").unwrap());
    assert!(!record.predicate("stringy").unwrap());
    assert!(record.predicate("booly_default").unwrap());
    assert!(matches!(
        record.predicate("listy"),
        Err(AttrError::NotPredicable(name)) if name == "listy"
    ));
}

#[test]
fn enums_and_arrays_cannot_be_combined() {
    let mut model = Model::new("Local");
    let err = model
        .serialize_attributes("settings", |s| {
            s.attribute("foo", "enum", AttributeOptions::new().of(vec![1, 2, 3]).array())?;
            Ok(())
        })
        .unwrap_err();
    assert_eq!(err.to_string(), "Enum-arrays not currently supported");
}

#[test]
fn change_tracking_after_loading_and_reading() {
    let fixture = RecordFixture::new();
    let record = fixture.create([
        ("booly", AttrValue::Bool(false)),
        ("stringy", "hello".into()),
    ]);

    assert!(!record.predicate("booly").unwrap());
    assert!(!record.changed().unwrap());

    let mut record = fixture
        .table
        .find(&fixture.model, record.id().unwrap())
        .unwrap();
    assert!(!record.changed().unwrap());

    record.set("booly", true).unwrap();
    assert!(record.changed().unwrap());
    assert_eq!(record.changed_columns().unwrap(), vec!["data"]);
}

#[test]
fn change_tracking_on_new_records() {
    let mut record = Record::new(&my_model()).unwrap();
    assert!(!record.changed().unwrap());

    record.set("booly", true).unwrap();
    assert!(record.changed().unwrap());
}

#[test]
fn reading_a_default_does_not_insert_it() {
    let fixture = RecordFixture::new();
    let record = fixture.create_raw(&[("data", json!({}))]);
    assert_eq!(record.get("stringy").unwrap(), AttrValue::Null);
    assert!(!record.attribute_set("data").unwrap().unwrap().contains_key("stringy"));
}

#[test]
fn clearing_an_array_falls_back_to_a_non_empty_default() {
    let mut model = Model::new("Order");
    model
        .load_schema(Schema::new().column("data", JsonColumn::native()))
        .unwrap();
    model
        .serialize_attributes("data", |s| {
            s.attribute(
                "listy_default",
                "string",
                AttributeOptions::new().array().with_default(vec!["a"]),
            )?;
            Ok(())
        })
        .unwrap();
    let model = Arc::new(model);

    let mut record = Record::build(&model, [("listy_default", vec!["x", "y"])]).unwrap();
    assert_eq!(record.get("listy_default").unwrap(), AttrValue::from(vec!["x", "y"]));

    record.set("listy_default", AttrValue::Null).unwrap();
    assert!(!record
        .attribute_set("data")
        .unwrap()
        .unwrap()
        .contains_key("listy_default"));
    assert_eq!(record.get("listy_default").unwrap(), AttrValue::from(vec!["a"]));
}

#[test]
fn computed_defaults_see_the_record() {
    let mut model = Model::new("Person");
    model
        .load_schema(Schema::new().column("settings", JsonColumn::native()))
        .unwrap();
    model
        .serialize_attributes("settings", |s| {
            s.attribute("first_name", "string", AttributeOptions::new())?;
            s.attribute(
                "display_name",
                "string",
                AttributeOptions::new().with_computed_default(|record| {
                    match record.read("first_name") {
                        AttrValue::Null => "anonymous".into(),
                        name => format!("{} (guest)", name).into(),
                    }
                }),
            )?;
            Ok(())
        })
        .unwrap();
    let model = Arc::new(model);

    let mut record = Record::new(&model).unwrap();
    assert_eq!(record.get("display_name").unwrap(), "anonymous".into());

    record.set("first_name", "Ada").unwrap();
    assert_eq!(record.get("display_name").unwrap(), "Ada (guest)".into());
    assert!(!record
        .attribute_set("settings")
        .unwrap()
        .unwrap()
        .contains_key("display_name"));

    record.set("display_name", "Countess").unwrap();
    assert_eq!(record.get("display_name").unwrap(), "Countess".into());
}

#[test]
fn computed_defaults_reading_each_other_terminate() {
    let mut model = Model::new("Person");
    model
        .load_schema(Schema::new().column("settings", JsonColumn::native()))
        .unwrap();
    model
        .serialize_attributes("settings", |s| {
            s.attribute(
                "nickname",
                "string",
                AttributeOptions::new().with_computed_default(|record| record.read("handle")),
            )?;
            s.attribute(
                "handle",
                "string",
                AttributeOptions::new().with_computed_default(|record| {
                    match record.read("nickname") {
                        AttrValue::Null => "anon".into(),
                        nickname => nickname,
                    }
                }),
            )?;
            Ok(())
        })
        .unwrap();
    let model = Arc::new(model);

    let mut record = Record::new(&model).unwrap();
    assert_eq!(record.get("nickname").unwrap(), "anon".into());
    assert_eq!(record.get("handle").unwrap(), "anon".into());

    record.set("nickname", "ada").unwrap();
    assert_eq!(record.get("handle").unwrap(), "ada".into());
}

/// Column `data` with a boolean flag, a string array and a nullable enum.
#[test]
fn order_scenario() {
    let mut model = Model::new("Order");
    model
        .serialize_attributes("data", |s| {
            s.attribute("flag", "boolean", AttributeOptions::new().with_default(false))?;
            s.attribute(
                "tags",
                "string",
                AttributeOptions::new().array().with_default(Vec::<&str>::new()),
            )?;
            s.attribute(
                "status",
                "enum",
                AttributeOptions::new().of(vec![None, Some("placed"), Some("confirmed")]),
            )?;
            Ok(())
        })
        .unwrap();
    model
        .load_schema(Schema::new().column("data", JsonColumn::native()))
        .unwrap();
    let model = Arc::new(model);
    let fixture = RecordFixture::with_model(Arc::clone(&model));

    let mut order = Record::new(&model).unwrap();
    assert_eq!(order.get("flag").unwrap(), AttrValue::Bool(false));
    assert_eq!(order.get("tags").unwrap(), AttrValue::List(vec![]));
    assert_eq!(order.get("status").unwrap(), AttrValue::Null);

    order.set("tags", vec!["a", "b"]).unwrap();
    fixture.table.save(&mut order).unwrap();
    fixture.table.reload(&mut order).unwrap();
    assert_eq!(order.get("tags").unwrap(), AttrValue::from(vec!["a", "b"]));

    order.set("tags", AttrValue::Null).unwrap();
    assert_eq!(order.get("tags").unwrap(), AttrValue::List(vec![]));

    order.set("status", "bogus").unwrap();
    assert!(!order.validate().unwrap());
    assert_eq!(
        order.errors().full_messages(),
        vec!["Status bogus is not one of (null), placed, confirmed".to_string()]
    );
}

#[test]
fn frozen_store_is_shared_across_threads() {
    let store = Arc::new(
        Store::build("MyModel", "data", Arc::new(BuiltinTypes::new()), |s| {
            s.attribute("count", "integer", AttributeOptions::new())?;
            s.attribute("when", "datetime", AttributeOptions::new())?;
            Ok(())
        })
        .unwrap(),
    );

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                let value = store.cast("count", i.to_string()).unwrap().into_value().unwrap();
                let stored = store.serialize("count", &value).unwrap();
                store.deserialize("count", &stored).unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), AttrValue::Integer(i as i64));
    }
}
