use packed_entities::prelude::*;
use packed_entities::{common, AttrMask, SchemaError};

#[test]
fn attribute_sets_start_with_the_id() {
    let attrs = AttributeSet::create([common::user(), common::rating()]).unwrap();
    assert_eq!(attrs.len(), 3);
    assert_eq!(attrs.attribute(0), &TypedName::entity_id());
    assert_eq!(attrs.names().collect::<Vec<_>>(), ["id", "user", "rating"]);

    let explicit = AttributeSet::create([TypedName::entity_id(), common::user(), common::rating()]).unwrap();
    assert_eq!(attrs, explicit);
}

#[test]
fn id_must_come_first_and_be_long() {
    let late = AttributeSet::create([common::user(), TypedName::entity_id()]);
    assert_eq!(late.unwrap_err(), SchemaError::MissingEntityId);

    let mistyped = AttributeSet::create([TypedName::text(ENTITY_ID)]);
    assert_eq!(mistyped.unwrap_err(), SchemaError::MissingEntityId);
}

#[test]
fn duplicate_names_are_rejected_regardless_of_kind() {
    let err = AttributeSet::create([TypedName::long("x"), TypedName::double("x")]).unwrap_err();
    assert_eq!(err, SchemaError::DuplicateAttribute("x".into()));
}

#[test]
fn attribute_sets_are_bounded() {
    let wide = (0..63).map(|i| TypedName::long(format!("a{i}")));
    assert_eq!(AttributeSet::create(wide).unwrap().len(), 64);

    let too_wide = (0..64).map(|i| TypedName::long(format!("a{i}")));
    assert!(matches!(
        AttributeSet::create(too_wide),
        Err(SchemaError::TooManyAttributes { count: 65, max: 64 })
    ));
}

#[test]
fn lookups_by_name_and_kind() {
    let attrs = AttributeSet::create([common::user(), common::rating()]).unwrap();
    assert_eq!(attrs.lookup("rating"), Some(2));
    assert_eq!(attrs.lookup_typed(&common::rating()), Some(2));
    assert_eq!(attrs.lookup_typed(&TypedName::long("rating")), None);
    assert_eq!(attrs.lookup("missing"), None);
    assert!(attrs.contains("user"));
    assert_eq!(attrs.get(3), None);
}

#[test]
fn without_drops_flagged_positions_but_keeps_the_id() {
    let attrs = AttributeSet::create([common::user(), common::item(), common::rating()]).unwrap();
    let mut missing = AttrMask::default();
    missing.set(0);
    missing.set(2);
    let subset = attrs.without(missing);
    assert_eq!(subset.names().collect::<Vec<_>>(), ["id", "user", "rating"]);
    assert_eq!(subset.lookup("rating"), Some(2));
    assert_eq!(attrs.without(AttrMask::default()), attrs);
}

#[test]
fn typed_names_render_and_parse() {
    assert_eq!(common::rating().to_string(), "TypedName[rating: double]");
    assert_eq!(TypedName::parse("n", "string").unwrap(), TypedName::text("n"));
    assert_eq!(TypedName::parse("n", "I64").unwrap(), TypedName::long("n"));
    assert_eq!(
        TypedName::parse("n", "decimal").unwrap_err(),
        SchemaError::UnknownType("decimal".into())
    );
    assert_eq!("bool".parse::<AttrType>().unwrap(), AttrType::Bool);
}

#[test]
fn typed_names_parse_values() {
    assert_eq!(common::user().parse_value(" 42 ").unwrap(), Value::Long(42));
    assert_eq!(common::rating().parse_value("3.5").unwrap(), Value::Double(3.5));
    assert_eq!(common::count().parse_value("7").unwrap(), Value::Int(7));
    assert_eq!(TypedName::boolean("b").parse_value("true").unwrap(), Value::Bool(true));
    assert_eq!(common::name().parse_value(" padded ").unwrap(), Value::from(" padded "));
    assert!(matches!(
        common::user().parse_value("4.5"),
        Err(SchemaError::Parse { expected: AttrType::Long, .. })
    ));
}

#[test]
fn entity_builder_checks_kinds() {
    let mut builder = BasicEntity::builder(EntityType::new("rating"), 1);
    let err = builder.set(common::rating(), 4i64).unwrap_err();
    assert_eq!(
        err,
        SchemaError::ValueType { attribute: "rating".into(), expected: AttrType::Double, actual: AttrType::Long }
    );
    builder.set(common::rating(), 4.0).unwrap();
    assert_eq!(builder.build().unwrap().double_value("rating").unwrap(), 4.0);
}

#[test]
fn entity_builder_keeps_last_value_and_can_clear() {
    let mut builder = BasicEntity::builder(EntityType::new("item"), 3);
    builder.set(common::name(), "first").unwrap();
    builder.set(common::name(), "second").unwrap();
    builder.set(common::count(), 2i32).unwrap();
    let entity = builder.build().unwrap();
    assert_eq!(entity.get("name"), Some(Value::from("second")));
    assert_eq!(entity.attribute_names().len(), 3);

    builder.clear("count");
    let cleared = builder.build().unwrap();
    assert!(!cleared.has_attribute("count"));
    assert!(matches!(
        cleared.long_value("count"),
        Err(StoreError::MissingValue { id: 3, .. })
    ));
}

#[test]
fn setting_the_id_attribute_changes_the_id() {
    let entity = BasicEntity::builder(EntityType::new("item"), 1)
        .with(TypedName::entity_id(), 99i64).unwrap()
        .build()
        .unwrap();
    assert_eq!(entity.id(), 99);
    assert_eq!(entity.get(ENTITY_ID), Some(Value::Long(99)));
    assert_eq!(entity.attribute_names().len(), 1);

    let err = BasicEntity::builder(EntityType::new("item"), 1)
        .with(TypedName::int(ENTITY_ID), 5i32)
        .unwrap_err();
    assert!(matches!(err, SchemaError::ValueType { expected: AttrType::Long, .. }));
}

#[test]
fn basic_entities_report_wrong_kinds() {
    let entity = BasicEntity::builder(EntityType::new("item"), 1)
        .with(common::name(), "lamp").unwrap()
        .build()
        .unwrap();
    assert!(matches!(
        entity.long_value("name"),
        Err(StoreError::Schema(SchemaError::ValueType { actual: AttrType::Text, .. }))
    ));
    assert_eq!(entity.get_typed(&common::name()), Some(Value::from("lamp")));
    assert_eq!(entity.get_typed(&TypedName::long("name")), None);
    assert_eq!(BasicEntity::id_only(EntityType::new("item"), 4).attribute_values().len(), 1);
}
