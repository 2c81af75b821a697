mod common;

use std::sync::Arc;

use common::*;
use packed_entities::prelude::*;
use packed_entities::{
    BareEntityCollectionBuilder,
    EntityIndexBuilder,
    EntityView,
    MapEntityCollection,
    MapEntityCollectionBuilder,
};

#[test]
fn front_door_picks_backing_from_schema() {
    let map = EntityCollectionBuilder::new(rating_type());
    assert!(matches!(map, EntityCollectionBuilder::Map(_)));

    let bare = EntityCollectionBuilder::with_attributes(rating_type(), AttributeSet::id_only());
    assert!(matches!(bare, EntityCollectionBuilder::Bare(_)));

    let packed = EntityCollectionBuilder::with_attributes(rating_type(), rating_attrs());
    assert!(matches!(packed, EntityCollectionBuilder::Packed(_)));
}

#[test]
fn every_backing_answers_the_same_queries() {
    let entities = [
        rating_entity(3, 10, 100, 4.0),
        rating_entity(1, 11, 100, 3.0),
        rating_entity(2, 10, 101, 2.5),
    ];
    let builders = [
        EntityCollectionBuilder::new(rating_type()),
        EntityCollectionBuilder::with_attributes(rating_type(), rating_attrs())
            .with_config(PackConfig::sequential()),
    ];
    for mut builder in builders {
        builder.add_index("user");
        builder.add_all(&entities).unwrap();
        assert_eq!(builder.len(), 3);
        let collection = builder.build().unwrap();

        assert_eq!(collection.len(), 3);
        assert_eq!(collection.entity_type(), &rating_type());
        assert_eq!(collection.id_set(), vec![1, 2, 3]);
        assert_eq!(collection.sort_keys(), vec![TypedName::entity_id()]);
        assert!(collection.contains(2));

        let two = collection.lookup(2).unwrap();
        assert_eq!(two.double_value("rating").unwrap(), 2.5);
        assert_eq!(two.to_basic(), entities[2]);

        assert_eq!(ids(&collection.find("user", &Value::Long(10))), vec![2, 3]);
        assert!(collection.find("user", &Value::Int(10)).is_empty());

        let groups = collection.grouped("item");
        assert_eq!(ids(&groups[&Value::Long(100)]), vec![1, 3]);

        let iterated: Vec<i64> = collection.iter().map(|e| e.id()).collect();
        assert_eq!(iterated, vec![1, 2, 3]);
    }
}

#[test]
fn only_packed_collections_expose_columns() {
    let mut packed = EntityCollectionBuilder::with_attributes(rating_type(), rating_attrs());
    packed.add(&rating_entity(1, 1, 1, 1.0), false).unwrap();
    assert!(packed.build().unwrap().as_packed().is_some());

    let map = EntityCollectionBuilder::new(rating_type()).build().unwrap();
    assert!(map.as_packed().is_none());
    assert!(map.is_empty());
}

#[test]
fn bare_collections_keep_only_ids() {
    let mut builder = EntityCollectionBuilder::with_attributes(rating_type(), AttributeSet::id_only());
    builder.add_index("user");
    assert_eq!(builder.add(&rating_entity(5, 1, 1, 1.0), false).unwrap(), AddOutcome::Added);
    assert_eq!(builder.add(&rating_entity(2, 1, 1, 1.0), false).unwrap(), AddOutcome::Added);
    assert_eq!(builder.add(&rating_entity(5, 2, 2, 2.0), false).unwrap(), AddOutcome::Dropped);
    assert_eq!(builder.add(&rating_entity(5, 2, 2, 2.0), true).unwrap(), AddOutcome::Replaced);
    let collection = builder.build().unwrap();

    assert_eq!(collection.id_set(), vec![2, 5]);
    let five = collection.lookup(5).unwrap();
    assert!(matches!(five, EntityView::Owned(_)));
    assert_eq!(five.attribute_names().len(), 1);
    assert_eq!(five.get("user"), None);
    assert_eq!(ids(&collection.find(ENTITY_ID, &Value::Long(2))), vec![2]);
    assert!(collection.find("user", &Value::Long(1)).is_empty());
    assert_eq!(collection.grouped(ENTITY_ID).len(), 2);
    assert!(collection.grouped("user").is_empty());
}

#[test]
fn bare_builder_sorts_ids() {
    let mut builder = BareEntityCollectionBuilder::new(rating_type());
    for id in [9, 3, 7] {
        builder.add(&BasicEntity::id_only(rating_type(), id), false);
    }
    let collection = builder.build();
    assert_eq!(collection.ids(), &[3, 7, 9]);
    assert!(collection.contains(7));
    assert!(collection.lookup(4).is_none());
    assert_eq!(collection.iter().map(|e| e.id()).collect::<Vec<_>>(), vec![3, 7, 9]);
}

#[test]
fn map_builder_replaces_in_any_order() {
    let mut builder = MapEntityCollectionBuilder::new(rating_type());
    builder.add_index("user");
    builder.add(&rating_entity(5, 10, 1, 1.0), false);
    builder.add(&rating_entity(2, 10, 1, 1.0), false);
    assert_eq!(builder.add(&rating_entity(5, 20, 1, 1.0), false), AddOutcome::Dropped);
    assert_eq!(builder.add(&rating_entity(5, 20, 1, 1.0), true), AddOutcome::Replaced);
    let collection = builder.build().unwrap();

    assert_eq!(collection.lookup(5).unwrap().long_value("user").unwrap(), 20);
    assert_eq!(ids(&collection.find("user", &Value::Long(10))), vec![2]);
    assert_eq!(ids(&collection.find("user", &Value::Long(20))), vec![5]);
}

#[test]
fn map_collections_hold_any_attributes() {
    let odd = BasicEntity::builder(rating_type(), 1)
        .with(TypedName::boolean("flagged"), true).unwrap()
        .with(TypedName::text("note"), "odd").unwrap()
        .build()
        .unwrap();
    let mut builder = MapEntityCollectionBuilder::new(rating_type());
    builder.add(&odd, false);
    builder.add(&rating_entity(2, 1, 1, 1.0), false);
    let collection = builder.build().unwrap();

    assert_eq!(collection.find("flagged", &Value::Bool(true)).len(), 1);
    assert!(collection.find_typed(&TypedName::long("flagged"), &Value::Bool(true)).is_empty());
    assert_eq!(collection.find_typed(&TypedName::boolean("flagged"), &Value::Bool(true)).len(), 1);
    assert_eq!(collection.grouped("note").len(), 1);
}

fn mixed_score_map(index: impl Fn(&mut MapEntityCollectionBuilder)) -> MapEntityCollection {
    let as_long = BasicEntity::builder(rating_type(), 1).with(TypedName::long("score"), 3i64).unwrap().build().unwrap();
    let as_int = BasicEntity::builder(rating_type(), 2).with(TypedName::int("score"), 3i32).unwrap().build().unwrap();

    let mut builder = MapEntityCollectionBuilder::new(rating_type());
    index(&mut builder);
    builder.add(&as_long, false);
    builder.add(&as_int, false);
    builder.build().unwrap()
}

#[test]
fn map_find_agrees_with_and_without_an_index() {
    let plain = mixed_score_map(|_| {});
    let by_name = mixed_score_map(|b| {
        b.add_index("score");
    });
    let typed = mixed_score_map(|b| {
        b.add_index_typed(&TypedName::long("score"));
    });

    for collection in [&plain, &by_name, &typed] {
        assert_eq!(ids(&collection.find("score", &Value::Long(3))), vec![1]);
        assert_eq!(ids(&collection.find("score", &Value::Int(3))), vec![2]);
        assert_eq!(collection.grouped("score").len(), 2);

        assert_eq!(ids(&collection.find_typed(&TypedName::long("score"), &Value::Long(3))), vec![1]);
        assert_eq!(ids(&collection.find_typed(&TypedName::int("score"), &Value::Int(3))), vec![2]);
        assert!(collection.find_typed(&TypedName::long("score"), &Value::Int(3)).is_empty());
    }
}

#[test]
fn typed_and_untyped_map_indexes_coexist() {
    let both = mixed_score_map(|b| {
        b.add_index_typed(&TypedName::long("score")).add_index("score");
    });
    assert_eq!(ids(&both.find("score", &Value::Int(3))), vec![2]);
    assert_eq!(ids(&both.find_typed(&TypedName::long("score"), &Value::Long(3))), vec![1]);
    assert_eq!(ids(&both.find_typed(&TypedName::int("score"), &Value::Int(3))), vec![2]);
}

#[test]
fn packed_rows_can_be_copied_into_a_map() {
    let packed = build_packed(&[rating_entity(1, 10, 100, 4.0), tagged_entity(2, 11, "a")], &[]);
    let mut builder = MapEntityCollectionBuilder::new(rating_type());
    for row in packed.iter() {
        builder.add(&row, false);
    }
    let map = builder.build().unwrap();
    assert_eq!(map.lookup(2).unwrap().get("tag"), Some(Value::from("a")));
    assert_eq!(map.lookup(1).unwrap().attribute_names().len(), 4);
}

#[test]
fn entity_index_builder_is_single_use() {
    let entity = Arc::new(rating_entity(1, 10, 100, 4.0));
    let mut builder = EntityIndexBuilder::new(&user());
    builder.add(&entity).unwrap();
    let index = builder.build().unwrap();
    assert_eq!(index.name(), "user");
    assert_eq!(index.len(), 1);
    assert_eq!(index.get_entities(&Value::Long(10)).len(), 1);
    assert!(index.get_entities(&Value::Long(11)).is_empty());
    assert_eq!(index.values(), vec![Value::Long(10)]);

    assert!(matches!(builder.add(&entity), Err(StoreError::InvalidState(_))));
    assert!(matches!(builder.build(), Err(StoreError::InvalidState(_))));
}

#[test]
fn entity_index_skips_entities_without_the_attribute() {
    let mut builder = EntityIndexBuilder::by_name("tag");
    builder.add(&Arc::new(rating_entity(1, 10, 100, 4.0))).unwrap();
    builder.add(&Arc::new(tagged_entity(2, 10, "a"))).unwrap();
    builder.add(&Arc::new(tagged_entity(3, 10, "a"))).unwrap();
    let index = builder.build().unwrap();
    assert_eq!(index.len(), 1);
    let groups = index.groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].0, Value::from("a"));
    assert_eq!(groups[0].1.iter().map(|e| e.id()).collect::<Vec<_>>(), vec![2, 3]);
}

#[test]
fn entity_views_delegate_to_their_source() {
    let packed = build_packed(&[rating_entity(1, 10, 100, 4.0)], &[]);
    let row = packed.lookup(1).unwrap();
    let basic = rating_entity(1, 10, 100, 4.0);

    let views = [
        EntityView::Row(row),
        EntityView::Borrowed(&basic),
        EntityView::Owned(basic.clone()),
    ];
    for view in &views {
        assert_eq!(view.id(), 1);
        assert_eq!(view.entity_type(), rating_type());
        assert_eq!(view.long_value("item").unwrap(), 100);
        assert!(view.has_attribute("rating"));
        assert_eq!(view.get_typed(&TypedName::long("rating")), None);
        assert_eq!(view.to_basic(), basic);
        assert_eq!(view.attribute_values().len(), 4);
    }
}
