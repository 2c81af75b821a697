#![allow(dead_code)]

use packed_entities::prelude::*;

pub fn rating_type() -> EntityType {
    EntityType::new("rating")
}

pub fn user() -> TypedName {
    TypedName::long("user")
}

pub fn item() -> TypedName {
    TypedName::long("item")
}

pub fn rating() -> TypedName {
    TypedName::double("rating")
}

pub fn tag() -> TypedName {
    TypedName::text("tag")
}

/// `id`, `user`, `item`, `rating`, `tag`.
pub fn rating_attrs() -> AttributeSet {
    AttributeSet::create([user(), item(), rating(), tag()]).unwrap()
}

pub fn rating_entity(id: i64, user_id: i64, item_id: i64, value: f64) -> BasicEntity {
    BasicEntity::builder(rating_type(), id)
        .with(user(), user_id).unwrap()
        .with(item(), item_id).unwrap()
        .with(rating(), value).unwrap()
        .build()
        .unwrap()
}

pub fn tagged_entity(id: i64, user_id: i64, label: &str) -> BasicEntity {
    BasicEntity::builder(rating_type(), id)
        .with(user(), user_id).unwrap()
        .with(tag(), label).unwrap()
        .build()
        .unwrap()
}

pub fn packed_builder() -> PackedEntityCollectionBuilder {
    PackedEntityCollectionBuilder::new(rating_type(), rating_attrs())
}

pub fn build_packed<'a, I>(entities: I, indexed: &[&str]) -> PackedEntityCollection
where
    I: IntoIterator<Item = &'a BasicEntity>,
{
    let mut builder = packed_builder();
    for name in indexed {
        builder.add_index(name);
    }
    for entity in entities {
        builder.add(entity, false).unwrap();
    }
    builder.build().unwrap()
}

pub fn ids<E: Entity>(entities: &[E]) -> Vec<i64> {
    entities.iter().map(Entity::id).collect()
}
