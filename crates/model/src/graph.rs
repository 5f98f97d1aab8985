use crate::EntityType;
use crate::error::{ErrorKind, Result};

/// The order in which entity types are merged.
///
/// Every foreign key target appears before its dependents, so by the time a
/// type is processed the id maps of everything it references are complete for
/// the current snapshot. Processing out of this order leaves dependents with
/// nothing to remap against.
pub const MERGE_ORDER: [EntityType; 15] = [
    EntityType::Location,
    EntityType::InputField,
    EntityType::Bookmark,
    EntityType::UserMark,
    EntityType::BlockRange,
    EntityType::Note,
    EntityType::IndependentMedia,
    EntityType::PlaylistItem,
    EntityType::PlaylistItemIndependentMediaMap,
    EntityType::PlaylistItemLocationMap,
    EntityType::Tag,
    EntityType::TagMap,
    EntityType::PlaylistItemMarker,
    EntityType::PlaylistItemMarkerBibleVerseMap,
    EntityType::PlaylistItemMarkerParagraphMap,
];

/// Foreign key dependency graph between entity types.
///
/// The graph is static and hand-verified; this type only exposes it. See
/// [`MERGE_ORDER`].
pub struct EntityGraph;

impl EntityGraph {
    /// All entity types in merge order.
    pub fn order() -> &'static [EntityType] {
        &MERGE_ORDER
    }

    /// Distinct entity types referenced by `entity`, in foreign key declaration order.
    pub fn dependencies(entity: EntityType) -> Vec<EntityType> {
        let mut dependencies = Vec::new();
        for fk in entity.schema().foreign_keys {
            if !dependencies.contains(&fk.references) {
                dependencies.push(fk.references);
            }
        }
        dependencies
    }

    /// Verify that `order` never processes an entity before a type it references.
    ///
    /// Returns [`ErrorKind::OrderViolation`] for the first offending foreign key.
    pub fn check_order(order: &[EntityType]) -> Result<()> {
        for (position, entity) in order.iter().enumerate() {
            for fk in entity.schema().foreign_keys {
                if !order[..position].contains(&fk.references) {
                    exn::bail!(ErrorKind::OrderViolation {
                        entity: *entity,
                        column: fk.column,
                        references: fk.references,
                    });
                }
            }
        }
        Ok(())
    }
}
