//! The simulation's component universe.

use entler_core::entity_schema;
use serde::{Deserialize, Serialize};

use crate::components::{Body, Energy, ObjectType, Position, PropertyType, Sprite};

/// Component kinds of the simulation, in schema order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    /// [`ObjectType`]
    ObjectType,
    /// [`PropertyType`]
    PropertyType,
    /// [`Position`]
    Position,
    /// [`Body`]
    Body,
    /// [`Sprite`]
    Sprite,
    /// [`Energy`]
    Energy,
}

entity_schema! {
    /// Schema of the simulation store.
    pub struct SimSchema<ComponentType> {
        tables: SimTables,
        object_types: ObjectType = ComponentType::ObjectType,
        property_types: PropertyType = ComponentType::PropertyType,
        positions: Position = ComponentType::Position,
        bodies: Body = ComponentType::Body,
        sprites: Sprite = ComponentType::Sprite,
        energies: Energy = ComponentType::Energy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entler_core::{Component, Schema};

    #[test]
    fn test_schema_order() {
        assert_eq!(SimSchema::kind_count(), 6);
        assert_eq!(<ObjectType as Component<SimSchema>>::INDEX, 0);
        assert_eq!(<Energy as Component<SimSchema>>::INDEX, 5);
        assert_eq!(SimSchema::find_kind(ComponentType::Body), Some(3));
        assert_eq!(SimSchema::NAME, "SimSchema");
    }
}
