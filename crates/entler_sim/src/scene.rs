//! # Scene Spatial Index
//!
//! A `width × height` grid with two layers of entity handles:
//! - the **object** layer: at most one solid object per cell
//! - the **property** layer: at most one cell property per cell
//!
//! The scene is an [`EntityObserver`]: it indexes entities as they are added
//! to the store and forgets them as they are removed. Because cells hold
//! [`EntityHandle`]s, a cell can be resolved to its entity in O(1) even after
//! the store has been vacuumed.

use entler_core::{EntityHandle, EntityId, EntityObserver, EntityRef};
use tracing::{trace, warn};

use crate::components::{ObjectType, Position, PropertyType};
use crate::error::{SimError, SimResult};
use crate::math::IVec3;
use crate::schema::SimSchema;

/// The two layers of a scene cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    /// Solid objects.
    Object,
    /// Cell properties.
    Property,
}

/// An indexed entity.
#[derive(Debug)]
struct Occupant {
    id: EntityId,
    handle: EntityHandle<SimSchema>,
}

/// Grid index of objects and properties by position.
#[derive(Debug)]
pub struct Scene {
    width: usize,
    height: usize,
    objects: Vec<Option<Occupant>>,
    properties: Vec<Option<Occupant>>,
}

impl Scene {
    /// Creates an empty scene.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        let Some(cells) = width.checked_mul(height) else {
            panic!("scene of {width}x{height} cells overflows the cell count");
        };
        Self {
            width,
            height,
            objects: std::iter::repeat_with(|| None).take(cells).collect(),
            properties: std::iter::repeat_with(|| None).take(cells).collect(),
        }
    }

    /// Scene width in cells.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Scene height in cells.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Checks whether `position` lies on the grid.
    #[must_use]
    pub fn contains(&self, position: IVec3) -> bool {
        self.offset(position).is_some()
    }

    /// Checks whether `position` lies on the grid and holds no object.
    #[must_use]
    pub fn is_free(&self, position: IVec3) -> bool {
        self.offset(position)
            .is_some_and(|offset| occupant(&self.objects, offset).is_none())
    }

    /// Returns the object at `position`.
    #[must_use]
    pub fn object_at(&self, position: IVec3) -> Option<EntityId> {
        self.occupant_at(Layer::Object, position).map(|o| o.id)
    }

    /// Returns the property at `position`.
    #[must_use]
    pub fn property_at(&self, position: IVec3) -> Option<EntityId> {
        self.occupant_at(Layer::Property, position).map(|o| o.id)
    }

    /// Returns the handle stored for the entity of `layer` at `position`.
    #[must_use]
    pub fn handle_at(&self, layer: Layer, position: IVec3) -> Option<&EntityHandle<SimSchema>> {
        self.occupant_at(layer, position).map(|o| &o.handle)
    }

    /// Number of indexed objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        count(&self.objects)
    }

    /// Number of indexed properties.
    #[must_use]
    pub fn property_count(&self) -> usize {
        count(&self.properties)
    }

    /// Checks that `position` can take a new entity on `layer`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::OutOfBounds`] or [`SimError::CellOccupied`].
    pub fn check_vacant(&self, layer: Layer, position: IVec3) -> SimResult<()> {
        let offset = self.offset_or_err(position)?;
        match occupant(self.layer(layer), offset) {
            Some(occupant) => Err(SimError::CellOccupied {
                position,
                occupant: occupant.id,
            }),
            None => Ok(()),
        }
    }

    /// Moves the object `id` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::OutOfBounds`] if either cell is off the grid,
    /// [`SimError::NotAnObject`] if `id` is not the object at `from`, and
    /// [`SimError::CellOccupied`] if `to` holds another object. The scene is
    /// unchanged on error.
    pub fn relocate_object(&mut self, id: EntityId, from: IVec3, to: IVec3) -> SimResult<()> {
        let source = self.offset_or_err(from)?;
        let target = self.offset_or_err(to)?;

        if occupant(&self.objects, source).map(|o| o.id) != Some(id) {
            return Err(SimError::NotAnObject(id));
        }
        if source == target {
            return Ok(());
        }
        if let Some(other) = occupant(&self.objects, target) {
            return Err(SimError::CellOccupied {
                position: to,
                occupant: other.id,
            });
        }

        self.objects[target] = self.objects[source].take();
        trace!(entity = %id, from = ?from, to = ?to, "object relocated");
        Ok(())
    }

    fn layer(&self, layer: Layer) -> &[Option<Occupant>] {
        match layer {
            Layer::Object => &self.objects,
            Layer::Property => &self.properties,
        }
    }

    fn layer_mut(&mut self, layer: Layer) -> &mut [Option<Occupant>] {
        match layer {
            Layer::Object => &mut self.objects,
            Layer::Property => &mut self.properties,
        }
    }

    fn occupant_at(&self, layer: Layer, position: IVec3) -> Option<&Occupant> {
        self.offset(position)
            .and_then(|offset| occupant(self.layer(layer), offset))
    }

    /// Row-major cell offset of an on-grid position.
    fn offset(&self, position: IVec3) -> Option<usize> {
        let x = usize::try_from(position.x).ok()?;
        let y = usize::try_from(position.y).ok()?;
        (x < self.width && y < self.height).then(|| x + y * self.width)
    }

    fn offset_or_err(&self, position: IVec3) -> SimResult<usize> {
        self.offset(position).ok_or(SimError::OutOfBounds {
            position,
            width: self.width,
            height: self.height,
        })
    }

    fn index(&mut self, layer: Layer, offset: usize, entity: EntityRef<'_, SimSchema>) {
        let cell = &mut self.layer_mut(layer)[offset];
        if let Some(existing) = cell.as_ref().filter(|o| o.handle.is_linked()) {
            warn!(
                entity = %entity.id(),
                occupant = %existing.id,
                ?layer,
                "scene cell taken, entity not indexed"
            );
            return;
        }
        *cell = Some(Occupant {
            id: entity.id(),
            handle: entity.handle(),
        });
    }

    fn forget(&mut self, layer: Layer, entity: EntityRef<'_, SimSchema>) {
        let id = entity.id();
        let hint = entity
            .try_get_component::<Position>()
            .ok()
            .and_then(|position| self.offset(position.value));
        let cells = self.layer_mut(layer);

        let found = hint
            .filter(|&offset| cells[offset].as_ref().is_some_and(|o| o.id == id))
            .or_else(|| cells.iter().position(|cell| cell.as_ref().is_some_and(|o| o.id == id)));
        if let Some(offset) = found {
            cells[offset] = None;
        }
    }
}

fn occupant(cells: &[Option<Occupant>], offset: usize) -> Option<&Occupant> {
    cells[offset].as_ref().filter(|o| o.handle.is_linked())
}

fn count(cells: &[Option<Occupant>]) -> usize {
    cells
        .iter()
        .filter(|cell| cell.as_ref().is_some_and(|o| o.handle.is_linked()))
        .count()
}

impl EntityObserver<SimSchema> for Scene {
    fn entity_added(&mut self, entity: EntityRef<'_, SimSchema>) {
        let is_object = entity.has_component::<ObjectType>();
        let is_property = entity.has_component::<PropertyType>();
        if !is_object && !is_property {
            return;
        }
        let Ok(position) = entity.try_get_component::<Position>() else {
            return;
        };
        let Some(offset) = self.offset(position.value) else {
            warn!(
                entity = %entity.id(),
                x = position.value.x,
                y = position.value.y,
                "entity outside the scene, not indexed"
            );
            return;
        };

        if is_object {
            self.index(Layer::Object, offset, entity);
        }
        if is_property {
            self.index(Layer::Property, offset, entity);
        }
    }

    fn entity_removed(&mut self, entity: EntityRef<'_, SimSchema>) {
        if entity.has_component::<ObjectType>() {
            self.forget(Layer::Object, entity);
        }
        if entity.has_component::<PropertyType>() {
            self.forget(Layer::Property, entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entler_core::{EntityStore, Observer};

    fn setup() -> (EntityStore<SimSchema>, Observer<Scene>) {
        let mut store = EntityStore::new();
        let scene = Observer::register(&mut store, Scene::new(4, 3));
        (store, scene)
    }

    #[test]
    fn test_offsets() {
        let scene = Scene::new(4, 3);
        assert!(scene.contains(IVec3::planar(3, 2)));
        assert!(!scene.contains(IVec3::planar(4, 0)));
        assert!(!scene.contains(IVec3::planar(0, 3)));
        assert!(!scene.contains(IVec3::planar(-1, 0)));
        assert_eq!(scene.offset(IVec3::planar(1, 2)), Some(9));
    }

    #[test]
    #[should_panic(expected = "overflows the cell count")]
    fn test_oversized_scene_panics() {
        let _ = Scene::new(usize::MAX, 2);
    }

    #[test]
    fn test_indexes_objects_and_properties() {
        let (mut store, scene) = setup();
        let rock = store
            .add_entity((ObjectType { id: 1 }, Position::new(1, 1)))
            .unwrap()
            .id();
        let grass = store
            .add_entity((PropertyType { id: 2 }, Position::new(1, 1)))
            .unwrap()
            .id();
        store.add_entity((Position::new(2, 2),)).unwrap();

        let scene = scene.borrow();
        assert_eq!(scene.object_at(IVec3::planar(1, 1)), Some(rock));
        assert_eq!(scene.property_at(IVec3::planar(1, 1)), Some(grass));
        assert!(!scene.is_free(IVec3::planar(1, 1)));
        assert!(scene.is_free(IVec3::planar(2, 2)));
        assert_eq!(scene.object_count(), 1);
        assert_eq!(scene.property_count(), 1);

        let handle = scene.handle_at(Layer::Object, IVec3::planar(1, 1)).unwrap();
        assert_eq!(handle.get(&store).unwrap().id(), rock);
    }

    #[test]
    fn test_out_of_bounds_and_taken_cells_are_skipped() {
        let (mut store, scene) = setup();
        store
            .add_entity((ObjectType { id: 1 }, Position::new(9, 9)))
            .unwrap();
        let first = store
            .add_entity((ObjectType { id: 1 }, Position::new(0, 0)))
            .unwrap()
            .id();
        store
            .add_entity((ObjectType { id: 2 }, Position::new(0, 0)))
            .unwrap();

        let scene = scene.borrow();
        assert_eq!(scene.object_count(), 1);
        assert_eq!(scene.object_at(IVec3::ZERO), Some(first));
    }

    #[test]
    fn test_removal_clears_cells() {
        let (mut store, scene) = setup();
        let rock = store
            .add_entity((ObjectType { id: 1 }, PropertyType { id: 3 }, Position::new(2, 0)))
            .unwrap()
            .id();
        store.remove_entity(rock).unwrap();

        let scene = scene.borrow();
        assert_eq!(scene.object_at(IVec3::planar(2, 0)), None);
        assert_eq!(scene.property_at(IVec3::planar(2, 0)), None);
        assert_eq!(scene.object_count(), 0);
    }

    #[test]
    fn test_relocate_object() {
        let (mut store, scene) = setup();
        let a = store
            .add_entity((ObjectType { id: 1 }, Position::new(0, 0)))
            .unwrap()
            .id();
        let b = store
            .add_entity((ObjectType { id: 1 }, Position::new(1, 0)))
            .unwrap()
            .id();

        let mut scene = scene.borrow_mut();
        assert!(matches!(
            scene.relocate_object(a, IVec3::ZERO, IVec3::planar(1, 0)),
            Err(SimError::CellOccupied { occupant, .. }) if occupant == b
        ));
        assert!(matches!(
            scene.relocate_object(a, IVec3::ZERO, IVec3::planar(0, 5)),
            Err(SimError::OutOfBounds { .. })
        ));
        assert!(matches!(
            scene.relocate_object(b, IVec3::ZERO, IVec3::planar(2, 0)),
            Err(SimError::NotAnObject(id)) if id == b
        ));

        scene
            .relocate_object(a, IVec3::ZERO, IVec3::planar(0, 2))
            .unwrap();
        assert_eq!(scene.object_at(IVec3::planar(0, 2)), Some(a));
        assert!(scene.is_free(IVec3::ZERO));
    }

    #[test]
    fn test_handles_survive_vacuum() {
        let (mut store, scene) = setup();
        let doomed = store
            .add_entity((ObjectType { id: 1 }, Position::new(0, 0)))
            .unwrap()
            .id();
        let kept = store
            .add_entity((ObjectType { id: 1 }, Position::new(3, 2)))
            .unwrap()
            .id();
        store.remove_entity(doomed).unwrap();
        store.vacuum();

        let scene = scene.borrow();
        let handle = scene.handle_at(Layer::Object, IVec3::planar(3, 2)).unwrap();
        let entity = handle.get(&store).unwrap();
        assert_eq!(entity.id(), kept);
        assert_eq!(entity.get_component::<Position>(), &Position::new(3, 2));
    }
}
