//! # Simulation
//!
//! Ties the entity store and the scene together.
//!
//! ```text
//! spawn_* ──▶ EntityStore<SimSchema> ──entity_added──▶ Scene (handles)
//! step()  ──▶ query (Position, Body) ──move_object──▶ Scene + Position
//!         ──▶ recharge every Energy
//! ```
//!
//! Every spawn checks bounds and occupancy before touching the store, so a
//! rejected spawn leaves both the store and the scene unchanged.

use std::cell::Ref;

use entler_core::{EntityId, EntityStore, FixedAllocator, Observer, VacuumStats};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::components::{Body, Energy, ObjectType, Position, PropertyType, Sprite};
use crate::config::SimulationConfig;
use crate::error::{SimError, SimResult};
use crate::math::IVec3;
use crate::scene::{Layer, Scene};
use crate::schema::SimSchema;

/// Object type id given to populated agents.
pub const AGENT_OBJECT_TYPE: u32 = 1;

/// Number of distinct property types handed out by [`Simulation::populate`].
pub const PROPERTY_TYPES: u32 = 4;

/// Everything needed to spawn a moving agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgentSpawn {
    /// Starting cell.
    pub position: IVec3,
    /// Object type of the agent.
    pub object: ObjectType,
    /// Cells moved per step.
    pub velocity: IVec3,
    /// Display data.
    pub sprite: Sprite,
    /// Starting energy.
    pub energy: Energy,
}

/// Outcome of one [`Simulation::step`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Tick number after the step.
    pub tick: u64,
    /// Entities that moved.
    pub moved: usize,
    /// Objects that could not move and bounced.
    pub blocked: usize,
    /// Energy pools that gained energy.
    pub recharged: usize,
}

/// Totals of a [`Simulation::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Steps executed.
    pub steps: u64,
    /// Sum of [`StepReport::moved`].
    pub moved: usize,
    /// Sum of [`StepReport::blocked`].
    pub blocked: usize,
    /// Sum of [`StepReport::recharged`].
    pub recharged: usize,
    /// Records dropped by vacuums.
    pub vacuumed: usize,
}

/// A grid world of objects, properties and agents.
///
/// # Example
///
/// ```rust,ignore
/// let mut sim = Simulation::new(16, 16);
/// let rock = sim.spawn_object(IVec3::planar(2, 3), ObjectType { id: 7 })?;
/// sim.move_object(rock, IVec3::planar(2, 4))?;
/// assert_eq!(sim.scene().object_at(IVec3::planar(2, 4)), Some(rock));
/// ```
pub struct Simulation {
    store: EntityStore<SimSchema>,
    scene: Observer<Scene>,
    rng: ChaCha8Rng,
    tick: u64,
}

impl Simulation {
    /// Creates an empty simulation on a `width × height` grid.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`; use
    /// [`Simulation::from_config`] to validate dimensions first.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_store(EntityStore::new(), width, height, 0)
    }

    /// Creates an empty simulation from a configuration.
    ///
    /// A configured `max_entities` selects a [`FixedAllocator`] with that
    /// per-table budget.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] if the configuration is invalid and
    /// [`SimError::Store`] if the entity budget cannot be reserved.
    pub fn from_config(config: &SimulationConfig) -> SimResult<Self> {
        config.validate()?;
        let store = match config.max_entities {
            Some(limit) => EntityStore::with_allocator(FixedAllocator::new(limit))?,
            None => EntityStore::new(),
        };
        Ok(Self::with_store(store, config.width, config.height, config.seed))
    }

    fn with_store(mut store: EntityStore<SimSchema>, width: usize, height: usize, seed: u64) -> Self {
        let scene = Observer::register(&mut store, Scene::new(width, height));
        info!(width, height, seed, "simulation created");
        Self {
            store,
            scene,
            rng: ChaCha8Rng::seed_from_u64(seed),
            tick: 0,
        }
    }

    // =========================================================================
    // Spawning
    // =========================================================================

    /// Spawns a solid object.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::OutOfBounds`], [`SimError::CellOccupied`], or
    /// [`SimError::Store`] if the store refuses the entity.
    pub fn spawn_object(&mut self, position: IVec3, object: ObjectType) -> SimResult<EntityId> {
        self.scene.borrow().check_vacant(Layer::Object, position)?;
        let id = self
            .store
            .add_entity((object, Position { value: position }))?
            .id();
        debug!(entity = %id, x = position.x, y = position.y, "object spawned");
        Ok(id)
    }

    /// Spawns a cell property.
    ///
    /// # Errors
    ///
    /// Same as [`Simulation::spawn_object`], for the property layer.
    pub fn spawn_property(
        &mut self,
        position: IVec3,
        property: PropertyType,
    ) -> SimResult<EntityId> {
        self.scene.borrow().check_vacant(Layer::Property, position)?;
        let id = self
            .store
            .add_entity((property, Position { value: position }))?
            .id();
        debug!(entity = %id, x = position.x, y = position.y, "property spawned");
        Ok(id)
    }

    /// Spawns a moving agent.
    ///
    /// # Errors
    ///
    /// Same as [`Simulation::spawn_object`].
    pub fn spawn_agent(&mut self, agent: AgentSpawn) -> SimResult<EntityId> {
        self.scene
            .borrow()
            .check_vacant(Layer::Object, agent.position)?;
        let id = self
            .store
            .add_entity((
                agent.object,
                Position {
                    value: agent.position,
                },
                Body::with_velocity(agent.velocity),
                agent.sprite,
                agent.energy,
            ))?
            .id();
        debug!(
            entity = %id,
            x = agent.position.x,
            y = agent.position.y,
            label = agent.sprite.label(),
            "agent spawned"
        );
        Ok(id)
    }

    /// Removes an entity from the store and the scene.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Store`] if `id` is not a live entity.
    pub fn despawn(&mut self, id: EntityId) -> SimResult<()> {
        self.store.remove_entity(id)?;
        debug!(entity = %id, "entity despawned");
        Ok(())
    }

    /// Spawns the configured number of properties and agents on distinct,
    /// randomly chosen free cells.
    ///
    /// Placement is deterministic for a given seed.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] if there are not enough free cells and
    /// [`SimError::Store`] if the store refuses an entity.
    pub fn populate(&mut self, config: &SimulationConfig) -> SimResult<()> {
        let property_cells = self.free_cells(Layer::Property, config.properties)?;
        for position in property_cells {
            let id = self.rng.gen_range(0..PROPERTY_TYPES);
            self.spawn_property(position, PropertyType { id })?;
        }

        let agent_cells = self.free_cells(Layer::Object, config.agents)?;
        for (n, position) in agent_cells.into_iter().enumerate() {
            let agent = self.random_agent(n, position);
            self.spawn_agent(agent)?;
        }

        info!(
            properties = config.properties,
            agents = config.agents,
            entities = self.store.len(),
            "simulation populated"
        );
        Ok(())
    }

    fn free_cells(&mut self, layer: Layer, count: usize) -> SimResult<Vec<IVec3>> {
        let mut cells: Vec<IVec3> = {
            let scene = self.scene.borrow();
            let (width, height) = (to_coord(scene.width()), to_coord(scene.height()));
            (0..height)
                .flat_map(|y| (0..width).map(move |x| IVec3::planar(x, y)))
                .filter(|&cell| scene.check_vacant(layer, cell).is_ok())
                .collect()
        };
        if cells.len() < count {
            return Err(crate::error::ConfigError::Invalid(format!(
                "{count} entities requested but only {} free cells",
                cells.len()
            ))
            .into());
        }
        cells.shuffle(&mut self.rng);
        cells.truncate(count);
        Ok(cells)
    }

    fn random_agent(&mut self, n: usize, position: IVec3) -> AgentSpawn {
        const HEADINGS: [IVec3; 5] = [
            IVec3::X,
            IVec3::Y,
            IVec3::new(-1, 0, 0),
            IVec3::new(0, -1, 0),
            IVec3::ZERO,
        ];
        let velocity = HEADINGS[self.rng.gen_range(0..HEADINGS.len())];
        let capacity = self.rng.gen_range(5..20);
        let label = format!("a{}", n % 10);
        AgentSpawn {
            position,
            object: ObjectType {
                id: AGENT_OBJECT_TYPE,
            },
            velocity,
            sprite: Sprite::new(&label, self.rng.gen_range(0..=0xff_ff_ff)),
            energy: Energy {
                value: self.rng.gen_range(0..=capacity),
                capacity,
                recharge_rate: self.rng.gen_range(1..3),
            },
        }
    }

    // =========================================================================
    // Movement
    // =========================================================================

    /// Moves an object to a free cell, updating the scene and its position.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NotAnObject`] if `id` is not a positioned object
    /// indexed by the scene, [`SimError::OutOfBounds`] or
    /// [`SimError::CellOccupied`] if `to` cannot take it, and
    /// [`SimError::Store`] if `id` is not a live entity.
    pub fn move_object(&mut self, id: EntityId, to: IVec3) -> SimResult<()> {
        let from = {
            let entity = self.store.entity(id)?;
            if !entity.has_component::<ObjectType>() {
                return Err(SimError::NotAnObject(id));
            }
            entity
                .try_get_component::<Position>()
                .map_err(|_| SimError::NotAnObject(id))?
                .value
        };

        let mut scene = self.scene.borrow_mut();
        scene.relocate_object(id, from, to)?;
        if let Some(handle) = scene.handle_at(Layer::Object, to) {
            let mut entity = handle.get_mut(&mut self.store)?;
            entity.get_component_mut::<Position>().value = to;
        }
        Ok(())
    }

    /// Advances the simulation by one tick.
    ///
    /// Every entity with a [`Position`] and a [`Body`] tries to move by its
    /// velocity. Objects only move into free cells and reverse their
    /// velocity when blocked; other bodies move freely inside the grid.
    /// Every [`Energy`] pool then recharges.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Store`] if the store rejects a lookup.
    pub fn step(&mut self) -> SimResult<StepReport> {
        let movers: Vec<(EntityId, IVec3, IVec3, bool)> = self
            .store
            .query::<(Position, Body)>()
            .filter(|(_, (_, body))| body.velocity != IVec3::ZERO)
            .map(|(entity, (position, body))| {
                (
                    entity.id(),
                    position.value,
                    body.velocity,
                    entity.has_component::<ObjectType>(),
                )
            })
            .collect();

        let mut report = StepReport::default();
        for (id, from, velocity, is_object) in movers {
            let to = from + velocity;
            let moved = if is_object {
                match self.move_object(id, to) {
                    Ok(()) => true,
                    Err(
                        SimError::OutOfBounds { .. }
                        | SimError::CellOccupied { .. }
                        | SimError::NotAnObject(_),
                    ) => false,
                    Err(err) => return Err(err),
                }
            } else if self.scene.borrow().contains(to) {
                self.store
                    .entity_mut(id)?
                    .get_component_mut::<Position>()
                    .value = to;
                true
            } else {
                false
            };

            let mut entity = self.store.entity_mut(id)?;
            let body = entity.get_component_mut::<Body>();
            if moved {
                body.momentum += velocity;
                report.moved += 1;
            } else {
                body.velocity = -body.velocity;
                report.blocked += 1;
            }
        }

        self.store
            .for_each_matching_mut::<(Energy,)>(|mut entity| {
                if entity.get_component_mut::<Energy>().recharge() {
                    report.recharged += 1;
                }
            });

        self.tick += 1;
        report.tick = self.tick;
        debug!(
            tick = report.tick,
            moved = report.moved,
            blocked = report.blocked,
            recharged = report.recharged,
            "step complete"
        );
        Ok(report)
    }

    /// Runs `steps` steps, vacuuming the store every `vacuum_every` steps
    /// (`0` disables vacuuming).
    ///
    /// # Errors
    ///
    /// Returns the first error of [`Simulation::step`].
    pub fn run(&mut self, steps: u64, vacuum_every: u64) -> SimResult<RunReport> {
        let mut total = RunReport::default();
        for _ in 0..steps {
            let step = self.step()?;
            total.steps += 1;
            total.moved += step.moved;
            total.blocked += step.blocked;
            total.recharged += step.recharged;

            if vacuum_every > 0 && self.tick % vacuum_every == 0 {
                total.vacuumed += self.vacuum().removed;
            }
        }
        info!(
            steps = total.steps,
            moved = total.moved,
            blocked = total.blocked,
            recharged = total.recharged,
            vacuumed = total.vacuumed,
            "run complete"
        );
        Ok(total)
    }

    /// Drops removed entities from the entity table.
    pub fn vacuum(&mut self) -> VacuumStats {
        self.store.vacuum()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The entity store.
    #[must_use]
    pub fn store(&self) -> &EntityStore<SimSchema> {
        &self.store
    }

    /// The scene index.
    ///
    /// # Panics
    ///
    /// Panics if called while the scene is borrowed mutably.
    #[must_use]
    pub fn scene(&self) -> Ref<'_, Scene> {
        self.scene.borrow()
    }

    /// Number of completed steps.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("store", &self.store)
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

/// Converts a validated grid dimension to a coordinate.
fn to_coord(extent: usize) -> i32 {
    i32::try_from(extent).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(x: i32, y: i32, velocity: IVec3) -> AgentSpawn {
        AgentSpawn {
            position: IVec3::planar(x, y),
            object: ObjectType { id: 1 },
            velocity,
            sprite: Sprite::new("ag", 0x00_ff_00),
            energy: Energy {
                value: 0,
                capacity: 4,
                recharge_rate: 1,
            },
        }
    }

    #[test]
    fn test_spawn_rejects_taken_cell_without_side_effects() {
        let mut sim = Simulation::new(4, 4);
        sim.spawn_object(IVec3::planar(1, 1), ObjectType { id: 1 })
            .unwrap();
        let before = sim.store().next_id();

        let err = sim
            .spawn_object(IVec3::planar(1, 1), ObjectType { id: 2 })
            .unwrap_err();
        assert!(matches!(err, SimError::CellOccupied { .. }));
        assert_eq!(sim.store().next_id(), before);

        let err = sim
            .spawn_property(IVec3::planar(4, 0), PropertyType { id: 1 })
            .unwrap_err();
        assert!(matches!(err, SimError::OutOfBounds { .. }));
        assert_eq!(sim.store().len(), 1);
    }

    #[test]
    fn test_move_object_updates_scene_and_position() {
        let mut sim = Simulation::new(4, 4);
        let rock = sim
            .spawn_object(IVec3::planar(0, 0), ObjectType { id: 1 })
            .unwrap();

        sim.move_object(rock, IVec3::planar(3, 3)).unwrap();

        assert_eq!(sim.scene().object_at(IVec3::planar(3, 3)), Some(rock));
        assert!(sim.scene().is_free(IVec3::ZERO));
        let position = *sim
            .store()
            .entity(rock)
            .unwrap()
            .get_component::<Position>();
        assert_eq!(position, Position::new(3, 3));
    }

    #[test]
    fn test_move_property_is_rejected() {
        let mut sim = Simulation::new(4, 4);
        let grass = sim
            .spawn_property(IVec3::planar(0, 0), PropertyType { id: 1 })
            .unwrap();
        assert!(matches!(
            sim.move_object(grass, IVec3::planar(1, 0)),
            Err(SimError::NotAnObject(id)) if id == grass
        ));
    }

    #[test]
    fn test_step_moves_and_bounces() {
        let mut sim = Simulation::new(3, 1);
        let runner = sim.spawn_agent(agent(0, 0, IVec3::X)).unwrap();

        let report = sim.step().unwrap();
        assert_eq!(report.moved, 1);
        assert_eq!(report.recharged, 1);
        assert_eq!(sim.scene().object_at(IVec3::planar(1, 0)), Some(runner));

        sim.step().unwrap();
        let report = sim.step().unwrap();
        assert_eq!(report.blocked, 1);
        assert_eq!(report.tick, 3);

        let store = sim.store();
        let entity = store.entity(runner).unwrap();
        assert_eq!(entity.get_component::<Body>().velocity, IVec3::new(-1, 0, 0));
        assert_eq!(entity.get_component::<Body>().momentum, IVec3::planar(2, 0));
        assert_eq!(entity.get_component::<Energy>().value, 3);
    }

    #[test]
    fn test_blocked_by_other_object() {
        let mut sim = Simulation::new(4, 1);
        sim.spawn_agent(agent(0, 0, IVec3::X)).unwrap();
        sim.spawn_object(IVec3::planar(1, 0), ObjectType { id: 9 })
            .unwrap();

        let report = sim.step().unwrap();
        assert_eq!(report.moved, 0);
        assert_eq!(report.blocked, 1);
    }

    #[test]
    fn test_despawn_frees_cell() {
        let mut sim = Simulation::new(2, 2);
        let id = sim.spawn_agent(agent(1, 1, IVec3::ZERO)).unwrap();
        sim.despawn(id).unwrap();

        assert!(sim.scene().is_free(IVec3::planar(1, 1)));
        assert!(matches!(sim.despawn(id), Err(SimError::Store(_))));
        assert_eq!(sim.vacuum().removed, 1);
    }

    #[test]
    fn test_populate_is_deterministic() {
        let config = SimulationConfig {
            width: 8,
            height: 8,
            seed: 42,
            agents: 10,
            properties: 20,
            ..SimulationConfig::default()
        };

        let layout = |config: &SimulationConfig| {
            let mut sim = Simulation::from_config(config).unwrap();
            sim.populate(config).unwrap();
            sim.store()
                .query::<(Position,)>()
                .map(|(entity, (position,))| (entity.id(), position.value))
                .collect::<Vec<_>>()
        };

        let first = layout(&config);
        assert_eq!(first.len(), 30);
        assert_eq!(first, layout(&config));
    }

    #[test]
    fn test_populate_respects_layers() {
        let config = SimulationConfig {
            width: 4,
            height: 4,
            agents: 16,
            properties: 16,
            ..SimulationConfig::default()
        };
        let mut sim = Simulation::from_config(&config).unwrap();
        sim.populate(&config).unwrap();

        assert_eq!(sim.scene().object_count(), 16);
        assert_eq!(sim.scene().property_count(), 16);
    }

    #[test]
    fn test_fixed_budget_is_enforced() {
        let config = SimulationConfig {
            width: 4,
            height: 4,
            agents: 1,
            properties: 1,
            max_entities: Some(2),
            ..SimulationConfig::default()
        };
        let mut sim = Simulation::from_config(&config).unwrap();
        sim.populate(&config).unwrap();

        let free = (0..4)
            .flat_map(|y| (0..4).map(move |x| IVec3::planar(x, y)))
            .find(|&cell| sim.scene().is_free(cell))
            .unwrap();
        let err = sim
            .spawn_object(free, ObjectType { id: 1 })
            .unwrap_err();
        assert!(matches!(err, SimError::Store(_)));
        assert_eq!(sim.store().len(), 2);
    }
}
