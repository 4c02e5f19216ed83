//! # Simulation Run Tests
//!
//! Full runs through the public API: configuration file, population,
//! stepping with periodic vacuums, and scene/store consistency afterwards.
//!
//! Run with: cargo test --package entler_sim --test simulation_run

use entler_sim::{
    Body, ConfigError, Energy, IVec3, ObjectType, Position, SimError, Simulation,
    SimulationConfig,
};

fn config() -> SimulationConfig {
    SimulationConfig {
        width: 12,
        height: 10,
        seed: 3,
        agents: 15,
        properties: 30,
        steps: 40,
        max_entities: None,
        vacuum_every: 10,
        log_filter: "warn".to_owned(),
    }
}

/// Every object in the store sits in the scene cell named by its position.
fn assert_scene_consistent(sim: &Simulation) {
    let scene = sim.scene();
    let mut objects = 0;
    for (entity, (position, _)) in sim.store().query::<(Position, ObjectType)>() {
        assert_eq!(scene.object_at(position.value), Some(entity.id()));
        objects += 1;
    }
    assert_eq!(scene.object_count(), objects);
}

#[test]
fn test_configured_run_keeps_scene_consistent() {
    let config = config();
    let mut sim = Simulation::from_config(&config).unwrap();
    sim.populate(&config).unwrap();
    assert_eq!(sim.store().len(), 45);
    assert_scene_consistent(&sim);

    let report = sim.run(config.steps, config.vacuum_every).unwrap();

    assert_eq!(report.steps, 40);
    assert_eq!(sim.tick(), 40);
    assert_scene_consistent(&sim);
    for (_, (energy,)) in sim.store().query::<(Energy,)>() {
        assert!(energy.value <= energy.capacity);
    }
}

#[test]
fn test_despawned_agents_are_vacuumed_during_run() {
    let config = config();
    let mut sim = Simulation::from_config(&config).unwrap();
    sim.populate(&config).unwrap();

    let agents: Vec<_> = sim
        .store()
        .query::<(Body,)>()
        .map(|(entity, _)| entity.id())
        .collect();
    for id in agents.iter().step_by(2) {
        sim.despawn(*id).unwrap();
    }
    assert_eq!(sim.store().tombstone_count(), 8);

    let report = sim.run(10, 5).unwrap();

    assert_eq!(report.vacuumed, 8);
    assert_eq!(sim.store().tombstone_count(), 0);
    assert_eq!(sim.store().len(), 45 - 8);
    assert_scene_consistent(&sim);
}

#[test]
fn test_objects_resolve_through_scene_handles_after_vacuum() {
    let mut sim = Simulation::new(5, 5);
    let first = sim
        .spawn_object(IVec3::planar(0, 0), ObjectType { id: 1 })
        .unwrap();
    let second = sim
        .spawn_object(IVec3::planar(4, 4), ObjectType { id: 2 })
        .unwrap();
    sim.despawn(first).unwrap();
    sim.vacuum();

    sim.move_object(second, IVec3::planar(2, 2)).unwrap();

    let entity = sim.store().entity(second).unwrap();
    assert_eq!(entity.get_component::<Position>().value, IVec3::planar(2, 2));
    assert_eq!(entity.get_component::<ObjectType>().id, 2);
    assert_eq!(sim.scene().object_at(IVec3::planar(2, 2)), Some(second));
}

#[test]
fn test_config_file_roundtrip() {
    let dir = std::env::temp_dir().join(format!("entler-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("sim.toml");
    std::fs::write(
        &path,
        "width = 6\nheight = 6\nagents = 4\nproperties = 5\nmax_entities = 9\nsteps = 3\n",
    )
    .unwrap();

    let config = SimulationConfig::load(&path).unwrap();
    assert_eq!(config.max_entities, Some(9));

    let mut sim = Simulation::from_config(&config).unwrap();
    sim.populate(&config).unwrap();
    let report = sim.run(config.steps, config.vacuum_every).unwrap();
    assert_eq!(report.steps, 3);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_invalid_config_is_rejected() {
    let err = SimulationConfig::from_toml_str("width = 2\nheight = 2\nagents = 10\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));

    let config = SimulationConfig {
        max_entities: Some(1),
        ..config()
    };
    assert!(matches!(
        Simulation::from_config(&config),
        Err(SimError::Config(ConfigError::Invalid(_)))
    ));
}
