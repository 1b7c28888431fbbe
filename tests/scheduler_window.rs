//! End-to-end scheduler behavior: an engine stepped over a full hour must
//! fire each hourly subsystem exactly once at its offset and the disaster
//! check four times, never overlapping the heavy subsystems.

use chrono::Utc;
use steading::catalog::{Biome, StructureKind};
use steading::engine::{Engine, EngineSettings};
use steading::events::EngineEvent;
use steading::modifiers;
use steading::resources::ResourceSet;
use steading::scheduler::Trigger;
use steading::store::NullStore;
use steading::world::{
    PopulationState, ResourceStorage, Settlement, SettlementId, SettlementStructure, Tile, TileId,
    WorldState,
};
use steading::Catalog;

const TOP_OF_HOUR: i64 = 36_000;

fn fixture() -> (Engine, WorldState) {
    let mut catalog = Catalog::builtin();
    catalog.disaster.chance = 0.0;

    let mut world = WorldState::default();
    world.insert_tile(Tile {
        id: TileId(1),
        biome: Biome::Plains,
        x: 0,
        y: 0,
        quality: ResourceSet::uniform(100.0),
    });
    let now = Utc::now();
    let farm = world.allocate_structure_id();
    let mut settlement = Settlement {
        id: SettlementId(1),
        name: "clockwork".into(),
        structures: vec![SettlementStructure::new(
            farm,
            StructureKind::Farm,
            Some(TileId(1)),
            Some(0),
            now,
        )],
        storage: ResourceStorage {
            current: ResourceSet::uniform(50.0),
            capacity: ResourceSet::uniform(1000.0),
            wasted: ResourceSet::default(),
        },
        population: PopulationState {
            current: 10,
            happiness: 60.0,
            last_growth_at: None,
        },
        modifier_totals: Default::default(),
    };
    settlement.modifier_totals = modifiers::recompute(&settlement, &catalog).unwrap();
    world.insert_settlement(settlement);

    let settings = EngineSettings {
        scenario_name: "clockwork".into(),
        seed: 42,
    };
    (Engine::new(catalog, settings, Box::new(NullStore)), world)
}

fn count(fired: &[(i64, Trigger)], trigger: Trigger) -> usize {
    fired.iter().filter(|(_, t)| *t == trigger).count()
}

#[test]
fn one_hour_window_fires_each_subsystem_at_its_offset() {
    let (mut engine, mut world) = fixture();
    let fired = engine.run_window(&mut world, TOP_OF_HOUR, 3600);

    assert_eq!(count(&fired, Trigger::Resource), 1);
    assert_eq!(count(&fired, Trigger::Population), 1);
    assert_eq!(count(&fired, Trigger::Repair), 1);
    assert_eq!(count(&fired, Trigger::Disaster), 4);

    let second_of = |trigger| {
        fired
            .iter()
            .find(|(_, t)| *t == trigger)
            .map(|(s, _)| *s)
            .unwrap()
    };
    assert_eq!(second_of(Trigger::Resource), TOP_OF_HOUR);
    assert_eq!(second_of(Trigger::Population), TOP_OF_HOUR + 1800);
    assert_eq!(second_of(Trigger::Repair), TOP_OF_HOUR + 2700);
}

#[test]
fn hourly_subsystems_never_share_a_second() {
    let (mut engine, mut world) = fixture();
    let fired = engine.run_window(&mut world, TOP_OF_HOUR, 3600);

    for (second, _) in &fired {
        let hourly = fired
            .iter()
            .filter(|(s, t)| s == second && *t != Trigger::Disaster)
            .count();
        assert!(hourly <= 1, "two hourly subsystems fired at second {second}");
    }
}

#[test]
fn restart_mid_hour_realigns_to_wall_clock_boundaries() {
    // An engine "restarted" at an arbitrary second computes the same
    // boundaries as one that had been running all along.
    let (mut engine, mut world) = fixture();
    let start = TOP_OF_HOUR + 417;
    let fired = engine.run_window(&mut world, start, 3600);

    assert_eq!(count(&fired, Trigger::Resource), 1);
    assert_eq!(count(&fired, Trigger::Population), 1);
    assert_eq!(count(&fired, Trigger::Repair), 1);
    assert_eq!(count(&fired, Trigger::Disaster), 4);
    for (second, _) in &fired {
        assert_eq!(second.rem_euclid(900), 0);
    }
}

#[test]
fn consecutive_windows_keep_firing() {
    let (mut engine, mut world) = fixture();
    let first = engine.run_window(&mut world, TOP_OF_HOUR, 3600);
    let second = engine.run_window(&mut world, TOP_OF_HOUR + 3600, 3600);
    assert_eq!(first.len(), second.len());
}

#[test]
fn resource_tick_broadcasts_a_production_update() {
    let (mut engine, mut world) = fixture();
    let mut rx = engine.subscribe();

    engine.run_window(&mut world, TOP_OF_HOUR, 1);

    match rx.try_recv() {
        Ok(EngineEvent::Production(update)) => {
            assert_eq!(update.settlement_id, 1);
            assert_eq!(update.production.food, 10.0);
            assert!(!update.degraded_rates);
        }
        other => panic!("expected a production update, got {other:?}"),
    }
}
