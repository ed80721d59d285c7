//! Integration test: conflicting demand vents.
//!
//! Two filtered void jars pull Ignis and Aqua with equal strength into a
//! row of three tubes. The middle tube adopts one demand and the outer tube
//! on the other side sees a different aspect within one point of its own,
//! so it vents, tinted with the registry color of the aspect it lost to.

use essentia_core::aspect::standard_aspects;
use essentia_core::config::NetworkConfig;
use essentia_core::container::{Container, ContainerKind};
use essentia_core::event::{EssentiaEvent, EventKind, EventLog, NullSink};
use essentia_core::test_utils::*;
use essentia_tubes::{EssentiaWorld, TubeNode};

fn void_jar(aspect: essentia_core::id::AspectId) -> Container {
    Container::new(ContainerKind::VoidJar)
        .with_filter(aspect)
        .unwrap()
}

fn conflict_world(config: NetworkConfig, middle: TubeNode) -> EssentiaWorld {
    let mut world = EssentiaWorld::new(config).with_aspects(standard_aspects().unwrap());
    world.place_container(pos(0, 0, 0), void_jar(ignis())).unwrap();
    world.place_container(pos(2, 0, 0), void_jar(aqua())).unwrap();
    world.place_tube(pos(0, 1, 0), TubeNode::standard()).unwrap();
    world.place_tube(pos(1, 1, 0), middle).unwrap();
    world.place_tube(pos(2, 1, 0), TubeNode::standard()).unwrap();
    world
}

#[test]
fn ignis_aqua_conflict_vents_with_color() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut world = conflict_world(NetworkConfig::default(), TubeNode::standard());
    let mut log = EventLog::default();
    world.tick(&mut log);

    let vents: Vec<_> = log.of_kind(EventKind::Vented).collect();
    assert!(!vents.is_empty());
    let registry = world.aspects().unwrap();
    let palette = [registry.color(ignis()), registry.color(aqua())];
    for vent in vents {
        let EssentiaEvent::Vented { color, tick, .. } = vent else {
            unreachable!()
        };
        assert_eq!(*tick, 0);
        assert!(color.is_some());
        assert!(palette.contains(color));
    }
    assert!(world.tube_at(pos(2, 1, 0)).unwrap().is_venting());
}

#[test]
fn venting_tube_sits_out_its_cooldown() {
    let config = NetworkConfig {
        vent_cooldown: 10,
        ..NetworkConfig::default()
    };
    let mut world = conflict_world(config, TubeNode::standard());
    world.tick(&mut NullSink);
    let tube = world.tube_at(pos(2, 1, 0)).unwrap();
    assert!(tube.is_venting());
    assert_eq!(tube.vent_remaining(), 10);

    world.run(5, &mut NullSink);
    let tube = world.tube_at(pos(2, 1, 0)).unwrap();
    assert!(tube.is_venting());
    assert!(tube.vent_remaining() < 10);
}

#[test]
fn filter_in_the_middle_prevents_venting() {
    let mut world = conflict_world(NetworkConfig::default(), TubeNode::filter(aqua()));
    let mut log = EventLog::default();
    world.run(10, &mut log);
    assert_eq!(log.total_recorded(EventKind::Vented), 0);
}

#[test]
fn without_a_conflict_nothing_vents() {
    let mut world = EssentiaWorld::default();
    world.place_container(pos(0, 0, 0), void_jar(ignis())).unwrap();
    world.place_container(pos(2, 0, 0), void_jar(ignis())).unwrap();
    for x in 0..=2 {
        world.place_tube(pos(x, 1, 0), TubeNode::standard()).unwrap();
    }
    let mut log = EventLog::default();
    world.run(10, &mut log);
    assert_eq!(log.total_recorded(EventKind::Vented), 0);
}
