use std::sync::{Arc, Mutex};

use road_traffic_sim::simulation::{
    NodeId, PersistenceError, SaveFormat, SimConfig, SimId, Simulator, Vec2, World, WorldEvent,
};

/// Roads added in both directions are linked and indexed at both ends
#[test]
fn test_two_way_road_links_reverse() {
    let mut world = World::new();
    let a = world.add_node(Vec2::new(0.0, 0.0));
    let b = world.add_node(Vec2::new(100.0, 0.0));
    let (ab, ba) = world.add_two_way_road(a, b, 40.0).unwrap();

    assert_eq!(world.road(ab).unwrap().reverse_road, Some(ba));
    assert_eq!(world.road(ba).unwrap().reverse_road, Some(ab));
    assert_eq!(world.intersection(a).unwrap().outgoing, vec![ab]);
    assert_eq!(world.intersection(a).unwrap().incoming, vec![ba]);
    assert_eq!(world.find_road_between(b, a), Some(ba));

    // Reverse roads drive on their own side of the centre line
    let forward = world.road(ab).unwrap().pos_at(50.0);
    let backward = world.road(ba).unwrap().pos_at(50.0);
    assert!((forward.y - backward.y).abs() > 1.0);
}

/// A loop gets opposing default anchor offsets so it has a length
#[test]
fn test_loop_road_offsets() {
    let mut world = World::new();
    let a = world.add_node(Vec2::new(10.0, 10.0));
    let id = world.add_road(a, a, 30.0).unwrap();

    let road = world.road(id).unwrap();
    assert!(road.is_loop());
    assert_eq!(road.start_offset, Vec2::new(9.0, 0.0));
    assert_eq!(road.end_offset, Vec2::new(-9.0, 0.0));
    assert!((road.length - 18.0).abs() < 1e-4);
    assert!(road.reverse_road.is_none());
}

#[test]
fn test_invalid_mutations_are_rejected() {
    let mut world = World::new();
    let a = world.add_node(Vec2::new(0.0, 0.0));
    let b = world.add_node(Vec2::new(100.0, 0.0));
    let ab = world.add_road(a, b, 40.0).unwrap();

    assert!(world.add_road(a, b, 0.0).is_err());
    assert!(world.add_spawn_point(b, ab).is_err());
    assert!(world.add_despawn_point(a, ab).is_err());
    assert!(world.move_node(NodeId(SimId(9_999)), Vec2::ZERO).is_err());
    world.remove_road(ab).unwrap();
    assert!(world.remove_road(ab).is_err());
    assert!(world.add_vehicle(ab, 0.0, 10.0).is_err());
}

/// Removing a road takes its vehicles, points and light references with it
#[test]
fn test_remove_road_detaches_everything() {
    let mut world = World::new();
    let a = world.add_node(Vec2::new(0.0, 0.0));
    let b = world.add_node(Vec2::new(100.0, 0.0));
    let c = world.add_node(Vec2::new(200.0, 0.0));
    let ab = world.add_road(a, b, 40.0).unwrap();
    let bc = world.add_road(b, c, 40.0).unwrap();

    world.add_spawn_point(b, bc).unwrap();
    world.add_despawn_point(c, bc).unwrap();
    let light = world.add_traffic_light_for(c, &[bc]).unwrap();

    let on_bc = world.add_vehicle(bc, 10.0, 10.0).unwrap();
    let heading_to_bc = world.add_vehicle(ab, 80.0, 10.0).unwrap();
    world.vehicle_mut(heading_to_bc).unwrap().next_road = Some(bc);

    world.remove_road(bc).unwrap();

    assert!(world.vehicle(on_bc).is_none());
    assert_eq!(world.vehicle(heading_to_bc).unwrap().next_road, None);
    assert!(world.spawn_points.is_empty());
    assert!(world.despawn_points.is_empty());
    assert!(world.traffic_lights[&light].controlled_roads.is_empty());
    assert!(world.intersection(b).unwrap().outgoing.is_empty());
    assert!(world.intersection(c).unwrap().is_empty());
}

/// Removing a node removes every road touching it
#[test]
fn test_remove_node_cascades() {
    let mut world = World::new();
    let a = world.add_node(Vec2::new(0.0, 0.0));
    let b = world.add_node(Vec2::new(100.0, 0.0));
    let c = world.add_node(Vec2::new(200.0, 0.0));
    world.add_two_way_road(a, b, 40.0).unwrap();
    let (bc, _) = world.add_two_way_road(b, c, 40.0).unwrap();
    world.add_despawn_point(c, bc).unwrap();

    world.remove_node(c).unwrap();

    assert_eq!(world.roads.len(), 2);
    assert!(world.intersection(c).is_none());
    assert!(world.despawn_points.is_empty());
    assert_eq!(world.intersection(b).unwrap().roads().len(), 2);
}

/// Moving a node stretches its roads and carries vehicles along
#[test]
fn test_move_node_refreshes_geometry() {
    let mut world = World::new();
    let a = world.add_node(Vec2::new(0.0, 0.0));
    let b = world.add_node(Vec2::new(100.0, 0.0));
    let ab = world.add_road(a, b, 40.0).unwrap();
    let v = world.add_vehicle(ab, 90.0, 0.0).unwrap();

    world.move_node(b, Vec2::new(0.0, 50.0)).unwrap();

    let road = world.road(ab).unwrap();
    assert!((road.length - 50.0).abs() < 1e-4);
    let vehicle = world.vehicle(v).unwrap();
    assert_eq!(vehicle.distance, 50.0);
    assert!(vehicle.pos.distance(&Vec2::new(0.0, 50.0)) < 1e-4);
}

/// Splitting re-homes vehicles on whichever half they are on
#[test]
fn test_split_road() {
    let mut world = World::new();
    let a = world.add_node(Vec2::new(0.0, 0.0));
    let b = world.add_node(Vec2::new(200.0, 0.0));
    let (ab, _) = world.add_two_way_road(a, b, 40.0).unwrap();
    world.add_despawn_point(b, ab).unwrap();
    let near = world.add_vehicle(ab, 50.0, 10.0).unwrap();
    let far = world.add_vehicle(ab, 150.0, 10.0).unwrap();

    let (mid, first, second) = world.split_road(ab, Vec2::new(100.0, 0.0)).unwrap();

    assert!(world.road(ab).is_none());
    assert_eq!(world.roads.len(), 4);
    assert_eq!(world.road(first).unwrap().to, mid);
    assert_eq!(world.road(second).unwrap().from, mid);
    assert!(world.road(second).unwrap().reverse_road.is_some());
    assert_eq!(world.intersection(mid).unwrap().incoming.len(), 2);
    assert_eq!(world.intersection(mid).unwrap().outgoing.len(), 2);

    let near = world.vehicle(near).unwrap();
    assert_eq!((near.road, near.distance), (first, 50.0));
    let far = world.vehicle(far).unwrap();
    assert_eq!((far.road, far.distance), (second, 50.0));

    assert!(world.despawn_points.values().all(|dp| dp.road == second));
}

/// Curving a road bends its middle, mirrors onto the reverse road and
/// leaves the end points alone
#[test]
fn test_road_curve() {
    let mut world = World::new();
    let a = world.add_node(Vec2::new(0.0, 0.0));
    let b = world.add_node(Vec2::new(200.0, 0.0));
    let c = world.add_node(Vec2::new(200.0, 200.0));
    let (ab, ba) = world.add_two_way_road(a, b, 40.0).unwrap();
    let bc = world.add_road(b, c, 40.0).unwrap();

    let straight_start = world.road(ab).unwrap().pos_at(0.0);
    let straight_mid = world.road(ab).unwrap().pos_at(100.0);

    world.set_road_curve(ab, None, Some(bc)).unwrap();

    let road = world.road(ab).unwrap();
    assert!(road.curve.is_some());
    assert!(world.road(ba).unwrap().curve.is_some());
    assert!(road.pos_at(0.0).distance(&straight_start) < 1e-3);
    assert!(road.pos_at(100.0).distance(&straight_mid) > 1.0);

    world.clear_road_curve(ab).unwrap();
    assert!(world.road(ab).unwrap().curve.is_none());
    assert!(world.road(ba).unwrap().curve.is_none());
    assert!(world.road(ab).unwrap().pos_at(100.0).distance(&straight_mid) < 1e-3);
}

/// Structural changes are published to subscribers
#[test]
fn test_world_events() {
    let mut world = World::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    world
        .events
        .subscribe(move |event| sink.lock().unwrap().push(*event));

    let a = world.add_node(Vec2::new(0.0, 0.0));
    let b = world.add_node(Vec2::new(100.0, 0.0));
    let ab = world.add_road(a, b, 40.0).unwrap();
    world.remove_node(b).unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            WorldEvent::NodeCreated(a),
            WorldEvent::NodeCreated(b),
            WorldEvent::RoadCreated(ab),
            WorldEvent::RoadDeleted(ab),
            WorldEvent::NodeDeleted(b),
        ]
    );
}

/// Save records rebuild the same structure, with fresh ids after the saved ones
#[test]
fn test_save_and_load() {
    let mut world = World::create_demo_world_with_seed(1);
    let some_road = *world.roads.keys().next().unwrap();
    world.set_road_curve(some_road, None, None).unwrap();

    let json = world.to_save_format().to_json().unwrap();
    let save = SaveFormat::from_json(&json).unwrap();
    let mut loaded = World::from_save_format(&save).unwrap();

    assert_eq!(loaded.nodes.len(), world.nodes.len());
    assert_eq!(loaded.roads.len(), world.roads.len());
    assert_eq!(loaded.spawn_points.len(), world.spawn_points.len());
    assert_eq!(loaded.despawn_points.len(), world.despawn_points.len());
    assert_eq!(loaded.traffic_lights.len(), world.traffic_lights.len());
    assert_eq!(loaded.intersections, world.intersections);
    for (id, road) in &world.roads {
        let other = loaded.road(*id).unwrap();
        assert_eq!(other.reverse_road, road.reverse_road);
        assert_eq!(other.curve, road.curve);
        assert!((other.length - road.length).abs() < 1e-3);
    }

    let newest = loaded.add_node(Vec2::ZERO);
    assert!(world.nodes.keys().all(|id| *id < newest));
    assert!(world.roads.keys().all(|id| id.0 < newest.0));
}

#[test]
fn test_load_rejects_bad_records() {
    let mut save = World::create_demo_world().to_save_format();
    save.version = "0.9.0".to_string();
    assert!(matches!(
        World::from_save_format(&save),
        Err(PersistenceError::UnsupportedVersion { .. })
    ));

    let mut save = World::create_demo_world().to_save_format();
    save.nodes.remove(0);
    assert!(matches!(
        World::from_save_format(&save),
        Err(PersistenceError::UnknownNode { .. })
    ));

    assert!(matches!(
        SaveFormat::from_json("{ not json"),
        Err(PersistenceError::Json(_))
    ));
}

/// Wall-clock time is drained in whole ticks; pausing stops both
/// accumulation and stepping
#[test]
fn test_simulator_accumulator_and_pause() {
    let mut sim = Simulator::new(World::new(), 0.25, &SimConfig::default());

    assert_eq!(sim.update_once(0.625), 2);
    assert_eq!(sim.accumulated(), 0.125);

    assert!(sim.toggle_pause());
    assert!(sim.is_paused());
    assert_eq!(sim.update_once(1.0), 0);
    assert_eq!(sim.accumulated(), 0.125);
    assert_eq!(sim.tick_count(), 2);

    assert!(!sim.toggle_pause());
    assert_eq!(sim.update_once(0.125), 1);
    assert_eq!(sim.tick_count(), 3);
    assert_eq!(sim.read().time, 0.75);
}

/// The right-of-way system only joins the pipeline when flagged
#[test]
fn test_pipeline_order() {
    let plain = Simulator::new(World::new(), 0.1, &SimConfig::default());
    assert_eq!(
        plain.system_names(),
        vec!["spawn", "collision", "traffic_light", "pathfinding", "movement", "despawn"]
    );

    let config = SimConfig::from_json_str(r#"{"featureFlags": {"RIGHT_OF_WAY_SYSTEM": true}}"#)
        .unwrap();
    let flagged = Simulator::new(World::new(), 0.1, &config);
    assert_eq!(
        flagged.system_names(),
        vec![
            "spawn",
            "collision",
            "traffic_light",
            "right_of_way",
            "pathfinding",
            "movement",
            "despawn"
        ]
    );
}

/// Replacing the world keeps subscribers and announces the load
#[test]
fn test_replace_world() {
    let mut world = World::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    world
        .events
        .subscribe(move |event| sink.lock().unwrap().push(*event));

    let mut sim = Simulator::new(world, 0.1, &SimConfig::default());
    sim.replace_world(World::create_demo_world());

    assert_eq!(*seen.lock().unwrap(), vec![WorldEvent::WorldLoaded]);
    assert_eq!(sim.read().events.subscriber_count(), 1);
    assert_eq!(sim.read().nodes.len(), 13);

    let added = sim.edit_world(|world| world.add_node(Vec2::new(500.0, 500.0)));
    assert!(sim.read().node(added).is_some());
    assert_eq!(seen.lock().unwrap().last(), Some(&WorldEvent::NodeCreated(added)));
}
