mod common;
use std::io::Write;

use bugs_core::{BugsConfig, LogFormat, World, WorldSnapshot, WorldState};

#[test]
fn test_rounds_keep_bugs_in_lockstep() {
    let source = common::read_file("tests/samples/lockstep.bug");
    let world = World::load(&source, common::quick_config()).unwrap();
    world.start().unwrap();

    let mut round = 0.0;
    while world.run_single_step().unwrap() {
        round += 1.0;
        world.wait_until_idle();
        for agent in world.agents() {
            assert!(
                (agent.x - round).abs() < 1e-9,
                "{} at x={} after round {}",
                agent.name,
                agent.x,
                round
            );
        }
    }
    world.join_agents();

    assert_eq!(world.state(), WorldState::Finished);
    assert!(world.agents().is_empty());
    assert_eq!(world.commands().len(), 1 + 3 + 5);
    assert!(world.failures().is_empty());
    assert!(world.rounds() >= 5);
}

#[test]
fn test_failing_bug_is_removed_and_others_finish() {
    let source = common::read_file("tests/samples/faulty.bug");
    let world = World::load(&source, common::quick_config()).unwrap();
    world.start().unwrap();
    world.run_continuously().unwrap();
    world.join_agents();

    assert!(world.is_finished());
    let failures = world.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].agent, "Faulty");
    assert!(failures[0].error.contains("missing"));
    assert_eq!(world.commands().len(), 4);
}

#[test]
fn test_square_draws_four_blue_sides() {
    let source = common::read_file("tests/samples/square.bug");
    let world = World::load(&source, common::quick_config()).unwrap();
    world.start().unwrap();
    world.run_continuously().unwrap();
    world.join_agents();

    let commands = world.commands();
    assert_eq!(commands.len(), 4);
    let blue = bugs_core::color::lookup("blue").unwrap();
    assert!(commands.iter().all(|c| c.color == blue));
    let last = commands[3];
    assert!(last.x2.abs() < 1e-9 && last.y2.abs() < 1e-9);
}

#[test]
fn test_chase_on_coordinator_thread() {
    let source = common::read_file("tests/samples/chase.bug");
    let world = World::load(&source, common::quick_config()).unwrap();
    world.start().unwrap();

    let coordinator = world.spawn_continuous().unwrap();
    coordinator.join().unwrap().unwrap();
    world.join_agents();

    let snapshot = world.snapshot();
    assert_eq!(snapshot.state, WorldState::Finished);
    assert!(snapshot.failures.is_empty(), "{:?}", snapshot.failures);
    assert_eq!(snapshot.commands.len(), 11 + 3);
    assert_eq!(world.global("step"), Some(2.0));

    let runner_end = snapshot
        .commands
        .iter()
        .filter(|c| c.color == bugs_core::color::lookup("black").unwrap())
        .last()
        .unwrap();
    assert!((runner_end.x2 - 20.0).abs() < 1e-9);
    assert!((runner_end.y2 - 20.0).abs() < 1e-9);
}

#[test]
fn test_action_inside_argument_takes_its_own_round() {
    let source = "Bug A {\n    move f()\n    define f {\n        turn 90\n        return 5\n    }\n}\n\
                  Bug B {\n    move 1\n    move 1\n    move 1\n}\n";
    let world = World::load(source, common::quick_config()).unwrap();
    world.start().unwrap();

    assert!(world.run_single_step().unwrap());
    world.wait_until_idle();
    let a = world.lookup_bug("A").unwrap();
    assert_eq!(a.angle(), 90.0);
    assert_eq!((a.x(), a.y()), (0.0, 0.0));
    assert_eq!(world.lookup_bug("B").unwrap().x(), 1.0);
    assert_eq!(world.commands().len(), 1);

    assert!(world.run_single_step().unwrap());
    world.wait_until_idle();
    assert!((a.y() - 5.0).abs() < 1e-9);
    assert!(a.x().abs() < 1e-9);
    assert_eq!(world.lookup_bug("B").unwrap().x(), 2.0);
    assert_eq!(world.commands().len(), 3);

    world.run_continuously().unwrap();
    world.join_agents();
    assert!(world.failures().is_empty());
}

#[test]
fn test_paused_world_still_single_steps() {
    let world = World::load("Bug A {\nmove 1\nmove 1\n}\n", common::quick_config()).unwrap();
    world.start().unwrap();
    world.set_paused(true);

    assert!(world.run_single_step().unwrap());
    world.wait_until_idle();
    assert_eq!(world.state(), WorldState::Paused);
    assert_eq!(world.agents()[0].x, 1.0);

    world.set_paused(false);
    world.run_continuously().unwrap();
    world.join_agents();
    assert!(world.is_finished());
}

#[test]
fn test_snapshot_json_round_trip() {
    let world = World::load("Bug A {\nmoveto 3, 4\n}\n", common::quick_config()).unwrap();
    world.start().unwrap();
    world.run_single_step().unwrap();
    world.wait_until_idle();

    let json = world.snapshot().to_json().unwrap();
    let restored = WorldSnapshot::from_json(&json).unwrap();
    assert_eq!(restored.commands, world.commands());

    world.run_continuously().unwrap();
    world.join_agents();
}

#[test]
fn test_config_file_drives_world() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[world]\nround_delay_ms = 1\nstart_paused = true\n\n[logging]\nformat = \"pretty\""
    )
    .unwrap();

    let config = BugsConfig::from_file(file.path()).unwrap();
    assert_eq!(config.logging.format, LogFormat::Pretty);

    let world = World::load("Bug A {\nmove 1\n}\n", config.world).unwrap();
    world.start().unwrap();
    assert_eq!(world.state(), WorldState::Paused);
    assert_eq!(world.delay_ms(), 1);

    world.run_single_step().unwrap();
    world.join_agents();
    assert!(world.is_finished());
}
