//! `bugs run` subcommand: load a program, start its bugs and drive rounds.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use bugs_core::{BugsConfig, World, WorldSnapshot, WorldState};
use clap::ArgMatches;
use tracing::{info, warn};

pub fn run(matches: &ArgMatches) -> Result<()> {
    let config_path = matches.get_one::<String>("config").map(Path::new);
    let mut config = BugsConfig::load(config_path).context("failed to load configuration")?;

    if let Some(delay) = matches.get_one::<u64>("delay") {
        config.world.round_delay_ms = *delay;
    }
    if matches.get_flag("paused") {
        config.world.start_paused = true;
    }

    super::init_tracing(&config.logging);

    let file = matches
        .get_one::<String>("file")
        .context("--file is required")?;
    let source = super::read_source(Path::new(file))?;

    let world = World::load(&source, config.world.clone())
        .with_context(|| format!("failed to load {}", file))?;
    world.start().context("failed to start world")?;
    info!(file = %file, delay_ms = world.delay_ms(), "World started");

    if let Some(steps) = matches.get_one::<u64>("steps") {
        step(&world, *steps)?;
    } else if world.state() == WorldState::Paused {
        interactive(&world)?;
    } else {
        world.run_continuously()?;
    }

    if world.is_finished() {
        world.join_agents();
    } else {
        warn!(rounds = world.rounds(), "Stopping with bugs still running");
    }

    let snapshot = world.snapshot();
    if matches.get_flag("json") {
        println!("{}", snapshot.to_json()?);
    } else {
        print!("{}", render(&snapshot));
    }
    Ok(())
}

/// Release up to `rounds` rounds, letting each settle before the next.
fn step(world: &Arc<World>, rounds: u64) -> Result<()> {
    for _ in 0..rounds {
        if !world.run_single_step()? {
            break;
        }
        world.wait_until_idle();
    }
    Ok(())
}

/// Drive a paused world from standard input.
fn interactive(world: &Arc<World>) -> Result<()> {
    println!("World paused. Enter = step, c = continue, q = quit");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    while !world.is_finished() {
        print!("[round {}] > ", world.rounds());
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        match line?.trim() {
            "" | "s" | "step" => step(world, 1)?,
            "c" | "continue" => {
                world.set_paused(false);
                world.run_continuously()?;
            }
            "q" | "quit" => break,
            other => println!("Unknown command: {}", other),
        }
    }
    Ok(())
}

fn render(snapshot: &WorldSnapshot) -> String {
    let mut out = format!(
        "World {:?} after {} round(s), {} line(s) drawn\n",
        snapshot.state,
        snapshot.rounds,
        snapshot.commands.len()
    );

    if !snapshot.agents.is_empty() {
        out.push_str("Bugs:\n");
        for agent in &snapshot.agents {
            let color = agent
                .color
                .map(|c| c.to_hex())
                .unwrap_or_else(|| "none".to_string());
            out.push_str(&format!(
                "  {} at ({:.2}, {:.2}) heading {:.1} color {}\n",
                agent.name, agent.x, agent.y, agent.angle, color
            ));
        }
    }

    if !snapshot.failures.is_empty() {
        out.push_str("Failures:\n");
        for failure in &snapshot.failures {
            out.push_str(&format!("  {}: {}\n", failure.agent, failure.error));
        }
    }
    out
}
