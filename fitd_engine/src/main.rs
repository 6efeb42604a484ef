use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fitd_engine::{Scenario, Snapshot};
use fitd_formats::Edition;

/// Runs a JSON scenario through the actor simulation.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Scenario file describing rooms, objects, resources and inputs
    #[arg(long)]
    scenario: PathBuf,

    /// Number of ticks to simulate
    #[arg(long, default_value_t = 1)]
    ticks: usize,

    /// Override the scenario's game edition
    #[arg(long, value_enum)]
    edition: Option<Edition>,

    /// Path to write the final world snapshot as JSON
    #[arg(long)]
    dump_json: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut scenario = Scenario::from_path(&args.scenario)?;
    if let Some(edition) = args.edition {
        scenario.edition = edition;
    }
    let mut host = scenario.host();
    let mut world = scenario
        .build_world(&mut host)
        .with_context(|| format!("building the world of {}", args.scenario.display()))?;
    let faults = scenario.run(&mut world, &mut host, args.ticks);
    let snapshot = Snapshot::capture(&world, &host.events, &faults);

    println!(
        "{:?}: timer {} | floor {} room {} | {} live actors",
        snapshot.edition,
        snapshot.timer,
        snapshot.floor,
        snapshot.room,
        snapshot.actors.len()
    );
    for actor in &snapshot.actors {
        let state = &actor.actor;
        println!(
            "  slot {:>2} object {:>3} room {:>2} pos {:?} beta {:>4} anim {:>3} life {:>3}",
            actor.slot,
            state.index_in_world,
            state.room,
            state.room_pos,
            state.beta,
            state.anim,
            state.life
        );
    }
    for fault in &snapshot.faults {
        println!("  ! slot {} at timer {}: {}", fault.slot, fault.timer, fault.error);
    }
    if snapshot.game_over {
        println!("game over");
    }

    if let Some(path) = args.dump_json.as_ref() {
        let json =
            serde_json::to_string_pretty(&snapshot).context("serializing world snapshot")?;
        fs::write(path, json)
            .with_context(|| format!("writing snapshot JSON to {}", path.display()))?;
        println!("Saved snapshot JSON to {}", path.display());
    }
    Ok(())
}
