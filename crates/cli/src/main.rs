//! Headless horde driver.
//!
//! Walks one player across a sandbox map while the tracker spawns, moves,
//! merges and splits hordes around them, then prints what would be saved.

mod scenario;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use horde_core::HordeCore;
use horde_primitives::{ActorId, Vec3, WorldRandom};
use horde_worker::RunGate;
use horde_world::{HordeData, HordeSettings, HordeSnapshot, WorldEvent};

use crate::scenario::{MAP_SIZE, Scenario};

const PLAYER: ActorId = ActorId(1);
/// Player walk speed in units per second.
const PLAYER_SPEED: f32 = 40.0;
/// How far a noise made by the player carries.
const NOISE_REACH: f32 = 400.0;

#[derive(Parser, Debug)]
#[command(name = "horde")]
#[command(about = "Runs the horde simulation against a sandbox world")]
struct Args {
	/// Settings file (TOML). Defaults are used when omitted.
	#[arg(short, long, value_name = "PATH")]
	settings: Option<PathBuf>,

	/// Main-context ticks to run.
	#[arg(short, long, default_value_t = 400)]
	ticks: u64,

	/// Seconds per main-context tick.
	#[arg(long, default_value_t = 0.05)]
	dt: f32,

	#[arg(long, default_value_t = 7)]
	seed: u64,

	/// Hordes scattered over the map at start.
	#[arg(long, default_value_t = 24)]
	hordes: usize,

	/// Restore hordes from a file written by --save instead of scattering new ones.
	#[arg(long, value_name = "PATH")]
	restore: Option<PathBuf>,

	/// Write the hordes saved at shutdown to this file.
	#[arg(long, value_name = "PATH")]
	save: Option<PathBuf>,

	/// Make a noise that draws nearby hordes every this many ticks (0 disables).
	#[arg(long, default_value_t = 120)]
	noise_every: u64,

	/// Do not create new hordes while running.
	#[arg(long)]
	no_populate: bool,

	/// Log a horde summary every this many ticks.
	#[arg(long, default_value_t = 50)]
	report_every: u64,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();
	horde_core::logging::init(args.verbose);

	let settings = match &args.settings {
		Some(path) => HordeSettings::load(path)?,
		None => HordeSettings::default(),
	};

	let scenario = Scenario::new();
	let mut world = scenario.world();
	let mut rng = WorldRandom::seeded(args.seed);
	let view_distance = settings.view_distance;
	let mut core = HordeCore::new(settings, scenario.biomes.clone()).with_seed(args.seed);
	if !args.no_populate {
		for populator in scenario.populators(view_distance) {
			core.register_populator(populator);
		}
	}

	match &args.restore {
		Some(path) => {
			let saved = read_saved(path)?;
			let restored = core.tracker().restore(&saved, &scenario.catalog, &mut rng)?;
			tracing::info!(path = %path.display(), hordes = restored, "cli.restored");
		}
		None => {
			let ids = scenario.seed_hordes(core.tracker(), args.hordes, &mut rng)?;
			tracing::info!(hordes = ids.len(), seed = args.seed, "cli.seeded");
		}
	}
	core.start()?;

	let start = Vec3::new(64.0, 0.0, 64.0);
	let end = Vec3::new(MAP_SIZE - 64.0, 0.0, MAP_SIZE - 64.0);
	let mut player = start;
	let pacing = RunGate::new();
	let frame = Duration::from_secs_f32(args.dt.max(0.0));

	for tick in 1..=args.ticks {
		player = player.step_toward(end, PLAYER_SPEED * args.dt);
		world.put_player(PLAYER, player, 0.0);
		if args.noise_every > 0 && tick % args.noise_every == 0 {
			core.tracker().report(WorldEvent::new(player, NOISE_REACH))?;
			tracing::debug!(tick, player = ?player, "cli.noise");
		}

		let report = core.tick(&mut world, args.dt);
		if args.report_every > 0 && tick % args.report_every == 0 {
			let snapshots = core.tracker().snapshots().unwrap_or_default();
			tracing::info!(
				tick,
				player = ?player,
				hordes = snapshots.len(),
				spawned = spawned(&snapshots),
				actors = world.actor_count(),
				requests = ?core.request_counts(),
				completed = report.completed,
				"cli.report"
			);
		}
		pacing.sleep(frame);
	}

	for worker in core.workers() {
		tracing::info!(worker = %worker.name, steps = worker.steps, faults = worker.faults, last_fault = ?worker.last_fault, "cli.worker");
	}

	let saved = core.shutdown();
	let density: f32 = saved.iter().flat_map(|horde| &horde.clusters).map(|cluster| cluster.density).sum();
	println!("{} hordes saved, total density {density:.2}", saved.len());

	if let Some(path) = &args.save {
		write_saved(path, &saved)?;
		println!("wrote {}", path.display());
	}
	Ok(())
}

fn spawned(snapshots: &[HordeSnapshot]) -> usize {
	snapshots.iter().flat_map(|horde| &horde.clusters).map(|cluster| cluster.spawned).sum()
}

fn read_saved(path: &Path) -> Result<Vec<HordeData>, Box<dyn std::error::Error>> {
	let content = std::fs::read_to_string(path)?;
	Ok(serde_json::from_str(&content)?)
}

fn write_saved(path: &Path, saved: &[HordeData]) -> Result<(), Box<dyn std::error::Error>> {
	std::fs::write(path, serde_json::to_string_pretty(saved)?)?;
	Ok(())
}
