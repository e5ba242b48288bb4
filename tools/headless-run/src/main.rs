//! headless-run: drive a WAVEBOUND encounter without a game engine.
//!
//! Usage:
//!   headless-run run --config encounter.json --ticks 7200 --snapshots
//!   headless-run config > encounter.json

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process;

use serde::Serialize;
use thiserror::Error;

use wavebound_core::commands::EncounterCommand;
use wavebound_core::config::{ConfigLoadError, EncounterConfig};
use wavebound_core::constants::{DT, TICK_RATE};
use wavebound_core::enums::{EnemyVariant, WavePhase};
use wavebound_core::events::EncounterEvent;
use wavebound_core::types::{EnemyHandle, Vec2};
use wavebound_sim::testing::{RecordingChest, RecordingFactory, ScriptedPlayer};
use wavebound_sim::{BuildError, Encounter, EncounterBuilder};

#[derive(Debug, Error)]
enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigLoadError),
}

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    match args[1].as_str() {
        "run" => cmd_run(&args[2..]),
        "config" => cmd_config(),
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!(
        "headless-run: WAVEBOUND encounter driver\n\
         \n\
         Commands:\n\
         \n\
         run       Play an encounter with a scripted player\n\
         \n\
           --config <path>      Encounter config JSON (partial files allowed)\n\
           --ticks <N>          Ticks to simulate (default: 60 s of play)\n\
           --seed <N>           Override the config seed\n\
           --upgrade-points <N> Upgrade points granted at every wave start\n\
           --passive-elite      Never attack the boss (exercises the timeout path)\n\
           --snapshots          Print every snapshot as a JSON line\n\
         \n\
         config    Print the default config as JSON\n\
         \n\
         Set RUST_LOG=info (or debug) for encounter logs on stderr.\n"
    );
}

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    for i in 0..args.len() {
        if args[i] == name && i + 1 < args.len() {
            return Some(&args[i + 1]);
        }
    }
    None
}

fn parse_number<T: std::str::FromStr>(args: &[String], name: &str, default: T) -> T {
    match flag_value(args, name) {
        Some(raw) => match raw.parse() {
            Ok(n) => n,
            Err(_) => {
                eprintln!("Error: {name} expects a number, got {raw}");
                process::exit(1);
            }
        },
        None => default,
    }
}

fn load_config(path: &Path) -> Result<EncounterConfig, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(EncounterConfig::from_json(&text)?)
}

// --- Config command ---

fn cmd_config() {
    match serde_json::to_string_pretty(&EncounterConfig::default()) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error encoding config: {e}");
            process::exit(1);
        }
    }
}

// --- Run command ---

/// Per-run totals printed when the run ends.
#[derive(Debug, Default, Serialize)]
struct RunSummary {
    ticks: u64,
    seconds: f64,
    final_wave: u32,
    final_phase: WavePhase,
    enemies_spawned: usize,
    elites_defeated: u32,
    failures: u32,
    chests: u32,
    gold: u32,
    xp: u32,
}

type HeadlessEncounter = Encounter<ScriptedPlayer, RecordingFactory>;

/// Scripted stand-in for the combat and UI subsystems.
struct Pilot {
    killed: HashSet<EnemyHandle>,
    chest_on_field: bool,
    passive_elite: bool,
    upgrade_points: u32,
}

impl Pilot {
    /// Queue whatever the player would do in the current phase.
    fn act(&mut self, encounter: &mut HeadlessEncounter) {
        match encounter.phase() {
            WavePhase::Combat => {
                let targets: Vec<(EnemyHandle, Vec2)> = encounter
                    .factory()
                    .spawned
                    .iter()
                    .filter(|(h, order)| {
                        order.variant != EnemyVariant::Boss && !self.killed.contains(h)
                    })
                    .map(|(h, order)| (*h, order.position))
                    .collect();
                for (handle, position) in targets {
                    self.killed.insert(handle);
                    encounter.queue_command(EncounterCommand::EnemyKilled {
                        handle,
                        gold_value: 3,
                        position,
                    });
                    encounter.queue_command(EncounterCommand::XpCollected { amount: 1 });
                }
            }
            WavePhase::Elite => {
                if self.passive_elite {
                    return;
                }
                if let Some(handle) = encounter.elite_handle() {
                    if self.killed.insert(handle) {
                        let position = encounter
                            .factory()
                            .order(handle)
                            .map(|order| order.position)
                            .unwrap_or(Vec2::ZERO);
                        encounter.queue_command(EncounterCommand::EnemyKilled {
                            handle,
                            gold_value: 10,
                            position,
                        });
                    }
                }
            }
            WavePhase::ChestReward => {
                if self.chest_on_field {
                    self.chest_on_field = false;
                    encounter.queue_command(EncounterCommand::ChestResolved { taken: false });
                }
            }
            WavePhase::Upgrade => encounter.queue_command(EncounterCommand::UpgradeChosen),
            WavePhase::Shop => encounter.queue_command(EncounterCommand::ShopContinue),
        }
    }

    fn observe(
        &mut self,
        event: &EncounterEvent,
        summary: &mut RunSummary,
        encounter: &mut HeadlessEncounter,
    ) {
        match event {
            EncounterEvent::ChestSpawned { .. } => {
                self.chest_on_field = true;
                summary.chests += 1;
            }
            EncounterEvent::EliteEnded { defeated: true } => summary.elites_defeated += 1,
            EncounterEvent::FailureAnnounced { .. } => summary.failures += 1,
            EncounterEvent::WaveStarted { .. } => {
                encounter.player_mut().upgrade_points += self.upgrade_points;
            }
            _ => {}
        }
    }
}

fn cmd_run(args: &[String]) {
    let mut config = match flag_value(args, "--config") {
        Some(path) => match load_config(Path::new(path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        },
        None => EncounterConfig::default(),
    };
    config.seed = parse_number(args, "--seed", config.seed);
    let ticks: u64 = parse_number(args, "--ticks", u64::from(TICK_RATE) * 60);
    let print_snapshots = args.iter().any(|a| a == "--snapshots");

    let mut pilot = Pilot {
        killed: HashSet::new(),
        chest_on_field: false,
        passive_elite: args.iter().any(|a| a == "--passive-elite"),
        upgrade_points: parse_number(args, "--upgrade-points", 0),
    };

    let built: Result<HeadlessEncounter, BuildError> = EncounterBuilder::new(config)
        .player(ScriptedPlayer::new())
        .enemy_factory(RecordingFactory::new())
        .reward_chest(RecordingChest::new())
        .build();
    let mut encounter = match built {
        Ok(encounter) => encounter,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let mut summary = RunSummary::default();
    for _ in 0..ticks {
        pilot.act(&mut encounter);
        let snapshot = encounter.tick(DT);
        for event in &snapshot.events {
            pilot.observe(event, &mut summary, &mut encounter);
        }
        if print_snapshots {
            match serde_json::to_string(&snapshot) {
                Ok(line) => println!("{line}"),
                Err(e) => {
                    eprintln!("Error encoding snapshot: {e}");
                    process::exit(1);
                }
            }
        }
    }

    let time = encounter.time();
    summary.ticks = time.tick;
    summary.seconds = time.elapsed_secs;
    summary.final_wave = encounter.wave_level();
    summary.final_phase = encounter.phase();
    summary.enemies_spawned = encounter.factory().spawned.len();
    summary.gold = encounter.player().gold;
    summary.xp = encounter.player().xp;

    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error encoding summary: {e}");
            process::exit(1);
        }
    }
}
