//! Headless симуляция SKIRMISH
//!
//! Загружает арену из RON, гоняет фиксированные тики и печатает итог боя.

use bevy::prelude::*;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use skirmish_simulation::logger::{self, LogLevel};
use skirmish_simulation::{
    create_headless_app, run_fixed_ticks, ActorDefeated, ActorId, AbilityScheduler, BossState, ContentPack,
    Defeated, HitResolved, StatusTracker, Vitals,
};

#[derive(Parser, Debug)]
#[command(name = "skirmish_simulation", about = "Headless combat simulation")]
struct Args {
    /// Content pack (RON)
    #[arg(long, default_value = "assets/content/arena.ron")]
    content: PathBuf,

    /// RNG seed (по умолчанию из конфига контента)
    #[arg(long)]
    seed: Option<u64>,

    /// Сколько фиксированных тиков прогнать
    #[arg(long, default_value_t = 1200)]
    ticks: usize,

    /// debug | info | warning | error
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let Some(level) = LogLevel::parse(&args.log_level) else {
        eprintln!("Unknown log level '{}'", args.log_level);
        return ExitCode::FAILURE;
    };
    logger::init_logger();
    logger::set_log_level(level);

    let pack = match ContentPack::load(&args.content) {
        Ok(pack) => pack,
        Err(error) => {
            logger::log_error(&format!("Content error: {}", error));
            return ExitCode::FAILURE;
        }
    };

    let seed = args.seed.unwrap_or(pack.config.seed);
    println!(
        "Starting SKIRMISH headless simulation (seed: {}, ticks: {}, content: {})",
        seed,
        args.ticks,
        args.content.display()
    );

    let mut app = create_headless_app(seed);
    if let Err(error) = pack.spawn_into(app.world_mut()) {
        logger::log_error(&format!("Spawn error: {}", error));
        return ExitCode::FAILURE;
    }

    let mut tally = Tally::default();
    for tick in 1..=args.ticks {
        run_fixed_ticks(&mut app, 1);
        tally.record(app.world());

        if tick % 100 == 0 || tick == args.ticks {
            logger::log(&format!(
                "Tick {}: {} combatants standing",
                tick,
                standing(app.world_mut())
            ));
        }
    }

    print_summary(app.world_mut(), &tally);
    println!("Simulation complete!");
    ExitCode::SUCCESS
}

fn standing(world: &mut World) -> usize {
    let mut query = world.query_filtered::<&Vitals, (With<ActorId>, Without<Defeated>)>();
    query.iter(world).count()
}

/// Счётчики за весь прогон (буферы событий хранят только последние тики)
#[derive(Debug, Default)]
struct Tally {
    connected: usize,
    defeats: usize,
}

impl Tally {
    fn record(&mut self, world: &World) {
        self.connected += world
            .resource::<Events<HitResolved>>()
            .iter_current_update_events()
            .filter(|event| event.outcome.hit)
            .count();
        self.defeats += world
            .resource::<Events<ActorDefeated>>()
            .iter_current_update_events()
            .count();
    }
}

fn print_summary(world: &mut World, tally: &Tally) {
    println!("Hits connected: {}, defeats: {}", tally.connected, tally.defeats);

    let mut query = world.query::<(
        &ActorId,
        Option<&Name>,
        &Vitals,
        &StatusTracker,
        Has<Defeated>,
        Option<&AbilityScheduler>,
        Option<&BossState>,
    )>();
    let mut rows: Vec<_> = query.iter(world).collect();
    rows.sort_by_key(|(id, ..)| **id);

    for (id, name, vitals, status, defeated, scheduler, boss) in rows {
        let name = name.map(|name| name.as_str()).unwrap_or("?");
        let state = if defeated { "defeated" } else { "standing" };
        let ability = scheduler
            .and_then(|scheduler| scheduler.active())
            .map(|active| format!(" casting '{}' ({:?})", active.definition.id, active.phase))
            .unwrap_or_default();
        let enraged = if boss.is_some_and(|boss| boss.enraged) { " [enraged]" } else { "" };
        println!(
            "  {:?} {:<12} life {:>6.1}/{:<6.1} shield {:>5.1} {}{}{}",
            id, name, vitals.life, vitals.max_life, status.shield.charge, state, enraged, ability
        );
    }
}
