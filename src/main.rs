mod clock;
mod config;
mod display;
mod elements;
mod predict;
mod retry;
mod storage;
mod telemetry;
mod tracker;
mod web;

use chrono::Utc;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::{mpsc, Arc};

use crate::clock::{build_time_sources, Clock, SyncedClock};
use crate::config::Config;
use crate::display::{DisplayPageController, LogSurface, Pages};
use crate::elements::{element_age, CelestrakFetcher, ElementSetCache};
use crate::predict::{PassScheduler, SearchPolicy, Sgp4Propagator};
use crate::storage::YamlFileStore;
use crate::telemetry::TelemetryHub;
use crate::tracker::{
    load_alert_setting, spawn_stdin_reader, TerminalAlarm, Tracker, TrackerParts,
};

#[derive(Parser)]
#[command(name = "pass-o-mat")]
#[command(about = "Single-satellite pass tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track the configured satellite
    Run { config: String },
    /// Validate a config file
    Validate { config: String },
    /// Show the cached element set, fetching one if needed
    Elements {
        config: String,
        /// Fetch even when the cached set is fresh
        #[arg(long)]
        refresh: bool,
    },
    /// List upcoming passes
    Passes {
        config: String,
        #[arg(short, long, default_value_t = 5)]
        count: usize,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => run(&config),
        Commands::Validate { config } => validate(&config),
        Commands::Elements { config, refresh } => show_elements(&config, refresh),
        Commands::Passes { config, count } => show_passes(&config, count),
    }
}

fn load_config(path: &str) -> Option<Config> {
    match Config::from_file(path) {
        Ok(c) => Some(c),
        Err(e) => {
            eprintln!("Config error: {}", e);
            None
        }
    }
}

fn validate(path: &str) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };
    println!("Config is valid");
    println!("  satellite: {}", config.satellite.catalog_id);
    println!(
        "  observer:  {} ({})",
        config.observer.name.as_deref().unwrap_or("unnamed"),
        config.observer.coordinates
    );
    for page in &config.display.pages {
        let state = if page.enabled { "enabled" } else { "disabled" };
        println!("  page {}: {}", page.page, state);
    }
    ExitCode::SUCCESS
}

fn element_cache(config: &Config) -> Result<ElementSetCache, String> {
    let store = YamlFileStore::open(config.storage.elements_path()).map_err(|e| e.to_string())?;
    let fetcher = CelestrakFetcher::new(
        config.elements.source_url.clone(),
        config.elements.http_timeout,
    );
    Ok(ElementSetCache::new(
        Box::new(fetcher),
        Box::new(store),
        config.elements.stale_after,
        config.elements.retry,
    ))
}

fn pass_scheduler(config: &Config) -> Result<PassScheduler, String> {
    let observer = config.observer_location().map_err(|e| e.to_string())?;
    let lookahead = chrono::Duration::from_std(config.prediction.lookahead)
        .map_err(|e| format!("lookahead out of range: {}", e))?;
    Ok(PassScheduler::new(
        Box::new(Sgp4Propagator::new()),
        observer,
        SearchPolicy {
            lookahead,
            max_iterations: config.prediction.max_iterations,
        },
        config.notifications.lead_time_s,
    ))
}

fn prediction_parts(config: &Config) -> Result<(ElementSetCache, PassScheduler), String> {
    Ok((element_cache(config)?, pass_scheduler(config)?))
}

fn show_elements(path: &str, refresh: bool) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };
    let mut cache = match element_cache(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Storage error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let now = Utc::now();
    let catalog_id = config.satellite.catalog_id;
    let result = if refresh {
        cache.refresh(catalog_id, now)
    } else {
        cache.get(catalog_id, now)
    };
    let set = match result {
        Ok(set) => set,
        Err(e) => {
            eprintln!("Element error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    println!("{}", set.name);
    println!("{}", set.line1);
    println!("{}", set.line2);
    match element_age(set, now) {
        Ok(age) => println!("Age: {} (retrieved {})", age.hours_minutes(), set.retrieved_at),
        Err(e) => eprintln!("Cannot read epoch: {}", e),
    }
    ExitCode::SUCCESS
}

fn show_passes(path: &str, count: usize) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };
    let (mut cache, mut scheduler) = match prediction_parts(&config) {
        Ok(parts) => parts,
        Err(e) => {
            eprintln!("Setup error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let now = Utc::now();
    let set = match cache.get(config.satellite.catalog_id, now) {
        Ok(set) => set.clone(),
        Err(e) => {
            eprintln!("Element error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let passes = match scheduler.upcoming_passes(&set, now, count) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Prediction error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let offset = config.utc_offset();
    println!("Upcoming passes of {}:", set.name);
    for (i, pass) in passes.iter().enumerate() {
        let (min, sec) = pass.duration_min_sec();
        println!(
            "  {}: AOS {}  TCA {}  LOS {}  {:02}:{:02}  max {:.1}",
            i + 1,
            pass.aos.with_timezone(&offset).format("%d.%m %H:%M:%S"),
            pass.tca.with_timezone(&offset).format("%H:%M:%S"),
            pass.los.with_timezone(&offset).format("%H:%M:%S"),
            min,
            sec,
            pass.max_elevation_deg
        );
    }
    ExitCode::SUCCESS
}

fn run(path: &str) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };
    let config = Arc::new(config);

    let mut clock = SyncedClock::unsynchronized();
    let mut sources = build_time_sources(&config.time_sync.sources, config.elements.http_timeout);
    if let Err(e) = clock.synchronize(&mut sources, &config.time_sync.retry) {
        eprintln!("Time sync failed: {}", e);
        return ExitCode::FAILURE;
    }

    let (cache, scheduler) = match prediction_parts(&config) {
        Ok(parts) => parts,
        Err(e) => {
            eprintln!("Setup error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let settings = match YamlFileStore::open(config.storage.settings_path()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Storage error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let alert_enabled = load_alert_setting(&settings, config.notifications.lead_time_s != 0);
    let controller = DisplayPageController::from_config(&config.display, alert_enabled);

    let (tx, rx) = mpsc::channel();
    if let Err(e) = spawn_stdin_reader(tx.clone()) {
        log::warn!("No console input: {}", e);
    }

    let hub = TelemetryHub::new();
    if let Err(e) = web::spawn_server(config.clone(), hub.handle(), tx) {
        eprintln!("Failed to start web server: {}", e);
        return ExitCode::FAILURE;
    }

    if let Ok(now) = clock.now() {
        log::info!("Starting tracker at {}", now);
    }

    let parts = TrackerParts {
        catalog_id: config.satellite.catalog_id,
        utc_offset: config.utc_offset(),
        tick: config.display.tick,
        cache,
        scheduler,
        clock: Box::new(clock),
        controller,
        pages: Pages::new(config.prediction.pass_table_rows),
        surface: Box::new(LogSurface::default()),
        alarm: Box::new(TerminalAlarm),
        settings: Box::new(settings),
        input: rx,
        telemetry: hub,
    };

    let result = Tracker::start(parts).and_then(Tracker::run);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Tracker stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}
