use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use steading::{
    engine::{Engine, EngineSettings},
    scheduler::Trigger,
    store::{JsonDirStore, NullStore, SettlementStore},
    web::{self, WebConfig},
    Catalog, ScenarioLoader,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Settlement simulation engine")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/riverbend.yaml")]
    scenario: PathBuf,

    /// Path to a catalog YAML file (built-in catalog when omitted)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Directory for settlement documents; persistence is off when omitted
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// Serve the realtime API instead of running an offline window
    #[arg(long)]
    serve: bool,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Offline mode: how many seconds of simulated time to run
    #[arg(long, default_value_t = 3600)]
    seconds: i64,

    /// Offline mode: epoch second to start from (next hour boundary when
    /// omitted)
    #[arg(long)]
    start_at: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let catalog = match &cli.catalog {
        Some(path) => Catalog::load(path)?,
        None => Catalog::builtin(),
    };

    let loader = ScenarioLoader::new(".");
    let scenario = loader.load(&cli.scenario)?;
    let mut world = scenario.build_world(&catalog)?;

    let store: Box<dyn SettlementStore> = match &cli.store_dir {
        Some(dir) => Box::new(JsonDirStore::new(dir)?),
        None => Box::new(NullStore),
    };

    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        seed: scenario.seed,
    };
    let mut engine = Engine::new(catalog, settings, store);

    if cli.serve {
        let config = WebConfig {
            host: cli.host,
            port: cli.port,
            ..WebConfig::default()
        };
        return web::serve(engine, world, config).await;
    }

    let start = cli
        .start_at
        .unwrap_or_else(|| Trigger::Resource.next_fire(Utc::now().timestamp()));
    let fired = engine.run_window(&mut world, start, cli.seconds);

    let mut counts = std::collections::BTreeMap::new();
    for (_, trigger) in &fired {
        *counts.entry(trigger.name()).or_insert(0u32) += 1;
    }
    println!(
        "Scenario '{}' ran {}s from epoch {}. Triggers fired: {:?}. Total population: {}",
        scenario.name,
        cli.seconds,
        start,
        counts,
        world.total_population()
    );
    Ok(())
}
