use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pathsim_core::clock::SystemClock;
use pathsim_core::config::{
    CoreConfig, default_percentage_from_env_value, list_from_env_value, seed_from_env_value,
};
use pathsim_core::resources::{Resources, build_manager};

const DEFAULT_COUNT: usize = 10;

fn env_path(name: &str, default: &str) -> PathBuf {
    std::env::var(name)
        .unwrap_or_else(|_| default.into())
        .into()
}

/// Main entry point for the pathway runner
///
/// Loads the hospital registries and the pathways, builds the configured selection strategy and
/// logs the next pathways it would run. Nothing is sent anywhere: this is a dry run of the
/// schedule.
///
/// # Environment Variables
/// - `PATHSIM_PATHWAYS_DIR`: pathway definitions (default: "pathways")
/// - `PATHSIM_DOCTORS_FILE`, `PATHSIM_LOCATIONS_FILE`, `PATHSIM_ORDER_PROFILES_FILE`: registries
///   (default: under "config/")
/// - `PATHSIM_INCLUDE`, `PATHSIM_EXCLUDE`: comma separated pathway name patterns
/// - `PATHSIM_ORDER`: comma separated pathway names to run in order instead of at random
/// - `PATHSIM_DEFAULT_PERCENTAGE`: weight of pathways without a percentage once the explicit
///   ones reach 100 (default: 1)
/// - `PATHSIM_SEED`: seed for a reproducible schedule
/// - `PATHSIM_COUNT`: number of pathways to schedule (default: 10)
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pathsim=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = CoreConfig::new(
        env_path("PATHSIM_PATHWAYS_DIR", "pathways"),
        env_path("PATHSIM_DOCTORS_FILE", "config/doctors.yml"),
        env_path("PATHSIM_LOCATIONS_FILE", "config/locations.yml"),
        env_path("PATHSIM_ORDER_PROFILES_FILE", "config/order_profiles.yml"),
    )?
    .with_filters(
        list_from_env_value(std::env::var("PATHSIM_INCLUDE").ok()),
        list_from_env_value(std::env::var("PATHSIM_EXCLUDE").ok()),
    )
    .with_default_percentage(default_percentage_from_env_value(
        std::env::var("PATHSIM_DEFAULT_PERCENTAGE").ok(),
    )?);
    let order = list_from_env_value(std::env::var("PATHSIM_ORDER").ok());
    if !order.is_empty() {
        config = config.with_order(order)?;
    }
    if let Some(seed) = seed_from_env_value(std::env::var("PATHSIM_SEED").ok())? {
        config = config.with_seed(seed);
    }
    let count = match std::env::var("PATHSIM_COUNT") {
        Ok(value) => value.trim().parse()?,
        Err(_) => DEFAULT_COUNT,
    };

    let mut rng = match config.seed() {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    tracing::info!("++ Loading pathways from {}", config.pathways_dir().display());
    let resources = Resources::load(&config)?;
    let pathways = resources.load_pathways(&config, &SystemClock, &mut rng)?;
    let mut manager = build_manager(&config, pathways)?;

    for i in 1..=count {
        let pathway = manager.next_pathway(&mut rng)?;
        tracing::info!(
            pathway_name = pathway.name(),
            steps = pathway.pathway.len(),
            historical_steps = pathway.history.len(),
            messages = pathway.message_count()?,
            "Scheduled pathway {i}/{count}"
        );
    }

    Ok(())
}
