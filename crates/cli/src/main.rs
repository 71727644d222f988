use clap::{Args, Parser, Subcommand};
use pathsim_core::clock::{FixedClock, SystemClock};
use pathsim_core::config::{default_percentage_from_env_value, CoreConfig};
use pathsim_core::collection::Collection;
use pathsim_core::parser::Parser as PathwayParser;
use pathsim_core::resources::{build_manager, Resources};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pathsim")]
#[command(about = "Synthetic patient pathway authoring CLI")]
struct Cli {
    #[command(flatten)]
    hospital: HospitalArgs,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct HospitalArgs {
    /// Directory holding the pathway definitions
    #[arg(long, default_value = "pathways")]
    pathways_dir: PathBuf,
    /// Doctors registry (YAML list)
    #[arg(long, default_value = "config/doctors.yml")]
    doctors: PathBuf,
    /// Locations registry (YAML map)
    #[arg(long, default_value = "config/locations.yml")]
    locations: PathBuf,
    /// Order profiles registry (YAML map)
    #[arg(long, default_value = "config/order_profiles.yml")]
    order_profiles: PathBuf,
    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every pathway in the pathways directory
    Validate,
    /// Validate a single pathway file, bare or as a one-entry map
    ValidateFile {
        /// Pathway file (YAML or JSON)
        file: PathBuf,
        /// Validate as of this instant (RFC 3339) instead of now
        #[arg(long)]
        now: Option<String>,
    },
    /// List the loaded pathways
    List,
    /// Print the runnable form of a pathway
    Preview {
        /// Pathway name
        name: String,
    },
    /// Draw pathways the way the runner would
    Sample {
        /// Number of pathways to draw
        #[arg(long, default_value_t = 10)]
        count: usize,
        /// Only run pathways matching these patterns (comma-separated)
        #[arg(long, value_delimiter = ',')]
        include: Vec<String>,
        /// Never run pathways matching these patterns (comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
        /// Run these pathways in order instead (comma-separated)
        #[arg(long, value_delimiter = ',')]
        order: Vec<String>,
        /// Percentage of pathways without one once the explicit ones reach 100
        #[arg(long)]
        default_percentage: Option<String>,
    },
}

fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("pathsim=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let hospital = cli.hospital;
    let mut rng = rng(hospital.seed);

    let Some(command) = cli.command else {
        println!("Use 'pathsim --help' for commands");
        return Ok(());
    };

    let config = CoreConfig::new(
        hospital.pathways_dir,
        hospital.doctors,
        hospital.locations,
        hospital.order_profiles,
    )?;
    let resources = Resources::load(&config)?;
    let clock = SystemClock;

    match command {
        Commands::Validate => match resources.load_pathways(&config, &clock, &mut rng) {
            Ok(pathways) => println!("{} pathways are valid", pathways.len()),
            Err(e) => eprintln!("Error validating pathways: {}", e),
        },
        Commands::ValidateFile { file, now } => {
            let bytes = std::fs::read(&file)?;
            let fixed;
            let validator = match now {
                Some(now) => {
                    let now = chrono::DateTime::parse_from_rfc3339(&now)?;
                    fixed = FixedClock(now.with_timezone(&chrono::Utc));
                    resources.validator(&fixed)
                }
                None => resources.validator(&clock),
            };
            match PathwayParser::new(validator).parse_single(&bytes, &mut rng) {
                Ok(pathway) => println!("{}: pathway {} is valid", file.display(), pathway.name()),
                Err(e) => eprintln!("Error validating {}: {}", file.display(), e),
            }
        }
        Commands::List => {
            let pathways = resources.load_pathways(&config, &clock, &mut rng)?;
            let mut names: Vec<_> = pathways.keys().collect();
            names.sort();
            for name in names {
                let pathway = &pathways[name];
                let percentage = pathway
                    .percentage
                    .map_or_else(|| "-".to_owned(), |p| format!("{p}%"));
                println!(
                    "Name: {}, Percentage: {}, Persons: {}, Messages: {}",
                    name,
                    percentage,
                    pathway.persons.as_ref().map_or(0, |p| p.len()),
                    pathway.message_count()?
                );
            }
        }
        Commands::Preview { name } => {
            let pathways = resources.load_pathways(&config, &clock, &mut rng)?;
            let collection = Collection::new(pathways);
            match collection.get_pathway(&name, &mut rng) {
                Ok(runnable) => print!("{}", serde_yaml::to_string(&runnable)?),
                Err(e) => eprintln!("Error previewing {}: {}", name, e),
            }
        }
        Commands::Sample {
            count,
            include,
            exclude,
            order,
            default_percentage,
        } => {
            let mut config = config
                .with_filters(include, exclude)
                .with_default_percentage(default_percentage_from_env_value(default_percentage)?);
            if !order.is_empty() {
                config = config.with_order(order)?;
            }
            let pathways = resources.load_pathways(&config, &clock, &mut rng)?;
            let mut manager = build_manager(&config, pathways)?;
            for i in 1..=count {
                let pathway = manager.next_pathway(&mut rng)?;
                println!("{i}: {}", pathway.name());
            }
        }
    }

    Ok(())
}
