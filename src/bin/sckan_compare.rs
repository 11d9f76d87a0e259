use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sckan_compare::app::{self, App};
use sckan_compare::assets::AssetRegistry;
use sckan_compare::cache::ResultCache;
use sckan_compare::config::{ConfigLoader, ResolvedConfig};
use sckan_compare::error::SckanError;
use sckan_compare::output::{JsonOutput, OutputFormat};
use sckan_compare::queries::NamedQuery;
use sckan_compare::sparql::SparqlHttpClient;
use sckan_compare::synonyms::canonical_species;

#[derive(Parser)]
#[command(name = "sckan-compare")]
#[command(about = "Compare neuron connectivity across species in the SCKAN knowledge graph")]
#[command(version, author)]
struct Cli {
    #[command(flatten)]
    overrides: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[arg(long, global = true)]
    cache_dir: Option<String>,

    #[arg(long, global = true)]
    max_cache_days: Option<u32>,

    #[arg(long, global = true)]
    asset_dir: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run a named query and print the raw result")]
    Query(QueryArgs),
    #[command(about = "List known species and whether they have a region asset")]
    Species,
    #[command(about = "Region URI to label map of a species")]
    Regions(RegionsArgs),
    #[command(about = "Run a named query and print the normalized table")]
    Table(TableArgs),
    #[command(about = "Compare neuron paths of two species")]
    Compare(CompareArgs),
    #[command(about = "Build the connection scene of a named query")]
    Scene(SceneArgs),
    #[command(about = "Inspect or maintain the query cache")]
    Cache(CacheArgs),
}

#[derive(Args)]
struct QueryArgs {
    name: NamedQuery,

    #[arg(long)]
    species: Option<String>,

    #[arg(long)]
    no_cache: bool,
}

#[derive(Args)]
struct RegionsArgs {
    #[arg(long)]
    species: String,

    /// Also look up the rdfs:label of every region URI on the species' neuron paths
    #[arg(long)]
    lookup: bool,
}

#[derive(Args)]
struct TableArgs {
    name: NamedQuery,

    #[arg(long)]
    species: String,

    #[arg(long)]
    filter_column: Option<String>,

    #[arg(long)]
    filter_value: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    #[arg(long)]
    no_cache: bool,
}

#[derive(Args)]
struct CompareArgs {
    #[arg(long = "species", required = true)]
    species: Vec<String>,

    #[arg(long)]
    start: Option<String>,

    #[arg(long)]
    end: Option<String>,
}

#[derive(Args)]
struct SceneArgs {
    name: NamedQuery,

    #[arg(long)]
    species: String,
}

#[derive(Args)]
struct CacheArgs {
    #[command(subcommand)]
    command: CacheCommand,
}

#[derive(Subcommand)]
enum CacheCommand {
    #[command(about = "Remove expired entries")]
    Sweep,
    #[command(about = "Show cache location and size")]
    Info,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<SckanError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SckanError) -> u8 {
    match error {
        SckanError::InvalidArgument(_) | SckanError::UnsupportedSpecies(_) => 2,
        SckanError::RemoteHttp(_)
        | SckanError::RemoteStatus { .. }
        | SckanError::MalformedResponse(_) => 3,
        SckanError::Storage(_)
        | SckanError::ConfigRead(_)
        | SckanError::ConfigParse(_)
        | SckanError::AssetRead(_)
        | SckanError::AssetParse { .. } => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli.overrides)?;
    let cache = ResultCache::open(config.cache_dir.clone(), config.max_cache_days)?;

    if let Commands::Cache(args) = &cli.command {
        match args.command {
            CacheCommand::Sweep => JsonOutput::print_json(&app::sweep_cache(&cache)?)?,
            CacheCommand::Info => JsonOutput::print_json(&app::cache_info(&cache)?)?,
        }
        return Ok(());
    }

    let assets = AssetRegistry::load(&config.asset_dir)?;
    let client = SparqlHttpClient::new(&config.endpoint, config.request_timeout)?;
    let app = App::bootstrap(client, cache, assets)?;

    match cli.command {
        Commands::Query(args) => {
            let species = args.species.as_deref().map(canonical_species);
            let result = app.execute(args.name, species, !args.no_cache)?;
            JsonOutput::print_json(&result)?;
        }
        Commands::Species => JsonOutput::print_json(&app.species())?,
        Commands::Regions(args) => {
            JsonOutput::print_json(&app.regions(canonical_species(&args.species), args.lookup)?)?
        }
        Commands::Table(args) => {
            let table = app.table(
                args.name,
                canonical_species(&args.species),
                args.filter_column.as_deref(),
                args.filter_value.as_deref(),
                !args.no_cache,
            )?;
            JsonOutput::print_table(&table, args.format)?;
        }
        Commands::Compare(args) => {
            let [first, second] = args.species.as_slice() else {
                return Err(SckanError::InvalidArgument(
                    "compare takes exactly two --species".to_string(),
                )
                .into());
            };
            let result = app.compare(
                canonical_species(first),
                canonical_species(second),
                args.start.as_deref(),
                args.end.as_deref(),
            )?;
            JsonOutput::print_json(&result)?;
        }
        Commands::Scene(args) => {
            JsonOutput::print_json(&app.scene(args.name, canonical_species(&args.species))?)?
        }
        Commands::Cache(_) => {}
    }
    Ok(())
}

fn resolve_config(args: &ConfigArgs) -> Result<ResolvedConfig, SckanError> {
    let mut config = ConfigLoader::load(args.config.as_deref())?;
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = Some(endpoint.clone());
    }
    if let Some(cache_dir) = &args.cache_dir {
        config.cache_dir = Some(cache_dir.clone());
    }
    if let Some(days) = args.max_cache_days {
        config.max_cache_days = Some(days);
    }
    if let Some(asset_dir) = &args.asset_dir {
        config.asset_dir = Some(asset_dir.clone());
    }
    ConfigLoader::resolve_config(config)
}
