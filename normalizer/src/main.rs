//! Diagnorm CLI - Normalize diagnostic datasets
//!
//! # Main Commands
//!
//! ```bash
//! diagnorm run amb raw.json              # Normalize a raw collection (JSON) for a source
//! diagnorm sources                       # List registered sources
//! diagnorm describe xdc                  # Show the pipeline of a source
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! diagnorm check pipelines/amb.json      # Validate a pipeline definition
//! diagnorm operations                    # Show available steps and transforms
//! ```

use clap::{Parser, Subcommand};
use diagnorm::{
    load_definition, logs::LOG_BROADCASTER, operations_description, Config, LabeledCollection, Pipeline,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "diagnorm")]
#[command(about = "Normalize instrument diagnostic datasets into canonical form", long_about = None)]
struct Cli {
    /// Dimension rename table (default: $DIAGNORM_DIM_MAPPINGS or mappings/dim_names.json)
    #[arg(long, global = true)]
    mappings: Option<PathBuf>,

    /// Directory of pipeline definitions (default: $DIAGNORM_PIPELINES_DIR or pipelines)
    #[arg(long, global = true)]
    pipelines: Option<PathBuf>,

    /// Run per-signal steps in parallel
    #[arg(long, global = true)]
    parallel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a raw collection for a source
    Run {
        /// Source name (e.g. amb, efm, xdc)
        source: String,

        /// Input JSON file: {"<key>": <dataset>, ...}
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only print errors
        #[arg(short, long)]
        quiet: bool,
    },

    /// List registered sources
    Sources,

    /// Show the pipeline of a source
    Describe {
        /// Source name
        source: String,

        /// Print the JSON definition instead of step labels
        #[arg(long)]
        json: bool,
    },

    /// Parse and build a pipeline definition file
    Check {
        /// Definition JSON file
        definition: PathBuf,
    },

    /// Show available pipeline steps and transforms
    Operations,
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = configure(&cli);

    let result = match cli.command {
        Commands::Run {
            source,
            input,
            output,
            quiet,
        } => cmd_run(&config, &source, &input, output.as_deref(), quiet).await,

        Commands::Sources => cmd_sources(&config),

        Commands::Describe { source, json } => cmd_describe(&config, &source, json),

        Commands::Check { definition } => cmd_check(&config, &definition),

        Commands::Operations => cmd_operations(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

/// Environment first, then CLI flags
fn configure(cli: &Cli) -> Config {
    let mut config = Config::from_env();
    if let Some(ref path) = cli.mappings {
        config = config.with_dim_mappings(path);
    }
    if let Some(ref path) = cli.pipelines {
        config = config.with_pipelines_dir(path);
    }
    if cli.parallel {
        config = config.with_parallel(true);
    }
    config
}

async fn cmd_run(
    config: &Config,
    source: &str,
    input: &Path,
    output: Option<&Path>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if quiet {
        LOG_BROADCASTER.set_echo(false);
    }
    eprintln!("📄 Reading: {}", input.display());

    let content = tokio::fs::read_to_string(input).await?;
    let collection: LabeledCollection = serde_json::from_str(&content)?;
    eprintln!("   Signals: {}", collection.len());

    let registry = config.registry()?;
    let dataset = registry.run(source, collection)?;

    eprintln!("\n⚙️  Normalized: {} variables", dataset.len());
    for (axis, size) in dataset.sizes() {
        eprintln!("   {} = {}", axis, size);
    }

    let json = serde_json::to_string_pretty(&dataset)?;
    write_output(&json, output).await?;

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_sources(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    LOG_BROADCASTER.set_echo(false);
    let registry = config.registry()?;
    for source in registry.sources() {
        println!("{}", source);
    }
    eprintln!("📋 {} sources registered", registry.len());
    Ok(())
}

fn cmd_describe(config: &Config, source: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    LOG_BROADCASTER.set_echo(false);
    let registry = config.registry()?;
    let pipeline = registry.get(source)?;

    if json {
        match registry.definition(source) {
            Some(definition) => println!("{}", definition.to_json()?),
            None => eprintln!("⚠️  {} was registered in code and has no definition", source),
        }
        return Ok(());
    }

    println!("{} ({} steps)", source, pipeline.len());
    print_steps(pipeline);
    Ok(())
}

fn cmd_check(config: &Config, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Checking: {}", path.display());

    let definition = load_definition(path)?;
    let ctx = config.build_context()?;
    let pipeline = definition.build(&ctx)?;

    println!("{} ({} steps)", definition.source, pipeline.len());
    print_steps(&pipeline);

    eprintln!(
        "\n✅ Valid pipeline: {} -> {}",
        pipeline.input_kind().map(|k| k.to_string()).unwrap_or_else(|| "any".to_string()),
        pipeline.output_kind().map(|k| k.to_string()).unwrap_or_else(|| "any".to_string()),
    );
    Ok(())
}

fn cmd_operations() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", operations_description());
    Ok(())
}

fn print_steps(pipeline: &Pipeline) {
    for (i, step) in pipeline.steps().iter().enumerate() {
        println!("  [{:2}] {} ({} -> {})", i + 1, step.label(), step.input_kind(), step.output_kind());
    }
}

async fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            tokio::fs::write(p, content).await?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
