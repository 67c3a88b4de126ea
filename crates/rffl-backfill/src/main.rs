// League database backfill entry point.
//
// Every subcommand follows the same sequence:
// 1. Initialize tracing (stderr; stdout carries the report)
// 2. Load config, copying defaults/ into config/ on first run
// 3. Read the whole input table
// 4. Transform or analyze it in memory
// 5. Write the whole output table, or nothing on failure

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use rffl_backfill::analysis;
use rffl_backfill::config;
use rffl_backfill::metadata;
use rffl_backfill::record;
use rffl_backfill::scoring::fill;
use rffl_backfill::table;

#[derive(Parser)]
#[command(name = "rffl-backfill")]
#[command(about = "Fill missing scores and season metadata in the league history CSV")]
struct Cli {
    /// Directory holding config/ (and defaults/ to copy from)
    #[arg(long, global = true, default_value = ".")]
    base_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate missing regular-season PF/PA values
    FillScores {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,

        /// Override the configured random seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Fill owner/draft locations, season defaults and placeholder tokens
    FillMetadata {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Report PF/PA coverage and historical averages
    Analyze {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let config = config::load_config(&cli.base_dir).context("failed to load configuration")?;

    match cli.command {
        Commands::FillScores { input, output, seed } => {
            fill_scores(&config, &input, &output, seed.unwrap_or(config.run.seed))
        }
        Commands::FillMetadata { input, output } => fill_metadata(&config, &input, &output),
        Commands::Analyze { input, json } => analyze(&input, json),
    }
}

fn fill_scores(config: &config::Config, input: &Path, output: &Path, seed: u64) -> anyhow::Result<()> {
    println!("Loading and analyzing all available data...");
    let mut table = table::load_table(input).context("failed to load input table")?;

    info!("seeding estimator with {}", seed);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let report = fill::fill_scores(&mut table, &config.estimator, &mut rng)
        .context("failed to fill scores")?;

    println!(
        "Loaded data for {} teams across {} seasons",
        report.indexed_teams, report.indexed_seasons
    );
    println!();
    println!("Filling missing PF/PA data...");
    for row in &report.filled {
        println!("  {}", row.log_line());
    }

    table::write_table(output, &table).context("failed to write output table")?;

    println!();
    println!("Completed! {}.", report.summary_line());
    println!("Updated file saved as: {}", output.display());
    Ok(())
}

fn fill_metadata(config: &config::Config, input: &Path, output: &Path) -> anyhow::Result<()> {
    println!("Loading CSV data...");
    let mut table = table::load_table(input).context("failed to load input table")?;
    println!("Loaded {} rows", table.len());

    let report = metadata::fill_metadata(&mut table, &config.lookups)
        .context("failed to fill metadata")?;

    table::write_table(output, &table).context("failed to write output table")?;

    println!("Owner locations filled: {}", report.owner_locations);
    println!("Draft locations filled: {}", report.draft_locations);
    println!("Season defaults filled: {}", report.season_defaults);
    println!("Placeholders replaced: {}", report.placeholders);
    println!("Data filling complete! Output saved to: {}", output.display());
    println!(
        "Remaining {} entries: {}",
        metadata::MISSING_OWNER_TOKEN,
        report.remaining_owner_placeholders
    );
    Ok(())
}

fn analyze(input: &Path, json: bool) -> anyhow::Result<()> {
    let table = table::load_table(input).context("failed to load input table")?;
    let records = record::parse_records(&table).context("failed to parse input table")?;
    let report = analysis::analyze(&records);

    if json {
        let text = serde_json::to_string_pretty(&report).context("failed to encode report")?;
        println!("{text}");
    } else {
        println!("{report}");
    }
    Ok(())
}

/// Initialize tracing to stderr so it never mixes with the stdout report.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rffl_backfill=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
