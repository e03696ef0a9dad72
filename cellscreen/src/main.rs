use std::path::PathBuf;

use anyhow::Context;
use cellscreen::{
    annotate_results, rank_plates, Conversion, PlateAnalysis, PlateShape, ScreenConfig,
    StrainSheet,
};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "cellscreen", version, about = "Membrane/interior intensity screen")]
struct Cli {
    /// TOML screen configuration; defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter directive, overrides the configured level.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Segment and measure every configured plate, writing per-plate tables.
    Analyze {
        /// Analyze only these plates.
        #[arg(short, long, value_delimiter = ',')]
        plates: Vec<u32>,
    },
    /// Merge strain metadata into every result table.
    Annotate {
        /// Strain sheet export; overrides `strains.path`.
        #[arg(short, long)]
        strains: Option<PathBuf>,
    },
    /// Rank wells of all plates by intensity ratio.
    Rank,
    /// Convert well IDs and numbers.
    Well {
        /// One of ID2num_row_stack, ID2num_column_stack, num2ID_row_stack,
        /// num2ID_column_stack.
        method: String,
        values: Vec<String>,
        #[arg(long, default_value_t = 16)]
        rows: u32,
        #[arg(long, default_value_t = 24)]
        columns: u32,
    },
}

fn main() {
    if let Err(error) = run() {
        eprintln!("cellscreen error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let command = match cli.command {
        Command::Well {
            method,
            values,
            rows,
            columns,
        } => return convert_wells(&method, &values, rows, columns),
        command => command,
    };

    let mut config = match &cli.config {
        Some(path) => ScreenConfig::load(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => ScreenConfig::default(),
    };

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    common::log_setup::setup_logging(level, config.log_dir.as_deref(), "cellscreen")?;

    match command {
        Command::Analyze { plates } => {
            if !plates.is_empty() {
                config.plates = plates;
            }
            let analysis = PlateAnalysis::new(config)?;
            let summary = analysis.run()?;
            println!(
                "Analyzed {} plates: {} positions measured, {} skipped",
                summary.plates,
                summary.records,
                summary.skipped_total()
            );
        }
        Command::Annotate { strains } => {
            let sheet_path = strains
                .or_else(|| config.strain_sheet_path())
                .context("no strain sheet given (set strains.path or pass --strains)")?;
            let sheet = StrainSheet::load(&sheet_path, &config.strains)?;
            let written = annotate_results(&sheet, &config.results_path())?;
            println!("Annotated {} result tables", written.len());
        }
        Command::Rank => {
            let ranking = rank_plates(&config)?;
            println!(
                "Ranked {} wells into '{}'",
                ranking.len(),
                config.ranking_file().display()
            );
        }
        Command::Well { .. } => {}
    }

    Ok(())
}

fn convert_wells(method: &str, values: &[String], rows: u32, columns: u32) -> anyhow::Result<()> {
    let conversion: Conversion = method.parse()?;
    let shape = PlateShape::new(rows, columns)?;
    for value in values {
        println!("{value}\t{}", shape.convert(value, conversion)?);
    }
    Ok(())
}
