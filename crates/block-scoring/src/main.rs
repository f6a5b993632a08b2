//! Happy Block Ranking CLI
//!
//! Loads a Happy Block survey CSV, computes Potential Scores, and writes
//! the scored dataset (with its filter bounds) as JSON.
//!
//! Usage:
//!   rank-blocks --dataset data/happy_blocks.csv \
//!               --output out/scored_blocks.json --geojson

use anyhow::Result;
use block_scoring::{filter, BlockDataset};
use chrono::NaiveDate;
use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "rank-blocks",
    about = "Score and rank Happy Blocks by sales potential"
)]
struct Args {
    /// Path to the Happy Block survey CSV
    #[arg(short, long, default_value = "data/happy_blocks.csv")]
    dataset: PathBuf,

    /// Output JSON file
    #[arg(short, long, default_value = "out/scored_blocks.json")]
    output: PathBuf,

    /// Also write a GeoJSON FeatureCollection next to the output
    #[arg(long)]
    geojson: bool,

    /// Reference date for L2 aging (defaults to today)
    #[arg(long)]
    reference_date: Option<NaiveDate>,

    /// How many top blocks to list in the summary
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{}", "=".repeat(60));
    info!("Happy Block Ranking");
    info!("{}", "=".repeat(60));

    let dataset = match args.reference_date {
        Some(date) => BlockDataset::from_csv_at(&args.dataset, date)?,
        None => BlockDataset::from_csv(&args.dataset)?,
    };

    let bounds = dataset.bounds();
    info!(
        "Loaded {} blocks (aging reference {})",
        dataset.len(),
        dataset.reference_date()
    );
    info!(
        "Bounds: net add {:.0}..{:.0}, score {:.0}..{:.0}, utilization {:.0}%..{:.0}%",
        bounds.net_add.min,
        bounds.net_add.max,
        bounds.potential_score.min,
        bounds.potential_score.max,
        bounds.port_utilize_percent.min,
        bounds.port_utilize_percent.max,
    );

    let mut ranked = dataset.records().to_vec();
    filter::sort_by_score_desc(&mut ranked);
    info!("\nTop {} blocks by potential score:", args.top);
    for record in ranked.iter().take(args.top) {
        info!(
            "  {:>5.0} | {:20} | {} / {}",
            record.potential_score,
            record.block.happy_block,
            record.block.sub_district,
            record.block.province
        );
    }

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    info!("\nWriting output to {:?}", args.output);
    let file = File::create(&args.output)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(
        writer,
        &serde_json::json!({
            "blocks": dataset.records(),
            "bounds": bounds,
            "metadata": {
                "total_blocks": dataset.len(),
                "reference_date": dataset.reference_date(),
                "generated_at": chrono::Utc::now().to_rfc3339(),
            }
        }),
    )?;

    if args.geojson {
        let geojson_path = args.output.with_extension("geojson");
        info!("Writing GeoJSON to {:?}", geojson_path);
        let geojson = filter::to_geojson(&ranked);
        let file = File::create(&geojson_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &geojson)?;
    }

    Ok(())
}
