use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use house_scatter::io::read_points_csv;
use house_scatter::prelude::*;
use house_scatter_examples::{init_tracing, log_summary};

#[derive(Parser)]
#[command(name = "distribute-from-files")]
#[command(about = "Place households from a population CSV onto features read from disk")]
struct Args {
    /// Features as CSV with a WKT geometry column, or GeoJSON.
    features: PathBuf,
    /// Population CSV.
    population: PathBuf,
    /// streets, buildings or areas.
    #[arg(long, default_value = "areas")]
    support: String,
    /// uniform or normal.
    #[arg(long, default_value = "uniform")]
    method: String,
    /// Zone column in both files.
    #[arg(long, default_value = "zone")]
    zone_column: String,
    /// Population column.
    #[arg(long, default_value = "population")]
    population_column: String,
    /// Category column; defaults to `highway` for streets and `building` for buildings.
    #[arg(long)]
    category_column: Option<String>,
    #[arg(long, default_value_t = 2025)]
    seed: u64,
    /// Output directory.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let support: Support = args.support.parse()?;
    let method: SamplingMethod = args.method.parse()?;

    let mut columns = match support {
        Support::Streets => FeatureColumns::street(),
        Support::Buildings => FeatureColumns::building(),
        Support::Areas => FeatureColumns::default(),
    }
    .with_zone(&args.zone_column);
    if let Some(category) = &args.category_column {
        columns = columns.with_category(category);
    }

    let features = read_features(&args.features, &columns)?;
    let population = read_population_csv(
        &args.population,
        &PopulationColumns::new(&args.zone_column, &args.population_column),
    )?;

    let distributor = Distributor::try_new(support.config(method))?;
    let result = distributor
        .run_seeded(&features, &population, args.seed)
        .with_context(|| format!("distributing over {}", args.features.display()))?;
    log_summary(&args.support, &result);

    let out = args.out_dir.join(support.output_file_name(method));
    result.write_csv(&out)?;

    let written = read_points_csv(&out)?;
    anyhow::ensure!(
        written.len() == result.points.len(),
        "{} holds {} rows, expected {}",
        out.display(),
        written.len(),
        result.points.len()
    );
    Ok(())
}
