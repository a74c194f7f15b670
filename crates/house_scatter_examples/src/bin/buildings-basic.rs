use geo::point;
use house_scatter::prelude::*;
use house_scatter_examples::{init_tracing, log_summary, toy_buildings, toy_population};

fn main() -> anyhow::Result<()> {
    init_tracing();

    // Building points are not footprints; they are reported and skipped.
    let mut buildings = toy_buildings();
    buildings.push(Feature::new(point!(x: 150.0, y: 95.0), "centre").with_category("shed"));

    let support = Support::Buildings;
    let method = SamplingMethod::Uniform;
    let distributor = Distributor::try_new(support.config(method))?;
    let result = distributor.run_seeded(&buildings, &toy_population(), 7)?;

    for warning in &result.warnings {
        tracing::warn!("{warning}");
    }
    log_summary("buildings", &result);

    result.write_csv(support.output_file_name(method))?;
    Ok(())
}
