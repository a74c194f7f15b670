use house_scatter::prelude::*;
use house_scatter_examples::{init_tracing, log_summary, toy_areas, toy_population};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> anyhow::Result<()> {
    init_tracing();

    let areas = toy_areas();
    let population = toy_population();

    for method in [SamplingMethod::Uniform, SamplingMethod::Normal] {
        let support = Support::Areas;
        let distributor = Distributor::try_new(support.config(method).with_max_batches(200))?;
        let mut rng = StdRng::seed_from_u64(42);
        let result = distributor.run(&areas, &population, &mut rng)?;

        // Mean distance to the zone centre shows the clustering of the normal method.
        let spread = mean_offset_from_centre(&result);
        tracing::info!("{method}: mean distance to zone centre {spread:.1}");
        log_summary(method.as_str(), &result);

        result.write_csv(support.output_file_name(method))?;
    }
    Ok(())
}

fn mean_offset_from_centre(result: &DistributionResult) -> f64 {
    if result.points.is_empty() {
        return 0.0;
    }
    let total: f64 = result
        .points
        .iter()
        .map(|p| {
            let cx = (p.x / 100.0).floor() * 100.0 + 50.0;
            (p.x - cx).hypot(p.y - 50.0)
        })
        .sum();
    total / result.points.len() as f64
}
