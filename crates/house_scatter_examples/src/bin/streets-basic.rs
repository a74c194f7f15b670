use house_scatter::prelude::*;
use house_scatter_examples::{init_tracing, log_summary, toy_population, toy_streets};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> anyhow::Result<()> {
    init_tracing();

    // Streets split each zone by street type first, then uniformly per segment.
    let support = Support::Streets;
    let method = SamplingMethod::Uniform;
    let config = support
        .config(method)
        .with_orphan_policy(OrphanPolicy::Redistribute);

    let distributor = Distributor::try_new(config)?;
    let mut rng = StdRng::seed_from_u64(2025);
    let mut events = VecSink::new();
    let result = distributor.run_with_events(
        &toy_streets(),
        &toy_population(),
        &mut rng,
        &mut events,
    )?;

    for event in events.as_slice() {
        if let DistributionEvent::ZoneAllocated {
            zone,
            category: Some(category),
            population,
            features,
        } = event
        {
            tracing::info!("{zone}/{category}: {population} households on {features} streets");
        }
    }
    log_summary("streets", &result);

    result.write_csv(support.output_file_name(method))?;
    Ok(())
}
