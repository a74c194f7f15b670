//! Runner that allocates zone populations onto features and samples points.
use std::collections::BTreeMap;
use std::path::Path;

use geo::Coord;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, info, warn};

use crate::allocation::{
    allocate_by_category, allocate_within_category, reconcile_categories, reconcile_zones,
    FeatureCounts, Orphan, PopulationTable, ZoneId,
};
use crate::distribute::plan::{DistributeConfig, Grouping};
use crate::distribute::FeatureCollection;
use crate::error::Result;
use crate::events::{DistributionEvent, EventKind, EventSink, Warning};
use crate::sampling::{GeometrySampler, Shape};

/// Counters describing one run.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Features in the input collection.
    pub features_total: usize,
    /// Features dropped before allocation (geometry, category or filter).
    pub features_excluded: usize,
    /// Features that received at least one point.
    pub features_sampled: usize,
    /// Sum of the population table.
    pub population_requested: u64,
    /// Points produced.
    pub population_placed: u64,
    /// People that had no feature to land on and were not placed.
    pub population_dropped: u64,
    /// Reference system of the input, echoed on the output.
    pub crs: String,
}

impl RunSummary {
    /// Whether every requested person was either placed or reported as dropped.
    pub fn is_conserved(&self) -> bool {
        self.population_placed + self.population_dropped == self.population_requested
    }
}

/// Result of a distribution run.
#[non_exhaustive]
#[derive(Debug, Clone, Default)]
pub struct DistributionResult {
    /// Sampled household locations, grouped by (zone, category) then feature.
    pub points: Vec<Coord<f64>>,
    /// Non-fatal problems collected during the run.
    pub warnings: Vec<Warning>,
    pub summary: RunSummary,
}

impl DistributionResult {
    /// Writes the points as an `x,y` CSV file.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        crate::io::write_points_csv(path, &self.points)
    }
}

pub struct Distributor {
    config: DistributeConfig,
    sampler: GeometrySampler,
}

impl Distributor {
    pub fn try_new(config: DistributeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn new(config: DistributeConfig) -> Self {
        debug_assert!(config.limits.max_batches > 0, "max_batches must be > 0");

        let sampler = GeometrySampler::new(config.method, config.limits);
        Self { config, sampler }
    }

    /// Run configuration applied to this distributor.
    pub fn config(&self) -> &DistributeConfig {
        &self.config
    }

    /// Replaces the configuration and rebuilds the sampler from it.
    pub fn set_config(&mut self, config: DistributeConfig) -> Result<()> {
        config.validate()?;
        *self = Self::new(config);
        Ok(())
    }

    pub fn run(
        &self,
        features: &FeatureCollection,
        populations: &PopulationTable,
        rng: &mut impl RngCore,
    ) -> Result<DistributionResult> {
        run_internal(self, features, populations, rng, &mut ())
    }

    pub fn run_with_events(
        &self,
        features: &FeatureCollection,
        populations: &PopulationTable,
        rng: &mut impl RngCore,
        sink: &mut dyn EventSink,
    ) -> Result<DistributionResult> {
        run_internal(self, features, populations, rng, sink)
    }

    /// Runs with a fresh [`StdRng`] seeded from `seed`.
    pub fn run_seeded(
        &self,
        features: &FeatureCollection,
        populations: &PopulationTable,
        seed: u64,
    ) -> Result<DistributionResult> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.run(features, populations, &mut rng)
    }
}

/// Validates `config` and runs a single distribution.
pub fn distribute(
    features: &FeatureCollection,
    populations: &PopulationTable,
    config: &DistributeConfig,
    rng: &mut dyn RngCore,
) -> Result<DistributionResult> {
    distribute_with_events(features, populations, config, rng, &mut ())
}

pub fn distribute_with_events(
    features: &FeatureCollection,
    populations: &PopulationTable,
    config: &DistributeConfig,
    rng: &mut dyn RngCore,
    sink: &mut dyn EventSink,
) -> Result<DistributionResult> {
    let distributor = Distributor::try_new(config.clone())?;
    run_internal(&distributor, features, populations, rng, sink)
}

/// A feature that survived cleaning.
struct Candidate {
    index: usize,
    shape: Shape,
}

/// (zone, category index); the index is `None` under zone grouping.
type GroupKey = (ZoneId, Option<usize>);

struct Warnings<'s> {
    collected: Vec<Warning>,
    sink: &'s mut dyn EventSink,
}

impl Warnings<'_> {
    fn report(&mut self, warning: Warning) {
        warn!("{warning}");
        if self.sink.wants(EventKind::Warning) {
            self.sink.send(DistributionEvent::Warning(warning.clone()));
        }
        self.collected.push(warning);
    }
}

fn run_internal(
    distributor: &Distributor,
    features: &FeatureCollection,
    populations: &PopulationTable,
    rng: &mut dyn RngCore,
    sink: &mut dyn EventSink,
) -> Result<DistributionResult> {
    let config = &distributor.config;

    info!(
        "Distributing {} people over {} features ({} zones, method {}).",
        populations.total(),
        features.len(),
        populations.len(),
        config.method,
    );
    if sink.wants(EventKind::RunStarted) {
        sink.send(DistributionEvent::RunStarted {
            features: features.len(),
            zones: populations.len(),
            population: populations.total(),
            method: config.method,
        });
    }

    let mut warnings = Warnings {
        collected: Vec::new(),
        sink,
    };

    let mut groups: BTreeMap<GroupKey, Vec<Candidate>> = BTreeMap::new();
    let mut excluded = 0;
    for (index, feature) in features.iter().enumerate() {
        let shape = Shape::classify(feature.geometry.as_ref());
        match &shape {
            Shape::Empty => {
                debug!(index, "feature without geometry excluded");
                excluded += 1;
                continue;
            }
            Shape::Unsupported(kind) => {
                warnings.report(Warning::UnsupportedGeometry {
                    feature: Some(index),
                    geometry_type: *kind,
                });
                excluded += 1;
                continue;
            }
            Shape::Degenerate(kind) => {
                warnings.report(Warning::DegenerateGeometry {
                    feature: Some(index),
                    geometry_type: *kind,
                });
                excluded += 1;
                continue;
            }
            Shape::Area(_) | Shape::Line(_) => {}
        }
        if !config.shape_filter.accepts(&shape) {
            warnings.report(Warning::UnsupportedGeometry {
                feature: Some(index),
                geometry_type: shape.kind_name(),
            });
            excluded += 1;
            continue;
        }

        let category = match &config.grouping {
            Grouping::Zone => None,
            Grouping::Weighted(weights) => {
                let resolved = feature
                    .category
                    .as_deref()
                    .and_then(|raw| weights.canonical_index(raw));
                match resolved {
                    Some(ci) => Some(ci),
                    None => {
                        debug!(index, category = ?feature.category, "unrecognised category excluded");
                        excluded += 1;
                        continue;
                    }
                }
            }
        };

        groups
            .entry((feature.zone_id.clone(), category))
            .or_default()
            .push(Candidate { index, shape });
    }

    let (group_population, orphans) = allocate_groups(config, populations, &groups, rng)?;
    let population_dropped = orphans
        .iter()
        .filter(|o| !o.redistributed)
        .map(|o| o.population)
        .sum();
    for orphan in orphans {
        warnings.report(Warning::AllocationInconsistency(orphan));
    }

    let mut points = Vec::new();
    let mut features_sampled = 0;
    for ((zone, category), members) in &groups {
        let population = group_population
            .get(&(zone.clone(), *category))
            .copied()
            .unwrap_or(0);
        let category_name = match (&config.grouping, category) {
            (Grouping::Weighted(w), Some(ci)) => w.category(*ci).map(str::to_owned),
            _ => None,
        };
        if warnings.sink.wants(EventKind::ZoneAllocated) {
            warnings.sink.send(DistributionEvent::ZoneAllocated {
                zone: zone.clone(),
                category: category_name.clone(),
                population,
                features: members.len(),
            });
        }
        if population == 0 {
            continue;
        }
        debug!(zone = %zone, category = ?category_name, population, features = members.len(), "group allocated");

        let counts = allocate_within_category(population, members.len(), rng)?;
        for (candidate, count) in members.iter().zip(counts) {
            if count == 0 {
                continue;
            }
            let sampled = distributor
                .sampler
                .sample_shape(&candidate.shape, count as usize, rng)
                .map_err(|e| e.for_feature(candidate.index, zone.clone()))?;
            if warnings.sink.wants(EventKind::FeatureSampled) {
                warnings.sink.send(DistributionEvent::FeatureSampled {
                    feature: candidate.index,
                    zone: zone.clone(),
                    count: sampled.len(),
                });
            }
            features_sampled += 1;
            points.extend(sampled);
        }
    }

    let summary = RunSummary {
        features_total: features.len(),
        features_excluded: excluded,
        features_sampled,
        population_requested: populations.total(),
        population_placed: points.len() as u64,
        population_dropped,
        crs: features.crs.clone(),
    };
    info!(
        "Placed {} of {} people on {} features ({} excluded, {} dropped).",
        summary.population_placed,
        summary.population_requested,
        summary.features_sampled,
        summary.features_excluded,
        summary.population_dropped,
    );

    let Warnings {
        collected: warnings,
        sink,
    } = warnings;
    if sink.wants(EventKind::RunFinished) {
        sink.send(DistributionEvent::RunFinished {
            summary: summary.clone(),
        });
    }

    Ok(DistributionResult {
        points,
        warnings,
        summary,
    })
}

/// Population per group, plus the shares that had no features.
fn allocate_groups(
    config: &DistributeConfig,
    populations: &PopulationTable,
    groups: &BTreeMap<GroupKey, Vec<Candidate>>,
    rng: &mut dyn RngCore,
) -> Result<(BTreeMap<GroupKey, u64>, Vec<Orphan>)> {
    let mut group_population = BTreeMap::new();
    match &config.grouping {
        Grouping::Weighted(weights) => {
            let mut feature_counts = FeatureCounts::new();
            for ((zone, category), members) in groups {
                if let Some(name) = category.and_then(|ci| weights.category(ci)) {
                    feature_counts.insert((zone.clone(), name.to_owned()), members.len());
                }
            }
            let mut split = allocate_by_category(populations, &feature_counts, weights, rng)?;
            let orphans = reconcile_categories(
                &mut split,
                &feature_counts,
                weights,
                config.orphan_policy,
                rng,
            )?;
            for (zone, counts) in split {
                for (ci, count) in counts.into_iter().enumerate() {
                    if count > 0 {
                        group_population.insert((zone.clone(), Some(ci)), count);
                    }
                }
            }
            Ok((group_population, orphans))
        }
        Grouping::Zone => {
            let mut features_per_zone: BTreeMap<ZoneId, usize> = BTreeMap::new();
            for ((zone, _), members) in groups {
                *features_per_zone.entry(zone.clone()).or_default() += members.len();
            }
            let orphans = reconcile_zones(populations, &features_per_zone, config.orphan_policy)?;
            for zone in features_per_zone.keys() {
                group_population.insert((zone.clone(), None), populations.get(zone));
            }
            Ok((group_population, orphans))
        }
    }
}

#[cfg(test)]
mod tests {
    use geo::{line_string, point, polygon, Geometry, Intersects, LineString, Point, Polygon};

    use super::*;
    use crate::allocation::OrphanPolicy;
    use crate::distribute::{Feature, Support};
    use crate::error::Error;
    use crate::events::VecSink;
    use crate::sampling::SamplingMethod;

    fn square(x0: f64, y0: f64, size: f64) -> Polygon<f64> {
        polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
        ]
    }

    fn street(x: f64, tag: &str, zone: &str) -> Feature {
        Feature::new(line_string![(x: x, y: 0.0), (x: x, y: 10.0)], zone).with_category(tag)
    }

    fn blocks() -> FeatureCollection {
        FeatureCollection::new()
            .with_feature(Feature::new(square(0.0, 0.0, 1.0), "a"))
            .with_feature(Feature::new(square(2.0, 0.0, 1.0), "a"))
            .with_feature(Feature::new(square(10.0, 0.0, 2.0), "b"))
            .with_feature(Feature::new(square(20.0, 0.0, 2.0), "c"))
    }

    fn populations() -> PopulationTable {
        [("a", 40u64), ("b", 25), ("c", 0)].into_iter().collect()
    }

    #[test]
    fn zone_grouping_conserves_population() {
        let distributor = Distributor::try_new(Support::Areas.config(SamplingMethod::Uniform)).unwrap();
        let result = distributor.run_seeded(&blocks(), &populations(), 1).unwrap();

        assert_eq!(result.points.len(), 65);
        let in_a = result.points.iter().filter(|p| p.x < 5.0).count();
        let in_b = result.points.iter().filter(|p| (10.0..=12.0).contains(&p.x)).count();
        let in_c = result.points.iter().filter(|p| p.x >= 20.0).count();
        assert_eq!((in_a, in_b, in_c), (40, 25, 0));
        assert!(result.warnings.is_empty());
        assert!(result.summary.is_conserved());
        assert_eq!(result.summary.crs, "EPSG:4326");
    }

    #[test]
    fn points_stay_inside_their_features_under_normal() {
        let features = blocks();
        let distributor = Distributor::try_new(Support::Areas.config(SamplingMethod::Normal)).unwrap();
        let result = distributor.run_seeded(&features, &populations(), 5).unwrap();
        assert_eq!(result.points.len(), 65);
        for p in &result.points {
            let inside = features
                .iter()
                .filter_map(|f| f.geometry.as_ref())
                .any(|g| g.intersects(&Point::from(*p)));
            assert!(inside, "{p:?} outside every feature");
        }
    }

    #[test]
    fn same_seed_same_output() {
        let distributor = Distributor::new(Support::Areas.config(SamplingMethod::Normal));
        let a = distributor.run_seeded(&blocks(), &populations(), 99).unwrap();
        let b = distributor.run_seeded(&blocks(), &populations(), 99).unwrap();
        assert_eq!(a.points, b.points);
    }

    #[test]
    fn zero_population_zone_contributes_nothing() {
        let features = FeatureCollection::new().with_feature(Feature::new(square(0.0, 0.0, 1.0), "z"));
        let pops: PopulationTable = [("z", 0u64)].into_iter().collect();
        let result = Distributor::new(DistributeConfig::default())
            .run_seeded(&features, &pops, 3)
            .unwrap();
        assert!(result.points.is_empty());
        assert!(result.warnings.is_empty());
        assert_eq!(result.summary.features_sampled, 0);
    }

    #[test]
    fn streets_split_by_category_and_drop_unknown_tags() {
        let features = FeatureCollection::new()
            .with_feature(street(0.0, "residential", "z"))
            .with_feature(street(1.0, "['tertiary', 'residential']", "z"))
            .with_feature(street(2.0, "pedestrian", "z"))
            .with_feature(street(3.0, "living_street", "z"))
            .with_feature(street(4.0, "tertiary", "z"))
            .with_feature(street(5.0, "secondary", "z"))
            .with_feature(street(6.0, "primary", "z"))
            .with_feature(street(7.0, "unclassified", "z"))
            .with_feature(street(8.0, "service", "z"));
        let pops: PopulationTable = [("z", 500u64)].into_iter().collect();
        let distributor = Distributor::try_new(Support::Streets.config(SamplingMethod::Uniform)).unwrap();
        let mut sink = VecSink::new();
        let result = distributor
            .run_with_events(&features, &pops, &mut StdRng::seed_from_u64(4), &mut sink)
            .unwrap();

        assert_eq!(result.points.len(), 500);
        assert_eq!(result.summary.features_excluded, 1);
        assert!(result.points.iter().all(|p| p.x != 8.0));
        assert!(result.points.iter().all(|p| (0.0..=10.0).contains(&p.y)));

        let residential: u64 = sink
            .as_slice()
            .iter()
            .filter_map(|e| match e {
                DistributionEvent::ZoneAllocated {
                    category: Some(c),
                    population,
                    features,
                    ..
                } if c == "residential" => {
                    assert_eq!(*features, 2);
                    Some(*population)
                }
                _ => None,
            })
            .sum();
        assert!(residential > 200, "residential got {residential}");
        assert!(matches!(
            sink.as_slice().last(),
            Some(DistributionEvent::RunFinished { .. })
        ));
    }

    #[test]
    fn missing_categories_warn_and_drop_by_default() {
        let features = FeatureCollection::new().with_feature(street(0.0, "primary", "z"));
        let pops: PopulationTable = [("z", 1000u64)].into_iter().collect();
        let result = Distributor::new(Support::Streets.config(SamplingMethod::Uniform))
            .run_seeded(&features, &pops, 8)
            .unwrap();

        assert!(result.points.len() < 200);
        assert!(!result.warnings.is_empty());
        assert!(result
            .warnings
            .iter()
            .all(|w| matches!(w, Warning::AllocationInconsistency(o) if !o.redistributed)));
        assert!(result.summary.is_conserved());
        assert!(result.summary.population_dropped > 800);
    }

    #[test]
    fn redistribute_moves_orphans_to_present_categories() {
        let features = FeatureCollection::new().with_feature(street(0.0, "primary", "z"));
        let pops: PopulationTable = [("z", 1000u64)].into_iter().collect();
        let config = Support::Streets
            .config(SamplingMethod::Uniform)
            .with_orphan_policy(OrphanPolicy::Redistribute);
        let result = Distributor::new(config).run_seeded(&features, &pops, 8).unwrap();

        assert_eq!(result.points.len(), 1000);
        assert_eq!(result.summary.population_dropped, 0);
        assert!(result
            .warnings
            .iter()
            .all(|w| matches!(w, Warning::AllocationInconsistency(o) if o.redistributed)));
    }

    #[test]
    fn fail_policy_aborts() {
        let features = FeatureCollection::new().with_feature(Feature::new(square(0.0, 0.0, 1.0), "a"));
        let pops: PopulationTable = [("a", 5u64), ("ghost", 3)].into_iter().collect();
        let config = DistributeConfig::default().with_orphan_policy(OrphanPolicy::Fail);
        let err = Distributor::new(config).run_seeded(&features, &pops, 1).unwrap_err();
        assert!(matches!(err, Error::AllocationInconsistency { ref zone, .. } if zone == "ghost"));
    }

    #[test]
    fn unsupported_and_filtered_geometry_warns_per_feature() {
        let features = FeatureCollection::new()
            .with_feature(Feature::new(square(0.0, 0.0, 1.0), "a"))
            .with_feature(Feature::new(point!(x: 0.5, y: 0.5), "a"))
            .with_feature(Feature::new(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)], "a"))
            .with_feature(Feature::empty("a"));
        let pops: PopulationTable = [("a", 10u64)].into_iter().collect();
        let result = Distributor::new(Support::Buildings.config(SamplingMethod::Uniform))
            .run_seeded(&features, &pops, 2)
            .unwrap();

        assert_eq!(result.points.len(), 10);
        assert_eq!(result.summary.features_excluded, 3);
        assert_eq!(
            result.warnings,
            vec![
                Warning::UnsupportedGeometry {
                    feature: Some(1),
                    geometry_type: "Point"
                },
                Warning::UnsupportedGeometry {
                    feature: Some(2),
                    geometry_type: "LineString"
                },
            ]
        );
    }

    #[test]
    fn non_terminating_feature_aborts_with_context() {
        let sliver = Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 1000.0, y: 1000.0),
            (x: 1000.0, y: 1000.001),
        ]);
        let features = FeatureCollection::new().with_feature(Feature {
            geometry: Some(sliver),
            zone_id: "s".into(),
            category: None,
        });
        let pops: PopulationTable = [("s", 50u64)].into_iter().collect();
        let config = DistributeConfig::new(SamplingMethod::Normal).with_max_batches(2);
        let err = distribute(&features, &pops, &config, &mut StdRng::seed_from_u64(6)).unwrap_err();
        match err {
            Error::Feature { index, zone, source } => {
                assert_eq!(index, 0);
                assert_eq!(zone, "s");
                assert!(matches!(*source, Error::SamplingNonTermination { .. }));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn replaced_config_drives_sampling() {
        let sliver = Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 1000.0, y: 1000.0),
            (x: 1000.0, y: 1000.001),
        ]);
        let features = FeatureCollection::new().with_feature(Feature::new(sliver, "s"));
        let pops: PopulationTable = [("s", 50u64)].into_iter().collect();

        let mut distributor = Distributor::new(DistributeConfig::new(SamplingMethod::Uniform));
        assert_eq!(distributor.run_seeded(&features, &pops, 6).unwrap().points.len(), 50);

        distributor
            .set_config(DistributeConfig::new(SamplingMethod::Normal).with_max_batches(2))
            .unwrap();
        assert_eq!(distributor.config().method, SamplingMethod::Normal);
        let err = distributor.run_seeded(&features, &pops, 6).unwrap_err();
        assert!(
            matches!(err, Error::Feature { ref source, .. } if matches!(**source, Error::SamplingNonTermination { .. })),
            "{err:?}"
        );

        assert!(distributor
            .set_config(DistributeConfig::default().with_max_batches(0))
            .is_err());
        assert_eq!(distributor.config().limits.max_batches, 2);
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = DistributeConfig::default().with_max_batches(0);
        assert!(Distributor::try_new(config.clone()).is_err());
        let empty = FeatureCollection::new();
        let pops = PopulationTable::new();
        assert!(distribute(&empty, &pops, &config, &mut StdRng::seed_from_u64(0)).is_err());
    }

    #[test]
    fn input_tables_are_left_untouched() {
        let features = blocks();
        let pops = populations();
        let before = (features.clone(), pops.clone());
        let _ = Distributor::new(DistributeConfig::default()).run_seeded(&features, &pops, 0);
        assert_eq!((features, pops), before);
    }

    #[test]
    fn zero_length_street_repeats_its_start() {
        let features = FeatureCollection::new().with_feature(
            Feature::new(LineString::from(vec![(3.0, 4.0), (3.0, 4.0)]), "z").with_category("residential"),
        );
        let weights = crate::allocation::CategoryWeights::new([("residential", 1.0)]).unwrap();
        let config = DistributeConfig::default()
            .with_grouping(Grouping::Weighted(weights))
            .with_shape_filter(crate::distribute::ShapeFilter::LinesOnly);
        let pops: PopulationTable = [("z", 3u64)].into_iter().collect();
        let result = Distributor::new(config).run_seeded(&features, &pops, 0).unwrap();
        assert_eq!(result.points, vec![Coord { x: 3.0, y: 4.0 }; 3]);
    }
}
