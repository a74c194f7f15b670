//! Population allocation: turning per-zone household counts into per-feature counts.
//!
//! Allocation runs in two stages, both exact partitions of their input total:
//! - [`allocate_by_category`] splits each zone across fixed [`CategoryWeights`].
//! - [`allocate_within_category`] splits a `(zone, category)` share uniformly
//!   across the features of that group.
//!
//! Shares that land on a group with no features are resolved by an
//! [`OrphanPolicy`] in [`reconcile_categories`] / [`reconcile_zones`].
use std::collections::{BTreeMap, BTreeSet};

use rand::RngCore;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

pub mod multinomial;
pub mod weights;

pub use multinomial::{multinomial, uniform_multinomial};
pub use weights::{split_tags, CategoryWeights, STREET_TYPES, STREET_WEIGHTS};

pub type ZoneId = String;
pub type Category = String;

/// Number of features per `(zone, category)` group.
pub type FeatureCounts = BTreeMap<(ZoneId, Category), usize>;

/// Per-zone category counts, aligned with the order of the [`CategoryWeights`] used.
pub type CategorySplit = BTreeMap<ZoneId, Vec<u64>>;

/// Household count per zone.
///
/// Missing zones read as zero. The table is never modified by allocation or
/// distribution; callers keep ownership of their copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulationTable {
    counts: BTreeMap<ZoneId, u64>,
}

impl PopulationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from raw floating point counts.
    ///
    /// NaN reads as zero and fractional counts are truncated. Negative or
    /// infinite values are rejected.
    pub fn try_from_raw<I, Z>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Z, f64)>,
        Z: Into<ZoneId>,
    {
        let mut table = Self::new();
        for (zone, value) in rows {
            let zone = zone.into();
            let count = sanitize_count(&zone, value)?;
            table.insert(zone, count);
        }
        Ok(table)
    }

    /// Set the count of a zone, returning the previous one.
    pub fn insert(&mut self, zone: impl Into<ZoneId>, count: u64) -> Option<u64> {
        self.counts.insert(zone.into(), count)
    }

    /// Population of `zone`, zero when absent.
    pub fn get(&self, zone: &str) -> u64 {
        self.counts.get(zone).copied().unwrap_or(0)
    }

    pub fn contains(&self, zone: &str) -> bool {
        self.counts.contains_key(zone)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Zones in ascending id order with their counts.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.counts.iter().map(|(z, c)| (z.as_str(), *c))
    }
}

impl<Z: Into<ZoneId>> FromIterator<(Z, u64)> for PopulationTable {
    fn from_iter<T: IntoIterator<Item = (Z, u64)>>(iter: T) -> Self {
        let mut table = Self::new();
        for (zone, count) in iter {
            table.insert(zone, count);
        }
        table
    }
}

pub(crate) fn sanitize_count(zone: &str, value: f64) -> Result<u64> {
    if value.is_nan() {
        return Ok(0);
    }
    if !value.is_finite() || value < 0.0 {
        return Err(Error::InvalidPopulation {
            zone: zone.to_owned(),
            value,
        });
    }
    Ok(value.trunc() as u64)
}

/// What to do with population assigned to a group that has no features.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrphanPolicy {
    /// Report a warning and place nothing for that share.
    #[default]
    WarnAndDrop,
    /// Move the share onto the zone's categories that do have features,
    /// proportionally to their weights. Falls back to dropping (with a
    /// warning) when the zone has no features at all.
    Redistribute,
    /// Abort with [`Error::AllocationInconsistency`].
    Fail,
}

/// A population share that had no features to land on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Orphan {
    pub zone: ZoneId,
    /// `None` for zone-level grouping.
    pub category: Option<Category>,
    pub population: u64,
    /// True when the share was moved to sibling categories instead of dropped.
    pub redistributed: bool,
}

/// Split every zone's population across `weights` by a multinomial draw.
///
/// Zones are the union of zones in `populations` and zones appearing in
/// `feature_counts`, visited in ascending id order. Each entry of the result
/// has one count per category in `weights` order, summing to the zone's
/// population; categories without features keep their share here and are
/// dealt with by [`reconcile_categories`].
pub fn allocate_by_category(
    populations: &PopulationTable,
    feature_counts: &FeatureCounts,
    weights: &CategoryWeights,
    rng: &mut dyn RngCore,
) -> Result<CategorySplit> {
    weights.validate()?;
    let probabilities = weights.weights();

    let zones: BTreeSet<&str> = populations
        .iter()
        .map(|(z, _)| z)
        .chain(feature_counts.keys().map(|(z, _)| z.as_str()))
        .collect();

    let mut split = CategorySplit::new();
    for zone in zones {
        let population = populations.get(zone);
        let counts = multinomial(population, &probabilities, rng)?;
        debug!(zone, population, ?counts, "category split");
        split.insert(zone.to_owned(), counts);
    }
    Ok(split)
}

/// Split `population` uniformly across `num_features` features.
///
/// Fails with [`Error::EmptyGroup`] when people would have to be placed on
/// zero features.
pub fn allocate_within_category(
    population: u64,
    num_features: usize,
    rng: &mut dyn RngCore,
) -> Result<Vec<u64>> {
    uniform_multinomial(population, num_features, rng)
}

/// Resolve category shares without backing features according to `policy`.
///
/// `split` is updated in place so that afterwards every non-zero count has at
/// least one feature. Returns one [`Orphan`] per resolved share.
pub fn reconcile_categories(
    split: &mut CategorySplit,
    feature_counts: &FeatureCounts,
    weights: &CategoryWeights,
    policy: OrphanPolicy,
    rng: &mut dyn RngCore,
) -> Result<Vec<Orphan>> {
    let mut orphans = Vec::new();

    for (zone, counts) in split.iter_mut() {
        let has_features: Vec<bool> = weights
            .categories()
            .map(|c| {
                feature_counts
                    .get(&(zone.clone(), c.to_owned()))
                    .is_some_and(|n| *n > 0)
            })
            .collect();

        let mut orphaned = 0u64;
        let first_orphan = orphans.len();
        for (i, count) in counts.iter_mut().enumerate() {
            if *count == 0 || has_features[i] {
                continue;
            }
            if policy == OrphanPolicy::Fail {
                return Err(Error::AllocationInconsistency {
                    zone: zone.clone(),
                    category: weights.category(i).map(str::to_owned),
                    population: *count,
                });
            }
            orphans.push(Orphan {
                zone: zone.clone(),
                category: weights.category(i).map(str::to_owned),
                population: *count,
                redistributed: false,
            });
            orphaned += *count;
            *count = 0;
        }

        if orphaned == 0 || policy != OrphanPolicy::Redistribute {
            continue;
        }

        let sibling_weights: Vec<f64> = weights
            .weights()
            .into_iter()
            .zip(&has_features)
            .map(|(w, has)| if *has { w } else { 0.0 })
            .collect();
        if sibling_weights.iter().sum::<f64>() <= 0.0 {
            continue;
        }
        let extra = multinomial(orphaned, &sibling_weights, rng)?;
        for (count, e) in counts.iter_mut().zip(extra) {
            *count += e;
        }
        for orphan in &mut orphans[first_orphan..] {
            orphan.redistributed = true;
        }
    }

    Ok(orphans)
}

/// Report zones whose population has no features at all.
///
/// Zone-level grouping has no siblings to move people to, so
/// [`OrphanPolicy::Redistribute`] behaves like [`OrphanPolicy::WarnAndDrop`].
pub fn reconcile_zones(
    populations: &PopulationTable,
    features_per_zone: &BTreeMap<ZoneId, usize>,
    policy: OrphanPolicy,
) -> Result<Vec<Orphan>> {
    let mut orphans = Vec::new();
    for (zone, population) in populations.iter() {
        if population == 0 || features_per_zone.get(zone).is_some_and(|n| *n > 0) {
            continue;
        }
        if policy == OrphanPolicy::Fail {
            return Err(Error::AllocationInconsistency {
                zone: zone.to_owned(),
                category: None,
                population,
            });
        }
        orphans.push(Orphan {
            zone: zone.to_owned(),
            category: None,
            population,
            redistributed: false,
        });
    }
    Ok(orphans)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn counts(entries: &[(&str, &str, usize)]) -> FeatureCounts {
        entries
            .iter()
            .map(|(z, c, n)| (((*z).to_owned(), (*c).to_owned()), *n))
            .collect()
    }

    #[test]
    fn raw_population_cleans_nan_and_rejects_negatives() {
        let table = PopulationTable::try_from_raw([("a", f64::NAN), ("b", 12.9)]).unwrap();
        assert_eq!(table.get("a"), 0);
        assert_eq!(table.get("b"), 12);
        assert_eq!(table.get("missing"), 0);
        assert!(PopulationTable::try_from_raw([("c", -1.0)]).is_err());
        assert!(PopulationTable::try_from_raw([("c", f64::INFINITY)]).is_err());
    }

    #[test]
    fn category_split_conserves_each_zone() {
        let populations: PopulationTable = [("z1", 1000u64), ("z2", 0), ("z3", 37)]
            .into_iter()
            .collect();
        let fc = counts(&[("z1", "residential", 4), ("z4", "primary", 1)]);
        let mut rng = StdRng::seed_from_u64(5);
        let split = allocate_by_category(
            &populations,
            &fc,
            &CategoryWeights::street_network(),
            &mut rng,
        )
        .unwrap();

        assert_eq!(split.len(), 4);
        assert_eq!(split["z1"].iter().sum::<u64>(), 1000);
        assert!(split["z2"].iter().all(|c| *c == 0));
        assert_eq!(split["z3"].iter().sum::<u64>(), 37);
        assert!(split["z4"].iter().all(|c| *c == 0));
    }

    #[test]
    fn within_category_split_of_ten_over_three_streets() {
        let mut rng = StdRng::seed_from_u64(10);
        let parts = allocate_within_category(10, 3, &mut rng).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts.iter().sum::<u64>(), 10);
    }

    #[test]
    fn within_category_split_with_no_features_is_an_error() {
        let mut rng = StdRng::seed_from_u64(10);
        assert!(allocate_within_category(0, 0, &mut rng).unwrap().is_empty());
        assert!(matches!(
            allocate_within_category(4, 0, &mut rng),
            Err(Error::EmptyGroup { population: 4 })
        ));
    }

    #[test]
    fn same_seed_gives_same_category_split() {
        let populations: PopulationTable = [("a", 250u64), ("b", 80)].into_iter().collect();
        let fc = FeatureCounts::new();
        let weights = CategoryWeights::street_network();
        let a = allocate_by_category(&populations, &fc, &weights, &mut StdRng::seed_from_u64(1))
            .unwrap();
        let b = allocate_by_category(&populations, &fc, &weights, &mut StdRng::seed_from_u64(1))
            .unwrap();
        assert_eq!(a, b);
    }

    fn two_category_weights() -> CategoryWeights {
        CategoryWeights::new([("residential", 0.5), ("primary", 0.5)]).unwrap()
    }

    #[test]
    fn warn_and_drop_zeroes_orphaned_shares() {
        let weights = two_category_weights();
        let fc = counts(&[("z", "residential", 2)]);
        let mut split = CategorySplit::from([("z".to_owned(), vec![6, 4])]);
        let mut rng = StdRng::seed_from_u64(0);

        let orphans =
            reconcile_categories(&mut split, &fc, &weights, OrphanPolicy::WarnAndDrop, &mut rng)
                .unwrap();

        assert_eq!(split["z"], vec![6, 0]);
        assert_eq!(
            orphans,
            vec![Orphan {
                zone: "z".into(),
                category: Some("primary".into()),
                population: 4,
                redistributed: false,
            }]
        );
    }

    #[test]
    fn redistribute_moves_share_to_siblings() {
        let weights = two_category_weights();
        let fc = counts(&[("z", "residential", 2)]);
        let mut split = CategorySplit::from([("z".to_owned(), vec![6, 4])]);
        let mut rng = StdRng::seed_from_u64(0);

        let orphans =
            reconcile_categories(&mut split, &fc, &weights, OrphanPolicy::Redistribute, &mut rng)
                .unwrap();

        assert_eq!(split["z"], vec![10, 0]);
        assert_eq!(orphans.len(), 1);
        assert!(orphans[0].redistributed);
    }

    #[test]
    fn redistribute_without_any_features_drops() {
        let weights = two_category_weights();
        let mut split = CategorySplit::from([("z".to_owned(), vec![3, 2])]);
        let mut rng = StdRng::seed_from_u64(0);

        let orphans = reconcile_categories(
            &mut split,
            &FeatureCounts::new(),
            &weights,
            OrphanPolicy::Redistribute,
            &mut rng,
        )
        .unwrap();

        assert_eq!(split["z"], vec![0, 0]);
        assert_eq!(orphans.len(), 2);
        assert!(orphans.iter().all(|o| !o.redistributed));
    }

    #[test]
    fn fail_policy_raises() {
        let weights = two_category_weights();
        let mut split = CategorySplit::from([("z".to_owned(), vec![0, 4])]);
        let mut rng = StdRng::seed_from_u64(0);
        let err = reconcile_categories(
            &mut split,
            &FeatureCounts::new(),
            &weights,
            OrphanPolicy::Fail,
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::AllocationInconsistency { population: 4, .. }
        ));
    }

    #[test]
    fn zone_reconciliation_reports_featureless_zones() {
        let populations: PopulationTable =
            [("a", 5u64), ("b", 0), ("c", 7)].into_iter().collect();
        let per_zone = BTreeMap::from([("a".to_owned(), 3usize)]);

        let orphans = reconcile_zones(&populations, &per_zone, OrphanPolicy::Redistribute).unwrap();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].zone, "c");
        assert_eq!(orphans[0].population, 7);

        assert!(reconcile_zones(&populations, &per_zone, OrphanPolicy::Fail).is_err());
    }
}
