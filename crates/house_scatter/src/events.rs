//! Event types and sinks for observing distribution runs.
//!
//! This module defines [`DistributionEvent`] and a set of sinks to
//! emit, collect, or forward events while running a
//! [`crate::distribute::Distributor`] or sampling single geometries through
//! [`crate::sampling::GeometrySampler`].
use std::fmt;

use crate::allocation::{Orphan, ZoneId};
use crate::distribute::RunSummary;
use crate::sampling::SamplingMethod;

/// Describes events emitted while distributing population.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum DistributionEvent {
    /// Emitted once features and population have been loaded and validated.
    RunStarted {
        /// Number of input features.
        features: usize,
        /// Number of zones with a population entry.
        zones: usize,
        /// Total population to place.
        population: u64,
        /// Sampling method in use.
        method: SamplingMethod,
    },

    /// Emitted for every allocation group after population has been assigned.
    ZoneAllocated {
        zone: ZoneId,
        /// `None` when features are grouped by zone only.
        category: Option<String>,
        /// People assigned to the group.
        population: u64,
        /// Features in the group.
        features: usize,
    },

    /// Emitted after points were drawn for one feature.
    FeatureSampled {
        /// Index of the feature in the input collection.
        feature: usize,
        zone: ZoneId,
        /// Number of points produced.
        count: usize,
    },

    /// Non-fatal problem encountered during the run.
    Warning(Warning),

    /// Emitted when the run finishes successfully.
    RunFinished { summary: RunSummary },
}

impl DistributionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DistributionEvent::RunStarted { .. } => EventKind::RunStarted,
            DistributionEvent::ZoneAllocated { .. } => EventKind::ZoneAllocated,
            DistributionEvent::FeatureSampled { .. } => EventKind::FeatureSampled,
            DistributionEvent::Warning(_) => EventKind::Warning,
            DistributionEvent::RunFinished { .. } => EventKind::RunFinished,
        }
    }
}

/// Discriminant of [`DistributionEvent`], used by sinks to filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    RunStarted,
    ZoneAllocated,
    FeatureSampled,
    Warning,
    RunFinished,
}

/// Non-fatal conditions reported during a run.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// Geometry type the samplers cannot place points in (points, collections).
    UnsupportedGeometry {
        feature: Option<usize>,
        geometry_type: &'static str,
    },
    /// Polygon without area.
    DegenerateGeometry {
        feature: Option<usize>,
        geometry_type: &'static str,
    },
    /// Population assigned to a group without features.
    AllocationInconsistency(Orphan),
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let feature = |idx: &Option<usize>| match idx {
            Some(i) => format!("feature {i}: "),
            None => String::new(),
        };
        match self {
            Warning::UnsupportedGeometry {
                feature: idx,
                geometry_type,
            } => write!(
                f,
                "{}unsupported geometry type {geometry_type}, skipped",
                feature(idx)
            ),
            Warning::DegenerateGeometry {
                feature: idx,
                geometry_type,
            } => write!(
                f,
                "{}{geometry_type} has zero area, skipped",
                feature(idx)
            ),
            Warning::AllocationInconsistency(orphan) => {
                write!(
                    f,
                    "{} people in zone '{}'",
                    orphan.population, orphan.zone
                )?;
                if let Some(c) = &orphan.category {
                    write!(f, " (category '{c}')")?;
                }
                if orphan.redistributed {
                    f.write_str(" had no features and were moved to other categories")
                } else {
                    f.write_str(" have no features and were not placed")
                }
            }
        }
    }
}

/// A generic event sink that accepts [`DistributionEvent`]s.
pub trait EventSink {
    fn send(&mut self, event: DistributionEvent);

    /// Whether events of `kind` should be built and sent at all.
    #[inline]
    fn wants(&self, _kind: EventKind) -> bool {
        true
    }
}

/// A no-op event sink.
impl EventSink for () {
    #[inline]
    fn send(&mut self, _event: DistributionEvent) {}

    #[inline]
    fn wants(&self, _kind: EventKind) -> bool {
        false
    }
}

/// An event sink that forwards to a user-provided closure.
pub struct FnSink<F>
where
    F: FnMut(DistributionEvent),
{
    f: F,
}

impl<F> FnSink<F>
where
    F: FnMut(DistributionEvent),
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> EventSink for FnSink<F>
where
    F: FnMut(DistributionEvent),
{
    #[inline]
    fn send(&mut self, event: DistributionEvent) {
        (self.f)(event);
    }
}

/// An event sink that collects all events in a `Vec`.
#[derive(Default)]
pub struct VecSink {
    events: Vec<DistributionEvent>,
}

impl VecSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            events: Vec::with_capacity(cap),
        }
    }

    pub fn into_inner(self) -> Vec<DistributionEvent> {
        self.events
    }

    pub fn as_slice(&self) -> &[DistributionEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate over collected warnings only.
    pub fn warnings(&self) -> impl Iterator<Item = &Warning> + '_ {
        self.events.iter().filter_map(|e| match e {
            DistributionEvent::Warning(w) => Some(w),
            _ => None,
        })
    }
}

impl EventSink for VecSink {
    #[inline]
    fn send(&mut self, event: DistributionEvent) {
        self.events.push(event);
    }
}

/// Fan-out sink that forwards each event to all contained sinks.
pub struct MultiSink<S: EventSink> {
    pub(crate) sinks: Vec<S>,
}

impl<S: EventSink> MultiSink<S> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with_sinks(sinks: Vec<S>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: S) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }
}

impl<S: EventSink> Default for MultiSink<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: EventSink> EventSink for MultiSink<S> {
    fn send(&mut self, event: DistributionEvent) {
        let kind = event.kind();
        let targets: Vec<usize> = (0..self.sinks.len())
            .filter(|i| self.sinks[*i].wants(kind))
            .collect();
        let Some((&last, rest)) = targets.split_last() else {
            return;
        };
        for &i in rest {
            self.sinks[i].send(event.clone());
        }
        self.sinks[last].send(event);
    }

    fn wants(&self, kind: EventKind) -> bool {
        self.sinks.iter().any(|s| s.wants(kind))
    }
}
