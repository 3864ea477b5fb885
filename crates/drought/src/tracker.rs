//! Tracking of drought clusters across time steps.
//!
//! Each step, the 8-connected drought clusters are linked to the events that
//! were open at the previous step. A cluster and an event are linked when
//! they share at least `n_cell_inter` cells. Ambiguous links are resolved
//! greedily in order of decreasing overlap, then ascending event id, then
//! ascending cluster index; every event and every cluster takes at most one
//! link. Unlinked clusters open new events, unlinked open events close.

use ndarray::{Array2, ArrayView2};
use smi_grid::GridMask;
use tracing::{debug, info};

use crate::config::DroughtConfig;
use crate::error::DroughtError;
use crate::indicator::IndicatorField;
use crate::label::{label_components, overlap};

/// Lifecycle state of a [`DroughtEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventState {
    /// Still linked at the latest processed step.
    Open,
    /// Finalized.
    Closed,
}

/// A drought cluster tracked over consecutive time steps.
#[derive(Debug, Clone, PartialEq)]
pub struct DroughtEvent {
    id: u32,
    start: usize,
    cells: Vec<Vec<usize>>,
    split_from: Option<u32>,
    merged_into: Option<u32>,
    state: EventState,
}

impl DroughtEvent {
    fn open(id: u32, start: usize, cells: Vec<usize>, split_from: Option<u32>) -> Self {
        Self {
            id,
            start,
            cells: vec![cells],
            split_from,
            merged_into: None,
            state: EventState::Open,
        }
    }

    /// Event id, 1-based in creation order.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// First time step.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Last time step (inclusive).
    pub fn end(&self) -> usize {
        self.start + self.cells.len() - 1
    }

    /// Number of time steps.
    pub fn duration(&self) -> usize {
        self.cells.len()
    }

    /// Sorted packed cell indices at absolute time step `t`.
    pub fn cells_at(&self, t: usize) -> Option<&[usize]> {
        t.checked_sub(self.start)
            .and_then(|i| self.cells.get(i))
            .map(Vec::as_slice)
    }

    /// Cell sets of every step, in time order.
    pub fn steps(&self) -> impl Iterator<Item = (usize, &[usize])> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, c)| (self.start + i, c.as_slice()))
    }

    /// Number of cells at each step.
    pub fn areas(&self) -> Vec<usize> {
        self.cells.iter().map(Vec::len).collect()
    }

    /// Largest number of cells at any step.
    pub fn peak_area(&self) -> usize {
        self.cells.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Sorted distinct cells touched over the whole event.
    pub fn footprint(&self) -> Vec<usize> {
        let mut all: Vec<usize> = self.cells.iter().flatten().copied().collect();
        all.sort_unstable();
        all.dedup();
        all
    }

    /// Event whose cluster this event split off from, if any.
    pub fn split_from(&self) -> Option<u32> {
        self.split_from
    }

    /// Event that took over this event's largest cluster when it closed.
    pub fn merged_into(&self) -> Option<u32> {
        self.merged_into
    }

    /// Lifecycle state.
    pub fn state(&self) -> EventState {
        self.state
    }

    fn last_cells(&self) -> &[usize] {
        self.cells.last().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// All drought events of a run plus the per-(cell, step) event id field.
#[derive(Debug, Clone)]
pub struct EventRegistry {
    events: Vec<DroughtEvent>,
    cluster_ids: Array2<u32>,
    threshold: f64,
}

impl EventRegistry {
    /// All events, ordered by id.
    pub fn events(&self) -> &[DroughtEvent] {
        &self.events
    }

    /// Event with the given id.
    pub fn get(&self, id: u32) -> Option<&DroughtEvent> {
        (id as usize)
            .checked_sub(1)
            .and_then(|i| self.events.get(i))
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if no event was found.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Event id of every (cell, step), `0` where no event.
    pub fn cluster_ids(&self) -> ArrayView2<'_, u32> {
        self.cluster_ids.view()
    }

    /// Number of cells.
    pub fn n_cells(&self) -> usize {
        self.cluster_ids.nrows()
    }

    /// Number of time steps.
    pub fn n_steps(&self) -> usize {
        self.cluster_ids.ncols()
    }

    /// SMI threshold of the indicator the events were tracked on.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

/// A candidate link between an open event and a cluster of the current step.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    overlap: usize,
    event: usize,
    cluster: usize,
}

/// Tracks drought clusters of `indicator` through time.
///
/// # Errors
///
/// Returns [`DroughtError::InvalidConfig`] or [`DroughtError::ShapeMismatch`]
/// for invalid input (including an indicator built with a threshold other
/// than `config`'s), and [`DroughtError::ClusteringInconsistency`] if the
/// resulting registry fails its consistency check.
#[tracing::instrument(skip_all, fields(n_cells = indicator.n_cells(), n_steps = indicator.n_steps()))]
pub fn track_events(
    mask: &GridMask,
    indicator: &IndicatorField,
    config: &DroughtConfig,
) -> Result<EventRegistry, DroughtError> {
    config.validate()?;
    check_threshold(config, indicator.threshold())?;
    if indicator.n_cells() != mask.n_cells() {
        return Err(DroughtError::ShapeMismatch {
            what: "indicator cells".to_string(),
            expected: mask.n_cells(),
            got: indicator.n_cells(),
        });
    }

    let mut events: Vec<DroughtEvent> = Vec::new();
    // Indices into `events` of the events open after the previous step.
    let mut open: Vec<usize> = Vec::new();

    for t in 0..indicator.n_steps() {
        let flagged = indicator.drought_cells(t);
        let clusters = label_components(mask, &flagged, config.th_cell_clus());

        // overlaps[i][j]: cells shared by open[i] and clusters[j].
        let overlaps: Vec<Vec<usize>> = open
            .iter()
            .map(|&e| {
                let prev = events[e].last_cells();
                clusters.iter().map(|c| overlap(prev, c)).collect()
            })
            .collect();

        let mut candidates: Vec<Candidate> = Vec::new();
        for (i, row) in overlaps.iter().enumerate() {
            for (j, &n) in row.iter().enumerate() {
                if n >= config.n_cell_inter() {
                    candidates.push(Candidate {
                        overlap: n,
                        event: open[i],
                        cluster: j,
                    });
                }
            }
        }
        candidates.sort_by(|a, b| {
            b.overlap
                .cmp(&a.overlap)
                .then(a.event.cmp(&b.event))
                .then(a.cluster.cmp(&b.cluster))
        });

        let mut owner: Vec<Option<usize>> = vec![None; clusters.len()];
        let mut linked_events: Vec<usize> = Vec::new();
        for c in &candidates {
            if owner[c.cluster].is_none() && !linked_events.contains(&c.event) {
                owner[c.cluster] = Some(c.event);
                linked_events.push(c.event);
            }
        }

        for (j, cluster) in clusters.iter().enumerate() {
            match owner[j] {
                Some(e) => events[e].cells.push(cluster.clone()),
                None => {
                    let split_from = largest_overlap(overlaps.iter().map(|row| row[j]))
                        .map(|i| events[open[i]].id);
                    let idx = events.len();
                    let id = next_id(idx)?;
                    events.push(DroughtEvent::open(id, t, cluster.clone(), split_from));
                    owner[j] = Some(idx);
                }
            }
        }

        let mut next_open: Vec<usize> = Vec::new();
        for (i, &e) in open.iter().enumerate() {
            if linked_events.contains(&e) {
                next_open.push(e);
                continue;
            }
            let merged_into = largest_overlap(overlaps[i].iter().copied())
                .and_then(|j| owner[j])
                .map(|k| events[k].id);
            let event = &mut events[e];
            event.state = EventState::Closed;
            event.merged_into = merged_into;
            debug!(event = event.id, end = event.end(), ?merged_into, "closed drought event");
        }
        next_open.extend(owner.iter().flatten().filter(|&&k| events[k].start == t));
        next_open.sort_unstable();
        open = next_open;
    }

    for &e in &open {
        events[e].state = EventState::Closed;
    }

    let cluster_ids = check_consistency(&events, mask.n_cells(), indicator.n_steps(), config)?;
    info!(n_events = events.len(), "tracked drought events");
    Ok(EventRegistry {
        events,
        cluster_ids,
        threshold: indicator.threshold(),
    })
}

/// Rejects a `config` whose threshold differs from the one the drought flags
/// were computed with.
pub(crate) fn check_threshold(config: &DroughtConfig, threshold: f64) -> Result<(), DroughtError> {
    if config.threshold() != threshold {
        return Err(DroughtError::InvalidConfig {
            reason: format!(
                "threshold {} differs from the indicator threshold {threshold}",
                config.threshold()
            ),
        });
    }
    Ok(())
}

/// Index of the largest positive value, ties to the lowest index.
fn largest_overlap(values: impl Iterator<Item = usize>) -> Option<usize> {
    values
        .enumerate()
        .filter(|&(_, n)| n > 0)
        .fold(None, |best: Option<(usize, usize)>, (i, n)| match best {
            Some((_, m)) if m >= n => best,
            _ => Some((i, n)),
        })
        .map(|(i, _)| i)
}

fn next_id(idx: usize) -> Result<u32, DroughtError> {
    u32::try_from(idx + 1).map_err(|_| DroughtError::ClusteringInconsistency {
        reason: "event id overflow".to_string(),
    })
}

/// Verifies the registry and builds the event id field.
fn check_consistency(
    events: &[DroughtEvent],
    n_cells: usize,
    n_steps: usize,
    config: &DroughtConfig,
) -> Result<Array2<u32>, DroughtError> {
    let fail = |reason: String| Err(DroughtError::ClusteringInconsistency { reason });
    let mut ids = Array2::<u32>::zeros((n_cells, n_steps));

    for (k, event) in events.iter().enumerate() {
        if event.id as usize != k + 1 {
            return fail(format!("event at position {k} has id {}", event.id));
        }
        if event.cells.is_empty() || event.end() >= n_steps {
            return fail(format!("event {} spans invalid steps", event.id));
        }
        if event.state != EventState::Closed {
            return fail(format!("event {} was never closed", event.id));
        }
        if event.split_from.is_some_and(|p| p >= event.id)
            || event.merged_into.is_some_and(|m| m == event.id || m as usize > events.len())
        {
            return fail(format!("event {} has an invalid lineage", event.id));
        }
        for (t, cells) in event.steps() {
            if cells.len() < config.th_cell_clus() {
                return fail(format!(
                    "event {} has {} cells at step {t}, below the cluster minimum",
                    event.id,
                    cells.len()
                ));
            }
            for &c in cells {
                if c >= n_cells {
                    return fail(format!("event {} references cell {c} outside the mask", event.id));
                }
                let slot = &mut ids[[c, t]];
                if *slot != 0 {
                    return fail(format!(
                        "cell {c} claimed by events {} and {} at step {t}",
                        *slot, event.id
                    ));
                }
                *slot = event.id;
            }
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::DroughtFlag;

    /// Builds an indicator over an all-valid grid from one pattern per step
    /// (`#` drought, `.` normal, `x` no-data).
    fn indicator(rows: usize, cols: usize, steps: &[&str]) -> (GridMask, IndicatorField) {
        let mask = GridMask::all_valid(rows, cols).unwrap();
        let mut flags = Array2::from_elem((rows * cols, steps.len()), DroughtFlag::Normal);
        for (t, pattern) in steps.iter().enumerate() {
            for (c, ch) in pattern.chars().filter(|c| !c.is_whitespace()).enumerate() {
                flags[[c, t]] = match ch {
                    '#' => DroughtFlag::Drought,
                    'x' => DroughtFlag::NoData,
                    _ => DroughtFlag::Normal,
                };
            }
        }
        (mask, IndicatorField::from_flags(flags, 0.2))
    }

    fn config(th: usize, inter: usize) -> DroughtConfig {
        DroughtConfig::new()
            .with_th_cell_clus(th)
            .with_n_cell_inter(inter)
    }

    #[test]
    fn single_cluster_persists() {
        let (mask, ind) = indicator(2, 2, &["##..", "##..", "#..."]);
        let reg = track_events(&mask, &ind, &config(1, 1)).unwrap();
        assert_eq!(reg.len(), 1);
        let e = &reg.events()[0];
        assert_eq!((e.start(), e.end(), e.duration()), (0, 2, 3));
        assert_eq!(e.areas(), vec![2, 2, 1]);
        assert_eq!(e.state(), EventState::Closed);
        assert_eq!(reg.cluster_ids()[[0, 2]], 1);
        assert_eq!(reg.cluster_ids()[[1, 2]], 0);
    }

    #[test]
    fn gap_starts_new_event() {
        let (mask, ind) = indicator(1, 2, &["#.", "..", "#."]);
        let reg = track_events(&mask, &ind, &config(1, 1)).unwrap();
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get(2).unwrap().start(), 2);
        assert_eq!(reg.get(2).unwrap().split_from(), None);
    }

    #[test]
    fn insufficient_overlap_does_not_link() {
        // Cluster moves by one column: one shared cell, two required.
        let (mask, ind) = indicator(1, 4, &["##..", ".##."]);
        let reg = track_events(&mask, &ind, &config(1, 2)).unwrap();
        assert_eq!(reg.len(), 2);
        let first = reg.get(1).unwrap();
        assert_eq!(first.duration(), 1);
        // The closing event's cells continue in event 2.
        assert_eq!(first.merged_into(), Some(2));
        assert_eq!(reg.get(2).unwrap().split_from(), Some(1));
    }

    #[test]
    fn split_keeps_larger_part() {
        let (mask, ind) = indicator(1, 7, &["#######", "###.##."]);
        let reg = track_events(&mask, &ind, &config(1, 1)).unwrap();
        assert_eq!(reg.len(), 2);
        let parent = reg.get(1).unwrap();
        assert_eq!(parent.cells_at(1), Some(&[0usize, 1, 2][..]));
        let child = reg.get(2).unwrap();
        assert_eq!(child.cells_at(1), Some(&[4usize, 5][..]));
        assert_eq!(child.split_from(), Some(1));
    }

    #[test]
    fn merge_closes_smaller_event() {
        let (mask, ind) = indicator(1, 7, &["###.##.", "#######"]);
        let reg = track_events(&mask, &ind, &config(1, 1)).unwrap();
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get(1).unwrap().duration(), 2);
        let absorbed = reg.get(2).unwrap();
        assert_eq!(absorbed.duration(), 1);
        assert_eq!(absorbed.merged_into(), Some(1));
    }

    #[test]
    fn equal_overlap_prefers_lower_event_id() {
        let (mask, ind) = indicator(1, 5, &["##.##", "#####"]);
        let reg = track_events(&mask, &ind, &config(1, 1)).unwrap();
        assert_eq!(reg.get(1).unwrap().duration(), 2);
        assert_eq!(reg.get(2).unwrap().merged_into(), Some(1));
    }

    #[test]
    fn nodata_is_not_drought() {
        let (mask, ind) = indicator(1, 3, &["#x#"]);
        let reg = track_events(&mask, &ind, &config(1, 1)).unwrap();
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn small_clusters_never_open_events() {
        let (mask, ind) = indicator(2, 3, &["#....#", "##...."]);
        let reg = track_events(&mask, &ind, &config(2, 1)).unwrap();
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(1).unwrap().start(), 1);
        for e in reg.events() {
            assert!(e.areas().iter().all(|&a| a >= 2));
        }
    }

    #[test]
    fn empty_steps_are_valid() {
        let (mask, ind) = indicator(2, 2, &["....", "...."]);
        let reg = track_events(&mask, &ind, &config(1, 1)).unwrap();
        assert!(reg.is_empty());
        assert_eq!(reg.cluster_ids().dim(), (4, 2));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let (_, ind) = indicator(2, 2, &["####"]);
        let other = GridMask::all_valid(3, 3).unwrap();
        assert!(matches!(
            track_events(&other, &ind, &config(1, 1)),
            Err(DroughtError::ShapeMismatch { expected: 9, got: 4, .. })
        ));
    }

    #[test]
    fn invalid_thresholds_are_rejected() {
        let (mask, ind) = indicator(2, 2, &["####"]);
        assert!(matches!(
            track_events(&mask, &ind, &config(0, 1)),
            Err(DroughtError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn indicator_threshold_is_recorded_and_must_match_config() {
        let (mask, ind) = indicator(2, 2, &["##.."]);
        let reg = track_events(&mask, &ind, &config(1, 1)).unwrap();
        assert_eq!(reg.threshold(), 0.2);

        let other = config(1, 1).with_threshold(0.3);
        assert!(matches!(
            track_events(&mask, &ind, &other),
            Err(DroughtError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn consistency_check_detects_double_claims() {
        let events = vec![
            DroughtEvent {
                id: 1,
                start: 0,
                cells: vec![vec![0, 1]],
                split_from: None,
                merged_into: None,
                state: EventState::Closed,
            },
            DroughtEvent {
                id: 2,
                start: 0,
                cells: vec![vec![1, 2]],
                split_from: None,
                merged_into: None,
                state: EventState::Closed,
            },
        ];
        assert!(matches!(
            check_consistency(&events, 4, 1, &config(1, 1)),
            Err(DroughtError::ClusteringInconsistency { .. })
        ));
    }

    #[test]
    fn consistency_check_detects_cells_outside_mask() {
        let events = vec![DroughtEvent {
            id: 1,
            start: 0,
            cells: vec![vec![7]],
            split_from: None,
            merged_into: None,
            state: EventState::Closed,
        }];
        assert!(matches!(
            check_consistency(&events, 4, 1, &config(1, 1)),
            Err(DroughtError::ClusteringInconsistency { .. })
        ));
    }
}
