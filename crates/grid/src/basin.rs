//! Basin-ID maps and basin-averaged series.

use std::collections::BTreeMap;

use ndarray::ArrayView2;
use tracing::debug;

use crate::error::GridError;
use crate::mask::GridMask;
use crate::nodata::{NODATA, is_nodata};

/// Basin membership of every valid cell.
///
/// Grid positions with an id `<= 0` lie outside any basin. Only used for
/// spatial averaging.
#[derive(Debug, Clone, PartialEq)]
pub struct BasinMap {
    ids: Vec<i32>,
}

/// Mean of a cell field over one basin, per time step.
#[derive(Debug, Clone, PartialEq)]
pub struct BasinSeries {
    id: i32,
    n_cells: usize,
    values: Vec<f64>,
}

impl BasinSeries {
    /// Basin identifier.
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Number of mask cells that belong to the basin.
    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    /// Basin mean per time step ([`NODATA`] where no cell had data).
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

impl BasinMap {
    /// Builds a basin map from a row-major grid of ids, packed through `mask`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::ShapeMismatch`] if `grid_ids` does not cover the
    /// mask's grid.
    pub fn from_grid(mask: &GridMask, grid_ids: &[i32]) -> Result<Self, GridError> {
        let ids = mask.pack(grid_ids).map_err(|_| GridError::ShapeMismatch {
            what: "basin map".to_string(),
            expected: mask.n_grid(),
            got: grid_ids.len(),
        })?;
        Ok(Self { ids })
    }

    /// Returns the basin id of each packed cell.
    pub fn ids(&self) -> &[i32] {
        &self.ids
    }

    /// Returns the distinct positive basin ids in ascending order.
    pub fn basin_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.ids.iter().copied().filter(|&id| id > 0).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Averages a `(n_cells, n_steps)` field over each basin.
    ///
    /// No-data entries are skipped. A step where no cell of a basin has data
    /// yields [`NODATA`].
    ///
    /// # Errors
    ///
    /// Returns [`GridError::ShapeMismatch`] if the field does not have one row
    /// per basin-map cell.
    pub fn average(&self, field: ArrayView2<'_, f64>) -> Result<Vec<BasinSeries>, GridError> {
        let (n_cells, n_steps) = field.dim();
        if n_cells != self.ids.len() {
            return Err(GridError::ShapeMismatch {
                what: "field rows".to_string(),
                expected: self.ids.len(),
                got: n_cells,
            });
        }

        let mut members: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for (cell, &id) in self.ids.iter().enumerate() {
            if id > 0 {
                members.entry(id).or_default().push(cell);
            }
        }

        let series = members
            .into_iter()
            .map(|(id, cells)| {
                let values = (0..n_steps)
                    .map(|t| {
                        let (sum, n) = cells
                            .iter()
                            .map(|&c| field[[c, t]])
                            .filter(|&v| !is_nodata(v))
                            .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                        if n == 0 { NODATA } else { sum / n as f64 }
                    })
                    .collect();
                BasinSeries {
                    id,
                    n_cells: cells.len(),
                    values,
                }
            })
            .collect::<Vec<_>>();

        debug!(n_basins = series.len(), n_steps, "computed basin averages");
        Ok(series)
    }
}
