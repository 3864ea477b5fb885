//! Grid mask and the mapping between grid and packed cell-index space.

use ndarray::{Array2, ArrayView2};

use crate::error::GridError;
use crate::nodata::is_nodata;

/// Row/column offsets of the eight neighbours of a grid cell.
///
/// Diagonal cells count as neighbours (8-connectivity).
const NEIGHBOUR_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Boolean mask over a `rows × cols` grid marking valid land cells.
///
/// Valid cells are numbered `0..n_cells()` in row-major scan order. Every
/// per-cell array in the pipeline is packed in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct GridMask {
    rows: usize,
    cols: usize,
    valid: Vec<bool>,
    cell_of: Vec<Option<usize>>,
    grid_of: Vec<usize>,
}

impl GridMask {
    /// Creates a mask from a row-major `rows × cols` boolean array.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::EmptyGrid`] if either dimension is zero,
    /// [`GridError::ShapeMismatch`] if `valid.len() != rows * cols`, and
    /// [`GridError::EmptyMask`] if no cell is valid.
    pub fn new(rows: usize, cols: usize, valid: Vec<bool>) -> Result<Self, GridError> {
        if rows == 0 || cols == 0 {
            return Err(GridError::EmptyGrid { rows, cols });
        }
        if valid.len() != rows * cols {
            return Err(GridError::ShapeMismatch {
                what: "mask".to_string(),
                expected: rows * cols,
                got: valid.len(),
            });
        }

        let mut cell_of = vec![None; valid.len()];
        let mut grid_of = Vec::new();
        for (g, &v) in valid.iter().enumerate() {
            if v {
                cell_of[g] = Some(grid_of.len());
                grid_of.push(g);
            }
        }
        if grid_of.is_empty() {
            return Err(GridError::EmptyMask);
        }

        Ok(Self {
            rows,
            cols,
            valid,
            cell_of,
            grid_of,
        })
    }

    /// Creates a mask where every cell is valid.
    pub fn all_valid(rows: usize, cols: usize) -> Result<Self, GridError> {
        Self::new(rows, cols, vec![true; rows * cols])
    }

    /// Derives a mask from a gridded time series laid out as `[time, row, col]`.
    ///
    /// A cell is valid if at least one of its values is not no-data.
    pub fn from_series(
        rows: usize,
        cols: usize,
        n_steps: usize,
        data: &[f64],
    ) -> Result<Self, GridError> {
        let n_grid = rows * cols;
        if data.len() != n_grid * n_steps {
            return Err(GridError::ShapeMismatch {
                what: "gridded series".to_string(),
                expected: n_grid * n_steps,
                got: data.len(),
            });
        }
        let mut valid = vec![false; n_grid];
        for t in 0..n_steps {
            let slice = &data[t * n_grid..(t + 1) * n_grid];
            for (g, &v) in slice.iter().enumerate() {
                if !is_nodata(v) {
                    valid[g] = true;
                }
            }
        }
        Self::new(rows, cols, valid)
    }

    /// Returns the number of grid rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of grid columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns the total number of grid positions (`rows * cols`).
    pub fn n_grid(&self) -> usize {
        self.rows * self.cols
    }

    /// Returns the number of valid cells.
    pub fn n_cells(&self) -> usize {
        self.grid_of.len()
    }

    /// Returns the row-major validity array.
    pub fn valid(&self) -> &[bool] {
        &self.valid
    }

    /// Returns `true` if `(row, col)` is inside the grid and valid.
    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        self.cell_index(row, col).is_some()
    }

    /// Returns the packed index of `(row, col)`, or `None` for masked-out or
    /// out-of-range positions.
    pub fn cell_index(&self, row: usize, col: usize) -> Option<usize> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cell_of[row * self.cols + col]
    }

    /// Returns the row-major grid index of a packed cell.
    ///
    /// # Panics
    ///
    /// Panics if `cell >= n_cells()`.
    pub fn grid_index(&self, cell: usize) -> usize {
        self.grid_of[cell]
    }

    /// Returns the `(row, col)` coordinates of a packed cell.
    ///
    /// # Panics
    ///
    /// Panics if `cell >= n_cells()`.
    pub fn coords(&self, cell: usize) -> (usize, usize) {
        let g = self.grid_of[cell];
        (g / self.cols, g % self.cols)
    }

    /// Returns the packed indices of the valid 8-connected neighbours of `cell`.
    pub fn neighbours(&self, cell: usize) -> impl Iterator<Item = usize> + '_ {
        let (row, col) = self.coords(cell);
        NEIGHBOUR_OFFSETS.iter().filter_map(move |&(dr, dc)| {
            let r = row.checked_add_signed(dr)?;
            let c = col.checked_add_signed(dc)?;
            self.cell_index(r, c)
        })
    }

    /// Packs a row-major grid array into cell order.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::ShapeMismatch`] if `grid.len() != n_grid()`.
    pub fn pack<T: Copy>(&self, grid: &[T]) -> Result<Vec<T>, GridError> {
        if grid.len() != self.n_grid() {
            return Err(GridError::ShapeMismatch {
                what: "grid array".to_string(),
                expected: self.n_grid(),
                got: grid.len(),
            });
        }
        Ok(self.grid_of.iter().map(|&g| grid[g]).collect())
    }

    /// Scatters a packed cell array back onto the grid, filling masked-out
    /// positions with `fill`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::ShapeMismatch`] if `cells.len() != n_cells()`.
    pub fn unpack<T: Copy>(&self, cells: &[T], fill: T) -> Result<Vec<T>, GridError> {
        if cells.len() != self.n_cells() {
            return Err(GridError::ShapeMismatch {
                what: "cell array".to_string(),
                expected: self.n_cells(),
                got: cells.len(),
            });
        }
        let mut grid = vec![fill; self.n_grid()];
        for (cell, &g) in self.grid_of.iter().enumerate() {
            grid[g] = cells[cell];
        }
        Ok(grid)
    }

    /// Packs a `[time, row, col]` series into a `(n_cells, n_steps)` matrix.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::ShapeMismatch`] if `data.len() != n_grid() * n_steps`.
    pub fn pack_series(&self, data: &[f64], n_steps: usize) -> Result<Array2<f64>, GridError> {
        let n_grid = self.n_grid();
        if data.len() != n_grid * n_steps {
            return Err(GridError::ShapeMismatch {
                what: "gridded series".to_string(),
                expected: n_grid * n_steps,
                got: data.len(),
            });
        }
        Ok(Array2::from_shape_fn((self.n_cells(), n_steps), |(c, t)| {
            data[t * n_grid + self.grid_of[c]]
        }))
    }

    /// Scatters a `(n_cells, n_steps)` matrix onto a `[time, row, col]` array.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::ShapeMismatch`] if the matrix does not have
    /// `n_cells()` rows.
    pub fn unpack_series<T: Copy>(
        &self,
        matrix: ArrayView2<'_, T>,
        fill: T,
    ) -> Result<Vec<T>, GridError> {
        let (n_cells, n_steps) = matrix.dim();
        if n_cells != self.n_cells() {
            return Err(GridError::ShapeMismatch {
                what: "cell matrix rows".to_string(),
                expected: self.n_cells(),
                got: n_cells,
            });
        }
        let n_grid = self.n_grid();
        let mut out = vec![fill; n_grid * n_steps];
        for ((c, t), &v) in matrix.indexed_iter() {
            out[t * n_grid + self.grid_of[c]] = v;
        }
        Ok(out)
    }
}
