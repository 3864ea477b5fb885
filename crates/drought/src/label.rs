//! Connected-component labeling of drought cells at one time step.

use std::collections::VecDeque;

use smi_grid::GridMask;

/// Labels the 8-connected components of flagged cells.
///
/// `flagged` is indexed by packed cell. Seeds are visited in packed
/// (row-major) order, so component order is deterministic. Each component is
/// returned as a sorted list of packed cell indices; components with fewer
/// than `min_cells` cells are dropped.
pub(crate) fn label_components(
    mask: &GridMask,
    flagged: &[bool],
    min_cells: usize,
) -> Vec<Vec<usize>> {
    let mut visited = vec![false; flagged.len()];
    let mut components = Vec::new();
    let mut queue = VecDeque::new();

    for seed in 0..flagged.len() {
        if !flagged[seed] || visited[seed] {
            continue;
        }
        visited[seed] = true;
        queue.push_back(seed);

        let mut cells = Vec::new();
        while let Some(cell) = queue.pop_front() {
            cells.push(cell);
            for nb in mask.neighbours(cell) {
                if flagged[nb] && !visited[nb] {
                    visited[nb] = true;
                    queue.push_back(nb);
                }
            }
        }

        if cells.len() >= min_cells {
            cells.sort_unstable();
            components.push(cells);
        }
    }
    components
}

/// Number of elements shared by two sorted slices.
pub(crate) fn overlap(a: &[usize], b: &[usize]) -> usize {
    let (mut i, mut j, mut n) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                n += 1;
                i += 1;
                j += 1;
            }
        }
    }
    n
}
