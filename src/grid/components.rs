//! Connected-component labeling of walkable regions.
//!
//! Components use the same 8-connected neighborhood as the path
//! search, so a labeled component is exactly the set of cells the
//! planner can reach from any of its members. Labeling is a pure
//! function of the occupancy grid: identical grids produce identical
//! component maps, ids included.

use crate::core::GridCoord;
use crate::grid::OccupancyGrid;
use log::{debug, warn};
use std::collections::VecDeque;

/// Component id of occupied or unlabeled cells.
pub const UNLABELED: u8 = 0;

/// Per-cell component ids over an occupancy grid. Ids run 1..=K in
/// row-major discovery order and are not stable across rebuilds;
/// callers must not persist them past a grid swap.
#[derive(Clone, Debug)]
pub struct ComponentMap {
    labels: Vec<u8>,
    /// Cell count per component, indexed by id - 1
    sizes: Vec<usize>,
    width: usize,
    height: usize,
}

impl ComponentMap {
    /// Flood-fill walkable regions of `grid` in row-major seed order.
    pub fn label(grid: &OccupancyGrid) -> ComponentMap {
        let width = grid.width();
        let height = grid.height();
        let mut labels = vec![UNLABELED; width * height];
        let mut sizes = Vec::new();
        let mut next_id: u8 = 1;
        let mut queue = VecDeque::new();

        'scan: for y in 0..height as i32 {
            for x in 0..width as i32 {
                let seed = GridCoord::new(x, y);
                let seed_idx = y as usize * width + x as usize;
                if labels[seed_idx] != UNLABELED || !grid.is_walkable(seed) {
                    continue;
                }
                if next_id == u8::MAX {
                    warn!(
                        "[Components] more than {} walkable regions, leaving the rest unlabeled",
                        u8::MAX - 1
                    );
                    break 'scan;
                }

                let id = next_id;
                next_id += 1;
                let mut count = 0usize;
                labels[seed_idx] = id;
                queue.push_back(seed);

                while let Some(cell) = queue.pop_front() {
                    count += 1;
                    for neighbor in cell.neighbors_8() {
                        if !grid.is_walkable(neighbor) {
                            continue;
                        }
                        let ni = neighbor.y as usize * width + neighbor.x as usize;
                        if labels[ni] == UNLABELED {
                            labels[ni] = id;
                            queue.push_back(neighbor);
                        }
                    }
                }
                sizes.push(count);
            }
        }

        debug!("[Components] labeled {} walkable regions", sizes.len());
        ComponentMap {
            labels,
            sizes,
            width,
            height,
        }
    }

    /// Component id at a cell; `UNLABELED` when occupied or out of bounds
    #[inline]
    pub fn component_at(&self, coord: GridCoord) -> u8 {
        if coord.x < 0
            || coord.y < 0
            || coord.x as usize >= self.width
            || coord.y as usize >= self.height
        {
            return UNLABELED;
        }
        self.labels[coord.y as usize * self.width + coord.x as usize]
    }

    /// Number of labeled components
    #[inline]
    pub fn component_count(&self) -> usize {
        self.sizes.len()
    }

    /// Cell count of a component (0 for `UNLABELED` or unknown ids)
    #[inline]
    pub fn size_of(&self, id: u8) -> usize {
        if id == UNLABELED {
            return 0;
        }
        self.sizes.get(id as usize - 1).copied().unwrap_or(0)
    }

    /// Id with the most cells; ties go to the lowest id (first seen in
    /// scan order). None when nothing is walkable.
    pub fn largest_component(&self) -> Option<u8> {
        let mut best: Option<(usize, u8)> = None;
        for (idx, &size) in self.sizes.iter().enumerate() {
            let id = idx as u8 + 1;
            match best {
                Some((best_size, _)) if size <= best_size => {}
                _ => best = Some((size, id)),
            }
        }
        best.map(|(_, id)| id)
    }

    /// Iterate over the cells of one component in row-major order
    pub fn cells_of(&self, id: u8) -> impl Iterator<Item = GridCoord> + '_ {
        let width = self.width;
        self.labels
            .iter()
            .enumerate()
            .filter(move |(_, &l)| l == id && id != UNLABELED)
            .map(move |(i, _)| GridCoord::new((i % width) as i32, (i / width) as i32))
    }

    /// Raw labels slice, row-major
    pub fn labels_raw(&self) -> &[u8] {
        &self.labels
    }

    /// Grid width in cells
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in cells
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }
}
