use std::collections::HashMap;

/// Integer coordinate of a grid cell.
pub type CellKey = [i32; 3];

/// Uniform grid of cubic cells mapping each occupied cell to the indices of
/// the points inside it. Built once, then only queried.
#[derive(Debug, Clone)]
pub struct SpatialHashGrid {
    cell_size: f32,
    cells: HashMap<CellKey, Vec<usize>>,
}

impl SpatialHashGrid {
    /// Buckets every point of a flat `[x, y, z, x, y, z, ...]` buffer.
    /// `cell_size` must be positive.
    pub fn build(positions: &[f32], cell_size: f32) -> Self {
        debug_assert!(cell_size > 0.0, "cell size must be positive");

        let mut cells: HashMap<CellKey, Vec<usize>> = HashMap::new();
        for (idx, p) in positions.chunks_exact(3).enumerate() {
            let key = Self::key_for(cell_size, [p[0], p[1], p[2]]);
            cells.entry(key).or_default().push(idx);
        }

        SpatialHashGrid { cell_size, cells }
    }

    fn key_for(cell_size: f32, point: [f32; 3]) -> CellKey {
        [
            (point[0] / cell_size).floor() as i32,
            (point[1] / cell_size).floor() as i32,
            (point[2] / cell_size).floor() as i32,
        ]
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn cell_of(&self, point: [f32; 3]) -> CellKey {
        Self::key_for(self.cell_size, point)
    }

    /// Point indices in one cell, in insertion (ascending index) order.
    pub fn bucket(&self, key: CellKey) -> &[usize] {
        self.cells.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn largest_bucket(&self) -> usize {
        self.cells.values().map(Vec::len).max().unwrap_or(0)
    }

    /// Indices of all points in the 3x3x3 block of cells centred on `key`.
    ///
    /// Offsets past the `i32` range are skipped, so every cell is visited
    /// once even for keys clamped at the edge of the grid.
    pub fn neighbourhood(&self, key: CellKey) -> impl Iterator<Item = usize> + '_ {
        (-1..=1).flat_map(move |dx| {
            (-1..=1).flat_map(move |dy| {
                (-1..=1).flat_map(move |dz| {
                    let cell = match (
                        key[0].checked_add(dx),
                        key[1].checked_add(dy),
                        key[2].checked_add(dz),
                    ) {
                        (Some(x), Some(y), Some(z)) => Some([x, y, z]),
                        _ => None,
                    };
                    cell.into_iter()
                        .flat_map(move |cell| self.bucket(cell).iter().copied())
                })
            })
        })
    }
}
