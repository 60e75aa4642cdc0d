//! Robot footprint marker.
//!
//! A small arrow-shaped bitmap, tip up, rotated to the robot's heading by
//! nearest-neighbour sampling. The rotated bitmap grows to hold the whole
//! rotated shape, like an image rotated with its canvas expanded.

/// Footprint at heading 0, rows top to bottom
const FOOTPRINT: [[u8; 5]; 7] = [
    [0, 0, 1, 0, 0],
    [0, 0, 1, 0, 0],
    [0, 0, 1, 0, 0],
    [0, 1, 1, 1, 0],
    [0, 1, 1, 1, 0],
    [1, 1, 1, 1, 1],
    [1, 1, 1, 1, 1],
];

/// Rotated footprint bitmap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footprint {
    rows: usize,
    cols: usize,
    cells: Vec<bool>,
}

impl Footprint {
    /// Footprint rotated clockwise on screen by `heading_deg`
    pub fn rotated(heading_deg: f32) -> Self {
        let in_rows = FOOTPRINT.len();
        let in_cols = FOOTPRINT[0].len();
        let (sin, cos) = heading_deg.to_radians().sin_cos();

        let rows = (in_cols as f32 * sin.abs() + in_rows as f32 * cos.abs() + 0.5) as usize;
        let cols = (in_cols as f32 * cos.abs() + in_rows as f32 * sin.abs() + 0.5) as usize;
        let (rows, cols) = (rows.max(1), cols.max(1));

        let in_center = ((in_rows - 1) as f32 / 2.0, (in_cols - 1) as f32 / 2.0);
        let out_center = ((rows - 1) as f32 / 2.0, (cols - 1) as f32 / 2.0);

        let mut cells = vec![false; rows * cols];
        for r in 0..rows {
            for c in 0..cols {
                // Screen rows grow downwards: undo the rotation to find the source cell
                let dy = r as f32 - out_center.0;
                let dx = c as f32 - out_center.1;
                let src_x = dx * cos + dy * sin + in_center.1;
                let src_y = -dx * sin + dy * cos + in_center.0;

                let (sr, sc) = ((src_y + 0.5).floor(), (src_x + 0.5).floor());
                if sr >= 0.0 && sc >= 0.0 && (sr as usize) < in_rows && (sc as usize) < in_cols {
                    cells[r * cols + c] = FOOTPRINT[sr as usize][sc as usize] == 1;
                }
            }
        }

        Self { rows, cols, cells }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_set(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols && self.cells[row * self.cols + col]
    }

    /// Offsets `(d_col, d_row)` of the set cells from the marker center
    pub fn offsets(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        let half_rows = ((self.rows - 1) / 2) as i64;
        let half_cols = ((self.cols - 1) / 2) as i64;
        (0..self.rows).flat_map(move |r| {
            (0..self.cols)
                .filter(move |&c| self.is_set(r, c))
                .map(move |c| (c as i64 - half_cols, r as i64 - half_rows))
        })
    }

    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&set| set).count()
    }
}
