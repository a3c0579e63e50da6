//! The 4x4 tile board and its move, spawn and terminal-detection rules.
//!
//! Cells are stored row-major (indices 0-3 are row 0, 4-7 row 1, ...).
//! Empty cells are 0; tiles hold their face value (2, 4, 8, ...).

use rand::Rng;
use std::fmt;

/// Side length of the board.
pub const SIDE: usize = 4;

/// Number of cells on the board.
pub const CELLS: usize = SIDE * SIDE;

/// Gauge gained per merge produced by a move.
pub const MERGE_GAUGE: u32 = 5;

/// Probability that a spawned tile is a 2 rather than a 4.
const SPAWN_TWO_CHANCE: f64 = 0.9;

/// The four move directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Direction {
    /// Convert a u8 to a Direction (0=Up, 1=Down, 2=Left, 3=Right).
    /// Returns None for invalid values.
    pub fn from_u8(value: u8) -> Option<Direction> {
        match value {
            0 => Some(Direction::Up),
            1 => Some(Direction::Down),
            2 => Some(Direction::Left),
            3 => Some(Direction::Right),
            _ => None,
        }
    }

    /// Get all four directions.
    pub fn all() -> [Direction; 4] {
        [
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
        ]
    }

    /// Board indices of line `line`, ordered so that tiles collapse toward
    /// the first entry.
    fn line_indices(self, line: usize) -> [usize; SIDE] {
        let mut out = [0; SIDE];
        for (k, slot) in out.iter_mut().enumerate() {
            // Position along the line in board order.
            let along = match self {
                Direction::Left | Direction::Up => k,
                Direction::Right | Direction::Down => SIDE - 1 - k,
            };
            *slot = match self {
                Direction::Left | Direction::Right => line * SIDE + along,
                Direction::Up | Direction::Down => along * SIDE + line,
            };
        }
        out
    }
}

/// Outcome of one directional move.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MoveResult {
    /// Whether any cell differs from the board before the move.
    pub changed: bool,
    /// Values produced by merges, in collapse order.
    pub merged_values: Vec<u32>,
    /// Sum of `merged_values`.
    pub points_gained: u64,
    /// Gauge earned by the merges alone (the per-move base is added by the
    /// progression rules).
    pub gauge_gained: u32,
}

/// A cell value that is neither empty nor a power of two of at least 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cell {index} holds {value}, which is not a valid tile")]
pub struct InvalidTile {
    pub index: usize,
    pub value: u32,
}

/// The tile board.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Grid {
    cells: [u32; CELLS],
}

impl Grid {
    /// An empty board.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a board from explicit cells, rejecting values that are not tiles.
    pub fn from_cells(cells: [u32; CELLS]) -> Result<Self, InvalidTile> {
        for (index, &value) in cells.iter().enumerate() {
            if value != 0 && (value < 2 || !value.is_power_of_two()) {
                return Err(InvalidTile { index, value });
            }
        }
        Ok(Self { cells })
    }

    /// A fresh board holding two spawned tiles.
    pub fn new_game<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut grid = Self::empty();
        grid.spawn_random_tile(rng);
        grid.spawn_random_tile(rng);
        grid
    }

    pub fn cells(&self) -> &[u32; CELLS] {
        &self.cells
    }

    /// Largest tile on the board, 0 when empty.
    pub fn max_tile(&self) -> u32 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    pub fn empty_count(&self) -> usize {
        self.cells.iter().filter(|&&v| v == 0).count()
    }

    pub fn tile_count(&self) -> usize {
        CELLS - self.empty_count()
    }

    /// Slide and merge every line toward `direction`.
    ///
    /// Each line is compacted, then swept once from the leading edge: an
    /// equal adjacent pair becomes one doubled tile and the sweep resumes
    /// after it, so a tile produced in this move never merges again.
    /// Does not spawn.
    pub fn attempt_move(&mut self, direction: Direction) -> MoveResult {
        let before = self.cells;
        let mut merged_values = Vec::new();

        for line in 0..SIDE {
            let indices = direction.line_indices(line);
            let mut values = [0u32; SIDE];
            for (v, &i) in values.iter_mut().zip(indices.iter()) {
                *v = self.cells[i];
            }
            let collapsed = collapse_line(values, &mut merged_values);
            for (&v, &i) in collapsed.iter().zip(indices.iter()) {
                self.cells[i] = v;
            }
        }

        let points_gained = merged_values.iter().map(|&v| u64::from(v)).sum();
        let gauge_gained = MERGE_GAUGE * merged_values.len() as u32;
        MoveResult {
            changed: self.cells != before,
            merged_values,
            points_gained,
            gauge_gained,
        }
    }

    /// Place a 2 (90%) or a 4 (10%) in a uniformly chosen empty cell.
    /// Returns the index filled, or None when the board is full.
    pub fn spawn_random_tile<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        let empty_cells: Vec<usize> = self
            .cells
            .iter()
            .enumerate()
            .filter(|(_, &v)| v == 0)
            .map(|(i, _)| i)
            .collect();

        if empty_cells.is_empty() {
            return None;
        }

        let idx = empty_cells[rng.gen_range(0..empty_cells.len())];
        self.cells[idx] = if rng.gen_bool(SPAWN_TWO_CHANCE) { 2 } else { 4 };
        Some(idx)
    }

    /// Whether moving toward `direction` would change the board.
    pub fn can_move(&self, direction: Direction) -> bool {
        let mut trial = *self;
        trial.attempt_move(direction).changed
    }

    /// True if any cell is empty or any two orthogonal neighbours can merge.
    pub fn has_any_move(&self) -> bool {
        if self.cells.contains(&0) {
            return true;
        }
        for row in 0..SIDE {
            for col in 0..SIDE {
                let i = row * SIDE + col;
                if col + 1 < SIDE && merge_of(self.cells[i], self.cells[i + 1]).is_some() {
                    return true;
                }
                if row + 1 < SIDE && merge_of(self.cells[i], self.cells[i + SIDE]).is_some() {
                    return true;
                }
            }
        }
        false
    }
}

/// The tile produced by merging `a` into `b`, or None if they cannot merge.
/// Equal tiles at the top of the `u32` range stay apart.
fn merge_of(a: u32, b: u32) -> Option<u32> {
    if a == 0 || a != b {
        return None;
    }
    a.checked_mul(2)
}

/// Compact a line toward index 0 and merge equal neighbours in one sweep.
fn collapse_line(line: [u32; SIDE], merged: &mut Vec<u32>) -> [u32; SIDE] {
    let mut out = [0u32; SIDE];
    let mut write = 0;
    let mut pending: Option<u32> = None;

    for v in line.into_iter().filter(|&v| v != 0) {
        match pending {
            Some(p) => {
                match merge_of(p, v) {
                    Some(sum) => {
                        out[write] = sum;
                        merged.push(sum);
                        pending = None;
                    }
                    None => {
                        out[write] = p;
                        pending = Some(v);
                    }
                }
                write += 1;
            }
            None => pending = Some(v),
        }
    }
    if let Some(p) = pending {
        out[write] = p;
    }
    out
}

impl From<Grid> for [u32; CELLS] {
    fn from(grid: Grid) -> Self {
        grid.cells
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Grid {{")?;
        for row in self.cells.chunks(SIDE) {
            for &val in row {
                if val == 0 {
                    write!(f, "    .")?;
                } else {
                    write!(f, "{:5}", val)?;
                }
            }
            writeln!(f)?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "+------+------+------+------+")?;
        for row in self.cells.chunks(SIDE) {
            write!(f, "|")?;
            for &val in row {
                if val == 0 {
                    write!(f, "      |")?;
                } else {
                    write!(f, "{:^6}|", val)?;
                }
            }
            writeln!(f)?;
            writeln!(f, "+------+------+------+------+")?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn grid(cells: [u32; CELLS]) -> Grid {
        Grid::from_cells(cells).unwrap()
    }

    fn collapse(line: [u32; SIDE]) -> ([u32; SIDE], Vec<u32>) {
        let mut merged = Vec::new();
        let out = collapse_line(line, &mut merged);
        (out, merged)
    }

    // -------------------------------------------------------------------------
    // Line collapse
    // -------------------------------------------------------------------------

    #[test]
    fn test_collapse_compacts_gaps() {
        assert_eq!(collapse([0, 2, 0, 4]), ([2, 4, 0, 0], vec![]));
        assert_eq!(collapse([0, 0, 0, 0]), ([0, 0, 0, 0], vec![]));
    }

    #[test]
    fn test_collapse_merges_pairs() {
        assert_eq!(collapse([2, 2, 0, 0]), ([4, 0, 0, 0], vec![4]));
        assert_eq!(collapse([2, 2, 4, 4]), ([4, 8, 0, 0], vec![4, 8]));
        assert_eq!(collapse([2, 0, 2, 0]), ([4, 0, 0, 0], vec![4]));
    }

    #[test]
    fn test_merged_tile_is_not_merged_again() {
        assert_eq!(collapse([4, 2, 2, 0]), ([4, 4, 0, 0], vec![4]));
        assert_eq!(collapse([2, 2, 2, 2]), ([4, 4, 0, 0], vec![4, 4]));
        assert_eq!(collapse([2, 2, 2, 0]), ([4, 2, 0, 0], vec![4]));
    }

    // -------------------------------------------------------------------------
    // Whole-board moves
    // -------------------------------------------------------------------------

    #[test]
    fn test_move_left() {
        let mut g = grid([2, 2, 0, 0, 0, 4, 4, 0, 2, 0, 2, 0, 8, 8, 8, 8]);
        let result = g.attempt_move(Direction::Left);
        assert_eq!(
            g.cells(),
            &[4, 0, 0, 0, 8, 0, 0, 0, 4, 0, 0, 0, 16, 16, 0, 0]
        );
        assert!(result.changed);
        assert_eq!(result.merged_values, vec![4, 8, 4, 16, 16]);
        assert_eq!(result.points_gained, 48);
        assert_eq!(result.gauge_gained, 25);
    }

    #[test]
    fn test_move_right() {
        let mut g = grid([2, 2, 0, 0, 0, 4, 4, 0, 2, 0, 2, 0, 8, 8, 8, 8]);
        g.attempt_move(Direction::Right);
        assert_eq!(
            g.cells(),
            &[0, 0, 0, 4, 0, 0, 0, 8, 0, 0, 0, 4, 0, 0, 16, 16]
        );
    }

    #[test]
    fn test_move_up() {
        let mut g = grid([2, 0, 2, 8, 2, 4, 0, 8, 0, 4, 2, 8, 0, 0, 0, 8]);
        let result = g.attempt_move(Direction::Up);
        assert_eq!(g.cells(), &[4, 8, 4, 16, 0, 0, 0, 16, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(result.points_gained, 4 + 8 + 4 + 32);
    }

    #[test]
    fn test_move_down() {
        let mut g = grid([2, 0, 2, 8, 2, 4, 0, 8, 0, 4, 2, 8, 0, 0, 0, 8]);
        g.attempt_move(Direction::Down);
        assert_eq!(g.cells(), &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 16, 4, 8, 4, 16]);
    }

    #[test]
    fn test_one_line_moving_is_enough_to_change_the_board() {
        // Rows 0-2 are already packed left; only row 3 moves.
        let mut g = grid([2, 4, 0, 0, 8, 0, 0, 0, 16, 32, 64, 0, 0, 0, 0, 2]);
        let result = g.attempt_move(Direction::Left);
        assert!(result.changed);
        assert!(result.merged_values.is_empty());
        assert_eq!(g.cells()[12], 2);
    }

    #[test]
    fn test_blocked_move_reports_unchanged() {
        let mut g = grid([2, 0, 0, 0, 4, 0, 0, 0, 8, 0, 0, 0, 16, 0, 0, 0]);
        let before = g;
        let result = g.attempt_move(Direction::Left);
        assert!(!result.changed);
        assert_eq!(result, MoveResult::default());
        assert_eq!(g, before);
    }

    // -------------------------------------------------------------------------
    // Spawning
    // -------------------------------------------------------------------------

    #[test]
    fn test_spawn_fills_an_empty_cell_with_two_or_four() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut g = Grid::empty();
        for n in 1..=CELLS {
            let idx = g.spawn_random_tile(&mut rng).unwrap();
            assert!(matches!(g.cells()[idx], 2 | 4));
            assert_eq!(g.tile_count(), n);
        }
        assert_eq!(g.spawn_random_tile(&mut rng), None);
    }

    #[test]
    fn test_spawn_is_deterministic_per_seed() {
        let a = Grid::new_game(&mut SmallRng::seed_from_u64(12345));
        let b = Grid::new_game(&mut SmallRng::seed_from_u64(12345));
        assert_eq!(a, b);
        assert_eq!(a.tile_count(), 2);
    }

    #[test]
    fn test_spawn_mostly_produces_twos() {
        let mut rng = SmallRng::seed_from_u64(99);
        let mut twos = 0;
        for _ in 0..1000 {
            let mut g = Grid::empty();
            let idx = g.spawn_random_tile(&mut rng).unwrap();
            if g.cells()[idx] == 2 {
                twos += 1;
            }
        }
        assert!((850..=950).contains(&twos), "twos = {twos}");
    }

    // -------------------------------------------------------------------------
    // Terminal detection
    // -------------------------------------------------------------------------

    #[test]
    fn test_single_tile_board_has_moves() {
        assert!(grid([2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]).has_any_move());
    }

    #[test]
    fn test_checkerboard_has_no_moves() {
        let g = grid([2, 4, 2, 4, 4, 2, 4, 2, 2, 4, 2, 4, 4, 2, 4, 2]);
        assert!(!g.has_any_move());
    }

    #[test]
    fn test_full_board_with_horizontal_pair_has_moves() {
        let g = grid([2, 2, 4, 8, 4, 8, 16, 32, 8, 16, 32, 64, 16, 32, 64, 128]);
        assert!(g.has_any_move());
    }

    #[test]
    fn test_full_board_with_vertical_pair_has_moves() {
        let g = grid([2, 4, 8, 16, 2, 8, 16, 32, 4, 16, 32, 64, 8, 32, 64, 128]);
        assert!(g.has_any_move());
    }

    #[test]
    fn test_from_cells_rejects_non_tiles() {
        let mut cells = [0u32; CELLS];
        cells[5] = 6;
        assert_eq!(
            Grid::from_cells(cells),
            Err(InvalidTile { index: 5, value: 6 })
        );
        cells[5] = 1;
        assert!(Grid::from_cells(cells).is_err());
    }

    #[test]
    fn test_merge_refuses_to_overflow() {
        let top = 1u32 << 31;
        let mut g = grid([
            top, top, 0, 0, //
            0, 0, 0, 0, //
            0, 0, 0, 0, //
            0, 0, 0, 0,
        ]);
        let result = g.attempt_move(Direction::Left);
        assert!(!result.changed);
        assert!(result.merged_values.is_empty());
        assert_eq!(result.points_gained, 0);
        assert_eq!(g.cells()[..2], [top, top]);

        // Full board whose only equal pair is the capped one.
        let mut cells = [0u32; CELLS];
        cells[0] = top;
        cells[1] = top;
        for (i, cell) in cells.iter_mut().enumerate().skip(2) {
            *cell = 1 << (i - 1);
        }
        let full = grid(cells);
        assert!(!full.has_any_move());
        for d in Direction::all() {
            assert!(!full.can_move(d));
        }
    }

    #[test]
    fn test_direction_from_u8() {
        assert_eq!(Direction::from_u8(0), Some(Direction::Up));
        assert_eq!(Direction::from_u8(3), Some(Direction::Right));
        assert_eq!(Direction::from_u8(4), None);
    }

    // -------------------------------------------------------------------------
    // Properties
    // -------------------------------------------------------------------------

    fn arb_tile() -> impl Strategy<Value = u32> {
        prop_oneof![3 => Just(0u32), 5 => (1u32..=11).prop_map(|e| 1 << e)]
    }

    fn arb_grid() -> impl Strategy<Value = Grid> {
        proptest::array::uniform16(arb_tile()).prop_map(grid)
    }

    fn arb_direction() -> impl Strategy<Value = Direction> {
        (0u8..4).prop_map(|d| Direction::from_u8(d).unwrap())
    }

    proptest! {
        #[test]
        fn test_unchanged_move_is_idempotent(g in arb_grid(), dir in arb_direction()) {
            let mut once = g;
            let first = once.attempt_move(dir);
            if !first.changed {
                prop_assert_eq!(once, g);
                let mut twice = once;
                let second = twice.attempt_move(dir);
                prop_assert!(!second.changed);
                prop_assert_eq!(twice, once);
            }
        }

        #[test]
        fn test_moves_conserve_tile_sum(g in arb_grid(), dir in arb_direction()) {
            let before: u64 = g.cells().iter().map(|&v| u64::from(v)).sum();
            let mut moved = g;
            let result = moved.attempt_move(dir);
            let after: u64 = moved.cells().iter().map(|&v| u64::from(v)).sum();
            prop_assert_eq!(before, after);
            prop_assert_eq!(
                result.points_gained,
                result.merged_values.iter().map(|&v| u64::from(v)).sum::<u64>()
            );
            prop_assert_eq!(result.gauge_gained, MERGE_GAUGE * result.merged_values.len() as u32);
            prop_assert_eq!(moved.tile_count() + result.merged_values.len(), g.tile_count());
            prop_assert!(Grid::from_cells(*moved.cells()).is_ok());
        }

        #[test]
        fn test_has_any_move_matches_a_changing_direction(g in arb_grid()) {
            let some_direction_changes = Direction::all()
                .into_iter()
                .any(|d| g.can_move(d));
            if g.tile_count() > 0 {
                prop_assert_eq!(g.has_any_move(), some_direction_changes);
            }
        }
    }
}
