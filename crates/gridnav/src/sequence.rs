//! Rows of sequence indices and a (row, column) cursor over them.

use crate::wrap::linear_cycle_navigation_wrap;

/// A contiguous run of sequence indices laid out on one visual row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridRow {
    /// First sequence index of the row.
    pub start: usize,
    /// Number of members. Always at least 1.
    pub len: usize,
}

impl GridRow {
    /// Sequence index of the last member.
    pub fn last(&self) -> usize {
        self.start + self.len - 1
    }

    /// True if `index` is on this row.
    pub fn contains(&self, index: usize) -> bool {
        (self.start..self.start + self.len).contains(&index)
    }
}

/// Cursor position after a move, with wraparound flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridWrappedValue {
    /// Sequence index under the cursor.
    pub value: usize,
    /// Row of the cursor.
    pub row: usize,
    /// Column of the cursor.
    pub column: usize,
    /// The move wrapped past the end of the grid.
    pub overflowed_max: bool,
    /// The move wrapped past the start of the grid.
    pub overflowed_min: bool,
}

/// A linear sequence split into rows, with a cursor.
///
/// Row starts are strictly increasing and contiguous: row `n + 1` starts right after the
/// last index of row `n`. [`Self::move_right`] and [`Self::move_left`] overflow into the
/// neighbouring row; [`Self::move_up`] and [`Self::move_down`] clamp the column to the
/// target row's length. Both wrap between the first and last row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GridSequence {
    /// Rows in visual order.
    rows: Vec<GridRow>,
    /// Cursor row.
    cursor_row: usize,
    /// Cursor column within the cursor row.
    cursor_column: usize,
}

impl GridSequence {
    /// Build rows from the vertical positions of members in visual order.
    ///
    /// A new row starts whenever a member sits lower than the one before it.
    pub fn from_positions<I>(ys: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut lengths: Vec<usize> = Vec::new();
        let mut previous: Option<f64> = None;
        for y in ys {
            match (previous, lengths.last_mut()) {
                (Some(prev), Some(len)) if y <= prev => *len += 1,
                _ => lengths.push(1),
            }
            previous = Some(y);
        }
        Self::from_row_lengths(&lengths)
    }

    /// Build rows from explicit row lengths. Zero-length rows are skipped.
    pub fn from_row_lengths(lengths: &[usize]) -> Self {
        let mut rows = Vec::with_capacity(lengths.len());
        let mut start = 0;
        for &len in lengths.iter().filter(|len| **len > 0) {
            rows.push(GridRow { start, len });
            start += len;
        }
        Self {
            rows,
            cursor_row: 0,
            cursor_column: 0,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the grid has no members.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total number of members.
    pub fn sequence_len(&self) -> usize {
        self.rows.last().map_or(0, |r| r.start + r.len)
    }

    /// Rows in visual order.
    pub fn rows(&self) -> &[GridRow] {
        &self.rows
    }

    /// Member counts per row.
    pub fn row_lengths(&self) -> Vec<usize> {
        self.rows.iter().map(|r| r.len).collect()
    }

    /// The row under the cursor.
    fn current(&self) -> Option<&GridRow> {
        self.rows.get(self.cursor_row)
    }

    /// Sequence index under the cursor, if the grid has members.
    pub fn cursor(&self) -> Option<usize> {
        self.current().map(|r| r.start + self.cursor_column)
    }

    /// Cursor row.
    pub fn cursor_row(&self) -> usize {
        self.cursor_row
    }

    /// Cursor column.
    pub fn cursor_column(&self) -> usize {
        self.cursor_column
    }

    /// The cursor as a [`GridWrappedValue`] with no overflow.
    pub fn cursor_wrapped(&self) -> Option<GridWrappedValue> {
        self.wrapped(false, false)
    }

    /// Current cursor with the given overflow flags.
    fn wrapped(&self, overflowed_max: bool, overflowed_min: bool) -> Option<GridWrappedValue> {
        Some(GridWrappedValue {
            value: self.cursor()?,
            row: self.cursor_row,
            column: self.cursor_column,
            overflowed_max,
            overflowed_min,
        })
    }

    /// Move the cursor to `row`, clamping the column to its length.
    fn enter_row(&mut self, row: usize) {
        self.cursor_row = row;
        if let Some(r) = self.rows.get(row) {
            self.cursor_column = self.cursor_column.min(r.len - 1);
        }
    }

    /// Index of the last row.
    fn last_row(&self) -> isize {
        self.len() as isize - 1
    }

    /// Move one row down, wrapping from the last row to the first.
    pub fn move_down(&mut self) -> Option<GridWrappedValue> {
        if self.is_empty() {
            return None;
        }
        let w = linear_cycle_navigation_wrap(self.cursor_row as isize, self.last_row(), 1, 0);
        self.enter_row(w.value as usize);
        self.wrapped(w.overflowed_max, w.overflowed_min)
    }

    /// Move one row up, wrapping from the first row to the last.
    pub fn move_up(&mut self) -> Option<GridWrappedValue> {
        if self.is_empty() {
            return None;
        }
        let w = linear_cycle_navigation_wrap(self.cursor_row as isize, self.last_row(), -1, 0);
        self.enter_row(w.value as usize);
        self.wrapped(w.overflowed_max, w.overflowed_min)
    }

    /// Move one member right, continuing at the start of the next row.
    pub fn move_right(&mut self) -> Option<GridWrappedValue> {
        let len = self.current()?.len;
        if self.cursor_column + 1 < len {
            self.cursor_column += 1;
            return self.wrapped(false, false);
        }
        self.cursor_column = 0;
        let moved = self.move_down()?;
        self.cursor_column = 0;
        self.wrapped(moved.overflowed_max, moved.overflowed_min)
    }

    /// Move one member left, continuing at the end of the previous row.
    pub fn move_left(&mut self) -> Option<GridWrappedValue> {
        self.current()?;
        if self.cursor_column > 0 {
            self.cursor_column -= 1;
            return self.wrapped(false, false);
        }
        let moved = self.move_up()?;
        self.cursor_column = self.current()?.len - 1;
        self.wrapped(moved.overflowed_max, moved.overflowed_min)
    }

    /// Move to the first member of the cursor row.
    pub fn move_row_start(&mut self) -> Option<GridWrappedValue> {
        self.current()?;
        self.cursor_column = 0;
        self.wrapped(false, false)
    }

    /// Move to the last member of the cursor row.
    pub fn move_row_end(&mut self) -> Option<GridWrappedValue> {
        self.cursor_column = self.current()?.len - 1;
        self.wrapped(false, false)
    }

    /// Move to the first row, keeping the column where possible.
    pub fn focus_first_row(&mut self) -> Option<GridWrappedValue> {
        self.current()?;
        self.enter_row(0);
        self.wrapped(false, false)
    }

    /// Move to the last row, keeping the column where possible.
    pub fn focus_last_row(&mut self) -> Option<GridWrappedValue> {
        self.current()?;
        self.enter_row(self.len() - 1);
        self.wrapped(false, false)
    }

    /// Move to `row`, keeping the column where possible. False if out of range.
    pub fn set_current_row(&mut self, row: usize) -> bool {
        if row >= self.len() {
            return false;
        }
        self.enter_row(row);
        true
    }

    /// Move to `column` of the cursor row. False if out of range.
    pub fn set_current_row_column(&mut self, column: usize) -> bool {
        match self.current() {
            Some(r) if column < r.len => {
                self.cursor_column = column;
                true
            }
            _ => false,
        }
    }

    /// Clamp `index` into the valid sequence range.
    pub fn clamp_sequence_index(&self, index: usize) -> usize {
        index.min(self.sequence_len().saturating_sub(1))
    }

    /// Put the cursor on sequence `index`. False if out of range.
    ///
    /// The owning row is found by scanning from whichever end of the grid is closer to
    /// `index`, visiting each row at most once.
    pub fn set_cursor(&mut self, index: usize) -> bool {
        let total = self.sequence_len();
        if index >= total {
            return false;
        }
        let from_start = index <= total / 2;
        let n = self.rows.len();
        for step in 0..n {
            let row = if from_start { step } else { n - 1 - step };
            let r = self.rows[row];
            if r.contains(index) {
                self.cursor_row = row;
                self.cursor_column = index - r.start;
                return true;
            }
        }
        false
    }

    /// Row that holds sequence `index`.
    pub fn row_of(&self, index: usize) -> Option<usize> {
        self.rows.iter().position(|r| r.contains(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_from_positions() {
        let g = GridSequence::from_positions([0.0, 0.0, 0.0, 40.0, 40.0, 80.0]);
        assert_eq!(g.row_lengths(), vec![3, 2, 1]);
        assert_eq!(g.rows()[2], GridRow { start: 5, len: 1 });
        assert_eq!(g.sequence_len(), 6);
        assert!(GridSequence::from_positions([]).is_empty());
    }

    #[test]
    fn right_overflows_and_wraps() {
        let mut g = GridSequence::from_row_lengths(&[3, 2]);
        let values: Vec<_> = (0..5)
            .filter_map(|_| g.move_right())
            .map(|w| (w.value, w.overflowed_max))
            .collect();
        assert_eq!(
            values,
            vec![(1, false), (2, false), (3, false), (4, false), (0, true)]
        );
    }

    #[test]
    fn left_overflows_and_wraps() {
        let mut g = GridSequence::from_row_lengths(&[3, 2]);
        let w = g.move_left().expect("non-empty");
        assert_eq!((w.value, w.row, w.column, w.overflowed_min), (4, 1, 1, true));
        assert_eq!(g.move_left().map(|w| w.value), Some(3));
        assert_eq!(g.move_left().map(|w| w.value), Some(2));
    }

    #[test]
    fn vertical_moves_clamp_the_column() {
        let mut g = GridSequence::from_row_lengths(&[3, 2]);
        assert!(g.set_cursor(2));
        let w = g.move_down().expect("non-empty");
        assert_eq!((w.value, w.column, w.overflowed_max), (4, 1, false));
        let w = g.move_down().expect("non-empty");
        assert_eq!((w.value, w.row, w.overflowed_max), (1, 0, true));
        let w = g.move_up().expect("non-empty");
        assert_eq!((w.value, w.row, w.overflowed_min), (4, 1, true));
    }

    #[test]
    fn row_helpers() {
        let mut g = GridSequence::from_row_lengths(&[4, 4, 2]);
        assert!(g.set_cursor(6));
        assert_eq!(g.move_row_start().map(|w| w.value), Some(4));
        assert_eq!(g.move_row_end().map(|w| w.value), Some(7));
        assert_eq!(g.focus_last_row().map(|w| w.value), Some(9));
        assert_eq!(g.focus_first_row().map(|w| w.value), Some(1));
        assert!(g.set_current_row(1));
        assert!(!g.set_current_row(3));
        assert!(g.set_current_row_column(3));
        assert!(!g.set_current_row_column(4));
        assert_eq!(g.cursor(), Some(7));
    }

    #[test]
    fn set_cursor_finds_rows_from_either_end() {
        let mut g = GridSequence::from_row_lengths(&[2, 3, 1, 4]);
        for index in 0..g.sequence_len() {
            assert!(g.set_cursor(index));
            assert_eq!(g.cursor(), Some(index));
            assert_eq!(Some(g.cursor_row()), g.row_of(index));
        }
        assert!(!g.set_cursor(10));
        assert_eq!(g.clamp_sequence_index(42), 9);
    }

    #[test]
    fn empty_grid_does_not_move() {
        let mut g = GridSequence::default();
        assert_eq!(g.move_right(), None);
        assert_eq!(g.move_up(), None);
        assert_eq!(g.cursor(), None);
        assert!(!g.set_cursor(0));
        assert_eq!(g.clamp_sequence_index(3), 0);
    }
}
