use std::time::{Duration, Instant};

pub(crate) const FRAME: Duration = Duration::from_millis(16);
pub(crate) const PAGE_ROWS: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Keyboard cursor over a grid whose size the renderer supplies each frame.
#[derive(Debug)]
pub(crate) struct GridFocusModel {
    row: usize,
    column: usize,
    rows: usize,
    columns: usize,
    wrap: bool,
    page_rows: usize,
    last_move: Option<Instant>,
    queued: Option<Direction>,
}

impl Default for GridFocusModel {
    fn default() -> Self {
        Self::new(true, PAGE_ROWS)
    }
}

impl GridFocusModel {
    pub(crate) fn new(wrap: bool, page_rows: usize) -> Self {
        Self {
            row: 0,
            column: 0,
            rows: 0,
            columns: 0,
            wrap,
            page_rows: page_rows.max(1),
            last_move: None,
            queued: None,
        }
    }

    pub(crate) fn position(&self) -> (usize, usize) {
        (self.row, self.column)
    }

    pub(crate) fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.columns)
    }

    pub(crate) fn set_dimensions(&mut self, rows: usize, columns: usize) {
        self.rows = rows;
        self.columns = columns;
        self.clamp();
    }

    /// Moves at most once per frame; a move inside the frame replaces any
    /// earlier queued one and lands on the next `tick`.
    pub(crate) fn request_move(&mut self, direction: Direction, now: Instant) {
        match self.last_move {
            Some(last) if now.saturating_duration_since(last) < FRAME => {
                self.queued = Some(direction);
            }
            _ => {
                self.queued = None;
                self.last_move = Some(now);
                self.move_now(direction);
            }
        }
    }

    pub(crate) fn tick(&mut self, now: Instant) {
        let Some(deadline) = self.next_deadline() else {
            return;
        };
        if now < deadline {
            return;
        }
        if let Some(direction) = self.queued.take() {
            self.last_move = Some(now);
            self.move_now(direction);
        }
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.queued?;
        self.last_move.map(|last| last + FRAME)
    }

    pub(crate) fn move_now(&mut self, direction: Direction) {
        if self.is_empty() {
            return;
        }
        let last_row = self.rows - 1;
        let last_column = self.columns - 1;
        match direction {
            Direction::Up => self.row = self.row.saturating_sub(1),
            Direction::Down => self.row = (self.row + 1).min(last_row),
            Direction::Left => {
                if self.column > 0 {
                    self.column -= 1;
                } else if self.wrap && self.row > 0 {
                    self.row -= 1;
                    self.column = last_column;
                }
            }
            Direction::Right => {
                if self.column < last_column {
                    self.column += 1;
                } else if self.wrap && self.row < last_row {
                    self.row += 1;
                    self.column = 0;
                }
            }
        }
    }

    pub(crate) fn page_up(&mut self) {
        self.row = self.row.saturating_sub(self.page_rows);
        self.clamp();
    }

    pub(crate) fn page_down(&mut self) {
        self.row = self.row.saturating_add(self.page_rows);
        self.clamp();
    }

    pub(crate) fn move_to_row_start(&mut self) {
        self.column = 0;
    }

    pub(crate) fn move_to_row_end(&mut self) {
        self.column = self.columns.saturating_sub(1);
    }

    pub(crate) fn move_to_first_row(&mut self) {
        self.row = 0;
    }

    pub(crate) fn move_to_last_row(&mut self) {
        self.row = self.rows.saturating_sub(1);
    }

    /// Puts the cursor on `row`, keeping its column.
    pub(crate) fn move_to_row(&mut self, row: usize) {
        self.row = row;
        self.clamp();
    }

    pub(crate) fn is_focused(&self, row: usize, column: usize) -> bool {
        !self.is_empty() && self.row == row && self.column == column
    }

    fn is_empty(&self) -> bool {
        self.rows == 0 || self.columns == 0
    }

    fn clamp(&mut self) {
        self.row = self.row.min(self.rows.saturating_sub(1));
        self.column = self.column.min(self.columns.saturating_sub(1));
    }
}

pub(crate) fn cell_id(row: usize, column: usize) -> String {
    format!("cell-{row}-{column}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn grid(rows: usize, columns: usize, wrap: bool) -> GridFocusModel {
        let mut focus = GridFocusModel::new(wrap, PAGE_ROWS);
        focus.set_dimensions(rows, columns);
        focus
    }

    #[test]
    fn left_at_column_zero_without_wrap_stays() {
        let mut focus = grid(3, 4, false);
        focus.move_now(Direction::Down);
        focus.move_now(Direction::Left);
        assert_eq!(focus.position(), (1, 0));
    }

    #[test]
    fn left_at_column_zero_with_wrap_goes_to_previous_row_end() {
        let mut focus = grid(3, 4, true);
        focus.move_now(Direction::Down);
        focus.move_now(Direction::Left);
        assert_eq!(focus.position(), (0, 3));
    }

    #[test]
    fn right_at_row_end_with_wrap_goes_to_next_row_start() {
        let mut focus = grid(3, 4, true);
        focus.move_to_row_end();
        focus.move_now(Direction::Right);
        assert_eq!(focus.position(), (1, 0));
    }

    #[test]
    fn grid_corners_never_wrap() {
        let mut focus = grid(2, 2, true);
        focus.move_now(Direction::Left);
        focus.move_now(Direction::Up);
        assert_eq!(focus.position(), (0, 0));

        focus.move_to_last_row();
        focus.move_to_row_end();
        focus.move_now(Direction::Right);
        focus.move_now(Direction::Down);
        assert_eq!(focus.position(), (1, 1));
    }

    #[test]
    fn shrinking_the_grid_clamps_the_cursor() {
        let mut focus = grid(20, 8, true);
        focus.move_to_last_row();
        focus.move_to_row_end();
        assert_eq!(focus.position(), (19, 7));

        focus.set_dimensions(5, 3);
        assert_eq!(focus.position(), (4, 2));

        focus.set_dimensions(0, 0);
        assert_eq!(focus.position(), (0, 0));
        assert!(!focus.is_focused(0, 0));
        focus.move_now(Direction::Right);
        assert_eq!(focus.position(), (0, 0));
    }

    #[test]
    fn paging_jumps_ten_rows_clamped() {
        let mut focus = grid(25, 3, true);
        focus.page_down();
        assert_eq!(focus.position(), (10, 0));
        focus.page_down();
        focus.page_down();
        assert_eq!(focus.position(), (24, 0));
        focus.page_up();
        assert_eq!(focus.position(), (14, 0));
        focus.page_up();
        focus.page_up();
        assert_eq!(focus.position(), (0, 0));
    }

    #[test]
    fn home_and_end_keep_or_jump_rows() {
        let mut focus = grid(5, 6, true);
        focus.move_now(Direction::Down);
        focus.move_now(Direction::Right);
        focus.move_to_row_end();
        assert_eq!(focus.position(), (1, 5));
        focus.move_to_row_start();
        assert_eq!(focus.position(), (1, 0));
        focus.move_to_last_row();
        assert_eq!(focus.position(), (4, 0));
        focus.move_to_first_row();
        assert_eq!(focus.position(), (0, 0));
    }

    #[test]
    fn move_to_row_keeps_column_and_clamps() {
        let mut focus = grid(4, 3, false);
        focus.move_now(Direction::Right);
        focus.move_to_row(2);
        assert_eq!(focus.position(), (2, 1));
        focus.move_to_row(9);
        assert_eq!(focus.position(), (3, 1));
    }

    #[test]
    fn moves_inside_one_frame_are_coalesced() {
        let start = Instant::now();
        let mut focus = grid(10, 10, false);

        focus.request_move(Direction::Right, start);
        assert_eq!(focus.position(), (0, 1));

        focus.request_move(Direction::Right, start + Duration::from_millis(4));
        focus.request_move(Direction::Down, start + Duration::from_millis(8));
        assert_eq!(focus.position(), (0, 1));
        assert_eq!(focus.next_deadline(), Some(start + FRAME));

        focus.tick(start + Duration::from_millis(10));
        assert_eq!(focus.position(), (0, 1));
        focus.tick(start + FRAME);
        assert_eq!(focus.position(), (1, 1));
        assert_eq!(focus.next_deadline(), None);

        focus.request_move(Direction::Right, start + Duration::from_millis(40));
        assert_eq!(focus.position(), (1, 2));
    }

    #[test]
    fn cell_ids_are_unique() {
        let mut seen = HashSet::new();
        for row in 0..12 {
            for column in 0..12 {
                assert!(seen.insert(cell_id(row, column)));
            }
        }
        assert_eq!(cell_id(1, 11), "cell-1-11");
        assert_ne!(cell_id(11, 1), cell_id(1, 11));
    }

    #[test]
    fn focus_predicate_matches_position() {
        let mut focus = grid(3, 3, true);
        focus.move_now(Direction::Right);
        assert!(focus.is_focused(0, 1));
        assert!(!focus.is_focused(1, 0));
    }
}
