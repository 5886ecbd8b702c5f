//! Collision-avoiding placement of new items.
//!
//! The search walks a square spiral of grid cells outward from the hint and returns the
//! first cell whose rectangle is free. It is fully deterministic: the same hint, size and
//! occupied set always give the same answer.

use crate::geometry::{Point, Rect, Size};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpiralSearch {
    pub grid_size: f64,
    pub max_radius: f64,
}

impl SpiralSearch {
    pub fn new(grid_size: f64, max_radius: f64) -> Self {
        SpiralSearch { grid_size, max_radius }
    }

    /// Finds a grid position for a `width` x `height` rectangle near `hint`.
    ///
    /// With `centered` the returned position is the rectangle's center, otherwise its
    /// top-left corner; in the latter case the hint is still read as the desired center.
    /// `is_occupied` receives the candidate rectangle. When nothing within `max_radius`
    /// is free the snapped start position is returned as is.
    pub fn find_placement<F>(&self, width: f64, height: f64, mut is_occupied: F, hint: Point, centered: bool) -> Point
    where
        F: FnMut(&Rect) -> bool,
    {
        let grid = self.grid_size;
        let size = Size::new(width, height);
        let start = if centered {
            hint.snapped(grid)
        } else {
            (hint - size.half()).snapped(grid)
        };

        let candidate_rect = |position: Point| {
            if centered {
                Rect::from_center(position, size)
            } else {
                Rect::new(position, size)
            }
        };

        if !is_occupied(&candidate_rect(start)) {
            return start;
        }

        let max_cells = self.max_radius / grid;
        let max_cells_sq = max_cells * max_cells;

        let (mut x, mut y) = (0_i64, 0_i64);
        let (mut dx, mut dy) = (0_i64, -1_i64);
        while ((x * x + y * y) as f64) < max_cells_sq {
            if x == y || (x < 0 && x == -y) || (x > 0 && x == 1 - y) {
                (dx, dy) = (-dy, dx);
            }
            x += dx;
            y += dy;

            let position = Point::new(start.x + x as f64 * grid, start.y + y as f64 * grid);
            if !is_occupied(&candidate_rect(position)) {
                return position;
            }
        }

        tracing::warn!(x = start.x, y = start.y, "no free position found, placing at the hint");
        start
    }
}
