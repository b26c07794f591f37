//! Column layout for a masonry-style grid.
//!
//! Two pieces: [`Breakpoints`] maps a container width to a column count, and
//! [`distribute`] deals a sequence of images into that many columns
//! round-robin. Image `i` lands in column `i % C` and keeps its relative order
//! inside the column, so reading the columns left to right, top to bottom,
//! row by row reproduces the input order.
//!
//! Column heights are not balanced by pixel height (image dimensions are not
//! known); round-robin keeps the item counts of any two columns within one.

use crate::config::LayoutConfig;

/// Width thresholds for the column count.
///
/// A width strictly below a breakpoint's width gets that breakpoint's column
/// count; widths at or above the last one get `max_columns`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoints {
    steps: Vec<(u32, usize)>,
    max_columns: usize,
}

impl Default for Breakpoints {
    fn default() -> Self {
        Self {
            steps: vec![(640, 2), (1024, 3), (1536, 4)],
            max_columns: 5,
        }
    }
}

impl From<&LayoutConfig> for Breakpoints {
    fn from(config: &LayoutConfig) -> Self {
        Self::new(
            config
                .breakpoints
                .iter()
                .map(|[width, cols]| (*width, *cols as usize))
                .collect(),
            config.max_columns as usize,
        )
    }
}

impl Breakpoints {
    /// Steps are sorted by width; zero column counts are raised to one.
    pub fn new(mut steps: Vec<(u32, usize)>, max_columns: usize) -> Self {
        steps.sort_by_key(|(width, _)| *width);
        for step in &mut steps {
            step.1 = step.1.max(1);
        }
        Self {
            steps,
            max_columns: max_columns.max(1),
        }
    }

    pub fn column_count(&self, width: u32) -> usize {
        self.steps
            .iter()
            .find(|(limit, _)| width < *limit)
            .map_or(self.max_columns, |(_, cols)| *cols)
    }
}

/// Deal `items` into `columns` columns round-robin.
///
/// Always returns exactly `max(columns, 1)` columns, some possibly empty.
pub fn distribute<T: Clone>(items: &[T], columns: usize) -> Vec<Vec<T>> {
    let columns = columns.max(1);
    let mut out: Vec<Vec<T>> = (0..columns)
        .map(|_| Vec::with_capacity(items.len() / columns + 1))
        .collect();
    for (i, item) in items.iter().enumerate() {
        out[i % columns].push(item.clone());
    }
    out
}

/// Column count state for one rendered grid.
///
/// Tracks the current count so a resize that stays within one breakpoint band
/// does not trigger a relayout.
#[derive(Debug, Clone)]
pub struct ColumnLayout {
    breakpoints: Breakpoints,
    columns: usize,
}

impl ColumnLayout {
    /// Start at the count for `initial_width`.
    pub fn new(breakpoints: Breakpoints, initial_width: u32) -> Self {
        let columns = breakpoints.column_count(initial_width);
        Self {
            breakpoints,
            columns,
        }
    }

    pub fn column_count(&self) -> usize {
        self.columns
    }

    /// Record a new container width. Returns `true` when the column count changed.
    pub fn observe_width(&mut self, width: u32) -> bool {
        let next = self.breakpoints.column_count(width);
        if next == self.columns {
            return false;
        }
        tracing::debug!(from = self.columns, to = next, width, "column count changed");
        self.columns = next;
        true
    }

    pub fn columns<T: Clone>(&self, items: &[T]) -> Vec<Vec<T>> {
        distribute(items, self.columns)
    }
}
