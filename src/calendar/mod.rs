//! Calendar timeline engine: maps a task snapshot onto month/week/day grids
//! and lays out occupancy bars and the completion pie chart.
//!
//! Everything here is a pure function of the task snapshot and the
//! navigation state; nothing in this module mutates a task or fails.

pub mod grid;
pub mod layout;
pub mod navigation;
pub mod span;
pub mod summary;

use serde::{Deserialize, Serialize};

pub use grid::{CalendarCell, SystemClock};
pub use layout::{layout_cell, priority_color, CellLayout, Rgb, TimelineBar};
pub use navigation::{NavigationState, Step};
pub use span::occupancy_span;
pub use summary::summarize;

/// Calendar zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Month,
    Week,
    Day,
}

impl Granularity {
    pub fn label(&self) -> &'static str {
        match self {
            Granularity::Month => "Month",
            Granularity::Week => "Week",
            Granularity::Day => "Day",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Granularity::Month => Granularity::Week,
            Granularity::Week => Granularity::Day,
            Granularity::Day => Granularity::Month,
        }
    }
}
