//! dabs-render: Output renderers
//!
//! Turns a computed [`dabs_core::PackageCollection`] into a Graphviz DOT
//! graph, a bar chart or a details listing. Text renderers produce styled
//! ratatui [`Line`](ratatui::text::Line)s so the same output feeds both the
//! interactive browser and [`terminal::modal_print`].

pub mod arrow_graph;
pub mod bar;
pub mod colors;
pub mod details;
pub mod dot;
pub mod error;
pub mod styles;
pub mod terminal;
pub mod types;

pub use arrow_graph::{ArrowGraph, ArrowOptions};
pub use bar::{BarChart, BarRow, Legend, bar_chart};
pub use details::{details, find_candidate, similarity};
pub use dot::{DepGraph, render_dot, wrap};
pub use error::RenderError;
pub use terminal::{OutputMode, modal_print, print_text};
pub use types::OutputConfig;
