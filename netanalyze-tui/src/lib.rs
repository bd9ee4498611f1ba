//! Terminal dashboard for netanalyze
//!
//! Renders the statistics engine's published snapshots with ratatui: protocol
//! and conversation tables, top addresses, a bandwidth sparkline and the most
//! recent packets. `q` or `Esc` closes it.

pub mod app;
pub mod runner;

pub use app::{format_bytes, format_rate, App};
pub use runner::{run_dashboard, DashboardConfig, TICK_RATE};
