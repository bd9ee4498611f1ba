//! Command-line front end for netanalyze
//!
//! Argument parsing, the analysis session driving the capture engine and the
//! CSV/JSON exporters. The `netanalyze` binary is a thin wrapper over
//! [`session::run`].

pub mod args;
pub mod export;
pub mod session;

pub use args::Cli;
pub use export::{export_csv, export_json, write_csv, write_json};
pub use session::{
    format_summary, interrupt_flag, replay_file, run, start_live, wait_for_capture,
};
