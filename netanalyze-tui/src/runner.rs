//! TUI Runner
//!
//! Manages terminal setup/teardown and the refresh loop: every tick it
//! advances the bandwidth estimate, republishes the statistics snapshot and
//! redraws the dashboard from it.

use crate::app::App;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use netanalyze_capture::{CaptureEngine, StatsEngine};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Interval between two redraws
pub const TICK_RATE: Duration = Duration::from_millis(200);

/// What the dashboard shows and for how long
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Source label for the header
    pub source: String,
    /// Filter expression for the header
    pub filter: String,
    /// Rows in the ranked host and pair tables
    pub top_n: usize,
    /// Stop refreshing after this long; the last snapshot stays on screen
    pub time_limit: Option<Duration>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            source: String::new(),
            filter: String::new(),
            top_n: 10,
            time_limit: None,
        }
    }
}

/// Run the dashboard until the user quits
///
/// The capture keeps running on its own thread. Once it has stopped, or the
/// time limit has passed and the engine was stopped here, the dashboard
/// freezes on the last snapshot and is marked finished.
pub fn run_dashboard(
    stats: Arc<StatsEngine>,
    engine: &mut CaptureEngine,
    config: DashboardConfig,
) -> io::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config.source.clone(), config.filter.clone());
    let result = run_app(&mut terminal, &mut app, &stats, engine, &config);

    // Cleanup terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Main application loop
fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    stats: &StatsEngine,
    engine: &mut CaptureEngine,
    config: &DashboardConfig,
) -> io::Result<()> {
    loop {
        tick(app, stats, engine, config)?;
        app.render(terminal)?;

        if event::poll(TICK_RATE)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_input(key);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Advance the statistics and hand the new snapshot to the app
///
/// Once the time limit passes the engine is stopped, so the frozen view
/// matches what gets exported afterwards.
fn tick(
    app: &mut App,
    stats: &StatsEngine,
    engine: &mut CaptureEngine,
    config: &DashboardConfig,
) -> io::Result<()> {
    if app.finished {
        return Ok(());
    }

    let timed_out = config
        .time_limit
        .map_or(false, |limit| app.elapsed() >= limit);
    if timed_out {
        debug!("Dashboard time limit of {:?} reached", config.time_limit);
        engine
            .stop()
            .map_err(|e| io::Error::other(e.to_string()))?;
    }

    stats.refresh_bandwidth();
    stats.refresh_views(config.top_n);
    app.update(stats.snapshot(), timed_out || !engine.is_running());
    Ok(())
}
