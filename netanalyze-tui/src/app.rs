//! Dashboard state and rendering
//!
//! The dashboard never touches the statistics engine. The runner hands it a
//! published [`Snapshot`] each tick and it renders only that.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use netanalyze_capture::Snapshot;
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Sparkline, Table},
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Application state
pub struct App {
    /// Source label shown in the header (interface or file)
    pub source: String,
    /// Active filter expression, empty for none
    pub filter: String,
    /// Latest published statistics
    pub snapshot: Arc<Snapshot>,
    /// Capture has ended (end of file, count limit or error)
    pub finished: bool,
    /// Should the app quit?
    pub should_quit: bool,
    started_at: Instant,
    finished_after: Option<Duration>,
}

impl App {
    pub fn new(source: impl Into<String>, filter: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            filter: filter.into(),
            snapshot: Arc::new(Snapshot::default()),
            finished: false,
            should_quit: false,
            started_at: Instant::now(),
            finished_after: None,
        }
    }

    /// Replace the displayed snapshot
    pub fn update(&mut self, snapshot: Arc<Snapshot>, finished: bool) {
        self.snapshot = snapshot;
        self.finished = finished;
        if finished && self.finished_after.is_none() {
            self.finished_after = Some(self.started_at.elapsed());
        }
    }

    /// Time since the dashboard opened, frozen once the capture finished
    pub fn elapsed(&self) -> Duration {
        self.finished_after
            .unwrap_or_else(|| self.started_at.elapsed())
    }

    /// Handle keyboard input
    pub fn handle_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            _ => {}
        }
    }

    /// Render the UI
    pub fn render<B: Backend>(&self, terminal: &mut Terminal<B>) -> io::Result<()> {
        terminal.draw(|f| self.render_dashboard(f))?;
        Ok(())
    }

    pub fn render_dashboard(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(7),
                Constraint::Min(6),
                Constraint::Length(3),
            ])
            .split(f.size());

        self.render_header(f, chunks[0]);

        let tables = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Percentage(50),
            ])
            .split(chunks[1]);
        self.render_transport(f, tables[0]);
        self.render_application(f, tables[1]);
        self.render_pairs(f, tables[2]);

        let middle = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[2]);
        self.render_hosts(f, middle[0]);
        self.render_bandwidth(f, middle[1]);

        self.render_recent(f, chunks[3]);
        self.render_status_bar(f, chunks[4]);
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let filter = if self.filter.is_empty() {
            "none"
        } else {
            self.filter.as_str()
        };

        let header = Paragraph::new(Line::from(vec![
            Span::styled(
                "netanalyze ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("| Source: {} | Filter: {} | ", self.source, filter)),
            Span::styled(
                format!(
                    "Packets: {} | Bytes: {}",
                    self.snapshot.total_packets,
                    format_bytes(self.snapshot.total_bytes)
                ),
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
            ),
        ]))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));

        f.render_widget(header, area);
    }

    fn render_transport(&self, f: &mut Frame, area: Rect) {
        let rows = self.snapshot.transport.iter().map(|row| {
            Row::new(vec![
                Cell::from(row.protocol.to_string()),
                Cell::from(row.packets.to_string()),
                Cell::from(format!("{:.1}%", row.percent)),
            ])
        });

        let table = Table::new(
            rows,
            [
                Constraint::Length(8),
                Constraint::Length(10),
                Constraint::Min(6),
            ],
        )
        .header(header_row(["Proto", "Packets", "Share"]))
        .block(Block::default().borders(Borders::ALL).title("Transport"));

        f.render_widget(table, area);
    }

    fn render_application(&self, f: &mut Frame, area: Rect) {
        let rows = self.snapshot.application.iter().map(|row| {
            Row::new(vec![
                Cell::from(row.protocol.to_string()),
                Cell::from(row.packets.to_string()),
                Cell::from(format_bytes(row.bytes)),
            ])
        });

        let table = Table::new(
            rows,
            [
                Constraint::Length(8),
                Constraint::Length(10),
                Constraint::Min(8),
            ],
        )
        .header(header_row(["Proto", "Packets", "Payload"]))
        .block(Block::default().borders(Borders::ALL).title("Application"));

        f.render_widget(table, area);
    }

    fn render_pairs(&self, f: &mut Frame, area: Rect) {
        let rows = self.snapshot.top_pairs.iter().map(|pair| {
            Row::new(vec![
                Cell::from(pair.src.to_string()),
                Cell::from(pair.dst.to_string()),
                Cell::from(pair.packets.to_string()),
                Cell::from(format_bytes(pair.bytes)),
            ])
        });

        let table = Table::new(
            rows,
            [
                Constraint::Percentage(35),
                Constraint::Percentage(35),
                Constraint::Percentage(12),
                Constraint::Percentage(18),
            ],
        )
        .header(header_row(["Source", "Destination", "Packets", "Bytes"]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Top Conversations"),
        );

        f.render_widget(table, area);
    }

    fn render_hosts(&self, f: &mut Frame, area: Rect) {
        let rows = self.snapshot.top_hosts.iter().map(|host| {
            Row::new(vec![
                Cell::from(host.ip.to_string()),
                Cell::from(host.packets_sent.to_string()),
                Cell::from(host.packets_received.to_string()),
                Cell::from(format_bytes(host.bytes_sent + host.bytes_received)),
            ])
        });

        let table = Table::new(
            rows,
            [
                Constraint::Percentage(40),
                Constraint::Percentage(18),
                Constraint::Percentage(18),
                Constraint::Percentage(24),
            ],
        )
        .header(header_row(["Address", "Sent", "Recv", "Bytes"]))
        .block(Block::default().borders(Borders::ALL).title("Top IPs"));

        f.render_widget(table, area);
    }

    fn render_bandwidth(&self, f: &mut Frame, area: Rect) {
        let width = area.width.saturating_sub(2) as usize;
        let history = &self.snapshot.bandwidth_history;
        let data: Vec<u64> = history[history.len().saturating_sub(width)..]
            .iter()
            .map(|sample| sample.bytes_per_second as u64)
            .collect();

        let title = format!(
            "Bandwidth {} (peak {})",
            format_rate(self.snapshot.smoothed_bandwidth),
            format_rate(self.snapshot.max_bandwidth)
        );

        let sparkline = Sparkline::default()
            .block(Block::default().borders(Borders::ALL).title(title))
            .data(&data)
            .style(Style::default().fg(Color::Green));

        f.render_widget(sparkline, area);
    }

    fn render_recent(&self, f: &mut Frame, area: Rect) {
        // newest on top
        let rows = self.snapshot.recent_packets.iter().rev().map(|packet| {
            Row::new(vec![
                Cell::from(format!("{:.3}", packet.time)),
                Cell::from(packet.ip_version.to_string()),
                Cell::from(packet.transport.to_string()),
                Cell::from(packet.application.to_string()),
                Cell::from(format!("{}:{}", packet.src, packet.src_port)),
                Cell::from(format!("{}:{}", packet.dst, packet.dst_port)),
                Cell::from(packet.length.to_string()),
            ])
        });

        let table = Table::new(
            rows,
            [
                Constraint::Length(10),
                Constraint::Length(5),
                Constraint::Length(7),
                Constraint::Length(8),
                Constraint::Percentage(30),
                Constraint::Percentage(30),
                Constraint::Length(7),
            ],
        )
        .header(header_row([
            "Time", "IP", "Proto", "App", "Source", "Destination", "Length",
        ]))
        .block(Block::default().borders(Borders::ALL).title("Recent Packets"));

        f.render_widget(table, area);
    }

    pub fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let state = if self.finished {
            Span::styled(
                "Capture finished",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled("Capturing", Style::default().fg(Color::Green))
        };

        let status = Paragraph::new(Line::from(vec![
            state,
            Span::styled(
                format!(" | Elapsed: {}s", self.elapsed().as_secs()),
                Style::default().fg(Color::Gray),
            ),
            Span::styled(" | Press q to quit", Style::default().fg(Color::Gray)),
        ]))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));

        f.render_widget(status, area);
    }
}

fn header_row<const N: usize>(titles: [&'static str; N]) -> Row<'static> {
    Row::new(titles).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
}

/// Human-readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Human-readable byte rate
pub fn format_rate(bytes_per_second: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_second.max(0.0) as u64))
}
