//! CLI argument parsing

use clap::Parser;
use netanalyze_capture::{CaptureConfig, DEFAULT_RECENT_LIMIT};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "netanalyze")]
#[command(
    version,
    about = "Network traffic analyzer",
    long_about = "Captures and analyzes network traffic from live interfaces or offline \
                  pcap files. Provides protocol statistics, top talkers and bandwidth usage.",
    after_help = "Examples:\n  \
                  netanalyze -i eth0 -n 5\n  \
                  netanalyze -i any -f proto:dns\n  \
                  netanalyze --pcap traffic.pcap --json result.json"
)]
pub struct Cli {
    /// Network interface to capture packets from (e.g. eth0, wlan0, any)
    #[arg(short = 'i', long, default_value = "any")]
    pub interface: String,

    /// Read packets from an offline pcap file
    #[arg(short = 'r', long, value_name = "FILE")]
    pub pcap: Option<PathBuf>,

    /// Number of packets to capture (0 = unlimited)
    #[arg(short = 'c', long, default_value = "0")]
    pub count: u64,

    /// Traffic filter, repeatable: proto:<tcp|udp|icmp|dns>, src:<ip>, dst:<ip>, port:<n>, ip:<ip|ip6>
    #[arg(short = 'f', long = "filter", value_name = "KIND:VALUE")]
    pub filters: Vec<String>,

    /// Rows shown in the ranked tables
    #[arg(short = 'n', long, default_value = "10")]
    pub limit: usize,

    /// Recent packets kept for the packet list
    #[arg(long, default_value_t = DEFAULT_RECENT_LIMIT)]
    pub recent: usize,

    /// Live capture duration in seconds (0 = until stopped)
    #[arg(short = 't', long, value_name = "SECONDS", default_value = "0")]
    pub time: u64,

    /// Export analysis results to CSV file
    #[arg(long, value_name = "FILE")]
    pub csv: Option<PathBuf>,

    /// Export analysis results to JSON file
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// List capture interfaces and exit
    #[arg(short = 'L', long)]
    pub list_interfaces: bool,

    /// Run without the dashboard and log a summary instead
    #[arg(long)]
    pub headless: bool,

    /// Verbose output (-v, -vv, -vvv for increasing verbosity)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Maximum log level for the verbosity count
    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    /// Live capture duration, `None` for unlimited
    pub fn time_limit(&self) -> Option<Duration> {
        (self.time > 0).then(|| Duration::from_secs(self.time))
    }

    /// Label of the capture source for display
    pub fn source_label(&self) -> String {
        match &self.pcap {
            Some(path) => path.display().to_string(),
            None => self.interface.clone(),
        }
    }

    /// Capture configuration for an already built filter expression
    pub fn capture_config(&self, filter: String) -> CaptureConfig {
        CaptureConfig::default()
            .with_source(self.interface.clone())
            .with_packet_count_limit(self.count)
            .with_filter(filter)
            .with_recent_packet_limit(self.recent)
    }
}
