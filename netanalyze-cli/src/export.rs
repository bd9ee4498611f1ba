//! CSV and JSON export of the collected statistics
//!
//! Both formats are rendered from an [`ExportView`], a full copy of the
//! counters taken under one lock acquisition.

use netanalyze_capture::{ExportView, HostRow, ProtocolRow};
use netanalyze_core::{Error, Result, TransportProtocol};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::net::IpAddr;
use std::path::Path;
use tracing::info;

#[derive(Serialize)]
struct JsonSummary {
    total_packets: u64,
    total_bytes: u64,
    bandwidth: f64,
}

#[derive(Serialize)]
struct JsonPair {
    src: IpAddr,
    dst: IpAddr,
    packets: u64,
    bytes: u64,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: JsonSummary,
    transport: &'a [ProtocolRow<TransportProtocol>],
    top_ips: &'a [HostRow],
    communication_pairs: Vec<JsonPair>,
}

/// Write the JSON report
pub fn write_json<W: Write>(view: &ExportView, writer: W) -> Result<()> {
    let report = JsonReport {
        summary: JsonSummary {
            total_packets: view.total_packets,
            total_bytes: view.total_bytes,
            bandwidth: view.bandwidth,
        },
        transport: &view.transport,
        top_ips: &view.hosts,
        communication_pairs: view
            .pairs
            .iter()
            .map(|pair| JsonPair {
                src: pair.src,
                dst: pair.dst,
                packets: pair.packets,
                bytes: pair.bytes,
            })
            .collect(),
    };

    serde_json::to_writer_pretty(writer, &report)
        .map_err(|e| Error::Export(format!("JSON serialization failed: {}", e)))
}

/// Write the sectioned CSV report
///
/// Sections are separated by an empty line; each starts with its name on a
/// line of its own followed by a column header.
pub fn write_csv<W: Write>(view: &ExportView, mut writer: W) -> Result<()> {
    let sections = [
        csv_section(
            "summary",
            &["total_packets", "total_bytes", "bandwidth"],
            vec![vec![
                view.total_packets.to_string(),
                view.total_bytes.to_string(),
                view.bandwidth.to_string(),
            ]],
        )?,
        csv_section(
            "transport_protocols",
            &["protocol", "packets", "bytes", "percent"],
            view.transport
                .iter()
                .map(|row| {
                    vec![
                        row.protocol.to_string(),
                        row.packets.to_string(),
                        row.bytes.to_string(),
                        row.percent.to_string(),
                    ]
                })
                .collect(),
        )?,
        csv_section(
            "application_protocols",
            &["protocol", "packets", "payload_bytes"],
            view.application
                .iter()
                .map(|row| {
                    vec![
                        row.protocol.to_string(),
                        row.packets.to_string(),
                        row.bytes.to_string(),
                    ]
                })
                .collect(),
        )?,
        csv_section(
            "ip_stats",
            &[
                "ip",
                "packets_sent",
                "packets_received",
                "bytes_sent",
                "bytes_received",
            ],
            view.hosts
                .iter()
                .map(|host| {
                    vec![
                        host.ip.to_string(),
                        host.packets_sent.to_string(),
                        host.packets_received.to_string(),
                        host.bytes_sent.to_string(),
                        host.bytes_received.to_string(),
                    ]
                })
                .collect(),
        )?,
        csv_section(
            "bandwidth",
            &["time", "bandwidth"],
            view.bandwidth_history
                .iter()
                .map(|sample| {
                    vec![
                        sample.timestamp.to_string(),
                        sample.bytes_per_second.to_string(),
                    ]
                })
                .collect(),
        )?,
    ];

    for (i, section) in sections.iter().enumerate() {
        if i > 0 {
            writer.write_all(b"\n")?;
        }
        writer.write_all(section)?;
    }
    writer.flush()?;
    Ok(())
}

fn csv_section(name: &str, header: &[&str], rows: Vec<Vec<String>>) -> Result<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    wtr.write_record([name]).map_err(csv_error)?;
    wtr.write_record(header).map_err(csv_error)?;
    for row in rows {
        wtr.write_record(&row).map_err(csv_error)?;
    }

    wtr.into_inner()
        .map_err(|e| Error::Export(format!("CSV flush failed: {}", e)))
}

fn csv_error(e: csv::Error) -> Error {
    Error::Export(format!("CSV serialization failed: {}", e))
}

/// Export the report as JSON to `path`
pub fn export_json(view: &ExportView, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_json(view, &mut writer)?;
    writer.flush()?;
    info!("Exported JSON report to {}", path.display());
    Ok(())
}

/// Export the report as CSV to `path`
pub fn export_csv(view: &ExportView, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_csv(view, BufWriter::new(file))?;
    info!("Exported CSV report to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use netanalyze_capture::{BandwidthSample, PairRow};
    use netanalyze_core::ApplicationProtocol;
    use std::net::Ipv4Addr;

    fn view() -> ExportView {
        let a = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let b = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));
        ExportView {
            total_packets: 4,
            total_bytes: 400,
            bandwidth: 200.0,
            transport: vec![
                ProtocolRow {
                    protocol: TransportProtocol::Tcp,
                    packets: 3,
                    bytes: 300,
                    percent: 75.0,
                },
                ProtocolRow {
                    protocol: TransportProtocol::Udp,
                    packets: 1,
                    bytes: 100,
                    percent: 25.0,
                },
            ],
            application: vec![ProtocolRow {
                protocol: ApplicationProtocol::Http,
                packets: 3,
                bytes: 120,
                percent: 30.0,
            }],
            hosts: vec![HostRow {
                ip: a,
                packets_sent: 4,
                packets_received: 0,
                bytes_sent: 400,
                bytes_received: 0,
            }],
            pairs: vec![PairRow {
                src: a,
                dst: b,
                packets: 4,
                bytes: 400,
                percent: 100.0,
            }],
            bandwidth_history: vec![BandwidthSample {
                timestamp: 1.5,
                bytes_per_second: 200.0,
            }],
        }
    }

    #[test]
    fn test_json_layout() {
        let mut out = Vec::new();
        write_json(&view(), &mut out).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(json["summary"]["total_packets"], 4);
        assert_eq!(json["summary"]["total_bytes"], 400);
        assert_eq!(json["transport"][0]["protocol"], "TCP");
        assert_eq!(json["transport"][1]["percent"], 25.0);
        assert_eq!(json["top_ips"][0]["ip"], "10.0.0.1");
        assert_eq!(json["communication_pairs"][0]["dst"], "10.0.0.2");
        assert!(json["communication_pairs"][0].get("percent").is_none());
    }

    #[test]
    fn test_csv_sections() {
        let mut out = Vec::new();
        write_csv(&view(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let expected = "summary\n\
                        total_packets,total_bytes,bandwidth\n\
                        4,400,200\n\
                        \n\
                        transport_protocols\n\
                        protocol,packets,bytes,percent\n\
                        TCP,3,300,75\n\
                        UDP,1,100,25\n\
                        \n\
                        application_protocols\n\
                        protocol,packets,payload_bytes\n\
                        HTTP,3,120\n\
                        \n\
                        ip_stats\n\
                        ip,packets_sent,packets_received,bytes_sent,bytes_received\n\
                        10.0.0.1,4,0,400,0\n\
                        \n\
                        bandwidth\n\
                        time,bandwidth\n\
                        1.5,200\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_export_to_files() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("report.json");
        let csv_path = dir.path().join("report.csv");

        export_json(&view(), &json_path).unwrap();
        export_csv(&view(), &csv_path).unwrap();

        assert!(std::fs::read_to_string(&json_path)
            .unwrap()
            .contains("\"communication_pairs\""));
        assert!(std::fs::read_to_string(&csv_path)
            .unwrap()
            .starts_with("summary\n"));
    }

    #[test]
    fn test_export_to_missing_directory() {
        let result = export_json(&view(), Path::new("/nonexistent/netanalyze/report.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
