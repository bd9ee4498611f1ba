//! Example: List capture sources
//!
//! Run with: cargo run --example list_sources

use netanalyze_capture::list_sources;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Capture Sources ===\n");

    for source in list_sources()? {
        println!("Source: {}", source.display_line());

        println!("  Addresses:");
        for address in &source.addresses {
            println!("    - {}", address);
        }
        if let Some(mask) = source.netmask {
            println!("  Netmask: {}", mask);
        }

        println!("  Up: {}", source.is_up);
        println!("  Loopback: {}", source.is_loopback);
        println!();
    }

    Ok(())
}
