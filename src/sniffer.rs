//! MIDI sniffer for debugging the surface dialect
//!
//! Prints every message from the surface input port, naming SysEx frames by
//! their route.

use anyhow::Result;
use colored::*;
use midir::{MidiInput, MidiInputConnection};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::info;

use crate::midi::{format_hex, MidiMessage};
use crate::protocol::inbound::{find_route, InboundFrame};
use crate::protocol::is_ping;

#[derive(Debug, Clone)]
pub struct SnifferEvent {
    pub timestamp_ms: u64,
    pub data: Vec<u8>,
}

/// Human readable description of one message
pub fn describe(data: &[u8]) -> String {
    if is_ping(data) {
        return "ping".to_string();
    }
    if data.first() == Some(&crate::protocol::SYSEX_START) {
        return match InboundFrame::parse(data) {
            Ok(frame) => match find_route(frame.command, frame.subcommand) {
                Some(route) => format!("{} ({} bytes)", route.name, frame.payload.len()),
                None => format!(
                    "unrouted {:02X} {:02X}",
                    frame.command, frame.subcommand
                ),
            },
            Err(e) => format!("malformed: {}", e),
        };
    }
    match MidiMessage::parse(data) {
        Some(msg) => msg.to_string(),
        None => "unparseable".to_string(),
    }
}

pub async fn run_cli_sniffer(pattern: &str) -> Result<()> {
    println!("{}", "=== Roto-Control Sniffer ===".bold().cyan());
    println!("Press Ctrl+C to exit\n");

    let (event_tx, mut event_rx) = mpsc::channel::<SnifferEvent>(1000);
    let _conn = connect(pattern, event_tx)?;

    println!("{}", "Format: [timestamp] HEX => PARSED".dimmed());
    println!("{}\n", "─".repeat(80).dimmed());

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => print_event(&event),
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!("\n{}", "Sniffer stopped".yellow());
    Ok(())
}

fn connect(
    pattern: &str,
    event_tx: mpsc::Sender<SnifferEvent>,
) -> Result<MidiInputConnection<()>> {
    let mut midi_in = MidiInput::new("Roto-Link-Sniffer")?;
    midi_in.ignore(midir::Ignore::None);

    let needle = pattern.to_lowercase();
    let (port, name) = midi_in
        .ports()
        .into_iter()
        .find_map(|port| {
            let name = midi_in.port_name(&port).ok()?;
            name.to_lowercase().contains(&needle).then_some((port, name))
        })
        .ok_or_else(|| anyhow::anyhow!("No port found matching pattern: {}", pattern))?;

    info!("Sniffing {}", name);
    let start = Instant::now();
    midi_in
        .connect(
            &port,
            "Sniffer",
            move |_, data, _| {
                let event = SnifferEvent {
                    timestamp_ms: start.elapsed().as_millis() as u64,
                    data: data.to_vec(),
                };
                let _ = event_tx.try_send(event);
            },
            (),
        )
        .map_err(|e| anyhow::anyhow!("Failed to connect to {}: {}", name, e))
}

fn print_event(event: &SnifferEvent) {
    let hex = format_hex(&event.data);
    let hex = match event.data.first() {
        Some(0xF0) => hex.bright_magenta(),
        Some(status) if status & 0xF0 == 0xB0 => hex.bright_yellow(),
        _ => hex.normal(),
    };
    println!(
        "[{}ms] {} => {}",
        format!("{:08}", event.timestamp_ms).dimmed(),
        hex,
        describe(&event.data).bright_blue()
    );
}
