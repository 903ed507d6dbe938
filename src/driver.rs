//! Roto-Control MIDI port driver
//!
//! Owns the midir connections to the surface. Incoming messages are pushed
//! onto a channel for the engine loop; outgoing bytes are written through a
//! shared output connection.

use anyhow::{Context, Result};
use midir::{
    MidiInput, MidiInputConnection, MidiInputPort, MidiOutput, MidiOutputConnection,
    MidiOutputPort,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::MidiConfig;
use crate::midi::format_hex;

const CLIENT_NAME: &str = "Roto-Link";

/// Raw MIDI message from the surface
#[derive(Debug, Clone)]
pub struct SurfaceEvent {
    pub timestamp: Instant,
    pub data: Vec<u8>,
}

pub struct SurfaceDriver {
    input_conn: Option<MidiInputConnection<()>>,
    output_conn: Option<Arc<Mutex<MidiOutputConnection>>>,
    event_tx: mpsc::Sender<SurfaceEvent>,
    event_rx: Option<mpsc::Receiver<SurfaceEvent>>,
    input_port_name: String,
    output_port_name: String,
}

impl SurfaceDriver {
    pub fn new(config: &MidiConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(1000);
        Self {
            input_conn: None,
            output_conn: None,
            event_tx,
            event_rx: Some(event_rx),
            input_port_name: config.input_port.clone(),
            output_port_name: config.output_port.clone(),
        }
    }

    pub fn list_input_ports() -> Result<Vec<String>> {
        let midi_in = MidiInput::new(&format!("{}-Scanner", CLIENT_NAME))?;
        Ok(midi_in
            .ports()
            .iter()
            .filter_map(|p| midi_in.port_name(p).ok())
            .collect())
    }

    pub fn list_output_ports() -> Result<Vec<String>> {
        let midi_out = MidiOutput::new(&format!("{}-Scanner", CLIENT_NAME))?;
        Ok(midi_out
            .ports()
            .iter()
            .filter_map(|p| midi_out.port_name(p).ok())
            .collect())
    }

    /// Case-insensitive substring match on the port name
    fn find_input_port(midi_in: &MidiInput, pattern: &str) -> Option<(MidiInputPort, String)> {
        let pattern = pattern.to_lowercase();
        midi_in.ports().into_iter().find_map(|port| {
            let name = midi_in.port_name(&port).ok()?;
            name.to_lowercase().contains(&pattern).then_some((port, name))
        })
    }

    fn find_output_port(midi_out: &MidiOutput, pattern: &str) -> Option<(MidiOutputPort, String)> {
        let pattern = pattern.to_lowercase();
        midi_out.ports().into_iter().find_map(|port| {
            let name = midi_out.port_name(&port).ok()?;
            name.to_lowercase().contains(&pattern).then_some((port, name))
        })
    }

    pub fn connect(&mut self) -> Result<()> {
        self.disconnect();
        info!(
            "Connecting to surface - Input: '{}', Output: '{}'",
            self.input_port_name, self.output_port_name
        );

        let mut midi_in = MidiInput::new(&format!("{}-Input", CLIENT_NAME))
            .context("Failed to create MIDI input")?;
        // SysEx carries the whole protocol
        midi_in.ignore(midir::Ignore::None);
        debug!("Found {} MIDI input ports", midi_in.port_count());

        let (in_port, in_name) = Self::find_input_port(&midi_in, &self.input_port_name)
            .ok_or_else(|| anyhow::anyhow!("Input port '{}' not found", self.input_port_name))?;
        info!("Connecting to input port: {}", in_name);

        let event_tx = self.event_tx.clone();
        let input_conn = midi_in
            .connect(
                &in_port,
                CLIENT_NAME,
                move |_, data, _| {
                    let event = SurfaceEvent {
                        timestamp: Instant::now(),
                        data: data.to_vec(),
                    };
                    if event_tx.try_send(event).is_err() {
                        warn!("Surface event dropped: {}", format_hex(data));
                    }
                },
                (),
            )
            .map_err(|e| anyhow::anyhow!("Failed to connect to input port: {}", e))?;
        self.input_conn = Some(input_conn);

        let midi_out = MidiOutput::new(&format!("{}-Output", CLIENT_NAME))
            .context("Failed to create MIDI output")?;
        debug!("Found {} MIDI output ports", midi_out.port_count());

        let (out_port, out_name) = Self::find_output_port(&midi_out, &self.output_port_name)
            .ok_or_else(|| anyhow::anyhow!("Output port '{}' not found", self.output_port_name))?;
        info!("Connecting to output port: {}", out_name);

        let output_conn = midi_out
            .connect(&out_port, CLIENT_NAME)
            .map_err(|e| anyhow::anyhow!("Failed to connect to output port: {}", e))?;
        self.output_conn = Some(Arc::new(Mutex::new(output_conn)));

        info!("Surface connected");
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if let Some(conn) = self.input_conn.take() {
            conn.close();
            debug!("Input connection closed");
        }
        if self.output_conn.take().is_some() {
            debug!("Output connection closed");
        }
    }

    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<SurfaceEvent>> {
        self.event_rx.take()
    }

    pub fn send_raw(&self, data: &[u8]) -> Result<()> {
        let conn = self
            .output_conn
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Surface output not connected"))?;
        conn.lock()
            .send(data)
            .map_err(|e| anyhow::anyhow!("Failed to send MIDI: {}", e))?;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.input_conn.is_some() && self.output_conn.is_some()
    }
}

impl Drop for SurfaceDriver {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Print every MIDI port, marking the ones matching the configured patterns
pub fn print_ports(config: Option<&MidiConfig>) -> Result<()> {
    use colored::*;

    let mark = |name: &str, pattern: Option<&str>| match pattern {
        Some(p) if name.to_lowercase().contains(&p.to_lowercase()) => "*".green(),
        _ => " ".normal(),
    };

    println!("{}", "MIDI input ports:".bold());
    for (i, name) in SurfaceDriver::list_input_ports()?.iter().enumerate() {
        let pattern = config.map(|c| c.input_port.as_str());
        println!(" {} {:>2}: {}", mark(name, pattern), i, name);
    }
    println!("{}", "MIDI output ports:".bold());
    for (i, name) in SurfaceDriver::list_output_ports()?.iter().enumerate() {
        let pattern = config.map(|c| c.output_port.as_str());
        println!(" {} {:>2}: {}", mark(name, pattern), i, name);
    }
    Ok(())
}
