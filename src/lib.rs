//! Roto-Link - synchronization engine between a DAW and the Roto-Control
//!
//! The [`engine::Engine`] mirrors host state onto the surface over the
//! Roto-Control SysEx dialect and routes surface input back to the host.

pub mod config;
pub mod driver;
pub mod engine;
pub mod host;
pub mod learn;
pub mod midi;
pub mod mode;
pub mod palette;
pub mod protocol;
pub mod registry;
pub mod scheduler;
pub mod sniffer;
pub mod surface;
