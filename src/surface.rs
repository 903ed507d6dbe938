//! Surface control layout and outbound traffic
//!
//! All controls live on MIDI channel 16. Knobs are 14-bit, sent as a high
//! byte on `0x0C + i` followed by a low byte on `0x2C + i`; the knob value is
//! only complete once the low byte arrives.

use tracing::trace;

use crate::midi::convert::{join14, normalized_from_14bit, normalized_to_14bit, split14};
use crate::midi::MidiMessage;
use crate::scheduler::CcGate;

/// MIDI channel of every surface control (zero based)
pub const CHANNEL: u8 = 0x0F;

pub const KNOB_COUNT: usize = 8;
pub const BUTTON_COUNT: usize = 8;

pub const KNOB_HIGH_BASE: u8 = 0x0C;
pub const HIRES_LOW_OFFSET: u8 = 0x20;
pub const KNOB_LOW_BASE: u8 = KNOB_HIGH_BASE + HIRES_LOW_OFFSET;
pub const TOUCH_BASE: u8 = 0x34;
pub const BUTTON_BASE: u8 = 0x14;
pub const TRANSPORT_BUTTON_BASE: u8 = 0x1C;
pub const REWIND_CC: u8 = 0x24;
pub const FAST_FORWARD_CC: u8 = 0x25;

/// Light value for a lit button
pub const LIGHT_ON: u8 = 127;

/// A decoded surface control change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceInput {
    KnobHigh { index: usize, value: u8 },
    KnobLow { index: usize, value: u8 },
    Touch { index: usize, touched: bool },
    Button { index: usize, value: u8 },
    TransportButton { index: usize, pressed: bool },
    Rewind { pressed: bool },
    FastForward { pressed: bool },
}

impl SurfaceInput {
    /// Map a CC on the surface channel to the control it belongs to
    pub fn from_cc(cc: u8, value: u8) -> Option<Self> {
        let in_bank = |base: u8| (base..base + 8).contains(&cc).then(|| (cc - base) as usize);

        if let Some(index) = in_bank(KNOB_HIGH_BASE) {
            Some(SurfaceInput::KnobHigh { index, value })
        } else if let Some(index) = in_bank(KNOB_LOW_BASE) {
            Some(SurfaceInput::KnobLow { index, value })
        } else if let Some(index) = in_bank(TOUCH_BASE) {
            Some(SurfaceInput::Touch {
                index,
                touched: value > 0,
            })
        } else if let Some(index) = in_bank(BUTTON_BASE) {
            Some(SurfaceInput::Button { index, value })
        } else if let Some(index) = in_bank(TRANSPORT_BUTTON_BASE) {
            Some(SurfaceInput::TransportButton {
                index,
                pressed: value > 0,
            })
        } else if cc == REWIND_CC {
            Some(SurfaceInput::Rewind { pressed: value > 0 })
        } else if cc == FAST_FORWARD_CC {
            Some(SurfaceInput::FastForward { pressed: value > 0 })
        } else {
            None
        }
    }
}

/// Incoming byte assembly and last-sent position of one knob
#[derive(Debug, Clone, Copy, Default)]
pub struct KnobState {
    high: u8,
    low: u8,
    last_sent: Option<(u8, u8)>,
}

impl KnobState {
    pub fn receive_high(&mut self, value: u8) {
        self.high = value & 0x7F;
    }

    /// Completes a knob move; returns the normalized position
    ///
    /// The received position counts as sent so the host echo of the same
    /// value is not bounced back.
    pub fn receive_low(&mut self, value: u8) -> f64 {
        self.low = value & 0x7F;
        self.last_sent = Some((self.high, self.low));
        normalized_from_14bit(join14(self.high, self.low)).min(1.0)
    }

    /// Bytes to send for `value`, or `None` when the surface already shows it
    pub fn position_update(&mut self, value: f64, force: bool) -> Option<(u8, u8)> {
        let bytes = split14(normalized_to_14bit(value));
        if !force && self.last_sent == Some(bytes) {
            return None;
        }
        self.last_sent = Some(bytes);
        Some(bytes)
    }

    pub fn last_sent(&self) -> Option<(u8, u8)> {
        self.last_sent
    }
}

/// Last light value sent to one button
#[derive(Debug, Clone, Copy, Default)]
pub struct ButtonState {
    last_sent: Option<u8>,
}

impl ButtonState {
    pub fn light_update(&mut self, light: u8, force: bool) -> Option<u8> {
        if !force && self.last_sent == Some(light) {
            return None;
        }
        self.last_sent = Some(light);
        Some(light)
    }
}

/// Outbox for everything sent to the surface, in emission order
#[derive(Debug, Default)]
pub struct SurfaceOut {
    initialized: bool,
    gate: CcGate,
    outbox: Vec<Vec<u8>>,
}

impl SurfaceOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns true on the first call
    pub fn initialize(&mut self) -> bool {
        !std::mem::replace(&mut self.initialized, true)
    }

    /// Link SysEx; dropped until the link is initialised
    pub fn sysex(&mut self, frame: Vec<u8>) {
        if self.initialized {
            self.outbox.push(frame);
        } else {
            trace!("Link not initialised, dropping {} byte frame", frame.len());
        }
    }

    /// SysEx that bypasses the initialisation check (handshake, keep-alive)
    pub fn sysex_direct(&mut self, frame: Vec<u8>) {
        self.outbox.push(frame);
    }

    pub fn sysex_opt(&mut self, frame: Option<Vec<u8>>) {
        if let Some(frame) = frame {
            self.sysex(frame);
        }
    }

    /// Plain CC on the surface channel
    pub fn cc(&mut self, cc: u8, value: u8) {
        self.outbox.push(
            MidiMessage::ControlChange {
                channel: CHANNEL,
                cc,
                value: value & 0x7F,
            }
            .encode(),
        );
    }

    /// Hi-res knob position; buffered while CC output is suspended
    pub fn hires(&mut self, cc_base: u8, high: u8, low: u8) {
        if let Some((high, low)) = self.gate.push(cc_base, high, low) {
            self.send_hires(cc_base, high, low);
        }
    }

    fn send_hires(&mut self, cc_base: u8, high: u8, low: u8) {
        self.cc(cc_base, high);
        self.cc(cc_base + HIRES_LOW_OFFSET, low);
    }

    pub fn suspend_cc(&mut self) {
        self.gate.suspend();
    }

    pub fn is_cc_suspended(&self) -> bool {
        self.gate.is_suspended()
    }

    /// Resume CC output and send what was buffered
    pub fn resume_cc(&mut self) {
        for (cc, high, low) in self.gate.resume() {
            self.send_hires(cc, high, low);
        }
    }

    pub fn take(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.outbox)
    }
}
