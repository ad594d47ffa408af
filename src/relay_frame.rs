use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;

use crate::relay_types::RelayId;
use crate::relay_types::RelayState;

pub const FRAME_LEN: usize = 8;

const HEADER: [u8; 5] = [0x55, 0x56, 0x00, 0x00, 0x00];

const ACTION_ON: u8 = 0x01;

/// Command frame understood by the relay board:
/// `55 56 00 00 00 <channel> <action> <checksum>`
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub struct CommandFrame {
    bytes: [u8; FRAME_LEN],
}

impl CommandFrame {
    pub fn new(relay: RelayId, state: RelayState) -> CommandFrame {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[..5].copy_from_slice(&HEADER);
        bytes[5] = relay.channel();
        bytes[6] = match state {
            RelayState::On => ACTION_ON,
            RelayState::Off => ACTION_ON + 1,
        };
        bytes[7] = checksum(&bytes[..7]);
        CommandFrame { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.bytes
    }
}

// Low byte of the sum over all preceding bytes.
fn checksum(buf: &[u8]) -> u8 {
    buf.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

impl Display for CommandFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (i, b) in self.bytes.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}

/// The four canned frames of one invocation, all carrying the same state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameSet {
    state: RelayState,
}

impl FrameSet {
    pub fn new(state: RelayState) -> FrameSet {
        FrameSet { state }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn frame(&self, relay: RelayId) -> CommandFrame {
        CommandFrame::new(relay, self.state)
    }
}

/// Reply read back from the board. Holds only the bytes that actually arrived.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    Complete([u8; FRAME_LEN]),
    Short(Vec<u8>),
}

impl Response {
    pub fn from_received(buf: &[u8; FRAME_LEN], count: usize) -> Response {
        if count < FRAME_LEN {
            Response::Short(buf[..count].to_vec())
        } else {
            Response::Complete(*buf)
        }
    }
}

impl Display for Response {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Response::Short(bytes) => {
                write!(f, "Not responding, receiving: {} byte", bytes.len())
            }
            Response::Complete(bytes) => {
                for b in bytes {
                    write!(f, "{}, ", b)?;
                }
                write!(f, "received bytes: {}", FRAME_LEN)
            }
        }
    }
}
