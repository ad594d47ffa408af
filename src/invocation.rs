use thiserror::Error;

use crate::relay_ctl::Step;
use crate::relay_frame::FrameSet;
use crate::relay_types::RelayId;
use crate::relay_types::RelayId::*;
use crate::relay_types::RelayState;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvocationError {
    #[error("Invalid port selection '{0}', expected '0' or '1'")]
    Port(String),

    #[error("Invalid relay selection '{0}', expected 1-4, 'on' or 'off'")]
    Selection(String),

    #[error("Invalid relay state '{0}', expected 'on' or 'off'")]
    State(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PortSelect {
    /// On-board RS-232 port.
    Serial,
    /// USB to RS-232 adapter.
    Usb,
}

impl PortSelect {
    pub fn path(&self) -> &'static str {
        match self {
            PortSelect::Serial => "/dev/ttyS0",
            PortSelect::Usb => "/dev/ttyUSB0",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Relay(RelayId),
    /// No relay named, only a state.
    Default,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub port: PortSelect,
    pub selection: Selection,
    pub frames: FrameSet,
}

impl Invocation {
    /// Interprets the positional arguments `[PORT [SELECT [STATE]]]`.
    ///
    /// Unrecognized values are passed to `error_handler`; returning the error aborts,
    /// returning `None` continues with the fallback for that argument.
    pub fn from_args<E>(
        port: Option<&str>,
        select: Option<&str>,
        state: Option<&str>,
        error_handler: E,
    ) -> Result<Invocation, InvocationError>
    where
        E: Fn(InvocationError) -> Option<InvocationError>,
    {
        let port = match port {
            Some("0") => PortSelect::Serial,
            Some("1") | None => PortSelect::Usb,
            Some(unknown) => {
                if let Some(e) = error_handler(InvocationError::Port(unknown.into())) {
                    return Err(e);
                }
                PortSelect::Usb
            }
        };

        let selection = match select {
            Some(select) => match parse_selection(select) {
                Ok(selection) => selection,
                Err(e) => {
                    if let Some(e) = error_handler(e) {
                        return Err(e);
                    }
                    Selection::Default
                }
            },
            None => Selection::Default,
        };

        let state = match (select, state) {
            (_, Some(state)) => match parse_state(state) {
                Ok(state) => state,
                Err(e) => {
                    if let Some(e) = error_handler(e) {
                        return Err(e);
                    }
                    RelayState::On
                }
            },
            (Some("off"), None) => RelayState::Off,
            _ => RelayState::On,
        };

        Ok(Invocation {
            port,
            selection,
            frames: FrameSet::new(state),
        })
    }

    /// Relay 1 and the state-only forms use the paired sequence
    /// (relay 1 frame, line handshake, relay 2 frame).
    pub fn steps(&self) -> Vec<Step> {
        match self.selection {
            Selection::Relay(Relay1) | Selection::Default => vec![
                Step::Send(self.frames.frame(Relay1)),
                Step::Handshake,
                Step::Send(self.frames.frame(Relay2)),
            ],
            Selection::Relay(relay) => vec![Step::Send(self.frames.frame(relay))],
        }
    }
}

fn parse_selection(select: &str) -> Result<Selection, InvocationError> {
    let selection = match select {
        "1" => Selection::Relay(Relay1),
        "2" => Selection::Relay(Relay2),
        "3" => Selection::Relay(Relay3),
        "4" => Selection::Relay(Relay4),
        "on" | "off" => Selection::Default,
        unknown => return Err(InvocationError::Selection(unknown.into())),
    };
    Ok(selection)
}

fn parse_state(state: &str) -> Result<RelayState, InvocationError> {
    match state {
        "on" => Ok(RelayState::On),
        "off" => Ok(RelayState::Off),
        unknown => Err(InvocationError::State(unknown.into())),
    }
}
