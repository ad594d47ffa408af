use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;

use libc::c_int;

/// Snapshot of the modem control register as exchanged with `TIOCMGET`/`TIOCMSET`.
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct ModemLines(c_int);

impl ModemLines {
    pub const LE: ModemLines = ModemLines(libc::TIOCM_LE);
    pub const DTR: ModemLines = ModemLines(libc::TIOCM_DTR);
    pub const RTS: ModemLines = ModemLines(libc::TIOCM_RTS);
    pub const ST: ModemLines = ModemLines(libc::TIOCM_ST);
    pub const SR: ModemLines = ModemLines(libc::TIOCM_SR);
    pub const CTS: ModemLines = ModemLines(libc::TIOCM_CTS);
    pub const CAR: ModemLines = ModemLines(libc::TIOCM_CAR);
    pub const RNG: ModemLines = ModemLines(libc::TIOCM_RNG);
    pub const DSR: ModemLines = ModemLines(libc::TIOCM_DSR);

    const NAMED: [(ModemLines, &'static str); 9] = [
        (ModemLines::CTS, "CTS"),
        (ModemLines::RTS, "RTS"),
        (ModemLines::DTR, "DTR"),
        (ModemLines::LE, "LE"),
        (ModemLines::DSR, "DSR"),
        (ModemLines::CAR, "CAR"),
        (ModemLines::RNG, "RNG"),
        (ModemLines::ST, "ST"),
        (ModemLines::SR, "SR"),
    ];

    pub fn from_bits(bits: c_int) -> ModemLines {
        ModemLines(bits)
    }

    pub fn bits(&self) -> c_int {
        self.0
    }

    pub fn contains(&self, lines: ModemLines) -> bool {
        self.0 & lines.0 == lines.0
    }

    pub fn set(&mut self, lines: ModemLines) {
        self.0 |= lines.0;
    }

    pub fn clear(&mut self, lines: ModemLines) {
        self.0 &= !lines.0;
    }

    /// Names of the asserted lines, in the order the board documentation lists them.
    pub fn names(&self) -> Vec<&'static str> {
        ModemLines::NAMED
            .iter()
            .filter(|(line, _)| self.contains(*line))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl std::ops::BitOr for ModemLines {
    type Output = ModemLines;

    fn bitor(self, rhs: ModemLines) -> ModemLines {
        ModemLines(self.0 | rhs.0)
    }
}

impl Display for ModemLines {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:#06x} [{}]", self.0, self.names().join(" "))
    }
}

/// Which side of the link is about to transfer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Host transfers, board receives (direction `0`).
    HostToDevice,
    /// Board transfers, host receives.
    DeviceToHost,
}

impl From<u8> for Direction {
    fn from(direction: u8) -> Self {
        match direction {
            0 => Direction::HostToDevice,
            _ => Direction::DeviceToHost,
        }
    }
}

pub fn apply_direction(lines: &mut ModemLines, direction: Direction) {
    match direction {
        Direction::HostToDevice => {
            lines.clear(ModemLines::CTS);
            lines.set(ModemLines::RTS | ModemLines::DTR | ModemLines::DSR);
        }
        Direction::DeviceToHost => {
            lines.set(ModemLines::CTS | ModemLines::DTR);
            lines.clear(ModemLines::RTS);
        }
    }
}

pub fn release(lines: &mut ModemLines) {
    lines.clear(ModemLines::CTS | ModemLines::RTS | ModemLines::DTR | ModemLines::DSR);
}
