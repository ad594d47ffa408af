use std::thread;
use std::time::Duration;

use log::debug;
use log::info;
use log::warn;

use crate::modem_lines;
use crate::modem_lines::Direction;
use crate::modem_lines::ModemLines;
use crate::relay_frame::CommandFrame;
use crate::relay_frame::Response;
use crate::relay_frame::FRAME_LEN;
use crate::tty::PortSettings;
use crate::tty::SerialError;
use crate::tty::SerialLink;
use crate::tty::TtyPort;

// Lets RTS/DTR transitions settle before the board samples them.
const SETTLE_DELAY: Duration = Duration::from_micros(100);

const STEP_DELAY: Duration = Duration::from_micros(50);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Send(CommandFrame),
    /// Drop all handshake lines, then signal a host transfer.
    Handshake,
}

pub struct RelayControl<L: SerialLink> {
    link: L,
    debug_lines: bool,
}

impl RelayControl<TtyPort> {
    /// Opens and configures the device, then raises DTR to signal the host is ready.
    pub fn open(
        path: &str,
        settings: &PortSettings,
        debug_lines: bool,
    ) -> Result<RelayControl<TtyPort>, SerialError> {
        let port = TtyPort::open(path, settings)?;
        info!("Opened '{}' at {} baud", path, settings.baud);
        let mut ctl = RelayControl::with_link(port, debug_lines);
        ctl.assert_host_ready();
        Ok(ctl)
    }
}

impl<L: SerialLink> RelayControl<L> {
    pub fn with_link(link: L, debug_lines: bool) -> RelayControl<L> {
        RelayControl { link, debug_lines }
    }

    #[cfg(test)]
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Sets DTR and reports whether the register reads back with DTR raised.
    /// A missing DTR, or a device without modem lines, is logged and tolerated.
    pub fn assert_host_ready(&mut self) -> bool {
        match self.raise_dtr() {
            Ok(true) => {
                debug!("SET DTR SUCCESS");
                true
            }
            Ok(false) => {
                warn!("SET DTR FAULT");
                false
            }
            Err(e) => {
                warn!("SET DTR FAULT: {}", e);
                false
            }
        }
    }

    /// Writes the frame once. A short write is reported to the caller, not retried.
    pub fn send(&mut self, frame: &CommandFrame) -> Result<usize, SerialError> {
        let bytes = frame.as_bytes();
        let n = self
            .link
            .write_bytes(bytes)
            .map_err(|e| SerialError::io("write frame", e))?;
        if n < bytes.len() {
            warn!("Partial write of frame {}: {} of {} bytes", frame, n, bytes.len());
        } else {
            debug!("Sent {}", frame);
        }
        Ok(n)
    }

    /// Reads until `max_size` bytes arrived or a read times out without data.
    pub fn receive(&mut self, buf: &mut [u8], max_size: usize) -> Result<usize, SerialError> {
        let max_size = max_size.min(buf.len());
        let mut total = 0;
        while total < max_size {
            let n = self
                .link
                .read_bytes(&mut buf[total..max_size])
                .map_err(|e| SerialError::io("read response", e))?;
            if n == 0 {
                break;
            }
            total += n;
        }
        debug!("Received {} of {} bytes", total, max_size);
        Ok(total)
    }

    /// Line changes never fail the caller; ioctl errors are logged.
    pub fn set_lines<D: Into<Direction>>(&mut self, direction: D) {
        let direction = direction.into();
        if let Err(e) = self.try_set_lines(direction) {
            warn!("SET lines for {:?} failed: {}", direction, e);
        }
    }

    pub fn clear_lines(&mut self) {
        if let Err(e) = self.try_clear_lines() {
            warn!("CLR lines failed: {}", e);
        }
    }

    pub fn handshake(&mut self) {
        thread::sleep(STEP_DELAY);
        self.clear_lines();
        thread::sleep(STEP_DELAY);
        self.set_lines(Direction::HostToDevice);
    }

    /// Runs the steps in order, then reads back one response frame.
    pub fn run(&mut self, steps: &[Step]) -> Result<Response, SerialError> {
        for step in steps {
            match step {
                Step::Send(frame) => {
                    self.send(frame)?;
                }
                Step::Handshake => self.handshake(),
            }
        }
        thread::sleep(STEP_DELAY);

        let mut buf = [0u8; FRAME_LEN];
        let count = self.receive(&mut buf, FRAME_LEN)?;
        Ok(Response::from_received(&buf, count))
    }

    pub fn close(&mut self) {
        self.link.close();
    }

    fn raise_dtr(&mut self) -> Result<bool, SerialError> {
        let mut lines = self.get_lines()?;
        lines.set(ModemLines::DTR);
        self.put_lines(lines)?;
        Ok(self.get_lines()?.contains(ModemLines::DTR))
    }

    fn try_set_lines(&mut self, direction: Direction) -> Result<(), SerialError> {
        let mut lines = self.get_lines()?;
        if self.debug_lines {
            debug!("Lines before handshake: {}", lines);
        }
        modem_lines::apply_direction(&mut lines, direction);
        self.put_lines(lines)?;
        self.settle("SET");
        Ok(())
    }

    fn try_clear_lines(&mut self) -> Result<(), SerialError> {
        let mut lines = self.get_lines()?;
        modem_lines::release(&mut lines);
        self.put_lines(lines)?;
        self.settle("CLR");
        Ok(())
    }

    // The re-read only feeds the debug log, the delay is what the board needs.
    fn settle(&mut self, label: &str) {
        thread::sleep(SETTLE_DELAY);
        match self.get_lines() {
            Ok(lines) if self.debug_lines => debug!("{} lines: {}", label, lines),
            Ok(_) => {}
            Err(e) => debug!("{} lines: {}", label, e),
        }
    }

    fn get_lines(&mut self) -> Result<ModemLines, SerialError> {
        self.link
            .modem_lines()
            .map_err(|e| SerialError::io("read modem lines", e))
    }

    fn put_lines(&mut self, lines: ModemLines) -> Result<(), SerialError> {
        self.link
            .set_modem_lines(lines)
            .map_err(|e| SerialError::io("write modem lines", e))
    }
}

impl<L: SerialLink> Drop for RelayControl<L> {
    fn drop(&mut self) {
        self.link.close();
    }
}
