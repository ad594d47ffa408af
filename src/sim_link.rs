use std::collections::VecDeque;
use std::ffi::CStr;
use std::fs::File;
use std::io;
use std::os::unix::io::FromRawFd;

use crate::modem_lines::ModemLines;
use crate::tty::SerialLink;

/// Everything the controller did to the link, in call order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    Write(Vec<u8>),
    Read(usize),
    GetLines,
    SetLines(ModemLines),
    Close,
}

/// In-memory serial link: a modem control register, recorded writes and
/// scripted reply chunks. An exhausted script behaves like an idle timeout.
#[derive(Default)]
pub struct SimLink {
    pub lines: ModemLines,
    pub events: Vec<LinkEvent>,
    pub replies: VecDeque<Vec<u8>>,
    pub max_write: Option<usize>,
    pub ignore_dtr: bool,
    /// Behave like a pty or virtual port: modem ioctls fail with `ENOTTY`.
    pub no_modem_lines: bool,
    pub closed: bool,
}

impl SimLink {
    pub fn new() -> SimLink {
        SimLink::default()
    }

    pub fn with_reply(mut self, chunk: &[u8]) -> SimLink {
        self.replies.push_back(chunk.to_vec());
        self
    }

    pub fn written(&self) -> Vec<Vec<u8>> {
        self.events
            .iter()
            .filter_map(|e| match e {
                LinkEvent::Write(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    fn ensure_open(&self) -> io::Result<()> {
        match self.closed {
            true => Err(io::Error::from_raw_os_error(libc::EBADF)),
            false => Ok(()),
        }
    }

    fn ensure_modem_lines(&self) -> io::Result<()> {
        self.ensure_open()?;
        match self.no_modem_lines {
            true => Err(io::Error::from_raw_os_error(libc::ENOTTY)),
            false => Ok(()),
        }
    }
}

impl SerialLink for SimLink {
    fn write_bytes(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.ensure_open()?;
        let n = match self.max_write {
            Some(max) => buf.len().min(max),
            None => buf.len(),
        };
        self.events.push(LinkEvent::Write(buf[..n].to_vec()));
        Ok(n)
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.ensure_open()?;
        let n = match self.replies.pop_front() {
            Some(mut chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    self.replies.push_front(chunk.split_off(n));
                }
                n
            }
            None => 0,
        };
        self.events.push(LinkEvent::Read(n));
        Ok(n)
    }

    fn modem_lines(&mut self) -> io::Result<ModemLines> {
        self.ensure_modem_lines()?;
        self.events.push(LinkEvent::GetLines);
        Ok(self.lines)
    }

    fn set_modem_lines(&mut self, lines: ModemLines) -> io::Result<()> {
        self.ensure_modem_lines()?;
        self.events.push(LinkEvent::SetLines(lines));
        self.lines = lines;
        if self.ignore_dtr {
            self.lines.clear(ModemLines::DTR);
        }
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.events.push(LinkEvent::Close);
        }
        self.closed = true;
    }
}

#[cfg(target_os = "linux")]
/// Pseudo terminal pair. The slave path can be opened like a serial device
/// as long as the master stays alive.
pub struct Pty {
    _master: File,
    pub slave_path: String,
}

#[cfg(target_os = "linux")]
impl Pty {
    pub fn open() -> io::Result<Pty> {
        let fd = unsafe { libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        let master = unsafe { File::from_raw_fd(fd) };

        if unsafe { libc::grantpt(fd) } != 0 || unsafe { libc::unlockpt(fd) } != 0 {
            return Err(io::Error::last_os_error());
        }

        let mut name = [0 as libc::c_char; 128];
        let ret = unsafe { libc::ptsname_r(fd, name.as_mut_ptr(), name.len()) };
        if ret != 0 {
            return Err(io::Error::from_raw_os_error(ret));
        }
        let slave_path = unsafe { CStr::from_ptr(name.as_ptr()) }
            .to_string_lossy()
            .into_owned();

        Ok(Pty {
            _master: master,
            slave_path,
        })
    }
}
