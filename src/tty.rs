use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Read;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::os::unix::io::RawFd;

use libc::c_int;
use libc::speed_t;
use log::debug;
use thiserror::Error;

use crate::modem_lines::ModemLines;

#[derive(Debug, Error)]
pub enum SerialError {
    #[error("Failed to open '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to {op}: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: io::Error,
    },
}

impl SerialError {
    pub fn open<S: Into<String>>(path: S, source: io::Error) -> Self {
        SerialError::Open {
            path: path.into(),
            source,
        }
    }

    pub fn io(op: &'static str, source: io::Error) -> Self {
        SerialError::Io { op, source }
    }
}

/// Byte-level access to a serial device plus its modem control register.
pub trait SerialLink {
    fn write_bytes(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// One read; returns `0` once the idle timeout elapsed without data.
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    fn modem_lines(&mut self) -> io::Result<ModemLines>;

    fn set_modem_lines(&mut self, lines: ModemLines) -> io::Result<()>;

    /// Releases the device. Must tolerate being called on an already closed link.
    fn close(&mut self);
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PortSettings {
    pub baud: u32,
    /// Inter-byte read timeout in deciseconds (`VTIME`).
    pub read_timeout_ds: u8,
}

impl Default for PortSettings {
    fn default() -> Self {
        PortSettings {
            baud: 9600,
            read_timeout_ds: 25,
        }
    }
}

pub fn baud_to_speed(baud: u32) -> Option<speed_t> {
    let speed = match baud {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        _ => return None,
    };
    Some(speed)
}

/// Terminal device opened in raw 8N1 mode.
pub struct TtyPort {
    file: Option<File>,
}

impl TtyPort {
    pub fn open(path: &str, settings: &PortSettings) -> Result<TtyPort, SerialError> {
        let speed = baud_to_speed(settings.baud).ok_or_else(|| {
            SerialError::open(
                path,
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("Unsupported baud rate {}", settings.baud),
                ),
            )
        })?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_SYNC)
            .open(path)
            .map_err(|e| SerialError::open(path, e))?;

        configure(file.as_raw_fd(), speed, settings.read_timeout_ds)
            .map_err(|e| SerialError::open(path, e))?;

        Ok(TtyPort { file: Some(file) })
    }

    fn fd(&self) -> io::Result<RawFd> {
        match &self.file {
            Some(file) => Ok(file.as_raw_fd()),
            None => Err(io::Error::from_raw_os_error(libc::EBADF)),
        }
    }

    fn file(&mut self) -> io::Result<&mut File> {
        match &mut self.file {
            Some(file) => Ok(file),
            None => Err(io::Error::from_raw_os_error(libc::EBADF)),
        }
    }
}

fn configure(fd: RawFd, speed: speed_t, read_timeout_ds: u8) -> io::Result<()> {
    let mut options: libc::termios = unsafe { std::mem::zeroed() };
    check(unsafe { libc::tcgetattr(fd, &mut options) })?;
    log_flags("current", &options);

    check(unsafe { libc::cfsetispeed(&mut options, speed) })?;
    check(unsafe { libc::cfsetospeed(&mut options, speed) })?;
    log_flags("speed", &options);

    options.c_cc[libc::VTIME] = read_timeout_ds;
    options.c_cc[libc::VMIN] = 0;
    debug!("VEOF = {}", options.c_cc[libc::VEOF]);
    options.c_cc[libc::VEOF] = 0x04;

    options.c_cflag &= !(libc::PARENB | libc::CSTOPB | libc::CSIZE | libc::CRTSCTS);
    options.c_cflag |= libc::CS8 | libc::CREAD | libc::CLOCAL;
    options.c_iflag &= !(libc::INLCR | libc::ICRNL);
    options.c_oflag &= !libc::OPOST;
    options.c_lflag = 0;

    check(unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &options) })?;
    log_flags("applied", &options);
    Ok(())
}

fn log_flags(stage: &str, options: &libc::termios) {
    debug!(
        "{}: c_cflag = {}, c_oflag = {}, c_lflag = {}",
        stage, options.c_cflag, options.c_oflag, options.c_lflag
    );
}

fn check(ret: c_int) -> io::Result<c_int> {
    match ret {
        -1 => Err(io::Error::last_os_error()),
        ret => Ok(ret),
    }
}

impl SerialLink for TtyPort {
    fn write_bytes(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file()?.write(buf)
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file()?.read(buf)
    }

    fn modem_lines(&mut self) -> io::Result<ModemLines> {
        let fd = self.fd()?;
        let mut bits: c_int = 0;
        check(unsafe { libc::ioctl(fd, libc::TIOCMGET, &mut bits as *mut c_int) })?;
        Ok(ModemLines::from_bits(bits))
    }

    fn set_modem_lines(&mut self, lines: ModemLines) -> io::Result<()> {
        let fd = self.fd()?;
        let bits: c_int = lines.bits();
        check(unsafe { libc::ioctl(fd, libc::TIOCMSET, &bits as *const c_int) })?;
        Ok(())
    }

    fn close(&mut self) {
        // dropping the file closes the descriptor
        if self.file.take().is_some() {
            debug!("Closed serial device");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_9600_with_2500ms_timeout() {
        let settings = PortSettings::default();
        assert_eq!(settings.baud, 9600);
        assert_eq!(settings.read_timeout_ds, 25);
    }

    #[test]
    fn baud_rates_map_to_speed_constants() {
        assert_eq!(baud_to_speed(9600), Some(libc::B9600));
        assert_eq!(baud_to_speed(115200), Some(libc::B115200));
        assert_eq!(baud_to_speed(12345), None);
    }

    #[test]
    fn open_missing_device_reports_path_and_os_error() {
        let err = TtyPort::open("/dev/does-not-exist-rs232-relay", &PortSettings::default())
            .err()
            .unwrap();
        match &err {
            SerialError::Open { path, source } => {
                assert_eq!(path, "/dev/does-not-exist-rs232-relay");
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(err.to_string().starts_with("Failed to open"));
    }

    #[test]
    fn unsupported_baud_fails_before_touching_the_device() {
        let settings = PortSettings {
            baud: 1234,
            ..PortSettings::default()
        };
        let err = TtyPort::open("/dev/does-not-exist-rs232-relay", &settings)
            .err()
            .unwrap();
        match err {
            SerialError::Open { source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::InvalidInput)
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn closed_port_rejects_io() {
        let mut port = TtyPort { file: None };
        let err = port.write_bytes(&[0u8; 8]).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EBADF));
        assert!(port.modem_lines().is_err());
        port.close();
        port.close();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn open_applies_raw_8n1_configuration() {
        let pty = crate::sim_link::Pty::open().unwrap();
        let port = TtyPort::open(&pty.slave_path, &PortSettings::default()).unwrap();

        let mut options: libc::termios = unsafe { std::mem::zeroed() };
        assert_eq!(unsafe { libc::tcgetattr(port.fd().unwrap(), &mut options) }, 0);

        assert_eq!(unsafe { libc::cfgetospeed(&options) }, libc::B9600);
        assert_eq!(options.c_cc[libc::VTIME], 25);
        assert_eq!(options.c_cc[libc::VMIN], 0);
        assert_eq!(options.c_cc[libc::VEOF], 0x04);

        assert_eq!(options.c_cflag & libc::CSIZE, libc::CS8);
        assert_eq!(options.c_cflag & libc::PARENB, 0);
        assert_eq!(options.c_cflag & libc::CSTOPB, 0);
        assert_eq!(options.c_cflag & libc::CRTSCTS, 0);
        assert_eq!(
            options.c_cflag & (libc::CREAD | libc::CLOCAL),
            libc::CREAD | libc::CLOCAL
        );
        assert_eq!(options.c_iflag & (libc::INLCR | libc::ICRNL), 0);
        assert_eq!(options.c_oflag & libc::OPOST, 0);
        assert_eq!(options.c_lflag, 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn open_applies_requested_baud() {
        let pty = crate::sim_link::Pty::open().unwrap();
        let settings = PortSettings {
            baud: 115200,
            ..PortSettings::default()
        };
        let port = TtyPort::open(&pty.slave_path, &settings).unwrap();

        let mut options: libc::termios = unsafe { std::mem::zeroed() };
        assert_eq!(unsafe { libc::tcgetattr(port.fd().unwrap(), &mut options) }, 0);
        assert_eq!(unsafe { libc::cfgetospeed(&options) }, libc::B115200);
    }
}
