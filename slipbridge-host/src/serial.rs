use libc;
use log::warn;
use slipbridge_runtime::SerialPort;
use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Write},
    mem::MaybeUninit,
    os::unix::{fs::OpenOptionsExt, io::AsRawFd},
    path::Path,
};

/// A tty in raw mode. Reads never block because the bridge only asks for what `available`
/// reports; writes block until the kernel has taken every byte.
pub struct TtySerial {
    file: File,
}

impl TtySerial {
    /// Opens `path` and configures it as a raw 8N1 line at `baud`.
    pub fn open(path: &Path, baud: u32) -> io::Result<Self> {
        let speed = baud_constant(baud).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported baud rate {}", baud),
            )
        })?;

        // O_NONBLOCK so the open does not wait for carrier on modem lines
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(path)?;
        let fd = file.as_raw_fd();

        // This block is marked unsafe because it uses FFI. It only touches the termios struct it
        // owns and the descriptor owned by `file`, and every call's failure is returned.
        // Resources:
        // man 3 termios
        unsafe {
            let mut tio: libc::termios = MaybeUninit::zeroed().assume_init();
            if libc::tcgetattr(fd, &mut tio) < 0 {
                return Err(io::Error::last_os_error());
            }
            libc::cfmakeraw(&mut tio);
            tio.c_cflag |= libc::CLOCAL | libc::CREAD;
            tio.c_cflag &= !(libc::CSTOPB | libc::CRTSCTS);
            if libc::cfsetispeed(&mut tio, speed) < 0 || libc::cfsetospeed(&mut tio, speed) < 0 {
                return Err(io::Error::last_os_error());
            }
            if libc::tcsetattr(fd, libc::TCSANOW, &tio) < 0 {
                return Err(io::Error::last_os_error());
            }

            let flags = libc::fcntl(fd, libc::F_GETFL);
            if flags < 0 {
                return Err(io::Error::last_os_error());
            }
            if libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) < 0 {
                return Err(io::Error::last_os_error());
            }

            // Drop whatever was sitting in the line before we took it over
            libc::tcflush(fd, libc::TCIOFLUSH);
        }

        Ok(TtySerial { file })
    }
}

impl SerialPort for TtySerial {
    fn available(&mut self) -> usize {
        let mut count: libc::c_int = 0;
        // See the comment in `open`. FIONREAD writes one c_int we own.
        let err = unsafe { libc::ioctl(self.file.as_raw_fd(), libc::FIONREAD, &mut count) };
        if err < 0 {
            warn!("FIONREAD failed: {}", io::Error::last_os_error());
            return 0;
        }
        count.max(0) as usize
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        match self.file.read(buf) {
            Ok(count) => count,
            Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => 0,
            Err(err) => {
                warn!("Serial read failed: {}", err);
                0
            }
        }
    }

    fn write(&mut self, data: &[u8]) {
        if let Err(err) = self.file.write_all(data) {
            warn!("Serial write of {} bytes failed: {}", data.len(), err);
        }
    }
}

fn baud_constant(baud: u32) -> Option<libc::speed_t> {
    let speed = match baud {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115_200 => libc::B115200,
        230_400 => libc::B230400,
        460_800 => libc::B460800,
        921_600 => libc::B921600,
        _ => return None,
    };
    Some(speed)
}
