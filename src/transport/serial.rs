//! Serial line transport for the TKey's CDC-ACM device node.
//!
//! The node is opened non-blocking and registered with the reactor of a
//! private current-thread runtime, so read deadlines are plain `tokio::time`
//! timeouts while the public API stays blocking. No read is ever parked on
//! another thread: an expired read leaves nothing behind, and dropping the
//! transport closes the node immediately.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nix::fcntl::OFlag;
use tokio::io::unix::AsyncFd;
use tokio::runtime::{Builder, Runtime};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use super::port::{PortSettings, Transport};

/// Blocking serial transport.
#[derive(Debug)]
pub struct SerialTransport {
    /// Open device node, registered with `runtime`. Declared first so it is
    /// closed before the runtime goes away.
    port: AsyncFd<File>,
    runtime: Runtime,
    path: PathBuf,
    speed: u32,
}

impl SerialTransport {
    /// Open the device node described by `settings` and wait for it to settle.
    pub fn open(settings: &PortSettings) -> io::Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_io()
            .enable_time()
            .build()?;

        if settings.configure_line {
            configure_line(&settings.path, settings.speed);
        }

        info!(path = %settings.path.display(), speed = settings.speed, "opening serial port");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags((OFlag::O_NONBLOCK | OFlag::O_NOCTTY).bits())
            .open(&settings.path)?;
        let port = {
            let _guard = runtime.enter();
            AsyncFd::new(file)?
        };

        if !settings.settle_delay.is_zero() {
            runtime.block_on(tokio::time::sleep(settings.settle_delay));
        }

        Ok(Self {
            port,
            runtime,
            path: settings.path.clone(),
            speed: settings.speed,
        })
    }

    /// Device node path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Configured line speed in baud.
    pub fn speed(&self) -> u32 {
        self.speed
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let Self { port, runtime, .. } = self;
        runtime.block_on(async {
            let mut written = 0;
            while written < bytes.len() {
                let mut guard = port.writable().await?;
                match guard.try_io(|inner| inner.get_ref().write(&bytes[written..])) {
                    Ok(Ok(0)) => return Err(io::ErrorKind::WriteZero.into()),
                    Ok(Ok(n)) => written += n,
                    Ok(Err(e)) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Ok(Err(e)) => return Err(e),
                    Err(_would_block) => continue,
                }
            }
            Ok(())
        })
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        let Self { port, runtime, .. } = self;
        runtime.block_on(async {
            let deadline = Instant::now() + timeout;
            let mut filled = 0;
            while filled < buf.len() {
                match timeout_at(deadline, read_some(port, &mut buf[filled..])).await {
                    Ok(Ok(0)) => break,
                    Ok(Ok(n)) => filled += n,
                    Ok(Err(e)) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Ok(Err(e)) => return Err(e),
                    Err(_) => break,
                }
            }
            Ok(filled)
        })
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "serial port closed");
    }
}

/// Wait for readiness, then read whatever is available.
async fn read_some(port: &AsyncFd<File>, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        let mut guard = port.readable().await?;
        match guard.try_io(|inner| inner.get_ref().read(buf)) {
            Ok(result) => return result,
            Err(_would_block) => continue,
        }
    }
}

/// Put the line in raw mode at `speed`. Failure is logged, not fatal: CDC-ACM
/// nodes work at any nominal speed and may already be raw.
fn configure_line(path: &Path, speed: u32) {
    let flag = if cfg!(target_os = "linux") { "-F" } else { "-f" };
    let result = std::process::Command::new("stty")
        .arg(flag)
        .arg(path)
        .args(["raw", "-echo"])
        .arg(speed.to_string())
        .output();

    match result {
        Ok(out) if out.status.success() => debug!(speed, "serial line configured"),
        Ok(out) => {
            let stderr = String::from_utf8_lossy(&out.stderr);
            warn!(status = %out.status, stderr = %stderr.trim(), "stty failed; using line as-is");
        }
        Err(e) => warn!(error = %e, "could not run stty; using line as-is"),
    }
}

#[cfg(test)]
mod tests {
    use nix::sys::stat::Mode;
    use nix::unistd::mkfifo;

    use super::*;

    fn settings_for(path: &Path) -> PortSettings {
        PortSettings {
            path: path.to_path_buf(),
            speed: 62_500,
            settle_delay: Duration::ZERO,
            configure_line: false,
        }
    }

    /// A FIFO opened read/write loops written bytes back, like a device that
    /// echoes its input.
    fn loopback_node(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("ttyACM0");
        mkfifo(&path, Mode::S_IRUSR | Mode::S_IWUSR).unwrap();
        path
    }

    #[test]
    fn test_loopback() {
        let dir = tempfile::tempdir().unwrap();
        let node = loopback_node(&dir);

        let mut port = SerialTransport::open(&settings_for(&node)).unwrap();
        assert_eq!(port.speed(), 62_500);
        assert_eq!(port.path(), node);

        port.write_all(&[0x38, 0x0a, 0x01]).unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(port.read_timeout(&mut buf, Duration::from_millis(200)).unwrap(), 2);
        assert_eq!(buf, [0x38, 0x0a]);

        // One byte left, then the deadline
        let mut buf = [0u8; 4];
        assert_eq!(port.read_timeout(&mut buf, Duration::from_millis(50)).unwrap(), 1);
        assert_eq!(buf[0], 0x01);
    }

    #[test]
    fn test_read_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let mut port = SerialTransport::open(&settings_for(&loopback_node(&dir))).unwrap();

        let started = std::time::Instant::now();
        let mut buf = [0u8; 1];
        assert_eq!(port.read_timeout(&mut buf, Duration::from_millis(50)).unwrap(), 0);
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    /// Descriptors of this process that point at `node`.
    #[cfg(target_os = "linux")]
    fn open_handles(node: &Path) -> usize {
        std::fs::read_dir("/proc/self/fd")
            .unwrap()
            .filter_map(|entry| std::fs::read_link(entry.ok()?.path()).ok())
            .filter(|target| target == node)
            .count()
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_drop_after_timeout_closes_node() {
        let dir = tempfile::tempdir().unwrap();
        let node = loopback_node(&dir);

        let mut port = SerialTransport::open(&settings_for(&node)).unwrap();
        assert_eq!(open_handles(&node), 1);

        let mut buf = [0u8; 1];
        assert_eq!(port.read_timeout(&mut buf, Duration::from_millis(50)).unwrap(), 0);
        drop(port);

        // Nothing is left waiting on the node
        assert_eq!(open_handles(&node), 0);
    }

    #[test]
    fn test_timed_out_read_loses_no_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let mut port = SerialTransport::open(&settings_for(&loopback_node(&dir))).unwrap();

        let mut buf = [0u8; 1];
        assert_eq!(port.read_timeout(&mut buf, Duration::from_millis(20)).unwrap(), 0);

        // A late byte reaches the next read
        port.write_all(&[0x5a]).unwrap();
        assert_eq!(port.read_timeout(&mut buf, Duration::from_millis(200)).unwrap(), 1);
        assert_eq!(buf[0], 0x5a);
    }

    #[test]
    fn test_open_missing_node() {
        let dir = tempfile::tempdir().unwrap();
        let err = SerialTransport::open(&settings_for(&dir.path().join("ttyACM9"))).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
