//! Locate the TKey's serial node by its USB ids.
//!
//! Each tty under `/sys/class/tty` whose `device` link leads to a USB
//! interface has the owning device's `idVendor`/`idProduct` one level up.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::core::{TKEY_USB_PID, TKEY_USB_VID};

/// Sysfs directory listing tty devices.
const TTY_CLASS_DIR: &str = "/sys/class/tty";

/// Directory holding the device nodes.
const DEV_DIR: &str = "/dev";

/// Port detection errors.
#[derive(Debug, Error)]
pub enum DetectError {
    /// No tty belongs to a TKey.
    #[error("no TKey found; pass the serial port explicitly")]
    NotFound,

    /// More than one TKey is plugged in.
    #[error("found {} TKeys ({}); pass the serial port explicitly", .0.len(), display_all(.0))]
    Ambiguous(Vec<PathBuf>),

    /// The tty class directory could not be listed.
    #[error("cannot scan serial ports: {0}")]
    Io(#[from] io::Error),
}

fn display_all(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Find the single connected TKey's serial node.
pub fn detect_port() -> Result<PathBuf, DetectError> {
    detect_port_in(Path::new(TTY_CLASS_DIR), Path::new(DEV_DIR))
}

/// [`detect_port`] against explicit sysfs and `/dev` roots.
pub fn detect_port_in(class_dir: &Path, dev_dir: &Path) -> Result<PathBuf, DetectError> {
    let mut found = Vec::new();
    for entry in fs::read_dir(class_dir)? {
        let entry = entry?;
        let usb_device = entry.path().join("device").join("..");
        if usb_ids(&usb_device) == Some((TKEY_USB_VID, TKEY_USB_PID)) {
            found.push(dev_dir.join(entry.file_name()));
        }
    }
    found.sort();

    match found.len() {
        0 => Err(DetectError::NotFound),
        1 => {
            let port = found.remove(0);
            debug!(port = %port.display(), "TKey detected");
            Ok(port)
        }
        _ => Err(DetectError::Ambiguous(found)),
    }
}

fn usb_ids(usb_device: &Path) -> Option<(u16, u16)> {
    let read_id = |name: &str| {
        let text = fs::read_to_string(usb_device.join(name)).ok()?;
        u16::from_str_radix(text.trim(), 16).ok()
    };
    Some((read_id("idVendor")?, read_id("idProduct")?))
}
