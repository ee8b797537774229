//! Invocation configuration.
//!
//! Built once from the command line and passed by reference into
//! [`crate::session::run`]; nothing downstream mutates it.

use std::fs::OpenOptions;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// What a validated configuration will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Extract,
    Install,
    ExtractThenInstall,
}

impl Mode {
    pub fn installs(self) -> bool {
        matches!(self, Self::Install | Self::ExtractThenInstall)
    }
}

/// How the device file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceAccess {
    ReadOnly,
    ReadWrite,
}

impl DeviceAccess {
    /// Open options granting this access to an existing file.
    pub fn open_options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options.read(true).write(self == Self::ReadWrite);
        options
    }
}

/// Parameters for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Device (or disk image) to operate on
    pub device: PathBuf,
    /// Boot block image (`-b`), required to install
    pub boot_block: Option<PathBuf>,
    /// Driver dump to inject (`-d`)
    pub driver_dump: Option<PathBuf>,
    /// Extract destination (`-e`)
    pub extract_to: Option<PathBuf>,
    /// Skip safety prompts (`-f`)
    pub force: bool,
    /// Create one large partition and install the boot block (`-s`)
    pub single_partition: bool,
}

impl Config {
    /// Validate the flag combination.
    pub fn mode(&self) -> Result<Mode> {
        let mode = match (self.extract_to.is_some(), self.single_partition) {
            (true, true) => Mode::ExtractThenInstall,
            (true, false) => Mode::Extract,
            (false, true) => Mode::Install,
            (false, false) => return Err(Error::Config("please specify either -s or -e")),
        };

        if mode.installs() && self.boot_block.is_none() {
            return Err(Error::Config("-b is required"));
        }

        Ok(mode)
    }

    /// Access needed on the device: read-only unless installing.
    pub fn device_access(&self) -> Result<DeviceAccess> {
        Ok(if self.mode()?.installs() {
            DeviceAccess::ReadWrite
        } else {
            DeviceAccess::ReadOnly
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            device: PathBuf::from("/dev/sdz"),
            ..Config::default()
        }
    }

    #[test]
    fn test_requires_an_action() {
        assert!(matches!(
            config().mode(),
            Err(Error::Config("please specify either -s or -e"))
        ));
    }

    #[test]
    fn test_install_requires_boot_block() {
        let cfg = Config {
            single_partition: true,
            ..config()
        };
        assert!(matches!(cfg.mode(), Err(Error::Config("-b is required"))));

        let cfg = Config {
            boot_block: Some(PathBuf::from("boot.img")),
            ..cfg
        };
        assert_eq!(cfg.mode().unwrap(), Mode::Install);
    }

    #[test]
    fn test_extract_alone_is_read_only() {
        let cfg = Config {
            extract_to: Some(PathBuf::from("drivers.dump")),
            ..config()
        };
        assert_eq!(cfg.mode().unwrap(), Mode::Extract);
        assert_eq!(cfg.device_access().unwrap(), DeviceAccess::ReadOnly);
    }

    #[test]
    fn test_extract_then_install() {
        let cfg = Config {
            extract_to: Some(PathBuf::from("drivers.dump")),
            boot_block: Some(PathBuf::from("boot.img")),
            single_partition: true,
            ..config()
        };
        assert_eq!(cfg.mode().unwrap(), Mode::ExtractThenInstall);
        assert_eq!(cfg.device_access().unwrap(), DeviceAccess::ReadWrite);
    }

    #[test]
    fn test_device_access_needs_valid_flags() {
        assert!(matches!(config().device_access(), Err(Error::Config(_))));
    }
}
