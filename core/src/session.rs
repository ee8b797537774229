//! One invocation: open handles, extract, install.
//!
//! Every handle is owned by this function's scope, so it is closed on every
//! return path, early failures included. The device handle is shared by the
//! extract and install phases; each phase positions it explicitly.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use log::{debug, info, warn};

use crate::config::Config;
use crate::device::Device;
use crate::error::{Error, IoContext, Result};
use crate::extract::{extract_drivers, ExtractReport};
use crate::install::{install_single_partition, InstallReport, InstallStage};

/// Outcome of a successful invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Dump destination and what was written to it
    pub extracted: Option<(PathBuf, ExtractReport)>,
    pub installed: Option<InstallReport>,
    /// Last stage reached
    pub stage: InstallStage,
}

/// Execute `config`.
pub fn run(config: &Config) -> Result<Report> {
    let mode = config.mode()?;

    let file = config
        .device_access()?
        .open_options()
        .open(&config.device)
        .context("failed to open device file")?;
    let mut device = Device::new(file);
    let mut stage = InstallStage::DeviceOpened;
    debug!("{}: {}", config.device.display(), stage);

    let extracted = match &config.extract_to {
        Some(path) => {
            let report = extract_drivers(&mut device, path)?;
            stage = InstallStage::ExtractDone;
            debug!("{}", stage);
            Some((path.clone(), report))
        }
        None => None,
    };

    if !mode.installs() {
        return Ok(Report {
            extracted,
            installed: None,
            stage,
        });
    }

    // TODO: prompt before overwriting the device when force is unset
    if !config.force {
        warn!("overwriting {} without confirmation", config.device.display());
    }

    let dump = config
        .driver_dump
        .as_ref()
        .map(|path| File::open(path).context("failed to open driver dump"))
        .transpose()?
        .map(BufReader::new);

    let boot_block = match &config.boot_block {
        Some(path) => File::open(path).context("failed to open boot block file")?,
        None => return Err(Error::Config("-b is required")),
    };

    let device_len = device.byte_len().context("failed to stat device")?;
    let report = install_single_partition(&mut device, device_len, dump, boot_block)?;

    info!(
        "installed {} drivers and a {}-block partition at block {}",
        report.drivers.len(),
        report.partition_blocks,
        report.first_free_block
    );

    Ok(Report {
        extracted,
        installed: Some(report),
        stage: InstallStage::BootBlockWritten,
    })
}
