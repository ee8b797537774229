//! Single-partition Apple Partition Map installer.
//!
//! Writes a Driver Descriptor Map, one Partition Map Entry and a boot block
//! onto a raw block device, and dumps the drivers embedded in an existing
//! device so they can be re-injected later.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                  session::run (Config)                     │
//! │         opens handles, sequences extract + install         │
//! └──────────────────────────┬─────────────────────────────────┘
//!                            │
//!          ┌─────────────────┴─────────────────┐
//!          ▼                                   ▼
//! ┌──────────────────┐               ┌──────────────────┐
//! │  extract         │               │  install         │
//! │  device -> dump  │               │  dump -> device  │
//! └──────────────────┘               └──────────────────┘
//!          │                                   │
//!          └─────────────────┬─────────────────┘
//!                            ▼
//! ┌────────────────────────────────────────────────────────────┐
//! │     Device (gpt_disk_io::BlockIoAdapter over a file)       │
//! │        apm records          dump framing                   │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Extract and install never call each other; they share the device
//! adapter, the record codecs and the dump format.

pub mod config;
pub mod device;
pub mod dump;
pub mod error;
pub mod extract;
pub mod install;
pub mod session;

pub use config::{Config, DeviceAccess, Mode};
pub use device::Device;
pub use error::{Error, Result};
pub use extract::extract_drivers;
pub use install::{install_single_partition, InstallReport, InstallStage};
pub use session::{run, Report};

/// Blocks reserved at the start of the device for the driver map and
/// partition map.
pub const RESERVED_BLOCKS: u32 = 4;

/// Size of the boot block image written at the start of the data partition.
pub const BOOT_BLOCK_SIZE: usize = 1024;
