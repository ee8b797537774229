//! Command line front end.
//!
//! Parses flags into an [`apmboot_core::Config`] and hands it to the core.
//! Exit status is 0 on success or `-h`, 1 on any error.

use std::path::PathBuf;

use anyhow::Context;
use apmboot_core::Config;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "apmboot",
    about = "Writes an Apple driver map, one partition and a boot block to a device."
)]
struct Opts {
    /// Boot block image that should be written to the drive
    #[structopt(short = "b", value_name = "boot block", parse(from_os_str))]
    boot_block: Option<PathBuf>,

    /// Driver dump that should be installed
    #[structopt(short = "d", value_name = "driver file", parse(from_os_str))]
    driver: Option<PathBuf>,

    /// Extract the drivers from the device into this file
    #[structopt(short = "e", value_name = "driver file", parse(from_os_str))]
    extract: Option<PathBuf>,

    /// Force installation, assumes "yes" for all safety prompts
    #[structopt(short = "f")]
    force: bool,

    /// Single partition mode: create one large partition on the drive and
    /// install the boot block to it
    #[structopt(short = "s")]
    single_partition: bool,

    /// Device or disk image
    #[structopt(parse(from_os_str))]
    device: PathBuf,
}

impl From<Opts> for Config {
    fn from(opts: Opts) -> Self {
        Config {
            device: opts.device,
            boot_block: opts.boot_block,
            driver_dump: opts.driver,
            extract_to: opts.extract,
            force: opts.force,
            single_partition: opts.single_partition,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from(Opts::from_args());
    log::debug!("{:?}", config);

    let report = apmboot_core::run(&config)
        .with_context(|| format!("{}", config.device.display()))?;

    if let Some((path, _)) = &report.extracted {
        println!("dumped drivers to {}", path.display());
    }

    Ok(())
}
