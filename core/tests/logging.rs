use std::fs;
use std::sync::Mutex;

use apm::{DriverDescriptorMap, PartitionMapEntry};
use apmboot_core::{run, Config};
use log::{Level, LevelFilter, Log, Metadata, Record};

struct Capture {
    records: Mutex<Vec<(Level, String)>>,
}

impl Log for Capture {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut records) = self.records.lock() {
            records.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static CAPTURE: Capture = Capture {
    records: Mutex::new(Vec::new()),
};

#[test]
fn extract_result_is_not_logged_at_info() {
    log::set_logger(&CAPTURE).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let dir = tempfile::tempdir().unwrap();
    let device = dir.path().join("device.img");
    let mut image = vec![0u8; 16 * 512];
    image[..512].copy_from_slice(&DriverDescriptorMap::new(512, 16).to_bytes());
    image[512..1024].copy_from_slice(&PartitionMapEntry::default().to_bytes());
    fs::write(&device, &image).unwrap();

    let out = dir.path().join("out.dump");
    run(&Config {
        device,
        extract_to: Some(out),
        ..Config::default()
    })
    .unwrap();

    let records = CAPTURE.records.lock().unwrap();
    let dumped: Vec<_> = records
        .iter()
        .filter(|(_, message)| message.starts_with("dumped drivers to"))
        .collect();
    assert_eq!(dumped.len(), 1);
    assert_eq!(dumped[0].0, Level::Debug);
}
