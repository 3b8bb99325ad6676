use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use lanewatch_track::VehicleRecord;

/// Receiver of per-vehicle records.
pub trait ViolationSink {
    fn emit(&mut self, record: &VehicleRecord) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl ViolationSink for Vec<VehicleRecord> {
    fn emit(&mut self, record: &VehicleRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// One JSON object per line.
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl JsonLinesSink<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).with_context(|| format!("Failed to create record file: {:?}", path))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> ViolationSink for JsonLinesSink<W> {
    fn emit(&mut self, record: &VehicleRecord) -> Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
