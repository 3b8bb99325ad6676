use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use image::RgbImage;
use log::debug;

/// One decoded frame and when it was captured.
#[derive(Clone, Debug)]
pub struct Frame {
    pub index: u64,
    pub timestamp_ms: f64,
    pub image: RgbImage,
}

/// Pull-based frame supplier. `Ok(None)` is end of stream.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

fn frame_time_ms(index: u64, fps: f64) -> f64 {
    index as f64 * 1000.0 / fps
}

fn check_fps(fps: f64) -> Result<()> {
    if !(fps.is_finite() && fps > 0.0) {
        bail!("Frame rate must be positive, got {}", fps);
    }
    Ok(())
}

/// Image files of a directory, in file-name order, stamped at a fixed rate.
pub struct DirectorySource {
    files: VecDeque<PathBuf>,
    fps: f64,
    next_index: u64,
}

impl DirectorySource {
    const EXTENSIONS: [&'static str; 3] = ["png", "jpg", "jpeg"];

    pub fn open(dir: &Path, fps: f64) -> Result<Self> {
        check_fps(fps)?;
        if !dir.is_dir() {
            bail!("Frame directory not found: {:?}", dir);
        }

        let base = glob::Pattern::escape(&dir.to_string_lossy());
        let opts = glob::MatchOptions { case_sensitive: false, ..Default::default() };
        let mut files: Vec<PathBuf> = Vec::new();
        for ext in Self::EXTENSIONS {
            let pattern = format!("{}/*.{}", base, ext);
            for entry in glob::glob_with(&pattern, opts).with_context(|| format!("Bad frame pattern: {}", pattern))? {
                files.push(entry?);
            }
        }
        files.sort();
        files.dedup();
        debug!("{} frames in {:?}", files.len(), dir);
        Ok(Self { files: files.into(), fps, next_index: 0 })
    }

    pub fn remaining(&self) -> usize {
        self.files.len()
    }
}

impl FrameSource for DirectorySource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.files.pop_front() else {
            return Ok(None);
        };
        let image = image::open(&path)
            .with_context(|| format!("Failed to decode frame: {:?}", path))?
            .to_rgb8();
        let index = self.next_index;
        self.next_index += 1;
        Ok(Some(Frame { index, timestamp_ms: frame_time_ms(index, self.fps), image }))
    }
}

/// Frames already in memory.
pub struct MemorySource {
    frames: VecDeque<RgbImage>,
    fps: f64,
    next_index: u64,
}

impl MemorySource {
    pub fn new(frames: Vec<RgbImage>, fps: f64) -> Result<Self> {
        check_fps(fps)?;
        Ok(Self { frames: frames.into(), fps, next_index: 0 })
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(image) = self.frames.pop_front() else {
            return Ok(None);
        };
        let index = self.next_index;
        self.next_index += 1;
        Ok(Some(Frame { index, timestamp_ms: frame_time_ms(index, self.fps), image }))
    }
}
