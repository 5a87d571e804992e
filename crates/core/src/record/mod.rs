use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
    audio::Slot,
    render::{Fill, Point, Surface},
    DualTrackError, Result,
};

/// One primitive issued against a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Clear,
    FillRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Fill,
    },
    FillPath {
        points: Vec<Point>,
        fill: Fill,
    },
    FillCircle {
        center: Point,
        radius: f32,
        fill: Fill,
    },
}

/// Surface that keeps every primitive it receives instead of rasterising.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    width: f32,
    height: f32,
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Drains the recorded commands, leaving the surface empty.
    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// True when nothing has been drawn since the last clear.
    pub fn is_blank(&self) -> bool {
        self.commands
            .last()
            .map_or(true, |command| matches!(command, DrawCommand::Clear))
    }
}

impl Surface for RecordingSurface {
    fn width(&self) -> f32 {
        self.width
    }

    fn height(&self) -> f32 {
        self.height
    }

    fn clear(&mut self) {
        self.commands.push(DrawCommand::Clear);
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, fill: &Fill) {
        self.commands.push(DrawCommand::FillRect {
            x,
            y,
            width,
            height,
            fill: fill.clone(),
        });
    }

    fn fill_path(&mut self, points: &[Point], fill: &Fill) {
        self.commands.push(DrawCommand::FillPath {
            points: points.to_vec(),
            fill: fill.clone(),
        });
    }

    fn fill_circle(&mut self, center: Point, radius: f32, fill: &Fill) {
        self.commands.push(DrawCommand::FillCircle {
            center,
            radius,
            fill: fill.clone(),
        });
    }
}

/// A rendered frame as written by [`FrameRecorder`].
#[derive(Debug, Clone, Serialize)]
pub struct FrameRecord<'a> {
    pub frame: u64,
    pub time: f64,
    pub active: Slot,
    pub commands: &'a [DrawCommand],
}

/// Writes rendered frames as JSON lines.
#[derive(Debug)]
pub struct FrameRecorder<W: Write> {
    writer: W,
    frames_written: u64,
    is_recording: bool,
}

impl FrameRecorder<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> FrameRecorder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            frames_written: 0,
            is_recording: false,
        }
    }

    pub fn start(&mut self) -> Result<()> {
        self.is_recording = true;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.is_recording = false;
        self.writer.flush()?;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn write_frame(&mut self, record: &FrameRecord<'_>) -> Result<()> {
        if !self.is_recording {
            return Err(DualTrackError::msg("recorder has not been started"));
        }

        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
