//! Scripted sessions: both slots loaded up front, actions replayed against a
//! fixed-rate frame clock, and every frame that drew something recorded.

use std::io::Write;

use crate::{
    audio::{Playable, Slot, SLOT_COUNT},
    config::AppConfig,
    playback::PlaybackController,
    record::{FrameRecord, FrameRecorder, RecordingSurface},
    timeline::{Action, FrameClock, ScheduledEvent, Scheduler},
    DualTrackError, Result,
};

#[derive(Debug)]
pub struct Session<H: Playable> {
    controller: PlaybackController<H>,
    surface: RecordingSurface,
    scheduler: Scheduler,
    clock: FrameClock,
}

impl<H: Playable> Session<H> {
    /// Loads `tracks` into slots A and B in that order, so slot A starts
    /// playing before the first frame.
    pub fn new(
        config: &AppConfig,
        tracks: [H; SLOT_COUNT],
        events: Vec<ScheduledEvent>,
    ) -> Result<Self> {
        let mut controller = PlaybackController::new(config);
        for (slot, track) in Slot::ALL.into_iter().zip(tracks) {
            controller.load(slot, track)?;
        }

        let mut scheduler = Scheduler::new();
        scheduler.set_events(events);

        Ok(Self {
            controller,
            surface: RecordingSurface::new(config.canvas.width as f32, config.canvas.height as f32),
            scheduler,
            clock: FrameClock::new(config.canvas.fps),
        })
    }

    /// Runs `seconds` worth of frames and returns how many were written.
    ///
    /// Each frame applies the actions due at its start time, advances every
    /// handle by one frame, then ticks the visualiser. Frames that issued no
    /// draw commands are skipped.
    pub fn run<W: Write>(&mut self, seconds: f64, recorder: &mut FrameRecorder<W>) -> Result<u64> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(DualTrackError::InvalidInput(
                "session length must be a finite, non-negative number of seconds",
            ));
        }

        let end_frame = self.clock.frame() + self.clock.frames_for(seconds);
        let written_before = recorder.frames_written();
        recorder.start()?;
        tracing::info!(
            frames = end_frame - self.clock.frame(),
            delta = self.clock.delta_seconds(),
            "starting session"
        );

        while self.clock.frame() < end_frame {
            self.step(recorder)?;
        }

        recorder.stop()?;
        Ok(recorder.frames_written() - written_before)
    }

    /// Applies one user action to the controller.
    pub fn apply(&mut self, action: Action) {
        tracing::info!(%action, time = self.clock.elapsed_seconds(), "applying action");
        match action {
            Action::Play => self.controller.resume(),
            Action::Stop => self.controller.stop(&mut self.surface),
            Action::Switch => self.controller.switch_track(),
        }
    }

    pub fn controller(&self) -> &PlaybackController<H> {
        &self.controller
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    fn step<W: Write>(&mut self, recorder: &mut FrameRecorder<W>) -> Result<()> {
        for action in self.scheduler.due(self.clock.elapsed_seconds()) {
            self.apply(action);
        }

        self.controller.advance(self.clock.delta_seconds());
        let outcome = self.controller.tick(&mut self.surface)?;
        tracing::trace!(frame = self.clock.frame(), ?outcome, "tick");

        let commands = self.surface.take_commands();
        if !commands.is_empty() {
            recorder.write_frame(&FrameRecord {
                frame: self.clock.frame(),
                time: self.clock.elapsed_seconds(),
                active: self.controller.active(),
                commands: &commands,
            })?;
        }

        self.clock.advance();
        Ok(())
    }
}
