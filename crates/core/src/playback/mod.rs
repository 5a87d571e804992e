//! Track slots and the controller that decides which one plays.
//!
//! Only the active slot ever plays. Switching reads the position of the slot
//! being paused and resumes the newly active slot from there, clamped to its
//! own duration.

use crate::{
    analysis::{AnalysisGraph, AnalysisSource, SourceNode},
    audio::{Playable, Slot, SLOT_COUNT},
    config::AppConfig,
    pipeline::{TickOutcome, VisualizationPipeline},
    render::Surface,
    Result,
};

/// A loaded track together with its connection into the analysis graph.
#[derive(Debug)]
pub struct TrackSlot<H> {
    pub handle: H,
    pub source: SourceNode,
}

/// Fixed pair of optionally populated slots.
#[derive(Debug)]
pub struct TrackRegistry<H> {
    slots: [Option<TrackSlot<H>>; SLOT_COUNT],
}

impl<H> Default for TrackRegistry<H> {
    fn default() -> Self {
        Self { slots: [None, None] }
    }
}

impl<H> TrackRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: Slot) -> Option<&TrackSlot<H>> {
        self.slots[slot.index()].as_ref()
    }

    pub fn handle(&self, slot: Slot) -> Option<&H> {
        self.get(slot).map(|track| &track.handle)
    }

    pub fn handle_mut(&mut self, slot: Slot) -> Option<&mut H> {
        self.slots[slot.index()]
            .as_mut()
            .map(|track| &mut track.handle)
    }

    /// Stores `track` in `slot`, returning whatever it replaced.
    pub fn insert(&mut self, slot: Slot, track: TrackSlot<H>) -> Option<TrackSlot<H>> {
        self.slots[slot.index()].replace(track)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Slot, &TrackSlot<H>)> {
        Slot::ALL
            .into_iter()
            .filter_map(|slot| self.get(slot).map(|track| (slot, track)))
    }
}

impl<H: Playable> TrackRegistry<H> {
    pub fn playing_count(&self) -> usize {
        self.iter()
            .filter(|(_, track)| track.handle.is_playing())
            .count()
    }
}

/// Session-wide playback bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackState {
    pub active: Slot,
    /// Position carried across switches, in seconds.
    pub saved_position: f64,
}

/// Owns both slots, the analysis graph and the visualisation pipeline, and
/// applies the four user actions: load, play, stop and switch.
#[derive(Debug)]
pub struct PlaybackController<H: Playable> {
    registry: TrackRegistry<H>,
    state: PlaybackState,
    graph: AnalysisGraph,
    pipeline: VisualizationPipeline,
    pending: [bool; SLOT_COUNT],
}

impl<H: Playable> PlaybackController<H> {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            registry: TrackRegistry::new(),
            state: PlaybackState::default(),
            graph: AnalysisGraph::new(config.analyser.clone()),
            pipeline: VisualizationPipeline::new(config.visuals.clone()),
            pending: [false; SLOT_COUNT],
        }
    }

    /// Puts `handle` into `slot`, replacing and dropping any previous track.
    /// Loading the active slot starts it straight away, or as soon as its
    /// metadata is ready.
    pub fn load(&mut self, slot: Slot, handle: H) -> Result<()> {
        let source = self.graph.connect(slot)?;
        if self
            .registry
            .insert(slot, TrackSlot { handle, source })
            .is_some()
        {
            tracing::debug!(%slot, "replaced loaded track");
        }
        self.pending[slot.index()] = false;
        tracing::debug!(%slot, node = source.id(), "loaded track");

        if slot == self.state.active {
            self.play(slot);
        }
        Ok(())
    }

    /// Pauses the other slot, remembering its position, then starts `slot`
    /// from that position. Empty slots are ignored.
    pub fn play(&mut self, slot: Slot) {
        let other = slot.other();
        self.pending[other.index()] = false;
        if let Some(handle) = self.registry.handle_mut(other) {
            self.state.saved_position = handle.position();
            handle.pause();
        }

        let Some(handle) = self.registry.handle(slot) else {
            tracing::debug!(%slot, "play on empty slot");
            return;
        };

        if handle.is_ready() {
            self.start_from_saved(slot);
        } else {
            self.pending[slot.index()] = true;
            tracing::debug!(%slot, "deferring play until metadata is ready");
        }
    }

    /// Signal from the host that `slot` can now report its duration. Fires a
    /// deferred play only while that slot is still active.
    /// A signal that arrives while the handle still reports not ready is
    /// ignored and the play stays deferred.
    pub fn metadata_ready(&mut self, slot: Slot) {
        if !self.pending[slot.index()] {
            return;
        }
        if slot != self.state.active {
            self.pending[slot.index()] = false;
            tracing::debug!(%slot, "dropping deferred play for inactive slot");
            return;
        }

        match self.registry.handle(slot) {
            Some(handle) if handle.is_ready() => {
                self.pending[slot.index()] = false;
                self.start_from_saved(slot);
            }
            Some(_) => tracing::debug!(%slot, "metadata signal before handle is ready"),
            None => self.pending[slot.index()] = false,
        }
    }

    /// Plays the active slot from wherever it currently is.
    pub fn resume(&mut self) {
        let active = self.state.active;
        if let Some(handle) = self.registry.handle_mut(active) {
            handle.play();
            self.ensure_visualizing();
        }
    }

    /// Pauses and rewinds the active slot, stops the pipeline and clears the
    /// surface.
    pub fn stop(&mut self, surface: &mut dyn Surface) {
        let active = self.state.active;
        self.pending[active.index()] = false;
        if let Some(handle) = self.registry.handle_mut(active) {
            handle.pause();
            handle.set_position(0.0);
        }
        self.pipeline.stop(surface);
    }

    pub fn switch_track(&mut self) {
        self.state.active = self.state.active.other();
        tracing::debug!(active = %self.state.active, "switched track");
        self.play(self.state.active);
    }

    /// Moves every handle's clock forward by `delta_seconds`.
    pub fn advance(&mut self, delta_seconds: f64) {
        for slot in Slot::ALL {
            if let Some(handle) = self.registry.handle_mut(slot) {
                handle.advance(delta_seconds);
            }
        }
    }

    /// Runs one visualisation frame against `surface`.
    pub fn tick(&mut self, surface: &mut dyn Surface) -> Result<TickOutcome> {
        if self.pipeline.is_running() {
            self.graph.pump(
                self.registry
                    .iter()
                    .map(|(_, track)| (track.source, &track.handle as &dyn Playable)),
            )?;
        }

        let source = self
            .graph
            .analyser()
            .map(|analyser| analyser as &dyn AnalysisSource);
        Ok(self.pipeline.tick(source, self.state.active, surface))
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Slot that play, stop and the visualiser currently act on.
    pub fn active(&self) -> Slot {
        self.state.active
    }

    /// Last position carried across a switch, already clamped to the
    /// duration of the slot it was applied to.
    pub fn saved_position(&self) -> f64 {
        self.state.saved_position
    }

    pub fn is_visualizing(&self) -> bool {
        self.pipeline.is_running()
    }

    /// Whether `slot` is waiting on its metadata before it can start.
    pub fn is_pending(&self, slot: Slot) -> bool {
        self.pending[slot.index()]
    }

    pub fn registry(&self) -> &TrackRegistry<H> {
        &self.registry
    }

    /// Handle loaded into `slot`, if any.
    pub fn handle(&self, slot: Slot) -> Option<&H> {
        self.registry.handle(slot)
    }

    /// Mutable access for hosts that update a handle in place, e.g. when its
    /// metadata finishes loading.
    pub fn handle_mut(&mut self, slot: Slot) -> Option<&mut H> {
        self.registry.handle_mut(slot)
    }

    pub fn graph(&self) -> &AnalysisGraph {
        &self.graph
    }

    pub fn pipeline(&self) -> &VisualizationPipeline {
        &self.pipeline
    }

    fn start_from_saved(&mut self, slot: Slot) {
        let Some(handle) = self.registry.handle_mut(slot) else {
            return;
        };

        // Clamped against the track being started, even when the position
        // came from the other one.
        let mut position = self.state.saved_position.max(0.0);
        if let Some(duration) = handle.duration() {
            position = position.min(duration);
        }
        self.state.saved_position = position;

        handle.set_position(position);
        handle.play();
        tracing::debug!(%slot, position, "started track");
        self.ensure_visualizing();
    }

    fn ensure_visualizing(&mut self) {
        self.pipeline.start();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::MediaTrack,
        config::AnalyserConfig,
        pipeline::PipelineState,
        record::{DrawCommand, RecordingSurface},
    };

    #[derive(Debug)]
    struct FakeTrack {
        duration: f64,
        position: f64,
        playing: bool,
        ready: bool,
    }

    impl FakeTrack {
        fn new(duration: f64) -> Self {
            Self {
                duration,
                position: 0.0,
                playing: false,
                ready: true,
            }
        }

        fn loading(duration: f64) -> Self {
            Self {
                ready: false,
                ..Self::new(duration)
            }
        }
    }

    impl Playable for FakeTrack {
        fn is_ready(&self) -> bool {
            self.ready
        }

        fn duration(&self) -> Option<f64> {
            self.ready.then_some(self.duration)
        }

        fn position(&self) -> f64 {
            self.position
        }

        fn set_position(&mut self, seconds: f64) {
            self.position = seconds;
        }

        fn play(&mut self) {
            self.playing = true;
        }

        fn pause(&mut self) {
            self.playing = false;
        }

        fn is_playing(&self) -> bool {
            self.playing
        }

        fn advance(&mut self, delta_seconds: f64) {
            if self.playing {
                self.position = (self.position + delta_seconds).min(self.duration);
            }
        }
    }

    fn small_config() -> AppConfig {
        AppConfig {
            analyser: AnalyserConfig {
                fft_size: 32,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn controller() -> PlaybackController<FakeTrack> {
        PlaybackController::new(&small_config())
    }

    fn position(controller: &PlaybackController<FakeTrack>, slot: Slot) -> f64 {
        controller.handle(slot).unwrap().position()
    }

    fn is_playing(controller: &PlaybackController<FakeTrack>, slot: Slot) -> bool {
        controller.handle(slot).unwrap().is_playing()
    }

    #[test]
    fn loading_active_slot_autoplays() {
        let mut controller = controller();
        controller.load(Slot::A, FakeTrack::new(10.0)).unwrap();

        assert!(is_playing(&controller, Slot::A));
        assert!(controller.is_visualizing());
    }

    #[test]
    fn loading_inactive_slot_waits() {
        let mut controller = controller();
        controller.load(Slot::B, FakeTrack::new(10.0)).unwrap();

        assert!(!is_playing(&controller, Slot::B));
        assert!(!controller.is_visualizing());
    }

    #[test]
    fn switch_to_empty_slot_only_pauses() {
        let mut controller = controller();
        controller.load(Slot::A, FakeTrack::new(10.0)).unwrap();
        controller.advance(3.0);
        controller.switch_track();

        assert_eq!(controller.active(), Slot::B);
        assert!(controller.handle(Slot::B).is_none());
        assert!(!is_playing(&controller, Slot::A));
        assert!((position(&controller, Slot::A) - 3.0).abs() < 1e-9);
        assert!((controller.saved_position() - 3.0).abs() < 1e-9);
        assert_eq!(controller.registry().playing_count(), 0);
    }

    #[test]
    fn switching_there_and_back_keeps_position() {
        let mut controller = controller();
        controller.load(Slot::A, FakeTrack::new(10.0)).unwrap();
        controller.load(Slot::B, FakeTrack::new(20.0)).unwrap();
        controller.advance(4.0);

        controller.switch_track();
        assert!(is_playing(&controller, Slot::B));
        assert!((position(&controller, Slot::B) - 4.0).abs() < 1e-9);

        controller.switch_track();
        assert_eq!(controller.active(), Slot::A);
        assert!(is_playing(&controller, Slot::A));
        assert!((position(&controller, Slot::A) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn position_carries_over_from_the_other_track() {
        let mut controller = controller();
        controller.load(Slot::A, FakeTrack::new(10.0)).unwrap();
        controller.load(Slot::B, FakeTrack::new(20.0)).unwrap();

        controller.advance(2.0);
        controller.switch_track();
        controller.advance(1.5);
        controller.switch_track();

        assert!((position(&controller, Slot::A) - 3.5).abs() < 1e-9);
    }

    #[test]
    fn saved_position_clamps_to_new_duration() {
        let mut controller = controller();
        controller.load(Slot::A, FakeTrack::new(10.0)).unwrap();
        controller.load(Slot::B, FakeTrack::new(2.0)).unwrap();
        controller.advance(5.0);

        controller.switch_track();

        assert_eq!(position(&controller, Slot::B), 2.0);
        assert_eq!(controller.saved_position(), 2.0);
        assert!(is_playing(&controller, Slot::B));
    }

    #[test]
    fn never_more_than_one_slot_playing() {
        let mut controller = controller();
        let mut surface = RecordingSurface::new(32.0, 32.0);

        controller.load(Slot::A, FakeTrack::new(10.0)).unwrap();
        assert!(controller.registry().playing_count() <= 1);
        controller.load(Slot::B, FakeTrack::new(8.0)).unwrap();
        assert!(controller.registry().playing_count() <= 1);

        for step in 0..12 {
            match step % 4 {
                0 => controller.switch_track(),
                1 => controller.resume(),
                2 => controller.play(controller.active()),
                _ => controller.stop(&mut surface),
            }
            controller.advance(0.7);
            assert!(controller.registry().playing_count() <= 1, "step {step}");
        }

        controller.load(controller.active(), FakeTrack::new(3.0)).unwrap();
        assert_eq!(controller.registry().playing_count(), 1);
    }

    #[test]
    fn stop_always_clears_and_disables() {
        let mut surface = RecordingSurface::new(32.0, 32.0);

        let mut empty = controller();
        empty.stop(&mut surface);
        assert!(!empty.is_visualizing());
        assert!(surface.is_blank());

        let mut controller = controller();
        controller.load(Slot::A, FakeTrack::new(10.0)).unwrap();
        controller.advance(2.0);
        controller.tick(&mut surface).unwrap();
        assert!(!surface.is_blank());

        controller.stop(&mut surface);
        assert!(!controller.is_visualizing());
        assert!(surface.is_blank());
        assert!(!is_playing(&controller, Slot::A));
        assert_eq!(position(&controller, Slot::A), 0.0);
    }

    #[test]
    fn tick_after_stop_renders_nothing() {
        let mut controller = controller();
        let mut surface = RecordingSurface::new(32.0, 32.0);
        controller.load(Slot::A, FakeTrack::new(10.0)).unwrap();
        controller.stop(&mut surface);
        surface.take_commands();

        assert_eq!(controller.tick(&mut surface).unwrap(), TickOutcome::Cancelled);
        assert_eq!(controller.tick(&mut surface).unwrap(), TickOutcome::Idle);
        assert!(surface.commands().is_empty());
    }

    #[test]
    fn resume_keeps_saved_position() {
        let mut controller = controller();
        let mut surface = RecordingSurface::new(32.0, 32.0);
        controller.load(Slot::A, FakeTrack::new(10.0)).unwrap();
        controller.load(Slot::B, FakeTrack::new(10.0)).unwrap();
        controller.advance(3.0);
        controller.switch_track();
        controller.stop(&mut surface);

        controller.resume();

        assert!(is_playing(&controller, Slot::B));
        assert_eq!(position(&controller, Slot::B), 0.0);
        assert!((controller.saved_position() - 3.0).abs() < 1e-9);
        assert_eq!(controller.pipeline().state(), PipelineState::Running);
    }

    #[test]
    fn resume_on_empty_slot_is_a_no_op() {
        let mut controller = controller();
        controller.resume();
        assert!(!controller.is_visualizing());
    }

    #[test]
    fn play_waits_for_metadata() {
        let mut controller = controller();
        controller.load(Slot::A, FakeTrack::loading(10.0)).unwrap();

        assert!(controller.is_pending(Slot::A));
        assert!(!is_playing(&controller, Slot::A));
        assert!(!controller.is_visualizing());

        controller.handle_mut(Slot::A).unwrap().ready = true;
        controller.metadata_ready(Slot::A);

        assert!(!controller.is_pending(Slot::A));
        assert!(is_playing(&controller, Slot::A));
        assert!(controller.is_visualizing());
    }

    #[test]
    fn early_metadata_signal_keeps_play_deferred() {
        let mut controller = controller();
        controller.load(Slot::B, FakeTrack::new(10.0)).unwrap();
        controller.load(Slot::A, FakeTrack::loading(2.0)).unwrap();
        controller.switch_track();
        controller.advance(5.0);
        controller.switch_track();
        assert!(controller.is_pending(Slot::A));

        controller.metadata_ready(Slot::A);

        assert!(controller.is_pending(Slot::A));
        assert!(!is_playing(&controller, Slot::A));
        assert_eq!(controller.registry().playing_count(), 0);

        controller.handle_mut(Slot::A).unwrap().ready = true;
        controller.metadata_ready(Slot::A);

        assert!(!controller.is_pending(Slot::A));
        assert!(is_playing(&controller, Slot::A));
        assert_eq!(position(&controller, Slot::A), 2.0);
        assert_eq!(controller.saved_position(), 2.0);
    }

    #[test]
    fn deferred_play_dropped_after_switch() {
        let mut controller = controller();
        controller.load(Slot::B, FakeTrack::new(10.0)).unwrap();
        controller.load(Slot::A, FakeTrack::loading(10.0)).unwrap();
        controller.switch_track();

        controller.handle_mut(Slot::A).unwrap().ready = true;
        controller.metadata_ready(Slot::A);

        assert!(!is_playing(&controller, Slot::A));
        assert!(is_playing(&controller, Slot::B));
    }

    #[test]
    fn deferred_play_dropped_after_stop() {
        let mut controller = controller();
        let mut surface = RecordingSurface::new(32.0, 32.0);
        controller.load(Slot::A, FakeTrack::loading(10.0)).unwrap();
        controller.stop(&mut surface);

        controller.handle_mut(Slot::A).unwrap().ready = true;
        controller.metadata_ready(Slot::A);

        assert!(!is_playing(&controller, Slot::A));
    }

    #[test]
    fn reloading_active_slot_replaces_and_autoplays() {
        let mut controller = controller();
        controller.load(Slot::A, FakeTrack::new(10.0)).unwrap();
        let first = controller.registry().get(Slot::A).unwrap().source;
        controller.advance(2.0);

        controller.load(Slot::A, FakeTrack::new(30.0)).unwrap();
        let second = controller.registry().get(Slot::A).unwrap().source;

        assert_ne!(first, second);
        assert!(!controller.graph().is_connected(first));
        assert!(controller.graph().is_connected(second));
        assert_eq!(controller.handle(Slot::A).unwrap().duration, 30.0);
        assert!(is_playing(&controller, Slot::A));
        assert_eq!(controller.registry().playing_count(), 1);
    }

    #[test]
    fn renders_layers_for_active_slot() {
        let mut controller: PlaybackController<MediaTrack> = PlaybackController::new(&small_config());
        let mut surface = RecordingSurface::new(64.0, 48.0);
        let tone = MediaTrack::sine(440.0, 1.0, 8_000).unwrap();

        controller.load(Slot::A, tone.clone()).unwrap();
        controller.load(Slot::B, tone).unwrap();
        controller.advance(0.1);

        assert_eq!(controller.tick(&mut surface).unwrap(), TickOutcome::Rendered);
        let slot_a = surface.take_commands();
        assert_eq!(slot_a[0], DrawCommand::Clear);
        assert_eq!(slot_a.len(), 1 + 16);

        controller.switch_track();
        controller.advance(0.1);
        controller.tick(&mut surface).unwrap();
        let slot_b = surface.take_commands();
        assert_eq!(slot_b.len(), 1 + 16 + 1 + 16);
        assert!(slot_b
            .iter()
            .any(|command| matches!(command, DrawCommand::FillPath { .. })));
    }
}
