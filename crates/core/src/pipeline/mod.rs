use std::{cell::Cell, rc::Rc};

use crate::{
    analysis::{AnalysisFrame, AnalysisSource},
    audio::Slot,
    config::VisualConfig,
    render::Surface,
    scene::{LayerMap, SphereAngle},
};

/// Single-threaded cancellation flag shared between the pipeline and whoever
/// schedules its frames.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Rc<Cell<bool>>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
}

/// What a call to [`VisualizationPipeline::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No frame task exists.
    Idle,
    /// The task had been cancelled; this tick retired it without drawing.
    Cancelled,
    /// Running, but no analysis source exists yet.
    NoSource,
    Rendered,
}

/// Per-frame render loop. Each running period owns one [`CancellationToken`];
/// stopping cancels it, and the next tick retires it.
#[derive(Debug)]
pub struct VisualizationPipeline {
    task: Option<CancellationToken>,
    frame: AnalysisFrame,
    sphere: SphereAngle,
    layers: LayerMap,
    visuals: VisualConfig,
}

impl VisualizationPipeline {
    pub fn new(visuals: VisualConfig) -> Self {
        Self {
            task: None,
            frame: AnalysisFrame::default(),
            sphere: SphereAngle::default(),
            layers: LayerMap::default(),
            visuals,
        }
    }

    pub fn state(&self) -> PipelineState {
        if self.is_running() {
            PipelineState::Running
        } else {
            PipelineState::Idle
        }
    }

    /// True while a frame task exists and has not been cancelled.
    pub fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Token of the current frame task, if one is running.
    pub fn token(&self) -> Option<CancellationToken> {
        self.task.clone().filter(|token| !token.is_cancelled())
    }

    /// Starts a new frame task unless one is already running. A cancelled task
    /// that has not been retired yet is replaced, so at most one loop exists.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }

        self.task = Some(CancellationToken::new());
        tracing::debug!("visualisation started");
        true
    }

    /// Cancels the running task and clears the surface once.
    pub fn stop(&mut self, surface: &mut dyn Surface) {
        if let Some(token) = &self.task {
            token.cancel();
            tracing::debug!("visualisation stopped");
        }
        surface.clear();
    }

    /// Runs one frame: captures analysis data, clears, and draws the layers
    /// mapped to `active`.
    pub fn tick(
        &mut self,
        source: Option<&dyn AnalysisSource>,
        active: Slot,
        surface: &mut dyn Surface,
    ) -> TickOutcome {
        let Some(token) = &self.task else {
            return TickOutcome::Idle;
        };
        if token.is_cancelled() {
            self.task = None;
            return TickOutcome::Cancelled;
        }

        let Some(source) = source else {
            return TickOutcome::NoSource;
        };

        self.frame.capture(source);
        surface.clear();
        for layer in self.layers.layers_for(active) {
            layer.draw(&self.frame, surface, &mut self.sphere, &self.visuals);
        }
        tracing::trace!(%active, bins = self.frame.bin_count(), "rendered frame");
        TickOutcome::Rendered
    }

    /// Current sphere rotation; only moves on frames that draw the sphere.
    pub fn sphere_angle(&self) -> SphereAngle {
        self.sphere
    }

    /// Slot-to-layer routing, editable while the pipeline runs.
    pub fn layers_mut(&mut self) -> &mut LayerMap {
        &mut self.layers
    }
}
