//! Core library for the dual-track player and visualiser.
//!
//! Two track slots share one analyser. The [`PlaybackController`] keeps at
//! most one slot playing and carries the playback position across switches;
//! the [`VisualizationPipeline`] turns each frame of analysis data into draw
//! calls on a [`Surface`]. Decoding, the audio clock and rasterisation stay
//! behind the [`Playable`], [`AnalysisSource`] and [`Surface`] traits.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod playback;
pub mod record;
pub mod render;
pub mod scene;
pub mod session;
pub mod timeline;

pub use analysis::{AnalysisFrame, AnalysisGraph, AnalysisSource, Analyser, SourceNode};
pub use audio::{MediaTrack, Playable, Slot, SLOT_COUNT};
pub use config::{AnalyserConfig, AppConfig, CanvasConfig, PlaybackConfig, VisualConfig};
pub use error::{DualTrackError, Result};
pub use pipeline::{CancellationToken, PipelineState, TickOutcome, VisualizationPipeline};
pub use playback::{PlaybackController, PlaybackState, TrackRegistry, TrackSlot};
pub use record::{DrawCommand, FrameRecord, FrameRecorder, RecordingSurface};
pub use render::{Color, Fill, LinearGradient, Point, Surface};
pub use scene::{BarPalette, Layer, LayerMap, SphereAngle};
pub use session::Session;
pub use timeline::{Action, FrameClock, ScheduledEvent, Scheduler};
