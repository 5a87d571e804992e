use std::{f32::consts::PI, fmt, fs::File, path::Path, sync::Arc};

use serde::Serialize;
use symphonia::core::{
    audio::SampleBuffer, codecs::DecoderOptions, errors::Error as SymphoniaError,
    formats::FormatOptions, io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};

use crate::{DualTrackError, Result};

/// Number of track slots the player manages.
pub const SLOT_COUNT: usize = 2;

/// One of the two track slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Slot {
    #[default]
    A,
    B,
}

impl Slot {
    pub const ALL: [Slot; SLOT_COUNT] = [Slot::A, Slot::B];

    /// Position of the slot in fixed-size per-slot arrays.
    pub fn index(self) -> usize {
        match self {
            Slot::A => 0,
            Slot::B => 1,
        }
    }

    /// The slot that is paused while this one plays.
    pub fn other(self) -> Slot {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Host-side playable handle for one loaded resource.
///
/// Decoding, the audio clock and the output device belong to the host; the
/// controller only drives the handle through this surface.
pub trait Playable {
    /// Whether enough metadata has been decoded to know the duration and seek.
    fn is_ready(&self) -> bool;

    /// Duration in seconds, `None` until the handle is ready.
    fn duration(&self) -> Option<f64>;

    fn position(&self) -> f64;

    fn set_position(&mut self, seconds: f64);

    fn play(&mut self);

    fn pause(&mut self);

    fn is_playing(&self) -> bool;

    /// Advances the handle's own clock. Hosts that run their own audio clock
    /// leave this as a no-op.
    fn advance(&mut self, _delta_seconds: f64) {}

    /// Writes the samples that most recently reached the output into `out`.
    fn fill_output(&self, out: &mut [f32]) {
        out.fill(0.0);
    }
}

/// Mono PCM track held in memory, with a clock driven by [`Playable::advance`].
#[derive(Clone)]
pub struct MediaTrack {
    samples: Arc<[f32]>,
    sample_rate: u32,
    position: f64,
    playing: bool,
    looping: bool,
}

impl MediaTrack {
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(DualTrackError::InvalidInput("sample rate must be non-zero"));
        }

        Ok(Self {
            samples: samples.into(),
            sample_rate,
            position: 0.0,
            playing: false,
            looping: false,
        })
    }

    /// Decodes an audio file into a mono track.
    ///
    /// WAV files are read with `hound`; any other container is detected from
    /// its header and decoded with symphonia. All channels are averaged down to mono.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let is_wav = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));

        if is_wav {
            Self::from_wav(path)
        } else {
            Self::from_encoded(path)
        }
    }

    fn from_wav(path: &Path) -> Result<Self> {
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let channels = usize::from(spec.channels.max(1));

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let max_val = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max_val))
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        tracing::debug!(
            path = %path.display(),
            sample_rate = spec.sample_rate,
            channels,
            "decoded wav track"
        );

        Self::from_samples(downmix(&interleaved, channels).collect(), spec.sample_rate)
    }

    fn from_encoded(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| DualTrackError::msg(format!("{}: no audio track", path.display())))?;
        let sample_rate = track.codec_params.sample_rate.ok_or_else(|| {
            DualTrackError::msg(format!("{}: unknown sample rate", path.display()))
        })?;
        let track_id = track.id;
        let mut decoder =
            symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

        let mut mono = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break
                }
                Err(e) => return Err(e.into()),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = decoder.decode(&packet)?;
            let spec = *decoded.spec();
            let channels = spec.channels.count().max(1);
            let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            buffer.copy_interleaved_ref(decoded);
            mono.extend(downmix(buffer.samples(), channels));
        }

        tracing::debug!(
            path = %path.display(),
            sample_rate,
            samples = mono.len(),
            "decoded track"
        );

        Self::from_samples(mono, sample_rate)
    }

    /// Synthesises a sine tone, used by the demo session.
    pub fn sine(frequency: f32, seconds: f32, sample_rate: u32) -> Result<Self> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(DualTrackError::InvalidInput(
                "tone length must be a finite, non-negative number of seconds",
            ));
        }
        let len = (seconds * sample_rate as f32) as usize;
        let step = 2.0 * PI * frequency / sample_rate.max(1) as f32;
        let samples = (0..len).map(|n| 0.5 * (step * n as f32).sin()).collect();
        Self::from_samples(samples, sample_rate)
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_seconds(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

fn downmix(interleaved: &[f32], channels: usize) -> impl Iterator<Item = f32> + '_ {
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
}

impl Playable for MediaTrack {
    fn is_ready(&self) -> bool {
        true
    }

    fn duration(&self) -> Option<f64> {
        Some(self.total_seconds())
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn set_position(&mut self, seconds: f64) {
        self.position = seconds.clamp(0.0, self.total_seconds());
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
        if !self.playing || delta_seconds <= 0.0 {
            return;
        }

        let duration = self.total_seconds();
        self.position += delta_seconds;
        if self.position >= duration {
            if self.looping && duration > 0.0 {
                self.position %= duration;
            } else {
                self.position = duration;
                self.playing = false;
            }
        }
    }

    fn fill_output(&self, out: &mut [f32]) {
        out.fill(0.0);
        if !self.playing {
            return;
        }

        let end = ((self.position * f64::from(self.sample_rate)) as usize).min(self.samples.len());
        let start = end.saturating_sub(out.len());
        let window = &self.samples[start..end];
        let offset = out.len() - window.len();
        out[offset..].copy_from_slice(window);
    }
}

impl fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaTrack")
            .field("samples", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .field("position", &self.position)
            .field("playing", &self.playing)
            .field("looping", &self.looping)
            .finish()
    }
}
