use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::{config::AnalyserConfig, Result};

pub mod graph;

pub use graph::{AnalysisGraph, SourceNode};

/// Anything that can hand out byte-scaled spectrum and waveform data for the
/// currently connected audio.
pub trait AnalysisSource {
    /// Length `N` of both output arrays.
    fn bin_count(&self) -> usize;

    /// Magnitudes mapped onto `0..=255`, lowest frequency first.
    fn frequency_data(&self, out: &mut [u8]);

    /// Waveform samples mapped onto `0..=255`, with 128 as silence.
    fn time_domain_data(&self, out: &mut [u8]);
}

/// Analysis data captured for a single visualisation tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisFrame {
    pub frequency_bins: Vec<u8>,
    pub time_bins: Vec<u8>,
}

impl AnalysisFrame {
    pub fn from_bins(frequency_bins: Vec<u8>, time_bins: Vec<u8>) -> Self {
        Self {
            frequency_bins,
            time_bins,
        }
    }

    pub fn bin_count(&self) -> usize {
        self.frequency_bins.len()
    }

    /// Refills both arrays from `source`, reusing the existing allocations.
    pub fn capture(&mut self, source: &dyn AnalysisSource) {
        let bins = source.bin_count();
        self.frequency_bins.resize(bins, 0);
        self.time_bins.resize(bins, 128);
        source.frequency_data(&mut self.frequency_bins);
        source.time_domain_data(&mut self.time_bins);
    }
}

/// Byte-output FFT analyser that keeps the most recent `fft_size` samples.
///
/// Spectrum bytes follow the usual browser analyser mapping: Blackman window,
/// magnitude scaled by `1 / fft_size`, exponential smoothing across blocks,
/// then decibels mapped linearly from `[min_decibels, max_decibels]` onto
/// `[0, 255]`.
pub struct Analyser {
    config: AnalyserConfig,
    window: Vec<f32>,
    blackman: Vec<f32>,
    smoothed: Vec<f32>,
    frequency_bytes: Vec<u8>,
    fft: FftResources,
}

impl Analyser {
    pub fn new(config: AnalyserConfig) -> Result<Self> {
        config.validate()?;

        let size = config.fft_size;
        let bins = config.bin_count();
        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);
        let fft = FftResources {
            scratch: plan.make_scratch_vec(),
            spectrum: plan.make_output_vec(),
            input: plan.make_input_vec(),
            plan,
        };

        Ok(Self {
            window: vec![0.0; size],
            blackman: (0..size).map(|i| blackman_value(i, size)).collect(),
            smoothed: vec![0.0; bins],
            frequency_bytes: vec![0; bins],
            fft,
            config,
        })
    }

    /// Shifts `block` into the sample window and recomputes the spectrum.
    pub fn process(&mut self, block: &[f32]) -> Result<()> {
        let size = self.window.len();
        if block.len() >= size {
            self.window.copy_from_slice(&block[block.len() - size..]);
        } else {
            self.window.rotate_left(block.len());
            self.window[size - block.len()..].copy_from_slice(block);
        }

        for ((input, sample), weight) in self
            .fft
            .input
            .iter_mut()
            .zip(&self.window)
            .zip(&self.blackman)
        {
            *input = sample * weight;
        }

        self.fft.plan.process_with_scratch(
            &mut self.fft.input,
            &mut self.fft.spectrum,
            &mut self.fft.scratch,
        )?;

        let tau = self.config.smoothing_time_constant;
        let min_db = self.config.min_decibels;
        let range_db = self.config.max_decibels - min_db;
        let scale = 1.0 / size as f32;

        for ((smoothed, byte), bin) in self
            .smoothed
            .iter_mut()
            .zip(self.frequency_bytes.iter_mut())
            .zip(&self.fft.spectrum)
        {
            *smoothed = tau * *smoothed + (1.0 - tau) * bin.norm() * scale;
            *byte = if *smoothed > 0.0 {
                let db = 20.0 * smoothed.log10();
                (255.0 * (db - min_db) / range_db).clamp(0.0, 255.0) as u8
            } else {
                0
            };
        }

        Ok(())
    }
}

impl AnalysisSource for Analyser {
    fn bin_count(&self) -> usize {
        self.config.bin_count()
    }

    fn frequency_data(&self, out: &mut [u8]) {
        let len = out.len().min(self.frequency_bytes.len());
        out[..len].copy_from_slice(&self.frequency_bytes[..len]);
    }

    fn time_domain_data(&self, out: &mut [u8]) {
        for (byte, sample) in out.iter_mut().zip(&self.window) {
            *byte = (128.0 * (1.0 + sample)).floor().clamp(0.0, 255.0) as u8;
        }
    }
}

struct FftResources {
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl fmt::Debug for Analyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyser")
            .field("config", &self.config)
            .field("window", &self.window.len())
            .finish()
    }
}

fn blackman_value(index: usize, len: usize) -> f32 {
    let phase = 2.0 * PI * index as f32 / len as f32;
    0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos()
}
