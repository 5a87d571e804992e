/// Result alias that carries the custom [`DualTrackError`] type.
pub type Result<T> = std::result::Result<T, DualTrackError>;

/// Common error type for the core crate.
///
/// Playback itself never fails: acting on an empty slot, clamping a saved
/// position, or waiting for metadata are all silent. The variants below only
/// surface from configuration, decoding, and recording.
#[derive(Debug, thiserror::Error)]
pub enum DualTrackError {
    /// Free-form message for conditions without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// Input rejected before any work was done.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("wav: {0}")]
    Wav(#[from] hound::Error),
    /// Container or codec failure while decoding a non-WAV file.
    #[error("decode: {0}")]
    Decode(#[from] symphonia::core::errors::Error),
    #[error("fft: {0}")]
    Fft(#[from] realfft::FftError),
}

impl DualTrackError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for DualTrackError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for DualTrackError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
