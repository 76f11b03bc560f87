// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Error types for capture negotiation and sample storage.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Errors raised while acquiring or validating input devices
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    /// The requested device does not exist
    #[error("Could not find device with id: '{0}'")]
    DeviceNotFound(String),

    /// The platform granted a different device than the one requested
    #[error("Could not bind to device '{requested}' (got '{granted}')")]
    DeviceMismatch { requested: String, granted: String },

    /// The user or the platform denied access to inputs
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The platform has no MIDI support at all
    #[error("This platform does not support MIDI")]
    MidiUnsupported,

    /// MIDI access has not been granted yet
    #[error("MIDI is not available")]
    MidiUnavailable,

    /// The user cancelled an operation (for example an approval dialog)
    #[error("{0}")]
    Aborted(String),

    /// Backend failure with no more specific variant
    #[error("Device error: {0}")]
    Platform(String),
}

impl CaptureError {
    /// User cancellations are silent; everything else is reported.
    pub fn is_abort(&self) -> bool {
        matches!(self, CaptureError::Aborted(_))
    }
}

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Errors raised by sample persistence
#[derive(Error, Debug)]
pub enum StorageError {
    /// No stored sample for the uuid
    #[error("Sample {0} not found")]
    NotFound(Uuid),

    /// Reading or writing the sample file failed
    #[error("Sample file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// WAV encoding or decoding failed
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// The sample has no frames or inconsistent channels
    #[error("Invalid sample data: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            CaptureError::DeviceNotFound("mic-1".into()).to_string(),
            "Could not find device with id: 'mic-1'"
        );
        assert_eq!(CaptureError::MidiUnavailable.to_string(), "MIDI is not available");
        assert_eq!(
            CaptureError::Aborted("Recording cancelled".into()).to_string(),
            "Recording cancelled"
        );
    }

    #[test]
    fn test_is_abort() {
        assert!(CaptureError::Aborted("x".into()).is_abort());
        assert!(!CaptureError::MidiUnsupported.is_abort());
    }
}
