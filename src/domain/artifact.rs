//! Recording artifacts and speech segments

use std::fmt;
use std::io::Cursor;

use crate::domain::error::SegmentEncodeError;

/// Audio container formats an artifact can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AudioMimeType {
    #[default]
    Wav,
}

impl AudioMimeType {
    /// Get the MIME type string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
        }
    }

    /// Get the file extension
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
        }
    }
}

impl fmt::Display for AudioMimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Finished, immutable audio payload.
/// Ownership passes to whoever receives it; sessions never keep a copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingArtifact {
    data: Vec<u8>,
    mime_type: AudioMimeType,
}

impl RecordingArtifact {
    pub fn new(data: Vec<u8>, mime_type: AudioMimeType) -> Self {
        Self { data, mime_type }
    }

    /// Join encoder chunks in arrival order
    pub fn from_chunks<I>(chunks: I, mime_type: AudioMimeType) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        let mut data = Vec::new();
        for chunk in chunks {
            data.extend_from_slice(&chunk);
        }
        Self { data, mime_type }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn mime_type(&self) -> AudioMimeType {
        self.mime_type
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get human-readable size
    pub fn human_readable_size(&self) -> String {
        let bytes = self.size_bytes();
        if bytes < 1024 {
            format!("{} B", bytes)
        } else if bytes < 1024 * 1024 {
            format!("{:.1} KB", bytes as f64 / 1024.0)
        } else {
            format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
        }
    }
}

/// Mono audio captured between a speech onset and its end
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechSegment {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl SpeechSegment {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / u64::from(self.sample_rate)
    }

    /// Encode as a 16-bit mono WAV artifact
    pub fn into_artifact(self) -> Result<RecordingArtifact, SegmentEncodeError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| SegmentEncodeError(e.to_string()))?;
            for &sample in &self.samples {
                let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                writer
                    .write_sample(value)
                    .map_err(|e| SegmentEncodeError(e.to_string()))?;
            }
            writer
                .finalize()
                .map_err(|e| SegmentEncodeError(e.to_string()))?;
        }

        Ok(RecordingArtifact::new(cursor.into_inner(), AudioMimeType::Wav))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_type_strings() {
        assert_eq!(AudioMimeType::Wav.as_str(), "audio/wav");
        assert_eq!(AudioMimeType::Wav.extension(), "wav");
        assert_eq!(AudioMimeType::default(), AudioMimeType::Wav);
    }

    #[test]
    fn from_chunks_concatenates_in_order() {
        let artifact = RecordingArtifact::from_chunks(
            vec![vec![1, 2], vec![], vec![3]],
            AudioMimeType::Wav,
        );
        assert_eq!(artifact.data(), &[1, 2, 3]);
        assert_eq!(artifact.size_bytes(), 3);
        assert!(!artifact.is_empty());
    }

    #[test]
    fn human_readable_size() {
        let small = RecordingArtifact::new(vec![0; 500], AudioMimeType::Wav);
        assert_eq!(small.human_readable_size(), "500 B");

        let kb = RecordingArtifact::new(vec![0; 2048], AudioMimeType::Wav);
        assert_eq!(kb.human_readable_size(), "2.0 KB");

        let mb = RecordingArtifact::new(vec![0; 1024 * 1024 * 2], AudioMimeType::Wav);
        assert_eq!(mb.human_readable_size(), "2.0 MB");
    }

    #[test]
    fn segment_duration() {
        let segment = SpeechSegment::new(vec![0.0; 8000], 16_000);
        assert_eq!(segment.duration_ms(), 500);
    }

    #[test]
    fn segment_encodes_readable_wav() {
        let segment = SpeechSegment::new(vec![0.0, 0.5, -0.5, 1.0], 16_000);
        let artifact = segment.into_artifact().unwrap();
        assert_eq!(artifact.mime_type(), AudioMimeType::Wav);
        assert_eq!(&artifact.data()[..4], b"RIFF");

        let reader = hound::WavReader::new(artifact.data()).unwrap();
        assert_eq!(reader.spec().sample_rate, 16_000);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[3], i16::MAX);
    }
}
