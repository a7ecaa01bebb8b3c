//! Speech detector tuning

/// Sample rate the speech classifier runs at
pub const VAD_SAMPLE_RATE: u32 = 16_000;

/// Length of one classified frame
pub const VAD_FRAME_MS: u32 = 30;

/// Parameters that shape how frame decisions become speech segments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VadTuning {
    /// Classifier aggressiveness, 0 (lenient) to 3 (strict)
    pub aggressiveness: u8,
    /// Consecutive voiced audio needed before speech is declared
    pub onset_ms: u32,
    /// Consecutive silence needed before speech is considered over
    pub redemption_ms: u32,
    /// Segments with less voiced audio than this are misfires
    pub min_speech_ms: u32,
    /// Audio kept from before the onset and prepended to each segment
    pub pre_speech_pad_ms: u32,
}

impl VadTuning {
    pub const MAX_AGGRESSIVENESS: u8 = 3;

    /// Number of whole frames covering `ms`, at least one
    pub fn frames_for(ms: u32) -> usize {
        (ms.div_ceil(VAD_FRAME_MS)).max(1) as usize
    }

    pub fn onset_frames(&self) -> usize {
        Self::frames_for(self.onset_ms)
    }

    pub fn redemption_frames(&self) -> usize {
        Self::frames_for(self.redemption_ms)
    }

    pub fn min_speech_frames(&self) -> usize {
        Self::frames_for(self.min_speech_ms)
    }

    /// Pre-speech padding can be zero frames
    pub fn pre_speech_pad_frames(&self) -> usize {
        self.pre_speech_pad_ms.div_ceil(VAD_FRAME_MS) as usize
    }
}

impl Default for VadTuning {
    fn default() -> Self {
        Self {
            aggressiveness: 2,
            onset_ms: 90,
            redemption_ms: 800,
            min_speech_ms: 250,
            pre_speech_pad_ms: 300,
        }
    }
}
