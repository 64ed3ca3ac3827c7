use crate::error::EngineError;

/// External collaborator that performs actual image encoding. The engine
/// specifies only this boundary; platform codecs live in the host shell.
///
/// Implementations are called from blocking threads and may take their
/// time; they must not touch engine state.
pub trait ImageCodec: Send + Sync {
    fn compress(&self, image: &[u8], quality: u8) -> Result<Vec<u8>, EngineError>;
}

/// External collaborator for the audio and video task families.
pub trait MediaCodec: Send + Sync {
    fn convert_audio(&self, audio: &[u8], format: &str) -> Result<Vec<u8>, EngineError>;

    fn analyze_audio(&self, audio: &[u8]) -> Result<serde_json::Value, EngineError>;

    fn trim_video(&self, video: &[u8], start_secs: f64, end_secs: f64)
        -> Result<Vec<u8>, EngineError>;

    fn compress_video(&self, video: &[u8], quality: u8) -> Result<Vec<u8>, EngineError>;
}
