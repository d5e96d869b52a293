//! Input audio inspection

use std::path::Path;

use hound::WavReader;
use log::debug;

/// Duration of a WAV file in seconds, from its header
///
/// Returns `None` for anything hound cannot open (other formats, corrupt
/// headers) or for empty files.
pub fn wav_duration(path: &Path) -> Option<f64> {
    let reader = match WavReader::open(path) {
        Ok(reader) => reader,
        Err(e) => {
            debug!("No WAV header in {}: {}", path.display(), e);
            return None;
        }
    };

    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return None;
    }

    // duration() is in frames (samples per channel)
    let frames = reader.duration();
    if frames == 0 {
        return None;
    }

    Some(frames as f64 / spec.sample_rate as f64)
}
