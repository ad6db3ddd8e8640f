//! Source / stream quality lines.

use serde::{Deserialize, Serialize};

use crate::metadata::NowPlaying;

const DEFAULT_BIT_DEPTH: &str = "24";
const DEFAULT_SAMPLE_RATE: &str = "96000";
const DEFAULT_FORMAT: &str = "FLAC";
const STREAM_SUFFIX: &str = "HLS Lossless";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityText {
    pub source: String,
    pub stream: String,
}

impl QualityText {
    /// Non-numeric sample rates are not validated and render as `NaN`.
    pub fn from_now_playing(np: &NowPlaying) -> Self {
        let bit_depth = np.bit_depth.as_deref().unwrap_or(DEFAULT_BIT_DEPTH);
        let sample_rate = np.sample_rate.as_deref().unwrap_or(DEFAULT_SAMPLE_RATE);
        let format = np.format.as_deref().unwrap_or(DEFAULT_FORMAT);

        let stream_rate = np.stream_sample_rate.as_deref().unwrap_or(sample_rate);
        let stream_format = np.stream_format.as_deref().unwrap_or(DEFAULT_FORMAT);

        Self {
            source: format!(
                "Source quality: {}-bit {:.1}kHz {}",
                bit_depth,
                khz(sample_rate),
                format
            ),
            stream: format!(
                "Stream quality: {:.0}kHz {} / {}",
                khz(stream_rate),
                stream_format,
                STREAM_SUFFIX
            ),
        }
    }
}

fn khz(hz: &str) -> f64 {
    hz.trim().parse::<f64>().unwrap_or(f64::NAN) / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn np(bit: Option<&str>, rate: Option<&str>, format: Option<&str>) -> NowPlaying {
        NowPlaying {
            bit_depth: bit.map(String::from),
            sample_rate: rate.map(String::from),
            format: format.map(String::from),
            ..NowPlaying::default()
        }
    }

    #[test]
    fn test_source_quality_text() {
        let q = QualityText::from_now_playing(&np(Some("24"), Some("48000"), Some("FLAC")));
        assert_eq!(q.source, "Source quality: 24-bit 48.0kHz FLAC");
        assert_eq!(q.stream, "Stream quality: 48kHz FLAC / HLS Lossless");
    }

    #[test]
    fn test_defaults() {
        let q = QualityText::from_now_playing(&NowPlaying::default());
        assert_eq!(q.source, "Source quality: 24-bit 96.0kHz FLAC");
        assert_eq!(q.stream, "Stream quality: 96kHz FLAC / HLS Lossless");
    }

    #[test]
    fn test_stream_fields_override_source() {
        let mut record = np(Some("16"), Some("44100"), Some("FLAC"));
        record.stream_sample_rate = Some("48000".into());
        record.stream_format = Some("AAC".into());
        let q = QualityText::from_now_playing(&record);
        assert_eq!(q.source, "Source quality: 16-bit 44.1kHz FLAC");
        assert_eq!(q.stream, "Stream quality: 48kHz AAC / HLS Lossless");
    }

    #[test]
    fn test_non_numeric_rate_renders_nan() {
        let q = QualityText::from_now_playing(&np(Some("24"), Some("fast"), None));
        assert_eq!(q.source, "Source quality: 24-bit NaNkHz FLAC");
        assert_eq!(q.stream, "Stream quality: NaNkHz FLAC / HLS Lossless");
    }
}
