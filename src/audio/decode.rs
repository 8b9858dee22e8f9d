//! Audio decoding using symphonia.
//!
//! Recordings can run for hours, so instead of keeping every sample the
//! decoder folds the signal into fixed-length windows and keeps each window's
//! peak amplitude.

use crate::error::{Error, Result};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Per-window peak amplitudes of a recording.
#[derive(Debug, Clone)]
pub struct PeakEnvelope {
    /// Peak absolute amplitude (0.0-1.0) of each window, across all channels.
    pub peaks: Vec<f32>,
    /// Window length in seconds.
    pub window_secs: f64,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Duration in seconds.
    pub duration_secs: f64,
}

impl PeakEnvelope {
    /// Fold interleaved samples into windows of `window_frames` frames.
    pub fn from_samples(
        samples: &[f32],
        channels: usize,
        sample_rate: u32,
        window_frames: usize,
    ) -> Self {
        let mut builder = EnvelopeBuilder::new(window_frames);
        builder.push_interleaved(samples, channels.max(1));
        builder.finish(sample_rate)
    }
}

struct EnvelopeBuilder {
    window_frames: usize,
    peaks: Vec<f32>,
    current_peak: f32,
    frames_in_window: usize,
    total_frames: u64,
}

impl EnvelopeBuilder {
    fn new(window_frames: usize) -> Self {
        Self {
            window_frames: window_frames.max(1),
            peaks: Vec::new(),
            current_peak: 0.0,
            frames_in_window: 0,
            total_frames: 0,
        }
    }

    fn push_interleaved(&mut self, samples: &[f32], channels: usize) {
        for frame in samples.chunks(channels) {
            let peak = frame.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
            self.current_peak = self.current_peak.max(peak);
            self.frames_in_window += 1;
            self.total_frames += 1;

            if self.frames_in_window == self.window_frames {
                self.peaks.push(self.current_peak);
                self.current_peak = 0.0;
                self.frames_in_window = 0;
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(mut self, sample_rate: u32) -> PeakEnvelope {
        if self.frames_in_window > 0 {
            self.peaks.push(self.current_peak);
        }
        let rate = f64::from(sample_rate.max(1));
        PeakEnvelope {
            peaks: self.peaks,
            window_secs: self.window_frames as f64 / rate,
            sample_rate,
            duration_secs: self.total_frames as f64 / rate,
        }
    }
}

/// Decode an audio file into a [`PeakEnvelope`] with `window_ms` windows.
///
/// Supports WAV, FLAC, MP3, and AAC (including M4A/MP4 containers).
/// Corrupt packets are skipped.
pub fn decode_peak_envelope(path: &Path, window_ms: u32) -> Result<PeakEnvelope> {
    let file = File::open(path).map_err(|e| Error::AudioOpen {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;

    let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::AudioOpen {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::NoAudioTracks {
            path: path.to_path_buf(),
        })?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| Error::AudioDecode {
            path: path.to_path_buf(),
            source: "missing sample rate".into(),
        })?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::AudioDecode {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;

    let window_frames = (u64::from(sample_rate) * u64::from(window_ms.max(1)) / 1000).max(1);
    let mut builder = EnvelopeBuilder::new(usize::try_from(window_frames).unwrap_or(usize::MAX));
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut skipped = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(Error::AudioDecode {
                    path: path.to_path_buf(),
                    source: Box::new(e),
                });
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                skipped += 1;
                debug!("Skipping corrupt packet: {e}");
                continue;
            }
            Err(e) => {
                return Err(Error::AudioDecode {
                    path: path.to_path_buf(),
                    source: Box::new(e),
                });
            }
        };

        let channels = decoded.spec().channels.count();
        let buf = sample_buf.get_or_insert_with(|| {
            SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec())
        });
        if buf.capacity() < decoded.capacity() * channels {
            *buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
        }
        buf.copy_interleaved_ref(decoded);
        builder.push_interleaved(buf.samples(), channels.max(1));
    }

    if skipped > 0 {
        warn!(
            "Skipped {skipped} undecodable packet(s) in {}",
            path.display()
        );
    }

    Ok(builder.finish(sample_rate))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_from_samples() {
        // 2 channels, 4 frames per window, 10 frames total.
        let mut samples = vec![0.0f32; 20];
        samples[3] = -0.8; // frame 1, right channel
        samples[18] = 0.25; // frame 9, left channel

        let envelope = PeakEnvelope::from_samples(&samples, 2, 8, 4);
        assert_eq!(envelope.peaks, vec![0.8, 0.0, 0.25]);
        assert_eq!(envelope.window_secs, 0.5);
        assert_eq!(envelope.duration_secs, 1.25);
    }

    #[test]
    fn test_decode_missing_file() {
        let result = decode_peak_envelope(Path::new("/nonexistent/audio.wav"), 10);
        assert!(matches!(result, Err(Error::AudioOpen { .. })));
    }
}
