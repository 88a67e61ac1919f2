//! Sound from flag F1.
//!
//! Elektor programs make noise by toggling F1 in timed loops. The host
//! records the number of microcycles between successive toggles, one decimal
//! width per line, and [`widths_to_pcm`] later turns that list into a square
//! wave. Polarity is implied by line parity: even lines are low, odd lines
//! high.

use std::io::{self, BufRead, Write};
use std::path::Path;
use thiserror::Error;

/// Output sample rate of the converter.
pub const SAMPLE_RATE: u32 = 44_100;

/// Microcycles per output sample (about 500 000 / 44 100).
pub const CYCLES_PER_SAMPLE: f32 = 11.34;

/// Sample written while the pulse line is low.
pub const LOW_SAMPLE: i8 = -8;

/// Sample written while the pulse line is high.
pub const HIGH_SAMPLE: i8 = 8;

/// Watches F1 after every instruction and records the width of each pulse.
#[derive(Debug, Clone, Default)]
pub struct PulseRecorder {
    level: bool,
    last_edge: i64,
    widths: Vec<i64>,
}

impl PulseRecorder {
    /// Create a recorder expecting F1 to start low.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look at F1 at time `now` (the host's running microcycle budget).
    ///
    /// On a change of level, records and returns the time since the previous
    /// change. `now` restarts every frame, so a negative difference is
    /// corrected by one frame length.
    pub fn observe(&mut self, level: bool, now: i64, frame_cycles: i64) -> Option<i64> {
        if level == self.level {
            return None;
        }
        self.level = level;

        let mut width = now - self.last_edge;
        if width < 0 {
            width += frame_cycles;
        }
        self.last_edge = now;
        self.widths.push(width);
        Some(width)
    }

    /// Widths recorded so far.
    pub fn widths(&self) -> &[i64] {
        &self.widths
    }

    /// Take the recorded widths, leaving the recorder empty.
    pub fn take(&mut self) -> Vec<i64> {
        std::mem::take(&mut self.widths)
    }
}

/// Write widths in the converter's input format, one per line.
pub fn write_widths<W: Write>(mut out: W, widths: &[i64]) -> io::Result<()> {
    for width in widths {
        writeln!(out, "{width}")?;
    }
    Ok(())
}

/// Convert a list of pulse widths into signed 8-bit samples at 44.1 kHz.
///
/// Rounding error is carried from pulse to pulse so the total length does
/// not drift. A blank line is a pulse of zero width: it emits nothing but
/// still flips the polarity of the pulses after it.
pub fn widths_to_pcm<R: BufRead>(input: R) -> Result<Vec<i8>, PcmError> {
    let mut samples = Vec::new();
    let mut pad = 0.0f32;
    let mut high = false;

    for (index, line) in input.lines().enumerate() {
        let line = line.map_err(|e| PcmError::Io(e.to_string()))?;
        let text = line.trim();
        let raw: i64 = if text.is_empty() {
            0
        } else {
            text.parse().map_err(|_| PcmError::Parse {
                line: index + 1,
                text: text.to_string(),
            })?
        };

        let exact = raw as f32 / CYCLES_PER_SAMPLE;
        let mut width = exact as i64;
        pad += width as f32 - exact;

        if pad >= 1.0 {
            pad -= 1.0;
            width -= 1;
        }
        if pad <= -1.0 {
            pad += 1.0;
            width += 1;
        }

        let sample = if high { HIGH_SAMPLE } else { LOW_SAMPLE };
        samples.extend(std::iter::repeat(sample).take(width.max(0) as usize));
        high = !high;
    }

    Ok(samples)
}

/// Write samples as headerless signed 8-bit PCM
/// (`ffmpeg -f s8 -ar 44.1k -ac 1 -i audio.pcm`).
pub fn write_raw<P: AsRef<Path>>(path: P, samples: &[i8]) -> Result<(), PcmError> {
    let bytes: Vec<u8> = samples.iter().map(|&s| s as u8).collect();
    std::fs::write(path, bytes).map_err(|e| PcmError::Io(e.to_string()))
}

/// Write samples as a mono 8-bit WAV file.
pub fn write_wav<P: AsRef<Path>>(path: P, samples: &[i8]) -> Result<(), PcmError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 8,
        sample_format: hound::SampleFormat::Int,
    };

    let wav_err = |e: hound::Error| PcmError::Wav(e.to_string());
    let mut writer = hound::WavWriter::create(path, spec).map_err(wav_err)?;
    for &sample in samples {
        writer.write_sample(sample).map_err(wav_err)?;
    }
    writer.finalize().map_err(wav_err)
}

/// Errors that can occur while converting pulse widths.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PcmError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("line {line}: '{text}' is not a pulse width")]
    Parse { line: usize, text: String },

    #[error("WAV error: {0}")]
    Wav(String),
}
