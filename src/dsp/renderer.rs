//! WAV renderer — drives a song to completion and encodes the mix.

use crate::error::PatternboxError;
use crate::song::Song;

use super::engine::SongRenderer;

/// Output sample rate. The engine's tuning constants assume it; there is
/// no resampling stage.
pub const SAMPLE_RATE: u32 = 44100;

const NUM_CHANNELS: u16 = 2;
const BITS_PER_SAMPLE: u16 = 16;

/// Render a song to a WAV byte buffer (16-bit stereo PCM, 44.1 kHz),
/// blocking until every channel is synthesized.
pub fn render_wav(song: Song) -> Result<Vec<u8>, PatternboxError> {
    let mut renderer = SongRenderer::new(song)?;
    while !renderer.is_complete() {
        renderer.step();
    }
    Ok(renderer.finalize()?)
}

/// Encode a stereo-interleaved `i32` mix buffer as a WAV byte stream.
///
/// Each accumulator is clamped to the symmetric 16-bit range; an
/// overdriven mix clips audibly instead of erroring.
pub fn encode_wav(mix: &[i32]) -> Vec<u8> {
    let byte_rate = SAMPLE_RATE * NUM_CHANNELS as u32 * (BITS_PER_SAMPLE as u32 / 8);
    let block_align = NUM_CHANNELS * (BITS_PER_SAMPLE / 8);
    let data_size = (mix.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    buf.extend_from_slice(&NUM_CHANNELS.to_le_bytes());
    buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &word in mix {
        let clamped = word.clamp(-32767, 32767) as i16;
        buf.extend_from_slice(&clamped.to_le_bytes());
    }

    buf
}
