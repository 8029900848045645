//! Note synthesizer — renders one note into a fixed-length mono buffer.

use std::collections::HashMap;

use crate::song::Params;

use super::noise::Noise;
use super::oscillator::Waveform;

/// Frequency (cycles per sample) for a note number, 44.1 kHz reference.
/// 174.61.. / 44100 = 0.003959503758 (F3 at note 128).
fn note_freq(n: i32) -> f64 {
    0.003959503758 * (2.0_f64).powf((n as f64 - 128.0) / 12.0)
}

/// Render one note (attack + sustain + release) for the given instrument
/// parameters into a mono `i32` buffer.
///
/// Two phase-accumulating oscillators plus an optional noise source, shaped
/// by a linear attack/sustain/release envelope. An oscillator with its
/// cross-envelope flag set has its phase increment scaled by the squared
/// envelope, so its pitch collapses along with the amplitude. The arpeggio
/// word is rotated a nibble at a time on a floating-point interval counter;
/// the counter's drift for non-integer intervals is part of the sound.
pub fn synthesize_note(params: &Params, note: u8, row_len: usize, noise: &mut Noise) -> Vec<i32> {
    let osc1 = Waveform::from_index(params.osc1_waveform);
    let o1_vol = params.osc1_vol as f64;
    let o1_xenv = params.osc1_xenv != 0;
    let osc2 = Waveform::from_index(params.osc2_waveform);
    let o2_vol = params.osc2_vol as f64;
    let o2_xenv = params.osc2_xenv != 0;
    let noise_vol = params.noise_vol as f64;

    let attack = (params.env_attack as usize).pow(2) * 4;
    let sustain = (params.env_sustain as usize).pow(2) * 4;
    let release = (params.env_release as usize).pow(2) * 4;
    let release_inv = 1.0 / release as f64;

    let arp_interval = row_len as f64 * (2.0_f64).powi(2 - params.arp_speed as i32);
    let mut arp = params.arp_chord as u32;

    let mut buf = vec![0_i32; attack + sustain + release];

    let mut c1 = 0.0;
    let mut c2 = 0.0;
    let mut o1t = 0.0;
    let mut o2t = 0.0;
    let mut j2 = 0.0_f64;

    for (j, out) in buf.iter_mut().enumerate() {
        if j2 >= 0.0 {
            // Switch arpeggio note: low nibble rotates to the top.
            arp = (arp >> 8) | ((arp & 255) << 4);
            j2 -= arp_interval;

            let step = (arp & 15) as i32;
            o1t = note_freq(note as i32 + step + params.osc1_semi as i32 - 128);
            o2t = note_freq(note as i32 + step + params.osc2_semi as i32 - 128)
                * (1.0 + 0.0008 * params.osc2_detune as f64);
        }

        let mut e = 1.0;
        if j < attack {
            e = j as f64 / attack as f64;
        } else if j >= attack + sustain {
            e -= (j - attack - sustain) as f64 * release_inv;
        }

        let mut t = o1t;
        if o1_xenv {
            t *= e * e;
        }
        c1 += t;
        let mut sample = osc1.eval(c1) * o1_vol;

        let mut t = o2t;
        if o2_xenv {
            t *= e * e;
        }
        c2 += t;
        sample += osc2.eval(c2) * o2_vol;

        if noise_vol != 0.0 {
            sample += noise.next_bipolar() * noise_vol;
        }

        *out = (80.0 * sample * e) as i32;
        j2 += 1.0;
    }

    buf
}

/// Memoized note buffers for one channel pass, keyed by note number.
///
/// The channel pass clears the cache whenever a command row rewrites a
/// synthesis-affecting parameter; effect-side parameters don't touch note
/// rendering, so those commands leave the cache alone.
#[derive(Debug, Default)]
pub struct NoteCache {
    notes: HashMap<u8, Vec<i32>>,
}

impl NoteCache {
    pub fn new() -> Self {
        Self { notes: HashMap::new() }
    }

    /// Fetch the buffer for `note`, synthesizing it on first use.
    pub fn get_or_synthesize(
        &mut self,
        params: &Params,
        note: u8,
        row_len: usize,
        noise: &mut Noise,
    ) -> &[i32] {
        self.notes
            .entry(note)
            .or_insert_with(|| synthesize_note(params, note, row_len, noise))
    }

    /// Drop every cached buffer (instrument synthesis parameters changed).
    pub fn invalidate(&mut self) {
        self.notes.clear();
    }
}
