//! Synthesis engine — renders a song channel by channel into a shared
//! stereo mix.
//!
//! The renderer is deliberately progressive: one [`SongRenderer::step`]
//! call synthesizes exactly one channel, so a caller (a UI loop, a wasm
//! host) can interleave synthesis with other work by polling instead of
//! blocking on the whole song. Nothing here spawns threads; the shared mix
//! buffer is only ever touched by the current step.

use crate::error::{RenderError, SongError};
use crate::song::{Instrument, NUM_NOTE_COLS, Song};

use super::filter::{FilterMode, StateVariableFilter};
use super::noise::Noise;
use super::note::NoteCache;
use super::oscillator::{TURN, Waveform};
use super::renderer::SAMPLE_RATE;

/// Progressive song renderer.
///
/// Owns its working copy of the song (command rows mutate instrument
/// parameters during a pass) plus the master mix buffer. Channels are
/// synthesized in index order; each contributes to the mix exactly once.
pub struct SongRenderer {
    song: Song,
    mix_buf: Vec<i32>,
    current_channel: usize,
    noise: Noise,
}

impl SongRenderer {
    /// Validate the song and set up a run with entropy-seeded noise.
    pub fn new(song: Song) -> Result<Self, SongError> {
        Self::with_noise(song, Noise::new())
    }

    /// Validate the song and set up a fully deterministic run.
    pub fn with_noise_seed(song: Song, seed: u64) -> Result<Self, SongError> {
        Self::with_noise(song, Noise::with_seed(seed))
    }

    fn with_noise(song: Song, noise: Noise) -> Result<Self, SongError> {
        song.validate()?;
        let num_words = song.num_words();
        Ok(Self {
            song,
            mix_buf: vec![0; num_words],
            current_channel: 0,
            noise,
        })
    }

    /// Synthesize the next channel and return overall progress in (0, 1].
    ///
    /// Exactly `num_channels` calls drive the run to completion; the value
    /// reaches precisely 1.0 on the final call. Stepping a completed run
    /// is a no-op that keeps returning 1.0.
    pub fn step(&mut self) -> f64 {
        if self.current_channel < self.song.num_channels {
            self.render_channel();
            self.current_channel += 1;
        }
        self.progress()
    }

    /// Fraction of channels synthesized so far, 0.0 to 1.0.
    pub fn progress(&self) -> f64 {
        self.current_channel as f64 / self.song.num_channels as f64
    }

    pub fn is_complete(&self) -> bool {
        self.current_channel >= self.song.num_channels
    }

    /// Encode the finished mix as a WAV byte stream.
    ///
    /// Only valid once every channel has been synthesized; the encode
    /// itself is pure, so repeated calls yield identical bytes.
    pub fn finalize(&self) -> Result<Vec<u8>, RenderError> {
        if !self.is_complete() {
            return Err(RenderError::NotComplete {
                channels_done: self.current_channel,
                channels_total: self.song.num_channels,
            });
        }
        Ok(super::renderer::encode_wav(&self.mix_buf))
    }

    /// The master mix buffer (stereo-interleaved `i32` accumulators).
    pub fn mix_buffer(&self) -> &[i32] {
        &self.mix_buf
    }

    /// One channel pass: place notes, run the per-sample effect chain,
    /// accumulate into the master mix.
    fn render_channel(&mut self) {
        let Self { song, mix_buf, current_channel, noise } = self;
        let row_len = song.row_len;
        let pattern_len = song.pattern_len;
        let end_pattern = song.end_pattern;
        let Instrument { params, sequence, patterns } = &mut song.channels[*current_channel];

        // Channel work buffer; the delay stage reads processed samples
        // back out of it.
        let mut chn_buf = vec![0_i32; mix_buf.len()];

        let mut svf = StateVariableFilter::new();
        let mut filter_active = false;
        let mut cache = NoteCache::new();

        for p in 0..=end_pattern {
            let cp = sequence.get(p).copied().unwrap_or(0) as usize;
            let pat = if cp == 0 { None } else { patterns.get(cp - 1) };

            for row in 0..pattern_len {
                // Execute the row's command before anything sounds.
                let cmd = pat.map_or(0, |pt| pt.command(row));
                if cmd != 0 {
                    params.set(cmd as usize - 1, pat.map_or(0, |pt| pt.command_value(row, pattern_len)));
                    // Synthesis parameters changed: cached notes are stale.
                    if cmd < 16 {
                        cache.invalidate();
                    }
                }

                // Effect parameters derived from the current instrument state.
                let osc_lfo = Waveform::from_index(params.lfo_waveform);
                let lfo_amt = params.lfo_amount as f64 / 512.0;
                let lfo_freq = (2.0_f64).powi(params.lfo_freq as i32 - 9) / row_len as f64;
                let fx_lfo = params.lfo_fx_freq != 0;
                let filter_mode = FilterMode::from_index(params.fx_filter);
                let fx_freq = params.fx_freq as f64 * 43.23529 * 3.141592 / SAMPLE_RATE as f64;
                let q = 1.0 - params.fx_resonance as f64 / 255.0;
                let dist = params.fx_dist as f64 * 1e-5;
                let drive = params.fx_drive as f64 / 32.0;
                let pan_amt = params.fx_pan_amount as f64 / 512.0;
                let pan_freq = TURN * (2.0_f64).powi(params.fx_pan_freq as i32 - 9) / row_len as f64;
                let dly_amt = params.fx_delay_amount as f64 / 255.0;
                // Delay offset must stay even to keep channels paired.
                let dly = (params.fx_delay_time as usize * row_len) & !1;

                let row_start_sample = (p * pattern_len + row) * row_len;

                // Place this row's notes into the left slots of the work
                // buffer; panning splits them later.
                for col in 0..NUM_NOTE_COLS {
                    let n = pat.map_or(0, |pt| pt.note(row, col, pattern_len));
                    if n != 0 {
                        let note_buf = cache.get_or_synthesize(params, n, row_len, noise);
                        let mut i = row_start_sample * 2;
                        for &s in note_buf {
                            if i >= chn_buf.len() {
                                break;
                            }
                            chn_buf[i] += s;
                            i += 2;
                        }
                    }
                }

                // Per-sample effect chain for this row.
                for j in 0..row_len {
                    let k = (row_start_sample + j) * 2;
                    let mut rsample = chn_buf[k] as f64;
                    let mut lsample = 0.0;

                    // The filter only runs while it has input or audible
                    // state; once its energy decays below threshold it
                    // goes dormant until the next nonzero sample.
                    if rsample != 0.0 || filter_active {
                        let mut f = fx_freq;
                        if fx_lfo {
                            f *= osc_lfo.eval(lfo_freq * k as f64) * lfo_amt + 0.5;
                        }
                        rsample = svf.process(rsample, f, q, filter_mode);

                        if dist != 0.0 {
                            rsample *= dist;
                            rsample = if rsample < 1.0 {
                                if rsample > -1.0 {
                                    Waveform::Sine.eval(rsample * 0.25)
                                } else {
                                    -1.0
                                }
                            } else {
                                1.0
                            };
                            rsample /= dist;
                        }

                        rsample *= drive;

                        filter_active = rsample * rsample > 1e-5;

                        let t = (pan_freq * k as f64).sin() * pan_amt + 0.5;
                        lsample = rsample * (1.0 - t);
                        rsample *= t;
                    }

                    // Delay runs regardless of input: each side feeds on
                    // the opposite channel's past.
                    if k >= dly {
                        lsample += chn_buf[k - dly + 1] as f64 * dly_amt;
                        rsample += chn_buf[k - dly] as f64 * dly_amt;
                    }

                    // Store for delay feedback, accumulate into the mix.
                    chn_buf[k] = lsample as i32;
                    chn_buf[k + 1] = rsample as i32;
                    mix_buf[k] += lsample as i32;
                    mix_buf[k + 1] += rsample as i32;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::{Instrument, Params, Pattern};

    /// A square-wave instrument routed through the filter's high-pass
    /// output at zero cutoff, which passes the dry signal unchanged.
    fn beep_params() -> Params {
        Params {
            osc1_waveform: 1,
            osc1_vol: 192,
            osc1_semi: 128,
            env_sustain: 10,
            env_release: 10,
            fx_filter: 1,
            fx_drive: 32,
            ..Params::default()
        }
    }

    fn beep_channel(params: Params, notes: Vec<u8>, commands: Vec<u8>) -> Instrument {
        Instrument {
            params,
            sequence: vec![1],
            patterns: vec![Pattern { notes, commands }],
        }
    }

    fn one_channel_song(instr: Instrument, row_len: usize, pattern_len: usize) -> Song {
        Song {
            row_len,
            pattern_len,
            end_pattern: 0,
            num_channels: 1,
            channels: vec![instr],
        }
    }

    fn render_mix(song: Song) -> Vec<i32> {
        let mut r = SongRenderer::with_noise_seed(song, 1).expect("valid song");
        while !r.is_complete() {
            r.step();
        }
        r.mix_buffer().to_vec()
    }

    #[test]
    fn silent_minimal_song_completes_in_one_step() {
        let song = one_channel_song(Instrument::default(), 4, 1);
        let mut r = SongRenderer::with_noise_seed(song, 0).unwrap();
        assert!(!r.is_complete());
        assert_eq!(r.step(), 1.0);
        assert!(r.is_complete());

        let wav = r.finalize().expect("complete run should finalize");
        assert_eq!(wav.len(), 44 + 16);
        assert!(wav[44..].iter().all(|&b| b == 0), "silent song should be all zero");
    }

    #[test]
    fn progress_counts_channels_and_never_overshoots() {
        let instr = beep_channel(beep_params(), vec![135], vec![]);
        let song = Song {
            row_len: 32,
            pattern_len: 1,
            end_pattern: 0,
            num_channels: 3,
            channels: vec![instr.clone(), instr.clone(), instr],
        };
        let mut r = SongRenderer::with_noise_seed(song, 0).unwrap();
        assert_eq!(r.progress(), 0.0);

        let mut last = 0.0;
        for step in 1..=3 {
            let p = r.step();
            assert!(!p.is_nan(), "progress must never be NaN");
            assert!(p > last && p <= 1.0, "progress {p} out of order at step {step}");
            last = p;
        }
        assert_eq!(last, 1.0, "progress must reach exactly 1.0");

        // Stepping past completion stays a no-op at 1.0.
        assert_eq!(r.step(), 1.0);
        assert_eq!(r.progress(), 1.0);
    }

    #[test]
    fn finalize_before_complete_is_an_error() {
        let instr = beep_channel(beep_params(), vec![135], vec![]);
        let song = Song {
            row_len: 32,
            pattern_len: 1,
            end_pattern: 0,
            num_channels: 2,
            channels: vec![instr.clone(), instr],
        };
        let mut r = SongRenderer::with_noise_seed(song, 0).unwrap();
        r.step();
        let err = r.finalize().unwrap_err();
        assert!(matches!(
            err,
            RenderError::NotComplete { channels_done: 1, channels_total: 2 }
        ));
    }

    #[test]
    fn finalize_is_byte_identical_across_calls() {
        let params = Params { noise_vol: 60, ..beep_params() };
        let song = one_channel_song(beep_channel(params, vec![135], vec![]), 32, 1);
        let mut r = SongRenderer::with_noise_seed(song, 99).unwrap();
        r.step();
        let a = r.finalize().unwrap();
        let b = r.finalize().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let params = Params { noise_vol: 60, ..beep_params() };
        let song = one_channel_song(beep_channel(params, vec![135], vec![]), 32, 1);
        let a = render_mix(song.clone());
        let b = render_mix(song);
        assert_eq!(a, b, "same song and seed should render identically");
    }

    #[test]
    fn invalid_song_is_rejected_at_construction() {
        let mut song = one_channel_song(Instrument::default(), 4, 1);
        song.row_len = 0;
        assert!(matches!(
            SongRenderer::new(song),
            Err(SongError::ZeroRowLen)
        ));
    }

    #[test]
    fn two_identical_channels_double_the_mix() {
        let instr = beep_channel(beep_params(), vec![135], vec![]);
        let single = one_channel_song(instr.clone(), 32, 2);
        let double = Song {
            row_len: 32,
            pattern_len: 2,
            end_pattern: 0,
            num_channels: 2,
            channels: vec![instr.clone(), instr],
        };

        let one = render_mix(single);
        let two = render_mix(double);
        assert!(one.iter().any(|&s| s != 0), "beep should be audible");
        for (i, (&a, &b)) in one.iter().zip(two.iter()).enumerate() {
            assert_eq!(b, 2 * a, "channel accumulation mismatch at word {i}");
        }
    }

    #[test]
    fn pan_amount_zero_keeps_channels_equal() {
        let song = one_channel_song(beep_channel(beep_params(), vec![135], vec![]), 32, 1);
        let mix = render_mix(song);
        assert!(mix.iter().any(|&s| s != 0));
        for pair in mix.chunks_exact(2) {
            assert_eq!(pair[0], pair[1], "centered pan should mirror left and right");
        }
    }

    #[test]
    fn delay_amount_zero_makes_delay_time_irrelevant() {
        let mut with_time = beep_params();
        with_time.fx_delay_time = 4;
        let mut without_time = beep_params();
        without_time.fx_delay_time = 0;

        let a = render_mix(one_channel_song(beep_channel(with_time, vec![135], vec![]), 32, 2));
        let b = render_mix(one_channel_song(beep_channel(without_time, vec![135], vec![]), 32, 2));
        assert_eq!(a, b, "delay amount 0 must make the delay stage a no-op");
    }

    #[test]
    fn delay_echoes_into_silent_rows() {
        // Note shorter than a row, so row 1 is silent except for the echo.
        let mut params = beep_params();
        params.env_sustain = 2;
        params.env_release = 0;
        params.fx_delay_time = 1;

        let dry = one_channel_song(beep_channel(params, vec![135], vec![]), 32, 2);
        let mut wet_params = params;
        wet_params.fx_delay_amount = 255;
        let wet = one_channel_song(beep_channel(wet_params, vec![135], vec![]), 32, 2);

        let dry_mix = render_mix(dry);
        let wet_mix = render_mix(wet);
        let row1 = 32 * 2;
        assert!(dry_mix[row1..].iter().all(|&s| s == 0), "dry tail should be silent");
        assert!(wet_mix[row1..].iter().any(|&s| s != 0), "echo should land in row 1");
    }

    #[test]
    fn command_rewrites_parameter_and_refreshes_notes() {
        let plain = one_channel_song(
            beep_channel(beep_params(), vec![135, 135], vec![]),
            32,
            2,
        );
        // Command 2 (oscillator 1 volume) fires on row 1 and must both
        // update the parameter and re-synthesize the cached note.
        let commanded = one_channel_song(
            beep_channel(beep_params(), vec![135, 135], vec![0, 2, 0, 50]),
            32,
            2,
        );

        let a = render_mix(plain);
        let b = render_mix(commanded);
        let row1 = 32 * 2;
        assert_eq!(a[..row1], b[..row1], "row 0 precedes the command");
        assert_ne!(a[row1..], b[row1..], "row 1 should reflect the new volume");
    }

    #[test]
    fn effect_only_command_keeps_note_cache() {
        // Command 24 (drive) is outside the synthesis range; the note in
        // row 1 must come from the cache while the drive change still
        // applies to the sample chain. The note fits inside one row so the
        // two rows are directly comparable.
        let mut params = beep_params();
        params.env_sustain = 2;
        params.env_release = 0;
        let base = one_channel_song(
            beep_channel(params, vec![135, 135], vec![0, 24, 0, 64]),
            32,
            2,
        );
        let mix = render_mix(base);
        let row1 = 32 * 2;
        // Doubled drive scales row 1 relative to row 0's equivalent sample.
        let r0 = mix[0];
        let r1 = mix[row1];
        assert!(r0 != 0 && r1 != 0);
        assert_eq!(r1, r0 * 2, "drive command should rescale the row");
    }

    #[test]
    fn note_tail_past_song_end_is_truncated() {
        let mut params = beep_params();
        params.env_release = 200; // enormous tail
        let song = one_channel_song(beep_channel(params, vec![135], vec![]), 8, 1);
        let expected_words = song.num_words();
        let mix = render_mix(song);
        assert_eq!(mix.len(), expected_words);
    }

    #[test]
    fn empty_sequence_slot_renders_nothing() {
        let instr = Instrument {
            params: beep_params(),
            sequence: vec![0],
            patterns: vec![Pattern { notes: vec![135], commands: vec![] }],
        };
        let mix = render_mix(one_channel_song(instr, 16, 1));
        assert!(mix.iter().all(|&s| s == 0), "empty slots must stay silent");
    }
}
