//! Song data model — patterns, command rows, and instrument parameters.

use serde::{Deserialize, Serialize};

use crate::error::SongError;

/// Number of simultaneous note columns per pattern row.
pub const NUM_NOTE_COLS: usize = 4;

/// Number of addressable instrument parameters.
pub const NUM_PARAMS: usize = 28;

/// Instrument parameters. Every field is an 8-bit knob; command rows can
/// retarget any of them mid-song by index (see [`Params::set`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Oscillator 1 waveform selector (0 sine, 1 square, 2 saw, 3 triangle).
    pub osc1_waveform: u8,
    /// Oscillator 1 volume.
    pub osc1_vol: u8,
    /// Oscillator 1 semitone offset, biased by 128 (128 = no offset).
    pub osc1_semi: u8,
    /// Nonzero: oscillator 1 pitch tracks the squared amplitude envelope.
    pub osc1_xenv: u8,
    /// Oscillator 2 waveform selector.
    pub osc2_waveform: u8,
    /// Oscillator 2 volume.
    pub osc2_vol: u8,
    /// Oscillator 2 semitone offset, biased by 128.
    pub osc2_semi: u8,
    /// Oscillator 2 fine detune.
    pub osc2_detune: u8,
    /// Nonzero: oscillator 2 pitch tracks the squared amplitude envelope.
    pub osc2_xenv: u8,
    /// Noise oscillator volume.
    pub noise_vol: u8,
    /// Envelope attack; duration in samples is `attack² × 4`.
    pub env_attack: u8,
    /// Envelope sustain; duration in samples is `sustain² × 4`.
    pub env_sustain: u8,
    /// Envelope release; duration in samples is `release² × 4`.
    pub env_release: u8,
    /// Arpeggio chord word; low nibbles are cycled into the note offset.
    pub arp_chord: u8,
    /// Arpeggio speed exponent; step interval is `row_len × 2^(2 - speed)`.
    pub arp_speed: u8,
    /// LFO waveform selector.
    pub lfo_waveform: u8,
    /// LFO modulation amount.
    pub lfo_amount: u8,
    /// LFO frequency exponent.
    pub lfo_freq: u8,
    /// Nonzero: LFO modulates the filter cutoff.
    pub lfo_fx_freq: u8,
    /// Filter mode (1 high-pass, 3 band-pass, otherwise low-pass; 0 works
    /// as a plain low-pass).
    pub fx_filter: u8,
    /// Filter cutoff frequency.
    pub fx_freq: u8,
    /// Filter resonance.
    pub fx_resonance: u8,
    /// Distortion amount.
    pub fx_dist: u8,
    /// Output drive (post-filter gain).
    pub fx_drive: u8,
    /// Auto-pan depth.
    pub fx_pan_amount: u8,
    /// Auto-pan frequency exponent.
    pub fx_pan_freq: u8,
    /// Delay feedback amount.
    pub fx_delay_amount: u8,
    /// Delay time in rows.
    pub fx_delay_time: u8,
}

impl Params {
    /// Write a parameter by command index. Indices 0..=27 map to the fields
    /// in declaration order; anything higher is ignored.
    pub fn set(&mut self, index: usize, value: u8) {
        match index {
            0 => self.osc1_waveform = value,
            1 => self.osc1_vol = value,
            2 => self.osc1_semi = value,
            3 => self.osc1_xenv = value,
            4 => self.osc2_waveform = value,
            5 => self.osc2_vol = value,
            6 => self.osc2_semi = value,
            7 => self.osc2_detune = value,
            8 => self.osc2_xenv = value,
            9 => self.noise_vol = value,
            10 => self.env_attack = value,
            11 => self.env_sustain = value,
            12 => self.env_release = value,
            13 => self.arp_chord = value,
            14 => self.arp_speed = value,
            15 => self.lfo_waveform = value,
            16 => self.lfo_amount = value,
            17 => self.lfo_freq = value,
            18 => self.lfo_fx_freq = value,
            19 => self.fx_filter = value,
            20 => self.fx_freq = value,
            21 => self.fx_resonance = value,
            22 => self.fx_dist = value,
            23 => self.fx_drive = value,
            24 => self.fx_pan_amount = value,
            25 => self.fx_pan_freq = value,
            26 => self.fx_delay_amount = value,
            27 => self.fx_delay_time = value,
            _ => {}
        }
    }

    /// Read a parameter by index. Indices past the last field read as 0.
    pub fn get(&self, index: usize) -> u8 {
        match index {
            0 => self.osc1_waveform,
            1 => self.osc1_vol,
            2 => self.osc1_semi,
            3 => self.osc1_xenv,
            4 => self.osc2_waveform,
            5 => self.osc2_vol,
            6 => self.osc2_semi,
            7 => self.osc2_detune,
            8 => self.osc2_xenv,
            9 => self.noise_vol,
            10 => self.env_attack,
            11 => self.env_sustain,
            12 => self.env_release,
            13 => self.arp_chord,
            14 => self.arp_speed,
            15 => self.lfo_waveform,
            16 => self.lfo_amount,
            17 => self.lfo_freq,
            18 => self.lfo_fx_freq,
            19 => self.fx_filter,
            20 => self.fx_freq,
            21 => self.fx_resonance,
            22 => self.fx_dist,
            23 => self.fx_drive,
            24 => self.fx_pan_amount,
            25 => self.fx_pan_freq,
            26 => self.fx_delay_amount,
            27 => self.fx_delay_time,
            _ => 0,
        }
    }
}

/// One pattern's worth of note and command data for a single channel.
///
/// `notes` is indexed by `row + col * pattern_len` for up to
/// [`NUM_NOTE_COLS`] columns. `commands` holds the command number at `row`
/// and the deferred parameter value at `row + pattern_len`. Short tables
/// read as zero past their end.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pattern {
    #[serde(default)]
    pub notes: Vec<u8>,
    #[serde(default)]
    pub commands: Vec<u8>,
}

impl Pattern {
    /// Note number at `row`/`col`, 0 when absent.
    pub fn note(&self, row: usize, col: usize, pattern_len: usize) -> u8 {
        self.notes.get(row + col * pattern_len).copied().unwrap_or(0)
    }

    /// Command number for `row`, 0 when absent.
    pub fn command(&self, row: usize) -> u8 {
        self.commands.get(row).copied().unwrap_or(0)
    }

    /// Deferred parameter value for the command at `row`, 0 when absent.
    pub fn command_value(&self, row: usize, pattern_len: usize) -> u8 {
        self.commands.get(row + pattern_len).copied().unwrap_or(0)
    }
}

/// One channel: an instrument plus its pattern sequence and pattern data.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Instrument {
    /// Synthesis and effect parameters.
    pub params: Params,
    /// Pattern sequence: 1-based index into `patterns`, 0 = empty slot.
    /// Positions past the end of the sequence are empty.
    #[serde(default)]
    pub sequence: Vec<u8>,
    /// Pattern data referenced by `sequence`.
    #[serde(default)]
    pub patterns: Vec<Pattern>,
}

impl Instrument {
    /// Pattern data for sequence position `pos`, or `None` for an empty slot.
    pub fn pattern_at(&self, pos: usize) -> Option<&Pattern> {
        let idx = self.sequence.get(pos).copied().unwrap_or(0) as usize;
        if idx == 0 { None } else { self.patterns.get(idx - 1) }
    }
}

/// A complete song description. Immutable input to a synthesis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    /// Samples per pattern row.
    pub row_len: usize,
    /// Rows per pattern.
    pub pattern_len: usize,
    /// Index of the last sequence position, inclusive.
    pub end_pattern: usize,
    /// Number of channels; must match `channels.len()`.
    pub num_channels: usize,
    pub channels: Vec<Instrument>,
}

impl Song {
    /// Parse a song from its JSON representation.
    pub fn from_json(json: &str) -> Result<Song, SongError> {
        let song: Song = serde_json::from_str(json)?;
        song.validate()?;
        Ok(song)
    }

    /// Total number of 16-bit words in the stereo output
    /// (`2 × row_len × pattern_len × (end_pattern + 1)`).
    pub fn num_words(&self) -> usize {
        self.row_len * self.pattern_len * (self.end_pattern + 1) * 2
    }

    /// Fail-fast structural validation: a song that passes renders without
    /// panicking; audible garbage from extreme parameter values is allowed.
    pub fn validate(&self) -> Result<(), SongError> {
        if self.row_len == 0 {
            return Err(SongError::ZeroRowLen);
        }
        if self.pattern_len == 0 {
            return Err(SongError::ZeroPatternLen);
        }
        if self.channels.is_empty() {
            return Err(SongError::NoChannels);
        }
        if self.num_channels != self.channels.len() {
            return Err(SongError::ChannelCountMismatch {
                declared: self.num_channels,
                actual: self.channels.len(),
            });
        }
        for (ch, instr) in self.channels.iter().enumerate() {
            for pos in 0..=self.end_pattern {
                let idx = instr.sequence.get(pos).copied().unwrap_or(0) as usize;
                if idx > instr.patterns.len() {
                    return Err(SongError::PatternOutOfRange {
                        channel: ch,
                        position: pos,
                        pattern: idx,
                        available: instr.patterns.len(),
                    });
                }
            }
        }
        Ok(())
    }
}
