//! State-variable filter — low/high/band-pass from one state update.

/// Filter output selector. Mode values come straight from the instrument's
/// filter parameter; anything that isn't high- or band-pass is low-pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Lowpass,
    Highpass,
    Bandpass,
}

impl FilterMode {
    pub fn from_index(index: u8) -> FilterMode {
        match index {
            1 => FilterMode::Highpass,
            3 => FilterMode::Bandpass,
            _ => FilterMode::Lowpass,
        }
    }
}

/// A Chamberlin-style state-variable filter.
///
/// One update produces all three responses; the caller picks one. The
/// cutoff argument is pre-warped with `1.5·sin(f)`, which keeps the
/// integrator coefficient bounded however the LFO swings the cutoff.
/// State persists until [`reset`](Self::reset), so a channel pass carries
/// filter ringing across row boundaries.
#[derive(Debug, Clone, Default)]
pub struct StateVariableFilter {
    low: f64,
    band: f64,
}

impl StateVariableFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the filter one sample and return the selected response.
    ///
    /// `f` is the (possibly LFO-modulated) cutoff coefficient, `q` the
    /// damping term derived from the resonance parameter.
    pub fn process(&mut self, input: f64, f: f64, q: f64, mode: FilterMode) -> f64 {
        let f = 1.5 * f.sin();
        self.low += f * self.band;
        let high = q * (input - self.band) - self.low;
        self.band += f * high;
        match mode {
            FilterMode::Bandpass => self.band,
            FilterMode::Highpass => high,
            FilterMode::Lowpass => self.low,
        }
    }

    pub fn reset(&mut self) {
        self.low = 0.0;
        self.band = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_input_stays_silent() {
        let mut svf = StateVariableFilter::new();
        for _ in 0..100 {
            let out = svf.process(0.0, 0.3, 1.0, FilterMode::Lowpass);
            assert_eq!(out, 0.0);
        }
    }

    #[test]
    fn lowpass_dc_gain_is_q() {
        let mut svf = StateVariableFilter::new();
        let mut out = 0.0;
        for _ in 0..5000 {
            out = svf.process(1.0, 0.3, 0.5, FilterMode::Lowpass);
        }
        assert!((out - 0.5).abs() < 1e-6, "lowpass DC should settle at q, got {out}");
    }

    #[test]
    fn highpass_rejects_dc() {
        let mut svf = StateVariableFilter::new();
        let mut out = 0.0;
        for _ in 0..5000 {
            out = svf.process(1.0, 0.3, 0.5, FilterMode::Highpass);
        }
        assert!(out.abs() < 1e-6, "highpass should block DC, got {out}");
    }

    #[test]
    fn bandpass_rings_then_decays() {
        let mut svf = StateVariableFilter::new();
        let first = svf.process(1.0, 0.3, 0.5, FilterMode::Bandpass);
        assert!(first != 0.0, "impulse should excite the band response");
        let mut out = 0.0;
        for _ in 0..5000 {
            out = svf.process(0.0, 0.3, 0.5, FilterMode::Bandpass);
        }
        assert!(out.abs() < 1e-6, "band response should decay to silence, got {out}");
    }

    #[test]
    fn reset_clears_ringing() {
        let mut svf = StateVariableFilter::new();
        for _ in 0..10 {
            svf.process(1.0, 0.3, 0.5, FilterMode::Lowpass);
        }
        svf.reset();
        let out = svf.process(0.0, 0.3, 0.5, FilterMode::Lowpass);
        assert_eq!(out, 0.0, "reset should drop all filter state");
    }

    #[test]
    fn mode_selection_from_parameter() {
        assert_eq!(FilterMode::from_index(0), FilterMode::Lowpass);
        assert_eq!(FilterMode::from_index(1), FilterMode::Highpass);
        assert_eq!(FilterMode::from_index(2), FilterMode::Lowpass);
        assert_eq!(FilterMode::from_index(3), FilterMode::Bandpass);
        assert_eq!(FilterMode::from_index(255), FilterMode::Lowpass);
    }
}
