pub mod dsp;
pub mod error;
pub mod song;

use crate::dsp::engine::SongRenderer;
use crate::song::Song;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the patternbox core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: render a song description to a WAV byte array in one
/// blocking call.
#[wasm_bindgen]
pub fn render_song_wav(song: JsValue) -> Result<Vec<u8>, JsValue> {
    let song: Song =
        serde_wasm_bindgen::from_value(song).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    dsp::renderer::render_wav(song).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed progressive renderer.
///
/// Construct with a song description, call `step()` from a timer until it
/// returns 1.0, then call `finalize()` for the WAV bytes. This keeps long
/// renders off the host's critical path without any threading.
#[wasm_bindgen]
pub struct WavRenderer {
    inner: SongRenderer,
}

#[wasm_bindgen]
impl WavRenderer {
    #[wasm_bindgen(constructor)]
    pub fn new(song: JsValue) -> Result<WavRenderer, JsValue> {
        let song: Song =
            serde_wasm_bindgen::from_value(song).map_err(|e| JsValue::from_str(&format!("{e}")))?;
        let inner =
            SongRenderer::new(song).map_err(|e| JsValue::from_str(&format!("{e}")))?;
        Ok(WavRenderer { inner })
    }

    /// Synthesize one channel; returns overall progress in (0, 1].
    pub fn step(&mut self) -> f64 {
        self.inner.step()
    }

    pub fn progress(&self) -> f64 {
        self.inner.progress()
    }

    pub fn is_complete(&self) -> bool {
        self.inner.is_complete()
    }

    /// Encode the finished mix as WAV bytes. Errors if called before the
    /// render is complete.
    pub fn finalize(&self) -> Result<Vec<u8>, JsValue> {
        self.inner.finalize().map_err(|e| JsValue::from_str(&format!("{e}")))
    }
}
