//! DSP engine — pure Rust synthesis and effects processing.
//!
//! All synthesis is deterministic given a seeded noise source; the same
//! code serves the native renderer and the WASM bindings.

pub mod engine;
pub mod filter;
pub mod noise;
pub mod note;
pub mod oscillator;
pub mod renderer;
