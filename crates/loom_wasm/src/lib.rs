//! WASM bindings for `loom_core`.
//!
//! Complex numbers cross the boundary as `[re, im]` pairs in serialized
//! payloads and as interleaved `re, im` arrays of `f64` elsewhere.

mod trivialization;

pub use trivialization::WasmTrivialization;
