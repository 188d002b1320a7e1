//! Annotation loaders for the supported dataset layouts.

mod encoded;
mod sample;
mod synth;
mod voc;

pub use encoded::*;
pub use sample::*;
pub use synth::*;
pub use voc::*;
