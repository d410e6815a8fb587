//! paperdex context
//!
//! Assembles bounded, ordered context windows from a single paper's
//! chunks and grounds text generation on them.

pub mod assembler;
pub mod generator;

pub use assembler::{AssembledContext, AssemblyOptions, ContextAssembler, RagAnswer};
pub use generator::{GeminiGenerator, TextGenerator};
