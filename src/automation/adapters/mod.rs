//! Adapter implementations for automation ports.

pub mod generator;
pub mod memory;

pub use generator::{CompletionContentGenerator, GenerationError, GeneratorSettings};
