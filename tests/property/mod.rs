//! Property-based tests for output parsing, prompt resolution and duration estimates

mod output_split;
mod prompt_resolution;
mod speech_estimate;
