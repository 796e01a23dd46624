// Per-frame processing: preprocess, detect, annotate, and the worker pool
// that runs them in parallel

pub mod analyzer;
pub mod annotate;
pub mod detection;
pub mod preprocess;
pub mod types;
pub mod worker;
