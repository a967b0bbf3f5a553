//! Tone classification for spoken syllables: pitch-contour features, dataset
//! tooling, model inference, evaluation, and a chat bot front end.

pub mod audio;
pub mod bot;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod evaluation;
pub mod features;
pub mod model;
pub mod types;
