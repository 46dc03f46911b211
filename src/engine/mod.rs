pub mod scoring;
pub mod sequencer;
pub mod stats;
pub mod timer;
