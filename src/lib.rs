//! scribe-capture - microphone capture with device fallback
//!
//! Acquires an input device (falling back to any working microphone when
//! the preferred one is missing), records either manually into a single
//! artifact or by voice activity into one artifact per speech segment, and
//! keeps at most one of those modes active at a time.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Value objects and parse errors
//! - **Application**: Acquisition, the recording modes, the mode coordinator and port interfaces (traits)
//! - **Infrastructure**: Adapter implementations (cpal, WAV encoding, WebRTC VAD, config and artifact files)
//! - **CLI**: Command-line interface, argument parsing, logging and signal handling

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
