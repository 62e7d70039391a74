#![forbid(unsafe_code)]

//! Adaptive difficulty and spaced-repetition controller for practice drills.
//!
//! Everything in this crate is pure: band selection, scoring, break detection
//! and calibration take their inputs explicitly and return new values. State
//! ownership and collaborator wiring live in the `storage` and `services`
//! crates.

pub mod breaks;
pub mod calibration;
pub mod config;
pub mod error;
pub mod model;
pub mod scoring;
pub mod selection;
pub mod time;

pub use config::EngineConfig;
pub use error::Error;
pub use time::Clock;
