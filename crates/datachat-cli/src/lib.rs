//! datachat command-line client.
//!
//! Configuration, logging and text rendering live here, separate from main.rs,
//! so they can be unit tested.

pub mod config;
pub mod logging;
pub mod render;
