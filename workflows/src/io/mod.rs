//! The host boundary: variable stores, sequencer control, log sink, and the
//! polling configuration kept in global variables.

pub mod config;
pub mod host;
pub mod memory;
pub mod sleep;
pub mod vars;
