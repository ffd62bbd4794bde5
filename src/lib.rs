//! Grid soundboard and sound-pad browser for a tabletop host.
//!
//! Library surface: the `services` controllers plus the collaborator seams
//! (`settings`, `playback`, `catalog`) they are built on. `state::AppContext`
//! wires them together.

pub mod catalog;
pub mod config;
pub mod error;
pub mod media;
pub mod playback;
pub mod services;
pub mod settings;
pub mod state;
