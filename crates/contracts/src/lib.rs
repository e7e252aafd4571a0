//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only, never on each other's internals.
//!
//! ## Time Model
//! - Sensor timestamps are sender wall-clock seconds (f64)
//! - A timestamp <= 0 means "unknown" and never blocks fusion
//!
//! ## Frames
//! - Orientation quaternions are consumed as delivered (no re-normalization)
//! - The sensor looks along +Z in its own frame

mod blueprint;
mod datagram_source;
mod error;
mod fusion_config;
mod mailbox;
mod point;
mod sample;
mod sink;

pub use blueprint::*;
pub use datagram_source::{DatagramCallback, DatagramSource, RawDatagram};
pub use error::*;
pub use fusion_config::*;
pub use mailbox::LatestSlot;
pub use point::*;
pub use sample::*;
pub use sink::*;

pub use nalgebra::{Quaternion, Vector3};
