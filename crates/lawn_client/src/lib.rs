//! Client runtime: the peer mirror and its network plumbing.
//!
//! The mirror is a full, non-authoritative engine ticked by the local
//! clock. It never originates decisions; every discrete change it applies
//! arrived from the room authority over the gameplay channel (or, in solo
//! mode, there is no authority at all and the local engine is the game).

pub mod config;
pub mod mirror;
pub mod net;

pub use mirror::mirror_task;
pub use net::{connect, run_session, ClientConfig, NetError, Session};
