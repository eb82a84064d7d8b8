pub mod config;
pub mod control;
pub mod room;
pub mod rooms;

pub use control::run;
pub use rooms::{RoomRegistry, RoomSettings};
