//! Types shared between the hoops server and its clients: court-space math,
//! simulation tuning, and the JSON wire protocol.

pub mod config;
pub mod protocol;
pub mod quat;
pub mod vec3;
