//! Basketball lobby server library.
//!
//! This module exposes the server components for use in tests and binaries.

pub mod aabb;
pub mod api;
pub mod ball;
pub mod config;
pub mod court;
pub mod game_loop;
pub mod lobby;
pub mod player;
pub mod registry;
pub mod scoring;
pub mod ws;
