//! Bomber Arena core library
//!
//! Simulation core for a grid-based bomber arena: a uniform spatial hash over
//! the game objects, collision queries built on it, and a tactical AI that
//! drives bombers through the same controller interface as human input.

pub mod config;
pub mod util;
pub mod game;
