pub mod ai;
pub mod bombs;
pub mod extras;
pub mod movement;
