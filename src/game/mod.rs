pub mod constants;
pub mod coords;
pub mod object;
pub mod map;
pub mod spatial;
pub mod collision;
pub mod input;
pub mod world;
pub mod systems;
pub mod match_result;
pub mod session;
