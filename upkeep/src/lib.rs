pub mod engine;
pub mod gate;
pub mod runner;
pub mod state;
pub mod types;
