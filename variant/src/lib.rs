pub mod catalog;
pub mod local;
pub mod selector;
pub mod types;
