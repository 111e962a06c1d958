pub mod oracle;
pub mod trend;
pub mod types;
