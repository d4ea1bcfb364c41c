// Command handlers - one file per domain
pub mod monitor;
pub mod settings;
