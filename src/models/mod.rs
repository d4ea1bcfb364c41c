// Data models (structs)
pub mod performance;
pub mod sample;
pub mod settings;
pub mod target;

pub use performance::*;
pub use sample::*;
pub use settings::*;
pub use target::*;
