pub mod config_manager;
pub mod error;
pub mod findings;
pub mod types;

pub use config_manager::*;
pub use error::*;
pub use findings::*;
pub use types::*;
