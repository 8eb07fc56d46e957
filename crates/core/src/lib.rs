pub mod category;
pub mod config;
pub mod error;

pub use category::*;
pub use config::Config;
pub use error::*;
