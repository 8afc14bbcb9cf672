pub mod config;
pub mod remote;

pub use config::*;
pub use remote::*;
