//! Sources feeding the registry index: GitHub releases, upstream
//! registries and module archives on disk.

pub mod filesystem;
pub mod github;
pub mod registry;

pub use filesystem::*;
pub use github::*;
pub use registry::*;
