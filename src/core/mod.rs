pub mod constants;
pub mod filename;
pub mod index;
pub mod model;
pub mod shasums;
pub mod signing;

pub use filename::*;
pub use index::*;
pub use model::*;
pub use shasums::*;
pub use signing::*;
