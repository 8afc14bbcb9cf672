// Modules
pub mod cli;
pub mod collectors;
pub mod core;
pub mod emitters;
pub mod error;
pub mod generate;
pub mod infrastructure;
pub mod utils;

// Common types
pub use crate::core::constants as app_constants;
pub use cli::{Cli, CommandHandler, Commands};
pub use error::*;
pub use generate::{resolve_server, GenerateSummary, Generator};
pub use infrastructure::config::{ProviderConfig, RegistryConfig, ServerType, ServicesConfig};
pub use infrastructure::remote::{GitHubClient, HttpClient, ReleaseSource, TextFetcher};
