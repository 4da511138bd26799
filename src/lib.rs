pub mod config;
pub mod server;
pub mod logging;
pub mod routes;
pub mod cli;
pub mod utils;

pub use config::Config;
pub use server::Server;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
