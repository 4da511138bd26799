pub mod serve;
pub mod config;
pub mod logs;

pub use serve::ServeArgs;
pub use config::ConfigArgs;
pub use logs::LogsArgs;
