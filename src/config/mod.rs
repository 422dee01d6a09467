/// Database configuration and connection management
pub mod database;

/// Optional TOML seed file with initial categories and member codes
pub mod seed;

/// Runtime settings read from environment variables
pub mod settings;

pub use settings::AppConfig;
