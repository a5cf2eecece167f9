pub mod env;
mod loader;

pub use env::{
    AppConfig, AuthConfig, ConfigError, DialogResources, DirectoryConfig, DisplayConfig,
    PushConfig, ResourceConfig,
};
pub use loader::load_config;
