//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, InfrastructureConfig, KnowledgeBaseConfig, LogFormat, LoggingConfig, ServerConfig,
};
