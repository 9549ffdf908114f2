pub use self::parser::{ApiConfig, AuthConfig, Config, LoggingConfig, MirrorConfig};
pub use self::validator::ConfigError;

mod parser;
mod validator;
