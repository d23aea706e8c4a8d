pub mod config;
pub mod error;
pub mod retry;
pub mod secure;

pub use config::{BrowserConfig, BrowserConfigBuilder, ContextOptions, ProxySettings, WindowSize};
pub use error::{Error, Result};
pub use retry::RetryPolicy;
pub use secure::SecureStore;
