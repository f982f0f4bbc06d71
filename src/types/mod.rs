//! Unified data model shared by every provider.

pub mod config;
pub mod http;
pub mod prompt;
pub mod provider;
pub mod response;

pub use config::ProviderConfig;
pub use http::{HttpConfig, HttpConfigBuilder};
pub use prompt::{GenParams, Prompt};
pub use provider::ProviderId;
pub use response::{FinishReason, GenResponse, Usage, Warning};
