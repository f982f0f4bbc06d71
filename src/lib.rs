//! # llm-dispatch
//!
//! One call shape for several hosted LLM providers: OpenAI, Anthropic, Google
//! Gemini, xAI and OpenRouter. A [`ProviderConfig`] names the provider and
//! model; [`Prompt`] and [`GenParams`] describe the request; every provider's
//! answer comes back as the same [`GenResponse`], and every failure as one
//! [`LlmError`] kind.
//!
#![deny(unsafe_code)]

//! ## Quick Start
//!
//! ```rust,no_run
//! use llm_dispatch::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Key comes from OPENAI_API_KEY unless set explicitly
//!     let client = LlmClient::new(ProviderConfig::new("openai", "gpt-4o"))?;
//!
//!     let response = client
//!         .generate(
//!             &Prompt::new("You are helpful.", "2+2?"),
//!             &GenParams::new().with_max_tokens(16),
//!         )
//!         .await?;
//!     println!("{} ({:?})", response.text, response.usage);
//!     Ok(())
//! }
//! ```
//!
//! ## Blocking use
//!
//! ```rust,no_run
//! use llm_dispatch::{GenParams, Prompt, ProviderConfig};
//!
//! let config = ProviderConfig::new("gemini", "gemini-2.5-flash").with_api_key("...");
//! let response = llm_dispatch::generate_blocking(config, &Prompt::input("Hello"), &GenParams::new())?;
//! println!("{}", response.text);
//! # Ok::<(), llm_dispatch::LlmError>(())
//! ```
//!
//! ## Errors
//!
//! Unknown providers and missing credentials fail before any request is sent.
//! Rate limits and transient network failures are retried with bounded
//! exponential backoff; everything else surfaces on first occurrence.

pub mod adapters;
pub mod auth;
pub mod client;
pub mod error;
pub mod execution;
pub mod generate;
pub mod observability;
pub mod registry;
pub mod retry;
pub mod types;

pub use client::{LlmClient, LlmClientBuilder};
pub use error::{ErrorKind, LlmError, Result};
pub use generate::{generate, generate_blocking};
pub use retry::RetryPolicy;
pub use types::{
    FinishReason, GenParams, GenResponse, HttpConfig, Prompt, ProviderConfig, ProviderId, Usage,
    Warning,
};

/// Common imports.
pub mod prelude {
    pub use crate::auth::{EnvSource, MapEnv, ProcessEnv};
    pub use crate::client::{LlmClient, LlmClientBuilder};
    pub use crate::error::{ErrorKind, LlmError};
    pub use crate::execution::{BlockingHttpTransport, HttpTransport};
    pub use crate::generate::{generate, generate_blocking};
    pub use crate::retry::RetryPolicy;
    pub use crate::types::{
        FinishReason, GenParams, GenResponse, HttpConfig, Prompt, ProviderConfig, ProviderId,
        Usage, Warning,
    };
}
