//! Single-shot entry points.
//!
//! Each call builds a throwaway [`LlmClient`], so configuration is validated
//! and resolved on every call. Hold a client when making repeated calls.

use crate::client::LlmClient;
use crate::error::Result;
use crate::types::{GenParams, GenResponse, Prompt, ProviderConfig};

/// One suspending call.
///
/// ```rust,no_run
/// use llm_dispatch::{GenParams, Prompt, ProviderConfig};
///
/// # async fn run() -> Result<(), llm_dispatch::LlmError> {
/// let config = ProviderConfig::new("openai", "gpt-4o").with_api_key("sk-...");
/// let prompt = Prompt::new("You are helpful.", "2+2?");
/// let response = llm_dispatch::generate(config, &prompt, &GenParams::new()).await?;
/// println!("{}", response.text);
/// # Ok(())
/// # }
/// ```
pub async fn generate(
    config: ProviderConfig,
    prompt: &Prompt,
    params: &GenParams,
) -> Result<GenResponse> {
    LlmClient::new(config)?.generate(prompt, params).await
}

/// One blocking call on the caller's thread.
pub fn generate_blocking(
    config: ProviderConfig,
    prompt: &Prompt,
    params: &GenParams,
) -> Result<GenResponse> {
    LlmClient::new(config)?.generate_blocking(prompt, params)
}
