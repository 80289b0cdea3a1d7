//! HTTP client for the external text-generation service.

use std::time::Duration;

use futures::future::BoxFuture;
use rand::Rng;
use reqwest::Client;

use crate::config::BotConfig;
use crate::{ChatError, Result};

/// User agent string for generation requests.
const USER_AGENT: &str = "TrimChat/0.1 (Bot Responder)";

/// Fallback when the service answers with a non-success status.
const SERVER_ERROR_FALLBACK: &str =
    "My brain is fuzzy right now (Server Error). Try again in a second!";

/// Fallback when the body is an HTML error page instead of generated text.
const GATEWAY_FALLBACK: &str =
    "I'm having trouble connecting to the AI cloud (502). Please try again later.";

/// Fallback on transport errors and timeouts.
const NETWORK_FALLBACK: &str = "I'm having trouble thinking right now. (Network Error)";

/// Produces reply text for a prompt.
///
/// Infallible by contract: implementations must convert every failure into
/// fallback text. The chat core never sees a generation error.
pub trait ReplyGenerator: Send + Sync {
    /// Generate a reply for the given prompt.
    fn generate(&self, prompt: &str) -> BoxFuture<'static, String>;
}

/// Reply generator backed by the Pollinations text endpoint.
///
/// Requests are simple GETs with the prompt in the path and a random seed as a
/// cache-buster. Timeouts are bounded so a hung upstream degrades to fallback
/// text instead of waiting indefinitely.
pub struct PollinationsClient {
    client: Client,
    endpoint: String,
    model: String,
    persona: String,
}

impl PollinationsClient {
    /// Create a client from the bot configuration.
    pub fn new(config: &BotConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ChatError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            persona: config.persona.clone(),
        })
    }

    /// Build the request URL for a prompt.
    fn request_url(&self, prompt: &str) -> String {
        let full_prompt = format!("{}\n\nUser: {}\nBot:", self.persona, prompt);
        let seed: u32 = rand::rng().random_range(0..10_000);
        format!(
            "{}/{}?model={}&seed={}",
            self.endpoint,
            urlencoding::encode(&full_prompt),
            self.model,
            seed
        )
    }
}

impl ReplyGenerator for PollinationsClient {
    fn generate(&self, prompt: &str) -> BoxFuture<'static, String> {
        let url = self.request_url(prompt);
        let client = self.client.clone();

        Box::pin(async move {
            let response = match client.get(&url).send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("generation request failed: {e}");
                    return NETWORK_FALLBACK.to_string();
                }
            };

            if !response.status().is_success() {
                tracing::warn!("generation service returned {}", response.status());
                return SERVER_ERROR_FALLBACK.to_string();
            }

            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("failed to read generation response: {e}");
                    return NETWORK_FALLBACK.to_string();
                }
            };

            if looks_like_html_error(&text) {
                tracing::warn!("generation service returned an HTML error page");
                return GATEWAY_FALLBACK.to_string();
            }

            text
        })
    }
}

/// Detect an HTML error page (e.g. an upstream 502) returned with status 200.
fn looks_like_html_error(text: &str) -> bool {
    text.trim_start().starts_with('<') || text.contains("502 Bad Gateway")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url_shape() {
        let config = BotConfig::default();
        let client = PollinationsClient::new(&config).unwrap();
        let url = client.request_url("what is 2+2");

        assert!(url.starts_with("https://text.pollinations.ai/"));
        assert!(url.contains("model=openai"));
        assert!(url.contains("seed="));
        // Prompt is percent-encoded into the path
        assert!(url.contains("what%20is%202%2B2"));
        assert!(url.contains("TrimChat%20Bot"));
    }

    #[test]
    fn test_request_url_strips_trailing_slash() {
        let config = BotConfig {
            endpoint: "https://example.com/".to_string(),
            ..BotConfig::default()
        };
        let client = PollinationsClient::new(&config).unwrap();
        let url = client.request_url("hi");
        assert!(url.starts_with("https://example.com/You"));
    }

    #[test]
    fn test_looks_like_html_error() {
        assert!(looks_like_html_error("<html><body>oops</body></html>"));
        assert!(looks_like_html_error("  <!DOCTYPE html>"));
        assert!(looks_like_html_error("upstream said: 502 Bad Gateway"));
        assert!(!looks_like_html_error("The answer is 4."));
    }

    #[tokio::test]
    async fn test_generate_falls_back_on_unreachable_host() {
        let config = BotConfig {
            endpoint: "http://127.0.0.1:1".to_string(),
            connect_timeout_secs: 1,
            total_timeout_secs: 1,
            ..BotConfig::default()
        };
        let client = PollinationsClient::new(&config).unwrap();
        let reply = client.generate("hello").await;
        assert_eq!(reply, NETWORK_FALLBACK);
    }
}
