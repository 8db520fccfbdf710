use thiserror::Error;

/// Failures the bot distinguishes when deciding how to answer a message.
#[derive(Debug, Error)]
pub enum BotError {
    /// Network failure, non-2xx status or undecodable payload from a third-party source.
    #[error("upstream fetch failed for {url}: {reason}")]
    UpstreamFetch { url: String, reason: String },

    /// A station or area lookup produced no candidate.
    #[error("no match found for '{0}'")]
    NoMatchFound(String),

    /// The image cache could neither find nor create a share link.
    #[error("image resolution failed: {0}")]
    ImageResolution(String),

    /// Missing or invalid credentials; fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl BotError {
    pub fn upstream(url: &str, reason: impl std::fmt::Display) -> Self {
        BotError::UpstreamFetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
