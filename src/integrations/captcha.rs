use std::collections::HashSet;

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("captcha verifier unavailable: {0}")]
    Unavailable(String),
}

/// Bot check run before the engine. `Ok(false)` is a rejected token,
/// `Err` means the verifier itself could not answer.
pub trait CaptchaVerifier: Send + Sync {
    fn verify(&self, token: Option<&str>, client_ip: Option<&str>) -> Result<bool, CaptchaError>;
}

/// Used when no tokens are configured.
#[derive(Debug, Default, Clone)]
pub struct DisabledCaptcha;

impl CaptchaVerifier for DisabledCaptcha {
    fn verify(&self, _token: Option<&str>, client_ip: Option<&str>) -> Result<bool, CaptchaError> {
        debug!(client_ip = client_ip.unwrap_or("-"), "captcha check disabled");
        Ok(true)
    }
}

/// Accepts a fixed set of pre-shared tokens.
#[derive(Debug, Clone)]
pub struct StaticTokenVerifier {
    tokens: HashSet<String>,
}

impl StaticTokenVerifier {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }
}

impl CaptchaVerifier for StaticTokenVerifier {
    fn verify(&self, token: Option<&str>, client_ip: Option<&str>) -> Result<bool, CaptchaError> {
        if self.tokens.is_empty() {
            return Err(CaptchaError::Unavailable("no tokens configured".to_string()));
        }
        let accepted = token
            .map(str::trim)
            .is_some_and(|token| self.tokens.contains(token));
        debug!(client_ip = client_ip.unwrap_or("-"), accepted, "captcha token checked");
        Ok(accepted)
    }
}
