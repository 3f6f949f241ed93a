// SPDX-License-Identifier: MIT

//! Bank API configuration loaded from the environment
//!
//! `main` calls `dotenv().ok()` first, so a local `.env` file works too.

use std::env;
use std::time::Duration;
use url::Url;

use super::error::BankError;
use crate::flow::PollSpec;

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_CRYPTO_ASSETS: &str = "BTC,ETH,USDC";

#[derive(Debug, Clone)]
pub struct BankConfig {
    /// `{scheme}://{BASE_URL}`
    pub api_base: Url,
    /// `{scheme}://id.{BASE_URL}/oauth/token`
    pub token_url: Url,
    pub client_id: String,
    pub client_secret: String,
    /// Cadence and per-poll deadline for every convergence wait
    pub poll: PollSpec,
    pub crypto_assets: Vec<String>,
}

impl BankConfig {
    /// Load from process environment variables
    pub fn from_env() -> Result<Self, BankError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BankError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| BankError::config(format!("{} must be set", key)))
        };

        let base_url = required("BASE_URL")?;
        let client_id = required("APPLICATION_CLIENT_ID")?;
        let client_secret = required("APPLICATION_CLIENT_SECRET")?;

        let scheme = lookup("URL_SCHEME").unwrap_or_else(|| "https".to_string());
        if scheme != "https" && scheme != "http" {
            return Err(BankError::config(format!(
                "URL_SCHEME must be http or https, got '{}'",
                scheme
            )));
        }

        let api_base = Url::parse(&format!("{}://{}", scheme, base_url))?;
        let token_url = Url::parse(&format!("{}://id.{}/oauth/token", scheme, base_url))?;

        let timeout_secs = parse_number(&lookup, "TIMEOUT", DEFAULT_TIMEOUT_SECS)?;
        let interval_ms = parse_number(&lookup, "POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;
        let poll = PollSpec::new(
            Duration::from_millis(interval_ms),
            Duration::from_secs(timeout_secs),
        )
        .map_err(|e| BankError::config(e.to_string()))?;

        let crypto_assets = parse_assets(
            &lookup("CRYPTO_ASSETS").unwrap_or_else(|| DEFAULT_CRYPTO_ASSETS.to_string()),
        );

        log::debug!(
            "Bank config: api_base={}, token_url={}, poll={:?}, assets={:?}",
            api_base,
            token_url,
            poll,
            crypto_assets
        );

        Ok(Self {
            api_base,
            token_url,
            client_id,
            client_secret,
            poll,
            crypto_assets,
        })
    }
}

fn parse_number<F>(lookup: &F, key: &str, default: u64) -> Result<u64, BankError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| BankError::config(format!("{} must be a number, got '{}'", key, raw))),
    }
}

/// Split a comma list into upper-case asset codes, skipping blanks
pub fn parse_assets(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|a| a.trim().to_uppercase())
        .filter(|a| !a.is_empty())
        .collect()
}
