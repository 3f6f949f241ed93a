// SPDX-License-Identifier: MIT

//! OAuth2 client-credentials token acquisition

use once_cell::sync::Lazy;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::config::BankConfig;
use super::error::BankError;

const ACCOUNTS_SCOPES: &[&str] = &["accounts:read", "accounts:execute"];
const BANKS_SCOPES: &[&str] = &["banks:read", "banks:write"];
const CUSTOMER_SCOPES: &[&str] = &["customers:read", "customers:write", "customers:execute"];
const PRICES_SCOPES: &[&str] = &["prices:read"];
const QUOTES_SCOPES: &[&str] = &["quotes:read", "quotes:execute"];
const TRADES_SCOPES: &[&str] = &["trades:read", "trades:execute"];
const TRANSFERS_SCOPES: &[&str] = &["transfers:read", "transfers:execute"];
const EXTERNAL_WALLET_SCOPES: &[&str] = &["external_wallets:read", "external_wallets:execute"];

/// Space-separated scope string requested with every token
pub static SCOPES: Lazy<String> = Lazy::new(|| {
    [
        ACCOUNTS_SCOPES,
        BANKS_SCOPES,
        CUSTOMER_SCOPES,
        PRICES_SCOPES,
        QUOTES_SCOPES,
        TRADES_SCOPES,
        TRANSFERS_SCOPES,
        EXTERNAL_WALLET_SCOPES,
    ]
    .concat()
    .join(" ")
});

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    scope: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Request a bearer token for the configured application
pub async fn fetch_token(client: &Client, config: &BankConfig) -> Result<String, BankError> {
    log::info!("Getting auth token...");

    let request = TokenRequest {
        grant_type: "client_credentials",
        client_id: &config.client_id,
        client_secret: &config.client_secret,
        scope: &SCOPES,
    };

    let resp = client
        .post(config.token_url.clone())
        .header("Content-Type", "application/json")
        .json(&request)
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        log::error!("Unable to get auth token: HTTP {}", status.as_u16());
        return Err(BankError::Api {
            endpoint: format!("POST {}", config.token_url.path()),
            status: status.as_u16(),
            body,
        });
    }

    let token: TokenResponse = resp.json().await?;
    let token = token
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or(BankError::MissingToken)?;

    log::info!("Got auth token.");
    Ok(token)
}
