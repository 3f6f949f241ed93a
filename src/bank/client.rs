// SPDX-License-Identifier: MIT

//! Authenticated JSON client for the bank REST API

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::error::BankError;

#[derive(Clone)]
pub struct BankClient {
    client: Client,
    base_url: Url,
    token: String,
}

impl BankClient {
    pub fn new(client: Client, base_url: Url, token: String) -> Self {
        Self {
            client,
            base_url,
            token,
        }
    }

    /// Resolve `path` (e.g. `api/customers`) against the API base
    pub fn endpoint(&self, path: &str) -> Result<Url, BankError> {
        Ok(self.base_url.join(path)?)
    }

    async fn request<B, R>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<R, BankError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let label = format!("{} {}", method, url.path());

        let mut req = self
            .client
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json");

        if !query.is_empty() {
            req = req.query(query);
        }

        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req.send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            log::warn!("{} returned HTTP {}", label, status.as_u16());
            return Err(BankError::Api {
                endpoint: label,
                status: status.as_u16(),
                body,
            });
        }

        log::debug!("{} returned HTTP {}", label, status.as_u16());
        Ok(resp.json().await?)
    }

    pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, BankError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.request(Method::POST, path, &[], Some(body)).await
    }

    pub async fn get<R>(&self, path: &str) -> Result<R, BankError>
    where
        R: DeserializeOwned,
    {
        self.request::<(), R>(Method::GET, path, &[], None).await
    }

    pub async fn get_with_query<R>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<R, BankError>
    where
        R: DeserializeOwned,
    {
        self.request::<(), R>(Method::GET, path, query, None).await
    }
}
