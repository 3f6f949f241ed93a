// SPDX-License-Identifier: MIT

//! Resource providers for the bank API
//!
//! Every resource the workflow touches is created with `POST /api/{path}` and
//! refreshed with `GET /api/{path}/{guid}`, so a single generic provider
//! covers all of them.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;

use super::auth;
use super::client::BankClient;
use super::config::BankConfig;
use super::models::{
    Account, AccountOwner, AccountType, Customer, ExternalWallet, IdentityVerification, ListPage,
    PostAccount, PostCustomer, PostExternalWallet, PostIdentityVerification, PostQuote, PostTrade,
    PostTransfer, Quote, Trade, Transfer,
};
use crate::flow::{Resource, ResourceProvider, TaskResult};

/// Object-safe provider for a given payload/resource pair
pub type Provider<I, R> = dyn ResourceProvider<Input = I, Resource = R>;

/// Every remote operation the onboarding workflow needs
#[async_trait]
pub trait BankBackend: Send + Sync {
    fn customers(&self) -> &Provider<PostCustomer, Customer>;

    fn identity_verifications(&self) -> &Provider<PostIdentityVerification, IdentityVerification>;

    fn accounts(&self) -> &Provider<PostAccount, Account>;

    fn external_wallets(&self) -> &Provider<PostExternalWallet, ExternalWallet>;

    fn trades(&self) -> &Provider<PostTrade, Trade>;

    fn transfers(&self) -> &Provider<PostTransfer, Transfer>;

    /// Quotes are created but never polled
    async fn create_quote(&self, quote: &PostQuote) -> TaskResult<Quote>;

    async fn list_accounts(
        &self,
        owner: AccountOwner,
        kind: AccountType,
    ) -> TaskResult<Vec<Account>>;
}

/// Produces an authenticated backend; called once per run
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> TaskResult<Arc<dyn BankBackend>>;
}

/// `POST api/{path}` / `GET api/{path}/{guid}` provider
pub struct RestProvider<I, R> {
    client: BankClient,
    path: &'static str,
    _marker: PhantomData<fn(I) -> R>,
}

impl<I, R> RestProvider<I, R> {
    pub fn new(client: BankClient, path: &'static str) -> Self {
        Self {
            client,
            path,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<I, R> ResourceProvider for RestProvider<I, R>
where
    I: Serialize + Send + Sync,
    R: Resource + DeserializeOwned,
{
    type Input = I;
    type Resource = R;

    async fn create(&self, input: &I) -> TaskResult<R> {
        let resource: R = self.client.post(&format!("api/{}", self.path), input).await?;
        Ok(resource)
    }

    async fn get(&self, id: &str) -> TaskResult<R> {
        let resource: R = self
            .client
            .get(&format!("api/{}/{}", self.path, id))
            .await?;
        log::info!("Got {}: {}, state: {}", R::KIND, resource.id(), resource.state());
        Ok(resource)
    }
}

/// Backend talking to the real bank API
pub struct HttpBackend {
    client: BankClient,
    customers: RestProvider<PostCustomer, Customer>,
    identity_verifications: RestProvider<PostIdentityVerification, IdentityVerification>,
    accounts: RestProvider<PostAccount, Account>,
    external_wallets: RestProvider<PostExternalWallet, ExternalWallet>,
    trades: RestProvider<PostTrade, Trade>,
    transfers: RestProvider<PostTransfer, Transfer>,
}

impl HttpBackend {
    pub fn new(client: BankClient) -> Self {
        Self {
            customers: RestProvider::new(client.clone(), "customers"),
            identity_verifications: RestProvider::new(client.clone(), "identity_verifications"),
            accounts: RestProvider::new(client.clone(), "accounts"),
            external_wallets: RestProvider::new(client.clone(), "external_wallets"),
            trades: RestProvider::new(client.clone(), "trades"),
            transfers: RestProvider::new(client.clone(), "transfers"),
            client,
        }
    }
}

#[async_trait]
impl BankBackend for HttpBackend {
    fn customers(&self) -> &Provider<PostCustomer, Customer> {
        &self.customers
    }

    fn identity_verifications(&self) -> &Provider<PostIdentityVerification, IdentityVerification> {
        &self.identity_verifications
    }

    fn accounts(&self) -> &Provider<PostAccount, Account> {
        &self.accounts
    }

    fn external_wallets(&self) -> &Provider<PostExternalWallet, ExternalWallet> {
        &self.external_wallets
    }

    fn trades(&self) -> &Provider<PostTrade, Trade> {
        &self.trades
    }

    fn transfers(&self) -> &Provider<PostTransfer, Transfer> {
        &self.transfers
    }

    async fn create_quote(&self, quote: &PostQuote) -> TaskResult<Quote> {
        let quote: Quote = self.client.post("api/quotes", quote).await?;
        log::info!("Created quote: {}", quote.guid);
        Ok(quote)
    }

    async fn list_accounts(
        &self,
        owner: AccountOwner,
        kind: AccountType,
    ) -> TaskResult<Vec<Account>> {
        log::info!("Listing {} {} accounts...", owner.as_str(), kind.as_str());
        let page: ListPage<Account> = self
            .client
            .get_with_query(
                "api/accounts",
                &[("owner", owner.as_str()), ("type", kind.as_str())],
            )
            .await?;
        log::info!("Listed {} accounts.", page.objects.len());
        Ok(page.objects)
    }
}

/// Connector that exchanges client credentials for a token
pub struct HttpConnector {
    client: Client,
    config: BankConfig,
}

impl HttpConnector {
    pub fn new(config: BankConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(&self) -> TaskResult<Arc<dyn BankBackend>> {
        let token = auth::fetch_token(&self.client, &self.config).await?;
        let client = BankClient::new(self.client.clone(), self.config.api_base.clone(), token);
        Ok(Arc::new(HttpBackend::new(client)))
    }
}
