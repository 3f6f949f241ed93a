// SPDX-License-Identifier: MIT

//! Customer onboarding and crypto round-trip workflow
//!
//! 1. Authenticate and create a customer
//! 2. Verify the customer's identity (attested KYC)
//! 3. Find the bank's USD fiat account and open one for the customer
//! 4. Fund the customer's USD account with a book transfer and check the balance
//! 5. For each crypto asset, in parallel: open a trading account and an
//!    external wallet, buy the asset, withdraw it to the wallet and wait for
//!    the trading account to drain

use std::sync::Arc;
use uuid::Uuid;

use super::api::{BankBackend, Connector};
use super::config::BankConfig;
use super::models::{
    Account, AccountOwner, AccountState, AccountType, Customer, CustomerState, ExternalWallet,
    ExternalWalletState, IdentityVerification, IdentityVerificationState, PostAccount,
    PostCustomer, PostExternalWallet, PostIdentityVerification, PostQuote, PostTrade,
    PostTransfer, ProductType, Quote, QuoteSide, Trade, TradeState, Transfer, TransferState,
    TransferType,
};
use super::person::Person;
use crate::flow::{
    converge, wait_for, Graph, PollSpec, SharedTask, TaskError, TaskId, TaskResult, Workflow,
};

/// $1000 in cents
pub const DEFAULT_USD_AMOUNT: i64 = 1000 * 100;
/// $250 in cents
pub const DEFAULT_TRADE_AMOUNT: i64 = 250 * 100;

const FIAT_ASSET: &str = "USD";

/// Knobs for one onboarding run
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub poll: PollSpec,
    pub crypto_assets: Vec<String>,
    /// Amount deposited into the customer's USD account, in cents
    pub usd_amount: i64,
    /// Amount of USD spent on each crypto asset, in cents
    pub trade_amount: i64,
}

impl WorkflowSettings {
    pub fn from_config(config: &BankConfig) -> Self {
        Self {
            poll: config.poll,
            crypto_assets: config.crypto_assets.clone(),
            usd_amount: DEFAULT_USD_AMOUNT,
            trade_amount: DEFAULT_TRADE_AMOUNT,
        }
    }
}

/// Result of the crypto round-trip for one asset
#[derive(Debug, Clone, PartialEq)]
pub struct AssetSummary {
    pub asset: String,
    pub account_guid: String,
    pub withdrawal_guid: String,
    pub final_balance: i64,
}

/// Terminal value of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct OnboardingSummary {
    pub customer_guid: String,
    pub identity_verification_guid: String,
    pub usd_account_guid: String,
    pub usd_balance: i64,
    pub assets: Vec<AssetSummary>,
}

/// Authenticated customer, the root of every per-asset branch
#[derive(Clone)]
struct Session {
    api: Arc<dyn BankBackend>,
    customer: Customer,
}

pub struct OnboardingWorkflow {
    connector: Arc<dyn Connector>,
    person: Person,
    settings: WorkflowSettings,
}

impl OnboardingWorkflow {
    pub fn new(connector: Arc<dyn Connector>, person: Person, settings: WorkflowSettings) -> Self {
        Self {
            connector,
            person,
            settings,
        }
    }
}

impl Workflow for OnboardingWorkflow {
    type Output = OnboardingSummary;

    fn build(self, graph: &Graph) -> SharedTask<OnboardingSummary> {
        let steps = Steps {
            graph: graph.clone(),
            person: Arc::new(self.person),
            settings: Arc::new(self.settings),
        };

        let connector = self.connector;
        let api = graph.task("auth", async move { connector.connect().await });

        let customer = graph.chain("customer", &api, {
            let steps = steps.clone();
            move |api| steps.customer(api)
        });

        let identity = graph.join2("identity_verification", &api, &customer, {
            let steps = steps.clone();
            move |(api, customer)| steps.identity_verification(api, customer)
        });

        let bank_usd = graph.join3("bank_usd_account", &api, &customer, &identity, {
            let steps = steps.clone();
            move |(api, _, _)| steps.bank_usd_account(api)
        });

        let customer_usd = graph.join3("customer_usd_account", &api, &customer, &bank_usd, {
            let steps = steps.clone();
            move |(api, customer, _)| steps.customer_usd_account(api, customer)
        });

        let book_quote = graph.join4(
            "book_transfer_quote",
            &api,
            &customer,
            &bank_usd,
            &customer_usd,
            {
                let steps = steps.clone();
                move |(api, customer, _, _)| steps.book_transfer_quote(api, customer)
            },
        );

        let book_transfer = graph.join4(
            "book_transfer",
            &api,
            &book_quote,
            &bank_usd,
            &customer_usd,
            {
                let steps = steps.clone();
                move |(api, quote, source, destination)| {
                    steps.book_transfer(api, quote, source, destination)
                }
            },
        );

        let usd_balance = graph.join3("usd_balance", &api, &customer_usd, &book_transfer, {
            let steps = steps.clone();
            move |(api, account, _)| steps.usd_balance(api, account)
        });

        let session = graph.join3(
            "session",
            &api,
            &customer,
            &usd_balance,
            |(api, customer, _)| async move { Ok(Session { api, customer }) },
        );

        let assets = steps.settings.crypto_assets.clone();
        let accounts = graph.fan_out(
            &session,
            assets.iter().map(|asset| {
                let steps = steps.clone();
                let asset = asset.clone();
                (asset_task(&asset, "trading_account"), move |s: Session| {
                    steps.trading_account(s.api, s.customer, asset)
                })
            }),
        );

        let finals: Vec<SharedTask<AssetSummary>> = assets
            .iter()
            .zip(accounts.iter())
            .map(|(asset, account)| steps.asset_round_trip(graph, &session, account, asset))
            .collect();

        let all_assets =
            graph.join_all("assets", &finals, |summaries| async move { Ok(summaries) });

        graph.join4(
            "summary",
            &customer,
            &identity,
            &usd_balance,
            &all_assets,
            |(customer, identity, usd, assets)| async move {
                Ok(OnboardingSummary {
                    customer_guid: customer.guid,
                    identity_verification_guid: identity.guid,
                    usd_account_guid: usd.guid.clone(),
                    usd_balance: usd.balance(),
                    assets,
                })
            },
        )
    }
}

fn asset_task(asset: &str, step: &str) -> String {
    format!("{}.{}", asset.to_lowercase(), step)
}

/// Per-step logic; each method is the body of one graph node
#[derive(Clone)]
struct Steps {
    graph: Graph,
    person: Arc<Person>,
    settings: Arc<WorkflowSettings>,
}

impl Steps {
    /// Wire the per-asset branch hanging off its trading account
    fn asset_round_trip(
        &self,
        graph: &Graph,
        session: &SharedTask<Session>,
        account: &SharedTask<Account>,
        asset: &str,
    ) -> SharedTask<AssetSummary> {
        let wallet = graph.join2(asset_task(asset, "external_wallet"), session, account, {
            let (steps, asset) = (self.clone(), asset.to_string());
            move |(s, _)| steps.external_wallet(s.api, s.customer, asset)
        });

        let quote = graph.join3(asset_task(asset, "buy_quote"), session, account, &wallet, {
            let (steps, asset) = (self.clone(), asset.to_string());
            move |(s, _, _)| steps.buy_quote(s.api, s.customer, asset)
        });

        let trade = graph.join2(asset_task(asset, "trade"), session, &quote, {
            let (steps, asset) = (self.clone(), asset.to_string());
            move |(s, quote)| steps.trade(s.api, quote, asset)
        });

        let balance = graph.join3(asset_task(asset, "balance"), session, account, &trade, {
            let (steps, asset) = (self.clone(), asset.to_string());
            move |(s, account, trade)| steps.settled_balance(s.api, account, trade, asset)
        });

        let withdrawal_quote = graph.join2(
            asset_task(asset, "withdrawal_quote"),
            session,
            &balance,
            {
                let steps = self.clone();
                move |(s, account)| steps.withdrawal_quote(s.api, s.customer, account)
            },
        );

        let withdrawal = graph.join3(
            asset_task(asset, "withdrawal"),
            session,
            &withdrawal_quote,
            &wallet,
            {
                let (steps, asset) = (self.clone(), asset.to_string());
                move |(s, quote, wallet)| steps.withdrawal(s.api, quote, wallet, asset)
            },
        );

        graph.join3(asset_task(asset, "final_balance"), session, account, &withdrawal, {
            let (steps, asset) = (self.clone(), asset.to_string());
            move |(s, account, withdrawal)| steps.final_balance(s.api, account, withdrawal, asset)
        })
    }

    async fn customer(self, api: Arc<dyn BankBackend>) -> TaskResult<Customer> {
        let person = &self.person;
        let input = PostCustomer {
            customer_type: "individual".to_string(),
            name: person.name.clone(),
            address: person.address.clone(),
            date_of_birth: person.date_of_birth.clone(),
            email_address: person.email_address.clone(),
            phone_number: person.phone_number.clone(),
            identification_numbers: person.identification_numbers.clone(),
        };

        converge(
            &self.graph,
            &TaskId::new("customer"),
            api.customers(),
            &input,
            &self.settings.poll,
            |c: &Customer| c.state == CustomerState::Unverified,
        )
        .await
    }

    async fn identity_verification(
        self,
        api: Arc<dyn BankBackend>,
        customer: Customer,
    ) -> TaskResult<IdentityVerification> {
        let task_id = TaskId::new("identity_verification");
        let person = &self.person;
        let input = PostIdentityVerification {
            verification_type: "kyc".to_string(),
            method: "attested".to_string(),
            customer_guid: customer.guid,
            name: person.name.clone(),
            address: person.address.clone(),
            date_of_birth: person.date_of_birth.clone(),
            identification_numbers: person.identification_numbers.clone(),
        };

        let verification = converge(
            &self.graph,
            &task_id,
            api.identity_verifications(),
            &input,
            &self.settings.poll,
            |v: &IdentityVerification| v.state == IdentityVerificationState::Completed,
        )
        .await?;

        if verification.outcome.as_deref() == Some("failed") {
            return Err(TaskError::validation(
                task_id,
                format!("Identity verification {} failed", verification.guid),
            ));
        }
        Ok(verification)
    }

    async fn bank_usd_account(self, api: Arc<dyn BankBackend>) -> TaskResult<Account> {
        let accounts = api
            .list_accounts(AccountOwner::Bank, AccountType::Fiat)
            .await?;

        accounts
            .into_iter()
            .find(|a| a.asset == FIAT_ASSET)
            .ok_or_else(|| {
                TaskError::validation("bank_usd_account", "Bank has no USD fiat bank account")
            })
    }

    async fn customer_usd_account(
        self,
        api: Arc<dyn BankBackend>,
        customer: Customer,
    ) -> TaskResult<Account> {
        let task_id = TaskId::new("customer_usd_account");
        self.account(api, customer, AccountType::Fiat, FIAT_ASSET, task_id)
            .await
    }

    async fn trading_account(
        self,
        api: Arc<dyn BankBackend>,
        customer: Customer,
        asset: String,
    ) -> TaskResult<Account> {
        let task_id = TaskId::new(asset_task(&asset, "trading_account"));
        self.account(api, customer, AccountType::Trading, &asset, task_id)
            .await
    }

    async fn account(
        &self,
        api: Arc<dyn BankBackend>,
        customer: Customer,
        account_type: AccountType,
        asset: &str,
        task_id: TaskId,
    ) -> TaskResult<Account> {
        let input = PostAccount {
            account_type,
            name: format!("{}, account for customer: {}", asset, customer.guid),
            customer_guid: customer.guid,
            asset: asset.to_string(),
        };

        converge(
            &self.graph,
            &task_id,
            api.accounts(),
            &input,
            &self.settings.poll,
            |a: &Account| a.state == AccountState::Created,
        )
        .await
    }

    async fn book_transfer_quote(
        self,
        api: Arc<dyn BankBackend>,
        customer: Customer,
    ) -> TaskResult<Quote> {
        let quote = PostQuote {
            product_type: ProductType::BookTransfer,
            customer_guid: customer.guid,
            side: QuoteSide::Deposit,
            asset: Some(FIAT_ASSET.to_string()),
            symbol: None,
            receive_amount: Some(self.settings.usd_amount),
            deliver_amount: None,
        };
        api.create_quote(&quote).await
    }

    async fn book_transfer(
        self,
        api: Arc<dyn BankBackend>,
        quote: Quote,
        source: Account,
        destination: Account,
    ) -> TaskResult<Transfer> {
        let input = PostTransfer {
            quote_guid: quote.guid,
            transfer_type: TransferType::Book,
            source_account_guid: Some(source.guid),
            destination_account_guid: Some(destination.guid),
            external_wallet_guid: None,
        };
        self.transfer(api, input, TaskId::new("book_transfer")).await
    }

    async fn transfer(
        &self,
        api: Arc<dyn BankBackend>,
        input: PostTransfer,
        task_id: TaskId,
    ) -> TaskResult<Transfer> {
        let transfer = converge(
            &self.graph,
            &task_id,
            api.transfers(),
            &input,
            &self.settings.poll,
            |t: &Transfer| matches!(t.state, TransferState::Completed | TransferState::Failed),
        )
        .await?;

        if transfer.state == TransferState::Failed {
            return Err(TaskError::validation(
                task_id,
                format!("{} transfer {} failed", input.transfer_type, transfer.guid),
            ));
        }
        Ok(transfer)
    }

    async fn usd_balance(self, api: Arc<dyn BankBackend>, account: Account) -> TaskResult<Account> {
        let account = api.accounts().get(&account.guid).await?;
        let expected = self.settings.usd_amount;

        if account.platform_balance != Some(expected) {
            return Err(TaskError::validation(
                "usd_balance",
                format!(
                    "Expected account balance to be: {} but got: {}",
                    expected,
                    account.balance()
                ),
            ));
        }

        log::info!(
            "Fiat USD account has the expected balance: {}",
            account.balance()
        );
        Ok(account)
    }

    async fn external_wallet(
        self,
        api: Arc<dyn BankBackend>,
        customer: Customer,
        asset: String,
    ) -> TaskResult<ExternalWallet> {
        let input = PostExternalWallet {
            name: format!("External wallet for {}", customer.guid),
            asset: asset.clone(),
            address: Uuid::new_v4().simple().to_string(),
            tag: Uuid::new_v4().simple().to_string(),
            customer_guid: customer.guid,
        };

        converge(
            &self.graph,
            &TaskId::new(asset_task(&asset, "external_wallet")),
            api.external_wallets(),
            &input,
            &self.settings.poll,
            |w: &ExternalWallet| w.state == ExternalWalletState::Completed,
        )
        .await
    }

    async fn buy_quote(
        self,
        api: Arc<dyn BankBackend>,
        customer: Customer,
        asset: String,
    ) -> TaskResult<Quote> {
        let quote = PostQuote {
            product_type: ProductType::Trading,
            customer_guid: customer.guid,
            side: QuoteSide::Buy,
            asset: None,
            symbol: Some(format!("{}-{}", asset, FIAT_ASSET)),
            receive_amount: None,
            deliver_amount: Some(self.settings.trade_amount),
        };
        api.create_quote(&quote).await
    }

    async fn trade(
        self,
        api: Arc<dyn BankBackend>,
        quote: Quote,
        asset: String,
    ) -> TaskResult<Trade> {
        let task_id = TaskId::new(asset_task(&asset, "trade"));
        let input = PostTrade {
            quote_guid: quote.guid,
        };

        let trade = converge(
            &self.graph,
            &task_id,
            api.trades(),
            &input,
            &self.settings.poll,
            |t: &Trade| {
                matches!(
                    t.state,
                    TradeState::Settling | TradeState::Completed | TradeState::Failed
                )
            },
        )
        .await?;

        if trade.state == TradeState::Failed {
            return Err(TaskError::validation(
                task_id,
                format!("Trade {} for {} failed", trade.guid, asset),
            ));
        }
        Ok(trade)
    }

    async fn settled_balance(
        self,
        api: Arc<dyn BankBackend>,
        account: Account,
        trade: Trade,
        asset: String,
    ) -> TaskResult<Account> {
        let task_id = TaskId::new(asset_task(&asset, "balance"));
        let expected = trade.receive_amount.ok_or_else(|| {
            TaskError::validation(
                task_id.clone(),
                format!("Trade {} has no receive amount", trade.guid),
            )
        })?;

        wait_for(
            &task_id,
            api.accounts(),
            &account.guid,
            &self.settings.poll,
            |a: &Account| a.platform_balance == Some(expected),
        )
        .await
    }

    async fn withdrawal_quote(
        self,
        api: Arc<dyn BankBackend>,
        customer: Customer,
        account: Account,
    ) -> TaskResult<Quote> {
        let quote = PostQuote {
            product_type: ProductType::CryptoTransfer,
            customer_guid: customer.guid,
            side: QuoteSide::Withdrawal,
            asset: Some(account.asset.clone()),
            symbol: None,
            receive_amount: None,
            deliver_amount: Some(account.balance()),
        };
        api.create_quote(&quote).await
    }

    async fn withdrawal(
        self,
        api: Arc<dyn BankBackend>,
        quote: Quote,
        wallet: ExternalWallet,
        asset: String,
    ) -> TaskResult<Transfer> {
        let input = PostTransfer {
            quote_guid: quote.guid,
            transfer_type: TransferType::Crypto,
            source_account_guid: None,
            destination_account_guid: None,
            external_wallet_guid: Some(wallet.guid),
        };
        self.transfer(api, input, TaskId::new(asset_task(&asset, "withdrawal")))
            .await
    }

    async fn final_balance(
        self,
        api: Arc<dyn BankBackend>,
        account: Account,
        withdrawal: Transfer,
        asset: String,
    ) -> TaskResult<AssetSummary> {
        let drained = wait_for(
            &TaskId::new(asset_task(&asset, "final_balance")),
            api.accounts(),
            &account.guid,
            &self.settings.poll,
            |a: &Account| a.balance() == 0,
        )
        .await?;

        log::info!(
            "Crypto {} account has the expected balance: {}",
            drained.asset,
            drained.balance()
        );

        let final_balance = drained.balance();
        Ok(AssetSummary {
            asset,
            account_guid: drained.guid,
            withdrawal_guid: withdrawal.guid,
            final_balance,
        })
    }
}
