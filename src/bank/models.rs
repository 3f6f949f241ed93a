// SPDX-License-Identifier: MIT

//! Request and response payloads of the bank API
//!
//! Only the fields the workflow reads or writes are modelled; unknown fields
//! are ignored and unknown lifecycle states deserialize to `Unknown`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::flow::Resource;

use super::person::{Address, IdentificationNumber, PersonName};

/// Declare a snake_case lifecycle-state enum with an `Unknown` fallback
macro_rules! lifecycle_state {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
            #[serde(other)]
            Unknown,
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                    $name::Unknown => "unknown",
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

lifecycle_state!(
    /// storing → unverified → verified | rejected
    CustomerState {
        Storing => "storing",
        Unverified => "unverified",
        Verified => "verified",
        Rejected => "rejected",
    }
);

lifecycle_state!(
    IdentityVerificationState {
        Storing => "storing",
        Waiting => "waiting",
        Pending => "pending",
        Reviewing => "reviewing",
        Expired => "expired",
        Completed => "completed",
    }
);

lifecycle_state!(
    AccountState {
        Storing => "storing",
        Created => "created",
    }
);

lifecycle_state!(
    ExternalWalletState {
        Storing => "storing",
        Pending => "pending",
        Failed => "failed",
        Completed => "completed",
        Deleting => "deleting",
        Deleted => "deleted",
    }
);

lifecycle_state!(
    TradeState {
        Storing => "storing",
        Pending => "pending",
        Cancelled => "cancelled",
        Completed => "completed",
        Settling => "settling",
        Failed => "failed",
    }
);

lifecycle_state!(
    TransferState {
        Storing => "storing",
        Pending => "pending",
        Completed => "completed",
        Failed => "failed",
    }
);

// --- Customers ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostCustomer {
    #[serde(rename = "type")]
    pub customer_type: String,
    pub name: PersonName,
    pub address: Address,
    pub date_of_birth: String,
    pub email_address: String,
    pub phone_number: String,
    pub identification_numbers: Vec<IdentificationNumber>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub guid: String,
    pub state: CustomerState,
}

impl Resource for Customer {
    const KIND: &'static str = "customer";

    fn id(&self) -> &str {
        &self.guid
    }

    fn state(&self) -> String {
        self.state.to_string()
    }
}

// --- Identity verifications ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostIdentityVerification {
    #[serde(rename = "type")]
    pub verification_type: String,
    pub method: String,
    pub customer_guid: String,
    pub name: PersonName,
    pub address: Address,
    pub date_of_birth: String,
    pub identification_numbers: Vec<IdentificationNumber>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityVerification {
    pub guid: String,
    pub state: IdentityVerificationState,
    /// `passed` or `failed` once completed
    #[serde(default)]
    pub outcome: Option<String>,
}

impl Resource for IdentityVerification {
    const KIND: &'static str = "identity verification";

    fn id(&self) -> &str {
        &self.guid
    }

    fn state(&self) -> String {
        self.state.to_string()
    }
}

// --- Accounts ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Trading,
    Fiat,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Trading => "trading",
            AccountType::Fiat => "fiat",
        }
    }
}

/// Owner filter for account listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountOwner {
    Bank,
}

impl AccountOwner {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountOwner::Bank => "bank",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostAccount {
    #[serde(rename = "type")]
    pub account_type: AccountType,
    pub customer_guid: String,
    pub asset: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub guid: String,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    pub asset: String,
    pub state: AccountState,
    #[serde(default)]
    pub platform_balance: Option<i64>,
    #[serde(default)]
    pub platform_available: Option<i64>,
}

impl Account {
    pub fn balance(&self) -> i64 {
        self.platform_balance.unwrap_or(0)
    }
}

impl Resource for Account {
    const KIND: &'static str = "account";

    fn id(&self) -> &str {
        &self.guid
    }

    fn state(&self) -> String {
        self.state.to_string()
    }
}

/// One page of a list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPage<T> {
    #[serde(default)]
    pub total: Option<u64>,
    pub objects: Vec<T>,
}

// --- External wallets ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostExternalWallet {
    pub name: String,
    pub asset: String,
    pub address: String,
    pub tag: String,
    pub customer_guid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalWallet {
    pub guid: String,
    pub asset: String,
    pub state: ExternalWalletState,
}

impl Resource for ExternalWallet {
    const KIND: &'static str = "external wallet";

    fn id(&self) -> &str {
        &self.guid
    }

    fn state(&self) -> String {
        self.state.to_string()
    }
}

// --- Quotes ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Trading,
    BookTransfer,
    CryptoTransfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSide {
    Buy,
    Sell,
    Deposit,
    Withdrawal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostQuote {
    pub product_type: ProductType,
    pub customer_guid: String,
    pub side: QuoteSide,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receive_amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deliver_amount: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub guid: String,
    pub product_type: ProductType,
    #[serde(default)]
    pub asset: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub receive_amount: Option<i64>,
    #[serde(default)]
    pub deliver_amount: Option<i64>,
}

// --- Trades ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostTrade {
    pub quote_guid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub guid: String,
    pub state: TradeState,
    #[serde(default)]
    pub receive_amount: Option<i64>,
    #[serde(default)]
    pub deliver_amount: Option<i64>,
}

impl Resource for Trade {
    const KIND: &'static str = "trade";

    fn id(&self) -> &str {
        &self.guid
    }

    fn state(&self) -> String {
        self.state.to_string()
    }
}

// --- Transfers ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferType {
    Book,
    Crypto,
}

impl fmt::Display for TransferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferType::Book => f.write_str("book"),
            TransferType::Crypto => f.write_str("crypto"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostTransfer {
    pub quote_guid: String,
    pub transfer_type: TransferType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_account_guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_account_guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_wallet_guid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub guid: String,
    pub transfer_type: TransferType,
    pub state: TransferState,
}

impl Resource for Transfer {
    const KIND: &'static str = "transfer";

    fn id(&self) -> &str {
        &self.guid
    }

    fn state(&self) -> String {
        self.state.to_string()
    }
}
