// SPDX-License-Identifier: MIT

//! Bank sandbox integration
//!
//! REST client, payload models and the onboarding workflow built on top of
//! the orchestration core in `crate::flow`.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod person;
pub mod workflow;

pub use api::{BankBackend, Connector, HttpBackend, HttpConnector, Provider, RestProvider};
pub use config::BankConfig;
pub use error::BankError;
pub use person::Person;
pub use workflow::{AssetSummary, OnboardingSummary, OnboardingWorkflow, WorkflowSettings};
