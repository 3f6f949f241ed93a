// SPDX-License-Identifier: MIT

//! Person fixture used to onboard the demo customer

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::error::BankError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonName {
    pub first: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle: Option<String>,
    pub last: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street2: Option<String>,
    pub city: String,
    pub subdivision: String,
    pub postal_code: String,
    pub country_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentificationNumber {
    /// e.g. `social_security_number`, `drivers_license`
    #[serde(rename = "type")]
    pub id_type: String,
    pub issuing_country_code: String,
    pub identification_number: String,
}

/// Identity data sent with the customer and its KYC verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: PersonName,
    pub address: Address,
    pub date_of_birth: String,
    pub phone_number: String,
    pub email_address: String,
    #[serde(default)]
    pub identification_numbers: Vec<IdentificationNumber>,
}

impl Person {
    /// Load a person from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, BankError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, BankError> {
        Ok(serde_yaml::from_str(content)?)
    }
}

impl Default for Person {
    fn default() -> Self {
        Self {
            name: PersonName {
                first: "Jane".to_string(),
                middle: None,
                last: "Doe".to_string(),
            },
            address: Address {
                street: "15310 Taylor Walk Suite 995".to_string(),
                street2: None,
                city: "New York".to_string(),
                subdivision: "NY".to_string(),
                postal_code: "12099".to_string(),
                country_code: "US".to_string(),
            },
            date_of_birth: "2001-01-01".to_string(),
            phone_number: "+12406525665".to_string(),
            email_address: "jane.doe@example.org".to_string(),
            identification_numbers: vec![
                IdentificationNumber {
                    id_type: "social_security_number".to_string(),
                    issuing_country_code: "US".to_string(),
                    identification_number: "669-55-0349".to_string(),
                },
                IdentificationNumber {
                    id_type: "drivers_license".to_string(),
                    issuing_country_code: "US".to_string(),
                    identification_number: "D152096714850065".to_string(),
                },
            ],
        }
    }
}
