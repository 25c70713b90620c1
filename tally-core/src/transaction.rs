//! Ledger transaction types, including the bank-sync enrichment block.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A transaction as the ledger server reports it.
///
/// Amount sign convention: negative = credit/income, non-negative =
/// debit/expense. The sign affects display only, never pipeline logic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    #[serde(default)]
    pub payee: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub is_parent: bool,
    #[serde(default)]
    pub metadata: Option<TransactionMetadata>,
}

impl Transaction {
    /// Eligible for the categorization workflow: no category yet and not a
    /// split parent row.
    pub fn is_eligible(&self) -> bool {
        self.category_id.is_none() && !self.is_parent
    }

    pub fn is_income(&self) -> bool {
        self.amount < 0.0
    }

    /// Short label for log lines: payee, or the id when payee is absent.
    pub fn label(&self) -> String {
        match &self.payee {
            Some(p) if !p.trim().is_empty() => p.trim().to_string(),
            _ => format!("transaction {}", self.id),
        }
    }
}

/// Enrichment attached by the ledger's bank sync. Passed through verbatim
/// from the aggregator, so field names stay snake_case and everything is
/// optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TransactionMetadata {
    #[serde(default)]
    pub merchant_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub iso_currency_code: Option<String>,
    /// Provider-assigned category label.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub personal_finance_category: Option<PersonalFinanceCategory>,
    #[serde(default)]
    pub payment_channel: Option<String>,
    #[serde(default)]
    pub transaction_type: Option<String>,
    #[serde(default)]
    pub counterparties: Vec<Counterparty>,
    #[serde(default)]
    pub location: Option<TransactionLocation>,
    #[serde(default)]
    pub pending: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PersonalFinanceCategory {
    #[serde(default)]
    pub primary: Option<String>,
    #[serde(default)]
    pub detailed: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Counterparty {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub confidence_level: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TransactionLocation {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}
