//! Prompt construction for the model backends.
//!
//! Both builders are pure: same input, same text. The system prompt pins the
//! model to the canonical category vocabulary; the transaction prompt lays
//! out one transaction's fields plus whatever the bank-sync enrichment knows
//! about it.

use crate::category::Category;
use crate::suggestion::MAX_SUGGESTIONS;
use crate::transaction::{Counterparty, Transaction};

/// Build the system prompt for a category snapshot.
///
/// Categories are enumerated in the order given, one per line, names
/// verbatim. Callers pass the active snapshot; nothing is filtered here.
pub fn build_system_prompt(categories: &[Category]) -> String {
    let mut out = String::new();
    out.push_str(
        "You help assign budget categories to personal-finance transactions.\n\n\
         Choose from these categories only:\n",
    );
    for category in categories {
        match category.description.as_deref().map(str::trim) {
            Some(desc) if !desc.is_empty() => {
                out.push_str(&format!("- {}: {}\n", category.name, desc));
            }
            _ => out.push_str(&format!("- {}\n", category.name)),
        }
    }
    out.push_str(&format!(
        "\nRespond with a JSON object only, shaped as\n\
         {{\"suggestions\": [{{\"name\": \"...\", \"justification\": \"...\", \"confidence\": 0.0}}]}}\n\
         Rules:\n\
         - exactly {MAX_SUGGESTIONS} entries in the suggestions array\n\
         - sort entries by confidence, highest first\n\
         - confidence is a number between 0 and 1\n\
         - copy each name verbatim from the category list above; never invent, split, or abbreviate category names\n\
         - no text outside the JSON object\n",
    ));
    out
}

/// Render one transaction for the user prompt.
///
/// Fields with no derivable value render as "Unknown"; transaction type and
/// counterparties are omitted entirely when absent, so the prompt never
/// carries an empty trailing label.
pub fn build_transaction_prompt(txn: &Transaction) -> String {
    let meta = txn.metadata.as_ref();
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("Payee: {}", or_unknown(txn.payee.as_deref())));

    let merchant = meta
        .and_then(|m| m.merchant_name.as_deref())
        .or_else(|| meta.and_then(|m| m.name.as_deref()))
        .or(txn.payee.as_deref());
    lines.push(format!("Merchant: {}", or_unknown(merchant)));

    let currency = txn
        .currency
        .as_deref()
        .or_else(|| meta.and_then(|m| m.iso_currency_code.as_deref()))
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let direction = if txn.is_income() { "income" } else { "expense" };
    match currency {
        Some(code) => lines.push(format!("Amount: {:.2} {} ({})", txn.amount.abs(), code, direction)),
        None => lines.push(format!("Amount: {:.2} ({})", txn.amount.abs(), direction)),
    }

    lines.push(format!("Date: {}", txn.date.format("%Y-%m-%d")));
    lines.push(format!("Notes: {}", or_unknown(txn.notes.as_deref())));

    lines.push(format!(
        "Bank category: {}",
        or_unknown(meta.and_then(|m| m.category.as_deref()))
    ));

    let pfc = meta.and_then(|m| m.personal_finance_category.as_ref());
    let pfc_path = match (
        pfc.and_then(|p| p.primary.as_deref()).filter(|s| !s.is_empty()),
        pfc.and_then(|p| p.detailed.as_deref()).filter(|s| !s.is_empty()),
    ) {
        (Some(primary), Some(detailed)) => Some(format!("{primary} > {detailed}")),
        (Some(primary), None) => Some(primary.to_string()),
        (None, Some(detailed)) => Some(detailed.to_string()),
        (None, None) => None,
    };
    lines.push(format!("Detailed category: {}", or_unknown(pfc_path.as_deref())));

    lines.push(format!(
        "Payment channel: {}",
        or_unknown(meta.and_then(|m| m.payment_channel.as_deref()))
    ));

    if let Some(kind) = meta.and_then(|m| m.transaction_type.as_deref()).filter(|s| !s.is_empty()) {
        lines.push(format!("Transaction type: {kind}"));
    }

    if let Some(parties) = meta.map(|m| m.counterparties.as_slice()).filter(|p| !p.is_empty()) {
        let label = if parties.len() == 1 {
            "Counterparty"
        } else {
            "Counterparties"
        };
        let rendered: Vec<String> = parties.iter().map(render_counterparty).collect();
        lines.push(format!("{}: {}", label, rendered.join("; ")));
    }

    let location = meta.and_then(|m| m.location.as_ref());
    let place = match (
        location.and_then(|l| l.city.as_deref()).filter(|s| !s.is_empty()),
        location.and_then(|l| l.region.as_deref()).filter(|s| !s.is_empty()),
    ) {
        (Some(city), Some(region)) => Some(format!("{city}, {region}")),
        (Some(city), None) => Some(city.to_string()),
        (None, Some(region)) => Some(region.to_string()),
        (None, None) => None,
    };
    lines.push(format!("Location: {}", or_unknown(place.as_deref())));

    let pending = match meta.and_then(|m| m.pending) {
        Some(true) => "true",
        Some(false) => "false",
        None => "unknown",
    };
    lines.push(format!("Pending: {pending}"));

    lines.join("\n")
}

fn render_counterparty(party: &Counterparty) -> String {
    let name = party
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("Unknown");
    let mut details: Vec<&str> = Vec::new();
    if let Some(kind) = party.kind.as_deref().filter(|s| !s.is_empty()) {
        details.push(kind);
    }
    if let Some(level) = party.confidence_level.as_deref().filter(|s| !s.is_empty()) {
        details.push(level);
    }
    if details.is_empty() {
        name.to_string()
    } else {
        format!("{} ({})", name, details.join(", "))
    }
}

fn or_unknown(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => "Unknown",
    }
}
