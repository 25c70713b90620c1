//! tally-core: the suggestion-matching-approval pipeline for AI-assisted
//! transaction categorization. Pure logic only; collaborators with side
//! effects (ledger client, model backends, the review screen) live in
//! tally-cli.

pub mod approval;
pub mod cancel;
pub mod category;
pub mod error;
pub mod events;
pub mod matcher;
pub mod parse;
pub mod prompt;
pub mod suggestion;
pub mod transaction;
pub mod validate;

pub use approval::{AnnotatedSuggestion, ApprovalRequest, Decision, GatePhase};
pub use cancel::CancelToken;
pub use category::{Category, active_snapshot};
pub use error::{Error, Result};
pub use events::{Level, LogEvent, Progress, RunEvent, RunState};
pub use matcher::{CategoryMatch, MatchTier, match_category, match_exact};
pub use parse::parse_suggestions;
pub use prompt::{build_system_prompt, build_transaction_prompt};
pub use suggestion::{ConfidenceBucket, MAX_SUGGESTIONS, Suggestion, normalize_confidence};
pub use transaction::{
    Counterparty, PersonalFinanceCategory, Transaction, TransactionLocation, TransactionMetadata,
};
pub use validate::{Validated, validate_suggestions};
