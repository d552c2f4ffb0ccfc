//! Shared-expense ledger for groups of members.
//!
//! Members record expenses split between them and payments that settle debts.
//! Balances are never stored: they are recomputed from the ledger on every
//! request ([`balance::compute_balances`]), and [`suggest::suggest`] proposes
//! whom an indebted member could pay.

pub mod auth;
pub mod balance;
pub mod error;
pub mod exchange;
pub mod guard;
pub mod ledger;
pub mod notifications;
pub mod routes;
pub mod schemas;
pub mod settings;
pub mod store;
pub mod suggest;
pub mod validation;

pub use balance::{compute_balances, Balance};
pub use error::{LedgerError, ValidationError};
pub use guard::{is_action_permitted, Action};
pub use ledger::Ledger;
pub use suggest::{suggest, Suggestion};
pub use validation::{validate_expense, validate_settlement, ExpenseDraft, SettlementDraft};
