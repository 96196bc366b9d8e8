pub mod repo;
pub mod repo_types;

pub use repo::{Ledger, LedgerStore};
pub use repo_types::{MealRecord, Snapshot};
