//! Transaction management for the expense tracker.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and the request bodies for creating and updating transactions
//! - Database functions for storing, querying, and managing transactions
//! - The JSON API route handlers for transactions

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod list_endpoint;

pub use self::core::{
    DEFAULT_CATEGORY, NewTransaction, Transaction, TransactionPatch, TransactionType,
    all_transactions, count_transactions, create_transaction, create_transaction_table,
    delete_transaction, get_transaction, list_transactions, map_transaction_row,
    normalize_category, update_transaction,
};
pub(crate) use self::core::validate_amount;
pub use create_endpoint::create_transaction_endpoint;
pub use delete_endpoint::{DeletedTransaction, delete_transaction_endpoint};
pub use edit_endpoint::edit_transaction_endpoint;
pub use list_endpoint::list_transactions_endpoint;
