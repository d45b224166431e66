use rusqlite::Connection;
use time::Date;

use crate::{
    AppState,
    transaction::{NewTransaction, Transaction, create_transaction},
};

#[track_caller]
pub(crate) fn must_create_test_state() -> AppState {
    let connection =
        Connection::open_in_memory().expect("could not create in-memory SQLite database");

    AppState::new(connection, "Etc/UTC").expect("could not create test app state")
}

/// Insert `transactions` in order, using `today` for any without a date.
#[track_caller]
pub(crate) fn must_seed_transactions(
    state: &AppState,
    transactions: Vec<NewTransaction>,
    today: Date,
) -> Vec<Transaction> {
    let connection = state
        .db_connection
        .lock()
        .expect("could not acquire database lock");

    transactions
        .into_iter()
        .map(|transaction| {
            create_transaction(transaction, today, &connection)
                .expect("could not create test transaction")
        })
        .collect()
}
