//! Defines the endpoint for partially updating a transaction.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{
        FromRef, Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    database_id::TransactionId,
    transaction::{Transaction, TransactionPatch, core::update_transaction},
};

/// The state needed to edit a transaction.
#[derive(Debug, Clone)]
pub struct EditTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that overwrites the fields given in the body and responds
/// with the updated transaction.
///
/// The transaction type is validated on update just like on create.
pub async fn edit_transaction_endpoint(
    State(state): State<EditTransactionState>,
    path: Result<Path<TransactionId>, PathRejection>,
    payload: Result<Json<TransactionPatch>, JsonRejection>,
) -> Result<Json<Transaction>, Error> {
    let Path(transaction_id) = path.map_err(|rejection| {
        tracing::debug!("rejected update: {}", rejection.body_text());
        Error::Validation(rejection.body_text())
    })?;
    let Json(patch) = payload.map_err(|rejection| {
        tracing::debug!(
            "rejected update for transaction {transaction_id}: {}",
            rejection.body_text()
        );
        Error::Validation(rejection.body_text())
    })?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let transaction = update_transaction(transaction_id, &patch, &connection).inspect_err(
        |error| match error {
            Error::NotFound => {
                tracing::debug!("tried to update missing transaction {transaction_id}")
            }
            error => tracing::error!("Could not update transaction {transaction_id}: {error}"),
        },
    )?;

    Ok(Json(transaction))
}
