use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State, rejection::PathRejection},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    database_id::TransactionId,
    transaction::core::delete_transaction,
};

/// The state needed to delete a transaction.
#[derive(Debug, Clone)]
pub struct DeleteTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The response body for a successful delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletedTransaction {
    /// Always "Deleted".
    pub message: String,
    /// The ID of the deleted transaction.
    pub id: TransactionId,
}

/// A route handler for deleting a transaction.
pub async fn delete_transaction_endpoint(
    State(state): State<DeleteTransactionState>,
    path: Result<Path<TransactionId>, PathRejection>,
) -> Result<Json<DeletedTransaction>, Error> {
    let Path(transaction_id) = path.map_err(|rejection| {
        tracing::debug!("rejected delete: {}", rejection.body_text());
        Error::Validation(rejection.body_text())
    })?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    delete_transaction(transaction_id, &connection).inspect_err(|error| match error {
        Error::NotFound => tracing::debug!("tried to delete missing transaction {transaction_id}"),
        error => tracing::error!("Could not delete transaction {transaction_id}: {error}"),
    })?;

    Ok(Json(DeletedTransaction {
        message: "Deleted".to_owned(),
        id: transaction_id,
    }))
}
