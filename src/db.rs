//! Database schema setup.

use rusqlite::Connection;

use crate::transaction::create_transaction_table;

/// Create the tables for the domain models if they do not already exist.
///
/// # Errors
/// Returns an error if a table cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    create_transaction_table(connection)?;

    Ok(())
}
