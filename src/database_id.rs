//! Database ID type definition.

/// Alias for the integer type used for mapping to transaction IDs.
///
/// IDs assigned by the database are positive. The client assigns negative IDs
/// to transactions that were only saved to its local snapshot.
pub type TransactionId = i64;
