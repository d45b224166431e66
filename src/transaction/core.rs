//! Defines the core data models and database queries for transactions.

use std::fmt::Display;

use rusqlite::{
    Connection, Row, params_from_iter,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    database_id::TransactionId,
    date_format,
    query::{MonthFilter, TransactionFilter},
};

/// The category given to transactions created without one.
pub const DEFAULT_CATEGORY: &str = "Uncategorized";

// ============================================================================
// MODELS
// ============================================================================

/// Whether money was earned or spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money that was earned.
    Income,
    /// Money that was spent.
    Expense,
}

impl TransactionType {
    /// The lowercase name used in JSON, CSV and the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(Error::Validation(format!(
                "unknown transaction type \"{other}\", expected \"income\" or \"expense\""
            ))),
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// Whether the transaction is an income or an expense.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The amount of money spent or earned.
    ///
    /// The sign is implied by `transaction_type`, so expenses are normally
    /// positive. Negative amounts are stored as given.
    pub amount: f64,
    /// A free-text label, e.g. "Food" or "Salary".
    pub category: String,
    /// When the transaction happened.
    #[serde(with = "date_format::date")]
    pub date: Date,
    /// Free-text details about the transaction.
    #[serde(default)]
    pub note: String,
    /// When the transaction was inserted into the database.
    #[serde(default, with = "date_format::option_timestamp")]
    pub created_at: Option<OffsetDateTime>,
    /// When the transaction was last written to the database.
    #[serde(default, with = "date_format::option_timestamp")]
    pub updated_at: Option<OffsetDateTime>,
}

/// The fields a client provides to create a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    /// Whether the transaction is an income or an expense.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The amount of money spent or earned.
    pub amount: f64,
    /// Defaults to [DEFAULT_CATEGORY] when absent or blank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Defaults to the current date when absent.
    #[serde(
        default,
        with = "date_format::option_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<Date>,
    /// Defaults to an empty string when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl NewTransaction {
    /// Create a new transaction.
    ///
    /// Shortcut for building [NewTransaction] with only the required fields.
    pub fn build(transaction_type: TransactionType, amount: f64) -> Self {
        Self {
            transaction_type,
            amount,
            category: None,
            date: None,
            note: None,
        }
    }

    /// Set the category for the transaction.
    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.to_owned());
        self
    }

    /// Set the date for the transaction.
    pub fn date(mut self, date: Date) -> Self {
        self.date = Some(date);
        self
    }

    /// Set the note for the transaction.
    pub fn note(mut self, note: &str) -> Self {
        self.note = Some(note.to_owned());
        self
    }

    /// Fill in the defaults for the optional fields and assign `id`.
    ///
    /// `today` is used when no date was given. The timestamps are left unset.
    pub(crate) fn finalize(self, id: TransactionId, today: Date) -> Transaction {
        Transaction {
            id,
            transaction_type: self.transaction_type,
            amount: self.amount,
            category: normalize_category(self.category),
            date: self.date.unwrap_or(today),
            note: self.note.unwrap_or_default(),
            created_at: None,
            updated_at: None,
        }
    }
}

/// A partial update to a transaction, fields set to `None` are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionPatch {
    /// The new transaction type.
    #[serde(
        rename = "type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub transaction_type: Option<TransactionType>,
    /// The new amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// The new category, a blank category resets it to [DEFAULT_CATEGORY].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// The new date.
    #[serde(
        default,
        with = "date_format::option_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<Date>,
    /// The new note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TransactionPatch {
    /// Apply the patch to `transaction` in place.
    pub fn apply_to(&self, transaction: &mut Transaction) {
        if let Some(transaction_type) = self.transaction_type {
            transaction.transaction_type = transaction_type;
        }
        if let Some(amount) = self.amount {
            transaction.amount = amount;
        }
        if let Some(category) = &self.category {
            transaction.category = normalize_category(Some(category.clone()));
        }
        if let Some(date) = self.date {
            transaction.date = date;
        }
        if let Some(note) = &self.note {
            transaction.note = note.clone();
        }
    }
}

/// Replace a missing or blank category with [DEFAULT_CATEGORY].
pub fn normalize_category(category: Option<String>) -> String {
    match category {
        Some(category) if !category.trim().is_empty() => category,
        _ => DEFAULT_CATEGORY.to_owned(),
    }
}

/// Reject amounts that are NaN or infinite.
pub(crate) fn validate_amount(amount: f64) -> Result<(), Error> {
    if amount.is_finite() {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "amount must be a finite number, got {amount}"
        )))
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const TRANSACTION_COLUMNS: &str = "id, type, amount, category, date, note, created_at, updated_at";

/// Create a new transaction in the database.
///
/// `today` is used as the date when `new_transaction` does not specify one.
/// Both timestamps are set to the current time.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the amount is not a finite number,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    new_transaction: NewTransaction,
    today: Date,
    connection: &Connection,
) -> Result<Transaction, Error> {
    validate_amount(new_transaction.amount)?;

    let transaction = new_transaction.finalize(0, today);
    let now = OffsetDateTime::now_utc();

    let transaction = connection
        .prepare(&format!(
            "INSERT INTO \"transaction\" (type, amount, category, date, note, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                transaction.transaction_type,
                transaction.amount,
                transaction.category,
                transaction.date,
                transaction.note,
                now,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = :id"
        ))?
        .query_one(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Overwrite the fields set in `patch` on the transaction `id`.
///
/// Fields not set in `patch` keep their stored value. `updated_at` is set to
/// the current time, `created_at` is never changed.
///
/// # Errors
/// This function will return a:
/// - [Error::Validation] if the new amount is not a finite number,
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn update_transaction(
    id: TransactionId,
    patch: &TransactionPatch,
    connection: &Connection,
) -> Result<Transaction, Error> {
    if let Some(amount) = patch.amount {
        validate_amount(amount)?;
    }

    let category = patch
        .category
        .clone()
        .map(|category| normalize_category(Some(category)));

    let transaction = connection
        .prepare(&format!(
            "UPDATE \"transaction\"
            SET \
                type = COALESCE(?1, type), \
                amount = COALESCE(?2, amount), \
                category = COALESCE(?3, category), \
                date = COALESCE(?4, date), \
                note = COALESCE(?5, note), \
                updated_at = ?6 \
            WHERE id = ?7
            RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                patch.transaction_type,
                patch.amount,
                category,
                patch.date,
                patch.note.as_deref(),
                OffsetDateTime::now_utc(),
                id,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

type RowsAffected = usize;

/// Delete the transaction `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<(), Error> {
    let rows_affected: RowsAffected = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = :id",
        &[(":id", &id)],
    )?;

    match rows_affected {
        0 => Err(Error::NotFound),
        _ => Ok(()),
    }
}

/// Get the transactions that match `filter`, most recent first.
///
/// Transactions on the same date are ordered by ID, i.e. in the order they
/// were created.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails or a row cannot be mapped.
pub fn list_transactions(
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let mut conditions = Vec::new();
    let mut params = Vec::new();

    match (filter.month, filter.month.date_range()) {
        (MonthFilter::All, _) => {}
        (_, Some(range)) => {
            conditions.push(format!("date >= ?{}", params.len() + 1));
            params.push(range.start.to_string());
            conditions.push(format!("date < ?{}", params.len() + 1));
            params.push(range.end.to_string());
        }
        // A month with no representable end date matches nothing, same as in memory.
        (_, None) => return Ok(Vec::new()),
    }

    if let Some(category) = filter.category.name() {
        conditions.push(format!("category = ?{}", params.len() + 1));
        params.push(category.to_owned());
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let query = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" {where_clause} \
        ORDER BY date DESC, id ASC"
    );

    connection
        .prepare(&query)?
        .query_map(params_from_iter(params), map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::from))
        .collect()
}

/// Get every transaction, most recent first.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails or a row cannot be mapped.
pub fn all_transactions(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    list_transactions(&TransactionFilter::default(), connection)
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                type TEXT NOT NULL CHECK (type IN ('income', 'expense')),
                amount REAL NOT NULL,
                category TEXT NOT NULL,
                date TEXT NOT NULL,
                note TEXT NOT NULL DEFAULT '',
                created_at TEXT,
                updated_at TEXT
                )",
        (),
    )?;

    // Index used by the month filter and the default ordering.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_date_category ON \"transaction\"(date, category);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
///
/// Expects the columns in the order of [TRANSACTION_COLUMNS].
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        transaction_type: row.get(1)?,
        amount: row.get(2)?,
        category: row.get(3)?,
        date: row.get(4)?,
        note: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        db::initialize,
        query::{CategoryFilter, MonthFilter, TransactionFilter, filter_transactions},
        transaction::{
            DEFAULT_CATEGORY, NewTransaction, TransactionPatch, TransactionType,
            count_transactions, create_transaction, delete_transaction, get_transaction,
            list_transactions, update_transaction,
        },
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    const TODAY: time::Date = date!(2025 - 10 - 05);

    #[test]
    fn create_succeeds() {
        let conn = get_test_connection();

        let transaction = create_transaction(
            NewTransaction::build(TransactionType::Expense, 12.3).category("Food"),
            TODAY,
            &conn,
        )
        .expect("Could not create transaction");

        assert_eq!(transaction.id, 1);
        assert_eq!(transaction.amount, 12.3);
        assert_eq!(transaction.category, "Food");
        assert_eq!(transaction.date, TODAY);
        assert!(transaction.created_at.is_some());
        assert_eq!(transaction.created_at, transaction.updated_at);
    }

    #[test]
    fn create_fills_defaults() {
        let conn = get_test_connection();

        let transaction =
            create_transaction(NewTransaction::build(TransactionType::Income, 5.0), TODAY, &conn)
                .expect("Could not create transaction");

        assert_eq!(transaction.category, DEFAULT_CATEGORY);
        assert_eq!(transaction.note, "");
        assert_eq!(transaction.date, TODAY);
    }

    #[test]
    fn create_accepts_negative_amount() {
        let conn = get_test_connection();

        let transaction =
            create_transaction(NewTransaction::build(TransactionType::Expense, -4.0), TODAY, &conn)
                .expect("Could not create transaction");

        assert_eq!(transaction.amount, -4.0);
    }

    #[test]
    fn create_rejects_non_finite_amount() {
        let conn = get_test_connection();

        let result = create_transaction(
            NewTransaction::build(TransactionType::Expense, f64::NAN),
            TODAY,
            &conn,
        );

        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(count_transactions(&conn), Ok(0));
    }

    #[test]
    fn get_round_trips_created_transaction() {
        let conn = get_test_connection();
        let created = create_transaction(
            NewTransaction::build(TransactionType::Expense, 3.5)
                .category("Coffee")
                .date(date!(2025 - 02 - 01))
                .note("flat white"),
            TODAY,
            &conn,
        )
        .unwrap();

        let got = get_transaction(created.id, &conn).expect("Could not get transaction");

        assert_eq!(got, created);
    }

    #[test]
    fn get_missing_transaction_is_not_found() {
        let conn = get_test_connection();

        assert_eq!(get_transaction(42, &conn), Err(Error::NotFound));
    }

    #[test]
    fn partial_update_only_changes_amount_and_updated_at() {
        let conn = get_test_connection();
        let created = create_transaction(
            NewTransaction::build(TransactionType::Expense, 10.0)
                .category("Food")
                .date(date!(2025 - 01 - 15))
                .note("lunch"),
            TODAY,
            &conn,
        )
        .unwrap();

        let updated = update_transaction(
            created.id,
            &TransactionPatch {
                amount: Some(12.0),
                ..Default::default()
            },
            &conn,
        )
        .expect("Could not update transaction");

        assert_eq!(updated.amount, 12.0);
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.transaction_type, created.transaction_type);
        assert_eq!(updated.category, created.category);
        assert_eq!(updated.date, created.date);
        assert_eq!(updated.note, created.note);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(get_transaction(created.id, &conn), Ok(updated));
    }

    #[test]
    fn update_can_change_type() {
        let conn = get_test_connection();
        let created =
            create_transaction(NewTransaction::build(TransactionType::Expense, 1.0), TODAY, &conn)
                .unwrap();

        let updated = update_transaction(
            created.id,
            &TransactionPatch {
                transaction_type: Some(TransactionType::Income),
                ..Default::default()
            },
            &conn,
        )
        .unwrap();

        assert_eq!(updated.transaction_type, TransactionType::Income);
    }

    #[test]
    fn update_blank_category_resets_to_default() {
        let conn = get_test_connection();
        let created = create_transaction(
            NewTransaction::build(TransactionType::Expense, 1.0).category("Food"),
            TODAY,
            &conn,
        )
        .unwrap();

        let updated = update_transaction(
            created.id,
            &TransactionPatch {
                category: Some(String::new()),
                ..Default::default()
            },
            &conn,
        )
        .unwrap();

        assert_eq!(updated.category, DEFAULT_CATEGORY);
    }

    #[test]
    fn update_missing_transaction_is_not_found() {
        let conn = get_test_connection();

        let result = update_transaction(
            7,
            &TransactionPatch {
                amount: Some(1.0),
                ..Default::default()
            },
            &conn,
        );

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn deletes_transaction() {
        let conn = get_test_connection();
        let created =
            create_transaction(NewTransaction::build(TransactionType::Income, 1.0), TODAY, &conn)
                .unwrap();

        delete_transaction(created.id, &conn).expect("Could not delete transaction");

        assert_eq!(get_transaction(created.id, &conn), Err(Error::NotFound));
    }

    #[test]
    fn delete_missing_transaction_does_not_mutate_store() {
        let conn = get_test_connection();
        create_transaction(NewTransaction::build(TransactionType::Income, 1.0), TODAY, &conn)
            .unwrap();

        let result = delete_transaction(999, &conn);

        assert_eq!(result, Err(Error::NotFound));
        assert_eq!(count_transactions(&conn), Ok(1));
    }

    #[test]
    fn list_all_returns_every_transaction_most_recent_first() {
        let conn = get_test_connection();
        for (day, amount) in [(3, 1.0), (1, 2.0), (2, 3.0), (3, 4.0)] {
            create_transaction(
                NewTransaction::build(TransactionType::Expense, amount)
                    .date(time::Date::from_calendar_date(2025, time::Month::March, day).unwrap()),
                TODAY,
                &conn,
            )
            .unwrap();
        }

        let got = list_transactions(&TransactionFilter::default(), &conn).unwrap();

        let amounts: Vec<f64> = got.iter().map(|transaction| transaction.amount).collect();
        // Ties on date keep creation order.
        assert_eq!(amounts, vec![1.0, 4.0, 3.0, 2.0]);
    }

    #[test]
    fn list_by_month_handles_december_rollover() {
        let conn = get_test_connection();
        for date in [
            date!(2024 - 11 - 30),
            date!(2024 - 12 - 01),
            date!(2024 - 12 - 31),
            date!(2025 - 01 - 01),
        ] {
            create_transaction(
                NewTransaction::build(TransactionType::Expense, 1.0).date(date),
                TODAY,
                &conn,
            )
            .unwrap();
        }
        let filter = TransactionFilter {
            month: MonthFilter::Month {
                year: 2024,
                month: time::Month::December,
            },
            category: CategoryFilter::All,
        };

        let got = list_transactions(&filter, &conn).unwrap();

        let dates: Vec<_> = got.iter().map(|transaction| transaction.date).collect();
        assert_eq!(dates, vec![date!(2024 - 12 - 31), date!(2024 - 12 - 01)]);
    }

    #[test]
    fn list_matches_in_memory_filter() {
        let conn = get_test_connection();
        let seed = [
            (TransactionType::Income, "Salary", date!(2025 - 01 - 10)),
            (TransactionType::Expense, "Food", date!(2025 - 01 - 15)),
            (TransactionType::Expense, "Food", date!(2025 - 02 - 01)),
            (TransactionType::Expense, "Rent", date!(2025 - 01 - 01)),
            (TransactionType::Expense, "Food", date!(2025 - 01 - 31)),
        ];
        for (transaction_type, category, date) in seed {
            create_transaction(
                NewTransaction::build(transaction_type, 10.0)
                    .category(category)
                    .date(date),
                TODAY,
                &conn,
            )
            .unwrap();
        }
        let all = list_transactions(&TransactionFilter::default(), &conn).unwrap();

        for (month, category) in [
            ("all", "all"),
            ("2025-01", "all"),
            ("all", "Food"),
            ("2025-01", "Food"),
            ("2025-03", "Food"),
        ] {
            let filter = TransactionFilter::parse(Some(month), Some(category)).unwrap();

            let from_database = list_transactions(&filter, &conn).unwrap();

            assert_eq!(
                from_database,
                filter_transactions(&all, &filter),
                "database and in-memory filters disagree for month={month} category={category}"
            );
        }
    }

    #[test]
    fn month_without_range_returns_nothing() {
        let conn = get_test_connection();
        create_transaction(
            NewTransaction::build(TransactionType::Expense, 10.0).date(date!(2025 - 01 - 10)),
            TODAY,
            &conn,
        )
        .unwrap();
        let filter = TransactionFilter {
            month: MonthFilter::Month {
                year: 9999,
                month: time::Month::December,
            },
            category: CategoryFilter::All,
        };

        let from_database = list_transactions(&filter, &conn).unwrap();
        let all = list_transactions(&TransactionFilter::default(), &conn).unwrap();

        assert!(from_database.is_empty());
        assert_eq!(from_database, filter_transactions(&all, &filter));
    }
}
