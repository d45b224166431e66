//! CSV export of every stored transaction.

use std::{
    borrow::Borrow,
    io::Write,
    sync::{Arc, Mutex},
};

use axum::{
    body::Body,
    extract::{FromRef, State},
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    date_format::{iso_date_timestamp, iso_timestamp},
    transaction::{Transaction, all_transactions},
};

/// The CSV header, in column order.
pub const CSV_COLUMNS: [&str; 8] = [
    "id",
    "type",
    "amount",
    "category",
    "date",
    "note",
    "createdAt",
    "updatedAt",
];

/// The file name suggested to the browser for the export download.
pub const EXPORT_FILE_NAME: &str = "transactions.csv";

/// Write `transactions` as CSV to `writer`, one row per transaction after the header.
///
/// Dates and timestamps are written as ISO-8601 timestamps in UTC, missing
/// timestamps as empty fields. Fields containing commas, quotes or newlines
/// are quoted.
///
/// # Errors
/// Returns [Error::CsvError] if a row cannot be written to `writer`.
pub fn write_csv<'a, W: Write>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
    mut writer: W,
) -> Result<(), Error> {
    for chunk in csv_chunks(transactions) {
        writer
            .write_all(&chunk?)
            .map_err(|error| Error::CsvError(error.to_string()))?;
    }

    writer.flush().map_err(|error| Error::CsvError(error.to_string()))
}

/// The CSV export as encoded lines: the header first, then one line per
/// transaction, each encoded only when it is pulled from the iterator.
pub fn csv_chunks<T: Borrow<Transaction>>(
    transactions: impl IntoIterator<Item = T>,
) -> impl Iterator<Item = Result<Vec<u8>, Error>> {
    std::iter::once(encode_line(CSV_COLUMNS)).chain(
        transactions
            .into_iter()
            .map(|transaction| encode_line(csv_record(transaction.borrow()))),
    )
}

fn encode_line<F: AsRef<[u8]>>(record: [F; 8]) -> Result<Vec<u8>, Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(record)?;

    writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))
}

fn csv_record(transaction: &Transaction) -> [String; 8] {
    [
        transaction.id.to_string(),
        transaction.transaction_type.to_string(),
        transaction.amount.to_string(),
        transaction.category.clone(),
        iso_date_timestamp(transaction.date),
        transaction.note.clone(),
        transaction
            .created_at
            .map(iso_timestamp)
            .unwrap_or_default(),
        transaction
            .updated_at
            .map(iso_timestamp)
            .unwrap_or_default(),
    ]
}

/// The state needed to export transactions.
#[derive(Debug, Clone)]
pub struct ExportState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ExportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that downloads every transaction as a CSV file.
///
/// The body is streamed one row at a time. Filters do not apply to the export.
pub async fn export_transactions_endpoint(
    State(state): State<ExportState>,
) -> Result<Response, Error> {
    let transactions = {
        let connection = state.db_connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })?;

        all_transactions(&connection)?
    };

    tracing::debug!("exporting {} transactions", transactions.len());

    let rows = csv_chunks(transactions)
        .map(|chunk| chunk.inspect_err(|error| tracing::error!("Export failed: {error}")));
    let body = Body::from_stream(futures::stream::iter(rows));

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, HeaderValue::from_static("text/csv")),
            (
                CONTENT_DISPOSITION,
                HeaderValue::from_static("attachment; filename=\"transactions.csv\""),
            ),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, http::StatusCode, routing::get};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use time::macros::{date, datetime};

    use crate::{
        db::initialize,
        transaction::{NewTransaction, Transaction, TransactionType, create_transaction},
    };

    use super::{CSV_COLUMNS, ExportState, csv_chunks, export_transactions_endpoint, write_csv};

    fn export_to_string(transactions: &[Transaction]) -> String {
        let mut buffer = Vec::new();
        write_csv(transactions, &mut buffer).expect("could not write CSV");
        String::from_utf8(buffer).expect("CSV should be valid UTF-8")
    }

    fn test_transaction(note: &str) -> Transaction {
        Transaction {
            id: 7,
            transaction_type: TransactionType::Expense,
            amount: 12.5,
            category: "Food".to_owned(),
            date: date!(2025 - 01 - 15),
            note: note.to_owned(),
            created_at: Some(datetime!(2025-01-15 08:30:00 UTC)),
            updated_at: None,
        }
    }

    #[test]
    fn writes_header_for_empty_export() {
        let csv = export_to_string(&[]);

        assert_eq!(
            csv,
            "id,type,amount,category,date,note,createdAt,updatedAt\n"
        );
    }

    #[test]
    fn writes_iso_dates_and_empty_missing_timestamps() {
        let csv = export_to_string(&[test_transaction("lunch")]);

        let row = csv.lines().nth(1).expect("expected a data row");
        assert_eq!(
            row,
            "7,expense,12.5,Food,2025-01-15T00:00:00.000Z,lunch,2025-01-15T08:30:00.000Z,"
        );
        assert!(!csv.contains("null"));
        assert!(!csv.contains("undefined"));
    }

    #[test]
    fn note_with_delimiters_round_trips() {
        let note = "a,\"b\"\nc";
        let csv = export_to_string(&[test_transaction(note)]);

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let headers = reader.headers().expect("could not read headers").clone();
        let records: Vec<csv::StringRecord> = reader
            .records()
            .collect::<Result<_, _>>()
            .expect("could not parse CSV");

        assert_eq!(headers.iter().collect::<Vec<_>>(), CSV_COLUMNS);
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][5], note);
    }

    #[test]
    fn chunks_are_header_then_one_line_per_transaction() {
        let transactions = vec![test_transaction("lunch"), test_transaction("a,\"b\"\nc")];

        let chunks = csv_chunks(transactions.clone())
            .collect::<Result<Vec<_>, _>>()
            .expect("could not encode CSV");

        assert_eq!(chunks.len(), 3);
        assert_eq!(
            chunks[0],
            b"id,type,amount,category,date,note,createdAt,updatedAt\n"
        );
        assert_eq!(chunks.concat(), export_to_string(&transactions).into_bytes());
    }

    #[tokio::test]
    async fn export_endpoint_returns_csv_attachment() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        create_transaction(
            NewTransaction::build(TransactionType::Income, 1000.0).date(date!(2025 - 01 - 10)),
            date!(2025 - 01 - 10),
            &conn,
        )
        .unwrap();
        create_transaction(
            NewTransaction::build(TransactionType::Expense, 250.0)
                .category("Food")
                .date(date!(2025 - 01 - 15)),
            date!(2025 - 01 - 15),
            &conn,
        )
        .unwrap();
        let state = ExportState {
            db_connection: Arc::new(Mutex::new(conn)),
        };
        let app = Router::new()
            .route("/export", get(export_transactions_endpoint))
            .with_state(state);
        let server = TestServer::new(app).expect("Could not create test server.");

        let response = server.get("/export").await;

        response.assert_status(StatusCode::OK);
        assert_eq!(response.header("content-type"), "text/csv");
        assert_eq!(
            response.header("content-disposition"),
            "attachment; filename=\"transactions.csv\""
        );
        let text = response.text();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 3);
        // Most recent first.
        assert!(rows[1].starts_with("2,expense,250,Food,2025-01-15T00:00:00.000Z"));
        assert!(rows[2].starts_with("1,income,1000,Uncategorized,2025-01-10T00:00:00.000Z"));
    }
}
