//! The client's view of the transactions and how it falls back to the local snapshot.

use time::OffsetDateTime;

use crate::{
    Error,
    client::{api::ApiClient, snapshot::LocalSnapshot},
    database_id::TransactionId,
    query::{DashboardView, TransactionFilter, dashboard_view},
    timezone::get_local_offset,
    transaction::{NewTransaction, Transaction, TransactionPatch, validate_amount},
};

const DEFAULT_TIMEZONE: &str = "Etc/UTC";

/// Whether the client is in sync with the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// The mirror holds what the server last returned.
    Remote,
    /// The server could not be reached, the mirror holds the local snapshot.
    ///
    /// Records added in this mode only exist locally and are never sent to
    /// the server.
    LocalOnly,
}

/// The result of adding a transaction.
#[derive(Debug, PartialEq)]
pub enum AddOutcome {
    /// The server stored the transaction.
    Saved(Transaction),
    /// The server request failed and the transaction was saved to the snapshot instead.
    SavedLocally {
        /// The transaction with a local, negative ID.
        transaction: Transaction,
        /// Why the server request failed.
        reason: Error,
    },
}

/// The client state: an in-memory mirror of the transactions, the active
/// filter and the connection mode.
#[derive(Debug)]
pub struct ClientState {
    api: ApiClient,
    snapshot: LocalSnapshot,
    transactions: Vec<Transaction>,
    filter: TransactionFilter,
    mode: ConnectionMode,
    local_timezone: String,
}

impl ClientState {
    /// Create an empty state, call [ClientState::refresh] to load the transactions.
    pub fn new(api: ApiClient, snapshot: LocalSnapshot) -> Self {
        Self {
            api,
            snapshot,
            transactions: Vec::new(),
            filter: TransactionFilter::default(),
            mode: ConnectionMode::Remote,
            local_timezone: DEFAULT_TIMEZONE.to_owned(),
        }
    }

    /// Use `canonical_timezone`, e.g. "Pacific/Auckland", for the dates of
    /// transactions saved locally. Defaults to UTC.
    ///
    /// # Errors
    /// Returns [Error::InvalidTimezone] if `canonical_timezone` is not a known timezone.
    pub fn with_timezone(mut self, canonical_timezone: &str) -> Result<Self, Error> {
        if get_local_offset(canonical_timezone).is_none() {
            return Err(Error::InvalidTimezone(canonical_timezone.to_owned()));
        }

        self.local_timezone = canonical_timezone.to_owned();

        Ok(self)
    }

    /// Whether the mirror came from the server or the local snapshot.
    pub fn mode(&self) -> ConnectionMode {
        self.mode
    }

    /// Every transaction in the mirror.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// The filter used by [ClientState::view].
    pub fn filter(&self) -> &TransactionFilter {
        &self.filter
    }

    /// Replace the filter used by [ClientState::view].
    pub fn set_filter(&mut self, filter: TransactionFilter) {
        self.filter = filter;
    }

    /// Load every transaction from the server and save them to the snapshot.
    ///
    /// If the server cannot be reached or responds with an error, the
    /// snapshot is loaded instead and the client switches to
    /// [ConnectionMode::LocalOnly].
    ///
    /// # Errors
    /// Returns [Error::Snapshot] if the server failed and the snapshot could not be read.
    pub async fn refresh(&mut self) -> Result<ConnectionMode, Error> {
        match self.api.list_transactions().await {
            Ok(transactions) => {
                self.transactions = transactions;
                self.mode = ConnectionMode::Remote;

                if let Err(error) = self.snapshot.save(&self.transactions) {
                    tracing::warn!("could not update the local snapshot: {error}");
                }
            }
            Err(error) => {
                tracing::warn!("could not fetch transactions, using the local snapshot: {error}");
                self.mode = ConnectionMode::LocalOnly;
                self.transactions.clear();
                self.transactions = self.snapshot.load()?;
            }
        }

        Ok(self.mode)
    }

    /// Create a transaction on the server and add it to the front of the mirror.
    ///
    /// If the server cannot be reached or fails with a server error, the
    /// transaction is given a local ID and timestamps, appended to the mirror
    /// and saved to the snapshot. The client then switches to
    /// [ConnectionMode::LocalOnly].
    ///
    /// # Errors
    /// Returns [Error::Validation] for a non-finite amount and the server's
    /// error if it rejected the transaction, in both cases nothing is saved.
    /// Returns [Error::Snapshot] if the transaction could not be saved locally.
    pub async fn add(&mut self, new_transaction: NewTransaction) -> Result<AddOutcome, Error> {
        validate_amount(new_transaction.amount)?;

        match self.api.create_transaction(&new_transaction).await {
            Ok(transaction) => {
                self.transactions.insert(0, transaction.clone());
                Ok(AddOutcome::Saved(transaction))
            }
            Err(reason) if should_save_locally(&reason) => {
                tracing::warn!("could not create transaction on the server: {reason}");

                let now = self.local_now();
                let mut transaction =
                    new_transaction.finalize(next_local_id(&self.transactions), now.date());
                transaction.created_at = Some(now);
                transaction.updated_at = Some(now);

                self.transactions.push(transaction.clone());
                self.mode = ConnectionMode::LocalOnly;
                self.snapshot.save(&self.transactions)?;

                Ok(AddOutcome::SavedLocally {
                    transaction,
                    reason,
                })
            }
            Err(error) => Err(error),
        }
    }

    /// Update a transaction on the server and replace it in the mirror.
    ///
    /// # Errors
    /// Returns the server or connection error, the mirror is left unchanged.
    pub async fn update(
        &mut self,
        id: TransactionId,
        patch: &TransactionPatch,
    ) -> Result<Transaction, Error> {
        let updated = self.api.update_transaction(id, patch).await?;

        match self.transactions.iter_mut().find(|t| t.id == updated.id) {
            Some(transaction) => *transaction = updated.clone(),
            None => self.transactions.insert(0, updated.clone()),
        }

        Ok(updated)
    }

    /// Delete a transaction on the server and remove it from the mirror.
    ///
    /// # Errors
    /// Returns the server or connection error, the mirror is left unchanged.
    pub async fn delete(&mut self, id: TransactionId) -> Result<(), Error> {
        let deleted = self.api.delete_transaction(id).await?;

        self.transactions.retain(|t| t.id != deleted.id);

        Ok(())
    }

    /// Download every transaction from the server as CSV text.
    pub async fn export(&self) -> Result<String, Error> {
        self.api.export_csv().await
    }

    /// The dashboard for the mirror and the current filter.
    pub fn view(&self) -> DashboardView {
        dashboard_view(&self.transactions, &self.filter)
    }

    fn local_now(&self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();

        match get_local_offset(&self.local_timezone) {
            Some(offset) => now.to_offset(offset),
            None => now,
        }
    }
}

/// Local IDs count down from -1 so they never clash with server IDs.
fn next_local_id(transactions: &[Transaction]) -> TransactionId {
    transactions
        .iter()
        .map(|transaction| transaction.id)
        .min()
        .unwrap_or(0)
        .min(0)
        - 1
}

/// A request the server rejected stays rejected, only outages are saved locally.
fn should_save_locally(error: &Error) -> bool {
    match error {
        Error::StoreUnavailable(_) => true,
        Error::Remote { status, .. } => *status >= 500,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::{Router, routing::post};
    use time::macros::date;
    use tokio::net::TcpListener;

    use crate::{
        Error, build_router,
        client::{api::ApiClient, snapshot::LocalSnapshot},
        endpoints,
        query::{Summary, TransactionFilter},
        test_utils::must_create_test_state,
        timezone::{current_local_date, get_local_offset},
        transaction::{NewTransaction, Transaction, TransactionPatch, TransactionType},
    };

    use super::{AddOutcome, ClientState, ConnectionMode, next_local_id};

    async fn spawn_server() -> String {
        serve(build_router(must_create_test_state())).await
    }

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        format!("http://{address}")
    }

    /// An address with nothing listening on it.
    async fn unreachable_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address: SocketAddr = listener.local_addr().unwrap();
        drop(listener);

        format!("http://{address}")
    }

    fn client(base_url: &str, dir: &tempfile::TempDir) -> ClientState {
        ClientState::new(
            ApiClient::new(base_url),
            LocalSnapshot::new(dir.path().join("transactions.json")),
        )
    }

    fn test_transaction(id: i64) -> Transaction {
        Transaction {
            id,
            transaction_type: TransactionType::Expense,
            amount: 10.0,
            category: "Food".to_owned(),
            date: date!(2025 - 01 - 15),
            note: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn add_and_refresh_against_server() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = client(&spawn_server().await, &dir);

        let outcome = state
            .add(
                NewTransaction::build(TransactionType::Income, 1000.0).date(date!(2025 - 01 - 10)),
            )
            .await
            .unwrap();
        let AddOutcome::Saved(created) = outcome else {
            panic!("expected the server to store the transaction, got {outcome:?}");
        };
        state
            .add(
                NewTransaction::build(TransactionType::Expense, 250.0)
                    .category("Food")
                    .date(date!(2025 - 01 - 15)),
            )
            .await
            .unwrap();

        assert_eq!(state.refresh().await, Ok(ConnectionMode::Remote));
        assert_eq!(state.transactions().len(), 2);
        assert_eq!(state.transactions()[1], created);

        // The refreshed list was saved for offline use.
        let saved = LocalSnapshot::new(dir.path().join("transactions.json"))
            .load()
            .unwrap();
        assert_eq!(saved, state.transactions());

        let view = state.view();
        assert_eq!(
            view.overall,
            Summary {
                income: 1000.0,
                expense: 250.0,
                balance: 750.0
            }
        );
    }

    #[tokio::test]
    async fn refresh_falls_back_to_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = LocalSnapshot::new(dir.path().join("transactions.json"));
        snapshot.save(&[test_transaction(3)]).unwrap();
        let mut state = client(&unreachable_server().await, &dir);

        assert_eq!(state.refresh().await, Ok(ConnectionMode::LocalOnly));
        assert_eq!(state.transactions(), [test_transaction(3)]);
    }

    #[tokio::test]
    async fn refresh_without_snapshot_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = client(&unreachable_server().await, &dir);

        assert_eq!(state.refresh().await, Ok(ConnectionMode::LocalOnly));
        assert!(state.transactions().is_empty());
    }

    #[tokio::test]
    async fn add_saves_locally_when_server_is_down() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = client(&unreachable_server().await, &dir);

        let outcome = state
            .add(NewTransaction::build(TransactionType::Expense, 4.5).category("Coffee"))
            .await
            .unwrap();

        let AddOutcome::SavedLocally {
            transaction,
            reason,
        } = outcome
        else {
            panic!("expected a local save, got {outcome:?}");
        };
        assert!(matches!(reason, Error::StoreUnavailable(_)));
        assert_eq!(transaction.id, -1);
        assert_eq!(transaction.category, "Coffee");
        assert!(transaction.created_at.is_some());
        assert_eq!(state.mode(), ConnectionMode::LocalOnly);

        let saved = LocalSnapshot::new(dir.path().join("transactions.json"))
            .load()
            .unwrap();
        assert_eq!(saved, vec![transaction]);
    }

    #[tokio::test]
    async fn add_rejects_non_finite_amount_without_saving() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot_path = dir.path().join("transactions.json");
        let mut state = client(&unreachable_server().await, &dir);

        for amount in [f64::NAN, f64::INFINITY] {
            let result = state
                .add(NewTransaction::build(TransactionType::Expense, amount))
                .await;

            assert!(
                matches!(result, Err(Error::Validation(_))),
                "want a validation error for {amount}, got {result:?}"
            );
        }

        assert!(state.transactions().is_empty());
        assert_eq!(state.mode(), ConnectionMode::Remote);
        assert!(!snapshot_path.exists());
        assert_eq!(state.refresh().await, Ok(ConnectionMode::LocalOnly));
        assert!(state.transactions().is_empty());
    }

    #[tokio::test]
    async fn add_does_not_save_locally_when_server_rejects_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let router = Router::new().route(
            endpoints::TRANSACTIONS_API,
            post(|| async { Error::Validation("category is too long".to_owned()) }),
        );
        let mut state = client(&serve(router).await, &dir);

        let result = state
            .add(NewTransaction::build(TransactionType::Expense, 4.5))
            .await;

        assert!(
            matches!(result, Err(Error::Remote { status: 400, .. })),
            "got {result:?}"
        );
        assert!(state.transactions().is_empty());
        assert_eq!(state.mode(), ConnectionMode::Remote);
        assert!(!dir.path().join("transactions.json").exists());
    }

    #[tokio::test]
    async fn add_dates_local_transactions_in_configured_timezone() {
        let dir = tempfile::tempdir().unwrap();
        let timezone = "Pacific/Kiritimati";
        let mut state = client(&unreachable_server().await, &dir)
            .with_timezone(timezone)
            .unwrap();

        let before = current_local_date(timezone).unwrap();
        let outcome = state
            .add(NewTransaction::build(TransactionType::Expense, 4.5))
            .await
            .unwrap();
        let after = current_local_date(timezone).unwrap();

        let AddOutcome::SavedLocally { transaction, .. } = outcome else {
            panic!("expected a local save, got {outcome:?}");
        };
        assert!(
            transaction.date == before || transaction.date == after,
            "want {before} or {after}, got {}",
            transaction.date
        );
        let created_at = transaction.created_at.unwrap();
        assert_eq!(Some(created_at.offset()), get_local_offset(timezone));
        assert_eq!(created_at.date(), transaction.date);
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = ClientState::new(
            ApiClient::new("http://localhost:5000"),
            LocalSnapshot::new(dir.path().join("transactions.json")),
        )
        .with_timezone("Not/AZone");

        assert!(matches!(result, Err(Error::InvalidTimezone(zone)) if zone == "Not/AZone"));
    }

    #[tokio::test]
    async fn update_and_delete_surface_errors_without_changing_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = client(&spawn_server().await, &dir);
        state
            .add(NewTransaction::build(TransactionType::Expense, 1.0))
            .await
            .unwrap();
        let before = state.transactions().to_vec();

        let update = state
            .update(
                404,
                &TransactionPatch {
                    amount: Some(2.0),
                    ..Default::default()
                },
            )
            .await;
        let delete = state.delete(404).await;

        assert!(matches!(update, Err(Error::Remote { status: 404, .. })));
        assert!(matches!(delete, Err(Error::Remote { status: 404, .. })));
        assert_eq!(state.transactions(), before);
    }

    #[tokio::test]
    async fn update_and_delete_apply_to_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = client(&spawn_server().await, &dir);
        let AddOutcome::Saved(created) = state
            .add(NewTransaction::build(TransactionType::Expense, 1.0).category("Food"))
            .await
            .unwrap()
        else {
            panic!("expected the server to store the transaction");
        };

        let updated = state
            .update(
                created.id,
                &TransactionPatch {
                    amount: Some(2.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.amount, 2.0);
        assert_eq!(updated.category, "Food");
        assert_eq!(state.transactions(), [updated]);

        state.delete(created.id).await.unwrap();
        assert!(state.transactions().is_empty());
    }

    #[tokio::test]
    async fn export_downloads_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = client(&spawn_server().await, &dir);
        state
            .add(NewTransaction::build(TransactionType::Expense, 1.0))
            .await
            .unwrap();

        let csv = state.export().await.unwrap();

        assert!(csv.starts_with("id,type,amount,category,date,note,createdAt,updatedAt"));
        assert_eq!(csv.lines().count(), 2);
    }

    #[test]
    fn view_uses_current_filter() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = client("http://127.0.0.1:1", &dir);
        state.transactions = vec![test_transaction(1), {
            let mut other = test_transaction(2);
            other.category = "Rent".to_owned();
            other
        }];

        state.set_filter(TransactionFilter::parse(None, Some("Rent")).unwrap());
        let view = state.view();

        assert_eq!(view.transactions.len(), 1);
        assert_eq!(view.overall.expense, 20.0);
        assert_eq!(view.filtered.expense, 10.0);
    }

    #[test]
    fn local_ids_count_down() {
        assert_eq!(next_local_id(&[]), -1);
        assert_eq!(next_local_id(&[test_transaction(5)]), -1);
        assert_eq!(next_local_id(&[test_transaction(5), test_transaction(-2)]), -3);
    }
}
