//! A thin HTTP client for the JSON API.

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::{
    Error,
    database_id::TransactionId,
    endpoints::{self, format_endpoint},
    error::ErrorMessage,
    transaction::{DeletedTransaction, NewTransaction, Transaction, TransactionPatch},
};

/// Talks to the expense tracker server at `base_url`.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the server at `base_url`, e.g. "http://localhost:5000".
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// The server address this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Fetch every transaction, most recent first.
    pub async fn list_transactions(&self) -> Result<Vec<Transaction>, Error> {
        let response = self
            .http
            .get(self.url(endpoints::TRANSACTIONS_API))
            .send()
            .await
            .map_err(unavailable)?;

        decode(response).await
    }

    /// Create a transaction and return it as stored by the server.
    pub async fn create_transaction(
        &self,
        new_transaction: &NewTransaction,
    ) -> Result<Transaction, Error> {
        let response = self
            .http
            .post(self.url(endpoints::TRANSACTIONS_API))
            .json(new_transaction)
            .send()
            .await
            .map_err(unavailable)?;

        decode(response).await
    }

    /// Apply `patch` to the transaction with `id`.
    pub async fn update_transaction(
        &self,
        id: TransactionId,
        patch: &TransactionPatch,
    ) -> Result<Transaction, Error> {
        let response = self
            .http
            .put(self.url(&format_endpoint(endpoints::TRANSACTION, id)))
            .json(patch)
            .send()
            .await
            .map_err(unavailable)?;

        decode(response).await
    }

    /// Delete the transaction with `id`.
    pub async fn delete_transaction(&self, id: TransactionId) -> Result<DeletedTransaction, Error> {
        let response = self
            .http
            .delete(self.url(&format_endpoint(endpoints::TRANSACTION, id)))
            .send()
            .await
            .map_err(unavailable)?;

        decode(response).await
    }

    /// Download every transaction as CSV text.
    pub async fn export_csv(&self) -> Result<String, Error> {
        let response = self
            .http
            .get(self.url(endpoints::EXPORT))
            .send()
            .await
            .map_err(unavailable)?;

        let response = check_status(response).await?;

        response.text().await.map_err(unavailable)
    }
}

fn unavailable(error: reqwest::Error) -> Error {
    tracing::debug!("request failed: {error}");
    Error::StoreUnavailable(error.to_string())
}

/// Turn an error status into [Error::Remote] with the message from the body.
async fn check_status(response: Response) -> Result<Response, Error> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorMessage>(&text)
        .map(|body| body.message)
        .unwrap_or(text);

    Err(Error::Remote {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
    check_status(response)
        .await?
        .json()
        .await
        .map_err(|error| Error::StoreUnavailable(format!("invalid response: {error}")))
}
