//! The local copy of the transactions, used when the server cannot be reached.

use std::{
    fs::File,
    io::{BufReader, BufWriter, ErrorKind, Write},
    path::{Path, PathBuf},
};

use crate::{Error, transaction::Transaction};

/// A JSON file holding the last known list of transactions.
#[derive(Debug, Clone)]
pub struct LocalSnapshot {
    path: PathBuf,
}

impl LocalSnapshot {
    /// Use the snapshot at `path`, the file is created on the first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The location of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the saved transactions, or an empty list if nothing was saved yet.
    ///
    /// # Errors
    /// Returns [Error::Snapshot] if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Vec<Transaction>, Error> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(self.error(error)),
        };

        serde_json::from_reader(BufReader::new(file)).map_err(|error| self.error(error))
    }

    /// Overwrite the snapshot with `transactions`.
    ///
    /// # Errors
    /// Returns [Error::Snapshot] if the file cannot be written.
    pub fn save(&self, transactions: &[Transaction]) -> Result<(), Error> {
        let file = File::create(&self.path).map_err(|error| self.error(error))?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer_pretty(&mut writer, transactions)
            .map_err(|error| self.error(error))?;

        writer.flush().map_err(|error| self.error(error))
    }

    fn error(&self, error: impl std::fmt::Display) -> Error {
        Error::Snapshot(format!("{}: {error}", self.path.display()))
    }
}
