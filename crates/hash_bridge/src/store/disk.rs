use std::path::Path;

use alloy_primitives::B256;
use redb::{Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition};
use tracing::debug;

use super::{StoreError, TranslationStore};

/// native hash -> canonical hash
const NATIVE_TO_CANONICAL: TableDefinition<[u8; 32], [u8; 32]> = TableDefinition::new("native");

/// canonical hash -> native hash
const CANONICAL_TO_NATIVE: TableDefinition<[u8; 32], [u8; 32]> =
    TableDefinition::new("canonical");

/// Holds a single row, `"height"`, with the decimal checkpoint.
const CHECKPOINT: TableDefinition<&str, &str> = TableDefinition::new("checkpoint");

const HEIGHT_KEY: &str = "height";

macro_rules! impl_store_error_from {
    ($($error_type:ty),*) => {
        $(
            impl From<$error_type> for StoreError {
                fn from(err: $error_type) -> Self {
                    Self::Database(err.to_string())
                }
            }
        )*
    };
}

impl_store_error_from!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError
);

/// Translation store backed by an embedded redb database.
///
/// redb allows one write transaction at a time alongside any number of read
/// transactions, each of which sees a fixed snapshot. Readers therefore never
/// wait on the synchronizer and never observe half of a pair.
pub struct DiskStore {
    database: Database,
}

impl DiskStore {
    /// Opens the database at `path`, creating the file and tables if needed.
    /// Existing data is preserved.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let database = Database::create(path)?;

        let write_txn = database.begin_write()?;
        {
            let _native = write_txn.open_table(NATIVE_TO_CANONICAL)?;
            let _canonical = write_txn.open_table(CANONICAL_TO_NATIVE)?;
            let _checkpoint = write_txn.open_table(CHECKPOINT)?;
        }
        write_txn.commit()?;

        Ok(Self { database })
    }

    /// Starts a read transaction. All lookups made through the returned
    /// snapshot see the same committed state.
    pub fn snapshot(&self) -> Result<Snapshot, StoreError> {
        Ok(Snapshot {
            txn: self.database.begin_read()?,
        })
    }

    /// Writes both directions and the checkpoint in one transaction.
    /// `between` runs after the first direction is written; an error from it
    /// drops the transaction uncommitted.
    fn put_with<F>(
        &self,
        number: u64,
        native: B256,
        canonical: B256,
        between: F,
    ) -> Result<(), StoreError>
    where
        F: FnOnce() -> Result<(), StoreError>,
    {
        let write_txn = self.database.begin_write()?;
        {
            let mut checkpoint = write_txn.open_table(CHECKPOINT)?;
            let current = match checkpoint.get(HEIGHT_KEY)? {
                Some(raw) => Some(parse_height(raw.value())?),
                None => None,
            };

            let mut native_table = write_txn.open_table(NATIVE_TO_CANONICAL)?;
            native_table.insert(native.0, canonical.0)?;

            between()?;

            let mut canonical_table = write_txn.open_table(CANONICAL_TO_NATIVE)?;
            canonical_table.insert(canonical.0, native.0)?;

            if extends_checkpoint(current, number) {
                checkpoint.insert(HEIGHT_KEY, number.to_string().as_str())?;
            } else {
                debug!(number, ?current, "pair written without advancing checkpoint");
            }
        }
        write_txn.commit()?;
        Ok(())
    }
}

impl TranslationStore for DiskStore {
    fn put(&self, number: u64, native: B256, canonical: B256) -> Result<(), StoreError> {
        self.put_with(number, native, canonical, || Ok(()))
    }

    fn lookup_canonical(&self, native: &B256) -> Result<Option<B256>, StoreError> {
        self.snapshot()?.lookup_canonical(native)
    }

    fn lookup_native(&self, canonical: &B256) -> Result<Option<B256>, StoreError> {
        self.snapshot()?.lookup_native(canonical)
    }

    fn checkpoint(&self) -> Result<Option<u64>, StoreError> {
        self.snapshot()?.checkpoint()
    }
}

/// A consistent read view of the store.
pub struct Snapshot {
    txn: ReadTransaction,
}

impl Snapshot {
    pub fn lookup_canonical(&self, native: &B256) -> Result<Option<B256>, StoreError> {
        let table = self.txn.open_table(NATIVE_TO_CANONICAL)?;
        Ok(table.get(&native.0)?.map(|hash| B256::from(hash.value())))
    }

    pub fn lookup_native(&self, canonical: &B256) -> Result<Option<B256>, StoreError> {
        let table = self.txn.open_table(CANONICAL_TO_NATIVE)?;
        Ok(table.get(&canonical.0)?.map(|hash| B256::from(hash.value())))
    }

    pub fn checkpoint(&self) -> Result<Option<u64>, StoreError> {
        let table = self.txn.open_table(CHECKPOINT)?;
        match table.get(HEIGHT_KEY)? {
            Some(raw) => parse_height(raw.value()).map(Some),
            None => Ok(None),
        }
    }
}

fn parse_height(raw: &str) -> Result<u64, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::CorruptCheckpoint(raw.to_string()))
}

fn extends_checkpoint(current: Option<u64>, number: u64) -> bool {
    match current {
        Some(height) => height.checked_add(1) == Some(number),
        None => number == 0,
    }
}
