use redb::{Database as RedbDatabase, ReadTransaction, WriteTransaction};
use std::path::Path;
use std::sync::Arc;

use super::error::IndexError;
use super::tables::*;

/// Embedded key-value backend for the metadata index.
pub struct RedbIndex {
    db: Arc<RedbDatabase>,
}

impl Clone for RedbIndex {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
        }
    }
}

impl RedbIndex {
    /// Open or create the index at the given directory
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, IndexError> {
        std::fs::create_dir_all(data_dir.as_ref())?;
        let db_path = data_dir.as_ref().join("bitswap-index.redb");
        let db = Arc::new(RedbDatabase::create(db_path)?);

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(FILES)?;
            let _ = write_txn.open_table(PEERS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub(super) fn begin_read(&self) -> Result<ReadTransaction, IndexError> {
        Ok(self.db.begin_read()?)
    }

    pub(super) fn begin_write(&self) -> Result<WriteTransaction, IndexError> {
        Ok(self.db.begin_write()?)
    }
}
