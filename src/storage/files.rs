use std::collections::HashSet;

use chrono::{DateTime, Utc};
use redb::ReadableTable;

use super::db::RedbIndex;
use super::error::IndexError;
use super::models::{FileRecord, IndexStats, PeerRegistration, PeerUpdate, SearchPage};
use super::tables::*;
use super::{recent_cutoff, MetadataIndex, MAX_PAGE_SIZE};

impl RedbIndex {
    /// All records, active or not, in table order.
    fn all_files(&self) -> Result<Vec<FileRecord>, IndexError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FILES)?;

        let mut files = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let file: FileRecord = rmp_serde::from_slice(value.value())?;
            files.push(file);
        }

        Ok(files)
    }
}

impl MetadataIndex for RedbIndex {
    // ========================================================================
    // File operations
    // ========================================================================

    fn insert(&self, record: &FileRecord) -> Result<(), IndexError> {
        debug_assert!(!record.hash.is_empty(), "file hash must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(FILES)?;
            if table.get(record.hash.as_str())?.is_some() {
                return Err(IndexError::Conflict(record.hash.clone()));
            }
            let data = rmp_serde::to_vec_named(record)?;
            table.insert(record.hash.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn lookup(&self, hash: &str) -> Result<Option<FileRecord>, IndexError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FILES)?;

        match table.get(hash)? {
            Some(data) => {
                let file: FileRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(file).filter(|f| f.is_active))
            }
            None => Ok(None),
        }
    }

    fn search(&self, query: &str, limit: u32, offset: u32) -> Result<SearchPage, IndexError> {
        let needle = query.to_lowercase();
        let mut matches: Vec<FileRecord> = self
            .all_files()?
            .into_iter()
            .filter(|f| f.is_active && f.matches(&needle))
            .collect();

        // Newest first; hash breaks ties so pages are stable
        matches.sort_by(|a, b| {
            b.upload_time
                .cmp(&a.upload_time)
                .then_with(|| b.hash.cmp(&a.hash))
        });

        let total = matches.len() as u64;
        let records = matches
            .into_iter()
            .skip(offset as usize)
            .take(limit.min(MAX_PAGE_SIZE) as usize)
            .collect();

        Ok(SearchPage { records, total })
    }

    fn increment_download_count(&self, hash: &str) -> Result<(), IndexError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(FILES)?;
            let existing: Option<FileRecord> = {
                let result = match table.get(hash)? {
                    Some(data) => Some(rmp_serde::from_slice(data.value())?),
                    None => None,
                };
                result
            };

            if let Some(mut file) = existing {
                file.download_count += 1;
                let data = rmp_serde::to_vec_named(&file)?;
                table.insert(hash, data.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn set_active(&self, hash: &str, active: bool) -> Result<bool, IndexError> {
        let write_txn = self.begin_write()?;
        let found = {
            let mut table = write_txn.open_table(FILES)?;
            let existing: Option<FileRecord> = {
                let result = match table.get(hash)? {
                    Some(data) => Some(rmp_serde::from_slice(data.value())?),
                    None => None,
                };
                result
            };

            match existing {
                Some(mut file) => {
                    file.is_active = active;
                    let data = rmp_serde::to_vec_named(&file)?;
                    table.insert(hash, data.as_slice())?;
                    true
                }
                None => false,
            }
        };
        write_txn.commit()?;
        Ok(found)
    }

    fn aggregate_stats(&self, now: DateTime<Utc>) -> Result<IndexStats, IndexError> {
        let mut stats = IndexStats::default();
        for file in self.all_files()?.iter().filter(|f| f.is_active) {
            stats.file_count += 1;
            stats.total_bytes += file.size_bytes;
            stats.total_downloads += file.download_count;
        }

        let cutoff = recent_cutoff(now);
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(PEERS)?;
        let mut recent: HashSet<String> = HashSet::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let peer: PeerRegistration = rmp_serde::from_slice(value.value())?;
            if peer.last_seen > cutoff {
                recent.insert(peer.address);
            }
        }
        stats.distinct_recent_peers = recent.len() as u64;

        Ok(stats)
    }

    // ========================================================================
    // Peer operations
    // ========================================================================

    fn upsert_peer(&self, update: &PeerUpdate) -> Result<(), IndexError> {
        let key = (update.hash.as_str(), update.address.as_str());

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(PEERS)?;
            let existing: Option<PeerRegistration> = {
                let result = match table.get(key)? {
                    Some(data) => Some(rmp_serde::from_slice(data.value())?),
                    None => None,
                };
                result
            };

            let peer = match existing {
                Some(mut peer) => {
                    peer.apply(update);
                    peer
                }
                None => PeerRegistration::from_update(update),
            };
            let data = rmp_serde::to_vec_named(&peer)?;
            table.insert(key, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn count_peers(&self, hash: &str) -> Result<u64, IndexError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(PEERS)?;

        let mut count = 0;
        for result in table.range((hash, "")..)? {
            let (key, _) = result?;
            if key.value().0 != hash {
                break;
            }
            count += 1;
        }

        Ok(count)
    }
}
