use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use hashline_types::{ChainHash, Ledger, LedgerHeader, Record, RecordNum};

use crate::error::{StoreError, StoreResult};
use crate::traits::LedgerStore;

const HEADER_FILE: &str = "header";
const RECORD_PREFIX: &str = "record-";

/// Directory-backed ledger store.
///
/// On-disk layout:
/// ```text
/// <dir>/header        bincode LedgerHeader {hash, num}
/// <dir>/record-<num>  bincode Record, one file per position
/// ```
///
/// Every file is written to a temp file in the same directory and renamed
/// into place, so a crash mid-write leaves the previous version intact.
pub struct FileLedgerStore {
    dir: PathBuf,
    reserved: ChainHash,
    /// Cached copy of the header file.
    header: Mutex<LedgerHeader>,
}

impl FileLedgerStore {
    /// Open (or create) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>, reserved: ChainHash) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let header_path = dir.join(HEADER_FILE);
        let header = if header_path.exists() {
            read_bincode::<LedgerHeader>(&header_path)?
        } else {
            let header = LedgerHeader::new(reserved.clone(), 0);
            write_bincode(&dir, &header_path, &header)?;
            header
        };
        debug!(dir = %dir.display(), num = header.num, "opened file ledger store");

        Ok(Self {
            dir,
            reserved,
            header: Mutex::new(header),
        })
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, num: RecordNum) -> PathBuf {
        self.dir.join(format!("{RECORD_PREFIX}{num}"))
    }

    fn write_header(&self, header: &LedgerHeader) -> StoreResult<()> {
        write_bincode(&self.dir, &self.dir.join(HEADER_FILE), header)
    }

    fn write_record(&self, record: &Record, num: RecordNum) -> StoreResult<()> {
        write_bincode(&self.dir, &self.record_path(num), record)
    }

    fn read_record(&self, num: RecordNum) -> StoreResult<Record> {
        let path = self.record_path(num);
        match read_bincode::<Record>(&path) {
            Err(StoreError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::MissingRecord(num))
            }
            other => other,
        }
    }

    fn check_range(header: &LedgerHeader, num: RecordNum) -> StoreResult<()> {
        if num == 0 || num > header.num {
            return Err(StoreError::OutOfRange {
                num,
                len: header.num,
            });
        }
        Ok(())
    }
}

impl LedgerStore for FileLedgerStore {
    fn load(&self) -> StoreResult<Ledger> {
        let header = self.header.lock().map_err(|_| StoreError::LockPoisoned)?;
        let records = (1..=header.num)
            .map(|num| self.read_record(num))
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(Ledger {
            hash: header.hash.clone(),
            num: header.num,
            records,
        })
    }

    fn append(&self, record: &Record) -> StoreResult<()> {
        let mut header = self.header.lock().map_err(|_| StoreError::LockPoisoned)?;
        let expected = header.num.checked_add(1).ok_or(StoreError::OutOfRange {
            num: record.num,
            len: header.num,
        })?;
        if record.num != expected {
            return Err(StoreError::OutOfOrder {
                expected,
                actual: record.num,
            });
        }
        self.write_record(record, expected)?;
        let next = LedgerHeader::new(record.hash.clone(), expected);
        self.write_header(&next)?;
        *header = next;
        debug!(num = expected, "stored appended record");
        Ok(())
    }

    fn replace(&self, record: &Record, num: RecordNum) -> StoreResult<()> {
        let mut header = self.header.lock().map_err(|_| StoreError::LockPoisoned)?;
        Self::check_range(&header, num)?;
        self.write_record(record, num)?;
        if num == header.num {
            let next = LedgerHeader::new(record.hash.clone(), num);
            self.write_header(&next)?;
            *header = next;
        }
        Ok(())
    }

    fn remove(&self, num: RecordNum) -> StoreResult<()> {
        let mut header = self.header.lock().map_err(|_| StoreError::LockPoisoned)?;
        Self::check_range(&header, num)?;

        fs::remove_file(self.record_path(num))?;
        for later in (num..header.num).map(|n| n + 1) {
            fs::rename(self.record_path(later), self.record_path(later - 1))?;
        }

        let len = header.num - 1;
        let hash = if len == 0 {
            self.reserved.clone()
        } else {
            self.read_record(len)?.hash
        };
        let next = LedgerHeader::new(hash, len);
        self.write_header(&next)?;
        *header = next;
        debug!(num, remaining = len, "removed stored record");
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        let mut header = self.header.lock().map_err(|_| StoreError::LockPoisoned)?;
        for num in 1..=header.num {
            match fs::remove_file(self.record_path(num)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        let next = LedgerHeader::new(self.reserved.clone(), 0);
        self.write_header(&next)?;
        *header = next;
        Ok(())
    }
}

impl std::fmt::Debug for FileLedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLedgerStore")
            .field("dir", &self.dir)
            .finish()
    }
}

fn read_bincode<T: DeserializeOwned>(path: &Path) -> StoreResult<T> {
    let bytes = fs::read(path)?;
    bincode::deserialize(&bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn write_bincode<T: Serialize>(dir: &Path, path: &Path, value: &T) -> StoreResult<()> {
    let bytes = bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}
