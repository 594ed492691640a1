//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for the collateral ledger. It uses
//! rusqlite with bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use collateral_ledger_core::{
    AccountId, CounterKey, Deposit, DepositId, DepositState, JournalEntry, LedgerEvent, Timestamp,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{Store, WriteBatch};

const DEPOSIT_COLUMNS: &str =
    "deposit_id, creator, depositor, arbiter, value, expiration, state, created_at";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

// Helper to read a fixed-width blob column
fn fixed<const N: usize>(row: &Row<'_>, idx: usize) -> rusqlite::Result<[u8; N]> {
    let bytes: Vec<u8> = row.get(idx)?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Blob,
            format!("expected {} bytes, got {}", N, len).into(),
        )
    })
}

// Helper to convert a row to Deposit
fn row_to_deposit(row: &Row<'_>) -> rusqlite::Result<Deposit> {
    let depositor = match row.get::<_, Option<Vec<u8>>>(2)? {
        Some(_) => Some(AccountId(fixed(row, 2)?)),
        None => None,
    };

    let raw_state: u8 = row.get(6)?;
    let state = DepositState::from_u8(raw_state).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            Type::Integer,
            format!("unknown deposit state {}", raw_state).into(),
        )
    })?;

    Ok(Deposit {
        id: DepositId(fixed(row, 0)?),
        creator: AccountId(fixed(row, 1)?),
        depositor,
        arbiter: AccountId(fixed(row, 3)?),
        value: u128::from_be_bytes(fixed(row, 4)?),
        expiration: Timestamp(row.get::<_, i64>(5)? as u64),
        state,
        created_at: Timestamp(row.get::<_, i64>(7)? as u64),
    })
}

fn counter_key_bytes(key: &CounterKey) -> Vec<u8> {
    match key {
        CounterKey::Sequence => b"sequence".to_vec(),
        CounterKey::Nonce(creator) => {
            let mut bytes = b"nonce:".to_vec();
            bytes.extend_from_slice(creator.as_bytes());
            bytes
        }
    }
}

fn encode_event(event: &LedgerEvent) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(event, &mut buf).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode_event(bytes: &[u8]) -> Result<LedgerEvent> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn insert_deposit(conn: &Connection, deposit: &Deposit) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO deposits ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            DEPOSIT_COLUMNS
        ),
        params![
            deposit.id.as_bytes().as_slice(),
            deposit.creator.as_bytes().as_slice(),
            deposit.depositor.as_ref().map(|d| d.as_bytes().to_vec()),
            deposit.arbiter.as_bytes().as_slice(),
            deposit.value.to_be_bytes().as_slice(),
            deposit.expiration.as_secs() as i64,
            deposit.state.to_u8(),
            deposit.created_at.as_secs() as i64,
        ],
    )?;
    Ok(())
}

fn write_counter(conn: &Connection, key: &CounterKey, value: u128) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO counters (counter_key, value) VALUES (?1, ?2)",
        params![counter_key_bytes(key), value.to_be_bytes().as_slice()],
    )?;
    Ok(())
}

#[async_trait]
impl Store for SqliteStore {
    async fn get_deposit(&self, id: &DepositId) -> Result<Option<Deposit>> {
        let id = *id;
        self.run(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM deposits WHERE deposit_id = ?1", DEPOSIT_COLUMNS),
                params![id.as_bytes().as_slice()],
                row_to_deposit,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn put_deposit(&self, deposit: &Deposit) -> Result<()> {
        let deposit = deposit.clone();
        self.run(move |conn| Ok(insert_deposit(conn, &deposit)?)).await
    }

    async fn list_deposits(&self, state: Option<DepositState>) -> Result<Vec<Deposit>> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM deposits WHERE (?1 IS NULL OR state = ?1) ORDER BY deposit_id",
                DEPOSIT_COLUMNS
            ))?;
            let deposits = stmt
                .query_map(params![state.map(DepositState::to_u8)], row_to_deposit)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(deposits)
        })
        .await
    }

    async fn get_counter(&self, key: &CounterKey) -> Result<u128> {
        let key = counter_key_bytes(key);
        self.run(move |conn| {
            let value: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT value FROM counters WHERE counter_key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;

            match value {
                None => Ok(0),
                Some(bytes) => {
                    let arr: [u8; 16] = bytes.try_into().map_err(|_| {
                        StoreError::InvalidData("counter value is not 16 bytes".into())
                    })?;
                    Ok(u128::from_be_bytes(arr))
                }
            }
        })
        .await
    }

    async fn events_since(&self, after_seq: u64) -> Result<Vec<JournalEntry>> {
        let rows: Vec<(i64, Vec<u8>)> = self
            .run(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT seq, event FROM journal WHERE seq > ?1 ORDER BY seq")?;
                let rows = stmt
                    .query_map(params![after_seq as i64], |row| {
                        Ok((row.get(0)?, row.get(1)?))
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;

        rows.into_iter()
            .map(|(seq, bytes)| {
                Ok(JournalEntry {
                    seq: seq as u64,
                    event: decode_event(&bytes)?,
                })
            })
            .collect()
    }

    async fn write_batch(&self, batch: &WriteBatch) -> Result<u64> {
        let encoded = batch
            .events
            .iter()
            .map(|event| Ok((event.deposit_id(), event.name(), encode_event(event)?)))
            .collect::<Result<Vec<_>>>()?;
        let deposit = batch.deposit.clone();
        let counter = batch.counter;

        self.run(move |conn| {
            let tx = conn.transaction()?;
            insert_deposit(&tx, &deposit)?;
            if let Some(counter) = &counter {
                write_counter(&tx, &counter.key, counter.to)?;
            }

            let now = now_millis();
            for (deposit_id, kind, bytes) in &encoded {
                tx.execute(
                    "INSERT INTO journal (deposit_id, kind, event, recorded_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![deposit_id.as_bytes().as_slice(), kind, bytes, now],
                )?;
            }

            let head: i64 =
                tx.query_row("SELECT COALESCE(MAX(seq), 0) FROM journal", [], |row| {
                    row.get(0)
                })?;
            tx.commit()?;
            Ok(head as u64)
        })
        .await
    }

    async fn revert_batch(
        &self,
        batch: &WriteBatch,
        prior: Option<&Deposit>,
        after_seq: u64,
    ) -> Result<()> {
        let id = batch.deposit.id;
        let counter = batch.counter;
        let prior = prior.cloned();

        self.run(move |conn| {
            let tx = conn.transaction()?;
            match &prior {
                Some(deposit) => insert_deposit(&tx, deposit)?,
                None => {
                    tx.execute(
                        "DELETE FROM deposits WHERE deposit_id = ?1",
                        params![id.as_bytes().as_slice()],
                    )?;
                }
            }
            if let Some(counter) = &counter {
                write_counter(&tx, &counter.key, counter.from)?;
            }
            tx.execute(
                "DELETE FROM journal WHERE seq > ?1",
                params![after_seq as i64],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
