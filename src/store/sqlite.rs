use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};

use super::TickStore;
use crate::error::AppError;
use crate::model::tick::Tick;

const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// SQLite-backed tick store. The flush task writes and refreshes read through
/// the same connection; WAL keeps readers from blocking on an open writer
/// when several processes share the file.
#[derive(Debug)]
pub struct SqliteTickStore {
    conn: Mutex<Connection>,
}

impl SqliteTickStore {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let mode = enable_wal(&conn);
        if mode.as_deref() != Some("wal") {
            tracing::warn!(
                path = %path.display(),
                journal_mode = ?mode,
                "SQLite WAL unavailable, refresh reads may block on flush writes"
            );
        }
        Self::from_connection(conn)
    }

    /// In-memory databases have no WAL; the journal mode stays `memory`.
    pub fn open_in_memory() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory()?;
        let _ = enable_wal(&conn);
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, AppError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS ticks (
                symbol TEXT NOT NULL,
                trade_id INTEGER NOT NULL,
                timestamp_ms INTEGER NOT NULL,
                price REAL NOT NULL,
                qty REAL NOT NULL,
                PRIMARY KEY (symbol, trade_id)
            );
            CREATE INDEX IF NOT EXISTS idx_ticks_timestamp_ms
            ON ticks(timestamp_ms);
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.conn
            .lock()
            .map_err(|_| AppError::Persistence("sqlite connection lock poisoned".to_string()))
    }

    /// Current journal mode as reported by SQLite.
    pub fn journal_mode(&self) -> Result<String, AppError> {
        let conn = self.lock()?;
        Ok(conn.query_row("PRAGMA journal_mode", [], |row| row.get::<_, String>(0))?)
    }

    /// Total stored rows across all symbols.
    pub fn count(&self) -> Result<u64, AppError> {
        let conn = self.lock()?;
        let n = conn.query_row("SELECT COUNT(*) FROM ticks", [], |row| row.get::<_, i64>(0))?;
        Ok(n.max(0) as u64)
    }
}

/// Switch to WAL with `synchronous=NORMAL`. Returns the resulting journal
/// mode, or `None` when SQLite rejected the pragma.
fn enable_wal(conn: &Connection) -> Option<String> {
    let mode = match conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get::<_, String>(0)) {
        Ok(mode) => mode.to_ascii_lowercase(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to set journal_mode=WAL");
            return None;
        }
    };
    if let Err(e) = conn.execute_batch("PRAGMA synchronous=NORMAL;") {
        tracing::warn!(error = %e, "Failed to set synchronous=NORMAL");
    }
    Some(mode)
}

impl TickStore for SqliteTickStore {
    fn append_ticks(&self, batch: &[Tick]) -> Result<usize, AppError> {
        if batch.is_empty() {
            return Ok(0);
        }
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR IGNORE INTO ticks (symbol, trade_id, timestamp_ms, price, qty)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for t in batch {
                inserted += stmt.execute(params![
                    t.symbol,
                    t.trade_id as i64,
                    t.timestamp_ms as i64,
                    t.price,
                    t.qty,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn query_ticks_since(&self, symbols: &[String], since_ms: u64) -> Result<Vec<Tick>, AppError> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = (0..symbols.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            r#"
            SELECT symbol, trade_id, timestamp_ms, price, qty
            FROM ticks
            WHERE timestamp_ms >= ?1 AND symbol IN ({})
            ORDER BY timestamp_ms ASC, rowid ASC
            "#,
            placeholders
        );

        let mut values = Vec::with_capacity(symbols.len() + 1);
        values.push(Value::Integer(since_ms as i64));
        values.extend(symbols.iter().map(|s| Value::Text(s.clone())));

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            Ok(Tick {
                symbol: row.get(0)?,
                trade_id: row.get::<_, i64>(1)? as u64,
                timestamp_ms: row.get::<_, i64>(2)? as u64,
                price: row.get(3)?,
                qty: row.get(4)?,
            })
        })?;

        let mut ticks = Vec::new();
        for row in rows {
            ticks.push(row?);
        }
        Ok(ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent_per_trade_id() {
        let store = SqliteTickStore::open_in_memory().unwrap();
        let batch = vec![
            Tick::new("BTCUSDT", 100.0, 1.0, 1_000, 1),
            Tick::new("BTCUSDT", 101.0, 2.0, 2_000, 2),
            Tick::new("ETHUSDT", 10.0, 3.0, 1_000, 1),
        ];
        assert_eq!(store.append_ticks(&batch).unwrap(), 3);
        assert_eq!(store.append_ticks(&batch).unwrap(), 0);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn empty_batch_is_noop() {
        let store = SqliteTickStore::open_in_memory().unwrap();
        assert_eq!(store.append_ticks(&[]).unwrap(), 0);
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.query_ticks_since(&[], 0).unwrap().is_empty());
    }

    #[test]
    fn query_orders_by_timestamp_then_arrival() {
        let store = SqliteTickStore::open_in_memory().unwrap();
        store
            .append_ticks(&[
                Tick::new("ETHUSDT", 10.0, 1.0, 3_000, 7),
                Tick::new("BTCUSDT", 100.0, 1.0, 2_000, 9),
                Tick::new("BTCUSDT", 101.0, 1.0, 2_000, 3),
                Tick::new("SOLUSDT", 5.0, 1.0, 2_500, 1),
                Tick::new("BTCUSDT", 99.0, 1.0, 500, 1),
            ])
            .unwrap();
        let symbols = vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()];
        let rows = store.query_ticks_since(&symbols, 1_000).unwrap();
        let ids: Vec<(&str, u64)> = rows.iter().map(|t| (t.symbol.as_str(), t.trade_id)).collect();
        assert_eq!(
            ids,
            vec![("BTCUSDT", 9), ("BTCUSDT", 3), ("ETHUSDT", 7)]
        );
        assert!((rows[1].price - 101.0).abs() < f64::EPSILON);
    }
}
