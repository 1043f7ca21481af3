use crate::errors::ApiError;
use chrono::{DateTime, SecondsFormat, Utc};
use credential_core::{EventEntry, EventHash, LedgerEvent};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Pool, Row, Sqlite};
use std::str::FromStr;

pub type Db = Pool<Sqlite>;

pub async fn connect(db_url: &str) -> Result<Db, ApiError> {
    let options = SqliteConnectOptions::from_str(db_url)
        .map_err(|e| {
            tracing::error!(error = %e, "invalid database url");
            ApiError::Internal
        })?
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to open database");
            ApiError::Internal
        })
}

pub async fn init_schema(db: &Db) -> Result<(), ApiError> {
    // Append-only event log. Rows are only ever inserted; the ledger is rebuilt from them
    // in sequence order at startup.
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS ledger_events (
  sequence INTEGER PRIMARY KEY,
  kind TEXT NOT NULL,
  token_id INTEGER NOT NULL,
  recorded_at TEXT NOT NULL,
  prev_hash TEXT NOT NULL,
  hash TEXT NOT NULL UNIQUE,
  event_json TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS ledger_events_token ON ledger_events (token_id);
"#,
    )
    .execute(db)
    .await
    .map_err(|_| ApiError::Internal)?;

    Ok(())
}

pub async fn append_event(db: &Db, entry: &EventEntry) -> Result<(), ApiError> {
    let event_json = serde_json::to_string(&entry.event).map_err(|_| ApiError::Internal)?;

    sqlx::query(
        r#"INSERT INTO ledger_events (sequence, kind, token_id, recorded_at, prev_hash, hash, event_json)
           VALUES (?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(entry.sequence as i64)
    .bind(entry.event.kind())
    .bind(entry.event.token_id() as i64)
    .bind(entry.recorded_at.to_rfc3339_opts(SecondsFormat::Nanos, true))
    .bind(entry.prev_hash.to_hex())
    .bind(entry.hash.to_hex())
    .bind(event_json)
    .execute(db)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, sequence = entry.sequence, "failed to persist ledger event");
        ApiError::Internal
    })?;

    Ok(())
}

/// Load the whole log in sequence order.
pub async fn load_events(db: &Db) -> Result<Vec<EventEntry>, ApiError> {
    let rows = sqlx::query(
        r#"SELECT sequence, recorded_at, prev_hash, hash, event_json
           FROM ledger_events
           ORDER BY sequence"#,
    )
    .fetch_all(db)
    .await
    .map_err(|_| ApiError::Internal)?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let sequence: i64 = row.get(0);
        let recorded_at: String = row.get(1);
        let prev_hash: String = row.get(2);
        let hash: String = row.get(3);
        let event_json: String = row.get(4);

        let recorded_at = DateTime::parse_from_rfc3339(&recorded_at)
            .map_err(|_| ApiError::Internal)?
            .with_timezone(&Utc);
        let event: LedgerEvent = serde_json::from_str(&event_json).map_err(|_| ApiError::Internal)?;

        out.push(EventEntry {
            sequence: sequence as u64,
            recorded_at,
            prev_hash: EventHash::from_str(&prev_hash)?,
            hash: EventHash::from_str(&hash)?,
            event,
        });
    }

    Ok(out)
}

pub async fn count_events(db: &Db) -> Result<u64, ApiError> {
    let row = sqlx::query(r#"SELECT COUNT(*) AS c FROM ledger_events"#)
        .fetch_one(db)
        .await
        .map_err(|_| ApiError::Internal)?;
    let c: i64 = row.get("c");
    Ok(c as u64)
}

#[cfg(test)]
pub async fn connect_memory() -> Db {
    // One connection only: every new in-memory connection would be a fresh database.
    let db = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_schema(&db).await.unwrap();
    db
}

#[cfg(test)]
mod tests {
    use super::*;
    use credential_core::hashing::commit;
    use credential_core::{HolderId, Ledger};

    #[tokio::test]
    async fn persisted_log_replays_to_same_state() {
        let db = connect_memory().await;
        let ledger = Ledger::new();

        let c = commit(&["Rahul Verma", "B.Tech CS", "2024"]).unwrap();
        for holder in ["H1", "H2"] {
            let entry = ledger
                .stage_mint(HolderId::new(holder).unwrap(), c, None, Utc::now())
                .unwrap();
            append_event(&db, &entry).await.unwrap();
            ledger.apply(entry).unwrap();
        }

        assert_eq!(count_events(&db).await.unwrap(), 2);

        let loaded = load_events(&db).await.unwrap();
        assert_eq!(loaded, ledger.events(0, u64::MAX).unwrap());

        let rebuilt = Ledger::replay(loaded).unwrap();
        assert_eq!(rebuilt.summary().unwrap(), ledger.summary().unwrap());
    }

    #[tokio::test]
    async fn sequence_numbers_are_unique() {
        let db = connect_memory().await;
        let ledger = Ledger::new();
        let entry = ledger
            .stage_mint(HolderId::new("H1").unwrap(), commit(&["a"]).unwrap(), None, Utc::now())
            .unwrap();

        append_event(&db, &entry).await.unwrap();
        assert!(append_event(&db, &entry).await.is_err());
    }
}
