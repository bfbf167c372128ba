use crate::submission::Submission;
use crate::webapp_data::{parse_percent, CashbackEntry};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Stored cashback row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCashback {
    pub id: i64,
    pub user_id: i64,
    #[serde(flatten)]
    pub entry: CashbackEntry,
    pub created_at: String,
}

/// Event for audit trail ("Every change is an event")
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

/// CSV row for bulk import
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    bank: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    percent: String,
}

pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Cashbacks Table
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS cashbacks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            bank TEXT NOT NULL,
            category TEXT NOT NULL,
            percent REAL NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Events Table (audit trail)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_cashbacks_user ON cashbacks(user_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

/// Insert a cashback offer, returns its row id
pub fn add_cashback(conn: &Connection, user_id: i64, entry: &CashbackEntry) -> Result<i64> {
    conn.execute(
        "INSERT INTO cashbacks (user_id, bank, category, percent)
         VALUES (?1, ?2, ?3, ?4)",
        params![user_id, entry.bank, entry.category, entry.percent],
    )
    .context("Failed to insert cashback")?;

    let row_id = conn.last_insert_rowid();

    let event = Event::new(
        "cashback_added",
        "user",
        &user_id.to_string(),
        serde_json::json!({
            "cashback_id": row_id,
            "bank": entry.bank,
            "category": entry.category,
            "percent": entry.percent,
        }),
        "webapp",
    );
    if let Err(e) = insert_event(conn, &event) {
        tracing::warn!("Failed to log cashback_added event: {:#}", e);
    }

    tracing::info!(user_id, bank = %entry.bank, category = %entry.category, percent = entry.percent, "cashback stored");

    Ok(row_id)
}

/// Search cashback by category (partial match), best percent first
pub fn get_best_cashback(
    conn: &Connection,
    user_id: i64,
    category_query: &str,
) -> Result<Vec<CashbackEntry>> {
    // "Food" matches "Fast Food"; `%` and `_` in the query are literal
    let pattern = format!("%{}%", escape_like(category_query));

    let mut stmt = conn.prepare(
        "SELECT bank, category, percent
         FROM cashbacks
         WHERE user_id = ?1 AND category LIKE ?2 ESCAPE '\\'
         ORDER BY percent DESC",
    )?;

    let entries = stmt
        .query_map(params![user_id, pattern], row_to_entry)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entries)
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub fn get_all_cashbacks(conn: &Connection, user_id: i64) -> Result<Vec<CashbackEntry>> {
    let mut stmt = conn.prepare(
        "SELECT bank, category, percent
         FROM cashbacks
         WHERE user_id = ?1
         ORDER BY bank, percent DESC",
    )?;

    let entries = stmt
        .query_map(params![user_id], row_to_entry)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entries)
}

/// Full rows for a user, newest first
pub fn get_stored_cashbacks(conn: &Connection, user_id: i64) -> Result<Vec<StoredCashback>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, bank, category, percent, created_at
         FROM cashbacks
         WHERE user_id = ?1
         ORDER BY id DESC",
    )?;

    let rows = stmt
        .query_map(params![user_id], |row| {
            Ok(StoredCashback {
                id: row.get(0)?,
                user_id: row.get(1)?,
                entry: CashbackEntry {
                    bank: row.get(2)?,
                    category: row.get(3)?,
                    percent: row.get(4)?,
                },
                created_at: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<CashbackEntry> {
    Ok(CashbackEntry {
        bank: row.get(0)?,
        category: row.get(1)?,
        percent: row.get(2)?,
    })
}

/// Delete every cashback of a user, returns how many were removed
pub fn clear_cashbacks(conn: &Connection, user_id: i64) -> Result<usize> {
    let deleted = conn.execute("DELETE FROM cashbacks WHERE user_id = ?1", params![user_id])?;

    let event = Event::new(
        "cashbacks_cleared",
        "user",
        &user_id.to_string(),
        serde_json::json!({ "deleted": deleted }),
        "user",
    );
    if let Err(e) = insert_event(conn, &event) {
        tracing::warn!("Failed to log cashbacks_cleared event: {:#}", e);
    }

    Ok(deleted)
}

pub fn count_cashbacks(conn: &Connection, user_id: i64) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM cashbacks WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;

    Ok(count)
}

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events for a specific entity
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY id DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?
                    .with_timezone(&Utc),
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

/// Load cashback offers from a CSV with a `bank,category,percent` header
pub fn load_csv(csv_path: &Path) -> Result<Vec<CashbackEntry>> {
    let mut rdr = csv::Reader::from_path(csv_path).context("Failed to open CSV file")?;

    let mut entries = Vec::new();

    for (i, result) in rdr.deserialize().enumerate() {
        // Header is line 1
        let line = i + 2;
        let row: CsvRow = result.with_context(|| format!("Failed to read CSV line {}", line))?;

        let submission = Submission::validate(row.bank, row.category, row.percent)
            .map_err(|errors| anyhow!("Line {}: {}", line, errors[0]))?;

        let percent = parse_percent(&submission.percent)
            .with_context(|| format!("Line {}", line))?;

        entries.push(CashbackEntry {
            bank: submission.bank,
            category: submission.category,
            percent,
        });
    }

    Ok(entries)
}

pub fn import_entries(conn: &Connection, user_id: i64, entries: &[CashbackEntry]) -> Result<usize> {
    let mut inserted = 0;

    for entry in entries {
        add_cashback(conn, user_id, entry)?;
        inserted += 1;
    }

    Ok(inserted)
}
