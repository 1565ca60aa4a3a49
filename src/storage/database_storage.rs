use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use log::{debug, error, info};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ColumnTrait, ConnectOptions,
    ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Statement, TransactionTrait, Value,
};

use crate::detection::Detection;
use crate::error_handling::types::StorageError;
use crate::events::types::{AttackEvent, SecurityEvent};
use crate::storage::db_entities::{attack_events, detections, requests, security_events, statistics};
use crate::storage::storage_trait::Storage;
use crate::storage::types::{DailyStatistics, NewRequest, RecentDetection, StatCounters};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS requests (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        method TEXT NOT NULL,
        url TEXT NOT NULL,
        params_json TEXT NOT NULL,
        sandbox_id TEXT NOT NULL,
        timestamp TEXT NOT NULL
    );",
    "CREATE INDEX IF NOT EXISTS idx_requests_timestamp ON requests (timestamp);",
    "CREATE TABLE IF NOT EXISTS detections (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        request_id INTEGER NOT NULL,
        detection_type TEXT NOT NULL,
        detection_subtype TEXT NOT NULL,
        risk_level TEXT NOT NULL,
        location TEXT NOT NULL,
        pattern TEXT NOT NULL,
        input_sample TEXT NOT NULL,
        confidence TEXT NOT NULL,
        FOREIGN KEY(request_id) REFERENCES requests(id) ON DELETE CASCADE
    );",
    "CREATE INDEX IF NOT EXISTS idx_detections_request ON detections (request_id);",
    "CREATE TABLE IF NOT EXISTS statistics (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL UNIQUE,
        total_requests INTEGER NOT NULL DEFAULT 0,
        detected_attacks INTEGER NOT NULL DEFAULT 0,
        sql_injections INTEGER NOT NULL DEFAULT 0,
        xss_attacks INTEGER NOT NULL DEFAULT 0,
        path_traversals INTEGER NOT NULL DEFAULT 0
    );",
    "CREATE TABLE IF NOT EXISTS security_events (
        event_id TEXT PRIMARY KEY,
        timestamp REAL NOT NULL,
        event_type TEXT NOT NULL,
        source_ip TEXT NOT NULL,
        destination_ip TEXT NOT NULL,
        description TEXT NOT NULL,
        payload TEXT,
        user_agent TEXT,
        method TEXT NOT NULL,
        received_at TEXT NOT NULL
    );",
    "CREATE TABLE IF NOT EXISTS attack_events (
        event_id TEXT PRIMARY KEY,
        source_event_id TEXT NOT NULL,
        timestamp REAL NOT NULL,
        attack_type TEXT NOT NULL,
        source_ip TEXT NOT NULL,
        destination_ip TEXT NOT NULL,
        description TEXT NOT NULL,
        payload TEXT,
        detected_at TEXT NOT NULL,
        FOREIGN KEY(source_event_id) REFERENCES security_events(event_id) ON DELETE CASCADE
    );",
];

// Single statement: SQLite applies the whole increment or nothing.
const UPSERT_STATS: &str = "INSERT INTO statistics
        (date, total_requests, detected_attacks, sql_injections, xss_attacks, path_traversals)
    VALUES (?, ?, ?, ?, ?, ?)
    ON CONFLICT(date) DO UPDATE SET
        total_requests = total_requests + excluded.total_requests,
        detected_attacks = detected_attacks + excluded.detected_attacks,
        sql_injections = sql_injections + excluded.sql_injections,
        xss_attacks = xss_attacks + excluded.xss_attacks,
        path_traversals = path_traversals + excluded.path_traversals";

const RECENT_DETECTIONS: &str = "SELECT r.method AS method, r.url AS url, r.timestamp AS timestamp,
        r.sandbox_id AS sandbox_id, d.detection_type AS detection_type,
        d.detection_subtype AS detection_subtype, d.risk_level AS risk_level,
        d.location AS location
    FROM detections d
    INNER JOIN requests r ON d.request_id = r.id
    ORDER BY r.timestamp DESC, r.id DESC, d.id ASC
    LIMIT ?";

// Internal row mapping for the reporting join
#[derive(Debug, FromQueryResult)]
struct RecentDetectionRow {
    method: String,
    url: String,
    timestamp: String,
    sandbox_id: String,
    detection_type: String,
    detection_subtype: String,
    risk_level: String,
    location: String,
}

impl RecentDetectionRow {
    fn into_recent_detection(self) -> Result<RecentDetection, StorageError> {
        Ok(RecentDetection {
            method: self.method,
            url: self.url,
            timestamp: parse_timestamp(&self.timestamp)?,
            sandbox_id: self.sandbox_id,
            attack_type: self.detection_type.parse().map_err(StorageError::Corrupted)?,
            subtype: self.detection_subtype.parse().map_err(StorageError::Corrupted)?,
            risk_level: self.risk_level.parse().map_err(StorageError::Corrupted)?,
            location: self.location.parse().map_err(StorageError::Corrupted)?,
        })
    }
}

/// Fixed-width so that lexical order of stored timestamps is chronological order.
pub(crate) fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupted(format!("timestamp `{}`: {}", raw, e)))
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn write_failed(context: &'static str) -> impl FnOnce(DbErr) -> StorageError {
    move |e| {
        error!("Failed to {}: {}", context, e);
        StorageError::WriteFailed
    }
}

fn read_failed(context: &'static str) -> impl FnOnce(DbErr) -> StorageError {
    move |e| {
        error!("Failed to {}: {}", context, e);
        StorageError::ReadFailed
    }
}

fn as_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn as_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

async fn insert_request<C: ConnectionTrait>(
    conn: &C,
    request: &NewRequest,
) -> Result<i64, StorageError> {
    let params_json = serde_json::to_string(&request.params).map_err(|e| {
        error!("Failed to serialize params of {} {}: {}", request.method, request.url, e);
        StorageError::WriteFailed
    })?;
    let model = requests::ActiveModel {
        id: NotSet,
        method: Set(request.method.clone()),
        url: Set(request.url.clone()),
        params_json: Set(params_json),
        sandbox_id: Set(request.sandbox_id.clone()),
        timestamp: Set(format_timestamp(&request.timestamp)),
    }
    .insert(conn)
    .await
    .map_err(write_failed("insert request"))?;
    Ok(model.id)
}

async fn insert_detections<C: ConnectionTrait>(
    conn: &C,
    request_id: i64,
    found: &[Detection],
) -> Result<(), StorageError> {
    if found.is_empty() {
        return Ok(());
    }
    let rows = found.iter().map(|d| detections::ActiveModel {
        id: NotSet,
        request_id: Set(request_id),
        detection_type: Set(d.attack_type.as_str().to_string()),
        detection_subtype: Set(d.subtype.as_str().to_string()),
        risk_level: Set(d.risk_level.as_str().to_string()),
        location: Set(d.location.to_string()),
        pattern: Set(d.pattern.clone()),
        input_sample: Set(d.input_sample.clone()),
        confidence: Set(d.confidence.as_str().to_string()),
    });
    detections::Entity::insert_many(rows)
        .exec(conn)
        .await
        .map_err(write_failed("insert detections"))?;
    Ok(())
}

fn security_event_from_model(model: security_events::Model) -> Result<SecurityEvent, StorageError> {
    Ok(SecurityEvent {
        received_at: parse_timestamp(&model.received_at)?,
        event_id: model.event_id,
        timestamp: model.timestamp,
        event_type: model.event_type,
        source_ip: model.source_ip,
        destination_ip: model.destination_ip,
        description: model.description,
        payload: model.payload,
        user_agent: model.user_agent,
        method: model.method,
    })
}

fn attack_event_from_model(model: attack_events::Model) -> Result<AttackEvent, StorageError> {
    Ok(AttackEvent {
        attack_type: model.attack_type.parse().map_err(StorageError::Corrupted)?,
        detected_at: parse_timestamp(&model.detected_at)?,
        event_id: model.event_id,
        source_event_id: model.source_event_id,
        timestamp: model.timestamp,
        source_ip: model.source_ip,
        destination_ip: model.destination_ip,
        description: model.description,
        payload: model.payload,
    })
}

pub struct DatabaseStorage {
    db: DatabaseConnection,
}

impl DatabaseStorage {
    /// Open (creating when needed) the SQLite database at `path` and its schema.
    pub async fn new_file<P: AsRef<Path>>(path: P, max_connections: u32) -> Result<Self, StorageError> {
        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    error!("Failed to create database dir {}: {}", parent.display(), e);
                    StorageError::WriteFailed
                })?;
            }
        }

        let mut opts = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path_ref.display()));
        opts.max_connections(max_connections.max(1))
            .sqlx_logging(true)
            .sqlx_logging_level(log::LevelFilter::Debug);
        let db = Database::connect(opts).await.map_err(|e| {
            error!("Failed to open database {}: {}", path_ref.display(), e);
            StorageError::ConnectionFailed
        })?;

        db.execute_unprepared("PRAGMA journal_mode = WAL;")
            .await
            .map_err(write_failed("enable WAL journal"))?;
        for statement in SCHEMA {
            db.execute_unprepared(statement)
                .await
                .map_err(write_failed("create schema"))?;
        }

        info!("DatabaseStorage initialized at {}", path_ref.display());
        Ok(Self { db })
    }

    /// Close the connection pool. Further calls on this storage fail.
    pub async fn close(&self) -> Result<(), StorageError> {
        self.db.clone().close().await.map_err(|e| {
            error!("Failed to close database: {}", e);
            StorageError::ConnectionFailed
        })
    }
}

impl Storage for DatabaseStorage {
    async fn save_request(&self, request: &NewRequest) -> Result<i64, StorageError> {
        let id = insert_request(&self.db, request).await?;
        debug!("Saved request {} ({} {})", id, request.method, request.url);
        Ok(id)
    }

    async fn save_detections(&self, request_id: i64, found: &[Detection]) -> Result<(), StorageError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(write_failed("begin detections transaction"))?;
        insert_detections(&txn, request_id, found).await?;
        txn.commit()
            .await
            .map_err(write_failed("commit detections"))?;
        Ok(())
    }

    async fn save_analysis(&self, request: &NewRequest, found: &[Detection]) -> Result<i64, StorageError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(write_failed("begin analysis transaction"))?;
        // Dropping `txn` on an early return rolls the request back.
        let request_id = insert_request(&txn, request).await?;
        insert_detections(&txn, request_id, found).await?;
        txn.commit()
            .await
            .map_err(write_failed("commit analysis"))?;
        debug!(
            "Saved request {} with {} detections (sandbox {})",
            request_id,
            found.len(),
            request.sandbox_id
        );
        Ok(request_id)
    }

    async fn upsert_daily_stats(&self, date: NaiveDate, delta: &StatCounters) -> Result<(), StorageError> {
        let statement = Statement::from_sql_and_values(
            self.db.get_database_backend(),
            UPSERT_STATS,
            vec![
                Value::from(date_key(date)),
                Value::from(as_i64(delta.total_requests)),
                Value::from(as_i64(delta.detected_attacks)),
                Value::from(as_i64(delta.sql_injections)),
                Value::from(as_i64(delta.xss_attacks)),
                Value::from(as_i64(delta.path_traversals)),
            ],
        );
        self.db
            .execute(statement)
            .await
            .map_err(write_failed("upsert daily statistics"))?;
        Ok(())
    }

    async fn get_daily_stats(&self, date: NaiveDate) -> Result<DailyStatistics, StorageError> {
        let row = statistics::Entity::find()
            .filter(statistics::Column::Date.eq(date_key(date)))
            .one(&self.db)
            .await
            .map_err(read_failed("load daily statistics"))?;
        Ok(match row {
            Some(row) => DailyStatistics {
                date,
                counters: StatCounters {
                    total_requests: as_u64(row.total_requests),
                    detected_attacks: as_u64(row.detected_attacks),
                    sql_injections: as_u64(row.sql_injections),
                    xss_attacks: as_u64(row.xss_attacks),
                    path_traversals: as_u64(row.path_traversals),
                },
            },
            None => DailyStatistics::empty(date),
        })
    }

    async fn get_recent_detections(&self, limit: u64) -> Result<Vec<RecentDetection>, StorageError> {
        let statement = Statement::from_sql_and_values(
            self.db.get_database_backend(),
            RECENT_DETECTIONS,
            vec![Value::from(as_i64(limit))],
        );
        let rows = RecentDetectionRow::find_by_statement(statement)
            .all(&self.db)
            .await
            .map_err(read_failed("load recent detections"))?;
        rows.into_iter()
            .map(RecentDetectionRow::into_recent_detection)
            .collect()
    }

    async fn save_event(&self, event: &SecurityEvent, attack: Option<&AttackEvent>) -> Result<(), StorageError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(write_failed("begin event transaction"))?;
        security_events::ActiveModel {
            event_id: Set(event.event_id.clone()),
            timestamp: Set(event.timestamp),
            event_type: Set(event.event_type.clone()),
            source_ip: Set(event.source_ip.clone()),
            destination_ip: Set(event.destination_ip.clone()),
            description: Set(event.description.clone()),
            payload: Set(event.payload.clone()),
            user_agent: Set(event.user_agent.clone()),
            method: Set(event.method.clone()),
            received_at: Set(format_timestamp(&event.received_at)),
        }
        .insert(&txn)
        .await
        .map_err(write_failed("insert security event"))?;

        if let Some(attack) = attack {
            attack_events::ActiveModel {
                event_id: Set(attack.event_id.clone()),
                source_event_id: Set(attack.source_event_id.clone()),
                timestamp: Set(attack.timestamp),
                attack_type: Set(attack.attack_type.as_str().to_string()),
                source_ip: Set(attack.source_ip.clone()),
                destination_ip: Set(attack.destination_ip.clone()),
                description: Set(attack.description.clone()),
                payload: Set(attack.payload.clone()),
                detected_at: Set(format_timestamp(&attack.detected_at)),
            }
            .insert(&txn)
            .await
            .map_err(write_failed("insert attack event"))?;
        }

        txn.commit().await.map_err(write_failed("commit event"))?;
        Ok(())
    }

    async fn get_recent_events(&self, limit: u64) -> Result<Vec<SecurityEvent>, StorageError> {
        let rows = security_events::Entity::find()
            .order_by_desc(security_events::Column::ReceivedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(read_failed("load recent events"))?;
        rows.into_iter().map(security_event_from_model).collect()
    }

    async fn get_recent_attack_events(&self, limit: u64) -> Result<Vec<AttackEvent>, StorageError> {
        let rows = attack_events::Entity::find()
            .order_by_desc(attack_events::Column::DetectedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(read_failed("load recent attack events"))?;
        rows.into_iter().map(attack_event_from_model).collect()
    }

    async fn count_events(&self) -> Result<u64, StorageError> {
        security_events::Entity::find()
            .count(&self.db)
            .await
            .map_err(read_failed("count events"))
    }

    async fn count_attack_events(&self) -> Result<u64, StorageError> {
        attack_events::Entity::find()
            .count(&self.db)
            .await
            .map_err(read_failed("count attack events"))
    }
}
