//! Storage Trait
//!
//! This module defines the `Storage` trait, the single entry point for every durable read and
//! write of the detection engine.
//!
//! Implementors of this trait are responsible for:
//! - Persisting analyzed requests together with their detections, atomically
//! - Maintaining per-day statistics counters without losing concurrent increments
//! - Serving the recency-ordered reporting queries
//! - Persisting security events and the attacks derived from them
//!
//! All methods return a `Result` to handle potential storage errors.

use std::future::Future;

use chrono::NaiveDate;

use crate::detection::Detection;
use crate::error_handling::types::StorageError;
use crate::events::types::{AttackEvent, SecurityEvent};
use crate::storage::types::{DailyStatistics, NewRequest, RecentDetection, StatCounters};

pub trait Storage: Send + Sync {
    /// Saves a request and returns its identifier. Identifiers increase monotonically.
    fn save_request(
        &self,
        request: &NewRequest,
    ) -> impl Future<Output = Result<i64, StorageError>> + Send;

    /// Saves detections of an already stored request. Either all rows are written or none.
    fn save_detections(
        &self,
        request_id: i64,
        detections: &[Detection],
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Saves a request and its detections as one durable unit.
    fn save_analysis(
        &self,
        request: &NewRequest,
        detections: &[Detection],
    ) -> impl Future<Output = Result<i64, StorageError>> + Send;

    /// Adds `delta` to the counters of `date`, creating the row if absent.
    fn upsert_daily_stats(
        &self,
        date: NaiveDate,
        delta: &StatCounters,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Counters of `date`, all zero when nothing was recorded that day.
    fn get_daily_stats(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<DailyStatistics, StorageError>> + Send;

    fn get_recent_detections(
        &self,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<RecentDetection>, StorageError>> + Send;

    /// Saves an event and, when it was classified as an attack, the derived attack event.
    fn save_event(
        &self,
        event: &SecurityEvent,
        attack: Option<&AttackEvent>,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn get_recent_events(
        &self,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<SecurityEvent>, StorageError>> + Send;

    fn get_recent_attack_events(
        &self,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<AttackEvent>, StorageError>> + Send;

    fn count_events(&self) -> impl Future<Output = Result<u64, StorageError>> + Send;

    fn count_attack_events(&self) -> impl Future<Output = Result<u64, StorageError>> + Send;
}
