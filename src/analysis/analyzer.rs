//! Detection orchestrator.
//!
//! `Analyzer` runs the full rule sets over a request, scores the result, persists it through
//! the injected `Storage` and keeps the daily statistics current. It also accepts security
//! events and classifies them with the event rule profile.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, SubsecRound, Utc};
use log::{debug, error, info, warn};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::risk;
use super::stats::{MemoryStats, StatsMirror};
use super::types::{
    ratio, AnalysisRequest, AnalysisResult, BatchItem, BatchOutcome, DetectorCounts, EventReceipt,
    EventStats, FailedItem, RequestInfo, StatsReport, StatsSummary,
};
use crate::detection::rules::{self, RuleProfile};
use crate::detection::{Detection, Location, SignatureSet};
use crate::error_handling::types::{AnalysisError, StorageError};
use crate::events::types::{AttackEvent, SecurityEvent, SecurityEventInput};
use crate::events::EventClassifier;
use crate::storage::types::{NewRequest, StatCounters};
use crate::storage::Storage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerSettings {
    /// Total attempts for one statistics upsert, at least 1
    pub stats_retry_attempts: u32,
    /// Base delay, multiplied by the attempt number
    pub stats_retry_backoff: Duration,
    pub event_profile: RuleProfile,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            stats_retry_attempts: 3,
            stats_retry_backoff: Duration::from_millis(50),
            event_profile: RuleProfile::default(),
        }
    }
}

pub struct Analyzer<S: Storage> {
    storage: Arc<S>,
    rule_sets: Vec<SignatureSet>,
    classifier: EventClassifier,
    mirror: StatsMirror,
    settings: AnalyzerSettings,
}

impl<S: Storage> Analyzer<S> {
    /// Compiles the rule sets and rebuilds the statistics mirror from `storage`.
    pub async fn new(storage: Arc<S>, settings: AnalyzerSettings) -> Result<Self, AnalysisError> {
        let rule_sets = rules::load(RuleProfile::Full)?;
        let classifier = EventClassifier::new(settings.event_profile)?;

        let today = Utc::now().date_naive();
        let daily = storage.get_daily_stats(today).await?;
        let events_received = storage.count_events().await?;
        let attack_events = storage.count_attack_events().await?;
        let mirror = StatsMirror::new(MemoryStats {
            date: today,
            requests: daily.counters,
            events_received,
            attack_events,
        });

        info!(
            "Analyzer ready: {} rule sets, event profile {:?}, {} requests recorded today",
            rule_sets.len(),
            settings.event_profile,
            daily.counters.total_requests
        );

        Ok(Self {
            storage,
            rule_sets,
            classifier,
            mirror,
            settings,
        })
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn detectors_loaded(&self) -> usize {
        self.rule_sets.len()
    }

    pub fn memory_stats(&self) -> MemoryStats {
        self.mirror.snapshot()
    }

    /// Detections of a URL and its string parameters, URL first, parameters in given order.
    pub fn detect(&self, url: &str, params: &Map<String, Value>) -> Vec<Detection> {
        let mut detections = self.detect_at(url, Location::Url);
        for (name, value) in params {
            if let Value::String(text) = value {
                detections.extend(self.detect_at(text, Location::Param(name.clone())));
            }
        }
        detections
    }

    fn detect_at(&self, text: &str, location: Location) -> Vec<Detection> {
        self.rule_sets
            .iter()
            .flat_map(|set| set.detect(text))
            .map(|fragment| fragment.at(location.clone()))
            .collect()
    }

    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        request.validate()?;

        let detections = self.detect(&request.url, &request.params);
        let summary = risk::score(&detections);

        let new_request = NewRequest {
            method: request.method,
            url: request.url,
            params: request.params,
            sandbox_id: request.sandbox_id,
            timestamp: Utc::now().trunc_subsecs(6),
        };

        let request_id = self
            .storage
            .save_analysis(&new_request, &detections)
            .await
            .map_err(|e| {
                error!(
                    "Failed to persist {} {} from sandbox {}: {}",
                    new_request.method, new_request.url, new_request.sandbox_id, e
                );
                AnalysisError::Storage(e)
            })?;

        let delta = StatCounters::for_request(&detections);
        self.record_statistics(new_request.timestamp.date_naive(), &delta, request_id)
            .await?;

        if detections.is_empty() {
            debug!("Request {} from sandbox {} is clean", request_id, new_request.sandbox_id);
        } else {
            info!(
                "Request {} ({} {}) from sandbox {}: {} detections, risk {}",
                request_id,
                new_request.method,
                new_request.url,
                new_request.sandbox_id,
                detections.len(),
                summary.risk_level
            );
        }

        Ok(AnalysisResult {
            request_info: RequestInfo {
                request_id,
                params_count: new_request.params.len(),
                method: new_request.method,
                url: new_request.url,
                sandbox_id: new_request.sandbox_id,
                timestamp: new_request.timestamp,
            },
            detections,
            summary,
        })
    }

    async fn record_statistics(
        &self,
        date: NaiveDate,
        delta: &StatCounters,
        request_id: i64,
    ) -> Result<(), AnalysisError> {
        let attempts = self.settings.stats_retry_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.storage.upsert_daily_stats(date, delta).await {
                Ok(()) => {
                    self.mirror.record_request(date, delta);
                    return Ok(());
                }
                Err(e) if attempt < attempts => {
                    warn!(
                        "Statistics update for request {} failed (attempt {}/{}): {}",
                        request_id, attempt, attempts, e
                    );
                    tokio::time::sleep(self.settings.stats_retry_backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        "Statistics update for request {} abandoned after {} attempts: {}",
                        request_id, attempt, e
                    );
                    return Err(AnalysisError::StatisticsUpsert {
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }

    /// Analyzes `requests` one after the other. A failing item never stops the batch.
    pub async fn analyze_batch(&self, requests: Vec<AnalysisRequest>) -> BatchOutcome {
        let total_requests = requests.len();
        let mut results = Vec::with_capacity(total_requests);
        let mut total_detections = 0;
        let mut failed = 0;

        for (index, request) in requests.into_iter().enumerate() {
            match self.analyze(request).await {
                Ok(result) => {
                    total_detections += result.summary.total_detections;
                    results.push(BatchItem::Analyzed(result));
                }
                Err(e) => {
                    warn!("Batch item {} failed: {}", index, e);
                    failed += 1;
                    results.push(BatchItem::Failed(FailedItem::new(index, &e)));
                }
            }
        }

        info!(
            "Batch of {} requests analyzed: {} detections, {} failed",
            total_requests, total_detections, failed
        );

        BatchOutcome {
            total_requests,
            total_detections,
            failed,
            results,
        }
    }

    pub async fn submit_event(
        &self,
        input: SecurityEventInput,
    ) -> Result<EventReceipt, AnalysisError> {
        let received_at = Utc::now().trunc_subsecs(6);
        let event = SecurityEvent::accept(format!("evt-{}", Uuid::new_v4()), input, received_at);
        let classification = self.classifier.classify(&event);

        let attack = classification.attack_type.map(|attack_type| AttackEvent {
            event_id: format!("atk-{}", Uuid::new_v4()),
            source_event_id: event.event_id.clone(),
            timestamp: event.timestamp,
            attack_type,
            source_ip: event.source_ip.clone(),
            destination_ip: event.destination_ip.clone(),
            description: event.description.clone(),
            payload: event.payload.clone(),
            detected_at: received_at,
        });

        self.storage
            .save_event(&event, attack.as_ref())
            .await
            .map_err(|e| {
                error!(
                    "Failed to persist {} event {} from {}: {}",
                    event.event_type, event.event_id, event.source_ip, e
                );
                AnalysisError::Storage(e)
            })?;
        self.mirror.record_event(attack.is_some());

        match &attack {
            Some(attack) => warn!(
                "Attack event {} ({}) from {} to {}",
                attack.event_id, attack.attack_type, attack.source_ip, attack.destination_ip
            ),
            None => debug!("Event {} stored", event.event_id),
        }

        Ok(EventReceipt {
            event,
            classification,
        })
    }

    /// Today's durable statistics with the derived summary and the mirror snapshot.
    pub async fn stats_report(&self) -> Result<StatsReport, StorageError> {
        let database_stats = self.storage.get_daily_stats(Utc::now().date_naive()).await?;
        let memory_stats = self.mirror.snapshot();
        let counters = database_stats.counters;

        Ok(StatsReport {
            memory_stats,
            database_stats,
            summary: StatsSummary {
                total_requests: counters.total_requests,
                total_attacks: counters.detected_attacks,
                attack_ratio: ratio(counters.detected_attacks, counters.total_requests),
                detectors: DetectorCounts {
                    sql_injection: counters.sql_injections,
                    xss: counters.xss_attacks,
                    path_traversal: counters.path_traversals,
                },
            },
            events_stats: EventStats {
                total_events: memory_stats.events_received,
                detected_attacks: memory_stats.attack_events,
                events_attack_ratio: ratio(
                    memory_stats.attack_events,
                    memory_stats.events_received,
                ),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{AttackType, RiskLevel, Subtype};
    use crate::storage::types::{DailyStatistics, RecentDetection};
    use crate::storage::DatabaseStorage;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    async fn temp_storage() -> (TempDir, Arc<DatabaseStorage>) {
        let dir = TempDir::new().unwrap();
        let storage = DatabaseStorage::new_file(dir.path().join("test.sqlite3"), 5)
            .await
            .unwrap();
        (dir, Arc::new(storage))
    }

    async fn analyzer() -> (TempDir, Analyzer<DatabaseStorage>) {
        let (dir, storage) = temp_storage().await;
        let analyzer = Analyzer::new(storage, AnalyzerSettings::default())
            .await
            .unwrap();
        (dir, analyzer)
    }

    fn request(url: &str, params: Value) -> AnalysisRequest {
        let params = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        AnalysisRequest {
            method: "GET".into(),
            url: url.into(),
            params,
            headers: None,
            sandbox_id: "sandbox-1".into(),
        }
    }

    /// Delegates to a real database but can fail statistics upserts and selected requests.
    struct FaultyStorage {
        inner: DatabaseStorage,
        upsert_failures: AtomicU32,
        upsert_calls: AtomicU32,
        reject_url: Option<String>,
    }

    impl Storage for FaultyStorage {
        async fn save_request(&self, request: &NewRequest) -> Result<i64, StorageError> {
            self.inner.save_request(request).await
        }

        async fn save_detections(
            &self,
            request_id: i64,
            detections: &[Detection],
        ) -> Result<(), StorageError> {
            self.inner.save_detections(request_id, detections).await
        }

        async fn save_analysis(
            &self,
            request: &NewRequest,
            detections: &[Detection],
        ) -> Result<i64, StorageError> {
            if self.reject_url.as_deref() == Some(request.url.as_str()) {
                return Err(StorageError::WriteFailed);
            }
            self.inner.save_analysis(request, detections).await
        }

        async fn upsert_daily_stats(
            &self,
            date: NaiveDate,
            delta: &StatCounters,
        ) -> Result<(), StorageError> {
            self.upsert_calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.upsert_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.upsert_failures.store(remaining - 1, Ordering::SeqCst);
                return Err(StorageError::WriteFailed);
            }
            self.inner.upsert_daily_stats(date, delta).await
        }

        async fn get_daily_stats(&self, date: NaiveDate) -> Result<DailyStatistics, StorageError> {
            self.inner.get_daily_stats(date).await
        }

        async fn get_recent_detections(
            &self,
            limit: u64,
        ) -> Result<Vec<RecentDetection>, StorageError> {
            self.inner.get_recent_detections(limit).await
        }

        async fn save_event(
            &self,
            event: &SecurityEvent,
            attack: Option<&AttackEvent>,
        ) -> Result<(), StorageError> {
            self.inner.save_event(event, attack).await
        }

        async fn get_recent_events(&self, limit: u64) -> Result<Vec<SecurityEvent>, StorageError> {
            self.inner.get_recent_events(limit).await
        }

        async fn get_recent_attack_events(
            &self,
            limit: u64,
        ) -> Result<Vec<AttackEvent>, StorageError> {
            self.inner.get_recent_attack_events(limit).await
        }

        async fn count_events(&self) -> Result<u64, StorageError> {
            self.inner.count_events().await
        }

        async fn count_attack_events(&self) -> Result<u64, StorageError> {
            self.inner.count_attack_events().await
        }
    }

    async fn faulty(upsert_failures: u32, reject_url: Option<&str>) -> (TempDir, Analyzer<FaultyStorage>) {
        let dir = TempDir::new().unwrap();
        let inner = DatabaseStorage::new_file(dir.path().join("faulty.sqlite3"), 5)
            .await
            .unwrap();
        let storage = Arc::new(FaultyStorage {
            inner,
            upsert_failures: AtomicU32::new(upsert_failures),
            upsert_calls: AtomicU32::new(0),
            reject_url: reject_url.map(str::to_string),
        });
        let settings = AnalyzerSettings {
            stats_retry_attempts: 3,
            stats_retry_backoff: Duration::from_millis(1),
            ..Default::default()
        };
        let analyzer = Analyzer::new(storage, settings).await.unwrap();
        (dir, analyzer)
    }

    #[tokio::test]
    async fn test_boolean_based_parameter() {
        let (_dir, analyzer) = analyzer().await;
        let result = analyzer
            .analyze(request("/login", json!({"username": "admin' OR 1=1--"})))
            .await
            .unwrap();

        assert_eq!(result.detections.len(), 1);
        let detection = &result.detections[0];
        assert_eq!(detection.attack_type, AttackType::SqlInjection);
        assert_eq!(detection.subtype, Subtype::BooleanBased);
        assert_eq!(detection.risk_level, RiskLevel::Low);
        assert_eq!(detection.location, Location::Param("username".into()));
        assert_eq!(result.summary.risk_level, RiskLevel::Low);
    }

    #[tokio::test]
    async fn test_union_based_parameter() {
        let (_dir, analyzer) = analyzer().await;
        let result = analyzer
            .analyze(request(
                "/search",
                json!({"q": "test' UNION SELECT username, password FROM users--"}),
            ))
            .await
            .unwrap();

        assert_eq!(result.detections.len(), 1);
        assert_eq!(result.detections[0].subtype, Subtype::UnionBased);
        assert_eq!(result.detections[0].risk_level, RiskLevel::High);
    }

    #[tokio::test]
    async fn test_stacked_query_in_url() {
        let (_dir, analyzer) = analyzer().await;
        let result = analyzer
            .analyze(request("/user?id=1; DROP TABLE users--", json!({})))
            .await
            .unwrap();

        assert_eq!(result.detections.len(), 1);
        assert_eq!(result.detections[0].subtype, Subtype::StackedQueries);
        assert_eq!(result.detections[0].location, Location::Url);
        assert_eq!(result.summary.risk_level, RiskLevel::Critical);
        assert_eq!(result.summary.recommendation, "use parameterized queries");
    }

    #[tokio::test]
    async fn test_script_tag_and_traversal() {
        let (_dir, analyzer) = analyzer().await;
        let result = analyzer
            .analyze(request(
                "/page",
                json!({"comment": "<script>alert('XSS')</script>", "file": "../../etc/passwd"}),
            ))
            .await
            .unwrap();

        let kinds: Vec<(AttackType, Subtype)> = result
            .detections
            .iter()
            .map(|d| (d.attack_type, d.subtype))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (AttackType::Xss, Subtype::ScriptTags),
                (AttackType::PathTraversal, Subtype::Direct),
            ]
        );
        assert_eq!(result.summary.risk_level, RiskLevel::High);
        assert_eq!(
            result.summary.recommendation,
            "escape output; validate path inputs"
        );
    }

    #[tokio::test]
    async fn test_clean_request_is_safe_and_counted() {
        let (_dir, analyzer) = analyzer().await;
        let result = analyzer
            .analyze(request("/home", json!({"name": "normal_input", "page": 2})))
            .await
            .unwrap();

        assert!(result.detections.is_empty());
        assert_eq!(result.summary.risk_level, RiskLevel::Low);
        assert_eq!(result.summary.recommendation, risk::SAFE_RECOMMENDATION);
        assert_eq!(result.request_info.params_count, 2);

        let report = analyzer.stats_report().await.unwrap();
        assert_eq!(report.database_stats.counters.total_requests, 1);
        assert_eq!(report.database_stats.counters.detected_attacks, 0);
        assert_eq!(report.summary.attack_ratio, "0.0%");
        assert_eq!(report.memory_stats.requests, report.database_stats.counters);
    }

    #[tokio::test]
    async fn test_non_string_params_are_skipped() {
        let (_dir, analyzer) = analyzer().await;
        let detections = analyzer.detect(
            "/",
            json!({"nested": {"q": "' OR 1=1"}, "list": ["<script>"], "n": 1})
                .as_object()
                .unwrap(),
        );
        assert!(detections.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_input_has_no_side_effects() {
        let (_dir, analyzer) = analyzer().await;
        let mut bad = request("/x", json!({}));
        bad.sandbox_id = " ".into();

        let err = analyzer.analyze(bad).await.unwrap_err();
        assert!(err.is_client_error());
        assert!(analyzer.storage().get_recent_detections(10).await.unwrap().is_empty());
        let stats = analyzer.stats_report().await.unwrap();
        assert_eq!(stats.database_stats.counters.total_requests, 0);
    }

    #[tokio::test]
    async fn test_result_matches_persisted_rows() {
        let (_dir, analyzer) = analyzer().await;
        let result = analyzer
            .analyze(request("/a", json!({"q": "1 UNION SELECT 2"})))
            .await
            .unwrap();

        let recent = analyzer.storage().get_recent_detections(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].timestamp, result.request_info.timestamp);
        assert_eq!(recent[0].subtype, Subtype::UnionBased);
        assert_eq!(recent[0].sandbox_id, "sandbox-1");
    }

    #[tokio::test]
    async fn test_stats_upsert_is_retried() {
        let (_dir, analyzer) = faulty(2, None).await;
        analyzer
            .analyze(request("/a", json!({"q": "<script>"})))
            .await
            .unwrap();

        assert_eq!(analyzer.storage().upsert_calls.load(Ordering::SeqCst), 3);
        let report = analyzer.stats_report().await.unwrap();
        assert_eq!(report.database_stats.counters.total_requests, 1);
        assert_eq!(report.database_stats.counters.xss_attacks, 1);
        assert_eq!(report.memory_stats.requests.total_requests, 1);
    }

    #[tokio::test]
    async fn test_stats_upsert_gives_up() {
        let (_dir, analyzer) = faulty(10, None).await;
        let err = analyzer
            .analyze(request("/a", json!({})))
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::StatisticsUpsert { attempts: 3, .. }));
        assert!(!err.is_client_error());
        assert_eq!(analyzer.memory_stats().requests.total_requests, 0);
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let (_dir, analyzer) = faulty(0, Some("/boom")).await;
        let mut blank = request("/x", json!({}));
        blank.method = String::new();

        let outcome = analyzer
            .analyze_batch(vec![
                request("/a", json!({"q": "' OR 1=1"})),
                request("/boom", json!({})),
                blank,
                request("/b", json!({"f": "../x", "s": "<svg onload=1>"})),
            ])
            .await;

        assert_eq!(outcome.total_requests, 4);
        assert_eq!(outcome.failed, 2);
        assert_eq!(outcome.results.len(), 4);
        assert!(matches!(outcome.results[0], BatchItem::Analyzed(_)));
        assert!(matches!(&outcome.results[1], BatchItem::Failed(item) if item.index == 1));
        assert!(matches!(&outcome.results[2], BatchItem::Failed(item) if item.index == 2));
        let last = match &outcome.results[3] {
            BatchItem::Analyzed(result) => result,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(
            outcome.total_detections,
            1 + last.summary.total_detections
        );
        let stats = analyzer.stats_report().await.unwrap();
        assert_eq!(stats.database_stats.counters.total_requests, 2);
    }

    #[tokio::test]
    async fn test_event_attack_is_recorded() {
        let (_dir, analyzer) = analyzer().await;
        let receipt = analyzer
            .submit_event(SecurityEventInput {
                timestamp: 1_700_000_000.25,
                event_type: "http_request".into(),
                source_ip: "198.51.100.4".into(),
                destination_ip: "10.0.0.2".into(),
                description: "login attempt".into(),
                payload: Some("user=admin' union select 1".into()),
                user_agent: Some("curl/8.0".into()),
                method: "POST".into(),
            })
            .await
            .unwrap();

        assert!(receipt.event.event_id.starts_with("evt-"));
        assert!(receipt.classification.is_attack);
        assert_eq!(receipt.classification.attack_type, Some(AttackType::SqlInjection));

        let attacks = analyzer.storage().get_recent_attack_events(10).await.unwrap();
        assert_eq!(attacks.len(), 1);
        assert!(attacks[0].event_id.starts_with("atk-"));
        assert_eq!(attacks[0].source_event_id, receipt.event.event_id);

        let report = analyzer.stats_report().await.unwrap();
        assert_eq!(report.events_stats.total_events, 1);
        assert_eq!(report.events_stats.detected_attacks, 1);
        assert_eq!(report.events_stats.events_attack_ratio, "100.0%");
    }

    #[tokio::test]
    async fn test_mirror_is_rebuilt_from_store() {
        let (_dir, storage) = temp_storage().await;
        {
            let first = Analyzer::new(storage.clone(), AnalyzerSettings::default())
                .await
                .unwrap();
            first
                .analyze(request("/a", json!({"q": "<script>"})))
                .await
                .unwrap();
            first
                .submit_event(SecurityEventInput {
                    timestamp: 1.0,
                    event_type: "dns".into(),
                    source_ip: "10.0.0.1".into(),
                    destination_ip: "10.0.0.53".into(),
                    description: "lookup".into(),
                    payload: None,
                    user_agent: None,
                    method: "GET".into(),
                })
                .await
                .unwrap();
        }

        let second = Analyzer::new(storage, AnalyzerSettings::default())
            .await
            .unwrap();
        let snapshot = second.memory_stats();
        assert_eq!(snapshot.requests.total_requests, 1);
        assert_eq!(snapshot.requests.xss_attacks, 1);
        assert_eq!(snapshot.events_received, 1);
        assert_eq!(snapshot.attack_events, 0);
    }
}
