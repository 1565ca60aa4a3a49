use std::sync::Arc;

use serde_json::{json, Map, Value};
use tempfile::TempDir;
use vigie::analysis::{AnalysisRequest, Analyzer, AnalyzerSettings};
use vigie::detection::{AttackType, Location, RiskLevel, Subtype};
use vigie::storage::{DatabaseStorage, Storage};

async fn analyzer(dir: &TempDir) -> Arc<Analyzer<DatabaseStorage>> {
    let storage = DatabaseStorage::new_file(dir.path().join("scenarios.sqlite3"), 5)
        .await
        .unwrap();
    Arc::new(
        Analyzer::new(Arc::new(storage), AnalyzerSettings::default())
            .await
            .unwrap(),
    )
}

fn request(url: &str, params: Value) -> AnalysisRequest {
    AnalysisRequest {
        method: "GET".into(),
        url: url.into(),
        params: params.as_object().cloned().unwrap_or_else(Map::new),
        headers: Some(Map::new()),
        sandbox_id: "sandbox-int".into(),
    }
}

#[tokio::test]
async fn scenarios_yield_expected_single_detection() {
    let dir = TempDir::new().unwrap();
    let analyzer = analyzer(&dir).await;

    let cases = [
        (
            "/login",
            json!({"username": "admin' OR 1=1--"}),
            AttackType::SqlInjection,
            Subtype::BooleanBased,
            RiskLevel::Low,
            Location::Param("username".into()),
        ),
        (
            "/search",
            json!({"q": "test' UNION SELECT username, password FROM users--"}),
            AttackType::SqlInjection,
            Subtype::UnionBased,
            RiskLevel::High,
            Location::Param("q".into()),
        ),
        (
            "/user?id=1; DROP TABLE users--",
            json!({}),
            AttackType::SqlInjection,
            Subtype::StackedQueries,
            RiskLevel::Critical,
            Location::Url,
        ),
        (
            "/comment",
            json!({"body": "<script>alert('XSS')</script>"}),
            AttackType::Xss,
            Subtype::ScriptTags,
            RiskLevel::High,
            Location::Param("body".into()),
        ),
        (
            "/download",
            json!({"file": "../../etc/passwd"}),
            AttackType::PathTraversal,
            Subtype::Direct,
            RiskLevel::High,
            Location::Param("file".into()),
        ),
    ];

    for (url, params, attack_type, subtype, risk_level, location) in cases {
        let result = analyzer.analyze(request(url, params)).await.unwrap();
        assert_eq!(result.detections.len(), 1, "{}", url);
        let detection = &result.detections[0];
        assert_eq!(detection.attack_type, attack_type, "{}", url);
        assert_eq!(detection.subtype, subtype, "{}", url);
        assert_eq!(detection.risk_level, risk_level, "{}", url);
        assert_eq!(detection.location, location, "{}", url);
        assert_eq!(result.summary.risk_level, risk_level, "{}", url);
    }

    let safe = analyzer
        .analyze(request("/profile", json!({"name": "normal_input"})))
        .await
        .unwrap();
    assert!(safe.detections.is_empty());
    assert_eq!(safe.summary.risk_level, RiskLevel::Low);
    assert_eq!(safe.summary.recommendation, "request is safe");

    let stats = analyzer.stats_report().await.unwrap();
    let counters = stats.database_stats.counters;
    assert_eq!(counters.total_requests, 6);
    assert_eq!(counters.detected_attacks, 5);
    assert_eq!(counters.sql_injections, 3);
    assert_eq!(counters.xss_attacks, 1);
    assert_eq!(counters.path_traversals, 1);
    assert_eq!(stats.summary.attack_ratio, "83.3%");

    let recent = analyzer.storage().get_recent_detections(10).await.unwrap();
    assert_eq!(recent.len(), 5);
    assert_eq!(recent[0].attack_type, AttackType::PathTraversal);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_analyses_lose_no_statistics() {
    let dir = TempDir::new().unwrap();
    let analyzer = analyzer(&dir).await;

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let analyzer = analyzer.clone();
            tokio::spawn(async move {
                let params = if i % 2 == 0 {
                    json!({"q": "1 UNION SELECT secret"})
                } else {
                    json!({"q": "plain"})
                };
                analyzer.analyze(request("/concurrent", params)).await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stats = analyzer.stats_report().await.unwrap();
    assert_eq!(stats.database_stats.counters.total_requests, 16);
    assert_eq!(stats.database_stats.counters.detected_attacks, 8);
    assert_eq!(stats.database_stats.counters.sql_injections, 8);
    assert_eq!(stats.memory_stats.requests, stats.database_stats.counters);
}
