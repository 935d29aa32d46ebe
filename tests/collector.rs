use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use ts_exporter::collectors::{
    CollectionError, CollectorConfig, ConnectionPool, ConnectionState, CounterType,
    MetricRecord, TablespaceCollector, TablespaceRow,
};

mod common;

use common::{FakeConnector, endpoint, registry};

fn collector(hosts: &[&str], connector: FakeConnector) -> TablespaceCollector<FakeConnector> {
    TablespaceCollector::new(
        CollectorConfig::new("postgresql", "agent-01", 60),
        ConnectionPool::new(registry(hosts), connector),
    )
}

fn without_timestamps(records: &[MetricRecord]) -> Vec<MetricRecord> {
    records
        .iter()
        .cloned()
        .map(|mut r| {
            r.timestamp = 0;
            r
        })
        .collect()
}

#[tokio::test]
async fn test_collect_maps_rows_to_records() -> Result<()> {
    let connector = FakeConnector::new();
    connector.state.set_rows(
        "a",
        vec![
            TablespaceRow::new("TS1", " 55.00"),
            TablespaceRow::new("TS2", " 99.99"),
        ],
    );
    let collector = collector(&["a"], connector);

    let before = Utc::now().timestamp();
    let records = collector.collect().await?;
    let after = Utc::now().timestamp();

    assert_eq!(records.len(), 2);

    let first = records.first().expect("first record");
    let second = records.get(1).expect("second record");

    assert_eq!(first.metric, "TSUsedPercent-TS1");
    assert_eq!(first.value, "55.00");
    assert_eq!(second.metric, "TSUsedPercent-TS2");
    assert_eq!(second.value, "99.99");

    for record in &records {
        assert_eq!(record.counter_type, CounterType::Gauge);
        assert_eq!(record.endpoint, "agent-01");
        assert_eq!(record.step, 60);
        assert!(record.timestamp >= before && record.timestamp <= after);
        assert_eq!(
            record.tags.get("service").map(String::as_str),
            Some("postgresql")
        );
        assert_eq!(
            record.tags.get("service.type").map(String::as_str),
            Some("sql-in-build")
        );
        assert_eq!(
            record.tags.get("instance").map(String::as_str),
            Some("postgresql://a:5432/app")
        );
    }

    assert!(first.timestamp <= second.timestamp);

    Ok(())
}

#[tokio::test]
async fn test_collect_normalizes_tablespace_names() -> Result<()> {
    let connector = FakeConnector::new();
    connector
        .state
        .set_rows("a", vec![TablespaceRow::new("  pg_default ", "  3.10")]);

    let records = collector(&["a"], connector).collect().await?;

    let record = records.first().expect("one record");
    assert_eq!(record.metric, "TSUsedPercent-PG_DEFAULT");
    assert_eq!(record.value, "3.10");

    Ok(())
}

#[tokio::test]
async fn test_collect_preserves_endpoint_then_row_order() -> Result<()> {
    let connector = FakeConnector::new();
    connector.state.set_rows(
        "b",
        vec![
            TablespaceRow::new("B1", "1.00"),
            TablespaceRow::new("B2", "2.00"),
        ],
    );
    connector
        .state
        .set_rows("a", vec![TablespaceRow::new("A1", "3.00")]);

    let records = collector(&["b", "a"], connector).collect().await?;

    let metrics: Vec<&str> = records.iter().map(|r| r.metric.as_str()).collect();
    assert_eq!(
        metrics,
        vec!["TSUsedPercent-B1", "TSUsedPercent-B2", "TSUsedPercent-A1"]
    );

    Ok(())
}

#[tokio::test]
async fn test_query_failure_aborts_whole_cycle() -> Result<()> {
    let connector = FakeConnector::new();
    connector
        .state
        .set_rows("a", vec![TablespaceRow::new("A1", "3.00")]);
    connector.state.fail_query("b");
    let collector = collector(&["a", "b"], connector);

    let err = collector.collect().await.unwrap_err();
    assert!(
        matches!(err, CollectionError::Query { ref endpoint, .. } if endpoint.contains("b:5432"))
    );

    // Connections are left for the next cycle.
    assert_eq!(collector.pool().state(&endpoint("a")), ConnectionState::Open);
    assert_eq!(collector.pool().state(&endpoint("b")), ConnectionState::Open);

    Ok(())
}

#[tokio::test]
async fn test_connection_failure_is_a_collection_error() -> Result<()> {
    let connector = FakeConnector::new();
    connector.state.fail_connect("a", true);
    let state = Arc::clone(&connector.state);
    let collector = collector(&["a"], connector);

    let err = collector.collect().await.unwrap_err();
    assert!(matches!(err, CollectionError::Connection(_)));

    // The next cycle heals the pool.
    state.fail_connect("a", false);
    state.set_rows("a", vec![TablespaceRow::new("A1", "3.00")]);
    assert_eq!(collector.collect().await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_null_column_is_malformed_row() -> Result<()> {
    let connector = FakeConnector::new();
    connector.state.set_rows(
        "a",
        vec![TablespaceRow {
            name: Some("TS1".to_string()),
            percent: None,
        }],
    );

    let err = collector(&["a"], connector).collect().await.unwrap_err();
    assert!(matches!(
        err,
        CollectionError::MalformedRow {
            column: "percent",
            ..
        }
    ));

    Ok(())
}

#[tokio::test]
async fn test_collect_is_repeatable() -> Result<()> {
    let connector = FakeConnector::new();
    let state = Arc::clone(&connector.state);
    connector.state.set_rows(
        "a",
        vec![
            TablespaceRow::new("TS1", "55.00"),
            TablespaceRow::new("TS2", "99.99"),
        ],
    );
    connector
        .state
        .set_rows("b", vec![TablespaceRow::new("TS3", "10.00")]);
    let collector = collector(&["a", "b"], connector);

    let first = collector.collect().await?;
    let second = collector.collect().await?;

    assert_eq!(without_timestamps(&first), without_timestamps(&second));
    assert_eq!(state.connects(), vec!["a", "b"]);

    Ok(())
}

#[tokio::test]
async fn test_endpoint_without_rows_yields_nothing() -> Result<()> {
    let records = collector(&["a"], FakeConnector::new()).collect().await?;
    assert!(records.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_repeated_endpoint_is_collected_once() -> Result<()> {
    let connector = FakeConnector::new();
    let state = Arc::clone(&connector.state);
    state.set_rows("a", vec![TablespaceRow::new("TS1", "55.00")]);

    let records = collector(&["a", "a"], connector).collect().await?;

    let metrics: Vec<&str> = records.iter().map(|r| r.metric.as_str()).collect();
    assert_eq!(metrics, vec!["TSUsedPercent-TS1"]);
    assert_eq!(state.connects(), vec!["a"]);

    Ok(())
}
