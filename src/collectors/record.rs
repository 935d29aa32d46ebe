use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Falcon `counterType`. Tablespace samples are always gauges; `Counter`
/// completes the push schema for other reporters of the same backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CounterType {
    Gauge,
    Counter,
}

/// One sample, serialized in the shape the Falcon push API expects:
///
/// ```json
/// {"endpoint":"agent-01","metric":"TSUsedPercent-PG_DEFAULT","value":"42.17",
///  "timestamp":1760745600,"step":60,"counterType":"GAUGE",
///  "tags":"instance=postgresql://db1:5432/app,service=postgresql,service.type=sql-in-build"}
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricRecord {
    pub endpoint: String,
    pub metric: String,
    pub value: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    pub step: u32,
    pub counter_type: CounterType,
    #[serde(serialize_with = "serialize_tags")]
    pub tags: BTreeMap<String, String>,
}

fn serialize_tags<S: Serializer>(
    tags: &BTreeMap<String, String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let joined = tags
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",");

    serializer.serialize_str(&joined)
}
