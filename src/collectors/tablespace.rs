use crate::collectors::{
    config::CollectorConfig,
    connector::{Connection, Connector},
    error::CollectionError,
    pool::ConnectionPool,
    record::{CounterType, MetricRecord},
    registry::EndpointConfig,
};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, info_span, instrument};
use tracing_futures::Instrument as _;

pub const METRIC_PREFIX: &str = "TSUsedPercent-";

/// Value of the `service.type` tag for metrics built into the plugin.
pub const SQL_IN_BUILD: &str = "sql-in-build";

/// Used space per tablespace of the connected database, as a percentage:
/// `(allocated_mb - free_mb) / allocated_mb * 100`, rounded to two decimals
/// and rendered with `to_char(.., '990.99')`.
///
/// Allocated space is the on-disk size of every relation in the tablespace;
/// free space comes from the free space map, so the `pg_freespacemap`
/// extension must be installed and the role needs `pg_stat_scan_tables`.
/// Relations with `reltablespace = 0` count against the database default.
pub const TABLESPACE_USAGE_QUERY: &str = r"
SELECT
  upper(t.spcname) AS tsname,
  to_char(round((u.allocated_mb - u.free_mb) / u.allocated_mb * 100, 2), '990.99') AS percent
FROM (
  SELECT
    coalesce(nullif(c.reltablespace, 0), d.dattablespace) AS spcoid,
    round(sum(pg_relation_size(c.oid)) / (1024 * 1024.0), 2) AS allocated_mb,
    round(sum(f.avail) / (1024 * 1024.0), 2) AS free_mb
  FROM pg_class c
  CROSS JOIN (
    SELECT dattablespace FROM pg_database WHERE datname = current_database()
  ) d
  CROSS JOIN LATERAL (
    SELECT coalesce(sum(fs.avail), 0) AS avail FROM pg_freespace(c.oid::regclass) fs
  ) f
  WHERE c.relkind IN ('r', 'i', 'm', 't')
  GROUP BY 1
) u
JOIN pg_tablespace t ON t.oid = u.spcoid
WHERE u.allocated_mb > 0
ORDER BY 1";

/// One result row; either column may come back NULL from the driver.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TablespaceRow {
    pub name: Option<String>,
    pub percent: Option<String>,
}

impl TablespaceRow {
    pub fn new(name: impl Into<String>, percent: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            percent: Some(percent.into()),
        }
    }
}

/// Runs [`TABLESPACE_USAGE_QUERY`] on every pooled connection and turns each
/// row into a `TSUsedPercent-<NAME>` gauge.
pub struct TablespaceCollector<C: Connector> {
    config: CollectorConfig,
    pool: ConnectionPool<C>,
}

impl<C: Connector> TablespaceCollector<C> {
    pub const fn new(config: CollectorConfig, pool: ConnectionPool<C>) -> Self {
        Self { config, pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &ConnectionPool<C> {
        &self.pool
    }

    #[must_use]
    pub const fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Collect one batch across all endpoints, in endpoint then row order.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError`] if the pool cannot provide its connections
    /// or any query fails; no partial batch is returned and the pool is left
    /// as it is for the next cycle.
    #[instrument(
        skip(self),
        level = "info",
        err,
        fields(collector = "tablespace", otel.kind = "internal")
    )]
    pub async fn collect(&self) -> Result<Vec<MetricRecord>, CollectionError> {
        let connections = self.pool.acquire_all().await?;

        let mut records = Vec::new();

        for (endpoint, handle) in connections {
            let q_span = info_span!(
                "db.query",
                otel.kind = "client",
                db.system = "postgresql",
                db.operation = "SELECT",
                endpoint = %endpoint
            );

            // The guard is dropped before rows are mapped.
            let rows = {
                let mut conn = handle.lock().await;
                conn.fetch_tablespace_usage(TABLESPACE_USAGE_QUERY)
                    .instrument(q_span)
                    .await
            }
            .map_err(|source| CollectionError::Query {
                endpoint: endpoint.to_string(),
                source,
            })?;

            debug!(%endpoint, rows = rows.len(), "tablespace usage fetched");

            for row in rows {
                records.push(self.record(&endpoint, row)?);
            }
        }

        Ok(records)
    }

    fn record(
        &self,
        endpoint: &EndpointConfig,
        row: TablespaceRow,
    ) -> Result<MetricRecord, CollectionError> {
        let malformed = |column: &'static str| CollectionError::MalformedRow {
            endpoint: endpoint.to_string(),
            column,
        };

        let name = row.name.ok_or_else(|| malformed("tsname"))?;
        let percent = row.percent.ok_or_else(|| malformed("percent"))?;

        Ok(MetricRecord {
            endpoint: self.config.hostname.clone(),
            metric: metric_name(&name),
            value: percent.trim().to_string(),
            timestamp: Utc::now().timestamp(),
            step: self.config.step,
            counter_type: CounterType::Gauge,
            tags: self.tags(endpoint),
        })
    }

    fn tags(&self, endpoint: &EndpointConfig) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("service".to_string(), self.config.service.clone()),
            ("service.type".to_string(), SQL_IN_BUILD.to_string()),
            ("instance".to_string(), endpoint.display_address()),
        ])
    }
}

/// `TSUsedPercent-` followed by the trimmed, upper-cased tablespace name.
#[must_use]
pub fn metric_name(tablespace: &str) -> String {
    format!("{METRIC_PREFIX}{}", tablespace.trim().to_uppercase())
}
