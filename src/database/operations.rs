/// Read-only queries against the gateway's PostgreSQL telemetry tables
use log::debug;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Row};

use crate::database::error::DatabaseError;
use crate::database::store::{NodeRow, SampleStore};
use crate::models::{DeviceId, RawSample, Window};

// Column order expected by `sample_from_row`
const SAMPLE_COLUMNS: &str =
    "ts, lid, lqi, pkt_type, value, value1, value2, value3, val_vcc_mv, val_dio, ev_id";

/// A telemetry store backed by one open PostgreSQL client
pub struct PgStore {
    client: Client,
}

impl PgStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn select_window(
        &self,
        sid: DeviceId,
        window: &Window,
        limit: Option<i64>,
    ) -> Result<Vec<RawSample>, DatabaseError> {
        let (year, month, day) = match window {
            Window::Day(date) => (date.year(), u8::from(date.month()) as i32, date.day() as i32),
            Window::Latest(_) => (0, 0, 0),
        };
        let (from, to) = window.ts_range().unwrap_or((0, 0));

        let mut params: Vec<&(dyn ToSql + Sync)> = vec![&sid.0];
        match window {
            Window::Day(_) => {
                params.push(&year);
                params.push(&month);
                params.push(&day);
            }
            Window::Latest(_) => {
                params.push(&from);
                params.push(&to);
            }
        }
        if let Some(cap) = &limit {
            params.push(cap);
        }

        let query = window_query(window, limit.is_some());
        let rows = self.client.query(query.as_str(), &params).await?;
        debug!("Fetched {} samples of {} for {:?}", rows.len(), sid, window);

        rows.iter()
            .map(|row| sample_from_row(row, 0).map_err(DatabaseError::from))
            .collect()
    }

    async fn distinct(
        &self,
        query: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<i32>, DatabaseError> {
        let rows = self.client.query(query, params).await?;
        rows.iter()
            .map(|row| row.try_get::<_, i32>(0).map_err(DatabaseError::from))
            .collect()
    }
}

const YEARS_QUERY: &str = "SELECT DISTINCT year FROM sensor_data WHERE sid = $1 ORDER BY year ASC";
const MONTHS_QUERY: &str =
    "SELECT DISTINCT month FROM sensor_data WHERE sid = $1 AND year = $2 ORDER BY month ASC";
const DAYS_QUERY: &str = "SELECT DISTINCT day FROM sensor_data \
     WHERE sid = $1 AND year = $2 AND month = $3 ORDER BY day ASC";

/// SQL selecting the samples of one window
///
/// Parameters are `sid`, then `year, month, day` for a day window or
/// `from, to` for a latest window, then the cap when `limited`.
fn window_query(window: &Window, limited: bool) -> String {
    let (predicate, next) = match window {
        Window::Day(_) => ("year = $2 AND month = $3 AND day = $4", 5),
        Window::Latest(_) => ("ts BETWEEN $2 AND $3", 4),
    };
    let order = if limited {
        format!("ORDER BY random() LIMIT ${}", next)
    } else {
        "ORDER BY ts ASC".to_string()
    };
    format!(
        "SELECT {} FROM sensor_data WHERE sid = $1 AND {} {}",
        SAMPLE_COLUMNS, predicate, order
    )
}

/// Map the [`SAMPLE_COLUMNS`] starting at column `first` into a sample
fn sample_from_row(row: &Row, first: usize) -> Result<RawSample, tokio_postgres::Error> {
    Ok(RawSample {
        timestamp: row.try_get(first)?,
        logical_id: row.try_get(first + 1)?,
        link_quality: row.try_get(first + 2)?,
        packet_type: row.try_get(first + 3)?,
        values: [
            row.try_get(first + 4)?,
            row.try_get(first + 5)?,
            row.try_get(first + 6)?,
            row.try_get(first + 7)?,
        ],
        supply_voltage_mv: row.try_get(first + 8)?,
        // bitfield is stored as a signed INTEGER
        status_bits: row.try_get::<_, i32>(first + 9)? as u32,
        event_code: row.try_get(first + 10)?,
    })
}

impl SampleStore for PgStore {
    async fn node_rows(&self) -> Result<Vec<NodeRow>, DatabaseError> {
        let query = format!(
            "SELECT l.sid, n.sid_text, n.\"desc\", {} FROM sensor_last l \
             LEFT JOIN sensor_node n ON n.sid = l.sid ORDER BY l.ts DESC",
            SAMPLE_COLUMNS
                .split(", ")
                .map(|c| format!("l.{}", c))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let rows = self.client.query(query.as_str(), &[]).await?;
        debug!("Fetched {} node rows", rows.len());

        rows.iter()
            .map(|row| -> Result<NodeRow, DatabaseError> {
                Ok(NodeRow {
                    sid: DeviceId(row.try_get(0)?),
                    sid_text: row.try_get(1)?,
                    description: row.try_get(2)?,
                    latest: sample_from_row(row, 3)?,
                })
            })
            .collect()
    }

    async fn years(&self, sid: DeviceId) -> Result<Vec<i32>, DatabaseError> {
        self.distinct(YEARS_QUERY, &[&sid.0]).await
    }

    async fn months(&self, sid: DeviceId, year: i32) -> Result<Vec<i32>, DatabaseError> {
        self.distinct(MONTHS_QUERY, &[&sid.0, &year]).await
    }

    async fn days(&self, sid: DeviceId, year: i32, month: i32) -> Result<Vec<i32>, DatabaseError> {
        self.distinct(DAYS_QUERY, &[&sid.0, &year, &month]).await
    }

    async fn window(&self, sid: DeviceId, window: &Window) -> Result<Vec<RawSample>, DatabaseError> {
        self.select_window(sid, window, None).await
    }

    async fn sampled_window(
        &self,
        sid: DeviceId,
        window: &Window,
        cap: usize,
    ) -> Result<Vec<RawSample>, DatabaseError> {
        let cap = i64::try_from(cap).unwrap_or(i64::MAX);
        self.select_window(sid, window, Some(cap)).await
    }
}
