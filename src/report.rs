//! Request level operations: node list, calendar drill-down, day table and charts
use log::debug;
use thiserror::Error;
use time::{Date, UtcOffset};

use crate::aggregator::{aggregate, Downsampling};
use crate::chart::{self, ChartError};
use crate::database::{DatabaseError, SampleStore};
use crate::decoder::decode;
use crate::models::{DayTable, DeviceId, NodeSummary, TimeSeriesBundle, Window};
use crate::packet::{self, FALLBACK};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Chart(#[from] ChartError),
}

/// Settings shared by every chart request
#[derive(Debug, Clone, Copy)]
pub struct ChartSettings {
    pub utc_offset: UtcOffset,
    pub downsampling: Downsampling,
}

/// A rendered chart together with the series it was drawn from
#[derive(Debug, Clone)]
pub struct RenderedChart {
    pub bundle: TimeSeriesBundle,
    pub png: Vec<u8>,
}

impl RenderedChart {
    pub fn to_html(&self) -> String {
        chart::embed_png(&self.png)
    }
}

/// Latest decoded sample of every node, sorted by node id text
pub async fn list_nodes<S: SampleStore>(store: &S) -> Result<Vec<NodeSummary>, DatabaseError> {
    let mut nodes: Vec<NodeSummary> = store
        .node_rows()
        .await?
        .into_iter()
        .map(|row| NodeSummary {
            sid: row.sid,
            sid_text: row.sid_text.unwrap_or_else(|| row.sid.to_string()),
            description: row.description.unwrap_or_default(),
            latest: decode(&row.latest),
        })
        .collect();
    nodes.sort_by(|a, b| a.sid_text.cmp(&b.sid_text));
    Ok(nodes)
}

/// Every decoded sample of one node on one day, oldest first
pub async fn day_table<S: SampleStore>(
    store: &S,
    sid: DeviceId,
    date: Date,
) -> Result<DayTable, DatabaseError> {
    let mut samples = store.window(sid, &Window::Day(date)).await?;
    samples.sort_by_key(|s| s.timestamp);
    debug!("Decoding {} samples of {} for {}", samples.len(), sid, date);

    let first = samples.first();
    Ok(DayTable {
        sid,
        date,
        logical_id: first.map(|s| s.logical_id),
        info: first.map_or(&FALLBACK, |s| packet::lookup(s.packet_type)),
        rows: samples.iter().map(decode).collect(),
    })
}

/// Aggregate and render the chart of one window
pub async fn render_chart<S: SampleStore>(
    store: &S,
    sid: DeviceId,
    window: Window,
    settings: &ChartSettings,
) -> Result<RenderedChart, ReportError> {
    let bundle = aggregate(
        store,
        sid,
        window,
        settings.utc_offset,
        settings.downsampling,
    )
    .await?;
    let png = chart::render_png(&bundle, settings.utc_offset)?;
    Ok(RenderedChart { bundle, png })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::decoder::tests::sample;
    use crate::models::Field;
    use crate::packet::MagnetState;
    use time::Month;

    // 2024-05-10 00:00:00 UTC
    const DAY_START: i64 = 1_715_299_200;

    fn settings() -> ChartSettings {
        ChartSettings {
            utc_offset: UtcOffset::UTC,
            downsampling: Downsampling::Random,
        }
    }

    fn populated() -> MemoryStore {
        let mut store = MemoryStore::new(UtcOffset::UTC);
        store.add_node(DeviceId(0x0200_0001), "82000001", "door");
        store.add_node(DeviceId(0x0100_0001), "81000001", "shelf");

        for i in 0..3 {
            let mut mag = sample(1, [Some(1.0), None, None, None]);
            mag.timestamp = DAY_START + 3600 * (2 - i);
            mag.status_bits = 0x1000_0000 | ((i as u32) << 24);
            store.push(DeviceId(0x0200_0001), mag);
        }
        let mut cue = sample(5, [Some(0.0), Some(0.0), Some(1.0), None]);
        cue.timestamp = DAY_START + 86_400 * 40;
        cue.event_code = 8;
        store.push(DeviceId(0x0100_0001), cue);
        store
    }

    #[tokio::test]
    async fn nodes_are_sorted_and_decoded() {
        let nodes = list_nodes(&populated()).await.unwrap();
        let names: Vec<_> = nodes.iter().map(|n| n.sid_text.as_str()).collect();
        assert_eq!(names, ["81000001", "82000001"]);
        assert_eq!(nodes[0].description, "shelf");
        assert_eq!(nodes[0].latest.event_label, Some("shake"));
        assert_eq!(nodes[1].latest.magnet_state, Some(MagnetState::NoMagnet));
    }

    #[tokio::test]
    async fn calendar_drill_down() {
        let store = populated();
        let sid = DeviceId(0x0100_0001);
        assert_eq!(store.years(sid).await.unwrap(), vec![2024]);
        assert_eq!(store.months(sid, 2024).await.unwrap(), vec![6]);
        assert_eq!(store.days(sid, 2024, 6).await.unwrap(), vec![19]);
        assert!(store.days(sid, 2024, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn day_table_is_chronological() {
        let date = Date::from_calendar_date(2024, Month::May, 10).unwrap();
        let table = day_table(&populated(), DeviceId(0x0200_0001), date).await.unwrap();
        assert_eq!(table.info.device_name, "MAG");
        assert_eq!(table.logical_id, Some(1));
        let states: Vec<_> = table.rows.iter().map(|r| r.field(0).unwrap().value).collect();
        assert_eq!(
            states,
            [Field::Label("S-pole"), Field::Label("N-pole"), Field::Label("none")]
        );
    }

    #[tokio::test]
    async fn empty_day_table() {
        let date = Date::from_calendar_date(2023, Month::January, 1).unwrap();
        let table = day_table(&populated(), DeviceId(0x0200_0001), date).await.unwrap();
        assert!(table.rows.is_empty());
        assert_eq!(table.info, &FALLBACK);
        assert_eq!(table.logical_id, None);
    }

    #[tokio::test]
    async fn chart_of_latest_window() {
        let store = populated();
        let rendered = render_chart(
            &store,
            DeviceId(0x0200_0001),
            Window::Latest(DAY_START + 7200),
            &settings(),
        )
        .await
        .unwrap();
        assert_eq!(rendered.bundle.timestamps.len(), 3);
        assert_eq!(rendered.bundle.series.len(), 1);
        assert!(rendered.to_html().starts_with("<img src='data:image/png;base64,"));
    }

    #[tokio::test]
    async fn chart_of_empty_window() {
        let date = Date::from_calendar_date(2023, Month::January, 1).unwrap();
        let rendered = render_chart(&populated(), DeviceId(42), Window::Day(date), &settings())
            .await
            .unwrap();
        assert!(rendered.bundle.is_empty());
        assert!(!rendered.png.is_empty());
    }
}
