//! In-memory [`SampleStore`] used by the tests
use rand::seq::SliceRandom;
use time::UtcOffset;

use crate::database::error::DatabaseError;
use crate::database::store::{NodeRow, SampleStore};
use crate::models::{DeviceId, RawSample, Window};
use crate::utils::local_date;

pub(crate) struct MemoryStore {
    offset: UtcOffset,
    nodes: Vec<(DeviceId, String, String)>,
    rows: Vec<(DeviceId, RawSample)>,
}

impl MemoryStore {
    pub(crate) fn new(offset: UtcOffset) -> Self {
        Self {
            offset,
            nodes: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub(crate) fn add_node(&mut self, sid: DeviceId, sid_text: &str, description: &str) {
        self.nodes
            .push((sid, sid_text.to_string(), description.to_string()));
    }

    pub(crate) fn push(&mut self, sid: DeviceId, sample: RawSample) {
        self.rows.push((sid, sample));
    }

    fn node_samples(&self, sid: DeviceId) -> impl Iterator<Item = &RawSample> {
        self.rows
            .iter()
            .filter(move |(s, _)| *s == sid)
            .map(|(_, sample)| sample)
    }

    fn in_window(&self, sample: &RawSample, window: &Window) -> bool {
        match window {
            Window::Day(date) => local_date(sample.timestamp, self.offset) == *date,
            Window::Latest(_) => match window.ts_range() {
                Some((from, to)) => (from..=to).contains(&sample.timestamp),
                None => false,
            },
        }
    }

    fn distinct<F>(&self, sid: DeviceId, key: F) -> Vec<i32>
    where
        F: Fn(&RawSample) -> Option<i32>,
    {
        let mut out: Vec<i32> = self.node_samples(sid).filter_map(key).collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

impl SampleStore for MemoryStore {
    async fn node_rows(&self) -> Result<Vec<NodeRow>, DatabaseError> {
        let mut sids: Vec<DeviceId> = self.rows.iter().map(|(sid, _)| *sid).collect();
        sids.sort();
        sids.dedup();

        Ok(sids
            .into_iter()
            .filter_map(|sid| {
                let latest = self.node_samples(sid).max_by_key(|s| s.timestamp)?.clone();
                let node = self.nodes.iter().find(|(s, _, _)| *s == sid);
                Some(NodeRow {
                    sid,
                    sid_text: node.map(|(_, text, _)| text.clone()),
                    description: node.map(|(_, _, desc)| desc.clone()),
                    latest,
                })
            })
            .collect())
    }

    async fn years(&self, sid: DeviceId) -> Result<Vec<i32>, DatabaseError> {
        Ok(self.distinct(sid, |s| Some(local_date(s.timestamp, self.offset).year())))
    }

    async fn months(&self, sid: DeviceId, year: i32) -> Result<Vec<i32>, DatabaseError> {
        Ok(self.distinct(sid, |s| {
            let date = local_date(s.timestamp, self.offset);
            (date.year() == year).then(|| u8::from(date.month()) as i32)
        }))
    }

    async fn days(&self, sid: DeviceId, year: i32, month: i32) -> Result<Vec<i32>, DatabaseError> {
        Ok(self.distinct(sid, |s| {
            let date = local_date(s.timestamp, self.offset);
            (date.year() == year && u8::from(date.month()) as i32 == month)
                .then(|| date.day() as i32)
        }))
    }

    async fn window(&self, sid: DeviceId, window: &Window) -> Result<Vec<RawSample>, DatabaseError> {
        Ok(self
            .node_samples(sid)
            .filter(|s| self.in_window(s, window))
            .cloned()
            .collect())
    }

    async fn sampled_window(
        &self,
        sid: DeviceId,
        window: &Window,
        cap: usize,
    ) -> Result<Vec<RawSample>, DatabaseError> {
        let mut rng = rand::thread_rng();
        let mut all = self.window(sid, window).await?;
        all.shuffle(&mut rng);
        all.truncate(cap);
        Ok(all)
    }
}
