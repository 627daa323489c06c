/// Read interface the report and chart code needs from the telemetry store
use crate::database::error::DatabaseError;
use crate::models::{DeviceId, RawSample, Window};

/// Latest sample of one node from `sensor_last`, with its `sensor_node` names
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRow {
    pub sid: DeviceId,
    pub sid_text: Option<String>,
    pub description: Option<String>,
    pub latest: RawSample,
}

/// Read-only queries against the telemetry written by the gateway
///
/// Implementations return rows in no particular order unless stated.
#[allow(async_fn_in_trait)]
pub trait SampleStore {
    async fn node_rows(&self) -> Result<Vec<NodeRow>, DatabaseError>;

    /// Years with data for a node, ascending
    async fn years(&self, sid: DeviceId) -> Result<Vec<i32>, DatabaseError>;

    /// Months of `year` with data for a node, ascending
    async fn months(&self, sid: DeviceId, year: i32) -> Result<Vec<i32>, DatabaseError>;

    /// Days of `year`/`month` with data for a node, ascending
    async fn days(&self, sid: DeviceId, year: i32, month: i32) -> Result<Vec<i32>, DatabaseError>;

    /// Every sample of a node inside the window
    async fn window(&self, sid: DeviceId, window: &Window) -> Result<Vec<RawSample>, DatabaseError>;

    /// A random subset of at most `cap` samples inside the window
    ///
    /// Windows holding `cap` samples or fewer are returned whole.
    async fn sampled_window(
        &self,
        sid: DeviceId,
        window: &Window,
        cap: usize,
    ) -> Result<Vec<RawSample>, DatabaseError>;
}
