/// Reduces a day of samples into aligned, bounded series for charting
use log::debug;
use std::cmp::Ordering;
use std::str::FromStr;
use time::{Date, UtcOffset};

use crate::database::{DatabaseError, SampleStore};
use crate::models::{DeviceId, RawSample, Series, TimeSeriesBundle, Window};
use crate::packet::{self, FALLBACK};
use crate::utils::local_date;

/// Upper bound on the samples drawn into one chart
pub const SAMPLE_CAP: usize = 1024;

/// Number of value columns that get a chart panel, `value3` is never charted
const CHARTED_SLOTS: usize = 3;

/// How a window holding more than [`SAMPLE_CAP`] samples is reduced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Downsampling {
    /// Random subset drawn by the store, differs between calls above the cap
    #[default]
    Random,
    /// Evenly spaced samples of the full window, reproducible
    Stride,
}

impl FromStr for Downsampling {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(Downsampling::Random),
            "stride" => Ok(Downsampling::Stride),
            other => Err(format!("unknown downsampling '{}', expected random or stride", other)),
        }
    }
}

/// Calendar date a window is charted under
pub fn window_date(window: &Window, offset: UtcOffset) -> Date {
    match *window {
        Window::Day(date) => date,
        Window::Latest(ts) => local_date(ts, offset),
    }
}

/// Collect the series of one node over `window`
///
/// With [`Downsampling::Random`] the output is not deterministic once the
/// window holds more than [`SAMPLE_CAP`] samples: two calls may chart
/// different subsets. Smaller windows are always charted in full.
pub async fn aggregate<S: SampleStore>(
    store: &S,
    sid: DeviceId,
    window: Window,
    offset: UtcOffset,
    strategy: Downsampling,
) -> Result<TimeSeriesBundle, DatabaseError> {
    let samples = match strategy {
        Downsampling::Random => store.sampled_window(sid, &window, SAMPLE_CAP).await?,
        Downsampling::Stride => {
            let mut all = store.window(sid, &window).await?;
            all.sort_by(chronological);
            stride_select(all, SAMPLE_CAP)
        }
    };
    debug!(
        "Aggregating {} samples of {} ({:?}, {:?})",
        samples.len(),
        sid,
        window,
        strategy
    );

    Ok(build_bundle(sid, window_date(&window, offset), samples))
}

/// Order samples by time, ties broken on the remaining fields so equal
/// inputs always produce equal output
fn chronological(a: &RawSample, b: &RawSample) -> Ordering {
    a.timestamp
        .cmp(&b.timestamp)
        .then(a.packet_type.cmp(&b.packet_type))
        .then(a.logical_id.cmp(&b.logical_id))
        .then(a.link_quality.cmp(&b.link_quality))
        .then_with(|| {
            a.values
                .iter()
                .zip(b.values.iter())
                .map(|(x, y)| match (x, y) {
                    (Some(x), Some(y)) => x.total_cmp(y),
                    _ => x.is_some().cmp(&y.is_some()),
                })
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        })
        .then(a.supply_voltage_mv.cmp(&b.supply_voltage_mv))
        .then(a.status_bits.cmp(&b.status_bits))
        .then(a.event_code.cmp(&b.event_code))
}

/// Keep `cap` evenly spaced items, first item always kept
pub fn stride_select<T>(items: Vec<T>, cap: usize) -> Vec<T> {
    let n = items.len();
    if n <= cap {
        return items;
    }
    let mut keep = (0..cap).map(|k| k * n / cap).peekable();
    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| {
            if keep.peek() == Some(&i) {
                keep.next();
                Some(item)
            } else {
                None
            }
        })
        .collect()
}

/// Sort the selection and split it into per-column series
///
/// The device schema comes from the earliest sample. Series without a single
/// value are left out.
pub fn build_bundle(sid: DeviceId, date: Date, mut samples: Vec<RawSample>) -> TimeSeriesBundle {
    samples.sort_by(chronological);

    let first = samples.first();
    let info = first.map_or(&FALLBACK, |s| packet::lookup(s.packet_type));

    let series = (0..CHARTED_SLOTS)
        .filter_map(|slot| {
            let values: Vec<Option<f64>> = samples.iter().map(|s| s.values[slot]).collect();
            if values.iter().all(Option::is_none) {
                debug!("Dropping empty series {} of {}", info.labels[slot], sid);
                return None;
            }
            Some(Series {
                slot,
                label: info.labels[slot],
                values,
            })
        })
        .collect();

    TimeSeriesBundle {
        sid,
        date,
        packet_type: first.map(|s| s.packet_type),
        logical_id: first.map(|s| s.logical_id),
        info,
        timestamps: samples.iter().map(|s| s.timestamp).collect(),
        series,
    }
}
