//! Decoding and day-chart engine for wireless sensor telemetry
//!
//! Raw rows written by the sensor gateway are decoded per packet type
//! ([`decoder`]), reduced into bounded time series ([`aggregator`]) and drawn
//! as stacked PNG charts ([`chart`]). [`report`] ties these to a
//! [`database::SampleStore`].

pub mod aggregator;
pub mod chart;
pub mod config;
pub mod database;
pub mod decoder;
pub mod models;
pub mod packet;
pub mod report;
pub mod utils;
