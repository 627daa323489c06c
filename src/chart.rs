/// Stacked day charts rendered to PNG
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, RgbImage};
use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{register_font, FontStyle};
use std::fmt;
use std::io::Cursor;
use std::ops::Range;
use std::path::Path;
use thiserror::Error;
use time::UtcOffset;

use crate::models::{Series, TimeSeriesBundle};
use crate::utils::{format_date, format_hour_minute};

pub const CHART_WIDTH: u32 = 500;
pub const TITLE_HEIGHT: u32 = 40;
pub const PANEL_HEIGHT: u32 = 320;

const PANEL_COLORS: [RGBColor; 3] = [RED, GREEN, BLUE];
const LABEL_FONT_SIZE: f64 = 11.0;
const TITLE_FONT_SIZE: f64 = 16.0;

static FONT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Drawing error: {0}")]
    Drawing(String),
    #[error("PNG encoding error: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Font error: {0}")]
    Font(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Pixel buffer does not match {0}x{1}")]
    Buffer(u32, u32),
}

fn drawing<E: fmt::Display>(e: E) -> ChartError {
    ChartError::Drawing(e.to_string())
}

/// Load the TTF used for titles, axes and legends
///
/// Only the first successful call has an effect. Without a font the charts
/// are still rendered, just without any text.
pub fn register_font_file(path: &Path) -> Result<(), ChartError> {
    FONT.get_or_try_init(|| {
        let bytes: &'static [u8] = Box::leak(std::fs::read(path)?.into_boxed_slice());
        for style in [FontStyle::Normal, FontStyle::Bold] {
            register_font(FontFamily::SansSerif.as_str(), style, bytes)
                .map_err(|_| ChartError::Font("InvalidFont".to_string()))?;
        }
        info!("Chart font loaded from {}", path.display());
        Ok(())
    })
    .map(|_| ())
}

/// Title shown above all panels: `SID - YYYY/MM/DD - device`
pub fn chart_title(bundle: &TimeSeriesBundle) -> String {
    format!(
        "{} - {} - {}",
        bundle.sid,
        format_date(bundle.date),
        bundle.device_label()
    )
}

/// Render one panel per series, stacked top to bottom, as a PNG image
///
/// The figure grows with the number of series. A bundle without series gives
/// a title-only image.
pub fn render_png(bundle: &TimeSeriesBundle, offset: UtcOffset) -> Result<Vec<u8>, ChartError> {
    let panels = bundle.series.len();
    let height = TITLE_HEIGHT + PANEL_HEIGHT * panels as u32;
    let mut pixels = vec![0u8; (CHART_WIDTH * height * 3) as usize];

    {
        let root = BitMapBackend::with_buffer(&mut pixels, (CHART_WIDTH, height)).into_drawing_area();
        root.fill(&WHITE).map_err(drawing)?;

        let (title_area, body) = root.split_vertically(TITLE_HEIGHT);
        draw_title(&title_area, &chart_title(bundle));

        if panels > 0 {
            let x_range = time_range(&bundle.timestamps);
            let areas = body.split_evenly((panels, 1));
            for (area, series) in areas.iter().zip(&bundle.series) {
                draw_panel(area, &bundle.timestamps, series, x_range.clone(), offset)?;
            }
        }

        root.present().map_err(drawing)?;
    }
    debug!("Rendered {} panel chart for {}", panels, bundle.sid);

    encode_png(pixels, CHART_WIDTH, height)
}

/// Wrap PNG bytes in an inline `<img>` tag
pub fn embed_png(png: &[u8]) -> String {
    format!("<img src='data:image/png;base64,{}'/>", STANDARD.encode(png))
}

fn draw_title(area: &DrawingArea<BitMapBackend<'_>, Shift>, title: &str) {
    let (w, h) = area.dim_in_pixel();
    let style = TextStyle::from(FontDesc::new(
        FontFamily::SansSerif,
        TITLE_FONT_SIZE,
        FontStyle::Normal,
    ))
    .pos(Pos::new(HPos::Center, VPos::Center));

    if let Err(e) = area.draw_text(title, &style, (w as i32 / 2, h as i32 / 2)) {
        warn!("Chart title not drawn: {}", e);
    }
}

fn draw_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    timestamps: &[i64],
    series: &Series,
    x_range: Range<f64>,
    offset: UtcOffset,
) -> Result<(), ChartError> {
    let color = PANEL_COLORS[series.slot % PANEL_COLORS.len()];
    let label_font = FontDesc::new(FontFamily::SansSerif, LABEL_FONT_SIZE, FontStyle::Normal);

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(24)
        .y_label_area_size(48)
        .build_cartesian_2d(x_range, value_range(&series.values))
        .map_err(drawing)?;

    // Axis text needs a font, the curve does not
    if let Err(e) = chart
        .configure_mesh()
        .x_labels(6)
        .y_labels(6)
        .label_style(label_font.clone())
        .x_label_formatter(&|t| format_hour_minute(*t as i64, offset))
        .draw()
    {
        debug!("Axis of {} not fully drawn: {}", series.label, e);
    }

    for (i, run) in runs(timestamps, &series.values).into_iter().enumerate() {
        let drawn = chart
            .draw_series(LineSeries::new(run, ShapeStyle::from(&color).stroke_width(1)))
            .map_err(drawing)?;
        if i == 0 {
            drawn.label(series.label).legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], ShapeStyle::from(&color).stroke_width(2))
            });
        }
    }

    if let Err(e) = chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .label_font(label_font)
        .draw()
    {
        debug!("Legend of {} not drawn: {}", series.label, e);
    }

    Ok(())
}

/// Split a series into the connected runs between absent values
fn runs(timestamps: &[i64], values: &[Option<f64>]) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (ts, value) in timestamps.iter().zip(values) {
        match value {
            Some(v) if v.is_finite() => current.push((*ts as f64, *v)),
            _ => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn time_range(timestamps: &[i64]) -> Range<f64> {
    let min = timestamps.iter().min().copied().unwrap_or(0) as f64;
    let max = timestamps.iter().max().copied().unwrap_or(0) as f64;
    if max > min {
        min..max
    } else {
        (min - 60.0)..(max + 60.0)
    }
}

fn value_range(values: &[Option<f64>]) -> Range<f64> {
    let (min, max) = values
        .iter()
        .flatten()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    if !min.is_finite() {
        return 0.0..1.0;
    }
    let pad = if max > min { (max - min) * 0.05 } else { 1.0 };
    (min - pad)..(max + pad)
}

fn encode_png(pixels: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, ChartError> {
    let image = RgbImage::from_raw(width, height, pixels).ok_or(ChartError::Buffer(width, height))?;
    let mut out = Vec::new();
    image.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeviceId;
    use crate::packet::{lookup, FALLBACK};
    use time::{Date, Month};

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn png_size(png: &[u8]) -> (u32, u32) {
        let w = u32::from_be_bytes([png[16], png[17], png[18], png[19]]);
        let h = u32::from_be_bytes([png[20], png[21], png[22], png[23]]);
        (w, h)
    }

    fn bundle(series: Vec<Series>, timestamps: Vec<i64>) -> TimeSeriesBundle {
        TimeSeriesBundle {
            sid: DeviceId(0x8201_ABCDu32 as i32),
            date: Date::from_calendar_date(2024, Month::May, 10).unwrap(),
            packet_type: Some(6),
            logical_id: Some(1),
            info: lookup(6),
            timestamps,
            series,
        }
    }

    #[test]
    fn height_follows_panel_count() {
        let timestamps: Vec<i64> = (0..50).map(|i| 1_715_299_200 + i * 600).collect();
        let temp = Series {
            slot: 0,
            label: "TEMP[C]",
            values: (0..50).map(|i| Some(20.0 + i as f64 / 10.0)).collect(),
        };
        let humid = Series {
            slot: 1,
            label: "HUMID[%]",
            values: (0..50).map(|i| if i % 10 == 3 { None } else { Some(45.0) }).collect(),
        };

        let png = render_png(&bundle(vec![temp.clone()], timestamps.clone()), UtcOffset::UTC).unwrap();
        assert_eq!(png[..8], PNG_SIGNATURE);
        assert_eq!(png_size(&png), (CHART_WIDTH, TITLE_HEIGHT + PANEL_HEIGHT));

        let png = render_png(&bundle(vec![temp, humid], timestamps), UtcOffset::UTC).unwrap();
        assert_eq!(png_size(&png), (CHART_WIDTH, TITLE_HEIGHT + 2 * PANEL_HEIGHT));
    }

    #[test]
    fn empty_bundle_renders_title_only() {
        let mut empty = bundle(Vec::new(), Vec::new());
        empty.info = &FALLBACK;
        empty.packet_type = None;
        let png = render_png(&empty, UtcOffset::UTC).unwrap();
        assert_eq!(png[..8], PNG_SIGNATURE);
        assert_eq!(png_size(&png), (CHART_WIDTH, TITLE_HEIGHT));
        assert_eq!(chart_title(&empty), "8201ABCD - 2024/05/10 - UNKNOWN");
    }

    #[test]
    fn gaps_split_the_curve() {
        let ts = [10, 20, 30, 40, 50];
        let values = [Some(1.0), None, Some(2.0), Some(f64::NAN), Some(3.0)];
        assert_eq!(
            runs(&ts, &values),
            vec![vec![(10.0, 1.0)], vec![(30.0, 2.0)], vec![(50.0, 3.0)]]
        );
        assert_eq!(runs(&ts, &[None; 5]), Vec::<Vec<(f64, f64)>>::new());
    }

    #[test]
    fn ranges_are_never_empty() {
        assert_eq!(time_range(&[100]), 40.0..160.0);
        assert_eq!(time_range(&[100, 200]), 100.0..200.0);
        assert_eq!(value_range(&[Some(5.0), None]), 4.0..6.0);
        assert_eq!(value_range(&[None]), 0.0..1.0);
        let r = value_range(&[Some(0.0), Some(10.0)]);
        assert!(r.start < 0.0 && r.end > 10.0);
    }

    #[test]
    fn embeds_as_data_uri() {
        assert_eq!(embed_png(b"png"), "<img src='data:image/png;base64,cG5n'/>");
    }
}
