use clap::{Parser, Subcommand};
use log::{error, info, warn};
use std::path::PathBuf;
use time::{Date, UtcOffset};

use wsns_viewer::chart::register_font_file;
use wsns_viewer::config::AppConfig;
use wsns_viewer::database::{with_connection, SampleStore};
use wsns_viewer::models::{DayTable, DecodedSample, DeviceId, NodeSummary, Window};
use wsns_viewer::report;
use wsns_viewer::utils::{format_date, format_datetime, local_datetime, parse_date};

/// Browse and chart the telemetry recorded by a sensor network gateway
#[derive(Parser, Debug)]
#[command(name = "wsns-viewer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every node with its latest sample
    Nodes,
    /// Years with data for a node
    Years {
        /// Node serial id in hex (e.g. 8201ABCD)
        sid: DeviceId,
    },
    /// Months of a year with data for a node
    Months { sid: DeviceId, year: i32 },
    /// Days of a month with data for a node
    Days { sid: DeviceId, year: i32, month: i32 },
    /// Decoded samples of one day
    Show {
        sid: DeviceId,
        /// Day as YYYY-MM-DD
        #[arg(value_parser = parse_date)]
        date: Date,
    },
    /// Chart one day or the 24 hours up to a timestamp
    Graph {
        sid: DeviceId,
        /// Day as YYYY-MM-DD
        #[arg(long, value_parser = parse_date, conflicts_with = "latest", required_unless_present = "latest")]
        date: Option<Date>,
        /// Epoch seconds ending the 24 hour window
        #[arg(long)]
        latest: Option<i64>,
        /// Output file, defaults to <SID>_<YYYYMMDD>.png (or .html)
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Write an embeddable <img> tag instead of a PNG file
        #[arg(long)]
        html: bool,
    },
}

fn describe_sample(sample: &DecodedSample, offset: UtcOffset) -> String {
    let values = sample
        .values
        .iter()
        .map(|f| format!("{}={}", f.label, f.value))
        .collect::<Vec<_>>()
        .join(" ");
    let magnet = sample
        .magnet_state
        .map(|m| format!(" mag={}", m))
        .unwrap_or_default();
    format!(
        "{}  lid={} lqi={} {} vcc={}mV{} ev={}",
        format_datetime(&local_datetime(sample.timestamp, offset)),
        sample.logical_id,
        sample.link_quality,
        values,
        sample.supply_voltage_mv,
        magnet,
        sample.event()
    )
}

fn print_nodes(nodes: &[NodeSummary], offset: UtcOffset) {
    for node in nodes {
        println!(
            "{:<10} {:<20} {:<12} {}",
            node.sid_text,
            node.description,
            node.latest.info.device_name,
            describe_sample(&node.latest, offset)
        );
    }
}

fn print_day(table: &DayTable, offset: UtcOffset) {
    let lid = table
        .logical_id
        .map(|lid| lid.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{} - {} - {} (lid {})",
        table.sid,
        format_date(table.date),
        table.info.device_name,
        lid
    );
    for (i, row) in table.rows.iter().enumerate() {
        println!("{:>5} {}", i, describe_sample(row, offset));
    }
}

fn print_list(values: &[i32]) {
    let line = values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    println!("{}", line);
}

async fn run(command: Command, config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let url = config.database_url.as_str();
    let offset = config.utc_offset;

    match command {
        Command::Nodes => {
            let nodes =
                with_connection(url, |store| async move { report::list_nodes(&store).await }).await?;
            print_nodes(&nodes, offset);
        }
        Command::Years { sid } => {
            let years = with_connection(url, |store| async move {
                store.years(sid).await
            })
            .await?;
            print_list(&years);
        }
        Command::Months { sid, year } => {
            let months = with_connection(url, |store| async move {
                store.months(sid, year).await
            })
            .await?;
            print_list(&months);
        }
        Command::Days { sid, year, month } => {
            let days = with_connection(url, |store| async move {
                store.days(sid, year, month).await
            })
            .await?;
            print_list(&days);
        }
        Command::Show { sid, date } => {
            let table =
                with_connection(url, |store| async move { report::day_table(&store, sid, date).await })
                    .await?;
            print_day(&table, offset);
        }
        Command::Graph {
            sid,
            date,
            latest,
            out,
            html,
        } => {
            let window = match (date, latest) {
                (Some(date), _) => Window::Day(date),
                (None, Some(ts)) => Window::Latest(ts),
                (None, None) => return Err("either --date or --latest is required".into()),
            };

            if let Err(e) = register_font_file(&config.chart_font) {
                warn!(
                    "Chart font {} unavailable, charts will have no text: {}",
                    config.chart_font.display(),
                    e
                );
            }

            let settings = config.chart_settings();
            let rendered = with_connection(url, |store| async move {
                report::render_chart(&store, sid, window, &settings).await
            })
            .await?;

            let out = out.unwrap_or_else(|| {
                let date = rendered.bundle.date;
                PathBuf::from(format!(
                    "{}_{:04}{:02}{:02}.{}",
                    sid,
                    date.year(),
                    u8::from(date.month()),
                    date.day(),
                    if html { "html" } else { "png" }
                ))
            });
            if html {
                std::fs::write(&out, rendered.to_html())?;
            } else {
                std::fs::write(&out, &rendered.png)?;
            }
            info!(
                "Chart of {} with {} samples written to {}",
                sid,
                rendered.bundle.timestamps.len(),
                out.display()
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = match AppConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = run(cli.command, &config).await {
        error!("Fatal error: {}", e);
        return Err(e);
    }

    Ok(())
}
