//! Analytics placeholders for the dashboard view.
//!
//! None of these figures come from the queue store: every period change
//! draws a fresh bundle, exactly like the mock analytics screen does.

use crate::config::AnalyticsConfig;
use crate::random::{one_decimal, seeded_rng};
use chrono::{DateTime, NaiveDate, TimeZone};
use failure::Fail;
use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;
use std::fmt::{self, Write};
use std::str::FromStr;

const CHECKOUT_POOL: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
}

#[derive(Debug, Fail)]
#[fail(display = "unknown period \"{}\"", _0)]
pub struct UnknownPeriod(pub String);

impl FromStr for Period {
    type Err = UnknownPeriod;

    fn from_str(s: &str) -> Result<Period, UnknownPeriod> {
        match s {
            "day" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "year" => Ok(Period::Year),
            other => Err(UnknownPeriod(other.to_string())),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Day => write!(f, "day"),
            Period::Week => write!(f, "week"),
            Period::Month => write!(f, "month"),
            Period::Year => write!(f, "year"),
        }
    }
}

impl Period {
    pub fn label(self) -> &'static str {
        match self {
            Period::Day => "Jour",
            Period::Week => "Semaine",
            Period::Month => "Mois",
            Period::Year => "Année",
        }
    }

    /// X-axis labels of the chart for this period.
    pub fn buckets(self) -> Vec<String> {
        match self {
            Period::Day => (8..=20).map(|hour| format!("{}h", hour)).collect(),
            Period::Week => ["Lun", "Mar", "Mer", "Jeu", "Ven", "Sam", "Dim"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
            Period::Month => (1..=4).map(|week| format!("Sem {}", week)).collect(),
            Period::Year => [
                "Jan", "Fév", "Mar", "Avr", "Mai", "Juin", "Juil", "Août", "Sep", "Oct", "Nov", "Déc",
            ]
            .iter()
            .map(|m| m.to_string())
            .collect(),
        }
    }

    fn entry_range(self) -> (u32, u32) {
        match self {
            Period::Day => (5, 60),
            Period::Week => (150, 600),
            Period::Month => (1000, 4000),
            Period::Year => (4000, 16000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusyCheckout {
    pub name: String,
    pub customers: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trends {
    pub queue_length: f64,
    pub peak_crowd: f64,
    pub average_crowd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsBundle {
    pub average_queue_length: f64,
    pub peak_crowd: u32,
    pub average_crowd: u32,
    pub busiest_checkouts: Vec<BusyCheckout>,
    pub trends: Trends,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub label: String,
    pub entries: u32,
    pub waiting: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub period: Period,
    pub period_label: &'static str,
    pub metrics: MetricsBundle,
    pub series: Vec<ChartPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Data,
    Screenshot,
}

pub struct MetricsReporter {
    busiest: usize,
    rng: StdRng,
}

impl MetricsReporter {
    pub fn new(config: &AnalyticsConfig) -> MetricsReporter {
        MetricsReporter {
            busiest: config.busiest_checkouts,
            rng: seeded_rng(config.seed),
        }
    }

    pub fn metrics(&mut self) -> MetricsBundle {
        let mut busiest: Vec<BusyCheckout> = (1..=CHECKOUT_POOL)
            .map(|id| BusyCheckout {
                name: format!("Caisse {}", id),
                customers: self.rng.gen_range(20..=120),
            })
            .collect();
        busiest.sort_by(|a, b| b.customers.cmp(&a.customers));
        busiest.truncate(self.busiest);

        MetricsBundle {
            average_queue_length: one_decimal(&mut self.rng, 1.0, 6.0),
            peak_crowd: self.rng.gen_range(20..=60),
            average_crowd: self.rng.gen_range(10..=30),
            busiest_checkouts: busiest,
            trends: Trends {
                queue_length: one_decimal(&mut self.rng, -20.0, 20.0),
                peak_crowd: one_decimal(&mut self.rng, -20.0, 20.0),
                average_crowd: one_decimal(&mut self.rng, -20.0, 20.0),
            },
        }
    }

    pub fn chart_series(&mut self, period: Period) -> Vec<ChartPoint> {
        let (low, high) = period.entry_range();

        period
            .buckets()
            .into_iter()
            .map(|label| {
                let entries = self.rng.gen_range(low..=high);
                let waiting = self.rng.gen_range(0..=entries / 4);

                ChartPoint {
                    label,
                    entries,
                    waiting,
                }
            })
            .collect()
    }

    /// Fresh figures for `period`; called on every period change.
    pub fn report(&mut self, period: Period) -> AnalyticsReport {
        AnalyticsReport {
            period,
            period_label: period.label(),
            metrics: self.metrics(),
            series: self.chart_series(period),
        }
    }
}

fn push_row(out: &mut String, fields: &[&dyn fmt::Display]) {
    let row = fields
        .iter()
        .map(|field| field.to_string())
        .collect::<Vec<_>>()
        .join(",");

    // Writing to a String never fails
    let _ = writeln!(out, "{}", row);
}

/// Comma separated export of a report. Only the "Généré le" line depends on
/// `generated_at`.
pub fn to_csv<Tz>(report: &AnalyticsReport, generated_at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let metrics = &report.metrics;
    let trends = &metrics.trends;
    let mut out = String::new();

    push_row(&mut out, &[&"Tableau de bord des caisses"]);
    push_row(&mut out, &[&"Période", &report.period_label]);
    push_row(
        &mut out,
        &[&"Généré le", &generated_at.format("%Y-%m-%d %H:%M:%S")],
    );
    out.push('\n');

    push_row(&mut out, &[&"KEY METRICS"]);
    push_row(
        &mut out,
        &[&"Longueur moyenne de file", &format!("{:.1}", metrics.average_queue_length)],
    );
    push_row(&mut out, &[&"Pic d'affluence", &metrics.peak_crowd]);
    push_row(&mut out, &[&"Affluence moyenne", &metrics.average_crowd]);
    for (rank, checkout) in metrics.busiest_checkouts.iter().enumerate() {
        push_row(
            &mut out,
            &[
                &format!("Caisse la plus chargée #{}", rank + 1),
                &checkout.name,
                &checkout.customers,
            ],
        );
    }
    out.push('\n');

    push_row(&mut out, &[&"TRENDS"]);
    push_row(&mut out, &[&"Longueur moyenne de file", &format!("{:+.1}%", trends.queue_length)]);
    push_row(&mut out, &[&"Pic d'affluence", &format!("{:+.1}%", trends.peak_crowd)]);
    push_row(&mut out, &[&"Affluence moyenne", &format!("{:+.1}%", trends.average_crowd)]);
    out.push('\n');

    push_row(&mut out, &[&"CHART DATA"]);
    push_row(&mut out, &[&"Période", &"Entrées", &"En attente"]);
    for point in report.series.iter() {
        push_row(&mut out, &[&point.label, &point.entries, &point.waiting]);
    }

    out
}

pub fn export_filename(kind: ExportKind, period: Period, date: NaiveDate) -> String {
    let (stem, extension) = match kind {
        ExportKind::Data => ("dashboard_data", "csv"),
        ExportKind::Screenshot => ("dashboard_screenshot", "png"),
    };

    format!("{}_{}_{}.{}", stem, period, date.format("%Y-%m-%d"), extension)
}
