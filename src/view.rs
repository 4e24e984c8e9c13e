//! Themed views over the shared queue state.
//!
//! Every theme sees the same derived data (priority order, groups,
//! statistics, alert status); a `Theme` only decides what is shown.

use crate::checkout::monitor::{AlertState, AlertStatus};
use crate::checkout::priority::{
    classify, group_by_priority, queue_stats, sort_by_priority, status_class, Priority, QueueStats,
    StatusClass,
};
use crate::checkout::record::{waiting_text, CheckoutRecord};
use crate::config::PriorityThresholds;
use crate::discrete_system::Time;
use colored::{ColoredString, Colorize};
use serde::Serialize;
use std::fmt::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    Grid,
    Dashboard,
    Card,
    Minimal,
    Modern,
    Compact,
    Elegant,
    Industrial,
    Zen,
    Home,
}

pub const DEFAULT_VIEW: ViewKind = ViewKind::Grid;

impl ViewKind {
    pub const ALL: [ViewKind; 10] = [
        ViewKind::Grid,
        ViewKind::Dashboard,
        ViewKind::Card,
        ViewKind::Minimal,
        ViewKind::Modern,
        ViewKind::Compact,
        ViewKind::Elegant,
        ViewKind::Industrial,
        ViewKind::Zen,
        ViewKind::Home,
    ];

    /// Resolves a path segment; anything unknown (or empty) is the default view.
    pub fn from_segment(segment: &str) -> ViewKind {
        ViewKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.segment() == segment.trim_matches('/'))
            .unwrap_or(DEFAULT_VIEW)
    }

    pub fn segment(self) -> &'static str {
        self.theme().name
    }

    pub fn theme(self) -> Theme {
        match self {
            ViewKind::Grid => Theme {
                name: "grid",
                title: "Vue grille",
                accent: "blue",
                list_idle: true,
                alert_banner: true,
                statistics: true,
            },
            ViewKind::Dashboard => Theme {
                name: "dashboard",
                title: "Tableau de bord",
                accent: "indigo",
                list_idle: false,
                alert_banner: true,
                statistics: true,
            },
            ViewKind::Card => Theme {
                name: "card",
                title: "Cartes",
                accent: "teal",
                list_idle: true,
                alert_banner: true,
                statistics: false,
            },
            ViewKind::Minimal => Theme {
                name: "minimal",
                title: "Minimal",
                accent: "gray",
                list_idle: false,
                alert_banner: false,
                statistics: false,
            },
            ViewKind::Modern => Theme {
                name: "modern",
                title: "Moderne",
                accent: "violet",
                list_idle: false,
                alert_banner: true,
                statistics: true,
            },
            ViewKind::Compact => Theme {
                name: "compact",
                title: "Compact",
                accent: "slate",
                list_idle: false,
                alert_banner: true,
                statistics: false,
            },
            ViewKind::Elegant => Theme {
                name: "elegant",
                title: "Élégant",
                accent: "gold",
                list_idle: false,
                alert_banner: true,
                statistics: true,
            },
            ViewKind::Industrial => Theme {
                name: "industrial",
                title: "Industriel",
                accent: "orange",
                list_idle: true,
                alert_banner: true,
                statistics: true,
            },
            ViewKind::Zen => Theme {
                name: "zen",
                title: "Zen",
                accent: "green",
                list_idle: false,
                alert_banner: false,
                statistics: false,
            },
            ViewKind::Home => Theme {
                name: "home",
                title: "Accueil",
                accent: "blue",
                list_idle: false,
                alert_banner: true,
                statistics: true,
            },
        }
    }
}

/// Rendering configuration of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub name: &'static str,
    pub title: &'static str,
    pub accent: &'static str,
    pub list_idle: bool, // open checkouts without queue are listed after the busy ones
    pub alert_banner: bool,
    pub statistics: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewEntry {
    #[serde(flatten)]
    pub record: CheckoutRecord,
    pub priority: Priority,
    pub status_class: StatusClass,
    pub waiting_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupCounts {
    pub critical: usize,
    pub urgent: usize,
    pub normal: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub view: ViewKind,
    pub theme: Theme,
    pub time: Time,
    pub statistics: Option<QueueStats>,
    pub entries: Vec<ViewEntry>,
    pub groups: GroupCounts,
    pub alert: Option<AlertStatus>,
    pub links: Vec<String>,
}

fn entry(record: &CheckoutRecord, thresholds: &PriorityThresholds) -> ViewEntry {
    ViewEntry {
        record: record.clone(),
        priority: classify(record, thresholds),
        status_class: status_class(record),
        waiting_text: waiting_text(record.waiting_count),
    }
}

pub fn build(
    kind: ViewKind,
    records: &[CheckoutRecord],
    thresholds: &PriorityThresholds,
    alert: Option<AlertStatus>,
    time: Time,
) -> ViewModel {
    let theme = kind.theme();

    let mut entries: Vec<ViewEntry> = sort_by_priority(records, thresholds)
        .into_iter()
        .map(|record| entry(record, thresholds))
        .collect();

    if theme.list_idle {
        entries.extend(
            records
                .iter()
                .filter(|record| record.is_open() && record.waiting_count == 0)
                .map(|record| entry(record, thresholds)),
        );
    }

    let groups = group_by_priority(records, thresholds);

    let links = if kind == ViewKind::Home {
        ViewKind::ALL
            .iter()
            .filter(|other| **other != ViewKind::Home)
            .map(|other| format!("/public/{}", other.segment()))
            .collect()
    } else {
        Vec::new()
    };

    ViewModel {
        view: kind,
        theme,
        time,
        statistics: if theme.statistics {
            Some(queue_stats(records, thresholds))
        } else {
            None
        },
        entries,
        groups: GroupCounts {
            critical: groups.critical.len(),
            urgent: groups.urgent.len(),
            normal: groups.normal.len(),
        },
        alert: if theme.alert_banner { alert } else { None },
        links,
    }
}

fn paint(text: &str, priority: Priority) -> ColoredString {
    match priority {
        Priority::Critical => text.red().bold(),
        Priority::Urgent => text.yellow(),
        Priority::Normal => text.green(),
    }
}

/// Plain terminal rendering used by the console mode.
pub fn render_console(model: &ViewModel) -> String {
    let mut out = String::new();

    // Writing to a String never fails
    let _ = write_console(&mut out, model);

    out
}

fn write_console(out: &mut String, model: &ViewModel) -> fmt::Result {
    writeln!(
        out,
        "{} - t={:.1}s",
        model.theme.title.bold(),
        model.time as f64 / 1000.0
    )?;

    if let Some(alert) = &model.alert {
        if alert.banner_visible {
            writeln!(
                out,
                "{}",
                format!("ALERT: checkouts {:?} need attention", alert.critical_queues)
                    .white()
                    .on_red()
                    .bold()
            )?;
        } else if alert.state == AlertState::Acknowledged || alert.state == AlertState::Dismissed {
            writeln!(out, "{}", format!("alert {}", alert.state).dimmed())?;
        }
    }

    if let Some(stats) = &model.statistics {
        writeln!(
            out,
            "waiting {} | open {} | closed {} | avg wait {:.1} min | critical {}",
            stats.total_waiting,
            stats.open_checkouts,
            stats.closed_checkouts,
            stats.average_wait,
            stats.critical_checkouts
        )?;
    }

    writeln!(out, "{:<12} | {:<10} | {:>5} | {:<8} | status", "checkout", "queue", "wait", "priority")?;
    writeln!(out, "------------ | ---------- | ----- | -------- | ------")?;

    for e in model.entries.iter() {
        writeln!(
            out,
            "{:<12} | {:<10} | {:>5} | {} | {}",
            e.record.name,
            e.waiting_text,
            format!("{}m", e.record.estimated_wait),
            paint(&format!("{:<8}", e.priority.to_string()), e.priority),
            e.status_class.as_str()
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::record::CheckoutStatus;
    use crate::config::AlertPolicy;

    fn open(id: u32, waiting: u32) -> CheckoutRecord {
        CheckoutRecord::new(id, waiting, CheckoutStatus::Open, 0)
    }

    fn alerting() -> AlertStatus {
        AlertStatus {
            state: AlertState::Alerting,
            condition_active: true,
            banner_visible: true,
            policy: AlertPolicy::CriticalQueue,
            equipment_target: 15,
            open_checkouts: 3,
            critical_queues: vec![2],
            acknowledged_until: None,
        }
    }

    #[test]
    fn unknown_and_empty_segments_fall_back_to_grid() {
        assert_eq!(ViewKind::from_segment("zen"), ViewKind::Zen);
        assert_eq!(ViewKind::from_segment("industrial/"), ViewKind::Industrial);
        assert_eq!(ViewKind::from_segment(""), ViewKind::Grid);
        assert_eq!(ViewKind::from_segment("nowhere"), ViewKind::Grid);
    }

    #[test]
    fn every_view_has_its_own_segment() {
        for kind in ViewKind::ALL.iter() {
            assert_eq!(ViewKind::from_segment(kind.segment()), *kind);
        }
    }

    #[test]
    fn grid_lists_idle_checkouts_after_busy_ones() {
        let records = vec![open(1, 0), open(2, 8), open(3, 2)];

        let grid = build(ViewKind::Grid, &records, &PriorityThresholds::default(), None, 0);
        let compact = build(ViewKind::Compact, &records, &PriorityThresholds::default(), None, 0);

        let ids = |model: &ViewModel| model.entries.iter().map(|e| e.record.id).collect::<Vec<_>>();
        assert_eq!(ids(&grid), vec![2, 3, 1]);
        assert_eq!(ids(&compact), vec![2, 3]);
        assert_eq!(grid.entries[0].waiting_text, "8 people");
        assert_eq!(grid.entries[0].status_class, StatusClass::Medium);
        assert_eq!(grid.groups, GroupCounts { critical: 0, urgent: 1, normal: 1 });
    }

    #[test]
    fn themes_only_change_what_is_shown() {
        let records = vec![open(1, 3), open(2, 8)];
        let thresholds = PriorityThresholds::default();

        let modern = build(ViewKind::Modern, &records, &thresholds, Some(alerting()), 0);
        let zen = build(ViewKind::Zen, &records, &thresholds, Some(alerting()), 0);

        assert!(modern.alert.is_some());
        assert!(modern.statistics.is_some());
        assert!(zen.alert.is_none());
        assert!(zen.statistics.is_none());

        let priorities = |model: &ViewModel| model.entries.iter().map(|e| e.priority).collect::<Vec<_>>();
        assert_eq!(priorities(&modern), priorities(&zen));
    }

    #[test]
    fn home_links_to_every_other_view() {
        let home = build(ViewKind::Home, &[], &PriorityThresholds::default(), None, 0);

        assert_eq!(home.links.len(), 9);
        assert!(home.links.contains(&"/public/dashboard".to_string()));
        assert!(!home.links.contains(&"/public/home".to_string()));
    }

    #[test]
    fn view_model_serializes_flattened_entries() {
        let model = build(ViewKind::Grid, &[open(4, 5)], &PriorityThresholds::default(), None, 3000);
        let json = serde_json::to_value(&model).unwrap();

        assert_eq!(json["view"], "grid");
        assert_eq!(json["entries"][0]["waitingCount"], 5);
        assert_eq!(json["entries"][0]["priority"], "urgent");
        assert_eq!(json["entries"][0]["statusClass"], "medium");
    }

    #[test]
    fn console_rendering_mentions_alert_and_rows() {
        colored::control::set_override(false);
        let model = build(
            ViewKind::Grid,
            &[open(1, 1), open(2, 8)],
            &PriorityThresholds::default(),
            Some(alerting()),
            6000,
        );

        let text = render_console(&model);

        assert!(text.contains("Vue grille - t=6.0s"));
        assert!(text.contains("ALERT: checkouts [2] need attention"));
        assert!(text.contains("Checkout 2"));
        assert!(text.contains("1 person"));
    }
}
