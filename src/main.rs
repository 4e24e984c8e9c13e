#[macro_use]
extern crate failure;

use crate::checkout::record::CheckoutRecord;
use crate::checkout::monitor::AlertStatus;
use crate::config::DashboardConfig;
use crate::dashboard::{Dashboard, DashboardError};
use crate::discrete_system::Time;
use crate::metrics::{export_filename, to_csv, AnalyticsReport, ExportKind, Period};
use crate::view::{ViewKind, ViewModel, DEFAULT_VIEW};
use chrono::Local;
use failure::Error;
use rocket::http::{ContentType, Header, Status};
use rocket::response::{self, status, Redirect, Responder};
use rocket::serde::json::Json;
use rocket::{get, post, put, routes, uri, Build, Request, Response, Rocket, State};
use std::env;
use std::fs::File;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

mod checkout;
mod config;
mod dashboard;
mod discrete_system;
mod metrics;
mod random;
mod view;

/// The dashboard of a running server. Simulated time follows the wall clock.
struct Session {
    dashboard: Mutex<Dashboard>,
    started: Instant,
}

impl Session {
    fn new(dashboard: Dashboard) -> Session {
        Session {
            dashboard: Mutex::new(dashboard),
            started: Instant::now(),
        }
    }

    /// Locks the dashboard after catching it up with the time elapsed since start.
    fn current(&self) -> MutexGuard<'_, Dashboard> {
        let mut dashboard = self
            .dashboard
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let elapsed = self.started.elapsed().as_millis() as Time;
        dashboard.advance_to(elapsed);

        dashboard
    }
}

type ApiResult<T> = Result<Json<T>, status::Custom<String>>;

fn reject(error: DashboardError) -> status::Custom<String> {
    let code = match error {
        DashboardError::NotAlerting(_) | DashboardError::TargetUnused(_) => Status::Conflict,
        DashboardError::InvalidEquipmentTarget(_) => Status::UnprocessableEntity,
        DashboardError::NoMonitor | DashboardError::NotAMonitor(_) => Status::NotFound,
    };

    status::Custom(code, error.to_string())
}

struct CsvExport {
    filename: String,
    body: String,
}

impl<'r> Responder<'r, 'static> for CsvExport {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let disposition = format!("attachment; filename=\"{}\"", self.filename);

        Response::build_from(self.body.respond_to(request)?)
            .header(ContentType::new("text", "csv"))
            .header(Header::new("Content-Disposition", disposition))
            .ok()
    }
}

#[get("/")]
fn index() -> Redirect {
    Redirect::to(uri!("/public"))
}

#[get("/public")]
fn default_view(session: &State<Session>) -> Json<ViewModel> {
    Json(session.current().view(DEFAULT_VIEW))
}

#[get("/public/<segment>")]
fn themed_view(segment: &str, session: &State<Session>) -> Json<ViewModel> {
    Json(session.current().view(ViewKind::from_segment(segment)))
}

#[get("/checkouts")]
fn checkouts(session: &State<Session>) -> Json<Vec<CheckoutRecord>> {
    Json(session.current().snapshot())
}

#[get("/system")]
fn system(session: &State<Session>) -> ApiResult<serde_json::Value> {
    let dashboard = session.current();

    serde_json::to_value(dashboard.system())
        .map(Json)
        .map_err(|error| status::Custom(Status::InternalServerError, error.to_string()))
}

#[get("/alert")]
fn alert(session: &State<Session>) -> Option<Json<AlertStatus>> {
    session.current().alert_status().map(Json)
}

#[post("/alert/acknowledge")]
fn acknowledge(session: &State<Session>) -> ApiResult<AlertStatus> {
    session.current().acknowledge_alert().map(Json).map_err(reject)
}

#[post("/alert/dismiss")]
fn dismiss(session: &State<Session>) -> ApiResult<AlertStatus> {
    session.current().dismiss_alert().map(Json).map_err(reject)
}

#[post("/alert/reset")]
fn reset(session: &State<Session>) -> ApiResult<AlertStatus> {
    session.current().reset_alert().map(Json).map_err(reject)
}

#[put("/alert/equipment/<target>")]
fn equipment(target: u32, session: &State<Session>) -> ApiResult<AlertStatus> {
    session.current().set_equipment_target(target).map(Json).map_err(reject)
}

fn parse_period(period: &str) -> Option<Period> {
    match period.parse() {
        Ok(period) => Some(period),
        Err(error) => {
            log::warn!("{}", error);
            None
        }
    }
}

#[get("/analytics/<period>")]
fn analytics(period: &str, session: &State<Session>) -> Option<Json<AnalyticsReport>> {
    let period = parse_period(period)?;

    Some(Json(session.current().analytics(period)))
}

#[get("/analytics/<period>/export")]
fn export(period: &str, session: &State<Session>) -> Option<CsvExport> {
    let period = parse_period(period)?;
    let report = session.current().analytics(period);
    let now = Local::now();

    Some(CsvExport {
        filename: export_filename(ExportKind::Data, period, now.date_naive()),
        body: to_csv(&report, &now),
    })
}

fn build_rocket(dashboard: Dashboard) -> Result<Rocket<Build>, Error> {
    let cors = rocket_cors::CorsOptions::default().to_cors()?;

    Ok(rocket::build()
        .manage(Session::new(dashboard))
        .attach(cors)
        .mount(
            "/",
            routes![
                index,
                default_view,
                themed_view,
                checkouts,
                system,
                alert,
                acknowledge,
                dismiss,
                reset,
                equipment,
                analytics,
                export
            ],
        ))
}

fn run_server() -> Result<(), Error> {
    let dashboard = Dashboard::bootstrap(load_config())?;
    let rocket = build_rocket(dashboard)?;

    rocket::execute(rocket.launch()).map_err(|error| format_err!("server failed: {}", error))?;

    Ok(())
}

fn get_config(path: &str) -> Result<DashboardConfig, Error> {
    let file = File::open(path)?;

    let config = serde_json::from_reader(file)?;

    Ok(config)
}

fn load_config() -> DashboardConfig {
    let path = env::var("DASHBOARD_CONFIG")
        .unwrap_or_else(|_| format!("{}/config.json", env!("CARGO_MANIFEST_DIR")));

    get_config(&path).unwrap_or_else(|error| {
        log::info!("using default configuration ({}: {})", path, error);
        DashboardConfig::default()
    })
}

fn run_local() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config();
    let duration = config.console_duration;

    let mut dashboard = Dashboard::bootstrap(config)?;

    while dashboard
        .next_event_time()
        .map_or(false, |time| time <= duration)
    {
        let events = dashboard.step();
        let mut redraw = false;

        for event in events {
            println!(
                "In {} - {} sending to {} - {}",
                event.time,
                dashboard.describe(event.from_address),
                dashboard.describe(event.to_address),
                event.message.label()
            );

            if let checkout::Event::StoreEvent(checkout::store::Event::Tick) = event.message {
                redraw = true;
            }
        }

        if redraw {
            println!();
            print!("{}", view::render_console(&dashboard.view(DEFAULT_VIEW)));
            println!();
        }
    }

    let report = dashboard.analytics(Period::Day);
    let now = Local::now();
    println!("{}", export_filename(ExportKind::Data, Period::Day, now.date_naive()));
    print!("{}", to_csv(&report, &now));

    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let result = if args.len() == 2 && args[1] == "-console" {
        run_local()
    } else {
        run_server()
    };

    if let Err(error) = result {
        eprintln!("{}", error);
        std::process::exit(1);
    }
}
