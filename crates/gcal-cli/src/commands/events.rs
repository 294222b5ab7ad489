//! `gcal events`: list, create and show events.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use gcal_core::{TimeParseError, TimeWindow, parse_date_input, parse_datetime_in, parse_duration};
use gcal_google::{ErrorCode, EventQuery, GoogleError, NewEvent};
use tracing::{debug, info};

use crate::cli::{CreateEventArgs, ListEventsArgs};
use crate::container::Services;
use crate::error::{CliError, CliResult};
use crate::output::{print_item, print_list};

pub async fn list(services: &Services, args: ListEventsArgs) -> CliResult<()> {
    let config = services.config();
    let calendar_id = args.calendar.unwrap_or_else(|| config.default_calendar());
    let days = args.days.unwrap_or_else(|| config.events_days());
    let max_results = args.max_results.unwrap_or_else(|| config.events_max_results());

    let now = Utc::now();
    let window = event_window(
        args.from.as_deref(),
        args.to.as_deref(),
        days,
        &Local,
        now,
        now.with_timezone(&Local).date_naive(),
    )?;
    if !window.is_valid() {
        return Err(CliError::Usage(services.i18n().t("events.end_before_start")));
    }

    let query = EventQuery::new(&calendar_id, window, max_results).with_query(args.query);
    debug!(
        "listing events in {} from {} to {}",
        calendar_id, query.window.start, query.window.end
    );

    let events = services
        .calendar()?
        .list_events(&query)
        .await
        .map_err(|e| not_found_as(e, services, "calendars.not_found", &calendar_id))?;
    print_list(services, &events, "events.none")
}

pub async fn create(services: &Services, args: CreateEventArgs) -> CliResult<()> {
    let i18n = services.i18n();
    let calendar_id = args
        .calendar
        .clone()
        .unwrap_or_else(|| services.config().default_calendar());

    let title = match args.title.as_deref().map(str::trim) {
        Some(title) if !title.is_empty() => title.to_string(),
        _ => services.prompt().input(&i18n.t("prompt.title"), None)?,
    };
    if title.trim().is_empty() {
        return Err(CliError::Usage(i18n.t("events.title_required")));
    }
    let start = match args.start.as_deref().map(str::trim) {
        Some(start) if !start.is_empty() => start.to_string(),
        _ => services.prompt().input(&i18n.t("prompt.start"), None)?,
    };

    let today = Local::now().date_naive();
    let event = build_event(services, &args, title, &start, &Local, today)?;

    let created = services
        .calendar()?
        .insert_event(&calendar_id, &event)
        .await
        .map_err(|e| not_found_as(e, services, "calendars.not_found", &calendar_id))?;
    info!("created event {} in {}", created.id, calendar_id);

    let console = services.console();
    if console.is_quiet() {
        return console.print(&created.id);
    }
    if services.formatter().format().is_json() {
        return print_item(services, &created);
    }
    console.print(&i18n.tf("events.created", &[("id", &created.id)]))
}

pub async fn show(services: &Services, event_id: &str, calendar: Option<String>) -> CliResult<()> {
    let calendar_id = calendar.unwrap_or_else(|| services.config().default_calendar());
    let event = services
        .calendar()?
        .get_event(&calendar_id, event_id)
        .await
        .map_err(|e| not_found_as(e, services, "events.not_found", event_id))?;
    print_item(services, &event)
}

/// Resolves the `events list` window.
///
/// `--from` starts at local midnight of that day, otherwise now. `--to`
/// includes the whole named day; without it the window spans `days` days.
fn event_window<Tz: TimeZone>(
    from: Option<&str>,
    to: Option<&str>,
    days: i64,
    tz: &Tz,
    now: DateTime<Utc>,
    today: NaiveDate,
) -> CliResult<TimeWindow> {
    let start = match from {
        Some(from) => local_midnight(parse_date_input(from, today)?, tz, from)?,
        None => now,
    };
    match to {
        Some(to) => {
            let end_day = parse_date_input(to, today)? + Duration::days(1);
            Ok(TimeWindow::new(start, local_midnight(end_day, tz, to)?))
        }
        None => Ok(TimeWindow::days_from(start, days)),
    }
}

fn local_midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz, input: &str) -> CliResult<DateTime<Utc>> {
    tz.from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| TimeParseError::AmbiguousLocalTime(input.to_string()).into())
}

/// Builds the request body from the create arguments.
///
/// All-day events take dates and an inclusive `--end`; timed events end at
/// `--end`, or after `--duration` (default `events.defaultDuration`).
fn build_event<Tz: TimeZone>(
    services: &Services,
    args: &CreateEventArgs,
    title: String,
    start: &str,
    tz: &Tz,
    today: NaiveDate,
) -> CliResult<NewEvent> {
    let end_before_start = || CliError::Usage(services.i18n().t("events.end_before_start"));

    let event = if args.all_day {
        if args.duration.is_some() {
            return Err(CliError::Usage(
                services.i18n().t("events.duration_with_all_day"),
            ));
        }
        let start_date = parse_date_input(start, today)?;
        let end_date = match args.end.as_deref() {
            Some(end) => parse_date_input(end, today)?,
            None => start_date,
        };
        if end_date < start_date {
            return Err(end_before_start());
        }
        NewEvent::all_day(title, start_date, end_date + Duration::days(1))
    } else {
        let start_at = parse_datetime_in(start, tz, today)?;
        let end_at = match (&args.end, &args.duration) {
            (Some(end), _) => parse_datetime_in(end, tz, today)?,
            (None, duration) => {
                let length = match duration {
                    Some(duration) => parse_duration(duration)?,
                    None => Duration::minutes(services.config().default_duration()),
                };
                start_at
                    .checked_add_signed(length)
                    .ok_or_else(|| CliError::Usage(services.i18n().t("events.duration_too_long")))?
            }
        };
        if end_at <= start_at {
            return Err(end_before_start());
        }
        NewEvent::timed(title, start_at, end_at)
    };

    Ok(event
        .with_description(args.description.clone())
        .with_location(args.location.clone())
        .with_attendees(args.attendees.iter().map(|a| a.trim().to_string())))
}

/// Replaces a Google "not found" with the translated `key` message.
fn not_found_as(err: GoogleError, services: &Services, key: &str, id: &str) -> CliError {
    if err.code() == ErrorCode::NotFound {
        CliError::Api(services.i18n().tf(key, &[("id", id)]))
    } else {
        CliError::from_google(err, services.i18n())
    }
}
