//! A module to parse ICal files

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use ical::parser::ical::component::IcalTodo;
use ical::property::Property;

use crate::error::{Error, Result};
use crate::item::TaskId;
use crate::task::{Priority, Task, TaskStatus};

/// Parse an iCal file into the internal representation [`crate::task::Task`].
///
/// There is one result per `VTODO` found in the file (a single file may contain several `VCALENDAR`s).
/// Events and journals are ignored.
pub fn parse(content: &str) -> Vec<Result<Task>> {
    let mut results = Vec::new();
    let reader = ical::IcalParser::new(content.as_bytes());
    for calendar in reader {
        match calendar {
            Err(err) => {
                results.push(Err(Error::Decode(format!("Unable to parse iCal data: {}", err))));
                break;
            },
            Ok(calendar) => {
                for todo in &calendar.todos {
                    results.push(parse_todo(todo));
                }
            },
        }
    }
    results
}

fn parse_todo(todo: &IcalTodo) -> Result<Task> {
    let mut uid = None;
    let mut summary = None;
    let mut description = None;
    let mut status = None;
    let mut priority = None;
    let mut due = None;
    let mut parent_id = None;
    let mut last_modified = None;
    let mut dtstamp = None;

    for prop in &todo.properties {
        let value = match &prop.value {
            None => continue,
            Some(value) => value.as_str(),
        };
        match prop.name.to_ascii_uppercase().as_str() {
            "UID" => uid = Some(value.trim().to_string()),
            "SUMMARY" => summary = Some(super::unescape_text(value)),
            "DESCRIPTION" => description = Some(super::unescape_text(value)),
            "STATUS" => status = Some(value),
            "PRIORITY" => priority = Some(value),
            "DUE" => due = Some(parse_date_time(prop)?),
            "LAST-MODIFIED" => last_modified = parse_date_time(prop).ok(),
            "DTSTAMP" => dtstamp = parse_date_time(prop).ok(),
            "RELATED-TO" => {
                if is_parent_relation(prop) && value.trim().is_empty() == false {
                    parent_id = Some(TaskId::from(value.trim()));
                }
            },
            _ => {},
        }
    }

    let uid = match uid.filter(|uid| uid.is_empty() == false) {
        Some(uid) => uid,
        None => return Err(Error::Decode("missing UID".to_string())),
    };
    let summary = summary
        .filter(|s| s.trim().is_empty() == false)
        .unwrap_or_else(|| String::from("Untitled Task"));
    let last_modified = last_modified.or(dtstamp).unwrap_or_else(Utc::now);

    Ok(Task::new_with_parameters(
        TaskId::from(uid),
        summary,
        description.filter(|d| d.is_empty() == false),
        TaskStatus::from_wire(status),
        Priority::from_wire(priority),
        due,
        parent_id,
        last_modified,
    ))
}

/// `RELATED-TO` defaults to a parent relation; `RELTYPE=CHILD` or `SIBLING` links are not parent links
fn is_parent_relation(prop: &Property) -> bool {
    match param(prop, "RELTYPE") {
        None => true,
        Some(reltype) => reltype.eq_ignore_ascii_case("PARENT"),
    }
}

fn param<'a>(prop: &'a Property, name: &str) -> Option<&'a str> {
    prop.params.as_ref()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first())
        .map(|value| value.as_str())
}

/// Parse a `DATE` or `DATE-TIME` property value into a UTC timestamp.
///
/// * `YYYYMMDD` (all-day) is midnight UTC
/// * `YYYYMMDDTHHMMSS` (floating, or with a `TZID` parameter) is read as UTC
/// * `YYYYMMDDTHHMMSSZ` is UTC
/// * already structured RFC3339 values (e.g. `2025-03-18T23:59:59+01:00`, or `2025-03-18`) are accepted as well
pub fn parse_date_time(prop: &Property) -> Result<DateTime<Utc>> {
    let value = match &prop.value {
        None => return Err(Error::Decode(format!("empty {} value", prop.name))),
        Some(value) => value.trim(),
    };
    if let Some(tzid) = param(prop, "TZID") {
        log::debug!("Time zone {} of {} is not supported, reading {} as UTC", tzid, prop.name, value);
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y%m%d") {
        return midnight_utc(date);
    }
    let naive = value.strip_suffix('Z').unwrap_or(value);
    if let Ok(date_time) = NaiveDateTime::parse_from_str(naive, "%Y%m%dT%H%M%S") {
        return Ok(Utc.from_utc_datetime(&date_time));
    }
    if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
        return Ok(date_time.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return midnight_utc(date);
    }

    Err(Error::Decode(format!("invalid {} value {:?}", prop.name, value)))
}

fn midnight_utc(date: NaiveDate) -> Result<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| Error::Decode(format!("invalid date {}", date)))
}
