//! Minimal iCalendar (RFC 5545) reader.
//!
//! Only what free-slot computation needs: component nesting and the
//! `DTSTART`/`DTEND` properties of each component. Recurrence rules and
//! timezones are not interpreted; `TZID` parameters and a trailing `Z` are
//! accepted and the wall-clock value is used as naive local time.

use chrono::{NaiveDate, NaiveDateTime};

use crate::{AppError, Result};

/// Component type of a parsed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentKind {
    /// `VEVENT`.
    Event,
    /// `VTODO`.
    Todo,
    /// Any other component (`VTIMEZONE`, `VALARM`, `VJOURNAL`, ...).
    Other(String),
}

impl ComponentKind {
    fn from_name(name: &str) -> Self {
        match name {
            "VEVENT" => Self::Event,
            "VTODO" => Self::Todo,
            other => Self::Other(other.to_owned()),
        }
    }
}

/// `DTSTART`/`DTEND` value: either a whole day or a wall-clock instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    /// `VALUE=DATE` form (`20250601`).
    Date(NaiveDate),
    /// Date-time form (`20250601T090000`, optionally `Z`-suffixed).
    DateTime(NaiveDateTime),
}

/// One component below `VCALENDAR`, with its own start/end properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEntry {
    /// Component type.
    pub kind: ComponentKind,
    /// `DTSTART`, if present.
    pub start: Option<EventTime>,
    /// `DTEND`, if present.
    pub end: Option<EventTime>,
}

impl CalendarEntry {
    /// Whether this entry is a `VEVENT`.
    #[must_use]
    pub fn is_event(&self) -> bool {
        self.kind == ComponentKind::Event
    }
}

/// Parse an iCalendar document into its components, in document order.
///
/// A leading byte-order mark is ignored, as are lines inside the calendar
/// that are not `NAME:VALUE` content lines.
///
/// # Errors
///
/// Returns `AppError::Parse` when the bytes are not UTF-8, the document
/// does not start with `BEGIN:VCALENDAR`, components are unbalanced, or a
/// `DTSTART`/`DTEND` value is malformed.
pub fn parse(bytes: &[u8]) -> Result<Vec<CalendarEntry>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|err| AppError::Parse(format!("calendar is not valid UTF-8: {err}")))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let lines = unfold(text);

    let mut entries = Vec::new();
    // Indices into `entries` for open components; the calendar itself is `None`.
    let mut stack: Vec<(String, Option<usize>)> = Vec::new();
    let mut saw_calendar = false;

    for (lineno, line) in lines.iter().enumerate() {
        let Some((name, params, value)) = split_content_line(line) else {
            if stack.is_empty() {
                return Err(AppError::Parse(format!(
                    "line {}: expected 'NAME:VALUE'",
                    lineno + 1
                )));
            }
            continue;
        };

        match name.as_str() {
            "BEGIN" => {
                let component = value.trim().to_ascii_uppercase();
                if stack.is_empty() {
                    if component != "VCALENDAR" || saw_calendar {
                        return Err(AppError::Parse(format!(
                            "line {}: expected BEGIN:VCALENDAR, found BEGIN:{component}",
                            lineno + 1
                        )));
                    }
                    saw_calendar = true;
                    stack.push((component, None));
                } else {
                    entries.push(CalendarEntry {
                        kind: ComponentKind::from_name(&component),
                        start: None,
                        end: None,
                    });
                    stack.push((component, Some(entries.len() - 1)));
                }
            }
            "END" => {
                let component = value.trim().to_ascii_uppercase();
                match stack.pop() {
                    Some((open, _)) if open == component => {}
                    Some((open, _)) => {
                        return Err(AppError::Parse(format!(
                            "line {}: END:{component} does not close BEGIN:{open}",
                            lineno + 1
                        )));
                    }
                    None => {
                        return Err(AppError::Parse(format!(
                            "line {}: END:{component} without matching BEGIN",
                            lineno + 1
                        )));
                    }
                }
            }
            "DTSTART" | "DTEND" => {
                let Some(&(_, Some(index))) = stack.last() else {
                    continue;
                };
                let parsed = parse_time(&params, &value)
                    .map_err(|msg| AppError::Parse(format!("line {}: {name}: {msg}", lineno + 1)))?;
                if let Some(entry) = entries.get_mut(index) {
                    if name == "DTSTART" {
                        entry.start = Some(parsed);
                    } else {
                        entry.end = Some(parsed);
                    }
                }
            }
            _ if stack.is_empty() => {
                return Err(AppError::Parse(format!(
                    "line {}: content outside BEGIN:VCALENDAR",
                    lineno + 1
                )));
            }
            _ => {}
        }
    }

    if !saw_calendar {
        return Err(AppError::Parse("document has no VCALENDAR".into()));
    }
    if let Some((open, _)) = stack.last() {
        return Err(AppError::Parse(format!("BEGIN:{open} is never closed")));
    }
    Ok(entries)
}

/// Join folded continuation lines and drop blank lines.
fn unfold(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.split('\n') {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if let Some(rest) = raw.strip_prefix([' ', '\t']) {
            if let Some(last) = lines.last_mut() {
                last.push_str(rest);
                continue;
            }
        }
        if !raw.trim().is_empty() {
            lines.push(raw.to_owned());
        }
    }
    lines
}

/// Split `NAME;PARAM=V;...:VALUE`, honouring quoted parameter values.
///
/// The property name and parameter names are upper-cased.
fn split_content_line(line: &str) -> Option<(String, Vec<(String, String)>, String)> {
    let mut in_quotes = false;
    let mut colon = None;
    for (i, ch) in line.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ':' if !in_quotes => {
                colon = Some(i);
                break;
            }
            _ => {}
        }
    }
    let colon = colon?;
    let (head, value) = (&line[..colon], &line[colon + 1..]);

    let mut parts = head.split(';');
    let name = parts.next()?.trim().to_ascii_uppercase();
    if name.is_empty() {
        return None;
    }
    let params = parts
        .filter_map(|param| {
            let (key, val) = param.split_once('=')?;
            Some((key.trim().to_ascii_uppercase(), val.trim().trim_matches('"').to_owned()))
        })
        .collect();
    Some((name, params, value.to_owned()))
}

fn parse_time(params: &[(String, String)], value: &str) -> std::result::Result<EventTime, String> {
    let value = value.trim();
    let date_only = params
        .iter()
        .any(|(k, v)| k == "VALUE" && v.eq_ignore_ascii_case("DATE"))
        || (value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()));

    if date_only {
        return NaiveDate::parse_from_str(value, "%Y%m%d")
            .map(EventTime::Date)
            .map_err(|err| format!("invalid date '{value}': {err}"));
    }

    let naive = value.strip_suffix(['Z', 'z']).unwrap_or(value);
    NaiveDateTime::parse_from_str(naive, "%Y%m%dT%H%M%S")
        .map(EventTime::DateTime)
        .map_err(|err| format!("invalid date-time '{value}': {err}"))
}
