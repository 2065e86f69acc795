//! Object reports, the payload behind the BBS beacon.
//!
//! ```text
//! ;BBS      *092345z4903.50N/07201.75W$comment
//!  ├─name──┤│├─time─┤├─lat───┤│├─lon────┤│
//!           live/killed      table      code
//! ```
//!
//! Coordinates are kept as signed integer hundredths of a minute so that
//! a decoded report re-encodes to the same characters.

use std::fmt;

use chrono::{DateTime, Timelike, Utc};

use crate::ProtocolError;

/// Hundredths of a minute per degree.
const UNITS_PER_DEGREE: i32 = 6000;

// ---------------------------------------------------------------------------
// ObjectName
// ---------------------------------------------------------------------------

/// An object name: 1–9 printable ASCII characters, padded on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectName(String);

impl ObjectName {
    /// Width of the name field.
    pub const WIDTH: usize = 9;

    /// Validates a name. Trailing spaces are dropped since the wire form
    /// cannot distinguish them from padding.
    pub fn new(raw: &str) -> Result<Self, ProtocolError> {
        let name = raw.trim_end();
        let valid = !name.is_empty()
            && name.len() <= Self::WIDTH
            && name.chars().all(|c| c.is_ascii_graphic() || c == ' ');
        if !valid {
            return Err(ProtocolError::MalformedFrame(format!(
                "invalid object name {raw:?}"
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<width$}", self.0, width = Self::WIDTH)
    }
}

// ---------------------------------------------------------------------------
// ObjectTime
// ---------------------------------------------------------------------------

/// A zulu time stamp in `HHMMSSz` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectTime {
    hour: u8,
    minute: u8,
    second: u8,
}

impl ObjectTime {
    pub fn new(hour: u8, minute: u8, second: u8) -> Result<Self, ProtocolError> {
        if hour > 23 || minute > 59 || second > 59 {
            return Err(ProtocolError::MalformedFrame(format!(
                "invalid time {hour:02}:{minute:02}:{second:02}"
            )));
        }
        Ok(Self {
            hour,
            minute,
            second,
        })
    }

    /// Takes the time of day from a UTC timestamp.
    pub fn from_datetime(at: &DateTime<Utc>) -> Self {
        // chrono guarantees the ranges; seconds may read 60 on a leap second.
        Self {
            hour: at.hour() as u8,
            minute: at.minute() as u8,
            second: at.second().min(59) as u8,
        }
    }

    /// The current UTC time of day.
    pub fn now() -> Self {
        Self::from_datetime(&Utc::now())
    }

    fn parse(field: &str) -> Result<Self, ProtocolError> {
        let bad = || ProtocolError::MalformedFrame(format!("invalid object time {field:?}"));
        let digits = field.strip_suffix('z').ok_or_else(bad)?;
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        let num = |range: std::ops::Range<usize>| digits[range].parse::<u8>().map_err(|_| bad());
        Self::new(num(0..2)?, num(2..4)?, num(4..6)?)
    }
}

impl fmt::Display for ObjectTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}{:02}{:02}z", self.hour, self.minute, self.second)
    }
}

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// Latitude in hundredths of a minute, north positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Latitude(i32);

/// Longitude in hundredths of a minute, east positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Longitude(i32);

fn units_from_degrees(degrees: f64, limit: f64, what: &str) -> Result<i32, ProtocolError> {
    if !degrees.is_finite() || degrees.abs() > limit {
        return Err(ProtocolError::Unencodable(format!(
            "{what} {degrees} out of range"
        )));
    }
    Ok((degrees * f64::from(UNITS_PER_DEGREE)).round() as i32)
}

/// Parses `DDMM.hh` (or `DDDMM.hh`) followed by a hemisphere letter.
fn parse_coordinate(
    field: &str,
    degree_digits: usize,
    positive: char,
    negative: char,
    limit: i32,
) -> Result<i32, ProtocolError> {
    let bad = || ProtocolError::MalformedFrame(format!("invalid coordinate {field:?}"));
    let bytes = field.as_bytes();
    if !field.is_ascii() || bytes.len() != degree_digits + 6 || bytes[degree_digits + 2] != b'.' {
        return Err(bad());
    }
    let hemisphere = field[degree_digits + 5..].chars().next().ok_or_else(bad)?;
    let sign = match hemisphere {
        c if c == positive => 1,
        c if c == negative => -1,
        _ => return Err(bad()),
    };
    let number = |range: std::ops::Range<usize>| -> Result<i32, ProtocolError> {
        let part = &field[range];
        if !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        part.parse().map_err(|_| bad())
    };
    let degrees = number(0..degree_digits)?;
    let minutes = number(degree_digits..degree_digits + 2)?;
    let hundredths = number(degree_digits + 3..degree_digits + 5)?;
    if minutes >= 60 {
        return Err(bad());
    }
    let units = degrees * UNITS_PER_DEGREE + minutes * 100 + hundredths;
    if units > limit * UNITS_PER_DEGREE {
        return Err(bad());
    }
    Ok(sign * units)
}

fn write_coordinate(
    f: &mut fmt::Formatter<'_>,
    units: i32,
    degree_digits: usize,
    positive: char,
    negative: char,
) -> fmt::Result {
    let hemisphere = if units < 0 { negative } else { positive };
    let abs = units.unsigned_abs();
    let per_degree = UNITS_PER_DEGREE.unsigned_abs();
    let degrees = abs / per_degree;
    let rem = abs % per_degree;
    write!(
        f,
        "{degrees:0width$}{:02}.{:02}{hemisphere}",
        rem / 100,
        rem % 100,
        width = degree_digits
    )
}

impl Latitude {
    pub fn from_degrees(degrees: f64) -> Result<Self, ProtocolError> {
        units_from_degrees(degrees, 90.0, "latitude").map(Self)
    }

    pub fn degrees(self) -> f64 {
        f64::from(self.0) / f64::from(UNITS_PER_DEGREE)
    }

    fn parse(field: &str) -> Result<Self, ProtocolError> {
        parse_coordinate(field, 2, 'N', 'S', 90).map(Self)
    }
}

impl fmt::Display for Latitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_coordinate(f, self.0, 2, 'N', 'S')
    }
}

impl Longitude {
    pub fn from_degrees(degrees: f64) -> Result<Self, ProtocolError> {
        units_from_degrees(degrees, 180.0, "longitude").map(Self)
    }

    pub fn degrees(self) -> f64 {
        f64::from(self.0) / f64::from(UNITS_PER_DEGREE)
    }

    fn parse(field: &str) -> Result<Self, ProtocolError> {
        parse_coordinate(field, 3, 'E', 'W', 180).map(Self)
    }
}

impl fmt::Display for Longitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_coordinate(f, self.0, 3, 'E', 'W')
    }
}

// ---------------------------------------------------------------------------
// Symbol
// ---------------------------------------------------------------------------

/// Map symbol: a table selector and a code character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    pub table: char,
    pub code: char,
}

impl Symbol {
    pub fn new(table: char, code: char) -> Result<Self, ProtocolError> {
        let table_ok = table == '/' || table == '\\' || table.is_ascii_alphanumeric();
        if !table_ok || !code.is_ascii_graphic() {
            return Err(ProtocolError::Unencodable(format!(
                "invalid symbol {table}{code}"
            )));
        }
        Ok(Self { table, code })
    }
}

impl Default for Symbol {
    /// `/$`, the phone symbol customarily used by message services.
    fn default() -> Self {
        Self {
            table: '/',
            code: '$',
        }
    }
}

// ---------------------------------------------------------------------------
// ObjectReport
// ---------------------------------------------------------------------------

/// A complete object report payload (without the leading `;`).
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectReport {
    pub name: ObjectName,
    /// `*` when live, `_` when the object is being withdrawn.
    pub live: bool,
    pub time: ObjectTime,
    pub latitude: Latitude,
    pub longitude: Longitude,
    pub symbol: Symbol,
    pub comment: String,
}

impl ObjectReport {
    /// Characters before the comment: name, flag, time, lat, table, lon, code.
    const FIXED_LEN: usize = 9 + 1 + 7 + 8 + 1 + 9 + 1;

    pub(crate) fn encode(&self) -> Result<String, ProtocolError> {
        if self.comment.contains(['\r', '\n']) {
            return Err(ProtocolError::Unencodable(
                "object comment contains a line break".into(),
            ));
        }
        Ok(format!(
            "{}{}{}{}{}{}{}{}",
            self.name,
            if self.live { '*' } else { '_' },
            self.time,
            self.latitude,
            self.symbol.table,
            self.longitude,
            self.symbol.code,
            self.comment
        ))
    }

    pub(crate) fn decode(payload: &str) -> Result<Self, ProtocolError> {
        if payload.len() < Self::FIXED_LEN || !payload.is_char_boundary(Self::FIXED_LEN) {
            return Err(ProtocolError::MalformedFrame(format!(
                "object report too short: {payload:?}"
            )));
        }
        let field = |from: usize, to: usize| {
            payload.get(from..to).ok_or_else(|| {
                ProtocolError::MalformedFrame(format!("object report not ASCII: {payload:?}"))
            })
        };
        let name = ObjectName::new(field(0, 9)?)?;
        let live = match field(9, 10)? {
            "*" => true,
            "_" => false,
            other => {
                return Err(ProtocolError::MalformedFrame(format!(
                    "invalid object flag {other:?}"
                )));
            }
        };
        let time = ObjectTime::parse(field(10, 17)?)?;
        let latitude = Latitude::parse(field(17, 25)?)?;
        let table = field(25, 26)?.chars().next().unwrap_or('/');
        let longitude = Longitude::parse(field(26, 35)?)?;
        let code = field(35, 36)?.chars().next().unwrap_or('$');
        let symbol = Symbol::new(table, code)
            .map_err(|e| ProtocolError::MalformedFrame(e.to_string()))?;
        Ok(Self {
            name,
            live,
            time,
            latitude,
            longitude,
            symbol,
            comment: payload[Self::FIXED_LEN..].to_string(),
        })
    }
}
