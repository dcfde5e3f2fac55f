use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::error::ElementError;
use super::types::{ElementAge, FetchedElements, OrbitalElementSet};

const LINE_LEN: usize = 69;

/// Scalar fields read straight from the element lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TleFields {
    pub catalog_id: u32,
    pub epoch: DateTime<Utc>,
    /// Revolutions per day.
    pub mean_motion: f64,
    /// Revolution count at epoch.
    pub revolution_number: u64,
}

/// Splits a source payload into name and lines. A missing name line falls
/// back to `fallback_name`.
pub fn parse_tle_payload(payload: &str, fallback_name: &str) -> Result<FetchedElements, ElementError> {
    let lines: Vec<&str> = payload
        .lines()
        .map(|l| l.trim_end())
        .filter(|l| !l.trim().is_empty())
        .collect();

    let (name, line1, line2) = match lines.as_slice() {
        [line1, line2] => (fallback_name.to_string(), *line1, *line2),
        [name, line1, line2] => (name.trim().to_string(), *line1, *line2),
        _ => {
            return Err(ElementError::InvalidTle(format!(
                "expected 2 or 3 lines, got {}",
                lines.len()
            )))
        }
    };

    if !line1.starts_with("1 ") || !line2.starts_with("2 ") {
        return Err(ElementError::InvalidTle(
            "lines do not start with '1 ' and '2 '".into(),
        ));
    }

    Ok(FetchedElements {
        name,
        line1: line1.trim().to_string(),
        line2: line2.trim().to_string(),
    })
}

fn field<'a>(line: &'a str, range: std::ops::Range<usize>, what: &str) -> Result<&'a str, ElementError> {
    if line.len() < LINE_LEN {
        return Err(ElementError::InvalidTle(format!(
            "line is {} characters, expected {}",
            line.len(),
            LINE_LEN
        )));
    }
    line.get(range)
        .map(str::trim)
        .ok_or_else(|| ElementError::InvalidTle(format!("{what} is not ASCII")))
}

fn parse_number<T: std::str::FromStr>(text: &str, what: &str) -> Result<T, ElementError> {
    text.parse()
        .map_err(|_| ElementError::InvalidTle(format!("{what} '{text}' is not a number")))
}

/// Two-digit years below 57 belong to the 2000s.
pub fn expand_year(two_digit: u32) -> i32 {
    if two_digit < 57 {
        2000 + two_digit as i32
    } else {
        1900 + two_digit as i32
    }
}

pub fn parse_epoch(line1: &str) -> Result<DateTime<Utc>, ElementError> {
    let year: u32 = parse_number(field(line1, 18..20, "epoch year")?, "epoch year")?;
    let day: f64 = parse_number(field(line1, 20..32, "epoch day")?, "epoch day")?;
    if !(1.0..367.0).contains(&day) {
        return Err(ElementError::InvalidTle(format!("epoch day {day} out of range")));
    }

    let year_start = NaiveDate::from_ymd_opt(expand_year(year), 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ElementError::InvalidTle(format!("epoch year {year} invalid")))?
        .and_utc();
    let offset_ms = ((day - 1.0) * 86_400_000.0).round() as i64;
    Ok(year_start + Duration::milliseconds(offset_ms))
}

pub fn parse_fields(line1: &str, line2: &str) -> Result<TleFields, ElementError> {
    let catalog_id: u32 = parse_number(field(line1, 2..7, "catalog number")?, "catalog number")?;
    let catalog_2: u32 = parse_number(field(line2, 2..7, "catalog number")?, "catalog number")?;
    if catalog_id != catalog_2 {
        return Err(ElementError::InvalidTle(format!(
            "line catalog numbers differ ({catalog_id} vs {catalog_2})"
        )));
    }
    let epoch = parse_epoch(line1)?;
    let mean_motion: f64 = parse_number(field(line2, 52..63, "mean motion")?, "mean motion")?;
    if mean_motion <= 0.0 {
        return Err(ElementError::InvalidTle(format!(
            "mean motion {mean_motion} must be positive"
        )));
    }
    let revolution_number: u64 = parse_number(
        field(line2, 63..68, "revolution number")?,
        "revolution number",
    )?;

    Ok(TleFields {
        catalog_id,
        epoch,
        mean_motion,
        revolution_number,
    })
}

/// Age of the element set's epoch at `now`. An epoch in the future reads as zero.
pub fn element_age(set: &OrbitalElementSet, now: DateTime<Utc>) -> Result<ElementAge, ElementError> {
    let epoch = parse_epoch(&set.line1)?;
    Ok(ElementAge::from_seconds((now - epoch).num_seconds()))
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn parses_epoch_and_fields() {
        let fields = parse_fields(ISS_LINE1, ISS_LINE2).unwrap();
        assert_eq!(fields.catalog_id, 25544);
        assert_eq!(fields.revolution_number, 56353);
        assert!((fields.mean_motion - 15.72125391).abs() < 1e-9);

        // day 264 of 2008 is 20 September
        let epoch = fields.epoch;
        assert_eq!(epoch.date_naive(), NaiveDate::from_ymd_opt(2008, 9, 20).unwrap());
        assert_eq!(epoch.hour(), 12);
        assert_eq!(epoch.minute(), 25);
    }

    #[test]
    fn year_pivot() {
        assert_eq!(expand_year(56), 2056);
        assert_eq!(expand_year(57), 1957);
        assert_eq!(expand_year(8), 2008);
    }

    #[test]
    fn age_is_split_and_saturates() {
        let set = OrbitalElementSet {
            catalog_id: 25544,
            name: ISS_NAME.into(),
            line1: ISS_LINE1.into(),
            line2: ISS_LINE2.into(),
            retrieved_at: Utc.with_ymd_and_hms(2008, 9, 21, 0, 0, 0).unwrap(),
        };
        let epoch = parse_epoch(ISS_LINE1).unwrap();
        let now = epoch + Duration::days(1) + Duration::hours(2) + Duration::minutes(3);
        let age = element_age(&set, now).unwrap();
        assert_eq!((age.days, age.hours, age.minutes), (1, 2, 3));
        assert_eq!(age.hours_minutes(), "26:03");

        let before = element_age(&set, epoch - Duration::hours(1)).unwrap();
        assert_eq!(before.total_seconds, 0);
    }

    #[test]
    fn payload_with_and_without_name() {
        let payload = format!("{ISS_NAME}\r\n{ISS_LINE1}\r\n{ISS_LINE2}\r\n");
        let parsed = parse_tle_payload(&payload, "fallback").unwrap();
        assert_eq!(parsed.name, ISS_NAME);
        assert_eq!(parsed.line1, ISS_LINE1);

        let bare = format!("{ISS_LINE1}\n{ISS_LINE2}\n");
        assert_eq!(parse_tle_payload(&bare, "fallback").unwrap().name, "fallback");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_tle_payload("No GP data found", "x").is_err());
        assert!(parse_fields("1 25544U", ISS_LINE2).is_err());
        let swapped = format!("x\n{ISS_LINE2}\n{ISS_LINE1}");
        assert!(parse_tle_payload(&swapped, "x").is_err());
    }
}
