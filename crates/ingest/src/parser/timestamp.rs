//! Timestamp and header extraction for journal/syslog/docker lines.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDateTime, TimeZone, Utc};

use crate::record::LineFormat;

/// Split a leading timestamp off `line`.
///
/// Returns the parsed instant and the remainder (leading whitespace trimmed).
/// `reference` supplies the year for BSD syslog stamps, which carry none.
pub fn split_timestamp(
    line: &str,
    format: LineFormat,
    reference: DateTime<Utc>,
) -> Option<(DateTime<Utc>, &str)> {
    match format {
        LineFormat::Journal | LineFormat::Docker => split_iso_token(line),
        LineFormat::Syslog => split_iso_pair(line)
            .or_else(|| split_bsd(line, reference))
            .or_else(|| split_iso_token(line)),
    }
}

/// `2024-01-15T10:00:00+0000 rest` (journal short-iso, RFC 3339, docker).
fn split_iso_token(line: &str) -> Option<(DateTime<Utc>, &str)> {
    let (token, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let ts = parse_iso(token)?;
    Some((ts, rest.trim_start()))
}

fn parse_iso(token: &str) -> Option<DateTime<Utc>> {
    if !token.as_bytes().first().is_some_and(u8::is_ascii_digit) {
        return None;
    }
    DateTime::parse_from_rfc3339(token)
        .or_else(|_| DateTime::parse_from_str(token, "%Y-%m-%dT%H:%M:%S%z"))
        .or_else(|_| DateTime::parse_from_str(token, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// `2024-01-15 10:00:00.123456-0800 rest` (macOS `log show --style syslog`).
fn split_iso_pair(line: &str) -> Option<(DateTime<Utc>, &str)> {
    let (date, after_date) = line.split_once(' ')?;
    let (time, rest) = after_date.split_once(char::is_whitespace).unwrap_or((after_date, ""));
    if date.len() != 10 || !date.as_bytes()[0].is_ascii_digit() {
        return None;
    }
    let joined = format!("{} {}", date, time);

    let ts = DateTime::parse_from_str(&joined, "%Y-%m-%d %H:%M:%S%.f%z")
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            let naive = NaiveDateTime::parse_from_str(&joined, "%Y-%m-%d %H:%M:%S%.f").ok()?;
            local_to_utc(naive)
        })?;
    Some((ts, rest.trim_start()))
}

/// `Jan  5 10:00:00 rest`. The year comes from `reference`; a stamp that
/// would land more than a day in the future belongs to the previous year.
fn split_bsd(line: &str, reference: DateTime<Utc>) -> Option<(DateTime<Utc>, &str)> {
    let head = line.get(..15)?;
    if !head.as_bytes()[0].is_ascii_alphabetic() {
        return None;
    }
    let year = reference.with_timezone(&Local).year();

    let parse = |y: i32| {
        NaiveDateTime::parse_from_str(&format!("{} {}", y, head), "%Y %b %e %H:%M:%S")
            .ok()
            .and_then(local_to_utc)
    };

    let mut ts = parse(year)?;
    if ts > reference + Duration::days(1) {
        ts = parse(year - 1)?;
    }
    Some((ts, line[15..].trim_start()))
}

fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parsed `host process[pid]: body` header.
#[derive(Debug, PartialEq, Eq)]
pub struct Header<'a> {
    pub host: Option<&'a str>,
    pub process: Option<&'a str>,
    pub body: &'a str,
}

/// Split the syslog-style `host process[pid]:` prefix from the message.
///
/// Lines that do not follow the layout come back whole as the body.
pub fn split_header(rest: &str) -> Header<'_> {
    let whole = Header { host: None, process: None, body: rest };

    let Some((host, after_host)) = rest.split_once(' ') else {
        return whole;
    };
    let Some(colon) = after_host.find(": ").or_else(|| after_host.strip_suffix(':').map(|s| s.len())) else {
        return whole;
    };
    let tag = &after_host[..colon];
    if tag.is_empty() || tag.contains(char::is_whitespace) {
        return whole;
    }

    let process = tag.split_once('[').map(|(name, _)| name).unwrap_or(tag);
    let body = after_host.get(colon + 1..).unwrap_or("").trim_start();

    Header {
        host: Some(host),
        process: (!process.is_empty()).then_some(process),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    // ── Journal / docker ────────────────────────────────────────

    #[test]
    fn test_journal_short_iso() {
        let line = "2024-06-01T11:30:00+0000 web01 sshd[812]: Failed password";
        let (ts, rest) = split_timestamp(line, LineFormat::Journal, reference()).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 6, 1, 11, 30, 0).unwrap());
        assert_eq!(rest, "web01 sshd[812]: Failed password");
    }

    #[test]
    fn test_journal_offset_is_normalized_to_utc() {
        let line = "2024-06-01T13:30:00+0200 web01 kernel: oops";
        let (ts, _) = split_timestamp(line, LineFormat::Journal, reference()).unwrap();
        assert_eq!(ts.hour(), 11, "+0200 shifts back to UTC");
    }

    #[test]
    fn test_rfc3339_with_nanos() {
        let line = "2024-06-01T11:00:00.123456789Z started";
        let (ts, rest) = split_timestamp(line, LineFormat::Docker, reference()).unwrap();
        assert_eq!(ts.nanosecond(), 123_456_789);
        assert_eq!(rest, "started");
    }

    #[test]
    fn test_unparsable_returns_none() {
        assert!(split_timestamp("no timestamp here", LineFormat::Journal, reference()).is_none());
        assert!(split_timestamp("", LineFormat::Docker, reference()).is_none());
        assert!(split_timestamp("2024-99-99T00:00:00Z x", LineFormat::Docker, reference()).is_none());
    }

    // ── Syslog ──────────────────────────────────────────────────

    #[test]
    fn test_macos_syslog_style() {
        let line = "2024-06-01 04:00:00.500000-0700  mac kernel[0]: (AppleACPI) sleep";
        let (ts, rest) = split_timestamp(line, LineFormat::Syslog, reference()).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap() + Duration::milliseconds(500));
        assert_eq!(rest, "mac kernel[0]: (AppleACPI) sleep");
    }

    #[test]
    fn test_bsd_syslog_uses_reference_year() {
        let line = "May 31 23:15:00 host cron[22]: job done";
        let (ts, rest) = split_timestamp(line, LineFormat::Syslog, reference()).unwrap();
        let local = ts.with_timezone(&Local);
        assert_eq!(local.year(), 2024);
        assert_eq!((local.month(), local.day(), local.hour()), (5, 31, 23));
        assert_eq!(rest, "host cron[22]: job done");
    }

    #[test]
    fn test_bsd_syslog_rolls_back_across_new_year() {
        let january = Utc.with_ymd_and_hms(2024, 1, 1, 0, 30, 0).unwrap();
        let line = "Dec 31 23:50:00 host app: late";
        let (ts, _) = split_timestamp(line, LineFormat::Syslog, january).unwrap();
        assert_eq!(ts.with_timezone(&Local).year(), 2023);
    }

    #[test]
    fn test_bsd_single_digit_day() {
        let line = "Jun  1 09:00:00 host app: early";
        assert!(split_timestamp(line, LineFormat::Syslog, reference()).is_some());
    }

    // ── Header ──────────────────────────────────────────────────

    #[test]
    fn test_header_with_pid() {
        let h = split_header("web01 sshd[812]: Failed password for root");
        assert_eq!(h.host, Some("web01"));
        assert_eq!(h.process, Some("sshd"));
        assert_eq!(h.body, "Failed password for root");
    }

    #[test]
    fn test_header_without_pid() {
        let h = split_header("web01 kernel: Out of memory");
        assert_eq!(h.process, Some("kernel"));
        assert_eq!(h.body, "Out of memory");
    }

    #[test]
    fn test_header_absent() {
        let h = split_header("just a message: with colon later");
        assert_eq!(h.host, None, "tag with whitespace is not a header");
        assert_eq!(h.body, "just a message: with colon later");
    }

    #[test]
    fn test_header_empty_body() {
        let h = split_header("host app[1]:");
        assert_eq!(h.process, Some("app"));
        assert_eq!(h.body, "");
    }
}
