//! Line-oriented decoder output: file/stdin reading and replay into a registry.
//!
//! Each line is one decoder record, optionally suffixed with `;<timestamp>`
//! (Unix seconds). Lines without a timestamp inherit the previous one, which
//! matches how wsprd reports a whole decode interval at once.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use telemetry_core::registry::ObjectEvent;
use telemetry_core::{MessageFormat, TelemetryRegistry, Timestamp};

/// Counters from one replay.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReplaySummary {
    pub lines: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub created: u64,
    pub expired: u64,
    pub last_timestamp: Timestamp,
}

/// Open a file for line reading; `-` means stdin.
pub fn open_input(path: &Path) -> io::Result<Box<dyn BufRead>> {
    if path.to_str() == Some("-") {
        Ok(Box::new(io::stdin().lock()))
    } else {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

/// Strip blank lines and comments; split off a trailing `;<timestamp>`.
pub fn clean_line(line: &str) -> Option<(&str, Option<Timestamp>)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    if let Some((payload, ts)) = line.rsplit_once(';') {
        if let Ok(ts) = ts.trim().parse::<f64>() {
            if ts.is_finite() {
                return Some((payload.trim(), Some(ts)));
            }
        }
    }
    Some((line, None))
}

/// Feed every line of `reader` into `registry`.
///
/// Expiry is swept whenever the replay clock advances, so a capture spanning
/// hours ends with only the objects a live session would still hold. The
/// clock only moves for lines that parse and validate.
pub fn replay<R: BufRead>(
    reader: R,
    format: MessageFormat,
    registry: &TelemetryRegistry,
    start: Timestamp,
) -> ReplaySummary {
    let mut summary = ReplaySummary {
        last_timestamp: start,
        ..ReplaySummary::default()
    };

    for line in reader.lines() {
        let Ok(line) = line else { continue };
        let Some((payload, ts)) = clean_line(&line) else {
            continue;
        };
        summary.lines += 1;

        let ts = ts.unwrap_or(summary.last_timestamp);
        let result = format.parse_line(payload, ts).and_then(|msg| {
            msg.validate()?;
            if ts > summary.last_timestamp {
                summary.expired += registry.sweep_expired(ts).len() as u64;
            }
            let event = registry.receive(&msg)?;
            summary.last_timestamp = ts;
            Ok(event)
        });
        match result {
            Ok(event) => {
                summary.accepted += 1;
                if matches!(event, ObjectEvent::Created { .. }) {
                    summary.created += 1;
                }
            }
            Err(e) => {
                summary.rejected += 1;
                debug!(line = summary.lines, error = %e, "skipped input line");
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Arc;
    use telemetry_core::NullObserver;

    fn registry() -> TelemetryRegistry {
        TelemetryRegistry::new(Arc::new(NullObserver))
    }

    #[test]
    fn test_clean_line() {
        assert_eq!(clean_line("   "), None);
        assert_eq!(clean_line("# comment"), None);
        assert_eq!(clean_line(" abc "), Some(("abc", None)));
        assert_eq!(clean_line("abc;12.5"), Some(("abc", Some(12.5))));
        assert_eq!(
            clean_line(r#"{"note": "a;b"}"#),
            Some((r#"{"note": "a;b"}"#, None))
        );
    }

    #[test]
    fn test_replay_wsprd() {
        let input = "\
2322 -21  1.5   14.097110  -1  <WA7MOX> EL16 33
garbage
2322 -22  1.5   14.097130  -1  <W8II> EN82 20
2324 -20  1.4   14.097112  -1  WA7MOX EL16 33;1120
";
        let reg = registry();
        let summary = replay(Cursor::new(input), MessageFormat::Wsprd, &reg, 1000.0);

        assert_eq!(summary.lines, 4);
        assert_eq!(summary.accepted, 3);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.created, 2);
        assert_eq!(summary.last_timestamp, 1120.0);
        assert_eq!(reg.len(), 2);
        assert_eq!(
            reg.get("wsprspot_WA7MOX_EL16").unwrap().last_heard,
            Some(1120.0)
        );
    }

    #[test]
    fn test_replay_sweeps_as_clock_advances() {
        let input = "\
{\"model\": \"A\", \"id\": 1, \"temperature_C\": 20.1};0
{\"model\": \"B\", \"id\": 2, \"temperature_C\": 19.0};100
{\"model\": \"B\", \"id\": 2, \"temperature_C\": 19.2};200
";
        let reg = registry();
        let summary = replay(Cursor::new(input), MessageFormat::Rtl433, &reg, 0.0);

        assert_eq!(summary.accepted, 3);
        assert_eq!(summary.expired, 1);
        assert!(!reg.contains("1-A"));
        assert!(reg.contains("2-B"));
    }

    #[test]
    fn test_non_finite_suffix_leaves_clock_alone() {
        let input = "\
{\"model\": \"A\", \"id\": 1};10
{\"model\": \"B\", \"id\": 2};20
{\"model\": \"C\", \"id\": 3};inf
{\"model\": \"D\", \"id\": 4}
{\"model\": \"E\", \"id\": 5};30
";
        let reg = registry();
        let summary = replay(Cursor::new(input), MessageFormat::Rtl433, &reg, 0.0);

        assert_eq!(summary.accepted, 4);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.expired, 0);
        assert_eq!(summary.last_timestamp, 30.0);
        assert_eq!(reg.len(), 4);
        assert_eq!(reg.get("4-D").unwrap().last_heard, Some(20.0));
        assert!(!reg.contains("3-C"));
    }

    #[test]
    fn test_nan_suffix_rejected() {
        assert_eq!(clean_line("x;nan"), Some(("x;nan", None)));
        assert_eq!(clean_line("x;inf"), Some(("x;inf", None)));

        let input = "\
{\"model\": \"A\", \"id\": 1};nan
{\"model\": \"B\", \"id\": 2}
";
        let reg = registry();
        let summary = replay(Cursor::new(input), MessageFormat::Rtl433, &reg, 5.0);

        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.last_timestamp, 5.0);
        assert_eq!(reg.get("2-B").unwrap().last_heard, Some(5.0));
    }
}
