//! Parser for the `rust/bans.cfg` ban list export.
//!
//! The export endpoint answers with `application/octet-stream`, one ban per
//! line:
//!
//! ```text
//! banid 76561198000000000 "PlayerOne" "cheating" -1
//! banid 76561198000000001 "PlayerTwo" "toxicity" 1700000000
//! ```
//!
//! The last field is `-1` for a permanent ban, otherwise the Unix timestamp
//! the ban expires at.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Local, TimeZone};
use log::warn;
use regex::Regex;
use serde::{Serialize, Serializer};

static BAN_LINE: OnceLock<Regex> = OnceLock::new();

fn ban_line() -> &'static Regex {
    BAN_LINE.get_or_init(|| {
        Regex::new(r#"^\s*banid (?P<id>\d+) "(?P<name>.*?)" "(?P<reason>.*?)" (?P<duration>-?\d*)\s*$"#)
            .expect("ban line pattern is valid")
    })
}

/// When an exported ban ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BanExpiry {
    Permanent,
    /// Expiry instant, in the local time zone.
    At(DateTime<Local>),
    /// The duration field could not be turned into a timestamp.
    Unknown(String),
}

impl fmt::Display for BanExpiry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BanExpiry::Permanent => f.write_str("permanent"),
            BanExpiry::At(at) => write!(f, "{}", at.format("%Y-%m-%d %H:%M:%S")),
            BanExpiry::Unknown(raw) => f.write_str(raw),
        }
    }
}

impl Serialize for BanExpiry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One line of the ban export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BanRecord {
    /// Identifier of the banned identity (a Steam id for Rust).
    pub external_id: String,
    pub display_name: String,
    pub reason: String,
    pub expiry: BanExpiry,
}

/// Parses a full export. Blank lines are ignored, lines that are not a ban
/// are logged and skipped.
pub fn parse_ban_export(text: &str) -> Vec<BanRecord> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let record = parse_ban_line(line);
            if record.is_none() {
                warn!("skipping unrecognised ban export line: {}", line);
            }
            record
        })
        .collect()
}

/// Parses one `banid` line.
pub fn parse_ban_line(line: &str) -> Option<BanRecord> {
    let captures = ban_line().captures(line)?;
    let duration = &captures["duration"];

    Some(BanRecord {
        external_id: captures["id"].to_owned(),
        display_name: captures["name"].to_owned(),
        reason: captures["reason"].to_owned(),
        expiry: parse_expiry(duration),
    })
}

fn parse_expiry(duration: &str) -> BanExpiry {
    if duration == "-1" {
        return BanExpiry::Permanent;
    }

    match duration
        .parse::<i64>()
        .ok()
        .and_then(|secs| Local.timestamp_opt(secs, 0).single())
    {
        Some(at) => BanExpiry::At(at),
        None => {
            warn!("ban expiry {:?} is not a valid timestamp", duration);
            BanExpiry::Unknown(duration.to_owned())
        }
    }
}
