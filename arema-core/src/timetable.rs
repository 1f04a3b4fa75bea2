use std::fmt;

use chrono::DateTime;
use chrono::Datelike;
use chrono::NaiveDate;
use chrono::SecondsFormat;
use chrono::Timelike;
use chrono::Utc;
use chrono_jst::Jst;
use indexmap::IndexMap;
use serde::Serialize;

use crate::models::Channel;
use crate::models::ChannelId;
use crate::models::Program;

/// Programs of a channel in ascending order of `start_at`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimetableEntry {
    pub channel: Channel,
    pub programs: Vec<Program>,
}

/// Entries in the enumeration order of channels.
pub type TimetableGrid = IndexMap<ChannelId, TimetableEntry>;

/// Groups programs by channel.
///
/// Programs of each channel are sorted by `start_at` with a stable sort, so
/// programs starting at the same time keep their input order.  Programs of
/// unknown channels are dropped.
pub fn project<'a, C, P>(channels: C, programs: P) -> TimetableGrid
where
    C: IntoIterator<Item = &'a Channel>,
    P: IntoIterator<Item = &'a Program>,
{
    let mut grid: TimetableGrid = channels
        .into_iter()
        .map(|channel| {
            let entry = TimetableEntry {
                channel: channel.clone(),
                programs: vec![],
            };
            (channel.id.clone(), entry)
        })
        .collect();

    for program in programs {
        match grid.get_mut(&program.channel_id) {
            Some(entry) => entry.programs.push(program.clone()),
            None => tracing::trace!(%program.id, %program.channel_id, "Unknown channel"),
        }
    }

    for entry in grid.values_mut() {
        entry.programs.sort_by_key(|program| program.start_at);
    }

    grid
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BroadcastState {
    Upcoming,
    Live,
    Archived,
}

impl BroadcastState {
    pub fn classify(program: &Program, now_ms: i64) -> Self {
        if program.end_at_ms() <= now_ms {
            BroadcastState::Archived
        } else if program.start_at_ms() <= now_ms {
            BroadcastState::Live
        } else {
            BroadcastState::Upcoming
        }
    }
}

impl fmt::Display for BroadcastState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BroadcastState::Upcoming => write!(f, "upcoming"),
            BroadcastState::Live => write!(f, "live"),
            BroadcastState::Archived => write!(f, "archived"),
        }
    }
}

/// The range of `GET /timetable` for a day in JST.
#[derive(Clone, Debug, PartialEq)]
pub struct TimetableWindow {
    pub since: DateTime<Jst>,
    pub until: DateTime<Jst>,
}

impl TimetableWindow {
    /// 00:00:00.000 to 23:59:59.999 of the date.
    pub fn for_date(date: NaiveDate) -> Self {
        TimetableWindow {
            since: Jst::start_of_day(date),
            until: Jst::end_of_day(date),
        }
    }

    pub fn today() -> Self {
        Self::for_date(Jst::today())
    }

    pub fn since_param(&self) -> String {
        to_param(&self.since)
    }

    pub fn until_param(&self) -> String {
        to_param(&self.until)
    }

    pub fn contains(&self, program: &Program) -> bool {
        self.since <= program.start_at && program.start_at <= self.until
    }
}

fn to_param(dt: &DateTime<Jst>) -> String {
    dt.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The height of a program block in the grid.
pub fn program_height(program: &Program, height_one_hour: u32) -> f64 {
    let minutes = program.duration().num_milliseconds() as f64 / (60.0 * 1000.0);
    height_one_hour as f64 * (minutes / 60.0)
}

/// Formats a datetime like `1月15日 09:05` in JST.
pub fn format_japanese_datetime(dt: &DateTime<Jst>) -> String {
    format!(
        "{}月{}日 {:02}:{:02}",
        dt.month(),
        dt.day(),
        dt.hour(),
        dt.minute()
    )
}

// </coverage:exclude>
