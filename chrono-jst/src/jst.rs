use std::fmt;

use chrono::DateTime;
use chrono::Duration;
use chrono::FixedOffset;
use chrono::LocalResult;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use chrono::Offset;
use chrono::TimeZone;
use chrono::Utc;

// The following implementation is based on chrono::offset::Utc.
//
// See https://github.com/chronotope/chrono/blob/master/src/offset/utc.rs for
// details.

/// Japan Standard Time (UTC+09:00, no DST).
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Jst;

impl Jst {
    const OFFSET_SECS: i32 = 9 * 60 * 60;

    pub fn now() -> DateTime<Jst> {
        Utc::now().with_timezone(&Jst)
    }

    pub fn today() -> NaiveDate {
        Jst::now().date_naive()
    }

    /// Converts a UNIX time in milliseconds.
    ///
    /// Returns `None` if the value is out of the range supported by chrono.
    pub fn from_unixtime_ms(ms: i64) -> Option<DateTime<Jst>> {
        DateTime::from_timestamp_millis(ms).map(|utc| utc.with_timezone(&Jst))
    }

    /// 00:00:00.000 of the date in JST.
    pub fn start_of_day(date: NaiveDate) -> DateTime<Jst> {
        Jst.from_utc_datetime(&(date.and_time(NaiveTime::MIN) - Self::offset()))
    }

    /// 23:59:59.999 of the date in JST.
    pub fn end_of_day(date: NaiveDate) -> DateTime<Jst> {
        Self::start_of_day(date) + Duration::days(1) - Duration::milliseconds(1)
    }

    fn offset() -> Duration {
        Duration::seconds(Self::OFFSET_SECS as i64)
    }
}

impl TimeZone for Jst {
    type Offset = Jst;

    fn from_offset(_offset: &Jst) -> Jst {
        Jst
    }

    fn offset_from_local_date(&self, _local: &NaiveDate) -> LocalResult<Jst> {
        LocalResult::Single(Jst)
    }

    fn offset_from_local_datetime(&self, _local: &NaiveDateTime) -> LocalResult<Jst> {
        LocalResult::Single(Jst)
    }

    fn offset_from_utc_date(&self, _utc: &NaiveDate) -> Jst {
        Jst
    }

    fn offset_from_utc_datetime(&self, _utc: &NaiveDateTime) -> Jst {
        Jst
    }
}

impl Offset for Jst {
    fn fix(&self) -> FixedOffset {
        // 9 hours is always a valid offset.
        FixedOffset::east_opt(Self::OFFSET_SECS).unwrap()
    }
}

impl fmt::Display for Jst {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.fix(), f)
    }
}

impl fmt::Debug for Jst {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.fix(), f)
    }
}

// </coverage:exclude>
