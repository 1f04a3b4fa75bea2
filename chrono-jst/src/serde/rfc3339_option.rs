use chrono::DateTime;
use chrono::FixedOffset;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serializer;

use crate::Jst;

pub fn serialize<S>(dt: &Option<DateTime<Jst>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match dt {
        Some(dt) => super::rfc3339::serialize(dt, serializer),
        None => serializer.serialize_none(),
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Jst>>, D::Error>
where
    D: Deserializer<'de>,
{
    let dt = Option::<DateTime<FixedOffset>>::deserialize(deserializer)?;
    Ok(dt.map(|dt| dt.with_timezone(&Jst)))
}

// </coverage:exclude>
