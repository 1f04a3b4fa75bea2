use chrono::DateTime;
use chrono::FixedOffset;
use chrono::SecondsFormat;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serializer;

use crate::Jst;

pub fn serialize<S>(dt: &DateTime<Jst>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, false))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Jst>, D::Error>
where
    D: Deserializer<'de>,
{
    let dt = DateTime::<FixedOffset>::deserialize(deserializer)?;
    Ok(dt.with_timezone(&Jst))
}

// <coverage:exclude>
#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, Deserialize, PartialEq, Serialize)]
    struct Data {
        #[serde(with = "crate::serde::rfc3339")]
        at: DateTime<Jst>,
    }

    #[test]
    fn test_serialize() {
        let data = Data {
            at: Jst::from_unixtime_ms(1_500_000_000_000).unwrap(),
        };
        let json = serde_json::to_string(&data).unwrap();
        assert_eq!(json, r#"{"at":"2017-07-14T11:40:00+09:00"}"#);
    }

    #[test]
    fn test_deserialize() {
        let data: Data = serde_json::from_str(r#"{"at":"2017-07-14T02:40:00.000Z"}"#).unwrap();
        assert_eq!(data.at.timestamp_millis(), 1_500_000_000_000);
        assert_eq!(data.at.to_rfc3339(), "2017-07-14T11:40:00+09:00");

        let result = serde_json::from_str::<Data>(r#"{"at":"invalid"}"#);
        assert!(result.is_err());
    }
}
// </coverage:exclude>
