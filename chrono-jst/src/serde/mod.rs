// serde implementations for chrono::DateTime<Jst>, which can be applied with
// the `with` field attribute.
//
// chrono implements `Serialize` for every `DateTime<Tz>`, but `Deserialize`
// only for `Utc`, `Local` and `FixedOffset`.  The modules below parse a
// `DateTime<FixedOffset>` and convert it into `DateTime<Jst>`.

pub mod rfc3339;
pub mod rfc3339_option;
