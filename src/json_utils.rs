use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// Older dumps store some numeric fields (`created_utc`, occasionally `score`)
/// as strings. Accept either form.
pub fn int_or_string<'de, D>(d: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(d)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| de::Error::custom("number out of range")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(|f| f as i64)
            .map_err(|_| de::Error::custom(format!("not a number: {s}"))),
        other => Err(de::Error::custom(format!("expected number, got {other}"))),
    }
}

/// Heuristic: a record is a comment if it has a `body`.
pub fn is_comment_record(v: &Value) -> bool {
    v.get("body").is_some()
}

/// Heuristic: a record is a submission if it has a `title` (and no `body`).
pub fn is_submission_record(v: &Value) -> bool {
    v.get("body").is_none() && v.get("title").is_some()
}
