use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCount {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Accepts a JSON number, a numeric string, an empty string or null.
/// Text-field input historically landed in the blob as strings, so
/// anything that does not parse reads back as `None` instead of failing
/// the whole collection.
pub(crate) fn count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawCount>::deserialize(deserializer)?;
    Ok(match raw {
        None => None,
        Some(RawCount::Int(value)) => Some(value),
        Some(RawCount::Float(value)) => {
            let truncated = value.is_finite().then(|| value.trunc() as i64);
            if truncated.map(|t| t as f64) != Some(value) {
                tracing::debug!(value, ?truncated, "stored count is not a whole number");
            }
            truncated
        }
        Some(RawCount::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                let parsed = trimmed.parse::<i64>().ok();
                if parsed.is_none() {
                    tracing::debug!(text = trimmed, "stored count is not numeric, reading as empty");
                }
                parsed
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "super::count")]
        n: Option<i64>,
    }

    fn read(json: &str) -> Option<i64> {
        serde_json::from_str::<Holder>(json).expect("holder parses").n
    }

    #[test]
    fn accepts_every_legacy_shape() {
        assert_eq!(read(r#"{"n": 4}"#), Some(4));
        assert_eq!(read(r#"{"n": 2.5}"#), Some(2));
        assert_eq!(read(r#"{"n": " 7 "}"#), Some(7));
        assert_eq!(read(r#"{"n": ""}"#), None);
        assert_eq!(read(r#"{"n": "lots"}"#), None);
        assert_eq!(read(r#"{"n": null}"#), None);
        assert_eq!(read(r#"{}"#), None);
    }

    #[test]
    fn huge_floats_saturate() {
        assert_eq!(read(r#"{"n": 1e300}"#), Some(i64::MAX));
    }
}
