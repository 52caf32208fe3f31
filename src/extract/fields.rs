//! Lenient readers for loosely typed JSON cells. The feed mixes numbers,
//! numeric strings, blank strings and nulls in the same column.

use serde_json::Value;

pub fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn text(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => blank_to_none(Some(s.clone())),
        Some(other) => Some(other.to_string()),
    }
}

pub fn int(value: Option<&Value>) -> Option<i64> {
    match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// An id column: `0` is the feed's null sentinel.
pub fn id(value: Option<&Value>) -> Option<i64> {
    int(value).filter(|v| *v != 0)
}

pub fn small<T: TryFrom<i64>>(value: Option<&Value>) -> Option<T> {
    int(value).and_then(|v| T::try_from(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_numbers_and_numeric_strings() {
        assert_eq!(int(Some(&json!(12))), Some(12));
        assert_eq!(int(Some(&json!(" 12 "))), Some(12));
        assert_eq!(int(Some(&json!(""))), None);
        assert_eq!(int(Some(&json!(null))), None);
        assert_eq!(id(Some(&json!(0))), None);
        assert_eq!(small::<u8>(Some(&json!(300))), None);
    }

    #[test]
    fn blank_text_is_null() {
        assert_eq!(text(Some(&json!("  "))), None);
        assert_eq!(text(Some(&json!(" Jump Shot "))), Some("Jump Shot".to_string()));
    }
}
