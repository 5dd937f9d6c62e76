//! Serde adapter for ratios that may legitimately be infinite.
//!
//! JSON has no representation for infinity, and `serde_json` would silently
//! emit `null`. Use with `#[serde(with = "crate::domain::ratio")]`.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else if value.is_nan() {
        serializer.serialize_str("nan")
    } else if value.is_sign_positive() {
        serializer.serialize_str("inf")
    } else {
        serializer.serialize_str("-inf")
    }
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Number(v) => Ok(v),
        Repr::Text(s) => match s.as_str() {
            "inf" => Ok(f64::INFINITY),
            "-inf" => Ok(f64::NEG_INFINITY),
            "nan" => Ok(f64::NAN),
            other => Err(D::Error::custom(format!("invalid ratio '{other}'"))),
        },
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "super")]
        value: f64,
    }

    #[test]
    fn infinity_survives_json() {
        let json = serde_json::to_string(&Wrapper {
            value: f64::INFINITY,
        })
        .unwrap();
        assert_eq!(json, r#"{"value":"inf"}"#);
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert!(back.value.is_infinite() && back.value > 0.0);
    }

    #[test]
    fn finite_stays_numeric() {
        let json = serde_json::to_string(&Wrapper { value: 1.5 }).unwrap();
        assert_eq!(json, r#"{"value":1.5}"#);
    }

    #[test]
    fn rejects_unknown_text() {
        assert!(serde_json::from_str::<Wrapper>(r#"{"value":"lots"}"#).is_err());
    }
}
