//serde helper for ratios that may be infinite
//json has no literal for inf or nan, so non-finite values travel as strings
//("inf", "-inf", "NaN") and finite values stay plain numbers

use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_str(&value.to_string())
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Number(value) => Ok(value),
        Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Ratio {
        #[serde(with = "super")]
        value: f64,
    }

    fn round_trip(value: f64) -> (String, f64) {
        let json = serde_json::to_string(&Ratio { value }).unwrap();
        let back: Ratio = serde_json::from_str(&json).unwrap();
        (json, back.value)
    }

    #[test]
    fn finite_values_stay_numbers() {
        let (json, back) = round_trip(1.5);
        assert_eq!(json, r#"{"value":1.5}"#);
        assert_eq!(back, 1.5);
    }

    #[test]
    fn infinities_travel_as_strings() {
        let (json, back) = round_trip(f64::INFINITY);
        assert_eq!(json, r#"{"value":"inf"}"#);
        assert_eq!(back, f64::INFINITY);

        let (json, back) = round_trip(f64::NEG_INFINITY);
        assert_eq!(json, r#"{"value":"-inf"}"#);
        assert_eq!(back, f64::NEG_INFINITY);
    }

    #[test]
    fn nan_survives() {
        let (json, back) = round_trip(f64::NAN);
        assert_eq!(json, r#"{"value":"NaN"}"#);
        assert!(back.is_nan());
    }

    #[test]
    fn integers_and_garbage() {
        let ratio: Ratio = serde_json::from_str(r#"{"value":3}"#).unwrap();
        assert_eq!(ratio.value, 3.0);

        assert!(serde_json::from_str::<Ratio>(r#"{"value":"lots"}"#).is_err());
        assert!(serde_json::from_str::<Ratio>(r#"{"value":null}"#).is_err());
    }
}
