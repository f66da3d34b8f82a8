//! Money helpers.
//!
//! Amounts are kept as `i64` minor units (paise) everywhere inside the crate.
//! The admin console speaks major units (rupees) for transaction and
//! selection amounts, so those fields go through [`major_units`] on the wire.

/// Largest amount accepted anywhere, in minor units (₹1,000 crore).
pub const MAX_AMOUNT_MINOR: i64 = 1_000_000_000_000;

/// Rupees → paise, rounded half away from zero to the nearest paisa.
pub fn to_minor_units(major: f64) -> i64 {
    (major * 100.0).round() as i64
}

pub fn to_major_units(minor: i64) -> f64 {
    minor as f64 / 100.0
}

/// `percent`% of `amount`, rounded to the nearest minor unit.
pub fn percent_of(amount: i64, percent: f64) -> i64 {
    (amount as f64 * percent / 100.0).round() as i64
}

/// `#[serde(with = "crate::utils::money::major_units")]` for `i64` minor-unit fields.
pub mod major_units {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &i64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(super::to_major_units(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let major = f64::deserialize(deserializer)?;
        if !major.is_finite() {
            return Err(serde::de::Error::custom("amount must be a finite number"));
        }
        let limit = super::to_major_units(super::MAX_AMOUNT_MINOR);
        if major.abs() > limit {
            return Err(serde::de::Error::custom(format!(
                "amount {major} exceeds the limit of {limit}"
            )));
        }
        Ok(super::to_minor_units(major))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Wire {
        #[serde(with = "major_units")]
        amount: i64,
    }

    #[test]
    fn test_minor_unit_conversion() {
        assert_eq!(to_minor_units(150.0), 15000);
        assert_eq!(to_minor_units(99.99), 9999);
        assert_eq!(to_minor_units(0.5), 50);
        assert_eq!(to_minor_units(-12.5), -1250);
        assert_eq!(to_major_units(12345), 123.45);
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(100_000, 2.5), 2500);
        assert_eq!(percent_of(2500, 18.0), 450);
        assert_eq!(percent_of(333, 10.0), 33);
        assert_eq!(percent_of(0, 18.0), 0);
    }

    #[test]
    fn test_major_units_serde() {
        let wire: Wire = serde_json::from_str(r#"{"amount": 250.75}"#).unwrap();
        assert_eq!(wire.amount, 25075);

        let json = serde_json::to_value(&Wire { amount: 1050 }).unwrap();
        assert_eq!(json["amount"], 10.5);

        let from_int: Wire = serde_json::from_str(r#"{"amount": 100}"#).unwrap();
        assert_eq!(from_int.amount, 10000);
    }

    #[test]
    fn test_major_units_rejects_out_of_range_amounts() {
        assert!(serde_json::from_str::<Wire>(r#"{"amount": 1e300}"#).is_err());
        assert!(serde_json::from_str::<Wire>(r#"{"amount": -1e300}"#).is_err());
        assert!(serde_json::from_str::<Wire>(r#"{"amount": 10000000001}"#).is_err());

        let at_limit: Wire = serde_json::from_str(r#"{"amount": 10000000000}"#).unwrap();
        assert_eq!(at_limit.amount, MAX_AMOUNT_MINOR);
    }
}
