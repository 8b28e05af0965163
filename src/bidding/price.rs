/// 금액 모델
/// 소수점 둘째 자리까지의 음이 아닌 금액을 최소 단위(센트) 정수로 보관한다.
// region:    --- Imports
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// endregion: --- Imports

// region:    --- Price
const SCALE: i64 = 100;
const FRACTION_DIGITS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(i64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    #[error("price is empty")]
    Empty,
    #[error("price must not be negative")]
    Negative,
    #[error("price is not a decimal number: {0}")]
    Malformed(String),
    #[error("price allows at most two decimal places: {0}")]
    TooPrecise(String),
    #[error("price is too large: {0}")]
    Overflow(String),
}

impl Price {
    pub const ZERO: Price = Price(0);

    /// 센트 단위 값으로 생성
    pub fn from_cents(cents: i64) -> Result<Self, PriceError> {
        if cents < 0 {
            return Err(PriceError::Negative);
        }
        Ok(Price(cents))
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    /// JSON 값(문자열 또는 숫자)에서 금액 파싱
    pub fn from_json(value: &serde_json::Value) -> Result<Self, PriceError> {
        match value {
            serde_json::Value::String(s) => s.parse(),
            serde_json::Value::Number(n) => n.to_string().parse(),
            other => Err(PriceError::Malformed(other.to_string())),
        }
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(PriceError::Empty);
        }
        if s.starts_with('-') {
            return Err(PriceError::Negative);
        }
        let s = s.strip_prefix('+').unwrap_or(s);

        let (whole, fraction) = match s.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (s, ""),
        };
        let digits_only = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !digits_only(whole) || !digits_only(fraction) {
            return Err(PriceError::Malformed(raw.to_string()));
        }
        // "12.50" 처럼 뒤따르는 0은 정밀도로 치지 않는다
        let fraction = fraction.trim_end_matches('0');
        if fraction.len() > FRACTION_DIGITS {
            return Err(PriceError::TooPrecise(raw.to_string()));
        }

        let overflow = || PriceError::Overflow(raw.to_string());
        let whole: i64 = whole.parse().map_err(|_| overflow())?;
        let mut minor: i64 = 0;
        if !fraction.is_empty() {
            let padded = format!("{:0<width$}", fraction, width = FRACTION_DIGITS);
            minor = padded
                .parse()
                .map_err(|_| PriceError::Malformed(raw.to_string()))?;
        }
        whole
            .checked_mul(SCALE)
            .and_then(|w| w.checked_add(minor))
            .map(Price)
            .ok_or_else(overflow)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / SCALE, self.0 % SCALE)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct PriceVisitor;

impl<'de> Visitor<'de> for PriceVisitor {
    type Value = Price;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative decimal price as a string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Price, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Price, E> {
        v.to_string().parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Price, E> {
        v.to_string().parse().map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Price, E> {
        if !v.is_finite() {
            return Err(E::custom(PriceError::Malformed(v.to_string())));
        }
        v.to_string().parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PriceVisitor)
    }
}
// endregion: --- Price

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_decimal_strings() {
        assert_eq!("12".parse::<Price>().unwrap().cents(), 1200);
        assert_eq!("12.5".parse::<Price>().unwrap().cents(), 1250);
        assert_eq!("12.05".parse::<Price>().unwrap().cents(), 1205);
        assert_eq!(" 0.99 ".parse::<Price>().unwrap().cents(), 99);
        assert_eq!("15.000".parse::<Price>().unwrap().cents(), 1500);
    }

    #[test]
    fn rejects_malformed_prices() {
        assert_eq!("".parse::<Price>(), Err(PriceError::Empty));
        assert_eq!("-1".parse::<Price>(), Err(PriceError::Negative));
        assert!(matches!("abc".parse::<Price>(), Err(PriceError::Malformed(_))));
        assert!(matches!("NaN".parse::<Price>(), Err(PriceError::Malformed(_))));
        assert!(matches!("1e5".parse::<Price>(), Err(PriceError::Malformed(_))));
        assert!(matches!(".5".parse::<Price>(), Err(PriceError::Malformed(_))));
        assert!(matches!("1.234".parse::<Price>(), Err(PriceError::TooPrecise(_))));
        assert!(matches!(
            "99999999999999999999".parse::<Price>(),
            Err(PriceError::Overflow(_))
        ));
    }

    #[test]
    fn displays_two_decimals() {
        assert_eq!(Price::from_cents(1500).unwrap().to_string(), "15.00");
        assert_eq!(Price::from_cents(7).unwrap().to_string(), "0.07");
    }

    #[test]
    fn reads_json_numbers_and_strings() {
        assert_eq!(Price::from_json(&json!(12)).unwrap().cents(), 1200);
        assert_eq!(Price::from_json(&json!(12.5)).unwrap().cents(), 1250);
        assert_eq!(Price::from_json(&json!("11.00")).unwrap().cents(), 1100);
        assert!(Price::from_json(&json!(true)).is_err());

        let parsed: Price = serde_json::from_value(json!(10.25)).unwrap();
        assert_eq!(parsed.cents(), 1025);
        assert_eq!(serde_json::to_value(parsed).unwrap(), json!("10.25"));
    }
}
// endregion: --- Tests
