use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt, str::FromStr};

use crate::error::WeatherError;

/// True iff `candidate` is exactly five ASCII digits.
pub fn is_valid_zip_code(candidate: &str) -> bool {
    candidate.len() == 5 && candidate.bytes().all(|b| b.is_ascii_digit())
}

/// A validated 5-digit US ZIP code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ZipCode(String);

impl ZipCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZipCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for ZipCode {
    type Error = WeatherError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if is_valid_zip_code(value) {
            Ok(ZipCode(value.to_owned()))
        } else {
            Err(WeatherError::Validation(format!(
                "Invalid ZIP code format: '{value}' (expected exactly 5 digits)"
            )))
        }
    }
}

impl TryFrom<String> for ZipCode {
    type Error = WeatherError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if !is_valid_zip_code(&value) {
            return ZipCode::try_from(value.as_str());
        }
        Ok(ZipCode(value))
    }
}

impl FromStr for ZipCode {
    type Err = WeatherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ZipCode::try_from(s)
    }
}

impl From<ZipCode> for String {
    fn from(zip: ZipCode) -> Self {
        zip.0
    }
}

impl AsRef<str> for ZipCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn accepts_exactly_five_digits() {
        assert!(is_valid_zip_code("12345"));
        assert!(is_valid_zip_code("00501"));
    }

    #[test]
    fn rejects_everything_else() {
        for bad in ["", "1234", "123456", "abcde", "12 34", "1234a", " 12345", "１２３４５"] {
            assert!(!is_valid_zip_code(bad), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn parse_error_is_validation() {
        let err = ZipCode::try_from("9410").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("9410"));
    }

    #[test]
    fn serde_rejects_invalid_keys() {
        let zip: ZipCode = serde_json::from_str("\"94107\"").expect("valid zip");
        assert_eq!(zip.as_str(), "94107");

        assert!(serde_json::from_str::<ZipCode>("\"SF\"").is_err());
    }
}
