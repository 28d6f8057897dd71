//! DTOs for targeting rule endpoints.

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use validator::Validate;

use crate::domain::entities::TargetType;

/// Canonical attribute values are short ASCII tokens such as `ios`, `de` or `tablet`.
static TARGET_VALUE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[A-Za-z0-9_-]+\s*$").unwrap());

/// Request to add a targeting rule to a link.
///
/// ```json
/// { "type": "COUNTRY", "value": "DE", "target_url": "https://example.de", "priority": 10 }
/// ```
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTargetRequest {
    #[serde(rename = "type")]
    pub target_type: TargetType,

    #[validate(length(min = 1, max = 64))]
    #[validate(regex(path = "*TARGET_VALUE_REGEX", message = "Invalid target value"))]
    pub value: String,

    #[validate(url(message = "Invalid URL format"))]
    pub target_url: String,

    /// Higher priorities are evaluated first.
    #[serde(default)]
    #[validate(range(min = -1000, max = 1000))]
    pub priority: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: &str, url: &str) -> CreateTargetRequest {
        serde_json::from_value(json!({
            "type": "OS",
            "value": value,
            "target_url": url,
        }))
        .unwrap()
    }

    #[test]
    fn test_priority_defaults_to_zero() {
        let req = request("ios", "https://example.com/ios");

        assert_eq!(req.target_type, TargetType::Os);
        assert_eq!(req.priority, 0);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_value_and_url() {
        assert!(request("mac os", "https://example.com").validate().is_err());
        assert!(request("ios", "not a url").validate().is_err());
        assert!(request("", "https://example.com").validate().is_err());
    }

    #[test]
    fn test_unknown_type_does_not_deserialize() {
        let result = serde_json::from_value::<CreateTargetRequest>(json!({
            "type": "REFERRER",
            "value": "x",
            "target_url": "https://example.com",
        }));

        assert!(result.is_err());
    }
}
