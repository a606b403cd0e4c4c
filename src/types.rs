//! Core test-case types.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Scenario class of a generated test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestCategory {
    Valid,
    Edge,
    Invalid,
}

impl TestCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            TestCategory::Valid => "valid",
            TestCategory::Edge => "edge",
            TestCategory::Invalid => "invalid",
        }
    }
}

impl fmt::Display for TestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "valid" => Ok(TestCategory::Valid),
            "edge" => Ok(TestCategory::Edge),
            "invalid" => Ok(TestCategory::Invalid),
            other => Err(format!(
                "unknown category '{}' (expected valid, edge or invalid)",
                other
            )),
        }
    }
}

impl<'de> Deserialize<'de> for TestCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A generated test case. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub category: TestCategory,
    pub method: String,
    pub endpoint: String,
    #[serde(default)]
    pub headers: Option<Map<String, Value>>,
    #[serde(default)]
    pub body: Option<Value>,
    pub expected_response_code: u16,
}
