use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Opaque identifier of a search result.
///
/// The search endpoint may hand out numeric or string ids. Both are kept in
/// their textual form, which is what ends up in the hidden input. Nothing in
/// this crate interprets the value beyond equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ResultId(String);

impl ResultId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ResultId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Serialize for ResultId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ResultId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ResultIdVisitor;

        impl Visitor<'_> for ResultIdVisitor {
            type Value = ResultId;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a string or integer id")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<ResultId, E> {
                Ok(ResultId(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<ResultId, E> {
                Ok(ResultId(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<ResultId, E> {
                Ok(ResultId(v.to_string()))
            }

            // `4.0` becomes "4", `4.5` stays "4.5"
            fn visit_f64<E: de::Error>(self, v: f64) -> Result<ResultId, E> {
                Ok(ResultId(v.to_string()))
            }
        }

        deserializer.deserialize_any(ResultIdVisitor)
    }
}

/// One match returned by the user search endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: ResultId,
    /// Display text, e.g. `Ana García (ana@example.com)`
    pub text: String,
}

impl SearchResult {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: ResultId::new(id),
            text: text.into(),
        }
    }
}

/// The committed choice of an autocomplete widget: what the user sees and
/// what the form posts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Value of the visible text input
    pub text: String,
    /// Value of the hidden input (empty when nothing is selected)
    pub id: String,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }
}

/// Monotonic token attached to each issued lookup.
///
/// A response is only applied while the token it carries is still the
/// widget's current generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestGeneration(u64);

impl RequestGeneration {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_id_accepts_numbers_and_strings() {
        let numeric: SearchResult = serde_json::from_str(r#"{"id": 42, "text": "Ana"}"#).unwrap();
        assert_eq!(numeric.id.as_str(), "42");

        let textual: SearchResult =
            serde_json::from_str(r#"{"id": "u-7", "text": "Luis", "email": "x"}"#).unwrap();
        assert_eq!(textual.id, ResultId::from("u-7"));
    }

    #[test]
    fn test_result_id_accepts_floats_as_text() {
        let whole: SearchResult = serde_json::from_str(r#"{"id": 4.0, "text": "Ana"}"#).unwrap();
        assert_eq!(whole.id.as_str(), "4");

        let results: Vec<SearchResult> = serde_json::from_str(
            r#"[{"id": 1, "text": "Luis"}, {"id": 2.5, "text": "Eva"}]"#,
        )
        .unwrap();
        assert_eq!(results[1].id.as_str(), "2.5");
    }

    #[test]
    fn test_result_id_rejects_objects() {
        let parsed = serde_json::from_str::<SearchResult>(r#"{"id": {"a": 1}, "text": "Ana"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_generation_is_monotonic() {
        let g0 = RequestGeneration::default();
        let g1 = g0.next();
        assert!(g1 > g0);
        assert_eq!(g1.next().value(), 2);
    }
}
