//! Type tags and lookup keys.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Discriminator selecting which resolution strategy applies to a load.
///
/// The set is closed: any string outside it is rejected with
/// [`DomainError::UnsupportedType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeTag {
    LearningOutcome,
    LearningOutcomeGroup,
    Term,
    TermBySis,
    Course,
    CourseBySis,
    Assignment,
    Submission,
    SubmissionByAssignmentAndUser,
}

impl TypeTag {
    /// Every supported tag.
    pub const ALL: [TypeTag; 9] = [
        TypeTag::LearningOutcome,
        TypeTag::LearningOutcomeGroup,
        TypeTag::Term,
        TypeTag::TermBySis,
        TypeTag::Course,
        TypeTag::CourseBySis,
        TypeTag::Assignment,
        TypeTag::Submission,
        TypeTag::SubmissionByAssignmentAndUser,
    ];

    /// Returns the wire name of the tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::LearningOutcome => "LearningOutcome",
            TypeTag::LearningOutcomeGroup => "LearningOutcomeGroup",
            TypeTag::Term => "Term",
            TypeTag::TermBySis => "TermBySis",
            TypeTag::Course => "Course",
            TypeTag::CourseBySis => "CourseBySis",
            TypeTag::Assignment => "Assignment",
            TypeTag::Submission => "Submission",
            TypeTag::SubmissionByAssignmentAndUser => "SubmissionByAssignmentAndUser",
        }
    }

    /// Parses a wire name into a tag.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        TypeTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| DomainError::UnsupportedType {
                type_tag: s.to_string(),
            })
    }

    /// The entity class a tag resolves to.
    pub fn node_kind(&self) -> NodeKind {
        match self {
            TypeTag::LearningOutcome => NodeKind::LearningOutcome,
            TypeTag::LearningOutcomeGroup => NodeKind::LearningOutcomeGroup,
            TypeTag::Term | TypeTag::TermBySis => NodeKind::EnrollmentTerm,
            TypeTag::Course | TypeTag::CourseBySis => NodeKind::Course,
            TypeTag::Assignment => NodeKind::Assignment,
            TypeTag::Submission | TypeTag::SubmissionByAssignmentAndUser => NodeKind::Submission,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeTag::parse(s)
    }
}

/// Entity class stored behind one or more type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    LearningOutcome,
    LearningOutcomeGroup,
    EnrollmentTerm,
    Course,
    Assignment,
    Submission,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::LearningOutcome => "LearningOutcome",
            NodeKind::LearningOutcomeGroup => "LearningOutcomeGroup",
            NodeKind::EnrollmentTerm => "EnrollmentTerm",
            NodeKind::Course => "Course",
            NodeKind::Assignment => "Assignment",
            NodeKind::Submission => "Submission",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier supplied with a load.
///
/// A key is either a scalar (numeric primary key, numeric string or SIS id)
/// or a composite of named fields. Which shape is acceptable depends on the
/// [`TypeTag`]; a key of the wrong shape resolves to absence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LookupKey {
    Number(u64),
    Text(String),
    Composite(BTreeMap<String, LookupKey>),
}

impl LookupKey {
    /// Creates a composite key from `(field, value)` pairs.
    pub fn composite<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<LookupKey>,
    {
        LookupKey::Composite(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns the canonical form of the key.
    ///
    /// Text is trimmed and numeric text becomes [`LookupKey::Number`], so
    /// `"0042"`, `" 42 "` and `42` all normalize to the same key. Composite
    /// fields are normalized recursively. External ids use
    /// [`LookupKey::normalized_external`] instead.
    pub fn normalized(&self) -> LookupKey {
        match self {
            LookupKey::Number(n) => LookupKey::Number(*n),
            LookupKey::Text(s) => {
                let trimmed = s.trim();
                match parse_id(trimmed) {
                    Some(n) => LookupKey::Number(n),
                    None => LookupKey::Text(trimmed.to_string()),
                }
            }
            LookupKey::Composite(fields) => LookupKey::Composite(
                fields
                    .iter()
                    .map(|(k, v)| (k.trim().to_string(), v.normalized()))
                    .collect(),
            ),
        }
    }

    /// Returns the canonical form of an external (SIS) id key.
    ///
    /// SIS ids are opaque: text is only trimmed, so `"0042"` and `"42"` stay
    /// distinct. Numbers become their decimal text.
    pub fn normalized_external(&self) -> LookupKey {
        match self {
            LookupKey::Number(n) => LookupKey::Text(n.to_string()),
            LookupKey::Text(s) => LookupKey::Text(s.trim().to_string()),
            LookupKey::Composite(_) => self.normalized(),
        }
    }

    /// Interprets the key as a primary key.
    pub fn as_id(&self) -> Option<u64> {
        match self {
            LookupKey::Number(n) => Some(*n).filter(|id| *id > 0),
            LookupKey::Text(s) => parse_id(s.trim()),
            LookupKey::Composite(_) => None,
        }
    }

    /// Interprets the key as an external (SIS) identifier.
    pub fn as_external_id(&self) -> Option<String> {
        match self {
            LookupKey::Number(n) => Some(n.to_string()),
            LookupKey::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            LookupKey::Composite(_) => None,
        }
    }

    /// Returns a named field of a composite key.
    pub fn field(&self, name: &str) -> Option<&LookupKey> {
        match self {
            LookupKey::Composite(fields) => fields.get(name),
            _ => None,
        }
    }
}

/// Primary keys are positive decimal integers.
fn parse_id(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<u64>().ok().filter(|id| *id > 0)
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupKey::Number(n) => write!(f, "{n}"),
            LookupKey::Text(s) => write!(f, "{s:?}"),
            LookupKey::Composite(fields) => {
                f.write_str("{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<u64> for LookupKey {
    fn from(n: u64) -> Self {
        LookupKey::Number(n)
    }
}

impl From<&str> for LookupKey {
    fn from(s: &str) -> Self {
        LookupKey::Text(s.to_string())
    }
}

impl From<String> for LookupKey {
    fn from(s: String) -> Self {
        LookupKey::Text(s)
    }
}

/// Converts GraphQL-style JSON arguments into a key.
///
/// The conversion is total: values that can never identify a record
/// (negative numbers, booleans, arrays, null) become text keys that no
/// strategy will match, so they resolve to absence instead of failing.
impl From<serde_json::Value> for LookupKey {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(n) => match n.as_u64() {
                Some(n) => LookupKey::Number(n),
                None => LookupKey::Text(n.to_string()),
            },
            serde_json::Value::String(s) => LookupKey::Text(s),
            serde_json::Value::Object(map) => LookupKey::Composite(
                map.into_iter()
                    .map(|(k, v)| (k, LookupKey::from(v)))
                    .collect(),
            ),
            other => LookupKey::Text(other.to_string()),
        }
    }
}

/// Structured keys accepted by composite-key strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositeKey {
    AssignmentAndUser { assignment_id: u64, user_id: u64 },
}

impl CompositeKey {
    /// Reads an `{assignment_id, user_id}` pair out of a lookup key.
    pub fn assignment_and_user(key: &LookupKey) -> Option<Self> {
        let assignment_id = key.field("assignment_id")?.as_id()?;
        let user_id = key.field("user_id")?.as_id()?;
        Some(CompositeKey::AssignmentAndUser {
            assignment_id,
            user_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_tag_round_trips_through_its_name() {
        for tag in TypeTag::ALL {
            assert_eq!(TypeTag::parse(tag.as_str()).unwrap(), tag);
            assert_eq!(tag.to_string().parse::<TypeTag>().unwrap(), tag);
        }
    }

    #[test]
    fn test_unknown_tag_is_unsupported() {
        let err = TypeTag::parse("Quiz").unwrap_err();
        assert!(matches!(err, DomainError::UnsupportedType { ref type_tag } if type_tag == "Quiz"));
        assert!(TypeTag::parse("learningoutcome").is_err());
        assert!(TypeTag::parse("").is_err());
    }

    #[test]
    fn test_tags_map_to_node_kinds() {
        assert_eq!(TypeTag::TermBySis.node_kind(), NodeKind::EnrollmentTerm);
        assert_eq!(
            TypeTag::SubmissionByAssignmentAndUser.node_kind(),
            NodeKind::Submission
        );
        assert_eq!(TypeTag::CourseBySis.node_kind(), NodeKind::Course);
    }

    #[test]
    fn test_numeric_text_normalizes_to_number() {
        assert_eq!(LookupKey::from("0042").normalized(), LookupKey::Number(42));
        assert_eq!(LookupKey::from(" 42 ").normalized(), LookupKey::Number(42));
        assert_eq!(
            LookupKey::from(" sis-1 ").normalized(),
            LookupKey::Text("sis-1".to_string())
        );
    }

    #[test]
    fn test_external_ids_keep_leading_zeros() {
        assert_eq!(
            LookupKey::from(" 0042 ").normalized_external(),
            LookupKey::Text("0042".to_string())
        );
        assert_eq!(
            LookupKey::Number(42).normalized_external(),
            LookupKey::Text("42".to_string())
        );
        assert_ne!(
            LookupKey::from("0042").normalized_external(),
            LookupKey::from("42").normalized_external()
        );
        assert_eq!(
            LookupKey::from("0042").normalized_external().as_external_id(),
            Some("0042".to_string())
        );
    }

    #[test]
    fn test_as_id_rejects_non_numeric_and_zero() {
        assert_eq!(LookupKey::Number(0).as_id(), None);
        assert_eq!(LookupKey::from("9999999").as_id(), Some(9_999_999));
        assert_eq!(LookupKey::from("garbage").as_id(), None);
        assert_eq!(LookupKey::from("-1").as_id(), None);
        assert_eq!(LookupKey::from("0").as_id(), None);
        assert_eq!(LookupKey::from("1.5").as_id(), None);
        assert_eq!(LookupKey::composite([("id", 1u64)]).as_id(), None);
    }

    #[test]
    fn test_external_id_requires_non_empty_scalar() {
        assert_eq!(
            LookupKey::from(" term-2024 ").as_external_id(),
            Some("term-2024".to_string())
        );
        assert_eq!(LookupKey::from(17u64).as_external_id(), Some("17".to_string()));
        assert_eq!(LookupKey::from("   ").as_external_id(), None);
        assert_eq!(
            LookupKey::composite([("sis_id", "x")]).as_external_id(),
            None
        );
    }

    #[test]
    fn test_composite_key_requires_both_fields() {
        let key = LookupKey::composite([("assignment_id", "10"), ("user_id", "20")]);
        assert_eq!(
            CompositeKey::assignment_and_user(&key),
            Some(CompositeKey::AssignmentAndUser {
                assignment_id: 10,
                user_id: 20
            })
        );

        let missing = LookupKey::composite([("assignment_id", 10u64)]);
        assert_eq!(CompositeKey::assignment_and_user(&missing), None);

        let malformed = LookupKey::composite([("assignment_id", "ten"), ("user_id", "20")]);
        assert_eq!(CompositeKey::assignment_and_user(&malformed), None);

        assert_eq!(CompositeKey::assignment_and_user(&LookupKey::from(10u64)), None);
    }

    #[test]
    fn test_json_conversion_is_total() {
        let key = LookupKey::from(serde_json::json!({"assignment_id": 1, "user_id": "2"}));
        assert!(CompositeKey::assignment_and_user(&key).is_some());

        assert_eq!(LookupKey::from(serde_json::json!(5)), LookupKey::Number(5));
        assert_eq!(LookupKey::from(serde_json::json!(-5)).as_id(), None);
        assert_eq!(LookupKey::from(serde_json::json!(null)).as_id(), None);
        assert_eq!(LookupKey::from(serde_json::json!([1, 2])).as_id(), None);
    }
}
