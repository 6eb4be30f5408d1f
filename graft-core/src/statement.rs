//! Statement - the unit of graph data moved by the loader
//!
//! A statement is a subject-predicate-object record. The object is either a
//! literal value or a reference to another node. Subjects and object
//! references carry external names until the resolver rewrites them to
//! canonical internal-id form; the record itself is immutable once parsed,
//! so resolution produces a new `Statement`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Object position of a statement: a literal value or a node reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectValue {
    /// Literal value, stored in its lexical form (language tags and
    /// datatype annotations are preserved verbatim by the decoder).
    Literal(String),
    /// Reference to another node by external name or canonical id.
    Ref(String),
}

impl ObjectValue {
    /// Returns the referenced node name, if this is a reference.
    pub fn as_ref_name(&self) -> Option<&str> {
        match self {
            ObjectValue::Ref(name) => Some(name),
            ObjectValue::Literal(_) => None,
        }
    }
}

/// A single subject-predicate-object record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub subject: String,
    pub predicate: String,
    pub object: ObjectValue,
}

impl Statement {
    /// Statement with a literal object.
    pub fn literal(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: ObjectValue::Literal(value.into()),
        }
    }

    /// Statement whose object references another node.
    pub fn reference(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: ObjectValue::Ref(object.into()),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.object {
            ObjectValue::Literal(v) => {
                write!(f, "<{}> <{}> {:?} .", self.subject, self.predicate, v)
            }
            ObjectValue::Ref(o) => write!(f, "<{}> <{}> <{}> .", self.subject, self.predicate, o),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ref_name_access() {
        let st = Statement::reference("a", "knows", "b");
        assert_eq!(st.object.as_ref_name(), Some("b"));

        let st = Statement::literal("a", "name", "Alice");
        assert_eq!(st.object.as_ref_name(), None);
    }

    #[test]
    fn test_serde_round_trip() {
        let st = Statement::reference("0x1", "knows", "0x2");
        let json = serde_json::to_string(&st).unwrap();
        let back: Statement = serde_json::from_str(&json).unwrap();
        assert_eq!(st, back);
    }

    #[test]
    fn test_display() {
        let st = Statement::literal("a", "name", "Alice");
        assert_eq!(st.to_string(), "<a> <name> \"Alice\" .");
    }
}
