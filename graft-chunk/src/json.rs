//! JSON record decoder.
//!
//! The input is a single JSON array of objects. Each object describes one
//! subject: the `"uid"` key names the subject and every other key is a
//! predicate. A value of the shape `{"uid": "..."}` is a reference to
//! another node; scalars are literals; an array fans out to one statement
//! per element.

use crate::error::{ChunkError, Result};
use graft_core::{ObjectValue, Statement};
use serde_json::Value;
use std::io::BufRead;

/// Chunker for JSON-array input. The whole array is one chunk; record
/// boundaries inside a JSON document are not splittable without parsing it
/// anyway.
pub struct JsonChunker {
    consumed: bool,
}

impl JsonChunker {
    pub fn new() -> Self {
        Self { consumed: false }
    }
}

impl Default for JsonChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Chunker for JsonChunker {
    fn next_chunk(&mut self, reader: &mut dyn BufRead) -> Result<Option<Vec<u8>>> {
        if self.consumed {
            return Ok(None);
        }
        self.consumed = true;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        if buf.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(None);
        }
        Ok(Some(buf))
    }

    fn parse(&self, chunk: &[u8]) -> Result<Vec<Statement>> {
        let value: Value = serde_json::from_slice(chunk)?;
        let records = match value {
            Value::Array(records) => records,
            other => {
                return Err(ChunkError::InvalidInput {
                    format: "json",
                    message: format!("expected a top-level array, got {}", kind(&other)),
                })
            }
        };
        let mut out = Vec::new();
        for record in &records {
            parse_record(record, &mut out)?;
        }
        Ok(out)
    }

    fn finalize(&mut self, _reader: &mut dyn BufRead) -> Result<()> {
        Ok(())
    }
}

fn parse_record(record: &Value, out: &mut Vec<Statement>) -> Result<()> {
    let obj = record.as_object().ok_or_else(|| ChunkError::InvalidInput {
        format: "json",
        message: format!("expected an object record, got {}", kind(record)),
    })?;
    let subject = obj
        .get("uid")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ChunkError::InvalidInput {
            format: "json",
            message: "record is missing a string \"uid\" key".to_string(),
        })?;

    for (predicate, value) in obj {
        if predicate == "uid" {
            continue;
        }
        match value {
            Value::Array(items) => {
                for item in items {
                    out.push(statement(subject, predicate, item)?);
                }
            }
            _ => out.push(statement(subject, predicate, value)?),
        }
    }
    Ok(())
}

fn statement(subject: &str, predicate: &str, value: &Value) -> Result<Statement> {
    let object = match value {
        Value::Object(map) => {
            let target = map
                .get("uid")
                .and_then(|v| v.as_str())
                .ok_or_else(|| ChunkError::InvalidInput {
                    format: "json",
                    message: format!(
                        "object value for {:?} must carry a string \"uid\"",
                        predicate
                    ),
                })?;
            ObjectValue::Ref(target.to_string())
        }
        Value::String(s) => ObjectValue::Literal(s.clone()),
        Value::Number(n) => ObjectValue::Literal(n.to_string()),
        Value::Bool(b) => ObjectValue::Literal(b.to_string()),
        Value::Null | Value::Array(_) => {
            return Err(ChunkError::InvalidInput {
                format: "json",
                message: format!("unsupported value for {:?}: {}", predicate, kind(value)),
            })
        }
    };
    Ok(Statement {
        subject: subject.to_string(),
        predicate: predicate.to_string(),
        object,
    })
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::super::Chunker;
    use super::*;
    use std::io::Cursor;

    fn decode(input: &str) -> Vec<Statement> {
        let mut reader = Cursor::new(input.as_bytes().to_vec());
        let mut ck = JsonChunker::new();
        let chunk = ck.next_chunk(&mut reader).unwrap().unwrap();
        let stmts = ck.parse(&chunk).unwrap();
        assert!(ck.next_chunk(&mut reader).unwrap().is_none());
        stmts
    }

    #[test]
    fn test_records_with_refs_and_literals() {
        let stmts = decode(
            r#"[
                {"uid": "alice", "name": "Alice", "age": 30, "knows": {"uid": "bob"}},
                {"uid": "bob", "active": true}
            ]"#,
        );
        // serde_json maps iterate in key order.
        assert_eq!(stmts.len(), 4);
        assert_eq!(stmts[0], Statement::literal("alice", "age", "30"));
        assert_eq!(stmts[1], Statement::reference("alice", "knows", "bob"));
        assert_eq!(stmts[2], Statement::literal("alice", "name", "Alice"));
        assert_eq!(stmts[3], Statement::literal("bob", "active", "true"));
    }

    #[test]
    fn test_array_values_fan_out() {
        let stmts = decode(r#"[{"uid": "a", "knows": [{"uid": "b"}, {"uid": "c"}]}]"#);
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].object.as_ref_name(), Some("b"));
        assert_eq!(stmts[1].object.as_ref_name(), Some("c"));
    }

    #[test]
    fn test_missing_uid_is_error() {
        let mut reader = Cursor::new(br#"[{"name": "Alice"}]"#.to_vec());
        let mut ck = JsonChunker::new();
        let chunk = ck.next_chunk(&mut reader).unwrap().unwrap();
        assert!(ck.parse(&chunk).is_err());
    }

    #[test]
    fn test_empty_stream() {
        let mut reader = Cursor::new(b"  \n".to_vec());
        let mut ck = JsonChunker::new();
        assert!(ck.next_chunk(&mut reader).unwrap().is_none());
    }
}
