//! N-Quads-style RDF line decoder.
//!
//! One statement per line: subject, predicate, object, optional graph
//! label, terminated by `.`. Subjects and object references may be written
//! as `<iri>`, `_:bnode`, or a bare token; literals are double-quoted with
//! optional `@lang` or `^^<datatype>` annotations, which are kept on the
//! stored lexical form.

use crate::error::{ChunkError, Result};
use graft_core::Statement;
use std::io::BufRead;

/// Lines read per chunk. Keeps chunks small enough that a parse error
/// reports a nearby line number while amortizing reader overhead.
const LINES_PER_CHUNK: usize = 1000;

/// Chunker for line-oriented RDF input.
pub struct RdfChunker {
    /// Line number of the first line of the chunk currently being parsed.
    base_line: usize,
    /// Total lines handed out so far.
    lines_read: usize,
}

impl RdfChunker {
    pub fn new() -> Self {
        Self {
            base_line: 0,
            lines_read: 0,
        }
    }
}

impl Default for RdfChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Chunker for RdfChunker {
    fn next_chunk(&mut self, reader: &mut dyn BufRead) -> Result<Option<Vec<u8>>> {
        let mut buf = Vec::new();
        let mut lines = 0;
        while lines < LINES_PER_CHUNK {
            let n = reader.read_until(b'\n', &mut buf)?;
            if n == 0 {
                break;
            }
            lines += 1;
        }
        if buf.is_empty() {
            return Ok(None);
        }
        self.base_line = self.lines_read;
        self.lines_read += lines;
        Ok(Some(buf))
    }

    fn parse(&self, chunk: &[u8]) -> Result<Vec<Statement>> {
        let text = std::str::from_utf8(chunk).map_err(|e| ChunkError::InvalidInput {
            format: "rdf",
            message: e.to_string(),
        })?;
        let mut out = Vec::new();
        for (i, line) in text.lines().enumerate() {
            let line_no = self.base_line + i + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            out.push(parse_line(trimmed, line_no)?);
        }
        Ok(out)
    }

    fn finalize(&mut self, _reader: &mut dyn BufRead) -> Result<()> {
        Ok(())
    }
}

/// Parse one statement line.
fn parse_line(line: &str, line_no: usize) -> Result<Statement> {
    let mut scan = Scanner::new(line, line_no);

    let subject = scan.term()?;
    let predicate = scan.term()?;
    let object = scan.object()?;

    // Optional graph label, ignored.
    scan.skip_ws();
    if !scan.rest().starts_with('.') {
        let _ = scan.term()?;
    }
    scan.skip_ws();
    if !scan.rest().starts_with('.') {
        return Err(ChunkError::parse(line_no, "expected terminating '.'"));
    }

    Ok(Statement {
        subject,
        predicate,
        object,
    })
}

/// Object position: quoted literal or node reference.
enum Term {
    Name(String),
    Literal(String),
}

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
    line_no: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str, line_no: usize) -> Self {
        Self {
            input,
            pos: 0,
            line_no,
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn err(&self, message: impl Into<String>) -> ChunkError {
        ChunkError::parse(self.line_no, message)
    }

    /// A node-position term: `<iri>`, `_:bnode`, or a bare token.
    fn term(&mut self) -> Result<String> {
        match self.any_term()? {
            Term::Name(n) => Ok(n),
            Term::Literal(_) => Err(self.err("unexpected literal in node position")),
        }
    }

    fn object(&mut self) -> Result<graft_core::ObjectValue> {
        match self.any_term()? {
            Term::Name(n) => Ok(graft_core::ObjectValue::Ref(n)),
            Term::Literal(v) => Ok(graft_core::ObjectValue::Literal(v)),
        }
    }

    fn any_term(&mut self) -> Result<Term> {
        self.skip_ws();
        let rest = self.rest();
        if rest.is_empty() {
            return Err(self.err("unexpected end of line"));
        }
        if let Some(inner) = rest.strip_prefix('<') {
            let end = inner
                .find('>')
                .ok_or_else(|| self.err("unterminated IRI"))?;
            self.pos += end + 2;
            return Ok(Term::Name(inner[..end].to_string()));
        }
        if rest.starts_with('"') {
            return self.literal();
        }
        // Bare token (includes `_:bnode`): up to the next whitespace.
        let end = rest
            .find(char::is_whitespace)
            .unwrap_or(rest.len());
        self.pos += end;
        Ok(Term::Name(rest[..end].to_string()))
    }

    /// Quoted literal with escapes, plus optional `@lang` / `^^<dt>` suffix
    /// kept on the lexical form.
    fn literal(&mut self) -> Result<Term> {
        let rest = self.rest();
        debug_assert!(rest.starts_with('"'));
        let bytes = rest.as_bytes();
        let mut value = String::new();
        let mut i = 1;
        loop {
            if i >= bytes.len() {
                return Err(self.err("unterminated string literal"));
            }
            match bytes[i] {
                b'"' => break,
                b'\\' => {
                    let esc = bytes
                        .get(i + 1)
                        .ok_or_else(|| self.err("dangling escape"))?;
                    match esc {
                        b'n' => value.push('\n'),
                        b't' => value.push('\t'),
                        b'r' => value.push('\r'),
                        b'"' => value.push('"'),
                        b'\\' => value.push('\\'),
                        other => {
                            return Err(
                                self.err(format!("invalid escape '\\{}'", *other as char))
                            )
                        }
                    }
                    i += 2;
                }
                _ => {
                    // Multi-byte chars: extend over the full char.
                    let ch = rest[i..]
                        .chars()
                        .next()
                        .ok_or_else(|| self.err("invalid UTF-8 boundary"))?;
                    value.push(ch);
                    i += ch.len_utf8();
                }
            }
        }
        let mut end = i + 1;
        let tail = &rest[end..];
        if let Some(lang) = tail.strip_prefix('@') {
            let n = lang
                .find(char::is_whitespace)
                .unwrap_or(lang.len());
            value.push('@');
            value.push_str(&lang[..n]);
            end += 1 + n;
        } else if let Some(dt) = tail.strip_prefix("^^<") {
            let n = dt.find('>').ok_or_else(|| self.err("unterminated datatype IRI"))?;
            value.push_str("^^");
            value.push_str(&dt[..n]);
            end += 3 + n + 1;
        }
        self.pos += end;
        Ok(Term::Literal(value))
    }
}

#[cfg(test)]
mod tests {
    use super::super::Chunker;
    use super::*;
    use graft_core::ObjectValue;
    use std::io::Cursor;

    fn parse_one(line: &str) -> Statement {
        parse_line(line, 1).unwrap()
    }

    #[test]
    fn test_parse_reference() {
        let st = parse_one("<alice> <knows> <bob> .");
        assert_eq!(st.subject, "alice");
        assert_eq!(st.predicate, "knows");
        assert_eq!(st.object, ObjectValue::Ref("bob".to_string()));
    }

    #[test]
    fn test_parse_literal_with_lang() {
        let st = parse_one("_:a <name> \"Alice\"@en .");
        assert_eq!(st.subject, "_:a");
        assert_eq!(st.object, ObjectValue::Literal("Alice@en".to_string()));
    }

    #[test]
    fn test_parse_literal_with_datatype() {
        let st = parse_one("<a> <age> \"30\"^^<http://www.w3.org/2001/XMLSchema#int> .");
        assert_eq!(
            st.object,
            ObjectValue::Literal("30^^http://www.w3.org/2001/XMLSchema#int".to_string())
        );
    }

    #[test]
    fn test_parse_escapes() {
        let st = parse_one(r#"<a> <bio> "line1\nline2 \"quoted\"" ."#);
        assert_eq!(
            st.object,
            ObjectValue::Literal("line1\nline2 \"quoted\"".to_string())
        );
    }

    #[test]
    fn test_graph_label_ignored() {
        let st = parse_one("<a> <knows> <b> <g> .");
        assert_eq!(st.object, ObjectValue::Ref("b".to_string()));
    }

    #[test]
    fn test_missing_dot_is_error() {
        assert!(parse_line("<a> <knows> <b>", 1).is_err());
    }

    #[test]
    fn test_chunking_and_comments() {
        let input = "# header\n<a> <p> <b> .\n\n<b> <p> \"v\" .\n";
        let mut reader = Cursor::new(input.as_bytes().to_vec());
        let mut ck = RdfChunker::new();
        let chunk = ck.next_chunk(&mut reader).unwrap().unwrap();
        let stmts = ck.parse(&chunk).unwrap();
        assert_eq!(stmts.len(), 2);
        assert!(ck.next_chunk(&mut reader).unwrap().is_none());
        ck.finalize(&mut reader).unwrap();
    }

    #[test]
    fn test_chunk_boundaries_preserve_order() {
        let mut input = String::new();
        for i in 0..2500 {
            input.push_str(&format!("<s{i}> <p> \"{i}\" .\n"));
        }
        let mut reader = Cursor::new(input.into_bytes());
        let mut ck = RdfChunker::new();
        let mut total = Vec::new();
        while let Some(chunk) = ck.next_chunk(&mut reader).unwrap() {
            total.extend(ck.parse(&chunk).unwrap());
        }
        assert_eq!(total.len(), 2500);
        assert_eq!(total[0].subject, "s0");
        assert_eq!(total[2499].subject, "s2499");
    }

    #[test]
    fn test_parse_error_reports_line() {
        let input = "<a> <p> <b> .\nnot a statement\n";
        let mut reader = Cursor::new(input.as_bytes().to_vec());
        let mut ck = RdfChunker::new();
        let chunk = ck.next_chunk(&mut reader).unwrap().unwrap();
        let err = ck.parse(&chunk).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }
}
