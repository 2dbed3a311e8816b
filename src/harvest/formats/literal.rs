//! Restricted evaluator for Python literal expressions.
//!
//! Only literal syntax is understood: dicts, lists, tuples, strings,
//! numbers, `True`, `False` and `None`. Names, calls, operators and
//! subscripts are rejected, so nothing in the source is ever executed.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    None,
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
    Dict(Vec<(Literal, Literal)>),
}

impl Literal {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Items of a list or tuple.
    pub fn as_sequence(&self) -> Option<&[Literal]> {
        match self {
            Literal::List(items) | Literal::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a string key in a dict. Later duplicates win.
    pub fn get(&self, key: &str) -> Option<&Literal> {
        match self {
            Literal::Dict(pairs) => pairs
                .iter()
                .rev()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Joins a sequence of numbers (or numeric strings) with `.`.
    ///
    /// `(1, 2, 0)` becomes `"1.2.0"`. Returns `None` for anything else.
    pub fn join_dotted(&self) -> Option<String> {
        let parts = self
            .as_sequence()?
            .iter()
            .map(|item| match item {
                Literal::Int(n) => Some(n.to_string()),
                Literal::Float(f) => Some(f.to_string()),
                Literal::Str(s) => Some(s.clone()),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;
        Some(parts.join("."))
    }

    fn type_name(&self) -> &'static str {
        match self {
            Literal::Str(_) => "str",
            Literal::Int(_) => "int",
            Literal::Float(_) => "float",
            Literal::Bool(_) => "bool",
            Literal::None => "None",
            Literal::List(_) => "list",
            Literal::Tuple(_) => "tuple",
            Literal::Dict(_) => "dict",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct LiteralError {
    pub line: usize,
    pub message: String,
}

/// Finds the top-level `name = <literal>` assignment in `source` and
/// evaluates its right-hand side.
///
/// A top-level assignment starts in column zero. The first one wins.
///
/// # Errors
///
/// Fails if there is no such assignment, or if the right-hand side is not
/// a pure literal.
pub fn find_assignment(source: &str, name: &str) -> Result<Literal, LiteralError> {
    let start = locate_assignment(source, name).ok_or_else(|| LiteralError {
        line: 1,
        message: format!("no top-level `{name}` assignment"),
    })?;

    let mut parser = Parser::new(source, start);
    let value = parser.value()?;
    parser.expect_statement_end()?;
    Ok(value)
}

/// Byte offset just past the `=` of a column-zero `name =` line.
fn locate_assignment(source: &str, name: &str) -> Option<usize> {
    let mut offset = 0;
    for line in source.split_inclusive('\n') {
        if let Some(rest) = line.strip_prefix(name) {
            let trimmed = rest.trim_start_matches([' ', '\t']);
            if trimmed.starts_with('=') && !trimmed.starts_with("==") {
                let eq = offset + name.len() + (rest.len() - trimmed.len());
                return Some(eq + 1);
            }
        }
        offset += line.len();
    }
    None
}

/// Deepest bracket nesting accepted in a literal.
pub const MAX_DEPTH: usize = 64;

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, pos: usize) -> Self {
        Self { src, pos, depth: 0 }
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T, LiteralError> {
        let line = self.src[..self.pos].matches('\n').count() + 1;
        Err(LiteralError {
            line,
            message: message.into(),
        })
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Skips blanks. Newlines and comments only count as blanks inside
    /// brackets; a backslash continues a line anywhere.
    fn skip_blanks(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\x0c' | '\r' => {
                    self.bump();
                }
                '\\' if matches!(self.peek_at(1), Some('\n')) => {
                    self.pos += 2;
                }
                '\\' if self.src[self.pos..].starts_with("\\\r\n") => {
                    self.pos += 3;
                }
                '\n' if self.depth > 0 => {
                    self.bump();
                }
                '#' if self.depth > 0 => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn expect_statement_end(&mut self) -> Result<(), LiteralError> {
        self.skip_blanks();
        match self.peek() {
            None | Some('\n') | Some(';') => Ok(()),
            Some('#') => Ok(()),
            Some(c) => self.error(format!("unexpected `{c}` after literal")),
        }
    }

    fn value(&mut self) -> Result<Literal, LiteralError> {
        self.skip_blanks();
        let Some(c) = self.peek() else {
            return self.error("expected a literal, found end of input");
        };

        match c {
            '{' => self.dict(),
            '[' => self.list(),
            '(' => self.tuple_or_group(),
            '\'' | '"' => self.strings(),
            '0'..='9' | '.' => self.number(false),
            '+' | '-' => {
                self.bump();
                self.skip_blanks();
                match self.peek() {
                    Some('0'..='9' | '.') => self.number(c == '-'),
                    _ => self.error(format!("unary `{c}` is only allowed before a number")),
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                if self.string_prefix_len().is_some() {
                    self.strings()
                } else {
                    self.name()
                }
            }
            other => self.error(format!("unexpected `{other}`, expected a literal")),
        }
    }

    fn name(&mut self) -> Result<Literal, LiteralError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        match &self.src[start..self.pos] {
            "True" => Ok(Literal::Bool(true)),
            "False" => Ok(Literal::Bool(false)),
            "None" => Ok(Literal::None),
            other => {
                self.pos = start;
                self.error(format!("`{other}` is not a literal"))
            }
        }
    }

    /// Length of a string prefix (`r`, `u`, `b`, `rb`, ...) directly
    /// followed by a quote, if the input is at one.
    fn string_prefix_len(&self) -> Option<usize> {
        let rest = &self.src[self.pos..];
        let prefix_len = rest
            .char_indices()
            .find(|(_, c)| !c.is_ascii_alphabetic())
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let prefix = rest[..prefix_len].to_ascii_lowercase();
        let quoted = matches!(rest[prefix_len..].chars().next(), Some('\'' | '"'));
        let known = matches!(prefix.as_str(), "" | "r" | "u" | "b" | "br" | "rb");
        (quoted && known).then_some(prefix_len)
    }

    /// One string, plus any adjacent strings it is implicitly joined with.
    fn strings(&mut self) -> Result<Literal, LiteralError> {
        let mut out = self.string()?;
        loop {
            let save = self.pos;
            self.skip_blanks();
            if matches!(self.peek(), Some('\'' | '"'))
                || (matches!(self.peek(), Some(c) if c.is_ascii_alphabetic())
                    && self.string_prefix_len().is_some())
            {
                out.push_str(&self.string()?);
            } else {
                self.pos = save;
                return Ok(Literal::Str(out));
            }
        }
    }

    fn string(&mut self) -> Result<String, LiteralError> {
        let prefix_len = match self.string_prefix_len() {
            Some(n) => n,
            None => return self.error("expected a string"),
        };
        let raw = self.src[self.pos..self.pos + prefix_len]
            .to_ascii_lowercase()
            .contains('r');
        self.pos += prefix_len;

        let quote = self.bump().unwrap_or('"');
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.pos += 2;
        }

        let mut out = String::new();
        loop {
            let Some(c) = self.bump() else {
                return self.error("unterminated string");
            };
            match c {
                c if c == quote => {
                    if !triple {
                        return Ok(out);
                    }
                    if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                        self.pos += 2;
                        return Ok(out);
                    }
                    out.push(c);
                }
                '\n' if !triple => return self.error("unterminated string"),
                '\\' if raw => {
                    out.push('\\');
                    if let Some(next) = self.bump() {
                        out.push(next);
                    }
                }
                '\\' => self.escape(&mut out)?,
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), LiteralError> {
        let Some(c) = self.bump() else {
            return self.error("unterminated string");
        };
        match c {
            '\n' => {}
            '\r' => {
                if self.peek() == Some('\n') {
                    self.bump();
                }
            }
            '\\' | '\'' | '"' => out.push(c),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'v' => out.push('\x0b'),
            '0'..='7' => {
                let mut code = c.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            self.bump();
                        }
                        None => break,
                    }
                }
                self.push_code_point(out, code)?;
            }
            'x' => self.hex_escape(out, 2)?,
            'u' => self.hex_escape(out, 4)?,
            'U' => self.hex_escape(out, 8)?,
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn hex_escape(&mut self, out: &mut String, digits: usize) -> Result<(), LiteralError> {
        let end = self.pos + digits;
        let hex = self.src.get(self.pos..end).unwrap_or("");
        if hex.len() != digits || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return self.error("truncated hex escape");
        }
        let code = u32::from_str_radix(hex, 16).unwrap_or(u32::MAX);
        self.pos = end;
        self.push_code_point(out, code)
    }

    fn push_code_point(&self, out: &mut String, code: u32) -> Result<(), LiteralError> {
        match char::from_u32(code) {
            Some(ch) => {
                out.push(ch);
                Ok(())
            }
            None => self.error(format!("invalid code point {code:#x}")),
        }
    }

    fn number(&mut self, negative: bool) -> Result<Literal, LiteralError> {
        let start = self.pos;
        let mut prev = '\0';
        while let Some(c) = self.peek() {
            let exponent_sign = matches!(c, '+' | '-') && matches!(prev, 'e' | 'E');
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || exponent_sign {
                prev = c;
                self.bump();
            } else {
                break;
            }
        }

        let text: String = self.src[start..self.pos].chars().filter(|&c| c != '_').collect();
        let lower = text.to_ascii_lowercase();
        let radix = match lower.get(..2) {
            Some("0x") => Some(16),
            Some("0o") => Some(8),
            Some("0b") => Some(2),
            _ => None,
        };

        let literal = if let Some(radix) = radix {
            i64::from_str_radix(&lower[2..], radix).ok().map(Literal::Int)
        } else if lower.contains(['.', 'e']) && !lower.ends_with('j') {
            lower.parse::<f64>().ok().map(Literal::Float)
        } else {
            lower.parse::<i64>().ok().map(Literal::Int)
        };

        match literal {
            Some(Literal::Int(n)) if negative => Ok(Literal::Int(-n)),
            Some(Literal::Float(f)) if negative => Ok(Literal::Float(-f)),
            Some(value) => Ok(value),
            None => {
                self.pos = start;
                self.error(format!("invalid number `{text}`"))
            }
        }
    }

    /// Parses comma-separated items up to `close`, allowing a trailing comma.
    /// Returns the items and whether any comma was seen.
    fn items(&mut self, close: char) -> Result<(Vec<Literal>, bool), LiteralError> {
        let mut items = Vec::new();
        let mut saw_comma = false;
        loop {
            self.skip_blanks();
            if self.peek() == Some(close) {
                self.bump();
                return Ok((items, saw_comma));
            }
            items.push(self.value()?);
            self.skip_blanks();
            match self.peek() {
                Some(',') => {
                    self.bump();
                    saw_comma = true;
                }
                Some(c) if c == close => {}
                Some(c) => return self.error(format!("expected `,` or `{close}`, found `{c}`")),
                None => return self.error(format!("expected `{close}`, found end of input")),
            }
        }
    }

    /// Consumes an opening bracket.
    fn open(&mut self) -> Result<(), LiteralError> {
        if self.depth >= MAX_DEPTH {
            return self.error(format!("literal nested deeper than {MAX_DEPTH} levels"));
        }
        self.bump();
        self.depth += 1;
        Ok(())
    }

    fn list(&mut self) -> Result<Literal, LiteralError> {
        self.open()?;
        let (items, _) = self.items(']')?;
        self.depth -= 1;
        Ok(Literal::List(items))
    }

    fn tuple_or_group(&mut self) -> Result<Literal, LiteralError> {
        self.open()?;
        let (mut items, saw_comma) = self.items(')')?;
        self.depth -= 1;
        if items.len() == 1 && !saw_comma {
            return Ok(items.remove(0));
        }
        Ok(Literal::Tuple(items))
    }

    fn dict(&mut self) -> Result<Literal, LiteralError> {
        self.open()?;
        let mut pairs = Vec::new();
        loop {
            self.skip_blanks();
            if self.peek() == Some('}') {
                self.bump();
                break;
            }

            let key = self.value()?;
            if matches!(key, Literal::List(_) | Literal::Dict(_)) {
                return self.error(format!("unhashable dict key of type {}", key.type_name()));
            }
            self.skip_blanks();
            if self.bump() != Some(':') {
                return self.error("expected `:` after dict key");
            }
            let value = self.value()?;
            pairs.push((key, value));

            self.skip_blanks();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some('}') => {}
                Some(c) => return self.error(format!("expected `,` or `}}`, found `{c}`")),
                None => return self.error("expected `}`, found end of input"),
            }
        }
        self.depth -= 1;
        Ok(Literal::Dict(pairs))
    }
}
