//! Decode-only parser for script object literals.
//!
//! Storefront pages embed their product data as an object literal assigned
//! to a global variable. Such literals are close to JSON but routinely use
//! unquoted keys, single-quoted strings and trailing commas, which a strict
//! JSON decoder rejects. This parser accepts that superset and produces a
//! [`serde_json::Value`], while never resolving identifiers or evaluating
//! anything: a literal that is not pure data is a [`ParseError`].
use serde_json::{Map, Number, Value};
use std::fmt;
use thiserror::Error;

/// SEC-003: Maximum nesting depth of objects and arrays.
/// Bounds recursion on hostile or corrupted pages.
pub const MAX_LITERAL_DEPTH: usize = 128;

/// A literal that could not be decoded, with the position it failed at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at line {line}, column {column}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// 1-based line of the offending character.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    UnexpectedEnd,
    UnexpectedChar(char),
    /// An identifier where a value was expected (variables, calls, `NaN` ...).
    UnsupportedIdentifier(String),
    InvalidNumber(String),
    InvalidEscape,
    UnterminatedString,
    UnterminatedComment,
    TooDeep,
    TrailingContent,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEnd => write!(f, "unexpected end of literal"),
            Self::UnexpectedChar(c) => write!(f, "unexpected character {:?}", c),
            Self::UnsupportedIdentifier(name) => {
                write!(f, "identifier `{}` is not a data value", name)
            }
            Self::InvalidNumber(text) => write!(f, "invalid number `{}`", text),
            Self::InvalidEscape => write!(f, "invalid escape sequence"),
            Self::UnterminatedString => write!(f, "unterminated string"),
            Self::UnterminatedComment => write!(f, "unterminated comment"),
            Self::TooDeep => write!(f, "nesting deeper than {} levels", MAX_LITERAL_DEPTH),
            Self::TrailingContent => write!(f, "unexpected content after literal"),
        }
    }
}

/// Parses a script object literal into a JSON value.
///
/// Accepts everything strict JSON accepts, plus:
/// - unquoted identifier keys and numeric keys
/// - single-quoted strings and the script escape sequences (`\xHH`, `\u{..}`, `\v`, `\0`, line continuations)
/// - trailing commas in objects and arrays
/// - `+1`, `.5`, `5.` and `0x1F` number forms
/// - `undefined`, decoded as `null`
/// - `//` line comments and `/* */` block comments
///
/// Duplicate keys keep the last value.
///
/// # Errors
///
/// Returns a [`ParseError`] for anything outside that grammar, including
/// bare identifiers used as values, function calls, template literals,
/// `NaN`/`Infinity`, array holes, and content after the literal.
///
/// # Examples
///
/// ```
/// use storefeed::feed::parse_literal;
///
/// let value = parse_literal("{name: 'Acme', tags: ['a', 'b',],}").unwrap();
/// assert_eq!(value["name"], "Acme");
/// assert_eq!(value["tags"][1], "b");
///
/// assert!(parse_literal("{name: alert(1)}").is_err());
/// ```
pub fn parse_literal(text: &str) -> Result<Value, ParseError> {
    let mut parser = Parser::new(text);
    parser.skip_trivia()?;
    let value = parser.parse_value(0)?;
    parser.skip_trivia()?;
    if parser.peek().is_some() {
        return Err(parser.error(ParseErrorKind::TrailingContent));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.src[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        self.error_at(self.pos, kind)
    }

    fn error_at(&self, offset: usize, kind: ParseErrorKind) -> ParseError {
        let before = &self.src[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].chars().count() + 1;
        ParseError { kind, line, column }
    }

    fn unexpected(&self) -> ParseError {
        match self.peek() {
            Some(c) => self.error(ParseErrorKind::UnexpectedChar(c)),
            None => self.error(ParseErrorKind::UnexpectedEnd),
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    /// Skips whitespace and comments.
    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() || c == '\u{feff}' => {
                    self.bump();
                }
                Some('/') if self.peek_second() == Some('/') => {
                    while let Some(c) = self.bump() {
                        if matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}') {
                            break;
                        }
                    }
                }
                Some('/') if self.peek_second() == Some('*') => {
                    let start = self.pos;
                    match self.src[self.pos + 2..].find("*/") {
                        Some(end) => self.pos += 2 + end + 2,
                        None => {
                            return Err(self.error_at(start, ParseErrorKind::UnterminatedComment))
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Value, ParseError> {
        match self.peek() {
            Some('{') => self.parse_object(depth + 1),
            Some('[') => self.parse_array(depth + 1),
            Some(q @ ('"' | '\'')) => self.parse_string(q).map(Value::String),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => {
                self.parse_number().map(Value::Number)
            }
            Some(c) if is_ident_start(c) => {
                let start = self.pos;
                let ident = self.parse_identifier();
                match ident {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    "null" | "undefined" => Ok(Value::Null),
                    other => Err(self.error_at(
                        start,
                        ParseErrorKind::UnsupportedIdentifier(other.to_string()),
                    )),
                }
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_object(&mut self, depth: usize) -> Result<Value, ParseError> {
        if depth > MAX_LITERAL_DEPTH {
            return Err(self.error(ParseErrorKind::TooDeep));
        }
        self.expect('{')?;
        let mut map = Map::new();

        loop {
            self.skip_trivia()?;
            if self.peek() == Some('}') {
                self.bump();
                return Ok(Value::Object(map));
            }

            let key = self.parse_key()?;
            self.skip_trivia()?;
            self.expect(':')?;
            self.skip_trivia()?;
            let value = self.parse_value(depth)?;
            map.insert(key, value);

            self.skip_trivia()?;
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some('}') => {
                    self.bump();
                    return Ok(Value::Object(map));
                }
                _ => return Err(self.unexpected()),
            }
        }
    }

    fn parse_key(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(q @ ('"' | '\'')) => self.parse_string(q),
            Some(c) if is_ident_start(c) => Ok(self.parse_identifier().to_string()),
            Some(c) if c.is_ascii_digit() || c == '.' => {
                let start = self.pos;
                self.parse_number()?;
                Ok(self.src[start..self.pos].to_string())
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_array(&mut self, depth: usize) -> Result<Value, ParseError> {
        if depth > MAX_LITERAL_DEPTH {
            return Err(self.error(ParseErrorKind::TooDeep));
        }
        self.expect('[')?;
        let mut items = Vec::new();

        loop {
            self.skip_trivia()?;
            if self.peek() == Some(']') {
                self.bump();
                return Ok(Value::Array(items));
            }

            // Holes (`[1,,2]`) fall through to parse_value and fail on ','
            items.push(self.parse_value(depth)?);

            self.skip_trivia()?;
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(']') => {
                    self.bump();
                    return Ok(Value::Array(items));
                }
                _ => return Err(self.unexpected()),
            }
        }
    }

    fn parse_identifier(&mut self) -> &'a str {
        let src = self.src;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                self.bump();
            } else {
                break;
            }
        }
        &src[start..self.pos]
    }

    fn parse_string(&mut self, quote: char) -> Result<String, ParseError> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();

        loop {
            match self.bump() {
                None => return Err(self.error_at(start, ParseErrorKind::UnterminatedString)),
                Some(c) if c == quote => return Ok(out),
                Some('\n' | '\r') => {
                    return Err(self.error_at(start, ParseErrorKind::UnterminatedString))
                }
                Some('\\') => self.parse_escape(&mut out)?,
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<(), ParseError> {
        let escape_start = self.pos - 1;

        match self.bump() {
            None => return Err(self.error(ParseErrorKind::UnexpectedEnd)),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('v') => out.push('\u{b}'),
            Some('0') if !self.peek().is_some_and(|c| c.is_ascii_digit()) => out.push('\0'),
            Some('x') => match self.read_hex(2).and_then(char::from_u32) {
                Some(c) => out.push(c),
                None => return Err(self.error_at(escape_start, ParseErrorKind::InvalidEscape)),
            },
            Some('u') => match self.read_unicode_escape() {
                Some(code) => {
                    let c = self.combine_surrogates(code);
                    out.push(c);
                }
                None => return Err(self.error_at(escape_start, ParseErrorKind::InvalidEscape)),
            },
            // Line continuation
            Some('\r') => {
                if self.peek() == Some('\n') {
                    self.bump();
                }
            }
            Some('\n' | '\u{2028}' | '\u{2029}') => {}
            // Legacy octal escapes
            Some(c) if c.is_ascii_digit() => {
                return Err(self.error_at(escape_start, ParseErrorKind::InvalidEscape))
            }
            // Identity escapes: \" \' \\ \/ and any other character
            Some(c) => out.push(c),
        }
        Ok(())
    }

    /// Reads the payload of a `\u` escape: `XXXX` or `{X..}`.
    fn read_unicode_escape(&mut self) -> Option<u32> {
        if self.peek() == Some('{') {
            self.bump();
            let end = self.src[self.pos..].find('}')?;
            let digits = &self.src[self.pos..self.pos + end];
            if digits.is_empty() {
                return None;
            }
            // Any number of hex digits, as long as the value is a code point
            let mut code: u32 = 0;
            for c in digits.chars() {
                code = code * 16 + c.to_digit(16)?;
                if code > 0x10FFFF {
                    return None;
                }
            }
            self.pos += end + 1;
            Some(code)
        } else {
            self.read_hex(4)
        }
    }

    fn read_hex(&mut self, len: usize) -> Option<u32> {
        let digits = self.src.get(self.pos..self.pos + len)?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        self.pos += len;
        u32::from_str_radix(digits, 16).ok()
    }

    /// Joins a high surrogate with a following `\uXXXX` low surrogate.
    /// Unpaired surrogates have no `char` form and become U+FFFD.
    fn combine_surrogates(&mut self, code: u32) -> char {
        if (0xD800..0xDC00).contains(&code) && self.src[self.pos..].starts_with("\\u") {
            let saved = self.pos;
            self.pos += 2;
            match self.read_hex(4) {
                Some(low) if (0xDC00..0xE000).contains(&low) => {
                    let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                    return char::from_u32(combined).unwrap_or(char::REPLACEMENT_CHARACTER);
                }
                _ => self.pos = saved,
            }
        }
        char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    fn parse_number(&mut self) -> Result<Number, ParseError> {
        let start = self.pos;
        let negative = match self.peek() {
            Some('-') => {
                self.bump();
                true
            }
            Some('+') => {
                self.bump();
                false
            }
            _ => false,
        };

        if self.src[self.pos..].starts_with("0x") || self.src[self.pos..].starts_with("0X") {
            self.pos += 2;
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.bump();
            }
            let digits = &self.src[digits_start..self.pos];
            let text = &self.src[start..self.pos];
            let magnitude = i64::from_str_radix(digits, 16)
                .map_err(|_| self.error_at(start, ParseErrorKind::InvalidNumber(text.into())))?;
            self.ensure_number_boundary(start)?;
            return Ok(Number::from(if negative { -magnitude } else { magnitude }));
        }

        let int_start = self.pos;
        let mut int_digits = 0;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            int_digits += 1;
        }
        // Legacy octal (`007`) and `08` forms are syntax errors in strict code
        if int_digits > 1 && self.src[int_start..].starts_with('0') {
            return Err(self.error_at(
                start,
                ParseErrorKind::InvalidNumber(self.src[start..self.pos].to_string()),
            ));
        }
        let mut frac_digits = 0;
        let mut is_float = false;
        if self.peek() == Some('.') {
            self.bump();
            is_float = true;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
                frac_digits += 1;
            }
        }
        if int_digits == 0 && frac_digits == 0 {
            // `-Infinity`, `-foo`, a lone `.`
            return Err(self.error_at(
                start,
                ParseErrorKind::InvalidNumber(self.src[start..self.pos].to_string()),
            ));
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.bump();
            is_float = true;
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            let exp_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
            if self.pos == exp_start {
                return Err(self.error_at(
                    start,
                    ParseErrorKind::InvalidNumber(self.src[start..self.pos].to_string()),
                ));
            }
        }
        self.ensure_number_boundary(start)?;

        let text = &self.src[start..self.pos];
        let unsigned = text.trim_start_matches(['+', '-']);
        let invalid = || self.error_at(start, ParseErrorKind::InvalidNumber(text.to_string()));

        if !is_float {
            if let Ok(n) = unsigned.parse::<u64>() {
                if !negative {
                    return Ok(Number::from(n));
                }
                if let Some(n) = 0i64.checked_sub_unsigned(n) {
                    return Ok(Number::from(n));
                }
            }
        }

        // f64 parsing accepts ".5" and "5." forms
        let value: f64 = unsigned.parse().map_err(|_| invalid())?;
        let value = if negative { -value } else { value };
        Number::from_f64(value).ok_or_else(invalid)
    }

    /// A number must not run straight into an identifier (`12px`, `1n`).
    fn ensure_number_boundary(&self, start: usize) -> Result<(), ParseError> {
        match self.peek() {
            Some(c) if is_ident_continue(c) => {
                let mut end = self.pos;
                for c in self.src[self.pos..].chars() {
                    if !is_ident_continue(c) {
                        break;
                    }
                    end += c.len_utf8();
                }
                Err(self.error_at(
                    start,
                    ParseErrorKind::InvalidNumber(self.src[start..end].to_string()),
                ))
            }
            _ => Ok(()),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit() || c == '\u{200c}' || c == '\u{200d}'
}
