//! Attribute path expressions.
//!
//! Grammar accepted by [`AttributePath::parse`]:
//!
//! ```text
//! path      = [schemaUrn ":"] attrName [filter] ["." subAttr] [filter]
//! filter    = "[" orExpr "]"
//! orExpr    = andExpr *("or" andExpr)
//! andExpr   = primary *("and" primary)
//! primary   = "(" orExpr ")" / attrName "eq" literal
//! ```
//!
//! Only one bracketed filter is allowed per path. Schema URN prefixes are
//! matched greedily against the known URNs of the resource type, longest
//! first, so URNs containing `:` or `.` are never split at the wrong place.

use serde_json::Value;
use std::fmt;

use crate::error::{PatchError, PatchResult};
use crate::schema::AttributeDefinition;

/// A parsed attribute path.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributePath {
    /// The path as supplied by the client
    pub raw: String,
    /// Schema URN prefix, if any
    pub schema_urn: Option<String>,
    /// Top-level attribute name; empty when the path is a bare schema URN
    pub attribute: String,
    pub sub_attribute: Option<String>,
    pub filter: Option<Filter>,
}

impl AttributePath {
    /// Parse `path`, matching schema prefixes against `known_urns`.
    ///
    /// `known_urns` should be ordered longest first.
    pub fn parse(path: &str, known_urns: &[&str]) -> PatchResult<Self> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(PatchError::path_syntax(path, "Attribute path must not be empty"));
        }

        let (schema_urn, rest) = split_schema_urn(trimmed, known_urns);
        let mut parsed = AttributePath {
            raw: trimmed.to_string(),
            schema_urn,
            attribute: String::new(),
            sub_attribute: None,
            filter: None,
        };
        if rest.is_empty() && parsed.schema_urn.is_some() {
            return Ok(parsed);
        }

        let (attribute, mut rest) = take_name(rest);
        parsed.attribute = validate_name(trimmed, attribute)?.to_string();

        if rest.starts_with('[') {
            let (filter, after) = take_filter(trimmed, rest)?;
            parsed.filter = Some(filter);
            rest = after;
        }
        if let Some(after_dot) = rest.strip_prefix('.') {
            let (sub, after) = take_name(after_dot);
            parsed.sub_attribute = Some(validate_name(trimmed, sub)?.to_string());
            rest = after;
        }
        if rest.starts_with('[') && parsed.filter.is_none() {
            let (filter, after) = take_filter(trimmed, rest)?;
            parsed.filter = Some(filter);
            rest = after;
        }
        if !rest.is_empty() {
            return Err(PatchError::path_syntax(
                trimmed,
                format!("Unexpected '{rest}' in attribute path '{trimmed}'"),
            ));
        }
        Ok(parsed)
    }

    /// Whether the path names a schema rather than an attribute.
    pub fn is_schema_reference(&self) -> bool {
        self.attribute.is_empty()
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Split a known schema URN off the front of `path`.
///
/// When no known URN matches but the attribute portion still contains a
/// colon, everything up to the last colon is treated as an (unknown) URN so
/// the resolver can report the attribute as unknown.
fn split_schema_urn<'p>(path: &'p str, known_urns: &[&str]) -> (Option<String>, &'p str) {
    for urn in known_urns {
        let Some(prefix) = path.get(..urn.len()) else {
            continue;
        };
        if !prefix.eq_ignore_ascii_case(urn) {
            continue;
        }
        let rest = &path[urn.len()..];
        if rest.is_empty() {
            return (Some(urn.to_string()), rest);
        }
        if let Some(rest) = rest.strip_prefix(':') {
            return (Some(urn.to_string()), rest);
        }
    }

    let head = path.split('[').next().unwrap_or(path);
    match head.rfind(':') {
        Some(index) => (Some(path[..index].to_string()), &path[index + 1..]),
        None => (None, path),
    }
}

fn take_name(input: &str) -> (&str, &str) {
    let end = input.find(['.', '[']).unwrap_or(input.len());
    input.split_at(end)
}

fn validate_name<'n>(path: &str, name: &'n str) -> PatchResult<&'n str> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '$'));
    if valid {
        Ok(name)
    } else {
        Err(PatchError::path_syntax(
            path,
            format!("Invalid attribute name '{name}' in path '{path}'"),
        ))
    }
}

/// Parse the bracketed filter at the start of `input`, returning the rest.
fn take_filter<'i>(path: &str, input: &'i str) -> PatchResult<(Filter, &'i str)> {
    let close = matching_bracket(input)
        .ok_or_else(|| PatchError::path_syntax(path, format!("Unbalanced brackets in path '{path}'")))?;
    let filter = Filter::parse(&input[1..close])
        .map_err(|message| PatchError::path_syntax(path, message))?;
    Ok((filter, &input[close + 1..]))
}

/// Index of the `]` closing the `[` at index 0, skipping quoted strings.
fn matching_bracket(input: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (index, c) in input.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

/// A filter over the elements of a multi-valued attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `attribute eq value`; `value` is the implicit attribute of simple elements
    Equals { attribute: String, value: Value },
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
}

impl Filter {
    /// Parse a filter expression without its brackets.
    pub fn parse(expression: &str) -> Result<Self, String> {
        let tokens = tokenize(expression)?;
        if tokens.is_empty() {
            return Err("Filter expression must not be empty".to_string());
        }
        let mut parser = FilterParser { tokens, position: 0 };
        let filter = parser.or_expression()?;
        match parser.peek() {
            None => Ok(filter),
            Some(token) => Err(format!(
                "Unexpected token '{token}' in filter expression '{expression}'"
            )),
        }
    }

    /// Attribute names compared by this filter.
    pub fn attributes(&self) -> Vec<&str> {
        match self {
            Self::Equals { attribute, .. } => vec![attribute.as_str()],
            Self::And(left, right) | Self::Or(left, right) => {
                let mut names = left.attributes();
                names.extend(right.attributes());
                names
            }
        }
    }

    /// Evaluate against one element of the multi-valued attribute `definition`.
    pub fn matches(&self, element: &Value, definition: &AttributeDefinition) -> bool {
        match self {
            Self::Equals { attribute, value } => match element {
                Value::Object(object) => {
                    let case_exact = definition
                        .sub_attribute(attribute)
                        .is_some_and(|sub| sub.case_exact);
                    match object.iter().find(|(key, _)| key.eq_ignore_ascii_case(attribute)) {
                        Some((_, actual)) => values_equal(actual, value, case_exact),
                        None => value.is_null(),
                    }
                }
                scalar => {
                    attribute.eq_ignore_ascii_case("value")
                        && values_equal(scalar, value, definition.case_exact)
                }
            },
            Self::And(left, right) => {
                left.matches(element, definition) && right.matches(element, definition)
            }
            Self::Or(left, right) => {
                left.matches(element, definition) || right.matches(element, definition)
            }
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals { attribute, value } => write!(f, "{attribute} eq {value}"),
            Self::And(left, right) => write!(f, "({left}) and ({right})"),
            Self::Or(left, right) => write!(f, "({left}) or ({right})"),
        }
    }
}

/// Equality used by filters: strings honour `case_exact`, numbers compare by value.
pub(crate) fn values_equal(actual: &Value, expected: &Value, case_exact: bool) -> bool {
    match (actual, expected) {
        (Value::String(a), Value::String(b)) if case_exact => a == b,
        (Value::String(a), Value::String(b)) => a.to_lowercase() == b.to_lowercase(),
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => a.as_f64() == b.as_f64(),
        },
        _ => actual == expected,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open,
    Close,
    Word(String),
    Text(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("("),
            Self::Close => f.write_str(")"),
            Self::Word(word) => f.write_str(word),
            Self::Text(text) => write!(f, "\"{text}\""),
        }
    }
}

fn tokenize(expression: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = expression.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '"' => {
                chars.next();
                let mut escaped = false;
                let mut end = None;
                for (index, c) in chars.by_ref() {
                    match c {
                        _ if escaped => escaped = false,
                        '\\' => escaped = true,
                        '"' => {
                            end = Some(index);
                            break;
                        }
                        _ => {}
                    }
                }
                let end = end.ok_or_else(|| {
                    format!("Unterminated string literal in filter expression '{expression}'")
                })?;
                let text: String = serde_json::from_str(&expression[start..=end])
                    .map_err(|_| format!("Invalid string literal '{}'", &expression[start..=end]))?;
                tokens.push(Token::Text(text));
            }
            _ => {
                let mut end = expression.len();
                while let Some(&(index, c)) = chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' {
                        end = index;
                        break;
                    }
                    chars.next();
                }
                tokens.push(Token::Word(expression[start..end].to_string()));
            }
        }
    }
    Ok(tokens)
}

struct FilterParser {
    tokens: Vec<Token>,
    position: usize,
}

impl FilterParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn next_is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(word)) if word.eq_ignore_ascii_case(keyword))
    }

    fn or_expression(&mut self) -> Result<Filter, String> {
        let mut filter = self.and_expression()?;
        while self.next_is_keyword("or") {
            self.position += 1;
            filter = Filter::Or(Box::new(filter), Box::new(self.and_expression()?));
        }
        Ok(filter)
    }

    fn and_expression(&mut self) -> Result<Filter, String> {
        let mut filter = self.primary()?;
        while self.next_is_keyword("and") {
            self.position += 1;
            filter = Filter::And(Box::new(filter), Box::new(self.primary()?));
        }
        Ok(filter)
    }

    fn primary(&mut self) -> Result<Filter, String> {
        match self.next() {
            Some(Token::Open) => {
                let filter = self.or_expression()?;
                match self.next() {
                    Some(Token::Close) => Ok(filter),
                    _ => Err("Missing ')' in filter expression".to_string()),
                }
            }
            Some(Token::Word(attribute)) => {
                let comparator = match self.next() {
                    Some(Token::Word(word)) => word,
                    Some(other) => return Err(format!("Unsupported filter comparator '{other}'")),
                    None => return Err(format!("Missing comparator after '{attribute}'")),
                };
                if !comparator.eq_ignore_ascii_case("eq") {
                    return Err(format!("Unsupported filter comparator '{comparator}'"));
                }
                let value = match self.next() {
                    Some(Token::Text(text)) => Value::String(text),
                    Some(Token::Word(word)) => serde_json::from_str::<Value>(&word)
                        .ok()
                        .filter(|value| !value.is_array() && !value.is_object())
                        .ok_or_else(|| format!("Invalid filter literal '{word}'"))?,
                    _ => return Err(format!("Missing literal after '{attribute} {comparator}'")),
                };
                Ok(Filter::Equals { attribute, value })
            }
            Some(token) => Err(format!("Unexpected token '{token}' in filter expression")),
            None => Err("Unexpected end of filter expression".to_string()),
        }
    }
}
