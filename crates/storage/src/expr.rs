//! Expression evaluator for the local replica
//!
//! ```text
//! expression := collection [ "where" condition { "and" condition } ]
//! condition  := field "=" literal
//! literal    := JSON scalar | "quoted string" | bare word
//! ```
//!
//! A bare word that is not a JSON scalar compares as a string, so
//! `settings where env = prod` and `settings where env = "prod"` are the
//! same query.

use roomq_core::{Error, Result};
use serde_json::Value;

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    /// Collection the expression reads
    pub collection: String,
    /// Field equality conditions, all of which must hold
    pub conditions: Vec<(String, Value)>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Quoted(String),
    Eq,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '=' {
            chars.next();
            tokens.push(Token::Eq);
        } else if c == '"' {
            chars.next();
            let mut text = String::new();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => match chars.next() {
                        Some(escaped) => text.push(escaped),
                        None => break,
                    },
                    '"' => {
                        closed = true;
                        break;
                    }
                    other => text.push(other),
                }
            }
            if !closed {
                return Err(Error::execution("unterminated string literal"));
            }
            tokens.push(Token::Quoted(text));
        } else {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || c == '=' || c == '"' {
                    break;
                }
                word.push(c);
                chars.next();
            }
            tokens.push(Token::Word(word));
        }
    }

    Ok(tokens)
}

fn literal(token: Token) -> Result<Value> {
    match token {
        Token::Quoted(text) => Ok(Value::String(text)),
        Token::Word(word) => match serde_json::from_str::<Value>(&word) {
            Ok(v) if !v.is_object() && !v.is_array() => Ok(v),
            _ => Ok(Value::String(word)),
        },
        Token::Eq => Err(Error::execution("expected a value after '='")),
    }
}

impl Expression {
    /// Parse expression text.
    ///
    /// # Errors
    ///
    /// Returns an execution error describing the first syntax problem.
    pub fn parse(input: &str) -> Result<Self> {
        let mut tokens = tokenize(input)?.into_iter();

        let collection = match tokens.next() {
            Some(Token::Word(word)) => word,
            Some(_) => return Err(Error::execution("expression must start with a collection")),
            None => return Err(Error::execution("empty expression")),
        };

        let mut conditions = Vec::new();
        match tokens.next() {
            None => return Ok(Self { collection, conditions }),
            Some(Token::Word(w)) if w == "where" => {}
            Some(other) => {
                return Err(Error::execution(format!(
                    "expected 'where' after collection, found {:?}",
                    other
                )))
            }
        }

        loop {
            let field = match tokens.next() {
                Some(Token::Word(field)) => field,
                _ => return Err(Error::execution("expected a field name")),
            };
            if tokens.next() != Some(Token::Eq) {
                return Err(Error::execution(format!("expected '=' after '{}'", field)));
            }
            let value = match tokens.next() {
                Some(token) => literal(token)?,
                None => return Err(Error::execution(format!("missing value for '{}'", field))),
            };
            conditions.push((field, value));

            match tokens.next() {
                None => break,
                Some(Token::Word(w)) if w == "and" => continue,
                Some(other) => {
                    return Err(Error::execution(format!(
                        "expected 'and' between conditions, found {:?}",
                        other
                    )))
                }
            }
        }

        Ok(Self { collection, conditions })
    }

    /// Whether a record payload satisfies every condition.
    pub fn matches(&self, value: &Value) -> bool {
        self.conditions.iter().all(|(field, expected)| {
            value
                .get(field)
                .map(|actual| actual == expected)
                .unwrap_or(false)
        })
    }
}
