//! Query input parsing
//!
//! The query argument is read with one of two grammars, chosen once by the
//! `--named-query` flag:
//!
//! - **Named**: `name` or `name:prop1,prop2,...`
//! - **Expression**: the raw text is handed to the store's evaluator

/// Parsed query argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySpec {
    /// A pre-registered query looked up by exact name
    Named {
        /// Query name (text before the first `:`)
        name: String,
        /// Requested properties, in request order; `None` without a `:` suffix
        properties: Option<Vec<String>>,
    },
    /// A raw expression for the store's evaluator
    Expression {
        /// Expression text, unmodified
        text: String,
    },
}

impl QuerySpec {
    /// Parse the query argument.
    ///
    /// In named mode the text after the first `:` is split on `,`; pieces are
    /// trimmed, empty pieces dropped, order kept. A suffix that filters down
    /// to nothing still yields `Some(vec![])`.
    pub fn parse(input: &str, named: bool) -> Self {
        if !named {
            return QuerySpec::Expression {
                text: input.to_string(),
            };
        }

        match input.split_once(':') {
            None => QuerySpec::Named {
                name: input.to_string(),
                properties: None,
            },
            Some((name, suffix)) => QuerySpec::Named {
                name: name.to_string(),
                properties: Some(
                    suffix
                        .split(',')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(String::from)
                        .collect(),
                ),
            },
        }
    }

    /// Name or expression, for diagnostics
    pub fn label(&self) -> &str {
        match self {
            QuerySpec::Named { name, .. } => name,
            QuerySpec::Expression { text } => text,
        }
    }
}
