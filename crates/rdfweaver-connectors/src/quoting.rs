//! Identifier quoting for dotted SQL names.
//!
//! Every dotted chain of identifier words (`schema.table`, `db.schema.table`,
//! `t.column`) found anywhere in a statement is rewritten with each segment
//! delimited, so that segments which collide with SQL keywords (`object`,
//! `user`, `order`) still parse. Single identifiers are left alone.
//!
//! The match is lexical: it does not skip string literals, so a dotted word
//! inside a quoted string is rewritten too.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Two or more ASCII words joined by dots; group 1 is the first word.
static IDENTIFIER_CHAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z0-9_]+)(?:\.[A-Za-z0-9_]+)+").unwrap());

/// Identifier delimiters understood by the supported engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteStyle {
    /// `[name]`: SQL Server and SQLite.
    #[default]
    Brackets,
    /// `"name"`: ANSI, Postgres and SQLite.
    DoubleQuotes,
    /// `` `name` ``: MySQL.
    Backticks,
}

impl QuoteStyle {
    /// Delimit a single identifier, doubling any embedded closing delimiter.
    pub fn quote(&self, ident: &str) -> String {
        let (open, close) = match self {
            QuoteStyle::Brackets => ('[', ']'),
            QuoteStyle::DoubleQuotes => ('"', '"'),
            QuoteStyle::Backticks => ('`', '`'),
        };
        let mut quoted = String::with_capacity(ident.len() + 2);
        quoted.push(open);
        for c in ident.chars() {
            if c == close {
                quoted.push(close);
            }
            quoted.push(c);
        }
        quoted.push(close);
        quoted
    }
}

/// Quote every dotted identifier chain in `query` with brackets.
///
/// `object.table` becomes `[object].[table]`.
pub fn quote_identifiers(query: &str) -> String {
    quote_identifiers_with(query, QuoteStyle::Brackets)
}

/// Quote every dotted identifier chain in `query` with the given style.
pub fn quote_identifiers_with(query: &str, style: QuoteStyle) -> String {
    IDENTIFIER_CHAIN
        .replace_all(query, |caps: &Captures<'_>| {
            let chain = &caps[0];
            // `1.5` is a number, not a chain
            if caps[1].bytes().all(|b| b.is_ascii_digit()) {
                return chain.to_string();
            }
            chain
                .split('.')
                .map(|segment| style.quote(segment))
                .collect::<Vec<_>>()
                .join(".")
        })
        .into_owned()
}
