//! Line tokenizer for the snapshot format.
//!
//! The format is line oriented: a header line opens a block, `key: value`
//! lines fill it, blank lines separate blocks.

use chumsky::input::MapExtra;
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

/// Marker that opens a block
pub const HEADER_MARKER: &str = "### NAME: ";

/// Separates the display name from the location on a header line
pub const HEADER_SEPARATOR: &str = " | ";

/// Label in front of the location on a header line
pub const LOCATION_LABEL: &str = "LOCATION: ";

/// Separates a key from its value
pub const FIELD_SEPARATOR: &str = ": ";

/// A token in the snapshot format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Everything after the header marker
    Header(&'a str),

    /// `key: value`, split on the first separator, both sides trimmed
    Field { key: &'a str, value: &'a str },

    /// Empty or whitespace-only line
    Blank,

    /// Any other line
    Text(&'a str),
}

impl std::fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Header(rest) => write!(f, "{}{}", HEADER_MARKER, rest),
            Token::Field { key, value } => write!(f, "{}{}{}", key, FIELD_SEPARATOR, value),
            Token::Blank => Ok(()),
            Token::Text(text) => write!(f, "{}", text),
        }
    }
}

/// A token with the 1-based line it came from and its byte span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spanned<'a> {
    pub line: usize,
    pub span: SimpleSpan,
    pub token: Token<'a>,
}

type Lexed<'a> = Vec<(Token<'a>, SimpleSpan)>;

/// Lexer for a whole snapshot, one token per line.
///
/// Lines end at `\n` or `\r\n`; the last line needs no terminator, and an
/// empty trailing line is not a line.
pub fn lexer<'a>() -> impl Parser<'a, &'a str, Lexed<'a>, extra::Err<Rich<'a, char>>> {
    let eol = just("\r\n").or(just("\n")).labelled("end of line");

    let rest_of_line = any().and_is(eol.clone().not()).repeated().to_slice();

    let space = any()
        .filter(|c: &char| c.is_whitespace())
        .and_is(eol.clone().not());

    let blank = space
        .clone()
        .repeated()
        .then(eol.clone().rewind().ignored().or(end()))
        .to(Token::Blank);

    let header = space
        .repeated()
        .ignore_then(just(HEADER_MARKER))
        .ignore_then(rest_of_line.clone())
        .map(Token::Header);

    let field = any()
        .and_is(just(FIELD_SEPARATOR).not())
        .and_is(eol.clone().not())
        .repeated()
        .to_slice()
        .then_ignore(just(FIELD_SEPARATOR))
        .then(rest_of_line.clone())
        .map(|(key, value): (&'a str, &'a str)| Token::Field {
            key: key.trim(),
            value: value.trim(),
        });

    let text = rest_of_line.map(Token::Text);

    let line = choice((blank, header, field, text))
        .map_with(|tok, e: &mut MapExtra<'a, '_, &'a str, _>| (tok, e.span()));

    let terminated = line.clone().then_ignore(eol);
    let last = any().rewind().ignore_then(line).then_ignore(end());

    choice((terminated, last)).repeated().collect()
}

/// Tokenize `text` one line at a time
pub fn tokenize(text: &str) -> impl Iterator<Item = Spanned<'_>> {
    // Every line lexes as at least `Text`, so the lexer accepts any input.
    let tokens = lexer().parse(text).into_output().unwrap_or_default();
    tokens
        .into_iter()
        .enumerate()
        .map(|(i, (token, span))| Spanned {
            line: i + 1,
            span,
            token,
        })
}

/// Split a header into its display name and location.
///
/// The location is taken after the last ` | LOCATION: `, so names that
/// contain ` | ` survive. A header without the label splits on the first
/// ` | ` instead. Returns None when there is no separator at all.
pub fn split_header(header: &str) -> Option<(&str, &str)> {
    let labelled = format!("{}{}", HEADER_SEPARATOR, LOCATION_LABEL);
    header
        .rsplit_once(labelled.as_str())
        .or_else(|| header.split_once(HEADER_SEPARATOR))
        .map(|(name, location)| (name.trim(), location.trim()))
}
