// Lexer for SpineML markup documents.
//
// Tokenizes the XML subset used by SpineML component and network files into
// a flat stream the parser folds into an element tree. Uses the `logos` crate
// for DFA-based lexing, in two passes: markup lexemes first (tags, text,
// comments), then the interior of each start tag (name, attributes).
//
// Preconditions: input is valid UTF-8.
// Postconditions: returns all tokens with byte-offset spans, plus any lex errors.
// Failure modes: malformed tags, unknown entities or stray characters produce
//                `LexError`; lexing continues past them.
// Side effects: none.

use logos::Logos;
use std::fmt;

/// Byte-offset span in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A lexer error with location.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub span: Span,
    pub message: String,
}

/// Result of lexing: tokens plus any errors (non-fatal).
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<(Token, Span)>,
    pub errors: Vec<LexError>,
}

/// Markup tokens consumed by the parser.
///
/// Names and values are already entity-decoded. Whitespace-only character
/// data between tags is dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `<name` opening a start tag.
    Open(String),
    /// `name="value"` inside a start tag.
    Attr(String, String),
    /// `>` ending a start tag whose element has content.
    TagEnd,
    /// `/>` ending an empty element.
    EmptyEnd,
    /// `</name>`.
    Close(String),
    /// Character data, including CDATA sections.
    Text(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Open(name) => write!(f, "<{name}"),
            Token::Attr(name, value) => write!(f, "{name}=\"{value}\""),
            Token::TagEnd => write!(f, ">"),
            Token::EmptyEnd => write!(f, "/>"),
            Token::Close(name) => write!(f, "</{name}>"),
            Token::Text(_) => write!(f, "<text>"),
        }
    }
}

// ── First pass: markup lexemes ──

#[derive(Logos, Debug, Clone, PartialEq)]
enum Markup {
    #[regex(r"<\?([^?]|\?[^>])*\?>")]
    Declaration,

    #[regex(r"<!--([^-]|-[^-])*-->")]
    Comment,

    /// Runs to the first `]]>`.
    #[token("<![CDATA[", cdata_section)]
    CData,

    #[regex(r"<![A-Za-z][^>]*>")]
    Doctype,

    /// Quoted attribute values may contain `>`.
    #[regex(r#"<[A-Za-z_]([^<>"']|"[^"]*"|'[^']*')*>"#)]
    StartTag,

    #[regex(r"</[A-Za-z_][^<>]*>")]
    EndTag,

    #[regex(r"[^<]+")]
    Text,
}

fn cdata_section(lex: &mut logos::Lexer<Markup>) -> bool {
    match lex.remainder().find("]]>") {
        Some(end) => {
            lex.bump(end + 3);
            true
        }
        None => false,
    }
}

// ── Second pass: start-tag interior ──

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum TagPart {
    #[regex(r"[A-Za-z_][A-Za-z0-9_.:\-]*")]
    Name,
    #[token("=")]
    Equals,
    #[regex(r#""[^"]*""#)]
    #[regex(r"'[^']*'")]
    Quoted,
    #[token("/")]
    Slash,
}

// ── Entities ──

/// Decode the five predefined XML entities and numeric character references.
pub fn decode_entities(raw: &str) -> Result<String, String> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| format!("unterminated entity reference in {:?}", raw))?;
        let entity = &after[..semi];
        let decoded = match entity {
            "lt" => '<',
            "gt" => '>',
            "amp" => '&',
            "quot" => '"',
            "apos" => '\'',
            _ => decode_char_ref(entity).ok_or_else(|| format!("unknown entity '&{};'", entity))?,
        };
        out.push(decoded);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn decode_char_ref(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix('#')?;
    let code = match digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}

// ── Tag interior ──

fn lex_start_tag(
    source: &str,
    span: Span,
    tokens: &mut Vec<(Token, Span)>,
    errors: &mut Vec<LexError>,
) {
    // Strip `<` and `>`; interior offsets are relative to `span.start + 1`.
    let interior = &source[span.start + 1..span.end - 1];
    let offset = span.start + 1;
    let mut parts = TagPart::lexer(interior).spanned().peekable();

    let sub = |range: std::ops::Range<usize>| Span {
        start: offset + range.start,
        end: offset + range.end,
    };

    match parts.next() {
        Some((Ok(TagPart::Name), range)) => {
            let name_span = sub(range.clone());
            tokens.push((Token::Open(interior[range].to_string()), name_span));
        }
        _ => {
            errors.push(LexError {
                span,
                message: "start tag has no element name".to_string(),
            });
            return;
        }
    }

    let mut empty = false;
    while let Some((part, range)) = parts.next() {
        match part {
            Ok(TagPart::Name) => {
                let attr_name = interior[range.clone()].to_string();
                let eq = parts.next();
                let value = parts.next();
                match (eq, value) {
                    (Some((Ok(TagPart::Equals), _)), Some((Ok(TagPart::Quoted), vrange))) => {
                        let quoted = &interior[vrange.clone()];
                        let raw = &quoted[1..quoted.len() - 1];
                        let attr_span = sub(range.start..vrange.end);
                        match decode_entities(raw) {
                            Ok(value) => tokens.push((Token::Attr(attr_name, value), attr_span)),
                            Err(message) => errors.push(LexError {
                                span: attr_span,
                                message,
                            }),
                        }
                    }
                    _ => {
                        errors.push(LexError {
                            span: sub(range),
                            message: format!("attribute '{}' has no quoted value", attr_name),
                        });
                        return;
                    }
                }
            }
            Ok(TagPart::Slash) if parts.peek().is_none() => empty = true,
            _ => {
                errors.push(LexError {
                    span: sub(range.clone()),
                    message: format!("unexpected {:?} in start tag", &interior[range]),
                });
                return;
            }
        }
    }

    let end_span = Span {
        start: span.end - if empty { 2 } else { 1 },
        end: span.end,
    };
    tokens.push((if empty { Token::EmptyEnd } else { Token::TagEnd }, end_span));
}

// ── Public API ──

/// Lex a markup document into tokens.
///
/// Returns all successfully lexed tokens together with any errors. Lexing is
/// non-fatal: errors are collected and the lexer continues.
pub fn lex(source: &str) -> LexResult {
    let lexer = Markup::lexer(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (result, range) in lexer.spanned() {
        let span = Span {
            start: range.start,
            end: range.end,
        };
        let slice = &source[span.start..span.end];
        match result {
            Ok(Markup::Declaration | Markup::Comment | Markup::Doctype) => {}
            Ok(Markup::CData) => {
                // `<![CDATA[` is 9 bytes, `]]>` is 3.
                let content = &slice[9..slice.len() - 3];
                tokens.push((Token::Text(content.to_string()), span));
            }
            Ok(Markup::StartTag) => lex_start_tag(source, span, &mut tokens, &mut errors),
            Ok(Markup::EndTag) => {
                let name = slice[2..slice.len() - 1].trim_end().to_string();
                tokens.push((Token::Close(name), span));
            }
            Ok(Markup::Text) => {
                if slice.trim().is_empty() {
                    continue;
                }
                match decode_entities(slice) {
                    Ok(text) => tokens.push((Token::Text(text), span)),
                    Err(message) => errors.push(LexError { span, message }),
                }
            }
            Err(()) => errors.push(LexError {
                span,
                message: format!("unexpected markup: {:?}", slice),
            }),
        }
    }

    LexResult { tokens, errors }
}

// ── Tests ──
