// Parser for SpineML markup documents.
//
// Folds the flat token stream from the lexer into a `doc::Element` tree.
// Uses chumsky combinators; element nesting is a single recursive rule.
//
// Preconditions: input is a token stream from `lexer::lex()`.
// Postconditions: returns a document plus any parse errors (non-fatal).
// Failure modes: unbalanced or mismatched tags produce `Rich` diagnostics.
// Side effects: none.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::doc::{Document, Element};
use crate::lexer::Token;

/// Result of parsing: document plus any errors.
#[derive(Debug)]
pub struct ParseResult {
    pub document: Option<Document>,
    pub errors: Vec<Rich<'static, Token, SimpleSpan>>,
}

/// Parse a markup source string. Lexes then parses.
///
/// Returns a document (if parsing succeeded) plus any errors. Lex errors are
/// reported alongside parse errors; a document with lex errors should not be
/// trusted by callers.
pub fn parse(source: &str) -> ParseResult {
    let lex_result = crate::lexer::lex(source);
    let len = source.len();

    // Convert lexer output to chumsky stream.
    let token_iter = lex_result.tokens.into_iter().map(|(tok, span)| {
        let cspan: SimpleSpan = (span.start..span.end).into();
        (tok, cspan)
    });
    let eoi: SimpleSpan = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let (document, parse_errors) = document_parser().parse(stream).into_output_errors();

    // Merge lex errors + parse errors.
    let mut all_errors: Vec<Rich<'static, Token, SimpleSpan>> = lex_result
        .errors
        .into_iter()
        .map(|e| {
            let span: SimpleSpan = (e.span.start..e.span.end).into();
            Rich::custom(span, e.message)
        })
        .collect();
    all_errors.extend(parse_errors.into_iter().map(|e| e.into_owned()));

    ParseResult {
        document,
        errors: all_errors,
    }
}

/// Element content: nested element or character data.
#[derive(Debug, Clone)]
enum Content {
    Element(Element),
    Text(String),
}

// ── Grammar ──
//
// document := element
// element  := Open Attr* (EmptyEnd | TagEnd content* Close)
// content  := element | Text

fn document_parser<'tokens, I>(
) -> impl Parser<'tokens, I, Document, extra::Err<Rich<'tokens, Token, SimpleSpan>>>
where
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    let element = recursive(|element| {
        let open = select! { Token::Open(name) => name };
        let attr = select! { Token::Attr(name, value) => (name, value) };
        let close = select! { Token::Close(name) = e => (name, e.span()) };
        let text = select! { Token::Text(text) => text };

        let content = element.map(Content::Element).or(text.map(Content::Text));

        let body = just(Token::EmptyEnd).to(None).or(just(Token::TagEnd)
            .ignore_then(content.repeated().collect::<Vec<_>>())
            .then(close)
            .map(Some));

        open.then(attr.repeated().collect::<Vec<_>>())
            .then(body)
            .try_map(|((name, attributes), body), span: SimpleSpan| {
                let mut element = Element::new(name, attributes, span);
                if let Some((contents, (close_name, close_span))) = body {
                    if close_name != element.name {
                        return Err(Rich::custom(
                            close_span,
                            format!(
                                "mismatched end tag: expected </{}>, found </{}>",
                                element.name, close_name
                            ),
                        ));
                    }
                    for content in contents {
                        match content {
                            Content::Element(child) => element.children.push(child),
                            Content::Text(text) => element.text.push_str(&text),
                        }
                    }
                }
                Ok(element)
            })
    });

    element
        .then_ignore(end())
        .map(|root| Document { root })
}

// ── Tests ──
