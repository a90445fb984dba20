//! Buffered stream of tokens.
use std::iter::Peekable;

use crate::error::{JackResult, TokenError};
use crate::lex::{Lexer, LexerIter};
use crate::tokens::{Span, Token, TokenKind};

/// Stream of tokens with one token of lookahead.
///
/// Tokens are lexed lazily; peeking or consuming drives the
/// internal lexer, so lexical errors surface through every
/// accessor.
pub struct TokenStream<'a> {
    lexer: Peekable<LexerIter<'a>>,
    /// Keep a reference to the source code so fragments can be
    /// sliced from it.
    original: &'a str,
}

impl<'a> TokenStream<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self {
            original: lexer.source_code(),
            lexer: lexer.into_iter().peekable(),
        }
    }

    /// Original source code that tokens were lexed from.
    pub fn source_code(&self) -> &'a str {
        self.original
    }

    /// Helper function to extract the span's string fragment from
    /// the original source code.
    #[inline]
    pub fn span_fragment(&self, span: &Span) -> &'a str {
        span.fragment(self.original)
    }

    /// Return the current token without advancing the cursor.
    pub fn peek(&mut self) -> JackResult<Token> {
        match self.lexer.peek() {
            Some(Ok(token)) => Ok(*token),
            Some(Err(err)) => Err(err.clone().into()),
            None => Err(TokenError::UnexpectedEof.into()),
        }
    }

    /// Return the current token kind without advancing the cursor.
    #[inline]
    pub fn peek_kind(&mut self) -> JackResult<TokenKind> {
        self.peek().map(|token| token.kind)
    }

    /// Consume the current token regardless of its kind.
    pub fn next_token(&mut self) -> JackResult<Token> {
        match self.lexer.next() {
            Some(result) => Ok(result?),
            None => Err(TokenError::UnexpectedEof.into()),
        }
    }

    /// Consume the current token if it matches the given token kind.
    ///
    /// Returns true when matched. Returns false when the kinds do
    /// not match, or when the stream is at its end; the token is
    /// left in the stream.
    pub fn match_token(&mut self, token_kind: TokenKind) -> bool {
        match self.lexer.peek() {
            Some(Ok(token)) if token.kind == token_kind => {
                self.lexer.next();
                true
            }
            _ => false,
        }
    }

    /// Return the current token and advance the cursor.
    ///
    /// The consumed token must match the given token kind, otherwise
    /// an error is returned and the cursor is not advanced.
    pub fn consume(&mut self, token_kind: TokenKind) -> JackResult<Token> {
        let token = self.peek()?;
        if token.kind == token_kind {
            self.next_token()
        } else {
            Err(TokenError::Mismatch {
                expected: token_kind,
                encountered: token.kind,
                line: token.span.line,
                column: token.span.column,
            }
            .into())
        }
    }

    /// Consume the current token, which must be an identifier.
    #[inline]
    pub fn consume_ident(&mut self) -> JackResult<Token> {
        self.consume(TokenKind::Ident)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::JackError;
    use crate::tokens::Keyword;

    #[test]
    fn test_peek_does_not_consume() {
        let mut stream = TokenStream::new(Lexer::new("let x;"));

        assert_eq!(stream.peek_kind().unwrap(), TokenKind::Keyword(Keyword::Let));
        assert_eq!(stream.peek_kind().unwrap(), TokenKind::Keyword(Keyword::Let));

        let token = stream.next_token().unwrap();
        assert_eq!(token.kind, TokenKind::Keyword(Keyword::Let));
        assert_eq!(stream.peek_kind().unwrap(), TokenKind::Ident);
    }

    #[test]
    fn test_consume_mismatch_keeps_cursor() {
        let mut stream = TokenStream::new(Lexer::new("let"));

        let err = stream.consume(TokenKind::Semicolon).unwrap_err();
        match err {
            JackError::Token(TokenError::Mismatch {
                expected,
                encountered,
                line,
                column,
            }) => {
                assert_eq!(expected, TokenKind::Semicolon);
                assert_eq!(encountered, TokenKind::Keyword(Keyword::Let));
                assert_eq!((line, column), (1, 1));
            }
            other => panic!("unexpected error: {}", other),
        }

        // The mismatched token is still there.
        assert_eq!(
            stream.consume(TokenKind::Keyword(Keyword::Let)).unwrap().kind,
            TokenKind::Keyword(Keyword::Let)
        );
    }

    #[test]
    fn test_match_token() {
        let mut stream = TokenStream::new(Lexer::new(", ;"));

        assert!(!stream.match_token(TokenKind::Semicolon));
        assert!(stream.match_token(TokenKind::Comma));
        assert!(stream.match_token(TokenKind::Semicolon));
        assert!(stream.match_token(TokenKind::Eof));
        assert!(!stream.match_token(TokenKind::Eof));
    }

    #[test]
    fn test_fragment() {
        let mut stream = TokenStream::new(Lexer::new("class Main"));

        stream.next_token().unwrap();
        let name = stream.consume_ident().unwrap();
        assert_eq!(stream.span_fragment(&name.span), "Main");
    }

    #[test]
    fn test_lex_error_surfaces_through_peek() {
        let mut stream = TokenStream::new(Lexer::new("let 2abc;"));

        stream.next_token().unwrap();
        assert!(matches!(stream.peek(), Err(JackError::Lex(_))));
    }
}
