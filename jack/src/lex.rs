//! Lexical analysis.
use std::str::CharIndices;

use itertools::{multipeek, MultiPeek};

use crate::error::LexError;
use crate::tokens::{Keyword, Span, Token, TokenKind};

/// Lexical analyser.
///
/// Scans source code and yields one classified token at a time.
/// Whitespace and comments are discarded and never surface as
/// tokens.
pub struct Lexer<'a> {
    source: SourceText<'a>,
    /// Position where the token that is currently being scanned
    /// starts.
    token_start: SourcePos,
}

impl<'a> Lexer<'a> {
    pub fn new(source_code: &'a str) -> Self {
        Self {
            source: SourceText::new(source_code),
            token_start: SourcePos::default(),
        }
    }

    /// Original source code that was passed in during construction.
    pub fn source_code(&self) -> &'a str {
        self.source.original
    }

    /// Scan the source characters and construct the next token.
    ///
    /// Once the end of the source is reached, every further call
    /// returns the end-of-file token.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        use TokenKind as TK;

        loop {
            self.skip_whitespace();
            self.start_token();

            let next_char = match self.source.next_char() {
                Some(c) => c,
                None => return Ok(self.make_token(TK::Eof)),
            };

            match next_char {
                '{' => return Ok(self.make_token(TK::LeftBrace)),
                '}' => return Ok(self.make_token(TK::RightBrace)),
                '(' => return Ok(self.make_token(TK::LeftParen)),
                ')' => return Ok(self.make_token(TK::RightParen)),
                '[' => return Ok(self.make_token(TK::LeftBracket)),
                ']' => return Ok(self.make_token(TK::RightBracket)),
                '.' => return Ok(self.make_token(TK::Dot)),
                ',' => return Ok(self.make_token(TK::Comma)),
                ';' => return Ok(self.make_token(TK::Semicolon)),
                '+' => return Ok(self.make_token(TK::Plus)),
                '-' => return Ok(self.make_token(TK::Minus)),
                '*' => return Ok(self.make_token(TK::Star)),
                '&' => return Ok(self.make_token(TK::Ampersand)),
                '|' => return Ok(self.make_token(TK::Pipe)),
                '<' => return Ok(self.make_token(TK::Less)),
                '>' => return Ok(self.make_token(TK::Greater)),
                '=' => return Ok(self.make_token(TK::Eq)),
                '~' => return Ok(self.make_token(TK::Tilde)),
                '/' => match self.source.peek_char() {
                    Some('/') => {
                        self.source.next_char();
                        self.skip_line_comment();
                    }
                    Some('*') => {
                        self.source.next_char();
                        self.skip_block_comment()?;
                    }
                    _ => return Ok(self.make_token(TK::Slash)),
                },
                '"' => return self.consume_string(),
                _ => return self.consume_word(),
            }

            // A comment was erased. Scan again from the top.
        }
    }

    /// Prime the lexer state to record a new token.
    fn start_token(&mut self) {
        self.token_start = SourcePos {
            position: self.source.position,
            line: self.source.line,
            column: self.source.column,
        };
    }

    /// Build a token spanning from the recorded start up to the
    /// current cursor position.
    fn make_token(&self, kind: TokenKind) -> Token {
        let start = self.token_start.position as u32;
        let end = self.source.position as u32;
        debug_assert!(start <= end);

        let span = Span::new(start, end, self.token_start.line, self.token_start.column);
        Token { kind, span }
    }

    /// Text of the token that is currently being scanned.
    fn token_fragment(&self) -> &'a str {
        &self.source.original[self.token_start.position..self.source.position]
    }
}

/// Specialised tokens.
impl<'a> Lexer<'a> {
    fn skip_whitespace(&mut self) {
        // Ensure clean peek state.
        self.source.reset_peek();

        while let Some(c) = self.source.peek_char() {
            if is_whitespace(c) {
                self.source.next_char();
            } else {
                break;
            }
        }
    }

    /// Erase a line comment, up to and including the trailing
    /// newline.
    fn skip_line_comment(&mut self) {
        while let Some(c) = self.source.next_char() {
            if c == '\n' {
                break;
            }
        }
    }

    /// Erase a block comment, up to and including its `*/`
    /// terminator. Block comments do not nest.
    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let mut star = false;

        loop {
            match self.source.next_char() {
                Some('/') if star => return Ok(()),
                Some(c) => star = c == '*',
                None => {
                    return Err(LexError::UnterminatedComment {
                        line: self.token_start.line,
                        column: self.token_start.column,
                    })
                }
            }
        }
    }

    /// Consume a string constant, up to and including the closing
    /// quote.
    ///
    /// The token's span covers the surrounding quotes. Consumers
    /// strip them to recover the string's value.
    fn consume_string(&mut self) -> Result<Token, LexError> {
        loop {
            match self.source.next_char() {
                Some('"') => return Ok(self.make_token(TokenKind::String)),
                Some(_) => continue,
                None => {
                    return Err(LexError::UnterminatedString {
                        line: self.token_start.line,
                        column: self.token_start.column,
                    })
                }
            }
        }
    }

    /// Accumulate a word up to the next boundary and classify it as
    /// a keyword, an integer constant or an identifier, in that
    /// order of priority.
    ///
    /// A word that fits none of the three classes is a single
    /// lexical error; `2abc` is one unknown token, not an integer
    /// constant followed by an identifier.
    fn consume_word(&mut self) -> Result<Token, LexError> {
        // Ensure clean peek state.
        self.source.reset_peek();

        while let Some(c) = self.source.peek_char() {
            if is_word_boundary(c) {
                break;
            }
            self.source.next_char();
        }

        let fragment = self.token_fragment();
        let kind = match Keyword::parse(fragment) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None if fragment.chars().all(is_digit) => TokenKind::Int,
            None if is_identifier(fragment) => TokenKind::Ident,
            None => {
                return Err(LexError::UnknownToken {
                    fragment: fragment.to_string(),
                    line: self.token_start.line,
                    column: self.token_start.column,
                })
            }
        };

        Ok(self.make_token(kind))
    }
}

impl<'a> IntoIterator for Lexer<'a> {
    type Item = Result<Token, LexError>;
    type IntoIter = LexerIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        LexerIter {
            lexer: self,
            done: false,
        }
    }
}

/// Convenience iterator that wraps the lexer.
///
/// Fused after the end-of-file token, or after the first lexical
/// error.
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct LexerIter<'a> {
    lexer: Lexer<'a>,
    /// Track whether the end-of-file token has been emitted, so
    /// it is emitted exactly once.
    done: bool,
}

impl<'a> Iterator for LexerIter<'a> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.lexer.next_token();
        match &result {
            Ok(token) if token.kind == TokenKind::Eof => self.done = true,
            Err(_) => self.done = true,
            _ => {}
        }

        Some(result)
    }
}

/// Wrapper for source code that keeps a cursor position.
///
/// Allows forward lookup via peeking without consuming characters.
struct SourceText<'a> {
    /// Keep a reference to the source so fragments can be sliced
    /// from it.
    original: &'a str,
    /// Iterator over the UTF-8 encoded source code.
    chars: MultiPeek<CharIndices<'a>>,
    /// Byte offset of the next character to be consumed.
    position: usize,
    /// 1-based line of the next character to be consumed.
    line: u32,
    /// 1-based column of the next character to be consumed.
    column: u32,
}

impl<'a> SourceText<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            original: source,
            chars: multipeek(source.char_indices()),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Advance the cursor and return the consumed character.
    fn next_char(&mut self) -> Option<char> {
        match self.chars.next() {
            Some((index, c)) => {
                self.position = index + c.len_utf8();
                if c == '\n' {
                    self.line += 1;
                    self.column = 1;
                } else {
                    self.column += 1;
                }
                Some(c)
            }
            None => None,
        }
    }

    /// Peek the next unconsumed character.
    ///
    /// Each call advances an internal peek cursor. The peek cursor
    /// is rewound by [`reset_peek`](Self::reset_peek) or by
    /// consuming a character.
    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    /// Rewind the peek cursor back to the read cursor.
    fn reset_peek(&mut self) {
        self.chars.reset_peek()
    }
}

/// Position of one character in source code.
#[derive(Debug, Default, Clone, Copy)]
struct SourcePos {
    position: usize,
    line: u32,
    column: u32,
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_symbol(c: char) -> bool {
    matches!(
        c,
        '{' | '}'
            | '('
            | ')'
            | '['
            | ']'
            | '.'
            | ','
            | ';'
            | '+'
            | '-'
            | '*'
            | '/'
            | '&'
            | '|'
            | '<'
            | '>'
            | '='
            | '~'
    )
}

/// Characters that terminate a word.
fn is_word_boundary(c: char) -> bool {
    is_whitespace(c) || is_symbol(c) || c == '"'
}

fn is_digit(c: char) -> bool {
    matches!(c, '0'..='9')
}

fn is_letter(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '_')
}

fn is_letter_or_digit(c: char) -> bool {
    is_letter(c) || is_digit(c)
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if is_letter(c) => chars.all(is_letter_or_digit),
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn token_kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .into_iter()
            .map(|result| result.map(|token| token.kind))
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_symbols() {
        use TokenKind as TK;

        assert_eq!(
            token_kinds("{}()[].,;+-*/&|<>=~"),
            vec![
                TK::LeftBrace,
                TK::RightBrace,
                TK::LeftParen,
                TK::RightParen,
                TK::LeftBracket,
                TK::RightBracket,
                TK::Dot,
                TK::Comma,
                TK::Semicolon,
                TK::Plus,
                TK::Minus,
                TK::Star,
                TK::Slash,
                TK::Ampersand,
                TK::Pipe,
                TK::Less,
                TK::Greater,
                TK::Eq,
                TK::Tilde,
                TK::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords() {
        const CODE: &str = "class constructor function method field static var \
                            int char boolean void true false null this \
                            let do if else while return";

        let kinds = token_kinds(CODE);
        assert_eq!(kinds.len(), 22); // 21 keywords + end-of-file

        for kind in &kinds[..21] {
            assert!(matches!(kind, TokenKind::Keyword(_)), "{:?}", kind);
        }
    }

    #[test]
    fn test_identifiers() {
        use TokenKind as TK;

        // Keywords are case-sensitive; near-misses are identifiers.
        assert_eq!(
            token_kinds("x abc2 ab_c _lead Class classes"),
            vec![TK::Ident, TK::Ident, TK::Ident, TK::Ident, TK::Ident, TK::Ident, TK::Eof]
        );
    }

    #[test]
    fn test_integer_constants() {
        let lexer = Lexer::new("0 12 32767");
        let source = lexer.source_code();

        let tokens: Vec<Token> = lexer
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(tokens[0].kind, TokenKind::Int);
        assert_eq!(tokens[0].span.fragment(source), "0");
        assert_eq!(tokens[1].kind, TokenKind::Int);
        assert_eq!(tokens[1].span.fragment(source), "12");
        assert_eq!(tokens[2].kind, TokenKind::Int);
        assert_eq!(tokens[2].span.fragment(source), "32767");
        assert_eq!(tokens[3].kind, TokenKind::Eof);
    }

    #[test]
    fn test_string_constant_span_includes_quotes() {
        let lexer = Lexer::new(r#"let s = "hello world";"#);
        let source = lexer.source_code();

        let tokens: Vec<Token> = lexer
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();

        let string = tokens[3];
        assert_eq!(string.kind, TokenKind::String);
        assert_eq!(string.span.fragment(source), "\"hello world\"");
    }

    #[test]
    fn test_comments_are_discarded() {
        const CODE: &str = "
        // line comment
        let /* inline */ x;
        /** doc comment
            spanning lines */
        return;
        ";

        use TokenKind as TK;
        assert_eq!(
            token_kinds(CODE),
            vec![
                TK::Keyword(Keyword::Let),
                TK::Ident,
                TK::Semicolon,
                TK::Keyword(Keyword::Return),
                TK::Semicolon,
                TK::Eof,
            ]
        );
    }

    #[test]
    fn test_slash_is_not_a_comment() {
        use TokenKind as TK;

        assert_eq!(
            token_kinds("a / b"),
            vec![TK::Ident, TK::Slash, TK::Ident, TK::Eof]
        );
    }

    #[test]
    fn test_line_and_column() {
        const CODE: &str = "class Main {\n    let\n}";

        let tokens: Vec<Token> = Lexer::new(CODE)
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();

        let spans: Vec<Span> = tokens.iter().map(|token| token.span).collect();
        assert_eq!(spans[0], Span::new(0, 5, 1, 1)); // class
        assert_eq!(spans[1], Span::new(6, 10, 1, 7)); // Main
        assert_eq!(spans[2], Span::new(11, 12, 1, 12)); // {
        assert_eq!(spans[3], Span::new(17, 20, 2, 5)); // let
        assert_eq!(spans[4], Span::new(21, 22, 3, 1)); // }
        assert_eq!(spans[5], Span::new(22, 22, 3, 2)); // end-of-file
    }

    #[test]
    fn test_unknown_token_is_one_word() {
        let mut iter = Lexer::new("let 2abc222 = 5;").into_iter();

        let first = iter.next().unwrap().unwrap();
        assert_eq!(first.kind, TokenKind::Keyword(Keyword::Let));

        match iter.next().unwrap() {
            Err(LexError::UnknownToken {
                fragment,
                line,
                column,
            }) => {
                assert_eq!(fragment, "2abc222");
                assert_eq!((line, column), (1, 5));
            }
            other => panic!("expected unknown token error, got {:?}", other),
        }

        // The iterator fuses after an error.
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_unterminated_string() {
        let mut iter = Lexer::new("do print(\"oops").into_iter();

        let result = iter.nth(3).unwrap();
        match result {
            Err(LexError::UnterminatedString { line, column }) => {
                assert_eq!((line, column), (1, 10));
            }
            other => panic!("expected unterminated string error, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_comment() {
        let mut iter = Lexer::new("/* no end").into_iter();

        match iter.next().unwrap() {
            Err(LexError::UnterminatedComment { line, column }) => {
                assert_eq!((line, column), (1, 1));
            }
            other => panic!("expected unterminated comment error, got {:?}", other),
        }
    }

    #[test]
    fn test_iterator_fuses_after_eof() {
        let mut iter = Lexer::new(";").into_iter();

        assert_eq!(iter.next().unwrap().unwrap().kind, TokenKind::Semicolon);
        assert_eq!(iter.next().unwrap().unwrap().kind, TokenKind::Eof);
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_empty_source() {
        let token = Lexer::new("").next_token().unwrap();
        assert_eq!(token.kind, TokenKind::Eof);
        assert_eq!(token.span, Span::new(0, 0, 1, 1));
    }
}
