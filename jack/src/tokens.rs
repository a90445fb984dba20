//! Tokens.
use std::fmt;

/// One classified token.
///
/// Tokens carry no text. Consumers that need the token's fragment
/// slice it out of the original source code using the span.
#[derive(Debug, Clone, Copy)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[rustfmt::skip]
pub enum TokenKind {
    // ------------------------------------------------------------------------
    // Symbols, one character each.
    LeftBrace,    // {
    RightBrace,   // }
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]
    Dot,          // .
    Comma,        // ,
    Semicolon,    // ;
    Plus,         // +
    Minus,        // -
    Star,         // *
    Slash,        // /
    Ampersand,    // &
    Pipe,         // |
    Less,         // <
    Greater,      // >
    Eq,           // =
    Tilde,        // ~

    // ------------------------------------------------------------------------
    // Words
    Ident,
    /// Reserved identifiers.
    Keyword(Keyword),
    /// Integer constant.
    Int,
    /// String constant. The span includes the surrounding quotes.
    String,

    // ------------------------------------------------------------------------
    // Special
    /// End-of-file.
    Eof,
}

impl fmt::Display for TokenKind {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use TokenKind as TK;

        match self {
            TK::LeftBrace    => write!(f, "{{"),
            TK::RightBrace   => write!(f, "}}"),
            TK::LeftParen    => write!(f, "("),
            TK::RightParen   => write!(f, ")"),
            TK::LeftBracket  => write!(f, "["),
            TK::RightBracket => write!(f, "]"),
            TK::Dot          => write!(f, "."),
            TK::Comma        => write!(f, ","),
            TK::Semicolon    => write!(f, ";"),
            TK::Plus         => write!(f, "+"),
            TK::Minus        => write!(f, "-"),
            TK::Star         => write!(f, "*"),
            TK::Slash        => write!(f, "/"),
            TK::Ampersand    => write!(f, "&"),
            TK::Pipe         => write!(f, "|"),
            TK::Less         => write!(f, "<"),
            TK::Greater      => write!(f, ">"),
            TK::Eq           => write!(f, "="),
            TK::Tilde        => write!(f, "~"),
            TK::Ident        => write!(f, "identifier"),
            TK::Keyword(kw)  => write!(f, "{}", kw),
            TK::Int          => write!(f, "integer constant"),
            TK::String       => write!(f, "string constant"),
            TK::Eof          => write!(f, "end-of-file"),
        }
    }
}

/// Reserved keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Keyword {
    // ------------------------------------------------------------------------
    // Declarations
    Class,
    Constructor,
    Function,
    Method,
    Field,
    Static,
    Var,

    // ------------------------------------------------------------------------
    // Types
    Int,
    Char,
    Boolean,
    Void,

    // ------------------------------------------------------------------------
    // Constant values
    True,
    False,
    Null,
    This,

    // ------------------------------------------------------------------------
    // Statements
    Let,
    Do,
    If,
    Else,
    While,
    Return,
}

impl Keyword {
    /// Classify the given word as a reserved keyword.
    ///
    /// Keywords are case-sensitive; `Class` is an ordinary
    /// identifier.
    #[rustfmt::skip]
    pub fn parse(text: impl AsRef<str>) -> Option<Self> {
        match text.as_ref() {
            "class"       => Some(Self::Class),
            "constructor" => Some(Self::Constructor),
            "function"    => Some(Self::Function),
            "method"      => Some(Self::Method),
            "field"       => Some(Self::Field),
            "static"      => Some(Self::Static),
            "var"         => Some(Self::Var),
            "int"         => Some(Self::Int),
            "char"        => Some(Self::Char),
            "boolean"     => Some(Self::Boolean),
            "void"        => Some(Self::Void),
            "true"        => Some(Self::True),
            "false"       => Some(Self::False),
            "null"        => Some(Self::Null),
            "this"        => Some(Self::This),
            "let"         => Some(Self::Let),
            "do"          => Some(Self::Do),
            "if"          => Some(Self::If),
            "else"        => Some(Self::Else),
            "while"       => Some(Self::While),
            "return"      => Some(Self::Return),
            _ => None,
        }
    }
}

impl fmt::Display for Keyword {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Class       => write!(f, "class"),
            Self::Constructor => write!(f, "constructor"),
            Self::Function    => write!(f, "function"),
            Self::Method      => write!(f, "method"),
            Self::Field       => write!(f, "field"),
            Self::Static      => write!(f, "static"),
            Self::Var         => write!(f, "var"),
            Self::Int         => write!(f, "int"),
            Self::Char        => write!(f, "char"),
            Self::Boolean     => write!(f, "boolean"),
            Self::Void        => write!(f, "void"),
            Self::True        => write!(f, "true"),
            Self::False       => write!(f, "false"),
            Self::Null        => write!(f, "null"),
            Self::This        => write!(f, "this"),
            Self::Let         => write!(f, "let"),
            Self::Do          => write!(f, "do"),
            Self::If          => write!(f, "if"),
            Self::Else        => write!(f, "else"),
            Self::While       => write!(f, "while"),
            Self::Return      => write!(f, "return"),
        }
    }
}

/// Chunk of source code, encoded as a starting and an ending byte
/// position, plus the line and column where the chunk starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Starting byte position.
    pub start: u32,
    /// Ending byte position, exclusive.
    pub end: u32,
    /// 1-based line of the starting position.
    pub line: u32,
    /// 1-based column of the starting position.
    pub column: u32,
}

impl Span {
    pub fn new(start: u32, end: u32, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Helper function to slice the span's text out of the given
    /// source code.
    #[inline]
    pub fn fragment<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start as usize..self.end as usize]
    }

    /// Number of bytes covered by the span.
    #[inline]
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_span_fragment() {
        const CODE: &str = "let x = 42;";

        let span = Span::new(4, 5, 1, 5);
        assert_eq!(span.fragment(CODE), "x");
        assert_eq!(span.len(), 1);

        let span = Span::new(8, 10, 1, 9);
        assert_eq!(span.fragment(CODE), "42");
        assert_eq!(span.len(), 2);

        let eof = Span::new(11, 11, 1, 12);
        assert_eq!(eof.fragment(CODE), "");
        assert!(eof.is_empty());
    }

    #[test]
    fn test_keyword_parse() {
        assert_eq!(Keyword::parse("class"), Some(Keyword::Class));
        assert_eq!(Keyword::parse("constructor"), Some(Keyword::Constructor));
        assert_eq!(Keyword::parse("this"), Some(Keyword::This));
        assert_eq!(Keyword::parse("return"), Some(Keyword::Return));

        // Case matters.
        assert_eq!(Keyword::parse("Class"), None);
        assert_eq!(Keyword::parse("LET"), None);

        // Prefixes are not keywords.
        assert_eq!(Keyword::parse("classes"), None);
        assert_eq!(Keyword::parse("iff"), None);
    }

    #[test]
    fn test_keyword_display_round_trip() {
        let keywords = [
            Keyword::Class,
            Keyword::Constructor,
            Keyword::Function,
            Keyword::Method,
            Keyword::Field,
            Keyword::Static,
            Keyword::Var,
            Keyword::Int,
            Keyword::Char,
            Keyword::Boolean,
            Keyword::Void,
            Keyword::True,
            Keyword::False,
            Keyword::Null,
            Keyword::This,
            Keyword::Let,
            Keyword::Do,
            Keyword::If,
            Keyword::Else,
            Keyword::While,
            Keyword::Return,
        ];

        for keyword in keywords {
            assert_eq!(Keyword::parse(keyword.to_string()), Some(keyword));
        }
    }
}
