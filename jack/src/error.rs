//! Result and errors.
use std::fmt::{self, Display, Formatter};
use std::io;

use crate::tokens::TokenKind;

pub type JackResult<T> = std::result::Result<T, JackError>;

/// Any failure the compiler can produce.
///
/// Every error aborts the compilation unit. There is no recovery
/// and no partial output.
#[derive(Debug)]
pub enum JackError {
    Lex(LexError),
    Token(TokenError),
    Compile(CompileError),
    Symbol(SymbolError),
    Io(io::Error),
    Fmt(fmt::Error),
}

impl Display for JackError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Lex(err) => Display::fmt(err, f),
            Self::Token(err) => Display::fmt(err, f),
            Self::Compile(err) => Display::fmt(err, f),
            Self::Symbol(err) => Display::fmt(err, f),
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::Fmt(err) => write!(f, "format error: {}", err),
        }
    }
}

impl std::error::Error for JackError {}

impl From<LexError> for JackError {
    fn from(err: LexError) -> Self {
        Self::Lex(err)
    }
}

impl From<TokenError> for JackError {
    fn from(err: TokenError) -> Self {
        Self::Token(err)
    }
}

impl From<CompileError> for JackError {
    fn from(err: CompileError) -> Self {
        Self::Compile(err)
    }
}

impl From<SymbolError> for JackError {
    fn from(err: SymbolError) -> Self {
        Self::Symbol(err)
    }
}

impl From<io::Error> for JackError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<fmt::Error> for JackError {
    fn from(err: fmt::Error) -> Self {
        Self::Fmt(err)
    }
}

/// Character sequence that cannot be classified as a token.
#[derive(Debug, Clone)]
pub enum LexError {
    /// A word that is not a keyword, an integer constant or an
    /// identifier.
    UnknownToken {
        fragment: String,
        line: u32,
        column: u32,
    },
    /// End of input inside a string constant.
    UnterminatedString { line: u32, column: u32 },
    /// End of input inside a block comment.
    UnterminatedComment { line: u32, column: u32 },
}

impl Display for LexError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::UnknownToken {
                fragment,
                line,
                column,
            } => {
                write!(f, "{line}:{column} unknown token '{fragment}'")
            }
            Self::UnterminatedString { line, column } => {
                write!(f, "{line}:{column} string constant is missing its closing '\"'")
            }
            Self::UnterminatedComment { line, column } => {
                write!(f, "{line}:{column} block comment is missing its closing '*/'")
            }
        }
    }
}

impl std::error::Error for LexError {}

/// Error returned when an unexpected token kind is encountered.
#[derive(Debug)]
pub enum TokenError {
    Mismatch {
        expected: TokenKind,
        encountered: TokenKind,
        line: u32,
        column: u32,
    },
    UnexpectedEof,
}

impl Display for TokenError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Mismatch {
                expected,
                encountered,
                line,
                column,
            } => {
                write!(f, "{line}:{column} expected '{expected}', found '{encountered}'")
            }
            Self::UnexpectedEof => write!(f, "unexpected end of source code"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Grammar or code generation failure.
#[derive(Debug)]
pub enum CompileError {
    /// No grammar production matches the current token.
    UnexpectedToken {
        expected: &'static str,
        encountered: TokenKind,
        line: u32,
        column: u32,
    },
    /// Integer constant outside the VM's representable range.
    IntegerRange {
        literal: String,
        line: u32,
        column: u32,
    },
    /// Input continues after the class's closing brace.
    TrailingTokens { line: u32, column: u32 },
}

impl Display for CompileError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::UnexpectedToken {
                expected,
                encountered,
                line,
                column,
            } => {
                write!(f, "{line}:{column} expected {expected}, found '{encountered}'")
            }
            Self::IntegerRange {
                literal,
                line,
                column,
            } => {
                write!(
                    f,
                    "{line}:{column} integer constant '{literal}' is out of range 0..=32767"
                )
            }
            Self::TrailingTokens { line, column } => {
                write!(f, "{line}:{column} unexpected input after the class's closing '}}'")
            }
        }
    }
}

impl std::error::Error for CompileError {}

/// Symbol table lookup or definition failure.
#[derive(Debug)]
pub enum SymbolError {
    /// Name is not declared in subroutine or class scope.
    NotFound {
        name: String,
        line: u32,
        column: u32,
    },
    /// Name is already declared in the same scope.
    Duplicate {
        name: String,
        line: u32,
        column: u32,
    },
}

impl Display for SymbolError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::NotFound { name, line, column } => {
                write!(f, "{line}:{column} undeclared identifier '{name}'")
            }
            Self::Duplicate { name, line, column } => {
                write!(f, "{line}:{column} duplicate declaration of '{name}'")
            }
        }
    }
}

impl std::error::Error for SymbolError {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tokens::Keyword;

    #[test]
    fn test_error_messages_lead_with_position() {
        let err = TokenError::Mismatch {
            expected: TokenKind::Keyword(Keyword::Class),
            encountered: TokenKind::Ident,
            line: 3,
            column: 14,
        };
        assert_eq!(err.to_string(), "3:14 expected 'class', found 'identifier'");

        let err = SymbolError::NotFound {
            name: "y".to_string(),
            line: 2,
            column: 9,
        };
        assert_eq!(err.to_string(), "2:9 undeclared identifier 'y'");

        let err = LexError::UnknownToken {
            fragment: "2abc222".to_string(),
            line: 1,
            column: 5,
        };
        assert_eq!(err.to_string(), "1:5 unknown token '2abc222'");
    }
}
