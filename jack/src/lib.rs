//! Compiler for the Jack programming language, targeting the
//! textual instructions of a simple stack based virtual machine.
//!
//! Compilation is single-pass: source is tokenised and lowered to
//! VM instructions in one walk over the grammar, without building
//! a syntax tree.
mod compiler;
mod error;
mod lex;
mod symbol;
mod token_stream;
mod tokens;
mod vm;

pub use self::compiler::Compiler;
pub use self::error::{CompileError, JackError, JackResult, LexError, SymbolError, TokenError};
pub use self::lex::{Lexer, LexerIter};
pub use self::symbol::{Symbol, SymbolKind, SymbolTable};
pub use self::token_stream::TokenStream;
pub use self::tokens::{Keyword, Span, Token, TokenKind};
pub use self::vm::{Segment, VmOp, VmWriter};

/// Version of the compiler, taken from the crate manifest.
pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        compiler::Compiler,
        error::{JackError, JackResult},
        lex::Lexer,
    };
}

/// Compile one Jack class into VM instructions.
pub fn compile(source_code: impl AsRef<str>) -> JackResult<String> {
    Compiler::new(Lexer::new(source_code.as_ref())).compile()
}
