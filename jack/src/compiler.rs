//! Single-pass compiler.
//!
//! Parsing and code generation happen in one grammar walk. Each
//! grammar production has a `compile_*` routine that consumes its
//! tokens and appends VM instructions as a side effect; no syntax
//! tree is built. Expression code falls out of the descent order:
//! operands are emitted before the operator that combines them.
use smol_str::SmolStr;

use crate::error::{CompileError, JackError, JackResult, SymbolError};
use crate::lex::Lexer;
use crate::symbol::{Symbol, SymbolKind, SymbolTable};
use crate::token_stream::TokenStream;
use crate::tokens::{Keyword, Span, Token, TokenKind};
use crate::vm::{Segment, VmOp, VmWriter};

pub struct Compiler<'a> {
    tokens: TokenStream<'a>,
    code: VmWriter<String>,
    /// Class scope: statics and fields.
    class_symbols: SymbolTable,
    /// Subroutine scope: arguments and locals. Replaced with a
    /// fresh table when a new subroutine starts.
    subroutine_symbols: SymbolTable,
    /// Name of the class being compiled, used to qualify its
    /// subroutines and type its method receivers.
    class_name: SmolStr,
    /// Label counters, reset at subroutine entry.
    if_counter: u16,
    while_counter: u16,
}

impl<'a> Compiler<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self {
            tokens: TokenStream::new(lexer),
            code: VmWriter::new(String::new()),
            class_symbols: SymbolTable::new(),
            subroutine_symbols: SymbolTable::new(),
            class_name: SmolStr::new(""),
            if_counter: 0,
            while_counter: 0,
        }
    }

    /// Compile one class into VM instructions.
    ///
    /// The first error aborts the compilation; no partial output
    /// is returned.
    pub fn compile(mut self) -> JackResult<String> {
        self.compile_class()?;
        Ok(self.code.into_inner())
    }
}

/// Grammar productions.
impl<'a> Compiler<'a> {
    /// `'class' className '{' classVarDec* subroutineDec* '}'`
    fn compile_class(&mut self) -> JackResult<()> {
        self.tokens.consume(TokenKind::Keyword(Keyword::Class))?;

        let name = self.tokens.consume_ident()?;
        self.class_name = self.fragment(&name.span).into();

        self.tokens.consume(TokenKind::LeftBrace)?;

        while let TokenKind::Keyword(keyword @ (Keyword::Static | Keyword::Field)) =
            self.tokens.peek_kind()?
        {
            let kind = match keyword {
                Keyword::Static => SymbolKind::Static,
                _ => SymbolKind::Field,
            };
            self.compile_class_var_dec(kind)?;
        }

        while let TokenKind::Keyword(
            keyword @ (Keyword::Constructor | Keyword::Function | Keyword::Method),
        ) = self.tokens.peek_kind()?
        {
            self.compile_subroutine(keyword)?;
        }

        self.tokens.consume(TokenKind::RightBrace)?;

        // One class per compilation unit.
        let token = self.tokens.peek()?;
        if token.kind != TokenKind::Eof {
            return Err(CompileError::TrailingTokens {
                line: token.span.line,
                column: token.span.column,
            }
            .into());
        }

        Ok(())
    }

    /// `('static' | 'field') type varName (',' varName)* ';'`
    ///
    /// Declarations only; no instructions are emitted.
    fn compile_class_var_dec(&mut self, kind: SymbolKind) -> JackResult<()> {
        self.tokens.next_token()?; // static | field

        let ty = self.compile_type()?;

        let name = self.tokens.consume_ident()?;
        self.define(name, &ty, kind)?;

        while self.tokens.match_token(TokenKind::Comma) {
            let name = self.tokens.consume_ident()?;
            self.define(name, &ty, kind)?;
        }

        self.tokens.consume(TokenKind::Semicolon)?;

        Ok(())
    }

    /// `('constructor' | 'function' | 'method') ('void' | type)
    /// subroutineName '(' parameterList ')' subroutineBody`
    fn compile_subroutine(&mut self, keyword: Keyword) -> JackResult<()> {
        self.tokens.next_token()?; // constructor | function | method

        // Nothing survives from the previous subroutine.
        self.subroutine_symbols = SymbolTable::new();
        self.if_counter = 0;
        self.while_counter = 0;

        if keyword == Keyword::Method {
            // Argument 0 is the implicit receiver; declared
            // parameters start at 1.
            let receiver =
                self.subroutine_symbols
                    .define("this", self.class_name.clone(), SymbolKind::Argument);
            debug_assert_eq!(receiver, Some(0));
        }

        // The return type is not used for code generation.
        match self.tokens.peek_kind()? {
            TokenKind::Keyword(Keyword::Void) => {
                self.tokens.next_token()?;
            }
            _ => {
                self.compile_type()?;
            }
        }

        let name = self.tokens.consume_ident()?;
        let function_name = format!("{}.{}", self.class_name, self.fragment(&name.span));

        self.tokens.consume(TokenKind::LeftParen)?;
        self.compile_parameter_list()?;
        self.tokens.consume(TokenKind::RightParen)?;

        self.compile_subroutine_body(keyword, &function_name)?;

        Ok(())
    }

    /// `((type varName) (',' type varName)*)?`
    fn compile_parameter_list(&mut self) -> JackResult<()> {
        if self.tokens.peek_kind()? == TokenKind::RightParen {
            return Ok(());
        }

        let ty = self.compile_type()?;
        let name = self.tokens.consume_ident()?;
        self.define(name, &ty, SymbolKind::Argument)?;

        while self.tokens.match_token(TokenKind::Comma) {
            let ty = self.compile_type()?;
            let name = self.tokens.consume_ident()?;
            self.define(name, &ty, SymbolKind::Argument)?;
        }

        Ok(())
    }

    /// `'{' varDec* statements '}'`
    ///
    /// The function header can only be written once all local
    /// declarations are counted, which the grammar guarantees by
    /// placing them before the first statement.
    fn compile_subroutine_body(&mut self, keyword: Keyword, function_name: &str) -> JackResult<()> {
        self.tokens.consume(TokenKind::LeftBrace)?;

        while let TokenKind::Keyword(Keyword::Var) = self.tokens.peek_kind()? {
            self.compile_var_dec()?;
        }

        let locals = self.subroutine_symbols.count(SymbolKind::Local);
        self.code.function(function_name, locals)?;

        match keyword {
            Keyword::Constructor => {
                // Allocate one word per field and anchor `this` to
                // the new object.
                let fields = self.class_symbols.count(SymbolKind::Field);
                self.code.push(Segment::Constant, fields)?;
                self.code.call("Memory.alloc", 1)?;
                self.code.pop(Segment::Pointer, 0)?;
            }
            Keyword::Method => {
                // Anchor `this` to the receiver passed as argument 0.
                self.code.push(Segment::Argument, 0)?;
                self.code.pop(Segment::Pointer, 0)?;
            }
            _ => {}
        }

        self.compile_statements()?;
        self.tokens.consume(TokenKind::RightBrace)?;

        Ok(())
    }

    /// `'var' type varName (',' varName)* ';'`
    fn compile_var_dec(&mut self) -> JackResult<()> {
        self.tokens.next_token()?; // var

        let ty = self.compile_type()?;

        let name = self.tokens.consume_ident()?;
        self.define(name, &ty, SymbolKind::Local)?;

        while self.tokens.match_token(TokenKind::Comma) {
            let name = self.tokens.consume_ident()?;
            self.define(name, &ty, SymbolKind::Local)?;
        }

        self.tokens.consume(TokenKind::Semicolon)?;

        Ok(())
    }

    /// Zero or more statements, up to the enclosing `}`.
    fn compile_statements(&mut self) -> JackResult<()> {
        loop {
            let token = self.tokens.peek()?;
            match token.kind {
                TokenKind::Keyword(Keyword::Let) => self.compile_let()?,
                TokenKind::Keyword(Keyword::Do) => self.compile_do()?,
                TokenKind::Keyword(Keyword::If) => self.compile_if()?,
                TokenKind::Keyword(Keyword::While) => self.compile_while()?,
                TokenKind::Keyword(Keyword::Return) => self.compile_return()?,
                TokenKind::RightBrace => return Ok(()),
                _ => return Err(self.unexpected("statement", token)),
            }
        }
    }

    /// `'let' varName ('[' expression ']')? '=' expression ';'`
    fn compile_let(&mut self) -> JackResult<()> {
        let keyword = self.tokens.next_token()?;
        debug_assert_eq!(keyword.kind, TokenKind::Keyword(Keyword::Let));

        let name = self.tokens.consume_ident()?;
        let symbol = self.resolve(name)?;

        if self.tokens.match_token(TokenKind::LeftBracket) {
            // The target address is computed up front and parked on
            // the stack underneath the right-hand side's value.
            self.compile_expression()?;
            self.tokens.consume(TokenKind::RightBracket)?;
            self.code.push(symbol.kind.segment(), symbol.index)?;
            self.code.arithmetic(VmOp::Add)?;

            self.tokens.consume(TokenKind::Eq)?;
            self.compile_expression()?;
            self.tokens.consume(TokenKind::Semicolon)?;

            // Stage the value in temp 0, so popping the target
            // address into pointer 1 cannot clobber it even when
            // the right-hand side dereferenced an array itself.
            self.code.pop(Segment::Temp, 0)?;
            self.code.pop(Segment::Pointer, 1)?;
            self.code.push(Segment::Temp, 0)?;
            self.code.pop(Segment::That, 0)?;
        } else {
            self.tokens.consume(TokenKind::Eq)?;
            self.compile_expression()?;
            self.tokens.consume(TokenKind::Semicolon)?;

            self.code.pop(symbol.kind.segment(), symbol.index)?;
        }

        Ok(())
    }

    /// `'do' subroutineCall ';'`
    fn compile_do(&mut self) -> JackResult<()> {
        let keyword = self.tokens.next_token()?;
        debug_assert_eq!(keyword.kind, TokenKind::Keyword(Keyword::Do));

        let name = self.tokens.consume_ident()?;
        self.compile_subroutine_call(name)?;
        self.tokens.consume(TokenKind::Semicolon)?;

        // Every call leaves one value on the stack; a do statement
        // discards it.
        self.code.pop(Segment::Temp, 0)?;

        Ok(())
    }

    /// `'if' '(' expression ')' '{' statements '}'
    /// ('else' '{' statements '}')?`
    fn compile_if(&mut self) -> JackResult<()> {
        let keyword = self.tokens.next_token()?;
        debug_assert_eq!(keyword.kind, TokenKind::Keyword(Keyword::If));

        // Claim the label number before compiling the bodies, so
        // nested statements draw greater numbers.
        let n = self.if_counter;
        self.if_counter += 1;

        self.tokens.consume(TokenKind::LeftParen)?;
        self.compile_expression()?;
        self.tokens.consume(TokenKind::RightParen)?;

        self.code.if_goto(&format!("IF_TRUE{n}"))?;
        self.code.goto(&format!("IF_FALSE{n}"))?;

        self.code.label(&format!("IF_TRUE{n}"))?;
        self.tokens.consume(TokenKind::LeftBrace)?;
        self.compile_statements()?;
        self.tokens.consume(TokenKind::RightBrace)?;
        self.code.goto(&format!("IF_END{n}"))?;

        self.code.label(&format!("IF_FALSE{n}"))?;
        if self.tokens.match_token(TokenKind::Keyword(Keyword::Else)) {
            self.tokens.consume(TokenKind::LeftBrace)?;
            self.compile_statements()?;
            self.tokens.consume(TokenKind::RightBrace)?;
        }
        self.code.label(&format!("IF_END{n}"))?;

        Ok(())
    }

    /// `'while' '(' expression ')' '{' statements '}'`
    fn compile_while(&mut self) -> JackResult<()> {
        let keyword = self.tokens.next_token()?;
        debug_assert_eq!(keyword.kind, TokenKind::Keyword(Keyword::While));

        let n = self.while_counter;
        self.while_counter += 1;

        self.code.label(&format!("WHILE_EXP{n}"))?;

        self.tokens.consume(TokenKind::LeftParen)?;
        self.compile_expression()?;
        self.tokens.consume(TokenKind::RightParen)?;

        // Exit when the negated condition holds.
        self.code.arithmetic(VmOp::Not)?;
        self.code.if_goto(&format!("WHILE_END{n}"))?;

        self.tokens.consume(TokenKind::LeftBrace)?;
        self.compile_statements()?;
        self.tokens.consume(TokenKind::RightBrace)?;

        self.code.goto(&format!("WHILE_EXP{n}"))?;
        self.code.label(&format!("WHILE_END{n}"))?;

        Ok(())
    }

    /// `'return' expression? ';'`
    fn compile_return(&mut self) -> JackResult<()> {
        let keyword = self.tokens.next_token()?;
        debug_assert_eq!(keyword.kind, TokenKind::Keyword(Keyword::Return));

        if self.tokens.peek_kind()? == TokenKind::Semicolon {
            // Every subroutine returns a value, void ones a dummy
            // constant the caller discards.
            self.code.push(Segment::Constant, 0)?;
        } else {
            self.compile_expression()?;
        }

        self.tokens.consume(TokenKind::Semicolon)?;
        self.code.ret()?;

        Ok(())
    }

    /// `term (op term)*`
    ///
    /// All binary operators share a single precedence level and
    /// chain left to right: each operator is emitted right after
    /// its second operand.
    fn compile_expression(&mut self) -> JackResult<()> {
        self.compile_term()?;

        while let Some(op) = binary_op(self.tokens.peek_kind()?) {
            self.tokens.next_token()?;
            self.compile_term()?;

            match op {
                BinaryOp::Vm(op) => self.code.arithmetic(op)?,
                BinaryOp::Multiply => self.code.call("Math.multiply", 2)?,
                BinaryOp::Divide => self.code.call("Math.divide", 2)?,
            }
        }

        Ok(())
    }

    /// One operand of an expression.
    fn compile_term(&mut self) -> JackResult<()> {
        let token = self.tokens.peek()?;

        match token.kind {
            // Unary operators bind tighter than binary operators;
            // the operand is a whole term.
            TokenKind::Minus => {
                self.tokens.next_token()?;
                self.compile_term()?;
                self.code.arithmetic(VmOp::Neg)?;
            }
            TokenKind::Tilde => {
                self.tokens.next_token()?;
                self.compile_term()?;
                self.code.arithmetic(VmOp::Not)?;
            }
            TokenKind::LeftParen => {
                self.tokens.next_token()?;
                self.compile_expression()?;
                self.tokens.consume(TokenKind::RightParen)?;
            }
            TokenKind::Int => {
                self.tokens.next_token()?;
                let value = self.integer_value(token)?;
                self.code.push(Segment::Constant, value)?;
            }
            TokenKind::String => {
                self.tokens.next_token()?;
                self.compile_string(token)?;
            }
            TokenKind::Keyword(Keyword::True) => {
                self.tokens.next_token()?;
                // True is all ones.
                self.code.push(Segment::Constant, 1)?;
                self.code.arithmetic(VmOp::Neg)?;
            }
            TokenKind::Keyword(Keyword::False | Keyword::Null) => {
                self.tokens.next_token()?;
                self.code.push(Segment::Constant, 0)?;
            }
            TokenKind::Keyword(Keyword::This) => {
                self.tokens.next_token()?;
                self.code.push(Segment::Pointer, 0)?;
            }
            TokenKind::Ident => {
                self.tokens.next_token()?;
                match self.tokens.peek_kind()? {
                    TokenKind::LeftParen | TokenKind::Dot => {
                        self.compile_subroutine_call(token)?;
                    }
                    TokenKind::LeftBracket => {
                        self.compile_array_entry(token)?;
                    }
                    _ => {
                        let symbol = self.resolve(token)?;
                        self.code.push(symbol.kind.segment(), symbol.index)?;
                    }
                }
            }
            _ => return Err(self.unexpected("term", token)),
        }

        Ok(())
    }

    /// Array entry read: `varName '[' expression ']'`.
    ///
    /// The entry's address is computed on the stack and
    /// dereferenced through `that`.
    fn compile_array_entry(&mut self, name: Token) -> JackResult<()> {
        let symbol = self.resolve(name)?;

        self.tokens.consume(TokenKind::LeftBracket)?;
        self.compile_expression()?;
        self.tokens.consume(TokenKind::RightBracket)?;

        self.code.push(symbol.kind.segment(), symbol.index)?;
        self.code.arithmetic(VmOp::Add)?;
        self.code.pop(Segment::Pointer, 1)?;
        self.code.push(Segment::That, 0)?;

        Ok(())
    }

    /// Subroutine call, after its leading identifier has been
    /// consumed.
    ///
    /// An unqualified call is a method call on the current object.
    /// A qualified call goes through a variable, making that
    /// variable the receiver and its type the callee's class; a
    /// qualifier that is not a variable names the callee's class
    /// directly and passes no receiver.
    fn compile_subroutine_call(&mut self, name: Token) -> JackResult<()> {
        let mut args: u16 = 0;

        let callee = if self.tokens.match_token(TokenKind::Dot) {
            let member = self.tokens.consume_ident()?;
            let member_name = self.fragment(&member.span);
            let name_text = self.fragment(&name.span);

            match self.lookup(name_text) {
                Some(symbol) => {
                    self.code.push(symbol.kind.segment(), symbol.index)?;
                    args += 1;
                    format!("{}.{}", symbol.ty, member_name)
                }
                None => format!("{}.{}", name_text, member_name),
            }
        } else {
            self.code.push(Segment::Pointer, 0)?;
            args += 1;
            format!("{}.{}", self.class_name, self.fragment(&name.span))
        };

        self.tokens.consume(TokenKind::LeftParen)?;
        args += self.compile_expression_list()?;
        self.tokens.consume(TokenKind::RightParen)?;

        self.code.call(&callee, args)?;

        Ok(())
    }

    /// `(expression (',' expression)*)?`
    ///
    /// Returns the number of expressions compiled, each of which
    /// left one value on the stack.
    fn compile_expression_list(&mut self) -> JackResult<u16> {
        if self.tokens.peek_kind()? == TokenKind::RightParen {
            return Ok(0);
        }

        self.compile_expression()?;
        let mut count = 1;

        while self.tokens.match_token(TokenKind::Comma) {
            self.compile_expression()?;
            count += 1;
        }

        Ok(count)
    }

    /// `'int' | 'char' | 'boolean' | className`
    ///
    /// Returns the type's name. Types are recorded in symbol
    /// tables but never checked; the VM is untyped.
    fn compile_type(&mut self) -> JackResult<SmolStr> {
        let token = self.tokens.peek()?;
        match token.kind {
            TokenKind::Keyword(Keyword::Int | Keyword::Char | Keyword::Boolean)
            | TokenKind::Ident => {
                self.tokens.next_token()?;
                Ok(self.fragment(&token.span).into())
            }
            _ => Err(self.unexpected("type", token)),
        }
    }

    /// Build a string object: allocate with `String.new`, then
    /// append one character per call.
    fn compile_string(&mut self, token: Token) -> JackResult<()> {
        let fragment = self.fragment(&token.span);
        // Strip the surrounding quotes.
        let text = &fragment[1..fragment.len() - 1];

        self.code.push(Segment::Constant, text.chars().count() as u16)?;
        self.code.call("String.new", 1)?;

        for c in text.chars() {
            self.code.push(Segment::Constant, c as u16)?;
            self.code.call("String.appendChar", 2)?;
        }

        Ok(())
    }

    /// Parse an integer constant and check it against the VM's
    /// 15-bit range.
    fn integer_value(&self, token: Token) -> JackResult<u16> {
        let literal = self.fragment(&token.span);
        match literal.parse::<u16>() {
            Ok(value) if value <= 32767 => Ok(value),
            _ => Err(CompileError::IntegerRange {
                literal: literal.to_string(),
                line: token.span.line,
                column: token.span.column,
            }
            .into()),
        }
    }
}

/// Symbols and errors.
impl<'a> Compiler<'a> {
    /// Record a declared name. Statics and fields go to class
    /// scope, arguments and locals to subroutine scope.
    fn define(&mut self, name: Token, ty: &str, kind: SymbolKind) -> JackResult<u16> {
        let text = self.tokens.span_fragment(&name.span);

        let table = match kind {
            SymbolKind::Static | SymbolKind::Field => &mut self.class_symbols,
            SymbolKind::Argument | SymbolKind::Local => &mut self.subroutine_symbols,
        };

        table.define(text, ty, kind).ok_or_else(|| {
            JackError::from(SymbolError::Duplicate {
                name: text.to_string(),
                line: name.span.line,
                column: name.span.column,
            })
        })
    }

    /// Look up a name in subroutine scope first, falling back to
    /// class scope.
    fn lookup(&self, name: &str) -> Option<Symbol> {
        self.subroutine_symbols
            .get(name)
            .or_else(|| self.class_symbols.get(name))
            .cloned()
    }

    /// Resolve a name that must be declared.
    fn resolve(&self, name: Token) -> JackResult<Symbol> {
        let text = self.fragment(&name.span);
        self.lookup(text).ok_or_else(|| {
            JackError::from(SymbolError::NotFound {
                name: text.to_string(),
                line: name.span.line,
                column: name.span.column,
            })
        })
    }

    #[inline]
    fn fragment(&self, span: &Span) -> &'a str {
        self.tokens.span_fragment(span)
    }

    #[inline(never)]
    #[cold]
    fn unexpected(&self, expected: &'static str, token: Token) -> JackError {
        CompileError::UnexpectedToken {
            expected,
            encountered: token.kind,
            line: token.span.line,
            column: token.span.column,
        }
        .into()
    }
}

/// Binary operator emission. Most operators map to one VM
/// instruction; multiplication and division call into the
/// standard library.
enum BinaryOp {
    Vm(VmOp),
    Multiply,
    Divide,
}

#[rustfmt::skip]
fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    use TokenKind as TK;

    match kind {
        TK::Plus      => Some(BinaryOp::Vm(VmOp::Add)),
        TK::Minus     => Some(BinaryOp::Vm(VmOp::Sub)),
        TK::Ampersand => Some(BinaryOp::Vm(VmOp::And)),
        TK::Pipe      => Some(BinaryOp::Vm(VmOp::Or)),
        TK::Less      => Some(BinaryOp::Vm(VmOp::Lt)),
        TK::Greater   => Some(BinaryOp::Vm(VmOp::Gt)),
        TK::Eq        => Some(BinaryOp::Vm(VmOp::Eq)),
        TK::Star      => Some(BinaryOp::Multiply),
        TK::Slash     => Some(BinaryOp::Divide),
        _ => None,
    }
}
