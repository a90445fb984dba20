//! Symbol tables.
//!
//! Declared names live in two scopes. Statics and fields go to the
//! class scope; arguments and locals go to the subroutine scope,
//! which is replaced wholesale when a new subroutine starts.
use smol_str::SmolStr;

use crate::vm::Segment;

/// One declared name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: SmolStr,
    /// Declared type: int, char, boolean or a class name.
    pub ty: SmolStr,
    pub kind: SymbolKind,
    /// Position within the segment backing this symbol's kind.
    pub index: u16,
}

/// Storage class of a declared name.
///
/// The kind determines which VM segment the symbol is addressed
/// through, and which index sequence it draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SymbolKind {
    Static,
    Field,
    Argument,
    Local,
}

impl SymbolKind {
    /// VM segment that symbols of this kind are addressed through.
    ///
    /// Fields live behind the `this` pointer. The mapping is applied
    /// at code generation time and is not stored in the table.
    pub fn segment(&self) -> Segment {
        match self {
            Self::Static => Segment::Static,
            Self::Field => Segment::This,
            Self::Argument => Segment::Argument,
            Self::Local => Segment::Local,
        }
    }
}

/// Append-only record of declared names.
///
/// Names are unique within one table. Each symbol's index counts
/// the symbols of the same kind defined before it, so every kind
/// gets a dense, zero-based sequence regardless of how declarations
/// are interleaved.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new symbol, assigning the next index for its kind.
    ///
    /// Returns `None` when the name is already defined in this
    /// table.
    pub fn define(
        &mut self,
        name: impl Into<SmolStr>,
        ty: impl Into<SmolStr>,
        kind: SymbolKind,
    ) -> Option<u16> {
        let name = name.into();
        if self.contains(&name) {
            return None;
        }

        let index = self.count(kind);
        self.symbols.push(Symbol {
            name,
            ty: ty.into(),
            kind,
            index,
        });

        Some(index)
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|symbol| symbol.name.as_str() == name)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of symbols of the given kind.
    pub fn count(&self, kind: SymbolKind) -> u16 {
        self.symbols
            .iter()
            .filter(|symbol| symbol.kind == kind)
            .count() as u16
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
