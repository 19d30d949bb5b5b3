//! Program representation
//!
//! A parsed SPL program is a set of named declarations plus a symbol table
//! classifying every known name. Declaration order is preserved because it
//! drives the emitted memory layout and output ordering.

use crate::builtins;
use std::collections::HashMap;

/// Classification of a name in the global namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// Reserved storage, addressed by name.
    Var,
    /// Named numeric literal, re-parsed at each use site.
    Const,
    /// String constant, user declared or hoisted.
    Str,
    /// Labeled sequence of byte/word/double values.
    Data,
    /// Verbatim assembly block, invoked by subroutine call.
    Code,
    /// User function.
    Func,
    /// Library word resolved to an external routine.
    Lib,
    /// Control-flow keyword.
    Keyword,
    /// Core word expanded inline.
    Core,
}

/// A `var` declaration: reserved bytes in the descending variable region.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub size: u32,
}

/// A `data ... end` block of literal values.
#[derive(Debug, Clone)]
pub struct DataBlock {
    pub name: String,
    /// Retained literal texts, re-parsed at emission.
    pub values: Vec<String>,
}

/// A `code` block: a verbatim assembly body (delimiters stripped).
#[derive(Debug, Clone)]
pub struct CodeBlock {
    pub name: String,
    pub body: String,
}

/// A function body as an ordered token list.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub body: Vec<String>,
}

/// A parsed program: one global namespace, declarations in source order.
#[derive(Debug, Default)]
pub struct Program {
    /// Kind of every known name, keywords and core words included.
    pub symbols: HashMap<String, SymbolKind>,
    pub variables: Vec<Variable>,
    /// Constant name -> retained literal text.
    pub constants: Vec<(String, String)>,
    /// String name -> delimiter-preserved text. Hoisted strings append here.
    pub strings: Vec<(String, String)>,
    pub data_blocks: Vec<DataBlock>,
    pub code_blocks: Vec<CodeBlock>,
    pub functions: Vec<Function>,
    /// Code origin from an `org` statement, if any.
    pub origin: Option<u32>,
}

impl Program {
    /// Create an empty program with keywords and core words pre-registered.
    pub fn new() -> Self {
        let mut program = Program::default();
        builtins::register_builtins(&mut program.symbols);
        program
    }

    /// Enter `name` into the global namespace, rejecting collisions with
    /// any existing kind.
    pub fn declare(&mut self, name: &str, kind: SymbolKind) -> Result<(), String> {
        if self.symbols.contains_key(name) {
            return Err(format!("Duplicate name found: {}", name));
        }
        self.symbols.insert(name.to_string(), kind);
        Ok(())
    }

    pub fn kind_of(&self, token: &str) -> Option<SymbolKind> {
        self.symbols.get(token).copied()
    }

    pub fn find_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Retained literal text of a declared constant.
    pub fn constant_text(&self, name: &str) -> Option<&str> {
        self.constants
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, text)| text.as_str())
    }

    pub fn string_text(&self, name: &str) -> Option<&str> {
        self.strings
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, text)| text.as_str())
    }
}

/// True when a token is a string constant: at least two characters with
/// matching quote characters at both ends.
pub fn is_string_constant(token: &str) -> bool {
    let first = token.chars().next();
    let last = token.chars().last();
    match (first, last) {
        (Some(f), Some(l)) => {
            token.chars().count() >= 2 && f == l && (f == '"' || f == '\'')
        }
        _ => false,
    }
}

/// True when a token is an inline assembly block (`/# ... #/`).
pub fn is_inline_asm(token: &str) -> bool {
    token.len() >= 4 && token.starts_with("/#") && token.ends_with("#/")
}

/// Strip the `/#` and `#/` delimiters from an inline assembly token.
pub fn inline_asm_body(token: &str) -> &str {
    &token[2..token.len() - 2]
}

/// Valid declaration names: a leading letter or underscore, then letters,
/// digits, and underscores. Case-insensitive; stored verbatim.
pub fn valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
