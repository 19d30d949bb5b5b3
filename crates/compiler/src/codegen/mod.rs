//! HD6309 code generation
//!
//! Walks each reachable function's token stream and appends instruction
//! records. Core words expand inline; library words, functions, and code
//! blocks compile to `JSR`; numbers and address references push onto the
//! user argument stack (the U register, growing downward). The final
//! output text is composed by [`program`].
//!
//! The `CodeGen` value is the compilation session: it owns the label and
//! string-name counters, the loop and compare stacks, and the pending
//! `&` address-capture flag.

mod control_flow;
mod error;
mod inline;
pub mod program;

pub use error::CodeGenError;

use crate::ast::{self, Function, Program, SymbolKind};
use crate::builtins;
use crate::literal::{self, Sign};
use std::collections::HashSet;

/// One emitted record: label, mnemonic, operand. Any field may be empty;
/// comment lines ride in the label field.
#[derive(Debug, Clone, PartialEq)]
pub struct Inst {
    pub label: String,
    pub op: String,
    pub operand: String,
}

impl Inst {
    pub fn new(
        label: impl Into<String>,
        op: impl Into<String>,
        operand: impl Into<String>,
    ) -> Self {
        Inst {
            label: label.into(),
            op: op.into(),
            operand: operand.into(),
        }
    }

    /// Render the record as a source line: fields joined by tabs, expanded
    /// to 8-column stops.
    pub fn render(&self) -> String {
        let joined = format!("{}\t{}\t{}", self.label, self.op, self.operand);
        let expanded = expand_tabs(&joined, 8);
        expanded
            .lines()
            .map(|line| line.trim_end())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn expand_tabs(s: &str, width: usize) -> String {
    let mut out = String::new();
    let mut col = 0;
    for c in s.chars() {
        match c {
            '\t' => {
                let pad = width - col % width;
                out.extend(std::iter::repeat_n(' ', pad));
                col += pad;
            }
            '\n' => {
                out.push(c);
                col = 0;
            }
            _ => {
                out.push(c);
                col += 1;
            }
        }
    }
    out
}

/// Open loop construct: where `cont` and `break` branch to.
struct LoopFrame {
    continue_label: String,
    break_label: String,
}

/// Open `if`/`0if` construct.
struct CompareFrame {
    else_label: String,
    end_label: String,
    else_seen: bool,
}

/// Code generation session state.
pub struct CodeGen {
    instructions: Vec<Inst>,
    label_counter: u32,
    string_counter: u32,
    loop_stack: Vec<LoopFrame>,
    compare_stack: Vec<CompareFrame>,
    /// Set by `&`: the next function or library name pushes its address
    /// instead of being called.
    function_address: bool,
    current_function: String,
    current_token: String,
    verbose: bool,
    warn: bool,
}

impl CodeGen {
    pub fn new(verbose: bool, warn: bool) -> Self {
        CodeGen {
            instructions: Vec::new(),
            label_counter: 0,
            string_counter: 0,
            loop_stack: Vec::new(),
            compare_stack: Vec::new(),
            function_address: false,
            current_function: "$MAIN$".to_string(),
            current_token: "<na>".to_string(),
            verbose,
            warn,
        }
    }

    /// Compiled function records, in compilation order.
    pub fn instructions(&self) -> &[Inst] {
        &self.instructions
    }

    /// Return a unique label. The counter spans the whole translation
    /// unit, so labels never collide across functions.
    pub fn next_label(&mut self, name: &str) -> String {
        let label = format!("{}_A{:05}", name, self.label_counter);
        self.label_counter += 1;
        label
    }

    fn next_string_name(&mut self) -> String {
        let name = format!("STR_{:04X}", self.string_counter);
        self.string_counter += 1;
        name
    }

    fn emit(&mut self, label: &str, op: &str, operand: &str) {
        self.instructions.push(Inst::new(label, op, operand));
    }

    fn emit_comment(&mut self, text: String) {
        self.instructions.push(Inst::new(text, "", ""));
    }

    /// Build a diagnostic carrying the current function and token.
    fn err(&self, message: impl std::fmt::Display) -> CodeGenError {
        CodeGenError::Logic(format!(
            "In {} : {} : {}",
            self.current_function, self.current_token, message
        ))
    }

    /// Replace string constants inside reachable function bodies with
    /// references to generated `STR_XXXX` names. Running this twice is a
    /// no-op the second time: the replaced tokens are plain names.
    pub fn hoist_string_constants(
        &mut self,
        program: &mut Program,
        reachable: &HashSet<String>,
    ) -> Result<(), CodeGenError> {
        let mut functions = std::mem::take(&mut program.functions);
        for func in &mut functions {
            if !reachable.contains(&func.name) {
                continue;
            }
            for token in &mut func.body {
                if ast::is_string_constant(token) {
                    let name = self.next_string_name();
                    program.declare(&name, SymbolKind::Str)?;
                    program.strings.push((name.clone(), token.clone()));
                    *token = name;
                }
            }
        }
        program.functions = functions;
        Ok(())
    }

    /// Compile one function body into instruction records, ending with a
    /// subroutine return.
    pub fn compile_function(
        &mut self,
        func: &Function,
        program: &Program,
    ) -> Result<(), CodeGenError> {
        self.loop_stack.clear();
        self.compare_stack.clear();
        self.function_address = false;
        self.current_function = func.name.clone();

        self.emit(&func.name, "", "");
        for token in &func.body {
            self.compile_token(token, program)?;
        }
        self.emit("", "RTS", "");

        if self.warn && (!self.loop_stack.is_empty() || !self.compare_stack.is_empty()) {
            eprintln!(
                "Warning: function '{}' ends with {} open loop(s) and {} open if(s)",
                func.name,
                self.loop_stack.len(),
                self.compare_stack.len()
            );
        }
        Ok(())
    }

    fn compile_token(&mut self, token: &str, program: &Program) -> Result<(), CodeGenError> {
        self.current_token = token.to_string();

        match program.kind_of(token) {
            Some(SymbolKind::Func) => {
                if self.function_address {
                    self.emit("", "LDD", &format!("#{}", token));
                    self.emit("", "PSHU", "D");
                    self.function_address = false;
                } else {
                    self.emit("", "JSR", token);
                }
                Ok(())
            }
            Some(SymbolKind::Lib) => {
                let label = builtins::library_label(token)
                    .ok_or_else(|| self.err("No routine for library word"))?;
                if self.function_address {
                    self.emit("", "LDD", &format!("#{}", label));
                    self.emit("", "PSHU", "D");
                    self.function_address = false;
                } else {
                    self.emit("", "JSR", label);
                }
                Ok(())
            }
            Some(SymbolKind::Var) => {
                if self.verbose {
                    self.emit_comment(format!(
                        ";; Push address of variable {} onto stack",
                        token
                    ));
                }
                self.push_address(token);
                Ok(())
            }
            Some(SymbolKind::Data) => {
                if self.verbose {
                    self.emit_comment(format!(";; Push address of block {} onto stack", token));
                }
                self.push_address(token);
                Ok(())
            }
            Some(SymbolKind::Str) => {
                if self.verbose {
                    self.emit_comment(format!(";; Push address of string {} onto stack", token));
                }
                self.push_address(token);
                Ok(())
            }
            Some(SymbolKind::Code) => {
                if self.verbose {
                    self.emit_comment(format!(";; Call code block {}", token));
                }
                self.emit("", "JSR", token);
                Ok(())
            }
            Some(SymbolKind::Const) => {
                if self.verbose {
                    self.emit_comment(format!(";; Reference to constant {}", token));
                }
                let text = program
                    .constant_text(token)
                    .ok_or_else(|| self.err("Unknown constant"))?
                    .to_string();
                self.compile_number(&text)
            }
            Some(SymbolKind::Keyword) => self.compile_keyword(token),
            Some(SymbolKind::Core) => self.compile_core(token),
            None => {
                if literal::parse_literal(token).is_some() {
                    self.compile_number(token)
                } else if ast::is_inline_asm(token) {
                    self.compile_inline_asm(token);
                    Ok(())
                } else {
                    Err(self.err("Unknown token"))
                }
            }
        }
    }

    /// Push the address of a named symbol onto the user stack.
    fn push_address(&mut self, name: &str) {
        self.emit("", "LDY", &format!("#{}", name));
        self.emit("", "PSHU", "Y");
    }

    /// Emit a verbatim inline assembly block, followed by a blank line so
    /// the assembler's local-label scope ends with the block.
    fn compile_inline_asm(&mut self, token: &str) {
        let body = ast::inline_asm_body(token);
        self.emit("; Inline ASM code", "", "");
        self.emit(body.trim_matches(|c| c == '\n' || c == ' '), "", "");
        self.emit("", "", "");
    }

    /// Compile a literal push onto the user argument stack.
    ///
    /// Bytes are zero-extended to a word; unqualified literals push as a
    /// word and are bound-checked against word width here; doubles push
    /// two words, least-significant word first. The sign marker applies
    /// its bitwise transform to the magnitude before encoding.
    fn compile_number(&mut self, token: &str) -> Result<(), CodeGenError> {
        let n = literal::parse_literal(token)
            .ok_or_else(|| self.err(format!("Illegal number: {}", token)))?;
        if !n.in_bounds {
            return Err(self.err(format!("Value out of bounds : {}", token)));
        }
        if n.size == 0 && !literal::fits_storage(n.sign, n.magnitude, 2) {
            return Err(self.err(format!("Value out of bounds : {}", token)));
        }

        match n.size {
            4 => {
                if self.verbose {
                    let tag = match n.sign {
                        Sign::Complement => " (1C, LSW first)",
                        Sign::Negate => " (2C, LSW first)",
                        _ => " (LSW first)",
                    };
                    self.emit_comment(format!(
                        ";; Push doubleword {} onto stack{}",
                        n.text, tag
                    ));
                }
                let full = signed_value(n.sign, n.magnitude);
                self.emit("", "LDD", &format!("#{}", format_word(full, n.base)));
                self.emit("", "PSHU", "D");
                self.emit("", "LDD", &format!("#{}", format_word(full >> 16, n.base)));
                self.emit("", "PSHU", "D");
            }
            1 => {
                if self.verbose {
                    let tag = match n.sign {
                        Sign::Complement => " (1C)",
                        Sign::Negate => " (2C)",
                        _ => "",
                    };
                    self.emit_comment(format!(
                        ";; Push byte {} onto stack as word{}",
                        n.text, tag
                    ));
                }
                let value = signed_value(n.sign, n.magnitude & 0xFF);
                self.emit("", "LDD", &format!("#{}", format_word(value, n.base)));
                self.emit("", "PSHU", "D");
            }
            _ => {
                if self.verbose {
                    let tag = match n.sign {
                        Sign::Complement => " (1C)",
                        Sign::Negate => " (2C)",
                        _ => "",
                    };
                    self.emit_comment(format!(";; Push word {} onto stack{}", n.text, tag));
                }
                let value = signed_value(n.sign, n.magnitude);
                self.emit("", "LDD", &format!("#{}", format_word(value, n.base)));
                self.emit("", "PSHU", "D");
            }
        }
        Ok(())
    }
}

/// Apply a sign marker's bitwise transform to a magnitude.
pub(crate) fn signed_value(sign: Sign, magnitude: u64) -> u64 {
    match sign {
        Sign::Complement => !magnitude,
        Sign::Negate => 0u64.wrapping_sub(magnitude),
        Sign::None | Sign::Positive => magnitude,
    }
}

/// Format a byte operand in the base the literal was written in.
pub(crate) fn format_byte(value: u64, base: u32) -> String {
    let v = value & 0xFF;
    match base {
        16 => format!("${:02X}", v),
        8 => format!("@{:03o}", v),
        2 => format!("%{:08b}", v),
        _ => v.to_string(),
    }
}

/// Format a word operand in the base the literal was written in.
pub(crate) fn format_word(value: u64, base: u32) -> String {
    let v = value & 0xFFFF;
    match base {
        16 => format!("${:04X}", v),
        8 => format!("@{:05o}", v),
        2 => format!("%{:016b}", v),
        _ => v.to_string(),
    }
}

/// Format a double-word operand in the base the literal was written in.
pub(crate) fn format_double(value: u64, base: u32) -> String {
    let v = value & 0xFFFF_FFFF;
    match base {
        16 => format!("${:08X}", v),
        8 => format!("@{:011o}", v),
        2 => format!("%{:032b}", v),
        _ => v.to_string(),
    }
}
