//! Declaration extractor
//!
//! One linear pass over the token list classifies every top-level form:
//!
//! ```text
//! org N                    code origin (not permitted inside functions)
//! var NAME SIZE            reserved bytes (simple number or b'/w'/d')
//! const NAME LITERAL       named literal, text retained
//! str NAME "TEXT"          string constant
//! data NAME ... end        literal values
//! code NAME /# ... #/      verbatim assembly block
//! def NAME ... end         function (also written : NAME ... ;)
//! ```
//!
//! Function bodies are stored as token sequences and interpreted later by
//! the code generator. Declarations may not nest, and every name enters
//! the single global namespace immediately.

use crate::ast::{self, CodeBlock, DataBlock, Function, Program, SymbolKind, Variable};
use crate::literal;

pub struct Parser {
    tokens: Vec<String>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<String>) -> Self {
        Parser { tokens, pos: 0 }
    }

    /// Run the declaration pass, producing a populated [`Program`].
    pub fn parse(mut self) -> Result<Program, String> {
        let mut program = Program::new();

        while let Some(token) = self.next() {
            match token.as_str() {
                "org" => self.parse_org(&mut program)?,
                "var" => self.parse_var(&mut program)?,
                "const" => self.parse_const(&mut program)?,
                "str" => self.parse_str(&mut program)?,
                "data" => self.parse_data(&mut program)?,
                "code" => self.parse_code(&mut program)?,
                "def" | ":" => self.parse_function(&mut program)?,
                // stray tokens between declarations are ignored
                _ => {}
            }
        }

        Ok(program)
    }

    fn next(&mut self) -> Option<String> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_org(&mut self, program: &mut Program) -> Result<(), String> {
        let value = self
            .next()
            .ok_or("Syntax error: too few tokens for origin statement.")?;
        let org = literal::simple_number(&value)
            .filter(|n| *n <= 0xFFFF)
            .ok_or(format!("Illegal origin address: {}", value))?;
        // the first org statement wins; later ones are validated but ignored
        if program.origin.is_none() {
            program.origin = Some(org as u32);
        }
        Ok(())
    }

    fn parse_var(&mut self, program: &mut Program) -> Result<(), String> {
        let (name, size_token) = match (self.next(), self.next()) {
            (Some(n), Some(s)) => (n, s),
            _ => return Err("Syntax error: too few tokens for variable declaration.".to_string()),
        };
        if !ast::valid_name(&name) {
            return Err(format!("Illegal variable name: {}", name));
        }
        let size = match literal::simple_number(&size_token) {
            Some(n) => n,
            None => u64::from(literal::storage_size(&size_token)),
        };
        if size == 0 || size >= 65535 {
            return Err(format!("Illegal variable size: {}, size = {}", name, size_token));
        }
        program.declare(&name, SymbolKind::Var)?;
        program.variables.push(Variable {
            name,
            size: size as u32,
        });
        Ok(())
    }

    fn parse_const(&mut self, program: &mut Program) -> Result<(), String> {
        let (name, value) = match (self.next(), self.next()) {
            (Some(n), Some(v)) => (n, v),
            _ => return Err("Syntax error: too few tokens for constant declaration.".to_string()),
        };
        if !ast::valid_name(&name) {
            return Err(format!("Illegal constant name: {}", name));
        }
        match literal::parse_literal(&value) {
            Some(n) if n.in_bounds => {}
            _ => return Err(format!("Illegal constant value: {} = {}", name, value)),
        }
        program.declare(&name, SymbolKind::Const)?;
        program.constants.push((name, value));
        Ok(())
    }

    fn parse_str(&mut self, program: &mut Program) -> Result<(), String> {
        let (name, value) = match (self.next(), self.next()) {
            (Some(n), Some(v)) => (n, v),
            _ => return Err("Syntax error: too few tokens for string declaration.".to_string()),
        };
        if !ast::valid_name(&name) {
            return Err(format!("Illegal string name: {}", name));
        }
        if !ast::is_string_constant(&value) {
            return Err(format!("Illegal string value, name = {}", name));
        }
        program.declare(&name, SymbolKind::Str)?;
        program.strings.push((name, value));
        Ok(())
    }

    fn parse_data(&mut self, program: &mut Program) -> Result<(), String> {
        let name = self
            .next()
            .ok_or("Too few tokens for data block declaration.")?;
        if !ast::valid_name(&name) {
            return Err(format!("Illegal data block name: {}", name));
        }
        let mut values = Vec::new();
        loop {
            let token = self
                .next()
                .ok_or(format!("Missing end for data block {}", name))?;
            match token.as_str() {
                "end" => break,
                "data" => return Err("Data blocks may not be nested.".to_string()),
                _ => match literal::parse_literal(&token) {
                    Some(n) if n.in_bounds => values.push(token),
                    Some(n) => {
                        return Err(format!("Illegal data value: {} [{}]", name, n.text));
                    }
                    None => {
                        return Err(format!("Illegal data value: {} [{}]", name, token));
                    }
                },
            }
        }
        program.declare(&name, SymbolKind::Data)?;
        program.data_blocks.push(DataBlock { name, values });
        Ok(())
    }

    fn parse_code(&mut self, program: &mut Program) -> Result<(), String> {
        let (name, block) = match (self.next(), self.next()) {
            (Some(n), Some(b)) => (n, b),
            _ => return Err("Too few tokens for code block declaration.".to_string()),
        };
        if !ast::valid_name(&name) {
            return Err(format!("Illegal code block name: {}", name));
        }
        if !ast::is_inline_asm(&block) {
            return Err(format!("Code block {} missing delimiters.", name));
        }
        program.declare(&name, SymbolKind::Code)?;
        program.code_blocks.push(CodeBlock {
            name,
            body: ast::inline_asm_body(&block).to_string(),
        });
        Ok(())
    }

    fn parse_function(&mut self, program: &mut Program) -> Result<(), String> {
        let name = self
            .next()
            .ok_or("Too few tokens for function declaration.")?;
        if !ast::valid_name(&name) {
            return Err(format!("Illegal function name: {}", name));
        }
        program.declare(&name, SymbolKind::Func)?;

        let mut body = Vec::new();
        loop {
            let token = self
                .next()
                .ok_or(format!("Missing end for function {}", name))?;
            match token.as_str() {
                "end" | ";" => break,
                "def" | ":" => {
                    return Err("Function declarations may not be nested.".to_string());
                }
                "var" => return Err("Variables cannot be defined within functions.".to_string()),
                "const" => {
                    return Err("Constants cannot be defined within functions.".to_string());
                }
                "str" => return Err("Strings cannot be defined within functions.".to_string()),
                "data" => {
                    return Err("Data blocks cannot be defined within functions.".to_string());
                }
                "code" => {
                    return Err("Code blocks cannot be defined within functions.".to_string());
                }
                "org" => {
                    return Err("Origin statements cannot be within functions.".to_string());
                }
                _ => body.push(token),
            }
        }
        program.functions.push(Function { name, body });
        Ok(())
    }
}
