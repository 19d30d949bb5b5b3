//! Output composition
//!
//! Assembles the final `.s` text in its fixed order: banner, pragma,
//! scratch-pad equates, the variable region, the code origin and entry
//! stub, data blocks, code blocks, the string pool, referenced library
//! routine bodies, compiled functions, and the end label.
//!
//! The variable region is placed descending from the top-of-variables
//! address; the composer rejects layouts where it would collide with the
//! scratch-pad region or the code origin.

use super::{CodeGenError, Inst, format_byte, format_double, format_word, signed_value};
use crate::ast::Program;
use crate::builtins::LibrarySet;
use crate::config::{self, CompilerOptions};
use crate::literal::{self, Sign};
use std::fmt::Write as _;
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

/// Compile data blocks into labeled byte/word/double directives, width
/// chosen per element from its storage qualifier.
pub fn compile_data_blocks(program: &Program, verbose: bool) -> Result<Vec<Inst>, CodeGenError> {
    let mut out = Vec::new();

    for block in &program.data_blocks {
        if verbose {
            out.push(Inst::new(format!(";; Data block '{}'", block.name), "", ""));
        }
        out.push(Inst::new(&block.name, "", ""));
        for text in &block.values {
            let n = literal::parse_literal(text).ok_or_else(|| {
                CodeGenError::Logic(format!("Illegal data value: {} [{}]", block.name, text))
            })?;
            if !n.in_bounds || (n.size == 0 && !literal::fits_storage(n.sign, n.magnitude, 2)) {
                return Err(CodeGenError::Logic(format!(
                    "Value out of bounds : {}",
                    n.text
                )));
            }
            let value = signed_value(n.sign, n.magnitude);
            match n.size {
                4 => {
                    if verbose {
                        out.push(Inst::new(
                            format!(";; Doubleword {}{}", n.text, sign_tag(n.sign, true)),
                            "",
                            "",
                        ));
                    }
                    out.push(Inst::new("", "FQB", format_double(value, n.base)));
                }
                1 => {
                    if verbose {
                        out.push(Inst::new(
                            format!(";; Byte {}{}", n.text, sign_tag(n.sign, false)),
                            "",
                            "",
                        ));
                    }
                    let value = signed_value(n.sign, n.magnitude & 0xFF);
                    out.push(Inst::new("", "FCB", format_byte(value, n.base)));
                }
                _ => {
                    if verbose {
                        out.push(Inst::new(
                            format!(";; Word {}{}", n.text, sign_tag(n.sign, false)),
                            "",
                            "",
                        ));
                    }
                    out.push(Inst::new("", "FDB", format_word(value, n.base)));
                }
            }
        }
    }
    Ok(out)
}

fn sign_tag(sign: Sign, double: bool) -> &'static str {
    match (sign, double) {
        (Sign::Complement, true) => " (1C, LSW first)",
        (Sign::Negate, true) => " (2C, LSW first)",
        (_, true) => " (LSW first)",
        (Sign::Complement, false) => " (1C)",
        (Sign::Negate, false) => " (2C)",
        (_, false) => "",
    }
}

/// Compile code blocks: a label followed by the verbatim body.
pub fn compile_code_blocks(program: &Program, verbose: bool) -> Vec<Inst> {
    let mut out = Vec::new();
    for block in &program.code_blocks {
        if verbose {
            out.push(Inst::new(format!(";; Code block '{}'", block.name), "", ""));
        }
        out.push(Inst::new(&block.name, "", ""));
        out.push(Inst::new(
            block.body.trim_matches(|c| c == '\n' || c == ' '),
            "",
            "",
        ));
    }
    out
}

/// Compose the complete assembly output.
pub fn compose_output(
    program: &Program,
    opts: &CompilerOptions,
    lib: &LibrarySet,
    functions: &[Inst],
) -> Result<String, CodeGenError> {
    let origin = resolve_origin(program, opts);
    let var_total: u64 = program.variables.iter().map(|v| u64::from(v.size)).sum();
    let var_base = check_layout(opts.var_top, var_total, origin)?;

    let mut out = String::new();

    // banner
    for line in [
        String::new(),
        format!(
            "Output from SPL compiler version {}",
            env!("CARGO_PKG_VERSION")
        ),
        format!("Generated at unix time {}", timestamp()),
        "Target assembler is lwasm".to_string(),
        String::new(),
    ] {
        writeln!(out, "{}", Inst::new(format!(";; {}", line), "", "").render())?;
    }

    // enable the lwasm 6809 convenience instructions
    // (ASRD, CLRD, COMD, LSLD, LSRD, NEGD, TSTD)
    writeln!(out, "{}", Inst::new("", "PRAGMA", "6809conv").render())?;
    writeln!(out)?;

    // scratch-pad equates
    for (name, addr) in config::scratch_equates(opts.stack_base) {
        writeln!(
            out,
            "{}",
            Inst::new(name, "EQU", format!("${:04X}", addr)).render()
        )?;
    }
    writeln!(out)?;

    // variable region, descending from the top-of-variables address
    writeln!(
        out,
        "{}",
        Inst::new("", "ORG", format!("${:04X}", var_base)).render()
    )?;
    for var in &program.variables {
        writeln!(
            out,
            "{}",
            Inst::new(&var.name, "RMB", var.size.to_string()).render()
        )?;
    }
    writeln!(
        out,
        "{}",
        Inst::new(format!(";; variables end at ${:04X}", opts.var_top), "", "").render()
    )?;
    writeln!(out)?;

    // code origin and entry stub
    writeln!(
        out,
        "{}",
        Inst::new("", "ORG", format!("${:04X}", origin)).render()
    )?;
    writeln!(out, "{}", Inst::new("", "LDU", "#stack").render())?;
    writeln!(out, "{}", Inst::new("", "JMP", "main").render())?;
    writeln!(out)?;

    for inst in compile_data_blocks(program, opts.verbose)? {
        writeln!(out, "{}", inst.render())?;
    }
    writeln!(out)?;

    for inst in compile_code_blocks(program, opts.verbose) {
        writeln!(out, "{}", inst.render())?;
    }
    writeln!(out)?;

    // string pool: length byte, then the body with its terminator
    for (name, text) in &program.strings {
        if opts.verbose {
            writeln!(
                out,
                "{}",
                Inst::new(format!(";; String constant {}", name), "", "").render()
            )?;
        }
        let length = text.chars().count().saturating_sub(2);
        writeln!(
            out,
            "{}",
            Inst::new(name, "FCB", length.to_string()).render()
        )?;
        writeln!(out, "{}", Inst::new("", "FCN", text.clone()).render())?;
    }
    writeln!(out)?;

    // referenced library routine bodies
    for label in &lib.routines {
        let path = opts.paths.lib_dir.join(format!("{}.s", label));
        let body = fs::read_to_string(&path).map_err(|e| {
            CodeGenError::Io(std::io::Error::new(
                e.kind(),
                format!("Unable to locate library routine {}", path.display()),
            ))
        })?;
        out.push_str(&body);
    }
    writeln!(out)?;

    for inst in functions {
        writeln!(out, "{}", inst.render())?;
    }
    writeln!(out)?;

    out.push_str("_end\n");
    Ok(out)
}

/// The effective code origin: `--sys` forces the system address, then the
/// command-line override, then the `org` statement, then the default.
fn resolve_origin(program: &Program, opts: &CompilerOptions) -> u32 {
    if opts.sys {
        return config::SYS_ORIGIN;
    }
    opts.origin
        .or(program.origin)
        .unwrap_or(config::DEFAULT_ORIGIN)
}

/// Validate the memory layout and return the base of the variable region.
fn check_layout(var_top: u32, var_total: u64, origin: u32) -> Result<u32, CodeGenError> {
    if var_total > u64::from(var_top) {
        return Err(CodeGenError::Logic(format!(
            "Variables overflow the top-of-variables address ${:04X} ({} bytes)",
            var_top, var_total
        )));
    }
    let var_base = var_top - var_total as u32;
    let scratch_end = config::SCRATCH_BASE + config::SCRATCH_SIZE;

    if var_total > 0 && var_base < scratch_end && config::SCRATCH_BASE < var_top {
        return Err(CodeGenError::Logic(format!(
            "Variable region ${:04X}..${:04X} overlaps the scratch-pad region",
            var_base, var_top
        )));
    }
    if var_total > 0 && origin >= var_base && origin < var_top {
        return Err(CodeGenError::Logic(format!(
            "Code origin ${:04X} lies inside the variable region",
            origin
        )));
    }
    if origin >= config::SCRATCH_BASE && origin < scratch_end {
        return Err(CodeGenError::Logic(format!(
            "Code origin ${:04X} lies inside the scratch-pad region",
            origin
        )));
    }
    Ok(var_base)
}

fn timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{DataBlock, Variable};
    use crate::config::CompilerOptions;
    use crate::lexer;
    use crate::parser::Parser;

    fn parse(src: &str) -> Program {
        Parser::new(lexer::tokenize(src).unwrap()).parse().unwrap()
    }

    fn opts() -> CompilerOptions {
        CompilerOptions::new(vec![])
    }

    fn compose(program: &Program, opts: &CompilerOptions) -> String {
        compose_output(program, opts, &LibrarySet::default(), &[]).unwrap()
    }

    #[test]
    fn test_data_block_width_selection() {
        let program = parse("data d b'1 w'2 d'3 end");
        let insts = compile_data_blocks(&program, false).unwrap();
        assert_eq!(insts[0], Inst::new("d", "", ""));
        assert_eq!(insts[1], Inst::new("", "FCB", "1"));
        assert_eq!(insts[2], Inst::new("", "FDB", "2"));
        assert_eq!(insts[3], Inst::new("", "FQB", "3"));
    }

    #[test]
    fn test_data_block_base_and_sign() {
        let program = parse("data d b'0xFF -w'2 ~d'10 end");
        let insts = compile_data_blocks(&program, false).unwrap();
        assert_eq!(insts[1], Inst::new("", "FCB", "$FF"));
        assert_eq!(insts[2], Inst::new("", "FDB", "65534"));
        assert_eq!(insts[3], Inst::new("", "FQB", "4294967285"));
    }

    #[test]
    fn test_data_block_unqualified_defaults_to_word() {
        let program = parse("data d 5 0x1234 end");
        let insts = compile_data_blocks(&program, false).unwrap();
        assert_eq!(insts[1], Inst::new("", "FDB", "5"));
        assert_eq!(insts[2], Inst::new("", "FDB", "$1234"));
    }

    #[test]
    fn test_code_blocks_verbatim() {
        let program = parse("code beep /#\n LDA #7\n STA $FF00\n#/");
        let insts = compile_code_blocks(&program, false);
        assert_eq!(insts[0], Inst::new("beep", "", ""));
        assert_eq!(insts[1], Inst::new(" LDA #7\n STA $FF00", "", ""));
    }

    #[test]
    fn test_variable_region_descends_from_var_top() {
        let program = parse("var a 2 var b 0x10 : main ;");
        let text = compose(&program, &opts());
        // 0xFF8F - 18 = 0xFF7D
        assert!(text.contains("ORG     $FF7D"), "{}", text);
        let a = text.find("a       RMB     2").unwrap();
        let b = text.find("b       RMB     16").unwrap();
        assert!(a < b);
        assert!(text.contains(";; variables end at $FF8F"));
    }

    #[test]
    fn test_entry_stub_and_origin() {
        let program = parse(": main ;");
        let text = compose(&program, &opts());
        assert!(text.contains("ORG     $4000"));
        assert!(text.contains("LDU     #stack"));
        assert!(text.contains("JMP     main"));
        assert!(text.trim_end().ends_with("_end"));
    }

    #[test]
    fn test_org_statement_and_override() {
        let program = parse("org 0x6000 : main ;");
        assert!(compose(&program, &opts()).contains("ORG     $6000"));

        let mut o = opts();
        o.origin = Some(0x7000);
        assert!(compose(&program, &o).contains("ORG     $7000"));

        let mut o = opts();
        o.sys = true;
        assert!(compose(&program, &o).contains("ORG     $2000"));
    }

    #[test]
    fn test_equates_section() {
        let program = parse(": main ;");
        let text = compose(&program, &opts());
        assert!(text.contains("stack   EQU     $8000"));
        assert!(text.contains("op1     EQU     $8000"));
        assert!(text.contains("inbuf   EQU     $8034"));
        assert!(text.contains("PRAGMA  6809conv"));
    }

    #[test]
    fn test_stack_base_override() {
        let program = parse(": main ;");
        let mut o = opts();
        o.stack_base = 0x7F00;
        let text = compose(&program, &o);
        assert!(text.contains("stack   EQU     $7F00"));
        assert!(text.contains("op1     EQU     $8000"));
    }

    #[test]
    fn test_string_pool_length_prefix() {
        let program = parse("str greet \"hi\" : main ;");
        let text = compose(&program, &opts());
        assert!(text.contains("greet   FCB     2"));
        assert!(text.contains("FCN     \"hi\""));
    }

    #[test]
    fn test_variable_overflow_rejected() {
        let mut program = parse(": main ;");
        program.variables.push(Variable {
            name: "huge".to_string(),
            size: 0xFFFF - 1,
        });
        let mut o = opts();
        o.var_top = 0x1000;
        assert!(compose_output(&program, &o, &LibrarySet::default(), &[]).is_err());
    }

    #[test]
    fn test_variable_scratch_overlap_rejected() {
        let mut o = opts();
        o.var_top = 0x8040; // inside the scratch-pad region
        let program = parse("var x 2 : main ;");
        assert!(compose_output(&program, &o, &LibrarySet::default(), &[]).is_err());
    }

    #[test]
    fn test_origin_inside_variable_region_rejected() {
        let mut o = opts();
        o.origin = Some(0xFF8E);
        let program = parse("var x 4 : main ;");
        assert!(compose_output(&program, &o, &LibrarySet::default(), &[]).is_err());
    }

    #[test]
    fn test_origin_inside_scratch_region_rejected() {
        let mut o = opts();
        o.origin = Some(0x8010);
        let program = parse(": main ;");
        assert!(compose_output(&program, &o, &LibrarySet::default(), &[]).is_err());
    }

    #[test]
    fn test_missing_library_file_is_fatal() {
        let program = parse(": main ;");
        let lib = LibrarySet {
            words: vec![".".to_string()],
            routines: vec!["print".to_string()],
        };
        let mut o = opts();
        o.paths.lib_dir = std::path::PathBuf::from("/nonexistent-spl-lib");
        let err = compose_output(&program, &o, &lib, &[]).unwrap_err();
        assert!(err.to_string().contains("print"));
    }

    #[test]
    fn test_library_bodies_concatenated_once() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cr.s"), "cr\n LDA #13\n JSR chout\n RTS\n").unwrap();
        fs::write(dir.path().join("chout.s"), "chout\n RTS\n").unwrap();
        let lib = LibrarySet {
            words: vec!["cr".to_string()],
            routines: vec!["cr".to_string(), "chout".to_string()],
        };
        let mut o = opts();
        o.paths.lib_dir = dir.path().to_path_buf();
        let program = parse(": main cr ;");
        let text = compose_output(&program, &o, &lib, &[]).unwrap();
        assert_eq!(text.matches("JSR chout").count(), 1);
        assert_eq!(text.matches("chout\n RTS").count(), 1);
    }

    #[test]
    fn test_header_banner() {
        let program = parse(": main ;");
        let text = compose(&program, &opts());
        assert!(text.starts_with(";;"));
        assert!(text.contains("Output from SPL compiler version"));
        assert!(text.contains("Target assembler is lwasm"));
    }

    #[test]
    fn test_data_out_of_bounds_at_emission() {
        // an unqualified element wider than a word fails when emitted
        let program = Program {
            data_blocks: vec![DataBlock {
                name: "d".to_string(),
                values: vec!["0x12345".to_string()],
            }],
            ..Program::new()
        };
        assert!(compile_data_blocks(&program, false).is_err());
    }
}
