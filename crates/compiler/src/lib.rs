//! SPL Compiler Library
//!
//! Compiles SPL, a small stack-oriented source language, into HD6309
//! assembly text for the lwasm toolchain.
//!
//! The pipeline is strictly linear: source text is tokenized, a single
//! declaration pass populates the symbol table and per-form containers,
//! reachability is computed from `main`, string literals in reachable
//! bodies are hoisted into the string pool, library-word references are
//! closed over the runtime dependency table, each reachable function is
//! compiled to instruction records, and the output composer writes the
//! final `.s` structure.
//!
//! # Example
//!
//! ```rust,ignore
//! use splc::{CompilerOptions, compile_files};
//!
//! let mut opts = CompilerOptions::new(vec!["demo.spl".to_string()]);
//! opts.output_name = "demo".to_string();
//! let written = compile_files(&opts)?;
//! ```

pub mod ast;
pub mod builtins;
pub mod call_graph;
pub mod codegen;
pub mod config;
pub mod lexer;
pub mod literal;
pub mod parser;

pub use ast::{Program, SymbolKind};
pub use codegen::CodeGen;
pub use config::{CompilerOptions, SearchPaths};
pub use parser::Parser;

use std::fs;
use std::path::PathBuf;

/// Compile the source files named in `opts` and write `<output_name>.s`.
///
/// Returns the path of the written file. Output types other than `asm`
/// still produce the assembly file; assembling and format conversion are
/// the external toolchain's stages.
pub fn compile_files(opts: &CompilerOptions) -> Result<PathBuf, String> {
    let source = load_sources(opts)?;
    let asm = compile_to_asm(&source, opts)?;

    let out_path = PathBuf::from(format!("{}.s", opts.output_name));
    fs::write(&out_path, asm)
        .map_err(|e| format!("Failed to write {}: {}", out_path.display(), e))?;

    if opts.output_type != "asm" {
        eprintln!(
            "Note: output type '{}' is produced by the external toolchain; run {} on {}",
            opts.output_type,
            opts.paths.lwasm.display(),
            out_path.display()
        );
    }
    Ok(out_path)
}

/// Compile source text to assembly output text.
pub fn compile_to_asm(source: &str, opts: &CompilerOptions) -> Result<String, String> {
    let tokens = lexer::tokenize(source)?;
    if opts.debug {
        eprintln!("{} tokens found", tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            eprintln!("{} :: {}", i, token);
        }
    }

    let mut program = Parser::new(tokens).parse()?;
    if program.kind_of("main") != Some(SymbolKind::Func) {
        return Err("No main function defined.".to_string());
    }

    let reachable = call_graph::reachable_functions(&program);
    if opts.warn {
        for func in &program.functions {
            if !reachable.contains(&func.name) {
                eprintln!(
                    "Warning: function '{}' is unreachable from main and was not compiled",
                    func.name
                );
            }
        }
    }

    let mut codegen = CodeGen::new(opts.verbose, opts.warn);
    codegen
        .hoist_string_constants(&mut program, &reachable)
        .map_err(|e| e.to_string())?;

    let lib = builtins::resolve_library_words(&mut program, &reachable);
    if opts.debug {
        eprintln!(
            "{} of {} functions reachable, {} library routines",
            program
                .functions
                .iter()
                .filter(|f| reachable.contains(&f.name))
                .count(),
            program.functions.len(),
            lib.routines.len()
        );
    }

    for func in &program.functions {
        if reachable.contains(&func.name) {
            codegen
                .compile_function(func, &program)
                .map_err(|e| e.to_string())?;
        }
    }

    codegen::program::compose_output(&program, opts, &lib, codegen.instructions())
        .map_err(|e| e.to_string())
}

/// Load and concatenate the source files: the literal path first, then the
/// include directory. A missing `.spl` extension is appended.
fn load_sources(opts: &CompilerOptions) -> Result<String, String> {
    let mut source = String::new();
    for name in &opts.files {
        let mut fname = name.clone();
        if !fname.contains(".spl") {
            fname.push_str(".spl");
        }
        let text = fs::read_to_string(&fname)
            .or_else(|_| fs::read_to_string(opts.paths.include_dir.join(&fname)))
            .map_err(|_| format!("Unable to locate {}", fname))?;
        source.push_str(&text);
        source.push('\n');
    }
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    /// Write stub routine files for every label in the closure so the
    /// emitter can concatenate them.
    fn write_routines(dir: &Path, labels: &[&str]) {
        for label in labels {
            fs::write(
                dir.join(format!("{}.s", label)),
                format!("{}\n RTS\n", label),
            )
            .unwrap();
        }
    }

    fn options_with_lib(dir: &Path) -> CompilerOptions {
        let mut opts = CompilerOptions::new(vec![]);
        opts.paths.lib_dir = dir.to_path_buf();
        opts
    }

    const PRINT_CLOSURE: [&str; 10] = [
        "print", "n_str", "prbuf", "ptrout", "comp_ta", "u_str", "get_ta", "btoa", "chout",
        "pop",
    ];

    #[test]
    fn test_hello_world() {
        let dir = tempfile::tempdir().unwrap();
        write_routines(dir.path(), &PRINT_CLOSURE);
        let opts = options_with_lib(dir.path());

        let text = compile_to_asm("str greet \"hi\" : main greet . ;", &opts).unwrap();

        // length-prefixed string, entry stub, address push, library call
        assert!(text.contains("greet   FCB     2"), "{}", text);
        assert!(text.contains("FCN     \"hi\""));
        assert!(text.contains("LDU     #stack"));
        assert!(text.contains("JMP     main"));
        assert!(text.contains("LDY     #greet"));
        assert!(text.contains("JSR     print"));
        // exactly the dependency closure of print, each exactly once
        for label in PRINT_CLOSURE {
            assert_eq!(
                text.matches(&format!("{}\n RTS", label)).count(),
                1,
                "routine {} missing or duplicated",
                label
            );
        }
    }

    #[test]
    fn test_unreachable_function_pruned() {
        let opts = CompilerOptions::new(vec![]);
        let text = compile_to_asm(": dead 1 2 + ; : main 5 ;", &opts).unwrap();
        assert!(!text.contains("dead"));
        assert!(text.contains("main"));
    }

    #[test]
    fn test_transitive_reachability_emits_chain() {
        let opts = CompilerOptions::new(vec![]);
        let text = compile_to_asm(": main fa ; : fa fb ; : fb 1 ;", &opts).unwrap();
        assert!(text.contains("JSR     fb"));
        assert!(text.contains("\nfb\n") || text.contains("\nfb "));
    }

    #[test]
    fn test_core_word_stays_inline() {
        let opts = CompilerOptions::new(vec![]);
        let text = compile_to_asm(": main 1 2 swap ;", &opts).unwrap();
        // no library routine concatenated, no call emitted
        assert!(!text.contains("JSR     swap"));
        assert!(text.contains("EXG     D,Y"));
    }

    #[test]
    fn test_missing_main_is_fatal() {
        let opts = CompilerOptions::new(vec![]);
        let err = compile_to_asm(": helper ;", &opts).unwrap_err();
        assert!(err.contains("No main function defined"));
    }

    #[test]
    fn test_main_must_be_a_function() {
        let opts = CompilerOptions::new(vec![]);
        let err = compile_to_asm("var main 2", &opts).unwrap_err();
        assert!(err.contains("No main function defined"));
    }

    #[test]
    fn test_unknown_token_reports_function_and_token() {
        let opts = CompilerOptions::new(vec![]);
        let err = compile_to_asm(": main bogus ;", &opts).unwrap_err();
        assert!(err.contains("main"));
        assert!(err.contains("bogus"));
    }

    #[test]
    fn test_lexer_error_propagates() {
        let opts = CompilerOptions::new(vec![]);
        assert!(compile_to_asm(": main \"unterminated ;", &opts).is_err());
    }

    #[test]
    fn test_verbose_commentary() {
        let opts = {
            let mut o = CompilerOptions::new(vec![]);
            o.verbose = true;
            o
        };
        let text = compile_to_asm("var x 2 : main x 5 ;", &opts).unwrap();
        assert!(text.contains(";; Push address of variable x onto stack"));
        assert!(text.contains(";; Push word 5 onto stack"));
    }

    #[test]
    fn test_load_sources_appends_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("prog.spl"), ": main ;").unwrap();
        let name = dir.path().join("prog").to_string_lossy().to_string();
        let opts = CompilerOptions::new(vec![name]);
        let source = load_sources(&opts).unwrap();
        assert_eq!(source, ": main ;\n");
    }

    #[test]
    fn test_load_sources_include_dir_fallback() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("util.spl"), ": helper ;").unwrap();
        let mut opts = CompilerOptions::new(vec!["util".to_string()]);
        opts.paths.include_dir = dir.path().to_path_buf();
        let source = load_sources(&opts).unwrap();
        assert_eq!(source, ": helper ;\n");
    }

    #[test]
    fn test_load_sources_missing_file() {
        let opts = CompilerOptions::new(vec!["no_such_program".to_string()]);
        let err = load_sources(&opts).unwrap_err();
        assert!(err.contains("no_such_program.spl"));
    }

    #[test]
    fn test_multiple_files_concatenate() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.spl"), "var x 2").unwrap();
        fs::write(dir.path().join("b.spl"), ": main x @ ;").unwrap();
        let opts = CompilerOptions::new(vec![
            dir.path().join("a").to_string_lossy().to_string(),
            dir.path().join("b").to_string_lossy().to_string(),
        ]);
        let source = load_sources(&opts).unwrap();
        let text = compile_to_asm(&source, &opts).unwrap();
        assert!(text.contains("x       RMB     2"));
    }

    #[test]
    fn test_compile_files_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("prog.spl"), ": main 5 ;").unwrap();
        let mut opts = CompilerOptions::new(vec![dir
            .path()
            .join("prog.spl")
            .to_string_lossy()
            .to_string()]);
        opts.output_name = dir.path().join("prog").to_string_lossy().to_string();
        let written = compile_files(&opts).unwrap();
        assert!(written.ends_with("prog.s"));
        let text = fs::read_to_string(&written).unwrap();
        assert!(text.trim_end().ends_with("_end"));
    }

    #[test]
    fn test_function_address_capture_end_to_end() {
        let opts = CompilerOptions::new(vec![]);
        let text = compile_to_asm(": helper ; : main & helper execute ;", &opts);
        // execute is a library word; without its routine file the compose
        // step fails, so check the error names the missing routine instead
        let err = text.unwrap_err();
        assert!(err.contains("execute"), "{}", err);
    }

    #[test]
    fn test_library_closure_included_for_used_word_only() {
        let dir = tempfile::tempdir().unwrap();
        write_routines(dir.path(), &["cr"]);
        let opts = options_with_lib(dir.path());
        let text = compile_to_asm(": main cr ;", &opts).unwrap();
        assert!(text.contains("JSR     cr"));
        // nothing else concatenated
        assert_eq!(text.matches("\n RTS").count(), 1);
    }
}
