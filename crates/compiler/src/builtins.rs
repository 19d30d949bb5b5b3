//! Built-in words: keywords, core words, and the runtime library tables
//!
//! Three flavors of built-in exist. *Keywords* steer control-flow emission.
//! *Core words* expand to fixed inline instruction sequences. *Library
//! words* compile to a `JSR` against a routine loaded from an external
//! assembly source file; [`library_label`] maps the SPL word to its
//! assembler label, and [`routine_dependencies`] lists the other routines
//! each one calls so that only the needed files are concatenated into the
//! output.

use crate::ast::{Program, SymbolKind};
use std::collections::{HashMap, HashSet};

/// Control-flow keywords, compiled by the code generator's keyword table.
pub const KEYWORDS: [&str; 14] = [
    "{", "}", "if", "0if", "else", "then", "break", "cont", "?break", "?cont", "?0break",
    "?0cont", "&", "return",
];

/// Core words, expanded inline with no subroutine call.
pub const CORE_WORDS: [&str; 42] = [
    // stack manipulation
    "drop", "2drop", "dup", "2dup", "nip", "over", "rot", "swap", "2swap",
    // bitwise
    "b.and", "b.or", "b.xor", "~",
    // arithmetic
    "+", "-", "1+", "2+", "1-", "2-", "*", "/", "mod", "negate",
    // memory access
    "!", "c!", "d!", "@", "c@", "d@", "+!", "++", "c++", "--", "c--",
    // register transfers
    ">x", "x>", ">y", "y>", ">d", "d>", ">u", "u>",
];

/// Pre-register keywords and core words in a symbol table.
pub fn register_builtins(symbols: &mut HashMap<String, SymbolKind>) {
    for kwd in KEYWORDS {
        symbols.insert(kwd.to_string(), SymbolKind::Keyword);
    }
    for word in CORE_WORDS {
        symbols.insert(word.to_string(), SymbolKind::Core);
    }
}

/// Map an SPL library word to the assembler label of its routine.
///
/// The label doubles as the file name the emitter reads: `<libdir>/<label>.s`.
/// `/`, `d>`, and `u>` are core words and deliberately absent here.
pub fn library_label(word: &str) -> Option<&'static str> {
    let label = match word {
        ">a" => "toareg",
        "a>" => "fromareg",
        "a!" => "storeinda",
        "a@" => "fetchinda",
        "a@+" => "fetchindainc",
        "a@-" => "fetchindadec",
        "a!+" => "storeindainc",
        ">b" => "tobreg",
        "b>" => "frombreg",
        "b!" => "storeindb",
        "b@" => "fetchindb",
        "b@+" => "fetchindbinc",
        "b@-" => "fetchindbdec",
        "b!+" => "storeindbinc",
        "0trim" => "0trim",
        "abs" => "abs",
        "accept" => "accept",
        "&." => "ampdot",
        "areg" => "areg",
        ">outbuf" => "tooutbuf",
        "bclr" => "bclr",
        "bset" => "bset",
        "btest" => "btest",
        "bye" => "bye",
        "call" => "call",
        "cmove" => "cmove",
        "cmove>" => "cmoveb",
        "count" => "count",
        "cr" => "cr",
        "dabs" => "dabs",
        "date" => "date",
        "d+" => "dadd",
        "d/" => "ddivide",
        "d/mod" => "ddivmod",
        "depth" => "depth",
        "d=" => "deq",
        "d>=" => "dge",
        "disp" => "disp",
        "d<=" => "dle",
        "d<" => "dlt",
        "dmod" => "dmod",
        "d*" => "dmult",
        "dnegate" => "dnegate",
        "d<>" => "dne",
        "dnumber" => "dnumber",
        "d.$" => "dprhex",
        "d." => "dprint",
        "dsqrt" => "dsqrt",
        "d-" => "dsub",
        "du." => "duprint",
        "emit" => "emit",
        "end@" => "fetchend",
        "exit" => "exit",
        "erase" => "erase",
        "=" => "eq",
        "execute" => "execute",
        "fclose" => "fclose",
        "fdestroy" => "fdestroy",
        "feof" => "feof",
        "fflush" => "fflush",
        "finfo@" => "get_file_info",
        "finfo!" => "set_file_info",
        "fgetc" => "fgetc",
        "fill" => "fill",
        "fopen" => "fopen",
        "fputc" => "fputc",
        "fread" => "fread",
        "fseek" => "fseek",
        "fwrite" => "fwrite",
        "fcreate" => "fcreate",
        "ftell" => "ftell",
        "getcwd" => "getcwd",
        ">=" => "ge",
        ">" => "gt",
        "input" => "input_s",
        "keyp" => "keyp",
        "key" => "key",
        "<=" => "le",
        "<" => "lt",
        "<>" => "ne",
        "not" => "not",
        "number" => "number",
        "pad" => "pad",
        ".2$" => "prhex2",
        ".$" => "prhex",
        "." => "print",
        "quit" => "quit",
        "read_block" => "read_block",
        "rename" => "rename",
        "reset" => "reset",
        ">r" => "to_r",
        "r>" => "from_r",
        "r@" => "r_fetch",
        "setcwd" => "setcwd",
        "space" => "space",
        "sp@" => "spfetch",
        "strcmp" => "strcmp",
        "strcpy" => "strcpy",
        "strlen" => "strlen",
        "strmatch" => "strmatch",
        "strpos" => "strpos",
        "time" => "time",
        "type" => "type",
        "uncount" => "uncount",
        "u/" => "udiv",
        "u<" => "ult",
        "umod" => "umod",
        "u*" => "umult",
        "u." => "uprint",
        "<<" => "ushiftl",
        ">>" => "ushiftr",
        "><" => "swapcell",
        "within" => "within",
        "write_block" => "write_block",
        "xreg" => "xreg",
        "yreg" => "yreg",
        _ => return None,
    };
    Some(label)
}

/// Routines each library routine calls. Routines without an entry call
/// nothing. The table may be cyclic; closure walks use a visited set.
pub fn routine_dependencies(label: &str) -> &'static [&'static str] {
    match label {
        "abs" => &["get_ab", "comp_tb"],
        "addstore" => &["get_ab"],
        "ampdot" => &["get_ta", "get_op1"],
        "and" => &["get_ab", "push"],
        "booland" => &["get_ab", "push"],
        "fetch" => &["get_ta", "push"],
        "dfetch" => &["get_ta", "push"],
        "cfetch" => &["get_ta", "push"],
        "b_and" => &["get_tb", "pop", "push"],
        "bclr" => &["get_ab", "push"],
        "b_or" => &["get_tb", "push"],
        "bset" => &["get_ab", "push"],
        "btest" => &["get_ab", "push"],
        "btoa" => &["ptrout"],
        "b_xor" => &["get_tb", "pop", "push"],
        "ch" => &["pop"],
        "cmove" => &["get_ta", "get_tb"],
        "cmoveb" => &["get_ta", "get_op1"],
        "comp" => &["pop", "push"],
        "count" => &["get_tb", "push", "plus1"],
        "ctoggle" => &["pop", "get_ta"],
        "cv" => &["pop"],
        "dabs" => &["get_op1", "push_op1"],
        "dadd" => &["get_ops", "push_res"],
        "date" => &["push"],
        "ddivide" => &["ddiv", "push"],
        "ddivmod" => &["ddiv", "push"],
        "ddiv" => &["get_ops", "d32", "neg"],
        "d_eq" => &["zerores"],
        "deq" => &["get_ops", "d_eq", "push"],
        "d_ge" => &["d_eq", "d_gt"],
        "dge" => &["get_ops", "d_ge", "push"],
        "d_gt" => &["d_sub", "iszero", "zerores"],
        "dgt" => &["get_ops", "d_gt", "push"],
        "disp" => &["get_ta", "chout", "udiv16", "push"],
        "div" => &["get_ta", "comp_ta", "comp_tb", "udiv16", "push"],
        "d_le" => &["d_eq", "d_lt"],
        "dle" => &["get_ops", "d_le", "push"],
        "d_lt" => &["d_sub", "zerores"],
        "dlt" => &["get_ops", "d_lt", "push"],
        "dmod" => &["ddiv", "push"],
        "dmult" => &["get_ops", "neg", "m32", "push_res"],
        "dnegate" => &["get_op1", "neg", "op1res", "push_res"],
        "d_ne" => &["d_eq"],
        "dne" => &["get_ops", "d_ne", "push"],
        "decaddr" => &["get_ta"],
        "deccaddr" => &["pop"],
        "dnumber" => &["pop", "neg", "push"],
        "dprhex" => &["get_op1", "cprhex"],
        "dprint" => &["get_op2", "chout", "neg", "btod", "pntres"],
        "drop2" => &["pop"],
        "drop" => &["pop"],
        "d_sqrt" => &["d_sub"],
        "dsqrt" => &["get_op1", "d_sqrt", "push_res"],
        "dsub" => &["get_ops", "d_sub", "push_res"],
        "dtos" => &["pop"],
        "dup2" => &["push"],
        "duprint" => &["get_op2", "btod", "pntres"],
        "dup" => &["push"],
        "emit" => &["pop", "chout"],
        "eq" => &["get_ab", "push"],
        "execute" => &["pop"],
        "erase" => &["pop", "get_ab"],
        "fill" => &["pop", "get_ab"],
        "fclose" => &["pop", "push"],
        "fcreate" => &["pop", "push"],
        "fdestroy" => &["pop", "push"],
        "feof" => &["pop", "push"],
        "fetchend" => &["push"],
        "fetchinda" => &["push"],
        "fetchindadec" => &["push"],
        "fetchindainc" => &["push"],
        "fetchindb" => &["push"],
        "fetchindbdec" => &["push"],
        "fetchindbinc" => &["push"],
        "fflush" => &["pop", "push"],
        "fgetc" => &["pop", "push"],
        "fread" => &["pop", "push"],
        "fopen" => &["pop", "push", "pdos_addr"],
        "fputc" => &["pop", "push"],
        "fseek" => &["pop", "push"],
        "ftell" => &["pop", "push"],
        "fwrite" => &["pop", "push"],
        "ge" => &["get_ab", "csub", "push"],
        "get_ab" => &["get_tb", "get_ta"],
        "get_op1" => &["pop"],
        "get_op2" => &["pop"],
        "get_ops" => &["get_op2", "get_op1"],
        "get_ta" => &["pop"],
        "get_tb" => &["pop"],
        "get_file_info" => &["pop", "push"],
        "getcwd" => &["pop", "push"],
        "gt" => &["get_ab", "csub", "push"],
        "incaddr" => &["get_ta"],
        "inccaddr" => &["pop"],
        "input_s" => &["push"],
        "keyp" => &["rdykey", "push"],
        "key" => &["rdkey", "push"],
        "le" => &["get_ab", "csub", "push"],
        "lt" => &["get_ab", "csub", "push"],
        "m32" => &["zerores"],
        "minus1" => &["pop", "push"],
        "minus2" => &["pop", "push"],
        "mod" => &["get_ab", "comp_ta", "comp_tb", "udiv16", "push"],
        "mult" => &["get_ab", "comp_ta", "comp_tb", "umult16", "push"],
        "negate" => &["get_ta", "comp_ta", "push"],
        "neg" => &["add1"],
        "ne" => &["get_ab", "push"],
        "nip" => &["get_ta", "pop", "push"],
        "not" => &["get_ta", "push"],
        "n_str" => &["ptrout", "comp_ta", "u_str"],
        "number" => &["comp_ta", "push"],
        "or" => &["get_ab", "push"],
        "pntres" => &["chout"],
        "pos" => &["pop"],
        "prbuf" => &["chout"],
        "prhex2" => &["pop", "cprhex"],
        "prhex" => &["pop", "cprhex"],
        "primm" => &["chout"],
        "print" => &["n_str", "prbuf"],
        "push_op1" => &["push"],
        "push_op2" => &["push"],
        "push_rem" => &["push"],
        "push_res" => &["push"],
        "read_block" => &["pop", "push"],
        "rename" => &["pop", "push"],
        "rot" => &["get_ta", "get_tb", "pop", "push"],
        "setcwd" => &["pop", "push"],
        "space" => &["chout"],
        "set_file_info" => &["pop", "push"],
        "spfetch" => &["push"],
        "stod" => &["push"],
        "strcmp" => &["get_ab", "push"],
        "strcpy" => &["get_ab"],
        "strlen" => &["get_ta", "push"],
        "strmatch" => &["get_ab", "push"],
        "strpos" => &["get_ab", "push"],
        "sub" => &["get_ab", "csub", "push"],
        "swap2" => &["get_ta", "get_tb", "pop", "push"],
        "swap" => &["get_ta", "get_tb", "push"],
        "time" => &["push"],
        "to_r" => &["pop"],
        "type" => &["get_ta", "get_tb", "chout", "udiv16", "push"],
        "from_r" => &["push"],
        "r_fetch" => &["to_r", "from_r", "dup"],
        "tooutbuf" => &["u_str"],
        "store16" => &["get_ta", "pop"],
        "store32" => &["get_ta", "pop"],
        "store8" => &["get_ta", "pop"],
        "udiv" => &["get_ab", "udiv16", "push"],
        "ugt" => &["get_ab", "push"],
        "ult" => &["get_ab", "push"],
        "umod" => &["get_ab", "udiv16", "push"],
        "umult" => &["get_ab", "umult16", "push"],
        "uncount" => &["pop", "push"],
        "uprint" => &["u_str", "prbuf"],
        "ushiftl" => &["pop", "push"],
        "ushiftr" => &["pop", "push"],
        "u_str" => &["get_ta", "btoa"],
        "within" => &["over", "to_r", "from_r", "ult"],
        "write_block" => &["pop", "push"],
        "xor" => &["get_ab", "push"],
        "xreg" => &["pop"],
        "yreg" => &["pop"],
        _ => &[],
    }
}

/// Library usage of a program: the SPL words referenced by reachable
/// functions, and the closed, deduplicated set of routine labels whose
/// source files must be concatenated into the output.
#[derive(Debug, Default)]
pub struct LibrarySet {
    /// Words in first-use order.
    pub words: Vec<String>,
    /// Routine labels: directly used routines first, then their transitive
    /// dependencies in discovery order. Each label appears exactly once.
    pub routines: Vec<String>,
}

/// Collect library words from reachable function bodies and close over the
/// dependency table. Marks each used word with kind `Lib` in the symbol
/// table. A user declaration shadows a library word of the same name.
pub fn resolve_library_words(program: &mut Program, reachable: &HashSet<String>) -> LibrarySet {
    let mut set = LibrarySet::default();

    for func in &program.functions {
        if !reachable.contains(&func.name) {
            continue;
        }
        for token in &func.body {
            if library_label(token).is_none() || program.symbols.contains_key(token) {
                continue;
            }
            if !set.words.contains(token) {
                set.words.push(token.clone());
            }
        }
    }
    for word in &set.words {
        program.symbols.insert(word.clone(), SymbolKind::Lib);
    }

    let mut seen: HashSet<String> = HashSet::new();
    for word in &set.words {
        let label = library_label(word).unwrap_or_default();
        if seen.insert(label.to_string()) {
            set.routines.push(label.to_string());
        }
    }
    let direct: Vec<String> = set.routines.clone();
    for label in &direct {
        close_dependencies(label, &mut seen, &mut set.routines);
    }

    set
}

fn close_dependencies(label: &str, seen: &mut HashSet<String>, out: &mut Vec<String>) {
    for dep in routine_dependencies(label) {
        if seen.insert((*dep).to_string()) {
            out.push((*dep).to_string());
            close_dependencies(dep, seen, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Function;

    fn program_with_main(body: &[&str]) -> Program {
        let mut p = Program::new();
        p.declare("main", SymbolKind::Func).unwrap();
        p.functions.push(Function {
            name: "main".to_string(),
            body: body.iter().map(|s| s.to_string()).collect(),
        });
        p
    }

    fn main_only() -> HashSet<String> {
        let mut set = HashSet::new();
        set.insert("main".to_string());
        set
    }

    #[test]
    fn test_core_words_are_not_library_words() {
        // these compile inline; mapping them to routines would shadow them
        for word in CORE_WORDS {
            assert!(library_label(word).is_none(), "{} must stay core", word);
        }
    }

    #[test]
    fn test_library_label_lookups() {
        assert_eq!(library_label("."), Some("print"));
        assert_eq!(library_label("u."), Some("uprint"));
        assert_eq!(library_label("input"), Some("input_s"));
        assert_eq!(library_label("finfo@"), Some("get_file_info"));
        assert_eq!(library_label("no_such_word"), None);
    }

    #[test]
    fn test_dependency_closure_of_print() {
        let mut p = program_with_main(&["."]);
        let set = resolve_library_words(&mut p, &main_only());
        assert_eq!(set.words, ["."]);
        // print -> n_str, prbuf; n_str -> ptrout, comp_ta, u_str;
        // u_str -> get_ta, btoa; btoa -> ptrout (already seen);
        // prbuf -> chout; get_ta -> pop
        assert_eq!(set.routines[0], "print");
        for routine in ["n_str", "prbuf", "ptrout", "comp_ta", "u_str", "get_ta", "btoa", "chout", "pop"] {
            assert!(set.routines.contains(&routine.to_string()), "missing {}", routine);
        }
        // exactly once each
        let mut sorted = set.routines.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), set.routines.len());
    }

    #[test]
    fn test_cyclic_dependencies_terminate() {
        // r_fetch -> to_r, from_r, dup; dup -> push; no infinite walk even
        // with shared entries across several words
        let mut p = program_with_main(&["r@", ">r", "r>"]);
        let set = resolve_library_words(&mut p, &main_only());
        assert!(set.routines.contains(&"r_fetch".to_string()));
        assert!(set.routines.contains(&"push".to_string()));
        let mut sorted = set.routines.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), set.routines.len());
    }

    #[test]
    fn test_words_marked_lib_in_symbol_table() {
        let mut p = program_with_main(&["emit", "cr"]);
        resolve_library_words(&mut p, &main_only());
        assert_eq!(p.kind_of("emit"), Some(SymbolKind::Lib));
        assert_eq!(p.kind_of("cr"), Some(SymbolKind::Lib));
    }

    #[test]
    fn test_unreachable_functions_contribute_nothing() {
        let mut p = program_with_main(&[]);
        p.declare("dead", SymbolKind::Func).unwrap();
        p.functions.push(Function {
            name: "dead".to_string(),
            body: vec![".".to_string()],
        });
        let set = resolve_library_words(&mut p, &main_only());
        assert!(set.words.is_empty());
        assert!(set.routines.is_empty());
    }

    #[test]
    fn test_user_declaration_shadows_library_word() {
        let mut p = program_with_main(&["abs"]);
        p.declare("abs", SymbolKind::Var).unwrap();
        let set = resolve_library_words(&mut p, &main_only());
        assert!(set.words.is_empty());
        assert_eq!(p.kind_of("abs"), Some(SymbolKind::Var));
    }

    #[test]
    fn test_first_use_order_preserved() {
        let mut p = program_with_main(&["cr", "emit", "cr", "space"]);
        let set = resolve_library_words(&mut p, &main_only());
        assert_eq!(set.words, ["cr", "emit", "space"]);
        assert_eq!(&set.routines[..3], ["cr", "emit", "space"]);
    }
}
