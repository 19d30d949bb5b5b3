//! Compiler configuration and target memory layout
//!
//! Collects everything that steers a compilation session: output naming,
//! the three layout addresses (code origin, top of variables, user stack
//! base), the diagnostic switches, and the search paths that may be
//! overridden from the environment.

use std::path::PathBuf;

/// Default code origin in RAM.
pub const DEFAULT_ORIGIN: u32 = 0x4000;

/// Fixed alternative origin selected by the `--sys` option.
pub const SYS_ORIGIN: u32 = 0x2000;

/// Default top of the variable region; variables grow down from here.
pub const DEFAULT_VAR_TOP: u32 = 0xFF8F;

/// Base of the intrinsic scratch-pad region. The user stack also defaults
/// to this address and grows downward, away from the scratch slots.
pub const SCRATCH_BASE: u32 = 0x8000;

/// Bytes reserved for the scratch-pad slots (operands, result, remainder,
/// register save area, I/O buffers).
pub const SCRATCH_SIZE: u32 = 256;

/// Named scratch-pad equates in emission order. `stack` is the user stack
/// base; the remaining slots are fixed offsets from [`SCRATCH_BASE`].
pub fn scratch_equates(stack_base: u32) -> Vec<(&'static str, u32)> {
    vec![
        ("stack", stack_base),
        ("op1", SCRATCH_BASE),
        ("op2", SCRATCH_BASE + 4),
        ("res", SCRATCH_BASE + 8),
        ("rem", SCRATCH_BASE + 16),
        ("tmp", SCRATCH_BASE + 20),
        ("sign", SCRATCH_BASE + 24),
        ("dreg", SCRATCH_BASE + 26),
        ("wreg", SCRATCH_BASE + 28),
        ("xreg", SCRATCH_BASE + 30),
        ("yreg", SCRATCH_BASE + 32),
        ("ureg", SCRATCH_BASE + 34),
        ("outbuf", SCRATCH_BASE + 36),
        ("inbuf", SCRATCH_BASE + 52),
    ]
}

/// External tool and file search paths, overridable via the environment.
#[derive(Debug, Clone)]
pub struct SearchPaths {
    /// Assembler command for the post-assembly stages (`SPL_LWASM_PATH`
    /// names the directory holding `lwasm`).
    pub lwasm: PathBuf,
    /// Library routine directory (`SPL_LIB_PATH`).
    pub lib_dir: PathBuf,
    /// Source include directory (`SPL_INCLUDE_PATH`).
    pub include_dir: PathBuf,
}

impl SearchPaths {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build paths from an arbitrary lookup, falling back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lwasm = match lookup("SPL_LWASM_PATH") {
            Some(dir) => PathBuf::from(dir).join("lwasm"),
            None => PathBuf::from("lwasm"),
        };
        SearchPaths {
            lwasm,
            lib_dir: PathBuf::from(lookup("SPL_LIB_PATH").unwrap_or_else(|| "lib/".to_string())),
            include_dir: PathBuf::from(
                lookup("SPL_INCLUDE_PATH").unwrap_or_else(|| "include/".to_string()),
            ),
        }
    }
}

impl Default for SearchPaths {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// Options for one compilation session.
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Source files in command-line order.
    pub files: Vec<String>,
    /// Base name of the output file, no extension.
    pub output_name: String,
    /// Requested output format. Only `asm` is produced here; other types
    /// are handed to the external toolchain.
    pub output_type: String,
    /// Code origin override. Wins over an `org` statement when set.
    pub origin: Option<u32>,
    pub var_top: u32,
    pub stack_base: u32,
    /// Force the fixed system origin.
    pub sys: bool,
    pub warn: bool,
    /// Interleave commentary into the emitted assembly.
    pub verbose: bool,
    /// Trace compilation stages on stderr.
    pub debug: bool,
    pub paths: SearchPaths,
}

impl CompilerOptions {
    pub fn new(files: Vec<String>) -> Self {
        CompilerOptions {
            files,
            output_name: "out".to_string(),
            output_type: "asm".to_string(),
            origin: None,
            var_top: DEFAULT_VAR_TOP,
            stack_base: SCRATCH_BASE,
            sys: false,
            warn: false,
            verbose: false,
            debug: false,
            paths: SearchPaths::default(),
        }
    }
}
