//! Core-word intrinsics
//!
//! Each core word expands to a fixed instruction sequence operating on the
//! user argument stack in U; no subroutine is called and no library file
//! is pulled in. The leading `;;` comment states the stack effect. Word
//! cells are 16 bits; doubles occupy two cells with the least-significant
//! word pushed first, so `d@`/`d!` touch `0,Y` (high) and `2,Y` (low).
//!
//! The 6309-only instructions here (PULUW, LDQ, MULD, DIVQ, INCD, ...)
//! and TSTD via the convenience pragma keep the sequences short; the rest
//! of the pipeline never needs them.

use super::{CodeGen, CodeGenError};

impl CodeGen {
    pub(super) fn compile_core(&mut self, token: &str) -> Result<(), CodeGenError> {
        match token {
            // stack manipulation
            "drop" => {
                self.emit(";; DROP : ( a -- )", "", "");
                self.emit("", "LEAU", "2,U");
            }
            "2drop" => {
                self.emit(";; 2DROP : ( a b -- )", "", "");
                self.emit("", "LEAU", "4,U");
            }
            "dup" => {
                self.emit(";; DUP : ( a -- a a )", "", "");
                self.emit("", "LDD", "0,U");
                self.emit("", "PSHU", "D");
            }
            "2dup" => {
                self.emit(";; 2DUP : ( a b -- a b a b )", "", "");
                self.emit("", "LDD", "2,U");
                self.emit("", "PSHU", "D");
                self.emit("", "LDD", "2,U");
                self.emit("", "PSHU", "D");
            }
            "nip" => {
                self.emit(";; NIP : ( a b -- b )", "", "");
                self.emit("", "PULU", "D");
                self.emit("", "STD", "0,U");
            }
            "over" => {
                self.emit(";; OVER : ( a b -- a b a )", "", "");
                self.emit("", "LDD", "2,U");
                self.emit("", "PSHU", "D");
            }
            "rot" => {
                self.emit(";; ROT : ( a b c -- b c a )", "", "");
                self.emit("", "PULU", "D,Y");
                self.emit("", "PULUW", "");
                self.emit("", "PSHU", "D,Y");
                self.emit("", "PSHUW", "");
            }
            "swap" => {
                self.emit(";; SWAP : ( a b -- b a )", "", "");
                self.emit("", "PULU", "D,Y");
                self.emit("", "EXG", "D,Y");
                self.emit("", "PSHU", "D,Y");
            }
            "2swap" => {
                self.emit(";; 2SWAP : ( a b c d -- c d a b )", "", "");
                self.emit("", "LDQ", "0,U");
                self.emit("", "PSHS", "D");
                self.emit("", "PSHSW", "");
                self.emit("", "LDQ", "4,U");
                self.emit("", "STQ", "0,U");
                self.emit("", "PULSW", "");
                self.emit("", "PULS", "D");
                self.emit("", "STQ", "4,U");
            }

            // bitwise
            "b.and" => {
                self.emit(";; B.AND : ( a b -- a AND b )", "", "");
                self.emit("", "PULU", "D");
                self.emit("", "ANDD", "0,U");
                self.emit("", "STD", "0,U");
            }
            "b.or" => {
                self.emit(";; B.OR : ( a b -- a OR b )", "", "");
                self.emit("", "PULU", "D");
                self.emit("", "ORD", "0,U");
                self.emit("", "STD", "0,U");
            }
            "b.xor" => {
                self.emit(";; B.XOR : ( a b -- a XOR b )", "", "");
                self.emit("", "PULU", "D");
                self.emit("", "EORD", "0,U");
                self.emit("", "STD", "0,U");
            }
            "~" => {
                self.emit(";; COMP (~) : ( a -- NOT a )", "", "");
                self.emit("", "LDD", "0,U");
                self.emit("", "EORD", "#$FFFF");
                self.emit("", "STD", "0,U");
            }

            // arithmetic
            "+" => {
                self.emit(";; ADD (+) : ( a b -- a+b )", "", "");
                self.emit("", "PULU", "D");
                self.emit("", "ADDD", "0,U");
                self.emit("", "STD", "0,U");
            }
            "-" => {
                self.emit(";; SUB (-) : ( a b -- a-b )", "", "");
                self.emit("", "PULU", "D");
                self.emit("", "SUBD", "0,U");
                self.emit("", "STD", "0,U");
            }
            "1+" => {
                self.emit(";; PLUS1 (1+) : ( a -- a+1 )", "", "");
                self.emit("", "LDD", "0,U");
                self.emit("", "ADDD", "#1");
                self.emit("", "STD", "0,U");
            }
            "2+" => {
                self.emit(";; PLUS2 (2+) : ( a -- a+2 )", "", "");
                self.emit("", "LDD", "0,U");
                self.emit("", "ADDD", "#2");
                self.emit("", "STD", "0,U");
            }
            "1-" => {
                self.emit(";; MINUS1 (1-) : ( a -- a-1 )", "", "");
                self.emit("", "LDD", "0,U");
                self.emit("", "SUBD", "#1");
                self.emit("", "STD", "0,U");
            }
            "2-" => {
                self.emit(";; MINUS2 (2-) : ( a -- a-2 )", "", "");
                self.emit("", "LDD", "0,U");
                self.emit("", "SUBD", "#2");
                self.emit("", "STD", "0,U");
            }
            "*" => {
                self.emit(";; MULT16 (*) : ( a b -- a*b )", "", "");
                self.emit("", "PULU", "D");
                self.emit("", "MULD", "0,U");
                self.emit("", "STW", "0,U");
            }
            "/" => {
                self.emit(";; DIV16 (/) : ( a b -- a/b )", "", "");
                self.emit("", "PULUW", "");
                self.emit("", "CLRD", "");
                self.emit("", "DIVQ", "0,U");
                self.emit("", "STW", "2,U");
            }
            "mod" => {
                self.emit(";; MOD16 (mod) : ( a b -- a%b )", "", "");
                self.emit("", "PULUW", "");
                self.emit("", "CLRD", "");
                self.emit("", "DIVQ", "0,U");
                self.emit("", "STD", "2,U");
            }
            "negate" => {
                self.emit(";; NEGATE : ( a -- -a )", "", "");
                self.emit("", "LDD", "#0");
                self.emit("", "SUBD", "0,U");
                self.emit("", "STD", "0,U");
            }

            // memory access
            "!" => {
                self.emit(";; STORE (!) : ( a b -- ) store word a at addr b", "", "");
                self.emit("", "PULU", "Y");
                self.emit("", "PULU", "D");
                self.emit("", "STD", "0,Y");
            }
            "c!" => {
                self.emit(";; CSTORE (c!) : ( a b -- ) store byte a at addr b", "", "");
                self.emit("", "PULU", "Y");
                self.emit("", "PULU", "D");
                self.emit("", "STB", "0,Y");
            }
            "d!" => {
                self.emit(";; DSTORE (d!) : ( a b c -- ) store dword a:b at addr c", "", "");
                self.emit("", "PULU", "Y");
                self.emit("", "PULU", "D");
                self.emit("", "STD", "0,Y");
                self.emit("", "PULU", "D");
                self.emit("", "STD", "2,Y");
            }
            "@" => {
                self.emit(";; FETCH (@) : ( a -- b ) read word b from addr a", "", "");
                self.emit("", "PULU", "Y");
                self.emit("", "LDD", "0,Y");
                self.emit("", "PSHU", "D");
            }
            "c@" => {
                self.emit(";; CFETCH (c@) : ( a -- b ) read word b from byte at addr a", "", "");
                self.emit("", "PULU", "Y");
                self.emit("", "LDB", "0,Y");
                self.emit("", "CLRA", "");
                self.emit("", "PSHU", "D");
            }
            "d@" => {
                self.emit(";; DFETCH (d@) : ( a -- b c ) read dword b:c from addr a", "", "");
                self.emit("", "PULU", "Y");
                self.emit("", "LDD", "2,Y");
                self.emit("", "PSHU", "D");
                self.emit("", "LDD", "0,Y");
                self.emit("", "PSHU", "D");
            }
            "+!" => {
                self.emit(";; ADDSTORE (+!) : ( a b -- ) add word b to word at addr a", "", "");
                self.emit("", "PULU", "D");
                self.emit("", "PULU", "Y");
                self.emit("", "ADDD", "0,Y");
                self.emit("", "STD", "0,Y");
            }
            "++" => {
                self.emit(";; INCADDR (++) : ( a -- ) increment word at addr a", "", "");
                self.emit("", "PULU", "Y");
                self.emit("", "LDD", "0,Y");
                self.emit("", "INCD", "");
                self.emit("", "STD", "0,Y");
            }
            "c++" => {
                self.emit(";; INCCADDR (c++) : ( a -- ) increment byte at addr a", "", "");
                self.emit("", "PULU", "Y");
                self.emit("", "INC", "0,Y");
            }
            "--" => {
                self.emit(";; DECADDR (--) : ( a -- ) decrement word at addr a", "", "");
                self.emit("", "PULU", "Y");
                self.emit("", "LDD", "0,Y");
                self.emit("", "DECD", "");
                self.emit("", "STD", "0,Y");
            }
            "c--" => {
                self.emit(";; DECCADDR (c--) : ( a -- ) decrement byte at addr a", "", "");
                self.emit("", "PULU", "Y");
                self.emit("", "DEC", "0,Y");
            }

            // register transfers through the scratch-pad save slots
            ">x" => self.register_transfer_in("TO_XREG", ">x", "xreg"),
            "x>" => self.register_transfer_out("FROM_XREG", "x>", "xreg"),
            ">y" => self.register_transfer_in("TO_YREG", ">y", "yreg"),
            "y>" => self.register_transfer_out("FROM_YREG", "y>", "yreg"),
            ">d" => self.register_transfer_in("TO_DREG", ">d", "dreg"),
            "d>" => self.register_transfer_out("FROM_DREG", "d>", "dreg"),
            ">u" => self.register_transfer_in("TO_UREG", ">u", "ureg"),
            "u>" => self.register_transfer_out("FROM_UREG", "u>", "ureg"),

            _ => return Err(self.err("Unimplemented core word")),
        }
        Ok(())
    }

    /// `>x` and friends: pop the top of stack into a register save slot.
    fn register_transfer_in(&mut self, tag: &str, word: &str, slot: &str) {
        self.emit(
            &format!(";; {} ({}) : ( a -- ) pop TOS into {} storage", tag, word, slot.to_uppercase()),
            "",
            "",
        );
        self.emit("", "PULU", "D");
        self.emit("", "STD", slot);
    }

    /// `x>` and friends: push a register save slot onto the stack.
    fn register_transfer_out(&mut self, tag: &str, word: &str, slot: &str) {
        self.emit(
            &format!(";; {} ({}) : ( -- a ) place {} storage onto TOS", tag, word, slot.to_uppercase()),
            "",
            "",
        );
        self.emit("", "LDD", slot);
        self.emit("", "PSHU", "D");
    }
}
