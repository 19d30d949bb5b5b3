//! Control-flow keyword emission
//!
//! Loops (`{ ... }`) and conditionals (`if`/`0if`/`else`/`then`) are
//! compiled with two parallel stacks. A loop frame records the continue
//! and break targets; a compare frame records the else target, the end
//! target, and whether an `else` has been seen (which decides what `then`
//! must emit). Conditions test the popped top of the user stack against
//! zero; TSTD requires the assembler's 6809 convenience pragma.

use super::{CodeGen, CodeGenError, CompareFrame, LoopFrame};

impl CodeGen {
    pub(super) fn compile_keyword(&mut self, token: &str) -> Result<(), CodeGenError> {
        match token {
            "{" => self.compile_loop_begin(),
            "}" => self.compile_loop_end()?,
            "if" => self.compile_if(false),
            "0if" => self.compile_if(true),
            "else" => self.compile_else()?,
            "then" => self.compile_then()?,
            "break" => self.compile_branch_to_loop(true)?,
            "cont" => self.compile_branch_to_loop(false)?,
            "?break" => self.compile_cond_branch("break", "BEQ", true)?,
            "?cont" => self.compile_cond_branch("ifcont", "BEQ", false)?,
            "?0break" => self.compile_cond_branch("notifbreak", "BNE", true)?,
            "?0cont" => self.compile_cond_branch("notifcont", "BNE", false)?,
            "return" => self.emit("", "RTS", ""),
            "&" => self.function_address = true,
            _ => return Err(self.err("Unknown keyword")),
        }
        Ok(())
    }

    /// `{` — emit the continue label and open a loop frame.
    fn compile_loop_begin(&mut self) {
        let continue_label = self.next_label("loop");
        self.emit(&continue_label, "", "");
        let break_label = self.next_label("loop2");
        self.loop_stack.push(LoopFrame {
            continue_label,
            break_label,
        });
    }

    /// `}` — branch back to the continue label, then place the break
    /// label just past the loop.
    fn compile_loop_end(&mut self) -> Result<(), CodeGenError> {
        let frame = self
            .loop_stack
            .pop()
            .ok_or_else(|| self.err("Loop underflow!"))?;
        self.emit("", "JMP", &frame.continue_label);
        self.emit(&frame.break_label, "", "");
        Ok(())
    }

    /// `if` / `0if` — pop and test the top of stack. A short branch pair
    /// dispatches to the then arm or a long jump to the else target, so
    /// arms of any length assemble.
    fn compile_if(&mut self, inverted: bool) {
        let else_label = self.next_label("else");
        let then_label = self.next_label("then");
        let test_label = self.next_label("t");
        let end_label = self.next_label("tend");
        self.compare_stack.push(CompareFrame {
            else_label: else_label.clone(),
            end_label,
            else_seen: false,
        });

        let (skip, take) = if inverted { ("BNE", "BEQ") } else { ("BEQ", "BNE") };
        self.emit("", "PULU", "D");
        self.emit("", "TSTD", "");
        self.emit("", skip, &test_label);
        self.emit("", take, &then_label);
        self.emit(&test_label, "JMP", &else_label);
        self.emit(&then_label, "", "");
    }

    /// `else` — jump past the else arm, then place the else label.
    fn compile_else(&mut self) -> Result<(), CodeGenError> {
        let Some(frame) = self.compare_stack.last_mut() else {
            return Err(self.err("Compare underflow!"));
        };
        frame.else_seen = true;
        let jump_target = frame.end_label.clone();
        let else_label = frame.else_label.clone();
        self.emit("", "JMP", &jump_target);
        self.emit(&else_label, "", "");
        Ok(())
    }

    /// `then` — close the conditional: place the else label when no
    /// `else` intervened, the end label otherwise.
    fn compile_then(&mut self) -> Result<(), CodeGenError> {
        let frame = self
            .compare_stack
            .pop()
            .ok_or_else(|| self.err("Compare underflow!"))?;
        if frame.else_seen {
            self.emit(&frame.end_label, "", "");
        } else {
            self.emit(&frame.else_label, "", "");
        }
        Ok(())
    }

    /// `break` / `cont` — unconditional jump to the innermost loop's
    /// break or continue target.
    fn compile_branch_to_loop(&mut self, to_break: bool) -> Result<(), CodeGenError> {
        let frame = self
            .loop_stack
            .last()
            .ok_or_else(|| self.err("Loop underflow!"))?;
        let target = if to_break {
            frame.break_label.clone()
        } else {
            frame.continue_label.clone()
        };
        self.emit("", "JMP", &target);
        Ok(())
    }

    /// `?break` / `?cont` / `?0break` / `?0cont` — pop and test the top
    /// of stack, skipping the jump when the test fails.
    fn compile_cond_branch(
        &mut self,
        label_name: &str,
        skip_op: &str,
        to_break: bool,
    ) -> Result<(), CodeGenError> {
        let frame = self
            .loop_stack
            .last()
            .ok_or_else(|| self.err("Loop underflow!"))?;
        let target = if to_break {
            frame.break_label.clone()
        } else {
            frame.continue_label.clone()
        };
        let skip_label = self.next_label(label_name);
        self.emit("", "PULU", "D");
        self.emit("", "TSTD", "");
        self.emit("", skip_op, &skip_label);
        self.emit("", "JMP", &target);
        self.emit(&skip_label, "", "");
        Ok(())
    }
}
