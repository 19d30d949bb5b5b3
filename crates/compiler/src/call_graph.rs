//! Function reachability
//!
//! `main` is the entry point; a function is compiled only when it is
//! reachable from `main` through function-name references. The body walk
//! iterates to a fixpoint, so a reference chain that runs forward through
//! the declaration order still marks every member, and reference cycles
//! terminate naturally because the set only grows.

use crate::ast::{Program, SymbolKind};
use std::collections::HashSet;

/// Compute the set of function names reachable from `main`.
///
/// `main` itself is always a member, whether or not it is defined; the
/// caller validates its existence separately.
pub fn reachable_functions(program: &Program) -> HashSet<String> {
    let mut reachable = HashSet::new();
    reachable.insert("main".to_string());

    loop {
        let mut changed = false;
        for func in &program.functions {
            if !reachable.contains(&func.name) {
                continue;
            }
            for token in &func.body {
                if program.kind_of(token) == Some(SymbolKind::Func)
                    && !reachable.contains(token)
                {
                    reachable.insert(token.clone());
                    changed = true;
                }
            }
        }
        if !changed {
            return reachable;
        }
    }
}
