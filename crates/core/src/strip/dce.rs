//! Dead code elimination: unreferenced bindings, `pass` and empty blocks.

use std::collections::{BTreeMap, BTreeSet};

use crate::grammar::ast::{ExprKind, Module, Stmt, StmtKind};

use super::build::negate;

/// Run elimination passes until nothing changes.
pub(super) fn eliminate(module: Module) -> Option<Module> {
    let mut module = module;
    let mut passes = 0usize;
    loop {
        passes += 1;
        let (next, changed) = DeadCodePass::run(&module);
        match next {
            Some(next) if changed => module = next,
            Some(next) => {
                log::trace!("dead code elimination settled after {passes} pass(es)");
                return Some(next);
            }
            None => return None,
        }
    }
}

/// Whether a single elimination pass would change `module`.
pub(super) fn has_dead_code(module: &Module) -> bool {
    DeadCodePass::run(module).1
}

struct DeadCodePass {
    unreferenced: BTreeSet<String>,
    changed: bool,
}

impl DeadCodePass {
    fn run(module: &Module) -> (Option<Module>, bool) {
        let mut pass = Self {
            unreferenced: unreferenced_variables(module),
            changed: false,
        };
        let body = pass.strip_body(&module.body);
        (body.map(|body| Module { body }), pass.changed)
    }

    fn strip_body(&mut self, body: &[Stmt]) -> Option<Vec<Stmt>> {
        let mut out = Vec::with_capacity(body.len());
        for stmt in body {
            match self.strip_stmt(stmt) {
                Some(s) => out.push(s),
                None => self.changed = true,
            }
        }
        if out.is_empty() {
            return None;
        }
        if out.iter().all(Stmt::is_comment) {
            self.changed = true;
            return None;
        }
        Some(out)
    }

    fn strip_stmt(&mut self, stmt: &Stmt) -> Option<Stmt> {
        match &stmt.kind {
            StmtKind::Assign { targets, .. } => {
                let unused = match targets.as_slice() {
                    [target] => target
                        .as_name()
                        .is_some_and(|name| self.unreferenced.contains(name)),
                    _ => false,
                };
                if unused {
                    log::trace!("removing unreferenced assignment at line {}", stmt.pos.line);
                    None
                } else {
                    Some(stmt.clone())
                }
            }
            StmtKind::Pass => None,
            StmtKind::If { test, body, orelse } => {
                let body = self.strip_body(body);
                let orelse = self.strip_body(orelse);
                let kind = match (body, orelse) {
                    (None, None) => return None,
                    (None, Some(orelse)) => StmtKind::If {
                        test: negate(test.clone()),
                        body: orelse,
                        orelse: Vec::new(),
                    },
                    (Some(body), orelse) => StmtKind::If {
                        test: test.clone(),
                        body,
                        orelse: orelse.unwrap_or_default(),
                    },
                };
                Some(Stmt::new(kind, stmt.pos))
            }
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            } => {
                let body = self.strip_body(body)?;
                Some(Stmt::new(
                    StmtKind::For {
                        target: target.clone(),
                        iter: iter.clone(),
                        body,
                        orelse: orelse.clone(),
                    },
                    stmt.pos,
                ))
            }
            _ => Some(stmt.clone()),
        }
    }
}

/// Assigned variables that are referenced nowhere but their definition.
fn unreferenced_variables(module: &Module) -> BTreeSet<String> {
    let mut variables = BTreeSet::new();
    collect_assigned(&module.body, &mut variables);
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    module.walk_exprs(&mut |e| {
        if let ExprKind::Name { id } = &e.kind {
            *counts.entry(id.as_str()).or_default() += 1;
        }
    });
    variables
        .into_iter()
        .filter(|v| counts.get(v.as_str()).copied().unwrap_or(0) <= 1)
        .collect()
}

fn collect_assigned(body: &[Stmt], out: &mut BTreeSet<String>) {
    for stmt in body {
        match &stmt.kind {
            StmtKind::Assign { targets, .. } => {
                out.extend(targets.iter().filter_map(|t| t.as_name().map(str::to_string)));
            }
            StmtKind::If { body, orelse, .. }
            | StmtKind::For { body, orelse, .. }
            | StmtKind::While { body, orelse, .. } => {
                collect_assigned(body, out);
                collect_assigned(orelse, out);
            }
            _ => {}
        }
    }
}
