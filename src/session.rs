//! File-level command execution
//!
//! A session owns the preloaded library scope and a working scope under it,
//! and runs parsed commands: definitions (operator loads, predicates, proof
//! terms, sub-scopes), `show`, `save` and `setting`. A failed proof is
//! terminal for its own definition only; later commands still run.

use crate::ast::{self, Command, Expr, SettingLit};
use crate::lexer;
use crate::library;
use crate::operators::io;
use crate::parser;
use crate::program::{self, NamedPredicate};
use crate::scope::{Binding, Scope, SettingValue};
use crate::verifier::{self, ProofRecord, Verdict};
use miette::Result;
use std::path::PathBuf;
use std::rc::Rc;

/// What one command produced
pub enum CommandOutcome {
    Defined {
        name: String,
        kind: &'static str,
    },
    Verified {
        name: String,
        verdict: Verdict,
        outline: String,
    },
    Shown {
        name: String,
        text: String,
    },
    Saved {
        name: String,
        file: String,
    },
    SettingChanged {
        key: String,
    },
    Failed {
        name: Option<String>,
        error: String,
    },
}

/// An execution session over one working scope
pub struct Session {
    /// keeps the library alive; scope parents are weak
    library: Scope,
    main: Scope,
    base_dir: PathBuf,
}

impl Session {
    pub fn new(base_dir: PathBuf) -> Self {
        let library = library::global_scope();
        let main = library.child("main");
        Self {
            library,
            main,
            base_dir,
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.main
    }

    pub fn library(&self) -> &Scope {
        &self.library
    }

    /// Lex, parse and run a source string
    pub fn run(&mut self, source: &str) -> Result<Vec<CommandOutcome>> {
        let tokens = lexer::lex(source)?;
        let ast = parser::parse(&tokens)?;
        let mut outcomes = Vec::new();
        let scope = self.main.clone();
        for command in &ast.commands {
            let outcome = self.exec(command, &scope);
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    fn exec(&mut self, command: &Command, scope: &Scope) -> CommandOutcome {
        match self.try_exec(command, scope) {
            Ok(outcome) => outcome,
            Err(error) => CommandOutcome::Failed {
                name: command_name(command),
                error,
            },
        }
    }

    fn try_exec(&mut self, command: &Command, scope: &Scope) -> Result<CommandOutcome, String> {
        match command {
            Command::Def { name, expr } => self.exec_def(&name.text, expr, scope),
            Command::Show { path, .. } => {
                let segments: Vec<String> = path.iter().map(|i| i.text.clone()).collect();
                let name = ast::path_text(path);
                let binding = scope.resolve_path(&segments).map_err(|e| e.to_string())?;
                Ok(CommandOutcome::Shown {
                    name,
                    text: render_binding(&binding),
                })
            }
            Command::Save { path, file, .. } => {
                let segments: Vec<String> = path.iter().map(|i| i.text.clone()).collect();
                let name = ast::path_text(path);
                let binding = scope.resolve_path(&segments).map_err(|e| e.to_string())?;
                match binding {
                    Binding::Operator(op) => {
                        let target = self.base_dir.join(file);
                        io::save_operator(&target, &op).map_err(|e| e.to_string())?;
                        Ok(CommandOutcome::Saved {
                            name,
                            file: file.clone(),
                        })
                    }
                    other => Err(format!(
                        "'{}' is a {}, only operators can be saved",
                        name,
                        other.kind()
                    )),
                }
            }
            Command::Setting { key, value, .. } => {
                let value = match value {
                    SettingLit::Float(v) => SettingValue::Float(*v),
                    SettingLit::Bool(v) => SettingValue::Bool(*v),
                };
                scope
                    .set_setting(&key.text, value)
                    .map_err(|e| e.to_string())?;
                Ok(CommandOutcome::SettingChanged {
                    key: key.text.clone(),
                })
            }
        }
    }

    fn exec_def(
        &mut self,
        name: &str,
        expr: &Expr,
        scope: &Scope,
    ) -> Result<CommandOutcome, String> {
        match expr {
            Expr::Load { file, .. } => {
                let path = self.base_dir.join(file);
                let eps = scope.settings().eps;
                let op = io::load_operator(&path, name, eps).map_err(|e| e.to_string())?;
                scope
                    .bind(name, Binding::Operator(Rc::new(op)))
                    .map_err(|e| e.to_string())?;
                Ok(CommandOutcome::Defined {
                    name: name.to_string(),
                    kind: "operator",
                })
            }
            Expr::Predicate(items) => {
                let items =
                    program::resolve_predicate(items, None, scope).map_err(|e| e.to_string())?;
                scope
                    .bind(name, Binding::Predicate(Rc::new(NamedPredicate { items })))
                    .map_err(|e| e.to_string())?;
                Ok(CommandOutcome::Defined {
                    name: name.to_string(),
                    kind: "predicate",
                })
            }
            Expr::Proof(proof_expr) => {
                let term =
                    program::resolve_proof(proof_expr, scope).map_err(|e| e.to_string())?;
                let result = verifier::verify(&term, scope);
                let outline = result.rendered.clone();
                let verdict = result.verdict;
                if verdict == Verdict::Holds {
                    scope
                        .bind(
                            name,
                            Binding::Proof(Rc::new(ProofRecord {
                                register: term.register.clone(),
                                result,
                            })),
                        )
                        .map_err(|e| e.to_string())?;
                }
                Ok(CommandOutcome::Verified {
                    name: name.to_string(),
                    verdict,
                    outline,
                })
            }
            Expr::Scope(commands) => {
                let child = scope.child(name);
                for command in commands {
                    // a failure inside the sub-scope fails the definition
                    if let CommandOutcome::Failed { error, .. } = self.exec(command, &child) {
                        return Err(error);
                    }
                }
                scope
                    .bind(name, Binding::Scope(child))
                    .map_err(|e| e.to_string())?;
                Ok(CommandOutcome::Defined {
                    name: name.to_string(),
                    kind: "scope",
                })
            }
        }
    }
}

fn command_name(command: &Command) -> Option<String> {
    match command {
        Command::Def { name, .. } => Some(name.text.clone()),
        Command::Show { path, .. } | Command::Save { path, .. } => Some(ast::path_text(path)),
        Command::Setting { key, .. } => Some(key.text.clone()),
    }
}

fn render_binding(binding: &Binding) -> String {
    match binding {
        Binding::Operator(op) => render_operator(op),
        Binding::Predicate(p) => p.to_string(),
        Binding::Proof(record) => record.result.rendered.clone(),
        Binding::Scope(s) => {
            let names = s.local_names();
            format!("<scope {}>\n  {}", s.prefix(), names.join("\n  "))
        }
    }
}

fn render_operator(op: &crate::operators::Operator) -> String {
    use crate::operators::Operator as Op;
    match op {
        Op::Single(m) => render_matrix(m),
        Op::Measurement { m0, m1 } => format!(
            "RESULT0\n{}\nRESULT1\n{}",
            render_matrix(m0),
            render_matrix(m1)
        ),
    }
}

fn render_matrix(m: &nalgebra::DMatrix<crate::linalg::C64>) -> String {
    let mut out = String::new();
    for i in 0..m.nrows() {
        out.push_str("[ ");
        for j in 0..m.ncols() {
            let v = m[(i, j)];
            if v.im.abs() < 1e-12 {
                out.push_str(&format!("{:+.4} ", v.re));
            } else {
                out.push_str(&format!("{:+.4}{:+.4}i ", v.re, v.im));
            }
        }
        out.push_str("]\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(std::env::temp_dir())
    }

    #[test]
    fn test_define_and_show_predicate() {
        let mut s = session();
        let outcomes = s
            .run("def P := { P0[q] } end show P end")
            .unwrap();
        assert!(matches!(
            outcomes[0],
            CommandOutcome::Defined { kind: "predicate", .. }
        ));
        match &outcomes[1] {
            CommandOutcome::Shown { text, .. } => assert!(text.contains("P0[q]")),
            _ => panic!("expected a shown binding"),
        }
    }

    #[test]
    fn test_rebinding_fails_but_later_commands_run() {
        let mut s = session();
        let outcomes = s
            .run("def P := { P0[q] } end def P := { P1[q] } end setting EPS := 1e-6 end")
            .unwrap();
        assert!(matches!(outcomes[0], CommandOutcome::Defined { .. }));
        assert!(matches!(outcomes[1], CommandOutcome::Failed { .. }));
        assert!(matches!(outcomes[2], CommandOutcome::SettingChanged { .. }));
    }

    #[test]
    fn test_scope_definition_and_path_show() {
        let mut s = session();
        let outcomes = s
            .run("def lib := scope def P := { Pp[q] } end end show lib.P end")
            .unwrap();
        assert!(matches!(
            outcomes[0],
            CommandOutcome::Defined { kind: "scope", .. }
        ));
        assert!(matches!(outcomes[1], CommandOutcome::Shown { .. }));
    }

    #[test]
    fn test_silent_setting_is_accepted() {
        let mut s = session();
        let outcomes = s.run("setting SILENT := true end").unwrap();
        assert!(matches!(outcomes[0], CommandOutcome::SettingChanged { .. }));
        assert!(s.scope().settings().silent);
    }
}
