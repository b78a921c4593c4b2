//! Parser for the verification language
//!
//! A recursive descent parser that produces a surface AST from a token
//! stream.

pub mod errors;

pub use errors::ParserError;

use crate::ast::*;
use crate::common::Span;
use crate::lexer::{Token, TokenKind};

/// Parse a token stream into a source AST
pub fn parse(tokens: &[Token]) -> Result<SourceAst, ParserError> {
    let mut parser = Parser::new(tokens);
    parser.parse_file()
}

/// Parser state
struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

/// One `;`-separated element of a proof term
enum ProofItem {
    Pred(Vec<PredItem>, Span),
    Stmt(StmtAst),
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or_else(|| {
            self.tokens
                .last()
                .expect("token stream should have at least EOF")
        })
    }

    fn peek(&self) -> TokenKind {
        self.current().kind
    }

    fn peek_n(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek() == kind
    }

    fn advance(&mut self) -> &Token {
        let len = self.tokens.len();
        if self.pos < len {
            self.pos += 1;
        }
        &self.tokens[self.pos.saturating_sub(1).min(len - 1)]
    }

    fn prev_span(&self) -> Span {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .map(|t| t.span)
            .unwrap_or_default()
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Result<&Token, ParserError> {
        if self.at(kind) {
            Ok(self.advance())
        } else if self.at(TokenKind::Eof) {
            Err(ParserError::UnexpectedEof {
                expected: kind.describe().to_string(),
            })
        } else {
            Err(ParserError::unexpected(
                kind.describe(),
                &self.current().text,
                self.current().span,
                context,
            ))
        }
    }

    fn parse_file(&mut self) -> Result<SourceAst, ParserError> {
        let mut commands = Vec::new();
        while !self.at(TokenKind::Eof) {
            commands.push(self.parse_command()?);
        }
        Ok(SourceAst { commands })
    }

    fn parse_command(&mut self) -> Result<Command, ParserError> {
        match self.peek() {
            TokenKind::Def => self.parse_def(),
            TokenKind::Show => self.parse_show(),
            TokenKind::Save => self.parse_save(),
            TokenKind::Setting => self.parse_setting(),
            _ => Err(ParserError::unexpected(
                "`def`, `show`, `save` or `setting`",
                &self.current().text,
                self.current().span,
                "a command starts here",
            )),
        }
    }

    fn parse_def(&mut self) -> Result<Command, ParserError> {
        self.expect(TokenKind::Def, "definition")?;
        let name = self.parse_ident("definition name")?;
        self.expect(TokenKind::ColonEq, "after the definition name")?;
        let expr = self.parse_expr()?;
        self.expect(TokenKind::End, "to close the definition")?;
        Ok(Command::Def { name, expr })
    }

    fn parse_show(&mut self) -> Result<Command, ParserError> {
        let start = self.current().span;
        self.expect(TokenKind::Show, "show command")?;
        let path = self.parse_path("name to show")?;
        self.expect(TokenKind::End, "to close `show`")?;
        Ok(Command::Show {
            path,
            span: start.join(self.prev_span()),
        })
    }

    fn parse_save(&mut self) -> Result<Command, ParserError> {
        let start = self.current().span;
        self.expect(TokenKind::Save, "save command")?;
        let path = self.parse_path("name to save")?;
        let file = self.parse_string("target file path")?;
        self.expect(TokenKind::End, "to close `save`")?;
        Ok(Command::Save {
            path,
            file,
            span: start.join(self.prev_span()),
        })
    }

    fn parse_setting(&mut self) -> Result<Command, ParserError> {
        let start = self.current().span;
        self.expect(TokenKind::Setting, "setting command")?;
        let key = self.parse_ident("setting key")?;
        self.expect(TokenKind::ColonEq, "after the setting key")?;
        let tok = self.advance().clone();
        let value = match tok.kind {
            TokenKind::FloatLit | TokenKind::IntLit => tok
                .text
                .parse::<f64>()
                .map(SettingLit::Float)
                .map_err(|_| ParserError::BadSettingValue {
                    span: tok.span.source_span(),
                    text: tok.text.clone(),
                })?,
            TokenKind::True => SettingLit::Bool(true),
            TokenKind::False => SettingLit::Bool(false),
            _ => {
                return Err(ParserError::BadSettingValue {
                    span: tok.span.source_span(),
                    text: tok.text,
                })
            }
        };
        self.expect(TokenKind::End, "to close `setting`")?;
        Ok(Command::Setting {
            key,
            value,
            span: start.join(self.prev_span()),
        })
    }

    fn parse_expr(&mut self) -> Result<Expr, ParserError> {
        match self.peek() {
            TokenKind::Load => {
                let start = self.current().span;
                self.advance();
                let file = self.parse_string("tensor file path")?;
                Ok(Expr::Load {
                    file,
                    span: start.join(self.prev_span()),
                })
            }
            TokenKind::Proof => Ok(Expr::Proof(Box::new(self.parse_proof()?))),
            TokenKind::LBrace => {
                let (items, _) = self.parse_pred_items_braced()?;
                Ok(Expr::Predicate(items))
            }
            TokenKind::Scope => {
                self.advance();
                let mut commands = Vec::new();
                while !self.at(TokenKind::End) && !self.at(TokenKind::Eof) {
                    commands.push(self.parse_command()?);
                }
                Ok(Expr::Scope(commands))
            }
            _ => Err(ParserError::unexpected(
                "`load`, `proof`, `scope` or a predicate",
                &self.current().text,
                self.current().span,
                "a definition body starts here",
            )),
        }
    }

    fn parse_proof(&mut self) -> Result<ProofExpr, ParserError> {
        let start = self.current().span;
        self.expect(TokenKind::Proof, "proof term")?;
        let register = self.parse_qubit_list("proof register")?;
        self.expect(TokenKind::Colon, "after the proof register")?;

        let mut items = vec![self.parse_proof_item()?];
        while self.at(TokenKind::Semi) {
            self.advance();
            items.push(self.parse_proof_item()?);
        }
        let span = start.join(self.prev_span());

        if items.len() < 2 {
            return Err(ParserError::MalformedProof {
                span: span.source_span(),
            });
        }
        let pre = match items.remove(0) {
            ProofItem::Pred(items, _) => items,
            ProofItem::Stmt(_) => {
                return Err(ParserError::MalformedProof {
                    span: span.source_span(),
                })
            }
        };
        let post = match items.pop().expect("at least two items") {
            ProofItem::Pred(items, _) => items,
            ProofItem::Stmt(_) => {
                return Err(ParserError::MalformedProof {
                    span: span.source_span(),
                })
            }
        };
        let body = items
            .into_iter()
            .map(|item| match item {
                ProofItem::Stmt(s) => s,
                ProofItem::Pred(items, span) => StmtAst::Assert { items, span },
            })
            .collect();

        Ok(ProofExpr {
            register,
            pre,
            body,
            post,
            span,
        })
    }

    fn parse_proof_item(&mut self) -> Result<ProofItem, ParserError> {
        if self.at(TokenKind::LBrace) {
            if self.peek_n(1) == TokenKind::Inv {
                return Ok(ProofItem::Stmt(self.parse_inv_while()?));
            }
            let (items, span) = self.parse_pred_items_braced()?;
            return Ok(ProofItem::Pred(items, span));
        }
        Ok(ProofItem::Stmt(self.parse_stmt()?))
    }

    /// A `;`-separated statement sequence, as found in branch bodies
    fn parse_body(&mut self) -> Result<Vec<StmtAst>, ParserError> {
        let mut stmts = vec![self.parse_body_item()?];
        while self.at(TokenKind::Semi) {
            self.advance();
            stmts.push(self.parse_body_item()?);
        }
        Ok(stmts)
    }

    fn parse_body_item(&mut self) -> Result<StmtAst, ParserError> {
        if self.at(TokenKind::LBrace) {
            if self.peek_n(1) == TokenKind::Inv {
                return self.parse_inv_while();
            }
            let (items, span) = self.parse_pred_items_braced()?;
            return Ok(StmtAst::Assert { items, span });
        }
        self.parse_stmt()
    }

    fn parse_stmt(&mut self) -> Result<StmtAst, ParserError> {
        let start = self.current().span;
        match self.peek() {
            TokenKind::Skip => {
                self.advance();
                Ok(StmtAst::Skip { span: start })
            }
            TokenKind::Abort => {
                self.advance();
                Ok(StmtAst::Abort { span: start })
            }
            TokenKind::If => {
                self.advance();
                let meas = self.parse_path("guard measurement")?;
                let meas_qubits = self.parse_qubit_list("measured qubits")?;
                self.expect(TokenKind::Then, "after the guard")?;
                let then_body = self.parse_body()?;
                self.expect(TokenKind::Else, "if statements need both branches")?;
                let else_body = self.parse_body()?;
                self.expect(TokenKind::End, "to close `if`")?;
                Ok(StmtAst::If {
                    meas,
                    meas_qubits,
                    then_body,
                    else_body,
                    span: start.join(self.prev_span()),
                })
            }
            TokenKind::While => Err(ParserError::unexpected(
                "`{ inv: ... };` before `while`",
                &self.current().text,
                self.current().span,
                "a loop needs an invariant annotation",
            )),
            TokenKind::LParen => {
                self.advance();
                let mut branches = vec![self.parse_body()?];
                while self.at(TokenKind::Hash) {
                    self.advance();
                    branches.push(self.parse_body()?);
                }
                self.expect(TokenKind::RParen, "to close the choice")?;
                let span = start.join(self.prev_span());
                if branches.len() < 2 {
                    return Err(ParserError::SingleBranchChoice {
                        span: span.source_span(),
                    });
                }
                Ok(StmtAst::Choice { branches, span })
            }
            TokenKind::LBracket | TokenKind::Ident => {
                let qubits = if self.at(TokenKind::LBracket) {
                    self.parse_qubit_list("target qubits")?
                } else {
                    vec![self.parse_ident("target qubit")?]
                };
                match self.peek() {
                    TokenKind::ColonEq => {
                        self.advance();
                        let zero = self.expect(TokenKind::IntLit, "initialization value")?;
                        if zero.text != "0" {
                            let span = zero.span;
                            return Err(ParserError::BadInit {
                                span: span.source_span(),
                            });
                        }
                        Ok(StmtAst::Init {
                            qubits,
                            span: start.join(self.prev_span()),
                        })
                    }
                    TokenKind::StarEq => {
                        self.advance();
                        let op = self.parse_path("unitary operator")?;
                        Ok(StmtAst::Unitary {
                            qubits,
                            op,
                            span: start.join(self.prev_span()),
                        })
                    }
                    _ => Err(ParserError::unexpected(
                        "`:=` or `*=`",
                        &self.current().text,
                        self.current().span,
                        "after the target qubits",
                    )),
                }
            }
            _ => Err(ParserError::unexpected(
                "a statement",
                &self.current().text,
                self.current().span,
                "in a program body",
            )),
        }
    }

    fn parse_inv_while(&mut self) -> Result<StmtAst, ParserError> {
        let start = self.current().span;
        self.expect(TokenKind::LBrace, "invariant annotation")?;
        self.expect(TokenKind::Inv, "invariant annotation")?;
        self.expect(TokenKind::Colon, "after `inv`")?;
        let mut inv = Vec::new();
        while !self.at(TokenKind::RBrace) {
            inv.push(self.parse_pred_item()?);
        }
        self.expect(TokenKind::RBrace, "to close the invariant")?;
        if inv.is_empty() {
            return Err(ParserError::unexpected(
                "at least one placed operator",
                &self.current().text,
                start,
                "in the invariant",
            ));
        }
        self.expect(TokenKind::Semi, "between the invariant and `while`")?;
        self.expect(TokenKind::While, "loop")?;
        let meas = self.parse_path("guard measurement")?;
        let meas_qubits = self.parse_qubit_list("measured qubits")?;
        self.expect(TokenKind::Do, "after the guard")?;
        let body = self.parse_body()?;
        self.expect(TokenKind::End, "to close the loop")?;
        Ok(StmtAst::While {
            inv,
            meas,
            meas_qubits,
            body,
            span: start.join(self.prev_span()),
        })
    }

    fn parse_pred_items_braced(&mut self) -> Result<(Vec<PredItem>, Span), ParserError> {
        let start = self.current().span;
        self.expect(TokenKind::LBrace, "predicate")?;
        let mut items = Vec::new();
        while !self.at(TokenKind::RBrace) {
            items.push(self.parse_pred_item()?);
        }
        self.expect(TokenKind::RBrace, "to close the predicate")?;
        let span = start.join(self.prev_span());
        if items.is_empty() {
            return Err(ParserError::unexpected(
                "at least one placed operator",
                "}",
                span,
                "a predicate cannot be empty",
            ));
        }
        Ok((items, span))
    }

    fn parse_pred_item(&mut self) -> Result<PredItem, ParserError> {
        let op = self.parse_path("predicate operator")?;
        let qubits = self.parse_qubit_list("predicate placement")?;
        Ok(PredItem { op, qubits })
    }

    fn parse_qubit_list(&mut self, context: &str) -> Result<Vec<Ident>, ParserError> {
        self.expect(TokenKind::LBracket, context)?;
        let mut qubits = Vec::new();
        while self.at(TokenKind::Ident) {
            qubits.push(self.parse_ident(context)?);
        }
        self.expect(TokenKind::RBracket, context)?;
        if qubits.is_empty() {
            return Err(ParserError::unexpected(
                "at least one qubit name",
                &self.current().text,
                self.prev_span(),
                context,
            ));
        }
        Ok(qubits)
    }

    fn parse_ident(&mut self, context: &str) -> Result<Ident, ParserError> {
        let tok = self.expect(TokenKind::Ident, context)?;
        Ok(Ident {
            text: tok.text.clone(),
            span: tok.span,
        })
    }

    fn parse_path(&mut self, context: &str) -> Result<IdentPath, ParserError> {
        let mut path = vec![self.parse_ident(context)?];
        while self.at(TokenKind::Dot) {
            self.advance();
            path.push(self.parse_ident(context)?);
        }
        Ok(path)
    }

    fn parse_string(&mut self, context: &str) -> Result<String, ParserError> {
        let tok = self.expect(TokenKind::StringLit, context)?;
        Ok(tok.text[1..tok.text.len() - 1].to_string())
    }
}
