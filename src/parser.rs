use crate::ast::{self, AstNode};
use crate::error::{EvalError, EvalResult};
use crate::lexer::{Token, TokenKind};
use crate::ops::{BinOp, UnaryOp, UNARY_PRECEDENCE};

fn parse_err(token: &Token, reason: &'static str) -> EvalError {
    EvalError::Parse {
        text: token.text.clone(),
        at: token.at,
        reason,
    }
}

/// Build an expression tree from a lexed token sequence.
///
/// Precedence climbing: each recursion level folds every operator at
/// or above its minimum precedence, recursing one level tighter for
/// left-associative operators and at the same level for the
/// right-associative assignments. Postfix `[i]`, `.m` and `->m` fold
/// at the highest precedence; member names are consumed as bare
/// identifiers and never looked up.
pub fn parse_tokens(tokens: Vec<Token>) -> EvalResult<AstNode> {
    let mut parser = Parser { tokens, index: 0 };
    let root = parser.parse_expression(1)?;
    if let Some(extra) = parser.peek() {
        return Err(parse_err(extra, "trailing input after expression"));
    }
    Ok(root)
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn eof_err(&self, reason: &'static str) -> EvalError {
        let at = self
            .tokens
            .last()
            .map(|token| token.at + token.text.len())
            .unwrap_or(0);
        EvalError::Parse {
            text: "<end of input>".to_string(),
            at,
            reason,
        }
    }

    fn expect_text(&mut self, text: &'static str, reason: &'static str) -> EvalResult<()> {
        match self.peek() {
            Some(token) if token.text == text => {
                self.index += 1;
                Ok(())
            }
            Some(token) => Err(parse_err(token, reason)),
            None => Err(self.eof_err(reason)),
        }
    }

    fn parse_expression(&mut self, min_prec: u8) -> EvalResult<AstNode> {
        let mut node = match self.peek() {
            None => return Err(self.eof_err("expected an expression")),
            Some(token) if token.kind == TokenKind::UnaryOperator => {
                let Some(op) = UnaryOp::from_token(token) else {
                    return Err(parse_err(token, "unexpected operator"));
                };
                self.index += 1;
                let operand = self.parse_expression(UNARY_PRECEDENCE + 1)?;
                AstNode::Unary {
                    op,
                    operand: Box::new(operand),
                }
            }
            Some(_) => self.parse_primary()?,
        };

        while let Some(token) = self.peek() {
            let Some(op) = BinOp::from_token(token) else {
                // unknown operators terminate the climb
                break;
            };
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.index += 1;
            let right = match op {
                BinOp::Index => {
                    let index = self.parse_expression(1)?;
                    self.expect_text("]", "expected `]` after array index")?;
                    index
                }
                BinOp::Member | BinOp::Arrow => self.parse_member_name()?,
                _ => {
                    let next_min = if op.is_right_assoc() { prec } else { prec + 1 };
                    self.parse_expression(next_min)?
                }
            };
            node = AstNode::Binary {
                op,
                left: Box::new(node),
                right: Box::new(right),
            };
        }
        Ok(node)
    }

    fn parse_primary(&mut self) -> EvalResult<AstNode> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.eof_err("expected an expression"));
        };
        self.index += 1;
        match token.kind {
            TokenKind::Number => {
                ast::literal_from_number(&token.text, token.at).map(AstNode::Literal)
            }
            TokenKind::StringLiteral => {
                ast::literal_from_quoted(&token.text, token.at).map(AstNode::Literal)
            }
            TokenKind::Symbol => Ok(AstNode::Identifier(token.text)),
            TokenKind::Parenthesis if token.text == "(" => {
                let inner = self.parse_expression(1)?;
                self.expect_text(")", "expected closing parenthesis")?;
                Ok(inner)
            }
            _ => Err(parse_err(&token, "unexpected token in primary expression")),
        }
    }

    /// The name after `.` or `->`: a bare identifier, used for member
    /// lookup only.
    fn parse_member_name(&mut self) -> EvalResult<AstNode> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Symbol => {
                let name = token.text.clone();
                self.index += 1;
                Ok(AstNode::Identifier(name))
            }
            Some(token) => Err(parse_err(token, "expected a member name")),
            None => Err(self.eof_err("expected a member name")),
        }
    }
}
