use super::lexer::{Spanned, Token, tokenize};
use super::{BinaryOp, EvalLimits, Expr, ExprError, Operand};

/// Parses `input` into an expression tree, enforcing the length and
/// nesting limits.
pub(crate) fn parse(input: &str, limits: &EvalLimits) -> Result<Expr, ExprError> {
    if input.len() > limits.max_source_len {
        return Err(ExprError::TooLong {
            len: input.len(),
            limit: limits.max_source_len,
        });
    }
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExprError::UnexpectedEnd);
    }
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        depth: 0,
        max_depth: limits.max_depth,
    };
    let expr = parser.or()?;
    if let Some(rest) = parser.peek_spanned() {
        return Err(ExprError::Syntax {
            message: format!("unexpected trailing {}", describe(&rest.token)),
            offset: rest.offset,
        });
    }
    Ok(expr)
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    fn peek_spanned(&self) -> Option<&'a Spanned> {
        self.tokens.get(self.pos)
    }

    fn peek(&self) -> Option<&'a Token> {
        self.peek_spanned().map(|spanned| &spanned.token)
    }

    fn advance(&mut self) -> Option<&'a Spanned> {
        let spanned = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(spanned)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ExprError> {
        match self.advance() {
            Some(spanned) if spanned.token == expected => Ok(()),
            Some(spanned) => Err(ExprError::Syntax {
                message: format!(
                    "expected {} but found {}",
                    describe(&expected),
                    describe(&spanned.token)
                ),
                offset: spanned.offset,
            }),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn enter(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ExprError::TooDeep {
                limit: self.max_depth,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // Operator chains build left-deep trees: every link is one more level.
    fn release(&mut self, levels: usize) {
        self.depth -= levels;
    }

    fn or(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.and()?;
        let mut levels = 0;
        while self.eat(&Token::Or) {
            self.enter()?;
            levels += 1;
            let right = self.and()?;
            left = Expr::binary(BinaryOp::Or, left, right);
        }
        self.release(levels);
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.equality()?;
        let mut levels = 0;
        while self.eat(&Token::And) {
            self.enter()?;
            levels += 1;
            let right = self.equality()?;
            left = Expr::binary(BinaryOp::And, left, right);
        }
        self.release(levels);
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.relational()?;
        let mut levels = 0;
        loop {
            let op = match self.peek() {
                Some(Token::LooseEq) => BinaryOp::LooseEq,
                Some(Token::LooseNe) => BinaryOp::LooseNe,
                Some(Token::StrictEq) => BinaryOp::StrictEq,
                Some(Token::StrictNe) => BinaryOp::StrictNe,
                _ => break,
            };
            self.pos += 1;
            self.enter()?;
            levels += 1;
            let right = self.relational()?;
            left = Expr::binary(op, left, right);
        }
        self.release(levels);
        Ok(left)
    }

    fn relational(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.unary()?;
        let mut levels = 0;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                Some(Token::In) => BinaryOp::In,
                _ => break,
            };
            self.pos += 1;
            self.enter()?;
            levels += 1;
            let right = self.unary()?;
            left = Expr::binary(op, left, right);
        }
        self.release(levels);
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&Token::Not) {
            self.enter()?;
            let inner = self.unary()?;
            self.leave();
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ExprError> {
        let mut target = self.primary()?;
        let mut levels = 0;
        loop {
            if matches!(self.peek(), Some(Token::Dot | Token::LBracket)) {
                self.enter()?;
                levels += 1;
            }
            if self.eat(&Token::Dot) {
                let property = match self.advance() {
                    Some(Spanned {
                        token: Token::Ident(name),
                        ..
                    }) => name.clone(),
                    Some(spanned) => {
                        return Err(ExprError::Syntax {
                            message: format!(
                                "expected a property name but found {}",
                                describe(&spanned.token)
                            ),
                            offset: spanned.offset,
                        });
                    }
                    None => return Err(ExprError::UnexpectedEnd),
                };
                if self.eat(&Token::LParen) {
                    let args = self.list(Token::RParen)?;
                    target = Expr::Call {
                        target: Box::new(target),
                        method: property,
                        args,
                    };
                } else {
                    target = Expr::Member {
                        target: Box::new(target),
                        property,
                    };
                }
            } else if self.eat(&Token::LBracket) {
                self.enter()?;
                let index = self.or()?;
                self.leave();
                self.expect(Token::RBracket)?;
                target = Expr::Index {
                    target: Box::new(target),
                    index: Box::new(index),
                };
            } else {
                self.release(levels);
                return Ok(target);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let Some(spanned) = self.advance() else {
            return Err(ExprError::UnexpectedEnd);
        };
        let offset = spanned.offset;
        let expr = match &spanned.token {
            Token::Var(name) => Expr::Var(name.clone()),
            Token::Str(text) => Expr::Literal(Operand::Str(text.clone())),
            Token::Number(number) => Expr::Literal(Operand::Number(*number)),
            Token::True => Expr::Literal(Operand::Bool(true)),
            Token::False => Expr::Literal(Operand::Bool(false)),
            Token::Null => Expr::Literal(Operand::Null),
            Token::Undefined => Expr::Literal(Operand::Undefined),
            Token::LParen => {
                self.enter()?;
                let inner = self.or()?;
                self.leave();
                self.expect(Token::RParen)?;
                inner
            }
            Token::LBracket => Expr::Array(self.list(Token::RBracket)?),
            Token::Ident(name) => {
                return Err(ExprError::Syntax {
                    message: format!("unknown identifier '{}'", name),
                    offset,
                });
            }
            other => {
                return Err(ExprError::Syntax {
                    message: format!("unexpected {}", describe(other)),
                    offset,
                });
            }
        };
        Ok(expr)
    }

    // Comma separated expressions up to `close`; a trailing comma is allowed.
    fn list(&mut self, close: Token) -> Result<Vec<Expr>, ExprError> {
        self.enter()?;
        let mut items = Vec::new();
        loop {
            if self.eat(&close) {
                break;
            }
            items.push(self.or()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(close.clone())?;
            break;
        }
        self.leave();
        Ok(items)
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Var(name) => format!("variable '${}'", name),
        Token::Ident(name) => format!("identifier '{}'", name),
        Token::Str(_) => "string literal".into(),
        Token::Number(_) => "number literal".into(),
        Token::True | Token::False => "boolean literal".into(),
        Token::Null => "'null'".into(),
        Token::Undefined => "'undefined'".into(),
        Token::In => "'in'".into(),
        Token::LParen => "'('".into(),
        Token::RParen => "')'".into(),
        Token::LBracket => "'['".into(),
        Token::RBracket => "']'".into(),
        Token::Comma => "','".into(),
        Token::Dot => "'.'".into(),
        Token::Not => "'!'".into(),
        Token::LooseEq => "'=='".into(),
        Token::LooseNe => "'!='".into(),
        Token::StrictEq => "'==='".into(),
        Token::StrictNe => "'!=='".into(),
        Token::Lt => "'<'".into(),
        Token::Le => "'<='".into(),
        Token::Gt => "'>'".into(),
        Token::Ge => "'>='".into(),
        Token::And => "'&&'".into(),
        Token::Or => "'||'".into(),
    }
}
