use std::iter::Peekable;
use std::str::CharIndices;

use super::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Var(String),
    Ident(String),
    Str(String),
    Number(f64),
    True,
    False,
    Null,
    Undefined,
    In,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Not,
    LooseEq,
    LooseNe,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub offset: usize,
}

/// Splits an expression into tokens.
pub(crate) fn tokenize(input: &str) -> Result<Vec<Spanned>, ExprError> {
    let mut lexer = Lexer {
        chars: input.char_indices().peekable(),
    };
    let mut tokens = Vec::new();
    while let Some(spanned) = lexer.next_token()? {
        tokens.push(spanned);
    }
    Ok(tokens)
}

struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
}

impl Lexer<'_> {
    fn next_token(&mut self) -> Result<Option<Spanned>, ExprError> {
        while let Some(&(_, ch)) = self.chars.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.chars.next();
        }

        let Some((offset, ch)) = self.chars.next() else {
            return Ok(None);
        };

        let token = match ch {
            '$' => self.variable(offset)?,
            '"' | '\'' => Token::Str(self.string(ch, offset)?),
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            ',' => Token::Comma,
            '.' if self.peek_is(|c| c.is_ascii_digit()) => self.number(ch, offset)?,
            '.' => Token::Dot,
            '-' if self.peek_is(|c| c.is_ascii_digit() || c == '.') => self.number(ch, offset)?,
            c if c.is_ascii_digit() => self.number(c, offset)?,
            '!' => {
                if self.eat('=') {
                    if self.eat('=') {
                        Token::StrictNe
                    } else {
                        Token::LooseNe
                    }
                } else {
                    Token::Not
                }
            }
            '=' => {
                if !self.eat('=') {
                    return Err(ExprError::Syntax {
                        message: "assignment is not supported".into(),
                        offset,
                    });
                }
                if self.eat('=') {
                    Token::StrictEq
                } else {
                    Token::LooseEq
                }
            }
            '<' => {
                if self.eat('=') {
                    Token::Le
                } else {
                    Token::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            '&' if self.eat('&') => Token::And,
            '|' if self.eat('|') => Token::Or,
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&(_, next)) = self.chars.peek() {
                    if !(next.is_alphanumeric() || next == '_') {
                        break;
                    }
                    word.push(next);
                    self.chars.next();
                }
                match word.as_str() {
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    "undefined" => Token::Undefined,
                    "in" => Token::In,
                    _ => Token::Ident(word),
                }
            }
            other => return Err(ExprError::UnexpectedChar { ch: other, offset }),
        };

        Ok(Some(Spanned { token, offset }))
    }

    fn peek_is(&mut self, predicate: impl Fn(char) -> bool) -> bool {
        self.chars.peek().map(|&(_, c)| predicate(c)).unwrap_or(false)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek_is(|c| c == expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    // `$name` or `${any name}`; bare names may contain `-` since the
    // grammar has no subtraction.
    fn variable(&mut self, offset: usize) -> Result<Token, ExprError> {
        let mut name = String::new();
        if self.eat('{') {
            loop {
                match self.chars.next() {
                    Some((_, '}')) => break,
                    Some((_, c)) => name.push(c),
                    None => {
                        return Err(ExprError::Syntax {
                            message: "unterminated '${'".into(),
                            offset,
                        });
                    }
                }
            }
        } else {
            while let Some(&(_, c)) = self.chars.peek() {
                if !(c.is_alphanumeric() || c == '_' || c == '-') {
                    break;
                }
                name.push(c);
                self.chars.next();
            }
        }
        if name.trim().is_empty() {
            return Err(ExprError::Syntax {
                message: "expected a field name after '$'".into(),
                offset,
            });
        }
        Ok(Token::Var(name))
    }

    fn string(&mut self, quote: char, offset: usize) -> Result<String, ExprError> {
        let mut text = String::new();
        loop {
            let Some((_, c)) = self.chars.next() else {
                return Err(ExprError::UnterminatedString { offset });
            };
            if c == quote {
                return Ok(text);
            }
            if c != '\\' {
                text.push(c);
                continue;
            }
            let Some((escape_offset, escaped)) = self.chars.next() else {
                return Err(ExprError::UnterminatedString { offset });
            };
            match escaped {
                'n' => text.push('\n'),
                't' => text.push('\t'),
                'r' => text.push('\r'),
                'u' => {
                    let mut hex = String::with_capacity(4);
                    for _ in 0..4 {
                        match self.chars.next() {
                            Some((_, h)) if h.is_ascii_hexdigit() => hex.push(h),
                            _ => {
                                return Err(ExprError::Syntax {
                                    message: "invalid \\u escape".into(),
                                    offset: escape_offset,
                                });
                            }
                        }
                    }
                    let code = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32);
                    match code {
                        Some(decoded) => text.push(decoded),
                        None => {
                            return Err(ExprError::Syntax {
                                message: "invalid \\u escape".into(),
                                offset: escape_offset,
                            });
                        }
                    }
                }
                other => text.push(other),
            }
        }
    }

    fn number(&mut self, first: char, offset: usize) -> Result<Token, ExprError> {
        let mut raw = String::from(first);
        let mut seen_exponent = false;
        while let Some(&(_, c)) = self.chars.peek() {
            let accept = c.is_ascii_digit()
                || c == '.'
                || (!seen_exponent && (c == 'e' || c == 'E'))
                || ((c == '+' || c == '-') && matches!(raw.chars().last(), Some('e' | 'E')));
            if !accept {
                break;
            }
            if c == 'e' || c == 'E' {
                seen_exponent = true;
            }
            raw.push(c);
            self.chars.next();
        }
        raw.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| ExprError::Syntax {
                message: format!("invalid number '{}'", raw),
                offset,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|spanned| spanned.token)
            .collect()
    }

    #[test]
    fn tokenizes_comparison() {
        assert_eq!(
            kinds("$hasPet == \"yes\""),
            vec![
                Token::Var("hasPet".into()),
                Token::LooseEq,
                Token::Str("yes".into())
            ]
        );
    }

    #[test]
    fn variable_names_keep_dashes() {
        assert_eq!(
            kinds("$agree-tos === true"),
            vec![Token::Var("agree-tos".into()), Token::StrictEq, Token::True]
        );
    }

    #[test]
    fn braced_variables_accept_any_name() {
        assert_eq!(kinds("${first name}"), vec![Token::Var("first name".into())]);
    }

    #[test]
    fn numbers_and_negatives() {
        assert_eq!(
            kinds("-1.5 >= 2e3"),
            vec![Token::Number(-1.5), Token::Ge, Token::Number(2000.0)]
        );
    }

    #[test]
    fn member_access_splits_on_dot() {
        assert_eq!(
            kinds("$tags.length"),
            vec![
                Token::Var("tags".into()),
                Token::Dot,
                Token::Ident("length".into())
            ]
        );
    }

    #[test]
    fn rejects_single_equals() {
        assert!(matches!(
            tokenize("$a = 1"),
            Err(ExprError::Syntax { offset: 3, .. })
        ));
    }

    #[test]
    fn rejects_unterminated_string() {
        assert_eq!(
            tokenize("'abc"),
            Err(ExprError::UnterminatedString { offset: 0 })
        );
    }

    #[test]
    fn rejects_unknown_characters() {
        assert_eq!(
            tokenize("$a + 1"),
            Err(ExprError::UnexpectedChar { ch: '+', offset: 3 })
        );
    }
}
