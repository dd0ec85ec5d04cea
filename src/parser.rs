use log::debug;

use crate::{
    error::{LexError, ParseError},
    expr::{BinaryOp, Expr, Literal, LiteralKind, UnaryOp},
    scanner::Scanner,
    token::{Token, TokenKind},
    value::Value,
};

type Result<T> = std::result::Result<T, ParseError>;

/// Binding power passed in by the top-level call; weaker than any operator.
const LOWEST_BINDING: u8 = 99;

/// Rank of every binary operator. A smaller rank binds tighter. Prefix
/// operators (rank 2) are handled by `parse_unary_expr` and never appear in
/// binary position.
const PRECEDENCE: [(BinaryOp, u8); 19] = [
    (BinaryOp::Mul, 3),
    (BinaryOp::Div, 3),
    (BinaryOp::Rem, 3),
    (BinaryOp::Add, 4),
    (BinaryOp::Sub, 4),
    (BinaryOp::Shl, 5),
    (BinaryOp::Shr, 5),
    (BinaryOp::Greater, 6),
    (BinaryOp::Less, 6),
    (BinaryOp::GreaterEqual, 6),
    (BinaryOp::LessEqual, 6),
    (BinaryOp::Equal, 7),
    (BinaryOp::NotEqual, 7),
    (BinaryOp::BitAnd, 8),
    (BinaryOp::BitXor, 9),
    (BinaryOp::BitOr, 10),
    (BinaryOp::And, 11),
    (BinaryOp::Or, 12),
    (BinaryOp::Comma, 15),
];

fn precedence_of(operator: BinaryOp) -> u8 {
    PRECEDENCE
        .iter()
        .find(|(op, _)| *op == operator)
        .map(|&(_, rank)| rank)
        .unwrap_or(LOWEST_BINDING)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Deepest nesting of operators, parentheses and index expressions
    /// accepted before giving up with [`ParseError::TooDeep`].
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions { max_depth: 256 }
    }
}

/// Recursive-descent parser pulling tokens lazily from a [`Scanner`]. Stops at
/// the first error; a failed parse never yields a partial tree.
pub struct Parser<'a> {
    source: &'a str,
    scanner: Scanner<'a>,
    token: Token<'a>,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, options: &ParseOptions) -> Self {
        let mut scanner = Scanner::new(source);
        let token = scanner.scan_token();
        Parser {
            source,
            scanner,
            token,
            depth: 0,
            max_depth: options.max_depth,
        }
    }

    pub fn parse(&mut self) -> Result<Expr> {
        self.reject_illegal()?;
        let expr = self.parse_expr()?;
        if !self.check(TokenKind::Eof) {
            return Err(self.unexpected("end of input"));
        }
        debug!("parsed {:?} (max depth {})", self.source, self.max_depth);
        Ok(expr)
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_binary_expr(LOWEST_BINDING)
    }

    /// Precedence climbing: keeps folding operators into `left` for as long as
    /// they bind tighter than `bound`, which makes equal ranks left-associative.
    fn parse_binary_expr(&mut self, bound: u8) -> Result<Expr> {
        let entered = self.depth;
        let mut left = self.parse_unary_expr()?;

        while let Some(operator) = BinaryOp::from_token(self.token.kind) {
            let rank = precedence_of(operator);
            if rank >= bound {
                break;
            }
            // each folded operator deepens the tree by one level
            self.enter()?;
            self.bump()?;
            let right = self.parse_binary_expr(rank)?;
            left = Expr::Binary(Box::new(left), operator, Box::new(right));
        }

        self.depth = entered;
        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr> {
        if let Some(operator) = UnaryOp::from_token(self.token.kind) {
            self.enter()?;
            self.bump()?;
            let operand = self.parse_unary_expr()?;
            self.leave();
            Ok(Expr::Unary(operator, Box::new(operand)))
        } else {
            self.parse_operand()
        }
    }

    fn parse_operand(&mut self) -> Result<Expr> {
        let expr = match self.token.kind {
            TokenKind::Integer | TokenKind::Float | TokenKind::Char | TokenKind::String => {
                let token = self.bump()?;
                self.parse_literal(token)?
            }
            TokenKind::Identifier => {
                let token = self.bump()?;
                if matches!(token.lexeme, "true" | "false") {
                    self.parse_literal(token)?
                } else {
                    Expr::Identifier(token.lexeme.to_owned())
                }
            }
            TokenKind::LeftParen => {
                self.enter()?;
                self.bump()?;
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RightParen, "')'")?;
                self.leave();
                Expr::Paren(Box::new(inner))
            }
            found => {
                return Err(ParseError::ExpectedExpression {
                    found,
                    offset: self.token.offset,
                })
            }
        };

        self.parse_postfix(expr)
    }

    /// At most one postfix is accepted; a second one is left for the caller.
    fn parse_postfix(&mut self, base: Expr) -> Result<Expr> {
        if self.eat(TokenKind::LeftBracket)? {
            self.enter()?;
            let index = self.parse_expr()?;
            self.expect(TokenKind::RightBracket, "']'")?;
            self.leave();
            Ok(Expr::Index(Box::new(base), Box::new(index)))
        } else if self.eat(TokenKind::Dot)? {
            let name = self.expect_identifier()?;
            Ok(Expr::Member(Box::new(base), name))
        } else {
            Ok(base)
        }
    }

    /// Converts a literal token into its typed value right away, so that
    /// evaluation never has to look at literal text again.
    fn parse_literal(&self, token: Token<'a>) -> Result<Expr> {
        let lexeme = token.lexeme;
        let invalid = |kind: LiteralKind| ParseError::InvalidLiteral {
            kind: kind.name(),
            lexeme: lexeme.to_owned(),
        };

        let (kind, value) = match token.kind {
            TokenKind::Integer => {
                let value = lexeme
                    .parse::<i64>()
                    .map_err(|_| invalid(LiteralKind::Integer))?;
                (LiteralKind::Integer, Value::Integer(value))
            }
            TokenKind::Float => {
                let value = lexeme
                    .parse::<f32>()
                    .ok()
                    .filter(|value| value.is_finite())
                    .ok_or_else(|| invalid(LiteralKind::Float))?;
                (LiteralKind::Float, Value::Float(value))
            }
            TokenKind::Char => {
                let value = unescape(strip_quotes(lexeme))
                    .and_then(|text| single_char(&text))
                    .ok_or_else(|| invalid(LiteralKind::Char))?;
                (LiteralKind::Char, Value::Char(value))
            }
            TokenKind::String => {
                let value =
                    unescape(strip_quotes(lexeme)).ok_or_else(|| invalid(LiteralKind::String))?;
                (LiteralKind::String, Value::String(value))
            }
            TokenKind::Identifier => match lexeme {
                "true" => (LiteralKind::Bool, Value::Bool(true)),
                "false" => (LiteralKind::Bool, Value::Bool(false)),
                _ => return Err(invalid(LiteralKind::Bool)),
            },
            found => {
                return Err(ParseError::ExpectedExpression {
                    found,
                    offset: token.offset,
                })
            }
        };

        Ok(Expr::Literal(Literal {
            kind,
            raw: lexeme.to_owned(),
            value,
        }))
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            Err(ParseError::TooDeep {
                limit: self.max_depth,
            })
        } else {
            Ok(())
        }
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expected.to_owned(),
            found: self.token.kind,
            offset: self.token.offset,
        }
    }

    /// Expects and consumes a token of kind `kind`. Signals an error if the
    /// next token is something else.
    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<()> {
        if self.check(kind) {
            self.bump()?;
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Expects and consumes an identifier, returning its name.
    fn expect_identifier(&mut self) -> Result<String> {
        if self.check(TokenKind::Identifier) {
            Ok(self.bump()?.lexeme.to_owned())
        } else {
            Err(self.unexpected("an identifier"))
        }
    }

    /// Consumes one token, returning it. Fails if the token that becomes the
    /// new lookahead is illegal.
    fn bump(&mut self) -> Result<Token<'a>> {
        let consumed = std::mem::replace(&mut self.token, self.scanner.scan_token());
        self.reject_illegal()?;
        Ok(consumed)
    }

    fn reject_illegal(&self) -> Result<()> {
        if self.check(TokenKind::Illegal) {
            Err(LexError {
                offset: self.token.offset,
                lexeme: self.token.lexeme.to_owned(),
            }
            .into())
        } else {
            Ok(())
        }
    }

    /// Checks if the next token is of kind `kind`.
    fn check(&self, kind: TokenKind) -> bool {
        self.token.kind == kind
    }

    /// Consumes the next token if it is of kind `kind`. Returns whether it
    /// was present.
    fn eat(&mut self, kind: TokenKind) -> Result<bool> {
        let is_present = self.check(kind);
        if is_present {
            self.bump()?;
        }
        Ok(is_present)
    }
}

fn strip_quotes(lexeme: &str) -> &str {
    if lexeme.len() >= 2 {
        &lexeme[1..lexeme.len() - 1]
    } else {
        ""
    }
}

fn unescape(body: &str) -> Option<String> {
    let mut text = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            text.push(escaped(chars.next()?)?);
        } else {
            text.push(ch);
        }
    }
    Some(text)
}

fn escaped(ch: char) -> Option<char> {
    let decoded = match ch {
        'a' => '\x07',
        'b' => '\x08',
        'f' => '\x0C',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\x0B',
        '\\' => '\\',
        '"' => '"',
        '0' => '\0',
        _ => return None,
    };
    Some(decoded)
}

fn single_char(text: &str) -> Option<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Some(ch),
        _ => None,
    }
}
