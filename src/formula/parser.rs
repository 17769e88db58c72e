use serde_json::Value;

use super::{eval::number, lexer::Token, FormulaError, MAX_DEPTH};

/// Parsed formula tree
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    Column(String),
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        function: Function,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Function {
    Sum,
    Min,
    Max,
    Avg,
    Round,
    Abs,
    If,
    Concat,
    Len,
    Upper,
    Lower,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_uppercase().as_str() {
            "SUM" => Self::Sum,
            "MIN" => Self::Min,
            "MAX" => Self::Max,
            "AVG" => Self::Avg,
            "ROUND" => Self::Round,
            "ABS" => Self::Abs,
            "IF" => Self::If,
            "CONCAT" => Self::Concat,
            "LEN" => Self::Len,
            "UPPER" => Self::Upper,
            "LOWER" => Self::Lower,
            _ => return None,
        })
    }

    /// Accepted argument counts (min, max) and how to phrase them in errors
    fn arity(self) -> (usize, usize, &'static str) {
        match self {
            Self::Sum | Self::Min | Self::Max | Self::Avg | Self::Concat => (0, usize::MAX, "any number of"),
            Self::Round => (1, 2, "1 or 2"),
            Self::If => (2, 3, "2 or 3"),
            Self::Abs | Self::Len | Self::Upper | Self::Lower => (1, 1, "1"),
        }
    }
}

pub(crate) fn parse(tokens: &[Token]) -> Result<Expr, FormulaError> {
    if tokens.is_empty() {
        return Err(FormulaError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.comparison()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(syntax("end of expression", Some(token))),
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<(), FormulaError> {
        match self.peek() {
            Some(token) if token == expected => {
                self.pos += 1;
                Ok(())
            }
            other => Err(syntax(&expected.describe(), other)),
        }
    }

    fn enter(&mut self) -> Result<(), FormulaError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(FormulaError::TooDeep);
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // Every fold deepens the left operand, so it counts against MAX_DEPTH
    // like a parenthesis would.
    fn comparison(&mut self) -> Result<Expr, FormulaError> {
        let depth = self.depth;
        let mut left = self.concat()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => BinaryOp::Eq,
                Some(Token::Ne) => BinaryOp::Ne,
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                _ => break,
            };
            self.pos += 1;
            self.enter()?;
            let right = self.concat()?;
            left = binary(op, left, right);
        }
        self.depth = depth;
        Ok(left)
    }

    fn concat(&mut self) -> Result<Expr, FormulaError> {
        let depth = self.depth;
        let mut left = self.additive()?;
        while self.peek() == Some(&Token::Amp) {
            self.pos += 1;
            self.enter()?;
            let right = self.additive()?;
            left = binary(BinaryOp::Concat, left, right);
        }
        self.depth = depth;
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, FormulaError> {
        let depth = self.depth;
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            self.enter()?;
            let right = self.multiplicative()?;
            left = binary(op, left, right);
        }
        self.depth = depth;
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr, FormulaError> {
        let depth = self.depth;
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => break,
            };
            self.pos += 1;
            self.enter()?;
            let right = self.unary()?;
            left = binary(op, left, right);
        }
        self.depth = depth;
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            self.enter()?;
            let operand = self.unary()?;
            self.leave();
            return Ok(Expr::Negate(Box::new(operand)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        let token = self.advance().cloned();
        match token {
            Some(Token::Number(n)) => Ok(Expr::Literal(number(n)?)),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::Ref(path)) => Ok(Expr::Column(path)),
            Some(Token::LParen) => {
                self.enter()?;
                let inner = self.comparison()?;
                self.expect(&Token::RParen)?;
                self.leave();
                Ok(inner)
            }
            Some(Token::Ident(name)) => match name.to_ascii_uppercase().as_str() {
                "TRUE" => Ok(Expr::Literal(Value::Bool(true))),
                "FALSE" => Ok(Expr::Literal(Value::Bool(false))),
                "NULL" => Ok(Expr::Literal(Value::Null)),
                _ => self.call(name),
            },
            other => Err(syntax("expression", other.as_ref())),
        }
    }

    fn call(&mut self, name: String) -> Result<Expr, FormulaError> {
        self.expect(&Token::LParen)?;
        let function = Function::from_name(&name)
            .ok_or_else(|| FormulaError::UnknownFunction(name.to_ascii_uppercase()))?;

        self.enter()?;
        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                args.push(self.comparison()?);
                if self.peek() == Some(&Token::Comma) {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        self.expect(&Token::RParen)?;
        self.leave();

        let (min, max, expected) = function.arity();
        if args.len() < min || args.len() > max {
            return Err(FormulaError::Arity {
                name: name.to_ascii_uppercase(),
                expected,
                got: args.len(),
            });
        }
        Ok(Expr::Call { function, args })
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn syntax(expected: &str, found: Option<&Token>) -> FormulaError {
    FormulaError::Syntax {
        expected: expected.to_string(),
        found: found.map_or_else(|| "end of expression".to_string(), Token::describe),
    }
}
