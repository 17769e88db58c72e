use super::{FormulaError, MAX_LENGTH};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Str(String),
    Ref(String),
    Ident(String),
    LParen,
    RParen,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Token {
    /// Short description used in syntax errors
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Number(n) => format!("number {n}"),
            Self::Str(s) => format!("string \"{s}\""),
            Self::Ref(r) => format!("column {{{r}}}"),
            Self::Ident(name) => format!("name {name}"),
            Self::LParen => "'('".into(),
            Self::RParen => "')'".into(),
            Self::Comma => "','".into(),
            Self::Plus => "'+'".into(),
            Self::Minus => "'-'".into(),
            Self::Star => "'*'".into(),
            Self::Slash => "'/'".into(),
            Self::Percent => "'%'".into(),
            Self::Amp => "'&'".into(),
            Self::Eq => "'='".into(),
            Self::Ne => "'!='".into(),
            Self::Lt => "'<'".into(),
            Self::Le => "'<='".into(),
            Self::Gt => "'>'".into(),
            Self::Ge => "'>='".into(),
        }
    }
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, FormulaError> {
    let chars: Vec<char> = source.chars().collect();
    if chars.len() > MAX_LENGTH {
        return Err(FormulaError::TooLong);
    }

    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < chars.len() {
        let c = chars[pos];
        let single = match c {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            ',' => Some(Token::Comma),
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '%' => Some(Token::Percent),
            '&' => Some(Token::Amp),
            '=' => Some(Token::Eq),
            _ => None,
        };
        if let Some(token) = single {
            tokens.push(token);
            pos += 1;
            continue;
        }

        let next = chars.get(pos + 1).copied();
        match c {
            c if c.is_whitespace() => pos += 1,
            '!' if next == Some('=') => {
                tokens.push(Token::Ne);
                pos += 2;
            }
            '<' => match next {
                Some('=') => {
                    tokens.push(Token::Le);
                    pos += 2;
                }
                Some('>') => {
                    tokens.push(Token::Ne);
                    pos += 2;
                }
                _ => {
                    tokens.push(Token::Lt);
                    pos += 1;
                }
            },
            '>' => {
                if next == Some('=') {
                    tokens.push(Token::Ge);
                    pos += 2;
                } else {
                    tokens.push(Token::Gt);
                    pos += 1;
                }
            }
            '"' => {
                let (text, end) = read_string(&chars, pos + 1)?;
                tokens.push(Token::Str(text));
                pos = end;
            }
            '{' => {
                let close = chars[pos + 1..]
                    .iter()
                    .position(|&c| c == '}')
                    .ok_or(FormulaError::UnterminatedReference)?;
                let name: String = chars[pos + 1..pos + 1 + close].iter().collect();
                tokens.push(Token::Ref(name.trim().to_string()));
                pos += close + 2;
            }
            c if c.is_ascii_digit() || (c == '.' && next.is_some_and(|n| n.is_ascii_digit())) => {
                let start = pos;
                while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
                    pos += 1;
                }
                let text: String = chars[start..pos].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| FormulaError::NotANumber(text.clone()))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = pos;
                while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                    pos += 1;
                }
                tokens.push(Token::Ident(chars[start..pos].iter().collect()));
            }
            other => return Err(FormulaError::UnexpectedChar(other, pos)),
        }
    }
    Ok(tokens)
}

/// Read a double-quoted string body starting after the opening quote
fn read_string(chars: &[char], mut pos: usize) -> Result<(String, usize), FormulaError> {
    let mut text = String::new();
    while let Some(&c) = chars.get(pos) {
        match c {
            '"' => return Ok((text, pos + 1)),
            '\\' => {
                let escaped = chars.get(pos + 1).ok_or(FormulaError::UnterminatedString)?;
                text.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => *other,
                });
                pos += 2;
            }
            c => {
                text.push(c);
                pos += 1;
            }
        }
    }
    Err(FormulaError::UnterminatedString)
}
