/// Lexer for the packet descriptor language.
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Struct,
    Packet,
    List,
    BoxKw,

    // Literals
    Ident(String),
    Integer(u64),

    // Punctuation
    Colon,
    Comma,
    At,
    Eq,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LAngle,
    RAngle,

    // Special
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Struct => write!(f, "struct"),
            Token::Packet => write!(f, "packet"),
            Token::List => write!(f, "list"),
            Token::BoxKw => write!(f, "box"),
            Token::Ident(s) => write!(f, "{s}"),
            Token::Integer(n) => write!(f, "{n}"),
            Token::Colon => write!(f, ":"),
            Token::Comma => write!(f, ","),
            Token::At => write!(f, "@"),
            Token::Eq => write!(f, "="),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LAngle => write!(f, "<"),
            Token::RAngle => write!(f, ">"),
            Token::Eof => write!(f, "EOF"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpannedToken {
    pub token: Token,
    pub line: usize,
    pub col: usize,
}

pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<SpannedToken>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.token == Token::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek_byte(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_second(&self) -> Option<u8> {
        self.input.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.input.get(self.pos).copied()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(b)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            while let Some(b) = self.peek_byte() {
                if b.is_ascii_whitespace() {
                    self.advance();
                } else {
                    break;
                }
            }

            match (self.peek_byte(), self.peek_second()) {
                (Some(b'/'), Some(b'/')) => {
                    while let Some(b) = self.advance() {
                        if b == b'\n' {
                            break;
                        }
                    }
                }
                (Some(b'/'), Some(b'*')) => {
                    let (line, col) = (self.line, self.col);
                    self.advance();
                    self.advance();
                    loop {
                        match self.advance() {
                            None => {
                                return Err(LexError {
                                    line,
                                    col,
                                    message: "unterminated block comment".to_string(),
                                });
                            }
                            Some(b'*') if self.peek_byte() == Some(b'/') => {
                                self.advance();
                                break;
                            }
                            _ => {}
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<SpannedToken, LexError> {
        self.skip_whitespace_and_comments()?;

        let line = self.line;
        let col = self.col;

        let Some(b) = self.peek_byte() else {
            return Ok(SpannedToken {
                token: Token::Eof,
                line,
                col,
            });
        };

        let punct = match b {
            b':' => Some(Token::Colon),
            b',' => Some(Token::Comma),
            b'@' => Some(Token::At),
            b'=' => Some(Token::Eq),
            b'{' => Some(Token::LBrace),
            b'}' => Some(Token::RBrace),
            b'[' => Some(Token::LBracket),
            b']' => Some(Token::RBracket),
            b'<' => Some(Token::LAngle),
            b'>' => Some(Token::RAngle),
            _ => None,
        };

        if let Some(token) = punct {
            self.advance();
            return Ok(SpannedToken { token, line, col });
        }

        if b.is_ascii_digit() {
            let value = self.lex_integer(line, col)?;
            return Ok(SpannedToken {
                token: Token::Integer(value),
                line,
                col,
            });
        }

        if b.is_ascii_alphabetic() || b == b'_' {
            let start = self.pos;
            while let Some(c) = self.peek_byte() {
                if c.is_ascii_alphanumeric() || c == b'_' {
                    self.advance();
                } else {
                    break;
                }
            }
            // Identifiers are ASCII by construction.
            let word = String::from_utf8_lossy(&self.input[start..self.pos]);
            let token = match word.as_ref() {
                "struct" => Token::Struct,
                "packet" => Token::Packet,
                "list" => Token::List,
                "box" => Token::BoxKw,
                other => Token::Ident(other.to_string()),
            };
            return Ok(SpannedToken { token, line, col });
        }

        Err(LexError {
            line,
            col,
            message: format!("unexpected character: '{}'", b as char),
        })
    }

    /// Decimal, or hexadecimal with a `0x` prefix.
    fn lex_integer(&mut self, line: usize, col: usize) -> Result<u64, LexError> {
        let overflow = || LexError {
            line,
            col,
            message: "integer literal out of range".to_string(),
        };

        let radix = if self.peek_byte() == Some(b'0')
            && matches!(self.peek_second(), Some(b'x' | b'X'))
        {
            self.advance();
            self.advance();
            16
        } else {
            10
        };

        let mut value = 0u64;
        let mut digits = 0;
        while let Some(d) = self.peek_byte() {
            let Some(digit) = (d as char).to_digit(radix) else {
                break;
            };
            value = value
                .checked_mul(u64::from(radix))
                .and_then(|v| v.checked_add(u64::from(digit)))
                .ok_or_else(overflow)?;
            digits += 1;
            self.advance();
        }

        if digits == 0 {
            return Err(LexError {
                line,
                col,
                message: "expected hex digits after 0x".to_string(),
            });
        }
        Ok(value)
    }
}

#[derive(Debug, Clone)]
pub struct LexError {
    pub line: usize,
    pub col: usize,
    pub message: String,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.col, self.message)
    }
}

impl std::error::Error for LexError {}
