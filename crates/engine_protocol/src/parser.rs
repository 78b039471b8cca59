/// Recursive-descent parser for the packet descriptor language.
///
/// ```text
/// file   := item*
/// item   := ("struct" Ident | "packet" Ident "@" Integer) "{" field,* "}"
/// field  := Ident ":" type tags?
/// type   := "list" "<" type ">" | "box" "<" type ">" | Ident
/// tags   := "[" (Ident "=" Ident),* "]"
/// ```
use crate::ast::*;
use crate::lexer::{LexError, Lexer, SpannedToken, Token};
use std::fmt;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ParseError {
    pub line: usize,
    pub col: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.col, self.message)
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        Self {
            line: e.line,
            col: e.col,
            message: e.message,
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    pub fn parse(input: &str) -> Result<File, ParseError> {
        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize()?;
        let mut parser = Self { tokens, pos: 0 };
        parser.parse_file()
    }

    // -- Helpers --

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn error(&self, message: String) -> ParseError {
        let t = &self.tokens[self.pos];
        ParseError {
            line: t.line,
            col: t.col,
            message,
        }
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ParseError> {
        if self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {expected}, got {}", self.peek())))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.peek().clone() {
            Token::Ident(s) => {
                self.advance();
                Ok(s)
            }
            other => Err(self.error(format!("expected identifier, got {other}"))),
        }
    }

    fn expect_integer(&mut self) -> Result<u64, ParseError> {
        match self.peek().clone() {
            Token::Integer(n) => {
                self.advance();
                Ok(n)
            }
            other => Err(self.error(format!("expected integer, got {other}"))),
        }
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    // -- Top-level --

    fn parse_file(&mut self) -> Result<File, ParseError> {
        let mut items = Vec::new();
        while !self.at(&Token::Eof) {
            items.push(self.parse_item()?);
        }
        Ok(File { items })
    }

    fn parse_item(&mut self) -> Result<StructDef, ParseError> {
        let packet_id = match self.peek() {
            Token::Struct => {
                self.advance();
                None
            }
            Token::Packet => {
                self.advance();
                Some(())
            }
            other => {
                return Err(self.error(format!("expected 'struct' or 'packet', got {other}")));
            }
        };

        let name = self.expect_ident()?;
        let packet_id = match packet_id {
            Some(()) => {
                self.expect(&Token::At)?;
                let raw = self.expect_integer()?;
                let id = i32::try_from(raw)
                    .map_err(|_| self.error(format!("packet id {raw} does not fit a VarInt")))?;
                Some(id)
            }
            None => None,
        };

        self.expect(&Token::LBrace)?;
        let mut fields = Vec::new();
        while !self.at(&Token::RBrace) {
            fields.push(self.parse_field()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RBrace)?;

        Ok(StructDef {
            name,
            packet_id,
            fields,
        })
    }

    // -- Fields --

    fn parse_field(&mut self) -> Result<FieldDef, ParseError> {
        let name = self.expect_ident()?;
        self.expect(&Token::Colon)?;
        let ty = self.parse_type_expr()?;
        let tags = if self.at(&Token::LBracket) {
            self.parse_tags()?
        } else {
            Tags::default()
        };
        Ok(FieldDef { name, ty, tags })
    }

    fn parse_tags(&mut self) -> Result<Tags, ParseError> {
        self.expect(&Token::LBracket)?;
        let mut tags = Tags::default();
        while !self.at(&Token::RBracket) {
            let key = self.expect_ident()?;
            self.expect(&Token::Eq)?;
            match key.as_str() {
                "length" => {
                    if tags.length.is_some() {
                        return Err(self.error("duplicate 'length' tag".to_string()));
                    }
                    tags.length = Some(self.parse_type_expr()?);
                }
                "as" => {
                    if tags.encoding.is_some() {
                        return Err(self.error("duplicate 'as' tag".to_string()));
                    }
                    let value = self.expect_ident()?;
                    tags.encoding = Some(match value.as_str() {
                        "json" => Encoding::Json,
                        "raw" => Encoding::Raw,
                        other => {
                            return Err(self.error(format!(
                                "unknown encoding '{other}', expected json or raw"
                            )));
                        }
                    });
                }
                other => return Err(self.error(format!("unknown tag '{other}'"))),
            }
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RBracket)?;
        Ok(tags)
    }

    // -- Type expression --

    fn parse_type_expr(&mut self) -> Result<TypeExpr, ParseError> {
        match self.peek().clone() {
            Token::List => {
                self.advance();
                Ok(TypeExpr::List(Box::new(self.parse_type_argument()?)))
            }
            Token::BoxKw => {
                self.advance();
                Ok(TypeExpr::Boxed(Box::new(self.parse_type_argument()?)))
            }
            Token::Ident(name) => {
                self.advance();
                Ok(match Primitive::from_name(&name) {
                    Some(p) => TypeExpr::Primitive(p),
                    None => TypeExpr::Named(name),
                })
            }
            other => Err(self.error(format!("expected type expression, got {other}"))),
        }
    }

    fn parse_type_argument(&mut self) -> Result<TypeExpr, ParseError> {
        self.expect(&Token::LAngle)?;
        let inner = self.parse_type_expr()?;
        self.expect(&Token::RAngle)?;
        Ok(inner)
    }
}
