use crate::ast::{Document, Node, Prop, Value};
use crate::error::ParseError;
use crate::lexer::{Lexer, Spanned, Token};

/// Deepest node nesting accepted; the root is depth 1.
pub const MAX_DEPTH: usize = 256;

// ── Parser ────────────────────────────────────────────────────────────────

pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos).or_else(|| self.tokens.last())
    }

    fn position(&self) -> (usize, usize) {
        self.current().map(|t| (t.line, t.col)).unwrap_or((1, 1))
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).map(|t| &t.token).unwrap_or(&Token::Eof)
    }

    fn peek_ahead(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).map(|t| &t.token).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn err(&self, msg: impl Into<String>) -> ParseError {
        let (line, col) = self.position();
        ParseError::at(line, col, msg)
    }

    // ── Document ──────────────────────────────────────────────────────────

    pub fn parse_document(&mut self) -> Result<Document, ParseError> {
        if self.peek() == &Token::Eof {
            return Err(self.err("document is empty"));
        }
        let root = self.parse_node(1)?;
        if self.peek() != &Token::Eof {
            return Err(self.err("a document has exactly one root node"));
        }
        Ok(Document { root })
    }

    // ── Node ──────────────────────────────────────────────────────────────

    fn parse_node(&mut self, depth: usize) -> Result<Node, ParseError> {
        let (line, col) = self.position();
        if depth > MAX_DEPTH {
            return Err(ParseError::at(line, col, format!("nodes nested deeper than {MAX_DEPTH} levels")));
        }
        let kind = match self.advance() {
            Token::Ident(s) => s,
            tok => return Err(ParseError::at(line, col, format!("expected a node name, got {tok:?}"))),
        };

        if self.peek() != &Token::LBrace {
            return Ok(Node { kind, props: Vec::new(), children: Vec::new(), line, col });
        }
        self.advance();

        let mut props = Vec::new();
        let mut children = Vec::new();
        loop {
            match self.peek() {
                Token::RBrace => {
                    self.advance();
                    break;
                }
                Token::Eof => return Err(ParseError::at(line, col, format!("unclosed '{{' for {kind}"))),
                // `key:` is a property, anything else starting with a name is a child.
                Token::Ident(_) if self.peek_ahead(1) == &Token::Colon => props.push(self.parse_prop()?),
                Token::Ident(_) => children.push(self.parse_node(depth + 1)?),
                tok => {
                    return Err(self.err(format!(
                        "unexpected {tok:?} inside {kind}; expected `key: value` or a child node"
                    )));
                }
            }
        }

        Ok(Node { kind, props, children, line, col })
    }

    fn parse_prop(&mut self) -> Result<Prop, ParseError> {
        let (line, col) = self.position();
        let Token::Ident(key) = self.advance() else {
            return Err(ParseError::at(line, col, "expected a property name"));
        };
        self.advance(); // `:`

        let value = match self.advance() {
            Token::Number(n) => Value::Number(n),
            Token::Percent(p) => Value::Percent(p),
            Token::Color(c) => Value::Color(c),
            Token::Ident(s) => Value::Ident(s),
            Token::Str(s) => Value::Str(s),
            tok => return Err(self.err(format!("expected a value for `{key}`, got {tok:?}"))),
        };

        Ok(Prop { key, value, line, col })
    }
}

/// Parses a `.tsn` source string into a [`Document`].
pub fn parse_str(src: &str) -> Result<Document, ParseError> {
    let tokens = Lexer::new(src).tokenize()?;
    Parser::new(tokens).parse_document()
}
