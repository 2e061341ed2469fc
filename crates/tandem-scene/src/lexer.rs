use crate::error::ParseError;

// ── Token ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Str(String),
    Number(f32),
    Percent(f32),
    /// `#rrggbb` / `#rrggbbaa`, straight alpha.
    Color([u8; 4]),
    Colon,
    LBrace,
    RBrace,
    Eof,
}

/// A token plus the 1-based position of its first character.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
    pub col: usize,
}

// ── Lexer ─────────────────────────────────────────────────────────────────

pub struct Lexer<'s> {
    src: &'s str,
    pos: usize,
    line: usize,
    col: usize,
}

impl<'s> Lexer<'s> {
    pub fn new(src: &'s str) -> Self {
        Self { src, pos: 0, line: 1, col: 1 }
    }

    pub fn tokenize(mut self) -> Result<Vec<Spanned>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let (line, col) = (self.line, self.col);
            let token = self.next_token()?;
            let eof = token == Token::Eof;
            tokens.push(Spanned { token, line, col });
            if eof {
                return Ok(tokens);
            }
        }
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn error(&self, msg: impl Into<String>) -> ParseError {
        ParseError::at(self.line, self.col, msg)
    }

    /// Whitespace, `//` line comments and `/* */` block comments.
    fn skip_trivia(&mut self) {
        loop {
            while matches!(self.peek(), Some(c) if c.is_whitespace()) {
                self.bump();
            }
            if self.rest().starts_with("//") {
                while !matches!(self.peek(), None | Some('\n')) {
                    self.bump();
                }
            } else if self.rest().starts_with("/*") {
                self.bump();
                self.bump();
                while !self.rest().is_empty() && !self.rest().starts_with("*/") {
                    self.bump();
                }
                // unterminated comments simply run to EOF
                self.bump();
                self.bump();
            } else {
                return;
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        let Some(ch) = self.peek() else {
            return Ok(Token::Eof);
        };

        match ch {
            ':' => { self.bump(); Ok(Token::Colon) }
            '{' => { self.bump(); Ok(Token::LBrace) }
            '}' => { self.bump(); Ok(Token::RBrace) }
            '"' => self.string(),
            '#' => self.color(),
            c if c.is_ascii_digit() || c == '-' || c == '.' => self.number(),
            c if c.is_alphabetic() || c == '_' => Ok(self.ident()),
            other => Err(self.error(format!("unexpected character {other:?}"))),
        }
    }

    fn string(&mut self) -> Result<Token, ParseError> {
        let (line, col) = (self.line, self.col);
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(ParseError::at(line, col, "unterminated string literal")),
                Some('"') => return Ok(Token::Str(out)),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => return Err(ParseError::at(line, col, "unterminated escape sequence")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn color(&mut self) -> Result<Token, ParseError> {
        self.bump();
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
            self.bump();
        }
        let hex = &self.src[start..self.pos];
        if hex.len() != 6 && hex.len() != 8 {
            return Err(self.error(format!(
                "color literal must be #rrggbb or #rrggbbaa, got {} digits",
                hex.len()
            )));
        }

        let mut rgba = [255u8; 4];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk).unwrap_or("00");
            rgba[i] = u8::from_str_radix(pair, 16)
                .map_err(|_| self.error(format!("invalid color component {pair:?}")))?;
        }
        Ok(Token::Color(rgba))
    }

    fn number(&mut self) -> Result<Token, ParseError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
            self.bump();
        }
        let text = &self.src[start..self.pos];
        let value = text
            .parse::<f32>()
            .map_err(|_| self.error(format!("invalid number {text:?}")))?;

        if self.peek() == Some('%') {
            self.bump();
            return Ok(Token::Percent(value));
        }
        Ok(Token::Number(value))
    }

    fn ident(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        Token::Ident(self.src[start..self.pos].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        Lexer::new(src).tokenize().unwrap().into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn positions_track_lines() {
        let toks = Lexer::new("Scene {\n  x: 4\n}").tokenize().unwrap();
        let x = toks.iter().find(|t| t.token == Token::Ident("x".into())).unwrap();
        assert_eq!((x.line, x.col), (2, 3));
    }

    #[test]
    fn percent_suffix() {
        assert_eq!(kinds("50%"), vec![Token::Percent(50.0), Token::Eof]);
    }

    #[test]
    fn six_digit_color_is_opaque() {
        assert_eq!(kinds("#102030"), vec![Token::Color([0x10, 0x20, 0x30, 0xff]), Token::Eof]);
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(kinds("// a\n/* b */ Rect"), vec![Token::Ident("Rect".into()), Token::Eof]);
    }

    #[test]
    fn bad_character_reports_position() {
        let err = Lexer::new("Scene {\n  @\n}").tokenize().unwrap_err();
        assert_eq!((err.line, err.col), (2, 3));
    }
}
