//! Hand-written tokenizer, grounded on `original_source/src/lexer.cpp`.

use crate::errors::{ExcKind, LexError};
use crate::token::{Kind, Token};

pub struct Lexer {
    source: Vec<u8>,
    pos: usize,
    line: i64,
}

type LexResult<T> = Result<T, LexError>;

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self { source: source.as_bytes().to_vec(), pos: 0, line: 1 }
    }

    /// Scans the whole source into a token stream terminated by an `Eof`
    /// token whose line is one past the last line seen.
    pub fn tokenize(mut self) -> LexResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            if self.at_end() {
                tokens.push(Token::new(Kind::Eof, "", self.line + 1));
                break;
            }
            tokens.push(self.next_token()?);
        }
        Ok(tokens)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn peek(&self) -> i64 {
        if self.at_end() {
            -1
        } else {
            self.source[self.pos] as i64
        }
    }

    fn peek_at(&self, offset: usize) -> i64 {
        let idx = self.pos + offset;
        if idx >= self.source.len() {
            -1
        } else {
            self.source[idx] as i64
        }
    }

    fn advance(&mut self) -> u8 {
        let c = self.source[self.pos];
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
        }
        c
    }

    fn is_ident_start(c: i64) -> bool {
        c == '_' as i64 || (c as u8 as char).is_ascii_alphabetic()
    }

    fn is_ident_continue(c: i64) -> bool {
        c >= 0 && ((c as u8 as char).is_ascii_alphanumeric() || c == '_' as i64)
    }

    fn is_digit(c: i64) -> bool {
        c >= 0 && (c as u8 as char).is_ascii_digit()
    }

    fn is_space(c: i64) -> bool {
        c >= 0 && matches!(c as u8, b' ' | b'\t' | b'\r' | b'\n')
    }

    fn skip_trivia(&mut self) {
        loop {
            if Self::is_space(self.peek()) {
                self.advance();
                continue;
            }
            if self.peek() == '/' as i64 && self.peek_at(1) == '/' as i64 {
                while !self.at_end() && self.peek() != '\n' as i64 {
                    self.advance();
                }
                continue;
            }
            if self.peek() == '/' as i64 && self.peek_at(1) == '*' as i64 {
                self.advance();
                self.advance();
                while !self.at_end() && !(self.peek() == '*' as i64 && self.peek_at(1) == '/' as i64) {
                    self.advance();
                }
                if !self.at_end() {
                    self.advance();
                    self.advance();
                }
                continue;
            }
            break;
        }
    }

    fn next_token(&mut self) -> LexResult<Token> {
        let line = self.line;
        let c = self.peek();
        if Self::is_ident_start(c) {
            return Ok(self.lex_ident(line));
        }
        if Self::is_digit(c) {
            return Ok(self.lex_number(line));
        }
        match c as u8 as char {
            '"' => self.lex_string(false, line),
            '`' => self.lex_string(true, line),
            '\'' => self.lex_char(line),
            _ => self.lex_symbol(line),
        }
    }

    fn lex_ident(&mut self, line: i64) -> Token {
        let start = self.pos;
        while Self::is_ident_continue(self.peek()) {
            self.advance();
        }
        let text = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
        let kind = Kind::keyword(&text).unwrap_or(Kind::Ident);
        Token::new(kind, text, line)
    }

    fn lex_number(&mut self, line: i64) -> Token {
        let start = self.pos;
        let mut is_float = false;
        while Self::is_digit(self.peek()) {
            self.advance();
        }
        if self.peek() == '.' as i64 && Self::is_digit(self.peek_at(1)) {
            is_float = true;
            self.advance();
            while Self::is_digit(self.peek()) {
                self.advance();
            }
        }
        let text = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
        Token::new(if is_float { Kind::Float } else { Kind::Num }, text, line)
    }

    fn lex_string(&mut self, long_str: bool, line: i64) -> LexResult<Token> {
        let delim = if long_str { b'`' } else { b'"' };
        self.advance();
        let start = self.pos;
        loop {
            if self.at_end() {
                return Err(LexError {
                    kind: ExcKind::StringExp,
                    message: "unterminated string literal".into(),
                    line,
                });
            }
            if self.peek() as u8 == delim {
                break;
            }
            if !long_str && self.peek() == '\n' as i64 {
                return Err(LexError {
                    kind: ExcKind::StringExp,
                    message: "newline in short string literal, use backticks for multi-line strings".into(),
                    line: self.line,
                });
            }
            self.advance();
        }
        let text = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
        self.advance(); // closing delimiter
        let mut literal = text;
        if long_str {
            literal.push('`');
        }
        Ok(Token::new(Kind::Str, literal, line))
    }

    fn lex_char(&mut self, line: i64) -> LexResult<Token> {
        self.advance(); // opening quote
        if self.peek() == '\'' as i64 || self.at_end() {
            return Err(LexError { kind: ExcKind::CharacterExp, message: "empty char literal".into(), line });
        }
        let c = self.advance();
        if self.peek() != '\'' as i64 {
            return Err(LexError {
                kind: ExcKind::CharacterExp,
                message: "char literal must contain exactly one character".into(),
                line,
            });
        }
        self.advance();
        Ok(Token::new(Kind::Char, (c as char).to_string(), line))
    }

    fn peek_emit(&mut self, expect: u8, kind: Kind, fallback: Kind, line: i64) -> Token {
        if self.peek_at(1) as u8 == expect && self.peek_at(1) >= 0 {
            self.advance();
            self.advance();
            Token::new(kind, "", line)
        } else {
            self.advance();
            Token::new(fallback, "", line)
        }
    }

    fn lex_symbol(&mut self, line: i64) -> LexResult<Token> {
        let c = self.peek();
        let tok = match c as u8 as char {
            '+' => {
                if self.peek_at(1) as u8 == b'=' {
                    self.advance();
                    self.advance();
                    Token::new(Kind::AsAdd, "", line)
                } else if self.peek_at(1) as u8 == b'+' {
                    self.advance();
                    self.advance();
                    Token::new(Kind::Increment, "", line)
                } else {
                    self.advance();
                    Token::new(Kind::Add, "", line)
                }
            }
            '-' => {
                if self.peek_at(1) as u8 == b'>' {
                    self.advance();
                    self.advance();
                    Token::new(Kind::RArrow, "", line)
                } else if self.peek_at(1) as u8 == b'-' {
                    self.advance();
                    self.advance();
                    Token::new(Kind::Decrement, "", line)
                } else if self.peek_at(1) as u8 == b'=' {
                    self.advance();
                    self.advance();
                    Token::new(Kind::AsSub, "", line)
                } else {
                    self.advance();
                    Token::new(Kind::Sub, "", line)
                }
            }
            '*' => self.peek_emit(b'=', Kind::AsMul, Kind::Mul, line),
            '/' => self.peek_emit(b'=', Kind::AsDiv, Kind::Div, line),
            '%' => self.peek_emit(b'=', Kind::AsSur, Kind::Sur, line),
            '<' => {
                if self.peek_at(1) as u8 == b'=' {
                    self.advance();
                    self.advance();
                    Token::new(Kind::LeEq, "", line)
                } else if self.peek_at(1) as u8 == b'-' {
                    self.advance();
                    self.advance();
                    Token::new(Kind::LArrow, "", line)
                } else if self.peek_at(1) as u8 == b'~' {
                    self.advance();
                    self.advance();
                    Token::new(Kind::LCurvedArrow, "", line)
                } else {
                    self.advance();
                    Token::new(Kind::Less, "", line)
                }
            }
            '>' => self.peek_emit(b'=', Kind::GrEq, Kind::Greater, line),
            '!' => self.peek_emit(b'=', Kind::BangEq, Kind::Bang, line),
            '=' => self.peek_emit(b'=', Kind::EqEq, Kind::Eq, line),
            '&' => {
                self.advance();
                Token::new(Kind::Addr, "", line)
            }
            '|' => {
                self.advance();
                Token::new(Kind::Or, "", line)
            }
            '.' => {
                self.advance();
                Token::new(Kind::Dot, "", line)
            }
            ',' => {
                self.advance();
                Token::new(Kind::Comma, "", line)
            }
            ':' => {
                self.advance();
                Token::new(Kind::Colon, "", line)
            }
            ';' => {
                self.advance();
                Token::new(Kind::Semicolon, "", line)
            }
            '$' => {
                self.advance();
                Token::new(Kind::Dollar, "", line)
            }
            '_' => {
                self.advance();
                Token::new(Kind::Underline, "", line)
            }
            '(' => {
                self.advance();
                Token::new(Kind::LParen, "", line)
            }
            ')' => {
                self.advance();
                Token::new(Kind::RParen, "", line)
            }
            '{' => {
                self.advance();
                Token::new(Kind::LBrace, "", line)
            }
            '}' => {
                self.advance();
                Token::new(Kind::RBrace, "", line)
            }
            '[' => {
                self.advance();
                Token::new(Kind::LBracket, "", line)
            }
            ']' => {
                self.advance();
                Token::new(Kind::RBracket, "", line)
            }
            other => {
                return Err(LexError {
                    kind: ExcKind::UnknownSymbol,
                    message: format!("unknown symbol '{other}'"),
                    line,
                });
            }
        };
        Ok(tok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Kind> {
        Lexer::new(src).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_keywords_and_identifiers() {
        assert_eq!(kinds("def x"), vec![Kind::Def, Kind::Ident, Kind::Eof]);
    }

    #[test]
    fn lexes_number_and_float() {
        let toks = Lexer::new("12 3.5").tokenize().unwrap();
        assert_eq!(toks[0].kind, Kind::Num);
        assert_eq!(toks[0].literal, "12");
        assert_eq!(toks[1].kind, Kind::Float);
        assert_eq!(toks[1].literal, "3.5");
    }

    #[test]
    fn lexes_short_string() {
        let toks = Lexer::new("\"hi there\"").tokenize().unwrap();
        assert_eq!(toks[0].kind, Kind::Str);
        assert_eq!(toks[0].literal, "hi there");
        assert!(!toks[0].is_long_string());
    }

    #[test]
    fn lexes_long_string_with_newline() {
        let toks = Lexer::new("`line one\nline two`").tokenize().unwrap();
        assert_eq!(toks[0].kind, Kind::Str);
        assert!(toks[0].is_long_string());
    }

    #[test]
    fn newline_in_short_string_errors() {
        let err = Lexer::new("\"abc\ndef\"").tokenize().unwrap_err();
        assert_eq!(err.kind, ExcKind::StringExp);
        assert!(err.message.contains("backtick"));
    }

    #[test]
    fn maximal_munch_compound_operators() {
        assert_eq!(kinds("+= -> <- <~ >= <= != =="), vec![
            Kind::AsAdd, Kind::RArrow, Kind::LArrow, Kind::LCurvedArrow,
            Kind::GrEq, Kind::LeEq, Kind::BangEq, Kind::EqEq, Kind::Eof,
        ]);
    }

    #[test]
    fn skips_comments() {
        assert_eq!(kinds("// comment\ndef /* block */ x"), vec![Kind::Def, Kind::Ident, Kind::Eof]);
    }

    #[test]
    fn unknown_symbol_errors() {
        let err = Lexer::new("@").tokenize().unwrap_err();
        assert_eq!(err.kind, ExcKind::UnknownSymbol);
    }

    #[test]
    fn char_literal_requires_exactly_one_char() {
        assert_eq!(kinds("'a'"), vec![Kind::Char, Kind::Eof]);
        assert!(Lexer::new("''").tokenize().is_err());
    }
}
