use std::str::CharIndices;

use itertools::{Itertools, MultiPeek};
use log::trace;

use crate::token::{Token, TokenKind};

type CharIter<'a> = MultiPeek<CharIndices<'a>>;

/// Lazily turns source text into tokens, one call to [`Scanner::scan_token`] at a
/// time. Malformed input never aborts the scan: it comes back as a
/// [`TokenKind::Illegal`] token whose lexeme is the offending text.
pub struct Scanner<'a> {
    source: &'a str,
    iter: CharIter<'a>,
    finished: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Scanner {
            source,
            iter: source.char_indices().multipeek(),
            finished: false,
        }
    }

    /// Scans the next token. Once the input is exhausted every call returns
    /// an `Eof` token.
    pub fn scan_token(&mut self) -> Token<'a> {
        self.skip_whitespace();

        let (start, char) = match self.iter.next() {
            Some(pair) => pair,
            None => return Token::new(TokenKind::Eof, "", self.source.len()),
        };

        let kind = match char {
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '-' => TokenKind::Minus,
            '+' => TokenKind::Plus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '^' => TokenKind::Caret,
            '~' => TokenKind::Tilde,
            '!' => self.either('=', TokenKind::BangEqual, TokenKind::Bang),
            // there is no assignment, so a lone '=' is illegal
            '=' => self.either('=', TokenKind::EqualEqual, TokenKind::Illegal),
            '&' => self.either('&', TokenKind::AmpAmp, TokenKind::Amp),
            '|' => self.either('|', TokenKind::PipePipe, TokenKind::Pipe),
            '<' => {
                if self.eat('=') {
                    TokenKind::LessEqual
                } else if self.eat('<') {
                    TokenKind::LessLess
                } else {
                    TokenKind::Less
                }
            }
            '>' => {
                if self.eat('=') {
                    TokenKind::GreaterEqual
                } else if self.eat('>') {
                    TokenKind::GreaterGreater
                } else {
                    TokenKind::Greater
                }
            }
            '"' => self.scan_string(),
            '\'' => self.scan_char(),
            '0'..='9' => self.scan_number(),
            'a'..='z' | 'A'..='Z' | '_' => self.scan_identifier(),
            _ => TokenKind::Illegal,
        };

        let end = self.position();
        let token = Token::new(kind, &self.source[start..end], start);
        trace!("scanned {:?}", token);
        token
    }

    /// Byte offset of the next unconsumed character.
    fn position(&mut self) -> usize {
        self.iter.reset_peek();
        let position = match self.iter.peek() {
            Some(&(idx, _)) => idx,
            None => self.source.len(),
        };
        self.iter.reset_peek();
        position
    }

    /// Returns true if there is another character to peek which matches the
    /// predicate, otherwise it returns false.
    fn peek_match<F>(&mut self, pred: F) -> bool
    where
        F: FnOnce(char) -> bool,
    {
        self.iter.reset_peek();
        match self.iter.peek() {
            Some(&(_, ch)) => pred(ch),
            None => false,
        }
    }

    /// Consumes the next character if it is `expected`.
    fn eat(&mut self, expected: char) -> bool {
        let is_present = self.peek_match(|ch| ch == expected);
        if is_present {
            self.iter.next();
        }
        is_present
    }

    fn either(&mut self, second: char, double: TokenKind, single: TokenKind) -> TokenKind {
        if self.eat(second) {
            double
        } else {
            single
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_match(is_space) {
            self.iter.next();
        }
    }

    fn skip_digits(&mut self) {
        while self.peek_match(|ch| ch.is_ascii_digit()) {
            self.iter.next();
        }
    }

    fn scan_number(&mut self) -> TokenKind {
        self.skip_digits();

        // Look for a fractional part
        self.iter.reset_peek();
        if matches!(self.iter.peek(), Some((_, '.'))) {
            self.iter.next();
            if !self.peek_match(|ch| ch.is_ascii_digit()) {
                return TokenKind::Illegal;
            }
            self.skip_digits();
            return TokenKind::Float;
        }

        TokenKind::Integer
    }

    fn scan_identifier(&mut self) -> TokenKind {
        while self.peek_match(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
            self.iter.next();
        }
        TokenKind::Identifier
    }

    /// Consumes the character following a backslash and reports whether it
    /// forms a known escape sequence.
    fn scan_escape(&mut self) -> bool {
        matches!(
            self.iter.next(),
            Some((_, 'a' | 'b' | 'f' | 'n' | 'r' | 't' | 'v' | '\\' | '"' | '0'))
        )
    }

    fn scan_string(&mut self) -> TokenKind {
        loop {
            match self.iter.next() {
                Some((_, '"')) => return TokenKind::String,
                Some((_, '\\')) => {
                    if !self.scan_escape() {
                        return TokenKind::Illegal;
                    }
                }
                Some(_) => {}
                None => return TokenKind::Illegal,
            }
        }
    }

    fn scan_char(&mut self) -> TokenKind {
        match self.iter.next() {
            Some((_, '\\')) => {
                if !self.scan_escape() {
                    return TokenKind::Illegal;
                }
            }
            Some((_, '\'')) | None => return TokenKind::Illegal,
            Some(_) => {}
        }

        if self.eat('\'') {
            TokenKind::Char
        } else {
            TokenKind::Illegal
        }
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Token<'a>;

    /// Yields every token up to and including the first `Eof`.
    fn next(&mut self) -> Option<Token<'a>> {
        if self.finished {
            return None;
        }
        let token = self.scan_token();
        self.finished = token.kind == TokenKind::Eof;
        Some(token)
    }
}

fn is_space(ch: char) -> bool {
    matches!(
        ch,
        ' ' | '\t' | '\n' | '\r' | '\x0C' | '\x0B' | '\u{85}' | '\u{A0}'
    )
}
