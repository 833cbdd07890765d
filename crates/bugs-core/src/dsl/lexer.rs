//! Lexer for the Bugs language
//!
//! Produces tokens one at a time on demand. Newlines are significant and
//! come out as `Eol` tokens; comments and other whitespace are skipped.
//! Exactly one token may be pushed back.

use serde::{Deserialize, Serialize};

/// Every reserved word of the language, including the color names.
pub const KEYWORDS: &[&str] = &[
    "Allbugs", "Bug", "case", "color", "define", "do", "exit", "if", "initially", "line", "loop",
    "move", "moveto", "return", "switch", "turn", "turnto", "using", "var",
    // colors
    "black", "blue", "brown", "cyan", "darkGray", "gray", "green", "lightGray", "magenta", "none",
    "orange", "pink", "purple", "red", "white", "yellow",
];

/// Token classes recognized by the lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    Name,
    Keyword,
    Number,
    Symbol,
    Eol,
    Eof,
}

/// A token together with the line it was read on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
        }
    }

    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }
}

/// Returns true if `word` is reserved.
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Canonical text form of a numeric literal (`5` becomes `5.0`).
pub fn canonical_number(value: f64) -> String {
    format!("{:?}", value)
}

/// Lazy tokenizer with single-token pushback
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    last: Option<Token>,
    pushed_back: Option<Token>,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            last: None,
            pushed_back: None,
        }
    }

    /// Line number used for diagnostics.
    ///
    /// Counts the `Eol` tokens handed out so far, so it moves back when an
    /// `Eol` is pushed back.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Read every remaining token, including the trailing `Eof`.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Token {
        let token = match self.pushed_back.take() {
            Some(token) => token,
            None => self.scan(),
        };
        if token.kind == TokenKind::Eol {
            self.line += 1;
        }
        self.last = Some(token.clone());
        token
    }

    /// Un-read the most recently returned token. Only one level is kept.
    pub fn push_back(&mut self) {
        if let Some(token) = self.last.take() {
            if token.kind == TokenKind::Eol {
                self.line -= 1;
            }
            self.pushed_back = Some(token);
        }
    }

    fn scan(&mut self) -> Token {
        self.skip_trivia();

        let line = self.line;
        let Some(ch) = self.current_char() else {
            return Token::new(TokenKind::Eof, "EOF", line);
        };

        match ch {
            '\n' => {
                self.advance();
                Token::new(TokenKind::Eol, "\n", line)
            }
            '\r' => {
                self.advance();
                if self.current_char() == Some('\n') {
                    self.advance();
                }
                Token::new(TokenKind::Eol, "\n", line)
            }
            c if c.is_ascii_digit() => {
                let value = self.read_number();
                Token::new(TokenKind::Number, canonical_number(value), line)
            }
            c if c.is_alphabetic() => {
                let word = self.read_word();
                let kind = if is_keyword(&word) {
                    TokenKind::Keyword
                } else {
                    TokenKind::Name
                };
                Token::new(kind, word, line)
            }
            c => {
                self.advance();
                Token::new(TokenKind::Symbol, c.to_string(), line)
            }
        }
    }

    /// Skip blanks and comments, stopping at a newline.
    fn skip_trivia(&mut self) {
        while let Some(ch) = self.current_char() {
            match ch {
                '\n' | '\r' => return,
                '/' if self.peek_char() == Some('/') => {
                    while let Some(c) = self.current_char() {
                        if c == '\n' || c == '\r' {
                            break;
                        }
                        self.advance();
                    }
                }
                '/' if self.peek_char() == Some('*') => {
                    self.advance();
                    self.advance();
                    // unterminated comments run to end of input
                    while let Some(c) = self.current_char() {
                        if c == '*' && self.peek_char() == Some('/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        if c == '\n' {
                            self.line += 1;
                        }
                        self.advance();
                    }
                }
                c if c.is_whitespace() => self.advance(),
                _ => return,
            }
        }
    }

    fn read_number(&mut self) -> f64 {
        let mut text = String::new();
        let mut seen_dot = false;
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                text.push(ch);
            } else if ch == '.' && !seen_dot {
                seen_dot = true;
                text.push(ch);
            } else {
                break;
            }
            self.advance();
        }
        if text.ends_with('.') {
            text.push('0');
        }
        // digits with at most one dot always parse
        text.parse().unwrap_or_default()
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        word
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        if self.position < self.input.len() {
            self.position += 1;
        }
    }
}
