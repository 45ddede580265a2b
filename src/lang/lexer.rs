//! Tokenizer for the submission subset.
//!
//! Indentation-sensitive: block structure is delivered as `Indent` and
//! `Dedent` tokens, with newlines suppressed inside brackets.

use crate::lang::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub line: u32,
    pub kind: TokKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokKind {
    Newline,
    Indent,
    Dedent,
    Eof,

    Name(String),
    Kw(Kw),
    Int(i64),
    Float(f64),
    Imag(f64),
    Str(String),
    Bytes(Vec<u8>),

    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    EqEq,
    NotEq,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    DoubleSlashAssign,
    PercentAssign,
    DoubleStarAssign,
    AmpAssign,
    PipeAssign,
    CaretAssign,
    ShlAssign,
    ShrAssign,
    Arrow,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Semi,
}

/// Reserved words. Everything Python reserves is reserved here too, so
/// constructs outside the subset fail with a clear parse error instead of
/// silently lexing as names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kw {
    Def,
    Return,
    If,
    Elif,
    Else,
    While,
    For,
    In,
    And,
    Or,
    Not,
    Pass,
    Break,
    Continue,
    Import,
    From,
    As,
    Raise,
    Try,
    Except,
    Finally,
    Lambda,
    True,
    False,
    None,
    Is,
    Class,
    With,
    Yield,
    Assert,
    Del,
    Global,
    Nonlocal,
    Async,
    Await,
}

fn keyword(name: &str) -> Option<Kw> {
    Some(match name {
        "def" => Kw::Def,
        "return" => Kw::Return,
        "if" => Kw::If,
        "elif" => Kw::Elif,
        "else" => Kw::Else,
        "while" => Kw::While,
        "for" => Kw::For,
        "in" => Kw::In,
        "and" => Kw::And,
        "or" => Kw::Or,
        "not" => Kw::Not,
        "pass" => Kw::Pass,
        "break" => Kw::Break,
        "continue" => Kw::Continue,
        "import" => Kw::Import,
        "from" => Kw::From,
        "as" => Kw::As,
        "raise" => Kw::Raise,
        "try" => Kw::Try,
        "except" => Kw::Except,
        "finally" => Kw::Finally,
        "lambda" => Kw::Lambda,
        "True" => Kw::True,
        "False" => Kw::False,
        "None" => Kw::None,
        "is" => Kw::Is,
        "class" => Kw::Class,
        "with" => Kw::With,
        "yield" => Kw::Yield,
        "assert" => Kw::Assert,
        "del" => Kw::Del,
        "global" => Kw::Global,
        "nonlocal" => Kw::Nonlocal,
        "async" => Kw::Async,
        "await" => Kw::Await,
        _ => return None,
    })
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    paren_depth: usize,
    indent_stack: Vec<usize>,
    at_line_start: bool,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            paren_depth: 0,
            indent_stack: vec![0],
            at_line_start: true,
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn push(&mut self, kind: TokKind) {
        self.tokens.push(Token {
            line: self.line,
            kind,
        });
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            line: self.line,
            message: message.into(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        loop {
            if self.at_line_start && self.paren_depth == 0 {
                if !self.handle_indentation()? {
                    break;
                }
            }
            match self.peek() {
                None => break,
                Some(' ') | Some('\t') => {
                    self.pos += 1;
                }
                Some('\r') => {
                    self.pos += 1;
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                Some('\\') if self.peek_at(1) == Some('\n') => {
                    self.pos += 2;
                    self.line += 1;
                }
                Some('\n') => {
                    self.pos += 1;
                    if self.paren_depth == 0 {
                        // Collapse runs of blank lines into one Newline.
                        if !matches!(
                            self.tokens.last().map(|t| &t.kind),
                            Some(TokKind::Newline) | Some(TokKind::Indent) | None
                        ) {
                            self.push(TokKind::Newline);
                        }
                        self.at_line_start = true;
                    }
                    self.line += 1;
                }
                Some(c) if c.is_ascii_digit() => self.lex_number()?,
                Some('.') if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                    self.lex_number()?
                }
                Some(c) if c.is_alphabetic() || c == '_' => self.lex_name_or_string()?,
                Some('"') | Some('\'') => {
                    let text = self.lex_string(false)?;
                    self.push(TokKind::Str(text));
                }
                Some(_) => self.lex_operator()?,
            }
        }

        if !matches!(
            self.tokens.last().map(|t| &t.kind),
            Some(TokKind::Newline) | None
        ) {
            self.push(TokKind::Newline);
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.push(TokKind::Dedent);
        }
        self.push(TokKind::Eof);
        Ok(self.tokens)
    }

    /// Measure leading whitespace of the next logical line; emit
    /// Indent/Dedent. Returns false at end of input.
    fn handle_indentation(&mut self) -> Result<bool, ParseError> {
        loop {
            let mut width = 0usize;
            let mut scan = self.pos;
            while let Some(&c) = self.chars.get(scan) {
                match c {
                    ' ' => width += 1,
                    '\t' => width = (width / 8 + 1) * 8,
                    _ => break,
                }
                scan += 1;
            }
            match self.chars.get(scan) {
                // Blank or comment-only lines carry no block structure.
                Some('\n') => {
                    self.pos = scan + 1;
                    self.line += 1;
                    continue;
                }
                Some('\r') => {
                    self.pos = scan + 1;
                    continue;
                }
                Some('#') => {
                    self.pos = scan;
                    while let Some(c) = self.peek() {
                        self.pos += 1;
                        if c == '\n' {
                            self.line += 1;
                            break;
                        }
                    }
                    if self.peek().is_none() {
                        return Ok(false);
                    }
                    continue;
                }
                None => return Ok(false),
                Some(_) => {
                    self.pos = scan;
                    self.at_line_start = false;
                    let current = *self.indent_stack.last().unwrap();
                    if width > current {
                        self.indent_stack.push(width);
                        self.push(TokKind::Indent);
                    } else if width < current {
                        while width < *self.indent_stack.last().unwrap() {
                            self.indent_stack.pop();
                            self.push(TokKind::Dedent);
                        }
                        if width != *self.indent_stack.last().unwrap() {
                            return Err(self.error(
                                "unindent does not match any outer indentation level",
                            ));
                        }
                    }
                    return Ok(true);
                }
            }
        }
    }

    fn lex_name_or_string(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let name: String = self.chars[start..self.pos].iter().collect();

        // String prefixes: r"", b"", rb"" and friends.
        if matches!(self.peek(), Some('"') | Some('\'')) {
            let lowered = name.to_ascii_lowercase();
            match lowered.as_str() {
                "r" => {
                    let text = self.lex_string(true)?;
                    self.push(TokKind::Str(text));
                    return Ok(());
                }
                "b" | "rb" | "br" => {
                    let raw = lowered.contains('r');
                    let text = self.lex_string(raw)?;
                    if !text.is_ascii() {
                        return Err(self.error("bytes literal must contain ASCII characters"));
                    }
                    self.push(TokKind::Bytes(text.into_bytes()));
                    return Ok(());
                }
                "f" | "rf" | "fr" => {
                    return Err(self.error("f-strings are not supported"));
                }
                _ => {}
            }
        }

        match keyword(&name) {
            Some(kw) => self.push(TokKind::Kw(kw)),
            None => self.push(TokKind::Name(name)),
        }
        Ok(())
    }

    fn lex_string(&mut self, raw: bool) -> Result<String, ParseError> {
        let quote = self.bump().unwrap();
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.pos += 2;
        }

        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string literal")),
                Some('\n') if !triple => {
                    return Err(self.error("unterminated string literal"));
                }
                Some('\n') => {
                    self.line += 1;
                    out.push('\n');
                }
                Some(c) if c == quote => {
                    if !triple {
                        return Ok(out);
                    }
                    if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                        self.pos += 2;
                        return Ok(out);
                    }
                    out.push(c);
                }
                Some('\\') if !raw => match self.bump() {
                    None => return Err(self.error("unterminated string literal")),
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('\\') => out.push('\\'),
                    Some('\'') => out.push('\''),
                    Some('"') => out.push('"'),
                    Some('0') => out.push('\0'),
                    Some('\n') => {
                        self.line += 1;
                    }
                    Some('x') => {
                        let hi = self.bump();
                        let lo = self.bump();
                        let (Some(hi), Some(lo)) = (hi, lo) else {
                            return Err(self.error("truncated \\x escape"));
                        };
                        let value = u8::from_str_radix(&format!("{hi}{lo}"), 16)
                            .map_err(|_| self.error("invalid \\x escape"))?;
                        out.push(value as char);
                    }
                    // Unknown escapes keep the backslash, as the source
                    // language does.
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn lex_number(&mut self) -> Result<(), ParseError> {
        let start = self.pos;

        if self.peek() == Some('0')
            && matches!(
                self.peek_at(1),
                Some('x') | Some('X') | Some('o') | Some('O') | Some('b') | Some('B')
            )
        {
            let radix = match self.peek_at(1).unwrap().to_ascii_lowercase() {
                'x' => 16,
                'o' => 8,
                _ => 2,
            };
            self.pos += 2;
            let digits_start = self.pos;
            while let Some(c) = self.peek() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    self.pos += 1;
                } else {
                    break;
                }
            }
            let digits: String = self.chars[digits_start..self.pos]
                .iter()
                .filter(|&&c| c != '_')
                .collect();
            let value = i64::from_str_radix(&digits, radix)
                .map_err(|_| self.error("invalid integer literal"))?;
            self.push(TokKind::Int(value));
            return Ok(());
        }

        let mut is_float = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.peek() == Some('.') && self.peek_at(1) != Some('.') {
            is_float = true;
            self.pos += 1;
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() || c == '_' {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        if matches!(self.peek(), Some('e') | Some('E'))
            && (self.peek_at(1).is_some_and(|c| c.is_ascii_digit())
                || (matches!(self.peek_at(1), Some('+') | Some('-'))
                    && self.peek_at(2).is_some_and(|c| c.is_ascii_digit())))
        {
            is_float = true;
            self.pos += 1;
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.pos += 1;
            }
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }

        let text: String = self.chars[start..self.pos]
            .iter()
            .filter(|&&c| c != '_')
            .collect();

        if matches!(self.peek(), Some('j') | Some('J')) {
            self.pos += 1;
            let value: f64 = text
                .parse()
                .map_err(|_| self.error("invalid imaginary literal"))?;
            self.push(TokKind::Imag(value));
            return Ok(());
        }

        if is_float {
            let value: f64 = text
                .parse()
                .map_err(|_| self.error("invalid float literal"))?;
            self.push(TokKind::Float(value));
        } else {
            let value: i64 = text
                .parse()
                .map_err(|_| self.error("integer literal too large"))?;
            self.push(TokKind::Int(value));
        }
        Ok(())
    }

    fn lex_operator(&mut self) -> Result<(), ParseError> {
        let c = self.bump().unwrap();
        let next = self.peek();
        let kind = match (c, next) {
            ('*', Some('*')) => {
                self.pos += 1;
                if self.peek() == Some('=') {
                    self.pos += 1;
                    TokKind::DoubleStarAssign
                } else {
                    TokKind::DoubleStar
                }
            }
            ('/', Some('/')) => {
                self.pos += 1;
                if self.peek() == Some('=') {
                    self.pos += 1;
                    TokKind::DoubleSlashAssign
                } else {
                    TokKind::DoubleSlash
                }
            }
            ('<', Some('<')) => {
                self.pos += 1;
                if self.peek() == Some('=') {
                    self.pos += 1;
                    TokKind::ShlAssign
                } else {
                    TokKind::Shl
                }
            }
            ('>', Some('>')) => {
                self.pos += 1;
                if self.peek() == Some('=') {
                    self.pos += 1;
                    TokKind::ShrAssign
                } else {
                    TokKind::Shr
                }
            }
            ('<', Some('=')) => {
                self.pos += 1;
                TokKind::Le
            }
            ('>', Some('=')) => {
                self.pos += 1;
                TokKind::Ge
            }
            ('=', Some('=')) => {
                self.pos += 1;
                TokKind::EqEq
            }
            ('!', Some('=')) => {
                self.pos += 1;
                TokKind::NotEq
            }
            ('+', Some('=')) => {
                self.pos += 1;
                TokKind::PlusAssign
            }
            ('-', Some('=')) => {
                self.pos += 1;
                TokKind::MinusAssign
            }
            ('*', Some('=')) => {
                self.pos += 1;
                TokKind::StarAssign
            }
            ('/', Some('=')) => {
                self.pos += 1;
                TokKind::SlashAssign
            }
            ('%', Some('=')) => {
                self.pos += 1;
                TokKind::PercentAssign
            }
            ('&', Some('=')) => {
                self.pos += 1;
                TokKind::AmpAssign
            }
            ('|', Some('=')) => {
                self.pos += 1;
                TokKind::PipeAssign
            }
            ('^', Some('=')) => {
                self.pos += 1;
                TokKind::CaretAssign
            }
            ('-', Some('>')) => {
                self.pos += 1;
                TokKind::Arrow
            }
            ('+', _) => TokKind::Plus,
            ('-', _) => TokKind::Minus,
            ('*', _) => TokKind::Star,
            ('/', _) => TokKind::Slash,
            ('%', _) => TokKind::Percent,
            ('&', _) => TokKind::Amp,
            ('|', _) => TokKind::Pipe,
            ('^', _) => TokKind::Caret,
            ('~', _) => TokKind::Tilde,
            ('<', _) => TokKind::Lt,
            ('>', _) => TokKind::Gt,
            ('=', _) => TokKind::Assign,
            ('(', _) => {
                self.paren_depth += 1;
                TokKind::LParen
            }
            (')', _) => {
                self.paren_depth = self.paren_depth.saturating_sub(1);
                TokKind::RParen
            }
            ('[', _) => {
                self.paren_depth += 1;
                TokKind::LBracket
            }
            (']', _) => {
                self.paren_depth = self.paren_depth.saturating_sub(1);
                TokKind::RBracket
            }
            ('{', _) => {
                self.paren_depth += 1;
                TokKind::LBrace
            }
            ('}', _) => {
                self.paren_depth = self.paren_depth.saturating_sub(1);
                TokKind::RBrace
            }
            (',', _) => TokKind::Comma,
            (':', _) => TokKind::Colon,
            ('.', _) => TokKind::Dot,
            (';', _) => TokKind::Semi,
            (other, _) => {
                return Err(self.error(format!("unexpected character {:?}", other)));
            }
        };
        self.push(kind);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn single_line_function() {
        let toks = kinds("def solution(x): return x * 2");
        assert_eq!(
            toks,
            vec![
                TokKind::Kw(Kw::Def),
                TokKind::Name("solution".into()),
                TokKind::LParen,
                TokKind::Name("x".into()),
                TokKind::RParen,
                TokKind::Colon,
                TokKind::Kw(Kw::Return),
                TokKind::Name("x".into()),
                TokKind::Star,
                TokKind::Int(2),
                TokKind::Newline,
                TokKind::Eof,
            ]
        );
    }

    #[test]
    fn indentation_produces_indent_and_dedent() {
        let toks = kinds("def f(x):\n    return x\n");
        assert!(toks.contains(&TokKind::Indent));
        assert!(toks.contains(&TokKind::Dedent));
    }

    #[test]
    fn blank_and_comment_lines_are_invisible_to_blocks() {
        let with_noise = kinds("def f(x):\n\n    # doubles\n    return x\n");
        let without = kinds("def f(x):\n    return x\n");
        assert_eq!(with_noise, without);
    }

    #[test]
    fn newlines_inside_brackets_are_suppressed() {
        let toks = kinds("x = [1,\n     2]\n");
        let newlines = toks
            .iter()
            .filter(|k| matches!(k, TokKind::Newline))
            .count();
        assert_eq!(newlines, 1);
    }

    #[test]
    fn number_forms() {
        assert_eq!(kinds("0xff")[0], TokKind::Int(255));
        assert_eq!(kinds("1_000")[0], TokKind::Int(1000));
        assert_eq!(kinds("1.5e2")[0], TokKind::Float(150.0));
        assert_eq!(kinds("2j")[0], TokKind::Imag(2.0));
    }

    #[test]
    fn string_escapes_and_raw_strings() {
        assert_eq!(kinds(r#""a\nb""#)[0], TokKind::Str("a\nb".into()));
        assert_eq!(kinds(r#"r"a\nb""#)[0], TokKind::Str(r"a\nb".into()));
        assert_eq!(
            kinds("'''doc\nstring'''")[0],
            TokKind::Str("doc\nstring".into())
        );
    }

    #[test]
    fn missing_colon_keeps_lexing() {
        // The lexer is happy; the parser is the one that rejects this.
        assert!(tokenize("def f(x) return x").is_ok());
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = tokenize("x = 'abc").unwrap_err();
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn f_strings_are_rejected() {
        let err = tokenize("x = f'{y}'").unwrap_err();
        assert!(err.message.contains("f-strings"));
    }

    #[test]
    fn bad_dedent_is_reported() {
        let err = tokenize("if x:\n        a = 1\n    b = 2\n").unwrap_err();
        assert!(err.message.contains("unindent"));
    }
}
