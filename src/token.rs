//! Token kinds and the `Token` struct produced by the lexer.

use std::fmt;

/// Every distinct lexical category the lexer can produce, including the
/// 16 reserved keywords which are matched against identifier spellings at
/// lex time (see `Kind::keyword`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Ident,
    Num,
    Float,
    Str,
    Char,

    Add,
    Sub,
    Mul,
    Div,
    Sur, // '%'

    AsAdd,
    AsSub,
    AsMul,
    AsDiv,
    AsSur,

    Increment,
    Decrement,

    RArrow,  // ->
    LArrow,  // <-
    LCurvedArrow, // <~

    Dollar,
    Dot,
    Comma,
    Colon,
    Semicolon,
    Eq,

    Greater,
    Less,
    GrEq,
    LeEq,

    Addr, // &
    Or,   // |
    Bang,
    BangEq,
    EqEq,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Underline,
    Eof,

    // keywords
    Use,
    Def,
    Pub,
    Ret,
    And,
    End,
    If,
    Ef,
    Nf,
    For,
    Do,
    Out,
    Tin,
    New,
    Mod,
    As,
}

impl Kind {
    /// Resolves a scanned identifier spelling to a keyword kind, if any.
    /// Uses the superset of keywords found across the original source's
    /// `.cc` variants (`pub`/`and`/`as` included).
    pub fn keyword(ident: &str) -> Option<Kind> {
        Some(match ident {
            "use" => Kind::Use,
            "def" => Kind::Def,
            "pub" => Kind::Pub,
            "ret" => Kind::Ret,
            "and" => Kind::And,
            "end" => Kind::End,
            "if" => Kind::If,
            "ef" => Kind::Ef,
            "nf" => Kind::Nf,
            "for" => Kind::For,
            "do" => Kind::Do,
            "out" => Kind::Out,
            "tin" => Kind::Tin,
            "new" => Kind::New,
            "mod" => Kind::Mod,
            "as" => Kind::As,
            _ => return None,
        })
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A single lexed token: its kind, the literal text backing it (for
/// identifiers, numbers and strings), and the 1-based source line it
/// started on.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: Kind,
    pub literal: String,
    pub line: i64,
}

impl Token {
    pub fn new(kind: Kind, literal: impl Into<String>, line: i64) -> Self {
        Self { kind, literal: literal.into(), line }
    }

    /// True when this string literal was delimited by backticks (a "long"
    /// string, which may span multiple lines). The lexer appends a
    /// sentinel backtick character to the end of the literal for
    /// backticked strings; the compiler strips it before constructing
    /// the `Str` constant.
    pub fn is_long_string(&self) -> bool {
        self.kind == Kind::Str && self.literal.ends_with('`')
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}('{}') @{}", self.kind, self.literal, self.line)
    }
}
