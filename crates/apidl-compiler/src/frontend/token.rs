use std::fmt;

use logos::Logos;

/// Api source tokens.
///
/// Keywords (`syntax`, `type`, `service`, ...) are plain identifiers; the
/// parser decides by position, so they stay usable as field names.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    /// Identifiers may contain `-` after the first character (`user-api`).
    #[regex(r"[A-Za-z_][A-Za-z0-9_\-]*")]
    Ident,

    /// `@server`, `@doc`, `@handler`
    #[regex(r"@[A-Za-z_][A-Za-z0-9_]*")]
    AtIdent,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    String,

    /// Back-quoted struct tag.
    #[regex(r"`[^`]*`")]
    RawString,

    #[regex(r"[0-9]+")]
    Number,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    // Punctuation
    #[token("=")]
    Eq,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("-")]
    Minus,

    /// Punctuation and non-ASCII text that only appears inside raw
    /// `key: value` lines.
    #[regex(r"[!#$%&'+,;<>?\\^|~]|[^\x00-\x7F]+")]
    Other,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    BlockComment,
}

impl Token {
    pub fn is_comment(self) -> bool {
        matches!(self, Self::LineComment | Self::BlockComment)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Ident => "identifier",
            Self::AtIdent => "annotation",
            Self::String => "string",
            Self::RawString => "tag",
            Self::Number => "number",
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::LBrace => "'{'",
            Self::RBrace => "'}'",
            Self::LBracket => "'['",
            Self::RBracket => "']'",
            Self::Eq => "'='",
            Self::Colon => "':'",
            Self::Dot => "'.'",
            Self::Star => "'*'",
            Self::Slash => "'/'",
            Self::Minus => "'-'",
            Self::Other => "character",
            Self::LineComment | Self::BlockComment => "comment",
        };
        f.write_str(text)
    }
}
