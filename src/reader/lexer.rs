use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_till, take_while1},
    character::complete::{char, digit1},
    combinator::{all_consuming, opt, recognize},
    multi::many0_count,
    sequence::pair,
};

use crate::value::IntegerType;

/// Characters that end a bare word
pub(crate) const DELIMITERS: &str = "[]{}\"<>";

/// Control keywords recognised by the reader
pub(crate) const KEYWORDS: &[&str] = &[
    "IF", "THEN", "ELSE", "ENDIF", "FOR", "ENDFOR", "WHILE", "REPEAT", "ENDWHILE", "EXIT",
];

/// Words that can never name a command
pub(crate) const RESERVED_WORDS: &[&str] = &[
    "IF", "THEN", "ELSE", "ENDIF", "FOR", "ENDFOR", "WHILE", "REPEAT", "ENDWHILE", "None",
    "import",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Keyword {
    If,
    Then,
    Else,
    EndIf,
    For,
    EndFor,
    While,
    Repeat,
    EndWhile,
    Exit,
}

impl Keyword {
    fn from_word(word: &str) -> Option<Keyword> {
        let keyword = match word {
            "IF" => Keyword::If,
            "THEN" => Keyword::Then,
            "ELSE" => Keyword::Else,
            "ENDIF" => Keyword::EndIf,
            "FOR" => Keyword::For,
            "ENDFOR" => Keyword::EndFor,
            "WHILE" => Keyword::While,
            "REPEAT" => Keyword::Repeat,
            "ENDWHILE" => Keyword::EndWhile,
            "EXIT" => Keyword::Exit,
            _ => return None,
        };
        Some(keyword)
    }

    pub(crate) fn as_str(self) -> &'static str {
        KEYWORDS[self as usize]
    }
}

/// A lexical unit not yet classified into a value.
///
/// Tokens exist only inside the reader; the structure builders turn them
/// into values or consume them as structural markers.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    StartList,
    EndList,
    StartMap,
    EndMap,
    StartProgram,
    EndProgram,
    Keyword(Keyword),
    Integer(IntegerType),
    Str(String),
    NoneLiteral,
    Import,
    Word(String),
}

impl Token {
    /// The source spelling, for diagnostics
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::StartList => "[".into(),
            Token::EndList => "]".into(),
            Token::StartMap => "{".into(),
            Token::EndMap => "}".into(),
            Token::StartProgram => "<<".into(),
            Token::EndProgram => ">>".into(),
            Token::Keyword(k) => k.as_str().into(),
            Token::Integer(n) => n.to_string(),
            Token::Str(s) => format!("{s:?}"),
            Token::NoneLiteral => "None".into(),
            Token::Import => "import".into(),
            Token::Word(w) => w.clone(),
        }
    }
}

/// Failures detected while scanning a single token
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LexError {
    UnterminatedString,
    LoneAngle(char),
    IntegerOutOfRange(String),
    UnexpectedChar(char),
}

impl LexError {
    pub(crate) fn message(&self) -> String {
        match self {
            LexError::UnterminatedString => "unterminated string literal".into(),
            LexError::LoneAngle('<') => "`<` must be doubled to start a program (`<<`)".into(),
            LexError::LoneAngle(c) => format!("`{c}` must be doubled to end a program (`{c}{c}`)"),
            LexError::IntegerOutOfRange(digits) => {
                format!("integer literal {digits} does not fit in 64 bits")
            }
            LexError::UnexpectedChar(c) => format!("unexpected character {c:?}"),
        }
    }
}

/// Check if a string could be read back as a bare word
///
/// Valid: non-empty, no whitespace or delimiter characters, not starting a
/// comment and not spelling an integer.
pub(crate) fn is_valid_word(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('#')
        && !name
            .chars()
            .any(|c| c.is_whitespace() || DELIMITERS.contains(c))
        && parse_integer_word(name).is_none()
}

/// Skip whitespace and `#` comments. Whitespace is any Unicode whitespace,
/// the same test that ends a bare word.
fn skip_trivia(input: &str) -> IResult<&str, usize> {
    many0_count(alt((
        take_while1(|c: char| c.is_whitespace()),
        recognize(pair(char('#'), take_till(|c| c == '\n'))),
    )))
    .parse(input)
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !DELIMITERS.contains(c)
}

fn parse_word(input: &str) -> IResult<&str, &str> {
    take_while1(is_word_char).parse(input)
}

/// `-?[0-9]+` spanning the whole word
fn parse_integer_word(word: &str) -> Option<&str> {
    all_consuming(recognize(pair(opt(char::<&str, nom::error::Error<&str>>('-')), digit1)))
        .parse(word)
        .ok()
        .map(|(_, digits)| digits)
}

/// Scan a string literal body after the opening quote.
///
/// `\n` and `\t` are escapes; a backslash before any other character passes
/// that character through literally.
fn parse_string_body(input: &str) -> Result<(&str, String), LexError> {
    let mut chars = input.char_indices();
    let mut text = String::new();
    while let Some((_, ch)) = chars.next() {
        match ch {
            '"' => return Ok((chars.as_str(), text)),
            '\\' => match chars.next() {
                Some((_, 'n')) => text.push('\n'),
                Some((_, 't')) => text.push('\t'),
                Some((_, other)) => text.push(other),
                None => return Err(LexError::UnterminatedString),
            },
            c => text.push(c),
        }
    }
    Err(LexError::UnterminatedString)
}

/// Lexer over one source text
#[derive(Debug)]
pub(crate) struct Lexer {
    text: String,
    pos: usize,
}

impl Lexer {
    pub(crate) fn new(text: impl Into<String>) -> Self {
        Lexer {
            text: text.into(),
            pos: 0,
        }
    }

    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    /// Byte offset of the next unread character
    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    /// Skip trivia and report the offset where the next token starts
    pub(crate) fn skip_to_token(&mut self) -> usize {
        let rest = &self.text[self.pos..];
        if let Ok((remaining, _)) = skip_trivia(rest) {
            self.pos += rest.len() - remaining.len();
        }
        self.pos
    }

    /// Read the next token and its start offset, or `None` at end of input
    pub(crate) fn next_token(&mut self) -> Result<Option<(Token, usize)>, (LexError, usize)> {
        let start = self.skip_to_token();
        let rest = &self.text[start..];
        let Some(first) = rest.chars().next() else {
            return Ok(None);
        };

        let (remaining, token) = match first {
            '[' => (&rest[1..], Token::StartList),
            ']' => (&rest[1..], Token::EndList),
            '{' => (&rest[1..], Token::StartMap),
            '}' => (&rest[1..], Token::EndMap),
            '<' | '>' => {
                let doubled = if first == '<' { "<<" } else { ">>" };
                match tag::<&str, &str, nom::error::Error<&str>>(doubled).parse(rest) {
                    Ok((remaining, _)) if first == '<' => (remaining, Token::StartProgram),
                    Ok((remaining, _)) => (remaining, Token::EndProgram),
                    Err(_) => return Err((LexError::LoneAngle(first), start)),
                }
            }
            '"' => match parse_string_body(&rest[1..]) {
                Ok((remaining, text)) => (remaining, Token::Str(text)),
                Err(e) => return Err((e, start)),
            },
            _ => {
                let (remaining, word) = match parse_word(rest) {
                    Ok(parsed) => parsed,
                    Err(_) => return Err((LexError::UnexpectedChar(first), start)),
                };
                (remaining, classify_word(word).map_err(|e| (e, start))?)
            }
        };

        self.pos = self.text.len() - remaining.len();
        Ok(Some((token, start)))
    }
}

fn classify_word(word: &str) -> Result<Token, LexError> {
    if let Some(digits) = parse_integer_word(word) {
        return digits
            .parse::<IntegerType>()
            .map(Token::Integer)
            .map_err(|_| LexError::IntegerOutOfRange(digits.to_owned()));
    }
    if let Some(keyword) = Keyword::from_word(word) {
        return Ok(Token::Keyword(keyword));
    }
    Ok(match word {
        "None" => Token::NoneLiteral,
        "import" => Token::Import,
        _ => Token::Word(word.to_owned()),
    })
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokens(input: &str) -> Result<Vec<Token>, LexError> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            match lexer.next_token() {
                Ok(Some((token, _))) => out.push(token),
                Ok(None) => return Ok(out),
                Err((e, _)) => return Err(e),
            }
        }
    }

    fn word(w: &str) -> Token {
        Token::Word(w.to_owned())
    }

    #[test]
    fn test_tokenizer_data_driven() {
        let test_cases = vec![
            ("", Ok(vec![])),
            ("   \n\t ", Ok(vec![])),
            ("1\u{0C}2", Ok(vec![Token::Integer(1), Token::Integer(2)])),
            ("1\u{A0}2", Ok(vec![Token::Integer(1), Token::Integer(2)])),
            ("\u{2003}x\r\n", Ok(vec![word("x")])),
            ("42", Ok(vec![Token::Integer(42)])),
            ("-7", Ok(vec![Token::Integer(-7)])),
            ("-", Ok(vec![word("-")])),
            ("3 4 ADD", Ok(vec![Token::Integer(3), Token::Integer(4), word("ADD")])),
            ("12abc", Ok(vec![word("12abc")])),
            ("\"hi there\"", Ok(vec![Token::Str("hi there".into())])),
            ("\"a\\nb\\tc\"", Ok(vec![Token::Str("a\nb\tc".into())])),
            ("\"q\\\"x\\\\\"", Ok(vec![Token::Str("q\"x\\".into())])),
            ("\"\\z\"", Ok(vec![Token::Str("z".into())])),
            (
                "[1 2]",
                Ok(vec![
                    Token::StartList,
                    Token::Integer(1),
                    Token::Integer(2),
                    Token::EndList,
                ]),
            ),
            (
                "{\"k\" 1}",
                Ok(vec![
                    Token::StartMap,
                    Token::Str("k".into()),
                    Token::Integer(1),
                    Token::EndMap,
                ]),
            ),
            (
                "<<1 ADD>>",
                Ok(vec![
                    Token::StartProgram,
                    Token::Integer(1),
                    word("ADD"),
                    Token::EndProgram,
                ]),
            ),
            (
                "IF THEN ELSE ENDIF FOR ENDFOR WHILE REPEAT ENDWHILE EXIT",
                Ok(vec![
                    Token::Keyword(Keyword::If),
                    Token::Keyword(Keyword::Then),
                    Token::Keyword(Keyword::Else),
                    Token::Keyword(Keyword::EndIf),
                    Token::Keyword(Keyword::For),
                    Token::Keyword(Keyword::EndFor),
                    Token::Keyword(Keyword::While),
                    Token::Keyword(Keyword::Repeat),
                    Token::Keyword(Keyword::EndWhile),
                    Token::Keyword(Keyword::Exit),
                ]),
            ),
            ("if", Ok(vec![word("if")])),
            ("None import", Ok(vec![Token::NoneLiteral, Token::Import])),
            ("1 # comment\n2", Ok(vec![Token::Integer(1), Token::Integer(2)])),
            ("# only a comment", Ok(vec![])),
            ("a#b", Ok(vec![word("a#b")])),
            ("\"open", Err(LexError::UnterminatedString)),
            ("\"ends with escape\\", Err(LexError::UnterminatedString)),
            ("1 < 2", Err(LexError::LoneAngle('<'))),
            ("x >", Err(LexError::LoneAngle('>'))),
            (
                "99999999999999999999",
                Err(LexError::IntegerOutOfRange("99999999999999999999".into())),
            ),
        ];

        for (i, (input, expected)) in test_cases.into_iter().enumerate() {
            assert_eq!(tokens(input), expected, "tokenizer case #{} ({input:?})", i + 1);
        }
    }

    #[test]
    fn test_positions_track_token_starts() {
        let mut lexer = Lexer::new("  1\n  \"x");
        assert_eq!(lexer.next_token().unwrap(), Some((Token::Integer(1), 2)));
        assert_eq!(lexer.position(), 3);
        let (err, offset) = lexer.next_token().unwrap_err();
        assert_eq!(err, LexError::UnterminatedString);
        assert_eq!(offset, 6);
    }

    #[test]
    fn test_valid_words() {
        for name in ["ADD", "-", "x.y", "fact", "a#b", "ADD?"] {
            assert!(is_valid_word(name), "{name}");
        }
        for name in ["", "12", "-4", "a b", "#x", "[", "a]", "<<", "\"q"] {
            assert!(!is_valid_word(name), "{name}");
        }
    }

    #[test]
    fn test_keyword_spelling_matches_table() {
        for (i, spelled) in KEYWORDS.iter().enumerate() {
            let keyword = Keyword::from_word(spelled).unwrap();
            assert_eq!(keyword as usize, i);
            assert_eq!(keyword.as_str(), *spelled);
        }
    }
}
