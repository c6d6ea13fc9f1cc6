pub mod error;
pub mod token;

use error::LexerError;
use nom::Parser;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{escaped_transform, tag, take_till, take_while_m_n},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace1, none_of, one_of},
    combinator::{map, map_opt, map_res, opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded},
};
use nom_locate::position;
use smol_str::SmolStr;
use token::{Token, TokenKind};

use crate::number::Number;
use crate::range::{Position, Range, Span};

macro_rules! define_token_parser {
    ($name:ident, $tag:expr, $kind:expr) => {
        fn $name(input: Span) -> IResult<Span, Token> {
            map(tag($tag), |span: Span| Token {
                range: span.into(),
                kind: $kind,
            })
            .parse(input)
        }
    };
}

/// Splits source text into tokens, dropping whitespace and `//` comments. The
/// returned vector always ends with an [`TokenKind::Eof`] token.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexerError> {
    let (rest, mut tokens) = match tokens(Span::new(input)) {
        Ok(result) => result,
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => (e.input, Vec::new()),
        Err(nom::Err::Incomplete(_)) => (Span::new(""), Vec::new()),
    };

    match rest.fragment().chars().next() {
        None => {
            tokens.push(Token {
                range: rest.into(),
                kind: TokenKind::Eof,
            });
            Ok(tokens)
        }
        Some(c) => {
            let start = Position::from(rest);
            Err(LexerError::UnexpectedCharacter(
                c,
                Range::new(start, Position::new(start.line, start.column + 1)),
            ))
        }
    }
}

fn unicode(input: Span) -> IResult<Span, char> {
    map_opt(
        map_res(
            preceded(
                char('u'),
                delimited(
                    char('{'),
                    take_while_m_n(1, 6, |c: char| c.is_ascii_hexdigit()),
                    char('}'),
                ),
            ),
            |span: Span| u32::from_str_radix(span.fragment(), 16),
        ),
        char::from_u32,
    )
    .parse(input)
}

fn comment(input: Span) -> IResult<Span, Span> {
    preceded(tag("//"), take_till(|c| c == '\n' || c == '\r')).parse(input)
}

fn skip(input: Span) -> IResult<Span, ()> {
    map(many0(alt((comment, multispace1))), |_| ()).parse(input)
}

define_token_parser!(comma, ",", TokenKind::Comma);
define_token_parser!(question, "?", TokenKind::Question);
define_token_parser!(l_paren, "(", TokenKind::LParen);
define_token_parser!(r_paren, ")", TokenKind::RParen);
define_token_parser!(l_bracket, "[", TokenKind::LBracket);
define_token_parser!(r_bracket, "]", TokenKind::RBracket);
define_token_parser!(l_brace, "{", TokenKind::LBrace);
define_token_parser!(r_brace, "}", TokenKind::RBrace);
define_token_parser!(colon_colon, "::", TokenKind::ColonColon);
define_token_parser!(colon, ":", TokenKind::Colon);
define_token_parser!(semi_colon, ";", TokenKind::SemiColon);
define_token_parser!(dot, ".", TokenKind::Dot);
define_token_parser!(eq_eq, "==", TokenKind::EqEq);
define_token_parser!(ne_eq, "!=", TokenKind::NeEq);
define_token_parser!(bang, "!", TokenKind::Bang);
define_token_parser!(lte, "<=", TokenKind::Lte);
define_token_parser!(lt, "<", TokenKind::Lt);
define_token_parser!(gte, ">=", TokenKind::Gte);
define_token_parser!(gt, ">", TokenKind::Gt);
define_token_parser!(plus, "+", TokenKind::Plus);
define_token_parser!(minus, "-", TokenKind::Minus);
define_token_parser!(star, "*", TokenKind::Star);
define_token_parser!(slash, "/", TokenKind::Slash);

fn punctuations(input: Span) -> IResult<Span, Token> {
    alt((
        l_paren, r_paren, comma, colon_colon, colon, semi_colon, l_bracket, r_bracket, l_brace,
        r_brace, question, dot,
    ))
    .parse(input)
}

fn operators(input: Span) -> IResult<Span, Token> {
    alt((
        eq_eq, ne_eq, bang, lte, lt, gte, gt, plus, minus, star, slash,
    ))
    .parse(input)
}

fn number_literal(input: Span) -> IResult<Span, Token> {
    map_res(
        recognize((
            digit1,
            opt(pair(char('.'), digit1)),
            opt((one_of("eE"), opt(one_of("+-")), digit1)),
        )),
        |span: Span| {
            let fragment = *span.fragment();
            let kind = if fragment.contains(['.', 'e', 'E']) {
                fragment
                    .parse::<f64>()
                    .map(|n| TokenKind::FloatLiteral(Number::new(n)))
                    .map_err(|_| ())
            } else {
                // Integers beyond i64 degrade to floats.
                fragment
                    .parse::<i64>()
                    .map(TokenKind::IntLiteral)
                    .or_else(|_| fragment.parse::<f64>().map(|n| TokenKind::FloatLiteral(Number::new(n))))
                    .map_err(|_| ())
            };
            kind.map(|kind| Token {
                range: span.into(),
                kind,
            })
        },
    )
    .parse(input)
}

fn string_literal(input: Span) -> IResult<Span, Token> {
    let (span, start) = position(input)?;
    let (span, s) = delimited(
        char('"'),
        map(
            opt(escaped_transform(
                none_of("\"\\"),
                '\\',
                alt((
                    value('\\', char('\\')),
                    value('\"', char('\"')),
                    value('\r', char('r')),
                    value('\n', char('n')),
                    value('\t', char('t')),
                    unicode,
                )),
            )),
            Option::unwrap_or_default,
        ),
        char('"'),
    )
    .parse(span)?;
    let (span, end) = position(span)?;

    Ok((
        span,
        Token {
            range: Range {
                start: start.into(),
                end: end.into(),
            },
            kind: TokenKind::StringLiteral(s),
        },
    ))
}

fn variable(input: Span) -> IResult<Span, Token> {
    map(
        recognize(preceded(char('$'), many0(alt((alphanumeric1, tag("_")))))),
        |span: Span| Token {
            range: span.into(),
            kind: TokenKind::Variable(SmolStr::new(span.fragment())),
        },
    )
    .parse(input)
}

fn ident(input: Span) -> IResult<Span, Token> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0(alt((alphanumeric1, tag("_")))),
        )),
        |span: Span| {
            let kind = match *span.fragment() {
                "true" => TokenKind::BoolLiteral(true),
                "false" => TokenKind::BoolLiteral(false),
                "def" => TokenKind::Def,
                "var" => TokenKind::Var,
                "if" => TokenKind::If,
                "then" => TokenKind::Then,
                "else" => TokenKind::Else,
                "and" => TokenKind::And,
                "or" => TokenKind::Or,
                ident => TokenKind::Ident(SmolStr::new(ident)),
            };
            Token {
                range: span.into(),
                kind,
            }
        },
    )
    .parse(input)
}

fn token(input: Span) -> IResult<Span, Token> {
    alt((
        number_literal,
        string_literal,
        variable,
        ident,
        operators,
        punctuations,
    ))
    .parse(input)
}

fn tokens(input: Span) -> IResult<Span, Vec<Token>> {
    let (input, tokens) = many0(delimited(skip, token, skip)).parse(input)?;
    let (input, _) = skip(input)?;
    Ok((input, tokens))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[rstest]
    #[case::call(
        "sum(1, 2.5)",
        vec![
            TokenKind::Ident("sum".into()),
            TokenKind::LParen,
            TokenKind::IntLiteral(1),
            TokenKind::Comma,
            TokenKind::FloatLiteral(Number::new(2.5)),
            TokenKind::RParen,
            TokenKind::Eof,
        ]
    )]
    #[case::keywords(
        "if true then var else false",
        vec![
            TokenKind::If,
            TokenKind::BoolLiteral(true),
            TokenKind::Then,
            TokenKind::Var,
            TokenKind::Else,
            TokenKind::BoolLiteral(false),
            TokenKind::Eof,
        ]
    )]
    #[case::variables(
        "$ $this $1",
        vec![
            TokenKind::Variable("$".into()),
            TokenKind::Variable("$this".into()),
            TokenKind::Variable("$1".into()),
            TokenKind::Eof,
        ]
    )]
    #[case::operators(
        "a <= b != c :: d",
        vec![
            TokenKind::Ident("a".into()),
            TokenKind::Lte,
            TokenKind::Ident("b".into()),
            TokenKind::NeEq,
            TokenKind::Ident("c".into()),
            TokenKind::ColonColon,
            TokenKind::Ident("d".into()),
            TokenKind::Eof,
        ]
    )]
    #[case::path(
        "foo.bar[0][*]",
        vec![
            TokenKind::Ident("foo".into()),
            TokenKind::Dot,
            TokenKind::Ident("bar".into()),
            TokenKind::LBracket,
            TokenKind::IntLiteral(0),
            TokenKind::RBracket,
            TokenKind::LBracket,
            TokenKind::Star,
            TokenKind::RBracket,
            TokenKind::Eof,
        ]
    )]
    #[case::comments(
        "// leading\nx: 1 // trailing\n// last",
        vec![
            TokenKind::Ident("x".into()),
            TokenKind::Colon,
            TokenKind::IntLiteral(1),
            TokenKind::Eof,
        ]
    )]
    #[case::strings(
        r#""a\"b\u{41}" """#,
        vec![
            TokenKind::StringLiteral("a\"bA".to_string()),
            TokenKind::StringLiteral(String::new()),
            TokenKind::Eof,
        ]
    )]
    #[case::exponent("1e3", vec![TokenKind::FloatLiteral(Number::new(1000.0)), TokenKind::Eof])]
    #[case::int_overflow(
        "100000000000000000000",
        vec![TokenKind::FloatLiteral(Number::new(1e20)), TokenKind::Eof]
    )]
    fn test_tokenize(#[case] input: &str, #[case] expected: Vec<TokenKind>) {
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn test_token_ranges() {
        let tokens = tokenize("a\n  bc").unwrap();
        assert_eq!(
            tokens[1].range,
            Range::new(Position::new(2, 3), Position::new(2, 5))
        );
    }

    #[rstest]
    #[case::unknown_char("x: @", '@', Position::new(1, 4))]
    #[case::unterminated_string("\"abc", '"', Position::new(1, 1))]
    fn test_tokenize_error(#[case] input: &str, #[case] ch: char, #[case] start: Position) {
        assert!(matches!(
            tokenize(input),
            Err(LexerError::UnexpectedCharacter(c, range)) if c == ch && range.start == start
        ));
    }
}
