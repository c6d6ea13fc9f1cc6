use std::iter::Peekable;

use smallvec::SmallVec;
use smol_str::SmolStr;

use crate::lexer::token::{Token, TokenKind};
use crate::range::Range;
use crate::value::{MergeMode, Path, Segment};

use super::constants;
use super::error::ParseError;
use super::node::{Call, Expr, FunctionDef, Literal, Mapping, Node, Program, Target};

type Segments = SmallVec<[Segment; 4]>;

/// Recursive-descent parser over the token stream produced by
/// [`crate::lexer::tokenize`].
pub struct Parser<'a> {
    tokens: Peekable<core::slice::Iter<'a, Token>>,
    last_range: Range,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens: tokens.iter().peekable(),
            last_range: Range::default(),
        }
    }

    pub fn parse(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::default();

        loop {
            self.skip_separators();
            match self.peek_kind() {
                Some(TokenKind::Eof) | None => break,
                Some(TokenKind::Def) => program.defs.push(self.parse_def()?),
                Some(_) => program.mappings.push(self.parse_mapping()?),
            }
        }

        Ok(program)
    }

    fn next(&mut self) -> Result<&'a Token, ParseError> {
        match self.tokens.next() {
            Some(token) if token.is_eof() => Err(ParseError::UnexpectedEOFDetected),
            Some(token) => {
                self.last_range = token.range;
                Ok(token)
            }
            None => Err(ParseError::UnexpectedEOFDetected),
        }
    }

    fn peek_kind(&mut self) -> Option<&'a TokenKind> {
        self.tokens.peek().copied().map(|token| &token.kind)
    }

    fn next_if(&mut self, kind: &TokenKind) -> bool {
        match self.tokens.next_if(|token| &token.kind == kind) {
            Some(token) => {
                self.last_range = token.range;
                true
            }
            None => false,
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<&'a Token, ParseError> {
        let token = self.next()?;
        if &token.kind == kind {
            Ok(token)
        } else {
            Err(ParseError::UnexpectedToken(token.clone()))
        }
    }

    fn expect_closing(
        &mut self,
        kind: &TokenKind,
        error: fn(Token) -> ParseError,
    ) -> Result<(), ParseError> {
        match self.tokens.next() {
            Some(token) if &token.kind == kind => {
                self.last_range = token.range;
                Ok(())
            }
            Some(token) => Err(error(token.clone())),
            None => Err(ParseError::UnexpectedEOFDetected),
        }
    }

    fn expect_ident(&mut self) -> Result<SmolStr, ParseError> {
        let token = self.next()?;
        match &token.kind {
            TokenKind::Ident(name) | TokenKind::Variable(name) => Ok(name.clone()),
            _ => Err(ParseError::UnexpectedToken(token.clone())),
        }
    }

    fn skip_separators(&mut self) {
        while matches!(
            self.peek_kind(),
            Some(TokenKind::SemiColon) | Some(TokenKind::Comma)
        ) {
            self.tokens.next();
        }
    }

    fn node(&self, start: Range, expr: Expr) -> Node {
        Node {
            range: start.cover(&self.last_range),
            expr,
        }
    }

    fn parse_def(&mut self) -> Result<FunctionDef, ParseError> {
        let start = self.expect(&TokenKind::Def)?.range;
        let name = self.expect_ident()?;
        self.expect(&TokenKind::LParen)?;

        let mut params = Vec::new();
        if !self.next_if(&TokenKind::RParen) {
            loop {
                params.push(self.expect_ident()?);
                if self.next_if(&TokenKind::Comma) {
                    continue;
                }
                self.expect_closing(&TokenKind::RParen, ParseError::ExpectedClosingParen)?;
                break;
            }
        }

        let body = self.parse_expr()?;
        Ok(FunctionDef {
            range: start.cover(&self.last_range),
            name,
            params,
            body,
        })
    }

    /// Parses one statement. Anything that does not read as `target: value` is
    /// re-parsed from the same position as a bare result expression, unless a
    /// merge mode or `side` already committed it to being a mapping.
    fn parse_mapping(&mut self) -> Result<Mapping, ParseError> {
        let start = self
            .tokens
            .peek()
            .copied()
            .map(|token| token.range)
            .unwrap_or_default();
        let mode = self.parse_merge_mode();

        if self.next_if_side() {
            let name = self.expect_ident()?;
            let rest = self.parse_target_path()?;
            let target = Target::Side(field_path(name, rest));
            return self.finish_mapping(start, mode, target);
        }

        if mode.is_none() {
            let checkpoint = (self.tokens.clone(), self.last_range);
            if let Ok(Some(target)) = self.parse_target() {
                if self.next_if(&TokenKind::Colon) {
                    let value = self.parse_expr()?;
                    return Ok(Mapping {
                        range: start.cover(&self.last_range),
                        mode,
                        target,
                        value,
                    });
                }
            }
            (self.tokens, self.last_range) = checkpoint;

            if !matches!(self.peek_kind(), Some(TokenKind::Var)) {
                let value = self.parse_expr()?;
                return Ok(Mapping {
                    range: start.cover(&self.last_range),
                    mode: None,
                    target: Target::Field(Path::empty()),
                    value,
                });
            }
        }

        let next = self.tokens.peek().copied();
        let target = self.parse_target()?.ok_or_else(|| match next {
            Some(token) => ParseError::UnexpectedToken(token.clone()),
            None => ParseError::UnexpectedEOFDetected,
        })?;
        self.finish_mapping(start, mode, target)
    }

    fn finish_mapping(&mut self, start: Range, mode: Option<MergeMode>, target: Target) -> Result<Mapping, ParseError> {
        self.expect(&TokenKind::Colon)?;
        let value = self.parse_expr()?;
        Ok(Mapping {
            range: start.cover(&self.last_range),
            mode,
            target,
            value,
        })
    }

    fn peek_second_kind(&self) -> Option<&'a TokenKind> {
        let mut ahead = self.tokens.clone();
        ahead.next();
        ahead.next().map(|token| &token.kind)
    }

    /// Mode words are keywords only in front of a target, so fields and
    /// functions may still be called `append` or `merge`.
    fn parse_merge_mode(&mut self) -> Option<MergeMode> {
        let mode = match self.peek_kind() {
            Some(TokenKind::Ident(word)) => MergeMode::from_keyword(word)?,
            _ => return None,
        };
        match self.peek_second_kind() {
            Some(TokenKind::Ident(_)) | Some(TokenKind::Var) => {}
            Some(TokenKind::Variable(name)) if name == constants::THIS => {}
            _ => return None,
        }
        self.next().ok()?;
        Some(mode)
    }

    fn next_if_side(&mut self) -> bool {
        let is_side = matches!(self.peek_kind(), Some(TokenKind::Ident(word)) if word == constants::SIDE)
            && matches!(self.peek_second_kind(), Some(TokenKind::Ident(_)));
        is_side && self.next().is_ok()
    }

    fn parse_target(&mut self) -> Result<Option<Target>, ParseError> {
        let token = self.next()?;
        match &token.kind {
            TokenKind::Var => {
                let name = self.expect_ident()?;
                let path = self.parse_target_path()?;
                Ok(Some(Target::Variable { name, path }))
            }
            TokenKind::Variable(name) if name == constants::THIS => {
                Ok(Some(Target::Field(self.parse_target_path()?)))
            }
            TokenKind::Ident(name) => match self.peek_kind() {
                Some(TokenKind::LParen) | Some(TokenKind::ColonColon) => {
                    let start = token.range;
                    let call = self.parse_call(None, name.clone(), start)?;
                    match call.expr {
                        Expr::Call(call) => Ok(Some(Target::Sink(call))),
                        _ => Ok(None),
                    }
                }
                _ => {
                    let rest = self.parse_target_path()?;
                    Ok(Some(Target::Field(field_path(name.clone(), rest))))
                }
            },
            _ => Ok(None),
        }
    }

    fn parse_target_path(&mut self) -> Result<Path, ParseError> {
        let mut segments = Segments::new();

        loop {
            match self.peek_kind() {
                Some(TokenKind::Dot) => {
                    self.next()?;
                    segments.push(Segment::Field(self.expect_ident()?));
                }
                Some(TokenKind::LBracket) => {
                    self.next()?;
                    let token = self.next()?;
                    match &token.kind {
                        TokenKind::RBracket => {
                            segments.push(Segment::Index(None));
                            continue;
                        }
                        TokenKind::IntLiteral(i) if *i >= 0 => {
                            segments.push(Segment::Index(Some(*i as usize)))
                        }
                        TokenKind::Star => segments.push(Segment::Wildcard { flatten: true }),
                        _ => return Err(ParseError::UnexpectedToken(token.clone())),
                    }
                    self.expect_closing(&TokenKind::RBracket, ParseError::ExpectedClosingBracket)?;
                }
                _ => break,
            }
        }

        Ok(Path::from_segments(segments))
    }

    pub fn parse_expr(&mut self) -> Result<Node, ParseError> {
        let lhs = self.parse_unary_expr()?;
        self.parse_binary_op(1, lhs)
    }

    #[inline(always)]
    fn binary_op_precedence(kind: &TokenKind) -> u8 {
        match kind {
            TokenKind::Or => 1,
            TokenKind::And => 2,
            TokenKind::EqEq | TokenKind::NeEq => 3,
            TokenKind::Gt | TokenKind::Gte | TokenKind::Lt | TokenKind::Lte => 4,
            TokenKind::Plus | TokenKind::Minus => 5,
            TokenKind::Star | TokenKind::Slash => 6,
            _ => 0,
        }
    }

    #[inline(always)]
    fn binary_op_function_name(kind: &TokenKind) -> &'static str {
        match kind {
            TokenKind::And => constants::AND,
            TokenKind::Or => constants::OR,
            TokenKind::EqEq => constants::EQ,
            TokenKind::NeEq => constants::NEQ,
            TokenKind::Gt => constants::GT,
            TokenKind::Gte => constants::GT_EQ,
            TokenKind::Lt => constants::LT,
            TokenKind::Lte => constants::LT_EQ,
            TokenKind::Plus => constants::SUM,
            TokenKind::Minus => constants::SUB,
            TokenKind::Star => constants::MUL,
            TokenKind::Slash => constants::DIV,
            _ => "",
        }
    }

    fn parse_binary_op(&mut self, min_prec: u8, mut lhs: Node) -> Result<Node, ParseError> {
        while let Some(kind) = self.peek_kind() {
            let prec = Self::binary_op_precedence(kind);
            if prec == 0 || prec < min_prec {
                break;
            }

            self.next()?;
            let mut rhs = self.parse_unary_expr()?;

            loop {
                let next_prec = self
                    .peek_kind()
                    .map(Self::binary_op_precedence)
                    .unwrap_or_default();
                if next_prec > prec {
                    rhs = self.parse_binary_op(next_prec, rhs)?;
                } else {
                    break;
                }
            }

            let range = lhs.range.cover(&rhs.range);
            lhs = Node {
                range,
                expr: Expr::Call(Call::new(
                    Self::binary_op_function_name(kind),
                    vec![lhs, rhs],
                )),
            };
        }

        Ok(lhs)
    }

    fn parse_unary_expr(&mut self) -> Result<Node, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Bang) => {
                let start = self.next()?.range;
                let operand = self.parse_unary_expr()?;
                Ok(self.node(start, Expr::Call(Call::new(constants::NOT, vec![operand]))))
            }
            Some(TokenKind::Minus) => {
                let start = self.next()?.range;
                let operand = self.parse_unary_expr()?;
                let expr = match operand.expr {
                    Expr::Literal(Literal::Int(i)) => Expr::Literal(Literal::Int(-i)),
                    Expr::Literal(Literal::Float(n)) => Expr::Literal(Literal::Float(-n)),
                    expr => {
                        let zero = Node {
                            range: start,
                            expr: Expr::Literal(Literal::Int(0)),
                        };
                        let operand = Node {
                            range: operand.range,
                            expr,
                        };
                        Expr::Call(Call::new(constants::SUB, vec![zero, operand]))
                    }
                };
                Ok(self.node(start, expr))
            }
            _ => {
                let primary = self.parse_primary_expr()?;
                self.parse_postfix(primary)
            }
        }
    }

    fn parse_postfix(&mut self, mut node: Node) -> Result<Node, ParseError> {
        let start = node.range;
        let mut segments = Segments::new();

        let flush = |node: Node, segments: &mut Segments, range: Range| -> Node {
            if segments.is_empty() {
                node
            } else {
                let path = Path::from_segments(segments.drain(..));
                Node {
                    range,
                    expr: Expr::Path(Box::new(node), path),
                }
            }
        };

        loop {
            match self.peek_kind() {
                Some(TokenKind::Dot) => {
                    self.next()?;
                    segments.push(Segment::Field(self.expect_ident()?));
                }
                Some(TokenKind::LBracket) => {
                    self.next()?;
                    let token = self.next()?;
                    match &token.kind {
                        TokenKind::RBracket => {
                            let source = flush(node, &mut segments, start.cover(&self.last_range));
                            return Ok(self.node(start, Expr::Iterate(Box::new(source))));
                        }
                        TokenKind::IntLiteral(i) if *i >= 0 => {
                            segments.push(Segment::Index(Some(*i as usize)));
                        }
                        TokenKind::Star => segments.push(Segment::Wildcard { flatten: true }),
                        TokenKind::Ident(name) if constants::SELECTORS.contains(&name.as_str()) => {
                            let source = flush(node, &mut segments, start.cover(&self.last_range));
                            let body = self.parse_expr()?;
                            self.expect_closing(
                                &TokenKind::RBracket,
                                ParseError::ExpectedClosingBracket,
                            )?;
                            node = self.node(
                                start,
                                Expr::Call(Call::new(name.clone(), vec![source, body])),
                            );
                            continue;
                        }
                        TokenKind::Ident(_) => {
                            return Err(ParseError::UnknownSelector(token.clone()));
                        }
                        _ => return Err(ParseError::UnexpectedToken(token.clone())),
                    }
                    self.expect_closing(&TokenKind::RBracket, ParseError::ExpectedClosingBracket)?;
                }
                Some(TokenKind::Question) => {
                    self.next()?;
                    let operand = flush(node, &mut segments, start.cover(&self.last_range));
                    node = self.node(start, Expr::Call(Call::new(constants::IS_NOT_NIL, vec![operand])));
                }
                _ => break,
            }
        }

        Ok(flush(node, &mut segments, start.cover(&self.last_range)))
    }

    fn parse_primary_expr(&mut self) -> Result<Node, ParseError> {
        let token = self.next()?;
        let start = token.range;

        match &token.kind {
            TokenKind::IntLiteral(i) => Ok(self.node(start, Expr::Literal(Literal::Int(*i)))),
            TokenKind::FloatLiteral(n) => Ok(self.node(start, Expr::Literal(Literal::Float(*n)))),
            TokenKind::StringLiteral(s) => {
                Ok(self.node(start, Expr::Literal(Literal::String(SmolStr::new(s)))))
            }
            TokenKind::BoolLiteral(b) => Ok(self.node(start, Expr::Literal(Literal::Bool(*b)))),
            TokenKind::Variable(name) => Ok(self.node(start, Expr::Ident(name.clone()))),
            TokenKind::Ident(name) => match self.peek_kind() {
                Some(TokenKind::LParen) | Some(TokenKind::ColonColon) => {
                    self.parse_call(None, name.clone(), start)
                }
                _ => Ok(self.node(start, Expr::Ident(name.clone()))),
            },
            TokenKind::LBracket => self.parse_array(start),
            TokenKind::LBrace => self.parse_block(start),
            TokenKind::If => self.parse_if(start),
            TokenKind::LParen => {
                let expr = self.parse_expr()?;
                self.expect_closing(&TokenKind::RParen, ParseError::ExpectedClosingParen)?;
                Ok(expr)
            }
            _ => Err(ParseError::UnexpectedToken(token.clone())),
        }
    }

    fn parse_call(
        &mut self,
        package: Option<SmolStr>,
        name: SmolStr,
        start: Range,
    ) -> Result<Node, ParseError> {
        if package.is_none() && self.next_if(&TokenKind::ColonColon) {
            let function = self.expect_ident()?;
            return self.parse_call(Some(name), function, start);
        }

        self.expect(&TokenKind::LParen)?;
        let args = self.parse_args(&TokenKind::RParen, ParseError::ExpectedClosingParen)?;

        Ok(self.node(
            start,
            Expr::Call(Call {
                package,
                name,
                args,
            }),
        ))
    }

    fn parse_args(
        &mut self,
        close: &TokenKind,
        error: fn(Token) -> ParseError,
    ) -> Result<Vec<Node>, ParseError> {
        let mut args = Vec::new();

        if self.next_if(close) {
            return Ok(args);
        }

        loop {
            args.push(self.parse_expr()?);
            if self.next_if(&TokenKind::Comma) {
                continue;
            }
            self.expect_closing(close, error)?;
            return Ok(args);
        }
    }

    fn parse_array(&mut self, start: Range) -> Result<Node, ParseError> {
        let elements = self.parse_args(&TokenKind::RBracket, ParseError::ExpectedClosingBracket)?;
        Ok(self.node(start, Expr::Call(Call::new(constants::ARRAY_OF, elements))))
    }

    fn parse_block(&mut self, start: Range) -> Result<Node, ParseError> {
        let mut mappings = Vec::new();

        loop {
            self.skip_separators();
            match self.tokens.peek().copied() {
                Some(token) if token.kind == TokenKind::RBrace => {
                    self.next()?;
                    break;
                }
                Some(token) if token.is_eof() => {
                    return Err(ParseError::ExpectedClosingBrace(token.clone()));
                }
                Some(_) => mappings.push(self.parse_mapping()?),
                None => return Err(ParseError::UnexpectedEOFDetected),
            }
        }

        Ok(self.node(start, Expr::Block(mappings)))
    }

    fn parse_if(&mut self, start: Range) -> Result<Node, ParseError> {
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::Then)?;
        let then_branch = self.parse_expr()?;

        let mut args = vec![cond, then_branch];
        if self.next_if(&TokenKind::Else) {
            args.push(self.parse_expr()?);
        }

        Ok(self.node(start, Expr::Call(Call::new(constants::TERNARY, args))))
    }
}

fn field_path(name: SmolStr, rest: Path) -> Path {
    Path::from_segments(std::iter::once(Segment::Field(name)).chain(rest.segments().iter().cloned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use rstest::rstest;

    fn parse(code: &str) -> Result<Program, ParseError> {
        let tokens = tokenize(code).unwrap();
        Parser::new(&tokens).parse()
    }

    fn strip(node: &Node) -> String {
        match &node.expr {
            Expr::Literal(Literal::Int(i)) => i.to_string(),
            Expr::Literal(Literal::Float(n)) => n.to_string(),
            Expr::Literal(Literal::String(s)) => format!("{:?}", s.as_str()),
            Expr::Literal(Literal::Bool(b)) => b.to_string(),
            Expr::Ident(name) => name.to_string(),
            Expr::Call(call) => format!(
                "{}{}({})",
                call.package
                    .as_ref()
                    .map(|p| format!("{}::", p))
                    .unwrap_or_default(),
                call.name,
                call.args.iter().map(strip).collect::<Vec<_>>().join(", ")
            ),
            Expr::Block(mappings) => format!("{{{}}}", mappings.len()),
            Expr::Path(source, path) => format!("{}{}", strip(source), path),
            Expr::Iterate(source) => format!("{}[]", strip(source)),
        }
    }

    fn result_expr(code: &str) -> String {
        let program = parse(code).unwrap();
        strip(&program.mappings[0].value)
    }

    #[rstest]
    #[case::precedence("1 + 2 * 3", "sum(1, mul(2, 3))")]
    #[case::left_assoc("1 - 2 - 3", "sub(sub(1, 2), 3)")]
    #[case::logic("a or b and c == d", "or(a, and(b, eq(c, d)))")]
    #[case::comparison("a < b == c >= d", "eq(lt(a, b), gtEq(c, d))")]
    #[case::negative_literal("-1.5", "-1.5")]
    #[case::negate_var("-x", "sub(0, x)")]
    #[case::not("!x?", "not(isNotNil(x))")]
    #[case::paren("(1 + 2) * 3", "mul(sum(1, 2), 3)")]
    #[case::if_else("if true then 1 else 2", "ternary(true, 1, 2)")]
    #[case::if_only("if x then 1", "ternary(x, 1)")]
    #[case::array("[1, \"a\"]", "arrayOf(1, \"a\")")]
    #[case::qualified_call("pkg::f(x)", "pkg::f(x)")]
    #[case::path("$root.a[0][*].b", "$root.a[0][*].b")]
    #[case::selectors(
        "foo.b[where $.p].c[sortBy $.k]",
        "sortBy(where(foo.b, $.p).c, $.k)"
    )]
    #[case::selector_without_path("foo[where $ > 0]", "where(foo, gt($, 0))")]
    #[case::iterate("f(xs[], 1)", "f(xs[], 1)")]
    #[case::iterate_path("g($root.a[]) + 1", "sum(g($root.a[]), 1)")]
    fn test_parse_expr(#[case] code: &str, #[case] expected: &str) {
        assert_eq!(result_expr(code), expected);
    }

    #[rstest]
    #[case::variable("var x: 1", Target::Variable { name: "x".into(), path: Path::empty() })]
    #[case::variable_path(
        "var x.a[]: 1",
        Target::Variable {
            name: "x".into(),
            path: Path::from_segments([Segment::Field("a".into()), Segment::Index(None)]),
        }
    )]
    #[case::this("$this.a: 1", Target::Field(Path::from_segments([Segment::Field("a".into())])))]
    #[case::field(
        "a.b[2]: 1",
        Target::Field(Path::from_segments([
            Segment::Field("a".into()),
            Segment::Field("b".into()),
            Segment::Index(Some(2)),
        ]))
    )]
    #[case::sink("out(1): 2", Target::Sink(Call::new("out", vec![Node {
        range: Range::new(crate::range::Position::new(1, 5), crate::range::Position::new(1, 6)),
        expr: Expr::Literal(Literal::Int(1)),
    }])))]
    #[case::bare("f(1)", Target::Field(Path::empty()))]
    fn test_parse_target(#[case] code: &str, #[case] expected: Target) {
        let program = parse(code).unwrap();
        assert_eq!(program.mappings[0].target, expected);
    }

    #[rstest]
    #[case::append("append xs: 1", Some(MergeMode::Append), Target::Field(Path::parse("xs").unwrap()))]
    #[case::extend_variable(
        "extend var v.a: 1",
        Some(MergeMode::Extend),
        Target::Variable { name: "v".into(), path: Path::parse("a").unwrap() }
    )]
    #[case::replace_this("replace $this.a: 1", Some(MergeMode::Replace), Target::Field(Path::parse("a").unwrap()))]
    #[case::side("side a.b: 1", None, Target::Side(Path::parse("a.b").unwrap()))]
    #[case::merge_side("merge side a: 1", Some(MergeMode::Merge), Target::Side(Path::parse("a").unwrap()))]
    #[case::field_named_append("append: 1", None, Target::Field(Path::parse("append").unwrap()))]
    #[case::field_named_side("side.x: 1", None, Target::Field(Path::parse("side.x").unwrap()))]
    fn test_parse_merge_mode(#[case] code: &str, #[case] mode: Option<MergeMode>, #[case] target: Target) {
        let program = parse(code).unwrap();
        assert_eq!(program.mappings[0].mode, mode);
        assert_eq!(program.mappings[0].target, target);
    }

    #[test]
    fn test_mode_requires_mapping() {
        assert!(matches!(parse("append xs"), Err(ParseError::UnexpectedEOFDetected)));
    }

    #[test]
    fn test_parse_program() {
        let program = parse(
            "def f(a, b) { x: a; y: b }\n\
             var v: f(1, 2)\n\
             result: { inner: v.x }",
        )
        .unwrap();

        assert_eq!(program.defs.len(), 1);
        assert_eq!(program.defs[0].params, vec![SmolStr::new("a"), SmolStr::new("b")]);
        assert!(matches!(&program.defs[0].body.expr, Expr::Block(m) if m.len() == 2));
        assert_eq!(program.mappings.len(), 2);
    }

    #[rstest]
    #[case::unclosed_paren("f(1", ParseError::ExpectedClosingParen(Token {
        range: Range::new(crate::range::Position::new(1, 4), crate::range::Position::new(1, 4)),
        kind: TokenKind::Eof,
    }))]
    #[case::missing_then("if x 1", ParseError::UnexpectedToken(Token {
        range: Range::new(crate::range::Position::new(1, 6), crate::range::Position::new(1, 7)),
        kind: TokenKind::IntLiteral(1),
    }))]
    fn test_parse_error(#[case] code: &str, #[case] expected: ParseError) {
        assert_eq!(parse(code), Err(expected));
    }

    #[test]
    fn test_unknown_selector() {
        assert!(matches!(
            parse("foo[filter $]"),
            Err(ParseError::UnknownSelector(_))
        ));
    }

    #[test]
    fn test_unclosed_block() {
        assert!(matches!(parse("{ a: 1"), Err(ParseError::ExpectedClosingBrace(_))));
    }
}
