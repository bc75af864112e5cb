//! Statement-level syntax tree.
//!
//! The tree only captures statement structure: simple statements, and
//! compound statements whose header ends with `:` and owns a body. This is
//! enough for structural checks and for detecting files that do not parse.

use crate::tokenizer::Tokenizer;
use crate::{Position, SyntaxError, SyntaxErrorKind, Token, TokenKind};

use std::sync::Arc;

const KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

/// Keywords that introduce a compound statement and require a trailing `:`.
const COMPOUND_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "while", "for", "try", "except", "finally", "with", "def", "class",
];

/// Soft keywords that only act as keywords at the start of a statement.
const SOFT_KEYWORDS: &[&str] = &["match", "case", "type"];

/// The kind of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// A statement without a body.
    Simple,
    /// A statement whose header ends with `:` and owns a body.
    Compound,
}

/// A statement of the syntax tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// The statement kind.
    pub kind: StatementKind,
    /// Tokens of the statement, or of the header for compound statements.
    pub tokens: Vec<Token>,
    /// Body of a compound statement.
    pub body: Vec<Statement>,
}

impl Statement {
    /// Position of the first token.
    pub fn start(&self) -> Position {
        self.tokens.first().map_or(Position::new(1, 0), |t| t.start)
    }

    /// The leading keyword, if the statement starts with one.
    ///
    /// `async def`, `async for` and `async with` report the keyword after
    /// `async`.
    pub fn keyword(&self) -> Option<&str> {
        let mut names = self.tokens.iter().filter(|t| t.kind == TokenKind::Name);
        let first = names.next()?.text.as_str();
        if first == "async" {
            return names.next().map(|t| t.text.as_str());
        }
        (is_keyword(first) || self.kind == StatementKind::Compound).then_some(first)
    }

    /// The name defined by a `def` or `class` statement.
    pub fn defined_name(&self) -> Option<&str> {
        match self.keyword()? {
            "def" | "class" => {
                let mut names = self.tokens.iter().filter(|t| t.kind == TokenKind::Name);
                names
                    .find(|t| t.text == "def" || t.text == "class")
                    .and_then(|_| names.next())
                    .map(|t| t.text.as_str())
            }
            _ => None,
        }
    }
}

/// Statement tree of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntaxTree {
    /// Top-level statements in source order.
    pub statements: Vec<Statement>,
}

impl SyntaxTree {
    /// Parses the given physical lines.
    pub fn parse(lines: &[String]) -> Result<Self, SyntaxError> {
        let lines: Arc<[String]> = lines.to_vec().into();
        let mut items = Vec::new();
        let mut current = Vec::new();
        let mut brackets: Vec<Token> = Vec::new();

        for token in Tokenizer::new(lines) {
            let token = token.map_err(|err| {
                if err.message.starts_with("unindent") {
                    SyntaxError::indentation(err.message, err.position)
                } else {
                    SyntaxError::from(err)
                }
            })?;
            match token.kind {
                TokenKind::Comment | TokenKind::Nl | TokenKind::EndMarker => {}
                TokenKind::Indent => items.push(Item::Indent(token.end)),
                TokenKind::Dedent => items.push(Item::Dedent),
                TokenKind::Newline => {
                    if !current.is_empty() {
                        items.push(Item::Line(std::mem::take(&mut current)));
                    }
                }
                TokenKind::ErrorToken => return Err(invalid_token(&token)),
                TokenKind::Op => {
                    check_bracket(&mut brackets, &token)?;
                    current.push(token);
                }
                _ => current.push(token),
            }
        }

        let mut parser = Parser { items, pos: 0 };
        let statements = parser.parse_block(false)?;
        Ok(Self { statements })
    }

    /// Iterates over all statements, parents before their bodies.
    pub fn walk(&self) -> impl Iterator<Item = &Statement> {
        let mut stack: Vec<&Statement> = self.statements.iter().rev().collect();
        std::iter::from_fn(move || {
            let statement = stack.pop()?;
            stack.extend(statement.body.iter().rev());
            Some(statement)
        })
    }
}

#[derive(Debug)]
enum Item {
    Line(Vec<Token>),
    Indent(Position),
    Dedent,
}

struct Parser {
    items: Vec<Item>,
    pos: usize,
}

impl Parser {
    fn parse_block(&mut self, nested: bool) -> Result<Vec<Statement>, SyntaxError> {
        let mut statements = Vec::new();
        while self.pos < self.items.len() {
            match &mut self.items[self.pos] {
                Item::Dedent if nested => {
                    self.pos += 1;
                    return Ok(statements);
                }
                Item::Dedent => self.pos += 1,
                Item::Indent(position) => {
                    return Err(SyntaxError::indentation("unexpected indent", *position));
                }
                Item::Line(tokens) => {
                    let tokens = std::mem::take(tokens);
                    self.pos += 1;
                    self.parse_line(tokens, &mut statements)?;
                }
            }
        }
        Ok(statements)
    }

    fn parse_line(&mut self, tokens: Vec<Token>, out: &mut Vec<Statement>) -> Result<(), SyntaxError> {
        let lead = match tokens.first() {
            Some(first) if first.kind == TokenKind::Name && first.text == "async" => tokens.get(1),
            first => first,
        };
        let leads_compound = lead.is_some_and(|t| {
            t.kind == TokenKind::Name && COMPOUND_KEYWORDS.contains(&t.text.as_str())
        }) || tokens.first().is_some_and(|t| is_soft_compound(&tokens, t));

        if !leads_compound {
            out.extend(split_simple(tokens)?);
            return Ok(());
        }

        let Some(colon) = header_colon(&tokens) else {
            let last = tokens.last().map_or(Position::new(1, 0), |t| t.end);
            return Err(SyntaxError::syntax("expected ':'", last));
        };

        let mut header = tokens;
        let inline = header.split_off(colon + 1);
        check_operands(&header)?;

        let body = if inline.is_empty() {
            match self.items.get(self.pos) {
                Some(Item::Indent(_)) => {
                    self.pos += 1;
                    self.parse_block(true)?
                }
                _ => {
                    let position = self.next_line_start().unwrap_or(Position::new(
                        header.last().map_or(1, |t| t.end.line + 1),
                        0,
                    ));
                    return Err(SyntaxError::indentation(
                        "expected an indented block",
                        position,
                    ));
                }
            }
        } else {
            split_simple(inline)?
        };

        out.push(Statement {
            kind: StatementKind::Compound,
            tokens: header,
            body,
        });
        Ok(())
    }

    fn next_line_start(&self) -> Option<Position> {
        self.items[self.pos..].iter().find_map(|item| match item {
            Item::Line(tokens) => tokens.first().map(|t| t.start),
            _ => None,
        })
    }
}

fn is_keyword(text: &str) -> bool {
    KEYWORDS.contains(&text)
}

/// `match x:` and `case y:` open a block only when followed by more tokens
/// and a trailing colon.
fn is_soft_compound(tokens: &[Token], first: &Token) -> bool {
    matches!(first.text.as_str(), "match" | "case")
        && first.kind == TokenKind::Name
        && tokens.len() > 2
        && tokens.last().is_some_and(|t| t.text == ":")
        && tokens[1].kind != TokenKind::Op
}

/// Index of the colon that ends a compound statement header.
fn header_colon(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0usize;
    let mut lambdas = 0usize;
    for (idx, token) in tokens.iter().enumerate() {
        match (token.kind, token.text.as_str()) {
            (TokenKind::Op, "(" | "[" | "{") => depth += 1,
            (TokenKind::Op, ")" | "]" | "}") => depth = depth.saturating_sub(1),
            (TokenKind::Name, "lambda") if depth == 0 => lambdas += 1,
            (TokenKind::Op, ":") if depth == 0 && lambdas > 0 => lambdas -= 1,
            (TokenKind::Op, ":") if depth == 0 => return Some(idx),
            _ => {}
        }
    }
    None
}

/// Splits a line on top-level `;` into simple statements.
fn split_simple(tokens: Vec<Token>) -> Result<Vec<Statement>, SyntaxError> {
    let mut statements = Vec::new();
    let mut current = Vec::new();
    for token in tokens {
        if token.kind == TokenKind::Op && token.text == ";" {
            if current.is_empty() {
                return Err(SyntaxError::syntax("invalid syntax", token.start));
            }
            statements.push(simple(std::mem::take(&mut current))?);
        } else {
            current.push(token);
        }
    }
    if !current.is_empty() {
        statements.push(simple(current)?);
    }
    Ok(statements)
}

fn simple(tokens: Vec<Token>) -> Result<Statement, SyntaxError> {
    check_operands(&tokens)?;
    Ok(Statement {
        kind: StatementKind::Simple,
        tokens,
        body: Vec::new(),
    })
}

/// Rejects two operands next to each other, such as `print "x"`.
fn check_operands(tokens: &[Token]) -> Result<(), SyntaxError> {
    let is_operand = |idx: usize, token: &Token| match token.kind {
        TokenKind::Number | TokenKind::String => true,
        TokenKind::Name => {
            !is_keyword(&token.text) && !(idx == 0 && SOFT_KEYWORDS.contains(&token.text.as_str()))
        }
        _ => false,
    };

    for (idx, pair) in tokens.windows(2).enumerate() {
        let (left, right) = (&pair[0], &pair[1]);
        let both_strings = left.kind == TokenKind::String && right.kind == TokenKind::String;
        if is_operand(idx, left) && is_operand(idx + 1, right) && !both_strings {
            return Err(SyntaxError::syntax("invalid syntax", right.start));
        }
    }
    Ok(())
}

fn check_bracket(stack: &mut Vec<Token>, token: &Token) -> Result<(), SyntaxError> {
    let expected_open = match token.text.as_str() {
        "(" | "[" | "{" => {
            stack.push(token.clone());
            return Ok(());
        }
        ")" => "(",
        "]" => "[",
        "}" => "{",
        _ => return Ok(()),
    };
    match stack.pop() {
        Some(open) if open.text == expected_open => Ok(()),
        Some(open) => Err(SyntaxError::syntax(
            format!(
                "closing parenthesis '{}' does not match opening parenthesis '{}'",
                token.text, open.text
            ),
            token.start,
        )),
        None => Err(SyntaxError::syntax(
            format!("unmatched '{}'", token.text),
            token.start,
        )),
    }
}

fn invalid_token(token: &Token) -> SyntaxError {
    let message = match token.text.chars().next() {
        Some('\'' | '"') => "unterminated string literal".to_string(),
        Some(c) => format!("invalid character '{c}'"),
        None => "invalid syntax".to_string(),
    };
    SyntaxError {
        kind: SyntaxErrorKind::Syntax,
        message,
        position: Some(token.start),
    }
}
