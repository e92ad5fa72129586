//! Label expressions: boolean combinations of label membership tests.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! iff     := implies ( "<->" implies )*
//! implies := or ( "->" implies )?
//! or      := and ( "||" and )*
//! and     := not ( "&&" not )*
//! not     := "!" not | primary
//! primary := "(" iff ")" | atom
//! ```
//!
//! Atoms are bare words (anything but whitespace and `&|!()<>"`, with `-`
//! allowed unless it starts `->`) or double-quoted strings.

use std::fmt;

use crate::{Error, Result};

/// Parsed label expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelExpression {
    /// Node carries this label
    Atom(String),
    /// Negation
    Not(Box<LabelExpression>),
    /// Both hold
    And(Box<LabelExpression>, Box<LabelExpression>),
    /// Either holds
    Or(Box<LabelExpression>, Box<LabelExpression>),
    /// Left implies right
    Implies(Box<LabelExpression>, Box<LabelExpression>),
    /// Both sides agree
    Iff(Box<LabelExpression>, Box<LabelExpression>),
}

impl LabelExpression {
    /// Parse an expression.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for empty input, unbalanced parentheses,
    /// dangling operators or unterminated quotes.
    pub fn parse(input: &str) -> Result<Self> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(Error::configuration("Empty label expression"));
        }
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.iff()?;
        if let Some(token) = parser.peek() {
            return Err(Error::configuration(format!(
                "Unexpected '{token}' in label expression '{input}'"
            )));
        }
        Ok(expr)
    }

    /// Evaluate against a label membership test.
    pub fn evaluate(&self, has_label: &dyn Fn(&str) -> bool) -> bool {
        match self {
            Self::Atom(label) => has_label(label),
            Self::Not(inner) => !inner.evaluate(has_label),
            Self::And(l, r) => l.evaluate(has_label) && r.evaluate(has_label),
            Self::Or(l, r) => l.evaluate(has_label) || r.evaluate(has_label),
            Self::Implies(l, r) => !l.evaluate(has_label) || r.evaluate(has_label),
            Self::Iff(l, r) => l.evaluate(has_label) == r.evaluate(has_label),
        }
    }
}

impl fmt::Display for LabelExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom(label) if label.chars().all(is_atom_char) && !label.is_empty() => {
                write!(f, "{label}")
            }
            Self::Atom(label) => write!(f, "\"{}\"", label.replace('"', "\\\"")),
            Self::Not(inner) => write!(f, "!{inner}"),
            Self::And(l, r) => write!(f, "({l} && {r})"),
            Self::Or(l, r) => write!(f, "({l} || {r})"),
            Self::Implies(l, r) => write!(f, "({l} -> {r})"),
            Self::Iff(l, r) => write!(f, "({l} <-> {r})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Atom(String),
    LParen,
    RParen,
    Not,
    And,
    Or,
    Implies,
    Iff,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom(a) => write!(f, "{a}"),
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
            Self::Not => write!(f, "!"),
            Self::And => write!(f, "&&"),
            Self::Or => write!(f, "||"),
            Self::Implies => write!(f, "->"),
            Self::Iff => write!(f, "<->"),
        }
    }
}

fn is_atom_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '&' | '|' | '!' | '(' | ')' | '<' | '>' | '"')
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let expect = |i: usize, s: &str| -> bool {
        s.chars()
            .enumerate()
            .all(|(off, c)| chars.get(i + off) == Some(&c))
    };

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '(' {
            tokens.push(Token::LParen);
            i += 1;
        } else if c == ')' {
            tokens.push(Token::RParen);
            i += 1;
        } else if c == '!' {
            tokens.push(Token::Not);
            i += 1;
        } else if expect(i, "&&") {
            tokens.push(Token::And);
            i += 2;
        } else if expect(i, "||") {
            tokens.push(Token::Or);
            i += 2;
        } else if expect(i, "<->") {
            tokens.push(Token::Iff);
            i += 3;
        } else if expect(i, "->") {
            tokens.push(Token::Implies);
            i += 2;
        } else if c == '"' {
            let mut atom = String::new();
            i += 1;
            loop {
                match chars.get(i) {
                    None => {
                        return Err(Error::configuration(format!(
                            "Unterminated quote in label expression '{input}'"
                        )));
                    }
                    Some('\\') if chars.get(i + 1).is_some() => {
                        atom.push(chars[i + 1]);
                        i += 2;
                    }
                    Some('"') => {
                        i += 1;
                        break;
                    }
                    Some(&other) => {
                        atom.push(other);
                        i += 1;
                    }
                }
            }
            tokens.push(Token::Atom(atom));
        } else if is_atom_char(c) {
            let start = i;
            while i < chars.len() && is_atom_char(chars[i]) && !expect(i, "->") {
                i += 1;
            }
            tokens.push(Token::Atom(chars[start..i].iter().collect()));
        } else {
            return Err(Error::configuration(format!(
                "Unexpected character '{c}' in label expression '{input}'"
            )));
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn iff(&mut self) -> Result<LabelExpression> {
        let mut left = self.implies()?;
        while self.eat(&Token::Iff) {
            let right = self.implies()?;
            left = LabelExpression::Iff(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn implies(&mut self) -> Result<LabelExpression> {
        let left = self.or()?;
        if self.eat(&Token::Implies) {
            let right = self.implies()?;
            return Ok(LabelExpression::Implies(Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn or(&mut self) -> Result<LabelExpression> {
        let mut left = self.and()?;
        while self.eat(&Token::Or) {
            let right = self.and()?;
            left = LabelExpression::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<LabelExpression> {
        let mut left = self.not()?;
        while self.eat(&Token::And) {
            let right = self.not()?;
            left = LabelExpression::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not(&mut self) -> Result<LabelExpression> {
        if self.eat(&Token::Not) {
            return Ok(LabelExpression::Not(Box::new(self.not()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<LabelExpression> {
        match self.tokens.get(self.pos).cloned() {
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.iff()?;
                if !self.eat(&Token::RParen) {
                    return Err(Error::configuration("Missing ')' in label expression"));
                }
                Ok(inner)
            }
            Some(Token::Atom(label)) => {
                self.pos += 1;
                Ok(LabelExpression::Atom(label))
            }
            Some(other) => Err(Error::configuration(format!(
                "Expected a label but found '{other}'"
            ))),
            None => Err(Error::configuration(
                "Label expression ends where a label was expected",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expr: &str, labels: &[&str]) -> bool {
        LabelExpression::parse(expr)
            .unwrap()
            .evaluate(&|l| labels.contains(&l))
    }

    #[test]
    fn test_single_atom() {
        assert_eq!(
            LabelExpression::parse("linux").unwrap(),
            LabelExpression::Atom("linux".into())
        );
        assert!(eval("linux", &["linux"]));
        assert!(!eval("linux", &["windows"]));
    }

    #[test]
    fn test_hyphenated_atom() {
        assert!(eval("linux-x64", &["linux-x64"]));
        assert!(eval("a->b", &["b"]));
        assert!(!eval("a->b", &["a"]));
    }

    #[test]
    fn test_precedence() {
        // && binds tighter than ||
        assert!(eval("a || b && c", &["a"]));
        assert!(!eval("(a || b) && c", &["a"]));
        // ! binds tightest
        assert!(eval("!a && b", &["b"]));
        assert!(!eval("!(a || b)", &["b"]));
    }

    #[test]
    fn test_implies_and_iff() {
        assert!(eval("a -> b", &[]));
        assert!(eval("a -> b", &["a", "b"]));
        assert!(!eval("a -> b", &["a"]));
        assert!(eval("a <-> b", &[]));
        assert!(eval("a <-> b", &["a", "b"]));
        assert!(!eval("a <-> b", &["b"]));
    }

    #[test]
    fn test_quoted_atom() {
        assert!(eval("\"my label\" && x", &["my label", "x"]));
        assert!(eval("\"a\\\"b\"", &["a\"b"]));
    }

    #[test]
    fn test_parse_errors() {
        assert!(LabelExpression::parse("").is_err());
        assert!(LabelExpression::parse("   ").is_err());
        assert!(LabelExpression::parse("(a && b").is_err());
        assert!(LabelExpression::parse("a &&").is_err());
        assert!(LabelExpression::parse("a b").is_err());
        assert!(LabelExpression::parse("\"open").is_err());
        assert!(LabelExpression::parse("a & b").is_err());
    }

    #[test]
    fn test_display_round_trips() {
        let expr = LabelExpression::parse("!a && (b || \"c d\") -> e").unwrap();
        let reparsed = LabelExpression::parse(&expr.to_string()).unwrap();
        assert_eq!(expr, reparsed);
    }
}
