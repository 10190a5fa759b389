//! Build constraint expressions from `//go:build` and `// +build` lines.

use std::fmt;

/// A parsed build constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintExpr {
    Tag(String),
    Not(Box<ConstraintExpr>),
    And(Box<ConstraintExpr>, Box<ConstraintExpr>),
    Or(Box<ConstraintExpr>, Box<ConstraintExpr>),
}

impl ConstraintExpr {
    /// Evaluate with `has_tag` deciding each tag.
    pub fn eval(&self, has_tag: &impl Fn(&str) -> bool) -> bool {
        match self {
            ConstraintExpr::Tag(tag) => has_tag(tag),
            ConstraintExpr::Not(inner) => !inner.eval(has_tag),
            ConstraintExpr::And(left, right) => left.eval(has_tag) && right.eval(has_tag),
            ConstraintExpr::Or(left, right) => left.eval(has_tag) || right.eval(has_tag),
        }
    }

    fn and(left: Option<Self>, right: Self) -> Self {
        match left {
            Some(left) => ConstraintExpr::And(Box::new(left), Box::new(right)),
            None => right,
        }
    }

    fn or(left: Option<Self>, right: Self) -> Self {
        match left {
            Some(left) => ConstraintExpr::Or(Box::new(left), Box::new(right)),
            None => right,
        }
    }
}

impl fmt::Display for ConstraintExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintExpr::Tag(tag) => write!(f, "{}", tag),
            ConstraintExpr::Not(inner) => match inner.as_ref() {
                ConstraintExpr::Tag(_) | ConstraintExpr::Not(_) => write!(f, "!{}", inner),
                _ => write!(f, "!({})", inner),
            },
            ConstraintExpr::And(left, right) => {
                write_operand(f, left, true)?;
                write!(f, " && ")?;
                write_operand(f, right, true)
            }
            ConstraintExpr::Or(left, right) => {
                write_operand(f, left, false)?;
                write!(f, " || ")?;
                write_operand(f, right, false)
            }
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &ConstraintExpr, in_and: bool) -> fmt::Result {
    if in_and && matches!(expr, ConstraintExpr::Or(..)) {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

/// True for a `//go:build` line.
pub fn is_go_build(line: &str) -> bool {
    match line.strip_prefix("//go:build") {
        Some(rest) => rest.is_empty() || rest.starts_with([' ', '\t']),
        None => false,
    }
}

/// True for a `// +build` line.
pub fn is_plus_build(line: &str) -> bool {
    let Some(rest) = line.strip_prefix("//") else {
        return false;
    };
    match rest.trim().strip_prefix("+build") {
        Some(after) => after.is_empty() || after.starts_with([' ', '\t']),
        None => false,
    }
}

/// Parse a complete `//go:build <expr>` line.
pub fn parse_go_build(line: &str) -> Result<ConstraintExpr, String> {
    let Some(expression) = line.strip_prefix("//go:build") else {
        return Err("not a //go:build line".to_string());
    };
    let tokens = tokenize(expression)?;
    let mut parser = ExprParser { tokens, position: 0 };
    let expr = parser.parse_or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(format!("unexpected {}", token)),
    }
}

/// Parse a complete `// +build` line.
///
/// Space separated options are alternatives and comma separated terms must all hold.
/// Malformed terms become the tag `ignore`, which no context satisfies.
pub fn parse_plus_build(line: &str) -> Result<ConstraintExpr, String> {
    let text = line
        .strip_prefix("//")
        .map(str::trim)
        .and_then(|rest| rest.strip_prefix("+build"))
        .ok_or_else(|| "not a +build line".to_string())?;

    let mut expr = None;
    for clause in text.split_whitespace() {
        let mut clause_expr = None;
        for literal in clause.split(',') {
            let term = if literal.starts_with("!!") || literal == "!" {
                ignore()
            } else {
                let (negated, name) = match literal.strip_prefix('!') {
                    Some(name) => (true, name),
                    None => (false, literal),
                };
                let tag = if is_valid_tag(name) {
                    ConstraintExpr::Tag(name.to_string())
                } else {
                    ignore()
                };
                if negated {
                    ConstraintExpr::Not(Box::new(tag))
                } else {
                    tag
                }
            };
            clause_expr = Some(ConstraintExpr::and(clause_expr, term));
        }
        if let Some(clause_expr) = clause_expr {
            expr = Some(ConstraintExpr::or(expr, clause_expr));
        }
    }
    Ok(expr.unwrap_or_else(ignore))
}

fn ignore() -> ConstraintExpr {
    ConstraintExpr::Tag("ignore".to_string())
}

fn is_valid_tag(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Tag(String),
    Not,
    And,
    Or,
    Open,
    Close,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Tag(tag) => write!(f, "tag {}", tag),
            Token::Not => write!(f, "!"),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Open => write!(f, "("),
            Token::Close => write!(f, ")"),
        }
    }
}

fn tokenize(expression: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = expression.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        match c {
            ' ' | '\t' => {}
            '!' => tokens.push(Token::Not),
            '(' => tokens.push(Token::Open),
            ')' => tokens.push(Token::Close),
            '&' | '|' => {
                if chars.next_if(|&(_, next)| next == c).is_none() {
                    return Err(format!("invalid syntax at {}", c));
                }
                tokens.push(if c == '&' { Token::And } else { Token::Or });
            }
            c if c.is_alphanumeric() || c == '_' || c == '.' => {
                let mut end = start + c.len_utf8();
                while let Some((index, next)) =
                    chars.next_if(|&(_, next)| next.is_alphanumeric() || next == '_' || next == '.')
                {
                    end = index + next.len_utf8();
                }
                tokens.push(Token::Tag(expression[start..end].to_string()));
            }
            other => return Err(format!("invalid syntax at {}", other)),
        }
    }
    Ok(tokens)
}

struct ExprParser {
    tokens: Vec<Token>,
    position: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn parse_or(&mut self) -> Result<ConstraintExpr, String> {
        let mut expr = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.position += 1;
            let right = self.parse_and()?;
            expr = ConstraintExpr::Or(Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<ConstraintExpr, String> {
        let mut expr = self.parse_not()?;
        while self.peek() == Some(&Token::And) {
            self.position += 1;
            let right = self.parse_not()?;
            expr = ConstraintExpr::And(Box::new(expr), Box::new(right));
        }
        Ok(expr)
    }

    fn parse_not(&mut self) -> Result<ConstraintExpr, String> {
        if self.peek() == Some(&Token::Not) {
            self.position += 1;
            if self.peek() == Some(&Token::Not) {
                return Err("double negation not allowed".to_string());
            }
            return Ok(ConstraintExpr::Not(Box::new(self.parse_atom()?)));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<ConstraintExpr, String> {
        match self.next() {
            Some(Token::Tag(tag)) => Ok(ConstraintExpr::Tag(tag)),
            Some(Token::Open) => {
                let expr = self.parse_or()?;
                match self.next() {
                    Some(Token::Close) => Ok(expr),
                    _ => Err("missing )".to_string()),
                }
            }
            Some(token) => Err(format!("unexpected {}", token)),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}
