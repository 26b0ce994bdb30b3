//! Rule predicates: a small expression language compiled once per rule and
//! evaluated against each transaction.
//!
//! Compilation and evaluation fail independently. Syntax errors, unknown
//! fields or methods, and bad regexes surface at edit/import time and mark
//! the rule invalid; an unknown column or a type mismatch fails only the
//! single evaluation it occurs in.
//!
//! A predicate is one expression over the transaction, e.g.
//!
//! ```text
//! description.contains_any("albert heijn", "jumbo") && amount < 0
//! row["Account"] == "NL91ABNA0417164300" || filename.starts_with("savings")
//! date >= "2024-01-01" && month <= 6
//! ```

use regex::Regex;
use thiserror::Error;

use tally_core::{CellValue, Rule, Transaction};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("empty predicate")]
    Empty,
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
    #[error("unterminated string starting at offset {0}")]
    UnterminatedString(usize),
    #[error("malformed number '{0}'")]
    BadNumber(String),
    #[error("unexpected end of predicate")]
    UnexpectedEnd,
    #[error("unexpected {0}")]
    UnexpectedToken(String),
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("unknown method '{0}'")]
    UnknownMethod(String),
    #[error("{method}() takes {expected}")]
    BadArity { method: String, expected: &'static str },
    #[error("method arguments must be string literals")]
    NonLiteralArg,
    #[error("invalid regex: {0}")]
    BadRegex(#[from] regex::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
    #[error("cannot {op} {lhs} and {rhs}")]
    TypeMismatch {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("{method}() needs a {expected} receiver, got {got}")]
    BadReceiver {
        method: &'static str,
        expected: &'static str,
        got: &'static str,
    },
}

/// A rule predicate after successful compilation. Cheap to evaluate
/// repeatedly; regexes are compiled exactly once, at rule-build time.
#[derive(Debug, Clone)]
pub struct CompiledPredicate {
    expr: Expr,
}

/// Compile predicate source. Whitespace-only source is rejected — an empty
/// rule is skippable, not compilable.
pub fn compile(source: &str) -> Result<CompiledPredicate, CompileError> {
    if source.trim().is_empty() {
        return Err(CompileError::Empty);
    }
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expression()?;
    if let Some(tok) = parser.peek() {
        return Err(CompileError::UnexpectedToken(tok.describe()));
    }
    Ok(CompiledPredicate { expr })
}

/// Re-check a rule's source and update its validity flag and diagnostic.
/// Empty source stays valid: such rules are silently skipped at evaluation.
pub fn validate_rule(rule: &mut Rule) {
    if rule.code.trim().is_empty() {
        rule.is_valid = true;
        rule.error = None;
        return;
    }
    match compile(&rule.code) {
        Ok(_) => {
            rule.is_valid = true;
            rule.error = None;
        }
        Err(err) => {
            rule.is_valid = false;
            rule.error = Some(err.to_string());
        }
    }
}

impl CompiledPredicate {
    /// Evaluate against one transaction. The result is truthiness-coerced:
    /// a non-empty string or non-zero number counts as a match.
    pub fn eval(&self, tx: &Transaction) -> Result<bool, EvalError> {
        Ok(eval_expr(&self.expr, tx)?.truthy())
    }
}

// ── Lexer ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    AndAnd,
    OrOr,
    Bang,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {n}"),
            Token::Str(s) => format!("string \"{s}\""),
            Token::Ident(name) => format!("'{name}'"),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Dot => "'.'".to_string(),
            Token::AndAnd => "'&&'".to_string(),
            Token::OrOr => "'||'".to_string(),
            Token::Bang => "'!'".to_string(),
            Token::EqEq => "'=='".to_string(),
            Token::NotEq => "'!='".to_string(),
            Token::Lt => "'<'".to_string(),
            Token::LtEq => "'<='".to_string(),
            Token::Gt => "'>'".to_string(),
            Token::GtEq => "'>='".to_string(),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
        }
    }
}

fn tokenize(src: &str) -> Result<Vec<Token>, CompileError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' => {
                let mut text = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        text.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let n = text
                    .parse::<f64>()
                    .map_err(|_| CompileError::BadNumber(text.clone()))?;
                tokens.push(Token::Number(n));
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some((_, d)) if d == quote => break,
                        Some((_, d)) => text.push(d),
                        None => return Err(CompileError::UnterminatedString(pos)),
                    }
                }
                tokens.push(Token::Str(text));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' {
                        name.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(name));
            }
            '&' => {
                chars.next();
                match chars.next() {
                    Some((_, '&')) => tokens.push(Token::AndAnd),
                    _ => return Err(CompileError::UnexpectedChar { ch: '&', offset: pos }),
                }
            }
            '|' => {
                chars.next();
                match chars.next() {
                    Some((_, '|')) => tokens.push(Token::OrOr),
                    _ => return Err(CompileError::UnexpectedChar { ch: '|', offset: pos }),
                }
            }
            '=' => {
                chars.next();
                match chars.next() {
                    Some((_, '=')) => tokens.push(Token::EqEq),
                    _ => return Err(CompileError::UnexpectedChar { ch: '=', offset: pos }),
                }
            }
            '!' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    tokens.push(Token::NotEq);
                } else {
                    tokens.push(Token::Bang);
                }
            }
            '<' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    tokens.push(Token::LtEq);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '>' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '='))) {
                    chars.next();
                    tokens.push(Token::GtEq);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '/' => {
                chars.next();
                tokens.push(Token::Slash);
            }
            other => {
                return Err(CompileError::UnexpectedChar { ch: other, offset: pos });
            }
        }
    }

    Ok(tokens)
}

// ── Parser ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Expr {
    Num(f64),
    Str(String),
    Bool(bool),
    Field(Field),
    RawColumn(String),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    Method(Box<Expr>, Method),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Amount,
    Description,
    Filename,
    Date,
    Year,
    Month,
    Day,
}

impl Field {
    fn by_name(name: &str) -> Option<Field> {
        match name {
            "amount" => Some(Field::Amount),
            "description" => Some(Field::Description),
            "filename" => Some(Field::Filename),
            "date" => Some(Field::Date),
            "year" => Some(Field::Year),
            "month" => Some(Field::Month),
            "day" => Some(Field::Day),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone)]
enum Method {
    Contains(String),
    ContainsAny(Vec<String>),
    StartsWith(String),
    EndsWith(String),
    Matches(Regex),
    Lower,
    Upper,
    Abs,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Result<Token, CompileError> {
        let tok = self.tokens.get(self.pos).cloned().ok_or(CompileError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(tok)
    }

    fn eat(&mut self, wanted: &Token) -> bool {
        if self.peek() == Some(wanted) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, wanted: Token) -> Result<(), CompileError> {
        let tok = self.advance()?;
        if tok == wanted {
            Ok(())
        } else {
            Err(CompileError::UnexpectedToken(tok.describe()))
        }
    }

    fn expression(&mut self) -> Result<Expr, CompileError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.and_expr()?;
        while self.eat(&Token::OrOr) {
            let rhs = self.and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.cmp_expr()?;
        while self.eat(&Token::AndAnd) {
            let rhs = self.cmp_expr()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn cmp_expr(&mut self) -> Result<Expr, CompileError> {
        let lhs = self.additive()?;
        let op = match self.peek() {
            Some(Token::EqEq) => CmpOp::Eq,
            Some(Token::NotEq) => CmpOp::Ne,
            Some(Token::Lt) => CmpOp::Lt,
            Some(Token::LtEq) => CmpOp::Le,
            Some(Token::Gt) => CmpOp::Gt,
            Some(Token::GtEq) => CmpOp::Ge,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.additive()?;
        Ok(Expr::Cmp(op, Box::new(lhs), Box::new(rhs)))
    }

    fn additive(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.multiplicative()?;
            lhs = Expr::Arith(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => ArithOp::Mul,
                Some(Token::Slash) => ArithOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Arith(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr, CompileError> {
        if self.eat(&Token::Bang) {
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        if self.eat(&Token::Minus) {
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.primary()?;
        while self.eat(&Token::Dot) {
            let name = match self.advance()? {
                Token::Ident(name) => name,
                other => return Err(CompileError::UnexpectedToken(other.describe())),
            };
            self.expect(Token::LParen)?;
            let args = self.string_args()?;
            expr = Expr::Method(Box::new(expr), build_method(&name, args)?);
        }
        Ok(expr)
    }

    /// Zero or more string-literal arguments up to the closing paren.
    fn string_args(&mut self) -> Result<Vec<String>, CompileError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            match self.advance()? {
                Token::Str(s) => args.push(s),
                _ => return Err(CompileError::NonLiteralArg),
            }
            if self.eat(&Token::RParen) {
                return Ok(args);
            }
            self.expect(Token::Comma)?;
        }
    }

    fn primary(&mut self) -> Result<Expr, CompileError> {
        match self.advance()? {
            Token::Number(n) => Ok(Expr::Num(n)),
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::LParen => {
                let inner = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if name == "true" {
                    return Ok(Expr::Bool(true));
                }
                if name == "false" {
                    return Ok(Expr::Bool(false));
                }
                // `row` is the whole record: `row.field` or `row["Column"]`.
                if name == "row" {
                    if self.eat(&Token::LBracket) {
                        let column = match self.advance()? {
                            Token::Str(s) => s,
                            other => return Err(CompileError::UnexpectedToken(other.describe())),
                        };
                        self.expect(Token::RBracket)?;
                        return Ok(Expr::RawColumn(column));
                    }
                    if self.eat(&Token::Dot) {
                        return match self.advance()? {
                            Token::Ident(field) => Field::by_name(&field)
                                .map(Expr::Field)
                                .ok_or(CompileError::UnknownField(field)),
                            other => Err(CompileError::UnexpectedToken(other.describe())),
                        };
                    }
                    return Err(CompileError::UnknownField(name));
                }
                Field::by_name(&name)
                    .map(Expr::Field)
                    .ok_or(CompileError::UnknownField(name))
            }
            other => Err(CompileError::UnexpectedToken(other.describe())),
        }
    }
}

fn build_method(name: &str, args: Vec<String>) -> Result<Method, CompileError> {
    let arity = |expected: &'static str| CompileError::BadArity {
        method: name.to_string(),
        expected,
    };
    match name {
        "contains" => match <[String; 1]>::try_from(args) {
            Ok([s]) => Ok(Method::Contains(s)),
            Err(_) => Err(arity("one string")),
        },
        "contains_any" => {
            if args.is_empty() {
                Err(arity("at least one string"))
            } else {
                Ok(Method::ContainsAny(args))
            }
        }
        "starts_with" => match <[String; 1]>::try_from(args) {
            Ok([s]) => Ok(Method::StartsWith(s)),
            Err(_) => Err(arity("one string")),
        },
        "ends_with" => match <[String; 1]>::try_from(args) {
            Ok([s]) => Ok(Method::EndsWith(s)),
            Err(_) => Err(arity("one string")),
        },
        "matches" => match <[String; 1]>::try_from(args) {
            Ok([pattern]) => Ok(Method::Matches(Regex::new(&pattern)?)),
            Err(_) => Err(arity("one regex string")),
        },
        "lower" => {
            if args.is_empty() {
                Ok(Method::Lower)
            } else {
                Err(arity("no arguments"))
            }
        }
        "upper" => {
            if args.is_empty() {
                Ok(Method::Upper)
            } else {
                Err(arity("no arguments"))
            }
        }
        "abs" => {
            if args.is_empty() {
                Ok(Method::Abs)
            } else {
                Err(arity("no arguments"))
            }
        }
        _ => Err(CompileError::UnknownMethod(name.to_string())),
    }
}

// ── Evaluation ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Text(s) => !s.is_empty(),
            Value::Bool(b) => *b,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "string",
            Value::Bool(_) => "boolean",
        }
    }
}

fn cell_to_value(cell: &CellValue) -> Value {
    match cell {
        CellValue::Number(n) => Value::Number(*n),
        CellValue::Bool(b) => Value::Bool(*b),
        CellValue::Text(s) => Value::Text(s.clone()),
        CellValue::Empty => Value::Text(String::new()),
    }
}

fn eval_expr(expr: &Expr, tx: &Transaction) -> Result<Value, EvalError> {
    match expr {
        Expr::Num(n) => Ok(Value::Number(*n)),
        Expr::Str(s) => Ok(Value::Text(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Field(field) => Ok(match field {
            Field::Amount => Value::Number(tx.amount),
            Field::Description => Value::Text(tx.description.clone()),
            Field::Filename => Value::Text(tx.filename.clone()),
            Field::Date => Value::Text(tx.date_string.clone()),
            Field::Year => Value::Number(tx.year as f64),
            Field::Month => Value::Number(tx.month as f64),
            Field::Day => Value::Number(tx.day as f64),
        }),
        Expr::RawColumn(name) => tx
            .raw
            .get(name)
            .map(cell_to_value)
            .ok_or_else(|| EvalError::UnknownColumn(name.clone())),
        Expr::Not(inner) => Ok(Value::Bool(!eval_expr(inner, tx)?.truthy())),
        Expr::Neg(inner) => match eval_expr(inner, tx)? {
            Value::Number(n) => Ok(Value::Number(-n)),
            other => Err(EvalError::TypeMismatch {
                op: "negate",
                lhs: other.type_name(),
                rhs: "number",
            }),
        },
        Expr::And(a, b) => {
            if !eval_expr(a, tx)?.truthy() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(eval_expr(b, tx)?.truthy()))
        }
        Expr::Or(a, b) => {
            if eval_expr(a, tx)?.truthy() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(eval_expr(b, tx)?.truthy()))
        }
        Expr::Cmp(op, a, b) => compare(*op, eval_expr(a, tx)?, eval_expr(b, tx)?),
        Expr::Arith(op, a, b) => arithmetic(*op, eval_expr(a, tx)?, eval_expr(b, tx)?),
        Expr::Method(recv, method) => apply_method(method, eval_expr(recv, tx)?),
    }
}

fn compare(op: CmpOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    use std::cmp::Ordering;

    // Equality across mismatched types is false, never an error; ordering
    // across mismatched types is an error.
    let ordering = match (&lhs, &rhs) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    };

    let result = match (op, ordering) {
        (CmpOp::Eq, ord) => ord == Some(Ordering::Equal),
        (CmpOp::Ne, ord) => ord != Some(Ordering::Equal),
        (_, None) => {
            return Err(EvalError::TypeMismatch {
                op: "order",
                lhs: lhs.type_name(),
                rhs: rhs.type_name(),
            });
        }
        (CmpOp::Lt, Some(ord)) => ord == Ordering::Less,
        (CmpOp::Le, Some(ord)) => ord != Ordering::Greater,
        (CmpOp::Gt, Some(ord)) => ord == Ordering::Greater,
        (CmpOp::Ge, Some(ord)) => ord != Ordering::Less,
    };
    Ok(Value::Bool(result))
}

fn arithmetic(op: ArithOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    let (Value::Number(a), Value::Number(b)) = (&lhs, &rhs) else {
        return Err(EvalError::TypeMismatch {
            op: "combine",
            lhs: lhs.type_name(),
            rhs: rhs.type_name(),
        });
    };
    Ok(Value::Number(match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => a / b,
    }))
}

fn apply_method(method: &Method, receiver: Value) -> Result<Value, EvalError> {
    let text = |method_name: &'static str| match &receiver {
        Value::Text(s) => Ok(s.as_str()),
        other => Err(EvalError::BadReceiver {
            method: method_name,
            expected: "string",
            got: other.type_name(),
        }),
    };

    match method {
        Method::Contains(needle) => Ok(Value::Bool(text("contains")?.contains(needle.as_str()))),
        Method::ContainsAny(needles) => {
            let haystack = text("contains_any")?;
            Ok(Value::Bool(needles.iter().any(|n| haystack.contains(n.as_str()))))
        }
        Method::StartsWith(prefix) => {
            Ok(Value::Bool(text("starts_with")?.starts_with(prefix.as_str())))
        }
        Method::EndsWith(suffix) => Ok(Value::Bool(text("ends_with")?.ends_with(suffix.as_str()))),
        Method::Matches(re) => Ok(Value::Bool(re.is_match(text("matches")?))),
        Method::Lower => Ok(Value::Text(text("lower")?.to_lowercase())),
        Method::Upper => Ok(Value::Text(text("upper")?.to_uppercase())),
        Method::Abs => match receiver {
            Value::Number(n) => Ok(Value::Number(n.abs())),
            other => Err(EvalError::BadReceiver {
                method: "abs",
                expected: "number",
                got: other.type_name(),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tally_core::CellValue;

    fn tx() -> Transaction {
        let mut tx = Transaction::new("bank.csv");
        tx.set_date(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        tx.amount = -4.5;
        tx.description = "ALBERT HEIJN 1403 AMSTERDAM".to_string();
        tx.raw.insert("Account".to_string(), CellValue::Text("NL91".to_string()));
        tx.raw.insert("Bedrag".to_string(), CellValue::Number(-4.5));
        tx
    }

    fn eval(src: &str) -> Result<bool, EvalError> {
        compile(src).unwrap().eval(&tx())
    }

    #[test]
    fn field_comparisons() {
        assert!(eval("amount < 0").unwrap());
        assert!(eval("year == 2024").unwrap());
        assert!(!eval("month > 3").unwrap());
        assert!(eval("day >= 5").unwrap());
    }

    #[test]
    fn string_methods() {
        assert!(eval(r#"description.contains("HEIJN")"#).unwrap());
        assert!(!eval(r#"description.contains("heijn")"#).unwrap());
        assert!(eval(r#"description.lower().contains("heijn")"#).unwrap());
        assert!(eval(r#"description.starts_with("ALBERT")"#).unwrap());
        assert!(eval(r#"filename.ends_with(".csv")"#).unwrap());
    }

    #[test]
    fn contains_any_matches_any_needle() {
        assert!(eval(r#"description.contains_any("JUMBO", "HEIJN")"#).unwrap());
        assert!(!eval(r#"description.contains_any("JUMBO", "LIDL")"#).unwrap());
    }

    #[test]
    fn regex_matches() {
        assert!(eval(r#"description.matches("HEIJN [0-9]+")"#).unwrap());
        assert!(!eval(r#"description.matches("^HEIJN")"#).unwrap());
    }

    #[test]
    fn date_string_orders_lexicographically() {
        assert!(eval(r#"date >= "2024-01-01" && date < "2025-01-01""#).unwrap());
        assert!(!eval(r#"date < "2024-01-01""#).unwrap());
    }

    #[test]
    fn boolean_connectives_and_grouping() {
        assert!(eval(r#"amount < 0 && description.contains("ALBERT")"#).unwrap());
        assert!(eval(r#"amount > 0 || month == 3"#).unwrap());
        assert!(eval(r#"!(amount > 0)"#).unwrap());
    }

    #[test]
    fn arithmetic_and_negation() {
        assert!(eval("amount * -1 > 4").unwrap());
        assert!(eval("amount.abs() == 4.5").unwrap());
        assert!(eval("amount + 4.5 == 0").unwrap());
    }

    #[test]
    fn row_prefix_and_raw_columns() {
        assert!(eval(r#"row.amount < 0"#).unwrap());
        assert!(eval(r#"row["Account"] == "NL91""#).unwrap());
        assert!(eval(r#"row["Bedrag"] < 0"#).unwrap());
    }

    #[test]
    fn truthiness_coercion() {
        assert!(eval("description").unwrap());
        assert!(eval("amount").unwrap());
        assert!(!eval(r#""""#).unwrap());
        assert!(!eval("0").unwrap());
    }

    #[test]
    fn mismatched_equality_is_false_not_an_error() {
        assert!(!eval(r#"amount == "cheese""#).unwrap());
        assert!(eval(r#"amount != "cheese""#).unwrap());
    }

    #[test]
    fn mismatched_ordering_is_a_runtime_error() {
        assert!(matches!(
            eval(r#"amount < "cheese""#),
            Err(EvalError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn unknown_column_is_a_runtime_error() {
        assert_eq!(
            eval(r#"row["Nope"] == 1"#),
            Err(EvalError::UnknownColumn("Nope".to_string()))
        );
    }

    #[test]
    fn string_method_on_number_is_a_runtime_error() {
        assert!(matches!(
            eval(r#"amount.contains("4")"#),
            Err(EvalError::BadReceiver { .. })
        ));
    }

    #[test]
    fn compile_rejects_empty_source() {
        assert!(matches!(compile(""), Err(CompileError::Empty)));
        assert!(matches!(compile("   "), Err(CompileError::Empty)));
    }

    #[test]
    fn compile_rejects_syntax_errors() {
        assert!(matches!(compile("amount <"), Err(CompileError::UnexpectedEnd)));
        assert!(matches!(compile("amount = 1"), Err(CompileError::UnexpectedChar { .. })));
        assert!(matches!(compile("(amount > 0"), Err(CompileError::UnexpectedEnd)));
        assert!(matches!(
            compile("amount > 0 extra"),
            Err(CompileError::UnexpectedToken(_))
        ));
    }

    #[test]
    fn compile_rejects_unknown_names() {
        assert!(matches!(compile("balance > 0"), Err(CompileError::UnknownField(_))));
        assert!(matches!(
            compile(r#"description.frobnicate("x")"#),
            Err(CompileError::UnknownMethod(_))
        ));
    }

    #[test]
    fn compile_rejects_bad_regex_up_front() {
        assert!(matches!(
            compile(r#"description.matches("(unclosed")"#),
            Err(CompileError::BadRegex(_))
        ));
    }

    #[test]
    fn compile_rejects_non_literal_args() {
        assert!(matches!(
            compile("description.contains(amount)"),
            Err(CompileError::NonLiteralArg)
        ));
    }

    #[test]
    fn compile_rejects_bad_arity() {
        assert!(matches!(
            compile(r#"description.contains("a", "b")"#),
            Err(CompileError::BadArity { .. })
        ));
        assert!(matches!(
            compile("description.contains_any()"),
            Err(CompileError::BadArity { .. })
        ));
    }

    #[test]
    fn unterminated_string_is_a_compile_error() {
        assert!(matches!(
            compile(r#"description.contains("oops"#),
            Err(CompileError::UnterminatedString(_))
        ));
    }

    #[test]
    fn validate_rule_flags_and_clears() {
        let mut rule = Rule::new();
        rule.code = "amount <".to_string();
        validate_rule(&mut rule);
        assert!(!rule.is_valid);
        assert!(rule.error.is_some());

        rule.code = "amount < 0".to_string();
        validate_rule(&mut rule);
        assert!(rule.is_valid);
        assert_eq!(rule.error, None);
    }

    #[test]
    fn validate_rule_accepts_empty_code() {
        let mut rule = Rule::new();
        rule.code = String::new();
        validate_rule(&mut rule);
        assert!(rule.is_valid);
    }

    #[test]
    fn single_quoted_strings() {
        assert!(eval("description.contains('HEIJN')").unwrap());
    }
}
