//! Sandboxed arithmetic expression evaluator.
//!
//! Formulas extracted from model output are evaluated here and nowhere else. The
//! grammar is closed: numeric and boolean literals, variables from the supplied
//! map, infix arithmetic, comparisons, logical operators and a fixed set of pure
//! functions (`if`, `max`, `min`, `floor`, `ceil`, `round`). There is no
//! assignment, no iteration and no access to anything beyond the variable map.
//!
//! ```text
//! expr       := or
//! or         := and ( "||" and )*
//! and        := comparison ( "&&" comparison )*
//! comparison := additive ( ( "==" | "!=" | "<" | "<=" | ">" | ">=" ) additive )*
//! additive   := term ( ( "+" | "-" ) term )*
//! term       := unary ( ( "*" | "/" ) unary )*
//! unary      := ( "-" | "+" | "!" ) unary | primary
//! primary    := number | "true" | "false" | ident | ident "(" args ")" | "(" expr ")"
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use policy_rag::expr::{evaluate, Value};
//!
//! let vars = HashMap::from([("monthsWorked".to_string(), Value::Number(24.0))]);
//! assert_eq!(evaluate("if(monthsWorked > 12, 1, 0)", &vars).unwrap(), 1.0);
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum nesting depth accepted by the parser.
pub const MAX_DEPTH: usize = 64;

/// Maximum number of tokens in one expression. Bounds the height of operator
/// chains such as `1+1+...+1`, which the nesting depth does not count.
pub const MAX_TOKENS: usize = 512;

/// A variable value: either a number or a boolean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
}

impl Value {
    /// The numeric value, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(_) => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Variable bindings available to an expression.
pub type Variables = HashMap<String, Value>;

/// Errors produced while parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("unexpected {found} at position {pos}")]
    UnexpectedToken { found: String, pos: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("expression nesting exceeds {} levels", MAX_DEPTH)]
    TooDeep,

    #[error("expression exceeds {} tokens", MAX_TOKENS)]
    TooLong,

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("{function}() expects {expected} arguments, got {found}")]
    Arity { function: &'static str, expected: usize, found: usize },

    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NonFinite,
}

// ── Lexer ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
    Bang,
    AndAnd,
    OrOr,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {n}"),
            Token::Ident(name) => write!(f, "identifier '{name}'"),
            Token::Plus => f.write_str("'+'"),
            Token::Minus => f.write_str("'-'"),
            Token::Star => f.write_str("'*'"),
            Token::Slash => f.write_str("'/'"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::Comma => f.write_str("','"),
            Token::Bang => f.write_str("'!'"),
            Token::AndAnd => f.write_str("'&&'"),
            Token::OrOr => f.write_str("'||'"),
            Token::EqEq => f.write_str("'=='"),
            Token::NotEq => f.write_str("'!='"),
            Token::Lt => f.write_str("'<'"),
            Token::Le => f.write_str("'<='"),
            Token::Gt => f.write_str("'>'"),
            Token::Ge => f.write_str("'>='"),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, EvalError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let pos = i;

        if ch.is_whitespace() {
            i += 1;
            continue;
        }

        if ch.is_ascii_digit() || ch == '.' {
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let literal: String = chars[pos..i].iter().collect();
            let value =
                literal.parse::<f64>().map_err(|_| EvalError::InvalidNumber(literal.clone()))?;
            tokens.push((Token::Number(value), pos));
            if tokens.len() > MAX_TOKENS {
                return Err(EvalError::TooLong);
            }
            continue;
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push((Token::Ident(chars[pos..i].iter().collect()), pos));
            if tokens.len() > MAX_TOKENS {
                return Err(EvalError::TooLong);
            }
            continue;
        }

        let next = chars.get(i + 1).copied();
        let (token, width) = match (ch, next) {
            ('&', Some('&')) => (Token::AndAnd, 2),
            ('|', Some('|')) => (Token::OrOr, 2),
            ('=', Some('=')) => (Token::EqEq, 2),
            ('!', Some('=')) => (Token::NotEq, 2),
            ('<', Some('=')) => (Token::Le, 2),
            ('>', Some('=')) => (Token::Ge, 2),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('!', _) => (Token::Bang, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            (',', _) => (Token::Comma, 1),
            _ => return Err(EvalError::UnexpectedChar { ch, pos }),
        };
        tokens.push((token, pos));
        i += width;
        if tokens.len() > MAX_TOKENS {
            return Err(EvalError::TooLong);
        }
    }

    Ok(tokens)
}

// ── Syntax tree ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Function {
    If,
    Max,
    Min,
    Floor,
    Ceil,
    Round,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "if" => Some(Function::If),
            "max" => Some(Function::Max),
            "min" => Some(Function::Min),
            "floor" => Some(Function::Floor),
            "ceil" => Some(Function::Ceil),
            "round" => Some(Function::Round),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Function::If => "if",
            Function::Max => "max",
            Function::Min => "min",
            Function::Floor => "floor",
            Function::Ceil => "ceil",
            Function::Round => "round",
        }
    }

    fn arity(self) -> usize {
        match self {
            Function::If => 3,
            Function::Max | Function::Min => 2,
            Function::Floor | Function::Ceil | Function::Round => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Literal(Value),
    Var(String),
    Unary(UnaryOp, Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    Call(Function, Vec<Node>),
}

// ── Parser ─────────────────────────────────────────────────────────

struct Parser {
    tokens: Vec<(Token, usize)>,
    cursor: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor).map(|(token, _)| token)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).map(|(token, _)| token.clone());
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn unexpected(&self) -> EvalError {
        match self.tokens.get(self.cursor) {
            Some((token, pos)) => EvalError::UnexpectedToken { found: token.to_string(), pos: *pos },
            None => EvalError::UnexpectedEnd,
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), EvalError> {
        if self.peek() == Some(&expected) {
            self.cursor += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn enter(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH { Err(EvalError::TooDeep) } else { Ok(()) }
    }

    fn parse_expr(&mut self) -> Result<Node, EvalError> {
        self.enter()?;
        let node = self.parse_or();
        self.depth -= 1;
        node
    }

    fn parse_or(&mut self) -> Result<Node, EvalError> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::OrOr) {
            self.cursor += 1;
            let right = self.parse_and()?;
            left = Node::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Node, EvalError> {
        let mut left = self.parse_comparison()?;
        while self.peek() == Some(&Token::AndAnd) {
            self.cursor += 1;
            let right = self.parse_comparison()?;
            left = Node::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Node, EvalError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::Ne,
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                _ => return Ok(left),
            };
            self.cursor += 1;
            let right = self.parse_additive()?;
            left = Node::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_additive(&mut self) -> Result<Node, EvalError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.cursor += 1;
            let right = self.parse_term()?;
            left = Node::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_term(&mut self) -> Result<Node, EvalError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(left),
            };
            self.cursor += 1;
            let right = self.parse_unary()?;
            left = Node::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<Node, EvalError> {
        let op = match self.peek() {
            Some(Token::Minus) => Some(UnaryOp::Neg),
            Some(Token::Bang) => Some(UnaryOp::Not),
            Some(Token::Plus) => None,
            _ => return self.parse_primary(),
        };
        self.cursor += 1;
        self.enter()?;
        let operand = self.parse_unary();
        self.depth -= 1;
        let operand = operand?;
        Ok(match op {
            Some(op) => Node::Unary(op, Box::new(operand)),
            None => operand,
        })
    }

    fn parse_primary(&mut self) -> Result<Node, EvalError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Node::Literal(Value::Number(n))),
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.cursor += 1;
                    return self.parse_call(name);
                }
                Ok(match name.as_str() {
                    "true" => Node::Literal(Value::Bool(true)),
                    "false" => Node::Literal(Value::Bool(false)),
                    _ => Node::Var(name),
                })
            }
            Some(_) => {
                self.cursor -= 1;
                Err(self.unexpected())
            }
            None => Err(EvalError::UnexpectedEnd),
        }
    }

    fn parse_call(&mut self, name: String) -> Result<Node, EvalError> {
        let function = Function::lookup(&name).ok_or(EvalError::UnknownFunction(name))?;
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.cursor += 1;
        } else {
            loop {
                args.push(self.parse_expr()?);
                match self.advance() {
                    Some(Token::Comma) => continue,
                    Some(Token::RParen) => break,
                    Some(_) => {
                        self.cursor -= 1;
                        return Err(self.unexpected());
                    }
                    None => return Err(EvalError::UnexpectedEnd),
                }
            }
        }
        if args.len() != function.arity() {
            return Err(EvalError::Arity {
                function: function.name(),
                expected: function.arity(),
                found: args.len(),
            });
        }
        Ok(Node::Call(function, args))
    }
}

// ── Evaluation ─────────────────────────────────────────────────────

fn number(value: Value, context: &str) -> Result<f64, EvalError> {
    value.as_number().ok_or_else(|| {
        EvalError::TypeMismatch(format!("{context} expects a number, got {}", value.type_name()))
    })
}

fn boolean(value: Value, context: &str) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(b),
        Value::Number(_) => {
            Err(EvalError::TypeMismatch(format!("{context} expects a boolean, got number")))
        }
    }
}

fn finite(n: f64) -> Result<Value, EvalError> {
    if n.is_finite() { Ok(Value::Number(n)) } else { Err(EvalError::NonFinite) }
}

fn eval(node: &Node, vars: &Variables) -> Result<Value, EvalError> {
    match node {
        Node::Literal(value) => Ok(*value),
        Node::Var(name) => {
            vars.get(name).copied().ok_or_else(|| EvalError::UndefinedVariable(name.clone()))
        }
        Node::Unary(UnaryOp::Neg, operand) => finite(-number(eval(operand, vars)?, "'-'")?),
        Node::Unary(UnaryOp::Not, operand) => {
            Ok(Value::Bool(!boolean(eval(operand, vars)?, "'!'")?))
        }
        // `&&` and `||` short-circuit.
        Node::Binary(BinaryOp::And, left, right) => {
            if !boolean(eval(left, vars)?, "'&&'")? {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(boolean(eval(right, vars)?, "'&&'")?))
        }
        Node::Binary(BinaryOp::Or, left, right) => {
            if boolean(eval(left, vars)?, "'||'")? {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(boolean(eval(right, vars)?, "'||'")?))
        }
        Node::Binary(op, left, right) => eval_binary(*op, eval(left, vars)?, eval(right, vars)?),
        // Only the selected branch of `if` is evaluated.
        Node::Call(Function::If, args) => {
            let branch = if boolean(eval(&args[0], vars)?, "if() condition")? { 1 } else { 2 };
            eval(&args[branch], vars)
        }
        Node::Call(function, args) => {
            let values = args.iter().map(|arg| eval(arg, vars)).collect::<Result<Vec<_>, _>>()?;
            eval_call(*function, &values)
        }
    }
}

fn eval_binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::And => Ok(Value::Bool(boolean(left, "'&&'")? && boolean(right, "'&&'")?)),
        BinaryOp::Or => Ok(Value::Bool(boolean(left, "'||'")? || boolean(right, "'||'")?)),
        BinaryOp::Eq | BinaryOp::Ne => {
            if std::mem::discriminant(&left) != std::mem::discriminant(&right) {
                return Err(EvalError::TypeMismatch(format!(
                    "cannot compare {} with {}",
                    left.type_name(),
                    right.type_name()
                )));
            }
            let equal = left == right;
            Ok(Value::Bool(if op == BinaryOp::Eq { equal } else { !equal }))
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let (a, b) = (number(left, "comparison")?, number(right, "comparison")?);
            Ok(Value::Bool(match op {
                BinaryOp::Lt => a < b,
                BinaryOp::Le => a <= b,
                BinaryOp::Gt => a > b,
                _ => a >= b,
            }))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            let (a, b) = (number(left, "arithmetic")?, number(right, "arithmetic")?);
            match op {
                BinaryOp::Add => finite(a + b),
                BinaryOp::Sub => finite(a - b),
                BinaryOp::Mul => finite(a * b),
                _ if b == 0.0 => Err(EvalError::DivisionByZero),
                _ => finite(a / b),
            }
        }
    }
}

fn eval_call(function: Function, args: &[Value]) -> Result<Value, EvalError> {
    let name = function.name();
    match function {
        Function::If => Ok(if boolean(args[0], "if() condition")? { args[1] } else { args[2] }),
        Function::Max => finite(number(args[0], name)?.max(number(args[1], name)?)),
        Function::Min => finite(number(args[0], name)?.min(number(args[1], name)?)),
        Function::Floor => finite(number(args[0], name)?.floor()),
        Function::Ceil => finite(number(args[0], name)?.ceil()),
        Function::Round => finite(number(args[0], name)?.round()),
    }
}

fn collect_variables<'a>(node: &'a Node, out: &mut BTreeSet<&'a str>) {
    match node {
        Node::Literal(_) => {}
        Node::Var(name) => {
            out.insert(name);
        }
        Node::Unary(_, operand) => collect_variables(operand, out),
        Node::Binary(_, left, right) => {
            collect_variables(left, out);
            collect_variables(right, out);
        }
        Node::Call(_, args) => args.iter().for_each(|arg| collect_variables(arg, out)),
    }
}

/// A parsed, validated expression ready for evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Node,
}

impl Expression {
    /// Parse an expression.
    ///
    /// # Errors
    ///
    /// Returns an [`EvalError`] describing the first syntax problem, including
    /// calls to functions outside the allow-list.
    pub fn parse(source: &str) -> Result<Self, EvalError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(EvalError::Empty);
        }
        let mut parser = Parser { tokens, cursor: 0, depth: 0 };
        let root = parser.parse_expr()?;
        if parser.cursor < parser.tokens.len() {
            return Err(parser.unexpected());
        }
        Ok(Self { source: source.to_string(), root })
    }

    /// The original expression text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Every variable name the expression references.
    pub fn variables(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        collect_variables(&self.root, &mut names);
        names
    }

    /// Evaluate against `vars`.
    ///
    /// All referenced variables must be bound, including those in branches that
    /// would not be taken.
    pub fn evaluate(&self, vars: &Variables) -> Result<Value, EvalError> {
        if let Some(missing) = self.variables().into_iter().find(|name| !vars.contains_key(*name)) {
            return Err(EvalError::UndefinedVariable(missing.to_string()));
        }
        eval(&self.root, vars)
    }
}

impl FromStr for Expression {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parse and evaluate `expression`, requiring a numeric result.
pub fn evaluate(expression: &str, vars: &Variables) -> Result<f64, EvalError> {
    let value = Expression::parse(expression)?.evaluate(vars)?;
    number(value, "formula result")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, Value)]) -> Variables {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn evaluates_functions_and_arithmetic() {
        let empty = Variables::new();
        assert_eq!(evaluate("max(2,3)+1", &empty).unwrap(), 4.0);
        assert_eq!(evaluate("min(2, 3) * 10 - 4 / 2", &empty).unwrap(), 18.0);
        assert_eq!(evaluate("floor(2.7) + ceil(2.1) + round(2.5)", &empty).unwrap(), 8.0);
        assert_eq!(evaluate("-(1 + 2) * 2", &empty).unwrap(), -6.0);
        assert_eq!(evaluate("2 * (3 + 4)", &empty).unwrap(), 14.0);
    }

    #[test]
    fn conditional_selection() {
        let v = vars(&[("monthsWorked", Value::Number(24.0))]);
        assert_eq!(evaluate("if(monthsWorked>12, 1, 0)", &v).unwrap(), 1.0);
        let v = vars(&[("monthsWorked", Value::Number(6.0))]);
        assert_eq!(evaluate("if(monthsWorked>12, 1, 0)", &v).unwrap(), 0.0);
    }

    #[test]
    fn boolean_variables_and_logic() {
        let v = vars(&[("probation", Value::Bool(true)), ("days", Value::Number(3.0))]);
        assert_eq!(evaluate("if(!probation && days >= 3, days, 0)", &v).unwrap(), 0.0);
        assert_eq!(evaluate("if(probation || days == 0, 1, 2)", &v).unwrap(), 1.0);
    }

    #[test]
    fn undefined_variable_fails() {
        let err = evaluate("undefinedVar*2", &Variables::new()).unwrap_err();
        assert_eq!(err, EvalError::UndefinedVariable("undefinedVar".to_string()));
    }

    #[test]
    fn undefined_variable_in_untaken_branch_fails() {
        let v = vars(&[("x", Value::Number(1.0))]);
        assert!(matches!(
            evaluate("if(x > 0, x, secret)", &v),
            Err(EvalError::UndefinedVariable(name)) if name == "secret"
        ));
    }

    #[test]
    fn rejects_functions_outside_allow_list() {
        let err = evaluate("exec(1)", &Variables::new()).unwrap_err();
        assert_eq!(err, EvalError::UnknownFunction("exec".to_string()));
    }

    #[test]
    fn rejects_malformed_syntax() {
        let empty = Variables::new();
        assert!(matches!(evaluate("1 +", &empty), Err(EvalError::UnexpectedEnd)));
        assert!(matches!(evaluate("(1 + 2", &empty), Err(EvalError::UnexpectedEnd)));
        assert!(matches!(evaluate("1 2", &empty), Err(EvalError::UnexpectedToken { .. })));
        assert!(matches!(evaluate("a = 1", &empty), Err(EvalError::UnexpectedChar { .. })));
        assert!(matches!(evaluate("1.2.3", &empty), Err(EvalError::InvalidNumber(_))));
        assert!(matches!(evaluate("   ", &empty), Err(EvalError::Empty)));
        assert!(matches!(
            evaluate("max(1)", &empty),
            Err(EvalError::Arity { function: "max", expected: 2, found: 1 })
        ));
    }

    #[test]
    fn rejects_type_errors_and_bad_arithmetic() {
        let empty = Variables::new();
        assert!(matches!(evaluate("if(1, 2, 3)", &empty), Err(EvalError::TypeMismatch(_))));
        assert!(matches!(evaluate("true + 1", &empty), Err(EvalError::TypeMismatch(_))));
        assert!(matches!(evaluate("1 > 0", &empty), Err(EvalError::TypeMismatch(_))));
        assert!(matches!(evaluate("1 / 0", &empty), Err(EvalError::DivisionByZero)));
    }

    #[test]
    fn deep_nesting_is_bounded() {
        let source = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(evaluate(&source, &Variables::new()), Err(EvalError::TooDeep));
        let source = format!("{}1", "-".repeat(200));
        assert_eq!(evaluate(&source, &Variables::new()), Err(EvalError::TooDeep));
    }

    #[test]
    fn long_operator_chains_are_rejected() {
        let source = format!("1{}", "+1".repeat(20_000));
        assert_eq!(evaluate(&source, &Variables::new()), Err(EvalError::TooLong));
        let source = format!("x{}", "*x".repeat(200_000));
        let v = vars(&[("x", Value::Number(1.0))]);
        assert_eq!(evaluate(&source, &v), Err(EvalError::TooLong));
        // Chains just under the limit still evaluate.
        let source = format!("1{}", "+1".repeat(200));
        assert_eq!(evaluate(&source, &Variables::new()).unwrap(), 201.0);
    }

    #[test]
    fn if_evaluates_only_the_selected_branch() {
        let v = vars(&[("n", Value::Number(10.0)), ("d", Value::Number(0.0))]);
        assert_eq!(evaluate("if(d > 0, n / d, 0)", &v).unwrap(), 0.0);
        let v = vars(&[("n", Value::Number(10.0)), ("d", Value::Number(4.0))]);
        assert_eq!(evaluate("if(d > 0, n / d, 0)", &v).unwrap(), 2.5);
    }

    #[test]
    fn logical_operators_short_circuit() {
        let v = vars(&[("n", Value::Number(10.0)), ("d", Value::Number(0.0))]);
        assert_eq!(evaluate("if(d != 0 && n / d > 1, 1, 0)", &v).unwrap(), 0.0);
        assert_eq!(evaluate("if(d == 0 || n / d > 1, 1, 0)", &v).unwrap(), 1.0);
        // Unbound names are still rejected in short-circuited operands.
        assert!(matches!(
            evaluate("if(d != 0 && missing > 1, 1, 0)", &v),
            Err(EvalError::UndefinedVariable(name)) if name == "missing"
        ));
    }

    #[test]
    fn reports_referenced_variables() {
        let expr: Expression = "min(monthsWorked * rate, cap) + bonus".parse().unwrap();
        let names: Vec<&str> = expr.variables().into_iter().collect();
        assert_eq!(names, vec!["bonus", "cap", "monthsWorked", "rate"]);
        assert_eq!(expr.source(), "min(monthsWorked * rate, cap) + bonus");
    }

    #[test]
    fn is_deterministic() {
        let v = vars(&[("a", Value::Number(3.5))]);
        let first = evaluate("round(a * 3) / 2", &v);
        assert_eq!(first, evaluate("round(a * 3) / 2", &v));
        assert_eq!(first.unwrap(), 5.5);
    }
}
