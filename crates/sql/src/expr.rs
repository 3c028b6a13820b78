//! Filter expression tree and its SQL rendering.

use core::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};

/// Column reference, optionally qualified by a table alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    pub name: String,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
        }
    }

    /// Qualified column. A blank alias means "no alias": the column renders bare.
    pub fn qualified(alias: impl AsRef<str>, name: impl Into<String>) -> Self {
        let alias = alias.as_ref().trim();
        Self {
            qualifier: (!alias.is_empty()).then(|| alias.to_string()),
            name: name.into(),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{q}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Literal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Str(String),
    Null,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Str(s) => {
                f.write_char('\'')?;
                for c in s.chars() {
                    // MySQL treats backslash as an escape inside string literals.
                    match c {
                        '\'' => f.write_str("''")?,
                        '\\' => f.write_str("\\\\")?,
                        '\0' => f.write_str("\\0")?,
                        '\n' => f.write_str("\\n")?,
                        '\r' => f.write_str("\\r")?,
                        '\x1a' => f.write_str("\\Z")?,
                        c => f.write_char(c)?,
                    }
                }
                f.write_char('\'')
            }
            Self::Null => f.write_str("NULL"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// `SELECT <projection> FROM <from> [WHERE <filter>]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subquery {
    pub projection: Column,
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Box<Expr>>,
}

impl Subquery {
    pub fn new(projection: Column, from: impl Into<String>) -> Self {
        Self {
            projection,
            from: from.into(),
            filter: None,
        }
    }

    pub fn filter(mut self, filter: Expr) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }
}

impl fmt::Display for Subquery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT {} FROM {}", self.projection, self.from)?;
        if let Some(filter) = &self.filter {
            write!(f, " WHERE {filter}")?;
        }
        Ok(())
    }
}

/// Right-hand side of an `IN` predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InList {
    Values(Vec<Expr>),
    Subquery(Box<Subquery>),
}

/// Boolean/scalar SQL expression.
///
/// `And`/`Or` nodes carry no implicit grouping; `Nested` is an explicit pair
/// of parentheses. Rendering still parenthesizes an `Or` found directly under
/// an `And` so that no tree can render to text with a different meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Column(Column),
    Literal(Value),
    Eq { left: Box<Expr>, right: Box<Expr> },
    In { expr: Box<Expr>, list: InList },
    And { left: Box<Expr>, right: Box<Expr> },
    Or { left: Box<Expr>, right: Box<Expr> },
    Nested(Box<Expr>),
    Function { name: String, args: Vec<Expr> },
}

impl Expr {
    pub fn column(column: Column) -> Self {
        Self::Column(column)
    }

    pub fn int(value: i64) -> Self {
        Self::Literal(Value::Int(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(Value::Str(value.into()))
    }

    pub fn equals(left: Expr, right: Expr) -> Self {
        Self::Eq {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `column = value`, the shape of every single-column guard predicate.
    pub fn column_eq(column: Column, value: impl Into<Value>) -> Self {
        Self::equals(Self::Column(column), Self::Literal(value.into()))
    }

    pub fn in_values(expr: Expr, values: Vec<Expr>) -> Self {
        Self::In {
            expr: Box::new(expr),
            list: InList::Values(values),
        }
    }

    pub fn in_subquery(expr: Expr, subquery: Subquery) -> Self {
        Self::In {
            expr: Box::new(expr),
            list: InList::Subquery(Box::new(subquery)),
        }
    }

    pub fn function(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::Function {
            name: name.into(),
            args,
        }
    }

    /// `1 = 0`: a predicate no row satisfies.
    pub fn never() -> Self {
        Self::equals(Self::int(1), Self::int(0))
    }

    pub fn is_and(&self) -> bool {
        matches!(self, Self::And { .. })
    }

    pub fn is_or(&self) -> bool {
        matches!(self, Self::Or { .. })
    }

    /// `And`/`Or` nodes; everything else binds tighter than both.
    pub fn is_compound(&self) -> bool {
        self.is_and() || self.is_or()
    }
}

struct Operand<'a>(&'a Expr);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_compound() {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

struct AndOperand<'a>(&'a Expr);

impl fmt::Display for AndOperand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_or() {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(c) => write!(f, "{c}"),
            Self::Literal(v) => write!(f, "{v}"),
            Self::Eq { left, right } => write!(f, "{} = {}", Operand(left), Operand(right)),
            Self::In { expr, list } => {
                write!(f, "{} IN (", Operand(expr))?;
                match list {
                    InList::Values(values) => {
                        for (i, v) in values.iter().enumerate() {
                            if i > 0 {
                                f.write_str(", ")?;
                            }
                            write!(f, "{}", Operand(v))?;
                        }
                    }
                    InList::Subquery(sub) => write!(f, "{sub}")?,
                }
                f.write_str(")")
            }
            Self::And { left, right } => {
                write!(f, "{} AND {}", AndOperand(left), AndOperand(right))
            }
            Self::Or { left, right } => write!(f, "{left} OR {right}"),
            Self::Nested(inner) => write!(f, "({inner})"),
            Self::Function { name, args } => {
                write!(f, "{name}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{a}")?;
                }
                f.write_str(")")
            }
        }
    }
}
