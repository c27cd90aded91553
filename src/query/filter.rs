use std::fmt;
use std::str::FromStr;

use super::QueryError;
use crate::value::Value;

/// Comparison operator of a filter triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
    NotLike,
    IsNull,
    IsNotNull,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }

    /// Operators that take no right-hand value.
    pub fn is_unary(self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let operator = match normalized.to_ascii_uppercase().as_str() {
            "=" | "==" => Operator::Eq,
            "<>" | "!=" => Operator::Ne,
            ">" => Operator::Gt,
            ">=" => Operator::Ge,
            "<" => Operator::Lt,
            "<=" => Operator::Le,
            "LIKE" => Operator::Like,
            "NOT LIKE" => Operator::NotLike,
            "IS NULL" => Operator::IsNull,
            "IS NOT NULL" => Operator::IsNotNull,
            _ => return Err(QueryError::UnknownOperator(text.to_string())),
        };
        Ok(operator)
    }
}

/// An immutable `(field, operator, value)` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFilter {
    name: String,
    operator: Operator,
    value: Value,
}

impl DataFilter {
    pub fn new(name: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn eq(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, Operator::Eq, value)
    }

    pub fn is_null(name: impl Into<String>) -> Self {
        Self::new(name, Operator::IsNull, Value::Null)
    }

    pub fn is_not_null(name: impl Into<String>) -> Self {
        Self::new(name, Operator::IsNotNull, Value::Null)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}
