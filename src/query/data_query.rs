use std::fmt;

use tracing::warn;

use super::{DataFilter, Operator};
use crate::value::Value;

/// Boolean joiner between two query items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    And,
    Or,
}

impl Condition {
    pub fn as_str(self) -> &'static str {
        match self {
            Condition::And => "AND",
            Condition::Or => "OR",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item inside a group. Every clause but the first carries the
/// condition joining it to its predecessor.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub condition: Option<Condition>,
    pub node: QueryNode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    Filter(DataFilter),
    Group(Vec<Clause>),
}

/// Flat token view of a query, for token-oriented backends.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryToken {
    Open,
    Close,
    Condition(Condition),
    Filter(DataFilter),
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Frame {
    clauses: Vec<Clause>,
    pending: Option<Condition>,
}

impl Frame {
    fn push(&mut self, node: QueryNode) {
        let condition = if self.clauses.is_empty() {
            None
        } else {
            Some(self.pending.take().unwrap_or(Condition::And))
        };
        self.pending = None;
        self.clauses.push(Clause { condition, node });
    }

    fn has_bare_filters(&self) -> bool {
        self.clauses
            .iter()
            .any(|clause| matches!(clause.node, QueryNode::Filter(_)))
    }
}

/// Composable filter expression built with a fluent group/filter/condition
/// API.
///
/// The expression is always a well-formed tree: a missing condition between
/// two items is an implicit AND, [`DataQuery::start_group`] wraps loose
/// filters already accumulated at the current level into their own group,
/// joined to the new one by AND, stray `end_group` calls are ignored, and groups
/// left open are closed when the query is read.
#[derive(Debug, Clone, PartialEq)]
pub struct DataQuery {
    frames: Vec<Frame>,
}

impl Default for DataQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl DataQuery {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
        }
    }

    /// Single equality filter.
    pub fn by_property(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut query = Self::new();
        query.add_filter(DataFilter::eq(name, value));
        query
    }

    fn current(&mut self) -> &mut Frame {
        if self.frames.is_empty() {
            self.frames.push(Frame::default());
        }
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    pub fn start_group(&mut self) -> &mut Self {
        let frame = self.current();
        if frame.has_bare_filters() {
            let clauses = std::mem::take(&mut frame.clauses);
            frame.clauses.push(Clause {
                condition: None,
                node: QueryNode::Group(clauses),
            });
            frame.pending = Some(Condition::And);
        }
        if !frame.clauses.is_empty() && frame.pending.is_none() {
            frame.pending = Some(Condition::And);
        }
        self.frames.push(Frame::default());
        self
    }

    pub fn end_group(&mut self) -> &mut Self {
        if self.frames.len() <= 1 {
            warn!("end_group without a matching start_group");
            return self;
        }
        if let Some(frame) = self.frames.pop() {
            if !frame.clauses.is_empty() {
                self.current().push(QueryNode::Group(frame.clauses));
            }
        }
        self
    }

    pub fn add_filter(&mut self, filter: DataFilter) -> &mut Self {
        self.current().push(QueryNode::Filter(filter));
        self
    }

    pub fn filter(
        &mut self,
        name: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.add_filter(DataFilter::new(name, operator, value))
    }

    /// Set the condition joining the next item. Ignored at the start of a group.
    pub fn add_condition(&mut self, condition: Condition) -> &mut Self {
        let frame = self.current();
        if !frame.clauses.is_empty() {
            frame.pending = Some(condition);
        }
        self
    }

    pub fn add_and(&mut self) -> &mut Self {
        self.add_condition(Condition::And)
    }

    pub fn add_or(&mut self) -> &mut Self {
        self.add_condition(Condition::Or)
    }

    pub fn is_empty(&self) -> bool {
        self.frames.iter().all(|frame| frame.clauses.is_empty())
    }

    /// Top-level clauses with every open group closed.
    pub fn clauses(&self) -> Vec<Clause> {
        let mut frames = self.frames.clone();
        while frames.len() > 1 {
            if let Some(frame) = frames.pop() {
                if !frame.clauses.is_empty() {
                    if let Some(parent) = frames.last_mut() {
                        parent.push(QueryNode::Group(frame.clauses));
                    }
                }
            }
        }
        frames.pop().map(|frame| frame.clauses).unwrap_or_default()
    }

    /// Flattened token sequence.
    pub fn tokens(&self) -> Vec<QueryToken> {
        let mut tokens = Vec::new();
        push_tokens(&self.clauses(), &mut tokens);
        tokens
    }

    /// Walk the tree with a backend visitor. `None` for an empty query.
    pub fn accept<V: QueryVisitor>(&self, visitor: &V) -> Option<V::Output> {
        let clauses = self.clauses();
        if clauses.is_empty() {
            return None;
        }
        Some(visit_clauses(visitor, &clauses, false))
    }

    /// Every filter in the query, in order.
    pub fn filters(&self) -> Vec<DataFilter> {
        self.tokens()
            .into_iter()
            .filter_map(|token| match token {
                QueryToken::Filter(filter) => Some(filter),
                _ => None,
            })
            .collect()
    }
}

fn push_tokens(clauses: &[Clause], tokens: &mut Vec<QueryToken>) {
    for clause in clauses {
        if let Some(condition) = clause.condition {
            tokens.push(QueryToken::Condition(condition));
        }
        match &clause.node {
            QueryNode::Filter(filter) => tokens.push(QueryToken::Filter(filter.clone())),
            QueryNode::Group(inner) => {
                tokens.push(QueryToken::Open);
                push_tokens(inner, tokens);
                tokens.push(QueryToken::Close);
            }
        }
    }
}

fn visit_clauses<V: QueryVisitor>(visitor: &V, clauses: &[Clause], nested: bool) -> V::Output {
    let items = clauses
        .iter()
        .map(|clause| {
            let output = match &clause.node {
                QueryNode::Filter(filter) => visitor.filter(filter),
                QueryNode::Group(inner) => visit_clauses(visitor, inner, true),
            };
            (clause.condition, output)
        })
        .collect();
    visitor.group(items, nested)
}

/// Per-backend compilation of a query tree.
pub trait QueryVisitor {
    type Output;

    fn filter(&self, filter: &DataFilter) -> Self::Output;

    /// Combine a group's items. `nested` is false for the top level.
    fn group(&self, items: Vec<(Option<Condition>, Self::Output)>, nested: bool) -> Self::Output;
}

/// Fold AND/OR items left to right with AND binding tighter than OR.
pub fn fold_conditions(items: impl IntoIterator<Item = (Option<Condition>, bool)>) -> bool {
    let mut any = false;
    let mut run = true;
    for (condition, value) in items {
        match condition {
            Some(Condition::Or) => {
                any |= run;
                run = value;
            }
            _ => run &= value,
        }
    }
    any || run
}
