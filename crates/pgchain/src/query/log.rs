//! The append-only method log.
//!
//! Every chain step pushes one [`MethodCall`] onto a persistent singly linked
//! list. Branching a builder shares the prefix; nothing is ever mutated after it
//! has been appended.

use crate::arg::Arg;
use std::fmt;
use std::sync::Arc;

/// Which clause a method call contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseKind {
    With,
    From,
    Join(JoinKind),
    Where,
    Return,
    Group,
    Having,
    Order,
    Limit,
    Offset,
    Set,
    InsertColumns,
    InsertValues,
    Delete,
    Manual,
}

/// Join flavor of a [`ClauseKind::Join`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinKind {
    pub(crate) fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "join",
            JoinKind::Left => "left join",
            JoinKind::Right => "right join",
            JoinKind::Full => "full join",
            JoinKind::Cross => "cross join",
        }
    }
}

/// The statement a method log compiles to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Manual,
}

impl StatementKind {
    /// Whether the statement is meaningless without a target table.
    pub fn requires_target(self) -> bool {
        matches!(
            self,
            StatementKind::Insert | StatementKind::Update | StatementKind::Delete
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatementKind::Select => "select",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
            StatementKind::Manual => "manual",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded builder call.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub kind: ClauseKind,
    pub args: Vec<Arg>,
}

impl MethodCall {
    pub fn new(kind: ClauseKind, args: Vec<Arg>) -> Self {
        Self { kind, args }
    }
}

#[derive(Debug)]
struct Node {
    call: MethodCall,
    prev: Option<Arc<Node>>,
}

/// Persistent, structurally shared list of method calls.
#[derive(Debug, Clone, Default)]
pub struct MethodLog {
    head: Option<Arc<Node>>,
    len: usize,
}

impl MethodLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new log with `call` appended; `self` is left untouched.
    pub fn push(&self, call: MethodCall) -> Self {
        Self {
            head: Some(Arc::new(Node {
                call,
                prev: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Calls in the order they were made.
    pub fn calls(&self) -> Vec<&MethodCall> {
        let mut out = Vec::with_capacity(self.len);
        let mut node = self.head.as_deref();
        while let Some(n) = node {
            out.push(&n.call);
            node = n.prev.as_deref();
        }
        out.reverse();
        out
    }
}

impl Drop for MethodLog {
    // Unlink iteratively so long chains do not recurse on drop.
    fn drop(&mut self) {
        let mut head = self.head.take();
        while let Some(node) = head {
            match Arc::try_unwrap(node) {
                Ok(mut node) => head = node.prev.take(),
                Err(_) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_preserves_order_and_prefix() {
        let base = MethodLog::new().push(MethodCall::new(ClauseKind::From, vec![]));
        let a = base.push(MethodCall::new(ClauseKind::Where, vec![]));
        let b = base.push(MethodCall::new(ClauseKind::Limit, vec![]));

        assert_eq!(base.len(), 1);
        let kinds: Vec<_> = a.calls().iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ClauseKind::From, ClauseKind::Where]);
        let kinds: Vec<_> = b.calls().iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ClauseKind::From, ClauseKind::Limit]);
    }

    #[test]
    fn long_logs_drop_without_overflow() {
        let mut log = MethodLog::new();
        for _ in 0..200_000 {
            log = log.push(MethodCall::new(ClauseKind::Where, vec![]));
        }
        assert_eq!(log.len(), 200_000);
    }

    #[test]
    fn statement_kind_display() {
        assert_eq!(StatementKind::Update.to_string(), "update");
        assert!(StatementKind::Delete.requires_target());
        assert!(!StatementKind::Select.requires_target());
    }
}
