//! Parsed path expressions.

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(String),
    Number(f64),
    LocationPath(LocationPath),
    /// `$name`
    Variable(String),
    FunctionCall {
        name: String,
        args: Vec<Expression>,
    },
    /// A primary expression narrowed by predicates, like `$hosts[2]`.
    Filter {
        expr: Box<Expression>,
        predicates: Vec<Expression>,
    },
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    /// `-expr`
    Negate(Box<Expression>),
}

/// Operators from loosest to tightest binding; `Union` only joins node-sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Or,
    And,
    Equals,
    NotEquals,
    /// `=~`, the right side is a regexp.
    RegexMatch,
    /// `!~`
    RegexNotMatch,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Plus,
    Minus,
    Multiply,
    Union,
}

/// `/files/etc/hosts/*[ipaddr = '127.0.0.1']` and friends.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath {
    /// Where a path like `$var/foo` starts; `None` starts at the context
    /// node, or at the root when `is_absolute`.
    pub start_point: Option<Box<Expression>>,
    /// Ignored when `start_point` is set.
    pub is_absolute: bool,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expression>,
}

impl Step {
    pub fn new(axis: Axis, node_test: NodeTest) -> Self {
        Self {
            axis,
            node_test,
            predicates: Vec::new(),
        }
    }

    /// The step `label` on the child axis.
    pub fn child(label: impl Into<String>) -> Self {
        Self::new(Axis::Child, NodeTest::Name(label.into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    Root,
    SelfAxis,
    FollowingSibling,
    PrecedingSibling,
}

impl Axis {
    /// Positions on a reverse axis count outwards from the context node.
    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Parent | Axis::Ancestor | Axis::Root | Axis::PrecedingSibling
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// A label, `#comment` included.
    Name(String),
    /// `*`; `.` and `..` parse to this as well.
    Any,
}
