use crate::ast::BinaryOperator;
use crate::engine::{PathValue, document_order};
use crate::error::PathError;
use crate::functions::compile_regexp;
use crate::node::TreeNode;

/// One comparable item: a node value or a scalar.
enum Atom {
    Text(String),
    Num(f64),
}

impl Atom {
    fn number(&self) -> f64 {
        match self {
            Atom::Num(n) => *n,
            Atom::Text(s) => s.trim().parse().unwrap_or(f64::NAN),
        }
    }
}

pub fn evaluate<'a, N: TreeNode<'a> + 'a>(
    op: BinaryOperator,
    left: PathValue<N>,
    right: PathValue<N>,
) -> Result<PathValue<N>, PathError> {
    match op {
        BinaryOperator::Or => Ok(PathValue::Boolean(left.to_bool() || right.to_bool())),
        BinaryOperator::And => Ok(PathValue::Boolean(left.to_bool() && right.to_bool())),
        BinaryOperator::Equals
        | BinaryOperator::NotEquals
        | BinaryOperator::LessThan
        | BinaryOperator::LessThanOrEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterThanOrEqual => {
            evaluate_comparison(op, &left, &right).map(PathValue::Boolean)
        }
        BinaryOperator::RegexMatch => evaluate_regex_match(&left, &right, true),
        BinaryOperator::RegexNotMatch => evaluate_regex_match(&left, &right, false),
        BinaryOperator::Plus => evaluate_plus(left, right),
        BinaryOperator::Minus => Ok(PathValue::Number(left.to_number() - right.to_number())),
        BinaryOperator::Multiply => Ok(PathValue::Number(left.to_number() * right.to_number())),
        BinaryOperator::Union => evaluate_union(left, right),
    }
}

fn atoms<'a, N: TreeNode<'a>>(value: &PathValue<N>) -> Vec<Atom> {
    match value {
        // Nodes without a value take no part in comparisons.
        PathValue::NodeSet(nodes) => nodes
            .iter()
            .filter_map(|n| n.value())
            .map(|v| Atom::Text(v.to_string()))
            .collect(),
        PathValue::String(s) => vec![Atom::Text(s.clone())],
        PathValue::Number(n) => vec![Atom::Num(*n)],
        PathValue::Boolean(_) | PathValue::Regexp(_) => vec![Atom::Num(value.to_number())],
    }
}

/// Existential comparison: true when any pair of atoms satisfies `op`.
fn evaluate_comparison<'a, N: TreeNode<'a>>(
    op: BinaryOperator,
    left: &PathValue<N>,
    right: &PathValue<N>,
) -> Result<bool, PathError> {
    if matches!(left, PathValue::Regexp(_)) || matches!(right, PathValue::Regexp(_)) {
        return Err(PathError::TypeError(
            "regular expressions can only be used with =~ and !~".into(),
        ));
    }
    let equality = matches!(op, BinaryOperator::Equals | BinaryOperator::NotEquals);
    if equality
        && (matches!(left, PathValue::Boolean(_)) || matches!(right, PathValue::Boolean(_)))
    {
        let same = left.to_bool() == right.to_bool();
        return Ok(if op == BinaryOperator::Equals { same } else { !same });
    }

    let numeric = !equality
        || matches!(left, PathValue::Number(_))
        || matches!(right, PathValue::Number(_));
    let lhs = atoms(left);
    let rhs = atoms(right);
    Ok(lhs.iter().any(|a| {
        rhs.iter().any(|b| {
            if numeric {
                compare_numbers(op, a.number(), b.number())
            } else {
                compare_text(op, a, b)
            }
        })
    }))
}

fn compare_numbers(op: BinaryOperator, a: f64, b: f64) -> bool {
    match op {
        BinaryOperator::Equals => a == b,
        BinaryOperator::NotEquals => a != b,
        BinaryOperator::LessThan => a < b,
        BinaryOperator::LessThanOrEqual => a <= b,
        BinaryOperator::GreaterThan => a > b,
        BinaryOperator::GreaterThanOrEqual => a >= b,
        _ => false,
    }
}

fn compare_text(op: BinaryOperator, a: &Atom, b: &Atom) -> bool {
    match (a, b) {
        (Atom::Text(a), Atom::Text(b)) => match op {
            BinaryOperator::Equals => a == b,
            BinaryOperator::NotEquals => a != b,
            _ => false,
        },
        _ => compare_numbers(op, a.number(), b.number()),
    }
}

fn evaluate_regex_match<'a, N: TreeNode<'a>>(
    left: &PathValue<N>,
    right: &PathValue<N>,
    expect_match: bool,
) -> Result<PathValue<N>, PathError> {
    let pattern = match right {
        PathValue::Regexp(pattern) => pattern.clone(),
        PathValue::String(s) => format!("(?:{})", s),
        other => {
            return Err(PathError::TypeError(format!(
                "right side of a regexp match must be a regexp, found {}",
                other.type_name()
            )));
        }
    };
    let regex = compile_regexp(&pattern)?;
    let candidates: Vec<&str> = match left {
        PathValue::NodeSet(nodes) => nodes.iter().filter_map(|n| n.value()).collect(),
        PathValue::String(s) => vec![s.as_str()],
        other => {
            return Err(PathError::TypeError(format!(
                "left side of a regexp match must be a node-set or string, found {}",
                other.type_name()
            )));
        }
    };
    let matched = candidates
        .iter()
        .any(|candidate| regex.is_match(candidate) == expect_match);
    Ok(PathValue::Boolean(matched))
}

/// Numbers add, strings concatenate, regular expressions form an alternation.
fn evaluate_plus<'a, N: TreeNode<'a>>(
    left: PathValue<N>,
    right: PathValue<N>,
) -> Result<PathValue<N>, PathError> {
    match (left, right) {
        (PathValue::Regexp(l), PathValue::Regexp(r)) => {
            Ok(PathValue::Regexp(format!("(?:{}|{})", l, r)))
        }
        (PathValue::String(l), PathValue::String(r)) => Ok(PathValue::String(l + &r)),
        (l @ PathValue::Regexp(_), r) | (l, r @ PathValue::Regexp(_)) => {
            Err(PathError::TypeError(format!(
                "cannot add {} and {}",
                l.type_name(),
                r.type_name()
            )))
        }
        (l, r) => Ok(PathValue::Number(l.to_number() + r.to_number())),
    }
}

fn evaluate_union<'a, N: TreeNode<'a> + 'a>(
    left: PathValue<N>,
    right: PathValue<N>,
) -> Result<PathValue<N>, PathError> {
    match (left, right) {
        (PathValue::NodeSet(mut l), PathValue::NodeSet(r)) => {
            l.extend(r);
            Ok(PathValue::NodeSet(document_order(l)))
        }
        (l, r) => Err(PathError::TypeError(format!(
            "union requires two node-sets, found {} and {}",
            l.type_name(),
            r.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::tests::{MockNode, create_test_tree};

    type Value<'a> = PathValue<MockNode<'a>>;

    #[test]
    fn test_string_equality() {
        let result: Value = evaluate(
            BinaryOperator::Equals,
            PathValue::String("a".into()),
            PathValue::String("a".into()),
        )
        .unwrap();
        assert!(result.to_bool());
    }

    #[test]
    fn test_node_set_compares_existentially() {
        let tree = create_test_tree();
        let opts: Value = PathValue::NodeSet(vec![tree.node(11), tree.node(13)]);
        let three: Value = PathValue::Number(3.0);
        assert!(evaluate(BinaryOperator::Equals, opts.clone(), three.clone()).unwrap().to_bool());
        assert!(evaluate(BinaryOperator::LessThan, opts, three).unwrap().to_bool());
    }

    #[test]
    fn test_plus_on_strings_and_regexps() {
        let joined: Value = evaluate(
            BinaryOperator::Plus,
            PathValue::String("foo".into()),
            PathValue::String("bar".into()),
        )
        .unwrap();
        assert_eq!(joined.to_string(), "foobar");

        let alternation: Value = evaluate(
            BinaryOperator::Plus,
            PathValue::Regexp("(?:a)".into()),
            PathValue::Regexp("(?:b)".into()),
        )
        .unwrap();
        let matched =
            evaluate(BinaryOperator::RegexMatch, PathValue::String("b".into()), alternation)
                .unwrap();
        assert!(matched.to_bool());
    }

    #[test]
    fn test_regex_match_is_anchored() {
        let result: Value = evaluate(
            BinaryOperator::RegexMatch,
            PathValue::String("localhost.local".into()),
            PathValue::Regexp("(?:local)".into()),
        )
        .unwrap();
        assert!(!result.to_bool());
    }

    #[test]
    fn test_regex_not_match() {
        let tree = create_test_tree();
        let values: Value = PathValue::NodeSet(vec![tree.node(4), tree.node(8)]);
        let result = evaluate(
            BinaryOperator::RegexNotMatch,
            values,
            PathValue::Regexp("(?:local.*)".into()),
        )
        .unwrap();
        assert!(result.to_bool());
    }

    #[test]
    fn test_regexp_in_equality_is_type_error() {
        let result: Result<Value, _> = evaluate(
            BinaryOperator::Equals,
            PathValue::String("a".into()),
            PathValue::Regexp("(?:a)".into()),
        );
        assert!(matches!(result, Err(PathError::TypeError(_))));
    }

    #[test]
    fn test_union_requires_node_sets() {
        let result: Result<Value, _> = evaluate(
            BinaryOperator::Union,
            PathValue::Number(1.0),
            PathValue::NodeSet(vec![]),
        );
        assert!(result.is_err());
    }
}
