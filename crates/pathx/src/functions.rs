//! Built-in functions available in path expressions.

use crate::engine::{EvaluationContext, PathValue};
use crate::error::PathError;
use crate::node::TreeNode;
use regex::{Regex, RegexBuilder};

/// A pattern that no string matches; used for `regexp()` of an empty node-set.
const NEVER_MATCHES: &str = r"\b\B";

pub fn evaluate_function<'a, 'd, N: TreeNode<'a>>(
    name: &str,
    args: Vec<PathValue<N>>,
    ctx: &EvaluationContext<'a, 'd, N>,
) -> Result<PathValue<N>, PathError> {
    match name {
        // Context
        "last" => func_last(args, ctx),
        "position" => func_position(args, ctx),
        "label" => func_label(args, ctx),
        "modified" => func_modified(args, ctx),

        // Node-set
        "count" => func_count(args),

        // Pattern
        "regexp" => func_regexp(args),
        "glob" => func_glob(args),

        // Number and boolean
        "int" => func_int(args),
        "not" => func_not(args),

        _ => Err(PathError::function(name, "unknown function")),
    }
}

fn expect_arity<N>(
    name: &str,
    args: &[PathValue<N>],
    min: usize,
    max: usize,
) -> Result<(), PathError> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            format!("{}", min)
        } else {
            format!("{} to {}", min, max)
        };
        return Err(PathError::function(
            name,
            format!("expects {} argument(s), got {}", expected, args.len()),
        ));
    }
    Ok(())
}

fn func_last<'a, 'd, N: TreeNode<'a>>(
    args: Vec<PathValue<N>>,
    ctx: &EvaluationContext<'a, 'd, N>,
) -> Result<PathValue<N>, PathError> {
    expect_arity("last", &args, 0, 0)?;
    Ok(PathValue::Number(ctx.context_size as f64))
}

fn func_position<'a, 'd, N: TreeNode<'a>>(
    args: Vec<PathValue<N>>,
    ctx: &EvaluationContext<'a, 'd, N>,
) -> Result<PathValue<N>, PathError> {
    expect_arity("position", &args, 0, 0)?;
    Ok(PathValue::Number(ctx.context_position as f64))
}

fn func_label<'a, 'd, N: TreeNode<'a>>(
    args: Vec<PathValue<N>>,
    ctx: &EvaluationContext<'a, 'd, N>,
) -> Result<PathValue<N>, PathError> {
    expect_arity("label", &args, 0, 0)?;
    Ok(PathValue::String(ctx.context_node.label().to_string()))
}

fn func_modified<'a, 'd, N: TreeNode<'a>>(
    args: Vec<PathValue<N>>,
    ctx: &EvaluationContext<'a, 'd, N>,
) -> Result<PathValue<N>, PathError> {
    expect_arity("modified", &args, 0, 0)?;
    Ok(PathValue::Boolean(ctx.context_node.is_dirty()))
}

fn func_count<'a, N: TreeNode<'a>>(args: Vec<PathValue<N>>) -> Result<PathValue<N>, PathError> {
    expect_arity("count", &args, 1, 1)?;
    match &args[0] {
        PathValue::NodeSet(nodes) => Ok(PathValue::Number(nodes.len() as f64)),
        other => Err(PathError::function(
            "count",
            format!("expects a node-set, got {}", other.type_name()),
        )),
    }
}

/// `regexp(s)` or `regexp(s, 'i')`. A node-set argument yields the
/// alternation of its node values.
fn func_regexp<'a, N: TreeNode<'a>>(args: Vec<PathValue<N>>) -> Result<PathValue<N>, PathError> {
    expect_arity("regexp", &args, 1, 2)?;
    let case_insensitive = match args.get(1) {
        None => false,
        Some(PathValue::String(flags)) if flags == "i" => true,
        Some(PathValue::String(flags)) if flags.is_empty() => false,
        Some(other) => {
            return Err(PathError::function(
                "regexp",
                format!("unsupported flags '{}'", other),
            ));
        }
    };

    let body = match &args[0] {
        PathValue::String(s) => s.clone(),
        PathValue::NodeSet(nodes) => {
            let alternatives: Vec<String> = nodes
                .iter()
                .filter_map(|n| n.value())
                .map(|v| format!("(?:{})", v))
                .collect();
            if alternatives.is_empty() {
                NEVER_MATCHES.to_string()
            } else {
                alternatives.join("|")
            }
        }
        other => {
            return Err(PathError::function(
                "regexp",
                format!("expects a string or node-set, got {}", other.type_name()),
            ));
        }
    };

    let pattern = if case_insensitive {
        format!("(?i:{})", body)
    } else {
        format!("(?:{})", body)
    };
    // Compile once up front so malformed patterns fail where they are written.
    compile_regexp(&pattern)?;
    Ok(PathValue::Regexp(pattern))
}

fn func_glob<'a, N: TreeNode<'a>>(args: Vec<PathValue<N>>) -> Result<PathValue<N>, PathError> {
    expect_arity("glob", &args, 1, 1)?;
    match &args[0] {
        PathValue::String(s) => Ok(PathValue::Regexp(format!("(?:{})", glob_to_regex(s)))),
        other => Err(PathError::function(
            "glob",
            format!("expects a string, got {}", other.type_name()),
        )),
    }
}

fn func_int<'a, N: TreeNode<'a>>(args: Vec<PathValue<N>>) -> Result<PathValue<N>, PathError> {
    expect_arity("int", &args, 1, 1)?;
    let n = args[0].to_number();
    if n.is_nan() {
        return Err(PathError::function(
            "int",
            format!("'{}' is not a number", args[0]),
        ));
    }
    Ok(PathValue::Number(n.trunc()))
}

fn func_not<'a, N: TreeNode<'a>>(args: Vec<PathValue<N>>) -> Result<PathValue<N>, PathError> {
    expect_arity("not", &args, 1, 1)?;
    Ok(PathValue::Boolean(!args[0].to_bool()))
}

/// Compiles a pattern so that it must match a whole string.
pub fn compile_regexp(pattern: &str) -> Result<Regex, PathError> {
    RegexBuilder::new(&format!("^(?:{})$", pattern))
        .build()
        .map_err(|e| PathError::InvalidRegexp {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

/// Translates a shell glob into an unanchored regular expression.
///
/// `*` and `?` never match `/`; `[...]` classes pass through, with a leading
/// `!` meaning negation.
pub fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2);
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => {
                let mut class = String::from("[");
                if chars.peek() == Some(&'!') {
                    chars.next();
                    class.push('^');
                }
                let mut closed = false;
                for cc in chars.by_ref() {
                    if cc == ']' {
                        closed = true;
                        break;
                    }
                    if cc == '\\' || cc == '[' {
                        class.push('\\');
                    }
                    class.push(cc);
                }
                if closed {
                    class.push(']');
                    out.push_str(&class);
                } else {
                    // An unterminated class matches a literal bracket.
                    out.push_str(&regex::escape("["));
                    out.push_str(&regex::escape(&class[1..]));
                }
            }
            '\\' => match chars.next() {
                Some(escaped) => out.push_str(&regex::escape(&escaped.to_string())),
                None => out.push_str(&regex::escape("\\")),
            },
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::evaluate;
    use crate::node::tests::{MockNode, MockTree, create_test_tree};
    use crate::parser::parse_expression;
    use std::collections::HashMap;

    fn eval<'a>(tree: &'a MockTree, expr: &str) -> Result<PathValue<MockNode<'a>>, PathError> {
        let vars = HashMap::new();
        let ctx = EvaluationContext::at_root(tree.root(), &vars);
        evaluate(&parse_expression(expr)?, &ctx)
    }

    fn ids(value: PathValue<MockNode<'_>>) -> Vec<usize> {
        value.into_nodes().unwrap().iter().map(|n| n.id).collect()
    }

    #[test]
    fn test_count() {
        let tree = create_test_tree();
        assert_eq!(eval(&tree, "count(/opts/a)").unwrap().to_number(), 2.0);
        assert!(eval(&tree, "count('x')").is_err());
    }

    #[test]
    fn test_label_function() {
        let tree = create_test_tree();
        let result = eval(&tree, "/*[label() = '#comment']").unwrap();
        assert_eq!(ids(result), vec![9]);
    }

    #[test]
    fn test_last_plus_one_selects_nothing() {
        let tree = create_test_tree();
        assert!(ids(eval(&tree, "/opts/a[last()+1]").unwrap()).is_empty());
        assert_eq!(ids(eval(&tree, "/opts/a[last()]").unwrap()), vec![13]);
    }

    #[test]
    fn test_regexp_matching() {
        let tree = create_test_tree();
        let result = eval(&tree, "/hosts/*[canonical =~ regexp('local.*')]").unwrap();
        assert_eq!(ids(result), vec![2]);
        let result = eval(&tree, "/hosts/*[canonical =~ regexp('GATE.*', 'i')]").unwrap();
        assert_eq!(ids(result), vec![6]);
    }

    #[test]
    fn test_regexp_from_node_set() {
        let tree = create_test_tree();
        let result = eval(&tree, "/hosts/*[canonical =~ regexp(/hosts/*/canonical)]").unwrap();
        assert_eq!(ids(result), vec![2, 6]);
        let result = eval(&tree, "/hosts/*[canonical =~ regexp(/none)]").unwrap();
        assert!(ids(result).is_empty());
    }

    #[test]
    fn test_invalid_regexp() {
        let tree = create_test_tree();
        assert!(matches!(
            eval(&tree, "regexp('(')"),
            Err(PathError::InvalidRegexp { .. })
        ));
        assert!(eval(&tree, "regexp('a', 'x')").is_err());
    }

    #[test]
    fn test_glob() {
        let tree = create_test_tree();
        let result = eval(&tree, "/hosts/*/*[. =~ glob('local*')]").unwrap();
        assert_eq!(ids(result), vec![4, 5]);
    }

    #[test]
    fn test_glob_to_regex() {
        assert_eq!(glob_to_regex("*.conf"), r"[^/]*\.conf");
        assert_eq!(glob_to_regex("file?"), "file[^/]");
        assert_eq!(glob_to_regex("[!a]x"), "[^a]x");
        let re = compile_regexp(&glob_to_regex("/etc/default/*")).unwrap();
        assert!(re.is_match("/etc/default/grub"));
        assert!(!re.is_match("/etc/default/sub/grub"));
    }

    #[test]
    fn test_int_and_not() {
        let tree = create_test_tree();
        assert_eq!(eval(&tree, "int('3.7')").unwrap().to_number(), 3.0);
        assert!(eval(&tree, "int('abc')").is_err());
        assert!(!eval(&tree, "not(/hosts)").unwrap().to_bool());
        assert_eq!(ids(eval(&tree, "/opts/*[not(.)]").unwrap()), vec![]);
    }

    #[test]
    fn test_modified() {
        let mut tree = create_test_tree();
        tree.mark_dirty(12);
        let result = eval(&tree, "/opts/*[modified()]").unwrap();
        assert_eq!(ids(result), vec![12]);
    }

    #[test]
    fn test_unknown_function() {
        let tree = create_test_tree();
        assert!(matches!(
            eval(&tree, "frobnicate()"),
            Err(PathError::FunctionError { .. })
        ));
    }
}
