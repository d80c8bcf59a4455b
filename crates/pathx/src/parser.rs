//! A `nom`-based parser for the path expression language.

use super::ast::*;
use crate::error::PathError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{map, opt, recognize},
    error::ErrorKind,
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded},
};

/// Characters that end a label unless escaped with a backslash.
const SPECIAL_CHARS: &str = "/[]()=!<>|,$'\"\\*+";

type OperatorTable = &'static [(&'static str, BinaryOperator)];

/// Binary operators by precedence level, loosest first. Longer symbols come
/// before their prefixes.
const PRECEDENCE: [OperatorTable; 6] = [
    &[("or", BinaryOperator::Or)],
    &[("and", BinaryOperator::And)],
    &[
        ("=~", BinaryOperator::RegexMatch),
        ("!~", BinaryOperator::RegexNotMatch),
        ("!=", BinaryOperator::NotEquals),
        ("=", BinaryOperator::Equals),
    ],
    &[
        ("<=", BinaryOperator::LessThanOrEqual),
        (">=", BinaryOperator::GreaterThanOrEqual),
        ("<", BinaryOperator::LessThan),
        (">", BinaryOperator::GreaterThan),
    ],
    &[("+", BinaryOperator::Plus), ("-", BinaryOperator::Minus)],
    &[("*", BinaryOperator::Multiply)],
];

const AXES: &[(&str, Axis)] = &[
    ("child", Axis::Child),
    ("descendant", Axis::Descendant),
    ("descendant-or-self", Axis::DescendantOrSelf),
    ("parent", Axis::Parent),
    ("ancestor", Axis::Ancestor),
    ("root", Axis::Root),
    ("self", Axis::SelfAxis),
    ("following-sibling", Axis::FollowingSibling),
    ("preceding-sibling", Axis::PrecedingSibling),
];

pub fn parse_expression(input: &str) -> Result<Expression, PathError> {
    if input.trim().is_empty() {
        return Err(PathError::parse(input, 0, "empty expression"));
    }
    let offset = |rest: &str| input.len() - rest.len();
    match delimited(multispace0, expression, multispace0).parse(input) {
        Ok(("", expr)) => Ok(expr),
        Ok((rest, _)) => Err(PathError::parse(
            input,
            offset(rest),
            format!("unexpected input '{}'", rest),
        )),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(PathError::parse(input, offset(e.input), "invalid expression"))
        }
        Err(nom::Err::Incomplete(_)) => Err(PathError::parse(
            input,
            input.len(),
            "unexpected end of expression",
        )),
    }
}

/// Escapes a label so that it parses back as a single name step.
pub fn escape_label(label: &str) -> String {
    if label == "." || label == ".." {
        return format!("\\{}", label);
    }
    let mut escaped = String::with_capacity(label.len());
    let mut chars = label.chars().peekable();
    while let Some(c) = chars.next() {
        let double_colon = c == ':' && chars.peek() == Some(&':');
        if !is_name_char(c) || double_colon {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn is_name_char(c: char) -> bool {
    !c.is_whitespace() && !SPECIAL_CHARS.contains(c)
}

fn fail<O>(input: &str, kind: ErrorKind) -> IResult<&str, O> {
    Err(nom::Err::Error(nom::error::Error::new(input, kind)))
}

fn ws<'a, F, O>(inner: F) -> impl Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>
where
    F: Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

/// The first operator of `table` at the start of `input`. Word operators
/// such as `and` must not run on into a label (`android`).
fn operator(input: &str, table: OperatorTable) -> IResult<&str, BinaryOperator> {
    for (symbol, op) in table {
        let Some(rest) = input.strip_prefix(symbol) else { continue };
        let is_word = symbol.starts_with(char::is_alphabetic);
        if is_word && rest.chars().next().is_some_and(is_name_char) {
            continue;
        }
        return Ok((rest, *op));
    }
    fail(input, ErrorKind::Tag)
}

fn expression(input: &str) -> IResult<&str, Expression> {
    binary(input, 0)
}

/// Left-associative chain of the operators at `level`.
fn binary(input: &str, level: usize) -> IResult<&str, Expression> {
    let (mut rest, mut left) = operand(input, level)?;
    loop {
        let Ok((after_op, op)) = operator(rest.trim_start(), PRECEDENCE[level]) else { break };
        let Ok((after_right, right)) = operand(after_op.trim_start(), level) else { break };
        left = Expression::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        };
        rest = after_right;
    }
    Ok((rest, left))
}

fn operand(input: &str, level: usize) -> IResult<&str, Expression> {
    if level + 1 < PRECEDENCE.len() {
        binary(input, level + 1)
    } else {
        negation(input)
    }
}

fn negation(input: &str) -> IResult<&str, Expression> {
    let (rest, minus) = opt(ws(char('-'))).parse(input)?;
    let (rest, expr) = union(rest)?;
    let expr = match minus {
        Some(_) => Expression::Negate(Box::new(expr)),
        None => expr,
    };
    Ok((rest, expr))
}

/// `|` binds tighter than any other operator.
fn union(input: &str) -> IResult<&str, Expression> {
    let (mut rest, mut left) = path_expr(input)?;
    while let Some(after_bar) = rest.trim_start().strip_prefix('|') {
        let Ok((after_right, right)) = path_expr(after_bar.trim_start()) else { break };
        left = Expression::BinaryOp {
            left: Box::new(left),
            op: BinaryOperator::Union,
            right: Box::new(right),
        };
        rest = after_right;
    }
    Ok((rest, left))
}

/// A location path, or a primary expression that may continue as one, as
/// in `$hosts/*/ipaddr`.
fn path_expr(input: &str) -> IResult<&str, Expression> {
    // Primary first, so `label()` is a call and not a step named `label`.
    let (rest, start) =
        alt((filter_expr, map(location_path, Expression::LocationPath))).parse(input)?;
    let (rest, more) = trailing_steps(rest)?;
    if more.is_empty() {
        return Ok((rest, start));
    }
    let path = match start {
        Expression::LocationPath(mut path) => {
            path.steps.extend(more);
            path
        }
        other => LocationPath {
            start_point: Some(Box::new(other)),
            is_absolute: false,
            steps: more,
        },
    };
    Ok((rest, Expression::LocationPath(path)))
}

fn descendant_or_self() -> Step {
    Step::new(Axis::DescendantOrSelf, NodeTest::Any)
}

/// Any number of `/step` and `//step`.
fn trailing_steps(input: &str) -> IResult<&str, Vec<Step>> {
    let (rest, found) = many0(pair(alt((tag("//"), tag("/"))), step)).parse(input)?;
    let mut steps = Vec::with_capacity(found.len());
    for (separator, step) in found {
        if separator == "//" {
            steps.push(descendant_or_self());
        }
        steps.push(step);
    }
    Ok((rest, steps))
}

fn location_path(input: &str) -> IResult<&str, LocationPath> {
    let (rest, is_absolute, mut steps) = if let Some(rest) = input.strip_prefix("//") {
        let (rest, first) = step(rest)?;
        (rest, true, vec![descendant_or_self(), first])
    } else if let Some(rest) = input.strip_prefix('/') {
        match step(rest) {
            Ok((rest, first)) => (rest, true, vec![first]),
            // A bare `/` is the root.
            Err(_) => (rest, true, Vec::new()),
        }
    } else {
        let (rest, first) = step(input)?;
        (rest, false, vec![first])
    };
    let (rest, more) = trailing_steps(rest)?;
    steps.extend(more);
    Ok((
        rest,
        LocationPath {
            start_point: None,
            is_absolute,
            steps,
        },
    ))
}

fn filter_expr(input: &str) -> IResult<&str, Expression> {
    let (rest, primary) = primary_expr(input)?;
    let (rest, predicates) = many0(predicate).parse(rest)?;
    if predicates.is_empty() {
        return Ok((rest, primary));
    }
    Ok((
        rest,
        Expression::Filter {
            expr: Box::new(primary),
            predicates,
        },
    ))
}

fn primary_expr(input: &str) -> IResult<&str, Expression> {
    ws(alt((
        variable_reference,
        number,
        map(string_literal, Expression::Literal),
        function_call,
        delimited(ws(char('(')), expression, ws(char(')'))),
    )))
    .parse(input)
}

/// `'...'` or `"..."`, without escapes.
fn string_literal(input: &str) -> IResult<&str, String> {
    let Some(quote @ ('\'' | '"')) = input.chars().next() else {
        return fail(input, ErrorKind::Char);
    };
    let body = &input[1..];
    match body.find(quote) {
        Some(end) => Ok((&body[end + 1..], body[..end].to_string())),
        None => fail(input, ErrorKind::Char),
    }
}

/// Integer or decimal literal. A digit run that continues as a label (`1st`) is not a number.
fn number(input: &str) -> IResult<&str, Expression> {
    let (rest, digits) = recognize(pair(digit1, opt(pair(char('.'), digit1)))).parse(input)?;
    if rest.chars().next().is_some_and(is_name_char) {
        return fail(input, ErrorKind::Digit);
    }
    Ok((rest, Expression::Number(digits.parse().unwrap_or(f64::NAN))))
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

fn variable_reference(input: &str) -> IResult<&str, Expression> {
    map(preceded(char('$'), identifier), |name: &str| {
        Expression::Variable(name.to_string())
    })
    .parse(input)
}

/// A name directly followed by `(`; `label/value` stays a path.
fn function_call(input: &str) -> IResult<&str, Expression> {
    let (rest, name) = identifier(input)?;
    let Some(rest) = rest.trim_start().strip_prefix('(') else {
        return fail(input, ErrorKind::Char);
    };
    let (rest, args) = separated_list0(ws(char(',')), ws(expression)).parse(rest)?;
    let (rest, _) = ws(char(')')).parse(rest)?;
    Ok((
        rest,
        Expression::FunctionCall {
            name: name.to_string(),
            args,
        },
    ))
}

/// A label, honouring backslash escapes. `::` ends the label so axes parse.
fn label_name(input: &str) -> IResult<&str, String> {
    let mut name = String::new();
    let mut end = 0;
    let mut chars = input.char_indices();
    while let Some((idx, c)) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some((j, escaped)) => {
                    name.push(escaped);
                    end = j + escaped.len_utf8();
                    continue;
                }
                None => break,
            }
        }
        if !is_name_char(c) || (c == ':' && input[idx + 1..].starts_with(':')) {
            break;
        }
        name.push(c);
        end = idx + c.len_utf8();
    }
    if name.is_empty() {
        return fail(input, ErrorKind::Alpha);
    }
    Ok((&input[end..], name))
}

pub fn node_test(input: &str) -> IResult<&str, NodeTest> {
    alt((
        map(char('*'), |_| NodeTest::Any),
        map(label_name, NodeTest::Name),
    ))
    .parse(input)
}

/// `name::`, for every axis in [`AXES`].
fn axis(input: &str) -> IResult<&str, Axis> {
    AXES.iter()
        .find_map(|(name, axis)| {
            let rest = input.strip_prefix(name)?.strip_prefix("::")?;
            Some((rest, *axis))
        })
        .map_or_else(|| fail(input, ErrorKind::Tag), Ok)
}

/// `.` and `..`, but not labels that merely start with a dot.
fn abbreviated_step(input: &str) -> IResult<&str, (Axis, NodeTest)> {
    let (axis, rest) = if let Some(rest) = input.strip_prefix("..") {
        (Axis::Parent, rest)
    } else if let Some(rest) = input.strip_prefix('.') {
        (Axis::SelfAxis, rest)
    } else {
        return fail(input, ErrorKind::Char);
    };
    if rest.chars().next().is_some_and(is_name_char) {
        return fail(input, ErrorKind::Char);
    }
    Ok((rest, (axis, NodeTest::Any)))
}

fn predicate(input: &str) -> IResult<&str, Expression> {
    delimited(ws(char('[')), expression, ws(char(']'))).parse(input)
}

fn step(input: &str) -> IResult<&str, Step> {
    let (rest, (axis, node_test)) = alt((
        abbreviated_step,
        pair(axis, node_test),
        map(node_test, |test| (Axis::Child, test)),
    ))
    .parse(input)?;
    let (rest, predicates) = many0(predicate).parse(rest)?;
    Ok((
        rest,
        Step {
            axis,
            node_test,
            predicates,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn absolute(steps: Vec<Step>) -> Expression {
        Expression::LocationPath(LocationPath {
            start_point: None,
            is_absolute: true,
            steps,
        })
    }

    fn first_step(expr: &str) -> Step {
        match parse_expression(expr).unwrap() {
            Expression::LocationPath(mut path) => path.steps.remove(0),
            other => panic!("expected a location path, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_simple_path() {
        assert_eq!(
            parse_expression("/files/etc/hosts").unwrap(),
            absolute(vec![Step::child("files"), Step::child("etc"), Step::child("hosts")])
        );
        assert_eq!(parse_expression("/").unwrap(), absolute(vec![]));
    }

    #[test]
    fn test_labels_the_language_does_not_reserve() {
        let cases = [
            ("/hosts/1/ipaddr", vec!["hosts", "1", "ipaddr"]),
            ("/etc/hosts.allow/max-conn", vec!["etc", "hosts.allow", "max-conn"]),
            ("/home/.bashrc", vec!["home", ".bashrc"]),
            ("/order/android", vec!["order", "android"]),
            ("/a\\ b/c\\[1\\]", vec!["a b", "c[1]"]),
        ];
        for (expr, labels) in cases {
            let steps = labels.into_iter().map(Step::child).collect();
            assert_eq!(parse_expression(expr).unwrap(), absolute(steps), "{}", expr);
        }
    }

    #[test]
    fn test_escape_label_round_trips() {
        for label in ["a b", "x[2]", ".", "..", "weird::name", "#comment", "a=b"] {
            let expr = format!("/{}", escape_label(label));
            assert_eq!(parse_expression(&expr).unwrap(), absolute(vec![Step::child(label)]));
        }
    }

    #[test]
    fn test_parse_negation() {
        assert_eq!(
            parse_expression("-5").unwrap(),
            Expression::Negate(Box::new(Expression::Number(5.0)))
        );
    }

    #[test]
    fn test_parse_axes() {
        assert_eq!(first_step("following-sibling::foo").axis, Axis::FollowingSibling);
        assert_eq!(first_step("descendant-or-self::foo").axis, Axis::DescendantOrSelf);
        let ancestors = first_step("ancestor::*");
        assert_eq!(ancestors.axis, Axis::Ancestor);
        assert_eq!(ancestors.node_test, NodeTest::Any);

        let Expression::LocationPath(path) = parse_expression("../.").unwrap() else {
            panic!("expected a location path");
        };
        assert_eq!(path.steps[0].axis, Axis::Parent);
        assert_eq!(path.steps[1].axis, Axis::SelfAxis);
    }

    #[test]
    fn test_parse_path_starting_with_variable() {
        assert_eq!(
            parse_expression("$hosts/*/ipaddr").unwrap(),
            Expression::LocationPath(LocationPath {
                start_point: Some(Box::new(Expression::Variable("hosts".to_string()))),
                is_absolute: false,
                steps: vec![Step::new(Axis::Child, NodeTest::Any), Step::child("ipaddr")]
            })
        );
        assert_eq!(
            parse_expression("$hosts[2]").unwrap(),
            Expression::Filter {
                expr: Box::new(Expression::Variable("hosts".into())),
                predicates: vec![Expression::Number(2.0)],
            }
        );
    }

    #[test]
    fn test_parse_value_predicate() {
        let mut star = Step::new(Axis::Child, NodeTest::Any);
        star.predicates.push(Expression::BinaryOp {
            left: Box::new(Expression::LocationPath(LocationPath {
                start_point: None,
                is_absolute: false,
                steps: vec![Step::child("ipaddr")],
            })),
            op: BinaryOperator::Equals,
            right: Box::new(Expression::Literal("127.0.0.1".into())),
        });
        assert_eq!(
            parse_expression("/hosts/*[ipaddr = '127.0.0.1']").unwrap(),
            absolute(vec![Step::child("hosts"), star])
        );
    }

    #[test]
    fn test_parse_predicate_operators() {
        let step = first_step("a[last()-1]");
        assert!(matches!(
            step.predicates[0],
            Expression::BinaryOp { op: BinaryOperator::Minus, .. }
        ));

        let step = first_step("*[. =~ regexp('a.*')]");
        let Expression::BinaryOp { op, right, .. } = &step.predicates[0] else {
            panic!("expected a binary operation");
        };
        assert_eq!(*op, BinaryOperator::RegexMatch);
        assert!(matches!(**right, Expression::FunctionCall { .. }));
    }

    #[test]
    fn test_parse_descendant_or_self() {
        assert_eq!(
            parse_expression("//foo").unwrap(),
            absolute(vec![descendant_or_self(), Step::child("foo")])
        );
        let Expression::LocationPath(path) = parse_expression("/a//b").unwrap() else {
            panic!("expected a location path");
        };
        assert_eq!(path.steps.len(), 3);
        assert_eq!(path.steps[1], descendant_or_self());
    }

    #[test]
    fn test_precedence() {
        let parsed = parse_expression("a = 'x' or b and c").unwrap();
        let Expression::BinaryOp { op, right, .. } = parsed else {
            panic!("expected a binary operation");
        };
        assert_eq!(op, BinaryOperator::Or);
        assert!(matches!(*right, Expression::BinaryOp { op: BinaryOperator::And, .. }));

        let parsed = parse_expression("1 + 2 * 3 = 7").unwrap();
        let Expression::BinaryOp { op, left, .. } = parsed else {
            panic!("expected a binary operation");
        };
        assert_eq!(op, BinaryOperator::Equals);
        assert!(matches!(*left, Expression::BinaryOp { op: BinaryOperator::Plus, .. }));
    }

    #[test]
    fn test_parse_union() {
        let Expression::BinaryOp { op, .. } = parse_expression("/a | /b").unwrap() else {
            panic!("expected a binary operation");
        };
        assert_eq!(op, BinaryOperator::Union);
    }

    #[test]
    fn test_parse_function_arguments() {
        assert_eq!(
            parse_expression("count( /a , 'x' )").unwrap(),
            Expression::FunctionCall {
                name: "count".into(),
                args: vec![
                    absolute(vec![Step::child("a")]),
                    Expression::Literal("x".into())
                ],
            }
        );
    }

    #[test]
    fn test_parse_errors_report_position() {
        match parse_expression("/a/b[") {
            Err(PathError::Parse { position, .. }) => assert_eq!(position, 4),
            other => panic!("expected parse error, got {:?}", other),
        }
        assert!(parse_expression("").is_err());
        assert!(parse_expression("/a]").is_err());
    }
}
