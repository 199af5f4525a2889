//! Strict parser for filter specifications.
//!
//! Specifications use a call syntax, e.g.
//! `Or([PropertyIsEqualTo('dc:type', 'dataset'), PropertyIsLike('dc:title', '%eau%')])`.
//! Only the twelve operators of [`Operator`] may be called and only their
//! declared keyword names are accepted. Nothing is ever evaluated: the
//! parser builds a [`FilterExpression`] or rejects the input.

use std::sync::LazyLock;

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, tag},
    character::complete::{
        alpha1, alphanumeric1, char, digit1, multispace0, none_of, one_of, satisfy,
    },
    combinator::{all_consuming, cut, map, map_opt, not, opt, recognize, value},
    error::{context, ErrorKind, VerboseError, VerboseErrorKind},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, terminated, tuple},
    IResult,
};
use regex::Regex;

use super::expr::{ComparisonOp, FilterExpression, LikePattern};
use crate::error::{HarvesterError, Result};

/// Maximum nesting depth of calls and lists.
pub const MAX_DEPTH: usize = 32;

/// XML qualified name, with optional prefix.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static PROPERTY_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][\w.\-]*(:[A-Za-z_][\w.\-]*)?$").expect("valid regex")
});

/// The operators a specification may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
    Not,
    Compare(ComparisonOp),
    Like,
    IsNull,
    Between,
}

impl Operator {
    /// Resolve an identifier against the allow-list.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let op = match name {
            "And" => Self::And,
            "Or" => Self::Or,
            "Not" => Self::Not,
            "PropertyIsEqualTo" => Self::Compare(ComparisonOp::EqualTo),
            "PropertyIsNotEqualTo" => Self::Compare(ComparisonOp::NotEqualTo),
            "PropertyIsLessThan" => Self::Compare(ComparisonOp::LessThan),
            "PropertyIsLessThanOrEqualTo" => Self::Compare(ComparisonOp::LessThanOrEqualTo),
            "PropertyIsGreaterThan" => Self::Compare(ComparisonOp::GreaterThan),
            "PropertyIsGreaterThanOrEqualTo" => {
                Self::Compare(ComparisonOp::GreaterThanOrEqualTo)
            }
            "PropertyIsLike" => Self::Like,
            "PropertyIsNull" => Self::IsNull,
            "PropertyIsBetween" => Self::Between,
            _ => return None,
        };
        Some(op)
    }

    /// Parameter names in positional order.
    fn parameters(&self) -> &'static [&'static str] {
        match self {
            Self::And | Self::Or | Self::Not => &["operations"],
            Self::Compare(_) => &["propertyname", "literal", "matchCase"],
            Self::Like => &[
                "propertyname",
                "literal",
                "escapeChar",
                "singleChar",
                "wildCard",
                "matchCase",
            ],
            Self::IsNull => &["propertyname"],
            Self::Between => &["propertyname", "lower", "upper"],
        }
    }
}

/// Parse one filter specification.
///
/// The text is first parsed into a syntax tree, then every call is checked
/// against the operator allow-list and bound to its parameters.
///
/// # Errors
/// Returns `HarvesterError::InvalidFilter` for anything outside the
/// grammar or the operator allow-list.
///
/// # Examples
/// ```
/// use csw_harvester::filter::{parse, FilterExpression};
///
/// let expr = parse("PropertyIsEqualTo('dc:type', 'dataset')").unwrap();
/// assert_eq!(expr, FilterExpression::equal_to("dc:type", "dataset"));
///
/// assert!(parse("__import__('os').system('ls')").is_err());
/// ```
pub fn parse(spec: &str) -> Result<FilterExpression> {
    if spec.trim().is_empty() {
        return Err(HarvesterError::invalid_filter(spec, "empty specification"));
    }
    let raw = match all_consuming(terminated(|i| call(i, 0), multispace0))(spec) {
        Ok((_, raw)) => raw,
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => return Err(syntax_error(spec, &e)),
        Err(nom::Err::Incomplete(_)) => {
            return Err(HarvesterError::invalid_filter(spec, "incomplete input"))
        }
    };
    Builder { spec }.build(raw)
}

type Res<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

/// Context marking the depth limit, reported with the limit itself.
const TOO_DEEP: &str = "nesting too deep";

/// A call as written, before the allow-list check. `at` is the input
/// remaining where the node starts.
#[derive(Debug)]
struct RawCall<'a> {
    name: &'a str,
    at: &'a str,
    args: Vec<RawArg<'a>>,
}

#[derive(Debug)]
struct RawArg<'a> {
    keyword: Option<&'a str>,
    value: RawValue<'a>,
    at: &'a str,
}

#[derive(Debug)]
enum RawValue<'a> {
    Str(String),
    Number(String),
    Bool(bool),
    List(Vec<RawCall<'a>>),
    Call(RawCall<'a>),
}

/// `IDENT '(' args? ')'`
fn call(input: &str, depth: usize) -> Res<'_, RawCall<'_>> {
    if depth >= MAX_DEPTH {
        return Err(nom::Err::Failure(VerboseError {
            errors: vec![(input, VerboseErrorKind::Context(TOO_DEEP))],
        }));
    }
    let (input, _) = multispace0(input)?;
    let at = input;
    let (input, name) = context("expected an operator", identifier)(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = cut(context("expected '('", char('(')))(input)?;
    let (input, args) = separated_list0(comma, |i| argument(i, depth))(input)?;
    let (input, _) = opt(comma)(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = cut(context("expected ',' or ')'", char(')')))(input)?;
    Ok((input, RawCall { name, at, args }))
}

/// `(IDENT '=')? value`
fn argument(input: &str, depth: usize) -> Res<'_, RawArg<'_>> {
    let (input, _) = multispace0(input)?;
    let at = input;
    let (input, keyword) = opt(terminated(
        identifier,
        delimited(multispace0, char('='), multispace0),
    ))(input)?;
    let (input, value) = raw_value(input, depth)?;
    Ok((input, RawArg { keyword, value, at }))
}

fn raw_value<'a>(input: &'a str, depth: usize) -> Res<'a, RawValue<'a>> {
    context(
        "expected a value",
        alt((
            map(|i: &'a str| quoted(i, '\''), RawValue::Str),
            map(|i: &'a str| quoted(i, '"'), RawValue::Str),
            map(number, RawValue::Number),
            map(|i: &'a str| list(i, depth + 1), RawValue::List),
            map(boolean, RawValue::Bool),
            map(|i: &'a str| call(i, depth + 1), RawValue::Call),
        )),
    )(input)
}

/// `'[' (expr (',' expr)* ','?)? ']'`
fn list(input: &str, depth: usize) -> Res<'_, Vec<RawCall<'_>>> {
    let (input, _) = char('[')(input)?;
    let (input, items) = separated_list0(comma, |i| call(i, depth))(input)?;
    let (input, _) = opt(comma)(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = cut(context("expected ',' or ']'", char(']')))(input)?;
    Ok((input, items))
}

fn comma(input: &str) -> Res<'_, char> {
    delimited(multispace0, char(','), multispace0)(input)
}

fn identifier(input: &str) -> Res<'_, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn boolean(input: &str) -> Res<'_, bool> {
    map_opt(identifier, |name| match name {
        "True" | "true" => Some(true),
        "False" | "false" => Some(false),
        _ => None,
    })(input)
}

/// Optional sign, digits, optional fraction; kept as written.
fn number(input: &str) -> Res<'_, String> {
    let (input, text) = recognize(tuple((
        opt(one_of("+-")),
        digit1,
        opt(pair(char('.'), cut(context("malformed number", digit1)))),
    )))(input)?;
    let (input, _) = cut(context(
        "malformed number",
        not(satisfy(|c: char| c == '.' || c == '_' || c.is_alphanumeric())),
    ))(input)?;
    Ok((input, text.to_string()))
}

/// Single- or double-quoted string with backslash escapes.
fn quoted(input: &str, quote: char) -> Res<'_, String> {
    let stop = if quote == '"' { "\"\\" } else { "'\\" };
    let (input, _) = char(quote)(input)?;
    // escaped_transform rejects an empty body, hence the opt
    let (input, body) = opt(escaped_transform(
        none_of(stop),
        '\\',
        cut(context(
            "unsupported escape",
            alt((
                value('\\', char('\\')),
                value('\'', char('\'')),
                value('"', char('"')),
                value('\n', char('n')),
                value('\t', char('t')),
            )),
        )),
    ))(input)?;
    let (input, _) = cut(context("unterminated string", char(quote)))(input)?;
    Ok((input, body.unwrap_or_default()))
}

/// Turn a nom error into `InvalidFilter`, using the innermost context.
fn syntax_error(spec: &str, error: &VerboseError<&str>) -> HarvesterError {
    let innermost = error.errors.iter().find_map(|(rest, kind)| match kind {
        VerboseErrorKind::Context(ctx) => Some((*rest, (*ctx).to_string())),
        _ => None,
    });
    let (rest, reason) = innermost
        .or_else(|| {
            error.errors.first().map(|(rest, kind)| {
                let reason = match kind {
                    VerboseErrorKind::Nom(ErrorKind::Eof) => "unexpected trailing input".to_string(),
                    VerboseErrorKind::Char(c) => format!("expected '{c}'"),
                    VerboseErrorKind::Nom(kind) => format!("syntax error ({})", kind.description()),
                    VerboseErrorKind::Context(ctx) => (*ctx).to_string(),
                };
                (*rest, reason)
            })
        })
        .unwrap_or((spec, "syntax error".to_string()));

    let reason = if reason == TOO_DEEP {
        format!("nesting deeper than {MAX_DEPTH}")
    } else {
        reason
    };
    HarvesterError::invalid_filter(
        spec,
        format!("{reason} at offset {}", spec.len() - rest.len()),
    )
}

/// An argument value before it is bound to a parameter.
#[derive(Debug)]
enum Value {
    Str(String),
    Number(String),
    Bool(bool),
    List(Vec<FilterExpression>),
    Expr(FilterExpression),
}

impl Value {
    fn describe(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Number(_) => "number",
            Self::Bool(_) => "boolean",
            Self::List(_) => "list",
            Self::Expr(_) => "expression",
        }
    }
}

/// Checks raw calls against the allow-list and builds the filter tree.
struct Builder<'s> {
    spec: &'s str,
}

impl Builder<'_> {
    fn offset(&self, at: &str) -> usize {
        self.spec.len() - at.len()
    }

    fn error_at(&self, offset: usize, reason: impl AsRef<str>) -> HarvesterError {
        HarvesterError::invalid_filter(
            self.spec,
            format!("{} at offset {offset}", reason.as_ref()),
        )
    }

    fn build(&self, call: RawCall<'_>) -> Result<FilterExpression> {
        let offset = self.offset(call.at);
        let Some(operator) = Operator::from_name(call.name) else {
            return Err(self.error_at(offset, format!("operator '{}' is not allowed", call.name)));
        };
        let args = call
            .args
            .into_iter()
            .map(|arg| Ok((arg.keyword, self.value(arg.value)?, self.offset(arg.at))))
            .collect::<Result<Vec<_>>>()?;
        let mut bound = Bound::bind(self, operator, args)?;

        let expr = match operator {
            Operator::And | Operator::Or => {
                let children = bound.required_list(self, offset, "operations")?;
                if children.len() < 2 {
                    return Err(self.error_at(
                        offset,
                        "And/Or need a list of at least two expressions",
                    ));
                }
                if operator == Operator::And {
                    FilterExpression::And(children)
                } else {
                    FilterExpression::Or(children)
                }
            }
            Operator::Not => {
                let child = match bound.take("operations") {
                    Some((Value::Expr(e), _)) => e,
                    Some((Value::List(mut items), at)) => {
                        if items.len() != 1 {
                            return Err(self.error_at(at, "Not takes exactly one expression"));
                        }
                        items.remove(0)
                    }
                    Some((other, at)) => {
                        return Err(self.error_at(
                            at,
                            format!("'operations' must be a list, got {}", other.describe()),
                        ))
                    }
                    None => return Err(self.error_at(offset, "missing argument 'operations'")),
                };
                FilterExpression::Not(Box::new(child))
            }
            Operator::Compare(op) => FilterExpression::Comparison {
                op,
                property: bound.property(self, offset)?,
                literal: bound.required_literal(self, offset, "literal")?,
                match_case: bound.optional_bool(self, "matchCase")?.unwrap_or(true),
            },
            Operator::Like => {
                let property = bound.property(self, offset)?;
                let mut pattern = LikePattern::new(bound.required_literal(self, offset, "literal")?);
                if let Some(v) = bound.optional_marker(self, "escapeChar")? {
                    pattern.escape_char = v;
                }
                if let Some(v) = bound.optional_marker(self, "singleChar")? {
                    pattern.single_char = v;
                }
                if let Some(v) = bound.optional_marker(self, "wildCard")? {
                    pattern.wild_card = v;
                }
                FilterExpression::Like {
                    property,
                    pattern,
                    match_case: bound.optional_bool(self, "matchCase")?.unwrap_or(true),
                }
            }
            Operator::IsNull => FilterExpression::IsNull {
                property: bound.property(self, offset)?,
            },
            Operator::Between => FilterExpression::Between {
                property: bound.property(self, offset)?,
                lower: bound.required_literal(self, offset, "lower")?,
                upper: bound.required_literal(self, offset, "upper")?,
            },
        };
        Ok(expr)
    }

    fn value(&self, raw: RawValue<'_>) -> Result<Value> {
        Ok(match raw {
            RawValue::Str(s) => Value::Str(s),
            RawValue::Number(n) => Value::Number(n),
            RawValue::Bool(b) => Value::Bool(b),
            RawValue::List(items) => Value::List(
                items
                    .into_iter()
                    .map(|c| self.build(c))
                    .collect::<Result<_>>()?,
            ),
            RawValue::Call(c) => Value::Expr(self.build(c)?),
        })
    }
}

/// Arguments bound to parameter names.
struct Bound {
    values: Vec<(&'static str, Value, usize)>,
}

impl Bound {
    fn bind(
        parser: &Builder<'_>,
        operator: Operator,
        args: Vec<(Option<&str>, Value, usize)>,
    ) -> Result<Self> {
        let params = operator.parameters();
        let mut values: Vec<(&'static str, Value, usize)> = Vec::new();
        let mut seen_keyword = false;

        for (index, (keyword, value, at)) in args.into_iter().enumerate() {
            let name = match keyword {
                Some(keyword) => {
                    seen_keyword = true;
                    *params.iter().find(|p| **p == keyword).ok_or_else(|| {
                        parser.error_at(at, format!("unknown argument '{keyword}'"))
                    })?
                }
                None if seen_keyword => {
                    return Err(parser.error_at(at, "positional argument after keyword argument"))
                }
                None => *params
                    .get(index)
                    .ok_or_else(|| parser.error_at(at, "too many arguments"))?,
            };
            if values.iter().any(|(n, _, _)| *n == name) {
                return Err(parser.error_at(at, format!("argument '{name}' given twice")));
            }
            values.push((name, value, at));
        }

        Ok(Self { values })
    }

    fn take(&mut self, name: &str) -> Option<(Value, usize)> {
        let index = self.values.iter().position(|(n, _, _)| *n == name)?;
        let (_, value, at) = self.values.remove(index);
        Some((value, at))
    }

    fn property(&mut self, parser: &Builder<'_>, offset: usize) -> Result<String> {
        match self.take("propertyname") {
            Some((Value::Str(name), at)) => {
                if PROPERTY_NAME_PATTERN.is_match(&name) {
                    Ok(name)
                } else {
                    Err(parser.error_at(at, format!("invalid property name '{name}'")))
                }
            }
            Some((other, at)) => Err(parser.error_at(
                at,
                format!("'propertyname' must be a string, got {}", other.describe()),
            )),
            None => Err(parser.error_at(offset, "missing argument 'propertyname'")),
        }
    }

    fn required_literal(&mut self, parser: &Builder<'_>, offset: usize, name: &str) -> Result<String> {
        match self.take(name) {
            Some((Value::Str(s) | Value::Number(s), _)) => Ok(s),
            Some((other, at)) => Err(parser.error_at(
                at,
                format!("'{name}' must be a string or number, got {}", other.describe()),
            )),
            None => Err(parser.error_at(offset, format!("missing argument '{name}'"))),
        }
    }

    fn required_list(
        &mut self,
        parser: &Builder<'_>,
        offset: usize,
        name: &str,
    ) -> Result<Vec<FilterExpression>> {
        match self.take(name) {
            Some((Value::List(items), _)) => Ok(items),
            Some((other, at)) => Err(parser.error_at(
                at,
                format!("'{name}' must be a list, got {}", other.describe()),
            )),
            None => Err(parser.error_at(offset, format!("missing argument '{name}'"))),
        }
    }

    fn optional_bool(&mut self, parser: &Builder<'_>, name: &str) -> Result<Option<bool>> {
        match self.take(name) {
            Some((Value::Bool(b), _)) => Ok(Some(b)),
            Some((other, at)) => Err(parser.error_at(
                at,
                format!("'{name}' must be a boolean, got {}", other.describe()),
            )),
            None => Ok(None),
        }
    }

    fn optional_marker(&mut self, parser: &Builder<'_>, name: &str) -> Result<Option<String>> {
        match self.take(name) {
            Some((Value::Str(s), at)) => {
                if s.chars().count() == 1 {
                    Ok(Some(s))
                } else {
                    Err(parser.error_at(at, format!("'{name}' must be a single character")))
                }
            }
            Some((other, at)) => Err(parser.error_at(
                at,
                format!("'{name}' must be a string, got {}", other.describe()),
            )),
            None => Ok(None),
        }
    }
}
