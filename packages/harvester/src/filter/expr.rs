//! Filter expression tree and its OGC Filter Encoding 1.1 rendering.

use std::fmt;

use crate::error::Result;
use crate::xml::XmlWriter;

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    EqualTo,
    NotEqualTo,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
}

impl ComparisonOp {
    /// Local name of the `ogc` element for this operator.
    #[must_use]
    pub fn element_name(&self) -> &'static str {
        match self {
            Self::EqualTo => "PropertyIsEqualTo",
            Self::NotEqualTo => "PropertyIsNotEqualTo",
            Self::LessThan => "PropertyIsLessThan",
            Self::LessThanOrEqualTo => "PropertyIsLessThanOrEqualTo",
            Self::GreaterThan => "PropertyIsGreaterThan",
            Self::GreaterThanOrEqualTo => "PropertyIsGreaterThanOrEqualTo",
        }
    }
}

/// Pattern settings of a `PropertyIsLike` predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikePattern {
    pub pattern: String,
    pub wild_card: String,
    pub single_char: String,
    pub escape_char: String,
}

impl LikePattern {
    /// Pattern using the default `%`, `_` and `\` markers.
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            wild_card: "%".to_string(),
            single_char: "_".to_string(),
            escape_char: "\\".to_string(),
        }
    }
}

/// A catalogue query filter.
///
/// Leaves are predicates over a single property; `And`, `Or` and `Not`
/// combine them. Children keep the order they were written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpression {
    Comparison {
        op: ComparisonOp,
        property: String,
        literal: String,
        match_case: bool,
    },
    Like {
        property: String,
        pattern: LikePattern,
        match_case: bool,
    },
    IsNull {
        property: String,
    },
    Between {
        property: String,
        lower: String,
        upper: String,
    },
    And(Vec<FilterExpression>),
    Or(Vec<FilterExpression>),
    Not(Box<FilterExpression>),
}

impl FilterExpression {
    /// Case-sensitive comparison predicate.
    #[must_use]
    pub fn compare(op: ComparisonOp, property: impl Into<String>, literal: impl Into<String>) -> Self {
        Self::Comparison {
            op,
            property: property.into(),
            literal: literal.into(),
            match_case: true,
        }
    }

    /// Case-sensitive `PropertyIsEqualTo` predicate.
    #[must_use]
    pub fn equal_to(property: impl Into<String>, literal: impl Into<String>) -> Self {
        Self::compare(ComparisonOp::EqualTo, property, literal)
    }

    /// Nesting depth, counting leaves as 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::And(children) | Self::Or(children) => {
                1 + children.iter().map(Self::depth).max().unwrap_or(0)
            }
            Self::Not(child) => 1 + child.depth(),
            _ => 1,
        }
    }

    /// Write this expression as `ogc:` elements.
    ///
    /// The `ogc` prefix must already be bound by an enclosing element.
    pub fn write_xml(&self, w: &mut XmlWriter) -> Result<()> {
        match self {
            Self::Comparison {
                op,
                property,
                literal,
                match_case,
            } => {
                let name = format!("ogc:{}", op.element_name());
                let attrs: &[(&str, &str)] = if *match_case {
                    &[]
                } else {
                    &[("matchCase", "false")]
                };
                w.start(&name, attrs)?;
                w.text_element("ogc:PropertyName", property)?;
                w.text_element("ogc:Literal", literal)?;
                w.end(&name)
            }
            Self::Like {
                property,
                pattern,
                match_case,
            } => {
                let mut attrs = vec![
                    ("wildCard", pattern.wild_card.as_str()),
                    ("singleChar", pattern.single_char.as_str()),
                    ("escapeChar", pattern.escape_char.as_str()),
                ];
                if !*match_case {
                    attrs.push(("matchCase", "false"));
                }
                w.start("ogc:PropertyIsLike", &attrs)?;
                w.text_element("ogc:PropertyName", property)?;
                w.text_element("ogc:Literal", &pattern.pattern)?;
                w.end("ogc:PropertyIsLike")
            }
            Self::IsNull { property } => {
                w.start("ogc:PropertyIsNull", &[])?;
                w.text_element("ogc:PropertyName", property)?;
                w.end("ogc:PropertyIsNull")
            }
            Self::Between {
                property,
                lower,
                upper,
            } => {
                w.start("ogc:PropertyIsBetween", &[])?;
                w.text_element("ogc:PropertyName", property)?;
                w.start("ogc:LowerBoundary", &[])?;
                w.text_element("ogc:Literal", lower)?;
                w.end("ogc:LowerBoundary")?;
                w.start("ogc:UpperBoundary", &[])?;
                w.text_element("ogc:Literal", upper)?;
                w.end("ogc:UpperBoundary")?;
                w.end("ogc:PropertyIsBetween")
            }
            Self::And(children) => write_combinator(w, "ogc:And", children),
            Self::Or(children) => write_combinator(w, "ogc:Or", children),
            Self::Not(child) => {
                w.start("ogc:Not", &[])?;
                child.write_xml(w)?;
                w.end("ogc:Not")
            }
        }
    }

    /// Render as a standalone `<ogc:Filter>` document fragment.
    pub fn to_filter_xml(&self) -> Result<String> {
        let mut w = XmlWriter::fragment();
        w.start_with_namespaces("ogc:Filter", &["ogc"], &[])?;
        self.write_xml(&mut w)?;
        w.end("ogc:Filter")?;
        w.finish()
    }
}

fn write_combinator(w: &mut XmlWriter, name: &str, children: &[FilterExpression]) -> Result<()> {
    w.start(name, &[])?;
    for child in children {
        child.write_xml(w)?;
    }
    w.end(name)
}

/// Renders the expression back in the configuration call syntax.
impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comparison {
                op,
                property,
                literal,
                match_case,
            } => {
                write!(f, "{}({:?}, {:?}", op.element_name(), property, literal)?;
                if !match_case {
                    f.write_str(", matchCase=False")?;
                }
                f.write_str(")")
            }
            Self::Like {
                property,
                pattern,
                match_case,
            } => {
                write!(
                    f,
                    "PropertyIsLike({:?}, {:?}, escapeChar={:?}, singleChar={:?}, wildCard={:?}",
                    property,
                    pattern.pattern,
                    pattern.escape_char,
                    pattern.single_char,
                    pattern.wild_card
                )?;
                if !match_case {
                    f.write_str(", matchCase=False")?;
                }
                f.write_str(")")
            }
            Self::IsNull { property } => write!(f, "PropertyIsNull({property:?})"),
            Self::Between {
                property,
                lower,
                upper,
            } => write!(f, "PropertyIsBetween({property:?}, {lower:?}, {upper:?})"),
            Self::And(children) => write_list(f, "And", children),
            Self::Or(children) => write_list(f, "Or", children),
            Self::Not(child) => write!(f, "Not([{child}])"),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, name: &str, children: &[FilterExpression]) -> fmt::Result {
    write!(f, "{name}([")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{child}")?;
    }
    f.write_str("])")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_comparison_xml() {
        let xml = FilterExpression::equal_to("dc:type", "dataset")
            .to_filter_xml()
            .unwrap();
        assert_eq!(
            xml,
            "<ogc:Filter xmlns:ogc=\"http://www.opengis.net/ogc\">\
             <ogc:PropertyIsEqualTo>\
             <ogc:PropertyName>dc:type</ogc:PropertyName>\
             <ogc:Literal>dataset</ogc:Literal>\
             </ogc:PropertyIsEqualTo>\
             </ogc:Filter>"
        );
    }

    #[test]
    fn test_like_xml_attributes() {
        let expr = FilterExpression::Like {
            property: "csw:AnyText".to_string(),
            pattern: LikePattern::new("%eau%"),
            match_case: false,
        };
        let xml = expr.to_filter_xml().unwrap();
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let like = doc.root_element().first_element_child().unwrap();

        assert_eq!(like.tag_name().name(), "PropertyIsLike");
        assert_eq!(like.attribute("wildCard"), Some("%"));
        assert_eq!(like.attribute("singleChar"), Some("_"));
        assert_eq!(like.attribute("escapeChar"), Some("\\"));
        assert_eq!(like.attribute("matchCase"), Some("false"));
    }

    #[test]
    fn test_between_xml_boundaries() {
        let expr = FilterExpression::Between {
            property: "dct:modified".to_string(),
            lower: "2020-01-01".to_string(),
            upper: "2021-01-01".to_string(),
        };
        let xml = expr.to_filter_xml().unwrap();
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let names: Vec<_> = doc
            .descendants()
            .filter(|n| n.is_element())
            .map(|n| n.tag_name().name())
            .collect();

        assert_eq!(
            names,
            vec![
                "Filter",
                "PropertyIsBetween",
                "PropertyName",
                "LowerBoundary",
                "Literal",
                "UpperBoundary",
                "Literal"
            ]
        );
    }

    #[test]
    fn test_combinators_keep_order() {
        let expr = FilterExpression::Or(vec![
            FilterExpression::equal_to("dc:type", "dataset"),
            FilterExpression::Not(Box::new(FilterExpression::IsNull {
                property: "dc:title".to_string(),
            })),
        ]);
        assert_eq!(expr.depth(), 3);

        let xml = expr.to_filter_xml().unwrap();
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let or = doc.root_element().first_element_child().unwrap();
        let children: Vec<_> = or
            .children()
            .filter(|n| n.is_element())
            .map(|n| n.tag_name().name())
            .collect();
        assert_eq!(children, vec!["PropertyIsEqualTo", "Not"]);
    }

    #[test]
    fn test_display_uses_call_syntax() {
        let expr = FilterExpression::And(vec![
            FilterExpression::equal_to("dc:type", "dataset"),
            FilterExpression::IsNull {
                property: "dc:title".to_string(),
            },
        ]);
        assert_eq!(
            expr.to_string(),
            r#"And([PropertyIsEqualTo("dc:type", "dataset"), PropertyIsNull("dc:title")])"#
        );
    }
}
