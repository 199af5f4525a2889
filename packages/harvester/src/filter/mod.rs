//! Filter translation: configured specifications to an OGC filter tree.
//!
//! Several configured specifications are alternatives: a record matching
//! any one of them is harvested, so they are combined under `Or`.

mod expr;
mod parser;

pub use expr::{ComparisonOp, FilterExpression, LikePattern};
pub use parser::{parse, Operator, MAX_DEPTH};

use crate::error::Result;

/// Translate an ordered list of filter specifications.
///
/// - no specification: `None` (unconstrained search)
/// - one specification: that filter as written
/// - several: one `Or` node whose children keep the input order
///
/// Every specification is parsed before anything is returned, so a single
/// bad entry rejects the whole list.
///
/// # Examples
/// ```
/// use csw_harvester::filter::{translate, FilterExpression};
///
/// assert_eq!(translate::<&str>(&[]).unwrap(), None);
///
/// let combined = translate(&[
///     "PropertyIsEqualTo('dc:type', 'dataset')",
///     "PropertyIsEqualTo('dc:type', 'series')",
/// ])
/// .unwrap();
/// assert!(matches!(combined, Some(FilterExpression::Or(children)) if children.len() == 2));
/// ```
pub fn translate<S: AsRef<str>>(specs: &[S]) -> Result<Option<FilterExpression>> {
    let mut filters = specs
        .iter()
        .map(|spec| parse(spec.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    let filter = match filters.len() {
        0 => None,
        1 => filters.pop(),
        _ => Some(FilterExpression::Or(filters)),
    };
    if let Some(f) = &filter {
        tracing::debug!(filter = %f, "Translated filter specifications");
    }
    Ok(filter)
}
