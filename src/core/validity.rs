use chrono::{DateTime, FixedOffset};

/// Record bound to a validity window, both ends inclusive.
///
/// An absent end means the record is still active.
pub trait Validity {
    fn valid_from(&self) -> DateTime<FixedOffset>;

    fn valid_to(&self) -> Option<DateTime<FixedOffset>>;

    fn is_valid_at(&self, at: DateTime<FixedOffset>) -> bool {
        at >= self.valid_from() && self.valid_to().is_none_or(|valid_to| at <= valid_to)
    }
}

/// Which record wins when several validity windows contain the same moment.
///
/// Windows ending inclusively overlap with their successors on the boundary,
/// and suppliers do not always close agreements precisely.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, clap::ValueEnum)]
pub enum Precedence {
    /// The first matching record in the caller-provided order.
    #[default]
    FirstDeclared,

    /// The matching record which started last; later-declared on ties.
    LatestStart,
}

/// Find the record valid at the given moment.
///
/// The records are expected in chronological order, but they are never sorted here.
pub fn resolve<T: Validity>(
    records: &[T],
    at: DateTime<FixedOffset>,
    precedence: Precedence,
) -> Option<&T> {
    let mut matching = records.iter().filter(|record| record.is_valid_at(at));
    match precedence {
        Precedence::FirstDeclared => matching.next(),
        Precedence::LatestStart => matching.max_by_key(|record| record.valid_from()),
    }
}
