//! Visit filter requests and their normalized predicate form

pub mod builder;
pub mod fingerprint;
pub mod predicate;
pub mod request;

pub use builder::{
    DateCondition, NormalizedQuery, PredicateBuilder, Projection, SearchTerm, SortOrder,
    TextCondition, TextOperand,
};
pub use fingerprint::{QueryKind, fingerprint};
pub use predicate::{CompareOp, FilterValue, LIKE_ESCAPE, Predicate, escape_like};
pub use request::{
    Comparator, DEFAULT_PAGE_SIZE, DateFilter, IdFilter, ReferralStatus, TextFilter, VisitColumn,
    VisitQuery,
};
