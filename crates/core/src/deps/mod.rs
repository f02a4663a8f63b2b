//! From declared needs to missing and surplus dependency verdicts.
//!
//! - [`aggregate`] resolves needed files into providing packages and groups
//!   needs by requesting package and reason.
//! - [`reconcile`] compares the grouped needs with declared dependencies.
//! - [`report`] renders the human report and suggested declaration lines.

pub mod aggregate;
pub mod reconcile;
pub mod report;

pub use aggregate::{aggregate, AggregatedNeeds, PathLookup, ReasonGroup};
pub use reconcile::{reconcile, DependencyPolicy, MissingGroup, Reconciliation};
pub use report::{render_dependency_report, suggested_dependency_lines};
