//! Derived views over items: STEP filtering, team capacity and reports.
//!
//! Nothing here persists anything; every function works on records already
//! loaded from storage.

pub mod capacity;
pub mod report;
pub mod step;

pub use capacity::{member_capacity, team_capacity, LoadStatus, MemberCapacity};
pub use report::{Report, ReportScope};
pub use step::{sort_by_step, StepFilter};
