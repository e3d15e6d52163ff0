//! Data models for Venturer.
//!
//! This module contains all domain models:
//! - Venture
//! - Project, Milestone, Workstream
//! - Item (task / note / idea with STEP fields)
//! - Association
//! - Team, TeamMember
//! - ProjectTemplate
//! - User, UserSubscription

/// Declare a string-backed enum that round-trips through serde and SQLite.
///
/// Each variant maps to exactly one lowercase storage string.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $s:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $s)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Get the string representation for storage.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $s ),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $( $s => Ok(Self::$variant), )+
                    _ => Err(format!("Unknown {}: {s}", stringify!($name))),
                }
            }
        }

        impl rusqlite::types::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(self.as_str().into())
            }
        }

        impl rusqlite::types::FromSql for $name {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: String| rusqlite::types::FromSqlError::Other(e.into()))
            }
        }
    };
}

pub mod association;
pub mod item;
pub mod milestone;
pub mod project;
pub mod team;
pub mod template;
pub mod user;
pub mod venture;

pub use association::{Association, EntityKind, EntityRef, RelationshipType};
pub use item::{Item, ItemStatus, ItemType, ItemUpdate};
pub use milestone::{
    Milestone, MilestoneStatus, MilestoneUpdate, Workstream, WorkstreamStatus, WorkstreamUpdate,
};
pub use project::{Project, ProjectStatus, ProjectUpdate};
pub use team::{Team, TeamMember, TeamRole};
pub use template::{ProjectTemplate, TemplateMilestone, TemplateSubtask, TemplateTask};
pub use user::{Plan, SubscriptionStatus, User, UserRole, UserStatus, UserSubscription};
pub use venture::{Venture, VentureStatus, VentureUpdate};

/// Current time as Unix milliseconds.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a prefixed record ID (e.g. `item_1a2b3c4d5e6f`).
pub(crate) fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
}
