//! Association model: typed, directed links between work entities.

use serde::{Deserialize, Serialize};

use super::{new_id, now_millis};

string_enum! {
    /// Entity kinds that can take part in an association.
    pub enum EntityKind {
        Task => "task",
        Milestone => "milestone",
        Workstream => "workstream",
    }
}

string_enum! {
    /// Relationship carried by an association, read as `from <rel> to`.
    pub enum RelationshipType {
        Blocks => "blocks",
        BlockedBy => "blocked_by",
        DependsOn => "depends_on",
        Aids => "aids",
        AidedBy => "aided_by",
        RelatesTo => "relates_to",
        ParentOf => "parent_of",
        ChildOf => "child_of",
    }
}

impl RelationshipType {
    /// Label shown on the receiving side of the link.
    ///
    /// `A blocks B` reads as `B blocked_by A` from B's point of view.
    #[must_use]
    pub const fn inverse_label(&self) -> &'static str {
        match self {
            Self::Blocks => "blocked_by",
            Self::BlockedBy => "blocks",
            Self::DependsOn => "dependency_of",
            Self::Aids => "aided_by",
            Self::AidedBy => "aids",
            Self::RelatesTo => "relates_to",
            Self::ParentOf => "child_of",
            Self::ChildOf => "parent_of",
        }
    }

    /// Whether the relationship describes the parent/child hierarchy.
    #[must_use]
    pub const fn is_hierarchical(&self) -> bool {
        matches!(self, Self::ParentOf | Self::ChildOf)
    }
}

/// One endpoint of an association.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: &str) -> Self {
        Self {
            kind,
            id: id.to_string(),
        }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A typed directed edge between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Association {
    pub id: String,
    pub from_entity_type: EntityKind,
    pub from_entity_id: String,
    pub to_entity_type: EntityKind,
    pub to_entity_id: String,
    pub relationship_type: RelationshipType,
    pub note: Option<String>,
    pub created_by: String,
    pub created_at: i64,
}

impl Association {
    pub fn new(
        from: &EntityRef,
        to: &EntityRef,
        relationship_type: RelationshipType,
        created_by: &str,
    ) -> Self {
        Self {
            id: new_id("assoc"),
            from_entity_type: from.kind,
            from_entity_id: from.id.clone(),
            to_entity_type: to.kind,
            to_entity_id: to.id.clone(),
            relationship_type,
            note: None,
            created_by: created_by.to_string(),
            created_at: now_millis(),
        }
    }

    #[must_use]
    pub fn from_ref(&self) -> EntityRef {
        EntityRef::new(self.from_entity_type, &self.from_entity_id)
    }

    #[must_use]
    pub fn to_ref(&self) -> EntityRef {
        EntityRef::new(self.to_entity_type, &self.to_entity_id)
    }

    /// The `(parent, child)` pair if this is a hierarchy edge.
    #[must_use]
    pub fn hierarchy_edge(&self) -> Option<(EntityRef, EntityRef)> {
        match self.relationship_type {
            RelationshipType::ParentOf => Some((self.from_ref(), self.to_ref())),
            RelationshipType::ChildOf => Some((self.to_ref(), self.from_ref())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_labels() {
        assert_eq!(RelationshipType::Blocks.inverse_label(), "blocked_by");
        assert_eq!(RelationshipType::ParentOf.inverse_label(), "child_of");
        assert_eq!(RelationshipType::RelatesTo.inverse_label(), "relates_to");
    }

    #[test]
    fn test_hierarchy_edge_normalizes_child_of() {
        let a = EntityRef::new(EntityKind::Task, "item_a");
        let b = EntityRef::new(EntityKind::Task, "item_b");

        let child = Association::new(&a, &b, RelationshipType::ChildOf, "u");
        assert_eq!(child.hierarchy_edge(), Some((b.clone(), a.clone())));

        let blocks = Association::new(&a, &b, RelationshipType::Blocks, "u");
        assert!(blocks.hierarchy_edge().is_none());
    }
}
