//! Triple types for knowledge graph completion.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A fact with dense integer ids.
///
/// Entities live in `[0, num_entities)`, relations in `[0, num_relations)`.
/// The id spaces are owned by the [`Vocabulary`](crate::Vocabulary) and
/// [`RelationVocab`](crate::RelationVocab) that interned them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    /// Subject entity (head).
    pub subject: u32,
    /// Relation (predicate).
    pub relation: u32,
    /// Object entity (tail).
    pub object: u32,
}

impl Triple {
    /// Create a new triple from dense ids.
    pub fn new(subject: u32, relation: u32, object: u32) -> Self {
        Self {
            subject,
            relation,
            object,
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.relation, self.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let t = Triple::new(0, 1, 2);
        assert_eq!(t.to_string(), "(0, 1, 2)");
    }
}
