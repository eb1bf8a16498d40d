//! Known-true completion index for filtered evaluation.
//!
//! For every query `(entity, relation)` seen anywhere in train, valid or
//! test, the index records all entities that complete it. During filtered
//! ranking these known completions are removed from the candidate pool so
//! they do not compete with the evaluated target.
//!
//! Both corruption directions are covered through reciprocal relations: the
//! completions of `(?, r, o)` are stored under `(o, r_reverse)`.

use crate::dataset::Dataset;
use std::collections::HashMap;

/// Map from `(entity, relation)` to the sorted ids of all known completions.
#[derive(Debug, Clone, Default)]
pub struct FilterIndex {
    tails: HashMap<(u32, u32), Vec<u32>>,
}

impl FilterIndex {
    /// Build the index over all three splits of a dataset.
    pub fn build(dataset: &Dataset) -> Self {
        let mut tails: HashMap<(u32, u32), Vec<u32>> = HashMap::new();

        let splits = [&dataset.train, &dataset.valid, &dataset.test];
        for triple in splits.into_iter().flatten() {
            tails
                .entry((triple.subject, triple.relation))
                .or_default()
                .push(triple.object);
            tails
                .entry((triple.object, dataset.relations.reverse(triple.relation)))
                .or_default()
                .push(triple.subject);
        }

        for ids in tails.values_mut() {
            ids.sort_unstable();
            ids.dedup();
        }

        Self { tails }
    }

    /// Known completions of `(entity, relation, ?)`. Empty when the query was
    /// never observed.
    pub fn completions(&self, entity: u32, relation: u32) -> &[u32] {
        self.tails
            .get(&(entity, relation))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of distinct queries indexed.
    pub fn len(&self) -> usize {
        self.tails.len()
    }

    /// True if no queries are indexed.
    pub fn is_empty(&self) -> bool {
        self.tails.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinship_fixture() -> Dataset {
        Dataset::from_splits(
            &[("anna", "parent", "ben"), ("anna", "parent", "cora")],
            &[("anna", "parent", "dave")],
            &[("ben", "parent", "eve")],
        )
    }

    #[test]
    fn test_completions_cover_all_splits() {
        let ds = kinship_fixture();
        let filters = FilterIndex::build(&ds);

        let anna = ds.entities.get("anna").unwrap();
        let parent = ds.relations.get("parent").unwrap();
        let completions = filters.completions(anna, parent);

        // ben, cora from train plus dave from valid
        assert_eq!(completions.len(), 3);
        assert!(completions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_reverse_direction() {
        let ds = kinship_fixture();
        let filters = FilterIndex::build(&ds);

        let ben = ds.entities.get("ben").unwrap();
        let anna = ds.entities.get("anna").unwrap();
        let parent = ds.relations.get("parent").unwrap();
        let rev = ds.relations.reverse(parent);

        // who is a parent of ben?
        assert_eq!(filters.completions(ben, rev), &[anna]);
    }

    #[test]
    fn test_unseen_query_is_empty() {
        let ds = kinship_fixture();
        let filters = FilterIndex::build(&ds);
        let eve = ds.entities.get("eve").unwrap();
        let parent = ds.relations.get("parent").unwrap();

        assert!(filters.completions(eve, parent).is_empty());
    }
}
