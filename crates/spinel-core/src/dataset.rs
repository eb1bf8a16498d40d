//! Triple dataset loading.
//!
//! A dataset directory holds three tab-separated split files:
//!
//! ```text
//! train.txt    subject<TAB>relation<TAB>object
//! valid.txt
//! test.txt
//! ```
//!
//! Blank lines and `#` comments are skipped. Entities and relations are
//! interned across all three splits, so ids are stable between training and
//! evaluation.

use crate::error::{DataError, Result};
use crate::triple::Triple;
use crate::vocab::{RelationVocab, Vocabulary};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::str::FromStr;

/// One of the three dataset splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    /// Training triples.
    Train,
    /// Validation triples.
    Valid,
    /// Test triples.
    Test,
}

impl FromStr for Split {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "train" => Ok(Self::Train),
            "valid" => Ok(Self::Valid),
            "test" => Ok(Self::Test),
            other => Err(format!("unknown split: {}", other)),
        }
    }
}

/// A knowledge graph completion dataset: interned triples plus vocabularies.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Entity vocabulary.
    pub entities: Vocabulary,
    /// Relation vocabulary (forward plus reciprocal ids).
    pub relations: RelationVocab,
    /// Training split.
    pub train: Vec<Triple>,
    /// Validation split.
    pub valid: Vec<Triple>,
    /// Test split.
    pub test: Vec<Triple>,
}

impl Dataset {
    /// Load `train.txt`, `valid.txt` and `test.txt` from a directory.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut entities = Vocabulary::new();
        let mut relations = RelationVocab::new();

        let train = read_split(&dir.join("train.txt"), &mut entities, &mut relations)?;
        let valid = read_split(&dir.join("valid.txt"), &mut entities, &mut relations)?;
        let test = read_split(&dir.join("test.txt"), &mut entities, &mut relations)?;

        Ok(Self {
            entities,
            relations,
            train,
            valid,
            test,
        })
    }

    /// Build a dataset from in-memory string triples. Intended for tests and
    /// small fixtures.
    pub fn from_splits(
        train: &[(&str, &str, &str)],
        valid: &[(&str, &str, &str)],
        test: &[(&str, &str, &str)],
    ) -> Self {
        let mut entities = Vocabulary::new();
        let mut relations = RelationVocab::new();

        let mut intern = |triples: &[(&str, &str, &str)]| -> Vec<Triple> {
            triples
                .iter()
                .map(|(s, r, o)| {
                    Triple::new(
                        entities.intern(s),
                        relations.intern(r),
                        entities.intern(o),
                    )
                })
                .collect()
        };

        let train = intern(train);
        let valid = intern(valid);
        let test = intern(test);

        Self {
            entities,
            relations,
            train,
            valid,
            test,
        }
    }

    /// Number of candidate entities.
    pub fn num_entities(&self) -> usize {
        self.entities.len()
    }

    /// Size of the relation id space (forward plus reciprocal).
    pub fn num_relations(&self) -> usize {
        self.relations.len()
    }

    /// Triples of a split.
    pub fn split(&self, split: Split) -> &[Triple] {
        match split {
            Split::Train => &self.train,
            Split::Valid => &self.valid,
            Split::Test => &self.test,
        }
    }
}

fn read_split(
    path: &Path,
    entities: &mut Vocabulary,
    relations: &mut RelationVocab,
) -> Result<Vec<Triple>> {
    let file = File::open(path)?;
    let triples = parse_split(file, &path.display().to_string(), entities, relations)?;
    if triples.is_empty() {
        return Err(DataError::EmptySplit(path.display().to_string()));
    }
    Ok(triples)
}

fn parse_split<R: Read>(
    reader: R,
    path: &str,
    entities: &mut Vocabulary,
    relations: &mut RelationVocab,
) -> Result<Vec<Triple>> {
    let buf = BufReader::new(reader);
    let mut triples = Vec::new();

    for (lineno, line) in buf.lines().enumerate() {
        let line = line?;
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split('\t');
        match (fields.next(), fields.next(), fields.next(), fields.next()) {
            (Some(s), Some(r), Some(o), None) => {
                triples.push(Triple::new(
                    entities.intern(s.trim()),
                    relations.intern(r.trim()),
                    entities.intern(o.trim()),
                ));
            }
            _ => {
                return Err(DataError::MalformedTriple {
                    path: path.to_string(),
                    line: lineno + 1,
                    text: line.to_string(),
                });
            }
        }
    }

    Ok(triples)
}
