use thiserror::Error;

/// Errors that can occur in spinel-kge.
///
/// Configuration faults (`UnknownModel`, `UnknownDevice`) are raised once at
/// startup, before any training or evaluation. Data-integrity faults
/// (`EntityOutOfRange`, `EmptyEvaluation`) indicate an upstream invariant
/// violation and are never recovered here; they propagate to the caller,
/// which is expected to terminate the run.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Checkpoint (de)serialization error.
    #[error("checkpoint codec error: {0}")]
    Codec(#[from] bincode::Error),
    /// Unrecognized model tag in configuration.
    #[error("unknown model type: {0:?} (expected one of: distmult, complex, transe)")]
    UnknownModel(String),
    /// Unrecognized device tag in configuration.
    #[error("unknown device: {0:?} (expected: cpu)")]
    UnknownDevice(String),
    /// An entity id fell outside the candidate range of a score vector.
    #[error("entity id {id} outside candidate range 0..{num_entities}")]
    EntityOutOfRange {
        /// The offending id.
        id: u32,
        /// Size of the candidate pool.
        num_entities: usize,
    },
    /// A relation id fell outside the model's relation table.
    #[error("relation id {id} outside relation range 0..{num_relations}")]
    RelationOutOfRange {
        /// The offending id.
        id: u32,
        /// Size of the relation id space.
        num_relations: usize,
    },
    /// An evaluation pass produced no examples.
    #[error("evaluation pass produced no examples")]
    EmptyEvaluation,
    /// A checkpoint was captured from a different model variant.
    #[error("checkpoint holds a {found} model, cannot restore into {requested}")]
    ModelMismatch {
        /// Variant recorded in the checkpoint.
        found: String,
        /// Variant of the receiving model.
        requested: String,
    },
    /// A checkpoint parameter does not match the receiving model.
    #[error("parameter {name:?} has shape {found:?}, expected {expected:?}")]
    ParameterShape {
        /// Parameter name.
        name: String,
        /// Shape expected by the model.
        expected: Vec<usize>,
        /// Shape found in the checkpoint.
        found: Vec<usize>,
    },
    /// A checkpoint is missing a parameter the model requires.
    #[error("checkpoint is missing parameter {0:?}")]
    MissingParameter(String),
    /// Dataset error.
    #[error(transparent)]
    Data(#[from] spinel_core::DataError),
}

/// Result type alias for spinel-kge.
pub type Result<T> = std::result::Result<T, Error>;
