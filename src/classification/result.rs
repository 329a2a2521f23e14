use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::ontology::{contracts::CommitRecord, value_objects::ConceptSequence};

/// Concepts proven equivalent to one another by a classification run.
pub type EquivalentSet = BTreeSet<ConceptSequence>;

/// Immutable outcome of one classification run.
///
/// Instances are only produced through [`ClassificationResult::new`] or
/// [`ClassificationResultBuilder::build`], both of which check that the
/// equivalence partition is disjoint. Nothing mutates a result afterwards, so
/// it can be shared across threads as is.
#[derive(Clone, Debug)]
pub struct ClassificationResult {
    affected_concepts: BTreeSet<ConceptSequence>,
    equivalent_sets: BTreeSet<EquivalentSet>,
    orphans: BTreeSet<ConceptSequence>,
    concepts_with_cycles: BTreeMap<ConceptSequence, BTreeSet<Vec<ConceptSequence>>>,
    commit: Option<Arc<dyn CommitRecord>>,
}

impl ClassificationResult {
    /// Assembles a result from already computed outputs.
    ///
    /// # Errors
    /// [`ClassificationError::InvalidPartition`] when an equivalent set has
    /// fewer than two members or two sets share a concept.
    pub fn new<A, E, S>(
        affected_concepts: A,
        equivalent_sets: E,
        commit: Option<Arc<dyn CommitRecord>>,
    ) -> Result<Self, ClassificationError>
    where
        A: IntoIterator<Item = ConceptSequence>,
        E: IntoIterator<Item = S>,
        S: IntoIterator<Item = ConceptSequence>,
    {
        let mut builder = ClassificationResultBuilder::new().affected(affected_concepts);
        for set in equivalent_sets {
            builder = builder.equivalent_set(set);
        }
        if let Some(commit) = commit {
            builder = builder.commit(commit);
        }
        builder.build()
    }

    /// Concepts whose logical position changed.
    #[must_use]
    pub fn affected_concepts(&self) -> &BTreeSet<ConceptSequence> {
        &self.affected_concepts
    }

    /// Disjoint equivalence classes. Concepts without equivalents are absent.
    #[must_use]
    pub fn equivalent_sets(&self) -> &BTreeSet<EquivalentSet> {
        &self.equivalent_sets
    }

    /// Commit that persisted the run, absent for a preview run.
    #[must_use]
    pub fn commit(&self) -> Option<&Arc<dyn CommitRecord>> {
        self.commit.as_ref()
    }

    /// Concepts left without any parent by the run.
    #[must_use]
    pub fn orphans(&self) -> &BTreeSet<ConceptSequence> {
        &self.orphans
    }

    /// Concepts found on a subsumption cycle, with every cycle detected for
    /// them.
    #[must_use]
    pub fn concepts_with_cycles(
        &self,
    ) -> &BTreeMap<ConceptSequence, BTreeSet<Vec<ConceptSequence>>> {
        &self.concepts_with_cycles
    }

    #[must_use]
    pub fn is_affected(&self, concept: ConceptSequence) -> bool {
        self.affected_concepts.contains(&concept)
    }

    /// Equivalence class containing `concept`, if it has equivalents.
    #[must_use]
    pub fn equivalence_class_of(&self, concept: ConceptSequence) -> Option<&EquivalentSet> {
        self.equivalent_sets.iter().find(|set| set.contains(&concept))
    }

    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.commit.is_some()
    }

    /// Counts describing the result without listing its contents.
    #[must_use]
    pub fn summary(&self) -> ClassificationSummary {
        ClassificationSummary::from(self)
    }
}

impl Display for ClassificationResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let summary = self.summary();
        write!(
            f,
            "ClassificationResult {{ affected concepts: {}, equivalent sets: {}",
            summary.affected_concepts, summary.equivalent_sets
        )?;
        if summary.orphans > 0 {
            write!(f, ", orphans: {}", summary.orphans)?;
        }
        if summary.concepts_with_cycles > 0 {
            write!(f, ", concepts with cycles: {}", summary.concepts_with_cycles)?;
        }
        write!(
            f,
            ", committed: {} }}",
            if summary.committed { "yes" } else { "no" }
        )
    }
}

/// Counts-only view of a [`ClassificationResult`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassificationSummary {
    pub affected_concepts: usize,
    pub equivalent_sets: usize,
    pub orphans: usize,
    pub concepts_with_cycles: usize,
    pub committed: bool,
}

impl From<&ClassificationResult> for ClassificationSummary {
    fn from(result: &ClassificationResult) -> Self {
        Self {
            affected_concepts: result.affected_concepts.len(),
            equivalent_sets: result.equivalent_sets.len(),
            orphans: result.orphans.len(),
            concepts_with_cycles: result.concepts_with_cycles.len(),
            committed: result.commit.is_some(),
        }
    }
}

/// Collects the raw outputs of a classifier before validating them into a
/// [`ClassificationResult`].
#[derive(Debug, Default)]
pub struct ClassificationResultBuilder {
    affected_concepts: BTreeSet<ConceptSequence>,
    equivalent_sets: Vec<EquivalentSet>,
    orphans: BTreeSet<ConceptSequence>,
    concepts_with_cycles: BTreeMap<ConceptSequence, BTreeSet<Vec<ConceptSequence>>>,
    commit: Option<Arc<dyn CommitRecord>>,
}

impl ClassificationResultBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn affected(mut self, concepts: impl IntoIterator<Item = ConceptSequence>) -> Self {
        self.affected_concepts.extend(concepts);
        self
    }

    #[must_use]
    pub fn equivalent_set(mut self, concepts: impl IntoIterator<Item = ConceptSequence>) -> Self {
        self.equivalent_sets.push(concepts.into_iter().collect());
        self
    }

    #[must_use]
    pub fn orphans(mut self, concepts: impl IntoIterator<Item = ConceptSequence>) -> Self {
        self.orphans.extend(concepts);
        self
    }

    /// Records a subsumption cycle for `concept`.
    #[must_use]
    pub fn cycle(mut self, concept: ConceptSequence, cycle: Vec<ConceptSequence>) -> Self {
        self.concepts_with_cycles
            .entry(concept)
            .or_default()
            .insert(cycle);
        self
    }

    #[must_use]
    pub fn commit(mut self, commit: Arc<dyn CommitRecord>) -> Self {
        self.commit = Some(commit);
        self
    }

    /// Validates the collected outputs.
    ///
    /// # Errors
    /// [`ClassificationError::InvalidPartition`] when an equivalent set has
    /// fewer than two members or two sets share a concept.
    pub fn build(self) -> Result<ClassificationResult, ClassificationError> {
        let mut owner: BTreeMap<ConceptSequence, usize> = BTreeMap::new();
        for (index, set) in self.equivalent_sets.iter().enumerate() {
            if set.len() < 2 {
                return Err(ClassificationError::InvalidPartition {
                    reason: format!(
                        "equivalent set #{index} has {} member(s), at least 2 are required",
                        set.len()
                    ),
                });
            }
            for concept in set {
                if let Some(previous) = owner.insert(*concept, index) {
                    return Err(ClassificationError::InvalidPartition {
                        reason: format!(
                            "concept {concept} appears in equivalent sets #{previous} and #{index}"
                        ),
                    });
                }
            }
        }

        let result = ClassificationResult {
            affected_concepts: self.affected_concepts,
            equivalent_sets: self.equivalent_sets.into_iter().collect(),
            orphans: self.orphans,
            concepts_with_cycles: self.concepts_with_cycles,
            commit: self.commit,
        };
        tracing::debug!(result = %result, "classification_result_built");
        Ok(result)
    }
}

/// Errors raised while assembling a [`ClassificationResult`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClassificationError {
    /// The equivalence partition handed over by the classifier is not a
    /// partition. Points at a bug upstream; never repaired here.
    #[error("invalid equivalence partition: {reason}")]
    InvalidPartition { reason: String },
}
