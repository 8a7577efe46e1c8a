//! In-memory step catalog.

use std::collections::HashMap;

use crate::keyword::GherkinKind;
use crate::step::Step;

/// Steps in registration order, deduplicated by identity.
///
/// A registry is built once and then only read. Usage counters are atomic,
/// so counting works through a shared reference.
#[derive(Debug, Default)]
pub struct StepRegistry {
    steps: Vec<Step>,
    index: HashMap<String, usize>,
}

impl StepRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `step` unless a step with the same identity is already present.
    ///
    /// Returns whether the step was added.
    pub fn register(&mut self, step: Step) -> bool {
        if self.index.contains_key(step.id()) {
            return false;
        }
        self.index.insert(step.id().to_owned(), self.steps.len());
        self.steps.push(step);
        true
    }

    /// First step, in registration order, whose full matcher accepts `text`.
    ///
    /// With `kind` set only steps declared under that keyword are considered.
    #[must_use]
    pub fn lookup(&self, text: &str, kind: Option<GherkinKind>) -> Option<&Step> {
        self.steps
            .iter()
            .filter(|step| kind.is_none_or(|kind| step.kind() == kind))
            .find(|step| step.matches(text))
    }

    /// Step with identity `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Step> {
        self.index.get(id).and_then(|position| self.steps.get(*position))
    }

    /// Increment the usage counter of `id`. Unknown identities are ignored.
    ///
    /// Returns whether a step was found.
    pub fn record_usage(&self, id: &str) -> bool {
        let Some(step) = self.get(id) else {
            return false;
        };
        step.record_usage();
        true
    }

    /// Zero every usage counter.
    pub fn reset_usage(&self) {
        for step in &self.steps {
            step.set_usage(0);
        }
    }

    /// Copy usage counters from `previous` for identities present in both.
    pub fn inherit_usage(&self, previous: &Self) {
        for step in &self.steps {
            if let Some(old) = previous.get(step.id()) {
                step.set_usage(old.usage());
            }
        }
    }

    /// Steps in registration order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Number of registered steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the registry holds no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
