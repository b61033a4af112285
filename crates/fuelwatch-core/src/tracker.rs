//! Per-generator suspicion state machine
//!
//! Turns a stream of verdicts into edge-triggered alerts: only a
//! Normal → Suspicious transition produces a [`TransitionEvent`]. A generator
//! that stays suspicious is alerted once, and can alert again only after a
//! normal reading resets it.

use crate::models::ClassifiedObservation;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Last known verdict for a generator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuspicionState {
    #[default]
    Normal,
    Suspicious,
}

impl std::fmt::Display for SuspicionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuspicionState::Normal => write!(f, "normal"),
            SuspicionState::Suspicious => write!(f, "suspicious"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorState {
    pub state: SuspicionState,
    pub last_verdict_at: DateTime<Utc>,
}

/// A generator entering the suspicious state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionEvent {
    pub classified: ClassifiedObservation,
    /// `None` for a generator seen for the first time
    pub previous: Option<SuspicionState>,
}

impl TransitionEvent {
    pub fn generator_id(&self) -> &str {
        self.classified.generator_id()
    }
}

/// Holds the last verdict of every generator seen in this process
///
/// States are never removed. Callers must feed observations for one
/// generator in timestamp order and serialize them.
#[derive(Debug, Default)]
pub struct StateTracker {
    states: DashMap<String, GeneratorState>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a verdict and return an event on a Normal → Suspicious edge
    pub fn observe(&self, classified: &ClassifiedObservation) -> Option<TransitionEvent> {
        let next = if classified.suspicious {
            SuspicionState::Suspicious
        } else {
            SuspicionState::Normal
        };
        let at = classified.observation.timestamp;

        let previous = self
            .states
            .insert(
                classified.observation.generator_id.clone(),
                GeneratorState {
                    state: next,
                    last_verdict_at: at,
                },
            )
            .map(|prior| prior.state);

        match (previous, next) {
            (None | Some(SuspicionState::Normal), SuspicionState::Suspicious) => {
                Some(TransitionEvent {
                    classified: classified.clone(),
                    previous,
                })
            }
            _ => None,
        }
    }

    pub fn state(&self, generator_id: &str) -> Option<GeneratorState> {
        self.states.get(generator_id).map(|s| *s)
    }

    /// Generators currently in the suspicious state
    pub fn suspicious_generators(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .states
            .iter()
            .filter(|e| e.value().state == SuspicionState::Suspicious)
            .map(|e| e.key().clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
