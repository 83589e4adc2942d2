//! Search budgets expressed in iterations or in cumulative cost evaluations.
//!
//! Every optimizer spends a fixed number of evaluations before its first
//! iteration (archive, swarm or starting point) and a fixed number per
//! iteration afterwards. An evaluation checkpoint is therefore reachable
//! only when `checkpoint = initial + per_iteration * i` for some `i >= 0`.

use serde::{Deserialize, Serialize};

use crate::error::{MetaheuristicError, Result};

/// How long an optimizer runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Budget {
    /// Fixed number of outer iterations; only the final best is reported.
    Iterations(usize),
    /// Cumulative evaluation counts at which the current best is recorded.
    /// The largest one sets the run length.
    Evaluations(Vec<usize>),
}

impl Default for Budget {
    fn default() -> Self {
        Budget::Iterations(1000)
    }
}

/// A checkpoint translated into the iteration after which it is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Checkpoint {
    pub evaluations: usize,
    pub iteration: usize,
}

/// Iteration plan derived from a [`Budget`].
#[derive(Debug, Clone)]
pub(crate) struct Schedule {
    pub iterations: usize,
    checkpoints: Vec<Checkpoint>,
}

impl Schedule {
    pub(crate) fn new(budget: &Budget, initial: usize, per_iteration: usize) -> Result<Self> {
        match budget {
            Budget::Iterations(n) => Ok(Self {
                iterations: *n,
                checkpoints: Vec::new(),
            }),
            Budget::Evaluations(requested) => {
                if requested.is_empty() {
                    return Err(MetaheuristicError::invalid(
                        "evaluations",
                        0.0,
                        "at least one checkpoint is required",
                    ));
                }
                let mut checkpoints = Vec::with_capacity(requested.len());
                for &evaluations in requested {
                    let iteration =
                        iterations_for(evaluations, initial, per_iteration).ok_or(
                            MetaheuristicError::Divisibility {
                                checkpoint: evaluations,
                                initial,
                                per_iteration,
                            },
                        )?;
                    checkpoints.push(Checkpoint {
                        evaluations,
                        iteration,
                    });
                }
                // stable: duplicated checkpoints keep one snapshot each
                checkpoints.sort_by_key(|c| c.evaluations);
                let iterations = checkpoints.last().map_or(0, |c| c.iteration);
                Ok(Self {
                    iterations,
                    checkpoints,
                })
            }
        }
    }

    /// Checkpoints reached once `iteration` iterations are complete.
    pub(crate) fn due(&self, iteration: usize) -> impl Iterator<Item = &Checkpoint> + '_ {
        self.checkpoints
            .iter()
            .filter(move |c| c.iteration == iteration)
    }

    /// Fraction of the run completed before iteration `iteration` starts.
    pub(crate) fn progress(&self, iteration: usize) -> f64 {
        if self.iterations == 0 {
            0.0
        } else {
            (iteration as f64 / self.iterations as f64).min(1.0)
        }
    }
}

fn iterations_for(evaluations: usize, initial: usize, per_iteration: usize) -> Option<usize> {
    let remaining = evaluations.checked_sub(initial)?;
    if per_iteration == 0 {
        return (remaining == 0).then_some(0);
    }
    (remaining % per_iteration == 0).then_some(remaining / per_iteration)
}
