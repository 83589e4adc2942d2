use crate::budget::{Budget, Schedule};
use crate::error::Result;
use crate::{CallbackAction, Intermediate, OptimizationReport, RecordedSolution, RunOptions, Solution};

/// Evaluation counting, checkpoint snapshots, progress logging and the
/// callback for one `optimize()` call.
pub(crate) struct RunState<'a> {
    name: &'static str,
    schedule: Schedule,
    per_iteration: usize,
    options: &'a mut RunOptions,
    recorded: Vec<RecordedSolution>,
    nfev: usize,
    nit: usize,
    stopped_early: bool,
}

impl<'a> RunState<'a> {
    pub(crate) fn new(
        name: &'static str,
        budget: &Budget,
        initial: usize,
        per_iteration: usize,
        options: &'a mut RunOptions,
    ) -> Result<Self> {
        let schedule = Schedule::new(budget, initial, per_iteration)?;
        options.parallel.install();
        log::info!(
            "{name}: {} iterations, {} initial + {} evaluations per iteration",
            schedule.iterations,
            initial,
            per_iteration
        );
        Ok(Self {
            name,
            schedule,
            per_iteration,
            options,
            recorded: Vec::new(),
            nfev: initial,
            nit: 0,
            stopped_early: false,
        })
    }

    pub(crate) fn iterations(&self) -> usize {
        self.schedule.iterations
    }

    pub(crate) fn options(&self) -> &RunOptions {
        &*self.options
    }

    /// Search progress before iteration `iteration` (0-based) starts.
    pub(crate) fn progress(&self, iteration: usize) -> f64 {
        self.schedule.progress(iteration)
    }

    /// Records checkpoints reached by the initial evaluations.
    pub(crate) fn initialized(&mut self, best: &Solution) {
        self.snapshot(best);
    }

    /// Bookkeeping after an iteration. Returns `false` when the callback
    /// asked to stop.
    pub(crate) fn iteration_done(&mut self, best: &Solution) -> bool {
        self.nit += 1;
        self.nfev += self.per_iteration;
        self.snapshot(best);

        let interval = self.options.print_interval;
        if interval > 0 && self.nit % interval == 0 {
            log::debug!(
                "{}: iter {:5}  nfev {:7}  best {:.6e}",
                self.name,
                self.nit,
                self.nfev,
                best.cost
            );
        }

        if let Some(cb) = self.options.callback.as_mut() {
            let intermediate = Intermediate {
                x: best.variables.clone(),
                fun: best.cost,
                iter: self.nit,
                nfev: self.nfev,
            };
            if let CallbackAction::Stop = cb(&intermediate) {
                log::info!("{}: stopped by callback at iteration {}", self.name, self.nit);
                self.stopped_early = true;
                return false;
            }
        }
        true
    }

    fn snapshot(&mut self, best: &Solution) {
        let nit = self.nit;
        for checkpoint in self.schedule.due(nit) {
            self.recorded.push(RecordedSolution {
                evaluations: checkpoint.evaluations,
                iteration: nit,
                solution: best.clone(),
            });
        }
    }

    pub(crate) fn finish(self, best: Solution) -> OptimizationReport {
        let message = if self.stopped_early {
            "Stopped by callback".to_string()
        } else {
            "Budget exhausted".to_string()
        };
        log::info!(
            "{}: best cost {:.6e} after {} iterations ({} evaluations)",
            self.name,
            best.cost,
            self.nit,
            self.nfev
        );
        OptimizationReport {
            best,
            recorded: self.recorded,
            nit: self.nit,
            nfev: self.nfev,
            stopped_early: self.stopped_early,
            message,
        }
    }
}
