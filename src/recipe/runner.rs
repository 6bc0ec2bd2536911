// src/recipe/runner.rs

//! Recipe execution
//!
//! The runner walks a recipe's steps in document order and offers each step
//! to every registered handler. A handler that claims a step marks the
//! context executed; a step no handler claims is recorded as skipped. The
//! first failing step aborts the run, after its outcome has been journaled,
//! so the journal always holds a complete record of what was attempted
//! under the run's id.

use crate::error::{Error, Result};
use crate::recipe::{Recipe, RecipeStep};
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

/// A participant in recipe execution.
pub trait RecipeHandler {
    /// Execute against one step. Handlers that do not claim the step
    /// return `Ok(())` without touching the context.
    fn execute(&mut self, context: &mut StepContext<'_>) -> Result<()>;
}

/// Execution state shared between the runner and handlers for one step.
pub struct StepContext<'a> {
    pub step: &'a RecipeStep,
    /// Set by a handler once it has fully executed the step.
    pub executed: bool,
}

/// How a step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Executed,
    Skipped,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Executed => "executed",
            StepStatus::Skipped => "skipped",
            StepStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Outcome of one step within a run.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub step_name: String,
    pub status: StepStatus,
    pub detail: Option<String>,
}

/// Sink for step outcomes as they happen.
pub trait RunJournal {
    /// Record one step outcome. Implementations must not fail the run.
    fn record(&mut self, run_id: &str, outcome: &StepOutcome);
}

/// Journal that records nothing.
pub struct SilentJournal;

impl RunJournal for SilentJournal {
    fn record(&mut self, _run_id: &str, _outcome: &StepOutcome) {}
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub outcomes: Vec<StepOutcome>,
}

impl RunReport {
    pub fn executed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == StepStatus::Executed)
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == StepStatus::Skipped)
            .count()
    }
}

/// Runs recipes through a set of registered handlers.
#[derive(Default)]
pub struct RecipeRunner {
    handlers: Vec<Box<dyn RecipeHandler>>,
}

impl RecipeRunner {
    pub fn new() -> Self {
        RecipeRunner {
            handlers: Vec::new(),
        }
    }

    pub fn register(&mut self, handler: Box<dyn RecipeHandler>) {
        self.handlers.push(handler);
    }

    /// Run every step without journaling.
    pub fn run(&mut self, recipe: &Recipe) -> Result<RunReport> {
        self.run_with_journal(recipe, &mut SilentJournal)
    }

    /// Run every step in document order, stopping at the first failure.
    pub fn run_with_journal(
        &mut self,
        recipe: &Recipe,
        journal: &mut dyn RunJournal,
    ) -> Result<RunReport> {
        let run_id = Uuid::new_v4().to_string();
        info!(
            "Starting recipe run {} with {} step(s)",
            run_id,
            recipe.steps().len()
        );

        let mut outcomes = Vec::new();
        for step in recipe.steps() {
            let mut context = StepContext {
                step,
                executed: false,
            };
            let mut failure: Option<Error> = None;
            for handler in &mut self.handlers {
                if let Err(err) = handler.execute(&mut context) {
                    failure = Some(err);
                    break;
                }
            }

            let outcome = match &failure {
                Some(err) => StepOutcome {
                    step_name: step.name().to_string(),
                    status: StepStatus::Failed,
                    detail: Some(err.to_string()),
                },
                None if context.executed => StepOutcome {
                    step_name: step.name().to_string(),
                    status: StepStatus::Executed,
                    detail: None,
                },
                None => {
                    debug!("No handler claimed step {}", step.name());
                    StepOutcome {
                        step_name: step.name().to_string(),
                        status: StepStatus::Skipped,
                        detail: None,
                    }
                }
            };
            journal.record(&run_id, &outcome);
            outcomes.push(outcome);

            if let Some(err) = failure {
                return Err(err);
            }
        }

        let report = RunReport { run_id, outcomes };
        info!(
            "Recipe run {} finished: {} executed, {} skipped",
            report.run_id,
            report.executed_count(),
            report.skipped_count()
        );
        Ok(report)
    }
}
