// src/recipe/handler.rs

//! Data step execution
//!
//! The data step handler claims steps named `Data` (case-insensitive),
//! declares every unit in an import session, and imports them in dependency
//! order, batch by batch. Each batch runs in its own transaction scope:
//! finished batches are committed at the next boundary and stay committed,
//! while a failure rolls back only the scope in flight before the error
//! propagates to the recipe runner.

use crate::content::ContentStore;
use crate::error::Result;
use crate::identity::ContentIdentity;
use crate::recipe::{ImportSession, ImportUnit, RecipeHandler, StepContext};
use crate::transaction::TransactionManager;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Step name claimed by the data handler, matched case-insensitively.
pub const DATA_STEP_NAME: &str = "Data";

/// Imports a data step's units through a content store inside explicit
/// transaction scopes.
pub struct DataStepHandler<S, T> {
    store: S,
    transactions: T,
    batch_size_override: Option<usize>,
}

impl<S: ContentStore, T: TransactionManager> DataStepHandler<S, T> {
    pub fn new(store: S, transactions: T) -> Self {
        DataStepHandler {
            store,
            transactions,
            batch_size_override: None,
        }
    }

    /// Use `batch_size` for every step, regardless of what the step
    /// declares. A zero is ignored.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size_override = Some(batch_size);
        self
    }

    fn run_batches(
        &mut self,
        session: &mut ImportSession,
        units: &HashMap<&ContentIdentity, &ImportUnit>,
        total: usize,
        batch_size: usize,
    ) -> Result<()> {
        self.transactions.require_new()?;
        let mut offset = 0;
        while offset < total {
            if offset > 0 {
                self.store.clear();
                self.transactions.require_new()?;
            }
            session.initialize_batch(offset, batch_size)?;
            while let Some(identity) = session.next_in_batch() {
                match units.get(&identity) {
                    Some(unit) => self.store.import(unit, session)?,
                    None => warn!("Batch produced identity {} with no unit definition", identity),
                }
            }
            offset += batch_size;
        }
        Ok(())
    }
}

impl<S, T> RecipeHandler for DataStepHandler<S, T>
where
    S: ContentStore,
    T: TransactionManager,
{
    fn execute(&mut self, context: &mut StepContext<'_>) -> Result<()> {
        if !context.step.name().eq_ignore_ascii_case(DATA_STEP_NAME) {
            return Ok(());
        }

        let units = context.step.units();
        let mut session = ImportSession::new();
        for unit in &units {
            session.declare(unit.identity().clone(), unit.type_name());
        }
        for unit in &units {
            for requirement in unit.requires() {
                session.add_dependency(unit.identity(), requirement.clone());
            }
        }

        let total = session.declared_count();
        let batch_size = self
            .batch_size_override
            .filter(|&n| n > 0)
            .or_else(|| context.step.batch_size())
            .unwrap_or_else(|| total.max(1));
        debug!("Data step: {} unit(s), batch size {}", total, batch_size);

        let by_identity: HashMap<&ContentIdentity, &ImportUnit> =
            units.iter().map(|unit| (unit.identity(), unit)).collect();

        if let Err(err) = self.run_batches(&mut session, &by_identity, total, batch_size) {
            if let Err(rollback_err) = self.transactions.cancel() {
                warn!("Rollback after failed batch also failed: {}", rollback_err);
            }
            return Err(err);
        }
        self.transactions.complete()?;

        context.executed = true;
        info!("Data step executed: {} unit(s)", total);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::recipe::Recipe;
    use std::cell::RefCell;
    use std::fmt::Write;
    use std::rc::Rc;

    #[derive(Default)]
    struct StoreState {
        imported: Vec<String>,
        clears: usize,
        calls: usize,
        fail_on_call: Option<usize>,
    }

    struct RecordingStore {
        state: Rc<RefCell<StoreState>>,
    }

    impl ContentStore for RecordingStore {
        fn import(&mut self, unit: &ImportUnit, _session: &ImportSession) -> Result<()> {
            let mut state = self.state.borrow_mut();
            state.calls += 1;
            if state.fail_on_call == Some(state.calls) {
                return Err(Error::ImportError(format!("refused {}", unit.identity())));
            }
            state.imported.push(unit.identity().to_string());
            Ok(())
        }

        fn clear(&mut self) {
            self.state.borrow_mut().clears += 1;
        }
    }

    #[derive(Default)]
    struct TxnState {
        opened: usize,
        committed: usize,
        cancelled: usize,
        completed: usize,
        active: bool,
    }

    struct RecordingTransactions {
        state: Rc<RefCell<TxnState>>,
    }

    impl TransactionManager for RecordingTransactions {
        fn require_new(&mut self) -> Result<()> {
            let mut state = self.state.borrow_mut();
            if state.active {
                state.committed += 1;
            }
            state.opened += 1;
            state.active = true;
            Ok(())
        }

        fn cancel(&mut self) -> Result<()> {
            let mut state = self.state.borrow_mut();
            if state.active {
                state.cancelled += 1;
                state.active = false;
            }
            Ok(())
        }

        fn complete(&mut self) -> Result<()> {
            let mut state = self.state.borrow_mut();
            if state.active {
                state.completed += 1;
                state.active = false;
            }
            Ok(())
        }
    }

    type TestHandler = DataStepHandler<RecordingStore, RecordingTransactions>;

    fn fixtures() -> (Rc<RefCell<StoreState>>, Rc<RefCell<TxnState>>, TestHandler) {
        let store_state = Rc::new(RefCell::new(StoreState::default()));
        let txn_state = Rc::new(RefCell::new(TxnState::default()));
        let handler = DataStepHandler::new(
            RecordingStore {
                state: Rc::clone(&store_state),
            },
            RecordingTransactions {
                state: Rc::clone(&txn_state),
            },
        );
        (store_state, txn_state, handler)
    }

    fn run_first_step(handler: &mut TestHandler, xml: &str) -> (bool, Result<()>) {
        let recipe = Recipe::parse(xml).unwrap();
        let mut context = StepContext {
            step: &recipe.steps()[0],
            executed: false,
        };
        let result = handler.execute(&mut context);
        (context.executed, result)
    }

    fn pages(count: usize) -> String {
        let mut out = String::new();
        for i in 1..=count {
            write!(out, r#"<Page Id="u{i}"/>"#).unwrap();
        }
        out
    }

    #[test]
    fn non_data_step_is_ignored() {
        let (store, txn, mut handler) = fixtures();
        let (executed, result) = run_first_step(
            &mut handler,
            r#"<Recipe><Settings Theme="plain"/></Recipe>"#,
        );
        assert!(result.is_ok());
        assert!(!executed);
        assert_eq!(txn.borrow().opened, 0);
        assert!(store.borrow().imported.is_empty());
    }

    #[test]
    fn step_name_matches_case_insensitively() {
        for name in ["Data", "data", "DATA"] {
            let (_, _, mut handler) = fixtures();
            let xml = format!(r#"<Recipe><{name}><Page Id="a"/></{name}></Recipe>"#);
            let (executed, result) = run_first_step(&mut handler, &xml);
            assert!(result.is_ok());
            assert!(executed, "step named {name} should be handled");
        }

        let (_, txn, mut handler) = fixtures();
        let (executed, result) =
            run_first_step(&mut handler, r#"<Recipe><DataOther/></Recipe>"#);
        assert!(result.is_ok());
        assert!(!executed);
        assert_eq!(txn.borrow().opened, 0);
    }

    #[test]
    fn empty_data_step_still_runs_one_transaction() {
        let (store, txn, mut handler) = fixtures();
        let (executed, result) = run_first_step(&mut handler, "<Recipe><Data/></Recipe>");
        assert!(result.is_ok());
        assert!(executed);
        let txn = txn.borrow();
        assert_eq!(txn.opened, 1);
        assert_eq!(txn.completed, 1);
        assert_eq!(txn.cancelled, 0);
        assert!(store.borrow().imported.is_empty());
    }

    #[test]
    fn transactions_opened_is_units_over_batch_size() {
        let (store, txn, mut handler) = fixtures();
        let xml = format!(r#"<Recipe><Data BatchSize="4">{}</Data></Recipe>"#, pages(10));
        let (executed, result) = run_first_step(&mut handler, &xml);
        assert!(result.is_ok());
        assert!(executed);
        assert_eq!(store.borrow().imported.len(), 10);
        let txn = txn.borrow();
        assert_eq!(txn.opened, 3);
        assert_eq!(txn.completed, 1);
    }

    #[test]
    fn unbatched_step_runs_in_one_scope() {
        let (store, txn, mut handler) = fixtures();
        let xml = format!("<Recipe><Data>{}</Data></Recipe>", pages(10));
        let (_, result) = run_first_step(&mut handler, &xml);
        assert!(result.is_ok());
        assert_eq!(store.borrow().imported.len(), 10);
        assert_eq!(txn.borrow().opened, 1);
        assert_eq!(store.borrow().clears, 0);
    }

    #[test]
    fn requirements_import_before_dependents_across_batches() {
        let (store, txn, mut handler) = fixtures();
        let xml = r#"
            <Recipe>
              <Data BatchSize="2">
                <Page Id="a"/>
                <Page Id="b" Requires="d"/>
                <Page Id="c"/>
                <Page Id="d"/>
              </Data>
            </Recipe>
        "#;
        let (_, result) = run_first_step(&mut handler, xml);
        assert!(result.is_ok());

        let imported = store.borrow().imported.clone();
        let position = |name: &str| imported.iter().position(|x| x == name).unwrap();
        assert!(position("d") < position("b"));
        assert_eq!(imported.len(), 4);
        assert_eq!(txn.borrow().opened, 2);
    }

    #[test]
    fn malformed_units_are_skipped_silently() {
        let (store, _, mut handler) = fixtures();
        let xml = r#"
            <Recipe>
              <Data>
                <Page Id="good-1"/>
                <Page/>
                <Page Id=""/>
                <Page Id="good-2"/>
              </Data>
            </Recipe>
        "#;
        let (executed, result) = run_first_step(&mut handler, xml);
        assert!(result.is_ok());
        assert!(executed);
        assert_eq!(
            store.borrow().imported,
            vec!["good-1".to_string(), "good-2".to_string()]
        );
    }

    #[test]
    fn failure_rolls_back_current_scope_and_propagates() {
        let (store, txn, mut handler) = fixtures();
        store.borrow_mut().fail_on_call = Some(6);

        let xml = format!(r#"<Recipe><Data BatchSize="4">{}</Data></Recipe>"#, pages(10));
        let (executed, result) = run_first_step(&mut handler, &xml);

        assert!(matches!(result, Err(Error::ImportError(_))));
        assert!(!executed);

        let store = store.borrow();
        // Batch one finished, batch two stopped at its second unit
        assert_eq!(store.imported.len(), 5);

        let txn = txn.borrow();
        assert_eq!(txn.opened, 2);
        assert_eq!(txn.committed, 1);
        assert_eq!(txn.cancelled, 1);
        assert_eq!(txn.completed, 0);
    }

    #[test]
    fn dependency_cycle_aborts_before_importing() {
        let (store, txn, mut handler) = fixtures();
        let xml = r#"
            <Recipe>
              <Data>
                <Page Id="a" Requires="b"/>
                <Page Id="b" Requires="a"/>
              </Data>
            </Recipe>
        "#;
        let (executed, result) = run_first_step(&mut handler, xml);

        assert!(matches!(result, Err(Error::DependencyCycle(_))));
        assert!(!executed);
        assert!(store.borrow().imported.is_empty());
        let txn = txn.borrow();
        assert_eq!(txn.cancelled, 1);
        assert_eq!(txn.completed, 0);
    }

    #[test]
    fn cache_clears_at_every_batch_boundary() {
        let (store, _, mut handler) = fixtures();
        let xml = format!(r#"<Recipe><Data BatchSize="4">{}</Data></Recipe>"#, pages(10));
        let (_, result) = run_first_step(&mut handler, &xml);
        assert!(result.is_ok());
        // Three batches, two boundaries
        assert_eq!(store.borrow().clears, 2);
    }

    #[test]
    fn batch_size_override_beats_step_attribute() {
        let (_, txn, handler) = fixtures();
        let mut handler = handler.with_batch_size(5);
        let xml = format!(r#"<Recipe><Data BatchSize="2">{}</Data></Recipe>"#, pages(10));
        let (_, result) = run_first_step(&mut handler, &xml);
        assert!(result.is_ok());
        assert_eq!(txn.borrow().opened, 2);
    }

    #[test]
    fn duplicate_identities_import_once() {
        let (store, _, mut handler) = fixtures();
        let xml = r#"
            <Recipe>
              <Data>
                <Page Id="a"/>
                <Page Id="a"/>
              </Data>
            </Recipe>
        "#;
        let (_, result) = run_first_step(&mut handler, xml);
        assert!(result.is_ok());
        assert_eq!(store.borrow().imported, vec!["a".to_string()]);
    }
}
