// src/recipe/mod.rs

//! Recipe parsing and execution
//!
//! A recipe is an XML document whose top-level elements are steps. The
//! `Data` step carries content units to import; its handler declares every
//! unit up front, orders them by their dependencies, and walks the result
//! in transactional batches.
//!
//! # Example Recipe
//!
//! ```xml
//! <Recipe>
//!   <Data BatchSize="50">
//!     <Page Id="about" TitlePart.Title="About us"/>
//!     <Menu Id="main" MenuPart.Links="ref:about"/>
//!   </Data>
//! </Recipe>
//! ```

mod handler;
mod runner;
mod session;
mod step;

pub use handler::{DATA_STEP_NAME, DataStepHandler};
pub use runner::{
    RecipeHandler, RecipeRunner, RunJournal, RunReport, SilentJournal, StepContext, StepOutcome,
    StepStatus,
};
pub use session::ImportSession;
pub use step::{BATCH_SIZE_ATTRIBUTE, ID_ATTRIBUTE, ImportUnit, Recipe, RecipeStep};
