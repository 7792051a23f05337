//! Action registries and executable action instances.
//!
//! Profiles store actions as data ([`idb_model::ProfileAction`]); the
//! registries here bind a stored action to an executable instance at
//! translate time. Binding an unknown action name yields a blind stopper:
//! a logged no-op that keeps the rest of the profile runnable.

mod input;
mod output;

pub use input::{InputActionRegistry, InputTranslationAction};
pub use output::{OutputActionRegistry, OutputTranslationAction};

use thiserror::Error;

use crate::expression::ExpressionError;

/// Errors raised while invoking a single action.
///
/// These never abort a translation run: the profile runtime logs a warning
/// and skips the failing rule.
#[derive(Debug, Error)]
pub enum ActionError {
    /// Parameter expression evaluation failed.
    #[error(transparent)]
    Expression(#[from] ExpressionError),

    /// The input lacked data the action needs.
    #[error("missing data: {0}")]
    MissingData(String),

    /// A parameter value was present but invalid for this invocation.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
