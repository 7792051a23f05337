//! Inbound actions: map remote data into the local identity model.

use chrono::{Duration, Utc};
use idb_model::{
    Attribute, EntityScheduledChange, IdentityParam, ProfileAction, Provenance, ScheduledOperation,
};

use crate::actions::ActionError;
use crate::context::RuleContext;
use crate::effect::{AttributeEffectMode, GroupEffectMode, IdentityEffectMode};
use crate::error::{EngineResult, TranslationError};
use crate::expression::ExpressionEvaluator;
use crate::input::RemotelyAuthenticatedInput;
use crate::result::{
    MappedAttribute, MappedEntityChange, MappedGroup, MappedIdentity, MappingResult,
};

/// An executable inbound action, bound from a stored [`ProfileAction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputTranslationAction {
    /// Maps an identity of the given type from an expression.
    MapIdentity {
        /// Local identity type to produce.
        identity_type: String,

        /// Value expression.
        expression: String,

        /// Merge policy.
        mode: IdentityEffectMode,
    },

    /// Maps an attribute in a group from an expression.
    MapAttribute {
        /// Local attribute name to produce.
        name: String,

        /// Group path the attribute lives in.
        group: String,

        /// Value expression.
        expression: String,

        /// Merge policy.
        mode: AttributeEffectMode,
    },

    /// Maps one or more group memberships from an expression.
    MapGroup {
        /// Group path expression; may yield several paths.
        expression: String,

        /// Merge policy.
        mode: GroupEffectMode,
    },

    /// Schedules an entity-level operation.
    EntityChange {
        /// The operation to schedule.
        operation: ScheduledOperation,

        /// Days until the operation triggers; the default grace period
        /// applies when absent.
        grace_days: Option<i64>,
    },

    /// Requests removal of stale data from previous runs of the same
    /// remote source.
    RemoveStaleData,

    /// Includes another inbound profile in place of this rule.
    IncludeProfile {
        /// Name of the included profile.
        profile: String,
    },

    /// Placeholder for an action that could not be bound; logs and does
    /// nothing when invoked.
    BlindStopper {
        /// The action as stored.
        original: ProfileAction,
    },
}

impl InputTranslationAction {
    /// Invokes the action, appending its effects to the mapping result.
    ///
    /// [`InputTranslationAction::IncludeProfile`] is a no-op here; the
    /// profile runtime expands inclusions itself.
    pub fn invoke(
        &self,
        input: &RemotelyAuthenticatedInput,
        ctx: &RuleContext,
        evaluator: &dyn ExpressionEvaluator,
        profile: &str,
        out: &mut MappingResult,
    ) -> Result<(), ActionError> {
        let provenance = Provenance::remote(&input.idp_name, profile);
        match self {
            Self::MapIdentity {
                identity_type,
                expression,
                mode,
            } => {
                let values = evaluator.evaluate(expression, ctx)?.into_values();
                if values.is_empty() {
                    return Err(ActionError::MissingData(format!(
                        "no value for identity type '{identity_type}'"
                    )));
                }
                for value in values {
                    tracing::debug!(%identity_type, %value, "mapped identity");
                    out.add_identity(MappedIdentity::new(
                        IdentityParam::new(identity_type.clone(), value)
                            .with_provenance(provenance.clone()),
                        *mode,
                    ));
                }
                Ok(())
            }
            Self::MapAttribute {
                name,
                group,
                expression,
                mode,
            } => {
                let values = evaluator.evaluate(expression, ctx)?.into_values();
                tracing::debug!(%name, %group, ?values, "mapped attribute");
                out.add_attribute(MappedAttribute::new(
                    Attribute::new(name.clone(), group.clone(), values)
                        .with_provenance(provenance),
                    *mode,
                ));
                Ok(())
            }
            Self::MapGroup { expression, mode } => {
                for group in evaluator.evaluate(expression, ctx)?.into_values() {
                    if !idb_model::group::is_valid_path(&group) {
                        return Err(ActionError::InvalidParameter(format!(
                            "invalid group path '{group}'"
                        )));
                    }
                    tracing::debug!(%group, "mapped group membership");
                    out.add_group(MappedGroup::new(group, *mode, provenance.clone()));
                }
                Ok(())
            }
            Self::EntityChange {
                operation,
                grace_days,
            } => {
                let change = match grace_days {
                    Some(days) => {
                        EntityScheduledChange::new(*operation, Utc::now() + Duration::days(*days))
                    }
                    None => EntityScheduledChange::with_default_grace(*operation),
                };
                tracing::debug!(?operation, when = %change.when, "scheduled entity change");
                out.add_entity_change(MappedEntityChange::new(change, provenance));
                Ok(())
            }
            Self::RemoveStaleData => {
                out.request_clean_stale();
                Ok(())
            }
            Self::IncludeProfile { .. } => Ok(()),
            Self::BlindStopper { original } => {
                tracing::warn!(
                    action = %original.name,
                    "unresolvable action invoked, doing nothing"
                );
                Ok(())
            }
        }
    }
}

/// Binds stored inbound actions to executable instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputActionRegistry;

impl InputActionRegistry {
    /// Creates the registry with all built-in inbound actions.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Names of the supported inbound actions.
    #[must_use]
    pub const fn action_names(&self) -> &'static [&'static str] {
        &[
            "mapIdentity",
            "mapAttribute",
            "mapGroup",
            "entityChange",
            "removeStaleData",
            "includeInputProfile",
        ]
    }

    /// Binds a stored action, failing on unknown names or bad parameters.
    pub fn resolve(&self, action: &ProfileAction) -> EngineResult<InputTranslationAction> {
        match action.name.as_str() {
            "mapIdentity" => {
                let [identity_type, expression, mode] = expect_params(action)?;
                Ok(InputTranslationAction::MapIdentity {
                    identity_type,
                    expression,
                    mode: IdentityEffectMode::parse(&mode).ok_or_else(|| {
                        TranslationError::config(format!("unknown identity effect mode '{mode}'"))
                    })?,
                })
            }
            "mapAttribute" => {
                let [name, group, expression, mode] = expect_params(action)?;
                if !idb_model::group::is_valid_path(&group) {
                    return Err(TranslationError::config(format!(
                        "invalid group path '{group}' in mapAttribute"
                    )));
                }
                Ok(InputTranslationAction::MapAttribute {
                    name,
                    group,
                    expression,
                    mode: AttributeEffectMode::parse(&mode).ok_or_else(|| {
                        TranslationError::config(format!("unknown attribute effect mode '{mode}'"))
                    })?,
                })
            }
            "mapGroup" => {
                let (expression, mode) = match action.parameters.as_slice() {
                    [expression] => (expression.clone(), GroupEffectMode::CreateGroupIfMissing),
                    [expression, mode] => (
                        expression.clone(),
                        GroupEffectMode::parse(mode).ok_or_else(|| {
                            TranslationError::config(format!("unknown group effect mode '{mode}'"))
                        })?,
                    ),
                    other => {
                        return Err(TranslationError::config(format!(
                            "mapGroup takes 1 or 2 parameters, got {}",
                            other.len()
                        )))
                    }
                };
                Ok(InputTranslationAction::MapGroup { expression, mode })
            }
            "entityChange" => {
                let (operation, grace_days) = match action.parameters.as_slice() {
                    [operation] => (operation.clone(), None),
                    [operation, days] => (
                        operation.clone(),
                        Some(days.parse::<i64>().map_err(|_| {
                            TranslationError::config(format!(
                                "entityChange grace days '{days}' is not a number"
                            ))
                        })?),
                    ),
                    other => {
                        return Err(TranslationError::config(format!(
                            "entityChange takes 1 or 2 parameters, got {}",
                            other.len()
                        )))
                    }
                };
                Ok(InputTranslationAction::EntityChange {
                    operation: ScheduledOperation::parse(&operation).ok_or_else(|| {
                        TranslationError::config(format!(
                            "unknown scheduled operation '{operation}'"
                        ))
                    })?,
                    grace_days,
                })
            }
            "removeStaleData" => Ok(InputTranslationAction::RemoveStaleData),
            "includeInputProfile" => {
                let [profile] = expect_params(action)?;
                Ok(InputTranslationAction::IncludeProfile { profile })
            }
            other => Err(TranslationError::config(format!(
                "unknown input action '{other}'"
            ))),
        }
    }

    /// Binds a stored action, degrading to a logged no-op on failure.
    #[must_use]
    pub fn resolve_or_stopper(&self, action: &ProfileAction) -> InputTranslationAction {
        match self.resolve(action) {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::warn!(
                    action = %action.name,
                    error = %err,
                    "cannot bind action, substituting a no-op"
                );
                InputTranslationAction::BlindStopper {
                    original: action.clone(),
                }
            }
        }
    }
}

fn expect_params<const N: usize>(action: &ProfileAction) -> EngineResult<[String; N]> {
    <[String; N]>::try_from(action.parameters.clone()).map_err(|_| {
        TranslationError::config(format!(
            "{} takes {N} parameters, got {}",
            action.name,
            action.parameters.len()
        ))
    })
}
