//! Outbound actions: shape the disclosure payload for a relying party.

use idb_model::{Attribute, IdentityParam, ProfileAction, Provenance};
use regex::Regex;

use crate::actions::ActionError;
use crate::context::RuleContext;
use crate::error::{EngineResult, TranslationError};
use crate::expression::ExpressionEvaluator;
use crate::output::{DynamicAttribute, TranslationInput, TranslationResult};

/// An executable outbound action, bound from a stored [`ProfileAction`].
#[derive(Debug, Clone)]
pub enum OutputTranslationAction {
    /// Adds a dynamic identity to the disclosure payload.
    CreateIdentity {
        /// Identity type to disclose.
        identity_type: String,

        /// Value expression.
        expression: String,
    },

    /// Adds an identity to the payload and requests it be persisted so
    /// the same value is disclosed on future logins.
    CreatePersistentIdentity {
        /// Identity type to disclose and persist.
        identity_type: String,

        /// Value expression.
        expression: String,
    },

    /// Adds a dynamic attribute to the disclosure payload.
    CreateAttribute {
        /// Attribute name to disclose.
        name: String,

        /// Value expression.
        expression: String,

        /// Whether the relying party treats the attribute as mandatory.
        mandatory: bool,
    },

    /// Adds an attribute to the payload and requests it be persisted.
    CreatePersistentAttribute {
        /// Attribute name to disclose and persist.
        name: String,

        /// Value expression.
        expression: String,
    },

    /// Removes matching attributes from the disclosure payload.
    FilterAttribute {
        /// Anchored name pattern.
        pattern: Regex,
    },

    /// Sets the post-authentication redirect URL.
    Redirect {
        /// URL expression.
        expression: String,
    },

    /// Includes another outbound profile in place of this rule.
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

impl OutputTranslationAction {
    /// Invokes the action, updating the translation result.
    ///
    /// [`OutputTranslationAction::IncludeProfile`] is a no-op here; the
    /// profile runtime expands inclusions itself.
    pub fn invoke(
        &self,
        _input: &TranslationInput,
        ctx: &RuleContext,
        evaluator: &dyn ExpressionEvaluator,
        profile: &str,
        out: &mut TranslationResult,
    ) -> Result<(), ActionError> {
        let provenance = Provenance {
            remote_idp: None,
            translation_profile: Some(profile.to_string()),
        };
        match self {
            Self::CreateIdentity {
                identity_type,
                expression,
            } => {
                let value = required_value(evaluator, expression, ctx, identity_type)?;
                tracing::debug!(%identity_type, %value, "disclosing identity");
                out.add_identity(
                    IdentityParam::new(identity_type.clone(), value).with_provenance(provenance),
                );
                Ok(())
            }
            Self::CreatePersistentIdentity {
                identity_type,
                expression,
            } => {
                let value = required_value(evaluator, expression, ctx, identity_type)?;
                tracing::debug!(%identity_type, %value, "disclosing persistent identity");
                let identity = IdentityParam::new(identity_type.clone(), value)
                    .with_provenance(provenance);
                out.add_identity(identity.clone());
                out.add_identity_to_persist(identity);
                Ok(())
            }
            Self::CreateAttribute {
                name,
                expression,
                mandatory,
            } => {
                let values = evaluator.evaluate(expression, ctx)?.into_values();
                tracing::debug!(%name, ?values, "disclosing attribute");
                out.add_attribute(DynamicAttribute {
                    attribute: Attribute::new(name.clone(), idb_model::group::ROOT_GROUP, values)
                        .with_provenance(provenance),
                    mandatory: *mandatory,
                });
                Ok(())
            }
            Self::CreatePersistentAttribute { name, expression } => {
                let values = evaluator.evaluate(expression, ctx)?.into_values();
                tracing::debug!(%name, ?values, "disclosing persistent attribute");
                let attribute = Attribute::new(name.clone(), idb_model::group::ROOT_GROUP, values)
                    .with_provenance(provenance);
                out.add_attribute(DynamicAttribute::new(attribute.clone()));
                out.add_attribute_to_persist(attribute);
                Ok(())
            }
            Self::FilterAttribute { pattern } => {
                out.filter_attributes(pattern);
                Ok(())
            }
            Self::Redirect { expression } => {
                let url = required_value(evaluator, expression, ctx, "redirect")?;
                out.set_redirect(url);
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

fn required_value(
    evaluator: &dyn ExpressionEvaluator,
    expression: &str,
    ctx: &RuleContext,
    what: &str,
) -> Result<String, ActionError> {
    evaluator
        .evaluate(expression, ctx)?
        .first()
        .map(str::to_string)
        .ok_or_else(|| ActionError::MissingData(format!("no value for '{what}'")))
}

/// Binds stored outbound actions to executable instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputActionRegistry;

impl OutputActionRegistry {
    /// Creates the registry with all built-in outbound actions.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Names of the supported outbound actions.
    #[must_use]
    pub const fn action_names(&self) -> &'static [&'static str] {
        &[
            "createIdentity",
            "createPersistentIdentity",
            "createAttribute",
            "createPersistentAttribute",
            "filterAttribute",
            "redirect",
            "includeOutputProfile",
        ]
    }

    /// Binds a stored action, failing on unknown names or bad parameters.
    pub fn resolve(&self, action: &ProfileAction) -> EngineResult<OutputTranslationAction> {
        match action.name.as_str() {
            "createIdentity" => {
                let [identity_type, expression] = expect_params(action)?;
                Ok(OutputTranslationAction::CreateIdentity {
                    identity_type,
                    expression,
                })
            }
            "createPersistentIdentity" => {
                let [identity_type, expression] = expect_params(action)?;
                Ok(OutputTranslationAction::CreatePersistentIdentity {
                    identity_type,
                    expression,
                })
            }
            "createAttribute" => {
                let (name, expression, mandatory) = match action.parameters.as_slice() {
                    [name, expression] => (name.clone(), expression.clone(), false),
                    [name, expression, mandatory] => (
                        name.clone(),
                        expression.clone(),
                        mandatory.parse::<bool>().map_err(|_| {
                            TranslationError::config(format!(
                                "createAttribute mandatory flag '{mandatory}' is not a boolean"
                            ))
                        })?,
                    ),
                    other => {
                        return Err(TranslationError::config(format!(
                            "createAttribute takes 2 or 3 parameters, got {}",
                            other.len()
                        )))
                    }
                };
                Ok(OutputTranslationAction::CreateAttribute {
                    name,
                    expression,
                    mandatory,
                })
            }
            "createPersistentAttribute" => {
                let [name, expression] = expect_params(action)?;
                Ok(OutputTranslationAction::CreatePersistentAttribute { name, expression })
            }
            "filterAttribute" => {
                let [raw] = expect_params(action)?;
                let pattern = Regex::new(&format!("^(?:{raw})$")).map_err(|err| {
                    TranslationError::config(format!(
                        "filterAttribute pattern '{raw}' is invalid: {err}"
                    ))
                })?;
                Ok(OutputTranslationAction::FilterAttribute { pattern })
            }
            "redirect" => {
                let [expression] = expect_params(action)?;
                Ok(OutputTranslationAction::Redirect { expression })
            }
            "includeOutputProfile" => {
                let [profile] = expect_params(action)?;
                Ok(OutputTranslationAction::IncludeProfile { profile })
            }
            other => Err(TranslationError::config(format!(
                "unknown output action '{other}'"
            ))),
        }
    }

    /// Binds a stored action, degrading to a logged no-op on failure.
    #[must_use]
    pub fn resolve_or_stopper(&self, action: &ProfileAction) -> OutputTranslationAction {
        match self.resolve(action) {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::warn!(
                    action = %action.name,
                    error = %err,
                    "cannot bind action, substituting a no-op"
                );
                OutputTranslationAction::BlindStopper {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::SimpleEvaluator;
    use uuid::Uuid;

    fn registry() -> OutputActionRegistry {
        OutputActionRegistry::new()
    }

    fn input() -> TranslationInput {
        TranslationInput::new(Uuid::now_v7(), "sp1", "SAML")
            .with_identity(IdentityParam::new("userName", "jdoe"))
            .with_attribute(Attribute::single("email", "/", "jdoe@example.com"))
    }

    #[test]
    fn create_attribute_adds_to_disclosure_only() {
        let action = registry()
            .resolve(&ProfileAction::new("createAttribute", ["mail", "attr['email']"]))
            .unwrap();

        let input = input();
        let mut out = TranslationResult::initiate(&input);
        action
            .invoke(&input, &input.to_context(), &SimpleEvaluator::new(), "out1", &mut out)
            .unwrap();

        let mapped = out.attribute("mail").unwrap();
        assert_eq!(mapped.attribute.first_value(), Some("jdoe@example.com"));
        assert!(!mapped.mandatory);
        assert!(out.attributes_to_persist().is_empty());
    }

    #[test]
    fn persistent_attribute_lands_in_both_lists() {
        let action = registry()
            .resolve(&ProfileAction::new(
                "createPersistentAttribute",
                ["mail", "attr['email']"],
            ))
            .unwrap();

        let input = input();
        let mut out = TranslationResult::initiate(&input);
        action
            .invoke(&input, &input.to_context(), &SimpleEvaluator::new(), "out1", &mut out)
            .unwrap();

        assert!(out.attribute("mail").is_some());
        assert_eq!(out.attributes_to_persist().len(), 1);
        assert_eq!(
            out.attributes_to_persist()[0].provenance.translation_profile.as_deref(),
            Some("out1")
        );
    }

    #[test]
    fn filter_pattern_is_anchored() {
        let action = registry()
            .resolve(&ProfileAction::new("filterAttribute", ["email"]))
            .unwrap();

        let input = input().with_attribute(Attribute::single("email2", "/", "x"));
        let mut out = TranslationResult::initiate(&input);
        action
            .invoke(&input, &input.to_context(), &SimpleEvaluator::new(), "out1", &mut out)
            .unwrap();

        assert!(out.attribute("email").is_none());
        assert!(out.attribute("email2").is_some());
    }

    #[test]
    fn invalid_filter_pattern_is_a_configuration_error() {
        let err = registry()
            .resolve(&ProfileAction::new("filterAttribute", ["("]))
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn redirect_overwrites_earlier_redirect() {
        let input = input();
        let mut out = TranslationResult::initiate(&input);
        for url in ["'https://a.example.com'", "'https://b.example.com'"] {
            registry()
                .resolve(&ProfileAction::new("redirect", [url]))
                .unwrap()
                .invoke(&input, &input.to_context(), &SimpleEvaluator::new(), "out1", &mut out)
                .unwrap();
        }
        assert_eq!(out.redirect_url(), Some("https://b.example.com"));
    }
}
