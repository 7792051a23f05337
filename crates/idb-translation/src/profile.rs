//! Runtime profiles: rule evaluation order, profile inclusion and the
//! cycle guard.
//!
//! A runtime profile wraps a stored [`TranslationProfile`] with the action
//! registry, an expression evaluator and a resolver for included profiles.
//! Rules run strictly in order; an included profile's rules run in place
//! of the including rule. The visited set only guards the active inclusion
//! path, so the same profile may be included twice along different
//! branches without tripping the cycle check.

use std::collections::HashSet;
use std::sync::Arc;

use idb_model::{ProfileDirection, TranslationProfile};

use crate::actions::{InputActionRegistry, InputTranslationAction, OutputActionRegistry,
    OutputTranslationAction};
use crate::error::{EngineResult, TranslationError};
use crate::expression::ExpressionEvaluator;
use crate::input::RemotelyAuthenticatedInput;
use crate::output::{TranslationInput, TranslationResult};
use crate::result::MappingResult;

/// Resolves profile names to stored profiles, for inclusion and lookup.
pub trait ProfileResolver: Send + Sync {
    /// Gets a profile by direction and name.
    fn get_profile(&self, direction: ProfileDirection, name: &str) -> Option<TranslationProfile>;

    /// Lists all profiles of a direction.
    fn list_profiles(&self, direction: ProfileDirection) -> Vec<TranslationProfile>;
}

/// An inbound profile bound and ready to translate.
pub struct InputTranslationProfile {
    profile: TranslationProfile,
    registry: InputActionRegistry,
    resolver: Arc<dyn ProfileResolver>,
    evaluator: Arc<dyn ExpressionEvaluator>,
}

impl InputTranslationProfile {
    /// Binds an inbound profile.
    ///
    /// Fails if the profile's direction is not [`ProfileDirection::Input`].
    pub fn new(
        profile: TranslationProfile,
        resolver: Arc<dyn ProfileResolver>,
        evaluator: Arc<dyn ExpressionEvaluator>,
    ) -> EngineResult<Self> {
        if profile.direction != ProfileDirection::Input {
            return Err(TranslationError::config(format!(
                "profile '{}' is not an input profile",
                profile.name
            )));
        }
        Ok(Self {
            profile,
            registry: InputActionRegistry::new(),
            resolver,
            evaluator,
        })
    }

    /// The wrapped stored profile.
    #[must_use]
    pub const fn profile(&self) -> &TranslationProfile {
        &self.profile
    }

    /// Runs the profile over remote authentication data.
    ///
    /// Rule-level failures (condition errors, missing data) skip the
    /// single rule; unresolvable included profiles and inclusion cycles
    /// abort with a configuration-class error.
    pub fn translate(
        &self,
        input: &RemotelyAuthenticatedInput,
    ) -> EngineResult<MappingResult> {
        tracing::debug!(profile = %self.profile.name, idp = %input.idp_name, "translating input");
        let ctx = input.to_context();
        let mut out = MappingResult::new();
        let mut visited = HashSet::new();
        self.run(&self.profile, input, &ctx, &mut visited, &mut out)?;
        Ok(out)
    }

    fn run(
        &self,
        profile: &TranslationProfile,
        input: &RemotelyAuthenticatedInput,
        ctx: &crate::context::RuleContext,
        visited: &mut HashSet<String>,
        out: &mut MappingResult,
    ) -> EngineResult<()> {
        if !visited.insert(profile.name.clone()) {
            return Err(TranslationError::CyclicInclusion(profile.name.clone()));
        }
        for rule in &profile.rules {
            match self.evaluator.evaluate_condition(&rule.condition, ctx) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(
                        profile = %profile.name,
                        condition = %rule.condition,
                        "condition false, skipping rule"
                    );
                    continue;
                }
                Err(err) => {
                    tracing::warn!(
                        profile = %profile.name,
                        condition = %rule.condition,
                        error = %err,
                        "condition failed, skipping rule"
                    );
                    continue;
                }
            }
            let action = self.registry.resolve_or_stopper(&rule.action);
            if let InputTranslationAction::IncludeProfile { profile: included } = &action {
                let included_profile = self
                    .resolver
                    .get_profile(ProfileDirection::Input, included)
                    .ok_or_else(|| {
                        TranslationError::config(format!(
                            "included input profile '{included}' does not exist"
                        ))
                    })?;
                self.run(&included_profile, input, ctx, visited, out)?;
                continue;
            }
            if let Err(err) = action.invoke(input, ctx, self.evaluator.as_ref(), &profile.name, out)
            {
                tracing::warn!(
                    profile = %profile.name,
                    action = %rule.action.name,
                    error = %err,
                    "action failed, skipping rule"
                );
            }
        }
        visited.remove(&profile.name);
        Ok(())
    }
}

/// An outbound profile bound and ready to translate.
pub struct OutputTranslationProfile {
    profile: TranslationProfile,
    registry: OutputActionRegistry,
    resolver: Arc<dyn ProfileResolver>,
    evaluator: Arc<dyn ExpressionEvaluator>,
}

impl OutputTranslationProfile {
    /// Binds an outbound profile.
    ///
    /// Fails if the profile's direction is not
    /// [`ProfileDirection::Output`].
    pub fn new(
        profile: TranslationProfile,
        resolver: Arc<dyn ProfileResolver>,
        evaluator: Arc<dyn ExpressionEvaluator>,
    ) -> EngineResult<Self> {
        if profile.direction != ProfileDirection::Output {
            return Err(TranslationError::config(format!(
                "profile '{}' is not an output profile",
                profile.name
            )));
        }
        Ok(Self {
            profile,
            registry: OutputActionRegistry::new(),
            resolver,
            evaluator,
        })
    }

    /// The wrapped stored profile.
    #[must_use]
    pub const fn profile(&self) -> &TranslationProfile {
        &self.profile
    }

    /// Runs the profile over local identity data, starting from the
    /// caller's current attributes and identities.
    pub fn translate(&self, input: &TranslationInput) -> EngineResult<TranslationResult> {
        tracing::debug!(
            profile = %self.profile.name,
            requester = %input.requester,
            "translating output"
        );
        let ctx = input.to_context();
        let mut out = TranslationResult::initiate(input);
        let mut visited = HashSet::new();
        self.run(&self.profile, input, &ctx, &mut visited, &mut out)?;
        Ok(out)
    }

    fn run(
        &self,
        profile: &TranslationProfile,
        input: &TranslationInput,
        ctx: &crate::context::RuleContext,
        visited: &mut HashSet<String>,
        out: &mut TranslationResult,
    ) -> EngineResult<()> {
        if !visited.insert(profile.name.clone()) {
            return Err(TranslationError::CyclicInclusion(profile.name.clone()));
        }
        for rule in &profile.rules {
            match self.evaluator.evaluate_condition(&rule.condition, ctx) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    tracing::warn!(
                        profile = %profile.name,
                        condition = %rule.condition,
                        error = %err,
                        "condition failed, skipping rule"
                    );
                    continue;
                }
            }
            let action = self.registry.resolve_or_stopper(&rule.action);
            if let OutputTranslationAction::IncludeProfile { profile: included } = &action {
                let included_profile = self
                    .resolver
                    .get_profile(ProfileDirection::Output, included)
                    .ok_or_else(|| {
                        TranslationError::config(format!(
                            "included output profile '{included}' does not exist"
                        ))
                    })?;
                self.run(&included_profile, input, ctx, visited, out)?;
                continue;
            }
            if let Err(err) = action.invoke(input, ctx, self.evaluator.as_ref(), &profile.name, out)
            {
                tracing::warn!(
                    profile = %profile.name,
                    action = %rule.action.name,
                    error = %err,
                    "action failed, skipping rule"
                );
            }
        }
        visited.remove(&profile.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::SimpleEvaluator;
    use idb_model::{ProfileAction, TranslationRule};
    use parking_lot::RwLock;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapResolver {
        profiles: RwLock<HashMap<(ProfileDirection, String), TranslationProfile>>,
    }

    impl MapResolver {
        fn with(self, profile: TranslationProfile) -> Self {
            self.profiles
                .write()
                .insert((profile.direction, profile.name.clone()), profile);
            self
        }
    }

    impl ProfileResolver for MapResolver {
        fn get_profile(
            &self,
            direction: ProfileDirection,
            name: &str,
        ) -> Option<TranslationProfile> {
            self.profiles
                .read()
                .get(&(direction, name.to_string()))
                .cloned()
        }

        fn list_profiles(&self, direction: ProfileDirection) -> Vec<TranslationProfile> {
            self.profiles
                .read()
                .values()
                .filter(|p| p.direction == direction)
                .cloned()
                .collect()
        }
    }

    fn bind(
        profile: TranslationProfile,
        resolver: MapResolver,
    ) -> InputTranslationProfile {
        InputTranslationProfile::new(
            profile,
            Arc::new(resolver),
            Arc::new(SimpleEvaluator::new()),
        )
        .unwrap()
    }

    fn map_identity_rule() -> TranslationRule {
        TranslationRule::always(ProfileAction::new(
            "mapIdentity",
            ["userName", "id", "CREATE_OR_MATCH"],
        ))
    }

    #[test]
    fn direction_mismatch_is_rejected() {
        let profile = TranslationProfile::new("p1", ProfileDirection::Output, vec![]);
        let err = InputTranslationProfile::new(
            profile,
            Arc::new(MapResolver::default()),
            Arc::new(SimpleEvaluator::new()),
        )
        .err()
        .unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn rules_run_in_order_and_false_conditions_skip() {
        let profile = TranslationProfile::new(
            "p1",
            ProfileDirection::Input,
            vec![
                map_identity_rule(),
                TranslationRule::new(
                    "false",
                    ProfileAction::new("mapGroup", ["'/never'"]),
                ),
                TranslationRule::always(ProfileAction::new("mapGroup", ["'/staff'"])),
            ],
        );
        let bound = bind(profile, MapResolver::default());
        let input = RemotelyAuthenticatedInput::new("testIdp").with_identity("userName", "jdoe");

        let out = bound.translate(&input).unwrap();
        assert_eq!(out.identities().len(), 1);
        assert_eq!(out.groups().len(), 1);
        assert_eq!(out.groups()[0].group, "/staff");
    }

    #[test]
    fn failing_rule_is_skipped_not_fatal() {
        let profile = TranslationProfile::new(
            "p1",
            ProfileDirection::Input,
            vec![
                TranslationRule::always(ProfileAction::new(
                    "mapAttribute",
                    ["cn", "/", "attr['missing']", "CREATE_OR_UPDATE"],
                )),
                map_identity_rule(),
            ],
        );
        let bound = bind(profile, MapResolver::default());
        let input = RemotelyAuthenticatedInput::new("testIdp").with_identity("userName", "jdoe");

        let out = bound.translate(&input).unwrap();
        assert!(out.attributes().is_empty());
        assert_eq!(out.identities().len(), 1);
    }

    #[test]
    fn included_profile_runs_in_place() {
        let included = TranslationProfile::new(
            "common",
            ProfileDirection::Input,
            vec![TranslationRule::always(ProfileAction::new(
                "mapGroup",
                ["'/common'"],
            ))],
        );
        let outer = TranslationProfile::new(
            "p1",
            ProfileDirection::Input,
            vec![
                map_identity_rule(),
                TranslationRule::always(ProfileAction::new("includeInputProfile", ["common"])),
                TranslationRule::always(ProfileAction::new("mapGroup", ["'/after'"])),
            ],
        );
        let bound = bind(outer, MapResolver::default().with(included));
        let input = RemotelyAuthenticatedInput::new("testIdp").with_identity("userName", "jdoe");

        let out = bound.translate(&input).unwrap();
        let groups: Vec<&str> = out.groups().iter().map(|g| g.group.as_str()).collect();
        assert_eq!(groups, ["/common", "/after"]);
    }

    #[test]
    fn missing_included_profile_aborts() {
        let profile = TranslationProfile::new(
            "p1",
            ProfileDirection::Input,
            vec![TranslationRule::always(ProfileAction::new(
                "includeInputProfile",
                ["absent"],
            ))],
        );
        let bound = bind(profile, MapResolver::default());
        let input = RemotelyAuthenticatedInput::new("testIdp");

        let err = bound.translate(&input).err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn inclusion_cycle_is_detected() {
        let a = TranslationProfile::new(
            "a",
            ProfileDirection::Input,
            vec![TranslationRule::always(ProfileAction::new(
                "includeInputProfile",
                ["b"],
            ))],
        );
        let b = TranslationProfile::new(
            "b",
            ProfileDirection::Input,
            vec![TranslationRule::always(ProfileAction::new(
                "includeInputProfile",
                ["a"],
            ))],
        );
        let bound = bind(a.clone(), MapResolver::default().with(a).with(b));
        let input = RemotelyAuthenticatedInput::new("testIdp");

        let err = bound.translate(&input).err().unwrap();
        assert!(matches!(err, TranslationError::CyclicInclusion(_)));
    }

    #[test]
    fn diamond_inclusion_is_allowed() {
        let shared = TranslationProfile::new(
            "shared",
            ProfileDirection::Input,
            vec![TranslationRule::always(ProfileAction::new(
                "mapGroup",
                ["'/shared'"],
            ))],
        );
        let left = TranslationProfile::new(
            "left",
            ProfileDirection::Input,
            vec![TranslationRule::always(ProfileAction::new(
                "includeInputProfile",
                ["shared"],
            ))],
        );
        let right = TranslationProfile::new(
            "right",
            ProfileDirection::Input,
            vec![TranslationRule::always(ProfileAction::new(
                "includeInputProfile",
                ["shared"],
            ))],
        );
        let top = TranslationProfile::new(
            "top",
            ProfileDirection::Input,
            vec![
                TranslationRule::always(ProfileAction::new("includeInputProfile", ["left"])),
                TranslationRule::always(ProfileAction::new("includeInputProfile", ["right"])),
            ],
        );
        let bound = bind(
            top,
            MapResolver::default().with(shared).with(left).with(right),
        );
        let input = RemotelyAuthenticatedInput::new("testIdp");

        let out = bound.translate(&input).unwrap();
        assert_eq!(out.groups().len(), 2);
    }

    #[test]
    fn included_output_rule_overrides_earlier_attribute() {
        let included = TranslationProfile::new(
            "override",
            ProfileDirection::Output,
            vec![TranslationRule::always(ProfileAction::new(
                "createAttribute",
                ["a1", "'x2'"],
            ))],
        );
        let outer = TranslationProfile::new(
            "out1",
            ProfileDirection::Output,
            vec![
                TranslationRule::always(ProfileAction::new("createAttribute", ["a1", "'x'"])),
                TranslationRule::always(ProfileAction::new("includeOutputProfile", ["override"])),
            ],
        );
        let bound = OutputTranslationProfile::new(
            outer,
            Arc::new(MapResolver::default().with(included)),
            Arc::new(SimpleEvaluator::new()),
        )
        .unwrap();

        let input = crate::output::TranslationInput::new(uuid::Uuid::now_v7(), "sp1", "OIDC");
        let out = bound.translate(&input).unwrap();
        assert_eq!(out.attributes().len(), 1);
        assert_eq!(out.attribute("a1").unwrap().attribute.first_value(), Some("x2"));
    }

    #[test]
    fn output_profile_filters_and_redirects() {
        let profile = TranslationProfile::new(
            "out1",
            ProfileDirection::Output,
            vec![
                TranslationRule::always(ProfileAction::new(
                    "createAttribute",
                    ["mail", "attr['email']"],
                )),
                TranslationRule::always(ProfileAction::new("filterAttribute", ["secret.*"])),
                TranslationRule::always(ProfileAction::new(
                    "redirect",
                    ["'https://portal.example.com'"],
                )),
            ],
        );
        let bound = OutputTranslationProfile::new(
            profile,
            Arc::new(MapResolver::default()),
            Arc::new(SimpleEvaluator::new()),
        )
        .unwrap();

        let input = crate::output::TranslationInput::new(uuid::Uuid::now_v7(), "sp1", "OIDC")
            .with_attribute(idb_model::Attribute::single("email", "/", "jdoe@example.com"))
            .with_attribute(idb_model::Attribute::single("secretKey", "/", "shh"));

        let out = bound.translate(&input).unwrap();
        assert!(out.attribute("mail").is_some());
        assert!(out.attribute("secretKey").is_none());
        assert_eq!(out.redirect_url(), Some("https://portal.example.com"));
    }
}
