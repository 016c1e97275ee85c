//! Ergonomic testing utilities for reducers
//!
//! A fluent Given-When-Then harness. Reducers are pure, so a test only needs
//! a state, an environment and the actions to apply.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use service_portal_core::{effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// Actions queued with `given_actions` are applied first and their effects
/// discarded; effect assertions only see the effects of the `when_action`.
///
/// # Example
///
/// ```ignore
/// use service_portal_testing::ReducerTest;
///
/// ReducerTest::new(BookingReducer::new())
///     .with_env(test_environment())
///     .given_state(state_with_one_slot())
///     .when_action(BookingAction::CreateAndConfirm { correlation_id, request })
///     .then_state(|state| {
///         assert_eq!(state.appointments.len(), 1);
///     })
///     .then_effects(|effects| {
///         assert_eq!(effects.len(), 1);
///     })
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    setup_actions: Vec<A>,
    action: Option<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            setup_actions: Vec::new(),
            action: None,
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Apply these actions before the action under test (Given)
    #[must_use]
    pub fn given_actions(mut self, actions: impl IntoIterator<Item = A>) -> Self {
        self.setup_actions.extend(actions);
        self
    }

    /// Set the action to test (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.action = Some(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the resulting effects (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, action, or environment is not set,
    /// or if any assertions fail.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        let action = self.action.expect("Action must be set with when_action()");

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        for setup in self.setup_actions {
            let _ = self.reducer.reduce(&mut state, setup, &env);
        }

        let effects = self.reducer.reduce(&mut state, action, &env);

        for assertion in self.state_assertions {
            assertion(&state);
        }

        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use service_portal_core::effect::Effect;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if effects is not empty.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that effects contain at least one Future effect
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Future(_))),
            "Expected at least one Future effect, but none found"
        );
    }

    /// Assert that effects contain at least one Delay effect
    ///
    /// # Panics
    ///
    /// Panics if no Delay effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_delay_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Delay { .. })),
            "Expected at least one Delay effect, but none found"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use service_portal_core::{smallvec, SmallVec};
    use std::time::Duration;

    #[derive(Clone, Debug, Default)]
    struct HoldState {
        held: u32,
        limit: u32,
    }

    #[derive(Clone, Debug)]
    enum HoldAction {
        Hold,
        Release,
        HoldWithTimeout,
    }

    struct HoldReducer;

    struct HoldEnv;

    impl Reducer for HoldReducer {
        type State = HoldState;
        type Action = HoldAction;
        type Environment = HoldEnv;

        fn reduce(
            &self,
            state: &mut HoldState,
            action: HoldAction,
            _env: &HoldEnv,
        ) -> SmallVec<[Effect<HoldAction>; 4]> {
            match action {
                HoldAction::Hold if state.held < state.limit => {
                    state.held += 1;
                    smallvec![Effect::None]
                },
                HoldAction::Hold => smallvec![Effect::None],
                HoldAction::Release => {
                    state.held = state.held.saturating_sub(1);
                    smallvec![Effect::None]
                },
                HoldAction::HoldWithTimeout => {
                    state.held += 1;
                    smallvec![Effect::Delay {
                        duration: Duration::from_secs(30),
                        action: Box::new(HoldAction::Release),
                    }]
                },
            }
        }
    }

    #[test]
    fn test_hold_respects_limit_after_setup_actions() {
        ReducerTest::new(HoldReducer)
            .with_env(HoldEnv)
            .given_state(HoldState { held: 0, limit: 2 })
            .given_actions([HoldAction::Hold, HoldAction::Hold])
            .when_action(HoldAction::Hold)
            .then_state(|state| {
                assert_eq!(state.held, 2);
            })
            .then_effects(|effects| {
                assertions::assert_no_effects(effects);
            })
            .run();
    }

    #[test]
    fn test_timed_hold_schedules_release() {
        ReducerTest::new(HoldReducer)
            .with_env(HoldEnv)
            .given_state(HoldState::default())
            .when_action(HoldAction::HoldWithTimeout)
            .then_state(|state| assert_eq!(state.held, 1))
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_delay_effect(effects);
            })
            .run();
    }

    #[test]
    fn test_future_assertion() {
        let effects = [Effect::<HoldAction>::emit(HoldAction::Release)];
        assertions::assert_has_future_effect(&effects);
        assertions::assert_no_effects::<HoldAction>(&[]);
    }
}
