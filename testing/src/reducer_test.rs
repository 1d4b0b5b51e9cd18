//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing reducers with readable Given-When-Then syntax.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use storefront_core::{effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// Several `when_action` calls are applied in order; effect assertions see
/// the effects of the last action only.
///
/// # Example
///
/// ```ignore
/// use storefront_testing::ReducerTest;
///
/// ReducerTest::new(CartReducer::new())
///     .with_env(environment)
///     .given_state(CartState::default())
///     .when_action(CartAction::AddItem { line: mug.clone() })
///     .when_action(CartAction::AddItem { line: mug })
///     .then_state(|state| assert_eq!(state.items()[0].quantity, 2))
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
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
            actions: Vec::new(),
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

    /// Add an action to apply (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
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

    /// Add an assertion about the effects of the last action (Then)
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

        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action()"
        );

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        let mut effects = Vec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env).into_vec();
        }

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
    use storefront_core::effect::Effect;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if any effect does something.
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
            count_futures(effects) > 0,
            "Expected at least one Future effect, but none found"
        );
    }

    /// Assert that effects contain a Delay effect and return its duration
    ///
    /// # Panics
    ///
    /// Panics if no Delay effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_delay_effect<A>(effects: &[Effect<A>]) -> std::time::Duration {
        find_delay(effects).unwrap_or_else(|| panic!("Expected a Delay effect, but none found"))
    }

    /// Count Future effects
    #[must_use]
    pub fn count_futures<A>(effects: &[Effect<A>]) -> usize {
        effects
            .iter()
            .filter(|effect| matches!(effect, Effect::Future(_)))
            .count()
    }

    fn find_delay<A>(effects: &[Effect<A>]) -> Option<std::time::Duration> {
        effects.iter().find_map(|effect| match effect {
            Effect::Delay { duration, .. } => Some(*duration),
            Effect::None | Effect::Future(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use storefront_core::{SmallVec, smallvec};

    #[derive(Clone, Debug)]
    struct StockState {
        on_hand: u32,
    }

    #[derive(Clone, Debug)]
    enum StockAction {
        Receive(u32),
        Sell,
        Recount,
    }

    struct StockReducer;

    struct StockEnv;

    impl Reducer for StockReducer {
        type State = StockState;
        type Action = StockAction;
        type Environment = StockEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                StockAction::Receive(n) => {
                    state.on_hand += n;
                    smallvec![Effect::None]
                },
                StockAction::Sell => {
                    state.on_hand = state.on_hand.saturating_sub(1);
                    smallvec![Effect::Future(Box::pin(async { None }))]
                },
                StockAction::Recount => smallvec![
                    Effect::None,
                    Effect::Delay {
                        duration: Duration::from_secs(2),
                        action: Box::new(StockAction::Receive(0)),
                    }
                ],
            }
        }
    }

    #[test]
    fn applies_actions_in_order() {
        ReducerTest::new(StockReducer)
            .with_env(StockEnv)
            .given_state(StockState { on_hand: 0 })
            .when_action(StockAction::Receive(3))
            .when_action(StockAction::Sell)
            .then_state(|state| assert_eq!(state.on_hand, 2))
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn pure_transition_has_no_effects() {
        ReducerTest::new(StockReducer)
            .with_env(StockEnv)
            .given_state(StockState { on_hand: 5 })
            .when_action(StockAction::Receive(1))
            .then_state(|state| assert_eq!(state.on_hand, 6))
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn finds_delay_among_effects() {
        ReducerTest::new(StockReducer)
            .with_env(StockEnv)
            .given_state(StockState { on_hand: 0 })
            .when_action(StockAction::Recount)
            .then_effects(|effects| {
                assert_eq!(assertions::assert_has_delay_effect(effects), Duration::from_secs(2));
                assert_eq!(assertions::count_futures(effects), 0);
            })
            .run();
    }
}
