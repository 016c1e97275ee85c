//! # Service Portal Core
//!
//! Core traits and types shared by every service portal crate.
//!
//! The portal follows a functional core / imperative shell split:
//!
//! - **State**: Domain state for a feature (the booking ledger, guest sessions)
//! - **Action**: All possible inputs to a reducer (commands and the results fed back by effects)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits
//!
//! Reducers never perform I/O. Persistence, OTP delivery and meeting link
//! creation are described as [`effect::Effect::Future`] values and executed by
//! the runtime `Store`, which feeds any resulting action back into the reducer.
//!
//! ## Example
//!
//! ```ignore
//! use service_portal_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! impl Reducer for BookingReducer {
//!     type State = BookingState;
//!     type Action = BookingAction;
//!     type Environment = BookingEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut BookingState,
//!         action: BookingAction,
//!         env: &BookingEnvironment,
//!     ) -> SmallVec<[Effect<BookingAction>; 4]> {
//!         smallvec![Effect::None]
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Reducer module - the pure business logic seam.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// A reducer turns an action into a state change plus effect descriptions.
    ///
    /// Reducers run synchronously under the store's write lock, so any
    /// read-check-write sequence inside `reduce` is atomic with respect to
    /// every other action sent to the same store.
    pub trait Reducer {
        /// The state this reducer operates on.
        type State;

        /// The actions this reducer handles.
        type Action;

        /// Injected dependencies.
        type Environment;

        /// Apply `action` to `state` and describe the follow-up side effects.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - side effect descriptions.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// A description of work for the runtime to perform after a reducer runs.
    pub enum Effect<Action> {
        /// No side effect.
        None,

        /// Run effects concurrently.
        Parallel(Vec<Effect<Action>>),

        /// Run effects one after another.
        Sequential(Vec<Effect<Action>>),

        /// Send `action` back to the store after `duration`.
        Delay {
            /// How long to wait.
            duration: Duration,
            /// The action to dispatch.
            action: Box<Action>,
        },

        /// Arbitrary async work; a returned action is fed back to the store.
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel.
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Combine effects to run in order.
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Wrap an async block that yields an optional follow-up action.
        pub fn future<F>(fut: F) -> Effect<Action>
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }

        /// An effect that immediately feeds `action` back to the store.
        ///
        /// Used for results that must be observable by `send_and_wait_for`
        /// callers, since only effect-produced actions are broadcast.
        pub fn emit(action: Action) -> Effect<Action>
        where
            Action: Send + 'static,
        {
            Effect::Future(Box::pin(async move { Some(action) }))
        }

        /// Returns `true` for [`Effect::None`].
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - injected dependency traits.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Source of the current time.
    ///
    /// Every expiry check (drafts, OTP codes, tokens) reads the clock from
    /// the environment so tests can pin or advance time.
    pub trait Clock: Send + Sync {
        /// Current instant.
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
