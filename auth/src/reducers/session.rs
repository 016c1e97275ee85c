//! Guest session reducer.
//!
//! # Flow
//!
//! 1. Register or look up a guest by document number
//! 2. With codes disabled, mint a token right away
//! 3. With codes enabled, store a hashed code keyed by phone and send it
//! 4. Verify the code: the pending entry is consumed atomically, then the
//!    registration is completed or the token rotated
//! 5. Every later request presents the token, which is hashed and looked up
//!
//! # Security
//!
//! - Codes and tokens are stored as SHA-256 digests only
//! - Tokens are 256-bit random values (base64url encoded)
//! - Each successful authentication replaces the token hash, so at most one
//!   token per guest is valid
//! - Hourly issuance windows and lockouts are tracked in state, which the
//!   store mutates under its write lock

use crate::actions::{GuestAction, GuestSession, OtpDelivery, PendingIntent};
use crate::config::OtpChannel;
use crate::crypto::{generate_otp, generate_token, hash_secret, mask_phone};
use crate::environment::GuestEnvironment;
use crate::error::GuestError;
use crate::providers::{IdentityRepository, OtpMessage, PendingOtpStore};
use crate::state::{
    ContactUpdate, GuestId, GuestIdentity, GuestState, OtpPurpose, PendingOtp, RegistrationForm,
    RequestWindow, StoredToken, VerifyOutcome,
};
use crate::validation::{strip_phone_separators, validate_document};
use chrono::{DateTime, Duration, Utc};
use service_portal_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

type Effects = SmallVec<[Effect<GuestAction>; 4]>;

const DUPLICATE_DOCUMENT: &str =
    "A user with this document is already registered; use the sign-in option.";
const NO_PENDING_CODE: &str = "No OTP was requested";
const OTP_DISABLED: &str = "OTP verification is not enabled";

/// A code about to be issued.
struct Issue {
    phone: String,
    document: String,
    channel: OtpChannel,
    purpose: OtpPurpose,
    previous: Option<PendingOtp>,
}

/// Guest session reducer.
#[derive(Debug, Clone)]
pub struct GuestSessionReducer<I, P> {
    _phantom: PhantomData<(I, P)>,
}

impl<I, P> GuestSessionReducer<I, P> {
    /// Create the reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<I, P> Default for GuestSessionReducer<I, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, P> GuestSessionReducer<I, P>
where
    I: IdentityRepository + Clone + 'static,
    P: PendingOtpStore + Clone + 'static,
{
    fn reject(correlation_id: Uuid, error: GuestError) -> Effects {
        tracing::debug!(%correlation_id, %error, "Guest command rejected");
        smallvec![Effect::emit(GuestAction::Failed {
            correlation_id,
            error,
        })]
    }

    fn register(
        correlation_id: Uuid,
        form: RegistrationForm,
        channel: Option<OtpChannel>,
        env: &GuestEnvironment<I, P>,
    ) -> Effects {
        let form = match form.normalize() {
            Ok(form) => form,
            Err(error) => return Self::reject(correlation_id, error),
        };
        if env.config.otp.enabled && form.phone.is_none() {
            return Self::reject(
                correlation_id,
                GuestError::Validation("A phone number is required to verify your identity".into()),
            );
        }

        let identities = env.identities.clone();
        smallvec![Effect::future(async move {
            let existing = identities.find_by_document(&form.document).await;
            Some(GuestAction::RegistrationChecked {
                correlation_id,
                form: Box::new(form),
                channel,
                existing,
            })
        })]
    }

    fn registration_checked(
        state: &mut GuestState,
        correlation_id: Uuid,
        form: RegistrationForm,
        channel: Option<OtpChannel>,
        existing: Result<Option<GuestIdentity>, GuestError>,
        env: &GuestEnvironment<I, P>,
    ) -> Effects {
        match existing {
            Err(error) => Self::reject(correlation_id, error),
            Ok(Some(_)) => {
                Self::reject(correlation_id, GuestError::Conflict(DUPLICATE_DOCUMENT.into()))
            },
            Ok(None) if env.config.otp.enabled => {
                let Some(phone) = form.phone.clone() else {
                    return Self::reject(
                        correlation_id,
                        GuestError::Validation("A phone number is required".into()),
                    );
                };
                let issue = Issue {
                    phone,
                    document: form.document.clone(),
                    channel: channel.unwrap_or(env.config.otp.default_channel),
                    purpose: OtpPurpose::Register {
                        form: Box::new(form),
                    },
                    previous: None,
                };
                Self::issue_code(state, correlation_id, issue, env)
            },
            Ok(None) => {
                let now = env.clock.now();
                smallvec![Self::create_identity(
                    correlation_id,
                    GuestIdentity::from_form(form, now),
                    env,
                )]
            },
        }
    }

    fn lookup(
        correlation_id: Uuid,
        document: &str,
        channel: Option<OtpChannel>,
        env: &GuestEnvironment<I, P>,
    ) -> Effects {
        let document = match validate_document(document) {
            Ok(document) => document,
            Err(error) => return Self::reject(correlation_id, error),
        };
        let identities = env.identities.clone();
        smallvec![Effect::future(async move {
            let result = identities.find_by_document(&document).await;
            Some(GuestAction::IdentityLoaded {
                correlation_id,
                channel,
                result,
            })
        })]
    }

    fn identity_loaded(
        state: &mut GuestState,
        correlation_id: Uuid,
        channel: Option<OtpChannel>,
        result: Result<Option<GuestIdentity>, GuestError>,
        env: &GuestEnvironment<I, P>,
    ) -> Effects {
        let identity = match result {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                return Self::reject(
                    correlation_id,
                    GuestError::NotFound("No user is registered with this document".into()),
                );
            },
            Err(error) => return Self::reject(correlation_id, error),
        };

        if !env.config.otp.enabled {
            return smallvec![Self::rotate_token(correlation_id, identity.id, env)];
        }

        let Some(phone) = identity.phone.clone() else {
            return Self::reject(
                correlation_id,
                GuestError::Validation("No phone number is registered for this document".into()),
            );
        };
        let issue = Issue {
            phone,
            document: identity.document.clone(),
            channel: channel.unwrap_or(env.config.otp.default_channel),
            purpose: OtpPurpose::Login {
                identity_id: identity.id,
            },
            previous: None,
        };
        Self::issue_code(state, correlation_id, issue, env)
    }

    fn load_pending(
        correlation_id: Uuid,
        document: &str,
        intent: PendingIntent,
        env: &GuestEnvironment<I, P>,
    ) -> Effects {
        if !env.config.otp.enabled {
            return Self::reject(correlation_id, GuestError::Validation(OTP_DISABLED.into()));
        }
        let document = match validate_document(document) {
            Ok(document) => document,
            Err(error) => return Self::reject(correlation_id, error),
        };
        let pending = env.pending.clone();
        smallvec![Effect::future(async move {
            let result = pending.find_by_document(&document).await;
            Some(GuestAction::PendingLoaded {
                correlation_id,
                document,
                intent,
                result,
            })
        })]
    }

    fn pending_loaded(
        state: &mut GuestState,
        correlation_id: Uuid,
        document: &str,
        intent: PendingIntent,
        result: Result<Option<PendingOtp>, GuestError>,
        env: &GuestEnvironment<I, P>,
    ) -> Effects {
        let now = env.clock.now();
        let pending = match result {
            Ok(Some(pending)) => pending,
            Ok(None) => {
                // Exhausted attempts delete the pending code.
                if let Some(left) = state.document_locked_for(document, now) {
                    return Self::reject(correlation_id, GuestError::locked(whole_seconds(left)));
                }
                return Self::reject(
                    correlation_id,
                    GuestError::Authentication(NO_PENDING_CODE.into()),
                );
            },
            Err(error) => return Self::reject(correlation_id, error),
        };

        let key = strip_phone_separators(&pending.phone);
        if let Some(left) = state.locked_for(&key, now) {
            return Self::reject(correlation_id, GuestError::locked(whole_seconds(left)));
        }

        match intent {
            PendingIntent::Resend => {
                let cooldown = Duration::seconds(i64::from(env.config.otp.resend_cooldown_seconds));
                let ready_at = pending.last_sent_at + cooldown;
                if now < ready_at {
                    let wait = whole_seconds(ready_at - now);
                    return Self::reject(
                        correlation_id,
                        GuestError::RateLimited {
                            message: format!(
                                "Please wait {wait} seconds before requesting a new code"
                            ),
                            retry_after_secs: wait,
                        },
                    );
                }
                let issue = Issue {
                    phone: pending.phone.clone(),
                    document: pending.document.clone(),
                    channel: pending.channel,
                    purpose: pending.purpose.clone(),
                    previous: Some(pending),
                };
                Self::issue_code(state, correlation_id, issue, env)
            },
            PendingIntent::Verify { code_hash } => {
                let store = env.pending.clone();
                let max_attempts = env.config.otp.max_verification_attempts;
                let phone = pending.phone;
                let document = pending.document;
                smallvec![Effect::future(async move {
                    let result = store.verify(&phone, &code_hash, now, max_attempts).await;
                    Some(GuestAction::OtpChecked {
                        correlation_id,
                        document,
                        phone,
                        result,
                    })
                })]
            },
        }
    }

    fn otp_checked(
        state: &mut GuestState,
        correlation_id: Uuid,
        document: &str,
        phone: &str,
        result: Result<VerifyOutcome, GuestError>,
        env: &GuestEnvironment<I, P>,
    ) -> Effects {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(error) => return Self::reject(correlation_id, error),
        };
        let now = env.clock.now();

        match outcome {
            VerifyOutcome::Verified(pending) => match pending.purpose {
                OtpPurpose::Login { identity_id } => {
                    smallvec![Self::rotate_token(correlation_id, identity_id, env)]
                },
                OtpPurpose::Register { form } => {
                    smallvec![Self::create_identity(
                        correlation_id,
                        GuestIdentity::from_form(*form, now),
                        env,
                    )]
                },
            },
            VerifyOutcome::Mismatch { remaining } => Self::reject(
                correlation_id,
                GuestError::Authentication(format!("Invalid OTP. {remaining} attempts remaining")),
            ),
            VerifyOutcome::Exhausted => {
                let lockout = Duration::minutes(i64::from(env.config.otp.lockout_minutes));
                state
                    .lockouts
                    .insert(strip_phone_separators(phone), now + lockout);
                state
                    .document_lockouts
                    .insert(document.to_string(), now + lockout);
                tracing::warn!(
                    phone = %mask_phone(phone),
                    minutes = env.config.otp.lockout_minutes,
                    "Too many wrong codes, phone locked"
                );
                Self::reject(correlation_id, GuestError::locked(whole_seconds(lockout)))
            },
            VerifyOutcome::Expired => Self::reject(
                correlation_id,
                GuestError::Authentication("OTP has expired. Please request a new one.".into()),
            ),
            VerifyOutcome::Missing => Self::reject(
                correlation_id,
                GuestError::Authentication(NO_PENDING_CODE.into()),
            ),
        }
    }

    /// Throttle, store and send a code.
    fn issue_code(
        state: &mut GuestState,
        correlation_id: Uuid,
        issue: Issue,
        env: &GuestEnvironment<I, P>,
    ) -> Effects {
        let settings = &env.config.otp;
        let now = env.clock.now();
        let hour = Duration::hours(1);
        let key = strip_phone_separators(&issue.phone);

        state.lockouts.retain(|_, until| *until > now);
        state.document_lockouts.retain(|_, until| *until > now);
        state
            .request_windows
            .retain(|_, window| now < window.started_at + hour);

        if let Some(left) = state.locked_for(&key, now) {
            return Self::reject(correlation_id, GuestError::locked(whole_seconds(left)));
        }

        let window = state.request_windows.entry(key).or_insert(RequestWindow {
            started_at: now,
            count: 0,
        });
        if window.count >= settings.max_requests_per_hour {
            let left = window.started_at + hour - now;
            return Self::reject(
                correlation_id,
                GuestError::retry_in_minutes("Too many OTP requests", whole_seconds(left)),
            );
        }
        window.count += 1;

        let code = generate_otp(settings.otp_length);
        let expires_at = now + Duration::minutes(i64::from(settings.expiry_minutes));
        let (issued_at, attempts) = issue
            .previous
            .as_ref()
            .map_or((now, 0), |previous| (previous.issued_at, previous.attempts));
        let pending = PendingOtp {
            phone: issue.phone.clone(),
            document: issue.document,
            code_hash: hash_secret(&code),
            channel: issue.channel,
            issued_at,
            expires_at,
            attempts,
            last_sent_at: now,
            purpose: issue.purpose,
        };
        let message = OtpMessage {
            to: issue.phone,
            channel: issue.channel,
            code,
            expiry_minutes: settings.expiry_minutes,
        };
        let delivery = OtpDelivery {
            masked_phone: mask_phone(&message.to),
            channel: issue.channel,
            expiry_minutes: settings.expiry_minutes,
        };

        let store = env.pending.clone();
        let sender = Arc::clone(&env.sender);
        smallvec![Effect::future(async move {
            if let Err(error) = store.put(pending).await {
                return Some(GuestAction::Failed {
                    correlation_id,
                    error,
                });
            }

            match sender.send(&message).await {
                Ok(()) => Some(GuestAction::OtpIssued {
                    correlation_id,
                    delivery,
                }),
                Err(error) => {
                    tracing::warn!(
                        %error,
                        phone = %delivery.masked_phone,
                        channel = delivery.channel.as_str(),
                        "Code delivery failed"
                    );
                    if let Err(cleanup) = store.delete(&message.to).await {
                        tracing::error!(error = %cleanup, "Failed to drop undelivered code");
                    }
                    Some(GuestAction::Failed {
                        correlation_id,
                        error: GuestError::Delivery(error.to_string()),
                    })
                },
            }
        })]
    }

    /// Insert a new guest holding a fresh token.
    ///
    /// The repository rejects a duplicate document, which re-checks
    /// uniqueness at completion time.
    fn create_identity(
        correlation_id: Uuid,
        mut identity: GuestIdentity,
        env: &GuestEnvironment<I, P>,
    ) -> Effect<GuestAction> {
        let (token, stored) = mint_token(env.clock.now());
        identity.token = Some(stored);
        let identities = env.identities.clone();

        Effect::future(async move {
            match identities.insert(identity.clone()).await {
                Ok(()) => {
                    tracing::info!(guest_id = %identity.id, "Guest registered");
                    Some(GuestAction::Authenticated {
                        correlation_id,
                        session: Box::new(GuestSession { token, identity }),
                    })
                },
                Err(error) => Some(GuestAction::Failed {
                    correlation_id,
                    error,
                }),
            }
        })
    }

    /// Replace the token of an existing guest.
    fn rotate_token(
        correlation_id: Uuid,
        identity_id: GuestId,
        env: &GuestEnvironment<I, P>,
    ) -> Effect<GuestAction> {
        let (token, stored) = mint_token(env.clock.now());
        let identities = env.identities.clone();

        Effect::future(async move {
            let result = async {
                identities.set_token(identity_id, Some(stored)).await?;
                identities
                    .find_by_id(identity_id)
                    .await?
                    .ok_or_else(|| GuestError::NotFound("Guest not found".into()))
            }
            .await;

            Some(match result {
                Ok(identity) => {
                    tracing::info!(guest_id = %identity_id, "Guest token rotated");
                    GuestAction::Authenticated {
                        correlation_id,
                        session: Box::new(GuestSession { token, identity }),
                    }
                },
                Err(error) => GuestAction::Failed {
                    correlation_id,
                    error,
                },
            })
        })
    }

    fn validate_token(
        correlation_id: Uuid,
        token: &str,
        env: &GuestEnvironment<I, P>,
    ) -> Effects {
        let token = token.trim();
        if token.is_empty() {
            return Self::reject(
                correlation_id,
                GuestError::Authentication("Authentication token is required".into()),
            );
        }
        let hash = hash_secret(token);
        let identities = env.identities.clone();
        smallvec![Effect::future(async move {
            let result = identities.find_by_token_hash(&hash).await;
            Some(GuestAction::TokenChecked {
                correlation_id,
                result,
            })
        })]
    }

    fn token_checked(
        correlation_id: Uuid,
        result: Result<Option<GuestIdentity>, GuestError>,
        env: &GuestEnvironment<I, P>,
    ) -> Effects {
        let identity = match result {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                return Self::reject(
                    correlation_id,
                    GuestError::Authentication("Invalid or expired token".into()),
                );
            },
            Err(error) => return Self::reject(correlation_id, error),
        };

        let now = env.clock.now();
        let stale = identity
            .token
            .as_ref()
            .is_none_or(|token| is_stale(token.issued_at, now, env.config.token_max_age));
        if !stale {
            return smallvec![Effect::emit(GuestAction::TokenValidated {
                correlation_id,
                identity: Box::new(identity),
            })];
        }

        let identities = env.identities.clone();
        smallvec![Effect::future(async move {
            if let Err(error) = identities.set_token(identity.id, None).await {
                tracing::error!(%error, guest_id = %identity.id, "Failed to clear stale token");
            }
            Some(GuestAction::Failed {
                correlation_id,
                error: GuestError::Authentication(
                    "Session expired. Please sign in again.".into(),
                ),
            })
        })]
    }

    fn logout(
        correlation_id: Uuid,
        identity_id: GuestId,
        env: &GuestEnvironment<I, P>,
    ) -> Effects {
        let identities = env.identities.clone();
        smallvec![Effect::future(async move {
            Some(match identities.set_token(identity_id, None).await {
                Ok(()) => GuestAction::LoggedOut { correlation_id },
                Err(error) => GuestAction::Failed {
                    correlation_id,
                    error,
                },
            })
        })]
    }

    fn update_contact(
        correlation_id: Uuid,
        identity_id: GuestId,
        update: ContactUpdate,
        env: &GuestEnvironment<I, P>,
    ) -> Effects {
        let update = match update.normalize() {
            Ok(update) if update.is_empty() => {
                return Self::reject(
                    correlation_id,
                    GuestError::Validation("Nothing to update".into()),
                );
            },
            Ok(update) => update,
            Err(error) => return Self::reject(correlation_id, error),
        };
        let now = env.clock.now();
        let identities = env.identities.clone();
        smallvec![Effect::future(async move {
            Some(
                match identities.update_contact(identity_id, update, now).await {
                    Ok(identity) => GuestAction::ContactUpdated {
                        correlation_id,
                        identity: Box::new(identity),
                    },
                    Err(error) => GuestAction::Failed {
                        correlation_id,
                        error,
                    },
                },
            )
        })]
    }
}

impl<I, P> Reducer for GuestSessionReducer<I, P>
where
    I: IdentityRepository + Clone + 'static,
    P: PendingOtpStore + Clone + 'static,
{
    type State = GuestState;
    type Action = GuestAction;
    type Environment = GuestEnvironment<I, P>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects {
        match action {
            // ═══════════════════════════════════════════════════════════════
            // Commands
            // ═══════════════════════════════════════════════════════════════
            GuestAction::Register {
                correlation_id,
                form,
                channel,
            } => Self::register(correlation_id, form, channel, env),

            GuestAction::LookupByDocument {
                correlation_id,
                document,
            } => Self::lookup(correlation_id, &document, None, env),

            GuestAction::RequestOtp {
                correlation_id,
                document,
                channel,
            } => {
                if !env.config.otp.enabled {
                    return Self::reject(
                        correlation_id,
                        GuestError::Validation(OTP_DISABLED.into()),
                    );
                }
                Self::lookup(correlation_id, &document, channel, env)
            },

            GuestAction::ResendOtp {
                correlation_id,
                document,
            } => Self::load_pending(correlation_id, &document, PendingIntent::Resend, env),

            GuestAction::VerifyOtp {
                correlation_id,
                document,
                code,
            } => {
                let code = code.trim();
                if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
                    return Self::reject(
                        correlation_id,
                        GuestError::Validation("The code must contain only digits".into()),
                    );
                }
                let intent = PendingIntent::Verify {
                    code_hash: hash_secret(code),
                };
                Self::load_pending(correlation_id, &document, intent, env)
            },

            GuestAction::ValidateToken {
                correlation_id,
                token,
            } => Self::validate_token(correlation_id, &token, env),

            GuestAction::Logout {
                correlation_id,
                identity_id,
            } => Self::logout(correlation_id, identity_id, env),

            GuestAction::UpdateContact {
                correlation_id,
                identity_id,
                update,
            } => Self::update_contact(correlation_id, identity_id, update, env),

            // ═══════════════════════════════════════════════════════════════
            // Effect feedback
            // ═══════════════════════════════════════════════════════════════
            GuestAction::RegistrationChecked {
                correlation_id,
                form,
                channel,
                existing,
            } => Self::registration_checked(state, correlation_id, *form, channel, existing, env),

            GuestAction::IdentityLoaded {
                correlation_id,
                channel,
                result,
            } => Self::identity_loaded(state, correlation_id, channel, result, env),

            GuestAction::PendingLoaded {
                correlation_id,
                document,
                intent,
                result,
            } => Self::pending_loaded(state, correlation_id, &document, intent, result, env),

            GuestAction::OtpChecked {
                correlation_id,
                document,
                phone,
                result,
            } => Self::otp_checked(state, correlation_id, &document, &phone, result, env),

            GuestAction::TokenChecked {
                correlation_id,
                result,
            } => Self::token_checked(correlation_id, result, env),

            // Terminal results only inform observers
            GuestAction::OtpIssued { .. }
            | GuestAction::Authenticated { .. }
            | GuestAction::TokenValidated { .. }
            | GuestAction::LoggedOut { .. }
            | GuestAction::ContactUpdated { .. }
            | GuestAction::Failed { .. } => smallvec![Effect::None],
        }
    }
}

fn mint_token(now: DateTime<Utc>) -> (String, StoredToken) {
    let token = generate_token();
    let stored = StoredToken {
        hash: hash_secret(&token),
        issued_at: now,
    };
    (token, stored)
}

fn is_stale(issued_at: DateTime<Utc>, now: DateTime<Utc>, max_age: Duration) -> bool {
    now >= issued_at + max_age
}

/// Whole seconds in `duration`, at least one.
fn whole_seconds(duration: Duration) -> u64 {
    u64::try_from(duration.num_seconds()).unwrap_or(0).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GuestAuthConfig, OtpSettings};
    use crate::mocks::MockOtpSender;
    use crate::stores::{InMemoryIdentityRepository, InMemoryPendingOtpStore};
    use service_portal_core::environment::Clock;
    use service_portal_testing::{assertions, test_clock, ReducerTest};

    type TestReducer = GuestSessionReducer<InMemoryIdentityRepository, InMemoryPendingOtpStore>;
    type TestEnv = GuestEnvironment<InMemoryIdentityRepository, InMemoryPendingOtpStore>;

    fn env(otp_enabled: bool) -> TestEnv {
        GuestEnvironment::new(
            InMemoryIdentityRepository::new(),
            InMemoryPendingOtpStore::new(),
            Arc::new(MockOtpSender::new()),
            Arc::new(test_clock()),
            GuestAuthConfig::new().with_otp(OtpSettings::new().with_enabled(otp_enabled)),
        )
    }

    fn form(phone: Option<&str>) -> RegistrationForm {
        RegistrationForm {
            document: "10203040".into(),
            full_name: "Ana Gómez".into(),
            phone: phone.map(Into::into),
            ..RegistrationForm::default()
        }
    }

    fn pending(phone: &str) -> PendingOtp {
        let now = test_clock().now();
        PendingOtp {
            phone: phone.into(),
            document: "10203040".into(),
            code_hash: hash_secret("123456"),
            channel: OtpChannel::Sms,
            issued_at: now,
            expires_at: now + Duration::minutes(5),
            attempts: 0,
            last_sent_at: now,
            purpose: OtpPurpose::Login {
                identity_id: GuestId::new(),
            },
        }
    }

    #[test]
    fn test_register_with_invalid_document_fails_fast() {
        let mut bad = form(None);
        bad.document = "x".into();
        ReducerTest::new(TestReducer::new())
            .with_env(env(false))
            .given_state(GuestState::default())
            .when_action(GuestAction::Register {
                correlation_id: Uuid::new_v4(),
                form: bad,
                channel: None,
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn test_registration_conflict() {
        let existing = GuestIdentity::from_form(form(None), test_clock().now());
        ReducerTest::new(TestReducer::new())
            .with_env(env(false))
            .given_state(GuestState::default())
            .when_action(GuestAction::RegistrationChecked {
                correlation_id: Uuid::new_v4(),
                form: Box::new(form(None)),
                channel: None,
                existing: Ok(Some(existing)),
            })
            .then_state(|state| {
                assert!(state.request_windows.is_empty());
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
            })
            .run();
    }

    #[test]
    fn test_issue_opens_request_window() {
        ReducerTest::new(TestReducer::new())
            .with_env(env(true))
            .given_state(GuestState::default())
            .when_action(GuestAction::RegistrationChecked {
                correlation_id: Uuid::new_v4(),
                form: Box::new(form(Some("+57 300 123 4567"))),
                channel: None,
                existing: Ok(None),
            })
            .then_state(|state| {
                let window = state.request_windows.get("+573001234567").unwrap();
                assert_eq!(window.count, 1);
            })
            .then_effects(|effects| {
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn test_request_window_full_does_not_count_again() {
        let now = test_clock().now();
        let mut state = GuestState::default();
        state.request_windows.insert(
            "+573001234567".into(),
            RequestWindow {
                started_at: now - Duration::minutes(10),
                count: 3,
            },
        );
        ReducerTest::new(TestReducer::new())
            .with_env(env(true))
            .given_state(state)
            .when_action(GuestAction::RegistrationChecked {
                correlation_id: Uuid::new_v4(),
                form: Box::new(form(Some("+573001234567"))),
                channel: None,
                existing: Ok(None),
            })
            .then_state(|state| {
                assert_eq!(state.request_windows["+573001234567"].count, 3);
            })
            .run();
    }

    #[test]
    fn test_request_window_resets_after_an_hour() {
        let now = test_clock().now();
        let mut state = GuestState::default();
        state.request_windows.insert(
            "+573001234567".into(),
            RequestWindow {
                started_at: now - Duration::minutes(61),
                count: 3,
            },
        );
        ReducerTest::new(TestReducer::new())
            .with_env(env(true))
            .given_state(state)
            .when_action(GuestAction::RegistrationChecked {
                correlation_id: Uuid::new_v4(),
                form: Box::new(form(Some("+573001234567"))),
                channel: None,
                existing: Ok(None),
            })
            .then_state(move |state| {
                let window = state.request_windows["+573001234567"];
                assert_eq!(window.count, 1);
                assert_eq!(window.started_at, now);
            })
            .run();
    }

    #[test]
    fn test_exhausted_attempts_lock_phone() {
        ReducerTest::new(TestReducer::new())
            .with_env(env(true))
            .given_state(GuestState::default())
            .when_action(GuestAction::OtpChecked {
                correlation_id: Uuid::new_v4(),
                document: "10203040".into(),
                phone: "+57 300 123 4567".into(),
                result: Ok(VerifyOutcome::Exhausted),
            })
            .then_state(|state| {
                let until = state.lockouts["+573001234567"];
                assert_eq!(until, test_clock().now() + Duration::minutes(30));
                assert_eq!(state.document_lockouts["10203040"], until);
            })
            .run();
    }

    #[test]
    fn test_locked_phone_cannot_verify() {
        let now = test_clock().now();
        let mut state = GuestState::default();
        state
            .lockouts
            .insert("+573001234567".into(), now + Duration::minutes(10));
        ReducerTest::new(TestReducer::new())
            .with_env(env(true))
            .given_state(state)
            .when_action(GuestAction::PendingLoaded {
                correlation_id: Uuid::new_v4(),
                document: "10203040".into(),
                intent: PendingIntent::Verify {
                    code_hash: hash_secret("123456"),
                },
                result: Ok(Some(pending("+573001234567"))),
            })
            .then_state(|state| {
                assert_eq!(state.lockouts.len(), 1);
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
            })
            .run();
    }

    #[test]
    fn test_locked_document_without_pending_code_stays_locked() {
        let now = test_clock().now();
        let mut state = GuestState::default();
        state
            .document_lockouts
            .insert("10203040".into(), now + Duration::minutes(10));
        ReducerTest::new(TestReducer::new())
            .with_env(env(true))
            .given_state(state)
            .when_action(GuestAction::PendingLoaded {
                correlation_id: Uuid::new_v4(),
                document: "10203040".into(),
                intent: PendingIntent::Verify {
                    code_hash: hash_secret("123456"),
                },
                result: Ok(None),
            })
            .then_state(move |state| {
                assert!(state.document_locked_for("10203040", now).is_some());
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
            })
            .run();
    }

    #[test]
    fn test_verify_rejects_non_numeric_code() {
        ReducerTest::new(TestReducer::new())
            .with_env(env(true))
            .given_state(GuestState::default())
            .when_action(GuestAction::VerifyOtp {
                correlation_id: Uuid::new_v4(),
                document: "10203040".into(),
                code: "12a456".into(),
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
            })
            .run();
    }

    #[test]
    fn test_terminal_actions_have_no_effects() {
        ReducerTest::new(TestReducer::new())
            .with_env(env(true))
            .given_state(GuestState::default())
            .when_action(GuestAction::LoggedOut {
                correlation_id: Uuid::new_v4(),
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_staleness_boundary() {
        let now = test_clock().now();
        let max_age = Duration::days(30);
        assert!(!is_stale(now - Duration::days(29), now, max_age));
        assert!(is_stale(now - Duration::days(30), now, max_age));
    }

    #[test]
    fn test_whole_seconds_floor_of_one() {
        assert_eq!(whole_seconds(Duration::milliseconds(200)), 1);
        assert_eq!(whole_seconds(Duration::seconds(-5)), 1);
        assert_eq!(whole_seconds(Duration::seconds(90)), 90);
    }
}
