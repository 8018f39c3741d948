//! Plan activation and cancellation, plus the state a plan form is driven by.

use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::Address;
use invest_intent_types::ChainId;

use super::{
    backend::{CancelRequest, SchedulerBackend},
    config::{cancellation_digest, plan_digest, PlanInput, RecurringPlanConfig, Trigger},
    schedule::Frequency,
    signer::{signature_to_hex, ConfigSigner},
};
use crate::{
    account::AccountInspector,
    amount::parse_decimal,
    errors::PlanError,
    registry::{Registry, Token},
};

/// Settings captured by the plan form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivateParams {
    pub chain: ChainId,
    pub token: Address,
    pub amount: String,
    pub max_fee: String,
    pub frequency: Frequency,
}

/// Amount and max fee must both be positive decimals.
pub fn validate_inputs(params: &ActivateParams) -> Result<(), PlanError> {
    let positive = |value: &str| parse_decimal(value).map(|l| !l.is_zero()).unwrap_or(false);
    if !positive(&params.amount) {
        return Err(PlanError::InvalidAmount(params.amount.clone()));
    }
    if !positive(&params.max_fee) {
        return Err(PlanError::InvalidMaxFee(params.max_fee.clone()));
    }
    Ok(())
}

/// Sign and submit a plan. Nothing reaches the backend if validation fails.
pub async fn activate<B, S>(
    backend: &B,
    signer: &S,
    params: &ActivateParams,
    created_at: u64,
) -> Result<RecurringPlanConfig, PlanError>
where
    B: SchedulerBackend + ?Sized,
    S: ConfigSigner + ?Sized,
{
    validate_inputs(params)?;

    let trigger = Trigger::cron(params.frequency);
    let input = PlanInput {
        chain_id: params.chain.id(),
        token: params.token,
        amount: params.amount.clone(),
        max_fee: params.max_fee.clone(),
    };
    let owner = signer.address();
    let signature = signer
        .sign_digest(plan_digest(owner, &trigger, &input, created_at))
        .await?;

    let config = RecurringPlanConfig {
        sig: signature_to_hex(&signature),
        signer: owner,
        trigger,
        input,
        created_at,
    };
    let stored = backend
        .submit_config(config)
        .await
        .map_err(PlanError::SubmissionFailure)?;

    tracing::info!(
        chain = params.chain.id(),
        %owner,
        frequency = %params.frequency,
        sig = %stored.sig,
        "plan activated"
    );
    Ok(stored)
}

/// Cancel `config`. The backend decides whether `signer` owns it.
pub async fn deactivate<B, S>(backend: &B, config: &RecurringPlanConfig, signer: &S) -> Result<(), PlanError>
where
    B: SchedulerBackend + ?Sized,
    S: ConfigSigner + ?Sized,
{
    let signature = signer
        .sign_digest(cancellation_digest(config.digest()))
        .await?;
    backend
        .cancel_config(CancelRequest {
            sig: config.sig.clone(),
            signature: signature_to_hex(&signature),
        })
        .await
        .map_err(PlanError::SubmissionFailure)?;

    tracing::info!(owner = %config.signer, sig = %config.sig, "plan deactivated");
    Ok(())
}

pub async fn find_current_config<B>(backend: &B, user: Address) -> Result<Option<RecurringPlanConfig>, PlanError>
where
    B: SchedulerBackend + ?Sized,
{
    backend.find_config_by_user(user).await.map_err(PlanError::Lookup)
}

/// Lifecycle of the signer's plan as seen by the controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlanState {
    Idle,
    Loading,
    Activated(RecurringPlanConfig),
    Deactivating(RecurringPlanConfig),
}

/// Drives activation and deactivation for one signer.
///
/// State only moves to `Activated` after the backend accepted the plan and
/// only back to `Idle` after a confirmed cancellation.
pub struct PlanController<B, S, A> {
    backend: B,
    signer: S,
    inspector: A,
    state: PlanState,
}

impl<B, S, A> PlanController<B, S, A>
where
    B: SchedulerBackend,
    S: ConfigSigner,
    A: AccountInspector,
{
    pub fn new(backend: B, signer: S, inspector: A) -> Self {
        Self {
            backend,
            signer,
            inspector,
            state: PlanState::Idle,
        }
    }

    pub fn state(&self) -> &PlanState {
        &self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn current_plan(&self) -> Option<&RecurringPlanConfig> {
        match &self.state {
            PlanState::Activated(config) | PlanState::Deactivating(config) => Some(config),
            PlanState::Idle | PlanState::Loading => None,
        }
    }

    fn ensure_settled(&self) -> Result<(), PlanError> {
        match self.state {
            PlanState::Loading => Err(PlanError::Busy("loading")),
            PlanState::Deactivating(_) => Err(PlanError::Busy("deactivating")),
            PlanState::Idle | PlanState::Activated(_) => Ok(()),
        }
    }

    /// Reload the signer's plan from the backend. A failed lookup clears it.
    pub async fn refresh(&mut self) -> Result<Option<RecurringPlanConfig>, PlanError> {
        self.ensure_settled()?;
        self.state = PlanState::Loading;

        match find_current_config(&self.backend, self.signer.address()).await {
            Ok(Some(config)) => {
                self.state = PlanState::Activated(config.clone());
                Ok(Some(config))
            }
            Ok(None) => {
                self.state = PlanState::Idle;
                Ok(None)
            }
            Err(err) => {
                tracing::warn!(owner = %self.signer.address(), "plan lookup failed: {err}");
                self.state = PlanState::Idle;
                Err(err)
            }
        }
    }

    pub async fn activate(&mut self, params: &ActivateParams) -> Result<RecurringPlanConfig, PlanError> {
        self.ensure_settled()?;
        if matches!(self.state, PlanState::Activated(_)) {
            return Err(PlanError::PlanAlreadyActive);
        }
        validate_inputs(params)?;

        let owner = self.signer.address();
        if !self.inspector.is_smart_account(params.chain, owner).await? {
            return Err(PlanError::NotSmartAccount(owner));
        }

        self.state = PlanState::Loading;
        match activate(&self.backend, &self.signer, params, unix_now()).await {
            Ok(config) => {
                self.state = PlanState::Activated(config.clone());
                Ok(config)
            }
            Err(err) => {
                self.state = PlanState::Idle;
                Err(err)
            }
        }
    }

    pub async fn deactivate(&mut self) -> Result<(), PlanError> {
        self.ensure_settled()?;
        let config = match &self.state {
            PlanState::Activated(config) => config.clone(),
            _ => return Err(PlanError::NoActivePlan),
        };

        self.state = PlanState::Deactivating(config.clone());
        match deactivate(&self.backend, &config, &self.signer).await {
            Ok(()) => {
                self.state = PlanState::Idle;
                Ok(())
            }
            Err(err) => {
                self.state = PlanState::Activated(config);
                Err(err)
            }
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Field values of the plan form.
///
/// `token` always belongs to `chain`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanForm {
    pub chain: ChainId,
    pub token: Token,
    pub amount: String,
    pub max_fee: String,
    pub frequency: Frequency,
}

impl PlanForm {
    /// Defaults to the first token on Base, daily.
    pub fn new(registry: &Registry) -> Option<Self> {
        let token = registry.tokens_for(ChainId::Base).next()?;
        Some(Self {
            chain: ChainId::Base,
            token,
            amount: String::new(),
            max_fee: String::new(),
            frequency: Frequency::Daily,
        })
    }

    /// Switch chains, resetting the token to the chain's first listed token.
    /// Chains without tokens are not selectable.
    pub fn select_chain(&mut self, registry: &Registry, chain: ChainId) -> bool {
        match registry.tokens_for(chain).next() {
            Some(token) => {
                self.chain = chain;
                self.token = token;
                true
            }
            None => false,
        }
    }

    /// Pre-fill the form from an existing plan.
    pub fn apply_config(&mut self, registry: &Registry, config: &RecurringPlanConfig) {
        if let Some(frequency) = config.frequency() {
            self.frequency = frequency;
        }
        self.amount = config.input.amount.clone();
        self.max_fee = config.input.max_fee.clone();

        if let Ok(chain) = ChainId::try_from(config.input.chain_id) {
            if self.select_chain(registry, chain) {
                if let Some(token) = registry.find_token(chain, config.input.token) {
                    self.token = token;
                }
            }
        }
    }

    pub fn clear_amounts(&mut self) {
        self.amount.clear();
        self.max_fee.clear();
    }

    pub fn params(&self) -> ActivateParams {
        ActivateParams {
            chain: self.chain,
            token: self.token.address,
            amount: self.amount.clone(),
            max_fee: self.max_fee.clone(),
            frequency: self.frequency,
        }
    }
}
