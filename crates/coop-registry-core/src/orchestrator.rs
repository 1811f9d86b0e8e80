use std::time::Duration;

use tracing::info;

use crate::builder::{BuilderConfig, TxBuilder};
use crate::capability::CapabilityAdapter;
use crate::confirm::{CancelToken, ConfirmationOutcome, ConfirmationTracker, TrackerConfig};
use crate::domain::{
    Address, KeyHash, Member, MemberStatus, OutputRef, RegistryAction, RegistryState,
    SubmissionStatus, SubmittedTransaction, TimestampMs, ValidatorRef,
};
use crate::error::{classify, Phase, RegistryError};
use crate::ports::{ClockPort, LedgerPort, WalletPort};
use crate::state_machine::{submission_transition, StateTransition, SubmissionAction};
use crate::submit::Submitter;
use crate::tx::UnsignedTx;

#[derive(Debug, Clone)]
pub enum RegistryCommand {
    CreateEntity {
        founder: Address,
        name: String,
        description: String,
    },
    AddMember {
        signer: Address,
        registry: OutputRef,
        member: Member,
    },
    UpdateMemberStatus {
        signer: Address,
        registry: OutputRef,
        key: KeyHash,
        status: MemberStatus,
    },
    AddAdmin {
        signer: Address,
        registry: OutputRef,
        key: KeyHash,
    },
    RemoveAdmin {
        signer: Address,
        registry: OutputRef,
        key: KeyHash,
    },
}

impl RegistryCommand {
    fn into_action(self) -> Option<(Address, OutputRef, RegistryAction)> {
        match self {
            RegistryCommand::CreateEntity { .. } => None,
            RegistryCommand::AddMember {
                signer,
                registry,
                member,
            } => Some((signer, registry, RegistryAction::AddMember { member })),
            RegistryCommand::UpdateMemberStatus {
                signer,
                registry,
                key,
                status,
            } => Some((
                signer,
                registry,
                RegistryAction::UpdateMemberStatus { key, status },
            )),
            RegistryCommand::AddAdmin {
                signer,
                registry,
                key,
            } => Some((signer, registry, RegistryAction::AddAdmin { key })),
            RegistryCommand::RemoveAdmin {
                signer,
                registry,
                key,
            } => Some((signer, registry, RegistryAction::RemoveAdmin { key })),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub submission: SubmittedTransaction,
    /// Where the registry lives once the transaction lands.
    pub registry: OutputRef,
    pub state: RegistryState,
    /// How the confirmation wait ended; `None` when nobody waited.
    pub outcome: Option<ConfirmationOutcome>,
}

pub struct RegistryClient<W, L, C>
where
    W: WalletPort,
    L: LedgerPort,
    C: ClockPort,
{
    capability: CapabilityAdapter<W, L>,
    clock: C,
    validator: ValidatorRef,
    builder_config: BuilderConfig,
    tracker_config: TrackerConfig,
}

impl<W, L, C> RegistryClient<W, L, C>
where
    W: WalletPort,
    L: LedgerPort,
    C: ClockPort,
{
    pub fn new(wallet: W, ledger: L, clock: C, validator: ValidatorRef) -> Self {
        Self {
            capability: CapabilityAdapter::new(wallet, ledger),
            clock,
            validator,
            builder_config: BuilderConfig::default(),
            tracker_config: TrackerConfig::default(),
        }
    }

    pub fn with_builder_config(mut self, config: BuilderConfig) -> Self {
        self.builder_config = config;
        self
    }

    pub fn with_tracker_config(mut self, config: TrackerConfig) -> Self {
        self.tracker_config = config;
        self
    }

    pub fn capability(&self) -> &CapabilityAdapter<W, L> {
        &self.capability
    }

    pub fn validator(&self) -> &ValidatorRef {
        &self.validator
    }

    pub async fn build(&self, command: RegistryCommand) -> Result<UnsignedTx, RegistryError> {
        let builder = TxBuilder::new(&self.capability, &self.clock, &self.validator)
            .with_config(self.builder_config);
        if let RegistryCommand::CreateEntity {
            founder,
            name,
            description,
        } = &command
        {
            return builder
                .build_create_entity_tx(founder, name, description)
                .await;
        }
        match command.into_action() {
            Some((signer, registry, action)) => {
                builder.build_action_tx(&signer, registry, action).await
            }
            None => Err(RegistryError::InvalidAction(
                "command carries no registry action".to_owned(),
            )),
        }
    }

    pub async fn submit(&self, tx: &UnsignedTx) -> Result<SubmittedTransaction, RegistryError> {
        let submitted_at = self.now()?;
        let id = Submitter::new(&self.capability).sign_and_submit(tx).await?;
        Ok(SubmittedTransaction {
            id,
            submitted_at,
            status: SubmissionStatus::Submitted,
        })
    }

    /// Build, sign and submit without waiting for confirmation.
    pub async fn handle(&self, command: RegistryCommand) -> Result<CommandResult, RegistryError> {
        let tx = self.build(command).await?;
        let submission = self.submit(&tx).await?;
        info!(
            action = tx.action.label(),
            tx_id = %submission.id,
            "registry command submitted"
        );
        Ok(CommandResult {
            registry: OutputRef::new(submission.id, tx.registry_output as u32),
            submission,
            state: tx.state,
            outcome: None,
        })
    }

    /// Moves `submission` to `Confirmed` or `TimedOut`; a cancelled wait leaves
    /// it `Submitted`.
    pub async fn await_confirmation(
        &self,
        submission: &mut SubmittedTransaction,
        timeout: Duration,
        cancel: CancelToken,
    ) -> Result<(ConfirmationOutcome, Option<StateTransition>), RegistryError> {
        let outcome = ConfirmationTracker::new(self.capability.ledger(), self.tracker_config)
            .await_confirmation(&submission.id, timeout, cancel)
            .await?;
        let action = match outcome {
            ConfirmationOutcome::Confirmed { .. } => SubmissionAction::Confirm,
            ConfirmationOutcome::TimedOut => SubmissionAction::Timeout,
            ConfirmationOutcome::Cancelled => return Ok((outcome, None)),
        };
        let (status, transition) = submission_transition(submission.status, action)
            .map_err(|e| RegistryError::InvalidAction(e.to_string()))?;
        submission.status = status;
        info!(
            tx_id = %submission.id,
            from = ?transition.from,
            to = ?transition.to,
            reason = transition.reason,
            "submission transition"
        );
        Ok((outcome, Some(transition)))
    }

    /// `handle` followed by `await_confirmation`; a timeout surfaces as
    /// [`RegistryError::TimedOut`]. A cancelled wait returns the result with
    /// `outcome` set to `Cancelled` and the submission still `Submitted`.
    pub async fn handle_and_confirm(
        &self,
        command: RegistryCommand,
        timeout: Duration,
        cancel: CancelToken,
    ) -> Result<CommandResult, RegistryError> {
        let mut result = self.handle(command).await?;
        let (outcome, _) = self
            .await_confirmation(&mut result.submission, timeout, cancel)
            .await?;
        if outcome == ConfirmationOutcome::TimedOut {
            return Err(RegistryError::TimedOut(result.submission.id));
        }
        result.outcome = Some(outcome);
        Ok(result)
    }

    /// Current registry datum, read from the ledger.
    pub async fn registry_state(&self, registry: OutputRef) -> Result<RegistryState, RegistryError> {
        let output = self
            .capability
            .ledger_outputs_at(&self.validator.address)
            .await?
            .into_iter()
            .find(|u| u.reference == registry)
            .ok_or_else(|| {
                RegistryError::InvalidAction(format!("registry output {registry} is not unspent"))
            })?;
        output.registry_state()?.ok_or_else(|| {
            RegistryError::Encoding(format!("registry output {registry} carries no inline datum"))
        })
    }

    fn now(&self) -> Result<TimestampMs, RegistryError> {
        self.clock
            .now_ms()
            .map(TimestampMs)
            .map_err(|e| classify(Phase::Read, e))
    }
}
