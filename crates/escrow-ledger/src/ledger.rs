//! Escrow ledger: the order lifecycle state machine.
//!
//! The `EscrowLedger` owns the order store and drives every transition,
//! together with the single value transfer that accompanies each terminal
//! one.
//!
//! ## Atomic Units
//!
//! Every mutating call is one unit: either all of its effects land or none
//! do. Inside a payout unit the effects run in a fixed order:
//!
//! 1. Validate (existence, caller, state, expiry, payout party)
//! 2. Write the terminal state to the store
//! 3. Mark the record in the [`PayoutGuard`]
//! 4. Release value from the [`Treasury`]
//! 5. Append the event
//!
//! The state is written before value leaves custody. If the release fails,
//! steps 2 and 3 are undone and the call fails.

use chrono::{DateTime, Utc};
use escrow_custody::{CustodyConservation, CustodyVault, PayoutGuard, Treasury};
use escrow_types::{
    constants, Action, Amount, BatchMode, CallContext, DuplicateOrderPolicy, EscrowError,
    EventKind, Identity, LedgerConfig, LedgerEvent, Order, OrderId, OrderState, PayoutRouting,
    RecipientMode, Result,
};
use rust_decimal::Decimal;

use crate::authorization::{policy_for, AuthorizationPolicy};
use crate::batch::{BatchEntryOutcome, BatchReport, SkipReason};
use crate::event_log::EventLog;
use crate::store::{InMemoryOrderStore, OrderStore};

/// Which terminal edge a payout takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PayoutPath {
    Complete,
    Refund,
}

/// Result of one batch entry that did not fail.
enum EntryStep {
    Settled(BatchEntryOutcome, CommittedPayout),
    Skipped(SkipReason),
}

/// A payout that has been committed, kept so an all-or-nothing batch can
/// undo it.
#[derive(Debug)]
struct CommittedPayout {
    previous: Order,
    target: Identity,
    amount: Amount,
}

/// The custodial escrow ledger.
pub struct EscrowLedger {
    config: LedgerConfig,
    policy: Box<dyn AuthorizationPolicy>,
    store: Box<dyn OrderStore>,
    treasury: Box<dyn Treasury>,
    guard: PayoutGuard,
    conservation: CustodyConservation,
    events: EventLog,
    /// Creation sequence for the next order record.
    next_nonce: u64,
}

impl std::fmt::Debug for EscrowLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscrowLedger")
            .field("config", &self.config)
            .field("policy", &self.policy.name())
            .field("orders", &self.store.len())
            .field("escrowed", &self.treasury.escrowed())
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl EscrowLedger {
    /// A ledger with in-memory storage and custody.
    ///
    /// # Errors
    /// Returns `Configuration` if `config` fails validation.
    pub fn new(config: LedgerConfig) -> Result<Self> {
        Self::with_parts(
            config,
            Box::new(InMemoryOrderStore::new()),
            Box::new(CustodyVault::new()),
        )
    }

    /// A ledger over caller-provided storage and custody backends.
    ///
    /// # Errors
    /// Returns `Configuration` if `config` fails validation.
    pub fn with_parts(
        config: LedgerConfig,
        store: Box<dyn OrderStore>,
        treasury: Box<dyn Treasury>,
    ) -> Result<Self> {
        config.validate()?;
        let policy = policy_for(config.authorization);
        tracing::info!(
            engine = constants::ENGINE_NAME,
            version = constants::VERSION,
            policy = policy.name(),
            recipient_mode = ?config.recipient_mode,
            duplicate_policy = ?config.duplicate_policy,
            payout_routing = ?config.payout_routing,
            batch_mode = ?config.batch_mode,
            "Escrow ledger initialized"
        );
        Ok(Self {
            config,
            policy,
            store,
            treasury,
            guard: PayoutGuard::new(),
            conservation: CustodyConservation::new(),
            events: EventLog::new(),
            next_nonce: 0,
        })
    }

    /// Replace the authorization policy derived from the configuration.
    #[must_use]
    pub fn with_policy(mut self, policy: Box<dyn AuthorizationPolicy>) -> Self {
        self.policy = policy;
        self
    }

    // ─── Mutating operations ────────────────────────────────────────────

    /// Escrow `value` from the caller under a new order at `id`.
    ///
    /// In `FixedAtCreation` mode `recipient` is required; in
    /// `SuppliedAtCompletion` mode it is ignored.
    ///
    /// # Errors
    /// `EmptyOrderId`, `ZeroValue`/`InvalidAmount`, `ExpiryNotInFuture`,
    /// `NullIdentity`, `DuplicateOrder`, or the treasury's escrow error.
    pub fn create_order(
        &mut self,
        ctx: CallContext,
        id: &str,
        value: Decimal,
        expiry: DateTime<Utc>,
        recipient: Option<Identity>,
    ) -> Result<()> {
        let id = OrderId::new(id)?;
        let amount = Amount::new(value)?;
        if expiry <= ctx.at {
            return Err(EscrowError::ExpiryNotInFuture {
                expiry,
                now: ctx.at,
            });
        }
        self.policy.authorize(&ctx.caller, Action::Create)?;

        let depositor = ctx.caller;
        if depositor.is_null() {
            return Err(EscrowError::NullIdentity { role: "depositor" });
        }
        let recipient = match self.config.recipient_mode {
            RecipientMode::FixedAtCreation => match recipient {
                Some(r) if !r.is_null() => Some(r),
                _ => return Err(EscrowError::NullIdentity { role: "recipient" }),
            },
            RecipientMode::SuppliedAtCompletion => None,
        };

        let existing = self.store.find(&id);
        if existing.is_some() && self.config.duplicate_policy == DuplicateOrderPolicy::Reject {
            return Err(EscrowError::DuplicateOrder(id));
        }

        let order = Order::new(
            id.clone(),
            amount,
            expiry,
            recipient,
            depositor,
            self.next_nonce,
            ctx.at,
        );
        let replaced = self.store.put(order.clone());
        let escrowed = self
            .conservation
            .record_deposit(amount.value())
            .and_then(|()| {
                self.treasury.escrow(depositor, amount).inspect_err(|_| {
                    self.conservation.reverse_deposit(amount.value());
                })
            });
        if let Err(e) = escrowed {
            match replaced {
                Some(previous) => {
                    self.store.put(previous);
                }
                None => {
                    self.store.remove(&id);
                }
            }
            tracing::warn!(order_id = %id, error = %e, "Deposit refused, creation undone");
            return Err(e);
        }
        self.next_nonce += 1;

        if let Some(clobbered) = existing {
            let stranded = if clobbered.state.holds_funds() {
                clobbered.amount.value()
            } else {
                Decimal::ZERO
            };
            self.conservation.record_stranded(stranded);
            tracing::warn!(
                order_id = %id,
                clobbered_state = %clobbered.state,
                clobbered_nonce = clobbered.nonce,
                stranded = %stranded,
                "Legacy overwrite replaced an existing order record"
            );
        }

        self.events.append(
            &order,
            ctx.caller,
            EventKind::Created {
                amount,
                expiry,
                recipient,
                depositor,
            },
            ctx.at,
        );
        tracing::info!(
            order_id = %id,
            amount = %amount,
            expiry = %expiry,
            depositor = %depositor,
            nonce = order.nonce,
            "Order created"
        );
        Ok(())
    }

    /// `Created → Approved`. Expiry is not checked.
    ///
    /// # Errors
    /// `OrderNotFound`, `Unauthorized`, `InvalidTransition`.
    pub fn approve_order(&mut self, ctx: CallContext, id: &OrderId) -> Result<()> {
        let mut order = self.load(id)?;
        self.policy.authorize(&ctx.caller, Action::Approve)?;
        order.mark_approved()?;
        self.commit_review(ctx, order, EventKind::Approved);
        Ok(())
    }

    /// `Created → Rejected`. The value stays in custody; only the batch
    /// path can release it.
    ///
    /// # Errors
    /// `OrderNotFound`, `Unauthorized`, `InvalidTransition`.
    pub fn reject_order(&mut self, ctx: CallContext, id: &OrderId) -> Result<()> {
        let mut order = self.load(id)?;
        self.policy.authorize(&ctx.caller, Action::Reject)?;
        order.mark_rejected()?;
        self.commit_review(ctx, order, EventKind::Rejected);
        Ok(())
    }

    /// `Approved → Completed`, paying the recipient.
    ///
    /// # Errors
    /// `OrderNotFound`, `Unauthorized`, `InvalidTransition`, `OrderExpired`,
    /// `NullIdentity`, `PayoutTargetMismatch`, or the treasury's release
    /// error (the order is left `Approved`).
    pub fn complete_order(
        &mut self,
        ctx: CallContext,
        id: &OrderId,
        recipient: Option<Identity>,
    ) -> Result<()> {
        let order = self.load(id)?;
        self.policy.authorize(&ctx.caller, Action::Complete)?;
        ensure_state(&order, OrderState::Approved, OrderState::Completed)?;
        if order.is_expired_at(ctx.at) {
            return Err(EscrowError::OrderExpired(order.id));
        }
        let target = self.resolve_recipient(&order, recipient)?;
        self.settle(ctx, order, PayoutPath::Complete, target)?;
        Ok(())
    }

    /// `Created → Refunded` once expired, paying the depositor.
    ///
    /// # Errors
    /// `OrderNotFound`, `Unauthorized`, `InvalidTransition`,
    /// `OrderNotExpired`, `NullIdentity`, `PayoutTargetMismatch`, or the
    /// treasury's release error (the order is left `Created`).
    pub fn refund_order(
        &mut self,
        ctx: CallContext,
        id: &OrderId,
        depositor: Identity,
    ) -> Result<()> {
        let order = self.load(id)?;
        self.policy.authorize(&ctx.caller, Action::Refund)?;
        ensure_state(&order, OrderState::Created, OrderState::Refunded)?;
        if !order.is_expired_at(ctx.at) {
            return Err(EscrowError::OrderNotExpired(order.id));
        }
        let target = self.resolve_refund_target(&order, depositor)?;
        self.settle(ctx, order, PayoutPath::Refund, target)?;
        Ok(())
    }

    /// Fold many orders through the payout rules in one call.
    ///
    /// Per entry, in input order:
    /// - `Approved` and unexpired: pay `target`, `→ Completed`
    /// - `Created` and expired, or `Rejected`: pay `target`, `→ Refunded`
    /// - anything else, unknown ids included: skipped
    ///
    /// Targets follow the same routing rules as the single-order calls.
    ///
    /// # Errors
    /// `BatchLengthMismatch`, `BatchTooLarge`, `Unauthorized`. In
    /// `AllOrNothing` mode, the first failing entry's error, after every
    /// entry committed earlier in the call has been rolled back.
    pub fn batch_withdraw_orders(
        &mut self,
        ctx: CallContext,
        ids: &[OrderId],
        targets: &[Identity],
    ) -> Result<BatchReport> {
        if ids.len() != targets.len() {
            return Err(EscrowError::BatchLengthMismatch {
                ids: ids.len(),
                targets: targets.len(),
            });
        }
        if ids.len() > self.config.max_batch_size {
            return Err(EscrowError::BatchTooLarge {
                size: ids.len(),
                max: self.config.max_batch_size,
            });
        }
        self.policy.authorize(&ctx.caller, Action::BatchWithdraw)?;

        let event_mark = self.events.len();
        let mut committed = Vec::new();
        let mut report = BatchReport::with_capacity(ids.len());

        for (id, &target) in ids.iter().zip(targets) {
            let outcome = match self.withdraw_entry(ctx, id, target) {
                Ok(EntryStep::Settled(outcome, payout)) => {
                    committed.push(payout);
                    outcome
                }
                Ok(EntryStep::Skipped(reason)) => {
                    tracing::debug!(order_id = %id, reason = %reason, "Batch entry skipped");
                    BatchEntryOutcome::Skipped { reason }
                }
                Err(error) => {
                    if self.config.batch_mode == BatchMode::AllOrNothing {
                        tracing::warn!(
                            order_id = %id,
                            error = %error,
                            rolled_back = committed.len(),
                            "Batch aborted, rolling back"
                        );
                        self.unwind(committed, event_mark)?;
                        return Err(error);
                    }
                    tracing::warn!(order_id = %id, error = %error, "Batch entry failed");
                    BatchEntryOutcome::Failed { error }
                }
            };
            report.push(id.clone(), target, outcome);
        }

        tracing::info!(
            entries = report.len(),
            completed = report.completed(),
            refunded = report.refunded(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Batch withdrawal complete"
        );
        Ok(report)
    }

    // ─── Queries ────────────────────────────────────────────────────────

    /// # Errors
    /// `OrderNotFound` if nothing is addressable at `id`.
    pub fn get_order_state(&self, id: &OrderId) -> Result<OrderState> {
        self.load(id).map(|order| order.state)
    }

    /// States for `ids`, in input order.
    ///
    /// # Errors
    /// `OrderNotFound` for the first absent id; no partial result.
    pub fn get_order_states(&self, ids: &[OrderId]) -> Result<Vec<OrderState>> {
        ids.iter().map(|id| self.get_order_state(id)).collect()
    }

    /// The full record at `id`, if addressable.
    #[must_use]
    pub fn order(&self, id: &OrderId) -> Option<Order> {
        self.store.find(id)
    }

    #[must_use]
    pub fn order_count(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn events(&self) -> &[LedgerEvent] {
        self.events.events()
    }

    #[must_use]
    pub fn events_for(&self, id: &OrderId) -> Vec<&LedgerEvent> {
        self.events.events_for(id)
    }

    #[must_use]
    pub fn event_log(&self) -> &EventLog {
        &self.events
    }

    #[must_use]
    pub fn treasury(&self) -> &dyn Treasury {
        self.treasury.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    #[must_use]
    pub fn conservation(&self) -> &CustodyConservation {
        &self.conservation
    }

    #[must_use]
    pub fn payout_guard(&self) -> &PayoutGuard {
        &self.guard
    }

    /// Check that custody matches the books and the event chain is intact.
    ///
    /// # Errors
    /// `CustodyInvariantViolation` or an `Internal` event-chain error.
    pub fn verify_custody(&self) -> Result<()> {
        let live: Decimal = self
            .store
            .all()
            .iter()
            .filter(|order| order.state.holds_funds())
            .map(|order| order.amount.value())
            .sum();
        if let Err(e) = self.conservation.verify(self.treasury.escrowed(), live) {
            tracing::error!(error = %e, "Custody check failed");
            return Err(e);
        }
        self.events.verify_chain()
    }

    // ─── Internals ──────────────────────────────────────────────────────

    fn load(&self, id: &OrderId) -> Result<Order> {
        self.store
            .find(id)
            .ok_or_else(|| EscrowError::OrderNotFound(id.clone()))
    }

    /// Store an approve/reject transition and log it. No value moves.
    fn commit_review(&mut self, ctx: CallContext, order: Order, kind: EventKind) {
        self.store.put(order.clone());
        self.events.append(&order, ctx.caller, kind, ctx.at);
        tracing::info!(
            order_id = %order.id,
            state = %order.state,
            caller = %ctx.caller,
            "Order reviewed"
        );
    }

    /// The party a completion pays.
    fn resolve_recipient(&self, order: &Order, supplied: Option<Identity>) -> Result<Identity> {
        match self.config.recipient_mode {
            RecipientMode::FixedAtCreation => {
                let recorded = order
                    .recipient
                    .ok_or(EscrowError::NullIdentity { role: "recipient" })?;
                match supplied {
                    Some(s) if s != recorded => {
                        tracing::warn!(
                            order_id = %order.id,
                            supplied = %s,
                            recorded = %recorded,
                            "Completion target does not match recorded recipient"
                        );
                        Err(EscrowError::PayoutTargetMismatch {
                            supplied: s,
                            recorded,
                        })
                    }
                    _ => Ok(recorded),
                }
            }
            RecipientMode::SuppliedAtCompletion => supplied
                .filter(|r| !r.is_null())
                .ok_or(EscrowError::NullIdentity { role: "recipient" }),
        }
    }

    /// The party a refund pays.
    fn resolve_refund_target(&self, order: &Order, supplied: Identity) -> Result<Identity> {
        match self.config.payout_routing {
            PayoutRouting::RecordedDepositor => {
                if supplied != order.depositor {
                    tracing::warn!(
                        order_id = %order.id,
                        supplied = %supplied,
                        recorded = %order.depositor,
                        "Refund target does not match recorded depositor"
                    );
                    return Err(EscrowError::PayoutTargetMismatch {
                        supplied,
                        recorded: order.depositor,
                    });
                }
                Ok(order.depositor)
            }
            PayoutRouting::CallerSupplied => {
                if supplied.is_null() {
                    return Err(EscrowError::NullIdentity { role: "depositor" });
                }
                Ok(supplied)
            }
        }
    }

    /// Move `order` into its terminal state and pay `target`.
    ///
    /// On failure the store and guard are exactly as they were.
    fn settle(
        &mut self,
        ctx: CallContext,
        order: Order,
        path: PayoutPath,
        target: Identity,
    ) -> Result<CommittedPayout> {
        let amount = order.amount;
        let mut next = order.clone();
        let kind = match path {
            PayoutPath::Complete => {
                next.mark_completed(target, ctx.at)?;
                EventKind::Completed {
                    recipient: target,
                    amount,
                }
            }
            PayoutPath::Refund => {
                next.mark_refunded(target, ctx.at)?;
                EventKind::Refunded {
                    depositor: target,
                    amount,
                }
            }
        };

        self.store.put(next.clone());
        if let Err(e) = self.guard.mark_paid(&next.id, next.nonce) {
            self.store.put(order);
            return Err(e);
        }
        let released = self
            .conservation
            .record_payout(amount.value())
            .and_then(|()| {
                self.treasury.release(target, amount).inspect_err(|_| {
                    self.conservation.reverse_payout(amount.value());
                })
            });
        if let Err(e) = released {
            self.guard.unmark(next.nonce);
            self.store.put(order);
            tracing::warn!(
                order_id = %next.id,
                to = %target,
                error = %e,
                "Payout failed, order restored"
            );
            return Err(e);
        }
        self.events.append(&next, ctx.caller, kind, ctx.at);

        tracing::info!(
            order_id = %next.id,
            state = %next.state,
            to = %target,
            amount = %amount,
            "Order settled"
        );
        Ok(CommittedPayout {
            previous: order,
            target,
            amount,
        })
    }

    /// One batch entry. An `Err` is an entry failure; nothing changed.
    fn withdraw_entry(
        &mut self,
        ctx: CallContext,
        id: &OrderId,
        target: Identity,
    ) -> Result<EntryStep> {
        let Some(order) = self.store.find(id) else {
            return Ok(EntryStep::Skipped(SkipReason::UnknownOrder));
        };
        let expired = order.is_expired_at(ctx.at);
        let path = match order.state {
            OrderState::Approved if !expired => PayoutPath::Complete,
            OrderState::Created if expired => PayoutPath::Refund,
            OrderState::Rejected => PayoutPath::Refund,
            state => return Ok(EntryStep::Skipped(SkipReason::NotEligible { state, expired })),
        };

        let step = match path {
            PayoutPath::Complete => {
                let recipient = self.resolve_recipient(&order, Some(target))?;
                let payout = self.settle(ctx, order, path, recipient)?;
                let outcome = BatchEntryOutcome::Completed {
                    recipient,
                    amount: payout.amount,
                };
                EntryStep::Settled(outcome, payout)
            }
            PayoutPath::Refund => {
                let depositor = self.resolve_refund_target(&order, target)?;
                let payout = self.settle(ctx, order, path, depositor)?;
                let outcome = BatchEntryOutcome::Refunded {
                    depositor,
                    amount: payout.amount,
                };
                EntryStep::Settled(outcome, payout)
            }
        };
        Ok(step)
    }

    /// Roll back payouts committed earlier in this call, newest first.
    ///
    /// Each committed payout appended exactly one event after `event_mark`.
    /// If a reversal fails, the payouts not yet unwound stay committed and
    /// the log keeps exactly their events.
    fn unwind(&mut self, mut committed: Vec<CommittedPayout>, event_mark: usize) -> Result<()> {
        while let Some(payout) = committed.pop() {
            if let Err(e) = self.treasury.reverse_release(payout.target, payout.amount) {
                committed.push(payout);
                self.events.truncate(event_mark + committed.len());
                let still_committed: Vec<String> = committed
                    .iter()
                    .map(|p| p.previous.id.to_string())
                    .collect();
                tracing::error!(
                    error = %e,
                    still_committed = ?still_committed,
                    "Batch rollback stopped; remaining payouts stay committed"
                );
                return Err(e);
            }
            self.conservation.reverse_payout(payout.amount.value());
            self.guard.unmark(payout.previous.nonce);
            self.store.put(payout.previous);
        }
        self.events.truncate(event_mark);
        Ok(())
    }
}

/// Fail with `InvalidTransition` unless `order` is in `required`.
fn ensure_state(order: &Order, required: OrderState, target: OrderState) -> Result<()> {
    if order.state != required {
        return Err(EscrowError::InvalidTransition {
            id: order.id.clone(),
            from: order.state,
            to: target,
        });
    }
    Ok(())
}
