//! # Value Conservation Tests
//!
//! Fold long random call sequences through the ledger and check after
//! every call that custody still balances:
//!
//! ```text
//! escrowed == Σ deposits − Σ payouts
//! escrowed == Σ amount(orders holding funds) + stranded
//! escrowed + Σ credited == Σ deposits
//! ```

use std::thread;

use chrono::{DateTime, Duration, Utc};
use escrow_ledger::{EscrowLedger, SharedLedger};
use escrow_types::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

const KEYS: [&str; 8] = ["o0", "o1", "o2", "o3", "o4", "o5", "o6", "o7"];

fn oid(s: &str) -> OrderId {
    OrderId::new(s).unwrap()
}

struct World {
    verifier: Identity,
    parties: Vec<Identity>,
    t0: DateTime<Utc>,
    deposited: Decimal,
}

impl World {
    fn new() -> Self {
        Self {
            verifier: Identity::random(),
            parties: (0..4).map(|_| Identity::random()).collect(),
            t0: Utc::now(),
            deposited: Decimal::ZERO,
        }
    }

    fn party(&self, rng: &mut StdRng) -> Identity {
        self.parties[rng.gen_range(0..self.parties.len())]
    }

    fn credited_total(&self, ledger: &EscrowLedger) -> Decimal {
        self.parties
            .iter()
            .map(|p| ledger.treasury().credited(p))
            .sum()
    }

    /// One random call. Failures are expected and ignored; the point is
    /// that none of them disturbs the books.
    fn step(&mut self, ledger: &mut EscrowLedger, rng: &mut StdRng, clock: i64) {
        let key = KEYS[rng.gen_range(0..KEYS.len())];
        let id = oid(key);
        let now = self.t0 + Duration::seconds(clock);
        let verifier = CallContext::new(self.verifier, now);

        match rng.gen_range(0..6) {
            0 => {
                let depositor = self.party(rng);
                let recipient = self.party(rng);
                let value = Decimal::new(rng.gen_range(1..=500), 0);
                let expiry = now + Duration::seconds(rng.gen_range(1..=30));
                if ledger
                    .create_order(
                        CallContext::new(depositor, now),
                        key,
                        value,
                        expiry,
                        Some(recipient),
                    )
                    .is_ok()
                {
                    self.deposited += value;
                }
            }
            1 => {
                let _ = ledger.approve_order(verifier, &id);
            }
            2 => {
                let _ = ledger.reject_order(verifier, &id);
            }
            3 => {
                let _ = ledger.complete_order(verifier, &id, None);
            }
            4 => {
                let target = ledger
                    .order(&id)
                    .map_or_else(|| self.party(rng), |o| o.depositor);
                let _ = ledger.refund_order(verifier, &id, target);
            }
            _ => {
                let picks: Vec<OrderId> = (0..rng.gen_range(1..=4))
                    .map(|_| oid(KEYS[rng.gen_range(0..KEYS.len())]))
                    .collect();
                let targets: Vec<Identity> = picks
                    .iter()
                    .map(|id| match ledger.order(id) {
                        Some(o) if o.state == OrderState::Approved => {
                            o.recipient.unwrap_or(Identity::NULL)
                        }
                        Some(o) => o.depositor,
                        None => Identity::random(),
                    })
                    .collect();
                let _ = ledger.batch_withdraw_orders(verifier, &picks, &targets);
            }
        }
    }
}

fn assert_balanced(world: &World, ledger: &EscrowLedger) {
    ledger.verify_custody().unwrap();
    assert_eq!(
        ledger.treasury().escrowed() + world.credited_total(ledger),
        world.deposited,
        "value created or destroyed"
    );
    assert_eq!(ledger.conservation().total_deposits(), world.deposited);
}

fn random_walk(build: impl Fn(Identity) -> LedgerConfig, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut world = World::new();
    let mut ledger = EscrowLedger::new(build(world.verifier)).unwrap();

    let mut clock = 0;
    for _ in 0..400 {
        clock += rng.gen_range(0..4);
        world.step(&mut ledger, &mut rng, clock);
        assert_balanced(&world, &ledger);
    }
}

#[test]
fn random_calls_conserve_value() {
    for seed in 0..8 {
        random_walk(LedgerConfig::with_verifier, seed);
    }
}

#[test]
fn random_calls_conserve_value_in_legacy_modes() {
    for seed in 100..108 {
        random_walk(
            |verifier| LedgerConfig {
                duplicate_policy: DuplicateOrderPolicy::Overwrite,
                payout_routing: PayoutRouting::CallerSupplied,
                batch_mode: BatchMode::AllOrNothing,
                ..LedgerConfig::with_verifier(verifier)
            },
            seed,
        );
    }
}

#[test]
fn random_calls_conserve_value_with_open_policy() {
    for seed in 200..204 {
        random_walk(|_| LedgerConfig::default(), seed);
    }
}

#[test]
fn concurrent_callers_see_consistent_books() {
    let verifier = Identity::random();
    let ledger = EscrowLedger::new(LedgerConfig::with_verifier(verifier)).unwrap();
    let shared = SharedLedger::new(ledger);
    let t0 = Utc::now();
    let value = Decimal::new(10, 0);

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let shared = shared.clone();
            thread::spawn(move || {
                let depositor = Identity::random();
                let recipient = Identity::random();
                for n in 0..25 {
                    let key = format!("w{worker}-{n}");
                    let id = oid(&key);
                    shared
                        .with_write(|l| {
                            l.create_order(
                                CallContext::new(depositor, t0),
                                &key,
                                value,
                                t0 + Duration::hours(1),
                                Some(recipient),
                            )
                        })
                        .unwrap();
                    shared
                        .with_write(|l| {
                            l.approve_order(CallContext::new(verifier, t0), &id)?;
                            l.complete_order(CallContext::new(verifier, t0), &id, None)
                        })
                        .unwrap();
                    shared.read().unwrap().verify_custody().unwrap();
                }
                recipient
            })
        })
        .collect();

    let recipients: Vec<Identity> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let ledger = shared.read().unwrap();
    assert_eq!(ledger.order_count(), 100);
    assert_eq!(ledger.events().len(), 300);
    assert_eq!(ledger.treasury().escrowed(), Decimal::ZERO);
    for r in recipients {
        assert_eq!(ledger.treasury().credited(&r), Decimal::new(250, 0));
    }
    assert!(ledger.verify_custody().is_ok());
}
