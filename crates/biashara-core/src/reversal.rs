//! # Reversal Handler
//!
//! Produces the compensating `EventReversed` payloads for an event, after
//! checking that undoing it cannot break anything recorded later.
//!
//! ## Checks (in order)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reverse(target, reason)                                                │
//! │    ├── unknown id                     → NotFound                        │
//! │    ├── target is an EventReversed     → Validation                      │
//! │    ├── target already reversed        → AlreadyReversed                 │
//! │    ├── a live event references it     → DependentEventExists            │
//! │    │   (payment, approval, disposal, VAT fix, stock move, payroll...)   │
//! │    ├── undo would drive stock < 0     → DependentEventExists            │
//! │    │   (names the latest event that consumed that stock)                │
//! │    ├── undo would drive a loan < 0    → DependentEventExists            │
//! │    │   (names the latest repayment to that lender)                      │
//! │    └── OK → EventReversed { target, reason }                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A VAT correction and the VAT reversal appended with it are undone
//! together: reversing the correction yields two `EventReversed`, the
//! correction first. The reversal half on its own is held by its
//! correction like any other dependent.
//!
//! The projector applies the exact inverse of the delta recorded for the
//! target, so reversing a payment restores the outstanding amount and
//! reversing a sale returns both stock and cash.

use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::event::{EventId, EventKind};
use crate::money::Money;
use crate::projection::ProjectedState;
use crate::types::{Location, ProductId};
use crate::validation::validate_name;

/// Validates that `target` can be reversed and returns the compensating
/// payloads, in the order they must be appended.
pub fn reverse(state: &ProjectedState, target: EventId, reason: &str) -> CoreResult<Vec<EventKind>> {
    validate_name("reason", reason)?;
    let reason = reason.trim();

    check(state, target, None)?;
    let mut kinds = vec![EventKind::EventReversed {
        target,
        reason: reason.to_string(),
    }];

    if let Some(paired) = state.vat_reversal_paired_with(target) {
        check(state, paired, Some(target))?;
        kinds.push(EventKind::EventReversed {
            target: paired,
            reason: reason.to_string(),
        });
    }
    Ok(kinds)
}

/// `released` is a dependent that is being reversed in the same batch.
fn check(state: &ProjectedState, target: EventId, released: Option<EventId>) -> CoreResult<()> {
    let applied = state
        .applied_delta(target)
        .ok_or_else(|| CoreError::not_found("event", target))?;

    if state.is_reversal(target) {
        return Err(ValidationError::NotAllowed {
            field: "event".to_string(),
            allowed: vec!["any event other than a reversal".to_string()],
        }
        .into());
    }

    if state.is_reversed(target) {
        return Err(CoreError::AlreadyReversed(target));
    }

    if let Some(dependent_id) = state
        .dependents(target)
        .find(|dependent| Some(*dependent) != released)
    {
        return Err(CoreError::DependentEventExists {
            event_id: target,
            dependent_id,
        });
    }

    // Net stock change of the undo, per product and location.
    let mut undo: BTreeMap<(&ProductId, &Location), i64> = BTreeMap::new();
    for (product, location, quantity) in applied.stock_moves() {
        *undo.entry((product, location)).or_insert(0) -= quantity;
    }
    for ((product, location), change) in undo {
        if change < 0 && state.available_stock(product, location) + change < 0 {
            let dependent_id = state
                .latest_stock_consumer(target, product, location)
                .ok_or_else(|| {
                    CoreError::CorruptLog(format!(
                        "stock of {} at {} is short with no consuming event",
                        product, location
                    ))
                })?;
            return Err(CoreError::DependentEventExists {
                event_id: target,
                dependent_id,
            });
        }
    }

    // Same for loan principal, per lender.
    let mut undo: BTreeMap<&str, Money> = BTreeMap::new();
    for (lender, amount) in applied.loan_moves() {
        let entry = undo.entry(lender).or_default();
        *entry = *entry - amount;
    }
    for (lender, change) in undo {
        if change.is_negative() && (state.loan_balance(lender) + change).is_negative() {
            let dependent_id = state
                .latest_loan_repayment(target, lender)
                .ok_or_else(|| {
                    CoreError::CorruptLog(format!(
                        "loan from {} is short with no repayment",
                        lender
                    ))
                })?;
            return Err(CoreError::DependentEventExists {
                event_id: target,
                dependent_id,
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{handle, Command, CommandEnvelope};
    use crate::event::Event;
    use crate::log::EventLog;
    use crate::money::Money;
    use crate::projection::project;
    use crate::types::{ObligationStatus, PaymentMethod, Rate, ShopId};
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 10).unwrap()
    }

    fn mchele() -> ProductId {
        ProductId::new("mchele")
    }

    fn run(log: &mut EventLog, state: &mut ProjectedState, command: Command) -> CoreResult<EventId> {
        let drafts = handle(&CommandEnvelope::new(day(), command), state)?;
        let ids = log.append_all(drafts)?;
        for id in &ids {
            let event: Event = log.get(*id).unwrap().clone();
            state.apply(&event)?;
        }
        Ok(ids[0])
    }

    fn setup() -> (EventLog, ProjectedState, EventId) {
        let mut log = EventLog::new();
        let mut state = ProjectedState::new();
        run(
            &mut log,
            &mut state,
            Command::ListProduct {
                product_id: mchele(),
                name: "Mchele 1kg".to_string(),
                selling_price: Money::from_major(3_000),
                cost_price: Money::from_major(2_200),
                vat_rate: Rate::from_bps(1800),
            },
        )
        .unwrap();
        let receipt = run(
            &mut log,
            &mut state,
            Command::ReceiveStock {
                product_id: mchele(),
                quantity: 80,
                unit_cost: Money::from_major(2_200),
                supplier: "Azam Mills".to_string(),
                method: PaymentMethod::Credit,
            },
        )
        .unwrap();
        (log, state, receipt)
    }

    fn reverse_cmd(event_id: EventId) -> Command {
        Command::ReverseEvent {
            event_id,
            reason: "correction".to_string(),
        }
    }

    #[test]
    fn test_unknown_and_double_reversal() {
        let (mut log, mut state, receipt) = setup();
        assert!(matches!(
            reverse(&state, EventId::new(42), "typo"),
            Err(CoreError::NotFound { .. })
        ));

        let reversal = run(&mut log, &mut state, reverse_cmd(receipt)).unwrap();
        assert!(matches!(
            reverse(&state, receipt, "again"),
            Err(CoreError::AlreadyReversed(id)) if id == receipt
        ));
        assert!(matches!(
            reverse(&state, reversal, "undo the undo"),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_payment_blocks_reversal_of_its_obligation() {
        let (mut log, mut state, receipt) = setup();
        let payment = run(
            &mut log,
            &mut state,
            Command::ApprovePayment {
                obligation: receipt,
                amount: Money::from_major(50_000),
                method: PaymentMethod::Bank,
            },
        )
        .unwrap();

        assert!(matches!(
            reverse(&state, receipt, "wrong supplier"),
            Err(CoreError::DependentEventExists { dependent_id, .. }) if dependent_id == payment
        ));

        // Undo the payment first: outstanding is restored, then the receipt
        // can go and its payable reads as reversed.
        run(&mut log, &mut state, reverse_cmd(payment)).unwrap();
        assert_eq!(
            state.payable(receipt).unwrap().outstanding(),
            Money::from_major(176_000)
        );
        run(&mut log, &mut state, reverse_cmd(receipt)).unwrap();
        assert_eq!(
            state.obligation_status(receipt),
            Some(ObligationStatus::Reversed)
        );
        assert_eq!(state.available_stock(&mchele(), &Location::Main), 0);
    }

    #[test]
    fn test_consumed_stock_blocks_reversal_of_receipt() {
        let (mut log, mut state, receipt) = setup();
        let sale = run(
            &mut log,
            &mut state,
            Command::RecordSale {
                customer: "Walk-in".to_string(),
                product_id: mchele(),
                quantity: 10,
                method: PaymentMethod::Cash,
            },
        )
        .unwrap();

        assert!(matches!(
            reverse(&state, receipt, "duplicate delivery"),
            Err(CoreError::DependentEventExists { dependent_id, .. }) if dependent_id == sale
        ));
    }

    #[test]
    fn test_transfer_reversal_checks_destination() {
        let (mut log, mut state, _) = setup();
        let shop = ShopId::new("kariakoo");
        let transfer = run(
            &mut log,
            &mut state,
            Command::TransferStock {
                product_id: mchele(),
                from: Location::Main,
                to: Location::Shop(shop.clone()),
                quantity: 20,
            },
        )
        .unwrap();
        assert_eq!(reverse(&state, transfer, "wrong shop").unwrap().len(), 1);

        let drafts = handle(
            &CommandEnvelope::new(
                day(),
                Command::RecordSale {
                    customer: "Walk-in".to_string(),
                    product_id: mchele(),
                    quantity: 5,
                    method: PaymentMethod::Cash,
                },
            )
            .at_shop(shop),
            &state,
        )
        .unwrap();
        let ids = log.append_all(drafts).unwrap();
        state.apply(log.get(ids[0]).unwrap()).unwrap();

        assert!(matches!(
            reverse(&state, transfer, "wrong shop"),
            Err(CoreError::DependentEventExists { dependent_id, .. }) if dependent_id == ids[0]
        ));
    }

    #[test]
    fn test_repayment_blocks_reversal_of_loan() {
        let mut log = EventLog::new();
        let mut state = ProjectedState::new();
        let loan = |amount| Command::ReceiveLoan {
            lender: "CRDB Bank".to_string(),
            amount: Money::from_major(amount),
            method: PaymentMethod::Bank,
        };
        let first = run(&mut log, &mut state, loan(1_000_000)).unwrap();
        let second = run(&mut log, &mut state, loan(500_000)).unwrap();
        let repayment = run(
            &mut log,
            &mut state,
            Command::RepayLoan {
                lender: "CRDB Bank".to_string(),
                amount: Money::from_major(1_200_000),
                method: PaymentMethod::Bank,
            },
        )
        .unwrap();

        // 1,500,000 received, 1,200,000 repaid: neither receipt can go.
        for receipt in [first, second] {
            assert!(matches!(
                reverse(&state, receipt, "entered twice"),
                Err(CoreError::DependentEventExists { dependent_id, .. }) if dependent_id == repayment
            ));
        }
        assert_eq!(state.loan_balance("CRDB Bank"), Money::from_major(300_000));

        run(&mut log, &mut state, reverse_cmd(repayment)).unwrap();
        run(&mut log, &mut state, reverse_cmd(second)).unwrap();
        assert_eq!(state.loan_balance("CRDB Bank"), Money::from_major(1_000_000));
        assert_eq!(state.views().headquarters.bank, Money::from_major(1_000_000));
    }

    #[test]
    fn test_vat_correction_is_reversed_with_its_pair() {
        let (mut log, mut state, _) = setup();
        let sale = run(
            &mut log,
            &mut state,
            Command::RecordSale {
                customer: "Walk-in".to_string(),
                product_id: mchele(),
                quantity: 10,
                method: PaymentMethod::Cash,
            },
        )
        .unwrap();
        let before = state.views().clone();

        let drafts = handle(
            &CommandEnvelope::new(
                day(),
                Command::AdjustVat {
                    sale,
                    new_rate: Rate::zero(),
                },
            ),
            &state,
        )
        .unwrap();
        let ids = log.append_all(drafts).unwrap();
        for id in &ids {
            state.apply(log.get(*id).unwrap()).unwrap();
        }
        let (vat_reversal, correction) = (ids[0], ids[1]);

        // The reversal half alone is held by its correction.
        assert!(matches!(
            reverse(&state, vat_reversal, "wrong rate"),
            Err(CoreError::DependentEventExists { dependent_id, .. }) if dependent_id == correction
        ));

        let kinds = reverse(&state, correction, "wrong rate").unwrap();
        assert_eq!(kinds.len(), 2);
        run(&mut log, &mut state, reverse_cmd(correction)).unwrap();
        assert!(state.is_reversed(correction));
        assert!(state.is_reversed(vat_reversal));
        assert_eq!(state.views(), &before);
        assert_eq!(state.sale(sale).unwrap().vat, Money::from_major(5_400));

        // The sale can be adjusted again from its restored VAT.
        run(
            &mut log,
            &mut state,
            Command::AdjustVat {
                sale,
                new_rate: Rate::zero(),
            },
        )
        .unwrap();
        assert_eq!(state.sale(sale).unwrap().vat, Money::zero());
        assert_eq!(project(&log).unwrap(), state);
    }

    #[test]
    fn test_reversal_inverts_views_exactly() {
        let (log, state, _) = setup();
        let baseline = state.views().clone();

        let mut log = log;
        let mut state = state;
        let commands = vec![
            Command::RecordSale {
                customer: "Duka la Juma".to_string(),
                product_id: mchele(),
                quantity: 7,
                method: PaymentMethod::Credit,
            },
            Command::RecordDamage {
                product_id: mchele(),
                quantity: 2,
                reason: "water damage".to_string(),
            },
            Command::ContributeCapital {
                contributor: "Owner".to_string(),
                amount: Money::from_major(250_000),
                method: PaymentMethod::Mobile,
            },
            Command::AcquireAsset {
                name: "Freezer".to_string(),
                cost: Money::from_major(900_000),
                depreciation_rate: Rate::from_bps(2000),
                supplier: "Hisense".to_string(),
                method: PaymentMethod::Cash,
            },
        ];

        for command in commands {
            let id = run(&mut log, &mut state, command).unwrap();
            run(&mut log, &mut state, reverse_cmd(id)).unwrap();
            assert_eq!(state.views(), &baseline);
        }
        assert_eq!(project(&log).unwrap(), state);
    }
}
