//! Stock ledger: validation and quantity deltas for movements.
//!
//! Validation is kept apart from application so every line of a movement can
//! be checked as a batch before any item is touched. A movement either passes
//! as a whole or changes nothing.
//!
//! Everything here is pure: functions take the current item state and return a
//! new one, leaving persistence to the caller.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use stocktrack_core::{ItemId, ValidationError};

use crate::item::Item;
use crate::movement::{ItemMovement, MovementType, ProposedLine};

/// Check a checkout batch against available stock.
pub fn validate_checkout(lines: &[ProposedLine], items: &[Item]) -> Result<(), ValidationError> {
    validate(MovementType::Checkout, lines, items)
}

/// Check a return batch against in-use stock.
pub fn validate_return(lines: &[ProposedLine], items: &[Item]) -> Result<(), ValidationError> {
    validate(MovementType::Return, lines, items)
}

/// Check a batch of lines for the given movement type.
///
/// Each line must reference a known item and ask for a positive quantity that
/// fits the item's ceiling. Lines naming the same item draw from the same
/// ceiling.
pub fn validate(
    kind: MovementType,
    lines: &[ProposedLine],
    items: &[Item],
) -> Result<(), ValidationError> {
    if lines.is_empty() {
        return Err(ValidationError::EmptyLineList);
    }

    let by_id: HashMap<ItemId, &Item> = items.iter().map(|i| (i.id, i)).collect();
    let mut claimed: HashMap<ItemId, i64> = HashMap::new();

    for line in lines {
        let item = by_id
            .get(&line.item_id)
            .ok_or(ValidationError::ItemNotFound { item_id: line.item_id })?;

        if line.quantity <= 0 {
            return Err(ValidationError::InvalidQuantity {
                item_id: item.id,
                item_name: item.name.clone(),
                quantity: line.quantity,
            });
        }

        // Saturates so an absurd batch reads as too much stock, never as a
        // wrapped negative total.
        let requested = claimed.entry(item.id).or_insert(0);
        *requested = requested.saturating_add(line.quantity);

        let limit = ceiling(kind, item);
        if *requested > limit {
            return Err(ValidationError::InsufficientStock {
                item_id: item.id,
                item_name: item.name.clone(),
                requested: *requested,
                limit,
                bucket: bucket(kind),
            });
        }
    }

    Ok(())
}

/// Check that deleting `movement` can be reconciled against current stock.
///
/// Reversal runs the opposite delta for every line. Lines whose item no longer
/// exists are skipped; there is nothing left to reconcile for them.
pub fn validate_reversal(movement: &ItemMovement, items: &[Item]) -> Result<(), ValidationError> {
    let lines: Vec<ProposedLine> = movement
        .lines
        .iter()
        .filter(|l| items.iter().any(|i| i.id == l.item_id))
        .map(|l| ProposedLine {
            item_id: l.item_id,
            quantity: l.quantity,
        })
        .collect();

    if lines.is_empty() {
        return Ok(());
    }
    validate(movement.kind.opposite(), &lines, items)
}

/// available -= q, in_use += q.
pub fn apply_checkout_delta(
    item: &Item,
    quantity: i64,
    at: DateTime<Utc>,
) -> Result<Item, ValidationError> {
    apply_delta(MovementType::Checkout, item, quantity, at)
}

/// available += q, in_use -= q.
pub fn apply_return_delta(
    item: &Item,
    quantity: i64,
    at: DateTime<Utc>,
) -> Result<Item, ValidationError> {
    apply_delta(MovementType::Return, item, quantity, at)
}

/// Undo a delta previously applied for `kind`.
///
/// Reversing a checkout applies the return delta and vice versa.
pub fn reverse_delta(
    kind: MovementType,
    item: &Item,
    quantity: i64,
    at: DateTime<Utc>,
) -> Result<Item, ValidationError> {
    apply_delta(kind.opposite(), item, quantity, at)
}

/// Move `quantity` units between the available and in-use buckets.
///
/// Re-checks the single line so a caller that skipped batch validation still
/// cannot drive a bucket negative. `total_quantity` and `version` are never
/// touched here.
pub fn apply_delta(
    kind: MovementType,
    item: &Item,
    quantity: i64,
    at: DateTime<Utc>,
) -> Result<Item, ValidationError> {
    if quantity <= 0 {
        return Err(ValidationError::InvalidQuantity {
            item_id: item.id,
            item_name: item.name.clone(),
            quantity,
        });
    }

    let limit = ceiling(kind, item);
    if quantity > limit {
        return Err(ValidationError::InsufficientStock {
            item_id: item.id,
            item_name: item.name.clone(),
            requested: quantity,
            limit,
            bucket: bucket(kind),
        });
    }

    let mut next = item.clone();
    match kind {
        MovementType::Checkout => {
            next.available_quantity -= quantity;
            next.in_use_quantity += quantity;
        }
        MovementType::Return => {
            next.available_quantity += quantity;
            next.in_use_quantity -= quantity;
        }
    }
    next.updated_at = at;
    Ok(next)
}

fn ceiling(kind: MovementType, item: &Item) -> i64 {
    match kind {
        MovementType::Checkout => item.available_quantity,
        MovementType::Return => item.in_use_quantity,
    }
}

fn bucket(kind: MovementType) -> &'static str {
    match kind {
        MovementType::Checkout => "available",
        MovementType::Return => "in use",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ItemCategory, NewItem};
    use crate::movement::MovementLine;
    use proptest::prelude::*;
    use stocktrack_core::{MovementId, ResponsibleId};

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn item(available: i64, in_use: i64) -> Item {
        let mut item = Item::create(
            ItemId::new(),
            NewItem {
                code: "DG-10".to_string(),
                name: "Máquina Digital 10".to_string(),
                category: ItemCategory::DigitalMachines,
                total_quantity: available + in_use,
            },
            test_time(),
        )
        .unwrap();
        item.available_quantity = available;
        item.in_use_quantity = in_use;
        item
    }

    fn line(item: &Item, quantity: i64) -> ProposedLine {
        ProposedLine {
            item_id: item.id,
            quantity,
        }
    }

    fn quantities(item: &Item) -> (i64, i64, i64) {
        (item.available_quantity, item.in_use_quantity, item.total_quantity)
    }

    #[test]
    fn checkout_accepts_exactly_available() {
        let it = item(7, 0);
        assert!(validate_checkout(&[line(&it, 7)], &[it.clone()]).is_ok());
    }

    #[test]
    fn checkout_rejects_one_more_than_available() {
        let it = item(7, 0);
        let err = validate_checkout(&[line(&it, 8)], &[it.clone()]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InsufficientStock {
                item_id: it.id,
                item_name: it.name.clone(),
                requested: 8,
                limit: 7,
                bucket: "available",
            }
        );
    }

    #[test]
    fn return_ceiling_is_in_use() {
        let it = item(10, 2);
        assert!(validate_return(&[line(&it, 2)], &[it.clone()]).is_ok());
        let err = validate_return(&[line(&it, 3)], &[it.clone()]).unwrap_err();
        assert!(matches!(err, ValidationError::InsufficientStock { limit: 2, bucket: "in use", .. }));
    }

    #[test]
    fn huge_repeated_lines_do_not_wrap_past_the_ceiling() {
        let it = item(10, 0);
        let err = validate_checkout(&[line(&it, 5), line(&it, i64::MAX)], &[it.clone()]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InsufficientStock {
                item_id: it.id,
                item_name: it.name.clone(),
                requested: i64::MAX,
                limit: 10,
                bucket: "available",
            }
        );
    }

    #[test]
    fn unknown_item_is_reported_before_quantity() {
        let ghost = ItemId::new();
        let err = validate_checkout(
            &[ProposedLine {
                item_id: ghost,
                quantity: 0,
            }],
            &[],
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::ItemNotFound { item_id: ghost });
    }

    #[test]
    fn non_positive_quantity_is_invalid() {
        let it = item(5, 0);
        for q in [0, -3] {
            let err = validate_checkout(&[line(&it, q)], &[it.clone()]).unwrap_err();
            assert!(matches!(err, ValidationError::InvalidQuantity { quantity, .. } if quantity == q));
        }
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert_eq!(validate_checkout(&[], &[]).unwrap_err(), ValidationError::EmptyLineList);
    }

    #[test]
    fn repeated_lines_share_the_ceiling() {
        let it = item(5, 0);
        let err = validate_checkout(&[line(&it, 3), line(&it, 3)], &[it.clone()]).unwrap_err();
        assert!(matches!(err, ValidationError::InsufficientStock { requested: 6, limit: 5, .. }));
    }

    #[test]
    fn second_line_failure_fails_the_whole_batch() {
        let a = item(10, 0);
        let b = item(1, 0);
        let err = validate_checkout(&[line(&a, 4), line(&b, 2)], &[a.clone(), b.clone()]).unwrap_err();
        assert!(matches!(err, ValidationError::InsufficientStock { item_id, .. } if item_id == b.id));
    }

    #[test]
    fn checkout_then_return_moves_units_between_buckets() {
        let it = item(10, 0);
        let out = apply_checkout_delta(&it, 4, test_time()).unwrap();
        assert_eq!(quantities(&out), (6, 4, 10));

        let back = apply_return_delta(&out, 4, test_time()).unwrap();
        assert_eq!(quantities(&back), (10, 0, 10));
    }

    #[test]
    fn apply_refuses_to_go_negative() {
        let it = item(3, 0);
        assert!(apply_checkout_delta(&it, 5, test_time()).is_err());
        assert!(apply_return_delta(&it, 1, test_time()).is_err());
    }

    #[test]
    fn apply_sets_updated_at_and_keeps_version() {
        let mut it = item(3, 0);
        it.version = 9;
        let at = test_time() + chrono::Duration::seconds(30);
        let out = apply_checkout_delta(&it, 1, at).unwrap();
        assert_eq!(out.updated_at, at);
        assert_eq!(out.version, 9);
    }

    #[test]
    fn reverse_of_return_takes_units_back_out() {
        let it = item(8, 2);
        let out = reverse_delta(MovementType::Return, &it, 3, test_time()).unwrap();
        assert_eq!(quantities(&out), (5, 5, 10));
    }

    #[test]
    fn reversal_validation_checks_current_stock() {
        let it = item(10, 0);
        let movement = ItemMovement {
            id: MovementId::new(),
            kind: MovementType::Return,
            responsible_id: ResponsibleId::new(),
            responsible_name: "Gil".to_string(),
            seller_id: None,
            seller_name: None,
            date: test_time(),
            lines: vec![MovementLine::snapshot(&it, 4)],
            new_point: false,
            created_at: test_time(),
        };

        assert!(validate_reversal(&movement, &[it.clone()]).is_ok());

        let drained = item(1, 9);
        let mut m2 = movement.clone();
        m2.lines = vec![MovementLine::snapshot(&drained, 4)];
        assert!(matches!(
            validate_reversal(&m2, &[drained]).unwrap_err(),
            ValidationError::InsufficientStock { .. }
        ));

        // Deleted items are skipped.
        assert!(validate_reversal(&movement, &[]).is_ok());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: checkout followed by its reversal restores the quantities.
        #[test]
        fn checkout_round_trip(total in 1i64..10_000, pick in 0.0f64..1.0) {
            let it = item(total, 0);
            let q = ((total as f64 * pick) as i64).max(1);
            let out = apply_checkout_delta(&it, q, test_time()).unwrap();
            let back = reverse_delta(MovementType::Checkout, &out, q, test_time()).unwrap();
            prop_assert_eq!(quantities(&back), quantities(&it));
        }

        /// Property: any sequence of validated checkouts/returns keeps the
        /// buckets balanced and non-negative.
        #[test]
        fn validated_sequences_stay_balanced(
            total in 0i64..500,
            ops in prop::collection::vec((any::<bool>(), 1i64..200), 0..50)
        ) {
            let mut it = item(total, 0);
            for (is_checkout, q) in ops {
                let kind = if is_checkout { MovementType::Checkout } else { MovementType::Return };
                let batch = [line(&it, q)];
                if validate(kind, &batch, &[it.clone()]).is_ok() {
                    it = apply_delta(kind, &it, q, test_time()).unwrap();
                }
                prop_assert!(it.is_balanced());
                prop_assert_eq!(it.total_quantity, total);
            }
        }
    }
}
