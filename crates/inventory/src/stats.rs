use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use stocktrack_parties::{Responsible, Seller};

use crate::item::{Item, ItemCategory};
use crate::movement::{ItemMovement, MovementType};

/// Dashboard counters, always derived from the current collections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_items: usize,
    pub total_sellers: usize,
    pub total_responsibles: usize,
    pub total_checkouts: usize,
    pub total_returns: usize,
    /// Summed `available_quantity` per category; only categories that have at
    /// least one item appear.
    pub stock_by_category: BTreeMap<ItemCategory, i64>,
}

pub fn compute_stats(
    items: &[Item],
    sellers: &[Seller],
    responsibles: &[Responsible],
    movements: &[ItemMovement],
) -> DashboardStats {
    let mut stock_by_category = BTreeMap::new();
    for item in items {
        *stock_by_category.entry(item.category).or_insert(0) += item.available_quantity;
    }

    let total_checkouts = movements
        .iter()
        .filter(|m| m.kind == MovementType::Checkout)
        .count();

    DashboardStats {
        total_items: items.len(),
        total_sellers: sellers.len(),
        total_responsibles: responsibles.len(),
        total_checkouts,
        total_returns: movements.len() - total_checkouts,
        stock_by_category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::NewItem;
    use crate::movement::MovementLine;
    use chrono::Utc;
    use stocktrack_core::{ItemId, MovementId, ResponsibleId};

    fn item(category: ItemCategory, available: i64) -> Item {
        Item::create(
            ItemId::new(),
            NewItem {
                code: format!("C-{available}"),
                name: "Item".to_string(),
                category,
                total_quantity: available,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn movement(kind: MovementType, it: &Item) -> ItemMovement {
        ItemMovement {
            id: MovementId::new(),
            kind,
            responsible_id: ResponsibleId::new(),
            responsible_name: "Rita".to_string(),
            seller_id: None,
            seller_name: None,
            date: Utc::now(),
            lines: vec![MovementLine::snapshot(it, 1)],
            new_point: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn counts_and_category_totals() {
        let a = item(ItemCategory::Supplies, 5);
        let b = item(ItemCategory::Benches, 2);
        let movements = vec![
            movement(MovementType::Checkout, &a),
            movement(MovementType::Checkout, &a),
            movement(MovementType::Checkout, &b),
            movement(MovementType::Return, &b),
        ];

        let stats = compute_stats(&[a, b], &[], &[], &movements);

        assert_eq!(stats.total_items, 2);
        assert_eq!(stats.total_checkouts, 3);
        assert_eq!(stats.total_returns, 1);
        assert_eq!(
            stats.stock_by_category,
            BTreeMap::from([(ItemCategory::Supplies, 5), (ItemCategory::Benches, 2)])
        );
    }

    #[test]
    fn items_in_one_category_are_summed() {
        let stats = compute_stats(
            &[item(ItemCategory::Computers, 3), item(ItemCategory::Computers, 4)],
            &[],
            &[],
            &[],
        );
        assert_eq!(stats.stock_by_category.get(&ItemCategory::Computers), Some(&7));
        assert_eq!(stats.stock_by_category.len(), 1);
    }

    #[test]
    fn empty_collections_give_zeroes() {
        assert_eq!(compute_stats(&[], &[], &[], &[]), DashboardStats::default());
    }
}
