use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;

use stocktrack_core::{Entity, ExpectedVersion, ItemId, MovementId, ResponsibleId, SellerId};
use stocktrack_inventory::{Item, ItemMovement};
use stocktrack_parties::{Responsible, Seller};

use super::{GatewayError, GatewayOp, GatewayResult, InventoryGateway};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    /// Reject the call before storage is touched.
    Fail,
    /// Perform the write, then hold the reply back.
    StallAfterWrite(Duration),
}

#[derive(Debug, Clone, Copy)]
struct FaultRule {
    op: GatewayOp,
    skip: usize,
    times: usize,
    fault: Fault,
}

/// Scripted failures for an [`InMemoryGateway`].
///
/// `fail(op, skip, times)` lets the first `skip` calls of `op` through, then
/// fails the next `times` calls with a storage error.
///
/// `stall_after_write(op, skip, times, delay)` lets the matching calls write
/// and only then sleeps for `delay`, the way a remote commit can land after
/// the caller stopped waiting. Honored by `update_item`, `insert_movement`
/// and `delete_movement`.
#[derive(Debug, Clone, Default)]
pub struct FaultPlan {
    rules: Vec<FaultRule>,
}

impl FaultPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(mut self, op: GatewayOp, skip: usize, times: usize) -> Self {
        self.rules.push(FaultRule {
            op,
            skip,
            times,
            fault: Fault::Fail,
        });
        self
    }

    pub fn stall_after_write(
        mut self,
        op: GatewayOp,
        skip: usize,
        times: usize,
        delay: Duration,
    ) -> Self {
        self.rules.push(FaultRule {
            op,
            skip,
            times,
            fault: Fault::StallAfterWrite(delay),
        });
        self
    }

    fn trip(&mut self, op: GatewayOp) -> Option<Fault> {
        for rule in self.rules.iter_mut().filter(|r| r.op == op) {
            if rule.skip > 0 {
                rule.skip -= 1;
                continue;
            }
            if rule.times > 0 {
                rule.times -= 1;
                return Some(rule.fault);
            }
        }
        None
    }
}

#[derive(Debug, Default)]
struct Collections {
    items: Vec<Item>,
    sellers: Vec<Seller>,
    responsibles: Vec<Responsible>,
    movements: Vec<ItemMovement>,
}

/// In-memory gateway.
///
/// Intended for tests/dev. Collections are plain vectors so listing keeps
/// insertion order.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    state: RwLock<Collections>,
    latency: Option<Duration>,
    faults: Mutex<FaultPlan>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` before touching storage.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_faults(self, plan: FaultPlan) -> Self {
        Self {
            faults: Mutex::new(plan),
            ..self
        }
    }

    /// Replace the fault plan on a gateway that is already in use.
    pub fn set_faults(&self, plan: FaultPlan) -> GatewayResult<()> {
        let mut faults = self.faults.lock().map_err(|_| poisoned())?;
        *faults = plan;
        Ok(())
    }

    /// Apply latency and scripted faults. Returns how long to hold the reply
    /// back once the write is done, if at all.
    async fn enter(&self, op: GatewayOp) -> GatewayResult<Option<Duration>> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let fault = self.faults.lock().map_err(|_| poisoned())?.trip(op);
        match fault {
            Some(Fault::Fail) => Err(GatewayError::Storage(format!("injected fault in {op}"))),
            Some(Fault::StallAfterWrite(delay)) => Ok(Some(delay)),
            None => Ok(None),
        }
    }

    async fn reply<T>(stall: Option<Duration>, result: GatewayResult<T>) -> GatewayResult<T> {
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        result
    }

    fn read(&self) -> GatewayResult<RwLockReadGuard<'_, Collections>> {
        self.state.read().map_err(|_| poisoned())
    }

    fn write(&self) -> GatewayResult<RwLockWriteGuard<'_, Collections>> {
        self.state.write().map_err(|_| poisoned())
    }

    fn write_item(&self, mut item: Item, expected: ExpectedVersion) -> GatewayResult<Item> {
        let mut state = self.write()?;

        let current = state
            .items
            .iter()
            .find(|i| i.id == item.id)
            .map(|i| i.version)
            .ok_or_else(|| GatewayError::not_found(Item::KIND, item.id))?;

        if !expected.matches(current) {
            return Err(GatewayError::VersionConflict {
                entity: Item::KIND,
                id: item.id.to_string(),
                expected,
                actual: current,
            });
        }
        if state.items.iter().any(|i| i.id != item.id && i.code == item.code) {
            return Err(GatewayError::Storage(format!("duplicate item code '{}'", item.code)));
        }

        item.version = current + 1;
        replace(&mut state.items, item)
    }
}

fn poisoned() -> GatewayError {
    GatewayError::Storage("lock poisoned".to_string())
}

fn find<T: Entity + Clone>(records: &[T], id: &T::Id) -> Option<T> {
    records.iter().find(|r| r.id() == id).cloned()
}

fn insert<T: Entity + Clone>(records: &mut Vec<T>, record: T) -> GatewayResult<T> {
    if records.iter().any(|r| r.id() == record.id()) {
        return Err(GatewayError::Storage(format!(
            "duplicate {} id {}",
            T::KIND,
            record.id()
        )));
    }
    records.push(record.clone());
    Ok(record)
}

fn replace<T: Entity + Clone>(records: &mut [T], record: T) -> GatewayResult<T> {
    let slot = records
        .iter_mut()
        .find(|r| r.id() == record.id())
        .ok_or_else(|| GatewayError::not_found(T::KIND, record.id()))?;
    *slot = record.clone();
    Ok(record)
}

fn remove<T: Entity>(records: &mut Vec<T>, id: &T::Id) -> GatewayResult<()> {
    let idx = records
        .iter()
        .position(|r| r.id() == id)
        .ok_or_else(|| GatewayError::not_found(T::KIND, id))?;
    records.remove(idx);
    Ok(())
}

#[async_trait]
impl InventoryGateway for InMemoryGateway {
    async fn list_items(&self) -> GatewayResult<Vec<Item>> {
        self.enter(GatewayOp::ListItems).await?;
        Ok(self.read()?.items.clone())
    }

    async fn get_item(&self, id: ItemId) -> GatewayResult<Option<Item>> {
        self.enter(GatewayOp::GetItem).await?;
        Ok(find(&self.read()?.items, &id))
    }

    async fn find_item_by_code(&self, code: &str) -> GatewayResult<Option<Item>> {
        self.enter(GatewayOp::FindItemByCode).await?;
        Ok(self.read()?.items.iter().find(|i| i.code == code).cloned())
    }

    async fn insert_item(&self, mut item: Item) -> GatewayResult<Item> {
        self.enter(GatewayOp::InsertItem).await?;
        let mut state = self.write()?;
        if state.items.iter().any(|i| i.code == item.code) {
            return Err(GatewayError::Storage(format!("duplicate item code '{}'", item.code)));
        }
        item.version = 1;
        insert(&mut state.items, item)
    }

    async fn update_item(&self, item: Item, expected: ExpectedVersion) -> GatewayResult<Item> {
        let stall = self.enter(GatewayOp::UpdateItem).await?;
        let result = self.write_item(item, expected);
        Self::reply(stall, result).await
    }

    async fn delete_item(&self, id: ItemId) -> GatewayResult<()> {
        self.enter(GatewayOp::DeleteItem).await?;
        remove(&mut self.write()?.items, &id)
    }

    async fn list_sellers(&self) -> GatewayResult<Vec<Seller>> {
        self.enter(GatewayOp::ListSellers).await?;
        Ok(self.read()?.sellers.clone())
    }

    async fn get_seller(&self, id: SellerId) -> GatewayResult<Option<Seller>> {
        self.enter(GatewayOp::GetSeller).await?;
        Ok(find(&self.read()?.sellers, &id))
    }

    async fn insert_seller(&self, seller: Seller) -> GatewayResult<Seller> {
        self.enter(GatewayOp::InsertSeller).await?;
        insert(&mut self.write()?.sellers, seller)
    }

    async fn update_seller(&self, seller: Seller) -> GatewayResult<Seller> {
        self.enter(GatewayOp::UpdateSeller).await?;
        replace(&mut self.write()?.sellers, seller)
    }

    async fn delete_seller(&self, id: SellerId) -> GatewayResult<()> {
        self.enter(GatewayOp::DeleteSeller).await?;
        remove(&mut self.write()?.sellers, &id)
    }

    async fn list_responsibles(&self) -> GatewayResult<Vec<Responsible>> {
        self.enter(GatewayOp::ListResponsibles).await?;
        Ok(self.read()?.responsibles.clone())
    }

    async fn get_responsible(&self, id: ResponsibleId) -> GatewayResult<Option<Responsible>> {
        self.enter(GatewayOp::GetResponsible).await?;
        Ok(find(&self.read()?.responsibles, &id))
    }

    async fn insert_responsible(&self, responsible: Responsible) -> GatewayResult<Responsible> {
        self.enter(GatewayOp::InsertResponsible).await?;
        insert(&mut self.write()?.responsibles, responsible)
    }

    async fn update_responsible(&self, responsible: Responsible) -> GatewayResult<Responsible> {
        self.enter(GatewayOp::UpdateResponsible).await?;
        replace(&mut self.write()?.responsibles, responsible)
    }

    async fn delete_responsible(&self, id: ResponsibleId) -> GatewayResult<()> {
        self.enter(GatewayOp::DeleteResponsible).await?;
        remove(&mut self.write()?.responsibles, &id)
    }

    async fn list_movements(&self) -> GatewayResult<Vec<ItemMovement>> {
        self.enter(GatewayOp::ListMovements).await?;
        Ok(self.read()?.movements.clone())
    }

    async fn get_movement(&self, id: MovementId) -> GatewayResult<Option<ItemMovement>> {
        self.enter(GatewayOp::GetMovement).await?;
        Ok(find(&self.read()?.movements, &id))
    }

    async fn insert_movement(&self, movement: ItemMovement) -> GatewayResult<ItemMovement> {
        let stall = self.enter(GatewayOp::InsertMovement).await?;
        let result = insert(&mut self.write()?.movements, movement);
        Self::reply(stall, result).await
    }

    async fn update_movement(&self, movement: ItemMovement) -> GatewayResult<ItemMovement> {
        self.enter(GatewayOp::UpdateMovement).await?;
        let mut state = self.write()?;
        let lines = state
            .movements
            .iter()
            .find(|m| m.id == movement.id)
            .map(|m| m.lines.clone())
            .ok_or_else(|| GatewayError::not_found(ItemMovement::KIND, movement.id))?;
        replace(&mut state.movements, ItemMovement { lines, ..movement })
    }

    async fn delete_movement(&self, id: MovementId) -> GatewayResult<()> {
        let stall = self.enter(GatewayOp::DeleteMovement).await?;
        let result = remove(&mut self.write()?.movements, &id);
        Self::reply(stall, result).await
    }
}
