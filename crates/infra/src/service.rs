//! Movement orchestration (application-level single writer).
//!
//! `InventoryService` is the only component that changes stored records. Each
//! write operation runs under one async writer lock and follows the same
//! pipeline:
//!
//! ```text
//! resolve references (responsible, seller)
//!   ↓
//! load live items and validate the whole batch (nothing written yet)
//!   ↓
//! persist / remove the movement record
//!   ↓
//! apply item deltas one line at a time, each write version-checked
//!   ↓
//! on failure: compensate in reverse order
//! ```
//!
//! The gateway offers no cross-record transaction, so a failed item write is
//! undone by compensating writes. When compensation itself fails the service
//! reports `PartialFailure` and logs on the `stocktrack::partial_failure`
//! target.
//!
//! Every gateway call is bounded by `ServiceConfig::gateway_timeout`.

use std::collections::HashMap;
use std::future::Future;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use stocktrack_core::{
    DomainError, Entity, ExpectedVersion, ItemId, MovementId, ResponsibleId, SellerId,
    ValidationError,
};
use stocktrack_inventory::ledger;
use stocktrack_inventory::{
    DashboardStats, InventorySnapshot, Item, ItemMovement, ItemUpdate, MovementLine, MovementType,
    MovementUpdate, NewItem, NewMovement, SellerChange,
};
use stocktrack_parties::{PartyDetails, PartyUpdate, Responsible, Seller};

use crate::config::ServiceConfig;
use crate::gateway::{GatewayError, GatewayOp, GatewayResult, InventoryGateway};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error surfaced by every service operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Client-correctable input; nothing was written.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Blocked by other records, or a concurrent writer got there first.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage failed or timed out; any partial writes were rolled back.
    #[error("persistence failure: {0}")]
    Persistence(GatewayError),

    /// A write failed and so did its rollback.
    #[error(
        "{operation} of movement {movement_id} failed ({cause}) and could not be rolled back ({compensation})"
    )]
    PartialFailure {
        operation: &'static str,
        movement_id: MovementId,
        cause: Box<ServiceError>,
        compensation: Box<ServiceError>,
    },
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(e) => ServiceError::Validation(e),
            DomainError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
        }
    }
}

impl From<GatewayError> for ServiceError {
    fn from(value: GatewayError) -> Self {
        match value {
            GatewayError::VersionConflict { .. } => ServiceError::Conflict(value.to_string()),
            GatewayError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            other => ServiceError::Persistence(other),
        }
    }
}

/// One line whose delta has (or may have) been written to storage.
#[derive(Debug, Clone, Copy)]
struct AppliedLine {
    item_id: ItemId,
    quantity: i64,
    /// Set when the write timed out: the item version it was based on. The
    /// write may still have committed, so compensation re-reads the item.
    unconfirmed_from: Option<u64>,
}

/// The movement orchestrator.
pub struct InventoryService<G> {
    gateway: G,
    config: ServiceConfig,
    writer: Mutex<()>,
}

impl<G> InventoryService<G>
where
    G: InventoryGateway,
{
    pub fn new(gateway: G, config: ServiceConfig) -> Self {
        Self {
            gateway,
            config,
            writer: Mutex::new(()),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    async fn call<T>(
        &self,
        op: GatewayOp,
        fut: impl Future<Output = GatewayResult<T>>,
    ) -> GatewayResult<T> {
        let after = self.config.gateway_timeout;
        tokio::time::timeout(after, fut)
            .await
            .unwrap_or_else(|_| {
                Err(GatewayError::Timeout {
                    operation: op.as_str(),
                    after,
                })
            })
    }

    // ---- movements ----------------------------------------------------------

    /// Record a checkout: available -> in use for every line.
    #[instrument(skip(self, input), fields(responsible_id = %input.responsible_id, lines = input.lines.len()))]
    pub async fn create_checkout(&self, input: NewMovement) -> ServiceResult<ItemMovement> {
        self.record_movement(MovementType::Checkout, input).await
    }

    /// Record a return: in use -> available for every line.
    #[instrument(skip(self, input), fields(responsible_id = %input.responsible_id, lines = input.lines.len()))]
    pub async fn create_return(&self, input: NewMovement) -> ServiceResult<ItemMovement> {
        self.record_movement(MovementType::Return, input).await
    }

    async fn record_movement(
        &self,
        kind: MovementType,
        input: NewMovement,
    ) -> ServiceResult<ItemMovement> {
        let _writer = self.writer.lock().await;

        if input.lines.is_empty() {
            return Err(ValidationError::EmptyLineList.into());
        }

        let responsible = self
            .call(
                GatewayOp::GetResponsible,
                self.gateway.get_responsible(input.responsible_id),
            )
            .await?
            .ok_or(ValidationError::MissingResponsible)?;

        let seller = match input.seller_id {
            Some(id) => Some(self.resolve_seller(id).await?),
            None => None,
        };

        let listed = self.call(GatewayOp::ListItems, self.gateway.list_items()).await?;
        ledger::validate(kind, &input.lines, &listed)?;
        let mut items: HashMap<ItemId, Item> = listed.into_iter().map(|i| (i.id, i)).collect();

        let lines = input
            .lines
            .iter()
            .map(|l| {
                items
                    .get(&l.item_id)
                    .map(|item| MovementLine::snapshot(item, l.quantity))
                    .ok_or(ValidationError::ItemNotFound { item_id: l.item_id })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let now = Utc::now();
        let movement = ItemMovement::record(
            MovementId::new(),
            kind,
            &responsible,
            seller.as_ref(),
            input.date.unwrap_or(now),
            lines,
            input.new_point,
            now,
        )?;

        let movement_id = movement.id;
        let movement = match self
            .call(GatewayOp::InsertMovement, self.gateway.insert_movement(movement))
            .await
        {
            Ok(stored) => stored,
            Err(cause @ GatewayError::Timeout { .. }) => {
                // The insert may have committed after we stopped waiting.
                match self.movement_if_stored(movement_id).await {
                    Ok(Some(stored)) => {
                        warn!(%movement_id, "movement insert timed out but was stored");
                        stored
                    }
                    Ok(None) => return Err(cause.into()),
                    Err(check) => return Err(settle("create", movement_id, cause.into(), Err(check))),
                }
            }
            Err(cause) => return Err(cause.into()),
        };

        let mut applied = Vec::with_capacity(movement.lines.len());
        if let Err(cause) = self
            .apply_lines(kind, &movement.lines, &mut items, &mut applied)
            .await
        {
            let compensation = self
                .undo_recorded_movement(kind, movement.id, &applied, &mut items)
                .await;
            return Err(settle("create", movement.id, cause, compensation));
        }

        info!(
            movement_id = %movement.id,
            kind = %kind,
            lines = movement.lines.len(),
            total_quantity = movement.total_quantity(),
            "movement recorded"
        );
        Ok(movement)
    }

    async fn undo_recorded_movement(
        &self,
        kind: MovementType,
        movement_id: MovementId,
        applied: &[AppliedLine],
        items: &mut HashMap<ItemId, Item>,
    ) -> ServiceResult<()> {
        self.revert_lines(kind, applied, items).await?;
        self.call(
            GatewayOp::DeleteMovement,
            self.gateway.delete_movement(movement_id),
        )
        .await?;
        Ok(())
    }

    /// Delete a movement and give its stock back.
    ///
    /// Rejected with `Conflict` when the reversal would drive any quantity
    /// negative (e.g. deleting a return whose units were checked out again).
    #[instrument(skip(self))]
    pub async fn delete_movement(&self, id: MovementId) -> ServiceResult<()> {
        let _writer = self.writer.lock().await;

        let movement = self
            .call(GatewayOp::GetMovement, self.gateway.get_movement(id))
            .await?
            .ok_or_else(|| ServiceError::not_found(ItemMovement::KIND, id))?;

        let listed = self.call(GatewayOp::ListItems, self.gateway.list_items()).await?;
        if let Err(e) = ledger::validate_reversal(&movement, &listed) {
            warn!(movement_id = %id, error = %e, "movement deletion rejected");
            return Err(ServiceError::Conflict(format!(
                "deleting movement {id} would leave stock negative: {e}"
            )));
        }
        let mut items: HashMap<ItemId, Item> = listed.into_iter().map(|i| (i.id, i)).collect();

        let reverse = movement.kind.opposite();
        let mut applied = Vec::with_capacity(movement.lines.len());
        if let Err(cause) = self
            .apply_lines(reverse, &movement.lines, &mut items, &mut applied)
            .await
        {
            let compensation = self.revert_lines(reverse, &applied, &mut items).await;
            return Err(settle("delete", id, cause, compensation));
        }

        match self
            .call(GatewayOp::DeleteMovement, self.gateway.delete_movement(id))
            .await
        {
            Ok(()) => {}
            Err(cause @ GatewayError::Timeout { .. }) => match self.movement_if_stored(id).await {
                Ok(None) => warn!(movement_id = %id, "movement delete timed out but the record is gone"),
                Ok(Some(_)) => {
                    let compensation = self.revert_lines(reverse, &applied, &mut items).await;
                    return Err(settle("delete", id, cause.into(), compensation));
                }
                Err(check) => return Err(settle("delete", id, cause.into(), Err(check))),
            },
            Err(cause) => {
                let compensation = self.revert_lines(reverse, &applied, &mut items).await;
                return Err(settle("delete", id, cause.into(), compensation));
            }
        }

        info!(movement_id = %id, kind = %movement.kind, "movement deleted and stock reversed");
        Ok(())
    }

    /// Reassign responsible and/or seller. Line quantities never change.
    #[instrument(skip(self, update))]
    pub async fn update_movement(
        &self,
        id: MovementId,
        update: MovementUpdate,
    ) -> ServiceResult<ItemMovement> {
        let _writer = self.writer.lock().await;

        let movement = self
            .call(GatewayOp::GetMovement, self.gateway.get_movement(id))
            .await?
            .ok_or_else(|| ServiceError::not_found(ItemMovement::KIND, id))?;

        let responsible = match update.responsible_id {
            Some(rid) => Some(
                self.call(GatewayOp::GetResponsible, self.gateway.get_responsible(rid))
                    .await?
                    .ok_or(ValidationError::MissingResponsible)?,
            ),
            None => None,
        };
        let seller = match update.seller_id {
            Some(sid) => Some(self.resolve_seller(sid).await?),
            None => None,
        };
        let change = match (&seller, update.clear_seller) {
            (Some(s), _) => SellerChange::Assign(s),
            (None, true) => SellerChange::Clear,
            (None, false) => SellerChange::Keep,
        };

        let next = movement.reassigned(responsible.as_ref(), change);
        let stored = self
            .call(GatewayOp::UpdateMovement, self.gateway.update_movement(next))
            .await?;
        info!(movement_id = %id, "movement reassigned");
        Ok(stored)
    }

    pub async fn list_movements(&self) -> ServiceResult<Vec<ItemMovement>> {
        Ok(self
            .call(GatewayOp::ListMovements, self.gateway.list_movements())
            .await?)
    }

    pub async fn get_movement(&self, id: MovementId) -> ServiceResult<ItemMovement> {
        self.call(GatewayOp::GetMovement, self.gateway.get_movement(id))
            .await?
            .ok_or_else(|| ServiceError::not_found(ItemMovement::KIND, id))
    }

    /// Look a movement up after a write to it timed out.
    async fn movement_if_stored(&self, id: MovementId) -> ServiceResult<Option<ItemMovement>> {
        Ok(self
            .call(GatewayOp::GetMovement, self.gateway.get_movement(id))
            .await?)
    }

    /// Write the `kind` delta of each line, one item at a time.
    ///
    /// Lines whose item no longer exists are skipped. Written lines are pushed
    /// to `applied` so a failure can be compensated; a write that timed out is
    /// pushed as unconfirmed.
    async fn apply_lines(
        &self,
        kind: MovementType,
        lines: &[MovementLine],
        items: &mut HashMap<ItemId, Item>,
        applied: &mut Vec<AppliedLine>,
    ) -> ServiceResult<()> {
        for line in lines {
            let Some(current) = items.get(&line.item_id) else {
                warn!(item_id = %line.item_id, item_code = %line.item_code, "item no longer exists; line skipped");
                continue;
            };
            let base_version = current.version;
            let next = ledger::apply_delta(kind, current, line.quantity, Utc::now())?;
            let stored = match self
                .call(
                    GatewayOp::UpdateItem,
                    self.gateway.update_item(next, ExpectedVersion::Exact(base_version)),
                )
                .await
            {
                Ok(stored) => stored,
                Err(cause @ GatewayError::Timeout { .. }) => {
                    applied.push(AppliedLine {
                        item_id: line.item_id,
                        quantity: line.quantity,
                        unconfirmed_from: Some(base_version),
                    });
                    return Err(cause.into());
                }
                Err(cause) => return Err(cause.into()),
            };
            items.insert(stored.id, stored);
            applied.push(AppliedLine {
                item_id: line.item_id,
                quantity: line.quantity,
                unconfirmed_from: None,
            });
        }
        Ok(())
    }

    /// Undo `applied` (written with `kind`) in reverse order.
    async fn revert_lines(
        &self,
        kind: MovementType,
        applied: &[AppliedLine],
        items: &mut HashMap<ItemId, Item>,
    ) -> ServiceResult<()> {
        for line in applied.iter().rev() {
            if let Some(base_version) = line.unconfirmed_from {
                let latest = self
                    .call(GatewayOp::GetItem, self.gateway.get_item(line.item_id))
                    .await?;
                match latest {
                    Some(latest) if latest.version > base_version => {
                        warn!(item_id = %line.item_id, "timed-out item write had committed; reverting it");
                        items.insert(latest.id, latest);
                    }
                    _ => continue,
                }
            }
            let current = items
                .get(&line.item_id)
                .ok_or_else(|| ServiceError::not_found(Item::KIND, line.item_id))?;
            let expected = ExpectedVersion::Exact(current.version);
            let previous = ledger::reverse_delta(kind, current, line.quantity, Utc::now())?;
            let stored = self
                .call(GatewayOp::UpdateItem, self.gateway.update_item(previous, expected))
                .await?;
            items.insert(stored.id, stored);
        }
        Ok(())
    }

    // ---- items --------------------------------------------------------------

    pub async fn list_items(&self) -> ServiceResult<Vec<Item>> {
        Ok(self.call(GatewayOp::ListItems, self.gateway.list_items()).await?)
    }

    pub async fn get_item(&self, id: ItemId) -> ServiceResult<Item> {
        self.call(GatewayOp::GetItem, self.gateway.get_item(id))
            .await?
            .ok_or_else(|| ServiceError::not_found(Item::KIND, id))
    }

    pub async fn find_item_by_code(&self, code: &str) -> ServiceResult<Item> {
        let code = code.trim();
        self.call(GatewayOp::FindItemByCode, self.gateway.find_item_by_code(code))
            .await?
            .ok_or_else(|| ServiceError::not_found(Item::KIND, code))
    }

    pub async fn create_item(&self, input: NewItem) -> ServiceResult<Item> {
        let _writer = self.writer.lock().await;

        let item = Item::create(ItemId::new(), input, Utc::now())?;
        self.ensure_code_free(&item.code, item.id).await?;

        let stored = self
            .call(GatewayOp::InsertItem, self.gateway.insert_item(item))
            .await?;
        info!(item_id = %stored.id, code = %stored.code, "item created");
        Ok(stored)
    }

    pub async fn update_item(&self, id: ItemId, update: ItemUpdate) -> ServiceResult<Item> {
        let _writer = self.writer.lock().await;

        let current = self
            .call(GatewayOp::GetItem, self.gateway.get_item(id))
            .await?
            .ok_or_else(|| ServiceError::not_found(Item::KIND, id))?;
        let next = current.edited(update, Utc::now())?;
        if next.code != current.code {
            self.ensure_code_free(&next.code, id).await?;
        }

        Ok(self
            .call(
                GatewayOp::UpdateItem,
                self.gateway
                    .update_item(next, ExpectedVersion::Exact(current.version)),
            )
            .await?)
    }

    pub async fn delete_item(&self, id: ItemId) -> ServiceResult<()> {
        let _writer = self.writer.lock().await;

        let current = self
            .call(GatewayOp::GetItem, self.gateway.get_item(id))
            .await?
            .ok_or_else(|| ServiceError::not_found(Item::KIND, id))?;
        if let Err(e) = current.ensure_deletable() {
            warn!(item_id = %id, in_use = current.in_use_quantity, "item deletion rejected");
            return Err(e.into());
        }

        self.call(GatewayOp::DeleteItem, self.gateway.delete_item(id))
            .await?;
        info!(item_id = %id, "item deleted");
        Ok(())
    }

    async fn ensure_code_free(&self, code: &str, owner: ItemId) -> ServiceResult<()> {
        let existing = self
            .call(GatewayOp::FindItemByCode, self.gateway.find_item_by_code(code))
            .await?;
        match existing {
            Some(other) if other.id != owner => Err(ServiceError::Conflict(format!(
                "item code '{code}' is already in use"
            ))),
            _ => Ok(()),
        }
    }

    // ---- sellers ------------------------------------------------------------

    pub async fn list_sellers(&self) -> ServiceResult<Vec<Seller>> {
        Ok(self.call(GatewayOp::ListSellers, self.gateway.list_sellers()).await?)
    }

    pub async fn get_seller(&self, id: SellerId) -> ServiceResult<Seller> {
        self.resolve_seller(id).await
    }

    pub async fn create_seller(&self, details: PartyDetails) -> ServiceResult<Seller> {
        let _writer = self.writer.lock().await;
        let seller = Seller::register(SellerId::new(), details, Utc::now())?;
        Ok(self
            .call(GatewayOp::InsertSeller, self.gateway.insert_seller(seller))
            .await?)
    }

    pub async fn update_seller(&self, id: SellerId, update: PartyUpdate) -> ServiceResult<Seller> {
        let _writer = self.writer.lock().await;
        let current = self.resolve_seller(id).await?;
        let next = current.updated(update, Utc::now())?;
        Ok(self
            .call(GatewayOp::UpdateSeller, self.gateway.update_seller(next))
            .await?)
    }

    /// Rejected while any movement references the seller.
    pub async fn delete_seller(&self, id: SellerId) -> ServiceResult<()> {
        let _writer = self.writer.lock().await;
        let seller = self.resolve_seller(id).await?;

        let movements = self
            .call(GatewayOp::ListMovements, self.gateway.list_movements())
            .await?;
        if let Some(m) = movements.iter().find(|m| m.references_seller(id)) {
            warn!(seller_id = %id, movement_id = %m.id, "seller deletion rejected");
            return Err(ServiceError::Conflict(format!(
                "seller '{}' is referenced by movement {}",
                seller.name, m.id
            )));
        }

        self.call(GatewayOp::DeleteSeller, self.gateway.delete_seller(id))
            .await?;
        info!(seller_id = %id, "seller deleted");
        Ok(())
    }

    async fn resolve_seller(&self, id: SellerId) -> ServiceResult<Seller> {
        self.call(GatewayOp::GetSeller, self.gateway.get_seller(id))
            .await?
            .ok_or_else(|| ServiceError::not_found(Seller::KIND, id))
    }

    // ---- responsibles -------------------------------------------------------

    pub async fn list_responsibles(&self) -> ServiceResult<Vec<Responsible>> {
        Ok(self
            .call(GatewayOp::ListResponsibles, self.gateway.list_responsibles())
            .await?)
    }

    pub async fn get_responsible(&self, id: ResponsibleId) -> ServiceResult<Responsible> {
        self.resolve_responsible(id).await
    }

    pub async fn create_responsible(&self, details: PartyDetails) -> ServiceResult<Responsible> {
        let _writer = self.writer.lock().await;
        let responsible = Responsible::register(ResponsibleId::new(), details, Utc::now())?;
        Ok(self
            .call(
                GatewayOp::InsertResponsible,
                self.gateway.insert_responsible(responsible),
            )
            .await?)
    }

    pub async fn update_responsible(
        &self,
        id: ResponsibleId,
        update: PartyUpdate,
    ) -> ServiceResult<Responsible> {
        let _writer = self.writer.lock().await;
        let current = self.resolve_responsible(id).await?;
        let next = current.updated(update, Utc::now())?;
        Ok(self
            .call(
                GatewayOp::UpdateResponsible,
                self.gateway.update_responsible(next),
            )
            .await?)
    }

    /// Rejected while any movement references the responsible, by id or by
    /// name.
    pub async fn delete_responsible(&self, id: ResponsibleId) -> ServiceResult<()> {
        let _writer = self.writer.lock().await;
        let responsible = self.resolve_responsible(id).await?;

        let movements = self
            .call(GatewayOp::ListMovements, self.gateway.list_movements())
            .await?;
        if let Some(m) = movements
            .iter()
            .find(|m| m.references_responsible(&responsible))
        {
            warn!(responsible_id = %id, movement_id = %m.id, "responsible deletion rejected");
            return Err(ServiceError::Conflict(format!(
                "responsible '{}' is referenced by movement {}",
                responsible.name, m.id
            )));
        }

        self.call(
            GatewayOp::DeleteResponsible,
            self.gateway.delete_responsible(id),
        )
        .await?;
        info!(responsible_id = %id, "responsible deleted");
        Ok(())
    }

    async fn resolve_responsible(&self, id: ResponsibleId) -> ServiceResult<Responsible> {
        self.call(GatewayOp::GetResponsible, self.gateway.get_responsible(id))
            .await?
            .ok_or_else(|| ServiceError::not_found(Responsible::KIND, id))
    }

    // ---- projections --------------------------------------------------------

    /// Fresh copy of every collection. Does not take the writer lock.
    pub async fn snapshot(&self) -> ServiceResult<InventorySnapshot> {
        Ok(InventorySnapshot {
            items: self.list_items().await?,
            sellers: self.list_sellers().await?,
            responsibles: self.list_responsibles().await?,
            movements: self.list_movements().await?,
        })
    }

    pub async fn stats(&self) -> ServiceResult<DashboardStats> {
        Ok(self.snapshot().await?.stats())
    }
}

/// Decide what a failed write reports once compensation has run.
fn settle(
    operation: &'static str,
    movement_id: MovementId,
    cause: ServiceError,
    compensation: ServiceResult<()>,
) -> ServiceError {
    match compensation {
        Ok(()) => {
            warn!(%movement_id, operation, error = %cause, "movement write failed; changes rolled back");
            cause
        }
        Err(compensation) => {
            error!(
                target: "stocktrack::partial_failure",
                %movement_id,
                operation,
                error = %cause,
                compensation_error = %compensation,
                "compensation failed; stored records may be inconsistent"
            );
            ServiceError::PartialFailure {
                operation,
                movement_id,
                cause: Box::new(cause),
                compensation: Box::new(compensation),
            }
        }
    }
}
