//! Postgres-backed gateway.
//!
//! Tables: `items`, `sellers`, `responsibles`, `item_movements` and the child
//! `movement_items` (see `migrations/0001_stocktrack.sql`).
//!
//! ## Error Mapping
//!
//! | SQLx Error | GatewayError |
//! |------------|--------------|
//! | Database (any code, incl. `23505` unique violation) | `Storage` |
//! | PoolTimedOut | `Timeout` |
//! | Other | `Storage` |
//!
//! Version mismatches are detected by the `WHERE version = $n` guard on item
//! updates and reported as `VersionConflict`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use stocktrack_core::{Entity, ExpectedVersion, ItemId, MovementId, ResponsibleId, SellerId};
use stocktrack_inventory::{Item, ItemCategory, ItemMovement, MovementLine, MovementType};
use stocktrack_parties::{ContactInfo, Responsible, Seller};

use super::{GatewayError, GatewayResult, InventoryGateway};

const SCHEMA: &str = include_str!("../../migrations/0001_stocktrack.sql");

const ITEM_COLUMNS: &str = "id, code, name, category, total_quantity, available_quantity, \
                            in_use_quantity, version, created_at, updated_at";

const MOVEMENT_COLUMNS: &str = "id, type, responsible_id, responsible_name, seller_id, \
                                seller_name, date, new_point, created_at";

/// Postgres gateway.
///
/// Item updates are guarded by `WHERE version = $n`; a movement header and its
/// lines are written in one transaction.
#[derive(Debug, Clone)]
pub struct PostgresGateway {
    pool: PgPool,
}

impl PostgresGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a small pool against `database_url`.
    pub async fn connect(database_url: &str, acquire_timeout: Duration) -> GatewayResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the tables if they do not exist yet.
    pub async fn migrate(&self) -> GatewayResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn lines_for(&self, ids: &[Uuid]) -> GatewayResult<HashMap<Uuid, Vec<MovementLine>>> {
        let rows = sqlx::query(
            r#"
            SELECT movement_id, item_id, item_code, item_name, quantity
            FROM movement_items
            WHERE movement_id = ANY($1)
            ORDER BY movement_id, position
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_movement_lines", e))?;

        let mut lines: HashMap<Uuid, Vec<MovementLine>> = HashMap::new();
        for row in rows {
            let movement_id: Uuid = row.try_get("movement_id").map_err(decode_error)?;
            lines.entry(movement_id).or_default().push(MovementLine {
                item_id: ItemId::from_uuid(row.try_get("item_id").map_err(decode_error)?),
                item_code: row.try_get("item_code").map_err(decode_error)?,
                item_name: row.try_get("item_name").map_err(decode_error)?,
                quantity: row.try_get("quantity").map_err(decode_error)?,
            });
        }
        Ok(lines)
    }

    async fn delete_by_id(&self, table: &'static str, entity: &'static str, id: Uuid) -> GatewayResult<()> {
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;
        if result.rows_affected() == 0 {
            return Err(GatewayError::not_found(entity, id));
        }
        Ok(())
    }

    async fn list_parties(&self, table: &'static str) -> GatewayResult<Vec<PartyRow>> {
        let rows = sqlx::query(&format!(
            "SELECT id, name, whatsapp, address, created_at, updated_at FROM {table} \
             ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_parties", e))?;
        rows.iter().map(PartyRow::decode).collect()
    }

    async fn get_party(&self, table: &'static str, id: Uuid) -> GatewayResult<Option<PartyRow>> {
        let row = sqlx::query(&format!(
            "SELECT id, name, whatsapp, address, created_at, updated_at FROM {table} WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_party", e))?;
        row.as_ref().map(PartyRow::decode).transpose()
    }

    async fn insert_party(&self, table: &'static str, party: PartyRow) -> GatewayResult<()> {
        sqlx::query(&format!(
            "INSERT INTO {table} (id, name, whatsapp, address, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)"
        ))
        .bind(party.id)
        .bind(&party.name)
        .bind(&party.contact.whatsapp)
        .bind(&party.contact.address)
        .bind(party.created_at)
        .bind(party.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_party", e))?;
        Ok(())
    }

    async fn update_party(&self, table: &'static str, entity: &'static str, party: PartyRow) -> GatewayResult<()> {
        let result = sqlx::query(&format!(
            "UPDATE {table} SET name = $2, whatsapp = $3, address = $4, updated_at = $5 \
             WHERE id = $1"
        ))
        .bind(party.id)
        .bind(&party.name)
        .bind(&party.contact.whatsapp)
        .bind(&party.contact.address)
        .bind(party.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_party", e))?;
        if result.rows_affected() == 0 {
            return Err(GatewayError::not_found(entity, party.id));
        }
        Ok(())
    }

    async fn current_item_version(&self, id: ItemId) -> GatewayResult<Option<u64>> {
        let version: Option<i64> = sqlx::query_scalar("SELECT version FROM items WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("item_version", e))?;
        Ok(version.map(|v| v as u64))
    }
}

struct PartyRow {
    id: Uuid,
    name: String,
    contact: ContactInfo,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PartyRow {
    fn decode(row: &PgRow) -> GatewayResult<Self> {
        Ok(Self {
            id: row.try_get("id").map_err(decode_error)?,
            name: row.try_get("name").map_err(decode_error)?,
            contact: ContactInfo {
                whatsapp: row.try_get("whatsapp").map_err(decode_error)?,
                address: row.try_get("address").map_err(decode_error)?,
            },
            created_at: row.try_get("created_at").map_err(decode_error)?,
            updated_at: row.try_get("updated_at").map_err(decode_error)?,
        })
    }
}

impl From<PartyRow> for Seller {
    fn from(row: PartyRow) -> Self {
        Seller {
            id: SellerId::from_uuid(row.id),
            name: row.name,
            contact: row.contact,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<PartyRow> for Responsible {
    fn from(row: PartyRow) -> Self {
        Responsible {
            id: ResponsibleId::from_uuid(row.id),
            name: row.name,
            contact: row.contact,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<&Seller> for PartyRow {
    fn from(s: &Seller) -> Self {
        PartyRow {
            id: *s.id.as_uuid(),
            name: s.name.clone(),
            contact: s.contact.clone(),
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

impl From<&Responsible> for PartyRow {
    fn from(r: &Responsible) -> Self {
        PartyRow {
            id: *r.id.as_uuid(),
            name: r.name.clone(),
            contact: r.contact.clone(),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

fn decode_item(row: &PgRow) -> GatewayResult<Item> {
    let category: String = row.try_get("category").map_err(decode_error)?;
    let category: ItemCategory = category
        .parse()
        .map_err(|e| GatewayError::Storage(format!("failed to decode item row: {e}")))?;
    let version: i64 = row.try_get("version").map_err(decode_error)?;

    Ok(Item {
        id: ItemId::from_uuid(row.try_get("id").map_err(decode_error)?),
        code: row.try_get("code").map_err(decode_error)?,
        name: row.try_get("name").map_err(decode_error)?,
        category,
        total_quantity: row.try_get("total_quantity").map_err(decode_error)?,
        available_quantity: row.try_get("available_quantity").map_err(decode_error)?,
        in_use_quantity: row.try_get("in_use_quantity").map_err(decode_error)?,
        version: version as u64,
        created_at: row.try_get("created_at").map_err(decode_error)?,
        updated_at: row.try_get("updated_at").map_err(decode_error)?,
    })
}

fn decode_movement(row: &PgRow, lines: Vec<MovementLine>) -> GatewayResult<ItemMovement> {
    let kind: String = row.try_get("type").map_err(decode_error)?;
    let kind: MovementType = kind
        .parse()
        .map_err(|e| GatewayError::Storage(format!("failed to decode movement row: {e}")))?;
    let seller_id: Option<Uuid> = row.try_get("seller_id").map_err(decode_error)?;

    Ok(ItemMovement {
        id: MovementId::from_uuid(row.try_get("id").map_err(decode_error)?),
        kind,
        responsible_id: ResponsibleId::from_uuid(row.try_get("responsible_id").map_err(decode_error)?),
        responsible_name: row.try_get("responsible_name").map_err(decode_error)?,
        seller_id: seller_id.map(SellerId::from_uuid),
        seller_name: row.try_get("seller_name").map_err(decode_error)?,
        date: row.try_get("date").map_err(decode_error)?,
        lines,
        new_point: row.try_get("new_point").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
    })
}

fn decode_error(err: sqlx::Error) -> GatewayError {
    GatewayError::Storage(format!("failed to decode row: {err}"))
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> GatewayError {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
            if code == "23505" {
                GatewayError::Storage(format!(
                    "unique constraint violated in {operation}: {}",
                    db_err.message()
                ))
            } else {
                GatewayError::Storage(format!("database error in {operation}: {}", db_err.message()))
            }
        }
        sqlx::Error::PoolTimedOut => GatewayError::Timeout {
            operation,
            after: Duration::ZERO,
        },
        sqlx::Error::PoolClosed => {
            GatewayError::Storage(format!("connection pool closed in {operation}"))
        }
        other => GatewayError::Storage(format!("sqlx error in {operation}: {other}")),
    }
}

#[async_trait]
impl InventoryGateway for PostgresGateway {
    #[instrument(level = "debug", skip(self), err)]
    async fn list_items(&self) -> GatewayResult<Vec<Item>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_items", e))?;
        rows.iter().map(decode_item).collect()
    }

    async fn get_item(&self, id: ItemId) -> GatewayResult<Option<Item>> {
        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_item", e))?;
        row.as_ref().map(decode_item).transpose()
    }

    async fn find_item_by_code(&self, code: &str) -> GatewayResult<Option<Item>> {
        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE code = $1"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_item_by_code", e))?;
        row.as_ref().map(decode_item).transpose()
    }

    #[instrument(level = "debug", skip(self, item), fields(item_id = %item.id), err)]
    async fn insert_item(&self, mut item: Item) -> GatewayResult<Item> {
        item.version = 1;
        sqlx::query(
            r#"
            INSERT INTO items (
                id, code, name, category, total_quantity, available_quantity,
                in_use_quantity, version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 1, $8, $9)
            "#,
        )
        .bind(*item.id.as_uuid())
        .bind(&item.code)
        .bind(&item.name)
        .bind(item.category.label())
        .bind(item.total_quantity)
        .bind(item.available_quantity)
        .bind(item.in_use_quantity)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_item", e))?;
        Ok(item)
    }

    #[instrument(level = "debug", skip(self, item), fields(item_id = %item.id, expected = ?expected), err)]
    async fn update_item(&self, mut item: Item, expected: ExpectedVersion) -> GatewayResult<Item> {
        let expected_version = match expected {
            ExpectedVersion::Any => None,
            ExpectedVersion::Exact(v) => Some(v as i64),
        };

        let version: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE items SET
                code = $2,
                name = $3,
                category = $4,
                total_quantity = $5,
                available_quantity = $6,
                in_use_quantity = $7,
                updated_at = $8,
                version = version + 1
            WHERE id = $1 AND ($9::BIGINT IS NULL OR version = $9)
            RETURNING version
            "#,
        )
        .bind(*item.id.as_uuid())
        .bind(&item.code)
        .bind(&item.name)
        .bind(item.category.label())
        .bind(item.total_quantity)
        .bind(item.available_quantity)
        .bind(item.in_use_quantity)
        .bind(item.updated_at)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_item", e))?;

        match version {
            Some(v) => {
                item.version = v as u64;
                Ok(item)
            }
            None => match self.current_item_version(item.id).await? {
                Some(actual) => Err(GatewayError::VersionConflict {
                    entity: Item::KIND,
                    id: item.id.to_string(),
                    expected,
                    actual,
                }),
                None => Err(GatewayError::not_found(Item::KIND, item.id)),
            },
        }
    }

    async fn delete_item(&self, id: ItemId) -> GatewayResult<()> {
        self.delete_by_id("items", Item::KIND, *id.as_uuid()).await
    }

    async fn list_sellers(&self) -> GatewayResult<Vec<Seller>> {
        Ok(self.list_parties("sellers").await?.into_iter().map(Seller::from).collect())
    }

    async fn get_seller(&self, id: SellerId) -> GatewayResult<Option<Seller>> {
        Ok(self.get_party("sellers", *id.as_uuid()).await?.map(Seller::from))
    }

    async fn insert_seller(&self, seller: Seller) -> GatewayResult<Seller> {
        self.insert_party("sellers", PartyRow::from(&seller)).await?;
        Ok(seller)
    }

    async fn update_seller(&self, seller: Seller) -> GatewayResult<Seller> {
        self.update_party("sellers", Seller::KIND, PartyRow::from(&seller)).await?;
        Ok(seller)
    }

    async fn delete_seller(&self, id: SellerId) -> GatewayResult<()> {
        self.delete_by_id("sellers", Seller::KIND, *id.as_uuid()).await
    }

    async fn list_responsibles(&self) -> GatewayResult<Vec<Responsible>> {
        Ok(self
            .list_parties("responsibles")
            .await?
            .into_iter()
            .map(Responsible::from)
            .collect())
    }

    async fn get_responsible(&self, id: ResponsibleId) -> GatewayResult<Option<Responsible>> {
        Ok(self.get_party("responsibles", *id.as_uuid()).await?.map(Responsible::from))
    }

    async fn insert_responsible(&self, responsible: Responsible) -> GatewayResult<Responsible> {
        self.insert_party("responsibles", PartyRow::from(&responsible)).await?;
        Ok(responsible)
    }

    async fn update_responsible(&self, responsible: Responsible) -> GatewayResult<Responsible> {
        self.update_party("responsibles", Responsible::KIND, PartyRow::from(&responsible))
            .await?;
        Ok(responsible)
    }

    async fn delete_responsible(&self, id: ResponsibleId) -> GatewayResult<()> {
        self.delete_by_id("responsibles", Responsible::KIND, *id.as_uuid()).await
    }

    #[instrument(level = "debug", skip(self), err)]
    async fn list_movements(&self) -> GatewayResult<Vec<ItemMovement>> {
        let rows = sqlx::query(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM item_movements ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_movements", e))?;

        let ids: Vec<Uuid> = rows
            .iter()
            .map(|r| r.try_get::<Uuid, _>("id"))
            .collect::<Result<_, _>>()
            .map_err(decode_error)?;
        let mut lines = self.lines_for(&ids).await?;

        rows.iter()
            .zip(ids)
            .map(|(row, id)| decode_movement(row, lines.remove(&id).unwrap_or_default()))
            .collect()
    }

    async fn get_movement(&self, id: MovementId) -> GatewayResult<Option<ItemMovement>> {
        let row = sqlx::query(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM item_movements WHERE id = $1"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_movement", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let uuid = *id.as_uuid();
        let mut lines = self.lines_for(&[uuid]).await?;
        decode_movement(&row, lines.remove(&uuid).unwrap_or_default()).map(Some)
    }

    #[instrument(level = "debug", skip(self, movement), fields(movement_id = %movement.id), err)]
    async fn insert_movement(&self, movement: ItemMovement) -> GatewayResult<ItemMovement> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO item_movements (
                id, type, responsible_id, responsible_name, seller_id,
                seller_name, date, new_point, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(*movement.id.as_uuid())
        .bind(movement.kind.as_str())
        .bind(*movement.responsible_id.as_uuid())
        .bind(&movement.responsible_name)
        .bind(movement.seller_id.map(Uuid::from))
        .bind(&movement.seller_name)
        .bind(movement.date)
        .bind(movement.new_point)
        .bind(movement.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_movement", e))?;

        for (position, line) in movement.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO movement_items (
                    movement_id, position, item_id, item_code, item_name, quantity
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(*movement.id.as_uuid())
            .bind(position as i32)
            .bind(*line.item_id.as_uuid())
            .bind(&line.item_code)
            .bind(&line.item_name)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_movement_line", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(movement)
    }

    async fn update_movement(&self, movement: ItemMovement) -> GatewayResult<ItemMovement> {
        let result = sqlx::query(
            r#"
            UPDATE item_movements SET
                responsible_id = $2,
                responsible_name = $3,
                seller_id = $4,
                seller_name = $5
            WHERE id = $1
            "#,
        )
        .bind(*movement.id.as_uuid())
        .bind(*movement.responsible_id.as_uuid())
        .bind(&movement.responsible_name)
        .bind(movement.seller_id.map(Uuid::from))
        .bind(&movement.seller_name)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_movement", e))?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::not_found(ItemMovement::KIND, movement.id));
        }
        self.get_movement(movement.id)
            .await?
            .ok_or_else(|| GatewayError::not_found(ItemMovement::KIND, movement.id))
    }

    async fn delete_movement(&self, id: MovementId) -> GatewayResult<()> {
        // movement_items rows go with the header (ON DELETE CASCADE).
        self.delete_by_id("item_movements", ItemMovement::KIND, *id.as_uuid()).await
    }
}
