//! SQLite-backed order store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::lifecycle;
use super::store::{
    validate_create_request, CreateOrderRequest, OrderFilter, OrderStore, StoreError,
    TransitionRecord,
};
use super::types::{
    Actor, Delivery, DeliveryStatus, FulfillmentMode, Order, OrderItem, OrderStatus, Position,
    TrackingSnapshot,
};

/// SQLite-backed order store.
pub struct SqliteOrderStore {
    conn: Mutex<Connection>,
}

impl SqliteOrderStore {
    /// Create a new SQLite order store, creating the database file and tables
    /// if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite order store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                id TEXT PRIMARY KEY,
                customer_id TEXT NOT NULL,
                restaurant_id TEXT NOT NULL,
                items TEXT NOT NULL,
                total_cents INTEGER NOT NULL,
                mode TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS deliveries (
                id TEXT PRIMARY KEY,
                order_id TEXT NOT NULL UNIQUE REFERENCES orders(id),
                courier_id TEXT,
                status TEXT NOT NULL,
                courier_lat REAL,
                courier_lon REAL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS transition_log (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                entity TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                order_id TEXT NOT NULL,
                from_status TEXT NOT NULL,
                to_status TEXT NOT NULL,
                actor_id TEXT NOT NULL,
                actor_role TEXT NOT NULL,
                at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_orders_customer ON orders(customer_id);
            CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status);
            CREATE INDEX IF NOT EXISTS idx_transition_log_order ON transition_log(order_id);
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn row_to_order(row: &rusqlite::Row) -> rusqlite::Result<Order> {
        let id: String = row.get(0)?;
        let customer_id: String = row.get(1)?;
        let restaurant_id: String = row.get(2)?;
        let items_json: String = row.get(3)?;
        let total_cents: u64 = row.get(4)?;
        let mode_str: String = row.get(5)?;
        let status_str: String = row.get(6)?;
        let created_at_str: String = row.get(7)?;
        let updated_at_str: String = row.get(8)?;

        let items: Vec<OrderItem> = serde_json::from_str(&items_json)
            .map_err(|e| corrupt_column(3, format!("bad items payload: {e}")))?;

        let mode = FulfillmentMode::parse(&mode_str)
            .ok_or_else(|| corrupt_column(5, format!("unknown fulfillment mode: {mode_str}")))?;

        let status = OrderStatus::parse(&status_str)
            .ok_or_else(|| corrupt_column(6, format!("unknown order status: {status_str}")))?;

        Ok(Order {
            id,
            customer_id,
            restaurant_id,
            items,
            total_cents,
            mode,
            status,
            created_at: parse_timestamp(7, &created_at_str)?,
            updated_at: parse_timestamp(8, &updated_at_str)?,
        })
    }

    fn row_to_delivery(row: &rusqlite::Row) -> rusqlite::Result<Delivery> {
        let id: String = row.get(0)?;
        let order_id: String = row.get(1)?;
        let courier_id: Option<String> = row.get(2)?;
        let status_str: String = row.get(3)?;
        let lat: Option<f64> = row.get(4)?;
        let lon: Option<f64> = row.get(5)?;
        let updated_at_str: String = row.get(6)?;

        let courier_position = match (lat, lon) {
            (Some(lat), Some(lon)) => Some(Position::new(lat, lon)),
            _ => None,
        };

        Ok(Delivery {
            id,
            order_id,
            courier_id,
            status: DeliveryStatus::parse(&status_str)
                .ok_or_else(|| corrupt_column(3, format!("unknown delivery status: {status_str}")))?,
            courier_position,
            updated_at: parse_timestamp(6, &updated_at_str)?,
        })
    }

    fn get_order_locked(conn: &Connection, id: &str) -> Result<Order, StoreError> {
        conn.query_row(
            "SELECT id, customer_id, restaurant_id, items, total_cents, mode, status, created_at, updated_at FROM orders WHERE id = ?",
            params![id],
            Self::row_to_order,
        )
        .optional()
        .map_err(|e| StoreError::Database(e.to_string()))?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn get_delivery_locked(conn: &Connection, id: &str) -> Result<Delivery, StoreError> {
        conn.query_row(
            "SELECT id, order_id, courier_id, status, courier_lat, courier_lon, updated_at FROM deliveries WHERE id = ?",
            params![id],
            Self::row_to_delivery,
        )
        .optional()
        .map_err(|e| StoreError::Database(e.to_string()))?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn get_delivery_for_order_locked(
        conn: &Connection,
        order_id: &str,
    ) -> Result<Option<Delivery>, StoreError> {
        conn.query_row(
            "SELECT id, order_id, courier_id, status, courier_lat, courier_lon, updated_at FROM deliveries WHERE order_id = ?",
            params![order_id],
            Self::row_to_delivery,
        )
        .optional()
        .map_err(|e| StoreError::Database(e.to_string()))
    }

    #[allow(clippy::too_many_arguments)]
    fn log_transition(
        conn: &Connection,
        entity: &str,
        entity_id: &str,
        order_id: &str,
        from: &str,
        to: &str,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        conn.execute(
            "INSERT INTO transition_log (entity, entity_id, order_id, from_status, to_status, actor_id, actor_role, at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                entity,
                entity_id,
                order_id,
                from,
                to,
                actor.user_id,
                actor.role.as_str(),
                at.to_rfc3339(),
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }
}

/// A stored value that no longer decodes is a corrupt row; surface it as a
/// database error rather than handing back a guessed value.
fn corrupt_column(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, message.into())
}

fn parse_timestamp(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt_column(idx, format!("bad timestamp {s:?}: {e}")))
}

impl OrderStore for SqliteOrderStore {
    fn create_order(&self, request: CreateOrderRequest) -> Result<Order, StoreError> {
        validate_create_request(&request)?;

        let conn = self.conn.lock().unwrap();

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let total_cents: u64 = request.items.iter().map(OrderItem::total_cents).sum();

        let items_json = serde_json::to_string(&request.items)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO orders (id, customer_id, restaurant_id, items, total_cents, mode, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                request.customer_id,
                request.restaurant_id,
                items_json,
                total_cents,
                request.mode.as_str(),
                OrderStatus::Pending.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Order {
            id,
            customer_id: request.customer_id,
            restaurant_id: request.restaurant_id,
            items: request.items,
            total_cents,
            mode: request.mode,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    fn get_order(&self, id: &str) -> Result<Option<Order>, StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, customer_id, restaurant_id, items, total_cents, mode, status, created_at, updated_at FROM orders WHERE id = ?",
            params![id],
            Self::row_to_order,
        )
        .optional()
        .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let mut conditions: Vec<&str> = Vec::new();
        let mut bound: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            bound.push(Box::new(status.as_str().to_string()));
        }
        if let Some(ref customer_id) = filter.customer_id {
            conditions.push("customer_id = ?");
            bound.push(Box::new(customer_id.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT id, customer_id, restaurant_id, items, total_cents, mode, status, created_at, updated_at FROM orders {} ORDER BY created_at DESC LIMIT ? OFFSET ?",
            where_clause
        );

        bound.push(Box::new(filter.limit));
        bound.push(Box::new(filter.offset));

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let param_refs: Vec<&dyn rusqlite::ToSql> = bound.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_order)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut orders = Vec::new();
        for row in rows {
            orders.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }
        Ok(orders)
    }

    fn count_orders(&self, filter: &OrderFilter) -> Result<i64, StoreError> {
        let conn = self.conn.lock().unwrap();

        let mut conditions: Vec<&str> = Vec::new();
        let mut bound: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            bound.push(Box::new(status.as_str().to_string()));
        }
        if let Some(ref customer_id) = filter.customer_id {
            conditions.push("customer_id = ?");
            bound.push(Box::new(customer_id.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!("SELECT COUNT(*) FROM orders {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = bound.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn transition_order(
        &self,
        id: &str,
        target: OrderStatus,
        actor: &Actor,
    ) -> Result<Order, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        // Status update, audit record and delivery creation land together or
        // not at all; the transaction rolls back on drop if any step fails.
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let current = Self::get_order_locked(&tx, id)?;
        let updated = lifecycle::transition_order(&current, target, actor)?;

        // Compare-and-swap on the current status so two actors racing on the
        // same order cannot both apply a transition.
        let changed = tx
            .execute(
                "UPDATE orders SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
                params![
                    target.as_str(),
                    updated.updated_at.to_rfc3339(),
                    id,
                    current.status.as_str(),
                ],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(StoreError::Conflict(id.to_string()));
        }

        Self::log_transition(
            &tx,
            "order",
            id,
            id,
            current.status.as_str(),
            target.as_str(),
            actor,
            updated.updated_at,
        )?;

        // A delivery-mode order gets its delivery record when the restaurant
        // accepts it.
        if updated.mode == FulfillmentMode::Delivery
            && target == OrderStatus::Preparing
            && Self::get_delivery_for_order_locked(&tx, id)?.is_none()
        {
            let delivery_id = uuid::Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO deliveries (id, order_id, courier_id, status, courier_lat, courier_lon, updated_at) VALUES (?, ?, NULL, ?, NULL, NULL, ?)",
                params![
                    delivery_id,
                    id,
                    DeliveryStatus::Pending.as_str(),
                    updated.updated_at.to_rfc3339(),
                ],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;
            tracing::debug!(order_id = id, delivery_id, "created delivery record");
        }

        tx.commit().map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!(
            order_id = id,
            from = current.status.as_str(),
            to = target.as_str(),
            actor = %actor.user_id,
            "order transition applied"
        );

        Ok(updated)
    }

    fn get_delivery(&self, id: &str) -> Result<Option<Delivery>, StoreError> {
        let conn = self.conn.lock().unwrap();
        match Self::get_delivery_locked(&conn, id) {
            Ok(delivery) => Ok(Some(delivery)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn get_delivery_for_order(&self, order_id: &str) -> Result<Option<Delivery>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::get_delivery_for_order_locked(&conn, order_id)
    }

    fn transition_delivery(
        &self,
        id: &str,
        target: DeliveryStatus,
        actor: &Actor,
        courier: Option<&str>,
    ) -> Result<Delivery, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let current = Self::get_delivery_locked(&tx, id)?;
        let order = Self::get_order_locked(&tx, &current.order_id)?;
        let updated = lifecycle::transition_delivery(&current, target, actor, &order, courier)?;

        let changed = tx
            .execute(
                "UPDATE deliveries SET status = ?, courier_id = ?, updated_at = ? WHERE id = ? AND status = ?",
                params![
                    target.as_str(),
                    updated.courier_id,
                    updated.updated_at.to_rfc3339(),
                    id,
                    current.status.as_str(),
                ],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(StoreError::Conflict(id.to_string()));
        }

        Self::log_transition(
            &tx,
            "delivery",
            id,
            &current.order_id,
            current.status.as_str(),
            target.as_str(),
            actor,
            updated.updated_at,
        )?;

        tx.commit().map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!(
            delivery_id = id,
            from = current.status.as_str(),
            to = target.as_str(),
            actor = %actor.user_id,
            "delivery transition applied"
        );

        Ok(updated)
    }

    fn record_position(&self, id: &str, lat: f64, lon: f64) -> Result<Delivery, StoreError> {
        let conn = self.conn.lock().unwrap();

        let current = Self::get_delivery_locked(&conn, id)?;
        let updated = lifecycle::record_courier_position(&current, lat, lon)?;

        // Guard on status so a report racing a completion cannot land after
        // the delivery was closed out.
        let changed = conn
            .execute(
                "UPDATE deliveries SET courier_lat = ?, courier_lon = ?, updated_at = ? WHERE id = ? AND status = ?",
                params![
                    lat,
                    lon,
                    updated.updated_at.to_rfc3339(),
                    id,
                    DeliveryStatus::OnRoute.as_str(),
                ],
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(StoreError::Conflict(id.to_string()));
        }

        tracing::debug!(delivery_id = id, lat, lon, "courier position recorded");

        Ok(updated)
    }

    fn snapshot(&self, order_id: &str) -> Result<TrackingSnapshot, StoreError> {
        let conn = self.conn.lock().unwrap();

        let order = Self::get_order_locked(&conn, order_id)?;
        let delivery = Self::get_delivery_for_order_locked(&conn, order_id)?;

        Ok(TrackingSnapshot {
            order_id: order.id,
            order_status: order.status,
            delivery_status: delivery.as_ref().map(|d| d.status),
            courier_position: delivery.as_ref().and_then(|d| d.courier_position),
            consumer_position: None,
            captured_at: Utc::now(),
        })
    }

    fn transition_log(&self, order_id: &str) -> Result<Vec<TransitionRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT entity, entity_id, order_id, from_status, to_status, actor_id, actor_role, at FROM transition_log WHERE order_id = ? ORDER BY seq ASC",
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![order_id], |row| {
                Ok(TransitionRecord {
                    entity: row.get(0)?,
                    entity_id: row.get(1)?,
                    order_id: row.get(2)?,
                    from_status: row.get(3)?,
                    to_status: row.get(4)?,
                    actor_id: row.get(5)?,
                    actor_role: row.get(6)?,
                    at: parse_timestamp(7, &row.get::<_, String>(7)?)?,
                })
            })
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }
        Ok(records)
    }
}
