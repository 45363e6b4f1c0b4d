//! Postgres booking ledger.
//!
//! Commit atomicity comes from a transaction-scoped advisory lock keyed on
//! (tenant, staff, date): every commit for the same key serializes, so the
//! capacity recheck and the insert behave as one step. A commit takes
//! exactly one lock, so commits for distinct slots cannot deadlock.

use super::decode_error;
use async_trait::async_trait;
use bookline_core::{BookingId, CancelToken, ChannelUserId, OrderId, ProductId, ServiceId, StaffId, TenantId};
use bookline_ledger::{
    Booking, BookingLedger, BookingSource, BookingStatus, CommitError, OrderRequest, OrderStatus,
    ProductOrder,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::str::FromStr;

#[derive(FromRow)]
struct BookingRow {
    id: String,
    tenant_id: String,
    customer: String,
    service_id: String,
    staff_id: String,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    status: String,
    cancel_token: String,
    source: String,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

fn parse_status(raw: &str) -> Result<BookingStatus, sqlx::Error> {
    match raw {
        "pending" => Ok(BookingStatus::Pending),
        "confirmed" => Ok(BookingStatus::Confirmed),
        "in_progress" => Ok(BookingStatus::InProgress),
        "completed" => Ok(BookingStatus::Completed),
        "cancelled" => Ok(BookingStatus::Cancelled),
        "no_show" => Ok(BookingStatus::NoShow),
        other => Err(decode_error("booking status", other, "unknown status")),
    }
}

fn parse_source(raw: &str) -> Result<BookingSource, sqlx::Error> {
    match raw {
        "chat_bot" => Ok(BookingSource::ChatBot),
        "operator" => Ok(BookingSource::Operator),
        other => Err(decode_error("booking source", other, "unknown source")),
    }
}

fn source_str(source: BookingSource) -> &'static str {
    match source {
        BookingSource::ChatBot => "chat_bot",
        BookingSource::Operator => "operator",
    }
}

impl BookingRow {
    fn try_into_booking(self) -> Result<Booking, sqlx::Error> {
        Ok(Booking {
            id: BookingId::from_str(&self.id).map_err(|e| decode_error("booking id", &self.id, e))?,
            tenant_id: TenantId::from_str(&self.tenant_id)
                .map_err(|e| decode_error("tenant id", &self.tenant_id, e))?,
            customer: ChannelUserId::new(self.customer),
            service_id: ServiceId::from_str(&self.service_id)
                .map_err(|e| decode_error("service id", &self.service_id, e))?,
            staff_id: StaffId::from_str(&self.staff_id)
                .map_err(|e| decode_error("staff id", &self.staff_id, e))?,
            date: self.date,
            start: self.start_time,
            end: self.end_time,
            status: parse_status(&self.status)?,
            cancel_token: CancelToken::from_str(&self.cancel_token)
                .map_err(|e| decode_error("cancel token", &self.cancel_token, e))?,
            source: parse_source(&self.source)?,
            note: self.note,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: String,
    tenant_id: String,
    customer: String,
    product_id: String,
    quantity: i32,
    unit_price: i64,
    status: String,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn try_into_order(self) -> Result<ProductOrder, sqlx::Error> {
        let status = match self.status.as_str() {
            "pending" => OrderStatus::Pending,
            "paid" => OrderStatus::Paid,
            "cancelled" => OrderStatus::Cancelled,
            other => return Err(decode_error("order status", other, "unknown status")),
        };
        Ok(ProductOrder {
            id: OrderId::from_str(&self.id).map_err(|e| decode_error("order id", &self.id, e))?,
            tenant_id: TenantId::from_str(&self.tenant_id)
                .map_err(|e| decode_error("tenant id", &self.tenant_id, e))?,
            customer: ChannelUserId::new(self.customer),
            product_id: ProductId::from_str(&self.product_id)
                .map_err(|e| decode_error("product id", &self.product_id, e))?,
            quantity: u32::try_from(self.quantity)
                .map_err(|e| decode_error("quantity", &self.quantity.to_string(), e))?,
            unit_price: self.unit_price,
            status,
            created_at: self.created_at,
        })
    }
}

fn storage_failed(e: impl std::fmt::Display) -> CommitError {
    CommitError::Storage {
        reason: e.to_string(),
    }
}

const BOOKING_COLUMNS: &str = "id, tenant_id, customer, service_id, staff_id, date, \
     start_time, end_time, status, cancel_token, source, note, created_at";

/// Booking ledger over Postgres.
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    /// Creates a ledger over the connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Serializes all commits for one (tenant, staff, date) on an advisory
    /// lock scoped to the surrounding transaction.
    async fn lock_slot(
        tx: &mut Transaction<'_, Postgres>,
        tenant_id: TenantId,
        staff_id: StaffId,
        date: NaiveDate,
    ) -> Result<(), CommitError> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("{tenant_id}:{staff_id}:{date}"))
            .execute(&mut **tx)
            .await
            .map_err(storage_failed)?;
        Ok(())
    }
}

#[async_trait]
impl BookingLedger for PgLedger {
    async fn find_active_bookings(
        &self,
        tenant_id: TenantId,
        staff_id: StaffId,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, CommitError> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE tenant_id = $1 AND staff_id = $2 AND date = $3
              AND status IN ('pending', 'confirmed', 'in_progress')
            ORDER BY start_time
            "#,
        ))
        .bind(tenant_id.to_string())
        .bind(staff_id.to_string())
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_failed)?;

        rows.into_iter()
            .map(|r| r.try_into_booking().map_err(storage_failed))
            .collect()
    }

    async fn commit_booking(
        &self,
        booking: Booking,
        capacity: u32,
    ) -> Result<Booking, CommitError> {
        let mut tx = self.pool.begin().await.map_err(storage_failed)?;
        Self::lock_slot(&mut tx, booking.tenant_id, booking.staff_id, booking.date).await?;

        let (occupied,): (i64,) = sqlx::query_as(
            r#"
            SELECT count(*)
            FROM bookings
            WHERE tenant_id = $1 AND staff_id = $2 AND date = $3
              AND status IN ('pending', 'confirmed', 'in_progress')
              AND start_time < $4 AND end_time > $5
            "#,
        )
        .bind(booking.tenant_id.to_string())
        .bind(booking.staff_id.to_string())
        .bind(booking.date)
        .bind(booking.end)
        .bind(booking.start)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage_failed)?;

        if occupied >= i64::from(capacity) {
            return Err(CommitError::SlotTaken {
                staff_id: booking.staff_id,
                date: booking.date,
                start: booking.start,
            });
        }

        sqlx::query(
            r#"
            INSERT INTO bookings (id, tenant_id, customer, service_id, staff_id,
                                  date, start_time, end_time, status, cancel_token,
                                  source, note, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(booking.id.to_string())
        .bind(booking.tenant_id.to_string())
        .bind(booking.customer.as_str())
        .bind(booking.service_id.to_string())
        .bind(booking.staff_id.to_string())
        .bind(booking.date)
        .bind(booking.start)
        .bind(booking.end)
        .bind(booking.status.as_str())
        .bind(booking.cancel_token.to_string())
        .bind(source_str(booking.source))
        .bind(booking.note.as_deref())
        .bind(booking.created_at)
        .execute(&mut *tx)
        .await
        .map_err(storage_failed)?;

        tx.commit().await.map_err(storage_failed)?;
        Ok(booking)
    }

    async fn find_upcoming_for_customer(
        &self,
        tenant_id: TenantId,
        customer: &ChannelUserId,
        from: NaiveDate,
    ) -> Result<Vec<Booking>, CommitError> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE tenant_id = $1 AND customer = $2 AND date >= $3
              AND status IN ('pending', 'confirmed', 'in_progress')
            ORDER BY date, start_time
            "#,
        ))
        .bind(tenant_id.to_string())
        .bind(customer.as_str())
        .bind(from)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_failed)?;

        rows.into_iter()
            .map(|r| r.try_into_booking().map_err(storage_failed))
            .collect()
    }

    async fn find_booking(
        &self,
        tenant_id: TenantId,
        id: BookingId,
    ) -> Result<Option<Booking>, CommitError> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE tenant_id = $1 AND id = $2",
        ))
        .bind(tenant_id.to_string())
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_failed)?;

        match row {
            Some(r) => Ok(Some(r.try_into_booking().map_err(storage_failed)?)),
            None => Ok(None),
        }
    }

    async fn cancel_by_token(
        &self,
        tenant_id: TenantId,
        token: CancelToken,
    ) -> Result<Booking, CommitError> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            r#"
            UPDATE bookings
            SET status = 'cancelled'
            WHERE tenant_id = $1 AND cancel_token = $2
              AND status IN ('pending', 'confirmed', 'in_progress')
            RETURNING {BOOKING_COLUMNS}
            "#,
        ))
        .bind(tenant_id.to_string())
        .bind(token.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_failed)?;

        if let Some(r) = row {
            return r.try_into_booking().map_err(storage_failed);
        }

        // Already cancelled (idempotent repeat) or never existed.
        let existing: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE tenant_id = $1 AND cancel_token = $2",
        ))
        .bind(tenant_id.to_string())
        .bind(token.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_failed)?;

        match existing {
            Some(r) => r.try_into_booking().map_err(storage_failed),
            None => Err(CommitError::BookingNotFound { token }),
        }
    }

    async fn commit_order(&self, request: OrderRequest) -> Result<ProductOrder, CommitError> {
        let mut tx = self.pool.begin().await.map_err(storage_failed)?;

        // The conditional decrement is the stock recheck: zero rows means
        // not enough stock, and nothing was written.
        let decremented = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - $3
            WHERE tenant_id = $1 AND id = $2 AND stock >= $3
            "#,
        )
        .bind(request.tenant_id.to_string())
        .bind(request.product_id.to_string())
        .bind(i32::try_from(request.quantity).map_err(storage_failed)?)
        .execute(&mut *tx)
        .await
        .map_err(storage_failed)?;

        if decremented.rows_affected() == 0 {
            return Err(CommitError::OutOfStock {
                product_id: request.product_id,
                requested: request.quantity,
            });
        }

        let order = ProductOrder {
            id: OrderId::new(),
            tenant_id: request.tenant_id,
            customer: request.customer,
            product_id: request.product_id,
            quantity: request.quantity,
            unit_price: request.unit_price,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };
        sqlx::query(
            r#"
            INSERT INTO product_orders (id, tenant_id, customer, product_id,
                                        quantity, unit_price, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(order.id.to_string())
        .bind(order.tenant_id.to_string())
        .bind(order.customer.as_str())
        .bind(order.product_id.to_string())
        .bind(i32::try_from(order.quantity).map_err(storage_failed)?)
        .bind(order.unit_price)
        .bind("pending")
        .bind(order.created_at)
        .execute(&mut *tx)
        .await
        .map_err(storage_failed)?;

        tx.commit().await.map_err(storage_failed)?;
        Ok(order)
    }
}
