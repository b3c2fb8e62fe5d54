//! The order-placement transaction.
//!
//! Converts a user's cart into a durable order as a single atomic unit
//! of work: validate stock, snapshot prices, create the order and its
//! items, decrement variant stock, and empty the cart. Any failure
//! before commit rolls the whole thing back.

use std::collections::HashMap;

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::Order;
use crate::pricing::PriceSources;

/// Validated input for one placement, produced by the orders handler.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub shipping_address_id: Uuid,
    pub billing_address_id: Uuid,
    pub payment_method: String,
    pub notes: Option<String>,
}

/// One cart line with its product and variant snapshot, loaded inside
/// the transaction so pricing and stock reads cannot race the commit.
#[derive(Debug, sqlx::FromRow)]
struct CartLine {
    product_id: Uuid,
    variant_id: Option<Uuid>,
    quantity: i32,
    product_name: String,
    base_price: Decimal,
    discount_price: Option<Decimal>,
    variant_price: Option<Decimal>,
}

impl CartLine {
    fn unit_price(&self) -> Decimal {
        PriceSources {
            base_price: self.base_price,
            discount_price: self.discount_price,
            variant_price: self.variant_price,
        }
        .resolve()
    }
}

/// Place an order from the user's current cart.
///
/// Runs as one Postgres transaction. Variant rows are locked with
/// `SELECT ... FOR UPDATE` before the stock check, so two placements
/// drawing on the same variant serialize and the loser sees the
/// decremented quantity. Stock is validated for every line before any
/// row is written.
///
/// # Errors
///
/// Returns [`ApiError::EmptyCart`] if the cart has no lines,
/// [`ApiError::InsufficientStock`] naming the product if any
/// variant-bound line exceeds available stock, and
/// [`ApiError::Database`] on any store failure. All three leave the
/// database untouched.
pub async fn place_order(db: &PgPool, user_id: Uuid, new_order: NewOrder) -> Result<Order, ApiError> {
    let mut tx = db.begin().await?;

    let lines: Vec<CartLine> = sqlx::query_as(
        "SELECT ci.product_id, ci.variant_id, ci.quantity, \
                p.name AS product_name, p.base_price, p.discount_price, \
                v.price AS variant_price \
         FROM cart_items ci \
         JOIN products p ON p.id = ci.product_id \
         LEFT JOIN product_variants v ON v.id = ci.variant_id \
         WHERE ci.user_id = $1 \
         ORDER BY ci.created_at",
    )
    .bind(user_id)
    .fetch_all(&mut *tx)
    .await?;

    if lines.is_empty() {
        return Err(ApiError::EmptyCart);
    }

    // Lock every touched variant row up front. This serializes the
    // check-then-decrement sequence against concurrent placements on
    // the same variants.
    let variant_ids: Vec<Uuid> = lines.iter().filter_map(|l| l.variant_id).collect();
    let locked: Vec<(Uuid, i32)> = sqlx::query_as(
        "SELECT id, stock_quantity FROM product_variants WHERE id = ANY($1) FOR UPDATE",
    )
    .bind(&variant_ids)
    .fetch_all(&mut *tx)
    .await?;
    let stock: HashMap<Uuid, i32> = locked.into_iter().collect();

    // Validate every line before mutating anything.
    for line in &lines {
        if let Some(variant_id) = line.variant_id {
            let available = stock.get(&variant_id).copied().unwrap_or(0);
            if available < line.quantity {
                return Err(ApiError::InsufficientStock {
                    product: line.product_name.clone(),
                });
            }
        }
    }

    let subtotal: Decimal = lines
        .iter()
        .map(|l| l.unit_price() * Decimal::from(l.quantity))
        .sum();
    let tax = tax_for(subtotal);
    let shipping = shipping_for(subtotal);
    let total = subtotal + tax + shipping;

    let order: Order = sqlx::query_as(
        "INSERT INTO orders (id, order_number, user_id, status, subtotal, tax, shipping, total, \
                             shipping_address_id, billing_address_id, payment_method, \
                             payment_status, notes) \
         VALUES ($1, $2, $3, 'pending', $4, $5, $6, $7, $8, $9, $10, 'pending', $11) \
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(generate_order_number())
    .bind(user_id)
    .bind(subtotal)
    .bind(tax)
    .bind(shipping)
    .bind(total)
    .bind(new_order.shipping_address_id)
    .bind(new_order.billing_address_id)
    .bind(&new_order.payment_method)
    .bind(&new_order.notes)
    .fetch_one(&mut *tx)
    .await?;

    for line in &lines {
        let price = line.unit_price();
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, variant_id, quantity, price, total) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::now_v7())
        .bind(order.id)
        .bind(line.product_id)
        .bind(line.variant_id)
        .bind(line.quantity)
        .bind(price)
        .bind(price * Decimal::from(line.quantity))
        .execute(&mut *tx)
        .await?;

        if let Some(variant_id) = line.variant_id {
            // Guarded decrement. The lock above already serialized us,
            // so a zero row count here means the stock invariant was
            // about to break.
            let updated = sqlx::query(
                "UPDATE product_variants \
                 SET stock_quantity = stock_quantity - $2, updated_at = NOW() \
                 WHERE id = $1 AND stock_quantity >= $2",
            )
            .bind(variant_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                return Err(ApiError::InsufficientStock {
                    product: line.product_name.clone(),
                });
            }
        }
    }

    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(order)
}

/// Tax computation seam. The store currently charges no tax; replace
/// this when a tax rule lands.
fn tax_for(_subtotal: Decimal) -> Decimal {
    Decimal::ZERO
}

/// Shipping computation seam, flat zero for now.
fn shipping_for(_subtotal: Decimal) -> Decimal {
    Decimal::ZERO
}

/// Generate an order number from the current time plus a random
/// suffix, so concurrent placements within one millisecond still get
/// distinct numbers.
pub fn generate_order_number() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("ORD-{millis}-{suffix:04}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_number_has_expected_shape() {
        let number = generate_order_number();
        let mut parts = number.splitn(3, '-');
        assert_eq!(parts.next(), Some("ORD"));
        let millis: i64 = parts.next().unwrap().parse().unwrap();
        assert!(millis > 0);
        let suffix = parts.next().unwrap();
        assert_eq!(suffix.len(), 4);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn tax_and_shipping_default_to_zero() {
        let subtotal = Decimal::new(12_345, 2);
        assert_eq!(tax_for(subtotal), Decimal::ZERO);
        assert_eq!(shipping_for(subtotal), Decimal::ZERO);
    }
}
