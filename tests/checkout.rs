//! End-to-end tests for the order-placement transaction against a live
//! Postgres database.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use kie_store::checkout::{place_order, NewOrder};
use kie_store::error::ApiError;

async fn insert_user(db: &PgPool, email: &str) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO users (id, email, password_hash, first_name, last_name) \
         VALUES ($1, $2, 'x', 'Test', 'User')",
    )
    .bind(id)
    .bind(email)
    .execute(db)
    .await
    .unwrap();
    id
}

async fn insert_address(db: &PgPool, user_id: Uuid) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO user_addresses (id, user_id, address_line1, city, country, postal_code) \
         VALUES ($1, $2, '1 Main St', 'Lagos', 'NG', '100001')",
    )
    .bind(id)
    .bind(user_id)
    .execute(db)
    .await
    .unwrap();
    id
}

async fn insert_product(db: &PgPool, base: Decimal, discount: Option<Decimal>) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO products (id, sku, slug, name, base_price, discount_price) \
         VALUES ($1, $2, $3, 'Test Product', $4, $5)",
    )
    .bind(id)
    .bind(format!("SKU-{id}"))
    .bind(format!("test-product-{id}"))
    .bind(base)
    .bind(discount)
    .execute(db)
    .await
    .unwrap();
    id
}

async fn insert_variant(db: &PgPool, product_id: Uuid, price: Decimal, stock: i32) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO product_variants (id, product_id, sku, variant_name, price, stock_quantity) \
         VALUES ($1, $2, $3, 'Default', $4, $5)",
    )
    .bind(id)
    .bind(product_id)
    .bind(format!("VSKU-{id}"))
    .bind(price)
    .bind(stock)
    .execute(db)
    .await
    .unwrap();
    id
}

async fn insert_cart_item(db: &PgPool, user_id: Uuid, product_id: Uuid, variant_id: Option<Uuid>, quantity: i32) {
    sqlx::query(
        "INSERT INTO cart_items (id, user_id, product_id, variant_id, quantity) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .bind(product_id)
    .bind(variant_id)
    .bind(quantity)
    .execute(db)
    .await
    .unwrap();
}

fn order_input(shipping: Uuid, billing: Uuid) -> NewOrder {
    NewOrder {
        shipping_address_id: shipping,
        billing_address_id: billing,
        payment_method: "COD".to_string(),
        notes: None,
    }
}

async fn cart_count(db: &PgPool, user_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(db)
        .await
        .unwrap()
}

async fn stock_of(db: &PgPool, variant_id: Uuid) -> i32 {
    sqlx::query_scalar("SELECT stock_quantity FROM product_variants WHERE id = $1")
        .bind(variant_id)
        .fetch_one(db)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
async fn placement_converts_cart_to_order(db: PgPool) {
    let user = insert_user(&db, "buyer@example.com").await;
    let address = insert_address(&db, user).await;

    let shirt = insert_product(&db, Decimal::new(2_500, 2), None).await;
    let shirt_medium = insert_variant(&db, shirt, Decimal::new(2_750, 2), 10).await;
    let mug = insert_product(&db, Decimal::new(1_000, 2), None).await;

    insert_cart_item(&db, user, shirt, Some(shirt_medium), 2).await;
    insert_cart_item(&db, user, mug, None, 3).await;

    let order = place_order(&db, user, order_input(address, address))
        .await
        .unwrap();

    // 2 x 27.50 + 3 x 10.00
    assert_eq!(order.subtotal, Decimal::new(8_500, 2));
    assert_eq!(order.tax, Decimal::ZERO);
    assert_eq!(order.shipping, Decimal::ZERO);
    assert_eq!(order.total, order.subtotal);
    assert_eq!(order.status, "pending");
    assert!(order.order_number.starts_with("ORD-"));

    let item_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items WHERE order_id = $1")
        .bind(order.id)
        .fetch_one(&db)
        .await
        .unwrap();
    assert_eq!(item_count, 2);

    assert_eq!(stock_of(&db, shirt_medium).await, 8);
    assert_eq!(cart_count(&db, user).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn empty_cart_is_rejected(db: PgPool) {
    let user = insert_user(&db, "empty@example.com").await;
    let address = insert_address(&db, user).await;

    let err = place_order(&db, user, order_input(address, address))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::EmptyCart));
}

#[sqlx::test(migrations = "./migrations")]
async fn insufficient_stock_rolls_back_everything(db: PgPool) {
    let user = insert_user(&db, "greedy@example.com").await;
    let address = insert_address(&db, user).await;

    let cheap = insert_product(&db, Decimal::new(500, 2), None).await;
    let scarce = insert_product(&db, Decimal::new(9_900, 2), None).await;
    let scarce_variant = insert_variant(&db, scarce, Decimal::new(9_900, 2), 1).await;

    insert_cart_item(&db, user, cheap, None, 1).await;
    insert_cart_item(&db, user, scarce, Some(scarce_variant), 2).await;

    let err = place_order(&db, user, order_input(address, address))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InsufficientStock { .. }));

    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(user)
        .fetch_one(&db)
        .await
        .unwrap();
    assert_eq!(orders, 0);
    assert_eq!(stock_of(&db, scarce_variant).await, 1);
    assert_eq!(cart_count(&db, user).await, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn discount_price_beats_base_price(db: PgPool) {
    let user = insert_user(&db, "bargain@example.com").await;
    let address = insert_address(&db, user).await;

    let product = insert_product(&db, Decimal::new(10_000, 2), Some(Decimal::new(8_000, 2))).await;
    insert_cart_item(&db, user, product, None, 1).await;

    let order = place_order(&db, user, order_input(address, address))
        .await
        .unwrap();
    assert_eq!(order.subtotal, Decimal::new(8_000, 2));
}

#[sqlx::test(migrations = "./migrations")]
async fn variant_price_beats_discount_price(db: PgPool) {
    let user = insert_user(&db, "variant@example.com").await;
    let address = insert_address(&db, user).await;

    let product = insert_product(&db, Decimal::new(10_000, 2), Some(Decimal::new(8_000, 2))).await;
    let variant = insert_variant(&db, product, Decimal::new(9_000, 2), 5).await;
    insert_cart_item(&db, user, product, Some(variant), 1).await;

    let order = place_order(&db, user, order_input(address, address))
        .await
        .unwrap();
    assert_eq!(order.subtotal, Decimal::new(9_000, 2));
}

#[sqlx::test(migrations = "./migrations")]
async fn snapshot_price_survives_later_product_edits(db: PgPool) {
    let user = insert_user(&db, "snapshot@example.com").await;
    let address = insert_address(&db, user).await;

    let product = insert_product(&db, Decimal::new(4_200, 2), None).await;
    insert_cart_item(&db, user, product, None, 1).await;

    let order = place_order(&db, user, order_input(address, address))
        .await
        .unwrap();

    sqlx::query("UPDATE products SET base_price = 99.99 WHERE id = $1")
        .bind(product)
        .execute(&db)
        .await
        .unwrap();

    let (price, total): (Decimal, Decimal) = sqlx::query_as(
        "SELECT price, total FROM order_items WHERE order_id = $1",
    )
    .bind(order.id)
    .fetch_one(&db)
    .await
    .unwrap();
    assert_eq!(price, Decimal::new(4_200, 2));
    assert_eq!(total, Decimal::new(4_200, 2));
}

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_placements_never_oversell(db: PgPool) {
    let product = insert_product(&db, Decimal::new(5_000, 2), None).await;
    let last_one = insert_variant(&db, product, Decimal::new(5_000, 2), 1).await;

    let alice = insert_user(&db, "alice@example.com").await;
    let alice_address = insert_address(&db, alice).await;
    insert_cart_item(&db, alice, product, Some(last_one), 1).await;

    let bob = insert_user(&db, "bob@example.com").await;
    let bob_address = insert_address(&db, bob).await;
    insert_cart_item(&db, bob, product, Some(last_one), 1).await;

    let (first, second) = tokio::join!(
        place_order(&db, alice, order_input(alice_address, alice_address)),
        place_order(&db, bob, order_input(bob_address, bob_address)),
    );

    let successes = [first.is_ok(), second.is_ok()]
        .iter()
        .filter(|ok| **ok)
        .count();
    assert_eq!(successes, 1);

    let loser = if first.is_err() {
        first.unwrap_err()
    } else {
        second.unwrap_err()
    };
    assert!(matches!(loser, ApiError::InsufficientStock { .. }));

    assert_eq!(stock_of(&db, last_one).await, 0);
    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(&db)
        .await
        .unwrap();
    assert_eq!(orders, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn order_numbers_are_unique_across_placements(db: PgPool) {
    let product = insert_product(&db, Decimal::new(1_500, 2), None).await;

    let mut handles = Vec::new();
    for n in 0..5 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            let user = insert_user(&db, &format!("shopper{n}@example.com")).await;
            let address = insert_address(&db, user).await;
            insert_cart_item(&db, user, product, None, 1).await;
            place_order(&db, user, order_input(address, address))
                .await
                .unwrap()
        }));
    }

    let mut numbers = std::collections::HashSet::new();
    for handle in handles {
        let order = handle.await.unwrap();
        assert!(numbers.insert(order.order_number));
    }
    assert_eq!(numbers.len(), 5);
}
