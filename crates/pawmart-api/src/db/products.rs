//! Stock updates applied directly to product documents.
//!
//! Checkout deducts stock with one conditional bulk `UPDATE`: each line only
//! applies if the stored stock still covers it. There is no transaction and
//! no rollback. The caller compares the applied count with the number of
//! lines and logs a warning on a partial deduction.

use pawmart_core::StockDeduction;
use sqlx::PgPool;
use uuid::Uuid;

fn unzip(deductions: &[StockDeduction]) -> (Vec<Uuid>, Vec<i64>) {
    deductions
        .iter()
        .map(|d| (d.product_id, i64::from(d.quantity)))
        .unzip()
}

/// Decrement stock where `stock >= quantity`. Returns the number of lines applied.
pub async fn deduct_stock(pool: &PgPool, deductions: &[StockDeduction]) -> Result<u64, sqlx::Error> {
    if deductions.is_empty() {
        return Ok(0);
    }
    let (ids, quantities) = unzip(deductions);

    let result = sqlx::query(
        "UPDATE documents AS d
         SET body = jsonb_set(d.body, '{stock}', to_jsonb((d.body->>'stock')::bigint - x.qty)),
             updated_at = now()
         FROM UNNEST($1::uuid[], $2::bigint[]) AS x(id, qty)
         WHERE d.collection = 'products'
           AND d.id = x.id
           AND (d.body->>'stock')::bigint >= x.qty",
    )
    .bind(ids)
    .bind(quantities)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Return stock for cancelled order lines. Returns the number of lines applied.
pub async fn restock(pool: &PgPool, deductions: &[StockDeduction]) -> Result<u64, sqlx::Error> {
    if deductions.is_empty() {
        return Ok(0);
    }
    let (ids, quantities) = unzip(deductions);

    let result = sqlx::query(
        "UPDATE documents AS d
         SET body = jsonb_set(d.body, '{stock}', to_jsonb((d.body->>'stock')::bigint + x.qty)),
             updated_at = now()
         FROM UNNEST($1::uuid[], $2::bigint[]) AS x(id, qty)
         WHERE d.collection = 'products' AND d.id = x.id",
    )
    .bind(ids)
    .bind(quantities)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
