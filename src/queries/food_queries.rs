use sqlx::{Postgres, QueryBuilder};

use crate::{
    database::Database,
    error::{AppError, Result},
    models::{Food, FoodPatch, NewFood, PatchedFood},
};

/// Insert a row and return it as persisted, with the generated id and
/// timestamps. Field validation is the caller's job.
pub async fn create_food(db: &Database, food: NewFood) -> Result<Food> {
    let pool = db.pool()?;

    let created = db
        .run(
            sqlx::query_as::<_, Food>(
                "INSERT INTO foods (name, brand, price, stock, category, description)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING *",
            )
            .bind(&food.name)
            .bind(&food.brand)
            .bind(food.price)
            .bind(food.stock)
            .bind(&food.category)
            .bind(&food.description)
            .fetch_one(pool),
        )
        .await?;

    Ok(created)
}

/// Page through foods, newest first. No total-count side channel.
pub async fn get_all(db: &Database, offset: i64, limit: i64) -> Result<Vec<Food>> {
    let pool = db.pool()?;

    let foods = db
        .run(
            sqlx::query_as::<_, Food>(
                "SELECT * FROM foods
                 ORDER BY created_at DESC
                 LIMIT $1 OFFSET $2",
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(pool),
        )
        .await?;

    Ok(foods)
}

/// Find food by ID. Absence is `None`, not an error.
pub async fn find_by_id(db: &Database, id: i32) -> Result<Option<Food>> {
    let pool = db.pool()?;

    let food = db
        .run(
            sqlx::query_as::<_, Food>("SELECT * FROM foods WHERE id = $1")
                .bind(id)
                .fetch_optional(pool),
        )
        .await?;

    Ok(food)
}

/// Apply a partial update. Touches exactly the supplied fields plus
/// `updated_at`, and returns the id merged with those fields rather than a
/// reloaded row; callers needing canonical state re-fetch.
pub async fn update_food(db: &Database, id: i32, patch: &FoodPatch) -> Result<PatchedFood> {
    if patch.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }

    let pool = db.pool()?;

    let mut query = build_update_query(id, patch);
    let result = db.run(query.build().execute(pool)).await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Food item not found".to_string()));
    }

    Ok(PatchedFood {
        id,
        fields: patch.clone(),
    })
}

/// Build the UPDATE statement for a non-empty patch. Column text and bind are
/// pushed as one unit per present field, in a fixed order, so the parameter
/// index can never drift from the value list.
fn build_update_query<'a>(id: i32, patch: &'a FoodPatch) -> QueryBuilder<'a, Postgres> {
    let mut query = QueryBuilder::new("UPDATE foods SET ");
    let mut has_fields = false;

    if let Some(ref name) = patch.name {
        query.push("name = ");
        query.push_bind(name);
        has_fields = true;
    }

    if let Some(ref brand) = patch.brand {
        if has_fields {
            query.push(", ");
        }
        query.push("brand = ");
        query.push_bind(brand);
        has_fields = true;
    }

    if let Some(price) = patch.price {
        if has_fields {
            query.push(", ");
        }
        query.push("price = ");
        query.push_bind(price);
        has_fields = true;
    }

    if let Some(stock) = patch.stock {
        if has_fields {
            query.push(", ");
        }
        query.push("stock = ");
        query.push_bind(stock);
        has_fields = true;
    }

    if let Some(ref category) = patch.category {
        if has_fields {
            query.push(", ");
        }
        query.push("category = ");
        query.push_bind(category);
        has_fields = true;
    }

    if let Some(ref description) = patch.description {
        if has_fields {
            query.push(", ");
        }
        query.push("description = ");
        query.push_bind(description);
    }

    query.push(", updated_at = NOW() WHERE id = ");
    query.push_bind(id);

    query
}

/// Delete a food row. Zero rows affected means the id never existed.
pub async fn delete_food(db: &Database, id: i32) -> Result<()> {
    let pool = db.pool()?;

    let result = db
        .run(
            sqlx::query("DELETE FROM foods WHERE id = $1")
                .bind(id)
                .execute(pool),
        )
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Food item not found".to_string()));
    }

    Ok(())
}
