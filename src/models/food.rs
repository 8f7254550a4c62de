use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::{AppError, Result};

pub const DEFAULT_PAGE_SIZE: i64 = 100;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Food {
    pub id: i32,
    pub name: String,
    pub brand: String,
    pub price: Decimal,
    pub stock: i32,
    pub category: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Price accepts JSON numbers only. The stock decoder already rejects
/// strings, but `Decimal` would happily parse `"9.99"`, letting a wrong-type
/// field slip past the contract's 400.
fn numeric_price<'de, D>(deserializer: D) -> std::result::Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None => Ok(None),
        Some(serde_json::Value::Number(n)) => n
            .to_string()
            .parse::<Decimal>()
            .map(Some)
            .map_err(de::Error::custom),
        Some(_) => Err(de::Error::custom("Price must be a positive number")),
    }
}

/// Raw create body. Every field is optional at the deserialization layer so
/// the transport can answer missing fields with 400 instead of a decode error.
#[derive(Debug, Deserialize)]
pub struct CreateFoodRequest {
    pub name: Option<String>,
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "numeric_price")]
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub category: Option<String>,
    pub description: Option<String>,
}

/// A fully validated create payload, ready for insertion.
#[derive(Debug, Clone)]
pub struct NewFood {
    pub name: String,
    pub brand: String,
    pub price: Decimal,
    pub stock: i32,
    pub category: String,
    pub description: Option<String>,
}

impl CreateFoodRequest {
    pub fn validate(self) -> Result<NewFood> {
        let non_empty = |field: Option<String>| field.filter(|s| !s.is_empty());

        let (name, brand, category) = match (
            non_empty(self.name),
            non_empty(self.brand),
            non_empty(self.category),
        ) {
            (Some(name), Some(brand), Some(category)) => (name, brand, category),
            _ => {
                return Err(AppError::BadRequest(
                    "Missing required fields: name, brand, price, stock, category".to_string(),
                ))
            }
        };

        let (price, stock) = match (self.price, self.stock) {
            (Some(price), Some(stock)) => (price, stock),
            _ => {
                return Err(AppError::BadRequest(
                    "Missing required fields: name, brand, price, stock, category".to_string(),
                ))
            }
        };

        if price < Decimal::ZERO {
            return Err(AppError::BadRequest(
                "Price must be a positive number".to_string(),
            ));
        }

        if stock < 0 {
            return Err(AppError::BadRequest(
                "Stock must be a non-negative number".to_string(),
            ));
        }

        Ok(NewFood {
            name,
            brand,
            price,
            stock,
            category,
            description: self.description,
        })
    }
}

/// Closed partial-update shape: updatable columns are statically known, so
/// statement construction is never driven by caller-supplied field names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoodPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(
        default,
        deserialize_with = "numeric_price",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FoodPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.brand.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.category.is_none()
            && self.description.is_none()
    }

    /// Range checks for the numeric fields, applied before the repository
    /// is involved.
    pub fn validate(&self) -> Result<()> {
        if let Some(price) = self.price {
            if price < Decimal::ZERO {
                return Err(AppError::BadRequest(
                    "Price must be a positive number".to_string(),
                ));
            }
        }

        if let Some(stock) = self.stock {
            if stock < 0 {
                return Err(AppError::BadRequest(
                    "Stock must be a non-negative number".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// What `update` hands back: the target id merged with the supplied fields.
/// This is NOT a reloaded row; callers needing canonical state re-fetch.
#[derive(Debug, Serialize)]
pub struct PatchedFood {
    pub id: i32,
    #[serde(flatten)]
    pub fields: FoodPatch,
}

#[derive(Debug, Deserialize)]
pub struct ListFoodsQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl ListFoodsQuery {
    /// Resolves pagination to (offset, limit), rejecting out-of-range values.
    pub fn resolve(&self) -> Result<(i64, i64)> {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if limit > MAX_PAGE_SIZE {
            return Err(AppError::BadRequest("Limit cannot exceed 100".to_string()));
        }
        if limit < 0 {
            return Err(AppError::BadRequest(
                "Limit must be a non-negative number".to_string(),
            ));
        }

        let skip = self.skip.unwrap_or(0);
        if skip < 0 {
            return Err(AppError::BadRequest(
                "Skip must be a non-negative number".to_string(),
            ));
        }

        Ok((skip, limit))
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteConfirmation {
    pub message: String,
}
