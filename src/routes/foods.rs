use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, Result},
    models::{CreateFoodRequest, DeleteConfirmation, Food, FoodPatch, ListFoodsQuery},
    queries::food_queries,
    AppState,
};

pub async fn create_food(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateFoodRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Food>)> {
    let Json(body) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let food = body.validate()?;

    let created = food_queries::create_food(&state.db, food).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_foods(
    State(state): State<AppState>,
    Query(params): Query<ListFoodsQuery>,
) -> Result<Json<Vec<Food>>> {
    let (skip, limit) = params.resolve()?;

    let foods = food_queries::get_all(&state.db, skip, limit).await?;

    Ok(Json(foods))
}

pub async fn get_food(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<Food>> {
    let food = food_queries::find_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("Food item not found".to_string()))?;

    Ok(Json(food))
}

pub async fn update_food(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    payload: std::result::Result<Json<FoodPatch>, JsonRejection>,
) -> Result<Json<Food>> {
    let Json(patch) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    patch.validate()?;

    food_queries::update_food(&state.db, id, &patch).await?;

    // The repository hands back the merged patch; clients get the row
    // re-fetched so the response carries the fresh updated_at.
    let food = food_queries::find_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("Food item not found".to_string()))?;

    Ok(Json(food))
}

pub async fn delete_food(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DeleteConfirmation>> {
    food_queries::delete_food(&state.db, id).await?;

    Ok(Json(DeleteConfirmation {
        message: format!("Food item {} deleted successfully", id),
    }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::{config::DatabaseConfig, database::Database, routes, AppState};

    // A lazy pool pointed at an unreachable address: validation paths must
    // answer before the repository is ever involved, so these tests need no
    // live database. Anything that slips past validation hits the readiness
    // gate and comes back 503, which would fail the asserted 400s.
    fn test_app() -> Router {
        let db = Database::connect(&DatabaseConfig {
            url: "postgresql://127.0.0.1:1/petstore".to_string(),
            max_connections: 1,
            statement_timeout_ms: 100,
        })
        .unwrap();

        routes::create_router().with_state(AppState { db })
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn put_with_negative_price_is_rejected_before_the_repository() {
        let app = test_app();

        let response = app
            .oneshot(json_request("PUT", "/petstore/foods/1", r#"{"price": -1}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "Price must be a positive number");
    }

    #[tokio::test]
    async fn post_with_string_price_is_rejected_before_the_repository() {
        let app = test_app();

        let response = app
            .oneshot(json_request(
                "POST",
                "/petstore/foods",
                r#"{"name": "Kibble", "brand": "Acme", "price": "9.99", "stock": 3, "category": "dog"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn put_with_unparseable_price_is_rejected() {
        let app = test_app();

        let response = app
            .oneshot(json_request("PUT", "/petstore/foods/1", r#"{"price": "abc"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn put_with_string_stock_is_rejected() {
        let app = test_app();

        let response = app
            .oneshot(json_request("PUT", "/petstore/foods/1", r#"{"stock": "3"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn put_with_empty_body_is_rejected() {
        let app = test_app();

        let response = app
            .oneshot(json_request("PUT", "/petstore/foods/1", "{}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn post_with_missing_fields_is_rejected() {
        let app = test_app();

        let response = app
            .oneshot(json_request(
                "POST",
                "/petstore/foods",
                r#"{"name": "Kibble", "brand": "Acme"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_limit_over_cap_is_rejected() {
        let app = test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/petstore/foods?limit=101")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_integer_id_is_rejected() {
        let app = test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/petstore/foods/abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_against_unready_store_returns_503() {
        let app = test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/petstore/foods")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn root_reports_the_service_running() {
        let app = test_app();

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["message"], "Food Service is running");
    }

    #[tokio::test]
    async fn liveness_does_not_depend_on_the_store() {
        let app = test_app();

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_reflects_the_store() {
        let app = test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/ready")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
