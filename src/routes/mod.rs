mod foods;
mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(health::service_info))
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/petstore/foods", post(foods::create_food).get(foods::list_foods))
        .route(
            "/petstore/foods/{id}",
            put(foods::update_food)
                .get(foods::get_food)
                .delete(foods::delete_food),
        )
}
