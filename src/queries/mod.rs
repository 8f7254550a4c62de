pub mod food_queries;
