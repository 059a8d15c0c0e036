pub mod analytics;
pub mod api;
pub mod app;
pub mod assistant;
pub mod config;
pub mod fetch_error;
pub mod generation;
pub mod geocode_fetcher;
pub mod models;
pub mod preferences;
pub mod recommendations;
pub mod scheduler;
pub mod services;
pub mod upstream;
pub mod weather_fetcher;
