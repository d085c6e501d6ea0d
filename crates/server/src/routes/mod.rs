use axum::{Router, middleware::from_fn_with_state};
use tower_http::trace::TraceLayer;

use crate::{Deployment, middleware::load_session};

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod health;
pub mod manufacturer;
pub mod orders;

pub fn router(deployment: Deployment) -> Router {
    // health probes bypass the session layer
    let storefront = Router::new()
        .merge(auth::router(&deployment))
        .merge(catalog::router(&deployment))
        .merge(cart::router(&deployment))
        .merge(checkout::router(&deployment))
        .merge(orders::router(&deployment))
        .merge(manufacturer::router(&deployment))
        .merge(admin::router(&deployment))
        .route_layer(from_fn_with_state(deployment.clone(), load_session));

    let api = Router::new()
        .merge(storefront)
        .merge(health::router(&deployment));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(deployment)
}
