use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::{appointment_routes, AppointmentBookingService};
use assistant_cell::{assistant_routes, RuleBasedResponder};
use shared_config::AppConfig;

pub fn create_router(
    config: Arc<AppConfig>,
    appointments: Arc<AppointmentBookingService>,
    assistant: Arc<RuleBasedResponder>,
) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic appointment API is running!" }))
        .nest("/appointments", appointment_routes(config.clone(), appointments))
        .nest("/assistant", assistant_routes(config, assistant))
}
