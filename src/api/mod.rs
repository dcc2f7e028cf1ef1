mod chain;
mod health;
mod mining;
pub mod models;

use actix_web::web::{self, ServiceConfig};

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(chain::get_chain)
            .service(chain::view_chain)
            .service(chain::validate_chain)
            .service(chain::append_block)
            .service(mining::mine_block)
            .service(mining::cancel_mining),
    );
}
