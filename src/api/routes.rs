use actix_web::web;

use super::handlers;

/// Configures the API routes
///
/// # Arguments
///
/// * `cfg` - The service configuration
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/blockchain", web::get().to(handlers::get_blockchain))
            .route("/mempool", web::get().to(handlers::get_mempool))
            .route("/generate_keypair", web::get().to(handlers::generate_keypair))
            .route("/balance/{address}", web::get().to(handlers::get_balance))
            .route("/create_transaction", web::post().to(handlers::create_transaction))
            .route("/advance_b", web::post().to(handlers::advance_b))
            .route("/advance_c", web::post().to(handlers::advance_c))
    );
}
