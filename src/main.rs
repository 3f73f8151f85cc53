use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use log::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod ledger;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::get_blockchain,
        api::handlers::get_mempool,
        api::handlers::generate_keypair,
        api::handlers::get_balance,
        api::handlers::create_transaction,
        api::handlers::advance_b,
        api::handlers::advance_c
    ),
    components(
        schemas(
            ledger::LedgerEntry,
            ledger::EntryState,
            ledger::Keypair,
            api::handlers::ChainResponse,
            api::handlers::MempoolResponse,
            api::handlers::CreateTransactionRequest,
            api::handlers::EntryResponse,
            api::handlers::AdvanceBRequest,
            api::handlers::AdvanceCRequest,
            api::handlers::BalanceResponse
        )
    ),
    tags(
        (name = "ledger", description = "Ledger node API endpoints")
    ),
    info(
        title = "Braidchain API",
        version = "0.1.0",
        description = "A single-node DAG-shaped ledger with three-phase validation",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
struct ApiDoc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // One node instance shared by every request
    let node = web::Data::new(ledger::Node::new());

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8080);

    info!("Starting HTTP server at http://{}:{}", bind_addr, port);

    // Start HTTP server
    HttpServer::new(move || {
        // Configure CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        // Configure OpenAPI documentation
        let openapi = ApiDoc::openapi();

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(node.clone())
            // API routes
            .configure(api::configure_routes)
            // Swagger UI
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone())
            )
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
