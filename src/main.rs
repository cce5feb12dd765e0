use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer, Responder, Scope};

mod config;
mod datastore;
mod error;
mod identity;
mod models;
mod routes;

use config::{Config, API_PREFIX};
use identity::IdentityHeader;

async fn get_api_index() -> impl Responder {
    "welcome to the todo list api"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env();

    let database = if config.db_dir.is_empty() {
        log::warn!("DB_DIR is empty, lists are kept in memory only");
        datastore::Database::in_memory()
    } else {
        datastore::Database::open(&config.db_dir).map_err(|e| {
            log::error!("cannot open datastore in {}: {}", config.db_dir, e);
            std::io::Error::new(std::io::ErrorKind::Other, e)
        })?
    };
    let app_data = web::Data::new(database);
    let identity_header = web::Data::new(IdentityHeader(config.identity_header.clone()));

    log::info!(
        "listening on {}:{}, datastore in {}",
        config.bind_address,
        config.port,
        config.db_dir
    );
    HttpServer::new(move || {
        let list_scope =
            Scope::new(&format!("{}/list", API_PREFIX)).configure(routes::list::configure_routes);

        App::new()
            .app_data(app_data.clone())
            .app_data(identity_header.clone())
            .wrap(middleware::NormalizePath::new(
                middleware::TrailingSlash::Trim,
            ))
            .wrap(middleware::Logger::default())
            .wrap(Cors::permissive())
            .route(API_PREFIX, web::get().to(get_api_index))
            .service(list_scope)
    })
    .bind((config.bind_address.as_str(), config.port))?
    .run()
    .await
}
