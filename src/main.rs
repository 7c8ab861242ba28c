use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use learner_server::{
    app_state::AppState, config::Config, handlers, middleware::RequestIdMiddleware,
    services::profile_pic_store::public_files,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env();
    if config.is_production() {
        config.validate_for_production();
    }

    std::fs::create_dir_all(config.upload_dir.join("tmp"))?;

    let host = config.web_server_host.clone();
    let port = config.web_server_port;
    let upload_dir = config.upload_dir.clone();

    let state = AppState::new(config).await.map_err(|e| {
        log::error!("Failed to initialise application state: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    log::info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin_fn(|_origin, _req| true)
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(cors)
            .wrap(RequestIdMiddleware)
            .wrap(Logger::new(
                r#"%a "%r" %s %b %T request_id=%{x-request-id}o"#,
            ))
            .configure(handlers::configure)
            .service(public_files(&upload_dir))
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
