use std::net::SocketAddr;

use foodgram::{config::Config, middleware::Context};
use log::{error, info};
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let pool = match PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            error!("Could not connect to the database: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
        error!("Could not apply migrations: {e}");
        std::process::exit(1);
    }

    let address = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Serving on {address}, media from {}", config.media_root.display());

    warp::serve(foodgram::routes(Context::new(pool, config)))
        .run(address)
        .await;
}
