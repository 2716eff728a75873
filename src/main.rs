use actix_web::{web, App, HttpServer};
use anyhow::Result;
use hayy_advisor::store::{DataStore, NeighborhoodStore};
use hayy_advisor::{api, Advisor, Settings};

#[actix_web::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::load("Config")?;

    let store = DataStore::load(&settings.data)?;
    log::info!(
        "Initializing advisor with {} neighborhoods...",
        store.available_neighborhoods().len()
    );
    let advisor = Advisor::with_store(store, &settings.engine);
    let data = web::Data::new(advisor);

    let host = settings.server.host.clone();
    let port = settings.server.port;
    log::info!("Starting server at http://{}:{}", host, port);
    HttpServer::new(move || App::new().app_data(data.clone()).configure(api::configure))
        .bind((host, port))?
        .run()
        .await?;
    Ok(())
}
