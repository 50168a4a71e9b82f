mod routes;

use std::{error::Error, net::SocketAddr};

use axum_server::tls_rustls::RustlsConfig;
use hotel::{domain::core::ReservationService, infrastructure::core::connect, HotelConfig};
use tracing::{error, info, Level};

#[tokio::main]
async fn main() {
    match HotelConfig::load() {
        Ok(config) => {
            tracing_subscriber::fmt()
                .with_max_level(Level::from(&config.logger.level))
                .init();
            if let Err(error) = serve(&config).await {
                error!("アプリケーションエラー: {}", error);
            }
        }
        Err(error) => {
            tracing_subscriber::fmt::init();
            error!("アプリケーションエラー: {}", error)
        }
    }
}

async fn serve(config: &HotelConfig) -> Result<(), Box<dyn Error>> {
    let store = connect(&config.store).await?;
    let app = routes::router(ReservationService::new(store));
    let addr: SocketAddr = config.server.addr().parse()?;
    match &config.server.tls {
        Some(tls) => {
            let rustls = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;
            info!("HTTPSで待ち受け: {}", addr);
            axum_server::bind_rustls(addr, rustls)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            info!("HTTPで待ち受け: {}", addr);
            axum_server::bind(addr)
                .serve(app.into_make_service())
                .await?;
        }
    }
    Ok(())
}
