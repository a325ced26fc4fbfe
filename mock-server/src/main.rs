use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let api_key =
        std::env::var("FLUX_API_KEY").unwrap_or_else(|_| mock_server::DEFAULT_API_KEY.to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    log::info!("listening on http://{addr}/{api_key}/");
    mock_server::run_with_key(listener, &api_key).await
}
