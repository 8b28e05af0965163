// region:    --- Imports
use clap::Parser;
use crop_auction::app::{routes, AppState};
use crop_auction::config::Config;
use crop_auction::database::DatabaseManager;
use crop_auction::scheduler::AuctionScheduler;
use crop_auction::store::{MemoryStore, PgStore, Store};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let config = Config::parse();
    if let Err(e) = config.validate() {
        error!("{:<12} --> 설정 오류: {}", "Main", e);
        return Err(e.into());
    }

    // 저장소 선택 (DATABASE_URL 이 없으면 메모리 저장소)
    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let db_manager = Arc::new(DatabaseManager::connect(url, config.max_connections).await?);
            if let Err(e) = db_manager.initialize_database().await {
                error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
                return Err(e.into());
            }
            info!("{:<12} --> 데이터베이스 초기화 성공", "Main");
            Arc::new(PgStore::new(db_manager))
        }
        None => {
            warn!(
                "{:<12} --> DATABASE_URL 없음, 메모리 저장소로 실행",
                "Main"
            );
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(store, config.auction_window());

    // 만료 경매 정리 (설정한 경우에만)
    if let Some(period) = config.sweep_interval() {
        AuctionScheduler::new(Arc::clone(&state.engine), period).start();
    }

    let routes_all = routes(state, config.body_limit_bytes);

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
