// region:    --- Imports
use crate::auction::{AuctionEngine, CropLocks};
use crate::catalog::CropCatalog;
use crate::chat::ChatService;
use crate::handlers;
use crate::store::Store;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

// endregion: --- Imports

// region:    --- App State
/// 핸들러 공용 상태. 모든 서비스가 같은 저장소 핸들과 작물 잠금을 공유한다.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AuctionEngine>,
    pub catalog: Arc<CropCatalog>,
    pub chat: Arc<ChatService>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, auction_window: chrono::Duration) -> Self {
        let locks = Arc::new(CropLocks::new());
        let engine = Arc::new(AuctionEngine::with_locks(
            Arc::clone(&store),
            Arc::clone(&locks),
        ));
        let catalog = Arc::new(CropCatalog::new(store, locks, auction_window));
        let chat = Arc::new(ChatService::new(Arc::clone(&engine)));
        Self {
            engine,
            catalog,
            chat,
        }
    }
}
// endregion: --- App State

// region:    --- Routes
pub fn routes(state: AppState, body_limit: usize) -> Router {
    // 프론트엔드 테스트 페이지를 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/crops",
            get(handlers::handle_get_crops).post(handlers::handle_create_crop),
        )
        .route(
            "/api/crops/:crop_id",
            get(handlers::handle_get_crop)
                .put(handlers::handle_update_crop)
                .delete(handlers::handle_delete_crop),
        )
        .route(
            "/api/bids/:crop_id",
            post(handlers::handle_bid).get(handlers::handle_get_bid_history),
        )
        .route(
            "/api/auction/close/:crop_id",
            post(handlers::handle_close_auction),
        )
        .route(
            "/api/auction/winner/:crop_id",
            get(handlers::handle_get_winner),
        )
        .route("/api/wishlist", post(handlers::handle_add_to_wishlist))
        .route("/api/wishlist/:user_id", get(handlers::handle_get_wishlist))
        .route("/api/messages", post(handlers::handle_send_message))
        .route("/api/messages/:crop_id", get(handlers::handle_get_messages))
        .route("/chat", get(handlers::handle_chat))
        .layer(cors)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
// endregion: --- Routes
