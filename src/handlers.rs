// region:    --- Imports
use crate::app::AppState;
use crate::bidding::commands::PlaceBidRequest;
use crate::bidding::{CropId, UserId};
use crate::catalog::model::{CropChanges, NewCropRequest, WishlistRequest};
use crate::catalog::CatalogError;
use crate::chat::model::SendMessageRequest;
use crate::error::ApiError;
use crate::session::{Session, SessionUser};
use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Path, Query, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

// endregion: --- Imports

// region:    --- Helpers
fn parse_crop_id(raw: &str) -> Result<CropId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request("INVALID_ID", "Invalid crop ID"))
}

fn require_user(session: Session) -> Result<SessionUser, ApiError> {
    session.0.ok_or_else(ApiError::unauthenticated)
}

/// JSON 본문 추출기. 형식 오류도 {"error", "code"} 형태의 400 으로 응답한다.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(malformed(rejection)),
        }
    }
}

fn malformed(rejection: JsonRejection) -> ApiError {
    info!("{:<12} --> 잘못된 요청 본문: {}", "Handler", rejection.body_text());
    ApiError::bad_request("MALFORMED", rejection.body_text())
}
// endregion: --- Helpers

// region:    --- Crop Handlers

/// 표시 가능한 작물 목록
pub async fn handle_get_crops(State(state): State<AppState>) -> Result<Response, ApiError> {
    info!("{:<12} --> 작물 목록 조회", "Handler");
    let crops = state.engine.list_visible_crops(Utc::now()).await?;
    Ok(Json(crops).into_response())
}

/// 작물 등록
pub async fn handle_create_crop(
    State(state): State<AppState>,
    session: Session,
    ApiJson(request): ApiJson<NewCropRequest>,
) -> Result<Response, ApiError> {
    let farmer = require_user(session)?;
    info!("{:<12} --> 작물 등록 요청: farmer={}", "Handler", farmer.id);
    let crop = state.catalog.create(&farmer, request, Utc::now()).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"message": "Crop added successfully", "id": crop.id})),
    )
        .into_response())
}

/// 작물 조회
pub async fn handle_get_crop(
    State(state): State<AppState>,
    Path(crop_id): Path<String>,
) -> Result<Response, ApiError> {
    let crop_id = parse_crop_id(&crop_id)?;
    info!("{:<12} --> 작물 조회 id: {}", "Handler", crop_id);
    let crop = state.engine.crop(crop_id, Utc::now()).await?;
    Ok(Json(crop).into_response())
}

/// 작물 수정
pub async fn handle_update_crop(
    State(state): State<AppState>,
    session: Session,
    Path(crop_id): Path<String>,
    ApiJson(changes): ApiJson<CropChanges>,
) -> Result<Response, ApiError> {
    let crop_id = parse_crop_id(&crop_id)?;
    let farmer = require_user(session)?;
    info!("{:<12} --> 작물 수정 요청 id: {}", "Handler", crop_id);
    let crop = state.catalog.update(&farmer, crop_id, changes).await?;
    Ok(Json(json!({"message": "Crop updated", "crop": crop})).into_response())
}

/// 작물 삭제
pub async fn handle_delete_crop(
    State(state): State<AppState>,
    session: Session,
    Path(crop_id): Path<String>,
) -> Result<Response, ApiError> {
    let crop_id = parse_crop_id(&crop_id)?;
    let farmer = require_user(session)?;
    info!("{:<12} --> 작물 삭제 요청 id: {}", "Handler", crop_id);
    match state.catalog.delete(&farmer, crop_id).await {
        Ok(report) => {
            Ok(Json(json!({"message": "Crop deleted", "report": report})).into_response())
        }
        // 삭제 실패 시에도 어떤 연쇄 단계가 처리되었는지 알려준다
        Err(CatalogError::DeleteFailed { report, source }) => Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": format!("Crop deletion failed: {source}"),
                "code": "STORAGE",
                "report": report,
            })),
        )
            .into_response()),
        Err(e) => Err(e.into()),
    }
}

// endregion: --- Crop Handlers

// region:    --- Auction Handlers

/// 입찰 요청 처리
pub async fn handle_bid(
    State(state): State<AppState>,
    Path(crop_id): Path<String>,
    ApiJson(request): ApiJson<PlaceBidRequest>,
) -> Result<Response, ApiError> {
    let crop_id = parse_crop_id(&crop_id)?;
    let cmd = request.into_command(crop_id)?;
    info!("{:<12} --> 입찰 요청: {:?}", "Handler", cmd);

    let bid = state.engine.place_bid(cmd, Utc::now()).await?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Bid placed successfully!",
            "current_price": bid.bid_price,
            "bid": bid,
        })),
    )
        .into_response())
}

/// 입찰 이력 조회
pub async fn handle_get_bid_history(
    State(state): State<AppState>,
    Path(crop_id): Path<String>,
) -> Result<Response, ApiError> {
    let crop_id = parse_crop_id(&crop_id)?;
    let history = state.engine.bid_history(crop_id).await?;
    Ok(Json(history).into_response())
}

/// 경매 종료 (작물 주인만)
pub async fn handle_close_auction(
    State(state): State<AppState>,
    session: Session,
    Path(crop_id): Path<String>,
) -> Result<Response, ApiError> {
    let crop_id = parse_crop_id(&crop_id)?;
    let farmer = require_user(session)?;
    let now = Utc::now();

    let crop = state.engine.crop(crop_id, now).await?;
    if crop.farmer_id != farmer.id {
        return Err(CatalogError::NotOwner.into());
    }
    info!("{:<12} --> 경매 종료 요청 id: {}", "Handler", crop_id);
    let closure = state.engine.close_auction(crop_id, now).await?;
    Ok(Json(closure).into_response())
}

/// 낙찰자 조회 (없으면 null)
pub async fn handle_get_winner(
    State(state): State<AppState>,
    Path(crop_id): Path<String>,
) -> Result<Response, ApiError> {
    let crop_id = parse_crop_id(&crop_id)?;
    let winner = state.engine.winner(crop_id, Utc::now()).await?;
    Ok(Json(winner).into_response())
}

// endregion: --- Auction Handlers

// region:    --- Wishlist Handlers

/// 찜 목록 조회
pub async fn handle_get_wishlist(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Response, ApiError> {
    let entries = state.catalog.wishlist(&UserId(user_id)).await?;
    Ok(Json(entries).into_response())
}

/// 찜 추가
pub async fn handle_add_to_wishlist(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<WishlistRequest>,
) -> Result<Response, ApiError> {
    let (Some(user_id), Some(crop_id)) = (request.user_id, request.crop_id) else {
        return Err(ApiError::bad_request("MISSING", "Missing wishlist data"));
    };
    let crop_id = parse_crop_id(&crop_id)?;
    state
        .catalog
        .add_to_wishlist(UserId(user_id), crop_id, Utc::now())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"message": "Added to wishlist"})),
    )
        .into_response())
}

// endregion: --- Wishlist Handlers

// region:    --- Chat Handlers

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    pub crop_id: Option<String>,
}

/// 채팅 화면 정보
pub async fn handle_chat(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ChatQuery>,
) -> Result<Response, ApiError> {
    let Some(raw) = query.crop_id.filter(|c| !c.trim().is_empty()) else {
        return Err(ApiError::bad_request("INVALID_ID", "Invalid crop ID"));
    };
    let crop_id = parse_crop_id(&raw)?;
    let now = Utc::now();
    // 작물 존재 확인이 로그인 확인보다 먼저
    state.engine.crop(crop_id, now).await?;

    let Some(user) = session.0 else {
        return Ok(Redirect::to("/login").into_response());
    };
    info!(
        "{:<12} --> 채팅 요청: crop={}, user={}",
        "Handler", crop_id, user.id
    );
    let chat = state.chat.open(crop_id, &user, now).await?;
    Ok(Json(chat).into_response())
}

/// 메시지 조회
pub async fn handle_get_messages(
    State(state): State<AppState>,
    session: Session,
    Path(crop_id): Path<String>,
) -> Result<Response, ApiError> {
    let crop_id = parse_crop_id(&crop_id)?;
    let user = require_user(session)?;
    let messages = state.chat.history(crop_id, &user, Utc::now()).await?;
    Ok(Json(messages).into_response())
}

/// 메시지 전송
pub async fn handle_send_message(
    State(state): State<AppState>,
    session: Session,
    ApiJson(request): ApiJson<SendMessageRequest>,
) -> Result<Response, ApiError> {
    let user = require_user(session)?;
    let (Some(crop_id), Some(message)) = (request.crop_id, request.message) else {
        return Err(ApiError::bad_request("MISSING", "Missing required fields"));
    };
    let crop_id = parse_crop_id(&crop_id)?;
    let receiver = request
        .receiver_id
        .filter(|r| !r.trim().is_empty())
        .map(|r| UserId(r.trim().to_string()));

    let view = state
        .chat
        .send(crop_id, &user, receiver, &message, Utc::now())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"message": "Message sent", "data": view})),
    )
        .into_response())
}

// endregion: --- Chat Handlers
