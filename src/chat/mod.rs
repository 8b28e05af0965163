/// 채팅
/// 낙찰된 거래의 농부와 낙찰자만 해당 작물의 채팅에 참여할 수 있다.
// region:    --- Imports
use crate::auction::{AuctionEngine, AuctionError};
use crate::bidding::{Crop, CropId, UserId, WinnerRecord};
use crate::session::{Role, SessionUser};
use crate::store::StoreError;
use chrono::{DateTime, Utc};
use model::{ChatPartner, MessageView, NewMessage};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

// endregion: --- Imports

pub mod model;

const FARMER_FALLBACK_NAME: &str = "Farmer";
const WINNER_FALLBACK_NAME: &str = "Winning Bidder";
const UNKNOWN_NAME: &str = "Unknown";

// region:    --- Authorization Gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChatDenied {
    #[error("Not authorized.")]
    NotAuthorized,
    #[error("Not your crop.")]
    NotOwner,
    #[error("No winner yet.")]
    NoWinnerYet,
    #[error("Invalid role")]
    InvalidRole,
}

impl ChatDenied {
    pub fn code(self) -> &'static str {
        match self {
            ChatDenied::NotAuthorized => "NOT_AUTHORIZED",
            ChatDenied::NotOwner => "NOT_OWNER",
            ChatDenied::NoWinnerYet => "NO_WINNER_YET",
            ChatDenied::InvalidRole => "INVALID_ROLE",
        }
    }
}

/// 채팅 권한 확인
/// 상대방 이름은 작물에 기록된 농부 이름 또는 기본값을 쓴다.
pub fn authorize(
    crop: &Crop,
    winner: Option<&WinnerRecord>,
    user: &SessionUser,
) -> Result<ChatPartner, ChatDenied> {
    match user.role {
        Role::Bidder => match winner {
            Some(w) if w.user_id == user.id => Ok(ChatPartner {
                partner_id: crop.farmer_id.clone(),
                partner_name: crop
                    .farmer_name
                    .clone()
                    .unwrap_or_else(|| FARMER_FALLBACK_NAME.to_string()),
            }),
            _ => Err(ChatDenied::NotAuthorized),
        },
        Role::Farmer => {
            if crop.farmer_id != user.id {
                return Err(ChatDenied::NotOwner);
            }
            let winner = winner.ok_or(ChatDenied::NoWinnerYet)?;
            Ok(ChatPartner {
                partner_id: winner.user_id.clone(),
                partner_name: WINNER_FALLBACK_NAME.to_string(),
            })
        }
        Role::Other(_) => Err(ChatDenied::InvalidRole),
    }
}
// endregion: --- Authorization Gate

// region:    --- Chat Service
#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Denied(#[from] ChatDenied),
    #[error(transparent)]
    Auction(#[from] AuctionError),
    #[error("Message must not be empty")]
    EmptyMessage,
    #[error("Receiver is not your chat partner")]
    WrongReceiver,
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// 채팅 화면 정보
#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    pub crop_id: CropId,
    pub partner_id: UserId,
    pub partner_name: String,
    pub user: SessionUser,
}

pub struct ChatService {
    engine: Arc<AuctionEngine>,
}

impl ChatService {
    pub fn new(engine: Arc<AuctionEngine>) -> Self {
        Self { engine }
    }

    /// 채팅 세션 열기 (권한 확인 + 상대방 이름 조회)
    pub async fn open(
        &self,
        crop_id: CropId,
        user: &SessionUser,
        now: DateTime<Utc>,
    ) -> Result<ChatSession, ChatError> {
        let partner = self.authorize(crop_id, user, now).await?;
        Ok(ChatSession {
            crop_id,
            partner_id: partner.partner_id,
            partner_name: partner.partner_name,
            user: user.clone(),
        })
    }

    /// 메시지 전송
    pub async fn send(
        &self,
        crop_id: CropId,
        user: &SessionUser,
        receiver: Option<UserId>,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<MessageView, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let partner = self.authorize(crop_id, user, now).await?;
        if receiver.is_some_and(|r| r != partner.partner_id) {
            return Err(ChatError::WrongReceiver);
        }

        let store = self.engine.store();
        let message = store
            .append_message(NewMessage {
                crop_id,
                sender_id: user.id.clone(),
                receiver_id: partner.partner_id.clone(),
                message: text.to_string(),
                timestamp: now,
            })
            .await?;
        info!(
            "{:<12} --> 메시지 전송: crop={}, {} -> {}",
            "Chat", crop_id, message.sender_id, message.receiver_id
        );
        Ok(MessageView {
            message,
            sender_name: user.username.clone(),
            receiver_name: partner.partner_name,
        })
    }

    /// 메시지 조회
    pub async fn history(
        &self,
        crop_id: CropId,
        user: &SessionUser,
        now: DateTime<Utc>,
    ) -> Result<Vec<MessageView>, ChatError> {
        self.authorize(crop_id, user, now).await?;
        let store = self.engine.store();
        let messages = store.messages_for(crop_id).await?;

        let mut views = Vec::with_capacity(messages.len());
        for message in messages {
            let sender_name = self.display_name(&message.sender_id).await;
            let receiver_name = self.display_name(&message.receiver_id).await;
            views.push(MessageView {
                message,
                sender_name,
                receiver_name,
            });
        }
        Ok(views)
    }

    async fn authorize(
        &self,
        crop_id: CropId,
        user: &SessionUser,
        now: DateTime<Utc>,
    ) -> Result<ChatPartner, ChatError> {
        let crop = self.engine.crop(crop_id, now).await?;
        let winner = self.engine.store().winner_for(crop_id).await?;
        let mut partner = authorize(&crop, winner.as_ref(), user).map_err(|denied| {
            warn!(
                "{:<12} --> 채팅 권한 없음: crop={}, user={}, {:?}",
                "Chat", crop_id, user.id, denied
            );
            denied
        })?;
        // 권한이 확인된 사용자만 이름을 기록한다
        if let Err(e) = self.engine.store().remember_user(user).await {
            warn!("{:<12} --> 사용자 정보 저장 실패: {:?}", "Chat", e);
        }
        if user.role == Role::Farmer {
            if let Some(name) = self.engine.store().username(&partner.partner_id).await? {
                partner.partner_name = name;
            }
        }
        Ok(partner)
    }

    /// 이름 조회 실패는 표시 문제일 뿐이라 Unknown 으로 대신한다
    async fn display_name(&self, user_id: &UserId) -> String {
        match self.engine.store().username(user_id).await {
            Ok(Some(name)) => name,
            Ok(None) => UNKNOWN_NAME.to_string(),
            Err(e) => {
                warn!("{:<12} --> 사용자 이름 조회 실패: {:?}", "Chat", e);
                UNKNOWN_NAME.to_string()
            }
        }
    }
}
// endregion: --- Chat Service
