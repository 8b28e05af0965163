use crate::bidding::{CropId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type MessageId = i64;

// 채팅 메시지 모델
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub crop_id: CropId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub crop_id: CropId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl NewMessage {
    pub fn into_message(self, id: MessageId) -> ChatMessage {
        ChatMessage {
            id,
            crop_id: self.crop_id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            message: self.message,
            timestamp: self.timestamp,
        }
    }
}

/// 표시 이름이 붙은 메시지 (조회 응답)
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: ChatMessage,
    pub sender_name: String,
    pub receiver_name: String,
}

/// 채팅 상대
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatPartner {
    pub partner_id: UserId,
    pub partner_name: String,
}

/// 메시지 전송 요청
#[derive(Debug, Default, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default, alias = "cropId")]
    pub crop_id: Option<String>,
    #[serde(default, alias = "receiverId")]
    pub receiver_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
