use crate::bidding::{CropId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_IMAGE: &str = "/static/default_crop.jpg";

/// 작물 등록 요청
#[derive(Debug, Default, Clone, Deserialize)]
pub struct NewCropRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub crop_type: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub quantity: Option<serde_json::Value>,
    #[serde(default)]
    pub price: Option<serde_json::Value>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    /// 경매 시작 시각 (RFC 3339)
    #[serde(default)]
    pub datetime: Option<String>,
}

/// 작물 수정 요청. 빠진 필드는 그대로 둔다.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CropChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub crop_type: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub quantity: Option<serde_json::Value>,
    #[serde(default)]
    pub price: Option<serde_json::Value>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
}

// 찜 목록 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub user_id: UserId,
    pub crop_id: CropId,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WishlistRequest {
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,
    #[serde(default, alias = "cropId")]
    pub crop_id: Option<String>,
}

/// 연쇄 삭제 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeStep {
    Messages,
    Bids,
    Wishlist,
    Winner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Removed { count: u64 },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step: CascadeStep,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// 작물 삭제 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub crop_id: CropId,
    pub steps: Vec<StepReport>,
    pub crop_deleted: bool,
}

impl CascadeReport {
    pub fn outcome(&self, step: CascadeStep) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|r| r.step == step)
            .map(|r| &r.outcome)
    }

    pub fn failed_steps(&self) -> Vec<CascadeStep> {
        self.steps
            .iter()
            .filter(|r| matches!(r.outcome, StepOutcome::Failed { .. }))
            .map(|r| r.step)
            .collect()
    }
}
