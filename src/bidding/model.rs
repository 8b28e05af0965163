use super::price::Price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// 작물 식별자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CropId(pub Uuid);

impl CropId {
    pub fn new() -> Self {
        CropId(Uuid::new_v4())
    }
}

impl Default for CropId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CropId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for CropId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(CropId)
    }
}

// 사용자 식별자 (인증 서비스가 발급한 불투명 문자열)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// 입찰 원장이 부여하는 식별자
pub type BidId = i64;

// 경매 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CropStatus {
    Available,
    Closed,
    Sold,
}

impl CropStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CropStatus::Available => "Available",
            CropStatus::Closed => "Closed",
            CropStatus::Sold => "Sold",
        }
    }

    pub fn is_open(self) -> bool {
        self == CropStatus::Available
    }
}

impl FromStr for CropStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "available" => Ok(CropStatus::Available),
            "closed" => Ok(CropStatus::Closed),
            "sold" => Ok(CropStatus::Sold),
            other => Err(format!("unknown crop status: {other}")),
        }
    }
}

// 작물(경매 상품) 모델
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crop {
    pub id: CropId,
    pub farmer_id: UserId,
    pub farmer_name: Option<String>,
    pub farmer_email: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub crop_type: String,
    pub quality: String,
    pub location: String,
    pub notes: String,
    pub quantity: f64,
    pub current_price: Price,
    pub status: CropStatus,
    pub leading_bidder_id: Option<UserId>,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
}

impl Crop {
    /// 경매 시간이 지났는지 여부
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.closes_at
    }

    /// 목록 노출 여부
    /// 종료된 경매라도 원래 경매 시간 안에서는 계속 보여준다.
    pub fn is_visible(&self, now: DateTime<Utc>) -> bool {
        self.status.is_open() || now < self.closes_at
    }
}

// 입찰 모델
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub id: BidId,
    pub crop_id: CropId,
    pub bidder_id: UserId,
    pub bid_price: Price,
    pub timestamp: DateTime<Utc>,
}

// 원장에 기록되기 전의 입찰
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBid {
    pub crop_id: CropId,
    pub bidder_id: UserId,
    pub bid_price: Price,
    pub timestamp: DateTime<Utc>,
}

impl NewBid {
    pub fn into_bid(self, id: BidId) -> Bid {
        Bid {
            id,
            crop_id: self.crop_id,
            bidder_id: self.bidder_id,
            bid_price: self.bid_price,
            timestamp: self.timestamp,
        }
    }
}

// 낙찰자 모델
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerRecord {
    pub crop_id: CropId,
    pub user_id: UserId,
    pub assigned_at: DateTime<Utc>,
}
