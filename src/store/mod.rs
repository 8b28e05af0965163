/// 저장소 계층
/// 경매 엔진, 작물 카탈로그, 채팅 서비스는 모두 생성 시점에 `Arc<dyn Store>` 핸들을 전달받는다.
// region:    --- Imports
use crate::bidding::{Bid, Crop, CropId, CropStatus, NewBid, Price, UserId, WinnerRecord};
use crate::catalog::model::WishlistEntry;
use crate::chat::model::{ChatMessage, NewMessage};
use crate::session::SessionUser;
use async_trait::async_trait;
use thiserror::Error;

// endregion: --- Imports

pub mod memory;
pub mod postgres;
mod queries;

pub use memory::{FailPoint, MemoryStore};
pub use postgres::PgStore;

// region:    --- Errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
// endregion: --- Errors

// region:    --- Commits
/// 경매 종료 커밋
/// 가격이 `expected_price` 그대로일 때만 상태를 바꾸고 낙찰자를 upsert 한다.
#[derive(Debug, Clone)]
pub struct ClosureCommit {
    pub crop_id: CropId,
    pub expected_price: Price,
    pub status: CropStatus,
    pub winner: Option<WinnerRecord>,
}
// endregion: --- Commits

// region:    --- Store Traits
#[async_trait]
pub trait CropStore: Send + Sync {
    async fn insert_crop(&self, crop: &Crop) -> Result<(), StoreError>;
    async fn get_crop(&self, crop_id: CropId) -> Result<Option<Crop>, StoreError>;
    async fn list_crops(&self) -> Result<Vec<Crop>, StoreError>;
    /// 설명 필드만 갱신한다. 가격, 상태, 선두 입찰자는 건드리지 않는다.
    async fn update_crop_details(&self, crop: &Crop) -> Result<bool, StoreError>;
    /// 입찰이 한 번도 없는 경매의 시작가 변경 (CAS)
    async fn reprice_crop(
        &self,
        crop_id: CropId,
        expected_price: Price,
        new_price: Price,
    ) -> Result<bool, StoreError>;
    async fn delete_crop(&self, crop_id: CropId) -> Result<bool, StoreError>;
}

/// 입찰 원장
#[async_trait]
pub trait BidLedger: Send + Sync {
    /// 최고 입찰 (가격 내림차순, 같은 가격이면 먼저 들어온 입찰)
    async fn highest_for(&self, crop_id: CropId) -> Result<Option<Bid>, StoreError>;
    async fn all_for(&self, crop_id: CropId) -> Result<Vec<Bid>, StoreError>;
    async fn delete_bids_for(&self, crop_id: CropId) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait WinnerRegistry: Send + Sync {
    async fn winner_for(&self, crop_id: CropId) -> Result<Option<WinnerRecord>, StoreError>;
    async fn delete_winner_for(&self, crop_id: CropId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append_message(&self, message: NewMessage) -> Result<ChatMessage, StoreError>;
    async fn messages_for(&self, crop_id: CropId) -> Result<Vec<ChatMessage>, StoreError>;
    async fn delete_messages_for(&self, crop_id: CropId) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait WishlistStore: Send + Sync {
    /// 이미 있으면 false
    async fn add_to_wishlist(&self, entry: &WishlistEntry) -> Result<bool, StoreError>;
    async fn wishlist_for(&self, user_id: &UserId) -> Result<Vec<WishlistEntry>, StoreError>;
    async fn delete_wishlist_for_crop(&self, crop_id: CropId) -> Result<u64, StoreError>;
}

/// 표시 이름 조회용 사용자 디렉터리
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn remember_user(&self, user: &SessionUser) -> Result<(), StoreError>;
    async fn username(&self, user_id: &UserId) -> Result<Option<String>, StoreError>;
}

/// 전체 저장소
#[async_trait]
pub trait Store:
    CropStore + BidLedger + WinnerRegistry + MessageStore + WishlistStore + UserDirectory
{
    /// 입찰 커밋
    /// 작물의 현재 가격이 `expected_price` 이고 경매가 진행 중일 때만
    /// 가격/선두 입찰자 갱신과 원장 추가를 한 단위로 수행한다.
    /// 조건이 맞지 않으면 아무것도 쓰지 않고 `None` 을 반환한다.
    async fn commit_bid(
        &self,
        expected_price: Price,
        bid: NewBid,
    ) -> Result<Option<Bid>, StoreError>;

    /// 경매 종료 커밋. 조건 불일치 시 false.
    async fn commit_closure(&self, closure: &ClosureCommit) -> Result<bool, StoreError>;
}
// endregion: --- Store Traits
