/// Postgres 저장소
/// 입찰 커밋과 경매 종료 커밋은 각각 하나의 트랜잭션으로 실행된다.
// region:    --- Imports
use super::queries;
use super::{
    BidLedger, ClosureCommit, CropStore, MessageStore, Store, StoreError, UserDirectory,
    WinnerRegistry, WishlistStore,
};
use crate::bidding::{Bid, Crop, CropId, NewBid, Price, UserId, WinnerRecord};
use crate::catalog::model::WishlistEntry;
use crate::chat::model::{ChatMessage, NewMessage};
use crate::database::DatabaseManager;
use crate::session::SessionUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

// endregion: --- Imports

// region:    --- Rows
#[derive(FromRow)]
struct CropRow {
    id: Uuid,
    farmer_id: String,
    farmer_name: Option<String>,
    farmer_email: Option<String>,
    name: String,
    crop_type: String,
    quality: String,
    location: String,
    notes: String,
    quantity: f64,
    current_price_cents: i64,
    status: String,
    leading_bidder_id: Option<String>,
    images: Vec<String>,
    created_at: DateTime<Utc>,
    closes_at: DateTime<Utc>,
}

impl TryFrom<CropRow> for Crop {
    type Error = StoreError;

    fn try_from(row: CropRow) -> Result<Self, Self::Error> {
        Ok(Crop {
            id: CropId(row.id),
            farmer_id: UserId(row.farmer_id),
            farmer_name: row.farmer_name,
            farmer_email: row.farmer_email,
            name: row.name,
            crop_type: row.crop_type,
            quality: row.quality,
            location: row.location,
            notes: row.notes,
            quantity: row.quantity,
            current_price: cents(row.current_price_cents)?,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            leading_bidder_id: row.leading_bidder_id.map(UserId),
            images: row.images,
            created_at: row.created_at,
            closes_at: row.closes_at,
        })
    }
}

#[derive(FromRow)]
struct BidRow {
    id: i64,
    crop_id: Uuid,
    bidder_id: String,
    bid_price_cents: i64,
    placed_at: DateTime<Utc>,
}

impl TryFrom<BidRow> for Bid {
    type Error = StoreError;

    fn try_from(row: BidRow) -> Result<Self, Self::Error> {
        Ok(Bid {
            id: row.id,
            crop_id: CropId(row.crop_id),
            bidder_id: UserId(row.bidder_id),
            bid_price: cents(row.bid_price_cents)?,
            timestamp: row.placed_at,
        })
    }
}

#[derive(FromRow)]
struct WinnerRow {
    crop_id: Uuid,
    user_id: String,
    assigned_at: DateTime<Utc>,
}

impl From<WinnerRow> for WinnerRecord {
    fn from(row: WinnerRow) -> Self {
        WinnerRecord {
            crop_id: CropId(row.crop_id),
            user_id: UserId(row.user_id),
            assigned_at: row.assigned_at,
        }
    }
}

#[derive(FromRow)]
struct MessageRow {
    id: i64,
    crop_id: Uuid,
    sender_id: String,
    receiver_id: String,
    message: String,
    sent_at: DateTime<Utc>,
}

impl From<MessageRow> for ChatMessage {
    fn from(row: MessageRow) -> Self {
        ChatMessage {
            id: row.id,
            crop_id: CropId(row.crop_id),
            sender_id: UserId(row.sender_id),
            receiver_id: UserId(row.receiver_id),
            message: row.message,
            timestamp: row.sent_at,
        }
    }
}

#[derive(FromRow)]
struct WishlistRow {
    user_id: String,
    crop_id: Uuid,
    added_at: DateTime<Utc>,
}

impl From<WishlistRow> for WishlistEntry {
    fn from(row: WishlistRow) -> Self {
        WishlistEntry {
            user_id: UserId(row.user_id),
            crop_id: CropId(row.crop_id),
            added_at: row.added_at,
        }
    }
}

fn cents(value: i64) -> Result<Price, StoreError> {
    Price::from_cents(value).map_err(|e| StoreError::Corrupt(e.to_string()))
}
// endregion: --- Rows

// region:    --- Pg Store
pub struct PgStore {
    db: Arc<DatabaseManager>,
}

impl PgStore {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CropStore for PgStore {
    async fn insert_crop(&self, crop: &Crop) -> Result<(), StoreError> {
        sqlx::query(queries::INSERT_CROP)
            .bind(crop.id.0)
            .bind(crop.farmer_id.as_str())
            .bind(crop.farmer_name.as_deref())
            .bind(crop.farmer_email.as_deref())
            .bind(&crop.name)
            .bind(&crop.crop_type)
            .bind(&crop.quality)
            .bind(&crop.location)
            .bind(&crop.notes)
            .bind(crop.quantity)
            .bind(crop.current_price.cents())
            .bind(crop.status.as_str())
            .bind(crop.leading_bidder_id.as_ref().map(UserId::as_str))
            .bind(&crop.images)
            .bind(crop.created_at)
            .bind(crop.closes_at)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn get_crop(&self, crop_id: CropId) -> Result<Option<Crop>, StoreError> {
        sqlx::query_as::<_, CropRow>(&queries::get_crop())
            .bind(crop_id.0)
            .fetch_optional(self.db.pool())
            .await?
            .map(Crop::try_from)
            .transpose()
    }

    async fn list_crops(&self) -> Result<Vec<Crop>, StoreError> {
        sqlx::query_as::<_, CropRow>(&queries::get_all_crops())
            .fetch_all(self.db.pool())
            .await?
            .into_iter()
            .map(Crop::try_from)
            .collect()
    }

    async fn update_crop_details(&self, crop: &Crop) -> Result<bool, StoreError> {
        let result = sqlx::query(queries::UPDATE_CROP_DETAILS)
            .bind(crop.id.0)
            .bind(&crop.name)
            .bind(&crop.crop_type)
            .bind(&crop.quality)
            .bind(&crop.location)
            .bind(&crop.notes)
            .bind(crop.quantity)
            .bind(&crop.images)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reprice_crop(
        &self,
        crop_id: CropId,
        expected_price: Price,
        new_price: Price,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(queries::REPRICE_CROP)
            .bind(crop_id.0)
            .bind(expected_price.cents())
            .bind(new_price.cents())
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_crop(&self, crop_id: CropId) -> Result<bool, StoreError> {
        let result = sqlx::query(queries::DELETE_CROP)
            .bind(crop_id.0)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl BidLedger for PgStore {
    async fn highest_for(&self, crop_id: CropId) -> Result<Option<Bid>, StoreError> {
        sqlx::query_as::<_, BidRow>(queries::GET_HIGHEST_BID)
            .bind(crop_id.0)
            .fetch_optional(self.db.pool())
            .await?
            .map(Bid::try_from)
            .transpose()
    }

    async fn all_for(&self, crop_id: CropId) -> Result<Vec<Bid>, StoreError> {
        sqlx::query_as::<_, BidRow>(queries::GET_BID_HISTORY)
            .bind(crop_id.0)
            .fetch_all(self.db.pool())
            .await?
            .into_iter()
            .map(Bid::try_from)
            .collect()
    }

    async fn delete_bids_for(&self, crop_id: CropId) -> Result<u64, StoreError> {
        let result = sqlx::query(queries::DELETE_BIDS)
            .bind(crop_id.0)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl WinnerRegistry for PgStore {
    async fn winner_for(&self, crop_id: CropId) -> Result<Option<WinnerRecord>, StoreError> {
        let row = sqlx::query_as::<_, WinnerRow>(queries::GET_WINNER)
            .bind(crop_id.0)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(WinnerRecord::from))
    }

    async fn delete_winner_for(&self, crop_id: CropId) -> Result<bool, StoreError> {
        let result = sqlx::query(queries::DELETE_WINNER)
            .bind(crop_id.0)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl MessageStore for PgStore {
    async fn append_message(&self, message: NewMessage) -> Result<ChatMessage, StoreError> {
        let id: i64 = sqlx::query_scalar(queries::INSERT_MESSAGE)
            .bind(message.crop_id.0)
            .bind(message.sender_id.as_str())
            .bind(message.receiver_id.as_str())
            .bind(&message.message)
            .bind(message.timestamp)
            .fetch_one(self.db.pool())
            .await?;
        Ok(message.into_message(id))
    }

    async fn messages_for(&self, crop_id: CropId) -> Result<Vec<ChatMessage>, StoreError> {
        let rows = sqlx::query_as::<_, MessageRow>(queries::GET_MESSAGES)
            .bind(crop_id.0)
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows.into_iter().map(ChatMessage::from).collect())
    }

    async fn delete_messages_for(&self, crop_id: CropId) -> Result<u64, StoreError> {
        let result = sqlx::query(queries::DELETE_MESSAGES)
            .bind(crop_id.0)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl WishlistStore for PgStore {
    async fn add_to_wishlist(&self, entry: &WishlistEntry) -> Result<bool, StoreError> {
        let result = sqlx::query(queries::INSERT_WISHLIST)
            .bind(entry.user_id.as_str())
            .bind(entry.crop_id.0)
            .bind(entry.added_at)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn wishlist_for(&self, user_id: &UserId) -> Result<Vec<WishlistEntry>, StoreError> {
        let rows = sqlx::query_as::<_, WishlistRow>(queries::GET_WISHLIST)
            .bind(user_id.as_str())
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows.into_iter().map(WishlistEntry::from).collect())
    }

    async fn delete_wishlist_for_crop(&self, crop_id: CropId) -> Result<u64, StoreError> {
        let result = sqlx::query(queries::DELETE_WISHLIST_FOR_CROP)
            .bind(crop_id.0)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn remember_user(&self, user: &SessionUser) -> Result<(), StoreError> {
        sqlx::query(queries::UPSERT_USER)
            .bind(user.id.as_str())
            .bind(&user.username)
            .bind(user.email.as_deref())
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn username(&self, user_id: &UserId) -> Result<Option<String>, StoreError> {
        let name = sqlx::query_scalar::<_, String>(queries::GET_USERNAME)
            .bind(user_id.as_str())
            .fetch_optional(self.db.pool())
            .await?;
        Ok(name)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn commit_bid(
        &self,
        expected_price: Price,
        bid: NewBid,
    ) -> Result<Option<Bid>, StoreError> {
        self.db
            .transaction(|tx| {
                Box::pin(async move {
                    // 읽었던 가격이 그대로일 때만 갱신
                    let updated = sqlx::query(queries::APPLY_BID)
                        .bind(bid.crop_id.0)
                        .bind(expected_price.cents())
                        .bind(bid.bid_price.cents())
                        .bind(bid.bidder_id.as_str())
                        .fetch_optional(&mut **tx)
                        .await?;
                    if updated.is_none() {
                        debug!(
                            "{:<12} --> 입찰 커밋 조건 불일치: crop={}",
                            "Store", bid.crop_id
                        );
                        return Ok(None);
                    }

                    let id: i64 = sqlx::query_scalar(queries::APPEND_BID)
                        .bind(bid.crop_id.0)
                        .bind(bid.bidder_id.as_str())
                        .bind(bid.bid_price.cents())
                        .bind(bid.timestamp)
                        .fetch_one(&mut **tx)
                        .await?;
                    Ok(Some(bid.into_bid(id)))
                })
            })
            .await
    }

    async fn commit_closure(&self, closure: &ClosureCommit) -> Result<bool, StoreError> {
        let closure = closure.clone();
        self.db
            .transaction(|tx| {
                Box::pin(async move {
                    let updated = sqlx::query(queries::CLOSE_CROP)
                        .bind(closure.crop_id.0)
                        .bind(closure.expected_price.cents())
                        .bind(closure.status.as_str())
                        .fetch_optional(&mut **tx)
                        .await?;
                    if updated.is_none() {
                        return Ok(false);
                    }

                    if let Some(record) = &closure.winner {
                        sqlx::query(queries::ASSIGN_WINNER)
                            .bind(record.crop_id.0)
                            .bind(record.user_id.as_str())
                            .bind(record.assigned_at)
                            .execute(&mut **tx)
                            .await?;
                    }
                    info!(
                        "{:<12} --> 경매 종료 커밋: crop={}, status={}",
                        "Store",
                        closure.crop_id,
                        closure.status.as_str()
                    );
                    Ok(true)
                })
            })
            .await
    }
}
// endregion: --- Pg Store
