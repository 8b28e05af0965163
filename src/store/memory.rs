/// 메모리 저장소
/// DATABASE_URL 없이 실행하거나 테스트할 때 사용한다.
/// 모든 테이블을 하나의 RwLock 으로 묶어서 입찰/종료 커밋이 원자적으로 반영된다.
// region:    --- Imports
use super::{
    BidLedger, ClosureCommit, CropStore, MessageStore, Store, StoreError, UserDirectory,
    WinnerRegistry, WishlistStore,
};
use crate::bidding::{Bid, BidId, Crop, CropId, NewBid, Price, UserId, WinnerRecord};
use crate::catalog::model::WishlistEntry;
use crate::chat::model::{ChatMessage, MessageId, NewMessage};
use crate::session::SessionUser;
use async_trait::async_trait;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::RwLock;
use tracing::debug;

// endregion: --- Imports

// region:    --- Fail Points
/// 장애 주입 지점
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    CommitBid,
    CommitClosure,
    DeleteMessages,
    DeleteBids,
    DeleteWishlist,
    DeleteWinner,
    DeleteCrop,
}
// endregion: --- Fail Points

// region:    --- Tables
#[derive(Default)]
struct Tables {
    crops: HashMap<CropId, Crop>,
    bids: Vec<Bid>,
    next_bid_id: BidId,
    winners: HashMap<CropId, WinnerRecord>,
    messages: Vec<ChatMessage>,
    next_message_id: MessageId,
    wishlist: Vec<WishlistEntry>,
    users: HashMap<UserId, SessionUser>,
}

impl Tables {
    /// 원장 추가 (id 부여)
    fn append(&mut self, bid: NewBid) -> Bid {
        self.next_bid_id += 1;
        let bid = bid.into_bid(self.next_bid_id);
        self.bids.push(bid.clone());
        bid
    }

    /// 낙찰자 upsert
    fn assign(&mut self, record: WinnerRecord) {
        self.winners.insert(record.crop_id, record);
    }
}
// endregion: --- Tables

// region:    --- Memory Store
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_points: Mutex<HashSet<FailPoint>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 이후 해당 지점의 호출을 실패시킨다
    pub fn fail_on(&self, point: FailPoint) {
        if let Ok(mut points) = self.fail_points.lock() {
            points.insert(point);
        }
    }

    pub fn recover(&self, point: FailPoint) {
        if let Ok(mut points) = self.fail_points.lock() {
            points.remove(&point);
        }
    }

    fn check(&self, point: FailPoint) -> Result<(), StoreError> {
        let failing = self
            .fail_points
            .lock()
            .map(|points| points.contains(&point))
            .unwrap_or(false);
        if failing {
            return Err(StoreError::Unavailable(format!("{point:?}")));
        }
        Ok(())
    }
}

#[async_trait]
impl CropStore for MemoryStore {
    async fn insert_crop(&self, crop: &Crop) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.crops.insert(crop.id, crop.clone());
        Ok(())
    }

    async fn get_crop(&self, crop_id: CropId) -> Result<Option<Crop>, StoreError> {
        Ok(self.tables.read().await.crops.get(&crop_id).cloned())
    }

    async fn list_crops(&self) -> Result<Vec<Crop>, StoreError> {
        let tables = self.tables.read().await;
        let mut crops: Vec<Crop> = tables.crops.values().cloned().collect();
        crops.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(crops)
    }

    async fn update_crop_details(&self, crop: &Crop) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables.crops.get_mut(&crop.id) else {
            return Ok(false);
        };
        stored.name = crop.name.clone();
        stored.crop_type = crop.crop_type.clone();
        stored.quality = crop.quality.clone();
        stored.location = crop.location.clone();
        stored.notes = crop.notes.clone();
        stored.quantity = crop.quantity;
        stored.images = crop.images.clone();
        Ok(true)
    }

    async fn reprice_crop(
        &self,
        crop_id: CropId,
        expected_price: Price,
        new_price: Price,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.crops.get_mut(&crop_id) {
            Some(crop)
                if crop.status.is_open()
                    && crop.leading_bidder_id.is_none()
                    && crop.current_price == expected_price =>
            {
                crop.current_price = new_price;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_crop(&self, crop_id: CropId) -> Result<bool, StoreError> {
        self.check(FailPoint::DeleteCrop)?;
        Ok(self.tables.write().await.crops.remove(&crop_id).is_some())
    }
}

#[async_trait]
impl BidLedger for MemoryStore {
    async fn highest_for(&self, crop_id: CropId) -> Result<Option<Bid>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .bids
            .iter()
            .filter(|b| b.crop_id == crop_id)
            .min_by_key(|b| (Reverse(b.bid_price), b.timestamp, b.id))
            .cloned())
    }

    async fn all_for(&self, crop_id: CropId) -> Result<Vec<Bid>, StoreError> {
        let tables = self.tables.read().await;
        let mut bids: Vec<Bid> = tables
            .bids
            .iter()
            .filter(|b| b.crop_id == crop_id)
            .cloned()
            .collect();
        bids.sort_by_key(|b| (Reverse(b.bid_price), b.timestamp, b.id));
        Ok(bids)
    }

    async fn delete_bids_for(&self, crop_id: CropId) -> Result<u64, StoreError> {
        self.check(FailPoint::DeleteBids)?;
        let mut tables = self.tables.write().await;
        let before = tables.bids.len();
        tables.bids.retain(|b| b.crop_id != crop_id);
        Ok((before - tables.bids.len()) as u64)
    }
}

#[async_trait]
impl WinnerRegistry for MemoryStore {
    async fn winner_for(&self, crop_id: CropId) -> Result<Option<WinnerRecord>, StoreError> {
        Ok(self.tables.read().await.winners.get(&crop_id).cloned())
    }

    async fn delete_winner_for(&self, crop_id: CropId) -> Result<bool, StoreError> {
        self.check(FailPoint::DeleteWinner)?;
        Ok(self.tables.write().await.winners.remove(&crop_id).is_some())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append_message(&self, message: NewMessage) -> Result<ChatMessage, StoreError> {
        let mut tables = self.tables.write().await;
        tables.next_message_id += 1;
        let message = message.into_message(tables.next_message_id);
        tables.messages.push(message.clone());
        Ok(message)
    }

    async fn messages_for(&self, crop_id: CropId) -> Result<Vec<ChatMessage>, StoreError> {
        let tables = self.tables.read().await;
        let mut messages: Vec<ChatMessage> = tables
            .messages
            .iter()
            .filter(|m| m.crop_id == crop_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| (m.timestamp, m.id));
        Ok(messages)
    }

    async fn delete_messages_for(&self, crop_id: CropId) -> Result<u64, StoreError> {
        self.check(FailPoint::DeleteMessages)?;
        let mut tables = self.tables.write().await;
        let before = tables.messages.len();
        tables.messages.retain(|m| m.crop_id != crop_id);
        Ok((before - tables.messages.len()) as u64)
    }
}

#[async_trait]
impl WishlistStore for MemoryStore {
    async fn add_to_wishlist(&self, entry: &WishlistEntry) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let exists = tables
            .wishlist
            .iter()
            .any(|w| w.user_id == entry.user_id && w.crop_id == entry.crop_id);
        if exists {
            return Ok(false);
        }
        tables.wishlist.push(entry.clone());
        Ok(true)
    }

    async fn wishlist_for(&self, user_id: &UserId) -> Result<Vec<WishlistEntry>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .wishlist
            .iter()
            .filter(|w| &w.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_wishlist_for_crop(&self, crop_id: CropId) -> Result<u64, StoreError> {
        self.check(FailPoint::DeleteWishlist)?;
        let mut tables = self.tables.write().await;
        let before = tables.wishlist.len();
        tables.wishlist.retain(|w| w.crop_id != crop_id);
        Ok((before - tables.wishlist.len()) as u64)
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn remember_user(&self, user: &SessionUser) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn username(&self, user_id: &UserId) -> Result<Option<String>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(user_id).map(|u| u.username.clone()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn commit_bid(
        &self,
        expected_price: Price,
        bid: NewBid,
    ) -> Result<Option<Bid>, StoreError> {
        self.check(FailPoint::CommitBid)?;
        let mut tables = self.tables.write().await;
        let Some(crop) = tables.crops.get_mut(&bid.crop_id) else {
            return Ok(None);
        };
        if !crop.status.is_open() || crop.current_price != expected_price {
            debug!(
                "{:<12} --> 입찰 커밋 조건 불일치: crop={}, expected={}, actual={}",
                "Store", bid.crop_id, expected_price, crop.current_price
            );
            return Ok(None);
        }
        crop.current_price = bid.bid_price;
        crop.leading_bidder_id = Some(bid.bidder_id.clone());
        Ok(Some(tables.append(bid)))
    }

    async fn commit_closure(&self, closure: &ClosureCommit) -> Result<bool, StoreError> {
        self.check(FailPoint::CommitClosure)?;
        let mut tables = self.tables.write().await;
        let Some(crop) = tables.crops.get_mut(&closure.crop_id) else {
            return Ok(false);
        };
        if crop.current_price != closure.expected_price {
            return Ok(false);
        }
        crop.status = closure.status;
        if let Some(record) = &closure.winner {
            tables.assign(record.clone());
        }
        Ok(true)
    }
}
// endregion: --- Memory Store
