/// 경매 엔진
/// 1. 입찰
/// 2. 경매 종료 (명시적 종료 / 시간 만료)
/// 3. 조회 (목록, 단건, 낙찰자)
// region:    --- Imports
use super::locks::CropLocks;
use super::{AuctionError, Closure};
use crate::bidding::commands::PlaceBidCommand;
use crate::bidding::{Bid, Crop, CropId, CropStatus, NewBid, WinnerRecord};
use crate::store::{ClosureCommit, Store};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};
// endregion: --- Imports

// 최대 재시도 횟수
const MAX_RETRIES: u32 = 100;

// region:    --- Auction Engine
pub struct AuctionEngine {
    store: Arc<dyn Store>,
    locks: Arc<CropLocks>,
}

impl AuctionEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_locks(store, Arc::new(CropLocks::new()))
    }

    /// 카탈로그 등 다른 서비스와 잠금을 공유할 때
    pub fn with_locks(store: Arc<dyn Store>, locks: Arc<CropLocks>) -> Self {
        Self { store, locks }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn locks(&self) -> &Arc<CropLocks> {
        &self.locks
    }

    /// 1. 입찰
    pub async fn place_bid(
        &self,
        cmd: PlaceBidCommand,
        now: DateTime<Utc>,
    ) -> Result<Bid, AuctionError> {
        info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Command", cmd);
        let _guard = self.locks.acquire(cmd.crop_id).await;

        let mut retries = 0;
        while retries < MAX_RETRIES {
            let crop = self.load(cmd.crop_id).await?;

            if crop.status.is_open() && crop.is_expired(now) {
                info!(
                    "{:<12} --> 경매 시간 만료, 입찰 전에 종료 처리: {}",
                    "Command", crop.id
                );
                self.close_locked(&crop, now).await?;
                return Err(AuctionError::AuctionClosed(crop.id));
            }
            if !crop.status.is_open() {
                return Err(AuctionError::AuctionClosed(crop.id));
            }
            if cmd.bid_price <= crop.current_price {
                return Err(AuctionError::BidTooLow {
                    current: crop.current_price,
                });
            }

            let bid = NewBid {
                crop_id: crop.id,
                bidder_id: cmd.bidder_id.clone(),
                bid_price: cmd.bid_price,
                timestamp: now,
            };
            match self.store.commit_bid(crop.current_price, bid).await? {
                Some(bid) => {
                    info!(
                        "{:<12} --> 입찰 성공: crop={}, 현재 가격 {}",
                        "Command", bid.crop_id, bid.bid_price
                    );
                    return Ok(bid);
                }
                None => {
                    warn!(
                        "{:<12} --> 낙관적 업데이트로 인한 가격 충돌: 재시도",
                        "Command"
                    );
                    retries += 1;
                }
            }
        }

        Err(AuctionError::Contention {
            crop_id: cmd.crop_id,
            attempts: MAX_RETRIES,
        })
    }

    /// 2. 경매 종료
    pub async fn close_auction(
        &self,
        crop_id: CropId,
        now: DateTime<Utc>,
    ) -> Result<Closure, AuctionError> {
        info!("{:<12} --> 경매 종료 요청: {}", "Command", crop_id);
        let _guard = self.locks.acquire(crop_id).await;

        let mut retries = 0;
        while retries < MAX_RETRIES {
            let crop = self.load(crop_id).await?;
            if let Some(closure) = self.close_locked(&crop, now).await? {
                return Ok(closure);
            }
            retries += 1;
        }

        Err(AuctionError::Contention {
            crop_id,
            attempts: MAX_RETRIES,
        })
    }

    /// 시간이 지난 경매를 모두 종료 (스케줄러용)
    pub async fn close_expired(&self, now: DateTime<Utc>) -> Result<usize, AuctionError> {
        let expired: Vec<CropId> = self
            .store
            .list_crops()
            .await?
            .into_iter()
            .filter(|crop| crop.status.is_open() && crop.is_expired(now))
            .map(|crop| crop.id)
            .collect();

        let mut closed = 0;
        for crop_id in expired {
            match self.expire(crop_id, now).await {
                Ok(()) => closed += 1,
                Err(AuctionError::CropNotFound(_)) => {}
                Err(e) => error!(
                    "{:<12} --> 만료 경매 종료 실패: crop={}, {:?}",
                    "Command", crop_id, e
                ),
            }
        }
        Ok(closed)
    }

    /// 3. 표시 가능한 작물 목록
    /// 상태는 바꾸지 않는다.
    pub async fn list_visible_crops(&self, now: DateTime<Utc>) -> Result<Vec<Crop>, AuctionError> {
        info!("{:<12} --> 작물 목록 조회", "Query");
        let crops = self.store.list_crops().await?;
        Ok(crops.into_iter().filter(|c| c.is_visible(now)).collect())
    }

    /// 작물 단건 조회 (만료된 경매는 종료 후 반환)
    pub async fn crop(&self, crop_id: CropId, now: DateTime<Utc>) -> Result<Crop, AuctionError> {
        info!("{:<12} --> 작물 조회 id: {}", "Query", crop_id);
        let crop = self.load(crop_id).await?;
        if !(crop.status.is_open() && crop.is_expired(now)) {
            return Ok(crop);
        }
        self.expire(crop_id, now).await?;
        self.load(crop_id).await
    }

    /// 낙찰자 조회
    pub async fn winner(
        &self,
        crop_id: CropId,
        now: DateTime<Utc>,
    ) -> Result<Option<WinnerRecord>, AuctionError> {
        info!("{:<12} --> 낙찰자 조회 id: {}", "Query", crop_id);
        self.crop(crop_id, now).await?;
        Ok(self.store.winner_for(crop_id).await?)
    }

    /// 입찰 이력 조회
    pub async fn bid_history(&self, crop_id: CropId) -> Result<Vec<Bid>, AuctionError> {
        info!("{:<12} --> 입찰 이력 조회 id: {}", "Query", crop_id);
        self.load(crop_id).await?;
        Ok(self.store.all_for(crop_id).await?)
    }

    async fn load(&self, crop_id: CropId) -> Result<Crop, AuctionError> {
        self.store
            .get_crop(crop_id)
            .await?
            .ok_or(AuctionError::CropNotFound(crop_id))
    }

    /// 잠금을 잡고 만료된 경매를 종료한다. 이미 종료됐으면 아무것도 하지 않는다.
    async fn expire(&self, crop_id: CropId, now: DateTime<Utc>) -> Result<(), AuctionError> {
        let _guard = self.locks.acquire(crop_id).await;
        for _ in 0..MAX_RETRIES {
            let crop = self.load(crop_id).await?;
            if !(crop.status.is_open() && crop.is_expired(now)) {
                return Ok(());
            }
            if self.close_locked(&crop, now).await?.is_some() {
                return Ok(());
            }
        }
        Err(AuctionError::Contention {
            crop_id,
            attempts: MAX_RETRIES,
        })
    }

    /// 종료 처리 본체. 호출 측이 작물 잠금을 잡고 있어야 한다.
    /// 커밋 조건이 어긋나면(그 사이 가격이 바뀜) None.
    async fn close_locked(
        &self,
        crop: &Crop,
        now: DateTime<Utc>,
    ) -> Result<Option<Closure>, AuctionError> {
        let highest = self.store.highest_for(crop.id).await?;

        let Some(bid) = highest else {
            match (crop.status, &crop.leading_bidder_id) {
                (CropStatus::Closed, None) => return Ok(Some(Closure::NoBids)),
                (CropStatus::Available, None) => {}
                _ => {
                    error!(
                        "{:<12} --> 입찰 기록 없이 선두 입찰자/낙찰 상태가 존재: {}",
                        "Command", crop.id
                    );
                    return Err(AuctionError::Inconsistent(crop.id));
                }
            }
            let committed = self
                .store
                .commit_closure(&ClosureCommit {
                    crop_id: crop.id,
                    expected_price: crop.current_price,
                    status: CropStatus::Closed,
                    winner: None,
                })
                .await?;
            if committed {
                info!("{:<12} --> 입찰 없이 경매 종료: {}", "Command", crop.id);
            }
            return Ok(committed.then_some(Closure::NoBids));
        };

        // 원장의 최고 입찰과 작물의 선두 입찰자는 항상 같아야 한다
        let agrees = crop.leading_bidder_id.as_ref() == Some(&bid.bidder_id)
            && crop.current_price == bid.bid_price;
        if !agrees || crop.status == CropStatus::Closed {
            error!(
                "{:<12} --> 원장과 작물 상태 불일치: crop={}, ledger={}@{}, crop={:?}@{}",
                "Command", crop.id, bid.bidder_id, bid.bid_price, crop.leading_bidder_id, crop.current_price
            );
            return Err(AuctionError::Inconsistent(crop.id));
        }

        if crop.status == CropStatus::Sold {
            if let Some(existing) = self.store.winner_for(crop.id).await? {
                if existing.user_id == bid.bidder_id {
                    return Ok(Some(Closure::WinnerAssigned(existing)));
                }
            }
        }

        let record = WinnerRecord {
            crop_id: crop.id,
            user_id: bid.bidder_id,
            assigned_at: now,
        };
        let committed = self
            .store
            .commit_closure(&ClosureCommit {
                crop_id: crop.id,
                expected_price: crop.current_price,
                status: CropStatus::Sold,
                winner: Some(record.clone()),
            })
            .await?;
        if committed {
            info!(
                "{:<12} --> 낙찰 확정: crop={}, winner={}",
                "Command", record.crop_id, record.user_id
            );
        }
        Ok(committed.then_some(Closure::WinnerAssigned(record)))
    }
}
// endregion: --- Auction Engine
