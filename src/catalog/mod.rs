/// 작물 카탈로그
/// 1. 작물 등록
/// 2. 작물 수정
/// 3. 작물 삭제 (연쇄 삭제)
/// 4. 찜 목록
// region:    --- Imports
use crate::auction::CropLocks;
use crate::bidding::{Crop, CropId, CropStatus, Price, PriceError, UserId};
use crate::error::ErrorKind;
use crate::session::{Role, SessionUser};
use crate::store::{Store, StoreError};
use chrono::{DateTime, Duration, Utc};
use model::{
    CascadeReport, CascadeStep, CropChanges, NewCropRequest, StepOutcome, StepReport,
    WishlistEntry, DEFAULT_IMAGE,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

// endregion: --- Imports

pub mod model;

// region:    --- Errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Only farmers can list crops")]
    NotFarmer,
    #[error("Not your crop.")]
    NotOwner,
    #[error("Crop not found")]
    NotFound(CropId),
    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("Price cannot change once bidding has started")]
    BiddingStarted,
    #[error("Already in wishlist")]
    AlreadyInWishlist,
    #[error("Crop deletion failed: {source}")]
    DeleteFailed {
        report: CascadeReport,
        source: StoreError,
    },
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::Invalid { .. } | CatalogError::AlreadyInWishlist => ErrorKind::Validation,
            CatalogError::BiddingStarted => ErrorKind::Conflict,
            CatalogError::NotFound(_) => ErrorKind::NotFound,
            CatalogError::NotFarmer | CatalogError::NotOwner => ErrorKind::Forbidden,
            CatalogError::DeleteFailed { .. } | CatalogError::Storage(_) => ErrorKind::Fatal,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::NotFarmer => "NOT_FARMER",
            CatalogError::NotOwner => "NOT_OWNER",
            CatalogError::NotFound(_) => "NOT_FOUND",
            CatalogError::Invalid { .. } => "INVALID_FIELD",
            CatalogError::BiddingStarted => "BIDDING_STARTED",
            CatalogError::AlreadyInWishlist => "ALREADY_IN_WISHLIST",
            CatalogError::DeleteFailed { .. } | CatalogError::Storage(_) => "STORAGE",
        }
    }
}

fn invalid_price(e: PriceError) -> CatalogError {
    CatalogError::Invalid {
        field: "price",
        reason: e.to_string(),
    }
}
// endregion: --- Errors

// region:    --- Field Helpers
/// 빈 문자열이면 기본값
fn text_or(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_quantity(value: &serde_json::Value) -> Result<f64, CatalogError> {
    let invalid = |reason: &str| CatalogError::Invalid {
        field: "quantity",
        reason: reason.to_string(),
    };
    let quantity = match value {
        serde_json::Value::Number(n) => n.as_f64().ok_or_else(|| invalid("not a number"))?,
        serde_json::Value::String(s) if s.trim().is_empty() => 0.0,
        serde_json::Value::String(s) => s.trim().parse().map_err(|_| invalid("not a number"))?,
        serde_json::Value::Null => 0.0,
        _ => return Err(invalid("not a number")),
    };
    if !quantity.is_finite() || quantity < 0.0 {
        return Err(invalid("must be a non-negative number"));
    }
    Ok(quantity)
}

fn parse_price(value: &serde_json::Value) -> Result<Price, CatalogError> {
    match value {
        serde_json::Value::Null => Ok(Price::ZERO),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(Price::ZERO),
        other => Price::from_json(other).map_err(invalid_price),
    }
}

fn images_or_default(images: Option<Vec<String>>) -> Vec<String> {
    let images: Vec<String> = images
        .unwrap_or_default()
        .into_iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .collect();
    if images.is_empty() {
        vec![DEFAULT_IMAGE.to_string()]
    } else {
        images
    }
}
// endregion: --- Field Helpers

// region:    --- Crop Catalog
pub struct CropCatalog {
    store: Arc<dyn Store>,
    locks: Arc<CropLocks>,
    window: Duration,
}

impl CropCatalog {
    pub fn new(store: Arc<dyn Store>, locks: Arc<CropLocks>, window: Duration) -> Self {
        Self {
            store,
            locks,
            window,
        }
    }

    /// 1. 작물 등록
    pub async fn create(
        &self,
        farmer: &SessionUser,
        request: NewCropRequest,
        now: DateTime<Utc>,
    ) -> Result<Crop, CatalogError> {
        if farmer.role != Role::Farmer {
            return Err(CatalogError::NotFarmer);
        }
        let current_price = match &request.price {
            Some(value) => parse_price(value)?,
            None => Price::ZERO,
        };
        let quantity = match &request.quantity {
            Some(value) => parse_quantity(value)?,
            None => 0.0,
        };
        // 시작 시각이 잘못되었으면 현재 시각으로 대신한다
        let created_at = request
            .datetime
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(now);
        let closes_at = created_at
            .checked_add_signed(self.window)
            .ok_or_else(|| CatalogError::Invalid {
                field: "datetime",
                reason: "auction end is out of range".to_string(),
            })?;

        let crop = Crop {
            id: CropId::new(),
            farmer_id: farmer.id.clone(),
            farmer_name: Some(farmer.username.clone()),
            farmer_email: farmer.email.clone(),
            name: text_or(request.name, "Unnamed"),
            crop_type: text_or(request.crop_type, "-"),
            quality: text_or(request.quality, "-"),
            location: text_or(request.location, "Not specified"),
            notes: request.notes.unwrap_or_default().trim().to_string(),
            quantity,
            current_price,
            status: CropStatus::Available,
            leading_bidder_id: None,
            images: images_or_default(request.images),
            created_at,
            closes_at,
        };
        self.store.insert_crop(&crop).await?;
        self.store.remember_user(farmer).await?;
        info!(
            "{:<12} --> 작물 등록: id={}, farmer={}, 시작가 {}",
            "Catalog", crop.id, crop.farmer_id, crop.current_price
        );
        Ok(crop)
    }

    /// 2. 작물 수정
    /// 설명 필드는 언제든 바꿀 수 있지만 가격은 입찰 전에만 바꿀 수 있다.
    pub async fn update(
        &self,
        farmer: &SessionUser,
        crop_id: CropId,
        changes: CropChanges,
    ) -> Result<Crop, CatalogError> {
        let _guard = self.locks.acquire(crop_id).await;
        let mut crop = self.owned_crop(farmer, crop_id).await?;

        if let Some(value) = &changes.price {
            let new_price = parse_price(value)?;
            if new_price != crop.current_price {
                if !crop.status.is_open() || crop.leading_bidder_id.is_some() {
                    return Err(CatalogError::BiddingStarted);
                }
                let repriced = self
                    .store
                    .reprice_crop(crop_id, crop.current_price, new_price)
                    .await?;
                if !repriced {
                    return Err(CatalogError::BiddingStarted);
                }
                crop.current_price = new_price;
            }
        }

        if let Some(name) = changes.name {
            crop.name = text_or(Some(name), "Unnamed");
        }
        if let Some(crop_type) = changes.crop_type {
            crop.crop_type = text_or(Some(crop_type), "-");
        }
        if let Some(quality) = changes.quality {
            crop.quality = text_or(Some(quality), "-");
        }
        if let Some(location) = changes.location {
            crop.location = text_or(Some(location), "Not specified");
        }
        if let Some(notes) = changes.notes {
            crop.notes = notes.trim().to_string();
        }
        if let Some(value) = &changes.quantity {
            crop.quantity = parse_quantity(value)?;
        }
        if changes.images.is_some() {
            crop.images = images_or_default(changes.images);
        }

        if !self.store.update_crop_details(&crop).await? {
            return Err(CatalogError::NotFound(crop_id));
        }
        info!("{:<12} --> 작물 수정: id={}", "Catalog", crop_id);
        Ok(crop)
    }

    /// 3. 작물 삭제
    /// 연쇄 삭제는 단계별로 독립 실행하고 결과를 모두 보고한다.
    pub async fn delete(
        &self,
        farmer: &SessionUser,
        crop_id: CropId,
    ) -> Result<CascadeReport, CatalogError> {
        let _guard = self.locks.acquire(crop_id).await;
        self.owned_crop(farmer, crop_id).await?;

        let mut steps = Vec::with_capacity(4);
        for step in [
            CascadeStep::Messages,
            CascadeStep::Bids,
            CascadeStep::Wishlist,
            CascadeStep::Winner,
        ] {
            let result = match step {
                CascadeStep::Messages => self.store.delete_messages_for(crop_id).await,
                CascadeStep::Bids => self.store.delete_bids_for(crop_id).await,
                CascadeStep::Wishlist => self.store.delete_wishlist_for_crop(crop_id).await,
                CascadeStep::Winner => self
                    .store
                    .delete_winner_for(crop_id)
                    .await
                    .map(u64::from),
            };
            let outcome = match result {
                Ok(count) => StepOutcome::Removed { count },
                Err(e) => {
                    warn!(
                        "{:<12} --> 연쇄 삭제 단계 실패: crop={}, step={:?}, {}",
                        "Catalog", crop_id, step, e
                    );
                    StepOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            steps.push(StepReport { step, outcome });
        }

        let mut report = CascadeReport {
            crop_id,
            steps,
            crop_deleted: false,
        };
        match self.store.delete_crop(crop_id).await {
            Ok(true) => {
                report.crop_deleted = true;
                info!("{:<12} --> 작물 삭제: id={}", "Catalog", crop_id);
                Ok(report)
            }
            Ok(false) => Err(CatalogError::NotFound(crop_id)),
            Err(source) => Err(CatalogError::DeleteFailed { report, source }),
        }
    }

    /// 4. 찜 추가
    pub async fn add_to_wishlist(
        &self,
        user_id: UserId,
        crop_id: CropId,
        now: DateTime<Utc>,
    ) -> Result<WishlistEntry, CatalogError> {
        if self.store.get_crop(crop_id).await?.is_none() {
            return Err(CatalogError::NotFound(crop_id));
        }
        let entry = WishlistEntry {
            user_id,
            crop_id,
            added_at: now,
        };
        if !self.store.add_to_wishlist(&entry).await? {
            return Err(CatalogError::AlreadyInWishlist);
        }
        Ok(entry)
    }

    /// 찜 목록 조회
    pub async fn wishlist(&self, user_id: &UserId) -> Result<Vec<WishlistEntry>, CatalogError> {
        Ok(self.store.wishlist_for(user_id).await?)
    }

    async fn owned_crop(&self, farmer: &SessionUser, crop_id: CropId) -> Result<Crop, CatalogError> {
        let crop = self
            .store
            .get_crop(crop_id)
            .await?
            .ok_or(CatalogError::NotFound(crop_id))?;
        if crop.farmer_id != farmer.id {
            return Err(CatalogError::NotOwner);
        }
        Ok(crop)
    }
}
// endregion: --- Crop Catalog
