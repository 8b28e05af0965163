pub mod engine;
pub mod locks;

pub use engine::AuctionEngine;
pub use locks::{CropGuard, CropLocks};

use crate::bidding::{CropId, Price, WinnerRecord};
use crate::error::ErrorKind;
use crate::store::StoreError;
use serde::Serialize;
use thiserror::Error;

// region:    --- Auction Outcomes
/// 경매 종료 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Closure {
    WinnerAssigned(WinnerRecord),
    NoBids,
}

impl Closure {
    pub fn winner(&self) -> Option<&WinnerRecord> {
        match self {
            Closure::WinnerAssigned(record) => Some(record),
            Closure::NoBids => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuctionError {
    #[error("Crop not found: {0}")]
    CropNotFound(CropId),
    #[error("Bidding closed for this crop")]
    AuctionClosed(CropId),
    #[error("Bid must be higher than current price {current}")]
    BidTooLow { current: Price },
    #[error("Bid lost the race for crop {crop_id} after {attempts} attempts")]
    Contention { crop_id: CropId, attempts: u32 },
    #[error("Ledger and crop disagree on the leading bid for crop {0}")]
    Inconsistent(CropId),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl AuctionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuctionError::CropNotFound(_) => ErrorKind::NotFound,
            AuctionError::AuctionClosed(_)
            | AuctionError::BidTooLow { .. }
            | AuctionError::Contention { .. } => ErrorKind::Conflict,
            AuctionError::Inconsistent(_) | AuctionError::Storage(_) => ErrorKind::Fatal,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuctionError::CropNotFound(_) => "NOT_FOUND",
            AuctionError::AuctionClosed(_) => "AUCTION_CLOSED",
            AuctionError::BidTooLow { .. } => "LOW_BID",
            AuctionError::Contention { .. } => "MAX_RETRIES_EXCEEDED",
            AuctionError::Inconsistent(_) => "INCONSISTENT",
            AuctionError::Storage(_) => "STORAGE",
        }
    }
}
// endregion: --- Auction Outcomes
