/// 입찰 관련 커맨드
/// 1. 입찰 요청 검증
// region:    --- Imports
use super::model::{CropId, UserId};
use super::price::{Price, PriceError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
// endregion: --- Imports

// region:    --- Commands
/// 입찰 요청 본문 (검증 전)
#[derive(Debug, Default, Deserialize)]
pub struct PlaceBidRequest {
    #[serde(default, alias = "bidderId")]
    pub bidder_id: Option<String>,
    #[serde(default, alias = "bidPrice")]
    pub bid_price: Option<serde_json::Value>,
}

/// 입찰 명령
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlaceBidCommand {
    pub crop_id: CropId,
    pub bidder_id: UserId,
    pub bid_price: Price,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing bidder_id or bid_price")]
    Missing,
    #[error("Invalid bid_price: {0}")]
    InvalidPrice(#[from] PriceError),
}

impl PlaceBidRequest {
    /// 1. 입찰 요청 검증
    pub fn into_command(self, crop_id: CropId) -> Result<PlaceBidCommand, ValidationError> {
        let bidder_id = self
            .bidder_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(ValidationError::Missing)?;
        let bid_price = match self.bid_price {
            None | Some(serde_json::Value::Null) => return Err(ValidationError::Missing),
            Some(serde_json::Value::String(s)) if s.trim().is_empty() => {
                return Err(ValidationError::Missing)
            }
            Some(value) => Price::from_json(&value)?,
        };

        Ok(PlaceBidCommand {
            crop_id,
            bidder_id: UserId(bidder_id),
            bid_price,
        })
    }
}
// endregion: --- Commands

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: serde_json::Value) -> PlaceBidRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn accepts_snake_and_camel_case() {
        let crop_id = CropId::new();
        let cmd = request(json!({"bidder_id": "u1", "bid_price": 12.5}))
            .into_command(crop_id)
            .unwrap();
        assert_eq!(cmd.bid_price.cents(), 1250);

        let cmd = request(json!({"bidderId": "u2", "bidPrice": "13"}))
            .into_command(crop_id)
            .unwrap();
        assert_eq!(cmd.bidder_id, UserId::from("u2"));
        assert_eq!(cmd.bid_price.cents(), 1300);
    }

    #[test]
    fn missing_fields_are_reported() {
        let crop_id = CropId::new();
        assert_eq!(
            request(json!({"bid_price": 3})).into_command(crop_id),
            Err(ValidationError::Missing)
        );
        assert_eq!(
            request(json!({"bidder_id": "  ", "bid_price": 3})).into_command(crop_id),
            Err(ValidationError::Missing)
        );
        assert_eq!(
            request(json!({"bidder_id": "u1", "bid_price": null})).into_command(crop_id),
            Err(ValidationError::Missing)
        );
    }

    #[test]
    fn non_numeric_price_is_invalid() {
        let err = request(json!({"bidder_id": "u1", "bid_price": "ten"}))
            .into_command(CropId::new())
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPrice(_)));
    }
}
