pub mod commands;
pub mod model;
pub mod price;

pub use model::{Bid, BidId, Crop, CropId, CropStatus, NewBid, UserId, WinnerRecord};
pub use price::{Price, PriceError};
