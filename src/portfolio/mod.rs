pub mod account;
pub mod position;
pub mod trade;

pub use account::{Account, SizingMode, TradeRejection};
pub use position::Position;
pub use trade::{TradeReason, TradeRecord, TradeSide};
