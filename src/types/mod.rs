//! Unified records shared by every venue adapter.
//!
//! Every monetary/size field is [`rust_decimal::Decimal`] rather than `f64`:
//! binary floats lose precision exactly where order placement and PnL
//! accounting cannot afford to.

mod balance;
mod candle;
mod funding_rate;
mod market;
mod order;
mod order_book;
mod position;
mod ticker;
mod trade;

pub use balance::Balance;
pub use candle::Candle;
pub use funding_rate::FundingRate;
pub use market::Market;
pub use order::{Order, OrderSide, OrderStatus, OrderType, TimeInForce};
pub use order_book::OrderBook;
pub use position::{MarginMode, Position, PositionSide};
pub use ticker::Ticker;
pub use trade::Trade;
