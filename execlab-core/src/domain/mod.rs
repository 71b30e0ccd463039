//! Domain types for ExecLab

pub mod bar;
pub mod market;
pub mod order;
pub mod signal;
pub mod trade;

pub use bar::PriceBar;
pub use market::{Market, TradingSession};
pub use order::{Order, OrderId, OrderIdGen, OrderSide};
pub use signal::{Direction, Signal, SignalType};
pub use trade::{CompletedTrade, ExitReason, PositionSide};

/// Symbol type alias
pub type Symbol = String;
