pub mod pool;
pub mod protocol;
pub mod token;
pub mod transaction;

pub use pool::{PoolChartEntry, PoolRecord, PoolSummary, PoolTokenRef};
pub use protocol::{ProtocolChartEntry, ProtocolRecord, ProtocolSummary};
pub use token::{PricePoint, PriceSeries, TokenChartEntry, TokenRecord, TokenSummary};
pub use transaction::{Transaction, TransactionKind};
