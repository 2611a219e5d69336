//! Domain commands. Each submodule defines one [`Operation`](crate::operation::Operation)
//! over the shared fetch/cache core plus its record, delta and rendering.

pub mod block;
pub mod difficulty;
pub mod fees;
pub mod mempool;
pub mod price;
pub mod providers;

pub use block::BlockCommand;
pub use difficulty::DifficultyCommand;
pub use fees::FeesCommand;
pub use mempool::MempoolCommand;
pub use price::PriceCommand;
pub use providers::ProvidersCommand;
