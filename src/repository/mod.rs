pub mod codec;
pub mod database;
pub mod holder_repository;
pub mod sync_repository;
pub mod token_repository;
pub mod transaction_repository;
pub mod transfer_repository;

pub use database::Database;
pub use holder_repository::HolderRepository;
pub use sync_repository::SyncStateRepository;
pub use token_repository::TokenRepository;
pub use transaction_repository::TransactionRepository;
pub use transfer_repository::TransferRepository;
