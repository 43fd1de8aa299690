mod error;
mod in_memory_store;
mod store_gateway;

pub use error::{StoreError, StoreResult};
pub use in_memory_store::InMemoryStore;
pub use store_gateway::{BoxFuture, StoreGateway, Subscription, paths};
