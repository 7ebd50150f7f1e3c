//! Order catalog core.
//!
//! The backing store offers exact-key get and put and nothing else: no key
//! listing and no transaction spanning several keys. The catalog therefore
//! keeps an explicit index record of all order numbers next to one record
//! per order, and every operation that touches both writes them in a fixed
//! order so that an interrupted operation can only ever leave an order
//! unindexed, never an index entry without its order:
//!
//! - create: save the order, then add it to the index
//! - delete: remove it from the index, then delete the order
//!
//! All mutating primitives are idempotent, so a caller may retry any failed
//! operation with the same arguments.

pub mod codec;
pub mod dispatcher;
pub mod error;
pub mod index;
pub mod repository;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatcher::Dispatcher;
pub use error::OrderError;
pub use index::IndexStore;
pub use repository::OrderRepository;
pub use service::{OrderService, RepairReport};
