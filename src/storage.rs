mod catalog;
pub use catalog::{Catalog, Table};

mod store;
pub use store::{Entity, Insertion, Store, StoreError, Transaction, ValidationError};

mod memory;
pub use memory::MemoryStore;

/// A filesystem backed catalog store.
pub mod directory;
pub use directory::DirectoryStore;
