pub mod records;
pub mod store;

pub use records::{RecordStore, CHAT_KEY, SETTINGS_KEY};
pub use store::{FileStore, KvStore, StorageError};
