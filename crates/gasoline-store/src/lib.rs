mod detail_cache;
mod kv;
mod session;

pub use detail_cache::ElementDetailCache;
pub use kv::KvStore;
pub use session::Session;
pub use session::SessionStore;
pub use session::StoreError;
