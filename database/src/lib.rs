mod access;
mod cache;
mod db;
mod errors;
mod key;
mod set_access;
mod writer;

pub mod registry;
pub mod utils;

pub mod prelude {
    use crate::{db, errors};

    pub use super::access::CachedDbAccess;
    pub use super::cache::{Cache, CachePolicy};
    pub use super::key::DbKey;
    pub use super::set_access::DbSetAccess;
    pub use super::writer::{BatchDbWriter, DbWriter, DirectDbWriter};
    pub use db::{delete_db, ConnBuilder, DB};
    pub use errors::{StoreError, StoreErrorPredicates, StoreResult, StoreResultExt};
}
