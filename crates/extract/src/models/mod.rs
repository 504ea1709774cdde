mod chain;
mod record;
mod status;

pub use self::chain::CollectionChain;
pub use self::record::MetadataRecord;
pub use self::status::StatusTag;
