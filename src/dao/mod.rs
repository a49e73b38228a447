/// Database model definitions.
pub mod models;
/// Storage abstraction layer for persistence backends.
pub mod storage;
/// Event Gateway token persistence.
pub mod token_store;
