/// Document store abstraction and its backends.
pub mod game_store;
/// Entities persisted by the document store.
pub mod models;
/// Backend-agnostic storage errors.
pub mod storage;
