pub mod blob;
pub mod file;
pub mod id;
pub mod statement;
pub mod value;
pub mod volume;

pub use id::RowId;

pub type JsonObject = serde_json::value::Map<String, serde_json::Value>;
pub type JsonValue = serde_json::Value;
