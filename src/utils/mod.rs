pub mod data_uri;
pub mod logger;
pub mod redact;
