pub mod body_encoder;
pub mod composer;
pub mod executor;
pub mod importer;
pub mod logger;
pub mod registry;
pub mod response_decoder;
pub mod token;
