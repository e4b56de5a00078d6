pub mod batch;
pub mod connection;
pub mod deleter;
pub mod form;
pub mod object_store;
pub mod uploader;
