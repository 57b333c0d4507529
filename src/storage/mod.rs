pub mod collection_storage;
