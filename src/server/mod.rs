pub mod collection_server;
pub mod console;
pub mod line_codec;
