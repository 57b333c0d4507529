pub mod image_source;
