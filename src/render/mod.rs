use log::warn;
use serde::Serialize;

use crate::storage::collection_storage::{CollectionKey, ImageReference};

/// Turns the store's current state into output for one client.
pub trait Renderer: Send + Sync {
    fn render(
        &self,
        keys: &[&CollectionKey],
        selected: Option<&CollectionKey>,
        images: &[ImageReference],
    ) -> String;
}

pub struct TextRenderer;

impl Renderer for TextRenderer {
    fn render(
        &self,
        keys: &[&CollectionKey],
        selected: Option<&CollectionKey>,
        images: &[ImageReference],
    ) -> String {
        let mut out = String::new();
        if keys.is_empty() {
            out.push_str("No collections\n");
        } else {
            out.push_str("Collections:\n");
            for key in keys {
                let marker = if Some(*key) == selected { '*' } else { ' ' };
                out.push_str(&format!("{} {}\n", marker, key));
            }
        }

        if let Some(key) = selected {
            out.push_str(&format!("Collection for: {}\n", key));
            for image in images {
                out.push_str(&format!("  {}\n", image));
            }
        }
        out
    }
}

#[derive(Serialize)]
struct Snapshot<'a> {
    keys: &'a [&'a CollectionKey],
    selected: Option<&'a CollectionKey>,
    images: &'a [ImageReference],
}

/// One JSON object per line.
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(
        &self,
        keys: &[&CollectionKey],
        selected: Option<&CollectionKey>,
        images: &[ImageReference],
    ) -> String {
        let snapshot = Snapshot {
            keys,
            selected,
            images,
        };
        match serde_json::to_string(&snapshot) {
            Ok(mut line) => {
                line.push('\n');
                line
            }
            Err(e) => {
                warn!("failed to serialize snapshot: {}", e);
                "ERR render-failure\n".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> CollectionKey {
        CollectionKey::parse(s).unwrap()
    }

    fn image(s: &str) -> ImageReference {
        ImageReference::new(s).unwrap()
    }

    #[test]
    fn text_marks_selected_and_lists_images() {
        let a = key("a@b.com");
        let c = key("c@d.com");
        let out = TextRenderer.render(&[&a, &c], Some(&c), &[image("u1"), image("u2")]);
        assert_eq!(
            out,
            "Collections:\n  a@b.com\n* c@d.com\nCollection for: c@d.com\n  u1\n  u2\n"
        );
    }

    #[test]
    fn text_without_collections() {
        assert_eq!(TextRenderer.render(&[], None, &[]), "No collections\n");
    }

    #[test]
    fn json_snapshot_shape() {
        let a = key("a@b.com");
        let out = JsonRenderer.render(&[&a], Some(&a), &[image("u1")]);
        let value: serde_json::Value = serde_json::from_str(out.trim_end()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "keys": ["a@b.com"],
                "selected": "a@b.com",
                "images": ["u1"],
            })
        );
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn json_without_selection() {
        let out = JsonRenderer.render(&[], None, &[]);
        assert_eq!(out, "{\"keys\":[],\"selected\":null,\"images\":[]}\n");
    }
}
