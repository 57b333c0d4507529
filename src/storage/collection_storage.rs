use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::utils::validation::is_valid_key;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("invalid collection key")]
    InvalidKey,
    #[error("image reference is empty")]
    EmptyImage,
    #[error("image already in collection")]
    Duplicate,
    #[error("collection not found")]
    NotFound,
}

impl StoreError {
    /// Short code used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::InvalidKey => "invalid-key",
            StoreError::EmptyImage => "empty-image",
            StoreError::Duplicate => "duplicate",
            StoreError::NotFound => "not-found",
        }
    }
}

/// An email-shaped key that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CollectionKey(String);

impl CollectionKey {
    pub fn parse(input: &str) -> Result<Self, StoreError> {
        if !is_valid_key(input) {
            return Err(StoreError::InvalidKey);
        }
        Ok(Self(input.trim().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ImageReference(String);

impl ImageReference {
    pub fn new(url: impl Into<String>) -> Result<Self, StoreError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(StoreError::EmptyImage);
        }
        Ok(Self(url))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Images collected per key. Keys keep the order of their first add, images
/// keep the order they were added in and never repeat under one key.
#[derive(Debug, Default)]
pub struct CollectionStore {
    collections: HashMap<CollectionKey, Vec<ImageReference>>,
    order: Vec<CollectionKey>,
}

impl CollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str, image: &str) -> Result<(), StoreError> {
        let key = CollectionKey::parse(key)?;
        let image = ImageReference::new(image)?;

        match self.collections.get_mut(&key) {
            Some(images) => {
                if images.contains(&image) {
                    return Err(StoreError::Duplicate);
                }
                images.push(image);
            }
            None => {
                self.order.push(key.clone());
                self.collections.insert(key, vec![image]);
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let key = key.trim();
        let position = self
            .order
            .iter()
            .position(|k| k.as_str() == key)
            .ok_or(StoreError::NotFound)?;
        let key = self.order.remove(position);
        self.collections.remove(&key);
        Ok(())
    }

    pub fn remove_all(&mut self) {
        self.collections.clear();
        self.order.clear();
    }

    /// Keys in the order they were first added.
    pub fn list(&self) -> impl Iterator<Item = &CollectionKey> + '_ {
        self.order.iter()
    }

    /// Copy of the images under `key`, empty when the key is unknown.
    pub fn get(&self, key: &str) -> Vec<ImageReference> {
        self.lookup(key).cloned().unwrap_or_default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn lookup(&self, key: &str) -> Option<&Vec<ImageReference>> {
        let key = CollectionKey::parse(key).ok()?;
        self.collections.get(&key)
    }
}
