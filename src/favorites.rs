//! Per-user favorite-ingredient store.
//!
//! The retrieval engine only consumes the ingredient list a store returns;
//! it never reaches into store internals. The store is created once at
//! process start and injected into the chat layer — there is no module-level
//! global.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Abstract favorites backend, keyed by user identifier.
///
/// Each user's favorites form a deduplicated, insertion-ordered set of
/// ingredient names.
#[async_trait]
pub trait FavoritesStore: Send + Sync {
    /// Append ingredients to a user's favorites, skipping ones already saved.
    async fn save(&self, user_id: &str, ingredients: &[String]) -> Result<()>;

    /// The user's favorites in insertion order; empty for unknown users.
    async fn get(&self, user_id: &str) -> Result<Vec<String>>;

    /// Remove all of a user's favorites.
    async fn clear(&self, user_id: &str) -> Result<()>;
}

/// In-memory store backed by a `RwLock`ed map. Favorites live for the
/// process lifetime only.
pub struct InMemoryFavorites {
    users: RwLock<HashMap<String, Vec<String>>>,
}

impl InMemoryFavorites {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryFavorites {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FavoritesStore for InMemoryFavorites {
    async fn save(&self, user_id: &str, ingredients: &[String]) -> Result<()> {
        let mut users = self.users.write().unwrap();
        let favorites = users.entry(user_id.to_string()).or_default();
        for ingredient in ingredients {
            if !favorites.contains(ingredient) {
                favorites.push(ingredient.clone());
            }
        }
        Ok(())
    }

    async fn get(&self, user_id: &str) -> Result<Vec<String>> {
        let users = self.users.read().unwrap();
        Ok(users.get(user_id).cloned().unwrap_or_default())
    }

    async fn clear(&self, user_id: &str) -> Result<()> {
        let mut users = self.users.write().unwrap();
        if let Some(favorites) = users.get_mut(user_id) {
            favorites.clear();
        }
        Ok(())
    }
}
