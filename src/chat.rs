//! Natural-language command dispatch for the chat surface.
//!
//! A message is classified into one [`Intent`] by prefix/regex matching and
//! routed to the corresponding engine or favorites operation. Anything that
//! matches no command falls through to semantic retrieval, so the chat
//! endpoint never answers with an error for a well-formed message.

use anyhow::Result;
use regex::Regex;
use serde::Serialize;

use crate::engine::Engine;
use crate::favorites::FavoritesStore;

/// A classified chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    ClearFavorites,
    SaveFavorites(Vec<String>),
    ShowFavorites,
    /// Overlap search for the named cocktail, with semantic fallback.
    SimilarTo(String),
    RecommendFromFavorites,
    MostPopular,
    Rarest,
    /// No command matched; run semantic retrieval on the raw message.
    Freeform(String),
}

/// Pre-compiled message patterns. Built once at startup and shared.
pub struct IntentClassifier {
    re_clear: Regex,
    re_save: Regex,
    re_similar: Regex,
    re_from_favorites: Regex,
    re_popular: Regex,
    re_rarest: Regex,
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self {
            re_clear: Regex::new(r"(?i)^clear (my )?favourites?\.?$").unwrap(),
            re_save: Regex::new(r"(?i)^my favourites?\b\s*(?:ingredients?\b)?\s*(?:are\b|:)?\s*(.*)$")
                .unwrap(),
            re_similar: Regex::new(r"(?i)^recommend a cocktail similar to\s+(.+)$").unwrap(),
            re_from_favorites: Regex::new(
                r"(?i)^recommend 5 cocktails that contain my favourite ingredients",
            )
            .unwrap(),
            re_popular: Regex::new(r"(?i)^what are the 5 most popular ingredients").unwrap(),
            re_rarest: Regex::new(r"(?i)^what is the rarest ingredient").unwrap(),
        }
    }

    /// Classify one message. Match order mirrors command specificity:
    /// favorites management first, then the recommendation commands, then
    /// the freeform fallback.
    pub fn classify(&self, message: &str) -> Intent {
        let trimmed = message.trim();
        let lowered = trimmed.to_lowercase();

        if self.re_clear.is_match(trimmed) {
            return Intent::ClearFavorites;
        }

        // "What are my favourite..." also contains "my favourite", so the
        // question form is checked before the save form.
        if lowered.contains("what are my favourite") {
            return Intent::ShowFavorites;
        }

        if let Some(caps) = self.re_save.captures(trimmed) {
            let ingredients: Vec<String> = caps[1]
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|w| !w.is_empty())
                .map(title_case)
                .collect();
            return Intent::SaveFavorites(ingredients);
        }

        if let Some(caps) = self.re_similar.captures(trimmed) {
            let name = caps[1]
                .trim_matches(|c| matches!(c, '"' | '\'' | '“' | '”'))
                .trim()
                .to_string();
            return Intent::SimilarTo(name);
        }

        if self.re_from_favorites.is_match(trimmed) {
            return Intent::RecommendFromFavorites;
        }

        if self.re_popular.is_match(trimmed) {
            return Intent::MostPopular;
        }

        if self.re_rarest.is_match(trimmed) {
            return Intent::Rarest;
        }

        Intent::Freeform(trimmed.to_string())
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// A chat reply: either one sentence or a list of result lines.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ChatReply {
    Text(String),
    List(Vec<String>),
}

/// Route one chat message through the engine and favorites store.
pub async fn respond(
    engine: &Engine,
    favorites: &dyn FavoritesStore,
    classifier: &IntentClassifier,
    user_id: &str,
    message: &str,
    k: usize,
) -> Result<ChatReply> {
    match classifier.classify(message) {
        Intent::ClearFavorites => {
            favorites.clear(user_id).await?;
            Ok(ChatReply::Text(
                "Your favourites have been cleared.".to_string(),
            ))
        }
        Intent::SaveFavorites(ingredients) => {
            favorites.save(user_id, &ingredients).await?;
            Ok(ChatReply::Text(format!(
                "Saved your favourites: {}",
                ingredients.join(", ")
            )))
        }
        Intent::ShowFavorites => {
            let favs = favorites.get(user_id).await?;
            if favs.is_empty() {
                Ok(ChatReply::Text(
                    "You have not set any favourites yet.".to_string(),
                ))
            } else {
                Ok(ChatReply::Text(favs.join(", ")))
            }
        }
        Intent::SimilarTo(name) => {
            let overlapping = engine.search_similar(&name, k);
            if !overlapping.is_empty() {
                return Ok(ChatReply::List(overlapping));
            }
            // No exact-name ingredient overlap — switch strategy.
            let semantic = engine.retrieve(&name, k).await?;
            if !semantic.is_empty() {
                let mut lines = vec![format!(
                    "No exact ingredient overlap for '{}'. Here are semantically similar cocktails:",
                    name
                )];
                lines.extend(semantic);
                return Ok(ChatReply::List(lines));
            }
            Ok(ChatReply::List(vec![format!(
                "Sorry, I couldn't find cocktails similar to '{}'.",
                name
            )]))
        }
        Intent::RecommendFromFavorites => {
            let favs = favorites.get(user_id).await?;
            if favs.is_empty() {
                return Ok(ChatReply::Text(
                    "You have no saved favourites yet.".to_string(),
                ));
            }
            let matches = engine.search_by_ingredients(&favs, k);
            if matches.is_empty() {
                Ok(ChatReply::List(vec![
                    "No matching cocktails found.".to_string()
                ]))
            } else {
                Ok(ChatReply::List(matches))
            }
        }
        Intent::MostPopular => Ok(ChatReply::List(
            engine
                .most_popular(k)
                .into_iter()
                .map(|(ing, count)| format!("{}: {}", title_case(&ing), count))
                .collect(),
        )),
        Intent::Rarest => Ok(ChatReply::List(
            engine
                .rarest(k)
                .into_iter()
                .map(|(ing, count)| format!("{}: {}", title_case(&ing), count))
                .collect(),
        )),
        Intent::Freeform(query) => {
            let results = engine.retrieve(&query, k).await?;
            if results.is_empty() {
                Ok(ChatReply::List(vec![
                    "Sorry, I couldn't find any cocktails matching that.".to_string(),
                ]))
            } else {
                Ok(ChatReply::List(results))
            }
        }
    }
}

/// Capitalize the first letter of each whitespace-separated word.
fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;
    use crate::corpus::{CocktailRecord, Corpus};
    use crate::favorites::InMemoryFavorites;
    use crate::index::FlatIndex;

    fn classifier() -> IntentClassifier {
        IntentClassifier::new()
    }

    #[test]
    fn test_classify_clear() {
        let c = classifier();
        assert_eq!(c.classify("clear my favourites."), Intent::ClearFavorites);
        assert_eq!(c.classify("Clear favourites"), Intent::ClearFavorites);
        // Not anchored-only forms fall through.
        assert_ne!(
            c.classify("please clear my favourites"),
            Intent::ClearFavorites
        );
    }

    #[test]
    fn test_classify_save_title_cases() {
        let c = classifier();
        assert_eq!(
            c.classify("my favourite ingredients are rum, mint"),
            Intent::SaveFavorites(vec!["Rum".to_string(), "Mint".to_string()])
        );
    }

    #[test]
    fn test_classify_show_before_save() {
        let c = classifier();
        assert_eq!(
            c.classify("what are my favourite ingredients?"),
            Intent::ShowFavorites
        );
    }

    #[test]
    fn test_classify_similar_strips_quotes() {
        let c = classifier();
        assert_eq!(
            c.classify("Recommend a cocktail similar to \"Hpnotiq Breeze\""),
            Intent::SimilarTo("Hpnotiq Breeze".to_string())
        );
    }

    #[test]
    fn test_classify_aggregations_and_fallback() {
        let c = classifier();
        assert_eq!(
            c.classify("What are the 5 most popular ingredients?"),
            Intent::MostPopular
        );
        assert_eq!(
            c.classify("What is the rarest ingredient?"),
            Intent::Rarest
        );
        assert_eq!(
            c.classify("something with citrus"),
            Intent::Freeform("something with citrus".to_string())
        );
    }

    async fn test_engine() -> Engine {
        let corpus = Corpus::from_records(vec![
            CocktailRecord::new("Daiquiri", "Rum, Lime Juice, Sugar"),
            CocktailRecord::new("Mojito", "Rum, Lime Juice, Sugar, Mint, Soda"),
        ])
        .unwrap();
        let cfg = EmbeddingConfig::default();
        let tmp = tempfile::TempDir::new().unwrap();
        let index = FlatIndex::build_or_load(&corpus, &cfg, &tmp.path().join("idx"))
            .await
            .unwrap();
        Engine::from_parts(corpus, index, cfg)
    }

    #[tokio::test]
    async fn test_respond_favorites_round_trip() {
        let engine = test_engine().await;
        let store = InMemoryFavorites::new();
        let c = classifier();

        let reply = respond(&engine, &store, &c, "u1", "my favourite rum mint", 5)
            .await
            .unwrap();
        assert_eq!(reply, ChatReply::Text("Saved your favourites: Rum, Mint".into()));

        let reply = respond(&engine, &store, &c, "u1", "what are my favourite ingredients", 5)
            .await
            .unwrap();
        assert_eq!(reply, ChatReply::Text("Rum, Mint".into()));

        let reply = respond(&engine, &store, &c, "u1", "clear my favourites", 5)
            .await
            .unwrap();
        assert_eq!(
            reply,
            ChatReply::Text("Your favourites have been cleared.".into())
        );
    }

    #[tokio::test]
    async fn test_respond_recommend_from_favorites() {
        let engine = test_engine().await;
        let store = InMemoryFavorites::new();
        let c = classifier();

        let reply = respond(
            &engine,
            &store,
            &c,
            "u1",
            "recommend 5 cocktails that contain my favourite ingredients",
            5,
        )
        .await
        .unwrap();
        assert_eq!(
            reply,
            ChatReply::Text("You have no saved favourites yet.".into())
        );

        store
            .save("u1", &["Rum".into(), "Mint".into()])
            .await
            .unwrap();
        let reply = respond(
            &engine,
            &store,
            &c,
            "u1",
            "recommend 5 cocktails that contain my favourite ingredients",
            5,
        )
        .await
        .unwrap();
        assert_eq!(
            reply,
            ChatReply::List(vec![
                "Mojito. Ingredients: Rum, Lime Juice, Sugar, Mint, Soda".into()
            ])
        );
    }

    #[tokio::test]
    async fn test_respond_similar_with_overlap() {
        let engine = test_engine().await;
        let store = InMemoryFavorites::new();
        let c = classifier();

        let reply = respond(
            &engine,
            &store,
            &c,
            "u1",
            "recommend a cocktail similar to Daiquiri",
            5,
        )
        .await
        .unwrap();
        assert_eq!(
            reply,
            ChatReply::List(vec![
                "Mojito. Ingredients: Rum, Lime Juice, Sugar, Mint, Soda (common: 3)".into()
            ])
        );
    }

    #[tokio::test]
    async fn test_respond_similar_falls_back_to_semantic() {
        let engine = test_engine().await;
        let store = InMemoryFavorites::new();
        let c = classifier();

        let reply = respond(
            &engine,
            &store,
            &c,
            "u1",
            "recommend a cocktail similar to rum sugar drink",
            2,
        )
        .await
        .unwrap();
        match reply {
            ChatReply::List(lines) => {
                assert!(lines[0].contains("No exact ingredient overlap"));
                assert_eq!(lines.len(), 3);
            }
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_respond_popularity() {
        let engine = test_engine().await;
        let store = InMemoryFavorites::new();
        let c = classifier();

        let reply = respond(
            &engine,
            &store,
            &c,
            "u1",
            "what are the 5 most popular ingredients",
            5,
        )
        .await
        .unwrap();
        match reply {
            ChatReply::List(lines) => assert_eq!(lines[0], "Rum: 2"),
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("lime juice"), "Lime Juice");
        assert_eq!(title_case("RUM"), "Rum");
    }
}
