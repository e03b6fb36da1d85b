//! # Shaker
//!
//! A local-first cocktail retrieval engine. Natural-language questions about
//! cocktails are answered by combining exact attribute matching (ingredient
//! overlap, ingredient containment) with semantic nearest-neighbor retrieval
//! over a vector representation of each drink, plus ingredient-frequency
//! aggregation.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌─────────────┐
//! │ CSV corpus │──▶│  Normalizer   │──▶│ Flat L2 idx │
//! │ name,ingr. │   │ + embeddings │   │ (persisted) │
//! └────────────┘   └──────────────┘   └──────┬──────┘
//!                                            │
//!                          ┌─────────────────┤
//!                          ▼                 ▼
//!                     ┌─────────┐      ┌──────────┐
//!                     │   CLI   │      │   HTTP   │
//!                     │(shaker) │      │  (/chat) │
//!                     └─────────┘      └──────────┘
//! ```
//!
//! The corpus and index are built once at startup ([`engine::Engine::open`])
//! and shared read-only afterwards; every retrieval strategy is a pure read
//! over that snapshot.
//!
//! ## Quick Start
//!
//! ```bash
//! shaker index                          # embed the corpus, persist the index
//! shaker search "something with citrus"
//! shaker similar "Daiquiri"
//! shaker contains rum mint
//! shaker ingredients --rarest
//! shaker serve                          # start the chat server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`corpus`] | CSV loading and record normalization |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Flat L2 index and persisted artifact |
//! | [`engine`] | The retrieval strategies |
//! | [`favorites`] | Per-user favorite-ingredient store |
//! | [`chat`] | Intent classification and dispatch |
//! | [`server`] | HTTP chat server |

pub mod chat;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod engine;
pub mod favorites;
pub mod index;
pub mod server;
