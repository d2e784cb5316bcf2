//! Site description generation.
//!
//! Descriptions come from a generative-text service when one is configured.
//! Any failure there is absorbed: the caller always gets a description,
//! falling back to a canned sentence chosen by category.

mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Known site categories, in display order
pub const CATEGORIES: [&str; 8] = [
    "Technology",
    "Design",
    "News",
    "Education",
    "Entertainment",
    "Business",
    "Health",
    "Travel",
];

#[derive(Debug, Error)]
pub enum TextGenerationError {
    #[error("Text generation is not configured")]
    NotConfigured,
    #[error("Text generation request failed: {0}")]
    Request(String),
    #[error("Text generation service error: {0}")]
    Upstream(String),
    #[error("Text generation returned no text")]
    EmptyResponse,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(&self, prompt: &str) -> Result<String, TextGenerationError>;
}

/// Turns (title, category, link) into prose. Never fails.
#[derive(Clone)]
pub struct DescriptionGenerator {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl DescriptionGenerator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator: Some(generator),
        }
    }

    /// Generator that always uses the fallback table
    pub fn fallback_only() -> Self {
        Self { generator: None }
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_some()
    }

    pub async fn generate(&self, title: &str, category: &str, link: &str) -> String {
        let result = match &self.generator {
            Some(generator) => generator
                .generate_text(&build_prompt(title, category, link))
                .await,
            None => Err(TextGenerationError::NotConfigured),
        };

        match result {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!(%title, %category, "Empty generated description, using fallback");
                fallback_description(title, category)
            }
            Err(e) => {
                warn!(%title, %category, error = %e, "Description generation failed, using fallback");
                fallback_description(title, category)
            }
        }
    }
}

pub fn build_prompt(title: &str, category: &str, link: &str) -> String {
    format!(
        "Write a short, engaging description (2-3 sentences) for a website titled \"{title}\" \
         in the \"{category}\" category (link: {link}). The description should be informative, \
         concise, and appealing to users. Focus on what makes this website valuable and unique."
    )
}

/// Canned description for a category; total over all inputs.
pub fn fallback_description(title: &str, category: &str) -> String {
    match category {
        "Technology" => format!(
            "A cutting-edge {title} solution that leverages modern technology to provide innovative features and seamless user experience."
        ),
        "Design" => format!(
            "A beautifully crafted {title} platform that showcases exceptional design principles and user-centered approach."
        ),
        "News" => format!(
            "Stay informed with {title}, your reliable source for the latest news and updates in the industry."
        ),
        "Education" => format!(
            "Enhance your learning experience with {title}, a comprehensive educational resource designed for knowledge seekers."
        ),
        "Entertainment" => format!(
            "Discover endless entertainment possibilities with {title}, your gateway to fun and engaging content."
        ),
        "Business" => format!(
            "Boost your business productivity with {title}, a professional tool designed for modern enterprises."
        ),
        "Health" => format!(
            "Take control of your wellness journey with {title}, a trusted resource for health and fitness information."
        ),
        "Travel" => format!(
            "Explore the world with {title}, your ultimate travel companion for discovering new destinations and experiences."
        ),
        _ => format!(
            "Discover {title}, a valuable resource in the {category} category that offers unique insights and practical solutions."
        ),
    }
}

pub fn is_known_category(category: &str) -> bool {
    CATEGORIES.contains(&category)
}
