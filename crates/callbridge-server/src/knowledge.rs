//! Restaurant knowledge base: turns the JSON files in `knowledge.dir` into
//! the seed every call starts from.

use callbridge_types::{CallSeed, DEFAULT_GREETING};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

const PROFILE_FILE: &str = "config.json";
const MENU_FILE: &str = "menu.json";
const FAQ_FILE: &str = "faq.json";

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Contents of `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RestaurantProfile {
    pub restaurant_name: String,
    #[serde(default)]
    pub story: String,
    #[serde(default)]
    pub cuisine_type: String,
    #[serde(default)]
    pub initial_greeting: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeBase {
    pub profile: RestaurantProfile,
    pub menu: Value,
    pub faq: Value,
}

impl KnowledgeBase {
    /// Reads all three files from `dir`. Every file must exist and parse.
    pub fn load(dir: &Path) -> Result<Self, KnowledgeError> {
        Ok(Self {
            profile: read_json(&dir.join(PROFILE_FILE))?,
            menu: read_json(&dir.join(MENU_FILE))?,
            faq: read_json(&dir.join(FAQ_FILE))?,
        })
    }

    /// The assistant persona with the menu and FAQ inlined.
    pub fn instruction(&self) -> String {
        format!(
            "You are Lexi, a friendly, efficient, and conversational AI assistant for a \
             restaurant called {name}.\n\
             Your personality is helpful and concise. Your goal is to answer customer \
             questions and take food orders.\n\
             Use the information provided below to answer questions. Do not make up \
             information.\n\n\
             Restaurant Story: {story}\n\
             Cuisine Type: {cuisine}\n\
             Full Menu: {menu}\n\
             Frequently Asked Questions: {faq}\n",
            name = self.profile.restaurant_name,
            story = self.profile.story,
            cuisine = self.profile.cuisine_type,
            menu = pretty(&self.menu),
            faq = pretty(&self.faq),
        )
    }

    pub fn greeting(&self) -> &str {
        self.profile
            .initial_greeting
            .as_deref()
            .filter(|greeting| !greeting.trim().is_empty())
            .unwrap_or(DEFAULT_GREETING)
    }

    pub fn seed(&self) -> CallSeed {
        CallSeed::new(self.instruction(), self.greeting())
    }
}

/// Loads the call seed from `dir`, falling back to the generic seed when
/// the knowledge base is missing or broken.
pub fn load_seed(dir: &Path) -> CallSeed {
    match KnowledgeBase::load(dir) {
        Ok(knowledge) => {
            tracing::info!(
                dir = %dir.display(),
                restaurant = %knowledge.profile.restaurant_name,
                "knowledge base loaded"
            );
            knowledge.seed()
        }
        Err(e) => {
            tracing::warn!(
                dir = %dir.display(),
                "knowledge base unavailable, using the generic assistant: {}",
                e
            );
            CallSeed::default()
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, KnowledgeError> {
    let contents = std::fs::read_to_string(path).map_err(|source| KnowledgeError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| KnowledgeError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
