//! Prompt Assets
//!
//! The system prompt and the double-check instruction are external UTF-8
//! text assets, read fresh on every use.

use std::path::{Path, PathBuf};

use crate::error::{AgentError, Result};

pub const SYSTEM_PROMPT_FILE: &str = "system_message.md";
pub const VERIFICATION_PROMPT_FILE: &str = "format_response_system_message.md";

/// Where a prompt comes from
#[derive(Clone, Debug)]
pub enum PromptAsset {
    File(PathBuf),
    Inline(String),
}

impl PromptAsset {
    pub async fn load(&self) -> Result<String> {
        match self {
            PromptAsset::Inline(text) => Ok(text.clone()),
            PromptAsset::File(path) => tokio::fs::read_to_string(path).await.map_err(|source| {
                AgentError::Prompt {
                    path: path.display().to_string(),
                    source,
                }
            }),
        }
    }
}

/// The two prompt assets the loop consumes
#[derive(Clone, Debug)]
pub struct PromptAssets {
    pub system: PromptAsset,
    pub verification: PromptAsset,
}

impl PromptAssets {
    /// Both assets from a directory, using the standard file names
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            system: PromptAsset::File(dir.join(SYSTEM_PROMPT_FILE)),
            verification: PromptAsset::File(dir.join(VERIFICATION_PROMPT_FILE)),
        }
    }

    pub fn inline(system: impl Into<String>, verification: impl Into<String>) -> Self {
        Self {
            system: PromptAsset::Inline(system.into()),
            verification: PromptAsset::Inline(verification.into()),
        }
    }

    pub async fn system_prompt(&self) -> Result<String> {
        self.system.load().await
    }

    pub async fn verification_instructions(&self) -> Result<String> {
        self.verification.load().await
    }
}

impl Default for PromptAssets {
    fn default() -> Self {
        Self::from_dir("prompts/agent")
    }
}
