use std::str::FromStr;

use sembed_core::EmbedError;

/// Sentence-embedding models the service knows how to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    AllMiniLmL6V2,
    AllMiniLmL12V2,
    BgeSmallEnV15,
    BgeBaseEnV15,
    NomicEmbedTextV15,
    ParaphraseMultilingualMiniLmL12V2,
    MultilingualE5Small,
}

impl ModelKind {
    pub const ALL: [Self; 7] = [
        Self::AllMiniLmL6V2,
        Self::AllMiniLmL12V2,
        Self::BgeSmallEnV15,
        Self::BgeBaseEnV15,
        Self::NomicEmbedTextV15,
        Self::ParaphraseMultilingualMiniLmL12V2,
        Self::MultilingualE5Small,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllMiniLmL6V2 => "all-minilm-l6-v2",
            Self::AllMiniLmL12V2 => "all-minilm-l12-v2",
            Self::BgeSmallEnV15 => "bge-small-en-v1.5",
            Self::BgeBaseEnV15 => "bge-base-en-v1.5",
            Self::NomicEmbedTextV15 => "nomic-embed-text-v1.5",
            Self::ParaphraseMultilingualMiniLmL12V2 => "paraphrase-multilingual-minilm-l12-v2",
            Self::MultilingualE5Small => "multilingual-e5-small",
        }
    }

    pub const fn dimension(self) -> usize {
        match self {
            Self::BgeBaseEnV15 | Self::NomicEmbedTextV15 => 768,
            Self::AllMiniLmL6V2
            | Self::AllMiniLmL12V2
            | Self::BgeSmallEnV15
            | Self::ParaphraseMultilingualMiniLmL12V2
            | Self::MultilingualE5Small => 384,
        }
    }

    #[cfg(feature = "fastembed")]
    pub(crate) const fn to_fastembed(self) -> fastembed::EmbeddingModel {
        use fastembed::EmbeddingModel;
        match self {
            Self::AllMiniLmL6V2 => EmbeddingModel::AllMiniLML6V2,
            Self::AllMiniLmL12V2 => EmbeddingModel::AllMiniLML12V2,
            Self::BgeSmallEnV15 => EmbeddingModel::BGESmallENV15,
            Self::BgeBaseEnV15 => EmbeddingModel::BGEBaseENV15,
            Self::NomicEmbedTextV15 => EmbeddingModel::NomicEmbedTextV15,
            Self::ParaphraseMultilingualMiniLmL12V2 => EmbeddingModel::ParaphraseMLMiniLML12V2,
            Self::MultilingualE5Small => EmbeddingModel::MultilingualE5Small,
        }
    }
}

impl FromStr for ModelKind {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        let wanted = wanted.rsplit('/').next().unwrap_or_default();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| EmbedError::UnknownModel(s.to_string()))
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
