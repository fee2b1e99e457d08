use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::codec::{
    ArrowIpcCodec, DelimitedCodec, JsonCodec, ParquetCodec, SpreadsheetCodec, SqliteCodec,
};
use crate::error::RegistryError;
use crate::traits::Codec;

/// Codec chosen for a dataset path.
#[derive(Clone)]
pub struct Resolved {
    pub codec: Arc<dyn Codec>,
    /// Where the dataset is actually read and written.
    pub path: PathBuf,
    /// True when the extension was not recognized and the fallback codec (and
    /// its extension) replaced it.
    pub substituted: bool,
}

impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolved")
            .field("codec", &self.codec.name())
            .field("path", &self.path)
            .field("substituted", &self.substituted)
            .finish()
    }
}

/// Maps file extensions to codecs.
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn Codec>>,
    fallback_extension: String,
}

impl CodecRegistry {
    /// Every format this crate ships, delimited text as fallback.
    pub fn standard() -> Result<Self, RegistryError> {
        CodecRegistryBuilder::new()
            .add("csv", DelimitedCodec)
            .add("json", JsonCodec)
            .add_many(&["sql", "db", "sqlite"], SqliteCodec)
            .add("parquet", ParquetCodec)
            .add_many(&["feather", "arrow"], ArrowIpcCodec)
            .add("xlsx", SpreadsheetCodec)
            .fallback("csv")
            .build()
    }

    pub fn get(&self, extension: &str) -> Option<&Arc<dyn Codec>> {
        self.codecs.get(&extension.to_ascii_lowercase())
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.codecs.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }

    /// Picks the codec for `path` by extension. Unknown or missing extensions
    /// resolve to the fallback codec at `<base>.<fallback extension>`.
    pub fn resolve(&self, path: &Path) -> Resolved {
        let known = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|e| self.get(e));

        match known {
            Some(codec) => Resolved {
                codec: codec.clone(),
                path: path.to_path_buf(),
                substituted: false,
            },
            None => Resolved {
                codec: self.codecs[&self.fallback_extension].clone(),
                path: path.with_extension(&self.fallback_extension),
                substituted: true,
            },
        }
    }
}

pub struct CodecRegistryBuilder {
    codecs: HashMap<String, Arc<dyn Codec>>,
    fallback_extension: Option<String>,
}

impl CodecRegistryBuilder {
    pub fn new() -> Self {
        Self {
            codecs: HashMap::new(),
            fallback_extension: None,
        }
    }

    pub fn add(self, extension: &str, codec: impl Codec + 'static) -> Self {
        self.add_many(&[extension], codec)
    }

    /// Registers one codec instance under several extensions.
    pub fn add_many(mut self, extensions: &[&str], codec: impl Codec + 'static) -> Self {
        let codec: Arc<dyn Codec> = Arc::new(codec);
        for extension in extensions {
            let extension = extension.trim_start_matches('.').to_ascii_lowercase();
            if self.fallback_extension.is_none() {
                self.fallback_extension = Some(extension.clone());
            }
            self.codecs.insert(extension, codec.clone());
        }
        self
    }

    pub fn fallback(mut self, extension: &str) -> Self {
        self.fallback_extension = Some(extension.trim_start_matches('.').to_ascii_lowercase());
        self
    }

    pub fn build(self) -> Result<CodecRegistry, RegistryError> {
        let fallback_extension = self.fallback_extension.ok_or(RegistryError::Empty)?;
        if !self.codecs.contains_key(&fallback_extension) {
            return Err(RegistryError::MissingFallback(fallback_extension));
        }
        Ok(CodecRegistry {
            codecs: self.codecs,
            fallback_extension,
        })
    }
}

impl Default for CodecRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_covers_every_format_family() {
        let registry = CodecRegistry::standard().unwrap();
        assert_eq!(
            registry.extensions(),
            ["arrow", "csv", "db", "feather", "json", "parquet", "sql", "sqlite", "xlsx"]
        );
        assert_eq!(registry.get("PARQUET").map(|c| c.name()), Some("parquet"));
    }

    #[test]
    fn known_extension_keeps_path() {
        let resolved = CodecRegistry::standard().unwrap().resolve(Path::new("dir/log.json"));
        assert_eq!(resolved.codec.name(), "json");
        assert_eq!(resolved.path, Path::new("dir/log.json"));
        assert!(!resolved.substituted);
    }

    #[test]
    fn unknown_extension_falls_back_to_csv() {
        let registry = CodecRegistry::standard().unwrap();

        let resolved = registry.resolve(Path::new("dir/log.xyz"));
        assert_eq!(resolved.codec.name(), "csv");
        assert_eq!(resolved.path, Path::new("dir/log.csv"));
        assert!(resolved.substituted);

        let bare = registry.resolve(Path::new("log"));
        assert_eq!(bare.path, Path::new("log.csv"));
        assert!(bare.substituted);
    }

    #[test]
    fn builder_validates_fallback() {
        assert!(matches!(
            CodecRegistryBuilder::new().build(),
            Err(RegistryError::Empty)
        ));
        assert!(matches!(
            CodecRegistryBuilder::new()
                .add("json", JsonCodec)
                .fallback(".CSV")
                .build(),
            Err(RegistryError::MissingFallback(ext)) if ext == "csv"
        ));

        let registry = CodecRegistryBuilder::new()
            .add(".JSON", JsonCodec)
            .build()
            .unwrap();
        assert_eq!(registry.resolve(Path::new("x.txt")).path, Path::new("x.json"));
    }
}
