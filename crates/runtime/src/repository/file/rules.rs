//! Directory-backed [`RuleSource`].

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use directories::ProjectDirs;

use crate::repository::{Result, RuleDefinition, RuleMetadata, RuleSource, RuleSourceError};

/// File extension of rule files.
pub const RULE_EXTENSION: &str = "ifl";

/// Name of the metadata file stored next to the rules.
pub const METADATA_FILE: &str = "rules.ron";

/// Rule files in one directory plus a RON metadata file.
///
/// Discovery lists `*.ifl` files sorted by file name; the rule name is the
/// file stem. Metadata is written to a temp file and renamed into place.
#[derive(Debug, Clone)]
pub struct FileRuleSource {
    dir: PathBuf,
}

impl FileRuleSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Platform config directory for rules (`…/pickup/rules`).
    pub fn default_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "pickup").map(|dirs| dirs.config_dir().join("rules"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }
}

#[async_trait]
impl RuleSource for FileRuleSource {
    async fn discover(&self) -> Result<Vec<RuleDefinition>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(target: "pickup::rules", dir = %self.dir.display(), "rule directory missing");
                return Ok(Vec::new());
            }
            Err(e) => return Err(RuleSourceError::io(self.dir.display().to_string(), e)),
        };

        let mut rules = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RuleSourceError::io(self.dir.display().to_string(), e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RULE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                rules.push(RuleDefinition::new(stem, path.display().to_string()));
            }
        }
        rules.sort_by(|a, b| a.name.cmp(&b.name));

        tracing::debug!(target: "pickup::rules", dir = %self.dir.display(), count = rules.len(), "discovered rules");
        Ok(rules)
    }

    async fn read(&self, rule: &RuleDefinition) -> Result<String> {
        tokio::fs::read_to_string(&rule.location)
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => RuleSourceError::NotFound(rule.location.clone()),
                _ => RuleSourceError::io(rule.location.clone(), e),
            })
    }

    async fn load_metadata(&self) -> Result<Option<RuleMetadata>> {
        let path = self.metadata_path();
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RuleSourceError::io(path.display().to_string(), e)),
        };

        let metadata = ron::from_str(&content)
            .map_err(|e| RuleSourceError::Metadata(format!("failed to parse {}: {e}", path.display())))?;
        Ok(Some(metadata))
    }

    async fn save_metadata(&self, metadata: &RuleMetadata) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| RuleSourceError::io(self.dir.display().to_string(), e))?;

        let content = ron::ser::to_string_pretty(metadata, ron::ser::PrettyConfig::default())
            .map_err(|e| RuleSourceError::Metadata(e.to_string()))?;

        let path = self.metadata_path();
        let temp_path = path.with_extension("ron.tmp");
        tokio::fs::write(&temp_path, content)
            .await
            .map_err(|e| RuleSourceError::io(temp_path.display().to_string(), e))?;
        tokio::fs::rename(&temp_path, &path)
            .await
            .map_err(|e| RuleSourceError::io(path.display().to_string(), e))?;

        tracing::debug!(target: "pickup::rules", path = %path.display(), rules = metadata.len(), "saved rule metadata");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RuleMeta;

    #[tokio::test]
    async fn discovers_only_rule_files_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("uniques.ifl"), "Rarity == Unique").unwrap();
        std::fs::write(dir.path().join("currency.ifl"), "Class == \"Currency\"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let source = FileRuleSource::new(dir.path());
        let rules = source.discover().await.unwrap();

        let names: Vec<_> = rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["currency", "uniques"]);
        assert_eq!(source.read(&rules[1]).await.unwrap(), "Rarity == Unique");
    }

    #[tokio::test]
    async fn missing_directory_discovers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileRuleSource::new(dir.path().join("absent"));

        assert!(source.discover().await.unwrap().is_empty());
        assert_eq!(source.load_metadata().await.unwrap(), None);
    }

    #[tokio::test]
    async fn metadata_round_trips_through_ron() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileRuleSource::new(dir.path().join("nested"));
        let metadata = RuleMetadata {
            rules: vec![
                RuleMeta {
                    name: "uniques".into(),
                    enabled: false,
                },
                RuleMeta {
                    name: "currency".into(),
                    enabled: true,
                },
            ],
        };

        source.save_metadata(&metadata).await.unwrap();

        assert_eq!(source.load_metadata().await.unwrap(), Some(metadata));
        assert!(!dir.path().join("nested/rules.ron.tmp").exists());
    }

    #[tokio::test]
    async fn vanished_file_reads_as_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileRuleSource::new(dir.path());
        let rule = RuleDefinition::new("gone", dir.path().join("gone.ifl").display().to_string());

        let err = source.read(&rule).await.unwrap_err();
        assert!(matches!(err, RuleSourceError::NotFound(_)));
        assert!(!err.is_transient());
    }
}
