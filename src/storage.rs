use anyhow::{Context, Result};
use facerank_vision::{BoundingBox, Descriptor, DetectedFace};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const RECORDS_FILE: &str = "references.bin";

/// One enrolled reference face for a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub id: String,
    pub label: String,
    pub descriptor: Vec<f32>,
    pub has_sunglasses: bool,
    pub age: Option<f32>,
}

impl ReferenceRecord {
    pub fn from_face(label: impl Into<String>, face: &DetectedFace) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            label: label.into(),
            descriptor: face.descriptor.to_vec(),
            has_sunglasses: face.has_sunglasses,
            age: face.age,
        }
    }

    /// Rebuild a face for ranking. Geometry is not stored.
    pub fn to_face(&self) -> DetectedFace {
        DetectedFace::new(
            Descriptor::new(self.descriptor.clone()),
            BoundingBox::new(0.0, 0.0, 0.0, 0.0),
        )
        .with_sunglasses(self.has_sunglasses)
        .with_age(self.age)
    }
}

/// Per-subject reference records on disk, one postcard file per subject.
#[derive(Debug, Clone)]
pub struct ReferenceStore {
    root: PathBuf,
}

impl ReferenceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Subjects are single directory names under the store root.
    fn subject_path(&self, subject: &str) -> Result<PathBuf> {
        if subject.is_empty() || subject == "." || subject == ".." {
            anyhow::bail!("invalid subject name {:?}", subject);
        }
        if subject.contains(['/', '\\']) {
            anyhow::bail!("subject name {:?} must not contain path separators", subject);
        }
        Ok(self.root.join(subject))
    }

    pub fn load_records(&self, subject: &str) -> Result<Vec<ReferenceRecord>> {
        let file = self.subject_path(subject)?.join(RECORDS_FILE);

        if !file.exists() {
            return Ok(vec![]);
        }

        let data = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
        postcard::from_bytes(&data).with_context(|| format!("decoding {}", file.display()))
    }

    fn write_records(&self, subject: &str, records: &[ReferenceRecord]) -> Result<()> {
        let path = self.subject_path(subject)?;
        std::fs::create_dir_all(&path)?;
        let file = path.join(RECORDS_FILE);
        let data = postcard::to_allocvec(records)?;
        std::fs::write(&file, data).with_context(|| format!("writing {}", file.display()))?;
        Ok(())
    }

    pub fn save_record(&self, subject: &str, record: ReferenceRecord) -> Result<()> {
        let mut records = self.load_records(subject)?;
        if let Some(first) = records.first() {
            if first.descriptor.len() != record.descriptor.len() {
                anyhow::bail!(
                    "descriptor length {} does not match the {} already enrolled for {}",
                    record.descriptor.len(),
                    first.descriptor.len(),
                    subject
                );
            }
        }
        records.push(record);
        self.write_records(subject, &records)
    }

    /// Returns whether a record with `id` existed.
    pub fn remove_record(&self, subject: &str, id: &str) -> Result<bool> {
        let mut records = self.load_records(subject)?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Ok(false);
        }
        self.write_records(subject, &records)?;
        Ok(true)
    }

    pub fn purge(&self, subject: &str) -> Result<()> {
        let path = self.subject_path(subject)?;
        if path.exists() {
            std::fs::remove_dir_all(&path).with_context(|| format!("removing {}", path.display()))?;
        }
        Ok(())
    }

    pub fn list_subjects(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(vec![]);
        }
        let mut subjects = Vec::new();
        for entry in std::fs::read_dir(&self.root)
            .with_context(|| format!("listing {}", self.root.display()))?
        {
            let entry = entry?;
            if entry.path().join(RECORDS_FILE).exists() {
                subjects.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        subjects.sort();
        Ok(subjects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(values: Vec<f32>) -> DetectedFace {
        DetectedFace::new(Descriptor::new(values), BoundingBox::new(0.0, 0.0, 10.0, 10.0))
    }

    #[test]
    fn test_save_load_remove_purge() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ReferenceStore::new(dir.path());
        assert!(store.load_records("alice")?.is_empty());

        let first = ReferenceRecord::from_face("front", &face(vec![0.1, 0.2]).with_age(Some(29.0)));
        let second = ReferenceRecord::from_face("side", &face(vec![0.3, 0.4]).with_sunglasses(true));
        store.save_record("alice", first.clone())?;
        store.save_record("alice", second.clone())?;

        let loaded = store.load_records("alice")?;
        assert_eq!(loaded, vec![first.clone(), second.clone()]);
        assert_eq!(store.list_subjects()?, vec!["alice".to_string()]);

        let restored = loaded[1].to_face();
        assert!(restored.has_sunglasses);
        assert_eq!(restored.descriptor.to_vec(), vec![0.3, 0.4]);

        assert!(store.remove_record("alice", &first.id)?);
        assert!(!store.remove_record("alice", "missing")?);
        assert_eq!(store.load_records("alice")?, vec![second]);

        store.purge("alice")?;
        assert!(store.load_records("alice")?.is_empty());
        assert!(store.list_subjects()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_subject_cannot_escape_store() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().join("store");
        let store = ReferenceStore::new(&root);
        store.save_record("dave", ReferenceRecord::from_face("a", &face(vec![0.0; 4])))?;
        std::fs::write(dir.path().join("keep.txt"), "outside")?;

        for bad in ["", ".", "..", "../dave", "a/b", "a\\b"] {
            assert!(store.purge(bad).is_err(), "purge accepted {:?}", bad);
            assert!(
                store
                    .save_record(bad, ReferenceRecord::from_face("x", &face(vec![0.0; 4])))
                    .is_err(),
                "save accepted {:?}",
                bad
            );
            assert!(store.load_records(bad).is_err());
        }

        assert!(dir.path().join("keep.txt").exists());
        assert_eq!(store.load_records("dave")?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_mismatched_descriptor_length_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ReferenceStore::new(dir.path());
        store.save_record("bob", ReferenceRecord::from_face("a", &face(vec![0.0; 128])))?;
        let err = store
            .save_record("bob", ReferenceRecord::from_face("b", &face(vec![0.0; 64])))
            .unwrap_err();
        assert!(err.to_string().contains("does not match"));
        assert_eq!(store.load_records("bob")?.len(), 1);
        Ok(())
    }
}
