use crate::error::{AnalysisError, Result};
use crate::recording::InMemoryRecording;
use anyhow::Context;
use std::fs;
use std::path::Path;

/// Load a JSON recording; an empty `id` is replaced with the file stem.
pub fn load_recording(path: &Path) -> Result<InMemoryRecording> {
    let text = fs::read_to_string(path).map_err(|err| AnalysisError::from_io(path, err))?;
    let mut rec: InMemoryRecording =
        serde_json::from_str(&text).map_err(|err| AnalysisError::unreadable(path, err))?;
    if rec.id.trim().is_empty() {
        rec.id = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "recording".into());
    }
    rec.validate().map_err(|err| AnalysisError::unreadable(path, err))?;
    log::debug!(
        "loaded {} ({} channels) from {}",
        rec.id,
        rec.channels.len(),
        path.display()
    );
    Ok(rec)
}

pub fn write_recording(path: &Path, rec: &InMemoryRecording) -> anyhow::Result<()> {
    let file =
        fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer(file, rec)
        .with_context(|| format!("writing recording {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::tests::ramp_recording;
    use crate::recording::Recording;
    use tempfile::tempdir;

    #[test]
    fn writes_and_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ramp.json");
        let rec = ramp_recording();
        write_recording(&path, &rec).unwrap();
        let loaded = load_recording(&path).unwrap();
        assert_eq!(loaded, rec);
    }

    #[test]
    fn empty_id_uses_file_stem() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("21n04003.json");
        fs::write(
            &path,
            r#"{"id": "", "data_rate": 4.0, "channels": [{"name": "Im", "sweeps": [[1, 2], [3, 4]]}]}"#,
        )
        .unwrap();
        let rec = load_recording(&path).unwrap();
        assert_eq!(rec.id(), "21n04003");
        assert!(rec.tags().is_empty());
        assert_eq!(rec.sweep_length_sec(), 0.5);
    }

    #[test]
    fn invalid_shape_is_unreadable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(
            &path,
            r#"{"id": "bad", "data_rate": 4.0, "channels": [{"name": "Im", "sweeps": [[1, 2], [3]]}]}"#,
        )
        .unwrap();
        assert!(matches!(
            load_recording(&path),
            Err(AnalysisError::InputUnreadable { .. })
        ));
        assert!(matches!(
            load_recording(&dir.path().join("missing.json")),
            Err(AnalysisError::InputNotFound(_))
        ));
    }
}
