//! Archive layout and file persistence
//!
//! All output for one CPV code lives under `<root>/T_<cpv>/`:
//!
//! ```text
//! T_71200000/
//!   last_batch.toml           batch ledger (leader-written)
//!   manifest_app_docs.csv     per-stage manifest of archived files
//!   app_docs/tender_<id>/     one directory per tender, one file per tab
//!   agency_docs/…
//!   agreement_docs/…
//! ```
//!
//! Each stage owns its subdirectory exclusively, so concurrent stages never
//! write to the same location.

use crate::pipeline::StageKind;
use crate::portal::DetailTab;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name of the batch ledger within the base directory
const LEDGER_FILE: &str = "last_batch.toml";

/// Resolved paths for one CPV code's archive
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    base_dir: PathBuf,
}

impl ProjectPaths {
    /// Creates the archive skeleton for a CPV code under `root`
    ///
    /// The base directory and all three stage directories are created up
    /// front, mirroring the portal project layout the downstream tooling
    /// expects.
    pub fn new(root: &Path, cpv_code: &str) -> std::io::Result<Self> {
        let base_dir = root.join(format!("T_{}", cpv_code));
        std::fs::create_dir_all(&base_dir)?;
        for stage in StageKind::ALL {
            std::fs::create_dir_all(base_dir.join(stage.dir_name()))?;
        }
        Ok(Self { base_dir })
    }

    /// The `T_<cpv>` base directory
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Output directory of one stage
    pub fn stage_dir(&self, stage: StageKind) -> PathBuf {
        self.base_dir.join(stage.dir_name())
    }

    /// Directory holding one tender's persisted tabs for a stage
    pub fn tender_dir(&self, stage: StageKind, app_id: &str) -> PathBuf {
        self.stage_dir(stage).join(format!("tender_{}", app_id))
    }

    /// Path of one persisted detail tab
    pub fn tab_path(&self, stage: StageKind, app_id: &str, tab: DetailTab) -> PathBuf {
        self.tender_dir(stage, app_id)
            .join(format!("{}.html", tab.file_stem()))
    }

    /// Path of the batch ledger for this CPV code
    pub fn ledger_path(&self) -> PathBuf {
        self.base_dir.join(LEDGER_FILE)
    }

    /// Path of a stage's manifest CSV
    pub fn manifest_path(&self, stage: StageKind) -> PathBuf {
        self.base_dir
            .join(format!("manifest_{}.csv", stage.dir_name()))
    }
}

/// Writes `content` to `path` via a temp sibling and rename
///
/// Parent directories are created as needed. A crash mid-write leaves at
/// most a stale `.tmp` file; the destination is either absent or complete.
pub fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)
}

/// Exports a stage's manifest CSV listing every archived tab file
///
/// Columns: app_id, tab, path. Rewritten whole each run so it always matches
/// the archive on disk. Returns the number of rows written.
pub fn export_manifest(paths: &ProjectPaths, stage: StageKind) -> std::io::Result<usize> {
    let stage_dir = paths.stage_dir(stage);
    let mut rows = Vec::new();

    for entry in std::fs::read_dir(&stage_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let dir_name = entry.file_name().to_string_lossy().into_owned();
        let Some(app_id) = dir_name.strip_prefix("tender_") else {
            continue;
        };

        for file in std::fs::read_dir(entry.path())? {
            let file = file?;
            if !file.file_type()?.is_file() {
                continue;
            }
            let path = file.path();
            let tab = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            rows.push((app_id.to_string(), tab, path.display().to_string()));
        }
    }

    // read_dir order is platform-dependent
    rows.sort();

    let mut content = String::from("app_id,tab,path\n");
    for (app_id, tab, path) in &rows {
        content.push_str(&format!(
            "{},{},{}\n",
            csv_field(app_id),
            csv_field(tab),
            csv_field(path)
        ));
    }

    write_atomic(&paths.manifest_path(stage), content.as_bytes())?;
    tracing::info!(
        "Exported manifest with {} rows to {}",
        rows.len(),
        paths.manifest_path(stage).display()
    );
    Ok(rows.len())
}

/// Quotes a CSV field when it contains a delimiter, quote, or newline
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_created_up_front() {
        let root = TempDir::new().unwrap();
        let paths = ProjectPaths::new(root.path(), "71200000").unwrap();

        assert!(paths.base_dir().ends_with("T_71200000"));
        for stage in StageKind::ALL {
            assert!(paths.stage_dir(stage).is_dir());
        }
    }

    #[test]
    fn test_tab_path_shape() {
        let root = TempDir::new().unwrap();
        let paths = ProjectPaths::new(root.path(), "71200000").unwrap();

        let path = paths.tab_path(StageKind::AppDocs, "123", DetailTab::AppMain);
        assert!(path.ends_with("app_docs/tender_123/app_main.html"));
    }

    #[test]
    fn test_write_atomic_creates_parents_and_no_tmp() {
        let root = TempDir::new().unwrap();
        let target = root.path().join("a/b/c.html");
        write_atomic(&target, b"<html></html>").unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"<html></html>");
        let siblings: Vec<_> = std::fs::read_dir(target.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(siblings.len(), 1);
    }

    #[test]
    fn test_manifest_lists_archived_tabs() {
        let root = TempDir::new().unwrap();
        let paths = ProjectPaths::new(root.path(), "71200000").unwrap();

        write_atomic(
            &paths.tab_path(StageKind::AppDocs, "7", DetailTab::AppMain),
            b"x",
        )
        .unwrap();
        write_atomic(
            &paths.tab_path(StageKind::AppDocs, "7", DetailTab::AppDocs),
            b"y",
        )
        .unwrap();

        let rows = export_manifest(&paths, StageKind::AppDocs).unwrap();
        assert_eq!(rows, 2);

        let manifest = std::fs::read_to_string(paths.manifest_path(StageKind::AppDocs)).unwrap();
        let mut lines = manifest.lines();
        assert_eq!(lines.next(), Some("app_id,tab,path"));
        assert!(manifest.contains("7,app_docs,"));
        assert!(manifest.contains("7,app_main,"));
    }

    #[test]
    fn test_manifest_empty_stage() {
        let root = TempDir::new().unwrap();
        let paths = ProjectPaths::new(root.path(), "71200000").unwrap();

        let rows = export_manifest(&paths, StageKind::AgencyDocs).unwrap();
        assert_eq!(rows, 0);
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
