//! CSV loading for the category taxonomy.

use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use super::{CategoryRow, Taxonomy, TaxonomyError};

/// Untyped row as it appears in the CSV; ids are validated before typing.
#[derive(Debug, Deserialize)]
struct RawCategoryRow {
    id: String,
    name: String,
    parent_id: String,
    level: String,
}

impl RawCategoryRow {
    /// Rows with non-numeric fields (header remnants, annotations) are
    /// discarded here rather than failing the whole load.
    fn into_typed(self) -> Option<CategoryRow> {
        let id = self.id.trim().parse::<u32>().ok()?;
        let parent_id = self.parent_id.trim().parse::<u32>().ok()?;
        let level = self.level.trim().parse::<u8>().ok()?;
        Some(CategoryRow {
            id,
            name: self.name.trim().to_string(),
            parent_id,
            level,
        })
    }
}

/// Load the taxonomy from a CSV file with columns `id,name,parent_id,level`.
/// Bad rows are skipped with a warning; an unreadable file or an empty tree
/// is fatal, since no partial taxonomy is usable.
pub fn load_taxonomy(
    path: &Path,
    level3_parents: impl IntoIterator<Item = String>,
) -> Result<Taxonomy, TaxonomyError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.deserialize::<RawCategoryRow>() {
        let raw = match record {
            Ok(raw) => raw,
            Err(err) => {
                warn!(%err, "malformed taxonomy row, skipped");
                continue;
            }
        };
        match raw.into_typed() {
            Some(row) => rows.push(row),
            None => warn!("non-numeric taxonomy row, skipped"),
        }
    }

    info!(row_count = rows.len(), path = %path.display(), "taxonomy rows loaded");
    Taxonomy::from_rows(rows, level3_parents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("convolens-taxonomy-{}.csv", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_skips_non_numeric_rows() {
        let path = write_csv(
            "id,name,parent_id,level\n\
             1,费用异议咨询,0,1\n\
             备注,这是注释行,无,无\n\
             10,飞享会员,1,2\n",
        );
        let taxonomy = load_taxonomy(&path, ["飞享会员".to_string()]).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(taxonomy.level1_names(), vec!["费用异议咨询"]);
        assert_eq!(taxonomy.level2_children("费用异议咨询"), vec!["飞享会员"]);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let missing = Path::new("/nonexistent/categories.csv");
        assert!(load_taxonomy(missing, []).is_err());
    }
}
