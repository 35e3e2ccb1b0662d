//! CSV mapping loaders.
//!
//! The three loaders share one skeleton (header verification, row
//! iteration, side filtering) and differ only in their expected header row
//! and the transform applied to each data row. A row the transform rejects
//! is warned about and dropped; the load as a whole only fails on a missing
//! or wrong header row or malformed tabular data.

use std::fs::File;
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::csv::{ChunkSource, CsvError, CsvReader, DataType};
use crate::core::sanitize;
use crate::core::store::MappingWithDoc;
use crate::infra::io::ChunkedReader;

/// Buffer capacity for reading mapping files.
const CSV_CHUNK_SIZE: usize = 2048;

/// Which distribution a mapping row belongs to, matched against the numeric
/// `side` column: 0 = client, 1 = server, 2 = both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Client,
    Server,
    Joined,
}

impl ProjectType {
    pub fn applies(self, side: u32) -> bool {
        match self {
            ProjectType::Client => side == 0 || side == 2,
            ProjectType::Server => side == 1 || side == 2,
            ProjectType::Joined => side <= 2,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MappingLoadError {
    #[error("could not open mapping file '{path}'")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("header mismatch: expected '{expected}', found '{found}'")]
    Header { expected: String, found: String },

    #[error("malformed mapping data")]
    Csv(#[from] CsvError),
}

/// Why a single row was dropped.
#[derive(Debug, thiserror::Error)]
enum RowError {
    #[error("row has {found} values, expected {expected}")]
    Arity { found: usize, expected: usize },

    #[error("side '{0}' is not a number")]
    Side(String),

    #[error("mapping '{0}' is not a valid identifier")]
    Identifier(String),
}

type RowTransform<T> = fn(&[String], ProjectType) -> Result<Option<(String, T)>, RowError>;

/// Shared loader skeleton. The concrete loaders below are the only
/// instances.
pub struct CsvMappingLoader<T> {
    expected_headers: &'static [&'static str],
    transform: RowTransform<T>,
}

pub static FIELD: CsvMappingLoader<MappingWithDoc> = CsvMappingLoader {
    expected_headers: &["searge", "name", "side", "desc"],
    transform: transform_member_row,
};

pub static METHOD: CsvMappingLoader<MappingWithDoc> = CsvMappingLoader {
    expected_headers: &["searge", "name", "side", "desc"],
    transform: transform_member_row,
};

pub static PARAM: CsvMappingLoader<String> = CsvMappingLoader {
    expected_headers: &["param", "name", "side"],
    transform: transform_param_row,
};

impl<T> CsvMappingLoader<T> {
    /// Loads the mapping file, passing every accepted `(key, value)` pair to
    /// `mapping_consumer`.
    pub fn load_mapping(
        &self,
        mapping_path: &Path,
        project_type: ProjectType,
        mapping_consumer: impl FnMut(String, T),
    ) -> Result<(), MappingLoadError> {
        let file = File::open(mapping_path).map_err(|source| MappingLoadError::Open {
            path: mapping_path.display().to_string(),
            source,
        })?;
        let mut reader = CsvReader::new(ChunkedReader::new(file, CSV_CHUNK_SIZE));

        self.verify_headers(&mut reader)?;

        if reader.has_more()? {
            // The row loop expects to start at the beginning of a row
            reader.next_row()?;
            self.read_rows(&mut reader, project_type, mapping_consumer)?;
        }

        Ok(())
    }

    fn verify_headers<S: ChunkSource>(
        &self,
        reader: &mut CsvReader<S>,
    ) -> Result<(), MappingLoadError> {
        for expected in self.expected_headers {
            let mut actual = String::new();
            reader.read_value(&mut actual)?;

            if actual != *expected {
                return Err(MappingLoadError::Header {
                    expected: (*expected).to_string(),
                    found: actual,
                });
            }
        }
        Ok(())
    }

    /// Reads data rows, applying the transform and side filter. The reader
    /// has to be at the beginning of a row (column index 0).
    fn read_rows<S: ChunkSource>(
        &self,
        reader: &mut CsvReader<S>,
        project_type: ProjectType,
        mut mapping_consumer: impl FnMut(String, T),
    ) -> Result<(), CsvError> {
        let mut row_values: Vec<String> = Vec::new();

        // Empty file body
        if reader.is_trailing_empty_row()? {
            return Ok(());
        }

        loop {
            let data_type = reader.peek_or_consume_next(true)?;

            if data_type.is_row_finished() {
                match (self.transform)(&row_values, project_type) {
                    Ok(Some((key, value))) => mapping_consumer(key, value),
                    Ok(None) => {} // filtered out by project type
                    Err(row_error) => {
                        warn!(values = ?row_values, %row_error, "dropping mapping row");
                    }
                }
                row_values.clear();
            }

            match data_type {
                DataType::Value => {
                    let mut value = String::new();
                    reader.read_value(&mut value)?;
                    row_values.push(value);
                }
                DataType::End => break,
                DataType::Row => {}
            }
        }

        Ok(())
    }
}

fn transform_member_row(
    values: &[String],
    project_type: ProjectType,
) -> Result<Option<(String, MappingWithDoc)>, RowError> {
    let (searge, name, side, desc) = match (
        values.first(),
        values.get(1),
        values.get(2),
        values.get(3),
    ) {
        (Some(searge), Some(name), Some(side), Some(desc)) => (searge, name, side, desc),
        _ => {
            return Err(RowError::Arity {
                found: values.len(),
                expected: 4,
            });
        }
    };

    if !project_type.applies(parse_side(side)?) {
        return Ok(None);
    }

    let documentation = if desc.is_empty() {
        None
    } else {
        // The literal two-character sequence \n means a newline; the result
        // lands inside a block comment, so defang it right away.
        Some(sanitize::escape_comment_content(&desc.replace("\\n", "\n")))
    };

    Ok(Some((
        searge.clone(),
        MappingWithDoc::new(verified_mapping(name)?, documentation),
    )))
}

fn transform_param_row(
    values: &[String],
    project_type: ProjectType,
) -> Result<Option<(String, String)>, RowError> {
    let (param, name, side) = match (values.first(), values.get(1), values.get(2)) {
        (Some(param), Some(name), Some(side)) => (param, name, side),
        _ => {
            return Err(RowError::Arity {
                found: values.len(),
                expected: 3,
            });
        }
    };

    if !project_type.applies(parse_side(side)?) {
        return Ok(None);
    }

    Ok(Some((param.clone(), verified_mapping(name)?)))
}

fn parse_side(side: &str) -> Result<u32, RowError> {
    side.parse().map_err(|_| RowError::Side(side.to_string()))
}

fn verified_mapping(mapping: &str) -> Result<String, RowError> {
    if sanitize::is_valid_identifier(mapping, true) {
        Ok(mapping.to_string())
    } else {
        Err(RowError::Identifier(mapping.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("tempfile");
        file.write_all(content.as_bytes()).expect("write csv");
        file
    }

    fn load_fields(content: &str, project_type: ProjectType) -> HashMap<String, MappingWithDoc> {
        let file = csv_file(content);
        let mut map = HashMap::new();
        FIELD
            .load_mapping(file.path(), project_type, |key, value| {
                map.insert(key, value);
            })
            .expect("load");
        map
    }

    #[test]
    fn test_loads_plain_rows() {
        let map = load_fields(
            "searge,name,side,desc\r\nfield_1_a,maxHealth,0,Maximum health.\r\nfield_2_b,armor,0,\r\n",
            ProjectType::Client,
        );

        assert_eq!(map.len(), 2);
        assert_eq!(map["field_1_a"].mapping(), "maxHealth");
        assert_eq!(map["field_1_a"].documentation(), Some("Maximum health."));
        // Empty desc means no documentation
        assert_eq!(map["field_2_b"].documentation(), None);
    }

    #[test]
    fn test_headers_only_is_an_empty_mapping() {
        let map = load_fields("searge,name,side,desc\r\n", ProjectType::Joined);
        assert!(map.is_empty());

        // Also without the trailing line break
        let map = load_fields("searge,name,side,desc", ProjectType::Joined);
        assert!(map.is_empty());
    }

    #[test]
    fn test_header_mismatch_fails() {
        let file = csv_file("searge,name,desc\r\n");
        let error = FIELD
            .load_mapping(file.path(), ProjectType::Client, |_, _| {})
            .unwrap_err();
        assert!(matches!(error, MappingLoadError::Header { .. }));
    }

    #[test]
    fn test_missing_file_fails() {
        let error = FIELD
            .load_mapping(Path::new("/nonexistent/fields.csv"), ProjectType::Client, |_, _| {})
            .unwrap_err();
        assert!(matches!(error, MappingLoadError::Open { .. }));
    }

    #[test]
    fn test_malformed_csv_fails() {
        let file = csv_file("searge,name,side,desc\r\na,\"b\"x,0,\r\n");
        let error = FIELD
            .load_mapping(file.path(), ProjectType::Client, |_, _| {})
            .unwrap_err();
        assert!(matches!(error, MappingLoadError::Csv(_)));
    }

    #[test]
    fn test_side_filter() {
        let content =
            "searge,name,side,desc\r\nfield_1_a,clientOnly,0,\r\nfield_2_b,serverOnly,1,\r\nfield_3_c,both,2,\r\n";

        let client = load_fields(content, ProjectType::Client);
        assert_eq!(client.len(), 2);
        assert!(client.contains_key("field_1_a"));
        assert!(client.contains_key("field_3_c"));

        let server = load_fields(content, ProjectType::Server);
        assert_eq!(server.len(), 2);
        assert!(server.contains_key("field_2_b"));
        assert!(server.contains_key("field_3_c"));

        let joined = load_fields(content, ProjectType::Joined);
        assert_eq!(joined.len(), 3);
    }

    #[test]
    fn test_invalid_rows_are_dropped_not_fatal() {
        let map = load_fields(
            "searge,name,side,desc\r\nfield_1_a,not an identifier,0,\r\nfield_2_b,new,0,\r\nfield_3_c,fine,zero,\r\nfield_4_d,kept,0,\r\nshort,row,0\r\n",
            ProjectType::Client,
        );

        // Invalid identifier, reserved word, unparsable side and short row
        // are all dropped; the good row survives
        assert_eq!(map.len(), 1);
        assert_eq!(map["field_4_d"].mapping(), "kept");
    }

    #[test]
    fn test_duplicate_key_last_row_wins() {
        let map = load_fields(
            "searge,name,side,desc\r\nfield_1_a,first,0,\r\nfield_1_a,second,0,\r\n",
            ProjectType::Client,
        );
        assert_eq!(map["field_1_a"].mapping(), "second");
    }

    #[test]
    fn test_doc_newline_and_comment_end_transform() {
        let map = load_fields(
            "searge,name,side,desc\r\nfield_1_a,foo,0,line one\\nline two\r\nfield_2_b,bar,0,a*/b\r\n",
            ProjectType::Client,
        );

        assert_eq!(
            map["field_1_a"].documentation(),
            Some("line one\nline two")
        );
        assert_eq!(map["field_2_b"].documentation(), Some("a*&#x2f;b"));
    }

    #[test]
    fn test_quoted_doc_with_comma_and_quote() {
        let map = load_fields(
            "searge,name,side,desc\r\nfield_1_a,foo,0,\"has, comma and \"\"quote\"\"\"\r\n",
            ProjectType::Client,
        );
        assert_eq!(
            map["field_1_a"].documentation(),
            Some("has, comma and \"quote\"")
        );
    }

    #[test]
    fn test_unicode_escaped_name_is_accepted() {
        let map = load_fields(
            "searge,name,side,desc\r\nfield_1_a,\\u006eame,0,\r\n",
            ProjectType::Client,
        );
        // The escaped form is stored verbatim; only validation decodes it
        assert_eq!(map["field_1_a"].mapping(), "\\u006eame");
    }

    #[test]
    fn test_param_loader() {
        let file = csv_file("param,name,side\r\np_a_1_,entityIn,2\r\np_b_2_,bad name,2\r\n");
        let mut map = HashMap::new();
        PARAM
            .load_mapping(file.path(), ProjectType::Joined, |key, value| {
                map.insert(key, value);
            })
            .expect("load");

        assert_eq!(map.len(), 1);
        assert_eq!(map["p_a_1_"], "entityIn");
    }

    #[test]
    fn test_project_type_predicate() {
        assert!(ProjectType::Client.applies(0));
        assert!(!ProjectType::Client.applies(1));
        assert!(ProjectType::Client.applies(2));

        assert!(!ProjectType::Server.applies(0));
        assert!(ProjectType::Server.applies(1));
        assert!(ProjectType::Server.applies(2));

        assert!(ProjectType::Joined.applies(0));
        assert!(ProjectType::Joined.applies(1));
        assert!(ProjectType::Joined.applies(2));
        assert!(!ProjectType::Joined.applies(3));
    }
}
