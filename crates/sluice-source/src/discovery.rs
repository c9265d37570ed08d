use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use serde::Deserialize;

use crate::error::{SourceError, SourceResult};
use crate::spec::{QuerySpec, SourceSpec};

/// The connection file names that mark a directory as a source, in lookup order.
pub const CONNECTION_FILE_NAMES: [&str; 2] = ["connection.yaml", "connection.yml"];

pub const QUERY_EXTENSION: &str = "sql";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConnectionFile {
    name: Option<String>,
    #[serde(rename = "type")]
    source_type: String,
    #[serde(default)]
    options: serde_json::Value,
}

/// Finds all sources in `sources_dir`.
///
/// Each subdirectory with a connection file is a source, and every `.sql` file
/// below it (at any depth) is one of its queries. Sources are sorted by name
/// and queries by path.
pub fn discover_sources(sources_dir: &Path) -> SourceResult<Vec<SourceSpec>> {
    let mut sources = vec![];
    for entry in fs::read_dir(sources_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(source) = load_source(&entry.path())? {
            sources.push(source);
        }
    }
    sources.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(sources)
}

/// Loads the source in `directory`, or returns `None` if there is no connection file.
pub fn load_source(directory: &Path) -> SourceResult<Option<SourceSpec>> {
    let Some(connection_path) = CONNECTION_FILE_NAMES
        .iter()
        .map(|x| directory.join(x))
        .find(|x| x.is_file())
    else {
        return Ok(None);
    };
    let connection: ConnectionFile = serde_yaml::from_str(&fs::read_to_string(&connection_path)?)
        .map_err(|e| {
            SourceError::invalid(format!("{}: {e}", connection_path.display()))
        })?;
    let name = match connection.name {
        Some(name) => name,
        None => directory
            .file_name()
            .map(|x| x.to_string_lossy().into_owned())
            .ok_or_else(|| {
                SourceError::invalid(format!("cannot name source at {}", directory.display()))
            })?,
    };
    let queries = find_query_files(directory)?
        .into_iter()
        .map(load_query)
        .collect::<SourceResult<Vec<_>>>()?;
    Ok(Some(SourceSpec {
        source_type: connection.source_type,
        name,
        options: connection.options,
        source_directory: directory.to_path_buf(),
        queries,
    }))
}

fn find_query_files(directory: &Path) -> SourceResult<Vec<PathBuf>> {
    let root = directory
        .to_str()
        .ok_or_else(|| SourceError::invalid(format!("non-UTF-8 path: {}", directory.display())))?;
    let pattern = format!("{}/**/*.{QUERY_EXTENSION}", Pattern::escape(root));
    let mut files = glob::glob(&pattern)
        .map_err(|e| SourceError::internal(e.to_string()))?
        .map(|x| x.map_err(|e| SourceError::Io(std::io::Error::from(e))))
        .collect::<SourceResult<Vec<_>>>()?;
    files.retain(|x| x.is_file());
    files.sort();
    Ok(files)
}

fn load_query(filepath: PathBuf) -> SourceResult<QuerySpec> {
    let name = filepath
        .file_stem()
        .map(|x| x.to_string_lossy().into_owned())
        .ok_or_else(|| SourceError::invalid(format!("invalid query file: {}", filepath.display())))?;
    let content = fs::read_to_string(&filepath)?;
    Ok(QuerySpec {
        filepath,
        content,
        name,
    })
}
