use std::path::{Component, Path, PathBuf};

use url::Url;

use crate::error::{SourceError, SourceResult};

pub const SCHEMA_SUFFIX: &str = "schema.json";

/// Where the outputs of one query are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLocation {
    pub directory: PathBuf,
    pub data_file: PathBuf,
    pub schema_file: PathBuf,
    /// The data file relative to the output root, as a `file:///` URL pathname.
    pub url_path: String,
}

impl OutputLocation {
    pub fn new(
        output_root: &Path,
        subdirectory: &Path,
        name: &str,
        extension: &str,
    ) -> SourceResult<Self> {
        let data_name = format!("{name}.{extension}");
        let directory = output_root.join(subdirectory);
        let url_path = url_path(subdirectory, &data_name)?;
        Ok(Self {
            data_file: directory.join(&data_name),
            schema_file: directory.join(format!("{name}.{SCHEMA_SUFFIX}")),
            directory,
            url_path,
        })
    }
}

/// Returns the directory of the query file relative to the parent of the source directory,
/// so that the output tree keeps the source directory name and any nesting below it.
///
/// The relative path is computed component-wise, so a sources root that recurs
/// as a substring deeper in the query path has no effect.
/// Only normal components may remain, so the output never leaves the output root.
pub fn output_subdirectory(source_directory: &Path, query_filepath: &Path) -> SourceResult<PathBuf> {
    let sources_root = source_directory.parent().unwrap_or(Path::new(""));
    let query_directory = query_filepath.parent().unwrap_or(Path::new(""));
    let relative = query_directory.strip_prefix(sources_root).map_err(|_| {
        SourceError::invalid(format!(
            "query {} is not located under the sources root {}",
            query_filepath.display(),
            sources_root.display()
        ))
    })?;
    relative
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| match c {
            Component::Normal(_) => Ok(c),
            _ => Err(SourceError::invalid(format!(
                "query {} escapes the sources root {}",
                query_filepath.display(),
                sources_root.display()
            ))),
        })
        .collect()
}

fn url_path(subdirectory: &Path, file_name: &str) -> SourceResult<String> {
    let mut url = Url::parse("file:///")
        .map_err(|e| SourceError::internal(format!("invalid base URL: {e}")))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|()| SourceError::internal("file URL cannot be a base"))?;
        segments.pop_if_empty();
        for component in subdirectory.components() {
            if let Component::Normal(x) = component {
                segments.push(&x.to_string_lossy());
            }
        }
        segments.push(file_name);
    }
    Ok(url.path().to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_output_subdirectory_keeps_source_name() {
        let subdirectory = output_subdirectory(
            Path::new("/project/sources/orders"),
            Path::new("/project/sources/orders/daily/q.sql"),
        )
        .unwrap();
        assert_eq!(subdirectory, PathBuf::from("orders/daily"));
    }

    #[test]
    fn test_output_subdirectory_with_recurring_root() {
        // The sources root `/data` appears again as `/data` further down the path.
        let subdirectory = output_subdirectory(
            Path::new("/data/warehouse"),
            Path::new("/data/warehouse/data/q.sql"),
        )
        .unwrap();
        assert_eq!(subdirectory, PathBuf::from("warehouse/data"));
    }

    #[test]
    fn test_output_subdirectory_sibling_prefix() {
        let error = output_subdirectory(
            Path::new("/root/sources/orders"),
            Path::new("/root/sources2/orders/q.sql"),
        )
        .unwrap_err();
        assert!(matches!(error, SourceError::InvalidArgument(_)));
    }

    #[test]
    fn test_output_subdirectory_rejects_parent_components() {
        let error = output_subdirectory(
            Path::new("/p/sources"),
            Path::new("/p/sources/a/../../../escape/q.sql"),
        )
        .unwrap_err();
        assert!(matches!(error, SourceError::InvalidArgument(_)));

        let error =
            output_subdirectory(Path::new("/p/sources"), Path::new("/p/sources/../q.sql"))
                .unwrap_err();
        assert!(matches!(error, SourceError::InvalidArgument(_)));
    }

    #[test]
    fn test_output_subdirectory_relative_paths() {
        let subdirectory =
            output_subdirectory(Path::new("sources/orders"), Path::new("sources/orders/q.sql"))
                .unwrap();
        assert_eq!(subdirectory, PathBuf::from("orders"));
    }

    #[test]
    fn test_output_location() {
        let location = OutputLocation::new(
            Path::new("/out"),
            Path::new("sources/sub"),
            "out",
            "parquet",
        )
        .unwrap();
        assert_eq!(location.directory, PathBuf::from("/out/sources/sub"));
        assert_eq!(location.data_file, PathBuf::from("/out/sources/sub/out.parquet"));
        assert_eq!(
            location.schema_file,
            PathBuf::from("/out/sources/sub/out.schema.json")
        );
        assert_eq!(location.url_path, "/sources/sub/out.parquet");
    }

    #[test]
    fn test_url_path_is_percent_encoded() {
        let location =
            OutputLocation::new(Path::new("/out"), Path::new("my source"), "daily #1", "parquet")
                .unwrap();
        assert_eq!(location.url_path, "/my%20source/daily%20%231.parquet");
    }
}
