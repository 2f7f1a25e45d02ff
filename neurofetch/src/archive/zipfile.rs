//! ZIP archive support.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;

use tracing::{debug, warn};
use zip::ZipArchive;

use super::{ArchiveExtractor, ArchiveValidation};
use crate::error::{FetchError, FetchResult};

/// ZIP extractor with whole-archive CRC validation.
#[derive(Debug, Default)]
pub struct ZipExtractor;

impl ZipExtractor {
    pub fn new() -> Self {
        Self
    }

    fn open(&self, archive_path: &Path) -> FetchResult<Result<ZipArchive<BufReader<File>>, String>> {
        let file = File::open(archive_path).map_err(|e| FetchError::ReadFailed {
            path: archive_path.to_path_buf(),
            source: e,
        })?;

        Ok(ZipArchive::new(BufReader::new(file)).map_err(|e| e.to_string()))
    }

    fn extract_all(
        &self,
        archive: &mut ZipArchive<BufReader<File>>,
        archive_path: &Path,
        dest_dir: &Path,
    ) -> FetchResult<usize> {
        fs::create_dir_all(dest_dir).map_err(|e| FetchError::CreateDirFailed {
            path: dest_dir.to_path_buf(),
            source: e,
        })?;

        let mut files = 0;
        for index in 0..archive.len() {
            let mut member = archive
                .by_index(index)
                .map_err(|e| FetchError::ExtractionFailed {
                    path: archive_path.to_path_buf(),
                    reason: e.to_string(),
                })?;

            let Some(relative) = member.enclosed_name() else {
                return Err(FetchError::ExtractionFailed {
                    path: archive_path.to_path_buf(),
                    reason: format!("unsafe member path '{}'", member.name()),
                });
            };
            let out_path = dest_dir.join(relative);

            if member.is_dir() {
                fs::create_dir_all(&out_path).map_err(|e| FetchError::CreateDirFailed {
                    path: out_path.clone(),
                    source: e,
                })?;
                continue;
            }

            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent).map_err(|e| FetchError::CreateDirFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }

            let mut out = File::create(&out_path).map_err(|e| FetchError::WriteFailed {
                path: out_path.clone(),
                source: e,
            })?;
            io::copy(&mut member, &mut out).map_err(|e| FetchError::WriteFailed {
                path: out_path.clone(),
                source: e,
            })?;

            files += 1;
        }

        Ok(files)
    }
}

impl ArchiveExtractor for ZipExtractor {
    fn validate(&self, archive_path: &Path) -> FetchResult<ArchiveValidation> {
        let mut archive = match self.open(archive_path)? {
            Ok(archive) => archive,
            Err(reason) => {
                let name = archive_path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                warn!(archive = %archive_path.display(), %reason, "Archive is unreadable");
                return Ok(ArchiveValidation::Corrupt(name));
            }
        };

        let mut files = 0;
        for index in 0..archive.len() {
            let name = archive
                .name_for_index(index)
                .map(str::to_string)
                .unwrap_or_else(|| format!("entry #{}", index));

            let mut member = match archive.by_index(index) {
                Ok(member) => member,
                Err(e) => {
                    warn!(member = %name, error = %e, "Archive member is unreadable");
                    return Ok(ArchiveValidation::Corrupt(name));
                }
            };

            if member.enclosed_name().is_none() {
                warn!(member = %name, "Archive member escapes the destination");
                return Ok(ArchiveValidation::Corrupt(name));
            }
            if member.is_dir() {
                continue;
            }

            // The CRC is checked when the member reader reaches its end.
            if let Err(e) = io::copy(&mut member, &mut io::sink()) {
                warn!(member = %name, error = %e, "Archive member failed integrity check");
                return Ok(ArchiveValidation::Corrupt(name));
            }
            files += 1;
        }

        debug!(archive = %archive_path.display(), files, "Archive validated");
        Ok(ArchiveValidation::Valid { files })
    }

    fn validate_and_extract(
        &self,
        archive_path: &Path,
        dest_dir: &Path,
    ) -> FetchResult<ArchiveValidation> {
        let validation = self.validate(archive_path)?;
        if !validation.is_valid() {
            return Ok(validation);
        }

        let mut archive = self.open(archive_path)?.map_err(|reason| {
            FetchError::ExtractionFailed {
                path: archive_path.to_path_buf(),
                reason,
            }
        })?;
        let files = self.extract_all(&mut archive, archive_path, dest_dir)?;

        debug!(
            archive = %archive_path.display(),
            dest = %dest_dir.display(),
            files,
            "Archive extracted"
        );
        Ok(ArchiveValidation::Valid { files })
    }

    fn list_contents(&self, archive_path: &Path) -> FetchResult<Vec<String>> {
        let archive = self.open(archive_path)?.map_err(|reason| {
            FetchError::ExtractionFailed {
                path: archive_path.to_path_buf(),
                reason,
            }
        })?;

        Ok((0..archive.len())
            .filter_map(|i| archive.name_for_index(i).map(str::to_string))
            .collect())
    }
}
