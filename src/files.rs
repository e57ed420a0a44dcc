use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use time::OffsetDateTime;

use crate::error::ShapeError;

/// Replaces the contents of `path` with `text`, creating parent directories.
/// A symlink is followed so the link survives and its target is rewritten;
/// an existing file keeps its permissions.
pub fn write_result(path: &Path, text: &str) -> Result<()> {
    let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    write_via_temp(&target, text.as_bytes())?;
    log::debug!("wrote {} bytes to {}", text.len(), target.display());
    Ok(())
}

fn write_via_temp(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = parent {
        fs::create_dir_all(dir)
            .map_err(|err| ShapeError::io(format!("creating directory {}", dir.display()), err))?;
    }
    let base_dir = parent.unwrap_or_else(|| Path::new("."));
    let temp_path = base_dir.join(format!(
        ".textshaper-tmp-{}-{}",
        std::process::id(),
        OffsetDateTime::now_utc().unix_timestamp_nanos()
    ));
    {
        let mut file = fs::File::create(&temp_path).map_err(|err| {
            ShapeError::io(format!("creating temp file {}", temp_path.display()), err)
        })?;
        file.write_all(data).map_err(|err| {
            ShapeError::io(format!("writing temp file {}", temp_path.display()), err)
        })?;
        file.sync_all().map_err(|err| {
            ShapeError::io(format!("syncing temp file {}", temp_path.display()), err)
        })?;
    }
    let copied = match fs::metadata(path) {
        Ok(existing) => fs::set_permissions(&temp_path, existing.permissions()),
        Err(_) => Ok(()),
    };
    if let Err(err) = copied {
        let _ = fs::remove_file(&temp_path);
        return Err(ShapeError::io(format!("copying permissions to {}", path.display()), err).into());
    }
    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(ShapeError::io(format!("error writing to file {}", path.display()), err).into());
    }
    Ok(())
}
