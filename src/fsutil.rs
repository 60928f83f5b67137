use std::path::Path;

use tokio::fs;

use crate::error::Result;

/// Write the full file via a temp sibling and rename it into place, so a
/// crash mid-write never leaves a half-written record behind. This is not a
/// lock: concurrent writers still race and the last rename wins.
pub(crate) async fn write_text_atomic(path: &Path, text: &str) -> Result<()> {
    let tmp = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    fs::write(&tmp, text).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

/// Read a file, mapping "does not exist" to `None`.
pub(crate) async fn read_to_string_opt(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(raw) => Ok(Some(raw)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}
