use std::ffi::OsStr;
use std::fs::File;
use std::io::BufReader;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Error;

pub fn load_json<T, P>(path: P) -> Result<T, Error>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Saves data as JSON.
///
/// The data is written to `<path>.new` first and then renamed to `<path>`, so
/// that a reader never sees a partially written file.
pub fn save_json<D, P>(data: &D, path: P) -> Result<(), Error>
where
    D: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    // Serialize in advance so that a serialization error leaves no file.
    let buf = serde_json::to_vec(data)?;

    let new_path = append_extension(path, "new");
    {
        let mut file = File::create(&new_path)?;
        file.write_all(&buf)?;
        file.sync_all()?;
    }
    std::fs::rename(&new_path, path)?;
    tracing::debug!(?path, nwritten = buf.len(), "Saved");
    Ok(())
}

fn append_extension<P, S>(path: P, ext: S) -> PathBuf
where
    P: AsRef<Path>,
    S: AsRef<OsStr>,
{
    let path = path.as_ref();
    match path.extension() {
        Some(last_ext) => {
            let mut last_ext = last_ext.to_os_string();
            last_ext.push(".");
            last_ext.push(ext);
            path.with_extension(last_ext)
        }
        None => path.with_extension(ext),
    }
}

// </coverage:exclude>
