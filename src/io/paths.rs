use crate::error::{Result, TaskError};
use directories::ProjectDirs;
use std::{
    fs,
    path::{Path, PathBuf},
};

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("ai", "stem-splitter", "stem-splitter-remote")
        .ok_or_else(|| anyhow::anyhow!("Could not determine project directories").into())
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().to_path_buf())
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn ensure_output_dir(dir: &Path) -> Result<()> {
    if dir.exists() && !dir.is_dir() {
        return Err(TaskError::Validation(format!(
            "output path {} exists and is not a directory",
            dir.display()
        )));
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Fallback name for a downloaded track when the server sends no file name:
/// `<input stem>_<label>.<ext>`, the extension taken from the URL path, then
/// from the input file.
pub fn track_file_name(input: Option<&Path>, label: &str, url: &str, index: usize) -> String {
    let base = input
        .and_then(|p| p.file_stem())
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let label = if label.trim().is_empty() {
        format!("track{}", index + 1)
    } else {
        label.trim().replace(['/', '\\'], "_")
    };

    let ext = extension_from_url(url).or_else(|| {
        input
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .map(str::to_string)
    });

    match ext {
        Some(ext) => format!("{base}_{label}.{ext}"),
        None => format!("{base}_{label}"),
    }
}

/// `name` for `n == 0`, otherwise `n` is appended to the file stem:
/// `song_vocals.mp3` -> `song_vocals_2.mp3`.
pub fn numbered_file_name(name: &str, n: u32) -> String {
    if n == 0 {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{n}.{ext}"),
        _ => format!("{name}_{n}"),
    }
}

fn extension_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last = path.rsplit('/').next()?;
    let (stem, ext) = last.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 5 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_uses_url_extension_first() {
        let name = track_file_name(
            Some(Path::new("/music/song.wav")),
            "vocals",
            "https://cdn.example/t/abc.mp3?sig=1",
            0,
        );
        assert_eq!(name, "song_vocals.mp3");
    }

    #[test]
    fn name_falls_back_to_input_extension_and_index() {
        let name = track_file_name(Some(Path::new("take.flac")), "", "https://cdn.example/t/abc", 1);
        assert_eq!(name, "take_track2.flac");
    }

    #[test]
    fn name_without_input_uses_output_base() {
        let name = track_file_name(None, "converted_mix", "https://x/y", 0);
        assert_eq!(name, "output_converted_mix");
    }

    #[test]
    fn ensure_output_dir_rejects_files() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            ensure_output_dir(tmp.path()),
            Err(TaskError::Validation(_))
        ));
    }

    #[test]
    fn numbered_names_keep_the_extension() {
        assert_eq!(numbered_file_name("song_vocals.mp3", 0), "song_vocals.mp3");
        assert_eq!(numbered_file_name("song_vocals.mp3", 2), "song_vocals_2.mp3");
        assert_eq!(numbered_file_name("output_track1", 1), "output_track1_1");
        assert_eq!(numbered_file_name(".hidden", 1), ".hidden_1");
    }
}
