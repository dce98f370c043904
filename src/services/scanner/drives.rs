use crate::error::AppError;
use std::path::PathBuf;

/// Root of every logical drive, for scanning whole volumes.
#[cfg(windows)]
pub fn list_drives() -> Result<Vec<PathBuf>, AppError> {
    use windows::Win32::Storage::FileSystem::GetLogicalDriveStringsW;

    let mut buffer = [0u16; 256];
    let len = unsafe { GetLogicalDriveStringsW(Some(&mut buffer)) } as usize;

    if len == 0 || len > buffer.len() {
        return Err("Failed to list drives".into());
    }

    Ok(parse_drive_strings(&buffer[..len])
        .into_iter()
        .map(PathBuf::from)
        .filter(|drive| drive.exists())
        .collect())
}

#[cfg(not(windows))]
pub fn list_drives() -> Result<Vec<PathBuf>, AppError> {
    Ok(vec![PathBuf::from("/")])
}

/// Splits a NUL-separated drive list such as `C:\` `\0` `D:\` `\0\0`.
#[cfg_attr(not(windows), allow(dead_code))]
fn parse_drive_strings(buffer: &[u16]) -> Vec<String> {
    buffer
        .split(|&c| c == 0)
        .filter(|drive| !drive.is_empty())
        .map(String::from_utf16_lossy)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    #[test]
    fn splits_nul_separated_drive_list() {
        let buffer = utf16("C:\\\0D:\\\0\0");
        assert_eq!(parse_drive_strings(&buffer), vec!["C:\\", "D:\\"]);
        assert!(parse_drive_strings(&[0, 0]).is_empty());
    }

    #[test]
    fn drives_are_existing_directories() {
        let drives = list_drives().unwrap();
        assert!(!drives.is_empty());
        assert!(drives.iter().all(|d| d.is_dir()));
    }
}
