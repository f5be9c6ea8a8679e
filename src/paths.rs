//! Home-directory lookup and `~`-expansion. `$VAR` expansion is the
//! tokenizer's job only; these helpers never touch `$`.

use std::ffi::CStr;
use std::path::PathBuf;

/// `$HOME`, falling back to the passwd entry's home directory, falling
/// back to `/`.
pub fn home_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        if !home.is_empty() {
            return PathBuf::from(home);
        }
    }

    #[cfg(unix)]
    if let Some(dir) = passwd_home_dir() {
        return dir;
    }

    PathBuf::from("/")
}

#[cfg(unix)]
fn passwd_home_dir() -> Option<PathBuf> {
    let uid = unsafe { libc::getuid() };
    let mut buf = vec![0_i8; 1024];
    let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
    let mut result: *mut libc::passwd = std::ptr::null_mut();

    let rc = unsafe {
        libc::getpwuid_r(
            uid,
            &mut pwd,
            buf.as_mut_ptr(),
            buf.len(),
            &mut result,
        )
    };

    if rc != 0 || result.is_null() {
        return None;
    }

    let dir = unsafe { CStr::from_ptr(pwd.pw_dir) };
    Some(PathBuf::from(dir.to_string_lossy().into_owned()))
}

/// Expand a leading `~` to [`home_dir`]. Only the first character is
/// checked — `a~b` and `~user/x` are left untouched (no per-user lookup).
pub fn expand_tilde(path: &str) -> String {
    if path == "~" {
        return home_dir().display().to_string();
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return home_dir().join(rest).display().to_string();
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_non_tilde_paths_unchanged() {
        assert_eq!(expand_tilde("/tmp/x"), "/tmp/x");
        assert_eq!(expand_tilde("relative/path"), "relative/path");
    }

    #[test]
    fn expands_bare_tilde() {
        unsafe { std::env::set_var("HOME", "/home/tester") };
        assert_eq!(expand_tilde("~"), "/home/tester");
    }

    #[test]
    fn expands_tilde_slash_prefix() {
        unsafe { std::env::set_var("HOME", "/home/tester") };
        assert_eq!(expand_tilde("~/docs"), "/home/tester/docs");
    }

    #[test]
    fn does_not_expand_mid_string_or_user_tilde() {
        unsafe { std::env::set_var("HOME", "/home/tester") };
        assert_eq!(expand_tilde("~other/x"), "~other/x");
        assert_eq!(expand_tilde("a~b"), "a~b");
    }
}
