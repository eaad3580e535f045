use std::ffi::CStr;

use ffmpeg_sys_next::av_strerror;
use libc::c_int;

const ERRBUF_SIZE: usize = 256;

/// Translate an FFmpeg error code into its message text.
pub fn av_err2str(code: c_int) -> String {
    let mut errbuf = [0 as libc::c_char; ERRBUF_SIZE];
    // SAFETY: errbuf is a writable buffer of ERRBUF_SIZE bytes and
    // av_strerror NUL-terminates whatever it writes into it.
    unsafe {
        if av_strerror(code, errbuf.as_mut_ptr(), ERRBUF_SIZE) < 0 {
            return format!("unknown error code {code}");
        }
        CStr::from_ptr(errbuf.as_ptr()).to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffmpeg_sys_next::AVERROR;

    #[test]
    fn test_known_code_has_text() {
        let text = av_err2str(AVERROR(libc::ENOENT));
        assert!(!text.is_empty());
    }

    #[test]
    fn test_eof_code_has_text() {
        let text = av_err2str(ffmpeg_sys_next::AVERROR_EOF);
        assert!(!text.is_empty());
    }
}
