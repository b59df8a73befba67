//! POSIX shell word expansion through the C library's `wordexp(3)`
//!
//! Quoting, tilde, parameter, arithmetic and command substitution, and field
//! splitting all follow the system shell. Unset variables expand to nothing.

use std::ffi::{CStr, CString};
use std::ptr;

use nix::libc::{c_char, c_int, size_t};

/// Error codes returned by `wordexp(3)`
mod wrde {
    use super::c_int;

    pub const NOSPACE: c_int = 1;
    pub const BADCHAR: c_int = 2;
    pub const BADVAL: c_int = 3;
    pub const CMDSUB: c_int = 4;
    pub const SYNTAX: c_int = 5;
}

#[repr(C)]
#[allow(dead_code)]
struct WordexpT {
    we_wordc: size_t,
    we_wordv: *mut *mut c_char,
    we_offs: size_t,
}

extern "C" {
    fn wordexp(words: *const c_char, pwordexp: *mut WordexpT, flags: c_int) -> c_int;
    fn wordfree(pwordexp: *mut WordexpT);
}

/// Why a string could not be expanded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandError {
    pub message: String,
}

impl ExpandError {
    fn from_code(code: c_int) -> Self {
        let reason = match code {
            wrde::NOSPACE => "out of memory",
            wrde::BADCHAR => "unquoted shell metacharacter",
            wrde::BADVAL => "undefined shell variable",
            wrde::CMDSUB => "command substitution not allowed",
            wrde::SYNTAX => "shell syntax error",
            _ => "unknown error",
        };
        Self {
            message: format!("{} ({})", reason, code),
        }
    }
}

/// Expand `words` the way a POSIX shell would for a simple command's words.
pub fn expand(words: &str) -> Result<Vec<String>, ExpandError> {
    let input = CString::new(words).map_err(|_| ExpandError {
        message: "command contains a NUL byte".to_string(),
    })?;

    let mut p = WordexpT {
        we_wordc: 0,
        we_wordv: ptr::null_mut(),
        we_offs: 0,
    };

    // SAFETY: `input` is NUL-terminated and outlives the call, and `p` is a
    // zeroed `wordexp_t` owned by this frame.
    let res = unsafe { wordexp(input.as_ptr(), &mut p, 0) };
    if res != 0 {
        if res == wrde::NOSPACE && !p.we_wordv.is_null() {
            // SAFETY: on NOSPACE `p` may hold a partial result that must be freed.
            unsafe { wordfree(&mut p) };
        }
        return Err(ExpandError::from_code(res));
    }

    let mut out = Vec::with_capacity(p.we_wordc);
    for i in 0..p.we_wordc {
        // SAFETY: after a successful call `we_wordv` holds `we_wordc` valid
        // NUL-terminated strings.
        let word = unsafe { CStr::from_ptr(*p.we_wordv.add(i)) };
        out.push(word.to_string_lossy().into_owned());
    }

    // SAFETY: `p` was filled by a successful `wordexp` and is freed once.
    unsafe { wordfree(&mut p) };

    Ok(out)
}
