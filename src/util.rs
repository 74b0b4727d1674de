use serde::{Deserialize, Deserializer};
use std::{fs, io, path::Path};

/// The default maximum number of rows displayed.
pub const DEFAULT_MAX_ROWS: usize = 100;

/// Converts a not found error to Ok(false)
pub fn path_exists(path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound) => Ok(false),
        Err(e) => Err(e),
    }
}

// Helpers for serde to parse fields with quirks.

/// Parse a search string, trimming it and mapping the empty string to `None`.
pub fn optional_search<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Deserialize::deserialize(d)?;
    Ok(s.and_then(|s| {
        let s = s.trim();
        if s.is_empty() {
            None
        } else {
            Some(s.to_owned())
        }
    }))
}

// error printing helper.
//
pub trait ResultExt {
    fn print_error(self) -> Self;
}

impl<T> ResultExt for Result<T, anyhow::Error> {
    fn print_error(self) -> Self {
        match self {
            Ok(v) => Ok(v),
            Err(error) => {
                println!("error: {}", error);
                let mut err: &dyn std::error::Error = error.as_ref();
                while let Some(cause) = err.source() {
                    println!("caused by: {}", cause);
                    err = cause;
                }
                Err(error)
            }
        }
    }
}

/// Row limits must be even so head and tail windows are the same size.
pub(crate) fn constrain_max_rows(mut max_rows: usize) -> usize {
    // make sure 0 -> 0, true since we only touch odd numbers
    if max_rows % 2 == 1 {
        if max_rows == 1 {
            max_rows = 2;
        } else {
            max_rows -= 1;
        }
    }
    max_rows
}

pub fn header(header: &str) {
    let len = header.chars().count();
    print!("\n{}\n", header);
    for _ in 0..len {
        print!("=");
    }
    println!("\n")
}
