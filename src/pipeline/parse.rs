//! Output parsing: raw stage results into ordered output arrays.

/// Split a text result on every literal occurrence of `separator`.
///
/// Pieces are trimmed and empty pieces dropped, so an empty result is a valid
/// (if degenerate) outcome. With no separator the whole trimmed text is the only element.
pub fn split_output(raw: &str, separator: Option<&str>) -> Vec<String> {
    match separator {
        Some(sep) if !sep.is_empty() => raw
            .split(sep)
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(str::to_string)
            .collect(),
        _ => vec![raw.trim().to_string()],
    }
}

/// Image and speech results are a single artifact reference.
pub fn wrap_artifact(reference: &str) -> Vec<String> {
    vec![reference.to_string()]
}
