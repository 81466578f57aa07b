//! Case conversion shared by module naming and binding display names.
//!
//! Word boundaries are separators (`-`, `_`, `.`, `/`, space), a lower-case
//! letter followed by an upper-case one, the end of an acronym (`HTTPServer`
//! splits before `Server`) and letter/digit transitions.

fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if matches!(c, '-' | '_' | '.' | '/' | ' ') {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if let Some(prev) = current.chars().last() {
            let next = chars.get(i + 1).copied();
            let boundary = if c.is_uppercase() {
                prev.is_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_uppercase() && next.is_some_and(|n| n.is_lowercase()))
            } else if c.is_ascii_digit() {
                !prev.is_ascii_digit()
            } else {
                prev.is_ascii_digit()
            };
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Convert any identifier or path segment to snake_case
///
/// # Examples
/// ```
/// use weave_core::naming::to_snake_case;
/// assert_eq!(to_snake_case("resources"), "resources");
/// assert_eq!(to_snake_case("goGit"), "go_git");
/// assert_eq!(to_snake_case("HTTPServer"), "http_server");
/// assert_eq!(to_snake_case("yaml.v3"), "yaml_v_3");
/// ```
pub fn to_snake_case(name: &str) -> String {
    split_words(name)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Convert any identifier or path to kebab-case
///
/// # Examples
/// ```
/// use weave_core::naming::to_kebab_case;
/// assert_eq!(to_kebab_case("NewLabel"), "new-label");
/// assert_eq!(to_kebab_case("resources_audio"), "resources-audio");
/// assert_eq!(to_kebab_case("example.com/app"), "example-com-app");
/// ```
pub fn to_kebab_case(name: &str) -> String {
    split_words(name)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// Drops a leading `New` when it starts a word: `NewLabel` gives `Label`,
/// `New` gives an empty string, `Newton` is left alone.
pub fn strip_new_prefix(name: &str) -> &str {
    match name.strip_prefix("New") {
        Some(rest) if rest.is_empty() || !rest.starts_with(|c: char| c.is_lowercase()) => rest,
        _ => name,
    }
}

/// Lower-cases a module path into a flat identifier, replacing everything
/// outside `[a-z0-9]` with `_`.
///
/// # Examples
/// ```
/// use weave_core::naming::flat_identifier;
/// assert_eq!(flat_identifier("fyne.io/fyne/v2"), "fyne_io_fyne_v2");
/// ```
pub fn flat_identifier(path: &str) -> String {
    path.chars()
        .map(|c| c.to_ascii_lowercase())
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case(""), "");
        assert_eq!(to_snake_case("audio"), "audio");
        assert_eq!(to_snake_case("go-git"), "go_git");
        assert_eq!(to_snake_case("ObjectMeta"), "object_meta");
        assert_eq!(to_snake_case("CELDeviceSelector"), "cel_device_selector");
        assert_eq!(to_snake_case("x509"), "x_509");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn test_to_kebab_case() {
        assert_eq!(to_kebab_case("Println"), "println");
        assert_eq!(to_kebab_case("ReadAll"), "read-all");
        assert_eq!(to_kebab_case("ID"), "id");
        assert_eq!(to_kebab_case("URLPath"), "url-path");
    }

    #[test]
    fn test_strip_new_prefix() {
        assert_eq!(strip_new_prefix("NewLabel"), "Label");
        assert_eq!(strip_new_prefix("New"), "");
        assert_eq!(strip_new_prefix("Newton"), "Newton");
        assert_eq!(strip_new_prefix("Open"), "Open");
    }

    #[test]
    fn test_flat_identifier() {
        assert_eq!(flat_identifier("example.com/App-Lib"), "example_com_app_lib");
        assert_eq!(flat_identifier(""), "");
    }
}
