//! Identifier normalisation shared by every stage that derives a name.
//!
//! All names (synthetic model names, method names, service names) are built
//! from the same word list produced by [`split_words`], so one input always
//! splits the same way no matter which stage asks:
//!
//! - accents are stripped first (`"café"` -> `"cafe"`)
//! - runs of non-alphanumeric characters separate words
//! - inside a run a word starts at an uppercase letter that follows a
//!   lowercase letter or digit, or at an uppercase letter that is followed by a
//!   lowercase letter while the previous letter was uppercase (acronym
//!   boundary), so `"XMLHttpRequest"` splits to `["XML", "Http", "Request"]`

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Remove diacritics: decompose, drop combining marks, recompose.
pub fn strip_accents(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}

/// Split an identifier into words using the acronym-preserving policy.
pub fn split_words(s: &str) -> Vec<String> {
    let stripped = strip_accents(s.trim());
    stripped
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|run| !run.is_empty())
        .flat_map(split_case_run)
        .collect()
}

/// Split one alphanumeric run on camel/Pascal case boundaries.
fn split_case_run(run: &str) -> Vec<String> {
    let chars: Vec<char> = run.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            let prev_upper = chars[i - 1].is_ascii_uppercase();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if (!prev_upper || next_lower) && !current.is_empty() {
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

fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first
            .to_ascii_uppercase()
            .to_string()
            .chars()
            .chain(chars.map(|c| c.to_ascii_lowercase()))
            .collect(),
    }
}

/// `"list user-resources"` -> `"ListUserResources"`
pub fn to_pascal_case(s: &str) -> String {
    split_words(s).iter().map(|w| capitalize_word(w)).collect()
}

/// `"ListUserResources"` -> `"listUserResources"`
pub fn to_camel_case(s: &str) -> String {
    split_words(s)
        .iter()
        .enumerate()
        .map(|(i, w)| {
            if i == 0 {
                w.to_ascii_lowercase()
            } else {
                capitalize_word(w)
            }
        })
        .collect()
}

/// `"XMLHttpRequest"` -> `"xml_http_request"`
pub fn to_snake_case(s: &str) -> String {
    join_lower(s, "_")
}

/// `"XMLHttpRequest"` -> `"xml-http-request"`
pub fn to_kebab_case(s: &str) -> String {
    join_lower(s, "-")
}

fn join_lower(s: &str, sep: &str) -> String {
    split_words(s)
        .iter()
        .map(|w| w.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(sep)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_accents() {
        assert_eq!(strip_accents("café"), "cafe");
        assert_eq!(strip_accents("São"), "Sao");
        assert_eq!(strip_accents("plain"), "plain");
    }

    #[test]
    fn test_split_words_acronym_boundary() {
        assert_eq!(split_words("XMLHttpRequest"), vec!["XML", "Http", "Request"]);
        assert_eq!(split_words("getUserById"), vec!["get", "User", "By", "Id"]);
        assert_eq!(split_words("additionalProperties"), vec!["additional", "Properties"]);
        assert_eq!(split_words("v1Users"), vec!["v1", "Users"]);
        assert_eq!(split_words("ABC"), vec!["ABC"]);
    }

    #[test]
    fn test_split_words_separators() {
        assert_eq!(split_words("hello-world"), vec!["hello", "world"]);
        assert_eq!(split_words("hello_world"), vec!["hello", "world"]);
        assert_eq!(split_words("  hello   world "), vec!["hello", "world"]);
        assert_eq!(split_words("HELLO_WORLD"), vec!["HELLO", "WORLD"]);
        assert!(split_words("").is_empty());
        assert!(split_words("--").is_empty());
    }

    #[test]
    fn test_split_is_stable_across_calls() {
        let first = split_words("XMLHttpRequest");
        for _ in 0..10 {
            assert_eq!(split_words("XMLHttpRequest"), first);
        }
        assert_eq!(to_pascal_case("XMLHttpRequest"), "XmlHttpRequest");
        assert_eq!(to_camel_case("XMLHttpRequest"), "xmlHttpRequest");
        assert_eq!(to_snake_case("XMLHttpRequest"), "xml_http_request");
        assert_eq!(to_kebab_case("XMLHttpRequest"), "xml-http-request");
    }

    #[test]
    fn test_to_pascal_case() {
        let cases = [
            ("", ""),
            ("hello", "Hello"),
            ("helloWorld", "HelloWorld"),
            ("Properties", "Properties"),
            ("listUserResources", "ListUserResources"),
            ("createUsersWithListInput", "CreateUsersWithListInput"),
            ("hello world", "HelloWorld"),
            ("HELLO_WORLD", "HelloWorld"),
            ("São Paulo", "SaoPaulo"),
        ];
        for (input, expected) in cases {
            assert_eq!(to_pascal_case(input), expected, "input: {input:?}");
        }
    }

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("UserController_findAll"), "userControllerFindAll");
        assert_eq!(to_camel_case("resource-types"), "resourceTypes");
        assert_eq!(to_camel_case(""), "");
    }

    #[test]
    fn test_snake_and_kebab() {
        assert_eq!(to_snake_case("itemId"), "item_id");
        assert_eq!(to_snake_case("Résumé Items"), "resume_items");
        assert_eq!(to_kebab_case("resourceTypes"), "resource-types");
    }
}
