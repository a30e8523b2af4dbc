//! Case conversion and pluralization helpers
//!
//! Flag names, resource names, and spec ids are all kebab-cased; the
//! CLI parser convention maps a long flag back to a camelCase lookup
//! key. Pluralization is heuristic and only needs to be stable, not
//! linguistically complete.

/// Convert any identifier-ish string to kebab-case.
///
/// Handles camelCase humps, snake_case, dots, slashes, and template
/// braces: `"xRequestId"` -> `"x-request-id"`, `"GET /users/{id}"` ->
/// `"get-users-id"`.
pub fn kebab_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 4);
    let mut prev_lower_or_digit = false;
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if c.is_ascii_uppercase() && prev_lower_or_digit {
                pending_dash = true;
            }
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
            prev_lower_or_digit = c.is_ascii_lowercase() || c.is_ascii_digit();
        } else {
            // Any separator or symbol becomes a single dash boundary
            pending_dash = true;
            prev_lower_or_digit = false;
        }
    }

    out
}

/// Convert a kebab-case flag name to its camelCase lookup key.
///
/// Dots are preserved literally; body-flag keys are never camelized.
pub fn camel_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut capitalize = false;

    for c in input.chars() {
        if c == '-' || c == '_' || c == ' ' {
            if !out.is_empty() {
                capitalize = true;
            }
        } else if capitalize {
            out.extend(c.to_uppercase());
            capitalize = false;
        } else {
            out.push(c);
        }
    }

    out
}

/// Pluralize the last dash-separated segment of a kebab-case word.
///
/// Words already ending in `s` are left alone, which keeps
/// already-plural resources stable (`contacts` -> `contacts`).
pub fn pluralize(word: &str) -> String {
    match word.rfind('-') {
        Some(i) => format!("{}-{}", &word[..i], pluralize_word(&word[i + 1..])),
        None => pluralize_word(word),
    }
}

fn pluralize_word(word: &str) -> String {
    if word.is_empty() || word.ends_with('s') {
        return word.to_string();
    }
    if word.ends_with('y') {
        let bytes = word.as_bytes();
        if bytes.len() >= 2 && !matches!(bytes[bytes.len() - 2], b'a' | b'e' | b'i' | b'o' | b'u') {
            return format!("{}ies", &word[..word.len() - 1]);
        }
    }
    if word.ends_with('x') || word.ends_with('z') || word.ends_with("ch") || word.ends_with("sh") {
        return format!("{}es", word);
    }
    format!("{}s", word)
}

/// Best-effort inverse of [`pluralize`], applied to the last segment.
pub fn singularize(word: &str) -> String {
    match word.rfind('-') {
        Some(i) => format!("{}-{}", &word[..i], singularize_word(&word[i + 1..])),
        None => singularize_word(word),
    }
}

fn singularize_word(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{}y", stem);
    }
    for suffix in ["ches", "shes", "xes", "zes", "ses"] {
        if let Some(stem) = word.strip_suffix(suffix) {
            return format!("{}{}", stem, &suffix[..suffix.len() - 2]);
        }
    }
    if word.ends_with('s') && !word.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kebab_camel_humps() {
        assert_eq!(kebab_case("xRequestId"), "x-request-id");
        assert_eq!(kebab_case("createCustomer"), "create-customer");
        assert_eq!(kebab_case("user2Id"), "user2-id");
    }

    #[test]
    fn test_kebab_separators() {
        assert_eq!(kebab_case("My Pet API"), "my-pet-api");
        assert_eq!(kebab_case("chat.completions.create"), "chat-completions-create");
        assert_eq!(kebab_case("GET /users/{id}"), "get-users-id");
        assert_eq!(kebab_case("X-Request-Id"), "x-request-id");
    }

    #[test]
    fn test_camel_roundtrip() {
        assert_eq!(camel_case("x-request-id"), "xRequestId");
        assert_eq!(camel_case("limit"), "limit");
        // Dots stay literal for body-flag keys
        assert_eq!(camel_case("address.city"), "address.city");
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("user"), "users");
        assert_eq!(pluralize("contacts"), "contacts");
        assert_eq!(pluralize("company"), "companies");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("api-key"), "api-keys");
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("users"), "user");
        assert_eq!(singularize("companies"), "company");
        assert_eq!(singularize("statuses"), "status");
        assert_eq!(singularize("address"), "address");
    }
}
