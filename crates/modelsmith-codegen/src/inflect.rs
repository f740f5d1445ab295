//! English inflection and identifier helpers used for class and attribute names.

use heck::ToUpperCamelCase;

const UNCOUNTABLE: &[&str] = &[
    "data",
    "equipment",
    "fish",
    "information",
    "media",
    "metadata",
    "money",
    "news",
    "rice",
    "series",
    "sheep",
    "species",
    "staff",
];

/// (singular, plural)
const IRREGULAR: &[(&str, &str)] = &[
    ("child", "children"),
    ("foot", "feet"),
    ("goose", "geese"),
    ("half", "halves"),
    ("knife", "knives"),
    ("leaf", "leaves"),
    ("life", "lives"),
    ("man", "men"),
    ("mouse", "mice"),
    ("movie", "movies"),
    ("ox", "oxen"),
    ("person", "people"),
    ("shelf", "shelves"),
    ("thief", "thieves"),
    ("tooth", "teeth"),
    ("wife", "wives"),
    ("wolf", "wolves"),
    ("woman", "women"),
];

/// Singular forms ending in `s` that must not lose it.
const SINGULAR_S_ENDINGS: &[&str] = &["ss", "us", "is"];

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Derives class and attribute names from catalog identifiers.
///
/// With inflection disabled every name is the raw identifier, only made
/// syntactically valid.
#[derive(Debug, Clone, Copy)]
pub struct Inflector {
    enabled: bool,
}

impl Inflector {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// `book_tags` -> `BookTag`.
    pub fn class_name(&self, table: &str) -> String {
        if !self.enabled {
            return sanitize_identifier(table);
        }
        let camel = singularize(table).to_upper_camel_case();
        if camel.is_empty() {
            sanitize_identifier(table)
        } else {
            sanitize_identifier(&camel)
        }
    }

    /// Attribute name for a reference to a single row of `name`.
    pub fn singular_attribute(&self, name: &str) -> String {
        if self.enabled {
            sanitize_identifier(&singularize(name))
        } else {
            sanitize_identifier(name)
        }
    }

    /// Attribute name for a collection of rows of `name`.
    pub fn plural_attribute(&self, name: &str) -> String {
        if self.enabled {
            sanitize_identifier(&pluralize(&singularize(name)))
        } else {
            sanitize_identifier(name)
        }
    }
}

/// Singularize the last `_`-separated word of `name`.
pub fn singularize(name: &str) -> String {
    map_last_word(name, singularize_word)
}

/// Pluralize the last `_`-separated word of `name`.
pub fn pluralize(name: &str) -> String {
    map_last_word(name, pluralize_word)
}

fn map_last_word(name: &str, inflect: fn(&str) -> String) -> String {
    match name.rfind('_') {
        Some(idx) if idx + 1 < name.len() => {
            format!("{}{}", &name[..=idx], inflect(&name[idx + 1..]))
        }
        _ => inflect(name),
    }
}

fn singularize_word(word: &str) -> String {
    let lower = word.to_lowercase();
    if lower.is_empty() || UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    if let Some((singular, _)) = IRREGULAR.iter().find(|(_, plural)| *plural == lower) {
        return match_case(word, singular);
    }
    if IRREGULAR.iter().any(|(singular, _)| *singular == lower) {
        return word.to_string();
    }

    let stem = |suffix_len: usize| &word[..word.len() - suffix_len];

    if lower.len() > 3 && lower.ends_with("ies") {
        return format!("{}y", stem(3));
    }
    // statuses, viruses, campuses; but not houses or causes
    if lower.len() > 5 && lower.ends_with("uses") {
        let before = lower[..lower.len() - 4].chars().last().unwrap_or_default();
        if !matches!(before, 'a' | 'e' | 'i' | 'o' | 'u') {
            return stem(2).to_string();
        }
    }
    for suffix in ["sses", "shes", "ches", "xes"] {
        if lower.ends_with(suffix) {
            return stem(2).to_string();
        }
    }
    if lower.ends_with('s') && !SINGULAR_S_ENDINGS.iter().any(|end| lower.ends_with(end)) {
        return stem(1).to_string();
    }
    word.to_string()
}

fn pluralize_word(word: &str) -> String {
    let lower = word.to_lowercase();
    if lower.is_empty() || UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == lower) {
        return match_case(word, plural);
    }
    if IRREGULAR.iter().any(|(_, plural)| *plural == lower) {
        return word.to_string();
    }

    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u');
    let mut chars = lower.chars().rev();
    let last = chars.next().unwrap_or_default();
    let before_last = chars.next().unwrap_or_default();

    if last == 'y' && !is_vowel(before_last) && lower.len() > 1 {
        return format!("{}ies", &word[..word.len() - 1]);
    }
    if ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        return format!("{word}es");
    }
    format!("{word}s")
}

fn match_case(original: &str, replacement: &str) -> String {
    if original.chars().next().is_some_and(char::is_uppercase) {
        let mut chars = replacement.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    } else {
        replacement.to_string()
    }
}

/// Make `name` a valid Python identifier that is not a keyword.
pub fn sanitize_identifier(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    if PYTHON_KEYWORDS.contains(&out.as_str()) {
        out.push('_');
    }
    out
}

/// `author_id` -> `author`; names without an id suffix come back unchanged.
pub fn strip_id_suffix(column: &str) -> &str {
    for suffix in ["_id", "_ID", "Id"] {
        if let Some(stripped) = column.strip_suffix(suffix) {
            if !stripped.is_empty() {
                return stripped;
            }
        }
    }
    column
}
