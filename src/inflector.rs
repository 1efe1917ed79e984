//! Pure name transforms shared by the mapper layer.
//!
//! Entity fields are camelCase, storage columns are snake_case, and table
//! names are the snake_case plural of the entity type.

use convert_case::{Case, Casing};

/// Split a name into lower-case words on case boundaries and underscores.
///
/// `"BlogArticle"` becomes `["blog", "article"]`.
pub fn split_on_case_boundary(name: &str) -> Vec<String> {
    name.to_case(Case::Snake)
        .split('_')
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// `camelCase` or `TitleCase` to `snake_case`.
pub fn to_snake_case(name: &str) -> String {
    split_on_case_boundary(name).join("_")
}

/// Join words into `camelCase`.
pub fn to_camel_case<S: AsRef<str>>(words: &[S]) -> String {
    let joined = words
        .iter()
        .map(|w| w.as_ref())
        .collect::<Vec<_>>()
        .join(" ");
    joined.to_case(Case::Camel)
}

/// Restricted pluralization used for table names.
///
/// Trailing `f` becomes `ves`, trailing `x` takes `es`, trailing `s` takes
/// `es` only after a vowel and is left alone after a consonant, anything
/// else takes `s`. This is not English pluralization.
pub fn pluralize(word: &str) -> String {
    let mut chars = word.chars().rev();
    let last = chars.next();
    let second_last = chars.next();

    match last {
        Some('f') => format!("{}ves", &word[..word.len() - 1]),
        Some('x') => format!("{word}es"),
        Some('s') => {
            if second_last.map(is_consonant).unwrap_or(false) {
                word.to_string()
            } else {
                format!("{word}es")
            }
        }
        Some(_) => format!("{word}s"),
        None => String::new(),
    }
}

fn is_consonant(c: char) -> bool {
    c.is_alphabetic() && !matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u')
}

/// Column name for an entity field.
pub fn field_to_column(field: &str) -> String {
    to_snake_case(field)
}

/// Entity field name for a storage column.
pub fn column_to_field(column: &str) -> String {
    to_camel_case(&split_on_case_boundary(column))
}

/// Inferred table name for an entity type: `snake_case(pluralize(type))`.
pub fn table_name(type_name: &str) -> String {
    to_snake_case(&pluralize(type_name))
}
