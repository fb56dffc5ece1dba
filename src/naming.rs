//! Naming conventions applied to property names and enum variant names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Turns a declared (member) name into the name used in the document.
pub trait NamingConvention: Send + Sync + fmt::Debug {
    fn apply(&self, name: &str) -> String;
}

/// Split an identifier into words at `_`, `-`, spaces, lower→upper transitions and the
/// end of an acronym (`HTTPServer` → `HTTP`, `Server`). Digits stay with the current word.
fn words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if matches!(c, '_' | '-' | ' ') {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
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

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Built-in conventions, selectable from [`MapperOptions`](crate::MapperOptions).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamingStyle {
    /// Names are used as declared.
    #[default]
    Null,
    /// `firstName`
    CamelCase,
    /// `FirstName`
    PascalCase,
    /// `first_name`
    Underscored,
    /// `first-name`
    Hyphenated,
    /// `firstname`
    LowerCase,
}

impl NamingConvention for NamingStyle {
    fn apply(&self, name: &str) -> String {
        match self {
            NamingStyle::Null => name.to_owned(),
            NamingStyle::CamelCase => {
                let mut out = String::with_capacity(name.len());
                for (i, word) in words(name).iter().enumerate() {
                    if i == 0 {
                        out.push_str(&word.to_lowercase());
                    } else {
                        out.push_str(&capitalize(word));
                    }
                }
                out
            }
            NamingStyle::PascalCase => words(name).iter().map(|w| capitalize(w)).collect(),
            NamingStyle::Underscored => join_lower(name, "_"),
            NamingStyle::Hyphenated => join_lower(name, "-"),
            NamingStyle::LowerCase => name.to_lowercase(),
        }
    }
}

fn join_lower(name: &str, separator: &str) -> String {
    words(name)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(separator)
}
