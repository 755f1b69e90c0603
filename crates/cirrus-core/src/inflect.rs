//! English pluralization for resource names.
//!
//! Resource kinds derive their plural (URL segment, collection envelope key)
//! from the declared singular name. Regular English rules cover the shipped
//! kinds; irregular nouns come from a small override table, and a kind can
//! always declare its plural explicitly via `ResourceKind::with_plural`.

/// Nouns the regular rules get wrong.
const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("datum", "data"),
];

/// Pluralize a singular English noun.
pub fn pluralize(singular: &str) -> String {
    if let Some((_, plural)) = IRREGULAR.iter().find(|(s, _)| *s == singular) {
        return (*plural).to_string();
    }

    // consonant + y => ies
    if let Some(stem) = singular.strip_suffix('y') {
        if stem
            .chars()
            .last()
            .map_or(false, |c| !"aeiou".contains(c.to_ascii_lowercase()))
        {
            return format!("{}ies", stem);
        }
    }

    // sibilant endings => es
    if ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| singular.ends_with(suffix))
    {
        return format!("{}es", singular);
    }

    format!("{}s", singular)
}
