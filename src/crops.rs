//! Crop Aliases
//!
//! Maps the short crop tokens produced by the crop classifier (e.g. `lentil`)
//! to the commodity names used in the historical price table
//! (e.g. `Lentil (Masur)(Whole)`).

use rustc_hash::FxHashMap;

/// Classifier token → price-table commodity name
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("rice", "Rice"),
    ("wheat", "Wheat"),
    ("maize", "Maize"),
    ("cotton", "Cotton"),
    ("banana", "Banana"),
    ("grapes", "Grapes"),
    ("mango", "Mango"),
    ("orange", "Orange"),
    ("papaya", "Papaya"),
    ("pomegranate", "Pomegranate"),
    ("coconut", "Coconut"),
    ("jute", "Jute"),
    ("lentil", "Lentil (Masur)(Whole)"),
    ("chickpea", "Kabuli Chana(Chickpeas-White)"),
    ("blackgram", "Black Gram (Urd Beans)(Whole)"),
    ("moath", "Moath Dal"),
    ("soybeans", "Soybeans"),
];

/// Fixed crop token → commodity name mapping
///
/// Built once at startup and never mutated. Iteration order follows the
/// order the aliases were registered in.
#[derive(Debug, Clone)]
pub struct CropAliases {
    entries: Vec<(String, String)>,
    index: FxHashMap<String, usize>,
}

impl CropAliases {
    /// The alias table the crop classifier was trained against
    pub fn builtin() -> Self {
        Self::from_pairs(BUILTIN_ALIASES.iter().copied())
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut entries = Vec::new();
        let mut index = FxHashMap::default();
        for (token, name) in pairs {
            let token = token.to_lowercase();
            if index.contains_key(&token) {
                continue;
            }
            index.insert(token.clone(), entries.len());
            entries.push((token, name.to_string()));
        }
        Self { entries, index }
    }

    /// Commodity name for a classifier token (case-insensitive)
    pub fn commodity_for(&self, token: &str) -> Option<&str> {
        self.index
            .get(&token.trim().to_lowercase())
            .map(|&i| self.entries[i].1.as_str())
    }

    /// (token, commodity) pairs in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, n)| (t.as_str(), n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CropAliases {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let aliases = CropAliases::builtin();
        assert_eq!(aliases.commodity_for("Maize"), Some("Maize"));
        assert_eq!(aliases.commodity_for("LENTIL"), Some("Lentil (Masur)(Whole)"));
        assert_eq!(aliases.commodity_for(" chickpea "), Some("Kabuli Chana(Chickpeas-White)"));
    }

    #[test]
    fn test_unknown_token() {
        let aliases = CropAliases::builtin();
        assert_eq!(aliases.commodity_for("unknownfruit"), None);
        assert_eq!(aliases.len(), 17);
    }

    #[test]
    fn test_first_registration_wins() {
        let aliases = CropAliases::from_pairs([("rice", "Rice"), ("RICE", "Paddy")]);
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases.commodity_for("rice"), Some("Rice"));
    }
}
