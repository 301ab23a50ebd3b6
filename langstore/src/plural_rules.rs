//! CLDR plural groups: detection in native trees and conversion to and from
//! multi-variant translations.
//!
//! A plural group is a map whose keys are all CLDR categories, with at least two
//! of them present. A lone `other` key is an ordinary nested value: it carries no
//! plural distinction.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use lazy_static::lazy_static;
use unic_langid::LanguageIdentifier;

use crate::{
    node::{Member, Node},
    types::{PluralCategory, Translation},
};

lazy_static! {
    /// Static mapping from base language subtag → plural categories (CLDR‑style, cardinals).
    static ref CATEGORY_TABLE: BTreeMap<&'static str, BTreeSet<PluralCategory>> = {
        use PluralCategory::*;
        let mut m: BTreeMap<&'static str, BTreeSet<PluralCategory>> = BTreeMap::new();

        fn s(items: &[PluralCategory]) -> BTreeSet<PluralCategory> {
            items.iter().cloned().collect()
        }

        // One/Other (most Indo‑European languages without complex plural rules)
        for code in [
            "en","de","nl","sv","da","nb","nn","no","is","fi","et","fa","hi","bn","gu",
            "ta","te","kn","ml","mr","it","es","pt","mk","el","eu","gl","af","sw","ur",
            "fil","tl","tr","id","ms","fr","hy","kab"
        ] {
            m.insert(code, s(&[One, Other]));
        }

        // Only Other (East/Southeast Asian common cases)
        for code in ["ja","zh","ko","th","vi","km","lo","my","yue"] {
            m.insert(code, s(&[Other]));
        }

        // Slavic (Russian group): one, few, many, other
        for code in ["ru","uk","be","sr","hr","bs","sh","pl"] {
            m.insert(code, s(&[One, Few, Many, Other]));
        }

        for code in ["cs","sk","lt","ro"] {
            m.insert(code, s(&[One, Few, Other]));
        }

        m.insert("sl", s(&[One, Two, Few, Other]));
        m.insert("lv", s(&[Zero, One, Other]));
        m.insert("ga", s(&[One, Two, Few, Many, Other]));
        m.insert("ar", s(&[Zero, One, Two, Few, Many, Other]));

        // Hebrew (legacy code iw also maps here)
        for code in ["he","iw"] {
            m.insert(code, s(&[One, Two, Many, Other]));
        }

        m
    };
}

/// Returns the CLDR plural categories for a given language identifier.
///
/// Unknown locales fall back to {Other}.
pub fn categories_for(lang: &LanguageIdentifier) -> BTreeSet<PluralCategory> {
    CATEGORY_TABLE
        .get(lang.language.as_str())
        .cloned()
        .unwrap_or_else(|| [PluralCategory::Other].into_iter().collect())
}

/// Ordered plural tags for a language code (accepts underscores).
///
/// This is the tag list handed to [`encode`]. Without a language, or with one
/// that does not parse, English rules apply.
pub fn plural_tags(lang: Option<&str>) -> Vec<PluralCategory> {
    let parsed = lang
        .map(|l| l.replace('_', "-"))
        .and_then(|l| l.parse::<LanguageIdentifier>().ok());
    match parsed {
        Some(lang_id) => categories_for(&lang_id).into_iter().collect(),
        None => vec![PluralCategory::One, PluralCategory::Other],
    }
}

/// Whether a map node is a plural group.
pub fn detect(map: &IndexMap<String, Member>) -> bool {
    if map.len() < 2 {
        return false;
    }
    map.keys().all(|key| key.parse::<PluralCategory>().is_ok())
}

/// Decodes a plural group into variants in canonical category order.
///
/// Only categories present in the map are kept. A variant that is null or not
/// a string becomes an empty string so the arity stays meaningful.
pub fn decode(map: &IndexMap<String, Member>) -> Translation {
    let mut present: Vec<(PluralCategory, String)> = map
        .iter()
        .filter_map(|(key, member)| {
            let category = key.parse::<PluralCategory>().ok()?;
            let value = match &member.node {
                Node::Scalar { value, .. } => value.clone(),
                _ => String::new(),
            };
            Some((category, value))
        })
        .collect();
    present.sort_by_key(|(category, _)| *category);
    Translation::Plural(present.into_iter().map(|(_, value)| value).collect())
}

/// Encodes variants as a plural map, pairing them with `tags` in order.
///
/// Variants beyond the end of `tags` are dropped without error.
pub fn encode(forms: &[String], tags: &[PluralCategory]) -> Vec<(PluralCategory, String)> {
    if forms.len() > tags.len() {
        tracing::warn!(
            variants = forms.len(),
            tags = tags.len(),
            "dropping plural variants without a matching tag"
        );
    }
    tags.iter()
        .copied()
        .zip(forms.iter().cloned())
        .collect()
}

/// [`encode`] into a variant-tree map.
pub fn encode_node(forms: &[String], tags: &[PluralCategory]) -> Node {
    Node::Mapping(
        encode(forms, tags)
            .into_iter()
            .map(|(category, value)| (category.as_str().to_string(), Member::new(Node::text(value))))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> IndexMap<String, Member> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), Member::new(Node::text(*v))))
            .collect()
    }

    #[test]
    fn test_categories_basic() {
        let en: LanguageIdentifier = "en".parse().unwrap();
        let ru: LanguageIdentifier = "ru".parse().unwrap();
        let ja: LanguageIdentifier = "ja".parse().unwrap();

        assert_eq!(categories_for(&en).len(), 2);
        let ru_set = categories_for(&ru);
        assert!(ru_set.contains(&PluralCategory::Few));
        assert!(ru_set.contains(&PluralCategory::Many));
        assert_eq!(ru_set.len(), 4);
        assert_eq!(categories_for(&ja).len(), 1);
    }

    #[test]
    fn test_plural_tags_default_and_ordered() {
        assert_eq!(
            plural_tags(None),
            vec![PluralCategory::One, PluralCategory::Other]
        );
        assert_eq!(
            plural_tags(Some("ar")),
            PluralCategory::ALL.to_vec()
        );
        assert_eq!(
            plural_tags(Some("pt_BR")),
            vec![PluralCategory::One, PluralCategory::Other]
        );
    }

    #[test]
    fn test_detect() {
        assert!(detect(&map(&[("one", "a"), ("other", "b")])));
        assert!(detect(&map(&[("other", "b"), ("few", "c"), ("one", "a")])));
        assert!(!detect(&map(&[("other", "b")])));
        assert!(!detect(&map(&[("one", "a"), ("title", "b")])));
        assert!(!detect(&map(&[])));
    }

    #[test]
    fn test_decode_uses_canonical_order() {
        let decoded = decode(&map(&[("other", "apples"), ("one", "apple")]));
        assert_eq!(
            decoded,
            Translation::Plural(vec!["apple".to_string(), "apples".to_string()])
        );
    }

    #[test]
    fn test_decode_blank_for_null_variant() {
        let mut group = map(&[("one", "apple")]);
        group.insert("other".to_string(), Member::new(Node::Null));
        assert_eq!(
            decode(&group),
            Translation::Plural(vec!["apple".to_string(), String::new()])
        );
    }

    #[test]
    fn test_encode_truncates_extra_variants() {
        let forms = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let encoded = encode(&forms, &[PluralCategory::One, PluralCategory::Other]);
        assert_eq!(
            encoded,
            vec![
                (PluralCategory::One, "a".to_string()),
                (PluralCategory::Other, "b".to_string())
            ]
        );
    }

    #[test]
    fn test_encode_short_forms() {
        let forms = vec!["a".to_string()];
        let encoded = encode(&forms, &PluralCategory::ALL);
        assert_eq!(encoded, vec![(PluralCategory::Zero, "a".to_string())]);
    }
}
