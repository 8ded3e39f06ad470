//! Attribute descriptor -> ordered, de-duplicated search-query variants.
//!
//! Templates are data: a category family maps to a list of slot sequences. Adding a family
//! means adding a row to `FAMILIES`, not a branch.

use crate::textprep::{collapse_ws, scrub};
use shopmatch_core::AttributeDescriptor;
use std::collections::BTreeSet;

pub const MAX_VARIANTS: usize = 6;

/// Used when the descriptor carries no text at all.
const EMPTY_DESCRIPTOR_QUERY: &str = "pohištvo";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFamily {
    Seating,
    Surface,
    Lighting,
    Storage,
    Generic,
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Category,
    Color,
    Material,
    Shape,
    Legs,
    Size,
    Style,
}

type Template = &'static [Slot];

struct FamilyRule {
    family: CategoryFamily,
    /// Prefixes of scrubbed category words.
    keywords: &'static [&'static str],
    templates: &'static [Template],
}

use Slot::*;

const FAMILIES: &[FamilyRule] = &[
    FamilyRule {
        family: CategoryFamily::Seating,
        keywords: &[
            "stol", "sedez", "fotelj", "kavc", "sofa", "klop", "taburet", "chair",
            "stool", "armchair", "couch", "bench",
        ],
        templates: &[
            &[Color, Material, Category, Legs],
            &[Category, Color, Material],
            &[Style, Category, Color],
            &[Category, Legs, Shape],
        ],
    },
    FamilyRule {
        family: CategoryFamily::Surface,
        keywords: &["miz", "pult", "table", "desk", "countertop", "worktop"],
        templates: &[
            &[Shape, Material, Category, Size],
            &[Category, Color, Material],
            &[Category, Size, Legs],
            &[Style, Category, Shape],
        ],
    },
    FamilyRule {
        family: CategoryFamily::Lighting,
        keywords: &["svetil", "luc", "lestenec", "lamp", "chandelier", "light", "pendant"],
        templates: &[
            &[Style, Category, Color, Material],
            &[Category, Shape, Color],
            &[Material, Category, Size],
            &[Category, Style],
        ],
    },
    FamilyRule {
        family: CategoryFamily::Storage,
        keywords: &[
            "omar", "polic", "komod", "regal", "cabinet", "shelf", "wardrobe", "dresser",
            "sideboard",
        ],
        templates: &[
            &[Color, Material, Category, Size],
            &[Category, Style, Color],
            &[Category, Material],
            &[Category, Size, Shape],
        ],
    },
];

const GENERIC_TEMPLATES: &[Template] = &[
    &[Color, Material, Shape, Legs, Style, Category, Size],
    &[Category, Color, Material],
    &[Category],
];

pub fn category_family(category: &str) -> CategoryFamily {
    let words = scrub(category);
    for rule in FAMILIES {
        let hit = words
            .split_whitespace()
            .any(|w| rule.keywords.iter().any(|k| w.starts_with(k)));
        if hit {
            return rule.family;
        }
    }
    CategoryFamily::Generic
}

fn slot_value<'a>(d: &'a AttributeDescriptor, slot: Slot) -> &'a str {
    match slot {
        Category => &d.category,
        Color => &d.color,
        Material => &d.material,
        Shape => &d.shape,
        Legs => &d.legs,
        Size => &d.size,
        Style => &d.style,
    }
}

fn render(d: &AttributeDescriptor, template: Template) -> String {
    let parts: Vec<&str> = template
        .iter()
        .map(|s| slot_value(d, *s).trim())
        .filter(|s| !s.is_empty())
        .collect();
    collapse_ws(&parts.join(" "))
}

fn site_scope(site: &str) -> Option<String> {
    let s = site.trim();
    let s = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"))
        .unwrap_or(s)
        .trim_end_matches('/');
    if s.is_empty() || s.contains(char::is_whitespace) {
        return None;
    }
    Some(format!("site:{s}"))
}

/// Build 1..=6 query variants, most specific first.
///
/// Known families contribute their hand-tuned templates, then the generic ones; unknown
/// categories only get the generic templates. Variants are de-duplicated on a
/// lowercase/whitespace-collapsed key, keeping the first spelling seen.
pub fn build_queries(d: &AttributeDescriptor) -> Vec<String> {
    let family = category_family(&d.category);
    let family_templates: &[Template] = FAMILIES
        .iter()
        .find(|r| r.family == family)
        .map(|r| r.templates)
        .unwrap_or(&[]);
    let scope = site_scope(&d.site);

    let mut seen = BTreeSet::<String>::new();
    let mut out: Vec<String> = Vec::new();
    for t in family_templates.iter().chain(GENERIC_TEMPLATES.iter()) {
        if out.len() >= MAX_VARIANTS {
            break;
        }
        let body = render(d, t);
        if body.is_empty() {
            continue;
        }
        let q = match &scope {
            Some(s) => format!("{body} {s}"),
            None => body,
        };
        if seen.insert(q.to_lowercase()) {
            out.push(q);
        }
    }

    if out.is_empty() {
        let q = match &scope {
            Some(s) => format!("{EMPTY_DESCRIPTOR_QUERY} {s}"),
            None => EMPTY_DESCRIPTOR_QUERY.to_string(),
        };
        out.push(q);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn chair() -> AttributeDescriptor {
        AttributeDescriptor {
            category: "jedilni stol".to_string(),
            color: "bež".to_string(),
            material: "žamet".to_string(),
            legs: "kovinske noge".to_string(),
            style: "moderen".to_string(),
            ..AttributeDescriptor::default()
        }
    }

    #[test]
    fn families_resolve_from_inflected_category_words() {
        assert_eq!(category_family("Jedilni stoli"), CategoryFamily::Seating);
        assert_eq!(category_family("Klubska mizica"), CategoryFamily::Surface);
        assert_eq!(category_family("viseča svetilka"), CategoryFamily::Lighting);
        assert_eq!(category_family("Knjižna polica"), CategoryFamily::Storage);
        assert_eq!(category_family("preproga"), CategoryFamily::Generic);
    }

    #[test]
    fn known_family_puts_specific_templates_first() {
        let qs = build_queries(&chair());
        assert_eq!(qs[0], "bež žamet jedilni stol kovinske noge");
        assert_eq!(qs[1], "jedilni stol bež žamet");
        assert_eq!(qs[2], "moderen jedilni stol bež");
        assert_eq!(qs[3], "jedilni stol kovinske noge");
        assert_eq!(qs[4], "bež žamet kovinske noge moderen jedilni stol");
        // The generic "category, color, material" repeats qs[1]; the bare category fills the cap.
        assert_eq!(qs.len(), MAX_VARIANTS);
        assert_eq!(qs[5], "jedilni stol");
    }

    #[test]
    fn unknown_category_uses_generic_templates_only() {
        let d = AttributeDescriptor {
            category: "preproga".to_string(),
            color: "siva".to_string(),
            ..AttributeDescriptor::default()
        };
        let qs = build_queries(&d);
        assert_eq!(qs, vec!["siva preproga", "preproga siva", "preproga"]);
    }

    #[test]
    fn duplicates_are_removed_case_insensitively() {
        let d = AttributeDescriptor {
            category: "Stol".to_string(),
            ..AttributeDescriptor::default()
        };
        // Every template collapses to the category alone.
        assert_eq!(build_queries(&d), vec!["Stol"]);
    }

    #[test]
    fn whitespace_is_collapsed() {
        let d = AttributeDescriptor {
            category: "  jedilna   miza ".to_string(),
            shape: "okrogla\t".to_string(),
            ..AttributeDescriptor::default()
        };
        let qs = build_queries(&d);
        assert_eq!(qs[0], "okrogla jedilna miza");
        assert!(qs.iter().all(|q| !q.contains("  ")));
    }

    #[test]
    fn site_scope_is_appended_to_every_variant() {
        let mut d = chair();
        d.site = "https://www.ikea.si/".to_string();
        let qs = build_queries(&d);
        assert!(qs.iter().all(|q| q.ends_with(" site:www.ikea.si")), "{qs:?}");
    }

    #[test]
    fn empty_descriptor_still_yields_one_variant() {
        let qs = build_queries(&AttributeDescriptor::default());
        assert_eq!(qs, vec![EMPTY_DESCRIPTOR_QUERY.to_string()]);
    }

    proptest! {
        #[test]
        fn always_one_to_six_distinct_variants(
            category in "[a-zA-Zčšž ]{0,16}",
            color in "[a-zA-Z ]{0,8}",
            material in "[a-zA-Z ]{0,8}",
            shape in "[a-zA-Z ]{0,8}",
            size in "[0-9a-z ]{0,6}",
        ) {
            let d = AttributeDescriptor {
                category,
                color,
                material,
                shape,
                size,
                ..AttributeDescriptor::default()
            };
            let qs = build_queries(&d);
            prop_assert!(!qs.is_empty() && qs.len() <= MAX_VARIANTS);
            let keys: BTreeSet<String> = qs
                .iter()
                .map(|q| collapse_ws(q).to_lowercase())
                .collect();
            prop_assert_eq!(keys.len(), qs.len());
        }
    }
}
