use crate::textprep::{is_numeric, words};
use std::collections::BTreeSet;

/// Measurement units glued onto a preceding number (`120 cm` -> `120cm`).
const UNITS: &[&str] = &[
    "mm", "cm", "dm", "m", "kg", "g", "l", "ml", "w", "kw", "v", "in", "inch",
];

pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count() as f64;
    let uni = a.union(b).count() as f64;
    if uni == 0.0 {
        0.0
    } else {
        inter / uni
    }
}

/// Scrubbed title words as a set, with number+unit pairs glued. No stemming.
pub fn title_token_set(title: &str) -> BTreeSet<String> {
    let ws = words(title);
    let mut out = BTreeSet::new();
    let mut i = 0usize;
    while i < ws.len() {
        let w = &ws[i];
        if is_numeric(w) {
            if let Some(next) = ws.get(i + 1) {
                if UNITS.contains(&next.as_str()) {
                    out.insert(format!("{w}{next}"));
                    i += 2;
                    continue;
                }
            }
        }
        out.insert(w.clone());
        i += 1;
    }
    out
}

pub fn title_jaccard(a: &str, b: &str) -> f64 {
    jaccard(&title_token_set(a), &title_token_set(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jaccard_basic() {
        let a = BTreeSet::from(["a".to_string(), "b".to_string()]);
        let b = BTreeSet::from(["b".to_string(), "c".to_string()]);
        let j = jaccard(&a, &b);
        assert!((j - (1.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn units_are_glued_to_numbers() {
        assert_eq!(title_jaccard("Moderna miza 120cm", "Moderna miza 120 cm"), 1.0);
        assert_eq!(
            title_token_set("Miza 80 x 120 cm"),
            BTreeSet::from(["miza", "80", "x", "120cm"].map(String::from))
        );
    }

    #[test]
    fn case_and_diacritics_do_not_matter() {
        assert_eq!(title_jaccard("Bež STOL", "bez stol"), 1.0);
        assert!(title_jaccard("Bež stol", "Roza stol") < 0.88);
    }
}
