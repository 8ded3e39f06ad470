//! Additive, explainable scoring of surviving candidates.
//!
//! Rules run in a fixed order (URL product bonuses, token match, color constraints,
//! generic-title penalty) and each contributes a `Reason` with its signed delta.

use crate::textprep::{is_numeric, scrub, words};
use crate::tuning::Tuning;
use crate::urlshape::{detail_slug, has_product_path, numeric_id, UrlShape};
use shopmatch_core::{Candidate, Reason, Rule, ScoredCandidate};
use std::collections::BTreeSet;

const STOPWORDS: &[&str] = &[
    "in", "z", "s", "za", "na", "v", "iz", "ali", "ter", "ki", "je", "od", "do", "po", "pri",
    "k", "o", "the", "and", "with", "for", "of", "a", "an", "to", "by", "or",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ColorFamily {
    White,
    Black,
    Grey,
    Beige,
    Brown,
    Red,
    Pink,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Gold,
    Silver,
}

struct ColorWord {
    family: ColorFamily,
    /// Scrubbed word forms (inflections and English names).
    forms: &'static [&'static str],
}

const PALETTE: &[ColorWord] = &[
    ColorWord {
        family: ColorFamily::White,
        forms: &["bel", "bela", "beli", "belo", "bele", "belih", "white"],
    },
    ColorWord {
        family: ColorFamily::Black,
        forms: &["crn", "crna", "crni", "crno", "crne", "black"],
    },
    ColorWord {
        family: ColorFamily::Grey,
        forms: &[
            "siv", "siva", "sivi", "sivo", "sive", "grey", "gray", "antracit", "antracitna",
            "antracitni", "anthracite",
        ],
    },
    ColorWord {
        family: ColorFamily::Beige,
        forms: &["bez", "beige", "krem", "kremna", "kremni", "kremno", "cream"],
    },
    ColorWord {
        family: ColorFamily::Brown,
        forms: &["rjav", "rjava", "rjavi", "rjavo", "rjave", "brown"],
    },
    ColorWord {
        family: ColorFamily::Red,
        forms: &["rdec", "rdeca", "rdeci", "rdece", "red"],
    },
    ColorWord {
        family: ColorFamily::Pink,
        forms: &["roza", "rozast", "rozasta", "rozasti", "pink"],
    },
    ColorWord {
        family: ColorFamily::Orange,
        forms: &["oranzen", "oranzna", "oranzni", "oranzno", "orange"],
    },
    ColorWord {
        family: ColorFamily::Yellow,
        forms: &["rumen", "rumena", "rumeni", "rumeno", "yellow"],
    },
    ColorWord {
        family: ColorFamily::Green,
        forms: &["zelen", "zelena", "zeleni", "zeleno", "zelene", "green"],
    },
    ColorWord {
        family: ColorFamily::Blue,
        forms: &["moder", "modra", "modri", "modro", "modre", "blue", "navy"],
    },
    ColorWord {
        family: ColorFamily::Purple,
        forms: &["vijolicen", "vijolicna", "vijolicni", "lila", "purple"],
    },
    ColorWord {
        family: ColorFamily::Gold,
        forms: &["zlat", "zlata", "zlati", "zlato", "gold"],
    },
    ColorWord {
        family: ColorFamily::Silver,
        forms: &["srebrn", "srebrna", "srebrni", "srebrno", "silver"],
    },
];

pub fn color_family(word: &str) -> Option<ColorFamily> {
    PALETTE
        .iter()
        .find(|c| c.forms.contains(&word))
        .map(|c| c.family)
}

fn family_present(family: ColorFamily, words: &BTreeSet<String>) -> bool {
    PALETTE
        .iter()
        .filter(|c| c.family == family)
        .flat_map(|c| c.forms.iter())
        .any(|f| words.contains(*f))
}

/// Tokenized query.
///
/// `tokens` drive the token-match and generic-title rules; `colors` are constraint tokens
/// judged only by the color rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryTerms {
    pub tokens: Vec<String>,
    pub colors: Vec<(String, ColorFamily)>,
}

impl QueryTerms {
    /// Lowercase, strip diacritics, split on whitespace, drop stopwords and `site:` scopes,
    /// keep tokens of length >= 2 or purely numeric. Order-preserving, de-duplicated.
    pub fn parse(query: &str) -> Self {
        let unscoped: Vec<&str> = query
            .split_whitespace()
            .filter(|w| !w.to_ascii_lowercase().starts_with("site:"))
            .collect();
        let mut seen = BTreeSet::<String>::new();
        let mut out = Self::default();
        for t in words(&unscoped.join(" ")) {
            if STOPWORDS.contains(&t.as_str()) {
                continue;
            }
            if t.chars().count() < 2 && !is_numeric(&t) {
                continue;
            }
            if !seen.insert(t.clone()) {
                continue;
            }
            match color_family(&t) {
                Some(fam) => out.colors.push((t, fam)),
                None => out.tokens.push(t),
            }
        }
        out
    }

    fn single_color_family(&self) -> Option<ColorFamily> {
        let fams: BTreeSet<ColorFamily> = self.colors.iter().map(|(_, f)| *f).collect();
        if fams.len() == 1 {
            fams.into_iter().next()
        } else {
            None
        }
    }
}

/// Containment in either direction for words; numbers only cover an equal number.
fn title_word_covers(word: &str, token: &str) -> bool {
    if is_numeric(word) || is_numeric(token) {
        return word == token;
    }
    word.contains(token) || token.contains(word)
}

#[derive(Debug, Clone, Default)]
pub struct Scorer {
    tuning: Tuning,
}

impl Scorer {
    pub fn new(tuning: Tuning) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn score(&self, terms: &QueryTerms, candidate: Candidate) -> ScoredCandidate {
        let mut reasons: Vec<Reason> = Vec::new();
        self.product_bonuses(&candidate, &mut reasons);
        self.token_match(terms, &candidate, &mut reasons);
        self.color_constraints(terms, &candidate, &mut reasons);
        self.generic_title(terms, &candidate, &mut reasons);
        let score = reasons.iter().map(|r| r.delta).sum();
        ScoredCandidate {
            candidate,
            score,
            reasons,
        }
    }

    fn product_bonuses(&self, c: &Candidate, reasons: &mut Vec<Reason>) {
        let t = &self.tuning;
        let shape = UrlShape::parse(&c.link);
        if has_product_path(&shape) {
            reasons.push(Reason {
                rule: Rule::ProductPath,
                delta: t.product_path_bonus,
                detail: "/p/ product path segment".to_string(),
            });
        }
        if let Some(id) = numeric_id(&shape, t.numeric_id_min_digits) {
            reasons.push(Reason {
                rule: Rule::NumericId,
                delta: t.numeric_id_bonus,
                detail: format!("numeric product id {id} in URL"),
            });
        }
        if let Some(slug) = detail_slug(&shape, t.detail_slug_min_len) {
            reasons.push(Reason {
                rule: Rule::DetailSlug,
                delta: t.detail_slug_bonus,
                detail: format!("detail-page slug {slug}"),
            });
        }
    }

    fn token_match(&self, terms: &QueryTerms, c: &Candidate, reasons: &mut Vec<Reason>) {
        let t = &self.tuning;
        if terms.tokens.is_empty() {
            return;
        }
        let text = scrub(&format!("{} {}", c.title, c.snippet));
        let mut matched: Vec<&str> = Vec::new();
        let mut points = 0i32;
        for tok in &terms.tokens {
            if !text.contains(tok.as_str()) {
                continue;
            }
            matched.push(tok);
            points += if is_numeric(tok) {
                t.numeric_token_points
            } else if tok.chars().count() >= 3 {
                t.long_token_points
            } else {
                t.short_token_points
            };
        }
        let total = terms.tokens.len();
        if points != 0 {
            reasons.push(Reason {
                rule: Rule::TokenMatch,
                delta: points,
                detail: format!(
                    "matched {}/{} query tokens: {}",
                    matched.len(),
                    total,
                    matched.join(", ")
                ),
            });
        }
        let coverage = matched.len() as f64 / total as f64;
        if coverage >= t.coverage_threshold {
            reasons.push(Reason {
                rule: Rule::TokenCoverage,
                delta: t.coverage_bonus,
                detail: format!("{}/{} query tokens matched", matched.len(), total),
            });
        }
    }

    fn color_constraints(&self, terms: &QueryTerms, c: &Candidate, reasons: &mut Vec<Reason>) {
        let t = &self.tuning;
        if terms.colors.is_empty() {
            return;
        }
        let cand_words: BTreeSet<String> = words(&format!("{} {}", c.title, c.snippet))
            .into_iter()
            .collect();
        for (tok, fam) in &terms.colors {
            if !family_present(*fam, &cand_words) {
                reasons.push(Reason {
                    rule: Rule::MissingColor,
                    delta: t.missing_color_penalty,
                    detail: format!("required color {tok} missing"),
                });
            }
        }
        if let Some(required) = terms.single_color_family() {
            let conflicting: Vec<&str> = cand_words
                .iter()
                .filter(|w| color_family(w).is_some_and(|f| f != required))
                .map(String::as_str)
                .collect();
            if !conflicting.is_empty() {
                reasons.push(Reason {
                    rule: Rule::ColorConflict,
                    delta: t.color_conflict_penalty,
                    detail: format!(
                        "conflicting color {} for required {:?}",
                        conflicting.join(", "),
                        required
                    ),
                });
            }
        }
    }

    fn generic_title(&self, terms: &QueryTerms, c: &Candidate, reasons: &mut Vec<Reason>) {
        let t = &self.tuning;
        if terms.tokens.is_empty() {
            return;
        }
        let title_words: Vec<String> = words(&c.title)
            .into_iter()
            .filter(|w| !STOPWORDS.contains(&w.as_str()))
            .filter(|w| w.chars().count() >= 2 || is_numeric(w))
            .collect();
        let hits = terms
            .tokens
            .iter()
            .filter(|q| {
                title_words.iter().any(|w| title_word_covers(w, q))
            })
            .count();
        let frac = hits as f64 / terms.tokens.len() as f64;
        if frac < t.generic_title_threshold {
            reasons.push(Reason {
                rule: Rule::GenericTitle,
                delta: t.generic_title_penalty,
                detail: format!(
                    "title covers {}/{} query tokens",
                    hits,
                    terms.tokens.len()
                ),
            });
        }
    }
}
