//! Metadata-derived quality boosts for documents and chunks.
//!
//! Document boost:
//!
//! ```text
//! raw   = 0.30 * authority + 0.30 * publication_type + 0.15 * journal_tier
//!       + 0.20 * recency + 0.05 * full_text
//! boost = clamp(raw / DOCUMENT_MAX, 0, 1)
//! ```
//!
//! Chunk boost:
//!
//! ```text
//! raw   = 0.35 * authority + 0.40 * section + 0.25 * recency
//! boost = clamp(raw / CHUNK_MAX, 0, 1)
//! ```
//!
//! Every lookup table is plain data with one default for unrecognised
//! input. Unknown or malformed metadata never errors; it scores zero (or
//! the table default).

use chrono::Datelike;

use crate::types::{Candidate, Chunk, Metadata};

const AUTHORITY_WEIGHT: f64 = 0.30;
const PUBLICATION_TYPE_WEIGHT: f64 = 0.30;
const JOURNAL_WEIGHT: f64 = 0.15;
const RECENCY_WEIGHT: f64 = 0.20;
const FULL_TEXT_WEIGHT: f64 = 0.05;

/// Maximum attainable raw document boost.
pub const DOCUMENT_MAX: f64 =
    AUTHORITY_WEIGHT + PUBLICATION_TYPE_WEIGHT + JOURNAL_WEIGHT + RECENCY_WEIGHT + FULL_TEXT_WEIGHT;

const CHUNK_AUTHORITY_WEIGHT: f64 = 0.35;
const CHUNK_SECTION_WEIGHT: f64 = 0.40;
const CHUNK_RECENCY_WEIGHT: f64 = 0.25;

/// Maximum attainable raw chunk boost.
pub const CHUNK_MAX: f64 = CHUNK_AUTHORITY_WEIGHT + CHUNK_SECTION_WEIGHT + CHUNK_RECENCY_WEIGHT;

/// Authority of each known source tag. Matched case-insensitively.
///
/// The priority source is listed at the same weight as any other national
/// guideline body; its preference is applied elsewhere, once.
pub const SOURCE_AUTHORITY: &[(&str, f64)] = &[
    ("indian_guidelines", 0.95),
    ("guidelines", 0.95),
    ("cochrane", 0.95),
    ("pmc_fulltext", 0.85),
    ("dailymed", 0.85),
    ("pubmed", 0.80),
    ("europe_pmc", 0.80),
    ("clinical_trials", 0.75),
    ("semantic_scholar", 0.70),
    ("openalex", 0.65),
    ("tavily_web", 0.40),
    ("web", 0.35),
];

/// Authority for source tags missing from [`SOURCE_AUTHORITY`].
pub const DEFAULT_AUTHORITY: f64 = 0.50;

/// Publication-type patterns in priority order. The first pattern found as
/// a substring of any publication-type field wins.
pub const PUBLICATION_TYPES: &[(&str, f64)] = &[
    ("systematic review", 1.0),
    ("meta-analysis", 1.0),
    ("meta analysis", 1.0),
    ("guideline", 0.95),
    ("randomized controlled trial", 0.85),
    ("randomised controlled trial", 0.85),
    ("clinical trial", 0.75),
    ("review", 0.60),
    ("cohort", 0.50),
    ("case-control", 0.40),
    ("case control", 0.40),
    ("case report", 0.20),
];

/// Metadata keys holding free-text publication types.
pub const PUBLICATION_TYPE_FIELDS: &[&str] = &[
    "publication_types",
    "publication_type",
    "article_type",
    "study_type",
    "pub_types",
];

/// How a journal table entry is compared with a normalised journal name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalMatch {
    /// The entry may appear as a whole phrase anywhere in the name.
    Phrase,
    /// The entry must be the entire name (ignoring a leading "the" and any
    /// parenthetical qualifier). Used for short names that also occur as
    /// words inside other journal titles.
    Exact,
}

/// Tier-1 journals (full journal weight).
pub const TIER_ONE_JOURNALS: &[(&str, JournalMatch)] = &[
    ("new england journal of medicine", JournalMatch::Phrase),
    ("nejm", JournalMatch::Exact),
    ("lancet", JournalMatch::Exact),
    ("jama", JournalMatch::Exact),
    ("bmj", JournalMatch::Exact),
    ("nature medicine", JournalMatch::Phrase),
    ("annals of internal medicine", JournalMatch::Phrase),
    ("cochrane database of systematic reviews", JournalMatch::Phrase),
];

/// Tier-2 journals (half journal weight).
pub const TIER_TWO_JOURNALS: &[(&str, JournalMatch)] = &[
    ("plos medicine", JournalMatch::Phrase),
    ("bmc medicine", JournalMatch::Phrase),
    ("circulation", JournalMatch::Exact),
    ("journal of clinical oncology", JournalMatch::Phrase),
    ("diabetes care", JournalMatch::Phrase),
    ("chest", JournalMatch::Exact),
    ("gut", JournalMatch::Exact),
    ("thorax", JournalMatch::Exact),
    ("hypertension", JournalMatch::Exact),
];

/// Metadata keys holding the journal name.
pub const JOURNAL_FIELDS: &[&str] = &["journal", "journal_title", "venue"];

/// Metadata keys searched, in order, for a publication year.
pub const YEAR_FIELDS: &[&str] = &[
    "year",
    "publication_year",
    "pub_year",
    "pub_date",
    "publication_date",
    "date",
    "published",
];

/// Recency buckets: `(max age in years, weight)`.
pub const RECENCY_BUCKETS: &[(i32, f64)] = &[(1, 1.0), (2, 0.85), (3, 0.70), (5, 0.50), (10, 0.25)];

/// Section-label patterns in priority order.
pub const SECTION_WEIGHTS: &[(&str, f64)] = &[
    ("result", 1.0),
    ("conclusion", 0.90),
    ("discussion", 0.75),
    ("abstract", 0.60),
    ("method", 0.40),
    ("introduction", 0.30),
];

/// Weight for section labels matching nothing in [`SECTION_WEIGHTS`].
pub const DEFAULT_SECTION_WEIGHT: f64 = 0.50;

/// The current calendar year from the system clock.
pub fn current_year() -> i32 {
    chrono::Utc::now().year()
}

/// Authority weight for a source tag.
pub fn source_authority(source: &str) -> f64 {
    SOURCE_AUTHORITY
        .iter()
        .find(|(tag, _)| source.eq_ignore_ascii_case(tag))
        .map_or(DEFAULT_AUTHORITY, |(_, w)| *w)
}

/// Publication-type weight, or 0.0 when no field matches.
pub fn publication_type_weight(metadata: &Metadata) -> f64 {
    let values = string_values(metadata, PUBLICATION_TYPE_FIELDS);
    PUBLICATION_TYPES
        .iter()
        .find(|(pattern, _)| values.iter().any(|v| v.contains(pattern)))
        .map_or(0.0, |(_, w)| *w)
}

/// Journal tier weight: 1.0 for tier 1, 0.5 for tier 2, else 0.0.
///
/// Journal names are compared as normalised whole phrases, so `gut` never
/// matches `gastroenterology`. Short names must match the entire journal
/// name, so `Journal of Hypertension` is not the tier-2 `Hypertension`.
pub fn journal_tier_weight(metadata: &Metadata) -> f64 {
    let journals: Vec<String> = string_values(metadata, JOURNAL_FIELDS)
        .iter()
        .map(|j| normalise_journal(j))
        .collect();
    let matches = |list: &[(&str, JournalMatch)]| {
        list.iter().any(|(name, mode)| {
            let needle = format!(" {name} ");
            journals.iter().any(|j| match mode {
                JournalMatch::Phrase => j.contains(&needle),
                JournalMatch::Exact => *j == needle,
            })
        })
    };
    if matches(TIER_ONE_JOURNALS) {
        1.0
    } else if matches(TIER_TWO_JOURNALS) {
        0.5
    } else {
        0.0
    }
}

/// Normalised journal name without a parenthetical qualifier or leading
/// "the", e.g. `The Lancet (London, England)` becomes ` lancet `.
fn normalise_journal(journal: &str) -> String {
    let base = journal.split('(').next().unwrap_or(journal);
    let normalised = crate::text::normalise_for_matching(base);
    match normalised.strip_prefix(" the ") {
        Some(rest) if !rest.is_empty() => format!(" {rest}"),
        _ => normalised,
    }
}

/// First plausible publication year found across [`YEAR_FIELDS`].
///
/// Years outside `1800..=reference_year + 1` are skipped.
pub fn extract_year(metadata: &Metadata, reference_year: i32) -> Option<i32> {
    let plausible = |y: i32| (1800..=reference_year.saturating_add(1)).contains(&y);
    YEAR_FIELDS.iter().find_map(|field| {
        let value = metadata.get(*field)?;
        year_from_value(value).filter(|y| plausible(*y))
    })
}

fn year_from_value(value: &serde_json::Value) -> Option<i32> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .and_then(|y| i32::try_from(y).ok()),
        serde_json::Value::String(s) => first_four_digit_run(s),
        serde_json::Value::Array(items) => items.iter().find_map(year_from_value),
        _ => None,
    }
}

/// Parse the first run of exactly four ASCII digits.
fn first_four_digit_run(s: &str) -> Option<i32> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i - start == 4 {
                return s[start..i].parse().ok();
            }
        } else {
            i += 1;
        }
    }
    None
}

/// Recency weight from discrete age buckets. Future years count as age 0.
pub fn recency_weight(year: Option<i32>, reference_year: i32) -> f64 {
    let Some(year) = year else {
        return 0.0;
    };
    let age = reference_year.saturating_sub(year).max(0);
    RECENCY_BUCKETS
        .iter()
        .find(|(max_age, _)| age <= *max_age)
        .map_or(0.0, |(_, w)| *w)
}

/// Weight of a section label (substring match, case-insensitive).
pub fn section_weight(section: &str) -> f64 {
    let lower = section.to_lowercase();
    SECTION_WEIGHTS
        .iter()
        .find(|(pattern, _)| lower.contains(pattern))
        .map_or(DEFAULT_SECTION_WEIGHT, |(_, w)| *w)
}

/// Document-level quality boost in [0, 1].
pub fn document_boost(candidate: &Candidate, reference_year: i32) -> f64 {
    let year = extract_year(&candidate.metadata, reference_year);
    let full_text = if candidate.full_text_available { 1.0 } else { 0.0 };
    let raw = AUTHORITY_WEIGHT * source_authority(&candidate.source)
        + PUBLICATION_TYPE_WEIGHT * publication_type_weight(&candidate.metadata)
        + JOURNAL_WEIGHT * journal_tier_weight(&candidate.metadata)
        + RECENCY_WEIGHT * recency_weight(year, reference_year)
        + FULL_TEXT_WEIGHT * full_text;
    (raw / DOCUMENT_MAX).clamp(0.0, 1.0)
}

/// Chunk-level quality boost in [0, 1].
pub fn chunk_boost(chunk: &Chunk, reference_year: i32) -> f64 {
    let year = extract_year(&chunk.metadata, reference_year);
    let raw = CHUNK_AUTHORITY_WEIGHT * source_authority(&chunk.source)
        + CHUNK_SECTION_WEIGHT * section_weight(&chunk.section)
        + CHUNK_RECENCY_WEIGHT * recency_weight(year, reference_year);
    (raw / CHUNK_MAX).clamp(0.0, 1.0)
}

/// Lowercased string values of the given fields. Arrays contribute each
/// string element; other value types are ignored.
fn string_values(metadata: &Metadata, fields: &[&str]) -> Vec<String> {
    let mut out = Vec::new();
    for field in fields {
        match metadata.get(*field) {
            Some(serde_json::Value::String(s)) => out.push(s.to_lowercase()),
            Some(serde_json::Value::Array(items)) => out.extend(
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(str::to_lowercase),
            ),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const YEAR: i32 = 2025;

    fn meta(pairs: &[(&str, serde_json::Value)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn chunk(source: &str, section: &str, metadata: Metadata) -> Chunk {
        Chunk {
            source: source.into(),
            id: "1".into(),
            title: "T".into(),
            text: "text".into(),
            metadata,
            section: section.into(),
            chunk_index: 0,
            doc_score: 0.5,
        }
    }

    #[test]
    fn maxima_are_one() {
        assert!((DOCUMENT_MAX - 1.0).abs() < 1e-9);
        assert!((CHUNK_MAX - 1.0).abs() < 1e-9);
    }

    #[test]
    fn authority_lookup_and_default() {
        assert!((source_authority("pubmed") - 0.80).abs() < f64::EPSILON);
        assert!((source_authority("PubMed") - 0.80).abs() < f64::EPSILON);
        assert!((source_authority("unknown_source") - DEFAULT_AUTHORITY).abs() < f64::EPSILON);
    }

    #[test]
    fn publication_type_priority_order() {
        let m = meta(&[(
            "publication_types",
            json!(["Journal Article", "Systematic Review", "Review"]),
        )]);
        assert!((publication_type_weight(&m) - 1.0).abs() < f64::EPSILON);

        let rct = meta(&[("publication_type", json!("Randomized Controlled Trial"))]);
        assert!((publication_type_weight(&rct) - 0.85).abs() < f64::EPSILON);

        let report = meta(&[("article_type", json!("case report"))]);
        assert!((publication_type_weight(&report) - 0.20).abs() < f64::EPSILON);
    }

    #[test]
    fn publication_type_ordering_is_strict() {
        let weights: Vec<f64> = [
            "systematic review",
            "practice guideline",
            "randomized controlled trial",
            "clinical trial",
            "review",
            "cohort study",
            "case-control study",
            "case report",
        ]
        .iter()
        .map(|t| publication_type_weight(&meta(&[("publication_type", json!(t))])))
        .collect();
        for pair in weights.windows(2) {
            assert!(pair[0] > pair[1], "{weights:?}");
        }
    }

    #[test]
    fn journal_tiers() {
        let tier = |field: &str, name: &str| journal_tier_weight(&meta(&[(field, json!(name))]));
        assert!((tier("journal", "The Lancet") - 1.0).abs() < f64::EPSILON);
        assert!((tier("journal", "Lancet (London, England)") - 1.0).abs() < f64::EPSILON);
        assert!((tier("venue", "Diabetes Care") - 0.5).abs() < f64::EPSILON);
        assert!((tier("journal", "Hypertension") - 0.5).abs() < f64::EPSILON);
        assert!(tier("journal", "Local Bulletin").abs() < f64::EPSILON);
        assert!(tier("journal", "Gastroenterology").abs() < f64::EPSILON);
    }

    #[test]
    fn short_journal_names_do_not_match_inside_longer_titles() {
        let tier = |name: &str| journal_tier_weight(&meta(&[("journal", json!(name))]));
        assert!(tier("Journal of Hypertension").abs() < f64::EPSILON);
        assert!(tier("Gut Microbes").abs() < f64::EPSILON);
        assert!(tier("Chest Surgery Clinics").abs() < f64::EPSILON);
        assert!(tier("JAMA Network Open").abs() < f64::EPSILON);
        assert!(tier("Journal of the American Medical Association (JAMA)").abs() < f64::EPSILON);
        assert!((tier("The New England Journal of Medicine") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn year_from_first_parseable_field() {
        let m = meta(&[
            ("year", json!("unknown")),
            ("pub_date", json!("2019 Mar 15")),
            ("date", json!("2024-01-01")),
        ]);
        assert_eq!(extract_year(&m, YEAR), Some(2019));
    }

    #[test]
    fn year_from_number_and_array() {
        assert_eq!(extract_year(&meta(&[("year", json!(2021))]), YEAR), Some(2021));
        assert_eq!(extract_year(&meta(&[("year", json!(2021.0))]), YEAR), Some(2021));
        assert_eq!(
            extract_year(&meta(&[("published", json!(["n/a", "2018-05"]))]), YEAR),
            Some(2018)
        );
    }

    #[test]
    fn implausible_years_are_skipped() {
        let m = meta(&[("year", json!(1066)), ("date", json!("PMID 123456789 in 2020"))]);
        assert_eq!(extract_year(&m, YEAR), Some(2020));
        assert_eq!(extract_year(&meta(&[("year", json!(3000))]), YEAR), None);
    }

    #[test]
    fn recency_buckets() {
        assert!((recency_weight(Some(2025), YEAR) - 1.0).abs() < f64::EPSILON);
        assert!((recency_weight(Some(2024), YEAR) - 1.0).abs() < f64::EPSILON);
        assert!((recency_weight(Some(2023), YEAR) - 0.85).abs() < f64::EPSILON);
        assert!((recency_weight(Some(2022), YEAR) - 0.70).abs() < f64::EPSILON);
        assert!((recency_weight(Some(2020), YEAR) - 0.50).abs() < f64::EPSILON);
        assert!((recency_weight(Some(2015), YEAR) - 0.25).abs() < f64::EPSILON);
        assert!(recency_weight(Some(2000), YEAR).abs() < f64::EPSILON);
        assert!(recency_weight(None, YEAR).abs() < f64::EPSILON);
        assert!((recency_weight(Some(2026), YEAR) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn section_ordering() {
        let order = ["Results", "Conclusions", "Discussion", "Abstract", "Methods", "Introduction"];
        let weights: Vec<f64> = order.iter().map(|s| section_weight(s)).collect();
        for pair in weights.windows(2) {
            assert!(pair[0] > pair[1], "{weights:?}");
        }
        assert!((section_weight("appendix") - DEFAULT_SECTION_WEIGHT).abs() < f64::EPSILON);
    }

    #[test]
    fn document_boost_rewards_quality_metadata() {
        let strong = Candidate::new("cochrane", "1", "T", "A")
            .with_metadata("publication_type", json!("Systematic Review"))
            .with_metadata("journal", json!("Cochrane Database of Systematic Reviews"))
            .with_metadata("year", json!(2025))
            .with_full_text_available(true);
        let weak = Candidate::new("web", "2", "T", "A");
        let s = document_boost(&strong, YEAR);
        let w = document_boost(&weak, YEAR);
        assert!(s > w);
        assert!(s <= 1.0 && w >= 0.0);
    }

    #[test]
    fn document_boost_bounded_with_malformed_metadata() {
        let c = Candidate::new("", "", "", "")
            .with_metadata("year", json!({"nested": true}))
            .with_metadata("publication_types", json!(42))
            .with_metadata("journal", json!(null));
        let boost = document_boost(&c, YEAR);
        assert!((0.0..=1.0).contains(&boost));
    }

    #[test]
    fn chunk_boost_prefers_results_over_introduction() {
        let results = chunk("pubmed", "results", Metadata::new());
        let intro = chunk("pubmed", "introduction", Metadata::new());
        assert!(chunk_boost(&results, YEAR) > chunk_boost(&intro, YEAR));
    }

    #[test]
    fn chunk_boost_bounded() {
        let best = chunk(
            "cochrane",
            "results",
            meta(&[("year", json!(YEAR))]),
        );
        let b = chunk_boost(&best, YEAR);
        assert!(b <= 1.0 && b > 0.9);
    }
}
