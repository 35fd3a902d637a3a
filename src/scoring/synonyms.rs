//! Curated synonym groups for the lexical fallback scorer.
//!
//! A group matches when the query contains at least one of its terms and
//! the document contains at least one (possibly different) term of the same
//! group. Terms are lowercase phrases compared against text normalised by
//! [`normalise_for_matching`](crate::text::normalise_for_matching).

/// Medical and study-design synonym groups.
pub const SYNONYM_GROUPS: &[&[&str]] = &[
    &["hypertension", "high blood pressure", "elevated blood pressure", "htn"],
    &["hypotension", "low blood pressure"],
    &["diabetes", "diabetes mellitus", "t2dm", "t1dm", "hyperglycemia", "high blood sugar"],
    &["myocardial infarction", "heart attack", "mi", "acute coronary syndrome"],
    &["stroke", "cerebrovascular accident", "cva", "brain attack"],
    &["heart failure", "cardiac failure", "congestive heart failure", "chf"],
    &["atrial fibrillation", "afib", "af"],
    &["cancer", "carcinoma", "malignancy", "neoplasm", "tumor", "tumour"],
    &["tuberculosis", "tb", "mycobacterium tuberculosis"],
    &["malaria", "plasmodium"],
    &["dengue", "dengue fever"],
    &["pneumonia", "lung infection", "lower respiratory tract infection"],
    &["copd", "chronic obstructive pulmonary disease", "emphysema", "chronic bronchitis"],
    &["asthma", "bronchial asthma", "reactive airway disease"],
    &["kidney disease", "renal disease", "nephropathy", "ckd", "renal failure", "kidney failure"],
    &["obesity", "overweight", "high bmi"],
    &["depression", "major depressive disorder", "depressive disorder", "mdd"],
    &["anxiety", "anxiety disorder", "generalized anxiety disorder"],
    &["hyperlipidemia", "dyslipidemia", "high cholesterol", "hypercholesterolemia"],
    &["anemia", "anaemia", "low hemoglobin"],
    &["sepsis", "septicemia", "blood poisoning"],
    &["infection", "infectious disease"],
    &["pain", "analgesia", "ache"],
    &["fever", "pyrexia", "febrile"],
    &["pregnancy", "pregnant", "gestation", "antenatal", "prenatal"],
    &["children", "child", "pediatric", "paediatric", "infants", "infant"],
    &["elderly", "older adults", "geriatric", "aged"],
    &["treatment", "therapy", "management", "intervention", "therapeutic"],
    &["prevention", "prophylaxis", "preventive"],
    &["diagnosis", "diagnostic", "screening", "detection"],
    &["mortality", "death", "survival", "fatality"],
    &["adverse events", "side effects", "adverse effects", "toxicity", "adverse reactions"],
    &["efficacy", "effectiveness", "benefit"],
    &["dose", "dosage", "dosing"],
    &["drug", "medication", "medicine", "pharmacotherapy"],
    &["antibiotic", "antibiotics", "antimicrobial", "antibacterial"],
    &["vaccine", "vaccination", "immunization", "immunisation"],
    &["surgery", "surgical", "operation", "operative"],
    &["randomized controlled trial", "rct", "randomised controlled trial", "randomized trial"],
    &["meta analysis", "systematic review", "pooled analysis"],
    &["guideline", "guidelines", "recommendation", "recommendations", "consensus statement"],
];

/// Returns `true` if `normalised` (padded, lowercase text) contains `term`
/// as a whole phrase.
pub fn contains_term(normalised: &str, term: &str) -> bool {
    let needle = format!(" {term} ");
    normalised.contains(&needle)
}

/// Number of synonym groups matched by both `query` and `text`.
///
/// Both arguments must already be normalised for matching.
pub fn matched_groups(normalised_query: &str, normalised_text: &str) -> usize {
    SYNONYM_GROUPS
        .iter()
        .filter(|group| {
            group.iter().any(|t| contains_term(normalised_query, t))
                && group.iter().any(|t| contains_term(normalised_text, t))
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::normalise_for_matching;

    #[test]
    fn groups_are_lowercase_and_non_empty() {
        for group in SYNONYM_GROUPS {
            assert!(group.len() >= 2);
            for term in *group {
                assert_eq!(*term, term.to_lowercase());
                assert!(!term.trim().is_empty());
            }
        }
    }

    #[test]
    fn phrase_match_across_terms() {
        let q = normalise_for_matching("hypertension treatment");
        let d = normalise_for_matching("High blood pressure management");
        assert_eq!(matched_groups(&q, &d), 2);
    }

    #[test]
    fn whole_word_only() {
        let q = normalise_for_matching("af outcomes");
        let d = normalise_for_matching("after the trial");
        assert_eq!(matched_groups(&q, &d), 0);
    }

    #[test]
    fn no_match_when_only_one_side_has_group() {
        let q = normalise_for_matching("malaria");
        let d = normalise_for_matching("weather report");
        assert_eq!(matched_groups(&q, &d), 0);
    }
}
