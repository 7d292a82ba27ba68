mod common;

use post_risk::RiskTier;

use common::fixed_classifier;

#[test]
fn similarity_equal_to_threshold_is_not_a_match() {
    let (classifier, _) = fixed_classifier();
    let assessment = classifier.risk().assess("Exactly half.").unwrap();
    assert_eq!(assessment.high_similarity, Some(0.5));
    assert_eq!(assessment.moderate_similarity, Some(0.5));
    assert_eq!(assessment.tier, RiskTier::Low);
}

#[test]
fn similarity_just_above_threshold_matches() {
    let (classifier, _) = fixed_classifier();
    let assessment = classifier.risk().assess("Just over").unwrap();
    let high = assessment.high_similarity.unwrap();
    assert!((high - 0.6).abs() < 1e-5);
    assert_eq!(assessment.tier, RiskTier::High);
}

#[test]
fn high_wins_even_when_moderate_similarity_is_larger() {
    let (classifier, _) = fixed_classifier();
    let assessment = classifier.risk().assess("just over").unwrap();
    assert!(assessment.moderate_similarity.unwrap() > assessment.high_similarity.unwrap());
    assert_eq!(assessment.tier, RiskTier::High);
    let matched = assessment.matched.expect("explained");
    assert_eq!(matched.tier, RiskTier::High);
    assert_eq!(matched.exemplar, "High anchor");
}

#[test]
fn high_sentence_and_moderate_sentence_in_one_document_is_high() {
    let (classifier, _) = fixed_classifier();
    let tier = classifier
        .risk()
        .classify("Moderate only. Calm. Just over!")
        .unwrap();
    assert_eq!(tier, RiskTier::High);
}

#[test]
fn best_sentence_decides_and_is_reported() {
    let (classifier, _) = fixed_classifier();
    let assessment = classifier
        .risk()
        .assess("Calm.\nModerate only. Something else entirely.")
        .unwrap();
    assert_eq!(assessment.tier, RiskTier::Moderate);
    assert_eq!(assessment.sentences, 3);
    let matched = assessment.matched.expect("explained");
    assert_eq!(matched.index, 1);
    assert_eq!(matched.text, "Moderate only.");
    assert!((matched.similarity - 0.8).abs() < 1e-5);
}

#[test]
fn one_backend_call_per_document() {
    let (classifier, backend) = fixed_classifier();
    let before = backend.calls();
    classifier
        .risk()
        .assess("Calm. Moderate only. Exactly half. Just over.")
        .unwrap();
    assert_eq!(backend.calls(), before + 1);
}

#[test]
fn encoding_failure_is_reported_not_swallowed() {
    let (classifier, _) = fixed_classifier();
    let err = classifier.risk().assess("Calm. Poison here.").unwrap_err();
    assert!(err.is_per_document());
}
