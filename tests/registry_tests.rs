use waf_evader::registry::{AttackType, Category, TechniqueId, TechniqueRegistry, FALLBACK_TECHNIQUES};

#[test]
fn test_unknown_attack_type_falls_back() {
    let registry = TechniqueRegistry::global();
    let (list, exists) = registry.applicable_techniques("not-a-real-type");
    assert!(!exists);
    assert_eq!(list, &[TechniqueId::Base64, TechniqueId::Hex, TechniqueId::Unicode]);
    assert_eq!(list, &FALLBACK_TECHNIQUES);
}

#[test]
fn test_lookups_are_idempotent() {
    let registry = TechniqueRegistry::global();
    let first = registry.applicable_techniques("xss").0.to_vec();
    let second = registry.applicable_techniques("xss").0.to_vec();
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn test_every_attack_type_is_known_and_unique() {
    let registry = TechniqueRegistry::global();
    for attack in AttackType::ALL {
        let (list, exists) = registry.applicable_techniques(attack.name());
        assert!(exists, "{} missing", attack);
        let mut seen = std::collections::HashSet::new();
        for t in list {
            assert!(seen.insert(*t), "{} listed twice for {}", t, attack);
        }
    }
}

#[test]
fn test_aliases_resolve_to_canonical_lists() {
    let registry = TechniqueRegistry::global();
    assert_eq!(
        registry.applicable_techniques("SQL_INJECTION").0,
        registry.applicable_techniques("sqli").0
    );
    assert!(registry.applicable_techniques("lfi").1);
}

#[test]
fn test_categories() {
    let registry = TechniqueRegistry::global();
    assert_eq!(registry.category(TechniqueId::Hex), Category::Encoder);
    assert_eq!(registry.category(TechniqueId::UnixCommand), Category::Command);
    assert_eq!(registry.category(TechniqueId::PathTraversal), Category::Path);
    assert!(registry.is_applicable("path-traversal", TechniqueId::PathTraversal));
    assert!(!registry.is_applicable("xss", TechniqueId::UnixCommand));
}

#[test]
fn test_substitute_table() {
    let registry = TechniqueRegistry::from_table(vec![(
        "Tiny",
        vec![TechniqueId::Url, TechniqueId::Hex, TechniqueId::Url],
    )]);
    let (list, exists) = registry.applicable_techniques("tiny");
    assert!(exists);
    assert_eq!(list, &[TechniqueId::Url, TechniqueId::Hex]);
    assert_eq!(registry.applicable_techniques("xss").0, &FALLBACK_TECHNIQUES);
}
