use std::collections::BTreeSet;

use emberpot_game::{
    BundledCatalog, CardType, CatalogContext, CatalogData, CatalogError, CatalogSource,
    SequentialIds,
};

fn bundled() -> CatalogContext {
    CatalogContext::new(BundledCatalog.load_catalog().unwrap()).unwrap()
}

#[test]
fn bundled_catalog_passes_validation() {
    let catalog = bundled();
    assert!(catalog.recipes().len() >= 4);
    assert!(catalog.locations().count() >= 3);
    assert!(!catalog.task_templates().is_empty());
    assert!(!catalog.threat_templates().is_empty());
}

#[test]
fn keys_and_names_form_a_bijection() {
    let catalog = bundled();
    let mut names = BTreeSet::new();
    for key in catalog.keys() {
        let name = catalog.name_for_key(key).unwrap();
        assert!(names.insert(name.to_string()), "duplicate name {name}");
        assert_eq!(catalog.key_for_name(name), Some(key));
    }
    assert!(catalog.key_for_name("Dragon Egg").is_none());
    assert!(catalog.name_for_key("dragon_egg").is_none());
}

#[test]
fn every_key_creates_a_card_with_fresh_identity() {
    let catalog = bundled();
    let mut ids = SequentialIds::default();
    let mut seen = BTreeSet::new();
    for key in catalog.keys() {
        let card = catalog.create_card(key, &mut ids).unwrap();
        assert_eq!(card.key, key);
        assert_ne!(card.card_type(), CardType::Product);
        assert!(seen.insert(card.id));
        if card.is_type(CardType::Food) {
            assert!(card.is_fresh());
            assert!(!card.is_preprocessed());
        }
        if card.is_type(CardType::Tool) {
            assert!(card.has_full_durability());
        }
    }
}

#[test]
fn created_cards_are_independent_copies() {
    let catalog = bundled();
    let mut ids = SequentialIds::default();
    let mut first = catalog.create_card("knife", &mut ids).unwrap();
    first.consume_durability(2);
    let second = catalog.create_card("knife", &mut ids).unwrap();
    assert!(second.has_full_durability());
    assert_ne!(first.id, second.id);
}

#[test]
fn explore_pool_is_deduplicated_union_of_drops() {
    let catalog = bundled();
    let pool = catalog.explore_pool();
    let unique: BTreeSet<&str> = pool.iter().copied().collect();
    assert_eq!(unique.len(), pool.len());
    for location in catalog.locations() {
        for key in catalog.explore_drops(location).unwrap() {
            assert!(unique.contains(key.as_str()));
        }
    }
}

#[test]
fn duplicate_keys_are_rejected() {
    let mut data = CatalogData::minimal();
    let mut copy = data.foods[0].clone();
    copy.name = "Another Tomato".to_string();
    data.foods.push(copy);
    assert!(matches!(
        CatalogContext::new(data),
        Err(CatalogError::DuplicateKey(_))
    ));
}

#[test]
fn dangling_recipe_ingredient_is_rejected() {
    let mut data = CatalogData::minimal();
    data.recipes[0]
        .required_ingredients
        .push("Unicorn".to_string());
    let err = CatalogContext::new(data).unwrap_err();
    assert!(err.to_string().contains("Unicorn"), "{err}");
}

#[test]
fn malformed_json_is_a_parse_error() {
    assert!(matches!(
        CatalogContext::from_json("{ not json"),
        Err(CatalogError::Parse(_))
    ));
}
