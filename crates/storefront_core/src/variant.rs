//! crates/storefront_core/src/variant.rs
//!
//! The variant resolver: pure derivation logic mapping a partial
//! attribute selection onto a concrete product variant and the effective
//! price/stock/availability a view should render.
//!
//! Every function here is a pure function of its arguments, O(variants *
//! attributes). "No match" is an ordinary `None`, never an error: a
//! selection that cannot resolve leaves checkout disabled, it does not
//! crash a view.

use crate::domain::{Product, Selection, Variant};

/// One attribute key together with every value any variant carries for
/// it. Keys are reported in first-seen scan order, values sorted
/// lexicographically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionGroup {
    pub key: String,
    pub values: Vec<String>,
}

/// Collects the distinct attribute keys and, per key, the distinct values
/// present across all of a product's variants.
pub fn available_options(product: &Product) -> Vec<OptionGroup> {
    let mut groups: Vec<OptionGroup> = Vec::new();
    for variant in &product.variants {
        for attr in &variant.attributes {
            match groups.iter_mut().find(|g| g.key == attr.key) {
                Some(group) => {
                    if !group.values.contains(&attr.value) {
                        group.values.push(attr.value.clone());
                    }
                }
                None => groups.push(OptionGroup {
                    key: attr.key.clone(),
                    values: vec![attr.value.clone()],
                }),
            }
        }
    }
    for group in &mut groups {
        group.values.sort();
    }
    groups
}

/// True if the variant agrees with every selection entry whose key exists
/// on at least one of the product's variants. Selection keys unknown to
/// the product contribute nothing (they are ignored, not errors); a
/// variant that lacks a compared key does not match.
fn variant_matches(variant: &Variant, selection: &Selection, known_keys: &[&str]) -> bool {
    selection
        .entries()
        .filter(|(key, _)| known_keys.contains(key))
        .all(|(key, value)| variant.value_for(key) == Some(value))
}

/// Returns the unique variant consistent with the selection, or `None`
/// when zero or more than one variant matches. Uniqueness of variant
/// attribute mappings is a backend invariant this function does not
/// assume: a duplicated mapping simply yields `None`.
pub fn resolve_variant<'a>(product: &'a Product, selection: &Selection) -> Option<&'a Variant> {
    if !product.has_variants || product.variants.is_empty() {
        return None;
    }
    let known_keys: Vec<&str> = available_options_keys(product);
    let mut matches = product
        .variants
        .iter()
        .filter(|v| variant_matches(v, selection, &known_keys));
    match (matches.next(), matches.next()) {
        (Some(variant), None) => Some(variant),
        _ => None,
    }
}

fn available_options_keys(product: &Product) -> Vec<&str> {
    let mut keys: Vec<&str> = Vec::new();
    for variant in &product.variants {
        for attr in &variant.attributes {
            if !keys.contains(&attr.key.as_str()) {
                keys.push(attr.key.as_str());
            }
        }
    }
    keys
}

/// A selection is complete when every attribute key the product offers
/// carries a non-empty choice and exactly one variant matches. A product
/// without variants is trivially complete (it resolves to base values).
pub fn is_selection_complete(product: &Product, selection: &Selection) -> bool {
    let keys = available_options_keys(product);
    if keys.is_empty() {
        return true;
    }
    let all_chosen = keys
        .iter()
        .all(|key| selection.value_for(key).is_some_and(|v| !v.is_empty()));
    all_chosen && resolve_variant(product, selection).is_some()
}

/// The price a consumer should display: the resolved variant's price, or
/// the product's base price while unresolved.
pub fn effective_price(product: &Product, selection: &Selection) -> i64 {
    match resolve_variant(product, selection) {
        Some(variant) => variant.price,
        None => product.price,
    }
}

/// The stock count to display, with the same fallback rule as
/// [`effective_price`].
pub fn effective_stock(product: &Product, selection: &Selection) -> i32 {
    match resolve_variant(product, selection) {
        Some(variant) => variant.stock,
        None => product.stock,
    }
}

/// Whether the current resolution is purchasable. A resolved variant must
/// be flagged available *and* hold stock; an unresolved product falls
/// back to its base stock.
pub fn is_available(product: &Product, selection: &Selection) -> bool {
    match resolve_variant(product, selection) {
        Some(variant) => variant.available && variant.stock > 0,
        None => product.stock > 0,
    }
}

/// The values still reachable for `key`, given the choices made for all
/// *other* keys. Only variants flagged available contribute, so a view
/// can grey out combinations that cannot be bought. Values come back
/// lexicographically sorted.
pub fn available_values_for(product: &Product, selection: &Selection, key: &str) -> Vec<String> {
    let known_keys: Vec<&str> = available_options_keys(product);
    let mut remaining = Selection::new();
    for (k, v) in selection.entries() {
        if k != key {
            remaining.choose(k, v);
        }
    }
    let mut values: Vec<String> = Vec::new();
    for variant in &product.variants {
        if !variant.available {
            continue;
        }
        if !variant_matches(variant, &remaining, &known_keys) {
            continue;
        }
        if let Some(value) = variant.value_for(key) {
            if !values.iter().any(|v| v.as_str() == value) {
                values.push(value.to_string());
            }
        }
    }
    values.sort();
    values
}

/// Convenience policy: when an option group offers exactly one value,
/// pre-select it. Uses [`Selection::fill_default`], so an explicit user
/// choice is never overridden and repeat calls are no-ops.
pub fn fill_single_value_options(product: &Product, selection: &mut Selection) {
    for group in available_options(product) {
        if let [value] = group.values.as_slice() {
            selection.fill_default(group.key, value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AttributeValue;
    use uuid::Uuid;

    fn variant(attrs: &[(&str, &str)], price: i64, stock: i32, available: bool) -> Variant {
        Variant {
            id: Uuid::new_v4(),
            attributes: attrs
                .iter()
                .map(|(k, v)| AttributeValue::new(*k, *v))
                .collect(),
            price,
            stock,
            available,
        }
    }

    fn product(variants: Vec<Variant>) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Shirt".to_string(),
            price: 90,
            stock: 3,
            has_variants: !variants.is_empty(),
            variants,
        }
    }

    fn shirt() -> Product {
        // Scenario from the product detail view: two sizes of one color,
        // the large one out of stock.
        product(vec![
            variant(&[("color", "red"), ("size", "M")], 100, 5, true),
            variant(&[("color", "red"), ("size", "L")], 110, 0, true),
        ])
    }

    #[test]
    fn base_product_ignores_resolution() {
        let p = product(vec![]);
        let s = Selection::new();
        assert!(resolve_variant(&p, &s).is_none());
        assert!(is_selection_complete(&p, &s));
        assert_eq!(effective_price(&p, &s), 90);
        assert_eq!(effective_stock(&p, &s), 3);
        assert!(is_available(&p, &s));
    }

    #[test]
    fn option_groups_first_seen_keys_sorted_values() {
        let p = shirt();
        let groups = available_options(&p);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, "color");
        assert_eq!(groups[0].values, vec!["red"]);
        assert_eq!(groups[1].key, "size");
        // Lexicographic, not insertion, order for values.
        assert_eq!(groups[1].values, vec!["L", "M"]);
    }

    #[test]
    fn empty_selection_on_multi_variant_product_is_no_match() {
        let p = shirt();
        let s = Selection::new();
        assert!(resolve_variant(&p, &s).is_none());
        assert!(!is_selection_complete(&p, &s));
        // Effective values fall back to the base product meanwhile.
        assert_eq!(effective_price(&p, &s), 90);
    }

    #[test]
    fn full_selection_resolves_to_variant_values() {
        let p = shirt();
        let mut s = Selection::new();
        s.choose("color", "red");
        s.choose("size", "M");
        let v = resolve_variant(&p, &s).expect("unique match");
        assert_eq!(v.price, 100);
        assert!(is_selection_complete(&p, &s));
        assert_eq!(effective_price(&p, &s), 100);
        assert_eq!(effective_stock(&p, &s), 5);
        assert!(is_available(&p, &s));
    }

    #[test]
    fn zero_stock_variant_resolves_but_is_unavailable() {
        let p = shirt();
        let mut s = Selection::new();
        s.choose("color", "red");
        s.choose("size", "L");
        assert!(resolve_variant(&p, &s).is_some());
        assert!(is_selection_complete(&p, &s));
        assert!(!is_available(&p, &s));
    }

    #[test]
    fn reachable_values_include_out_of_stock_but_flagged_available() {
        let p = shirt();
        let mut s = Selection::new();
        s.choose("color", "red");
        // L has zero stock but is flagged available, so it is still listed.
        assert_eq!(available_values_for(&p, &s, "size"), vec!["L", "M"]);
    }

    #[test]
    fn unavailable_variants_do_not_contribute_values() {
        let p = product(vec![
            variant(&[("color", "red"), ("size", "M")], 100, 5, true),
            variant(&[("color", "red"), ("size", "L")], 110, 4, false),
        ]);
        let mut s = Selection::new();
        s.choose("color", "red");
        assert_eq!(available_values_for(&p, &s, "size"), vec!["M"]);
    }

    #[test]
    fn unknown_selection_key_is_ignored() {
        let p = shirt();
        let mut s = Selection::new();
        s.choose("color", "red");
        s.choose("size", "M");
        s.choose("material", "wool");
        // "material" exists on no variant, so it must not block the match.
        assert!(resolve_variant(&p, &s).is_some());
    }

    #[test]
    fn duplicated_attribute_mappings_degrade_to_no_match() {
        // Violates the backend uniqueness invariant on purpose.
        let p = product(vec![
            variant(&[("color", "red")], 100, 5, true),
            variant(&[("color", "red")], 120, 2, true),
        ]);
        let mut s = Selection::new();
        s.choose("color", "red");
        assert!(resolve_variant(&p, &s).is_none());
        assert!(!is_selection_complete(&p, &s));
        assert_eq!(effective_price(&p, &s), 90);
    }

    #[test]
    fn partial_variant_key_coverage_does_not_match() {
        // One variant lacks the "size" key entirely.
        let p = product(vec![
            variant(&[("color", "red")], 100, 5, true),
            variant(&[("color", "red"), ("size", "M")], 110, 5, true),
        ]);
        let mut s = Selection::new();
        s.choose("color", "red");
        s.choose("size", "M");
        let v = resolve_variant(&p, &s).expect("only the keyed variant matches");
        assert_eq!(v.price, 110);
    }

    #[test]
    fn single_value_groups_auto_fill_without_overriding() {
        let p = shirt();
        let mut s = Selection::new();
        fill_single_value_options(&p, &mut s);
        // "color" has one value, "size" has two.
        assert_eq!(s.value_for("color"), Some("red"));
        assert_eq!(s.value_for("size"), None);

        // An explicit choice survives a repeat fill.
        let mut s = Selection::new();
        s.choose("color", "blue");
        fill_single_value_options(&p, &mut s);
        fill_single_value_options(&p, &mut s);
        assert_eq!(s.value_for("color"), Some("blue"));
    }
}
