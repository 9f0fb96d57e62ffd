//! Property-based tests for address labels and the label configuration.

use addresses::config::LabelConfig;
use addresses::entities::address::{Model, LABEL_ATTRIBUTES};
use chrono::Utc;
use proptest::prelude::*;

fn separator_strategy() -> impl Strategy<Value = String> {
    proptest::sample::select(vec![", ", " - ", " | ", "/", "; "]).prop_map(String::from)
}

// Empty values are generated on purpose; they must never show up in labels
fn value_strategy() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        "[A-Za-z0-9][A-Za-z0-9 ]{0,10}".prop_map(Some),
    ]
}

fn address(street: Option<String>, city: Option<String>, postal_area: Option<String>) -> Model {
    let now = Utc::now();
    Model {
        id: 1,
        addressable_id: 1,
        addressable_type: "company".into(),
        country_id: None,
        is_default: false,
        apartment: None,
        floor: None,
        entry: None,
        building: None,
        building_type: None,
        number: None,
        street,
        street_type: None,
        sub_administrative_area: None,
        city,
        administrative_area: None,
        postal_area,
        obs: None,
        lat: None,
        long: None,
        created_at: now,
        updated_at: now,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn label_never_has_dangling_or_doubled_separators(
        street in value_strategy(),
        city in value_strategy(),
        postal_area in value_strategy(),
        separator in separator_strategy(),
    ) {
        let config = LabelConfig::new(["street", "city", "postal_area"], separator.clone());
        let label = address(street, city, postal_area).label(&config);

        prop_assert!(!label.starts_with(&separator), "leading separator in {:?}", label);
        prop_assert!(!label.ends_with(&separator), "trailing separator in {:?}", label);
        let doubled = format!("{}{}", separator, separator);
        prop_assert!(!label.contains(&doubled), "doubled separator in {:?}", label);
    }

    #[test]
    fn label_keeps_every_present_value_in_order(
        street in value_strategy(),
        city in value_strategy(),
        postal_area in value_strategy(),
        separator in separator_strategy(),
    ) {
        let expected: Vec<String> = [&street, &city, &postal_area]
            .into_iter()
            .filter_map(|value| value.as_deref())
            .filter(|value| !value.is_empty())
            .map(String::from)
            .collect();

        let config = LabelConfig::new(["street", "city", "postal_area"], separator.clone());
        let label = address(street, city, postal_area).label(&config);

        prop_assert_eq!(label, expected.join(&separator));
    }

    #[test]
    fn only_labelable_columns_pass_config_validation(
        attributes in proptest::collection::vec(
            prop_oneof![
                proptest::sample::select(LABEL_ATTRIBUTES.to_vec()).prop_map(String::from),
                "[a-z_]{1,12}",
            ],
            0..6,
        ),
    ) {
        let all_known = attributes.iter().all(|a| LABEL_ATTRIBUTES.contains(&a.as_str()));
        let config = LabelConfig::new(attributes, ", ");

        prop_assert_eq!(config.validate_attributes().is_ok(), all_known);
    }
}
