use std::collections::BTreeMap;

use crate::{
    constants::SHOPPING_LIST_HEADER,
    schema::CartPart,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Sums amounts per (name, unit), ordered by name.
pub fn aggregate(parts: Vec<CartPart>) -> Vec<ShoppingItem> {
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for part in parts {
        *totals
            .entry((part.name, part.measurement_unit))
            .or_default() += i64::from(part.amount);
    }

    totals
        .into_iter()
        .map(|((name, measurement_unit), amount)| ShoppingItem {
            name,
            measurement_unit,
            amount,
        })
        .collect()
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn render(items: &[ShoppingItem]) -> String {
    let mut list = String::from(SHOPPING_LIST_HEADER);
    for item in items {
        list.push_str(&format!(
            "\n* {} ({}) — {}",
            capitalize(&item.name),
            item.measurement_unit,
            item.amount
        ));
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(name: &str, unit: &str, amount: i32) -> CartPart {
        CartPart {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn shared_ingredients_are_summed() {
        // Two recipes, both calling for sugar.
        let items = aggregate(vec![
            part("sugar", "g", 100),
            part("flour", "g", 250),
            part("sugar", "g", 50),
        ]);

        assert_eq!(
            items,
            vec![
                ShoppingItem {
                    name: "flour".to_string(),
                    measurement_unit: "g".to_string(),
                    amount: 250,
                },
                ShoppingItem {
                    name: "sugar".to_string(),
                    measurement_unit: "g".to_string(),
                    amount: 150,
                },
            ]
        );
    }

    #[test]
    fn units_are_kept_apart() {
        let items = aggregate(vec![part("milk", "ml", 200), part("milk", "cup", 1)]);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn large_totals_do_not_overflow() {
        let items = aggregate(vec![part("salt", "g", i32::MAX), part("salt", "g", i32::MAX)]);
        assert_eq!(items[0].amount, 2 * i64::from(i32::MAX));
    }

    #[test]
    fn renders_capitalized_lines() {
        let items = aggregate(vec![part("eggs", "pcs", 3), part("ёлка", "g", 1)]);
        assert_eq!(
            render(&items),
            "Shopping list:\n* Eggs (pcs) — 3\n* Ёлка (g) — 1"
        );
    }

    #[test]
    fn empty_list_is_just_the_header() {
        assert_eq!(render(&[]), SHOPPING_LIST_HEADER);
    }
}
