use std::collections::BTreeMap;

use serde::Serialize;

use super::{error::Error, schema::ShoppingRow};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Sums amounts per (name, measurement unit). The same name with another
/// unit is a separate line. Sorted by name, then unit.
pub fn aggregate<I>(rows: I) -> Vec<ShoppingListItem>
where
    I: IntoIterator<Item = ShoppingRow>,
{
    let mut groups: BTreeMap<(String, String), i64> = BTreeMap::new();
    for row in rows {
        *groups.entry((row.name, row.measurement_unit)).or_insert(0) += i64::from(row.amount);
    }

    groups
        .into_iter()
        .map(|((name, measurement_unit), amount)| ShoppingListItem {
            name,
            measurement_unit,
            amount,
        })
        .collect()
}

pub fn render(username: &str, items: &[ShoppingListItem]) -> Result<String, Error> {
    if items.is_empty() {
        return Err(Error::EmptyShoppingList);
    }

    let mut document = format!("Shopping list for user {username}\n\n");
    for (i, item) in items.iter().enumerate() {
        document += &format!(
            "{}. {} ({}) - {}\n",
            i + 1,
            item.name,
            item.measurement_unit,
            item.amount
        );
    }

    Ok(document)
}

/// The text attachment handed to the download response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListDocument {
    pub filename: &'static str,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, unit: &str, amount: i32) -> ShoppingRow {
        ShoppingRow {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn sums_amounts_across_recipes() {
        // recipe A: Salt 10g, Flour 200g; recipe B: Salt 5g, Sugar 50g
        let items = aggregate(vec![
            row("Salt", "g", 10),
            row("Flour", "g", 200),
            row("Salt", "g", 5),
            row("Sugar", "g", 50),
        ]);

        assert_eq!(items.len(), 3);
        let total = |name: &str| items.iter().find(|i| i.name == name).map(|i| i.amount);
        assert_eq!(total("Salt"), Some(15));
        assert_eq!(total("Flour"), Some(200));
        assert_eq!(total("Sugar"), Some(50));
    }

    #[test]
    fn different_units_stay_apart() {
        let items = aggregate(vec![row("Milk", "ml", 200), row("Milk", "cup", 1)]);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn sums_do_not_overflow_i32() {
        let items = aggregate(vec![row("Water", "ml", i32::MAX), row("Water", "ml", 1)]);
        assert_eq!(items[0].amount, i64::from(i32::MAX) + 1);
    }

    #[test]
    fn renders_numbered_lines() {
        let items = aggregate(vec![row("Salt", "g", 15), row("Flour", "g", 200)]);
        let document = render("chef", &items).unwrap();

        assert_eq!(
            document,
            "Shopping list for user chef\n\n1. Flour (g) - 200\n2. Salt (g) - 15\n"
        );
    }

    #[test]
    fn empty_list_is_an_error() {
        assert!(matches!(
            render("chef", &aggregate(vec![])),
            Err(Error::EmptyShoppingList)
        ));
    }
}
