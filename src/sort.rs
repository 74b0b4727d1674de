//! Ordering of the filtered roster.
use crate::{Schema, Table, Value};
use qu::ick_use::*;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, str::FromStr};

/// The sort options offered to the user.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    /// Keep roster order.
    None,
    /// Raw indicator sum, largest first.
    DiseaseCountDesc,
    CodeAsc,
    CodeDesc,
    AgeAsc,
    AgeDesc,
}

impl Default for SortKey {
    fn default() -> Self {
        SortKey::None
    }
}

impl SortKey {
    pub const ALL: [SortKey; 6] = [
        SortKey::None,
        SortKey::DiseaseCountDesc,
        SortKey::CodeAsc,
        SortKey::CodeDesc,
        SortKey::AgeAsc,
        SortKey::AgeDesc,
    ];

    /// A human-readable label for the option.
    pub fn label(self) -> &'static str {
        use SortKey::*;
        match self {
            None => "None",
            DiseaseCountDesc => "Detected diseases (most first)",
            CodeAsc => "Code ascending",
            CodeDesc => "Code descending",
            AgeAsc => "Age ascending",
            AgeDesc => "Age descending",
        }
    }

    pub fn code(self) -> &'static str {
        use SortKey::*;
        match self {
            None => "none",
            DiseaseCountDesc => "disease-count-desc",
            CodeAsc => "code-asc",
            CodeDesc => "code-desc",
            AgeAsc => "age-asc",
            AgeDesc => "age-desc",
        }
    }

    /// The column to sort on and whether the order is descending.
    fn column(self, schema: &Schema) -> Option<(&str, bool)> {
        use SortKey::*;
        match self {
            None => Option::None,
            DiseaseCountDesc => Some((&*schema.detected_column, true)),
            CodeAsc => Some((&*schema.code_column, false)),
            CodeDesc => Some((&*schema.code_column, true)),
            AgeAsc => Some((&*schema.age_column, false)),
            AgeDesc => Some((&*schema.age_column, true)),
        }
    }
}

impl FromStr for SortKey {
    type Err = Error;
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        SortKey::ALL
            .into_iter()
            .find(|key| key.code() == input)
            .ok_or_else(|| format_err!("unrecognised sort key \"{}\"", input))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Return a copy of `table` ordered by `key`.
///
/// The sort is stable, and missing values go last in both directions. Sorting on a column the
/// table doesn't have (e.g. no age column) leaves the order unchanged.
pub fn sort_roster(table: &Table, key: SortKey, schema: &Schema) -> Table {
    let Some((column, descending)) = key.column(schema) else {
        return table.clone();
    };
    let Some(idx) = table.column_index(column) else {
        event!(Level::DEBUG, "no \"{}\" column, not sorting by {}", column, key);
        return table.clone();
    };
    table.sorted_by(|a, b| compare(&a.cells[idx], &b.cells[idx], descending))
}

fn compare(a: &Value, b: &Value, descending: bool) -> Ordering {
    match (a.is_missing(), b.is_missing()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) if descending => a.sort_cmp(b).reverse(),
        (false, false) => a.sort_cmp(b),
    }
}

#[cfg(test)]
mod test {
    use super::{sort_roster, SortKey};
    use crate::{Schema, Table, Value};

    fn roster() -> Table {
        Table::from_rows(
            ["Code", "Age", "DetectedDiseaseCount"],
            vec![
                vec![Value::from("B2"), Value::from(40.), Value::from(1.)],
                vec![Value::from("A1"), Value::Empty, Value::from(3.)],
                vec![Value::Empty, Value::from(25.), Value::from(1.)],
                vec![Value::from("C3"), Value::from(31.), Value::from(0.)],
            ],
        )
    }

    fn order(table: &Table) -> Vec<usize> {
        table.iter().map(|rec| rec.index).collect()
    }

    #[test]
    fn none_keeps_order() {
        let table = roster();
        assert_eq!(order(&sort_roster(&table, SortKey::None, &Schema::english())), [0, 1, 2, 3]);
    }

    #[test]
    fn code_directions_reverse() {
        let schema = Schema::english();
        let table = roster();
        let asc = sort_roster(&table, SortKey::CodeAsc, &schema);
        let desc = sort_roster(&asc, SortKey::CodeDesc, &schema);
        assert_eq!(order(&asc), [1, 0, 3, 2]);
        // missing code stays last
        assert_eq!(order(&desc), [3, 0, 1, 2]);
    }

    #[test]
    fn disease_count_is_stable() {
        let table = roster();
        let sorted = sort_roster(&table, SortKey::DiseaseCountDesc, &Schema::english());
        assert_eq!(order(&sorted), [1, 0, 2, 3]);
    }

    #[test]
    fn age_without_column_is_noop() {
        let table = roster().drop_columns(|c| c == "Age");
        let sorted = sort_roster(&table, SortKey::AgeDesc, &Schema::english());
        assert_eq!(sorted, table);
        let table = roster();
        let sorted = sort_roster(&table, SortKey::AgeAsc, &Schema::english());
        assert_eq!(order(&sorted), [2, 3, 0, 1]);
    }

    #[test]
    fn parse_keys() {
        for key in SortKey::ALL {
            assert_eq!(key.to_string().parse::<SortKey>().unwrap(), key);
        }
        assert!("sideways".parse::<SortKey>().is_err());
    }
}
