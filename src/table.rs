//! Searchable, sortable region/value table.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Search text and sort state of the table view
#[derive(Debug, Clone, Default)]
pub struct TableState {
    pub search: String,
    pub key: SortKey,
    pub order: SortOrder,
}

impl TableState {
    /// Same key flips the order, a new key starts ascending
    pub fn sort_by(&mut self, key: SortKey) {
        if self.key == key {
            self.order = match self.order {
                SortOrder::Ascending => SortOrder::Descending,
                SortOrder::Descending => SortOrder::Ascending,
            };
        } else {
            self.key = key;
            self.order = SortOrder::Ascending;
        }
    }

    /// Rows whose name contains the search text, sorted
    pub fn rows<'a>(&self, values: &'a [(String, f64)]) -> Vec<&'a (String, f64)> {
        let mut rows: Vec<&(String, f64)> = values
            .iter()
            .filter(|(name, _)| name.contains(self.search.as_str()))
            .collect();
        rows.sort_by(|a, b| {
            let ord = match self.key {
                SortKey::Name => a.0.cmp(&b.0),
                SortKey::Value => a.1.total_cmp(&b.1),
            };
            match self.order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            }
        });
        rows
    }
}
