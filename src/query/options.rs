use std::cmp::Ordering;

use crate::record::Data;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub name: String,
    pub descending: bool,
}

/// Ordering of a select, parsed from text like `"Name desc, Created"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    fields: Vec<SortField>,
}

impl SortSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> Self {
        let fields = text
            .split(',')
            .filter_map(|part| {
                let mut words = part.split_whitespace();
                let name = words.next()?;
                let descending = words
                    .next()
                    .map(|direction| direction.eq_ignore_ascii_case("desc"))
                    .unwrap_or(false);
                Some(SortField {
                    name: name.trim_matches(|c| c == '[' || c == ']').to_string(),
                    descending,
                })
            })
            .collect();
        Self { fields }
    }

    pub fn ascending(mut self, name: impl Into<String>) -> Self {
        self.fields.push(SortField {
            name: name.into(),
            descending: false,
        });
        self
    }

    pub fn descending(mut self, name: impl Into<String>) -> Self {
        self.fields.push(SortField {
            name: name.into(),
            descending: true,
        });
        self
    }

    pub fn fields(&self) -> &[SortField] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Compare two records; unordered value pairs count as equal.
    pub fn compare(&self, a: &Data, b: &Data) -> Ordering {
        let null = Value::Null;
        for field in &self.fields {
            let left = a.get(&field.name).unwrap_or(&null);
            let right = b.get(&field.name).unwrap_or(&null);
            let ordering = left.compare(right).unwrap_or(Ordering::Equal);
            let ordering = if field.descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

/// 1-based page selection. Paging is active only when both parts are non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub index: usize,
    pub size: usize,
}

impl Page {
    pub const ALL: Page = Page { index: 0, size: 0 };

    pub fn new(index: usize, size: usize) -> Self {
        Self { index, size }
    }

    pub fn is_paged(&self) -> bool {
        self.index > 0 && self.size > 0
    }

    /// Rows skipped before this page.
    pub fn offset(&self) -> usize {
        if self.is_paged() {
            (self.index - 1) * self.size
        } else {
            0
        }
    }
}

/// Everything a select needs beyond the template record and the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectOptions {
    pub page: Page,
    pub sort: SortSpec,
    /// Projection; empty means every stored field.
    pub fields: Vec<String>,
    /// Per-call provider name, ranked below a record's own override.
    pub provider: Option<String>,
}

impl SelectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, index: usize, size: usize) -> Self {
        self.page = Page::new(index, size);
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }
}
