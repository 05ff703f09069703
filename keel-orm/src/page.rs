use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::query::{Arguments, Direction, QueryError};

/// Pagination parameters.
///
/// `sort` takes the form `field` or `field,asc|desc`.
#[derive(Debug, Clone, Deserialize)]
pub struct Pageable {
    #[serde(default)]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub size: u64,
    #[serde(default)]
    pub sort: Option<String>,
}

fn default_page_size() -> u64 {
    20
}

impl Default for Pageable {
    fn default() -> Self {
        Self {
            page: 0,
            size: default_page_size(),
            sort: None,
        }
    }
}

impl Pageable {
    pub fn new(page: u64, size: u64) -> Self {
        Self {
            page,
            size,
            sort: None,
        }
    }

    pub fn sorted(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn offset(&self) -> u64 {
        self.page * self.size
    }

    /// Sort, offset and limit as query arguments.
    pub fn to_arguments(&self) -> Result<Arguments, DataError> {
        let mut args = Arguments::new();
        if let Some(sort) = self.sort.as_deref().filter(|s| !s.trim().is_empty()) {
            let (field, direction) = match sort.split_once(',') {
                Some((field, direction)) => (
                    field.trim(),
                    direction.parse::<Direction>().map_err(DataError::Other)?,
                ),
                None => (sort.trim(), Direction::Asc),
            };
            if field.is_empty() {
                return Err(QueryError::InvalidIdentifier {
                    kind: "sort",
                    ident: sort.to_string(),
                }
                .into());
            }
            args = args.order_by(field, direction);
        }
        Ok(args.offset(self.offset()).limit(self.size))
    }
}

/// A page of results with pagination metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, pageable: &Pageable, total_elements: u64) -> Self {
        let total_pages = if pageable.size == 0 {
            0
        } else {
            total_elements.div_ceil(pageable.size)
        };
        Self {
            content,
            page: pageable.page,
            size: pageable.size,
            total_elements,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pageable_defaults_when_deserialized_empty() {
        let pageable: Pageable = serde_json::from_str("{}").unwrap();
        assert_eq!(pageable.page, 0);
        assert_eq!(pageable.size, 20);
        assert_eq!(Pageable::new(3, 25).offset(), 75);
    }

    #[test]
    fn sort_parses_direction() {
        assert_eq!(Pageable::new(0, 10).sorted("name,desc").to_arguments().unwrap().len(), 3);
        assert_eq!(Pageable::new(0, 10).to_arguments().unwrap().len(), 2);
        assert!(Pageable::new(0, 10).sorted("name,sideways").to_arguments().is_err());
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = Page::new(vec![1, 2], &Pageable::new(1, 2), 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(Page::<u8>::new(vec![], &Pageable::new(0, 0), 5).total_pages, 0);
    }
}
