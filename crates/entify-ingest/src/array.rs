//! In-memory data provider with optional pagination.

use entify_core::{EntityHandlers, EntityMain, PageInfo, Paginator, is_batch_index};
use entify_model::{EntifyError, Info, Value};
use tracing::info;

use crate::error::Result;

/// Info key holding the pagination block.
pub const PAGINATION_KEY: &str = "pagination";

/// Provides a batch of records held in memory.
pub struct ArrayProvider {
    handlers: EntityHandlers,
    data: Value,
    page: Option<(Value, PageInfo)>,
}

impl ArrayProvider {
    pub fn new(handlers: EntityHandlers, data: Value) -> Self {
        Self {
            handlers,
            data,
            page: None,
        }
    }

    /// Number of records in the full data.
    pub fn total(&self) -> usize {
        entries(&self.data).len()
    }

    /// Restrict the entity to one page. Out-of-range pages are clamped to
    /// `[1, last page]`.
    pub fn paginate(&mut self, per_page: usize, page: usize) -> Result<&PageInfo> {
        if per_page == 0 {
            return Err(EntifyError::InvalidPagination {
                reason: "per page must be greater than 0".to_string(),
            }
            .into());
        }
        let records = entries(&self.data);
        let total = records.len();
        let last_page = total.div_ceil(per_page);
        let current = page.min(last_page).max(1);

        let paginator = Paginator::new(current, per_page, total)?;
        let start = paginator.offset().min(total);
        let end = (start + per_page).min(total);
        let sliced: Vec<Value> = records[start..end].to_vec();
        let page_info = paginator.to_page_info(sliced.len());

        info!(
            total,
            page = current,
            per_page,
            records = sliced.len(),
            "paginated array data"
        );
        let stored = self.page.insert((Value::List(sliced), page_info));
        Ok(&stored.1)
    }

    pub fn page_info(&self) -> Option<&PageInfo> {
        self.page.as_ref().map(|(_, info)| info)
    }

    /// Run the handler chain over the current page, or over all data when
    /// [`ArrayProvider::paginate`] was not called.
    pub fn entity(self) -> Result<EntityMain> {
        let (data, info) = match self.page {
            Some((data, page_info)) => {
                let mut info = Info::new();
                info.insert(
                    PAGINATION_KEY.to_string(),
                    Value::Map(page_info.into_info()),
                );
                (data, Some(info))
            }
            None => (self.data, None),
        };
        Ok(EntityMain::new(self.handlers, data, info, None)?)
    }
}

/// Records of a batch: list entries, the values of an index-keyed map, or a
/// single record.
fn entries(data: &Value) -> Vec<Value> {
    match data {
        Value::Null => Vec::new(),
        Value::List(items) => items.clone(),
        Value::Map(map) if map.keys().all(|key| is_batch_index(key)) => {
            map.values().cloned().collect()
        }
        other => vec![other.clone()],
    }
}

#[cfg(test)]
mod tests {
    use entify_core::HandlerFactory;
    use entify_model::{Directive, FieldRules, Rules, record_of};
    use indexmap::IndexMap;

    use super::*;

    fn handlers() -> EntityHandlers {
        let mut fields = IndexMap::new();
        fields.insert("id".to_string(), FieldRules::new().with(Directive::Validate, ""));
        HandlerFactory::new(Rules::new("items", fields)).handlers()
    }

    fn items(count: i64) -> Value {
        Value::List(
            (1..=count)
                .map(|id| Value::Map(record_of([("id", id)])))
                .collect(),
        )
    }

    #[test]
    fn unpaginated_entity_sees_all_records() {
        let provider = ArrayProvider::new(handlers(), items(4));
        assert_eq!(provider.total(), 4);
        let entity = provider.entity().unwrap();
        assert_eq!(entity.export().and_then(Value::as_list).map(<[Value]>::len), Some(4));
        assert!(!entity.info().unwrap().contains_key(PAGINATION_KEY));
    }

    #[test]
    fn paginate_slices_the_requested_page() {
        let mut provider = ArrayProvider::new(handlers(), items(25));
        let info = provider.paginate(10, 3).unwrap();
        assert_eq!(info.current_page, 3);
        assert_eq!(info.from, 21);
        assert_eq!(info.to, 25);

        let entity = provider.entity().unwrap();
        let first = entity.export_one(0).and_then(Value::as_map).unwrap();
        assert_eq!(first["id"], Value::Int(21));
        let pagination = entity.info().unwrap()[PAGINATION_KEY].as_map().unwrap();
        assert_eq!(pagination["lastPage"], Value::Int(3));
    }

    #[test]
    fn out_of_range_pages_are_clamped() {
        let mut provider = ArrayProvider::new(handlers(), items(25));
        assert_eq!(provider.paginate(10, 9).unwrap().current_page, 3);
        assert_eq!(provider.paginate(10, 0).unwrap().current_page, 1);
        assert!(provider.paginate(0, 1).is_err());
    }

    #[test]
    fn single_record_counts_as_one() {
        let provider = ArrayProvider::new(handlers(), Value::Map(record_of([("id", 7)])));
        assert_eq!(provider.total(), 1);
    }

    #[test]
    fn empty_map_paginates_to_nothing() {
        let unpaged = ArrayProvider::new(handlers(), Value::Map(IndexMap::new()))
            .entity()
            .unwrap();
        assert!(unpaged.export().is_none());

        let mut provider = ArrayProvider::new(handlers(), Value::Map(IndexMap::new()));
        assert_eq!(provider.total(), 0);
        provider.paginate(10, 1).unwrap();
        let paged = provider.entity().unwrap();
        assert!(paged.export().is_none());
        assert!(paged.errors().is_none());
    }

    #[test]
    fn non_canonical_index_keys_form_one_record() {
        let data = Value::Map(record_of([
            ("01", Value::Map(record_of([("id", 1)]))),
            ("02", Value::Map(record_of([("id", 2)]))),
        ]));
        assert_eq!(ArrayProvider::new(handlers(), data).total(), 1);

        let batch = Value::Map(record_of([
            ("0", Value::Map(record_of([("id", 1)]))),
            ("1", Value::Map(record_of([("id", 2)]))),
        ]));
        assert_eq!(ArrayProvider::new(handlers(), batch).total(), 2);
    }
}
