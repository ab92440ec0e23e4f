//! Paged, filterable list state shared by the workflow, execution and agent
//! stores.
//!
//! Every async operation follows the same shape: clear `error`, raise
//! `loading`, await the API, then either apply the result or record the
//! error's user-facing message.  No `RefCell` borrow lives across an
//! `.await`.  Overlapping `fetch_list` calls are not fenced, so the last
//! response to arrive wins.

use std::cell::RefCell;
use std::rc::Rc;

use crate::constants::DEFAULT_PAGE_LIMIT;
use crate::error::ApiError;
use crate::models::{Identified, ListResponse};
use crate::network::api::{self, Resource};
use crate::network::ApiClient;

/// Client-side filter set of a list resource.
pub trait Filters: Default + Clone + PartialEq {
    type Item;

    /// Server query parameters for the filters that are set.
    fn query_params(&self) -> Vec<(String, String)>;

    /// Client-side predicate used by `filtered_list`.
    fn matches(&self, item: &Self::Item) -> bool;

    fn is_filtered(&self) -> bool {
        *self != Self::default()
    }
}

/// A [`Resource`] that can back an [`EntityStore`].
pub trait ListResource: Resource {
    type Filters: Filters<Item = Self::Entity>;

    /// Noun used in fallback error messages, e.g. `工作流`.
    const NOUN: &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based.
    pub page: u32,
    pub limit: u32,
    /// Server-authoritative item count across all pages.
    pub total: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            total: 0,
        }
    }
}

impl Pagination {
    /// `ceil(total / limit)`, never less than 1.
    pub fn total_pages(&self) -> u32 {
        let limit = u64::from(self.limit.max(1));
        let pages = self.total.div_ceil(limit);
        pages.clamp(1, u64::from(u32::MAX)) as u32
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListState<E, F> {
    pub items: Vec<E>,
    pub current_item: Option<E>,
    pub loading: bool,
    pub error: Option<String>,
    pub pagination: Pagination,
    pub filters: F,
}

impl<E, F: Default> Default for ListState<E, F> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            current_item: None,
            loading: false,
            error: None,
            pagination: Pagination::default(),
            filters: F::default(),
        }
    }
}

pub struct EntityStore<R: ListResource> {
    client: Rc<ApiClient>,
    state: RefCell<ListState<R::Entity, R::Filters>>,
}

impl<R: ListResource> EntityStore<R> {
    pub fn new(client: Rc<ApiClient>) -> Self {
        Self {
            client,
            state: RefCell::new(ListState::default()),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    // ---------------- Getters ----------------

    pub fn snapshot(&self) -> ListState<R::Entity, R::Filters> {
        self.state.borrow().clone()
    }

    pub fn items(&self) -> Vec<R::Entity> {
        self.state.borrow().items.clone()
    }

    pub fn current_item(&self) -> Option<R::Entity> {
        self.state.borrow().current_item.clone()
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn pagination(&self) -> Pagination {
        self.state.borrow().pagination
    }

    pub fn filters(&self) -> R::Filters {
        self.state.borrow().filters.clone()
    }

    pub fn get_by_id(&self, id: i64) -> Option<R::Entity> {
        self.state
            .borrow()
            .items
            .iter()
            .find(|item| item.id() == id)
            .cloned()
    }

    pub fn filtered_list(&self) -> Vec<R::Entity> {
        let state = self.state.borrow();
        state
            .items
            .iter()
            .filter(|item| state.filters.matches(item))
            .cloned()
            .collect()
    }

    pub fn total_pages(&self) -> u32 {
        self.state.borrow().pagination.total_pages()
    }

    pub fn is_filtered(&self) -> bool {
        self.state.borrow().filters.is_filtered()
    }

    /// `limit`, `offset`, the set filters, then `extra` (same key replaces).
    pub fn build_query(&self, extra: &[(String, String)]) -> Vec<(String, String)> {
        let state = self.state.borrow();
        let mut query = vec![
            ("limit".to_string(), state.pagination.limit.to_string()),
            ("offset".to_string(), state.pagination.offset().to_string()),
        ];
        query.extend(state.filters.query_params());
        for (key, value) in extra {
            match query.iter_mut().find(|(k, _)| k == key) {
                Some(slot) => slot.1 = value.clone(),
                None => query.push((key.clone(), value.clone())),
            }
        }
        query
    }

    // ---------------- Call bookkeeping ----------------

    pub(crate) fn begin(&self) {
        let mut state = self.state.borrow_mut();
        state.loading = true;
        state.error = None;
    }

    pub(crate) fn finish(&self) {
        self.state.borrow_mut().loading = false;
    }

    pub(crate) fn clear_error(&self) {
        self.state.borrow_mut().error = None;
    }

    /// Store the user-facing text of `err` without touching `loading`.
    pub(crate) fn record_error(&self, err: ApiError, fallback: &str) -> ApiError {
        log::error!("{}: {}", fallback, err);
        self.state.borrow_mut().error = Some(err.message_or(fallback));
        err
    }

    /// End the call with `err` and hand it back for propagation.
    pub(crate) fn fail(&self, err: ApiError, fallback: &str) -> ApiError {
        self.finish();
        self.record_error(err, fallback)
    }

    /// Mutate both the list entry and the current item whose id is `id`.
    pub(crate) fn patch_where(&self, id: i64, patch: impl Fn(&mut R::Entity)) {
        let mut state = self.state.borrow_mut();
        if let Some(item) = state.items.iter_mut().find(|item| item.id() == id) {
            patch(item);
        }
        if let Some(current) = state.current_item.as_mut().filter(|c| c.id() == id) {
            patch(current);
        }
    }

    fn replace_entity(&self, entity: &R::Entity, set_current: bool) {
        let id = entity.id();
        let mut state = self.state.borrow_mut();
        if let Some(slot) = state.items.iter_mut().find(|item| item.id() == id) {
            *slot = entity.clone();
        }
        let current_matches = state.current_item.as_ref().map(|c| c.id()) == Some(id);
        if set_current || current_matches {
            state.current_item = Some(entity.clone());
        }
    }

    // ---------------- Remote operations ----------------

    pub async fn fetch_list(&self, extra: &[(String, String)]) -> Result<ListResponse<R::Entity>, ApiError> {
        let query = self.build_query(extra);
        self.begin();
        match api::list::<R>(&self.client, &query).await {
            Ok(page) => {
                let mut state = self.state.borrow_mut();
                state.items = page.data.clone();
                state.pagination.total = page.total;
                state.loading = false;
                Ok(page)
            }
            Err(err) => Err(self.fail(err, &format!("获取{}列表失败", R::NOUN))),
        }
    }

    /// Loads one entity as the current item and refreshes its list entry in
    /// place.  It is never appended to the list.
    pub async fn fetch_by_id(&self, id: i64) -> Result<R::Entity, ApiError> {
        self.begin();
        match api::get::<R>(&self.client, id).await {
            Ok(entity) => {
                self.replace_entity(&entity, true);
                self.finish();
                Ok(entity)
            }
            Err(err) => Err(self.fail(err, &format!("获取{}详情失败", R::NOUN))),
        }
    }

    pub async fn create(&self, input: &R::Input) -> Result<R::Entity, ApiError> {
        self.begin();
        match api::create::<R>(&self.client, input).await {
            Ok(entity) => {
                let mut state = self.state.borrow_mut();
                state.items.insert(0, entity.clone());
                state.pagination.total += 1;
                state.loading = false;
                Ok(entity)
            }
            Err(err) => Err(self.fail(err, &format!("创建{}失败", R::NOUN))),
        }
    }

    pub async fn update(&self, id: i64, input: &R::Input) -> Result<R::Entity, ApiError> {
        self.begin();
        match api::update::<R>(&self.client, id, input).await {
            Ok(entity) => {
                self.replace_entity(&entity, false);
                self.finish();
                Ok(entity)
            }
            Err(err) => Err(self.fail(err, &format!("更新{}失败", R::NOUN))),
        }
    }

    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.begin();
        match api::delete::<R>(&self.client, id).await {
            Ok(()) => {
                let mut state = self.state.borrow_mut();
                let before = state.items.len();
                state.items.retain(|item| item.id() != id);
                if state.items.len() != before {
                    state.pagination.total = state.pagination.total.saturating_sub(1);
                }
                if state.current_item.as_ref().map(|c| c.id()) == Some(id) {
                    state.current_item = None;
                }
                state.loading = false;
                Ok(())
            }
            Err(err) => Err(self.fail(err, &format!("删除{}失败", R::NOUN))),
        }
    }

    // ---------------- Paging & filters ----------------

    /// Pages outside `[1, total_pages]` are ignored without a fetch.
    pub async fn set_page(&self, page: u32) -> Result<(), ApiError> {
        if page < 1 || page > self.total_pages() {
            return Ok(());
        }
        self.state.borrow_mut().pagination.page = page;
        self.fetch_list(&[]).await.map(|_| ())
    }

    pub async fn set_limit(&self, limit: u32) -> Result<(), ApiError> {
        {
            let mut state = self.state.borrow_mut();
            state.pagination.limit = limit.max(1);
            state.pagination.page = 1;
        }
        self.fetch_list(&[]).await.map(|_| ())
    }

    /// Edit the filters in place, back to page 1, refetch.
    pub async fn set_filter(&self, edit: impl FnOnce(&mut R::Filters)) -> Result<(), ApiError> {
        {
            let mut state = self.state.borrow_mut();
            edit(&mut state.filters);
            state.pagination.page = 1;
        }
        self.fetch_list(&[]).await.map(|_| ())
    }

    pub async fn clear_filters(&self) -> Result<(), ApiError> {
        {
            let mut state = self.state.borrow_mut();
            state.filters = R::Filters::default();
            state.pagination.page = 1;
        }
        self.fetch_list(&[]).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Workflow, WorkflowInput};
    use crate::stores::test_support::Harness;
    use crate::stores::workflow::{WorkflowFilters, Workflows};
    use futures::executor::block_on;
    use proptest::prelude::*;
    use serde_json::json;

    fn store(h: &Harness) -> EntityStore<Workflows> {
        EntityStore::new(h.client.clone())
    }

    fn page_body(ids: &[i64], total: u64) -> serde_json::Value {
        let data: Vec<_> = ids
            .iter()
            .map(|id| json!({"id": id, "name": format!("wf-{id}"), "status": "active"}))
            .collect();
        json!({"data": data, "total": total})
    }

    fn seed(h: &Harness, store: &EntityStore<Workflows>, ids: &[i64], total: u64) {
        h.transport.push_json(200, page_body(ids, total));
        block_on(store.fetch_list(&[])).unwrap();
    }

    fn query_of(h: &Harness) -> String {
        let url = h.transport.last_request().unwrap().url;
        url.split_once('?').map(|(_, q)| q.to_string()).unwrap_or_default()
    }

    #[test]
    fn query_order_and_overrides() {
        let h = Harness::new();
        let store = store(&h);
        {
            let mut state = store.state.borrow_mut();
            state.pagination.page = 3;
            state.filters = WorkflowFilters {
                status: "active".into(),
                search: String::new(),
            };
        }
        let query = store.build_query(&[
            ("status".to_string(), "draft".to_string()),
            ("sort".to_string(), "name".to_string()),
        ]);
        let pairs: Vec<(&str, &str)> = query.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(
            pairs,
            vec![("limit", "10"), ("offset", "20"), ("status", "draft"), ("sort", "name")]
        );
    }

    #[test]
    fn fetch_list_replaces_items_and_total() {
        let h = Harness::new();
        let store = store(&h);
        seed(&h, &store, &[1, 2, 3], 42);
        assert_eq!(store.items().len(), 3);
        assert_eq!(store.pagination().total, 42);
        assert_eq!(store.total_pages(), 5);
        assert!(!store.loading());
        assert_eq!(query_of(&h), "limit=10&offset=0");
    }

    #[test]
    fn failed_fetch_records_message_and_keeps_items() {
        let h = Harness::new();
        let store = store(&h);
        seed(&h, &store, &[1], 1);

        h.transport.push_json(500, json!({}));
        let err = block_on(store.fetch_list(&[])).unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(store.error().as_deref(), Some("获取工作流列表失败"));
        assert_eq!(store.items().len(), 1);
        assert!(!store.loading());

        h.transport.push_json(400, json!({"message": "bad filter"}));
        let _ = block_on(store.fetch_list(&[]));
        assert_eq!(store.error().as_deref(), Some("bad filter"));

        seed(&h, &store, &[1], 1);
        assert_eq!(store.error(), None);
    }

    #[test]
    fn create_prepends_and_counts() {
        let h = Harness::new();
        let store = store(&h);
        seed(&h, &store, &[1, 2], 2);

        h.transport.push_json(201, json!({"id": 9, "name": "new"}));
        let input = WorkflowInput {
            name: Some("new".into()),
            ..Default::default()
        };
        let created: Workflow = block_on(store.create(&input)).unwrap();
        assert_eq!(created.id, 9);
        assert_eq!(store.items()[0].id, 9);
        assert_eq!(store.pagination().total, 3);
    }

    #[test]
    fn update_patches_list_and_current() {
        let h = Harness::new();
        let store = store(&h);
        seed(&h, &store, &[1, 2], 2);
        h.transport.push_json(200, json!({"id": 2, "name": "wf-2", "status": "active"}));
        block_on(store.fetch_by_id(2)).unwrap();

        h.transport.push_json(200, json!({"id": 2, "name": "renamed", "status": "inactive"}));
        block_on(store.update(2, &WorkflowInput::default())).unwrap();
        assert_eq!(store.get_by_id(2).unwrap().name, "renamed");
        assert_eq!(store.current_item().unwrap().status, "inactive");
        assert_eq!(store.items().len(), 2);
    }

    #[test]
    fn fetch_by_id_never_appends() {
        let h = Harness::new();
        let store = store(&h);
        seed(&h, &store, &[1], 1);
        h.transport.push_json(200, json!({"id": 77, "name": "elsewhere"}));
        block_on(store.fetch_by_id(77)).unwrap();
        assert_eq!(store.items().len(), 1);
        assert_eq!(store.current_item().unwrap().id, 77);
    }

    #[test]
    fn delete_of_absent_item_keeps_total() {
        let h = Harness::new();
        let store = store(&h);
        seed(&h, &store, &[1, 2], 2);
        h.transport.push_json(200, json!({"id": 1, "name": "wf-1"}));
        block_on(store.fetch_by_id(1)).unwrap();

        h.transport.push_response(204, "");
        block_on(store.delete(1)).unwrap();
        assert_eq!(store.pagination().total, 1);
        assert!(store.current_item().is_none());

        h.transport.push_response(204, "");
        block_on(store.delete(555)).unwrap();
        assert_eq!(store.pagination().total, 1);
    }

    #[test]
    fn filters_reset_page_and_refetch() {
        let h = Harness::new();
        let store = store(&h);
        seed(&h, &store, &[1, 2], 50);
        h.transport.push_json(200, page_body(&[3], 50));
        block_on(store.set_page(3)).unwrap();
        assert_eq!(query_of(&h), "limit=10&offset=20");

        h.transport.push_json(200, page_body(&[1], 1));
        block_on(store.set_filter(|f| f.status = "draft".into())).unwrap();
        assert_eq!(store.pagination().page, 1);
        assert_eq!(query_of(&h), "limit=10&offset=0&status=draft");
        assert!(store.is_filtered());

        h.transport.push_json(200, page_body(&[1], 1));
        block_on(store.clear_filters()).unwrap();
        assert!(!store.is_filtered());
        assert_eq!(query_of(&h), "limit=10&offset=0");

        h.transport.push_json(200, page_body(&[1], 1));
        block_on(store.set_limit(25)).unwrap();
        assert_eq!(query_of(&h), "limit=25&offset=0");
    }

    #[test]
    fn filtered_list_applies_client_predicate() {
        let h = Harness::new();
        let store = store(&h);
        h.transport.push_json(
            200,
            json!({"data": [
                {"id": 1, "name": "Invoice sync", "status": "active"},
                {"id": 2, "name": "cleanup", "description": "nightly INVOICE purge", "status": "draft"},
                {"id": 3, "name": "other", "status": "active"}
            ], "total": 3}),
        );
        block_on(store.fetch_list(&[])).unwrap();
        store.state.borrow_mut().filters.search = "invoice".into();
        let ids: Vec<i64> = store.filtered_list().iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![1, 2]);

        store.state.borrow_mut().filters.status = "active".into();
        let ids: Vec<i64> = store.filtered_list().iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![1]);
    }

    proptest! {
        #[test]
        fn out_of_range_pages_are_ignored(total in 0u64..200, limit in 1u32..30, page in 0u32..40) {
            let h = Harness::new();
            let store = store(&h);
            {
                let mut state = store.state.borrow_mut();
                state.pagination.total = total;
                state.pagination.limit = limit;
            }
            let pages = store.total_pages();
            h.transport.push_json(200, page_body(&[], total));
            let _ = block_on(store.set_page(page));

            if page >= 1 && page <= pages {
                prop_assert_eq!(store.pagination().page, page);
                prop_assert_eq!(h.transport.request_count(), 1);
            } else {
                prop_assert_eq!(store.pagination().page, 1);
                prop_assert_eq!(h.transport.request_count(), 0);
            }
        }

        #[test]
        fn create_then_delete_restores_total(ids in proptest::collection::btree_set(1i64..1000, 0..8), new_id in 1000i64..2000) {
            let h = Harness::new();
            let store = store(&h);
            let ids: Vec<i64> = ids.into_iter().collect();
            let total = ids.len() as u64;
            seed(&h, &store, &ids, total);

            h.transport.push_json(201, json!({"id": new_id, "name": "n"}));
            block_on(store.create(&WorkflowInput::default())).unwrap();
            prop_assert_eq!(store.pagination().total, total + 1);

            h.transport.push_response(204, "");
            block_on(store.delete(new_id)).unwrap();
            prop_assert_eq!(store.pagination().total, total);
            prop_assert_eq!(store.items().len(), ids.len());
        }
    }
}
