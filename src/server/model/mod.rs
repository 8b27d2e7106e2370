use serde::Deserialize;

pub(crate) mod bill;
pub(crate) mod config;
pub(crate) mod dashboard;
pub(crate) mod menu;
pub(crate) mod money;
pub(crate) mod payment;
pub(crate) mod settings;
pub(crate) mod table;

pub(crate) type TableId = i64;
pub(crate) type BillId = i64;
/// line ids are scoped to their bill and never reused within it
pub(crate) type LineId = i64;
pub(crate) type MenuItemId = i64;
pub(crate) type CategoryId = i64;
/// client generated tag grouping the lines one diner ordered
pub(crate) type SessionId = String;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CommonRequestParams {
    pub page: Option<u8>,
    pub page_size: Option<u8>,
}

impl CommonRequestParams {
    const DEFAULT_PAGE_SIZE: u8 = 20;

    /// Slice one page out of `rows`; pages are zero based.
    pub fn paginate<T>(&self, rows: Vec<T>) -> Vec<T> {
        let page = usize::from(self.page.unwrap_or(0));
        let page_size = usize::from(self.page_size.unwrap_or(Self::DEFAULT_PAGE_SIZE).max(1));
        rows.into_iter().skip(page * page_size).take(page_size).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginate_defaults_to_first_page() {
        let params = CommonRequestParams { page: None, page_size: None };
        assert_eq!(params.paginate((0..30).collect()).len(), 20);
    }

    #[test]
    fn paginate_skips_whole_pages() {
        let params = CommonRequestParams { page: Some(1), page_size: Some(4) };
        assert_eq!(params.paginate((0..10).collect()), vec![4, 5, 6, 7]);
        let params = CommonRequestParams { page: Some(5), page_size: Some(4) };
        assert!(params.paginate((0..10).collect::<Vec<i32>>()).is_empty());
    }
}
