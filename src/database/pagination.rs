use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    constants::{PAGE_QUERY_PARAM, PAGE_SIZE, PAGE_SIZE_QUERY_PARAM},
    error::ApiError,
    filters::QueryParams,
};

/// `?page=<n>&limit=<size>` of a list request plus what is needed to link
/// neighbouring pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
    offset: i64,
    base_url: String,
    params: Vec<(String, String)>,
}

impl PageRequest {
    pub fn from_query(base_url: String, query: &QueryParams) -> Result<Self, ApiError> {
        let page = match query.get(PAGE_QUERY_PARAM) {
            None => 1,
            Some(page) => page
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|page| *page >= 1)
                .ok_or(ApiError::InvalidPage)?,
        };

        let size = query
            .get(PAGE_SIZE_QUERY_PARAM)
            .and_then(|size| size.trim().parse::<i64>().ok())
            .filter(|size| *size > 0)
            .unwrap_or(PAGE_SIZE);

        // Rows skipped before this page must fit an i64.
        let offset = (page - 1).checked_mul(size).ok_or(ApiError::InvalidPage)?;

        Ok(Self {
            page,
            size,
            offset,
            base_url,
            params: query.pairs().to_vec(),
        })
    }

    pub fn limit(&self) -> i64 {
        self.size
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    fn link(&self, page: i64) -> String {
        let mut params: Vec<&(String, String)> = self
            .params
            .iter()
            .filter(|(key, _)| key != PAGE_QUERY_PARAM)
            .collect();
        let page_param = (PAGE_QUERY_PARAM.to_string(), page.to_string());
        if page > 1 {
            params.push(&page_param);
        }
        params.sort_by(|a, b| a.0.cmp(&b.0));

        match Url::parse(&self.base_url) {
            Ok(mut url) => {
                if params.is_empty() {
                    url.set_query(None);
                } else {
                    url.query_pairs_mut().clear().extend_pairs(params);
                }
                url.to_string()
            }
            Err(_) => self.base_url.to_owned(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    /// `total_rows` is the size of the whole listing. A page past the end is
    /// an error, except the first page of an empty listing.
    pub fn from_rows(rows: Vec<T>, total_rows: i64, request: &PageRequest) -> Result<Self, ApiError> {
        if rows.is_empty() {
            if request.page > 1 {
                return Err(ApiError::InvalidPage);
            }
            return Ok(Self::no_rows());
        }

        let page_count = total_rows / request.size + i64::from(total_rows % request.size != 0);
        let next = (request.page < page_count).then(|| request.link(request.page + 1));
        let previous = (request.page > 1).then(|| request.link(request.page - 1));

        Ok(Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        })
    }

    pub fn no_rows() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: vec![],
        }
    }

    /// Same page metadata around `results`.
    pub fn with_results<U>(self, results: Vec<U>) -> PageContext<U> {
        PageContext {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results,
        }
    }
}
