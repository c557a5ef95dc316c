//
//  bitbucket-cloud-cli
//  api/common/pagination.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Pagination Types for Bitbucket API Responses
//!
//! Bitbucket Cloud list endpoints return one page at a time with absolute
//! links to the neighbouring pages. Iterate by following `next` until it is
//! absent; [`BitbucketClient::get_all`](crate::api::BitbucketClient::get_all)
//! does exactly that.

use serde::{Deserialize, Serialize};

/// One page of a Bitbucket Cloud list endpoint.
///
/// # Example
///
/// ```rust
/// use bitbucket_cloud_cli::api::PaginatedResponse;
///
/// let json = r#"{
///     "values": [1, 2],
///     "page": 1,
///     "pagelen": 2,
///     "size": 3,
///     "next": "https://api.bitbucket.org/2.0/things?page=2"
/// }"#;
///
/// let page: PaginatedResponse<u32> = serde_json::from_str(json).unwrap();
/// assert!(page.has_next());
/// assert_eq!(page.next_url(), Some("https://api.bitbucket.org/2.0/things?page=2"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    /// Items on this page.
    #[serde(default = "Vec::new")]
    pub values: Vec<T>,

    /// Page number, 1-indexed.
    #[serde(default)]
    pub page: Option<u32>,

    /// Maximum items per page.
    #[serde(default)]
    pub pagelen: Option<u32>,

    /// Total item count, when the endpoint reports it.
    #[serde(default)]
    pub size: Option<u32>,

    /// Absolute URL of the next page.
    #[serde(default)]
    pub next: Option<String>,

    /// Absolute URL of the previous page.
    #[serde(default)]
    pub previous: Option<String>,
}

impl<T> PaginatedResponse<T> {
    /// Whether a further page exists.
    pub fn has_next(&self) -> bool {
        self.next_url().is_some()
    }

    /// The next page's URL, ignoring empty links.
    pub fn next_url(&self) -> Option<&str> {
        self.next.as_deref().filter(|n| !n.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_page_has_no_next() {
        let page: PaginatedResponse<u32> = serde_json::from_str(r#"{"values":[3]}"#).unwrap();
        assert!(!page.has_next());
        assert_eq!(page.values, vec![3]);
    }

    #[test]
    fn test_empty_next_is_ignored() {
        let page: PaginatedResponse<u32> =
            serde_json::from_str(r#"{"values":[],"next":""}"#).unwrap();
        assert!(!page.has_next());
    }
}
