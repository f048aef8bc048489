use crate::catalog::{CatalogNode, PageRequest};
use crate::client::PageSource;
use tracing::{debug, error, warn};

/// Every child of one parent, gathered across pages.
#[derive(Debug, Clone, Default)]
pub struct ChildList {
    pub parent: String,
    pub nodes: Vec<CatalogNode>,
    /// Total the server reported on the last page that came back.
    pub reported_total: Option<usize>,
    pub pages_fetched: usize,
    /// Why paging stopped early, if it did.
    pub failure: Option<String>,
}

impl ChildList {
    /// True when fewer nodes were gathered than the server announced, or a
    /// page failed before any total was seen.
    pub fn is_partial(&self) -> bool {
        match self.reported_total {
            Some(total) => self.nodes.len() < total,
            None => self.failure.is_some(),
        }
    }
}

/// Request pages of `parent`'s children until the accumulated count reaches
/// the server-reported total.
///
/// The offset starts at 1 and always advances by `page_size`, which is only
/// correct while the server fills every page but the last. A page that fails
/// after the client's retries ends paging and the nodes gathered so far are
/// returned; the failure is recorded on the result rather than raised.
pub async fn fetch_all_children<S: PageSource>(
    source: &S,
    parent: &str,
    page_size: usize,
) -> ChildList {
    let mut list = ChildList {
        parent: parent.to_string(),
        ..ChildList::default()
    };
    let mut request = PageRequest::first(parent, page_size.max(1));

    loop {
        let page = match source.fetch_page(&request).await {
            Ok(page) => page,
            Err(e) => {
                error!(
                    "Giving up on children of '{}' at start={}: {}",
                    parent, request.offset, e
                );
                list.failure = Some(e.to_string());
                break;
            }
        };

        list.pages_fetched += 1;
        list.reported_total = Some(page.total);
        let received = page.nodes.len();
        list.nodes.extend(page.nodes);

        debug!(
            "Parent '{}': {} of {} children after page at start={}",
            parent,
            list.nodes.len(),
            page.total,
            request.offset
        );

        if list.nodes.len() >= page.total {
            break;
        }

        if received == 0 {
            warn!(
                "Parent '{}' returned an empty page at start={} with {} of {} children gathered",
                parent,
                request.offset,
                list.nodes.len(),
                page.total
            );
            list.failure = Some(format!("empty page at start={}", request.offset));
            break;
        }

        request = request.next();
    }

    if list.is_partial() {
        warn!(
            "Children of '{}' are incomplete: {} of {:?}",
            parent,
            list.nodes.len(),
            list.reported_total
        );
    }

    list
}
