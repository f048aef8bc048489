use crate::catalog::{CatalogNode, ChildFlag, DEFAULT_PAGE_SIZE, Row};
use crate::client::PageSource;
use crate::pager::fetch_all_children;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Deepest descent below the root before the walker stops following children.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Which `hasChild` value sends the walker into a node.
///
/// `Observed` matches the platform's own script: descend on `"N"`, record
/// everything else as an entry. `Corrected` descends on `"Y"`. Switch the
/// default here if the API's meaning of the flag is ever confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchPolicy {
    Observed,
    Corrected,
}

pub const DEFAULT_BRANCH_POLICY: BranchPolicy = BranchPolicy::Observed;

impl BranchPolicy {
    /// True if `node` is an inner node to page through, false if it is an entry.
    pub fn descends(&self, node: &CatalogNode) -> bool {
        match self {
            BranchPolicy::Observed => node.child_flag() == ChildFlag::No,
            BranchPolicy::Corrected => node.child_flag() == ChildFlag::Yes,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BranchPolicy::Observed => "observed",
            BranchPolicy::Corrected => "corrected",
        }
    }
}

impl Default for BranchPolicy {
    fn default() -> Self {
        DEFAULT_BRANCH_POLICY
    }
}

impl fmt::Display for BranchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BranchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "observed" => Ok(BranchPolicy::Observed),
            "corrected" => Ok(BranchPolicy::Corrected),
            other => Err(format!(
                "unknown branch policy '{}' (expected 'observed' or 'corrected')",
                other
            )),
        }
    }
}

/// Called before each parent is fetched with the number of entries collected so far.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// A parent whose child list came back short.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialParent {
    pub parent: String,
    pub gathered: usize,
    pub reported_total: Option<usize>,
    pub failure: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct WalkReport {
    /// Entries in depth-first, left-to-right order.
    pub rows: Vec<Row>,
    pub parents_fetched: usize,
    pub partial_parents: Vec<PartialParent>,
    /// Inner nodes not followed because of the depth bound.
    pub depth_skipped: usize,
    pub root: String,
}

impl WalkReport {
    pub fn is_complete(&self) -> bool {
        self.partial_parents.is_empty() && self.depth_skipped == 0
    }

    /// The root's own failure, when nothing at all could be read from it.
    pub fn root_failure(&self) -> Option<&PartialParent> {
        self.partial_parents
            .iter()
            .find(|p| p.parent == self.root && p.gathered == 0 && p.failure.is_some())
    }
}

struct Frame {
    nodes: std::vec::IntoIter<CatalogNode>,
    depth: usize,
}

/// Depth-first walk over a book's catalog, collecting entry titles.
pub struct Walker<S> {
    source: S,
    page_size: usize,
    max_depth: usize,
    policy: BranchPolicy,
    progress_callback: Option<ProgressCallback>,
}

impl<S: PageSource> Walker<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            page_size: DEFAULT_PAGE_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
            policy: DEFAULT_BRANCH_POLICY,
            progress_callback: None,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_branch_policy(mut self, policy: BranchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Walk everything below `root`; an empty root means the top level.
    ///
    /// Uses an explicit stack of sibling iterators, so rows come out in the
    /// same order a recursive pre-order walk would produce, one request at a
    /// time.
    pub async fn walk(&self, root: &str) -> WalkReport {
        info!(
            "Walking catalog from '{}' (page size {}, max depth {}, {} branch policy)",
            root, self.page_size, self.max_depth, self.policy
        );

        let mut report = WalkReport {
            root: root.to_string(),
            ..WalkReport::default()
        };

        let top = self.children_of(root, &mut report).await;
        let mut stack = vec![Frame {
            nodes: top.into_iter(),
            depth: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            let Some(node) = frame.nodes.next() else {
                stack.pop();
                continue;
            };
            let depth = frame.depth;

            if self.policy.descends(&node) {
                if depth >= self.max_depth {
                    warn!(
                        "Not descending into '{}' ({}): depth limit {} reached",
                        node.no, node.title, self.max_depth
                    );
                    report.depth_skipped += 1;
                    continue;
                }
                let children = self.children_of(&node.no, &mut report).await;
                stack.push(Frame {
                    nodes: children.into_iter(),
                    depth: depth + 1,
                });
            } else {
                debug!("{}", node.title);
                report.rows.push(Row::new(node.title));
            }
        }

        info!(
            "Walk complete: {} entries from {} parents",
            report.rows.len(),
            report.parents_fetched
        );
        report
    }

    async fn children_of(&self, parent: &str, report: &mut WalkReport) -> Vec<CatalogNode> {
        if let Some(ref callback) = self.progress_callback {
            callback(report.rows.len(), parent.to_string());
        }

        let list = fetch_all_children(&self.source, parent, self.page_size).await;
        report.parents_fetched += 1;

        if list.is_partial() {
            report.partial_parents.push(PartialParent {
                parent: list.parent.clone(),
                gathered: list.nodes.len(),
                reported_total: list.reported_total,
                failure: list.failure.clone(),
            });
        }

        list.nodes
    }
}
