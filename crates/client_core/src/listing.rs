//! Triage queue listing: tab partition, search, ordering, and pagination over
//! the employee's request collection.

use std::cmp::Ordering;
use std::sync::Arc;

use shared::{
    domain::{RequestId, Tab},
    error::GatewayError,
    protocol::RequestSummary,
};
use tracing::{info, warn};

use crate::{RequestGateway, ScreenNavigator};

const ITEMS_PER_PAGE: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    TrackingNumber,
    Applicant,
    CreatedAt,
    State,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: SortColumn,
    pub direction: SortDirection,
}

/// Why a derived page came back with no rows. The two cases render
/// differently: an empty queue is normal, a fruitless search is actionable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    NoRequests,
    NoSearchMatches,
}

#[derive(Debug)]
pub struct PageView<'a> {
    pub rows: Vec<&'a RequestSummary>,
    pub page: usize,
    pub total_pages: usize,
    pub total_matches: usize,
    pub empty: Option<EmptyReason>,
}

impl PageView<'_> {
    /// 1-based positions of the first and last row shown, for the footer.
    pub fn shown_range(&self) -> Option<(usize, usize)> {
        if self.rows.is_empty() {
            return None;
        }
        let start = (self.page - 1) * ITEMS_PER_PAGE + 1;
        Some((start, start + self.rows.len() - 1))
    }
}

/// Owns the in-memory request collection and the listing's view state. The
/// visible page is re-derived from scratch on every read, so the same
/// (collection, tab, search, sort, page) always yields the same rows.
pub struct ListingController {
    gateway: Arc<dyn RequestGateway>,
    navigator: Arc<dyn ScreenNavigator>,
    requests: Vec<RequestSummary>,
    tab: Tab,
    search_term: String,
    sort: Option<SortSpec>,
    page: usize,
    loading: bool,
}

impl ListingController {
    pub fn new(gateway: Arc<dyn RequestGateway>, navigator: Arc<dyn ScreenNavigator>) -> Self {
        Self {
            gateway,
            navigator,
            requests: Vec::new(),
            tab: Tab::default(),
            search_term: String::new(),
            sort: None,
            page: 1,
            loading: false,
        }
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn sort(&self) -> Option<SortSpec> {
        self.sort
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn requests(&self) -> &[RequestSummary] {
        &self.requests
    }

    /// Reloads the whole collection from the gateway. On failure the
    /// collection is left empty and the error is handed back for the caller
    /// to surface as a transient notification.
    pub async fn refresh(&mut self) -> Result<usize, GatewayError> {
        self.loading = true;
        match self.gateway.fetch_all().await {
            Ok(requests) => {
                let count = requests.len();
                self.requests = requests;
                self.loading = false;
                info!(count, "listing: collection reloaded");
                Ok(count)
            }
            Err(err) => {
                self.requests.clear();
                self.loading = false;
                warn!("listing: reload failed: {err}");
                Err(err)
            }
        }
    }

    pub fn select_tab(&mut self, tab: Tab) {
        if self.tab != tab {
            self.tab = tab;
            self.page = 1;
        }
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        let term = term.into();
        if self.search_term != term {
            self.search_term = term;
            self.page = 1;
        }
    }

    /// Selecting the active column flips its direction; selecting another
    /// column starts over ascending. Either way the page resets.
    pub fn toggle_sort(&mut self, column: SortColumn) {
        let direction = match self.sort {
            Some(spec) if spec.column == column => spec.direction.flipped(),
            _ => SortDirection::Ascending,
        };
        self.sort = Some(SortSpec { column, direction });
        self.page = 1;
    }

    /// Out-of-range pages are clamped into `[1, total_pages]` rather than
    /// rejected; the stored page is always valid for the current filter.
    pub fn set_page(&mut self, page: usize) {
        let total_pages = self.matching().len().div_ceil(ITEMS_PER_PAGE);
        self.page = page.clamp(1, total_pages.max(1));
    }

    pub fn visible_page(&self) -> PageView<'_> {
        let matches = self.filtered_sorted();
        let total_matches = matches.len();
        let total_pages = total_matches.div_ceil(ITEMS_PER_PAGE);
        let page = self.page.min(total_pages.max(1));
        let rows: Vec<&RequestSummary> = matches
            .into_iter()
            .skip((page - 1) * ITEMS_PER_PAGE)
            .take(ITEMS_PER_PAGE)
            .collect();
        let empty = if rows.is_empty() {
            Some(if self.search_term.is_empty() {
                EmptyReason::NoRequests
            } else {
                EmptyReason::NoSearchMatches
            })
        } else {
            None
        };
        PageView {
            rows,
            page,
            total_pages,
            total_matches,
            empty,
        }
    }

    /// Tracking number to respond to, or None when the request is missing or
    /// its state does not accept a response. The response screen re-checks
    /// the same gate on entry.
    pub fn respond_target(&self, id: RequestId) -> Option<&str> {
        self.requests
            .iter()
            .find(|request| request.id == id)
            .filter(|request| request.state.accepts_response())
            .map(|request| request.tracking_number.as_str())
    }

    pub fn open_response(&self, id: RequestId) -> bool {
        match self.respond_target(id) {
            Some(tracking_number) => {
                info!(tracking_number, "listing: opening response screen");
                self.navigator.open_response_screen(tracking_number);
                true
            }
            None => {
                warn!(request_id = id.0, "listing: response action refused");
                false
            }
        }
    }

    fn matching(&self) -> Vec<&RequestSummary> {
        let term = self.search_term.to_lowercase();
        self.requests
            .iter()
            .filter(|request| request.state.tab() == Some(self.tab))
            .filter(|request| term.is_empty() || matches_search(request, &term))
            .collect()
    }

    fn filtered_sorted(&self) -> Vec<&RequestSummary> {
        let mut matches = self.matching();

        // Vec::sort_by is stable; entries sharing every key keep their
        // arrival order.
        match self.sort {
            Some(spec) => matches.sort_by(|a, b| column_order(spec, a, b)),
            None => matches.sort_by(|a, b| self.default_order(a, b)),
        }
        matches
    }

    /// With no column selected, the pending tab surfaces citizen replies,
    /// then new requests, then requests waiting on the citizen; creation
    /// date breaks ties, oldest first. The completed tab orders by creation
    /// date alone.
    fn default_order(&self, a: &RequestSummary, b: &RequestSummary) -> Ordering {
        let by_priority = if self.tab == Tab::Pending {
            a.state.triage_priority().cmp(&b.state.triage_priority())
        } else {
            Ordering::Equal
        };
        by_priority.then_with(|| a.created_at.cmp(&b.created_at))
    }
}

fn matches_search(request: &RequestSummary, term: &str) -> bool {
    request.tracking_number.to_lowercase().contains(term)
        || request.applicant_name.to_lowercase().contains(term)
        || request.national_id.to_lowercase().contains(term)
        || request.state.label().to_lowercase().contains(term)
}

fn column_order(spec: SortSpec, a: &RequestSummary, b: &RequestSummary) -> Ordering {
    let ordering = match spec.column {
        SortColumn::TrackingNumber => a
            .tracking_number
            .to_lowercase()
            .cmp(&b.tracking_number.to_lowercase()),
        SortColumn::Applicant => a
            .applicant_name
            .to_lowercase()
            .cmp(&b.applicant_name.to_lowercase()),
        SortColumn::CreatedAt => a.created_at.cmp(&b.created_at),
        // The state column sorts what the employee reads, not the raw code.
        SortColumn::State => a
            .state
            .label()
            .to_lowercase()
            .cmp(&b.state.label().to_lowercase()),
    };
    match spec.direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

#[cfg(test)]
#[path = "tests/listing_tests.rs"]
mod tests;
