//! URL construction for the procurement portal
//!
//! The portal serves both the search listing and every tender detail tab
//! through a single controller endpoint, selected by an `action` parameter.
//! Detail tabs additionally need the tender's `app_id` and, for all but the
//! agreement tab, the per-tender access key issued by the search index.

use crate::config::Query;
use url::Url;

/// Public root of the procurement portal
pub const PORTAL_BASE: &str = "https://tenders.procurement.gov.ge/public/";

/// Controller path relative to the portal base
const CONTROLLER: &str = "library/controller.php";

/// Date format the portal expects in search parameters
const DATE_FORMAT: &str = "%d.%m.%Y";

/// One detail tab of a tender's detail view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DetailTab {
    /// Tender overview (the page ShowApp opens first)
    Application,
    /// Main application data
    AppMain,
    /// Tender documentation uploaded by the applicant
    AppDocs,
    /// Submitted bids
    AppBids,
    /// Documents uploaded by the procuring agency
    AgencyDocs,
    /// Agreement documents; served without an access key
    AgrDocs,
}

impl DetailTab {
    /// The controller `action` parameter for this tab
    pub fn action(&self) -> &'static str {
        match self {
            DetailTab::Application => "application",
            DetailTab::AppMain => "app_main",
            DetailTab::AppDocs => "app_docs",
            DetailTab::AppBids => "app_bids",
            DetailTab::AgencyDocs => "agency_docs",
            DetailTab::AgrDocs => "agr_docs",
        }
    }

    /// File stem used when persisting this tab to the archive
    pub fn file_stem(&self) -> &'static str {
        self.action()
    }

    /// Whether the portal requires the per-tender access key for this tab
    pub fn requires_key(&self) -> bool {
        !matches!(self, DetailTab::AgrDocs)
    }
}

impl std::fmt::Display for DetailTab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.action())
    }
}

/// Builds the search-listing URL for one result page of a query
///
/// # Arguments
///
/// * `base` - Portal base URL (overridable so tests can point at a mock)
/// * `query` - The search query
/// * `page` - 1-based result page number
pub fn listing_url(base: &Url, query: &Query, page: u32) -> Result<Url, url::ParseError> {
    let mut url = base.join(CONTROLLER)?;
    url.query_pairs_mut()
        .append_pair("action", "search_app")
        .append_pair("app_basecode", &query.cpv_code)
        .append_pair(
            "app_date_from",
            &query.date_from.format(DATE_FORMAT).to_string(),
        )
        .append_pair(
            "app_date_till",
            &query.date_till.format(DATE_FORMAT).to_string(),
        )
        .append_pair("page", &page.to_string());
    Ok(url)
}

/// Builds the URL for one detail tab of a tender
///
/// The access key is appended for every tab except the agreement tab, which
/// the portal serves keyless.
pub fn tab_url(
    base: &Url,
    app_id: &str,
    key: &str,
    tab: DetailTab,
) -> Result<Url, url::ParseError> {
    let mut url = base.join(CONTROLLER)?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("action", tab.action())
            .append_pair("app_id", app_id);
        if tab.requires_key() {
            pairs.append_pair("key", key);
        }
    }
    Ok(url)
}
