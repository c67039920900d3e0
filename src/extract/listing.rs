//! Search-listing extractor
//!
//! Pure parsing of one search-result page into tender summaries plus the
//! pagination total. No I/O happens here.
//!
//! The portal renders each result as a table row whose `onclick` handler
//! carries the application id and the per-tender access key
//! (`ShowApp(<app_id>, '…', <n>, '<key>')`), with the human-readable
//! announcement number, dates and status in accompanying paragraphs.

use crate::{Result, SweepError};
use scraper::{Html, Selector};

/// Label preceding the announcement number
const LABEL_TENDER_NUM: &str = "განცხადების ნომერი:";

/// Label preceding the announcement date
const LABEL_ANNOUNCED: &str = "შესყიდვის გამოცხადების თარიღი:";

/// Label preceding the bid deadline
const LABEL_DEADLINE: &str = "წინდადებების მიღების ვადა:";

/// Marker present in the record-count span, e.g. "52 ჩანაწერი (გვერდი: 1/13)"
const PAGINATION_MARKER: &str = "ჩანაწერი";

/// Page-position marker inside the record-count span
const PAGE_MARKER: &str = "გვერდი:";

/// Summary metadata for one tender row on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenderSummary {
    /// The portal's application id; the tender's identity across stages
    pub app_id: String,

    /// Access key for addressing the tender's detail tabs
    pub key: String,

    /// Human-readable announcement number, e.g. "NAT250000123"
    pub tender_num: String,

    /// Announcement date as displayed by the portal
    pub announced: String,

    /// Bid deadline as displayed by the portal
    pub deadline: String,

    /// Tender status text
    pub status: String,
}

/// One parsed search-result page
#[derive(Debug, Clone)]
pub struct Listing {
    /// Tenders found on this page, in display order
    pub tenders: Vec<TenderSummary>,

    /// Total page count the portal reports for the query
    pub total_pages: u32,
}

fn selector(s: &'static str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| SweepError::Parse {
        context: format!("selector '{}'", s),
        message: e.to_string(),
    })
}

/// Extracts tender summaries and pagination info from a listing page
///
/// A recognized page with zero result rows yields an empty tender list; a
/// page without the result container at all is a `Parse` error. The two must
/// stay distinct: the first ends a walk, the second marks a skipped page.
pub fn extract_listing(html: &str) -> Result<Listing> {
    let document = Html::parse_document(html);

    let container = selector("#content")?;
    if document.select(&container).next().is_none() {
        return Err(SweepError::Parse {
            context: "listing".to_string(),
            message: "result container #content not found".to_string(),
        });
    }

    let row_selector = selector("#content tbody tr")?;
    let p_selector = selector("p")?;
    let status_selector = selector("p.status")?;
    let span_selector = selector("span")?;

    // Row identities from the onclick handlers
    let mut identities = Vec::new();
    for row in document.select(&row_selector) {
        let onclick = row.value().attr("onclick").unwrap_or("");
        if let Some((app_id, key)) = parse_show_app(onclick) {
            identities.push((app_id, key));
        }
    }

    // Field lists collected in document order, zipped with the rows below
    let mut tender_nums = Vec::new();
    let mut announced = Vec::new();
    let mut deadlines = Vec::new();
    for p in document.select(&p_selector) {
        let text: String = p.text().collect();
        if let Some(value) = value_after_label(&text, LABEL_TENDER_NUM) {
            tender_nums.push(value);
        } else if let Some(value) = value_after_label(&text, LABEL_ANNOUNCED) {
            announced.push(value);
        } else if let Some(value) = value_after_label(&text, LABEL_DEADLINE) {
            deadlines.push(value);
        }
    }

    let statuses: Vec<String> = document
        .select(&status_selector)
        .map(|p| p.text().collect::<String>().trim().to_string())
        .collect();

    let tenders = identities
        .into_iter()
        .enumerate()
        .map(|(i, (app_id, key))| TenderSummary {
            app_id,
            key,
            tender_num: tender_nums.get(i).cloned().unwrap_or_default(),
            announced: announced.get(i).cloned().unwrap_or_default(),
            deadline: deadlines.get(i).cloned().unwrap_or_default(),
            status: statuses.get(i).cloned().unwrap_or_default(),
        })
        .collect();

    // The portal omits the span on some empty result sets; one page then
    let total_pages = document
        .select(&span_selector)
        .map(|s| s.text().collect::<String>())
        .find(|text| text.contains(PAGINATION_MARKER))
        .and_then(|text| parse_total_pages(&text))
        .unwrap_or(1);

    Ok(Listing {
        tenders,
        total_pages,
    })
}

/// Pulls `(app_id, key)` out of a `ShowApp(…)` onclick handler
///
/// Returns None for rows without a well-formed handler (header rows,
/// decorative rows), which are simply not tenders.
fn parse_show_app(onclick: &str) -> Option<(String, String)> {
    let start = onclick.find("ShowApp(")?;
    let inner = &onclick[start + "ShowApp(".len()..];
    let end = inner.find(')')?;
    let args = &inner[..end];

    let mut parts = args.split(',');
    let app_id = parts.next()?.trim();
    if app_id.is_empty() || !app_id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    // The key is the final quoted argument; a row with no further arguments
    // carries no key and is not a tender row
    let last = parts.last()?.trim();
    let key = last.trim_matches('\'');
    if key.is_empty() {
        return None;
    }

    Some((app_id.to_string(), key.to_string()))
}

/// Takes the text after `label`, trimmed, if the label occurs
fn value_after_label(text: &str, label: &str) -> Option<String> {
    let pos = text.find(label)?;
    Some(text[pos + label.len()..].trim().to_string())
}

/// Parses "… (გვერდი: N/M)" into M
fn parse_total_pages(text: &str) -> Option<u32> {
    let pos = text.find(PAGE_MARKER)?;
    let rest = text[pos + PAGE_MARKER.len()..].trim();
    let rest = rest.trim_end_matches(')');
    let (_, total) = rest.split_once('/')?;
    total.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing_page(rows: &[(&str, &str, &str)], page: u32, total: u32) -> String {
        let mut body = String::new();
        for (app_id, key, num) in rows {
            body.push_str(&format!(
                r#"<tr onclick="ShowApp({app_id}, 'app', 1, '{key}')"><td>
                    <p>განცხადების ნომერი: <strong>{num}</strong></p>
                    <p>შესყიდვის გამოცხადების თარიღი: 01.01.2025</p>
                    <p>წინდადებების მიღების ვადა: 20.01.2025</p>
                    <p class="status">გამოცხადებულია</p>
                </td></tr>"#
            ));
        }
        format!(
            r#"<html><body>
            <span>{n} ჩანაწერი (გვერდი: {page}/{total})</span>
            <table id="content"><tbody>{body}</tbody></table>
            </body></html>"#,
            n = rows.len()
        )
    }

    #[test]
    fn test_extract_rows() {
        let html = listing_page(
            &[("100", "k100", "NAT25001"), ("200", "k200", "NAT25002")],
            1,
            3,
        );
        let listing = extract_listing(&html).unwrap();
        assert_eq!(listing.tenders.len(), 2);
        assert_eq!(listing.total_pages, 3);

        let first = &listing.tenders[0];
        assert_eq!(first.app_id, "100");
        assert_eq!(first.key, "k100");
        assert_eq!(first.tender_num, "NAT25001");
        assert_eq!(first.announced, "01.01.2025");
        assert_eq!(first.deadline, "20.01.2025");
        assert_eq!(first.status, "გამოცხადებულია");
    }

    #[test]
    fn test_empty_result_set_is_ok() {
        let html = listing_page(&[], 1, 1);
        let listing = extract_listing(&html).unwrap();
        assert!(listing.tenders.is_empty());
    }

    #[test]
    fn test_missing_container_is_parse_error() {
        let html = "<html><body><p>maintenance</p></body></html>";
        let result = extract_listing(html);
        assert!(matches!(result, Err(SweepError::Parse { .. })));
    }

    #[test]
    fn test_rows_without_handler_are_ignored() {
        let html = r#"<html><body>
            <table id="content"><tbody>
            <tr><td>header row</td></tr>
            <tr onclick="ShowApp(42, 'app', 1, 'k42')"><td>
                <p>განცხადების ნომერი: <strong>NAT25042</strong></p>
            </td></tr>
            </tbody></table>
            </body></html>"#;
        let listing = extract_listing(html).unwrap();
        assert_eq!(listing.tenders.len(), 1);
        assert_eq!(listing.tenders[0].app_id, "42");
    }

    #[test]
    fn test_missing_pagination_span_defaults_to_one_page() {
        let html = r#"<html><body>
            <table id="content"><tbody>
            <tr onclick="ShowApp(7, 'app', 1, 'k7')"><td></td></tr>
            </tbody></table>
            </body></html>"#;
        let listing = extract_listing(html).unwrap();
        assert_eq!(listing.total_pages, 1);
    }

    #[test]
    fn test_parse_show_app_variants() {
        assert_eq!(
            parse_show_app("ShowApp(123, 'x', 4, 'abc')"),
            Some(("123".to_string(), "abc".to_string()))
        );
        assert_eq!(parse_show_app("ShowApp(, 'x', 4, 'abc')"), None);
        assert_eq!(parse_show_app("somethingElse()"), None);
        assert_eq!(parse_show_app("ShowApp(12a, 'x', 4, 'abc')"), None);
    }

    #[test]
    fn test_parse_total_pages() {
        assert_eq!(parse_total_pages("52 ჩანაწერი (გვერდი: 1/13)"), Some(13));
        assert_eq!(parse_total_pages("3 ჩანაწერი (გვერდი: 1/1)"), Some(1));
        assert_eq!(parse_total_pages("no marker here"), None);
    }

    #[test]
    fn test_value_with_colon_in_it_is_kept_whole() {
        let html = r#"<html><body>
            <table id="content"><tbody>
            <tr onclick="ShowApp(5, 'x', 1, 'k5')"><td>
                <p>შესყიდვის გამოცხადების თარიღი: 01.01.2025 12:30</p>
            </td></tr>
            </tbody></table>
            </body></html>"#;
        let listing = extract_listing(html).unwrap();
        assert_eq!(listing.tenders[0].announced, "01.01.2025 12:30");
    }
}
