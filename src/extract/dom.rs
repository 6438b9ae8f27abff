//! Structural DOM scanning over rendered page markup.
//!
//! Two scan shapes cover the catalog layouts seen on provider sites: a link
//! scan for pages whose plan tiles are anchors carrying validity and data
//! amount in the URL, and a card scan for pages that lay plans out as
//! labelled list items. Prices are returned in the page's own currency;
//! normalization to USD happens in the scrapers.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::currency::symbol_to_code;
use crate::models::DataAllowance;

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static DIV: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div").unwrap());
static LEAD_HEADING: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2").unwrap());
static SUB_HEADING: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h3").unwrap());

static PLAN_CARD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"li[data-testid^="destination-hero-plan-card"]"#).unwrap());
static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());
static CARD_PRICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[data-testid="pricing-card-original-price"]"#).unwrap());
static CARD_RADIO: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"input[type="radio"]"#).unwrap());
static SECTION_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#plan-section-title").unwrap());

static URL_VALIDITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(\d+)days").unwrap());
static URL_DATA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(\d+)gb").unwrap());

/// Price token with the currency symbol on either side of the numeral.
static PRICE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([€$£¥₹])\s*([\d.]+)|([\d.]+)\s*([€$£¥₹])").unwrap());

static CARD_DATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+(?:\.\d+)?)\s*GB$").unwrap());
static CARD_VALIDITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+)\s*days?$").unwrap());
static CARD_PRICE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:US)?\$?([\d.]+)|€([\d.]+)|£([\d.]+)").unwrap());
static TITLE_COUNTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)for (?:the )?(.+)$").unwrap());

/// One plan recovered from a scan, priced in the page's own currency.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanCandidate {
    /// Display name, e.g. "Canada 5GB - 30 Days".
    pub name: String,
    pub data: DataAllowance,
    pub validity_days: u32,
    /// Price as shown on the page, in `currency`.
    pub price: f64,
    /// ISO code mapped from the page's currency marker.
    pub currency: &'static str,
    pub url: String,
}

/// Result of one pass over a link-style catalog page.
#[derive(Debug, Clone)]
pub struct LinkScan {
    /// Country label from the page's lead heading, "Unknown" when absent.
    pub country: String,
    /// Network label from the secondary heading, "Unknown" when absent.
    pub network: String,
    pub plans: Vec<PlanCandidate>,
}

/// Scan a link-style catalog page for plan anchors.
///
/// Anchors qualify when their resolved URL contains both an `-esim/` path
/// segment and a `days` marker. Validity and data amount are read from the
/// URL via `(\d+)days` and `(\d+)gb`; the price comes from the anchor's own
/// text. When `unlimited_tab` is set, every candidate is treated as
/// unlimited regardless of its URL. Candidates missing validity or price
/// are dropped, as are metered candidates without a positive data amount.
pub fn scan_plan_links(html: &str, base_url: &str, unlimited_tab: bool) -> LinkScan {
    let document = Html::parse_document(html);
    let base = Url::parse(base_url).ok();

    let country = first_heading_text(&document, &LEAD_HEADING);
    let network = first_heading_text(&document, &SUB_HEADING);

    let mut plans = Vec::new();
    for anchor in document.select(&ANCHOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let url = resolve_href(base.as_ref(), href);
        if !(url.contains("-esim/") && url.contains("days")) {
            continue;
        }

        let validity_days = URL_VALIDITY
            .captures(&url)
            .and_then(|caps| caps[1].parse::<u32>().ok())
            .filter(|days| *days > 0);
        let data_gb = URL_DATA
            .captures(&url)
            .and_then(|caps| caps[1].parse::<u32>().ok());
        let unlimited = url.to_lowercase().contains("unlimited") || unlimited_tab;
        let price = last_price_token(anchor).filter(|(value, _)| *value > 0.0);

        let (Some(validity_days), Some((price, currency))) = (validity_days, price) else {
            continue;
        };

        let data = if unlimited {
            DataAllowance::Unlimited
        } else {
            match data_gb {
                Some(gb) if gb > 0 => DataAllowance::Metered(gb as f64),
                _ => continue,
            }
        };

        plans.push(PlanCandidate {
            name: format!("{} {} - {} Days", country, data.label(), validity_days),
            data,
            validity_days,
            price,
            currency,
            url,
        });
    }

    debug!("Link scan found {} plans for {}", plans.len(), country);
    LinkScan {
        country,
        network,
        plans,
    }
}

/// Scan a card-style catalog page for plan tiles.
///
/// Cards are list items tagged as plan cards. Data amount and validity come
/// from labelled paragraphs, the price from a dedicated price element, and
/// the plan URL points back at the page with the card's radio value as a
/// query parameter. The country label is read from the section title,
/// falling back to `fallback_country`.
pub fn scan_plan_cards(html: &str, page_url: &str, fallback_country: &str) -> Vec<PlanCandidate> {
    let document = Html::parse_document(html);
    let country = section_country(&document).unwrap_or_else(|| fallback_country.to_string());

    let mut plans = Vec::new();
    for card in document.select(&PLAN_CARD) {
        let data = card_allowance(card);
        let validity_days = card_validity(card).filter(|days| *days > 0);
        let price = card_price(card).filter(|(value, _)| *value > 0.0);

        let (Some(data), Some(validity_days), Some((price, currency))) =
            (data, validity_days, price)
        else {
            continue;
        };

        plans.push(PlanCandidate {
            name: format!("{} {} - {} Days", country, data.label(), validity_days),
            data,
            validity_days,
            price,
            currency,
            url: card_plan_url(card, page_url),
        });
    }

    debug!("Card scan found {} plans for {}", plans.len(), country);
    plans
}

/// Last currency-bearing price token inside the element, in DOM order.
///
/// Candidate fragments are the element's descendant divs; the last fragment
/// containing a price token wins, and within it the last token wins. The
/// currency symbol may precede or follow the numeral.
fn last_price_token(element: ElementRef<'_>) -> Option<(f64, &'static str)> {
    let mut price_text = String::new();
    for div in element.select(&DIV) {
        let text = collapsed_text(div);
        if PRICE_TOKEN.is_match(&text) {
            price_text = text;
        }
    }

    let captures = PRICE_TOKEN.captures_iter(&price_text).last()?;
    let (value, symbol) = match (captures.get(1), captures.get(2)) {
        (Some(symbol), Some(value)) => (value.as_str(), symbol.as_str()),
        _ => (captures.get(3)?.as_str(), captures.get(4)?.as_str()),
    };

    let value: f64 = value.parse().ok()?;
    let symbol = symbol.chars().next()?;
    Some((value, symbol_to_code(symbol).unwrap_or("USD")))
}

/// Data allowance from a card's paragraphs. An "unlimited" label wins
/// immediately; otherwise the last "N GB" label is used.
fn card_allowance(card: ElementRef<'_>) -> Option<DataAllowance> {
    let mut data = None;
    for paragraph in card.select(&PARAGRAPH) {
        let text = collapsed_text(paragraph);
        if text.to_lowercase().contains("unlimited") {
            return Some(DataAllowance::Unlimited);
        }
        if let Some(caps) = CARD_DATA.captures(&text) {
            if let Ok(gb) = caps[1].parse::<f64>() {
                data = Some(DataAllowance::Metered(gb));
            }
        }
    }
    data
}

fn card_validity(card: ElementRef<'_>) -> Option<u32> {
    for paragraph in card.select(&PARAGRAPH) {
        let text = collapsed_text(paragraph);
        if let Some(caps) = CARD_VALIDITY.captures(&text) {
            return caps[1].parse().ok();
        }
    }
    None
}

fn card_price(card: ElementRef<'_>) -> Option<(f64, &'static str)> {
    let price_element = card.select(&CARD_PRICE).next()?;
    let text = collapsed_text(price_element);
    let captures = CARD_PRICE_TOKEN.captures(&text)?;
    let value = captures
        .get(1)
        .or_else(|| captures.get(2))
        .or_else(|| captures.get(3))?
        .as_str()
        .parse::<f64>()
        .ok()?;

    let currency = if text.contains('€') {
        "EUR"
    } else if text.contains('£') {
        "GBP"
    } else {
        "USD"
    };
    Some((value, currency))
}

fn card_plan_url(card: ElementRef<'_>, page_url: &str) -> String {
    let plan_id = card
        .select(&CARD_RADIO)
        .next()
        .and_then(|input| input.value().attr("value"))
        .filter(|value| !value.is_empty());

    match plan_id {
        Some(id) => format!("{}?plan={}", page_without_query(page_url), id),
        None => page_url.to_string(),
    }
}

/// Country name from the plan section title, e.g. "Get an eSIM data plan
/// for the United States".
fn section_country(document: &Html) -> Option<String> {
    let title = document.select(&SECTION_TITLE).next()?;
    let text = collapsed_text(title);
    TITLE_COUNTRY.captures(&text).map(|caps| caps[1].to_string())
}

/// Trimmed text of the first matching element, "Unknown" when absent or empty.
fn first_heading_text(document: &Html, selector: &Selector) -> String {
    document
        .select(selector)
        .next()
        .map(collapsed_text)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Element text with whitespace runs collapsed to single spaces.
fn collapsed_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve an href against the page URL, as a browser's `href` property does.
fn resolve_href(base: Option<&Url>, href: &str) -> String {
    match base.and_then(|b| b.join(href).ok()) {
        Some(resolved) => resolved.to_string(),
        None => href.to_string(),
    }
}

/// Page URL stripped to origin and path.
fn page_without_query(page_url: &str) -> String {
    match Url::parse(page_url) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => page_url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE_URL: &str = "https://www.airalo.com/united-states-esim";

    fn link_page(anchors: &str) -> String {
        format!(
            r#"<html><body>
                <h2>United States</h2>
                <h3>AT&amp;T</h3>
                {}
            </body></html>"#,
            anchors
        )
    }

    #[test]
    fn test_link_scan_extracts_metered_and_unlimited() {
        let html = link_page(
            r#"<a href="/united-states-esim/usa-5gb-30days"><div>5 GB</div><div>$4.50</div></a>
               <a href="/united-states-esim/usa-unlimited-7days"><div>Unlimited</div><div>7.90 €</div></a>"#,
        );

        let scan = scan_plan_links(&html, BASE_URL, false);
        assert_eq!(scan.country, "United States");
        assert_eq!(scan.network, "AT&T");
        assert_eq!(scan.plans.len(), 2);

        let metered = &scan.plans[0];
        assert_eq!(metered.name, "United States 5GB - 30 Days");
        assert_eq!(metered.data, DataAllowance::Metered(5.0));
        assert_eq!(metered.validity_days, 30);
        assert_eq!(metered.price, 4.50);
        assert_eq!(metered.currency, "USD");
        assert_eq!(
            metered.url,
            "https://www.airalo.com/united-states-esim/usa-5gb-30days"
        );

        let unlimited = &scan.plans[1];
        assert_eq!(unlimited.name, "United States Unlimited - 7 Days");
        assert_eq!(unlimited.data, DataAllowance::Unlimited);
        assert_eq!(unlimited.price, 7.90);
        assert_eq!(unlimited.currency, "EUR");
    }

    #[test]
    fn test_link_scan_last_price_fragment_wins() {
        // Both a dollar and a euro token appear; the later one decides.
        let html = link_page(
            r#"<a href="/canada-esim/canada-10gb-30days">
                 <div>$4.50</div>
                 <div>4.50€</div>
               </a>"#,
        );

        let scan = scan_plan_links(&html, BASE_URL, false);
        assert_eq!(scan.plans.len(), 1);
        assert_eq!(scan.plans[0].price, 4.50);
        assert_eq!(scan.plans[0].currency, "EUR");
    }

    #[test]
    fn test_link_scan_last_token_within_fragment_wins() {
        let html = link_page(
            r#"<a href="/canada-esim/canada-10gb-30days">
                 <div>was $4.50 now 3.99€</div>
               </a>"#,
        );

        let scan = scan_plan_links(&html, BASE_URL, false);
        assert_eq!(scan.plans.len(), 1);
        assert_eq!(scan.plans[0].price, 3.99);
        assert_eq!(scan.plans[0].currency, "EUR");
    }

    #[test]
    fn test_link_scan_unlimited_tab_overrides_url() {
        let html = link_page(
            r#"<a href="/japan-esim/japan-20gb-30days"><div>¥2000</div></a>"#,
        );

        let scan = scan_plan_links(&html, BASE_URL, true);
        assert_eq!(scan.plans.len(), 1);
        assert_eq!(scan.plans[0].data, DataAllowance::Unlimited);
        assert_eq!(scan.plans[0].name, "United States Unlimited - 30 Days");
        assert_eq!(scan.plans[0].currency, "JPY");
    }

    #[test]
    fn test_link_scan_drops_incomplete_candidates() {
        let html = link_page(
            r#"<a href="/us-esim/no-price-5gb-30days"><div>5 GB</div></a>
               <a href="/us-esim/no-days-5gb"><div>$4.50</div></a>
               <a href="/us-esim/no-data-30days"><div>$4.50</div></a>
               <a href="/somewhere/else"><div>$9.99</div></a>"#,
        );

        let scan = scan_plan_links(&html, BASE_URL, false);
        assert!(scan.plans.is_empty());
    }

    #[test]
    fn test_link_scan_empty_page() {
        let scan = scan_plan_links("<html><body></body></html>", BASE_URL, false);
        assert_eq!(scan.country, "Unknown");
        assert_eq!(scan.network, "Unknown");
        assert!(scan.plans.is_empty());
    }

    const CARD_PAGE_URL: &str = "https://saily.com/esim-united-states/";

    fn card_page(cards: &str) -> String {
        format!(
            r#"<html><body>
                <h2 id="plan-section-title">Get an eSIM data plan for the United States</h2>
                <ul id="plansSection">{}</ul>
            </body></html>"#,
            cards
        )
    }

    #[test]
    fn test_card_scan_extracts_plan() {
        let html = card_page(
            r#"<li data-testid="destination-hero-plan-card-0">
                 <input type="radio" value="us-1gb-7d" />
                 <p>1 GB</p>
                 <p>7 days</p>
                 <span data-testid="pricing-card-original-price">US$3.99</span>
               </li>"#,
        );

        let plans = scan_plan_cards(&html, CARD_PAGE_URL, "US");
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].name, "United States 1GB - 7 Days");
        assert_eq!(plans[0].data, DataAllowance::Metered(1.0));
        assert_eq!(plans[0].validity_days, 7);
        assert_eq!(plans[0].price, 3.99);
        assert_eq!(plans[0].currency, "USD");
        assert_eq!(
            plans[0].url,
            "https://saily.com/esim-united-states/?plan=us-1gb-7d"
        );
    }

    #[test]
    fn test_card_scan_unlimited_label_wins() {
        let html = card_page(
            r#"<li data-testid="destination-hero-plan-card-0">
                 <p>Unlimited data</p>
                 <p>30 days</p>
                 <span data-testid="pricing-card-original-price">€29.99</span>
               </li>"#,
        );

        let plans = scan_plan_cards(&html, CARD_PAGE_URL, "US");
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].data, DataAllowance::Unlimited);
        assert_eq!(plans[0].name, "United States Unlimited - 30 Days");
        assert_eq!(plans[0].currency, "EUR");
        // No radio input, so the plan URL is the page itself.
        assert_eq!(plans[0].url, CARD_PAGE_URL);
    }

    #[test]
    fn test_card_scan_pound_price_and_title_fallback() {
        let html = r#"<html><body>
            <li data-testid="destination-hero-plan-card-3">
              <p>5 GB</p>
              <p>14 days</p>
              <span data-testid="pricing-card-original-price">£8.49</span>
            </li>
        </body></html>"#;

        let plans = scan_plan_cards(html, CARD_PAGE_URL, "GB");
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].currency, "GBP");
        assert_eq!(plans[0].price, 8.49);
        assert_eq!(plans[0].name, "GB 5GB - 14 Days");
    }

    #[test]
    fn test_card_scan_drops_card_without_price_element() {
        let html = card_page(
            r#"<li data-testid="destination-hero-plan-card-0">
                 <p>1 GB</p>
                 <p>7 days</p>
               </li>"#,
        );

        assert!(scan_plan_cards(&html, CARD_PAGE_URL, "US").is_empty());
    }
}
