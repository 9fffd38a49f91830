use log::{debug, info, warn};
use serde::Deserialize;

use crate::error::{Result, SyncError};
use crate::models::EntityLookup;
use crate::notion::{FundStore, Page};

/// Title property of the fund directory.
pub const PROP_FUND_NAME: &str = "名称";

#[derive(Deserialize)]
struct TitleProperty {
    title: Vec<RichText>,
}

#[derive(Deserialize)]
struct RichText {
    plain_text: String,
}

/// Display name of a fund page: the concatenated plain text of its title.
pub fn fund_name(page: &Page) -> Result<String> {
    let missing = || {
        SyncError::Resolution(format!(
            "fund page {} has no {PROP_FUND_NAME:?} title",
            page.id
        ))
    };
    let raw = page.properties.get(PROP_FUND_NAME).ok_or_else(missing)?;
    let prop = TitleProperty::deserialize(raw).map_err(|_| missing())?;
    let name: String = prop.title.iter().map(|t| t.plain_text.as_str()).collect();
    let name = name.trim();
    if name.is_empty() {
        return Err(missing());
    }
    Ok(name.to_string())
}

/// Page through the whole fund directory and map names to page ids.
///
/// Any failure is fatal: without the directory no purchase can be linked.
/// When two pages share a name the later one wins and the collision is
/// logged.
pub fn resolve(store: &dyn FundStore, database_id: &str) -> Result<EntityLookup> {
    let mut lookup = EntityLookup::new();
    let mut cursor: Option<String> = None;
    let mut page_no = 0u32;

    loop {
        page_no += 1;
        let resp = store
            .query_database(database_id, cursor.as_deref())
            .map_err(|e| SyncError::Resolution(e.to_string()))?;
        debug!("fund page {page_no}: {} entries", resp.results.len());

        for page in &resp.results {
            let name = fund_name(page)?;
            if let Some(previous) = lookup.insert(name.clone(), page.id.clone()) {
                warn!(
                    "Duplicate fund name {name:?}: {} replaces {previous}",
                    page.id
                );
            }
        }

        if !resp.has_more {
            break;
        }
        let next = resp.next_cursor.ok_or_else(|| {
            SyncError::Resolution("has_more without next_cursor".to_string())
        })?;
        if cursor.as_deref() == Some(next.as_str()) {
            return Err(SyncError::Resolution(format!(
                "pagination stuck: cursor {next} repeated"
            )));
        }
        cursor = Some(next);
    }

    info!("Resolved {} funds", lookup.len());
    Ok(lookup)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::notion::{NewPurchasePage, QueryResponse};

    fn fund_page(id: &str, name: &str) -> Page {
        Page {
            id: id.to_string(),
            properties: HashMap::from([(
                PROP_FUND_NAME.to_string(),
                json!({ "id": "title", "type": "title", "title": [{ "plain_text": name }] }),
            )]),
        }
    }

    /// Serves canned pages keyed by cursor and records every cursor asked for.
    struct PagedStore {
        pages: HashMap<Option<String>, QueryResponse>,
        seen: Mutex<Vec<Option<String>>>,
    }

    impl FundStore for PagedStore {
        fn query_database(&self, _database_id: &str, cursor: Option<&str>) -> Result<QueryResponse> {
            let key = cursor.map(str::to_string);
            self.seen.lock().unwrap().push(key.clone());
            self.pages
                .get(&key)
                .cloned()
                .ok_or_else(|| SyncError::Api { status: 503, message: "unavailable".into() })
        }

        fn create_page(&self, _page: &NewPurchasePage) -> Result<String> {
            unreachable!("resolver never writes")
        }
    }

    fn page(results: Vec<Page>, next: Option<&str>) -> QueryResponse {
        QueryResponse {
            results,
            has_more: next.is_some(),
            next_cursor: next.map(str::to_string),
        }
    }

    #[test]
    fn test_fund_name_joins_rich_text() {
        let mut p = fund_page("p1", "");
        p.properties.insert(
            PROP_FUND_NAME.to_string(),
            json!({ "title": [{ "plain_text": "易方达" }, { "plain_text": "蓝筹精选" }] }),
        );
        assert_eq!(fund_name(&p).unwrap(), "易方达蓝筹精选");
    }

    #[test]
    fn test_fund_name_missing_title_is_resolution_error() {
        let p = Page { id: "p1".into(), properties: HashMap::new() };
        assert!(matches!(fund_name(&p), Err(SyncError::Resolution(_))));

        let empty = fund_page("p2", "  ");
        assert!(matches!(fund_name(&empty), Err(SyncError::Resolution(_))));

        let mut wrong = fund_page("p3", "x");
        wrong.properties.insert(PROP_FUND_NAME.to_string(), json!({ "title": "FundAlpha" }));
        assert!(matches!(fund_name(&wrong), Err(SyncError::Resolution(_))));
    }

    #[test]
    fn test_resolve_follows_cursors() {
        let store = PagedStore {
            pages: HashMap::from([
                (None, page(vec![fund_page("id-a", "FundAlpha")], Some("c2"))),
                (Some("c2".into()), page(vec![fund_page("id-b", "FundBeta")], None)),
            ]),
            seen: Mutex::new(Vec::new()),
        };
        let lookup = resolve(&store, "fund-db").unwrap();
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup["FundAlpha"], "id-a");
        assert_eq!(lookup["FundBeta"], "id-b");
        assert_eq!(*store.seen.lock().unwrap(), vec![None, Some("c2".to_string())]);
    }

    #[test]
    fn test_resolve_duplicate_name_last_wins() {
        let store = PagedStore {
            pages: HashMap::from([(
                None,
                page(vec![fund_page("id-1", "FundAlpha"), fund_page("id-2", "FundAlpha")], None),
            )]),
            seen: Mutex::new(Vec::new()),
        };
        let lookup = resolve(&store, "fund-db").unwrap();
        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup["FundAlpha"], "id-2");
    }

    #[test]
    fn test_resolve_store_failure_is_fatal() {
        let store = PagedStore {
            pages: HashMap::from([(None, page(vec![fund_page("id-a", "FundAlpha")], Some("gone")))]),
            seen: Mutex::new(Vec::new()),
        };
        let err = resolve(&store, "fund-db").unwrap_err();
        assert!(matches!(err, SyncError::Resolution(_)));
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_resolve_repeated_cursor_is_fatal() {
        let store = PagedStore {
            pages: HashMap::from([
                (None, page(vec![], Some("loop"))),
                (Some("loop".into()), page(vec![], Some("loop"))),
            ]),
            seen: Mutex::new(Vec::new()),
        };
        let err = resolve(&store, "fund-db").unwrap_err();
        assert!(err.to_string().contains("pagination stuck"));
    }

    #[test]
    fn test_resolve_untitled_entity_is_fatal() {
        let untitled = Page { id: "id-x".into(), properties: HashMap::new() };
        let store = PagedStore {
            pages: HashMap::from([(None, page(vec![fund_page("id-a", "FundAlpha"), untitled], None))]),
            seen: Mutex::new(Vec::new()),
        };
        assert!(matches!(resolve(&store, "fund-db"), Err(SyncError::Resolution(_))));
    }
}
