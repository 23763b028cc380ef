//! Runs one job end-to-end against canned Mock adapters and prints every
//! event as it streams out. Not a shipped CLI — a manual smoke check for
//! the Supervisor wired the way a real binary would wire it.

use std::sync::Arc;

use leadscout_adapters::mock::{MockClassifier, MockSourceFetch, MockWebSearch};
use leadscout_adapters::SourceKind;
use leadscout_common::{Event, EventSink};
use leadscout_core::planner::DeterministicPlanner;
use leadscout_core::{CancelSignal, Supervisor};

struct PrintSink;

impl EventSink for PrintSink {
    fn emit(&self, event: Event) {
        println!("[{}] {:?}", event.event_type(), event);
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let fetcher = MockSourceFetch::new();
    let web_search = MockWebSearch::new();

    fetcher.register(
        SourceKind::Community,
        "looking for CRM for dentists",
        serde_json::json!({
            "posts": [
                { "author": "ada", "title": "looking for CRM for dentists asap", "body": "", "url": "https://x/1" },
            ]
        }),
    );
    fetcher.register(
        SourceKind::News,
        "1",
        serde_json::json!({
            "articles": [
                { "company": "Acme Dental", "funding_amount": "$5M", "headline": "raised funding", "date": "2026-01-01" },
            ]
        }),
    );
    web_search.register(
        "Acme Dental Founder decision maker",
        vec![leadscout_adapters::WebSearchHit {
            title: "Jane Doe".to_string(),
            url: "https://x/jane".to_string(),
            snippet: "Founder".to_string(),
        }],
    );

    let classifier = MockClassifier(|_system, user| {
        if user.contains("asap") {
            Ok(serde_json::json!({ "score": 90 }))
        } else if user.contains("Candidate companies") {
            Ok(serde_json::json!({ "companies": ["Acme Dental"] }))
        } else if user.contains("Role hint") {
            Ok(serde_json::json!({ "picks": [0] }))
        } else {
            Ok(serde_json::json!({ "is_seller": false, "reason": "" }))
        }
    });

    let planner = Arc::new(DeterministicPlanner);
    let supervisor = Supervisor::new(&fetcher, &classifier, &web_search, planner);
    let sink = PrintSink;
    let cancel = CancelSignal::new();

    let result = supervisor
        .run("CRM for dentists", 5, None, &sink, &cancel)
        .await;

    println!(
        "\ndone: {} leads, {} hot, {} warm, {} cold, success={}",
        result.leads.len(),
        result.hot_count,
        result.warm_count,
        result.cold_count,
        result.success,
    );
}
