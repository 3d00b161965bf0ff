use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::error::ProviderError;
use crate::mcp::registry::ResourceProvider;
use crate::mcp::types::{Resource, ResourceContents};

// Version suffixes bust client-side template caches.
pub const LIVE_SCORES_WIDGET_URI: &str = "ui://widget/live-scores.html?v5";
pub const TEAM_INFO_WIDGET_URI: &str = "ui://widget/team-info.html?v2";
pub const UPCOMING_GAMES_WIDGET_URI: &str = "ui://widget/upcoming-games.html?v4";

const WIDGET_MIME_TYPE: &str = "text/html+skybridge";
const WIDGET_DOMAIN: &str = "https://chatgpt.com";
const STATIC_ASSET_DOMAIN: &str = "https://*.oaistatic.com";

/// HTML template the client renders tool output into
pub struct WidgetResource {
    uri: &'static str,
    name: &'static str,
    description: &'static str,
    title: &'static str,
    component: &'static str,
    meta: Map<String, Value>,
}

impl WidgetResource {
    pub fn live_scores(base_url: &str) -> Self {
        Self {
            uri: LIVE_SCORES_WIDGET_URI,
            name: "Live Scores Widget",
            description: "HTML template for displaying live football scores",
            title: "Live Scores",
            component: "LiveScoresWidget",
            meta: widget_meta(base_url),
        }
    }

    pub fn team_info(base_url: &str) -> Self {
        Self {
            uri: TEAM_INFO_WIDGET_URI,
            name: "Team Info Widget",
            description: "HTML template for displaying detailed team information",
            title: "Team Information",
            component: "TeamInfoWidget",
            meta: widget_meta(base_url),
        }
    }

    pub fn upcoming_games(base_url: &str) -> Self {
        Self {
            uri: UPCOMING_GAMES_WIDGET_URI,
            name: "Upcoming Games Widget",
            description: "Interactive schedule widget with ticket links",
            title: "Upcoming Games",
            component: "UpcomingGamesWidget",
            meta: widget_meta(base_url),
        }
    }

    fn render(&self) -> String {
        format!(
            concat!(
                "<!DOCTYPE html>\n",
                "<html>\n",
                "<head><meta charset=\"utf-8\"><title>{title}</title></head>\n",
                "<body>\n",
                "<div id=\"root\" data-component=\"{component}\"></div>\n",
                "<script type=\"module\">\n",
                "const output = window.openai?.toolOutput ?? {{}};\n",
                "document.getElementById(\"root\").dataset.props = JSON.stringify(output);\n",
                "</script>\n",
                "</body>\n",
                "</html>\n"
            ),
            title = self.title,
            component = self.component,
        )
    }
}

fn widget_meta(base_url: &str) -> Map<String, Value> {
    let mut meta = Map::new();
    meta.insert("openai/widgetPrefersBorder".into(), json!(true));
    meta.insert("openai/widgetDomain".into(), json!(WIDGET_DOMAIN));
    meta.insert(
        "openai/widgetCSP".into(),
        json!({
            "connect_domains": [WIDGET_DOMAIN, base_url],
            "resource_domains": [base_url, STATIC_ASSET_DOMAIN]
        }),
    );
    meta
}

#[async_trait]
impl ResourceProvider for WidgetResource {
    fn descriptor(&self) -> Resource {
        Resource::new(self.uri, self.name)
            .with_description(self.description)
            .with_mime_type(WIDGET_MIME_TYPE)
            .with_meta(self.meta.clone())
    }

    async fn read(&self) -> Result<ResourceContents, ProviderError> {
        Ok(ResourceContents::text(self.uri, WIDGET_MIME_TYPE, self.render()).with_meta(self.meta.clone()))
    }
}
