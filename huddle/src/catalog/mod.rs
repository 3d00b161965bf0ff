//! Demo capability catalog: football lookups and the widgets that render them
//!
//! Everything here sits behind `ToolProvider` / `ResourceProvider`; the MCP
//! core never looks inside.

mod echo;
mod schedules;
mod scores;
mod teams;
mod widgets;

pub use echo::EchoTool;
pub use schedules::{Schedule, UpcomingGamesTool};
pub use scores::{LiveScoresBoard, LiveScoresTool, Match, Possession};
pub use teams::{Team, TeamInfoTool};
pub use widgets::{
    WidgetResource, LIVE_SCORES_WIDGET_URI, TEAM_INFO_WIDGET_URI, UPCOMING_GAMES_WIDGET_URI,
};

use std::sync::Arc;

use crate::error::RegistryError;
use crate::mcp::registry::CapabilityRegistry;

/// Register every demo tool and resource.
///
/// `base_url` is only copied into widget CSP metadata.
pub fn register_default_catalog(
    registry: &mut CapabilityRegistry,
    base_url: &str,
) -> Result<(), RegistryError> {
    registry.register_tool(Arc::new(EchoTool))?;
    registry.register_tool(Arc::new(LiveScoresTool))?;
    registry.register_tool(Arc::new(TeamInfoTool))?;
    registry.register_tool(Arc::new(UpcomingGamesTool))?;

    registry.register_resource(Arc::new(LiveScoresBoard))?;
    registry.register_resource(Arc::new(WidgetResource::live_scores(base_url)))?;
    registry.register_resource(Arc::new(WidgetResource::team_info(base_url)))?;
    registry.register_resource(Arc::new(WidgetResource::upcoming_games(base_url)))?;

    tracing::info!("Registered {} capabilities", registry.len());
    Ok(())
}
