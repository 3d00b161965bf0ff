use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::widgets::TEAM_INFO_WIDGET_URI;
use crate::error::ProviderError;
use crate::mcp::registry::ToolProvider;
use crate::mcp::types::{CallToolResult, Tool};

#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamStats {
    pub points_per_game: f64,
    pub points_allowed: f64,
    pub total_yards_per_game: f64,
    pub passing_yards_per_game: f64,
    pub rushing_yards_per_game: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameResult {
    pub opponent: &'static str,
    pub result: &'static str,
    pub score: &'static str,
    pub date: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Player {
    pub name: &'static str,
    pub position: &'static str,
    pub number: u32,
    pub stats: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct NextGame {
    pub opponent: &'static str,
    pub date: &'static str,
    pub location: &'static str,
}

/// Team profile, serialized as the tool's structured content
#[derive(Debug, Clone, Serialize)]
pub struct Team {
    pub name: &'static str,
    pub short_name: &'static str,
    pub league: &'static str,
    pub conference: &'static str,
    pub division: &'static str,
    pub record: Record,
    pub stats: TeamStats,
    pub recent_games: &'static [GameResult],
    pub key_players: &'static [Player],
    pub next_game: NextGame,
}

const TEAMS: &[Team] = &[
    Team {
        name: "Metro City Thunder",
        short_name: "Thunder",
        league: "Pro League",
        conference: "Eastern",
        division: "North",
        record: Record { wins: 8, losses: 3, ties: 0 },
        stats: TeamStats {
            points_per_game: 27.4,
            points_allowed: 21.2,
            total_yards_per_game: 385.6,
            passing_yards_per_game: 265.3,
            rushing_yards_per_game: 120.3,
        },
        recent_games: &[
            GameResult { opponent: "Northern Sentinels", result: "W", score: "24-21", date: "2025-10-13" },
            GameResult { opponent: "Harbor Lions", result: "W", score: "31-17", date: "2025-10-06" },
            GameResult { opponent: "Central Stars", result: "L", score: "20-23", date: "2025-09-29" },
        ],
        key_players: &[
            Player { name: "Marcus Johnson", position: "QB", number: 12, stats: "2,847 yards, 22 TDs" },
            Player { name: "David Williams", position: "RB", number: 28, stats: "892 yards, 8 TDs" },
            Player { name: "James Carter", position: "WR", number: 84, stats: "67 rec, 1,124 yards, 9 TDs" },
        ],
        next_game: NextGame { opponent: "West Coast Titans", date: "2025-10-27", location: "Home" },
    },
    Team {
        name: "Northern Sentinels",
        short_name: "Sentinels",
        league: "Pro League",
        conference: "Eastern",
        division: "North",
        record: Record { wins: 6, losses: 5, ties: 0 },
        stats: TeamStats {
            points_per_game: 23.8,
            points_allowed: 24.1,
            total_yards_per_game: 348.2,
            passing_yards_per_game: 242.8,
            rushing_yards_per_game: 105.4,
        },
        recent_games: &[
            GameResult { opponent: "Metro City Thunder", result: "L", score: "21-24", date: "2025-10-13" },
            GameResult { opponent: "East Side Hawks", result: "W", score: "27-20", date: "2025-10-06" },
            GameResult { opponent: "West Coast Titans", result: "L", score: "17-21", date: "2025-09-29" },
        ],
        key_players: &[
            Player { name: "Tyler Anderson", position: "QB", number: 7, stats: "2,456 yards, 18 TDs" },
            Player { name: "Chris Thompson", position: "RB", number: 22, stats: "743 yards, 6 TDs" },
            Player { name: "Michael Davis", position: "WR", number: 19, stats: "59 rec, 892 yards, 7 TDs" },
        ],
        next_game: NextGame { opponent: "Harbor Lions", date: "2025-10-27", location: "Away" },
    },
    Team {
        name: "West Coast Titans",
        short_name: "Titans",
        league: "Pro League",
        conference: "Western",
        division: "Pacific",
        record: Record { wins: 9, losses: 2, ties: 0 },
        stats: TeamStats {
            points_per_game: 29.1,
            points_allowed: 19.8,
            total_yards_per_game: 402.3,
            passing_yards_per_game: 285.7,
            rushing_yards_per_game: 116.6,
        },
        recent_games: &[
            GameResult { opponent: "Central Stars", result: "W", score: "17-14", date: "2025-10-13" },
            GameResult { opponent: "East Side Hawks", result: "W", score: "35-28", date: "2025-10-06" },
            GameResult { opponent: "Northern Sentinels", result: "W", score: "21-17", date: "2025-09-29" },
        ],
        key_players: &[
            Player { name: "Aaron Mitchell", position: "QB", number: 9, stats: "3,142 yards, 26 TDs" },
            Player { name: "Brandon Lee", position: "RB", number: 31, stats: "1,021 yards, 11 TDs" },
            Player { name: "Robert Garcia", position: "WR", number: 88, stats: "73 rec, 1,287 yards, 12 TDs" },
        ],
        next_game: NextGame { opponent: "Metro City Thunder", date: "2025-10-27", location: "Away" },
    },
];

/// First team whose name or short name contains `query`, ignoring case
fn find_team(query: &str) -> Option<&'static Team> {
    let query = query.to_lowercase();
    TEAMS.iter().find(|t| {
        t.name.to_lowercase().contains(&query) || t.short_name.to_lowercase().contains(&query)
    })
}

/// `get_team_info` tool, rendered client-side by the team-info widget
pub struct TeamInfoTool;

#[async_trait]
impl ToolProvider for TeamInfoTool {
    fn descriptor(&self) -> Tool {
        let mut meta = Map::new();
        meta.insert("openai/outputTemplate".into(), json!(TEAM_INFO_WIDGET_URI));
        meta.insert(
            "openai/toolInvocation/invoking".into(),
            json!("Loading team information"),
        );
        meta.insert(
            "openai/toolInvocation/invoked".into(),
            json!("Team information displayed"),
        );

        Tool::new(
            "get_team_info",
            json!({
                "type": "object",
                "properties": {
                    "team_name": {
                        "type": "string",
                        "description": "The name of the team to get information about"
                    }
                },
                "required": ["team_name"]
            }),
        )
        .with_title("Get Team Info")
        .with_description(
            "Returns detailed information about a specific football team including stats, roster, and recent games.",
        )
        .with_meta(meta)
    }

    async fn invoke(&self, arguments: Value) -> Result<CallToolResult, ProviderError> {
        let team_name = arguments
            .get("team_name")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProviderError::InvalidArguments("Missing team_name".to_string()))?;

        let Some(team) = find_team(team_name) else {
            let available: Vec<&str> = TEAMS.iter().map(|t| t.name).collect();
            return Ok(CallToolResult::text(format!(
                "Sorry, I couldn't find information for '{}'. Available teams: {}",
                team_name,
                available.join(", ")
            )));
        };

        let payload = serde_json::to_value(team).map_err(anyhow::Error::from)?;
        Ok(
            CallToolResult::text(format!("Here's detailed information about the {}.", team.name))
                .with_structured(payload),
        )
    }
}
