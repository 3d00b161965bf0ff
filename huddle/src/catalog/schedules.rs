use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::widgets::UPCOMING_GAMES_WIDGET_URI;
use crate::error::ProviderError;
use crate::mcp::registry::ToolProvider;
use crate::mcp::types::{CallToolResult, Tool};

#[derive(Debug, Clone, Serialize)]
pub struct UpcomingGame {
    pub opponent: &'static str,
    pub date: &'static str,
    pub kickoff: &'static str,
    pub location: &'static str,
    pub venue: &'static str,
    pub theme: &'static str,
    pub starting_price: u32,
    pub tickets_url: &'static str,
}

/// A team's next fixtures, serialized as the tool's structured content
#[derive(Debug, Clone, Serialize)]
pub struct Schedule {
    pub team_name: &'static str,
    pub short_name: &'static str,
    pub league: &'static str,
    pub primary_color: &'static str,
    pub upcoming_games: &'static [UpcomingGame],
}

const SCHEDULES: &[Schedule] = &[
    Schedule {
        team_name: "Metro City Thunder",
        short_name: "Thunder",
        league: "Pro League",
        primary_color: "#3b82f6",
        upcoming_games: &[
            UpcomingGame {
                opponent: "West Coast Titans",
                date: "2025-10-27",
                kickoff: "7:15 PM ET",
                location: "Home",
                venue: "Metro City Stadium",
                theme: "Rivalry Night",
                starting_price: 145,
                tickets_url: "https://tickets.example.com/thunder-vs-titans",
            },
            UpcomingGame {
                opponent: "Harbor Lions",
                date: "2025-11-03",
                kickoff: "4:05 PM ET",
                location: "Away",
                venue: "Bayfront Arena",
                theme: "Coastal Classic",
                starting_price: 98,
                tickets_url: "https://tickets.example.com/thunder-at-lions",
            },
            UpcomingGame {
                opponent: "Central Stars",
                date: "2025-11-10",
                kickoff: "1:00 PM ET",
                location: "Home",
                venue: "Metro City Stadium",
                theme: "Salute to Service",
                starting_price: 120,
                tickets_url: "https://tickets.example.com/thunder-vs-stars",
            },
        ],
    },
    Schedule {
        team_name: "West Coast Titans",
        short_name: "Titans",
        league: "Pro League",
        primary_color: "#0ea5e9",
        upcoming_games: &[
            UpcomingGame {
                opponent: "Metro City Thunder",
                date: "2025-10-27",
                kickoff: "7:15 PM PT",
                location: "Away",
                venue: "Metro City Stadium",
                theme: "Prime Time Clash",
                starting_price: 132,
                tickets_url: "https://tickets.example.com/titans-at-thunder",
            },
            UpcomingGame {
                opponent: "Northern Sentinels",
                date: "2025-11-02",
                kickoff: "5:25 PM PT",
                location: "Home",
                venue: "Pacific Field",
                theme: "Throwback Night",
                starting_price: 118,
                tickets_url: "https://tickets.example.com/titans-vs-sentinels",
            },
            UpcomingGame {
                opponent: "Desert Comets",
                date: "2025-11-09",
                kickoff: "2:05 PM PT",
                location: "Home",
                venue: "Pacific Field",
                theme: "Legends Weekend",
                starting_price: 101,
                tickets_url: "https://tickets.example.com/titans-vs-comets",
            },
        ],
    },
    Schedule {
        team_name: "Northern Sentinels",
        short_name: "Sentinels",
        league: "Pro League",
        primary_color: "#2563eb",
        upcoming_games: &[
            UpcomingGame {
                opponent: "Harbor Lions",
                date: "2025-10-27",
                kickoff: "8:20 PM ET",
                location: "Home",
                venue: "Sentinel Bank Field",
                theme: "Division Showdown",
                starting_price: 109,
                tickets_url: "https://tickets.example.com/sentinels-vs-lions",
            },
            UpcomingGame {
                opponent: "Metro City Thunder",
                date: "2025-11-02",
                kickoff: "1:00 PM ET",
                location: "Away",
                venue: "Metro City Stadium",
                theme: "Road Warriors",
                starting_price: 97,
                tickets_url: "https://tickets.example.com/sentinels-at-thunder",
            },
            UpcomingGame {
                opponent: "Great Lakes Guardians",
                date: "2025-11-09",
                kickoff: "4:25 PM ET",
                location: "Home",
                venue: "Sentinel Bank Field",
                theme: "Family Weekend",
                starting_price: 89,
                tickets_url: "https://tickets.example.com/sentinels-vs-guardians",
            },
        ],
    },
    Schedule {
        team_name: "Southern University Wildcats",
        short_name: "Wildcats",
        league: "College League",
        primary_color: "#a855f7",
        upcoming_games: &[
            UpcomingGame {
                opponent: "Midland Pioneers",
                date: "2025-10-27",
                kickoff: "3:30 PM ET",
                location: "Home",
                venue: "Founders Field",
                theme: "Homecoming",
                starting_price: 75,
                tickets_url: "https://tickets.example.com/wildcats-vs-pioneers",
            },
            UpcomingGame {
                opponent: "State Tech Warriors",
                date: "2025-11-02",
                kickoff: "7:00 PM ET",
                location: "Away",
                venue: "Warrior Coliseum",
                theme: "Conference Spotlight",
                starting_price: 64,
                tickets_url: "https://tickets.example.com/wildcats-at-warriors",
            },
            UpcomingGame {
                opponent: "River City Falcons",
                date: "2025-11-09",
                kickoff: "6:00 PM ET",
                location: "Home",
                venue: "Founders Field",
                theme: "Senior Night",
                starting_price: 70,
                tickets_url: "https://tickets.example.com/wildcats-vs-falcons",
            },
        ],
    },
];

fn find_schedule(query: &str) -> Option<&'static Schedule> {
    let query = query.to_lowercase();
    SCHEDULES.iter().find(|s| {
        s.team_name.to_lowercase().contains(&query)
            || s.short_name.to_lowercase().contains(&query)
    })
}

/// `get_upcoming_games` tool, rendered by the upcoming-games widget
pub struct UpcomingGamesTool;

#[async_trait]
impl ToolProvider for UpcomingGamesTool {
    fn descriptor(&self) -> Tool {
        let mut meta = Map::new();
        meta.insert("openai/outputTemplate".into(), json!(UPCOMING_GAMES_WIDGET_URI));
        meta.insert(
            "openai/toolInvocation/invoking".into(),
            json!("Gathering upcoming games"),
        );
        meta.insert(
            "openai/toolInvocation/invoked".into(),
            json!("Upcoming games displayed"),
        );

        Tool::new(
            "get_upcoming_games",
            json!({
                "type": "object",
                "properties": {
                    "team_name": {
                        "type": "string",
                        "description": "Team name or nickname to look up"
                    }
                },
                "required": ["team_name"]
            }),
        )
        .with_title("Get Upcoming Games")
        .with_description(
            "Lists the next scheduled games for a specific football team and includes ticket links.",
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

        let Some(schedule) = find_schedule(team_name) else {
            let available: Vec<&str> = SCHEDULES.iter().map(|s| s.team_name).collect();
            return Ok(CallToolResult::text(format!(
                "Sorry, I couldn't find an upcoming schedule for '{}'. Try one of: {}",
                team_name,
                available.join(", ")
            )));
        };

        let payload = serde_json::to_value(schedule).map_err(anyhow::Error::from)?;
        Ok(
            CallToolResult::text(format!("Here are the next games for the {}.", schedule.team_name))
                .with_structured(payload),
        )
    }
}
