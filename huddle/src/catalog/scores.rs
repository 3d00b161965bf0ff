use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt::Write;

use crate::error::ProviderError;
use crate::mcp::registry::{ResourceProvider, ToolProvider};
use crate::mcp::types::{CallToolResult, Resource, ResourceContents, Tool};

const BOARD_URI: &str = "live-scores://board";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Possession {
    Home,
    Away,
}

#[derive(Debug, Clone)]
pub struct Match {
    pub league: &'static str,
    pub home_team: &'static str,
    pub away_team: &'static str,
    pub home_score: u32,
    pub away_score: u32,
    pub quarter: &'static str,
    pub time_remaining: &'static str,
    pub possession: Possession,
}

const MATCHES: &[Match] = &[
    Match {
        league: "Pro League",
        home_team: "Metro City Thunder",
        away_team: "Northern Sentinels",
        home_score: 24,
        away_score: 21,
        quarter: "Q3",
        time_remaining: "8:42",
        possession: Possession::Home,
    },
    Match {
        league: "Pro League",
        home_team: "West Coast Titans",
        away_team: "Central Stars",
        home_score: 17,
        away_score: 14,
        quarter: "Q2",
        time_remaining: "2:15",
        possession: Possession::Away,
    },
    Match {
        league: "Pro League",
        home_team: "East Side Hawks",
        away_team: "Harbor Lions",
        home_score: 31,
        away_score: 10,
        quarter: "Q4",
        time_remaining: "11:03",
        possession: Possession::Home,
    },
    Match {
        league: "College League",
        home_team: "Southern University Wildcats",
        away_team: "State Tech Warriors",
        home_score: 14,
        away_score: 21,
        quarter: "Q3",
        time_remaining: "5:30",
        possession: Possession::Away,
    },
    Match {
        league: "College League",
        home_team: "Midland Pioneers",
        away_team: "Riverside Rangers",
        home_score: 28,
        away_score: 28,
        quarter: "Q4",
        time_remaining: "0:58",
        possession: Possession::Home,
    },
];

/// Live matches, optionally filtered by a case-insensitive league substring
fn live_matches(league: Option<&str>) -> Vec<&'static Match> {
    match league.map(str::trim).filter(|l| !l.is_empty()) {
        Some(filter) => {
            let filter = filter.to_lowercase();
            MATCHES
                .iter()
                .filter(|m| m.league.to_lowercase().contains(&filter))
                .collect()
        }
        None => MATCHES.iter().collect(),
    }
}

fn format_board(matches: &[&Match]) -> String {
    if matches.is_empty() {
        return "No matches found".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "LIVE FOOTBALL SCORES");
    let _ = writeln!(out, "{}\n", "=".repeat(50));

    // Grouped by league, leagues in first-seen order
    let mut leagues: Vec<&str> = Vec::new();
    for m in matches {
        if !leagues.contains(&m.league) {
            leagues.push(m.league);
        }
    }

    for league in leagues {
        let _ = writeln!(out, "{}", league);
        let _ = writeln!(out, "{}", "-".repeat(50));
        for m in matches.iter().filter(|m| m.league == league) {
            let (home, away) = match m.possession {
                Possession::Home => (format!("* {}", m.home_team), m.away_team.to_string()),
                Possession::Away => (m.home_team.to_string(), format!("* {}", m.away_team)),
            };
            let _ = writeln!(
                out,
                "{} {} - {} {} [{} {}]",
                home, m.home_score, away, m.away_score, m.quarter, m.time_remaining
            );
        }
        out.push('\n');
    }

    out
}

/// `get_live_scores` tool
pub struct LiveScoresTool;

#[async_trait]
impl ToolProvider for LiveScoresTool {
    fn descriptor(&self) -> Tool {
        Tool::new(
            "get_live_scores",
            json!({
                "type": "object",
                "properties": {
                    "league": {
                        "type": "string",
                        "description": "Optional league filter (e.g., 'Pro League', 'College League')"
                    }
                }
            }),
        )
        .with_title("Get Live Scores")
        .with_description("Returns current live football scores")
    }

    async fn invoke(&self, arguments: Value) -> Result<CallToolResult, ProviderError> {
        let league = match arguments.get("league") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.as_str()),
            Some(_) => {
                return Err(ProviderError::InvalidArguments(
                    "league must be a string".to_string(),
                ))
            }
        };

        Ok(CallToolResult::text(format_board(&live_matches(league))))
    }
}

/// Plain-text scoreboard of every live match
pub struct LiveScoresBoard;

#[async_trait]
impl ResourceProvider for LiveScoresBoard {
    fn descriptor(&self) -> Resource {
        Resource::new(BOARD_URI, "Live Scores Board")
            .with_description("Real-time football scores board showing all live games")
            .with_mime_type("text/plain")
    }

    async fn read(&self) -> Result<ResourceContents, ProviderError> {
        Ok(ResourceContents::text(
            BOARD_URI,
            "text/plain",
            format_board(&live_matches(None)),
        ))
    }
}
