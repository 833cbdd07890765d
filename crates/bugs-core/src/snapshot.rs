use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Lifecycle of a world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorldState {
    Loaded,
    Running,
    Paused,
    Finished,
}

/// A line segment left on the canvas by `move`, `moveto` or `line`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    /// `None` when drawn with color `none`
    pub color: Option<Color>,
}

/// Where a live bug is and how it looks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub angle: f64,
    pub color: Option<Color>,
}

/// A bug removed from the world by a runtime error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentFailure {
    pub agent: String,
    pub error: String,
}

/// Everything a renderer needs at one instant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub state: WorldState,
    pub rounds: u64,
    pub delay_ms: u64,
    pub agents: Vec<AgentView>,
    pub commands: Vec<Command>,
    pub failures: Vec<AgentFailure>,
    pub taken_at: DateTime<Utc>,
}

impl WorldSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn agent(&self, name: &str) -> Option<&AgentView> {
        self.agents.iter().find(|agent| agent.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let snapshot = WorldSnapshot {
            state: WorldState::Finished,
            rounds: 3,
            delay_ms: 0,
            agents: vec![AgentView {
                name: "Sally".to_string(),
                x: 1.0,
                y: 2.0,
                angle: 90.0,
                color: Some(Color::rgb(255, 0, 0)),
            }],
            commands: vec![Command {
                x1: 0.0,
                y1: 0.0,
                x2: 1.0,
                y2: 2.0,
                color: None,
            }],
            failures: vec![],
            taken_at: Utc::now(),
        };

        let json = snapshot.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["state"], "finished");
        assert_eq!(value["agents"][0]["color"]["r"], 255);
        assert!(value["commands"][0]["color"].is_null());

        let restored = WorldSnapshot::from_json(&json).unwrap();
        assert_eq!(restored.agent("Sally"), snapshot.agent("Sally"));
        assert!(restored.agent("Fred").is_none());
    }
}
