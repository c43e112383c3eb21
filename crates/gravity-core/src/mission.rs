use serde::{Deserialize, Serialize};

/// Smallest number of repositories a mission may request.
pub const MIN_PROJECT_COUNT: u32 = 1;
/// Largest number of repositories a mission may request.
pub const MAX_PROJECT_COUNT: u32 = 6;
/// Upper bound on the topic filter text.
pub const MAX_TOPICS_LEN: usize = 256;

/// Named on/off switches of a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionToggle {
    Redesign,
    Repos,
    Blog,
    Screenshots,
    Lighthouse,
}

impl MissionToggle {
    /// Every toggle, in display order.
    pub const ALL: [MissionToggle; 5] = [
        MissionToggle::Redesign,
        MissionToggle::Repos,
        MissionToggle::Blog,
        MissionToggle::Screenshots,
        MissionToggle::Lighthouse,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Redesign => "Redesign",
            Self::Repos => "Repos",
            Self::Blog => "Blog",
            Self::Screenshots => "Screenshots",
            Self::Lighthouse => "Lighthouse",
        }
    }
}

/// One row of the rendered toggle table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleView {
    pub key: MissionToggle,
    pub label: &'static str,
    pub enabled: bool,
}

/// Mission configuration for one control-center session.
///
/// Only the topic filter and project count reach the pipeline text; the
/// toggles are carried for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionConfig {
    pub redesign: bool,
    pub repos: bool,
    pub blog: bool,
    pub screenshots: bool,
    pub lighthouse: bool,
    pub github_topics: String,
    pub project_count: u32,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            redesign: true,
            repos: true,
            blog: true,
            screenshots: true,
            lighthouse: true,
            github_topics: "agentic-ai, nextjs".to_string(),
            project_count: 3,
        }
    }
}

impl MissionConfig {
    pub fn toggle(&self, toggle: MissionToggle) -> bool {
        match toggle {
            MissionToggle::Redesign => self.redesign,
            MissionToggle::Repos => self.repos,
            MissionToggle::Blog => self.blog,
            MissionToggle::Screenshots => self.screenshots,
            MissionToggle::Lighthouse => self.lighthouse,
        }
    }

    pub fn set_toggle(&mut self, toggle: MissionToggle, enabled: bool) {
        let slot = match toggle {
            MissionToggle::Redesign => &mut self.redesign,
            MissionToggle::Repos => &mut self.repos,
            MissionToggle::Blog => &mut self.blog,
            MissionToggle::Screenshots => &mut self.screenshots,
            MissionToggle::Lighthouse => &mut self.lighthouse,
        };
        *slot = enabled;
    }

    /// Toggle table rendered through the fixed label mapping.
    pub fn toggle_views(&self) -> Vec<ToggleView> {
        MissionToggle::ALL
            .iter()
            .map(|&key| ToggleView {
                key,
                label: key.label(),
                enabled: self.toggle(key),
            })
            .collect()
    }

    /// Validate and apply a partial update. Nothing is applied on error.
    pub fn apply(&mut self, patch: &MissionConfigPatch) -> Result<(), MissionConfigError> {
        if let Some(count) = patch.project_count
            && !(MIN_PROJECT_COUNT..=MAX_PROJECT_COUNT).contains(&count)
        {
            return Err(MissionConfigError::ProjectCountOutOfRange(count));
        }
        if let Some(ref topics) = patch.github_topics
            && topics.len() > MAX_TOPICS_LEN
        {
            return Err(MissionConfigError::TopicsTooLong(topics.len()));
        }

        for toggle in MissionToggle::ALL {
            if let Some(enabled) = patch.toggle(toggle) {
                self.set_toggle(toggle, enabled);
            }
        }
        if let Some(ref topics) = patch.github_topics {
            self.github_topics = topics.clone();
        }
        if let Some(count) = patch.project_count {
            self.project_count = count;
        }
        Ok(())
    }
}

/// Partial mission update; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MissionConfigPatch {
    pub redesign: Option<bool>,
    pub repos: Option<bool>,
    pub blog: Option<bool>,
    pub screenshots: Option<bool>,
    pub lighthouse: Option<bool>,
    pub github_topics: Option<String>,
    pub project_count: Option<u32>,
}

impl MissionConfigPatch {
    fn toggle(&self, toggle: MissionToggle) -> Option<bool> {
        match toggle {
            MissionToggle::Redesign => self.redesign,
            MissionToggle::Repos => self.repos,
            MissionToggle::Blog => self.blog,
            MissionToggle::Screenshots => self.screenshots,
            MissionToggle::Lighthouse => self.lighthouse,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissionConfigError {
    ProjectCountOutOfRange(u32),
    TopicsTooLong(usize),
}

impl std::fmt::Display for MissionConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProjectCountOutOfRange(n) => write!(
                f,
                "project_count {n} outside {MIN_PROJECT_COUNT}..={MAX_PROJECT_COUNT}"
            ),
            Self::TopicsTooLong(len) => {
                write!(f, "github_topics exceeds {MAX_TOPICS_LEN} chars ({len})")
            },
        }
    }
}
