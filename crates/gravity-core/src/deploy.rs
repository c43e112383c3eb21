use serde::{Deserialize, Serialize};

/// Hosting platforms cap project names; slugs are cut to this length.
pub const MAX_SLUG_LEN: usize = 50;

/// Outcome of the deploy action for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum DeployStatus {
    #[default]
    Idle,
    Deploying,
    Deployed {
        url: String,
    },
    Failed {
        error: String,
    },
}

impl DeployStatus {
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Deployed { url } => Some(url),
            _ => None,
        }
    }
}

/// Project-name slug: lowercase, every char outside `[a-z0-9]` becomes `-`,
/// capped at [`MAX_SLUG_LEN`].
pub fn project_slug(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                '-'
            }
        })
        .take(MAX_SLUG_LEN)
        .collect()
}

/// Synthetic deployment URL for a project title.
pub fn deploy_url(title: &str, domain: &str) -> String {
    format!("https://{}.{domain}", project_slug(title))
}
