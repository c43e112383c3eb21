use crate::listing::Repository;

/// Static repositories served when the GitHub API is unreachable or
/// rate-limited. `updated_at` is fixed so responses stay deterministic.
pub fn fallback_repositories() -> Vec<Repository> {
    vec![
        Repository {
            id: 1,
            name: "gravity".to_string(),
            description: Some("Autonomous self-rebuilding portfolio agent.".to_string()),
            html_url: "https://github.com/Hensi43/gravity".to_string(),
            homepage: None,
            topics: vec![
                "agentic-ai".to_string(),
                "nextjs".to_string(),
                "threejs".to_string(),
            ],
            stargazers_count: 42,
            language: Some("TypeScript".to_string()),
            updated_at: "2025-11-30T11:58:00Z".to_string(),
        },
        Repository {
            id: 2,
            name: "neural-interface".to_string(),
            description: Some("Brain-computer interface visualization dashboard.".to_string()),
            html_url: "https://github.com/Hensi43/neural-interface".to_string(),
            homepage: None,
            topics: vec![
                "react".to_string(),
                "visualization".to_string(),
                "bci".to_string(),
            ],
            stargazers_count: 28,
            language: Some("JavaScript".to_string()),
            updated_at: "2025-11-29T11:58:00Z".to_string(),
        },
    ]
}
